// Module for rendering compiled assets as C declarations and definitions
use itertools::Itertools;

use crate::{
    common::{slot_char, GLYPH_COUNT},
    glyph::FontAsset,
    image::ImageAsset,
};

const PALETTE_PER_ROW: usize = 8;
const ALIGNED: &str = "__attribute__((aligned(4)))";

const IMAGE_RECORD: &str = "\
#ifndef IMAGE_RECORD
#define IMAGE_RECORD
typedef struct Image {
  const uint8_t *indexed;
  const uint16_t *palette;
  int palette_size;
} image;
#endif
";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Artifacts {
    pub declarations: String,
    pub definitions: String,
}

impl Artifacts {
    /// Both artifacts back to back, as printed when no output directory is
    /// given.
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.declarations, self.definitions)
    }
}

fn hex_rows<T>(
    rows: impl Iterator<Item = Vec<T>>,
    hex: impl Fn(T) -> String + Copy,
) -> String {
    rows.map(|row| format!("  {},\n", row.into_iter().map(hex).join(", ")))
        .collect()
}

fn word_hex(w: u16) -> String {
    format!("0x{:04x}", w)
}

fn byte_hex(b: u8) -> String {
    format!("0x{:02x}", b)
}

fn palette_table(words: &[u16]) -> String {
    hex_rows(
        words.chunks(PALETTE_PER_ROW).map(|c| c.to_vec()),
        word_hex,
    )
}

pub fn image_artifacts(asset: &ImageAsset) -> Artifacts {
    let name = &asset.name;
    let upper = name.to_uppercase();
    let image = &asset.image;
    let words = asset.palette.words();
    let size = words.len();
    let pixel_count = image.pixels.len();

    let declarations = format!(
        "#pragma once\n\
         #include <stdint.h>\n\
         \n\
         {IMAGE_RECORD}\
         \n\
         #define {upper}_WIDTH {width}\n\
         #define {upper}_HEIGHT {height}\n\
         \n\
         extern const int {name}_palette_size;\n\
         extern const uint16_t {name}_palette[{size}];\n\
         extern const uint8_t {name}_indexed[{pixel_count}];\n\
         extern const image {name};\n",
        width = image.width,
        height = image.height,
    );

    let pixel_rows = hex_rows(
        (0..image.height).map(|y| image.row(y).to_vec()),
        byte_hex,
    );
    let definitions = format!(
        "#include \"{name}.h\"\n\
         #include <stdint.h>\n\
         \n\
         const int {name}_palette_size = {size};\n\
         \n\
         const uint16_t {name}_palette[{size}] {ALIGNED} = {{\n\
         {palette}}};\n\
         \n\
         const uint8_t {name}_indexed[{pixel_count}] {ALIGNED} = {{\n\
         {pixel_rows}}};\n\
         \n\
         const image {name} = {{{name}_indexed, {name}_palette, {size}}};\n",
        palette = palette_table(&words),
    );

    Artifacts {
        declarations,
        definitions,
    }
}

pub fn font_artifacts(font: &FontAsset) -> Artifacts {
    let name = &font.name;
    let words = font.palette.words();
    let size = words.len();
    let height = font.metrics.height();

    let declarations = format!(
        "#pragma once\n\
         #include <stdint.h>\n\
         \n\
         extern const int {name}_palette_size;\n\
         extern const uint16_t {name}_palette[{size}];\n\
         \n\
         extern const int {name}_height;\n\
         extern const uint8_t {name}_width[{GLYPH_COUNT}];\n\
         extern const uint8_t *{name}_indexed[{GLYPH_COUNT}];\n"
    );

    let mut definitions = format!(
        "#include \"{name}.h\"\n\
         #include <stdint.h>\n\
         \n\
         const int {name}_palette_size = {size};\n\
         \n\
         const uint16_t {name}_palette[{size}] {ALIGNED} = {{\n\
         {palette}}};\n\
         \n\
         const int {name}_height = {height};\n",
        palette = palette_table(&words),
    );

    for (slot, pixels) in font.glyphs.iter().enumerate() {
        let code = slot_char(slot) as u32;
        let width = font.metrics.widths()[slot] as usize;
        let rows = if width == 0 {
            String::new()
        } else {
            hex_rows(pixels.chunks(width).map(|c| c.to_vec()), byte_hex)
        };
        definitions.push_str(&format!(
            "\n// {:?}\n\
             const uint8_t {name}_{code}_indexed[{len}] {ALIGNED} = {{\n\
             {rows}}};\n",
            slot_char(slot),
            len = pixels.len(),
        ));
    }

    let widths = hex_rows(
        font.metrics
            .widths()
            .chunks(PALETTE_PER_ROW)
            .map(|c| c.iter().map(|w| w.to_string()).collect_vec()),
        |w| w,
    );
    let table_names = (0..GLYPH_COUNT)
        .map(|slot| format!("{name}_{}_indexed", slot_char(slot) as u32))
        .collect_vec();
    let tables = hex_rows(
        table_names.chunks(PALETTE_PER_ROW).map(|c| c.to_vec()),
        |t| t,
    );
    definitions.push_str(&format!(
        "\nconst uint8_t {name}_width[{GLYPH_COUNT}] = {{\n\
         {widths}}};\n\
         \n\
         const uint8_t *{name}_indexed[{GLYPH_COUNT}] = {{\n\
         {tables}}};\n"
    ));

    Artifacts {
        declarations,
        definitions,
    }
}
