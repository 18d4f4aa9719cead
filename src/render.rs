// Module for drawing images and text onto a display page
use log::debug;

use crate::{
    common::{Color, ColorIdx, SCREEN_HEIGHT, SCREEN_WIDTH},
    device::{Display, Page},
    glyph::FontAsset,
    image::IndexedImage,
    layout::{layout, Align, Point},
    palette::Palette,
    remap::{disambiguate, remap, ColorRemapTable, RemapOptions},
};

pub struct Renderer<'a> {
    font: &'a FontAsset,
    options: RemapOptions,
    scene_palette: Vec<Color>,
    remap: ColorRemapTable,
}

fn put<D: Display>(display: &mut D, page: Page, x: i32, y: i32, index: ColorIdx) {
    if x < 0 || y < 0 || x as usize >= SCREEN_WIDTH || y as usize >= SCREEN_HEIGHT {
        return;
    }
    display.write_indexed_pixel(page, y as usize, x as usize, index);
}

impl<'a> Renderer<'a> {
    pub fn new(font: &'a FontAsset) -> Self {
        Self::with_options(font, RemapOptions::default())
    }

    pub fn with_options(font: &'a FontAsset, options: RemapOptions) -> Self {
        Renderer {
            font,
            options,
            scene_palette: vec![],
            remap: ColorRemapTable::default(),
        }
    }

    pub fn font(&self) -> &FontAsset {
        self.font
    }

    pub fn remap_table(&self) -> &ColorRemapTable {
        &self.remap
    }

    /// Makes `palette` the active scene palette and matches the font
    /// colors against it. Call once per scene change.
    pub fn set_palette(&mut self, palette: &Palette) {
        self.scene_palette = palette.table();
        let reference = self.font.palette.table();
        let mut table = remap(&reference, &self.scene_palette, self.options);
        disambiguate(&mut table, &reference, self.scene_palette.len(), self.options);
        debug!("Font remap table: {:?}", table.entries());
        self.remap = table;
    }

    /// Copies the active scene palette into palette RAM.
    pub fn upload_palette<D: Display>(&self, display: &mut D) {
        for (i, &c) in self.scene_palette.iter().enumerate() {
            display.write_palette_entry(i as ColorIdx, c);
        }
    }

    pub fn clear<D: Display>(&self, display: &mut D, page: Page, index: ColorIdx) {
        for row in 0..SCREEN_HEIGHT {
            for col in 0..SCREEN_WIDTH {
                display.write_indexed_pixel(page, row, col, index);
            }
        }
    }

    /// Blits `image` with its top-left corner at `origin`, clipped to the screen.
    pub fn draw_image<D: Display>(
        &self,
        display: &mut D,
        page: Page,
        image: &IndexedImage,
        origin: Point,
    ) {
        for y in 0..image.height {
            for (x, &p) in image.row(y).iter().enumerate() {
                put(display, page, origin.x + x as i32, origin.y + y as i32, p);
            }
        }
    }

    pub fn draw_text<D: Display>(
        &self,
        display: &mut D,
        page: Page,
        text: &str,
        anchor: Point,
        halign: Align,
        valign: Align,
    ) {
        let metrics = &self.font.metrics;
        for placement in layout(text, anchor, halign, valign, metrics) {
            let (Some(pixels), Some(width)) =
                (self.font.glyph(placement.ch), metrics.width(placement.ch))
            else {
                continue;
            };
            let width = width as usize;
            if width == 0 {
                continue;
            }
            for (i, &p) in pixels.iter().enumerate() {
                if p == 0 && self.options.keep_zero {
                    continue;
                }
                let x = placement.x + (i % width) as i32;
                let y = placement.y + (i / width) as i32;
                put(display, page, x, y, self.remap.get(p));
            }
        }
    }
}
