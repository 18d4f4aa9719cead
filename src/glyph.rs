// Module for recovering glyph metrics and pixel tables from a marked font sheet.
//
// Row 0 of the sheet is the guide row: every column holding the marker index is
// a boundary, and each glyph sits strictly between two consecutive boundaries.
// The remaining rows hold the glyph pixels.
use anyhow::{ensure, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    common::{glyph_slot, slot_char, ColorIdx, GLYPH_COUNT},
    config::FontConfig,
    error::AssetError,
    image::{encode, IndexedImage},
    palette::Palette,
    quantize::Quantizer,
    raster::Raster,
};

pub struct GlyphSheet {
    image: IndexedImage,
    marker: ColorIdx,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GlyphSpan {
    pub left: usize,  // boundary column
    pub right: usize, // boundary column
}

impl GlyphSpan {
    pub fn width(&self) -> usize {
        self.right - self.left - 1
    }

    pub fn columns(&self) -> std::ops::Range<usize> {
        self.left + 1..self.right
    }
}

impl GlyphSheet {
    pub fn new(image: IndexedImage, marker: ColorIdx) -> Result<Self> {
        ensure!(
            image.height >= 2,
            AssetError::malformed(
                "glyph sheet",
                format!("needs a guide row and glyph rows, found height {}", image.height)
            )
        );
        Ok(GlyphSheet { image, marker })
    }

    pub fn guide_row(&self) -> &[ColorIdx] {
        self.image.row(0)
    }

    pub fn glyph_height(&self) -> usize {
        self.image.height - 1
    }

    pub fn image(&self) -> &IndexedImage {
        &self.image
    }

    fn is_marker(&self, x: usize) -> bool {
        self.guide_row()[x] == self.marker
    }

    /// Finds `count` consecutive spans, starting at the first marker column.
    pub fn scan_spans(&self, count: usize) -> Result<Vec<GlyphSpan>> {
        let width = self.image.width;
        let mut cursor = 0;
        while cursor < width && !self.is_marker(cursor) {
            cursor += 1;
        }
        if cursor >= width {
            return Err(AssetError::malformed(
                "glyph sheet",
                format!("no boundary marker (index {}) in guide row", self.marker),
            )
            .into());
        }

        let mut spans = Vec::with_capacity(count);
        for n in 0..count {
            let left = cursor;
            cursor += 1;
            while cursor < width && !self.is_marker(cursor) {
                cursor += 1;
            }
            if cursor >= width {
                return Err(AssetError::malformed(
                    "glyph sheet",
                    format!(
                        "glyph {} has no right boundary before column {} (found {} of {} glyphs)",
                        n, width, n, count
                    ),
                )
                .into());
            }
            spans.push(GlyphSpan {
                left,
                right: cursor,
            });
        }
        Ok(spans)
    }

    fn cut(&self, span: GlyphSpan) -> Vec<ColorIdx> {
        let mut pixels = Vec::with_capacity(span.width() * self.glyph_height());
        for y in 1..self.image.height {
            pixels.extend_from_slice(&self.image.row(y)[span.columns()]);
        }
        pixels
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphMetrics {
    widths: Vec<u8>, // GLYPH_COUNT entries, by ASCII code
    height: usize,
}

impl GlyphMetrics {
    pub fn extract(sheet: &GlyphSheet) -> Result<Self> {
        let spans = sheet.scan_spans(GLYPH_COUNT)?;
        Self::from_spans(&spans, sheet.glyph_height())
    }

    fn from_spans(spans: &[GlyphSpan], height: usize) -> Result<Self> {
        let mut widths = Vec::with_capacity(spans.len());
        for (slot, span) in spans.iter().enumerate() {
            let w = span.width();
            ensure!(
                w <= u8::MAX as usize,
                AssetError::malformed(
                    "glyph sheet",
                    format!("glyph {:?} is {} pixels wide", slot_char(slot), w)
                )
            );
            widths.push(w as u8);
        }
        Ok(GlyphMetrics { widths, height })
    }

    pub fn from_widths(widths: [u8; GLYPH_COUNT], height: usize) -> Self {
        GlyphMetrics {
            widths: widths.to_vec(),
            height,
        }
    }

    /// Pixel width of a printable character; `None` outside the printable range.
    pub fn width(&self, ch: char) -> Option<u8> {
        glyph_slot(ch).and_then(|slot| self.widths.get(slot).copied())
    }

    pub fn widths(&self) -> &[u8] {
        &self.widths
    }

    pub fn height(&self) -> usize {
        self.height
    }
}

/// The compiled font: metrics, one pixel table per glyph, and the font palette.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontAsset {
    pub name: String,
    pub metrics: GlyphMetrics,
    pub glyphs: Vec<Vec<ColorIdx>>,
    pub palette: Palette,
}

impl FontAsset {
    pub fn extract(name: &str, sheet: &GlyphSheet, palette: Palette) -> Result<Self> {
        let spans = sheet.scan_spans(GLYPH_COUNT)?;
        let metrics = GlyphMetrics::from_spans(&spans, sheet.glyph_height())?;
        let glyphs = spans.iter().map(|&span| sheet.cut(span)).collect();
        Ok(FontAsset {
            name: name.to_string(),
            metrics,
            glyphs,
            palette,
        })
    }

    pub fn compile(name: &str, raster: &Raster, config: &FontConfig) -> Result<Self> {
        info!(
            "Compiling font '{}' from {}x{} sheet",
            name, raster.width, raster.height
        );
        let mut quantizer = Quantizer::new(config.quantizer, raster.pixel_count())?;
        let (image, palette) = encode(raster, &mut quantizer)?;
        let sheet = GlyphSheet::new(image, config.marker_index)?;
        let font = Self::extract(name, &sheet, palette)?;
        debug!(
            "'{}': height {}, {} palette entries, widest glyph {}",
            name,
            font.metrics.height(),
            font.palette.size(),
            font.metrics.widths().iter().max().copied().unwrap_or(0)
        );
        Ok(font)
    }

    pub fn glyph(&self, ch: char) -> Option<&[ColorIdx]> {
        glyph_slot(ch)
            .and_then(|slot| self.glyphs.get(slot))
            .map(Vec::as_slice)
    }

    /// Renders one glyph back into an RGB raster for inspection.
    pub fn glyph_raster(&self, ch: char) -> Option<Raster> {
        let pixels = self.glyph(ch)?;
        let width = self.metrics.width(ch)? as usize;
        let rgb = pixels
            .iter()
            .map(|&p| self.palette.get(p).unwrap_or_default().to_rgb8())
            .collect();
        Some(Raster::new(width, self.metrics.height(), rgb))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    const MARKER: ColorIdx = 1;
    const INK: ColorIdx = 2;

    /// Builds a sheet with the given glyph widths: marker columns in the guide
    /// row, glyph columns filled with ink on every other row.
    pub(crate) fn sheet_image(widths: &[usize], height: usize) -> IndexedImage {
        let width = widths.iter().sum::<usize>() + widths.len() + 1;
        let mut pixels = vec![0; width * (height + 1)];
        let mut x = 0;
        pixels[x] = MARKER;
        for &w in widths {
            for col in x + 1..x + 1 + w {
                for y in (1..=height).step_by(2) {
                    pixels[y * width + col] = INK;
                }
            }
            x += w + 1;
            pixels[x] = MARKER;
        }
        IndexedImage::new(width, height + 1, pixels).unwrap()
    }

    #[test]
    fn recovers_known_widths() {
        let widths = [3, 0, 5, 1, 2];
        let sheet = GlyphSheet::new(sheet_image(&widths, 4), MARKER).unwrap();
        let spans = sheet.scan_spans(widths.len()).unwrap();
        let found: Vec<usize> = spans.iter().map(|s| s.width()).collect();
        assert_eq!(found, widths);
        assert_eq!(spans[0], GlyphSpan { left: 0, right: 4 });
        assert_eq!(spans[1], GlyphSpan { left: 4, right: 5 });
    }

    #[test]
    fn full_sheet_yields_95_disjoint_spans() {
        let widths: Vec<usize> = (0..GLYPH_COUNT).map(|i| 1 + i % 6).collect();
        let sheet = GlyphSheet::new(sheet_image(&widths, 7), MARKER).unwrap();
        let metrics = GlyphMetrics::extract(&sheet).unwrap();
        assert_eq!(metrics.widths().len(), GLYPH_COUNT);
        assert_eq!(metrics.height(), 7);
        assert_eq!(metrics.width(' '), Some(1));
        assert_eq!(metrics.width('~'), Some((1 + 94 % 6) as u8));
        assert_eq!(metrics.width('\t'), None);

        let spans = sheet.scan_spans(GLYPH_COUNT).unwrap();
        for pair in spans.windows(2) {
            assert_eq!(pair[0].right, pair[1].left);
            assert!(pair[0].columns().end <= pair[1].columns().start);
        }
    }

    #[test]
    fn extraction_is_deterministic() {
        let widths: Vec<usize> = (0..GLYPH_COUNT).map(|i| i % 4).collect();
        let sheet = GlyphSheet::new(sheet_image(&widths, 3), MARKER).unwrap();
        let a = GlyphMetrics::extract(&sheet).unwrap();
        let b = GlyphMetrics::extract(&sheet).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn truncated_sheet_fails() {
        let widths = [2, 2, 2];
        let mut image = sheet_image(&widths, 2);
        // Drop the last boundary
        let last = image.width - 1;
        image.pixels[last] = 0;
        let sheet = GlyphSheet::new(image, MARKER).unwrap();
        let err = sheet.scan_spans(3).unwrap_err();
        assert_eq!(
            err.downcast_ref::<AssetError>().map(|e| e.exit_code()),
            Some(5)
        );
        assert!(sheet.scan_spans(2).is_ok());
    }

    #[test]
    fn sheet_without_markers_fails() {
        let image = IndexedImage::new(4, 2, vec![0; 8]).unwrap();
        let sheet = GlyphSheet::new(image, MARKER).unwrap();
        assert!(sheet.scan_spans(1).is_err());
        assert!(GlyphSheet::new(IndexedImage::new(4, 1, vec![1; 4]).unwrap(), MARKER).is_err());
    }

    #[test]
    fn leading_columns_before_first_marker_are_ignored() {
        let mut image = sheet_image(&[2, 3], 2);
        // Prepend two blank columns
        let width = image.width + 2;
        let mut pixels = vec![];
        for y in 0..image.height {
            pixels.extend_from_slice(&[0, 0]);
            pixels.extend_from_slice(image.row(y));
        }
        image = IndexedImage::new(width, image.height, pixels).unwrap();
        let sheet = GlyphSheet::new(image, MARKER).unwrap();
        let spans = sheet.scan_spans(2).unwrap();
        assert_eq!(spans[0], GlyphSpan { left: 2, right: 5 });
        assert_eq!(spans[1].width(), 3);
    }

    #[test]
    fn glyph_tables_exclude_boundaries() {
        let widths: Vec<usize> = (0..GLYPH_COUNT).map(|i| if i == 33 { 3 } else { 1 }).collect();
        let sheet = GlyphSheet::new(sheet_image(&widths, 2), MARKER).unwrap();
        let font = FontAsset::extract("font", &sheet, Palette::new(1)).unwrap();
        assert_eq!(font.glyphs.len(), GLYPH_COUNT);
        assert_eq!(font.glyph('A'), Some(&[INK, INK, INK, 0, 0, 0][..]));
        assert_eq!(font.glyph('\n'), None);
    }

    #[test]
    fn compile_from_rgb_sheet() {
        // Marker white, ink red, background black; two glyph rows
        let w = [255, 255, 255];
        let r = [255, 0, 0];
        let k = [0, 0, 0];
        let mut guide = vec![];
        let mut ink = vec![];
        let mut blank = vec![];
        for i in 0..GLYPH_COUNT {
            guide.extend_from_slice(&[w, k]);
            ink.extend_from_slice(&[k, if i % 2 == 0 { r } else { k }]);
            blank.extend_from_slice(&[k, k]);
        }
        guide.push(w);
        ink.push(k);
        blank.push(k);
        let width = guide.len();
        let pixels = [guide, ink, blank].concat();
        let raster = Raster::new(width, 3, pixels);

        let font = FontAsset::compile("font", &raster, &FontConfig::default()).unwrap();
        assert_eq!(font.metrics.height(), 2);
        assert!(font.metrics.widths().iter().all(|&w| w == 1));
        assert_eq!(font.palette.size(), 3);
        assert_eq!(font.glyph(' '), Some(&[2, 0][..]));
        assert_eq!(font.glyph('!'), Some(&[0, 0][..]));

        let dump = font.glyph_raster(' ').unwrap();
        assert_eq!(dump.width, 1);
        assert_eq!(dump.pixels, vec![[255, 0, 0], [0, 0, 0]]);
    }
}
