// Module for converting decoded rasters into palette-indexed images
use anyhow::{ensure, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    common::{Color, ColorIdx},
    palette::Palette,
    quantize::{Quantizer, QuantizerConfig},
    raster::Raster,
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<ColorIdx>, // row-major
}

impl IndexedImage {
    pub fn new(width: usize, height: usize, pixels: Vec<ColorIdx>) -> Result<Self> {
        ensure!(
            pixels.len() == width * height,
            "pixel count {} does not match {}x{}",
            pixels.len(),
            width,
            height
        );
        Ok(IndexedImage {
            width,
            height,
            pixels,
        })
    }

    pub fn get(&self, x: usize, y: usize) -> Option<ColorIdx> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    pub fn row(&self, y: usize) -> &[ColorIdx] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    pub fn references(&self, palette: &Palette) -> bool {
        self.pixels.iter().all(|&p| palette.contains_index(p))
    }

    /// Maps every index back to its 5-bit color.
    pub fn expand(&self, palette: &Palette) -> Vec<Color> {
        self.pixels
            .iter()
            .map(|&p| palette.get(p).unwrap_or_default())
            .collect()
    }
}

/// Quantizes `raster` in row-major order. The quantizer keeps its state, so
/// feeding it several rasters builds one shared palette.
pub fn encode(raster: &Raster, quantizer: &mut Quantizer) -> Result<(IndexedImage, Palette)> {
    let mut pixels = Vec::with_capacity(raster.pixel_count());
    for &rgb in &raster.pixels {
        pixels.push(quantizer.observe(rgb)?);
    }
    let image = IndexedImage::new(raster.width, raster.height, pixels)?;
    Ok((image, quantizer.palette().clone()))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub name: String,
    pub palette: Palette,
    pub image: IndexedImage,
}

impl ImageAsset {
    pub fn compile(name: &str, raster: &Raster, config: QuantizerConfig) -> Result<Self> {
        info!(
            "Compiling image '{}' ({}x{})",
            name, raster.width, raster.height
        );
        let mut quantizer = Quantizer::new(config, raster.pixel_count())?;
        let (image, palette) = encode(raster, &mut quantizer)?;
        debug!(
            "'{}': {} colors of capacity {}",
            name,
            palette.len(),
            config.capacity
        );
        Ok(ImageAsset {
            name: name.to_string(),
            palette,
            image,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssetError;

    const RED_GREEN: &str = "P3\n2 1\n255\n255 0 0 0 255 0\n";

    fn capacity(capacity: usize) -> QuantizerConfig {
        QuantizerConfig {
            capacity,
            ..QuantizerConfig::image()
        }
    }

    #[test]
    fn red_then_green() {
        let raster = Raster::decode(RED_GREEN).unwrap();
        let asset = ImageAsset::compile("test", &raster, capacity(2)).unwrap();
        assert_eq!(
            asset.palette.colors,
            vec![Color::new(31, 0, 0), Color::new(0, 31, 0)]
        );
        assert_eq!(asset.image.pixels, vec![1, 2]);
    }

    #[test]
    fn red_then_green_overflows_at_half() {
        let raster = Raster::decode(RED_GREEN).unwrap();
        let err = ImageAsset::compile("test", &raster, capacity(1)).unwrap_err();
        let err = err.downcast_ref::<AssetError>().unwrap();
        assert_eq!(err.position(), Some(0.5));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn expansion_reproduces_truncated_colors() {
        let mut pixels = vec![];
        for i in 0..64u32 {
            pixels.push([(i * 37 % 256) as u8, (i * 11 % 256) as u8, (i * 5) as u8]);
        }
        let raster = Raster::new(8, 8, pixels);
        let asset = ImageAsset::compile("grid", &raster, QuantizerConfig::image()).unwrap();
        assert!(asset.image.references(&asset.palette));
        let expanded = asset.image.expand(&asset.palette);
        for (rgb, color) in raster.pixels.iter().zip(expanded) {
            assert_eq!(Color::from_rgb8(*rgb), color);
        }
    }

    #[test]
    fn encoding_is_reproducible() {
        let raster = Raster::new(
            3,
            2,
            vec![[9, 9, 9], [200, 0, 0], [9, 9, 9], [0, 0, 200], [200, 0, 0], [1, 1, 1]],
        );
        let a = ImageAsset::compile("a", &raster, QuantizerConfig::image()).unwrap();
        let b = ImageAsset::compile("a", &raster, QuantizerConfig::image()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.image.pixels, vec![1, 2, 1, 3, 2, 4]);
        assert_eq!(a.image.row(1), &[3, 2, 4]);
        assert_eq!(a.image.get(2, 0), Some(1));
        assert_eq!(a.image.get(3, 0), None);
    }
}
