// Module for reducing RGB pixel streams to a bounded, insertion-ordered palette
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::{
    common::{Color, ColorIdx, Rgb8, COLOR_KEY_SPACE},
    error::AssetError,
    palette::Palette,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizerConfig {
    // Maximum number of distinct colors, not counting a reserved index 0
    pub capacity: usize,
    // Index 0 is a sentinel and assignment starts at 1
    pub reserve_zero: bool,
    // With reserve_zero, black maps to index 0 without using capacity
    pub black_is_background: bool,
}

impl QuantizerConfig {
    pub const fn image() -> Self {
        QuantizerConfig {
            capacity: 255,
            reserve_zero: true,
            black_is_background: false,
        }
    }

    pub const fn font() -> Self {
        QuantizerConfig {
            capacity: 3,
            reserve_zero: true,
            black_is_background: true,
        }
    }

    pub fn first_index(&self) -> ColorIdx {
        self.reserve_zero as ColorIdx
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.capacity > 0, "palette capacity must be at least 1");
        ensure!(
            self.capacity + self.first_index() as usize <= 256,
            "palette capacity {} does not fit 8-bit indices (max {})",
            self.capacity,
            256 - self.first_index() as usize
        );
        ensure!(
            self.reserve_zero || !self.black_is_background,
            "black_is_background requires reserve_zero"
        );
        Ok(())
    }
}

impl Default for QuantizerConfig {
    fn default() -> Self {
        Self::image()
    }
}

pub struct Quantizer {
    config: QuantizerConfig,
    // Direct-indexed over every 15-bit key
    table: Box<[Option<ColorIdx>]>,
    palette: Palette,
    processed: usize,
    total: usize,
}

impl Quantizer {
    /// `total` is the number of pixels the caller intends to feed, used to
    /// report where an overflow happened.
    pub fn new(config: QuantizerConfig, total: usize) -> Result<Self> {
        config.validate()?;
        let mut table = vec![None; COLOR_KEY_SPACE].into_boxed_slice();
        if config.black_is_background {
            table[Color::BLACK.key()] = Some(0);
        }
        Ok(Quantizer {
            config,
            table,
            palette: Palette::new(config.first_index()),
            processed: 0,
            total,
        })
    }

    pub fn observe(&mut self, rgb: Rgb8) -> Result<ColorIdx> {
        self.observe_color(Color::from_rgb8(rgb))
    }

    pub fn observe_color(&mut self, color: Color) -> Result<ColorIdx> {
        let key = color.key();
        let idx = match self.table[key] {
            Some(idx) => idx,
            None => {
                if self.palette.len() >= self.config.capacity {
                    return Err(AssetError::Capacity {
                        capacity: self.config.capacity,
                        processed: self.processed,
                        total: self.total.max(self.processed + 1),
                    }
                    .into());
                }
                let idx = self.palette.push(color);
                self.table[key] = Some(idx);
                idx
            }
        };
        self.processed += 1;
        Ok(idx)
    }

    pub fn lookup(&self, color: Color) -> Option<ColorIdx> {
        self.table[color.key()]
    }

    pub fn config(&self) -> &QuantizerConfig {
        &self.config
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn into_palette(self) -> Palette {
        self.palette
    }
}
