use serde::{Deserialize, Serialize};

use crate::helpers::scale_color;

pub type ColorValue = u8; // Color value (0-31)
pub type ColorIdx = u8; // Index into a palette (0-255)
pub type Rgb8 = [u8; 3]; // Full-precision source color (0-255 per channel)

// Mode 4 screen dimensions
pub const SCREEN_WIDTH: usize = 240;
pub const SCREEN_HEIGHT: usize = 160;

pub const FIRST_PRINTABLE: char = ' ';
pub const LAST_PRINTABLE: char = '~';
pub const GLYPH_COUNT: usize = 95;

// Number of distinct 15-bit colors
pub const COLOR_KEY_SPACE: usize = 1 << 15;

/// A 5-bit-per-channel color. The hardware word layout has red in the low
/// bits: `0bbbbbgggggrrrrr`.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[ColorValue; 3]", into = "[ColorValue; 3]")]
pub struct Color {
    pub red: ColorValue,
    pub green: ColorValue,
    pub blue: ColorValue,
}

impl Color {
    pub const BLACK: Color = Color {
        red: 0,
        green: 0,
        blue: 0,
    };

    pub const fn new(red: ColorValue, green: ColorValue, blue: ColorValue) -> Self {
        Color {
            red: red & 31,
            green: green & 31,
            blue: blue & 31,
        }
    }

    /// Truncates each 8-bit channel to its top 5 bits.
    pub const fn from_rgb8(rgb: Rgb8) -> Self {
        Color {
            red: rgb[0] >> 3,
            green: rgb[1] >> 3,
            blue: rgb[2] >> 3,
        }
    }

    pub const fn from_word(w: u16) -> Self {
        Color {
            red: (w & 31) as u8,
            green: ((w >> 5) & 31) as u8,
            blue: ((w >> 10) & 31) as u8,
        }
    }

    pub const fn to_word(self) -> u16 {
        (self.blue as u16) << 10 | (self.green as u16) << 5 | self.red as u16
    }

    // Index into a table covering the full 15-bit color space
    pub const fn key(self) -> usize {
        self.to_word() as usize
    }

    pub fn to_rgb8(self) -> Rgb8 {
        [
            scale_color(self.red),
            scale_color(self.green),
            scale_color(self.blue),
        ]
    }

    /// Manhattan distance in 5-bit space.
    pub fn distance(self, other: Color) -> u32 {
        self.red.abs_diff(other.red) as u32
            + self.green.abs_diff(other.green) as u32
            + self.blue.abs_diff(other.blue) as u32
    }
}

impl From<[ColorValue; 3]> for Color {
    fn from(c: [ColorValue; 3]) -> Self {
        Color::new(c[0], c[1], c[2])
    }
}

impl From<Color> for [ColorValue; 3] {
    fn from(c: Color) -> Self {
        [c.red, c.green, c.blue]
    }
}

/// Slot of a printable ASCII character in the 95-entry font tables.
pub fn glyph_slot(ch: char) -> Option<usize> {
    if (FIRST_PRINTABLE..=LAST_PRINTABLE).contains(&ch) {
        Some(ch as usize - FIRST_PRINTABLE as usize)
    } else {
        None
    }
}

pub fn slot_char(slot: usize) -> char {
    (FIRST_PRINTABLE as u8 + slot as u8) as char
}
