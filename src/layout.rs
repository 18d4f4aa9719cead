// Module for positioning variable-width glyphs with alignment and line breaks
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::glyph::GlyphMetrics;

// Blank column after every glyph
pub const GLYPH_SPACING: i32 = 1;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Align {
    #[default]
    Begin = 0,
    Middle = 1,
    End = 2,
}

impl Align {
    // How far the start moves back from the anchor for a block of this extent
    fn offset(self, extent: i32) -> i32 {
        match self {
            Align::Begin => 0,
            Align::Middle => extent / 2,
            Align::End => extent,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub ch: char,
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub anchor: Point,
    pub halign: Align,
    pub valign: Align,
}

impl TextRun {
    pub fn layout(&self, metrics: &GlyphMetrics) -> Vec<Placement> {
        layout(&self.text, self.anchor, self.halign, self.valign, metrics)
    }
}

/// Horizontal advance of one character. Used both to measure lines and to
/// step the cursor, so the two always agree.
pub fn advance(ch: char, metrics: &GlyphMetrics) -> i32 {
    match metrics.width(ch) {
        Some(w) => w as i32 + GLYPH_SPACING,
        None => 0,
    }
}

pub fn count_lines(text: &str) -> usize {
    if text.is_empty() {
        0
    } else {
        text.split('\n').count()
    }
}

pub fn measure_line(line: &str, metrics: &GlyphMetrics) -> i32 {
    line.chars().map(|ch| advance(ch, metrics)).sum()
}

pub fn block_height(text: &str, metrics: &GlyphMetrics) -> i32 {
    metrics.height() as i32 * count_lines(text) as i32
}

pub fn layout(
    text: &str,
    anchor: Point,
    halign: Align,
    valign: Align,
    metrics: &GlyphMetrics,
) -> Vec<Placement> {
    let mut placements = vec![];
    if text.is_empty() {
        return placements;
    }
    let line_height = metrics.height() as i32;
    let mut y = anchor.y - valign.offset(block_height(text, metrics));
    for line in text.split('\n') {
        let mut x = anchor.x - halign.offset(measure_line(line, metrics));
        for ch in line.chars() {
            if metrics.width(ch).is_none() {
                continue;
            }
            placements.push(Placement { ch, x, y });
            x += advance(ch, metrics);
        }
        y += line_height;
    }
    placements
}
