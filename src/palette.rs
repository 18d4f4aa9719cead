use serde::{Deserialize, Serialize};

use crate::common::{Color, ColorIdx};

/// Colors in first-seen order. When index 0 is reserved, `first_index` is 1
/// and slot 0 of the device table holds black.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub first_index: ColorIdx,
    pub colors: Vec<Color>,
}

impl Palette {
    pub fn new(first_index: ColorIdx) -> Self {
        Palette {
            first_index,
            colors: vec![],
        }
    }

    // Number of colors assigned, excluding the reserved slot
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    // Number of device table slots, including the reserved slot
    pub fn size(&self) -> usize {
        self.first_index as usize + self.colors.len()
    }

    pub fn get(&self, idx: ColorIdx) -> Option<Color> {
        if idx < self.first_index {
            return Some(Color::BLACK);
        }
        self.colors.get((idx - self.first_index) as usize).copied()
    }

    pub fn contains_index(&self, idx: ColorIdx) -> bool {
        (idx as usize) < self.size()
    }

    /// The palette as loaded into palette RAM, one entry per index.
    pub fn table(&self) -> Vec<Color> {
        let mut table = vec![Color::BLACK; self.first_index as usize];
        table.extend_from_slice(&self.colors);
        table
    }

    pub fn words(&self) -> Vec<u16> {
        self.table().iter().map(|c| c.to_word()).collect()
    }

    pub(crate) fn push(&mut self, color: Color) -> ColorIdx {
        self.colors.push(color);
        (self.size() - 1) as ColorIdx
    }
}
