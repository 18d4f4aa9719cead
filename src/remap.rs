// Module for matching a fixed reference palette (the font's) against the
// palette of the current scene
use hashbrown::{hash_map::Entry, HashMap};
use log::warn;

use crate::common::{Color, ColorIdx};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RemapOptions {
    // Reference index 0 is transparent: not searched, maps to 0
    pub keep_zero: bool,
    // Lowest destination index the search may pick
    pub first_candidate: usize,
}

impl Default for RemapOptions {
    fn default() -> Self {
        RemapOptions {
            keep_zero: true,
            first_candidate: 0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColorRemapTable {
    entries: Vec<ColorIdx>,
}

impl ColorRemapTable {
    pub fn from_entries(entries: Vec<ColorIdx>) -> Self {
        ColorRemapTable { entries }
    }

    // Indices outside the reference palette map to 0
    pub fn get(&self, idx: ColorIdx) -> ColorIdx {
        self.entries.get(idx as usize).copied().unwrap_or(0)
    }

    pub fn entries(&self) -> &[ColorIdx] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Index of the destination color closest to `color`. The first minimum wins.
pub fn nearest(color: Color, destination: &[Color], first_candidate: usize) -> Option<ColorIdx> {
    let mut best: Option<(usize, u32)> = None;
    for (i, &c) in destination.iter().enumerate().skip(first_candidate) {
        let d = color.distance(c);
        if best.map_or(true, |(_, best_d)| d < best_d) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i as ColorIdx)
}

/// `reference` and `destination` are palette tables as loaded into palette
/// RAM (slot i holds index i).
pub fn remap(reference: &[Color], destination: &[Color], options: RemapOptions) -> ColorRemapTable {
    let entries = reference
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            if i == 0 && options.keep_zero {
                0
            } else {
                nearest(c, destination, options.first_candidate).unwrap_or(0)
            }
        })
        .collect();
    ColorRemapTable { entries }
}

/// Forces distinct reference colors that landed on the same destination index
/// apart, moving the later one to a neighbouring index. Neighbours not yet
/// claimed by another color are preferred.
pub fn disambiguate(
    table: &mut ColorRemapTable,
    reference: &[Color],
    destination_len: usize,
    options: RemapOptions,
) {
    let lo = options.first_candidate;
    let start = options.keep_zero as usize;
    let mut owner: HashMap<ColorIdx, Color> = HashMap::new();
    for i in start..table.entries.len().min(reference.len()) {
        let color = reference[i];
        let target = table.entries[i];
        match owner.entry(target) {
            Entry::Vacant(e) => {
                e.insert(color);
                continue;
            }
            Entry::Occupied(e) if *e.get() == color => continue,
            Entry::Occupied(_) => {}
        }

        let t = target as usize;
        let neighbours: Vec<usize> = [t.checked_add(1), t.checked_sub(1)]
            .into_iter()
            .flatten()
            .filter(|&n| n >= lo && n < destination_len && n <= ColorIdx::MAX as usize)
            .collect();
        let free = neighbours
            .iter()
            .copied()
            .find(|&n| !owner.contains_key(&(n as ColorIdx)));
        let Some(moved) = free.or(neighbours.first().copied()) else {
            warn!(
                "Reference color {} shares destination index {} with no neighbour to move to",
                i, target
            );
            continue;
        };
        warn!(
            "Reference colors collide at destination index {}; moving color {} to {}",
            target, i, moved
        );
        table.entries[i] = moved as ColorIdx;
        owner.entry(moved as ColorIdx).or_insert(color);
    }
}
