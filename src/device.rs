// Module for the display device: hardware behind `Display`, plus a mode-4 page model in memory

use crate::common::{Color, ColorIdx, SCREEN_HEIGHT, SCREEN_WIDTH};

pub const PAGE_WORDS: usize = SCREEN_WIDTH * SCREEN_HEIGHT / 2;

// Scanlines per frame, including the vertical blank
const TOTAL_LINES: u16 = 228;

/// One of the two framebuffers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Page {
    Front,
    Back,
}

impl Page {
    pub fn other(self) -> Page {
        match self {
            Page::Front => Page::Back,
            Page::Back => Page::Front,
        }
    }

    fn slot(self) -> usize {
        match self {
            Page::Front => 0,
            Page::Back => 1,
        }
    }
}

/// Button register snapshot. The register is active-low: a clear bit means
/// the button is held.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Buttons(pub u16);

impl Buttons {
    pub const A: u16 = 0x001;
    pub const B: u16 = 0x002;
    pub const SELECT: u16 = 0x004;
    pub const START: u16 = 0x008;
    pub const RIGHT: u16 = 0x010;
    pub const LEFT: u16 = 0x020;
    pub const UP: u16 = 0x040;
    pub const DOWN: u16 = 0x080;
    pub const R: u16 = 0x100;
    pub const L: u16 = 0x200;
    pub const ALL: u16 = 0x3FF;

    pub const RELEASED: Buttons = Buttons(Self::ALL);

    pub fn from_held(mask: u16) -> Self {
        Buttons(!mask & Self::ALL)
    }

    pub fn pressed(self, button: u16) -> bool {
        self.0 & button == 0
    }

    pub fn any_pressed(self) -> bool {
        self.0 & Self::ALL != Self::ALL
    }
}

impl Default for Buttons {
    fn default() -> Self {
        Self::RELEASED
    }
}

pub trait Display {
    /// Blocks until the visible frame has been scanned out.
    fn wait_for_vblank(&mut self);

    fn read_buttons(&mut self) -> Buttons;

    fn write_indexed_pixel(&mut self, page: Page, row: usize, col: usize, index: ColorIdx);

    /// Shows the other page and returns the new back buffer.
    fn swap_buffers(&mut self) -> Page;

    fn write_palette_entry(&mut self, index: ColorIdx, color: Color) -> ColorIdx;
}

pub struct MemoryDisplay {
    pages: [Vec<u16>; 2],
    palette: [u16; 256],
    displayed: Page,
    scanline: u16,
    held: u16,
    pub frames: u64,
    // Pixel writes that landed on the page being shown
    pub displayed_writes: u64,
}

impl MemoryDisplay {
    pub fn new() -> Self {
        MemoryDisplay {
            pages: [vec![0; PAGE_WORDS], vec![0; PAGE_WORDS]],
            palette: [0; 256],
            displayed: Page::Front,
            scanline: 0,
            held: 0,
            frames: 0,
            displayed_writes: 0,
        }
    }

    pub fn hold(&mut self, mask: u16) {
        self.held |= mask & Buttons::ALL;
    }

    pub fn release(&mut self, mask: u16) {
        self.held &= !mask;
    }

    pub fn displayed(&self) -> Page {
        self.displayed
    }

    pub fn pixel(&self, page: Page, row: usize, col: usize) -> ColorIdx {
        let word = self.pages[page.slot()][(row * SCREEN_WIDTH + col) >> 1];
        if col & 1 == 1 {
            (word >> 8) as ColorIdx
        } else {
            (word & 0xFF) as ColorIdx
        }
    }

    pub fn palette_color(&self, index: ColorIdx) -> Color {
        Color::from_word(self.palette[index as usize])
    }

    /// The visible page with palette RAM applied, row-major.
    pub fn visible_colors(&self) -> Vec<Color> {
        let mut out = Vec::with_capacity(SCREEN_WIDTH * SCREEN_HEIGHT);
        for row in 0..SCREEN_HEIGHT {
            for col in 0..SCREEN_WIDTH {
                out.push(self.palette_color(self.pixel(self.displayed, row, col)));
            }
        }
        out
    }

    fn advance_scanline(&mut self) {
        self.scanline += 1;
        if self.scanline >= TOTAL_LINES {
            self.scanline = 0;
        }
    }
}

impl Default for MemoryDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for MemoryDisplay {
    fn wait_for_vblank(&mut self) {
        // Let the current blank end, then run to the next one
        while self.scanline >= SCREEN_HEIGHT as u16 {
            self.advance_scanline();
        }
        while self.scanline < SCREEN_HEIGHT as u16 {
            self.advance_scanline();
        }
        self.frames += 1;
    }

    fn read_buttons(&mut self) -> Buttons {
        Buttons::from_held(self.held)
    }

    fn write_indexed_pixel(&mut self, page: Page, row: usize, col: usize, index: ColorIdx) {
        if row >= SCREEN_HEIGHT || col >= SCREEN_WIDTH {
            return;
        }
        if page == self.displayed {
            self.displayed_writes += 1;
        }
        let offset = (row * SCREEN_WIDTH + col) >> 1;
        let word = &mut self.pages[page.slot()][offset];
        if col & 1 == 1 {
            *word = (index as u16) << 8 | (*word & 0x00FF);
        } else {
            *word = (*word & 0xFF00) | index as u16;
        }
    }

    fn swap_buffers(&mut self) -> Page {
        let back = self.displayed;
        self.displayed = self.displayed.other();
        back
    }

    fn write_palette_entry(&mut self, index: ColorIdx, color: Color) -> ColorIdx {
        self.palette[index as usize] = color.to_word();
        index
    }
}
