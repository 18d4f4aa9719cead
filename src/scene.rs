// Module for the per-frame scene loop: present a scene, wait for a choice, move on
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{
    common::{Color, SCREEN_HEIGHT, SCREEN_WIDTH},
    device::{Buttons, Display, Page},
    glyph::FontAsset,
    image::ImageAsset,
    layout::{Align, Point},
    palette::Palette,
    render::Renderer,
};

pub type SceneId = usize;

pub struct Scene<'a> {
    pub text: &'a str,
    pub background: Option<&'a ImageAsset>,
    pub choice_labels: Vec<&'a str>,
}

pub trait SceneSupplier {
    fn initial(&self) -> SceneId {
        0
    }

    fn scene(&self, id: SceneId) -> Scene<'_>;

    fn next(&self, id: SceneId, choice: usize) -> SceneId;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub next: SceneId,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneEntry {
    pub text: String,
    pub background: Option<usize>, // index into SceneTable::images
    pub choices: Vec<Choice>,
}

/// Static lookup table of scenes and transitions.
#[derive(Default)]
pub struct SceneTable {
    pub images: Vec<ImageAsset>,
    pub entries: Vec<SceneEntry>,
}

impl SceneSupplier for SceneTable {
    fn scene(&self, id: SceneId) -> Scene<'_> {
        match self.entries.get(id) {
            Some(entry) => Scene {
                text: &entry.text,
                background: entry.background.and_then(|i| self.images.get(i)),
                choice_labels: entry.choices.iter().map(|c| c.label.as_str()).collect(),
            },
            None => Scene {
                text: "",
                background: None,
                choice_labels: vec![],
            },
        }
    }

    // Unknown choices stay on the current scene
    fn next(&self, id: SceneId, choice: usize) -> SceneId {
        self.entries
            .get(id)
            .and_then(|e| e.choices.get(choice))
            .map_or(id, |c| c.next)
    }
}

/// Right or A picks choice 0, Left or B picks choice 1.
pub fn read_choice(buttons: Buttons) -> Option<usize> {
    if buttons.pressed(Buttons::RIGHT) || buttons.pressed(Buttons::A) {
        Some(0)
    } else if buttons.pressed(Buttons::LEFT) || buttons.pressed(Buttons::B) {
        Some(1)
    } else {
        None
    }
}

pub struct Runtime<'a, D: Display, S: SceneSupplier> {
    display: D,
    supplier: &'a S,
    renderer: Renderer<'a>,
    back: Page,
    current: SceneId,
    presented: bool,
    // A choice is only taken once all buttons have been let go
    armed: bool,
}

impl<'a, D: Display, S: SceneSupplier> Runtime<'a, D, S> {
    pub fn new(mut display: D, supplier: &'a S, font: &'a FontAsset) -> Self {
        display.wait_for_vblank();
        let back = display.swap_buffers();
        Runtime {
            display,
            supplier,
            renderer: Renderer::new(font),
            back,
            current: supplier.initial(),
            presented: false,
            armed: true,
        }
    }

    pub fn current(&self) -> SceneId {
        self.current
    }

    pub fn renderer(&self) -> &Renderer<'a> {
        &self.renderer
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// Draws the current scene into the back buffer and shows it.
    pub fn present(&mut self) {
        let scene = self.supplier.scene(self.current);
        info!("Presenting scene {}", self.current);

        let palette = match scene.background {
            Some(image) => image.palette.clone(),
            None => Palette {
                first_index: 0,
                colors: vec![Color::BLACK],
            },
        };
        self.renderer.set_palette(&palette);

        // The back page still holds the scene before last
        let covers_screen = scene
            .background
            .is_some_and(|b| b.image.width >= SCREEN_WIDTH && b.image.height >= SCREEN_HEIGHT);
        if !covers_screen {
            self.renderer.clear(&mut self.display, self.back, 0);
        }
        if let Some(image) = scene.background {
            self.renderer
                .draw_image(&mut self.display, self.back, &image.image, Point::new(0, 0));
        }
        let anchor = Point::new(SCREEN_WIDTH as i32 / 2, SCREEN_HEIGHT as i32);
        self.renderer.draw_text(
            &mut self.display,
            self.back,
            scene.text,
            anchor,
            Align::Middle,
            Align::End,
        );

        self.display.wait_for_vblank();
        self.renderer.upload_palette(&mut self.display);
        self.back = self.display.swap_buffers();
        self.presented = true;
    }

    /// One frame: present if the scene changed, then poll for a choice.
    /// Returns the new scene when a transition happened.
    pub fn tick(&mut self) -> Option<SceneId> {
        if !self.presented {
            self.present();
        }
        self.display.wait_for_vblank();
        let buttons = self.display.read_buttons();
        if !buttons.any_pressed() {
            self.armed = true;
            return None;
        }
        if !self.armed {
            return None;
        }
        let choice = read_choice(buttons)?;
        self.armed = false;
        let next = self.supplier.next(self.current, choice);
        debug!("Choice {} in scene {} -> {}", choice, self.current, next);
        self.current = next;
        self.presented = false;
        Some(next)
    }

    pub fn run(&mut self) -> ! {
        loop {
            self.tick();
        }
    }
}
