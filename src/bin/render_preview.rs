use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use gba_assets::{
    config::CompilerConfig,
    device::MemoryDisplay,
    error::exit_code,
    glyph::FontAsset,
    image::ImageAsset,
    persist::save_screen_png,
    raster::Raster,
    scene::{Runtime, SceneEntry, SceneTable},
};

/// Renders a background and a line of text the way the device would, and
/// saves the visible screen as PNG
#[derive(Parser, Debug)]
#[command(name = "render_preview", version, about)]
struct Args {
    /// Font sheet (P3)
    #[arg(long)]
    font: PathBuf,

    /// Background image (P3); the screen is cleared without one
    #[arg(long)]
    image: Option<PathBuf>,

    /// Text drawn at the bottom of the screen; "\n" breaks lines
    #[arg(long, default_value = "")]
    text: String,

    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "preview.png")]
    out: PathBuf,
}

fn read_raster(path: &Path) -> Result<Raster> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Raster::decode(&text).with_context(|| format!("in {}", path.display()))
}

fn run(args: Args) -> Result<()> {
    let config = CompilerConfig::load(args.config.as_deref())?;
    let font = FontAsset::compile("font", &read_raster(&args.font)?, &config.font)?;

    let mut table = SceneTable::default();
    let background = match &args.image {
        Some(path) => {
            let image = ImageAsset::compile("background", &read_raster(path)?, config.image)?;
            table.images.push(image);
            Some(0)
        }
        None => None,
    };
    table.entries.push(SceneEntry {
        text: args.text.replace("\\n", "\n"),
        background,
        choices: vec![],
    });

    let mut runtime = Runtime::new(MemoryDisplay::new(), &table, &font);
    runtime.present();
    info!("Rendered {} frames", runtime.display().frames);
    save_screen_png(&args.out, runtime.display())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}
