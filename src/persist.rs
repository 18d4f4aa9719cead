use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use json_pretty_compact::PrettyCompactFormatter;
use log::info;
use png::{BitDepth, ColorType};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Serializer;

use crate::{
    artifact::Artifacts,
    common::{SCREEN_HEIGHT, SCREEN_WIDTH},
    device::MemoryDisplay,
    error::AssetError,
    image::IndexedImage,
    palette::Palette,
};

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> AssetError + '_ {
    move |source| AssetError::Io {
        path: path.to_owned(),
        source,
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_error(dir))?;
    }
    Ok(())
}

pub fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    info!("Saving {}", path.display());
    let formatter = PrettyCompactFormatter::new();
    let mut data_bytes = vec![];
    let mut ser = Serializer::with_formatter(&mut data_bytes, formatter);
    data.serialize(&mut ser)
        .with_context(|| format!("serializing {}", path.display()))?;
    create_parent(path)?;
    fs::write(path, &data_bytes).map_err(io_error(path))?;
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    info!("Loading {}", path.display());
    let data_bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let data: T = serde_json::from_slice(&data_bytes)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(data)
}

/// Writes `{name}.h` and `{name}.c` into `dir`, returning both paths.
pub fn write_artifacts(dir: &Path, name: &str, artifacts: &Artifacts) -> Result<[PathBuf; 2]> {
    fs::create_dir_all(dir).map_err(io_error(dir))?;
    let header = dir.join(format!("{}.h", name));
    let source = dir.join(format!("{}.c", name));
    for (path, text) in [
        (&header, &artifacts.declarations),
        (&source, &artifacts.definitions),
    ] {
        info!("Writing {}", path.display());
        fs::write(path, text).map_err(io_error(path))?;
    }
    Ok([header, source])
}

fn write_png(
    path: &Path,
    width: usize,
    height: usize,
    color: ColorType,
    palette: Option<Vec<u8>>,
    data: &[u8],
) -> Result<()> {
    create_parent(path)?;
    let file = File::create(path).map_err(io_error(path))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width as u32, height as u32);
    encoder.set_color(color);
    encoder.set_depth(BitDepth::Eight);
    if let Some(palette) = palette {
        encoder.set_palette(palette);
    }
    let mut writer = encoder.write_header()?;
    writer.write_image_data(data)?;
    writer.finish()?;
    Ok(())
}

/// Saves an indexed image as an indexed PNG carrying the palette table.
pub fn save_png(path: &Path, image: &IndexedImage, palette: &Palette) -> Result<()> {
    info!("Saving {}", path.display());
    let mut table: Vec<u8> = palette
        .table()
        .iter()
        .flat_map(|c| c.to_rgb8())
        .collect();
    // Every pixel needs a palette entry
    let max_index = image.pixels.iter().copied().max().unwrap_or(0) as usize;
    table.resize(table.len().max((max_index + 1) * 3), 0);
    write_png(
        path,
        image.width,
        image.height,
        ColorType::Indexed,
        Some(table),
        &image.pixels,
    )
}

/// Saves the page currently shown by `display` as an RGB PNG.
pub fn save_screen_png(path: &Path, display: &MemoryDisplay) -> Result<()> {
    info!("Saving {}", path.display());
    let data: Vec<u8> = display
        .visible_colors()
        .iter()
        .flat_map(|c| c.to_rgb8())
        .collect();
    write_png(path, SCREEN_WIDTH, SCREEN_HEIGHT, ColorType::Rgb, None, &data)
}
