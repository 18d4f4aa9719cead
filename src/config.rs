use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};

use crate::{common::ColorIdx, error::AssetError, persist, quantize::QuantizerConfig};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    pub quantizer: QuantizerConfig,
    // Guide-row index marking a glyph boundary
    pub marker_index: ColorIdx,
}

impl Default for FontConfig {
    fn default() -> Self {
        FontConfig {
            quantizer: QuantizerConfig::font(),
            marker_index: 1,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub image: QuantizerConfig,
    pub font: FontConfig,
    pub out_dir: Option<PathBuf>,
}

pub fn get_global_config_path() -> Result<PathBuf> {
    let project_dirs = directories::ProjectDirs::from("", "", "GbaAssets")
        .context("Unable to open global config directory.")?;
    let config_dir = project_dirs.config_dir();
    let config_path = config_dir.join("config.json");
    Ok(config_path)
}

// A file that cannot be read stays an I/O error; a file with bad contents is a
// usage error
fn read_config(path: &Path) -> Result<CompilerConfig> {
    persist::load_json(path).map_err(|e| {
        if e.downcast_ref::<std::io::Error>().is_some() {
            e
        } else {
            AssetError::usage(&e).into()
        }
    })
}

impl CompilerConfig {
    /// Loads `path` if given, else the global config file if it exists, else
    /// the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config: CompilerConfig = match path {
            Some(p) => read_config(p)?,
            None => match get_global_config_path() {
                Ok(p) if p.exists() => read_config(&p)?,
                _ => {
                    info!("Using default configuration");
                    CompilerConfig::default()
                }
            },
        };
        config
            .image
            .validate()
            .context("image")
            .map_err(|e| AssetError::usage(&e))?;
        config
            .font
            .quantizer
            .validate()
            .context("font")
            .map_err(|e| AssetError::usage(&e))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        persist::save_json(path, self)
    }
}
