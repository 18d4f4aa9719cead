pub mod artifact;
pub mod common;
pub mod config;
pub mod device;
pub mod error;
pub mod glyph;
pub mod helpers;
pub mod image;
pub mod layout;
pub mod palette;
pub mod persist;
pub mod quantize;
pub mod raster;
pub mod remap;
pub mod render;
pub mod scene;
