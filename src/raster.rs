// Module for reading and writing plain-text 'P3' Netpbm images
use std::io::Read;

use anyhow::{Context, Result};
use itertools::Itertools;

use crate::{common::Rgb8, error::AssetError};

pub const MAGIC: &str = "P3";
pub const MAX_VALUE: u32 = 255;

/// A decoded RGB image, pixels in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Rgb8>,
}

// Whitespace-separated tokens, with '#' comments running to end of line.
struct Tokens<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        loop {
            self.rest = self.rest.trim_start();
            if self.rest.starts_with('#') {
                let end = self.rest.find('\n').unwrap_or(self.rest.len());
                self.rest = &self.rest[end..];
                continue;
            }
            if self.rest.is_empty() {
                return None;
            }
            let end = self
                .rest
                .find(|c: char| c.is_whitespace() || c == '#')
                .unwrap_or(self.rest.len());
            let (token, rest) = self.rest.split_at(end);
            self.rest = rest;
            return Some(token);
        }
    }
}

fn parse_number(token: Option<&str>, what: &'static str) -> Result<u32> {
    let token = token.ok_or_else(|| AssetError::malformed("P3 image", format!("missing {what}")))?;
    let value = token
        .parse::<u32>()
        .map_err(|_| AssetError::malformed("P3 image", format!("invalid {what} '{token}'")))?;
    Ok(value)
}

impl Raster {
    pub fn new(width: usize, height: usize, pixels: Vec<Rgb8>) -> Self {
        debug_assert_eq!(pixels.len(), width * height);
        Raster {
            width,
            height,
            pixels,
        }
    }

    pub fn decode(text: &str) -> Result<Self> {
        let mut tokens = Tokens { rest: text };

        let magic = tokens.next().unwrap_or_default();
        if magic != MAGIC {
            return Err(AssetError::BadMagic {
                expected: MAGIC,
                found: magic.to_string(),
            }
            .into());
        }

        let width = parse_number(tokens.next(), "width")? as usize;
        let height = parse_number(tokens.next(), "height")? as usize;
        let depth = tokens.next().unwrap_or_default();
        if depth.parse::<u32>().ok() != Some(MAX_VALUE) {
            return Err(AssetError::BadDepth {
                expected: MAX_VALUE,
                found: depth.to_string(),
            }
            .into());
        }
        if width == 0 || height == 0 {
            return Err(
                AssetError::malformed("P3 image", format!("empty image {width}x{height}")).into(),
            );
        }

        let total = width.checked_mul(height).ok_or_else(|| {
            AssetError::malformed("P3 image", format!("image size {width}x{height} overflows"))
        })?;
        // At least two bytes per sample, so the text bounds what can follow
        let mut pixels = Vec::with_capacity(total.min(text.len() / 6));
        for i in 0..total {
            let mut rgb: Rgb8 = [0; 3];
            for c in &mut rgb {
                let value = parse_number(tokens.next(), "sample").with_context(|| {
                    format!("pixel {} of {} (x={}, y={})", i, total, i % width, i / width)
                })?;
                if value > MAX_VALUE {
                    return Err(AssetError::malformed(
                        "P3 image",
                        format!("sample {value} out of range at pixel {i}"),
                    )
                    .into());
                }
                *c = value as u8;
            }
            pixels.push(rgb);
        }

        Ok(Raster {
            width,
            height,
            pixels,
        })
    }

    pub fn read_from(mut reader: impl Read) -> Result<Self> {
        let mut bytes = vec![];
        reader.read_to_end(&mut bytes).context("reading P3 image")?;
        let text = String::from_utf8(bytes)
            .map_err(|e| AssetError::malformed("P3 image", format!("not text: {e}")))?;
        Self::decode(&text)
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len()
    }

    pub fn encode(&self) -> String {
        let mut out = format!("{}\n{} {}\n{}\n", MAGIC, self.width, self.height, MAX_VALUE);
        for row in self.pixels.chunks(self.width.max(1)) {
            let line = row
                .iter()
                .map(|[r, g, b]| format!("{r} {g} {b}"))
                .join(" ");
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn asset_error(r: Result<Raster>) -> AssetError {
        r.unwrap_err()
            .downcast::<AssetError>()
            .expect("asset error")
    }

    #[test]
    fn decode_two_pixels() {
        let raster = Raster::decode("P3\n2 1\n255\n255 0 0 0 255 0\n").unwrap();
        assert_eq!(raster.width, 2);
        assert_eq!(raster.height, 1);
        assert_eq!(raster.pixels, vec![[255, 0, 0], [0, 255, 0]]);
    }

    #[test]
    fn comments_are_skipped() {
        let text = "P3\n# created by hand\n1 2 # size\n255\n1 2 3\n#mid\n4 5 6";
        let raster = Raster::decode(text).unwrap();
        assert_eq!(raster.pixels, vec![[1, 2, 3], [4, 5, 6]]);
    }

    #[test]
    fn rejects_wrong_magic() {
        let e = asset_error(Raster::decode("P6\n1 1\n255\n0 0 0\n"));
        assert!(matches!(e, AssetError::BadMagic { ref found, .. } if found == "P6"));
        assert_eq!(e.exit_code(), 2);

        let e = asset_error(Raster::decode(""));
        assert_eq!(e.exit_code(), 2);
    }

    #[test]
    fn rejects_wrong_depth() {
        let e = asset_error(Raster::decode("P3\n1 1\n65535\n0 0 0\n"));
        assert_eq!(e.to_string(), "input image must have bit depth 255, found 65535");
        assert_eq!(e.exit_code(), 3);
    }

    #[test]
    fn rejects_truncated_data() {
        let e = asset_error(Raster::decode("P3\n2 1\n255\n255 0 0 0 255\n"));
        assert_eq!(e.kind(), ErrorKind::Format);
    }

    #[test]
    fn rejects_out_of_range_sample() {
        let e = asset_error(Raster::decode("P3\n1 1\n255\n256 0 0\n"));
        assert_eq!(e.kind(), ErrorKind::Format);
    }

    #[test]
    fn oversized_header_is_truncated_data() {
        let e = asset_error(Raster::decode("P3\n4000000000 4000000000\n255\n0 0 0\n"));
        assert_eq!(e.exit_code(), 5);
        let e = asset_error(Raster::decode("P3\n65536 65536\n255\n0 0 0\n"));
        assert_eq!(e.kind(), ErrorKind::Format);
    }

    #[test]
    fn binary_input_is_malformed() {
        let bytes: &[u8] = b"P3\n1 1\n255\n\xff\xfe 0 0\n";
        let e = asset_error(Raster::read_from(bytes));
        assert_eq!(e.exit_code(), 5);
        assert_eq!(e.kind(), ErrorKind::Format);
    }

    #[test]
    fn encode_then_decode() {
        let raster = Raster::new(2, 2, vec![[0, 0, 0], [8, 16, 24], [255, 255, 255], [1, 2, 3]]);
        let text = raster.encode();
        assert!(text.starts_with("P3\n2 2\n255\n0 0 0 8 16 24\n"));
        assert_eq!(Raster::decode(&text).unwrap(), raster);
    }
}
