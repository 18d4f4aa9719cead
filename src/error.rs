// Module for the compiler's error kinds and their exit codes

use std::path::PathBuf;

use crate::helpers::percent;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Usage,
    Format,
    Capacity,
    Io,
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("invalid settings: {0}")]
    Usage(String),

    #[error("input image must be in '{expected}' Netpbm format, found '{found}'")]
    BadMagic {
        expected: &'static str,
        found: String,
    },

    #[error("input image must have bit depth {expected}, found {found}")]
    BadDepth { expected: u32, found: String },

    #[error("malformed {what}: {detail}")]
    Malformed { what: &'static str, detail: String },

    #[error("ran out of palette at {:.6}% (capacity {capacity})", overflow_percent(.processed, .total))]
    Capacity {
        capacity: usize,
        processed: usize,
        total: usize,
    },

    #[error("cannot write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AssetError {
    pub fn malformed(what: &'static str, detail: impl Into<String>) -> Self {
        AssetError::Malformed {
            what,
            detail: detail.into(),
        }
    }

    /// Wraps a rejected flag or configuration value.
    pub fn usage(err: &anyhow::Error) -> Self {
        AssetError::Usage(format!("{:#}", err))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AssetError::Usage(_) => ErrorKind::Usage,
            AssetError::BadMagic { .. }
            | AssetError::BadDepth { .. }
            | AssetError::Malformed { .. } => ErrorKind::Format,
            AssetError::Capacity { .. } => ErrorKind::Capacity,
            AssetError::Io { .. } => ErrorKind::Io,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AssetError::Usage(_) => 1,
            AssetError::BadMagic { .. } => 2,
            AssetError::BadDepth { .. } => 3,
            AssetError::Capacity { .. } => 4,
            AssetError::Malformed { .. } => 5,
            AssetError::Io { .. } => 6,
        }
    }

    /// Fraction of the pixel stream consumed when the palette overflowed.
    pub fn position(&self) -> Option<f64> {
        match self {
            AssetError::Capacity {
                processed, total, ..
            } => Some(percent(*processed, *total) / 100.0),
            _ => None,
        }
    }
}

fn overflow_percent(processed: &usize, total: &usize) -> f64 {
    percent(*processed, *total)
}

/// Exit code for any error reaching the top of a binary.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(e) = err.downcast_ref::<AssetError>() {
        e.exit_code()
    } else if err.downcast_ref::<std::io::Error>().is_some() {
        6
    } else {
        5
    }
}
