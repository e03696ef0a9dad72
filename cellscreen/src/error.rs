//! Error types for the screen pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::quantification::Region;

/// Errors produced by well addressing, segmentation, quantification and
/// the report/merge steps.
///
/// The plate driver absorbs the per-position kinds (`MissingFile`,
/// `ImageDecode`, `UnsupportedImage`, `DimensionMismatch`,
/// `MalformedFilename`, `MissingRegion`) and skips the position. The rest
/// abort the command.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid well ID '{0}': expected one letter followed by a column number")]
    InvalidWellId(String),

    #[error("Well number {number} outside plate of {wells} wells")]
    WellNumberOutOfRange { number: u32, wells: u32 },

    #[error("Unsupported conversion method '{0}'")]
    UnsupportedConversionMethod(String),

    #[error("Malformed image file name '{name}': {reason}")]
    MalformedFilename { name: String, reason: String },

    #[error("{region} mask has no pixels")]
    MissingRegion { region: Region },

    #[error("Failed to open image '{path}': {source}")]
    MissingFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to decode image '{path}': {reason}")]
    ImageDecode { path: PathBuf, reason: String },

    #[error("Unsupported image '{path}': {reason}")]
    UnsupportedImage { path: PathBuf, reason: String },

    #[error("Image '{path}' is {actual:?} but masks are {expected:?}")]
    DimensionMismatch {
        path: PathBuf,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Malformed strain code '{0}': expected plate digits, row letters and column digits")]
    MalformedStrainCode(String),

    #[error("Table '{path}' has no '{column}' column")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Malformed table '{path}' line {line}: {reason}")]
    MalformedTable {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether the driver should log and skip the position instead of
    /// aborting the plate.
    pub fn is_position_skip(&self) -> bool {
        matches!(
            self,
            Error::MissingFile { .. }
                | Error::ImageDecode { .. }
                | Error::UnsupportedImage { .. }
                | Error::DimensionMismatch { .. }
                | Error::MalformedFilename { .. }
                | Error::MissingRegion { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
