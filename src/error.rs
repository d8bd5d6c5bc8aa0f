use std::path::PathBuf;

use thiserror::Error;

use crate::data::model::Dimensions;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Everything that can go wrong while turning a raw file pair into examples.
///
/// Configuration and format errors surface from [`crate::preprocess`] itself.
/// Stream-consistency errors (`EmptyClassifierDomain`, `UnknownLabel`,
/// `InsufficientData`, `RowWidthMismatch`, `InvalidCell`) only show up as
/// `Err` items once the example stream is pulled.
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("window must be a positive odd integer, got {window}")]
    InvalidWindow { window: usize },

    #[error("input file does not exist: {}", path.display())]
    MissingInputFile { path: PathBuf },

    #[error(
        "dimension mismatch: {} is {input_dims} but {} is {alpha_dims}",
        input.display(),
        alpha.display()
    )]
    DimensionMismatch {
        input: PathBuf,
        input_dims: Dimensions,
        alpha: PathBuf,
        alpha_dims: Dimensions,
    },

    #[error("{}: malformed header {line:?}, expected \"<width> <height>\"", path.display())]
    MalformedHeader { path: PathBuf, line: String },

    #[error("{}: expected {expected} samples after the header, found {actual}", path.display())]
    TruncatedData {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("{}: need at least {window} rows for a window, found {rows}", path.display())]
    InsufficientData {
        path: PathBuf,
        window: usize,
        rows: usize,
    },

    #[error("{}: row {row} has {actual} cells, expected {expected}", path.display())]
    RowWidthMismatch {
        path: PathBuf,
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("{}: row {row}: '{value}' is not a sample value (0-255)", path.display())]
    InvalidCell {
        path: PathBuf,
        row: usize,
        value: String,
    },

    #[error("class counts are empty, nothing to balance against")]
    EmptyClassifierDomain,

    #[error("label {label} has no class count (stale metadata?)")]
    UnknownLabel { label: u8 },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("arrow: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("parquet: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

pub type Result<T, E = PreprocessError> = std::result::Result<T, E>;

impl PreprocessError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PreprocessError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        PreprocessError::Csv {
            path: path.into(),
            source,
        }
    }
}
