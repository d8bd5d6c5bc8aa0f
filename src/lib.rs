//! Class-balanced sliding-window training examples from paired raw files.
//!
//! An *input* file and an *alpha* (label) file share the same layout: a
//! `width height` text line followed by `width * height` sample bytes. For
//! every position at least `window / 2` away from the border, the
//! `window × window` neighbourhood of the input file becomes a feature vector
//! and the alpha value at the centre becomes its label. Labels are one-hot
//! encoded and undersampled so every class appears as often as the rarest.
//!
//! ```ignore
//! use rusty_sampler::preprocess;
//!
//! for example in preprocess(input.as_ref(), alpha.as_ref(), 3)? {
//!     let example = example?;
//!     model.train(&example.features, &example.label);
//! }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod pipeline;

pub use config::PreprocessConfig;
pub use data::model::{ClassCounts, Dimensions, Example, FileMetadata, OneHotEncoder};
pub use error::{PreprocessError, Result};
pub use pipeline::{preprocess, PreparedFile, Preprocessed, Preprocessor, TrainingExamples};
