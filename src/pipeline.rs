//! `preprocess`: raw file pair in, lazy balanced example stream out.
//!
//! ```text
//!  input.raw ──decode──► cleaned_input.raw.csv ──FeatureWindows──┐
//!                        cleaned_input.raw.json                  ├─ sample ─► Example
//!  alpha.raw ──decode──► cleaned_alpha.raw.csv ──LabelWindows────┘
//!                        cleaned_alpha.raw.json (+ class counts)
//! ```
//!
//! Each raw file is decoded only when its sidecar is missing, malformed, or
//! was produced for a different window. Both files are validated against
//! each other before anything is written.
//!
//! No locking is done: running two preprocess calls over the same file pair at
//! the same time interleaves their writes to the same artifacts. Callers keep
//! a single writer per pair.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::PreprocessConfig;
use crate::data::model::{ClassCounts, Decoded, Dimensions, FileMetadata};
use crate::data::sampler::{self, BalancedSamples};
use crate::data::window::{FeatureWindows, LabelWindows};
use crate::data::{counter, decoder, metadata, table};
use crate::error::{PreprocessError, Result};

/// The lazy example stream returned by [`preprocess`].
pub type TrainingExamples = BalancedSamples<FeatureWindows, LabelWindows>;

/// Turn a raw input/alpha pair into class-balanced training examples.
///
/// Configuration problems (even window, missing file, mismatched dimensions)
/// and decode failures are returned here. Problems with the table contents
/// surface as `Err` items while the stream is pulled.
pub fn preprocess(input: &Path, alpha: &Path, window: usize) -> Result<TrainingExamples> {
    Preprocessor::new(PreprocessConfig::new(window))
        .run(input, alpha)
        .map(Preprocessed::into_examples)
}

// ---------------------------------------------------------------------------
// Preprocessor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Preprocessor { config }
    }

    /// Bring both CSV/JSON artifacts up to date for this window.
    pub fn run(&self, input: &Path, alpha: &Path) -> Result<Preprocessed> {
        self.config.validate()?;
        for path in [input, alpha] {
            if !path.is_file() {
                return Err(PreprocessError::MissingInputFile {
                    path: path.to_path_buf(),
                });
            }
        }

        let input_stage = self.stage(input, false)?;
        let alpha_stage = self.stage(alpha, true)?;

        let (input_dims, alpha_dims) = (input_stage.dims(), alpha_stage.dims());
        if input_dims != alpha_dims {
            return Err(PreprocessError::DimensionMismatch {
                input: input.to_path_buf(),
                input_dims,
                alpha: alpha.to_path_buf(),
                alpha_dims,
            });
        }

        let input = self.commit(input, input_stage, false)?;
        let alpha = self.commit(alpha, alpha_stage, true)?;
        info!(
            "prepared {} and {} ({input_dims}, window {})",
            input.raw.display(),
            alpha.raw.display(),
            self.config.window
        );

        Ok(Preprocessed {
            input,
            alpha,
            window: self.config.window,
        })
    }

    /// Read a file's cached metadata, or decode it if the cache can't be used.
    /// Nothing is written yet.
    fn stage(&self, raw: &Path, classifier: bool) -> Result<Stage> {
        let window = self.config.window;
        if !self.config.refresh {
            if let Some(meta) = metadata::load(raw) {
                let csv = metadata::artifact_path(raw, "csv");
                if meta.is_fresh_for(window, classifier) && csv.is_file() {
                    debug!("cache hit for {} (window {window})", raw.display());
                    return Ok(Stage::Cached(meta));
                }
                debug!(
                    "stale cache for {}: cached window {}, requested {window}",
                    raw.display(),
                    meta.window
                );
            }
        }
        decoder::decode(raw).map(Stage::Decoded)
    }

    /// Write the CSV and sidecar for a freshly decoded file.
    fn commit(&self, raw: &Path, stage: Stage, classifier: bool) -> Result<PreparedFile> {
        let csv = metadata::artifact_path(raw, "csv");
        let (meta, decoded) = match stage {
            Stage::Cached(meta) => (meta, false),
            Stage::Decoded(Decoded { dims, samples }) => {
                let window = self.config.window;
                table::write(&csv, &samples, dims.width)?;
                let counts = classifier.then(|| counter::count(&samples, dims.width, window));
                let meta = FileMetadata::new(dims, window, counts);
                metadata::save(raw, &meta)?;
                (meta, true)
            }
        };
        Ok(PreparedFile {
            raw: raw.to_path_buf(),
            csv,
            metadata: meta,
            decoded,
        })
    }
}

enum Stage {
    Cached(FileMetadata),
    Decoded(Decoded),
}

impl Stage {
    fn dims(&self) -> Dimensions {
        match self {
            Stage::Cached(meta) => meta.dims(),
            Stage::Decoded(decoded) => decoded.dims,
        }
    }
}

// ---------------------------------------------------------------------------
// Preprocessed – artifacts ready for streaming
// ---------------------------------------------------------------------------

/// One raw file after preprocessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedFile {
    pub raw: PathBuf,
    pub csv: PathBuf,
    pub metadata: FileMetadata,
    /// `false` when the cached CSV/JSON were reused as-is.
    pub decoded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    pub input: PreparedFile,
    pub alpha: PreparedFile,
    pub window: usize,
}

impl Preprocessed {
    pub fn dims(&self) -> Dimensions {
        self.input.metadata.dims()
    }

    /// Class counts of the alpha file.
    pub fn counts(&self) -> ClassCounts {
        self.alpha.metadata.counts.clone().unwrap_or_default()
    }

    /// A fresh example stream. Each call opens its own file cursors.
    pub fn examples(&self) -> TrainingExamples {
        let width = self.dims().width;
        sampler::sample(
            FeatureWindows::new(&self.input.csv, width, self.window),
            LabelWindows::new(&self.alpha.csv, width, self.window),
            self.counts(),
        )
    }

    pub fn into_examples(self) -> TrainingExamples {
        self.examples()
    }
}

impl IntoIterator for &Preprocessed {
    type Item = Result<crate::data::model::Example>;
    type IntoIter = TrainingExamples;

    fn into_iter(self) -> Self::IntoIter {
        self.examples()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn raw_file(dir: &TempDir, name: &str, header: &str, payload: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut bytes = format!("{header}\n").into_bytes();
        bytes.extend_from_slice(payload);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn even_window_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        // Window is checked before the files are even looked at.
        let err = preprocess(&missing, &missing, 4).unwrap_err();
        assert!(matches!(err, PreprocessError::InvalidWindow { window: 4 }));
    }

    #[test]
    fn missing_alpha_file() {
        let dir = TempDir::new().unwrap();
        let input = raw_file(&dir, "a.input", "3 3", &[0; 9]);
        let alpha = dir.path().join("a.alpha");
        match preprocess(&input, &alpha, 3) {
            Err(PreprocessError::MissingInputFile { path }) => assert_eq!(path, alpha),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected MissingInputFile"),
        }
    }

    #[test]
    fn cache_reused_for_same_window_only() {
        let dir = TempDir::new().unwrap();
        let input = raw_file(&dir, "a.input", "5 5", &[7; 25]);
        let alpha = raw_file(&dir, "a.alpha", "5 5", &[1; 25]);

        let first = Preprocessor::new(PreprocessConfig::new(3)).run(&input, &alpha).unwrap();
        assert!(first.input.decoded && first.alpha.decoded);
        assert_eq!(first.counts(), ClassCounts::from([(1, 9)]));

        let second = Preprocessor::new(PreprocessConfig::new(3)).run(&input, &alpha).unwrap();
        assert!(!second.input.decoded && !second.alpha.decoded);
        assert_eq!(second.alpha.metadata, first.alpha.metadata);

        let wider = Preprocessor::new(PreprocessConfig::new(5)).run(&input, &alpha).unwrap();
        assert!(wider.input.decoded && wider.alpha.decoded);
        assert_eq!(wider.counts(), ClassCounts::from([(1, 1)]));

        let forced = Preprocessor::new(PreprocessConfig::new(5).with_refresh(true))
            .run(&input, &alpha)
            .unwrap();
        assert!(forced.input.decoded && forced.alpha.decoded);
    }

    #[test]
    fn deleted_csv_forces_decode() {
        let dir = TempDir::new().unwrap();
        let input = raw_file(&dir, "b.input", "3 3", &[0; 9]);
        let alpha = raw_file(&dir, "b.alpha", "3 3", &[2; 9]);
        let first = Preprocessor::default().run(&input, &alpha).unwrap();
        std::fs::remove_file(&first.input.csv).unwrap();

        let second = Preprocessor::default().run(&input, &alpha).unwrap();
        assert!(second.input.decoded);
        assert!(!second.alpha.decoded);
    }

    #[test]
    fn examples_restart_per_call() {
        let dir = TempDir::new().unwrap();
        let input = raw_file(&dir, "c.input", "4 4", &(0..16).collect::<Vec<u8>>());
        let alpha = raw_file(&dir, "c.alpha", "4 4", &[3; 16]);
        let prepared = Preprocessor::default().run(&input, &alpha).unwrap();

        // 4 centres all labelled 3, quota 4
        let first: Vec<_> = prepared.examples().collect::<Result<_>>().unwrap();
        let second: Vec<_> = (&prepared).into_iter().collect::<Result<_>>().unwrap();
        assert_eq!(first.len(), 4);
        assert_eq!(first, second);
        assert_eq!(first[0].features, vec![0, 1, 2, 4, 5, 6, 8, 9, 10]);
        assert_eq!(first[0].label, vec![1]);
    }
}
