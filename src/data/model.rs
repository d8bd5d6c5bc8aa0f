use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Dimensions – the `width height` header shared by both raw files
// ---------------------------------------------------------------------------

/// Logical shape of a raw file: `width` samples per row, `height` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: usize,
    pub height: usize,
}

/// Header text that is not two positive integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderParseError;

impl FromStr for Dimensions {
    type Err = HeaderParseError;

    /// Parse an already-decoded header line, e.g. `"640 480"`.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut fields = line.split_whitespace();
        let (Some(w), Some(h), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(HeaderParseError);
        };
        let width: usize = w.parse().map_err(|_| HeaderParseError)?;
        let height: usize = h.parse().map_err(|_| HeaderParseError)?;
        if width == 0 || height == 0 {
            return Err(HeaderParseError);
        }
        // The payload length must be addressable.
        width.checked_mul(height).ok_or(HeaderParseError)?;
        Ok(Dimensions { width, height })
    }
}

impl Dimensions {
    /// Parse a header line still in its raw byte form.
    ///
    /// Headers are not guaranteed to be valid UTF-8, so invalid sequences are
    /// replaced before parsing; they can never form digits anyway.
    pub fn from_header_bytes(line: &[u8]) -> Result<Self, HeaderParseError> {
        String::from_utf8_lossy(line).parse()
    }

    /// Number of samples in the payload.
    pub fn sample_count(&self) -> usize {
        self.width * self.height
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ---------------------------------------------------------------------------
// Decoded – a raw file after header parsing
// ---------------------------------------------------------------------------

/// Flat row-major samples of a raw file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub dims: Dimensions,
    pub samples: Vec<u8>,
}

// ---------------------------------------------------------------------------
// ClassCounts / FileMetadata – the sidecar record
// ---------------------------------------------------------------------------

/// Label value → number of window centres carrying it. Ordered by label.
pub type ClassCounts = BTreeMap<u8, u64>;

/// Derived facts about one raw file, persisted next to it as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub width: usize,
    pub height: usize,
    /// Window size the CSV artifact was produced for.
    pub window: usize,
    /// Only present for classifier (alpha) files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counts: Option<ClassCounts>,
}

impl FileMetadata {
    pub fn new(dims: Dimensions, window: usize, counts: Option<ClassCounts>) -> Self {
        FileMetadata {
            width: dims.width,
            height: dims.height,
            window,
            counts,
        }
    }

    pub fn dims(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Whether this record can stand in for re-decoding at `window`.
    pub fn is_fresh_for(&self, window: usize, classifier: bool) -> bool {
        self.window == window && (!classifier || self.counts.is_some())
    }
}

// ---------------------------------------------------------------------------
// OneHotEncoder
// ---------------------------------------------------------------------------

/// Maps each label to an indicator vector; index = rank in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneHotEncoder {
    labels: Vec<u8>,
}

impl OneHotEncoder {
    pub fn new(labels: impl IntoIterator<Item = u8>) -> Self {
        let mut labels: Vec<u8> = labels.into_iter().collect();
        labels.sort_unstable();
        labels.dedup();
        OneHotEncoder { labels }
    }

    pub fn from_counts(counts: &ClassCounts) -> Self {
        // BTreeMap keys are already sorted and distinct.
        OneHotEncoder {
            labels: counts.keys().copied().collect(),
        }
    }

    pub fn index_of(&self, label: u8) -> Option<usize> {
        self.labels.binary_search(&label).ok()
    }

    pub fn encode(&self, label: u8) -> Option<Vec<u8>> {
        let idx = self.index_of(label)?;
        let mut hot = vec![0; self.labels.len()];
        hot[idx] = 1;
        Some(hot)
    }

    /// Distinct labels in index order.
    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Example – one training pair handed to the learner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    /// Flattened `window × window` neighbourhood, row-major.
    pub features: Vec<u8>,
    /// One-hot label.
    pub label: Vec<u8>,
}

impl Example {
    /// Position of the hot slot in `label`.
    pub fn class_index(&self) -> Option<usize> {
        self.label.iter().position(|&v| v == 1)
    }
}
