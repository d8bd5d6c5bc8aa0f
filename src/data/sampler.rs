use std::collections::BTreeMap;

use log::debug;

use super::model::{ClassCounts, Example, OneHotEncoder};
use crate::error::{PreprocessError, Result};

// ---------------------------------------------------------------------------
// Class-balanced pairing of feature and label streams
// ---------------------------------------------------------------------------

/// Pair `features` with `labels` and undersample every label down to the
/// rarest label's count.
///
/// Nothing is read until the returned stream is pulled.
pub fn sample<F, L>(features: F, labels: L, counts: ClassCounts) -> BalancedSamples<F, L>
where
    F: Iterator<Item = Result<Vec<u8>>>,
    L: Iterator<Item = Result<u8>>,
{
    BalancedSamples::new(features, labels, counts)
}

/// Lazy stream of balanced [`Example`]s.
///
/// * Each label is emitted at most `min(counts)` times; later pairs carrying
///   it are discarded.
/// * Ends cleanly when either input ends, whichever is shorter.
/// * Fails with `EmptyClassifierDomain` on the first pull if `counts` is
///   empty, and with `UnknownLabel` on a label missing from `counts`.
#[derive(Debug)]
pub struct BalancedSamples<F, L> {
    features: F,
    labels: L,
    counts: ClassCounts,
    encoder: OneHotEncoder,
    quota: u64,
    emitted: BTreeMap<u8, u64>,
    discarded: u64,
    done: bool,
}

impl<F, L> BalancedSamples<F, L>
where
    F: Iterator<Item = Result<Vec<u8>>>,
    L: Iterator<Item = Result<u8>>,
{
    pub fn new(features: F, labels: L, counts: ClassCounts) -> Self {
        let encoder = OneHotEncoder::from_counts(&counts);
        let quota = counts.values().copied().min().unwrap_or(0);
        BalancedSamples {
            features,
            labels,
            counts,
            encoder,
            quota,
            emitted: BTreeMap::new(),
            discarded: 0,
            done: false,
        }
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    /// Examples each label is allowed to contribute.
    pub fn quota(&self) -> u64 {
        self.quota
    }

    /// Examples emitted so far, per label.
    pub fn emitted(&self) -> &BTreeMap<u8, u64> {
        &self.emitted
    }

    /// Pairs dropped because their label had used up its quota.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    fn advance(&mut self) -> Result<Option<Example>> {
        if self.counts.is_empty() {
            return Err(PreprocessError::EmptyClassifierDomain);
        }
        loop {
            let Some(features) = self.features.next().transpose()? else {
                return Ok(None);
            };
            let Some(label) = self.labels.next().transpose()? else {
                return Ok(None);
            };

            let Some(hot) = self.encoder.encode(label) else {
                return Err(PreprocessError::UnknownLabel { label });
            };
            let seen = self.emitted.entry(label).or_insert(0);
            if *seen < self.quota {
                *seen += 1;
                return Ok(Some(Example {
                    features,
                    label: hot,
                }));
            }
            self.discarded += 1;
        }
    }
}

impl<F, L> Iterator for BalancedSamples<F, L>
where
    F: Iterator<Item = Result<Vec<u8>>>,
    L: Iterator<Item = Result<u8>>,
{
    type Item = Result<Example>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(example)) => Some(Ok(example)),
            Ok(None) => {
                self.done = true;
                debug!(
                    "sampling finished: {:?} emitted, {} discarded",
                    self.emitted, self.discarded
                );
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<F, L> std::iter::FusedIterator for BalancedSamples<F, L>
where
    F: Iterator<Item = Result<Vec<u8>>>,
    L: Iterator<Item = Result<u8>>,
{
}
