//! Sliding `window × window` neighbourhoods over a CSV table.
//!
//! Both extractors share one engine: a [`Frame`] holding the `window` most
//! recent rows. Each full frame yields one item per valid centre column, then
//! slides down by one row. Positions closer than `window / 2` to any edge are
//! never visited, so feature and label streams line up item for item.
//!
//! ```text
//!  row 0  . . . . .        frame (window = 3)
//!  row 1  . x x x .   <--  centre row, columns [1, width - 1)
//!  row 2  . . . . .
//!  row 3  . . . . .   <--  pushed in next, row 0 dropped
//! ```

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::path::PathBuf;

use log::debug;

use super::table::{self, RowReader};
use crate::error::{PreprocessError, Result};

// ---------------------------------------------------------------------------
// Frame – bounded buffer of the most recent rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Frame {
    rows: VecDeque<Vec<u8>>,
    window: usize,
}

impl Frame {
    pub fn new(window: usize) -> Self {
        Frame {
            rows: VecDeque::with_capacity(window),
            window,
        }
    }

    /// Append a row, dropping the oldest once the frame is full.
    pub fn push(&mut self, row: Vec<u8>) {
        if self.rows.len() == self.window {
            self.rows.pop_front();
        }
        self.rows.push_back(row);
    }

    pub fn is_full(&self) -> bool {
        self.rows.len() == self.window
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    /// Row-major neighbourhood centred on column `col` of the centre row.
    ///
    /// Caller guarantees `window / 2 <= col < width - window / 2`.
    pub fn neighbourhood(&self, col: usize) -> Vec<u8> {
        let half = self.window / 2;
        let mut out = Vec::with_capacity(self.window * self.window);
        for row in &self.rows {
            out.extend_from_slice(&row[col - half..=col + half]);
        }
        out
    }

    /// Value at column `col` of the centre row.
    pub fn centre(&self, col: usize) -> u8 {
        self.rows[self.window / 2][col]
    }
}

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

/// What an extractor yields for each centre position.
pub trait WindowMode {
    type Item;

    /// Whether a table shorter than one frame is an error rather than empty.
    const REQUIRES_FULL_FRAME: bool;

    fn extract(frame: &Frame, col: usize) -> Self::Item;
}

/// Flattened neighbourhoods from the input table.
#[derive(Debug, Clone, Copy)]
pub struct Features;

/// Centre labels from the alpha table.
#[derive(Debug, Clone, Copy)]
pub struct Labels;

impl WindowMode for Features {
    type Item = Vec<u8>;
    const REQUIRES_FULL_FRAME: bool = true;

    fn extract(frame: &Frame, col: usize) -> Vec<u8> {
        frame.neighbourhood(col)
    }
}

impl WindowMode for Labels {
    type Item = u8;
    const REQUIRES_FULL_FRAME: bool = false;

    fn extract(frame: &Frame, col: usize) -> u8 {
        frame.centre(col)
    }
}

pub type FeatureWindows = SlidingWindows<Features>;
pub type LabelWindows = SlidingWindows<Labels>;

// ---------------------------------------------------------------------------
// SlidingWindows – the shared engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Unopened,
    Streaming,
    Finished,
}

/// Lazy stream of per-position items over a CSV table.
///
/// The file is opened on the first call to `next` and closed as soon as the
/// stream ends, fails, or is dropped. After an error the stream is fused.
#[derive(Debug)]
pub struct SlidingWindows<M> {
    path: PathBuf,
    width: usize,
    window: usize,
    rows: Option<RowReader>,
    frame: Frame,
    col: usize,
    stage: Stage,
    _mode: PhantomData<M>,
}

impl<M: WindowMode> SlidingWindows<M> {
    pub fn new(path: impl Into<PathBuf>, width: usize, window: usize) -> Self {
        SlidingWindows {
            path: path.into(),
            width,
            window,
            rows: None,
            frame: Frame::new(window),
            col: 0,
            stage: Stage::Unopened,
            _mode: PhantomData,
        }
    }

    fn half(&self) -> usize {
        self.window / 2
    }

    /// One past the last valid centre column.
    fn col_end(&self) -> usize {
        if self.width < self.window {
            return 0;
        }
        self.width - self.half()
    }

    fn next_row(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(rows) = self.rows.as_mut() else {
            return Ok(None);
        };
        let index = RowReader::position(rows);
        let Some(row) = rows.next().transpose()? else {
            return Ok(None);
        };
        if row.len() != self.width {
            return Err(PreprocessError::RowWidthMismatch {
                path: self.path.clone(),
                row: index,
                expected: self.width,
                actual: row.len(),
            });
        }
        Ok(Some(row))
    }

    /// Open the table and fill the first frame. `false` means the table is
    /// too short to hold a single window.
    fn open(&mut self) -> Result<bool> {
        self.rows = Some(table::read_rows(&self.path)?);
        while !self.frame.is_full() {
            match self.next_row()? {
                Some(row) => self.frame.push(row),
                None if M::REQUIRES_FULL_FRAME => {
                    return Err(PreprocessError::InsufficientData {
                        path: self.path.clone(),
                        window: self.window,
                        rows: self.frame.len(),
                    });
                }
                None => {
                    debug!(
                        "{}: fewer than {} rows, no windows",
                        self.path.display(),
                        self.window
                    );
                    return Ok(false);
                }
            }
        }
        self.col = self.half();
        Ok(true)
    }

    fn advance(&mut self) -> Result<Option<M::Item>> {
        loop {
            match self.stage {
                Stage::Finished => return Ok(None),
                Stage::Unopened => {
                    self.stage = Stage::Streaming;
                    if !self.open()? {
                        return Ok(None);
                    }
                }
                Stage::Streaming => {
                    if self.col < self.col_end() {
                        let item = M::extract(&self.frame, self.col);
                        self.col += 1;
                        return Ok(Some(item));
                    }
                    match self.next_row()? {
                        Some(row) => {
                            self.frame.push(row);
                            self.col = self.half();
                        }
                        None => return Ok(None),
                    }
                }
            }
        }
    }

    fn finish(&mut self) {
        self.stage = Stage::Finished;
        self.rows = None;
    }
}

impl<M: WindowMode> Iterator for SlidingWindows<M> {
    type Item = Result<M::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.finish();
                None
            }
            Err(e) => {
                self.finish();
                Some(Err(e))
            }
        }
    }
}

impl<M: WindowMode> std::iter::FusedIterator for SlidingWindows<M> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::counter;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn table(dir: &TempDir, samples: &[u8], width: usize) -> PathBuf {
        let path = dir.path().join("grid.csv");
        table::write(&path, samples, width).unwrap();
        path
    }

    #[test]
    fn frame_slides() {
        let mut frame = Frame::new(2);
        frame.push(vec![1, 2]);
        assert!(!frame.is_full());
        frame.push(vec![3, 4]);
        frame.push(vec![5, 6]);
        assert_eq!(frame.len(), 2);
        assert_eq!(frame.neighbourhood(1), vec![3, 4, 5, 6]);
    }

    #[test]
    fn feature_windows_row_major() {
        let dir = TempDir::new().unwrap();
        // 4x3 grid holding 0..12
        let grid: Vec<u8> = (0..12).collect();
        let path = table(&dir, &grid, 4);
        let windows: Vec<Vec<u8>> = FeatureWindows::new(&path, 4, 3)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            windows,
            vec![vec![0, 1, 2, 4, 5, 6, 8, 9, 10], vec![1, 2, 3, 5, 6, 7, 9, 10, 11]]
        );
    }

    #[test]
    fn label_windows_match_feature_centres() {
        let dir = TempDir::new().unwrap();
        let (w, h) = (6usize, 5usize);
        let grid: Vec<u8> = (0..(w * h) as u8).collect();
        let path = table(&dir, &grid, w);

        let features: Vec<Vec<u8>> = FeatureWindows::new(&path, w, 3)
            .collect::<Result<_>>()
            .unwrap();
        let labels: Vec<u8> = LabelWindows::new(&path, w, 3)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(features.len(), labels.len());
        for (f, l) in features.iter().zip(&labels) {
            assert_eq!(f[4], *l);
        }
        assert_eq!(labels[0], 7); // (row 1, col 1)
        assert_eq!(*labels.last().unwrap(), 22); // (row 3, col 4)
    }

    #[test]
    fn visits_every_interior_position_once() {
        let dir = TempDir::new().unwrap();
        for (w, h, window) in [(9, 9, 3), (10, 7, 5), (5, 5, 5), (4, 6, 1), (3, 8, 3)] {
            let grid: Vec<u8> = (0..w * h).map(|i| (i * 7 % 5) as u8).collect();
            let path = table(&dir, &grid, w);
            let expected = (w - window + 1) * (h - window + 1);
            assert_eq!(FeatureWindows::new(&path, w, window).count(), expected);
            assert_eq!(LabelWindows::new(&path, w, window).count(), expected);
        }
    }

    #[test]
    fn counter_agrees_with_label_stream() {
        let dir = TempDir::new().unwrap();
        for (w, h, window) in [(8, 6, 3), (12, 9, 5), (7, 7, 7)] {
            let grid: Vec<u8> = (0..w * h).map(|i| (i * 13 % 6) as u8).collect();
            let path = table(&dir, &grid, w);
            let mut seen = BTreeMap::new();
            for label in LabelWindows::new(&path, w, window) {
                *seen.entry(label.unwrap()).or_insert(0u64) += 1;
            }
            assert_eq!(seen, counter::count(&grid, w, window));
        }
    }

    #[test]
    fn short_table() {
        let dir = TempDir::new().unwrap();
        let path = table(&dir, &[1, 2, 3, 4, 5, 6], 3);

        let mut features = FeatureWindows::new(&path, 3, 3);
        match features.next() {
            Some(Err(PreprocessError::InsufficientData { window, rows, .. })) => {
                assert_eq!((window, rows), (3, 2));
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }
        assert!(features.next().is_none());

        assert_eq!(LabelWindows::new(&path, 3, 3).count(), 0);
    }

    #[test]
    fn ragged_row() {
        let dir = TempDir::new().unwrap();
        let path = table(&dir, &[1, 2, 3, 4, 5, 6, 7, 8, 9], 3);
        let mut windows = FeatureWindows::new(&path, 4, 3);
        assert!(matches!(
            windows.next(),
            Some(Err(PreprocessError::RowWidthMismatch { row: 0, expected: 4, actual: 3, .. }))
        ));
    }

    #[test]
    fn missing_table_fails_on_first_pull() {
        let dir = TempDir::new().unwrap();
        let mut windows = LabelWindows::new(dir.path().join("absent.csv"), 3, 3);
        assert!(matches!(windows.next(), Some(Err(PreprocessError::Csv { .. }))));
        assert!(windows.next().is_none());
    }
}
