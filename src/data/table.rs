use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use log::debug;

use crate::error::{PreprocessError, Result};

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Write `samples` as a headerless CSV, `row_width` cells per line.
///
/// Overwrites `path`. A failure half-way leaves a partial file behind; the
/// error is returned and nothing is cleaned up.
pub fn write(path: &Path, samples: &[u8], row_width: usize) -> Result<PathBuf> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| PreprocessError::csv(path, e))?;

    let mut rows = 0usize;
    for row in samples.chunks(row_width.max(1)) {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .map_err(|e| PreprocessError::csv(path, e))?;
        rows += 1;
    }
    writer.flush().map_err(|e| PreprocessError::io(path, e))?;

    debug!("wrote {rows} rows of {row_width} to {}", path.display());
    Ok(path.to_path_buf())
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Open an independent row cursor over a CSV written by [`write`].
pub fn read_rows(path: &Path) -> Result<RowReader> {
    let reader = ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| PreprocessError::csv(path, e))?;
    Ok(RowReader {
        path: path.to_path_buf(),
        reader,
        record: StringRecord::new(),
        row: 0,
    })
}

/// Lazily parsed rows of a CSV table. Owns its file handle; dropping the
/// reader closes the file.
#[derive(Debug)]
pub struct RowReader {
    path: PathBuf,
    reader: csv::Reader<File>,
    record: StringRecord,
    row: usize,
}

impl RowReader {
    /// Zero-based index of the next row to be returned.
    pub fn position(&self) -> usize {
        self.row
    }

    fn parse_record(&self) -> Result<Vec<u8>> {
        self.record
            .iter()
            .map(|cell| {
                cell.trim().parse::<u8>().map_err(|_| PreprocessError::InvalidCell {
                    path: self.path.clone(),
                    row: self.row,
                    value: cell.to_string(),
                })
            })
            .collect()
    }
}

impl Iterator for RowReader {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.record) {
            Ok(false) => None,
            Ok(true) => {
                let row = self.parse_record();
                self.row += 1;
                Some(row)
            }
            Err(e) => Some(Err(PreprocessError::csv(&self.path, e))),
        }
    }
}
