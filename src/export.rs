use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, ListArray, ListBuilder, UInt32Array, UInt32Builder, UInt8Array, UInt8Builder,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use log::info;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use crate::data::model::Example;
use crate::error::{PreprocessError, Result};

pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// What [`write_parquet`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub examples: usize,
    pub batches: usize,
    /// Examples per one-hot index.
    pub per_class: BTreeMap<usize, usize>,
}

fn schema() -> SchemaRef {
    let item = |dt| Arc::new(Field::new("item", dt, true));
    Arc::new(Schema::new(vec![
        Field::new("features", DataType::List(item(DataType::UInt8)), false),
        Field::new("label", DataType::List(item(DataType::UInt8)), false),
        Field::new("class", DataType::UInt32, false),
    ]))
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Stream examples into a Parquet file, `batch_size` rows per record batch.
///
/// Only one batch is held in memory at a time. The first `Err` pulled from
/// `examples` stops the export and is returned; the file is left as written
/// so far.
pub fn write_parquet<I>(path: &Path, examples: I, batch_size: usize) -> Result<ExportSummary>
where
    I: IntoIterator<Item = Result<Example>>,
{
    let schema = schema();
    let file = File::create(path).map_err(|e| PreprocessError::io(path, e))?;
    let mut writer = ArrowWriter::try_new(file, schema.clone(), None)?;
    let mut batch = BatchBuilder::default();
    let mut summary = ExportSummary::default();

    for example in examples {
        let example = example?;
        if let Some(class) = example.class_index() {
            *summary.per_class.entry(class).or_insert(0) += 1;
        }
        batch.push(&example);
        summary.examples += 1;
        if batch.len >= batch_size.max(1) {
            writer.write(&batch.finish(&schema)?)?;
            summary.batches += 1;
        }
    }
    if batch.len > 0 {
        writer.write(&batch.finish(&schema)?)?;
        summary.batches += 1;
    }
    writer.close()?;

    info!(
        "exported {} examples in {} batches to {}",
        summary.examples,
        summary.batches,
        path.display()
    );
    Ok(summary)
}

struct BatchBuilder {
    features: ListBuilder<UInt8Builder>,
    labels: ListBuilder<UInt8Builder>,
    classes: UInt32Builder,
    len: usize,
}

impl Default for BatchBuilder {
    fn default() -> Self {
        BatchBuilder {
            features: ListBuilder::new(UInt8Builder::new()),
            labels: ListBuilder::new(UInt8Builder::new()),
            classes: UInt32Builder::new(),
            len: 0,
        }
    }
}

impl BatchBuilder {
    fn push(&mut self, example: &Example) {
        self.features.values().append_slice(&example.features);
        self.features.append(true);
        self.labels.values().append_slice(&example.label);
        self.labels.append(true);
        let class = example.class_index().map(|c| c as u32).unwrap_or(0);
        self.classes.append_value(class);
        self.len += 1;
    }

    /// Drain the builders into a record batch.
    fn finish(&mut self, schema: &SchemaRef) -> Result<RecordBatch, ArrowError> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(self.features.finish()),
            Arc::new(self.labels.finish()),
            Arc::new(self.classes.finish()),
        ];
        self.len = 0;
        RecordBatch::try_new(schema.clone(), columns)
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Load every example from a file written by [`write_parquet`].
pub fn read_parquet(path: &Path) -> Result<Vec<Example>> {
    let file = File::open(path).map_err(|e| PreprocessError::io(path, e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut examples = Vec::new();
    for batch in reader {
        let batch = batch?;
        let features = list_column(&batch, "features")?;
        let labels = list_column(&batch, "label")?;
        for row in 0..batch.num_rows() {
            examples.push(Example {
                features: u8_values(features, row)?,
                label: u8_values(labels, row)?,
            });
        }
    }
    Ok(examples)
}

fn list_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ListArray, ArrowError> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<ListArray>())
        .ok_or_else(|| ArrowError::SchemaError(format!("missing list column '{name}'")))
}

fn u8_values(list: &ListArray, row: usize) -> Result<Vec<u8>, ArrowError> {
    let values = list.value(row);
    let values = values
        .as_any()
        .downcast_ref::<UInt8Array>()
        .ok_or_else(|| {
            ArrowError::SchemaError(format!("expected UInt8 items, got {:?}", values.data_type()))
        })?;
    Ok(values.values().to_vec())
}

/// Class column of an exported file, for quick label histograms.
pub fn read_classes(path: &Path) -> Result<Vec<u32>> {
    let file = File::open(path).map_err(|e| PreprocessError::io(path, e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let mut classes = Vec::new();
    for batch in reader {
        let batch = batch?;
        let col = batch
            .column_by_name("class")
            .and_then(|c| c.as_any().downcast_ref::<UInt32Array>())
            .ok_or_else(|| ArrowError::SchemaError("missing 'class' column".into()))?;
        classes.extend(col.values().iter().copied());
    }
    Ok(classes)
}
