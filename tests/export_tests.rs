//! Parquet export of a preprocessed example stream.

use rusty_sampler::export::{read_classes, read_parquet, write_parquet};
use rusty_sampler::{Example, PreprocessConfig, Preprocessor, Result};
use tempfile::TempDir;

#[test]
fn test_export_matches_stream() {
    let dir = TempDir::new().unwrap();
    let (w, h) = (10usize, 8usize);
    let input: Vec<u8> = (0..w * h).map(|i| (i * 3) as u8).collect();
    let alpha: Vec<u8> = (0..w * h).map(|i| ((i / 3) % 3) as u8).collect();
    let write = |name: &str, samples: &[u8]| {
        let path = dir.path().join(name);
        let mut bytes = format!("{w} {h}\n").into_bytes();
        bytes.extend_from_slice(samples);
        std::fs::write(&path, bytes).unwrap();
        path
    };
    let input = write("e.input", &input);
    let alpha = write("e.alpha", &alpha);

    let prepared = Preprocessor::new(PreprocessConfig::new(3))
        .run(&input, &alpha)
        .unwrap();
    let streamed: Vec<Example> = prepared.examples().collect::<Result<_>>().unwrap();
    assert!(!streamed.is_empty());

    let out = dir.path().join("train.parquet");
    let summary = write_parquet(&out, &prepared, 5).unwrap();
    assert_eq!(summary.examples, streamed.len());
    assert_eq!(summary.batches, streamed.len().div_ceil(5));

    assert_eq!(read_parquet(&out).unwrap(), streamed);
    let classes = read_classes(&out).unwrap();
    let expected: Vec<u32> = streamed
        .iter()
        .map(|e| e.class_index().unwrap() as u32)
        .collect();
    assert_eq!(classes, expected);
}
