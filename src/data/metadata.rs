use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::model::FileMetadata;
use crate::error::{PreprocessError, Result};

/// Derived artifact next to a raw file: `<dir>/cleaned_<basename>.<ext>`.
pub fn artifact_path(raw: &Path, ext: &str) -> PathBuf {
    let name = raw
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    raw.with_file_name(format!("cleaned_{name}.{ext}"))
}

pub fn sidecar_path(raw: &Path) -> PathBuf {
    artifact_path(raw, "json")
}

/// Load the cached metadata for `raw`.
///
/// A missing, unreadable or malformed sidecar is treated as no cache at all:
/// the caller recomputes and overwrites it.
pub fn load(raw: &Path) -> Option<FileMetadata> {
    let path = sidecar_path(raw);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("no metadata cache at {}", path.display());
            return None;
        }
        Err(e) => {
            warn!("ignoring unreadable metadata cache {}: {e}", path.display());
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(meta) => Some(meta),
        Err(e) => {
            warn!("ignoring malformed metadata cache {}: {e}", path.display());
            None
        }
    }
}

/// Write (or overwrite) the sidecar for `raw`.
pub fn save(raw: &Path, meta: &FileMetadata) -> Result<PathBuf> {
    let path = sidecar_path(raw);
    let text = serde_json::to_string_pretty(meta).map_err(|source| PreprocessError::Json {
        path: path.clone(),
        source,
    })?;
    std::fs::write(&path, text).map_err(|e| PreprocessError::io(&path, e))?;
    debug!("saved metadata cache {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{ClassCounts, Dimensions};
    use tempfile::TempDir;

    #[test]
    fn artifact_names() {
        let raw = Path::new("test_data/test.alpha");
        assert_eq!(
            artifact_path(raw, "csv"),
            PathBuf::from("test_data/cleaned_test.alpha.csv")
        );
        assert_eq!(
            sidecar_path(raw),
            PathBuf::from("test_data/cleaned_test.alpha.json")
        );
        assert_eq!(
            artifact_path(Path::new("img.input"), "csv"),
            PathBuf::from("cleaned_img.input.csv")
        );
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("a.alpha");
        assert_eq!(load(&raw), None);

        let meta = FileMetadata::new(
            Dimensions { width: 7, height: 3 },
            5,
            Some(ClassCounts::from([(3, 9)])),
        );
        let written = save(&raw, &meta).unwrap();
        assert_eq!(written, dir.path().join("cleaned_a.alpha.json"));
        assert_eq!(load(&raw), Some(meta));
    }

    #[test]
    fn malformed_sidecar_reads_as_absent() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("a.input");
        std::fs::write(sidecar_path(&raw), "{\"width\": 3, \"hei").unwrap();
        assert_eq!(load(&raw), None);
        std::fs::write(sidecar_path(&raw), "[1, 2, 3]").unwrap();
        assert_eq!(load(&raw), None);
    }
}
