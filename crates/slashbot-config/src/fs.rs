//! Atomic JSON file writes.
//!
//! Writers create a temp file in the destination directory and rename it
//! over the target so readers never observe a partial document. The
//! credential store shares this helper.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::{ConfigError, ConfigResult};

/// Serialize `value` as pretty JSON and atomically replace `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Write`] if the parent directory cannot be
/// created or the temp file cannot be written or renamed.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> ConfigResult<()> {
    let wrap = |source: std::io::Error| ConfigError::Write {
        path: path.display().to_string(),
        source,
    };

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(wrap)?;

    let json = serde_json::to_vec_pretty(value).map_err(|e| ConfigError::Write {
        path: path.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(wrap)?;
    tmp.write_all(&json).map_err(wrap)?;
    tmp.write_all(b"\n").map_err(wrap)?;
    tmp.flush().map_err(wrap)?;
    tmp.persist(path).map_err(|e| wrap(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn writes_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        write_json_atomic(&path, &json!({"v": 1})).unwrap();
        write_json_atomic(&path, &json!({"v": 2})).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["v"], 2);
    }
}
