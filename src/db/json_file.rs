//! Whole-file JSON snapshots.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::DbError;

/// One JSON document on disk, always rewritten in full.
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the file. A missing or blank file yields `T::default()`.
    pub fn read<T: DeserializeOwned + Default>(&self) -> Result<T, DbError> {
        if !self.path.exists() {
            return Ok(T::default());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(T::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Like [`read`](Self::read), but any failure is logged and treated as empty.
    ///
    /// The flag is false when the file existed but could not be loaded.
    pub fn load_tracked<T: DeserializeOwned + Default>(&self) -> (T, bool) {
        match self.read() {
            Ok(value) => (value, true),
            Err(e) => {
                tracing::warn!("Ignoring unreadable {}: {}", self.path.display(), e);
                (T::default(), false)
            }
        }
    }

    /// Write `value` to a sibling temp file, then rename it over the target.
    pub fn save<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), DbError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.tmp_path();
        fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
