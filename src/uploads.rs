//! File-backed store for documents uploaded by students.
//!
//! Files land flat in one directory under the client-supplied name, minus any
//! directory components. An existing file with the same name is overwritten.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tracing::info;

use crate::error::UploadError;

/// A stored upload, as reported back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredUpload {
    pub filename: String,
    pub size: usize,
}

/// Upload directory.
pub struct UploadStore {
    base_path: PathBuf,
}

impl UploadStore {
    /// Create a store rooted at `base_path`.
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Ensure the upload directory exists.
    pub async fn ensure_dir(&self) -> Result<(), UploadError> {
        fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    /// Write `contents` under the final path component of `filename`.
    pub async fn save(&self, filename: &str, contents: &[u8]) -> Result<StoredUpload, UploadError> {
        let name = safe_filename(filename)?;
        let full_path = self.base_path.join(&name);
        fs::write(&full_path, contents).await?;

        info!(filename = %name, size = contents.len(), "Stored upload");

        Ok(StoredUpload {
            filename: name,
            size: contents.len(),
        })
    }
}

/// Reduce a client filename to a bare name that stays inside the store.
fn safe_filename(filename: &str) -> Result<String, UploadError> {
    Path::new(filename.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .ok_or_else(|| UploadError::InvalidFilename(filename.to_string()))
}
