use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::storage::FileStorage;

/// One uploaded file part, stored inside a session directory.
/// The position of a record in the receiver's output vector is the
/// client-intended merge position; directory listing order is never used.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub path: PathBuf,
    pub size: usize,
}

/// Scratch storage scoped to a single merge request.
///
/// The directory is created up front and removed on `Drop`, so every
/// exit path of a request handler cleans up after itself, including
/// early validation errors and dropped connections.
#[derive(Debug)]
pub struct UploadSession {
    token: String,
    dir: PathBuf,
    storage: FileStorage,
}

impl UploadSession {
    pub fn create(base_dir: &str) -> Result<Self, io::Error> {
        // Millis keep the token sortable for operators; the UUID removes
        // the collision window between requests landing in the same tick.
        let token = format!(
            "{}_{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );
        let dir = Path::new(base_dir).join(&token);
        fs::create_dir_all(&dir)?;

        let storage = FileStorage::new(base_dir.to_string());
        Ok(Self {
            token,
            dir,
            storage,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stores one part under its client-given name. Path components are
    /// stripped; two parts sharing a name within one session overwrite
    /// each other (last write wins, accepted edge case).
    pub fn store_file(&self, filename: &str, data: &[u8]) -> Result<UploadedFile, io::Error> {
        let safe_name = sanitize_filename(filename);
        self.storage
            .store_file(&Path::new(&self.token).join(&safe_name), data)?;

        Ok(UploadedFile {
            path: self.dir.join(&safe_name),
            filename: safe_name,
            size: data.len(),
        })
    }
}

impl Drop for UploadSession {
    fn drop(&mut self) {
        // Best effort: a failed removal must never mask the response
        // already being sent to the caller.
        if let Err(error) = self.storage.remove_dir(&self.token) {
            tracing::warn!(
                "Failed to remove session dir. dir={} error={error}",
                self.dir.display()
            );
        }
    }
}

fn sanitize_filename(name: &str) -> String {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.pdf")
        .to_string()
}
