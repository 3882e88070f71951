use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// A file storage service rooted at a base directory. Paths handed to it
/// are always resolved relative to that root.
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_dir: String,
}

impl FileStorage {
    pub fn new(base_dir: String) -> Self {
        Self { base_dir }
    }

    /// Stores a file at the given relative path, creating parent
    /// directories as needed. The write is flushed to disk before
    /// returning so a published artifact is never half-written.
    pub fn store_file<P>(&self, path: &P, data: &[u8]) -> Result<(), io::Error>
    where
        P: AsRef<Path>,
    {
        let full_path = Path::new(&self.base_dir).join(path.as_ref());

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = File::create(full_path)?;
        file.write_all(data)?;
        file.sync_all()?;

        Ok(())
    }

    /// Opens the file at the given relative path, or `None` if it does
    /// not exist.
    pub fn get_file<P>(&self, path: &P) -> Option<File>
    where
        P: AsRef<Path>,
    {
        let full_path = Path::new(&self.base_dir).join(path.as_ref());

        if full_path.exists() && full_path.is_file() {
            File::open(full_path).ok()
        } else {
            None
        }
    }

    /// Recursively removes a sub-directory and all its contents.
    pub fn remove_dir<P>(&self, path: &P) -> Result<(), io::Error>
    where
        P: AsRef<Path>,
    {
        let full_path = Path::new(&self.base_dir).join(path.as_ref());
        fs::remove_dir_all(full_path)
    }
}
