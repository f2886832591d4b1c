//! Filesystem content store for raw uploaded files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the store directory if it does not exist yet.
    pub async fn ensure_root(&self) -> AppResult<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    fn path_for(&self, name: &str) -> AppResult<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(AppError::Internal(format!("invalid storage key {name:?}")));
        }
        Ok(self.root.join(name))
    }

    /// Write `bytes` under `name`, refusing to overwrite an existing entry.
    ///
    /// Returns `Ok(false)` when an entry with that name already exists.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn put_new(&self, name: &str, bytes: &[u8]) -> AppResult<bool> {
        let path = self.path_for(name)?;
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = write_all(&mut file, bytes).await {
            drop(file);
            let _ = fs::remove_file(&path).await;
            return Err(e.into());
        }

        debug!(path = %path.display(), "stored upload");
        Ok(true)
    }

    /// Open a stored entry for reading, `None` if it is gone.
    pub async fn open(&self, name: &str) -> AppResult<Option<File>> {
        let path = self.path_for(name)?;
        match File::open(&path).await {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete an entry; a missing entry is not an error.
    pub async fn remove(&self, name: &str) -> AppResult<()> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "stored file already missing");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn exists(&self, name: &str) -> AppResult<bool> {
        let path = self.path_for(name)?;
        Ok(fs::try_exists(&path).await?)
    }
}

async fn write_all(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn put_open_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("uploads"));
        store.ensure_root().await.unwrap();

        assert!(store.put_new("1_data.csv", b"a,b\n1,2\n").await.unwrap());
        assert!(store.exists("1_data.csv").await.unwrap());

        let mut contents = String::new();
        store
            .open("1_data.csv")
            .await
            .unwrap()
            .unwrap()
            .read_to_string(&mut contents)
            .await
            .unwrap();
        assert_eq!(contents, "a,b\n1,2\n");

        store.remove("1_data.csv").await.unwrap();
        assert!(store.open("1_data.csv").await.unwrap().is_none());
        // Removing twice is fine.
        store.remove("1_data.csv").await.unwrap();
    }

    #[tokio::test]
    async fn existing_entries_are_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert!(store.put_new("x.csv", b"first").await.unwrap());
        assert!(!store.put_new("x.csv", b"second").await.unwrap());
        assert_eq!(std::fs::read(dir.path().join("x.csv")).unwrap(), b"first");
    }

    #[tokio::test]
    async fn keys_with_separators_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.put_new("../escape.csv", b"x").await.is_err());
        assert!(store.open("a/b.csv").await.is_err());
    }
}
