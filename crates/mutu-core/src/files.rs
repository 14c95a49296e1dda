//! Blob storage for uploaded evidence, keyed by relative path.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

#[async_trait::async_trait]
pub trait FileStore: Send + Sync {
    async fn store(&self, key: &str, bytes: &[u8]) -> Result<()>;

    async fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;
}

/// Stores blobs as files below a root directory.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(Error::InvalidValue {
                kind: "file key",
                value: key.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl FileStore for LocalFileStore {
    async fn store(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        Ok(tokio::fs::read(&path).await?)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Err(e) if e.kind() != IoErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.resolve(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        store.store("submissions/a/laporan.pdf", b"%PDF").await.unwrap();
        assert!(store.exists("submissions/a/laporan.pdf").await.unwrap());
        assert_eq!(store.read("submissions/a/laporan.pdf").await.unwrap(), b"%PDF");

        store.delete("submissions/a/laporan.pdf").await.unwrap();
        assert!(!store.exists("submissions/a/laporan.pdf").await.unwrap());
        store.delete("submissions/a/laporan.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn keys_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        for key in ["../outside.txt", "/etc/passwd", "a/../../b", ""] {
            let err = store.store(key, b"x").await.unwrap_err();
            assert!(matches!(err, Error::InvalidValue { .. }), "{key}");
        }
    }
}
