use async_trait::async_trait;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::Result;
use crate::traits::FileStore;

/// Files on the local disk. Writes create missing parent directories.
#[derive(Debug, Clone, Default)]
pub struct LocalFileStore;

impl LocalFileStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(path).await?)
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_dir(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(tokio::fs::try_exists(path).await?)
    }
}

/// Path-keyed byte map used where touching the disk is not wanted.
#[derive(Debug, Default)]
pub struct MemoryFileStore {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> MutexGuard<'_, HashMap<PathBuf, Vec<u8>>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.files().keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.files().get(path).cloned().ok_or_else(|| {
            std::io::Error::new(ErrorKind::NotFound, format!("{} not found", path.display())).into()
        })
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.files().insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        self.files().remove(path);
        Ok(())
    }

    async fn delete_dir(&self, path: &Path) -> Result<()> {
        self.files().retain(|file, _| !file.starts_with(path));
        Ok(())
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.files().contains_key(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_store_creates_parents_and_tolerates_missing_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new();
        let path = dir.path().join("sub").join("gen").join("frame_0000.jpg");

        store.write(&path, b"jpeg").await.unwrap();
        assert!(store.exists(&path).await.unwrap());
        assert_eq!(store.read(&path).await.unwrap(), b"jpeg");

        store.delete(&path).await.unwrap();
        assert!(!store.exists(&path).await.unwrap());
        store.delete(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_local_store_deletes_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new();
        let generation = dir.path().join("sub").join("gen");
        store.write(&generation.join("frame_0000.jpg"), b"jpeg").await.unwrap();

        store.delete_dir(&generation).await.unwrap();

        assert!(!store.exists(&generation).await.unwrap());
        assert!(store.exists(&dir.path().join("sub")).await.unwrap());
        store.delete_dir(&generation).await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store_delete_dir_removes_only_nested_files() {
        let store = MemoryFileStore::new();
        store.write(Path::new("/frames/a/old/frame_0000.jpg"), b"1").await.unwrap();
        store.write(Path::new("/frames/a/new/frame_0000.jpg"), b"2").await.unwrap();
        store.write(Path::new("/frames/a/older.jpg"), b"3").await.unwrap();

        store.delete_dir(Path::new("/frames/a/old")).await.unwrap();

        assert_eq!(
            store.paths(),
            vec![
                PathBuf::from("/frames/a/new/frame_0000.jpg"),
                PathBuf::from("/frames/a/older.jpg"),
            ]
        );
    }

    #[tokio::test]
    async fn test_memory_store_read_missing_is_io_error() {
        let store = MemoryFileStore::new();
        let err = store.read(Path::new("missing.jpg")).await.unwrap_err();
        assert!(matches!(err, crate::EvaluatorError::IoError(_)));
    }
}
