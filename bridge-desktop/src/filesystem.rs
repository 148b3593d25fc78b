//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{FileMetadata, FileSystemAccess},
};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncRead;
use tracing::debug;

/// Tokio-based file system implementation
///
/// Every error carries the path it concerns.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    pub fn new() -> Self {
        Self
    }

    /// Convert std::io::Error to BridgeError, keeping the error kind
    fn map_io_error(path: &Path) -> impl FnOnce(std::io::Error) -> BridgeError + '_ {
        move |e| BridgeError::Io(std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let metadata = fs::metadata(path).await.map_err(Self::map_io_error(path))?;

        Ok(FileMetadata {
            size: metadata.len(),
            modified_at: metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64),
            is_directory: metadata.is_dir(),
        })
    }

    async fn delete_dir_all(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(path)
            .await
            .map_err(Self::map_io_error(path))?;
        debug!(path = ?path, "Deleted directory");
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(path).await.map_err(Self::map_io_error(path))?;

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(Self::map_io_error(path))?
        {
            entries.push(entry.path());
        }

        debug!(path = ?path, count = entries.len(), "Listed directory");
        Ok(entries)
    }

    async fn open_read_stream(&self, path: &Path) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
        let file = fs::File::open(path).await.map_err(Self::map_io_error(path))?;
        debug!(path = ?path, "Opened file for reading");
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_file_metadata() {
        let dir = tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let test_file = dir.path().join("test-file.txt");
        std::fs::write(&test_file, b"Hello, World!").unwrap();

        let metadata = fs.metadata(&test_file).await.unwrap();
        assert_eq!(metadata.size, 13);
        assert!(!metadata.is_directory);
        assert!(metadata.modified_at.is_some());
    }

    #[tokio::test]
    async fn test_open_read_stream() {
        let dir = tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let path = dir.path().join("stream.bin");
        std::fs::write(&path, b"streamed").unwrap();

        let mut reader = fs.open_read_stream(&path).await.unwrap();
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).await.unwrap();
        assert_eq!(contents, b"streamed");
    }

    #[tokio::test]
    async fn test_list_and_delete_directory() {
        let dir = tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let root = dir.path().join("job");
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(root.join("a.txt"), b"a").unwrap();

        let mut entries = fs.list_directory(&root).await.unwrap();
        entries.sort();
        assert_eq!(entries, vec![root.join("a.txt"), root.join("sub")]);
        assert!(fs.metadata(&root.join("sub")).await.unwrap().is_directory);

        fs.delete_dir_all(&root).await.unwrap();
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_missing_file_error_names_path() {
        let dir = tempdir().unwrap();
        let fs = TokioFileSystem::new();
        let missing = dir.path().join("missing.txt");

        match fs.open_read_stream(&missing).await {
            Err(BridgeError::Io(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::NotFound);
                assert!(e.to_string().contains("missing.txt"));
            }
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("expected an error"),
        }
    }
}
