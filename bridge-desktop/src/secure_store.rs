//! Secure Credential Storage backed by a local token-cache file

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SecureStore,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// File-backed secret storage
///
/// Secrets live in a single JSON object mapping each key to its
/// base64-encoded value. Writes go to a sibling temporary file that is then
/// renamed over the cache, and on Unix the file is created with mode `0600`.
///
/// An unreadable or malformed cache file is treated as empty so the next
/// successful sign-in replaces it.
pub struct FileSecureStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSecureStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn map_io_error(&self, e: std::io::Error) -> BridgeError {
        BridgeError::OperationFailed(format!(
            "Token cache {} unavailable: {}",
            self.path.display(),
            e
        ))
    }

    async fn load(&self) -> Result<BTreeMap<String, String>> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(self.map_io_error(e)),
        };

        match serde_json::from_slice(&data) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Token cache is malformed, ignoring it");
                Ok(BTreeMap::new())
            }
        }
    }

    async fn save(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.map_io_error(e))?;
            }
        }

        let json = serde_json::to_vec_pretty(entries).map_err(|e| {
            BridgeError::OperationFailed(format!("Failed to encode token cache: {}", e))
        })?;

        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options
            .open(&tmp_path)
            .await
            .map_err(|e| self.map_io_error(e))?;
        tokio::io::AsyncWriteExt::write_all(&mut file, &json)
            .await
            .map_err(|e| self.map_io_error(e))?;
        file.sync_all().await.map_err(|e| self.map_io_error(e))?;
        drop(file);

        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| self.map_io_error(e))
    }
}

#[async_trait]
impl SecureStore for FileSecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut entries = self.load().await?;
        entries.insert(key.to_string(), STANDARD.encode(value));
        self.save(&entries).await?;

        debug!(key = key, "Stored secret in token cache");
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let _guard = self.lock.lock().await;

        let entries = self.load().await?;
        let Some(encoded) = entries.get(key) else {
            debug!(key = key, "Secret not found in token cache");
            return Ok(None);
        };

        let decoded = STANDARD.decode(encoded).map_err(|e| {
            BridgeError::OperationFailed(format!("Failed to decode secret {}: {}", key, e))
        })?;

        debug!(key = key, "Retrieved secret from token cache");
        Ok(Some(decoded))
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut entries = self.load().await?;
        if entries.remove(key).is_none() {
            debug!(key = key, "Secret not found (already deleted)");
            return Ok(());
        }

        if entries.is_empty() {
            match fs::remove_file(&self.path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(self.map_io_error(e)),
            }
        } else {
            self.save(&entries).await?;
        }

        debug!(key = key, "Deleted secret from token cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_set_and_get_secret() {
        let dir = tempdir().unwrap();
        let store = FileSecureStore::new(dir.path().join("token.json"));

        store.set_secret("oauth_tokens:default", b"secret").await.unwrap();
        let value = store.get_secret("oauth_tokens:default").await.unwrap();

        assert_eq!(value, Some(b"secret".to_vec()));
        assert!(store.has_secret("oauth_tokens:default").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store = FileSecureStore::new(dir.path().join("absent").join("token.json"));

        assert_eq!(store.get_secret("anything").await.unwrap(), None);
        store.delete_secret("anything").await.unwrap();
    }

    #[tokio::test]
    async fn test_values_survive_a_new_instance() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache").join("token.json");

        FileSecureStore::new(&path)
            .set_secret("k", &[0, 159, 146, 150])
            .await
            .unwrap();

        let reopened = FileSecureStore::new(&path);
        assert_eq!(
            reopened.get_secret("k").await.unwrap(),
            Some(vec![0, 159, 146, 150])
        );
    }

    #[tokio::test]
    async fn test_delete_keeps_other_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token.json");
        let store = FileSecureStore::new(&path);

        store.set_secret("a", b"1").await.unwrap();
        store.set_secret("b", b"2").await.unwrap();
        store.delete_secret("a").await.unwrap();

        assert_eq!(store.get_secret("a").await.unwrap(), None);
        assert_eq!(store.get_secret("b").await.unwrap(), Some(b"2".to_vec()));

        store.delete_secret("b").await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_malformed_cache_is_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, b"\x80not json").unwrap();

        let store = FileSecureStore::new(&path);
        assert_eq!(store.get_secret("k").await.unwrap(), None);

        store.set_secret("k", b"v").await.unwrap();
        assert_eq!(store.get_secret("k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cache_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("token.json");
        FileSecureStore::new(&path)
            .set_secret("k", b"v")
            .await
            .unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
