use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::TokenStore;

/// A store backed by a small JSON object on disk.
///
/// Entries are loaded once at open and served from memory; every mutation
/// rewrites the file through a temp file + rename. When the file cannot be
/// read or written the store keeps going in memory only and says so once.
pub struct FileTokenStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
    persistent: AtomicBool,
}

impl FileTokenStore {
    pub async fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let (entries, persistent) = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, String>>(&bytes) {
                Ok(entries) => {
                    debug!(
                        "Loaded {} session entries from '{}'",
                        entries.len(),
                        path.display()
                    );
                    (entries, true)
                }
                Err(e) => {
                    warn!(
                        "Session file '{}' is not valid JSON ({}); starting with an empty session",
                        path.display(),
                        e
                    );
                    (HashMap::new(), true)
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => (HashMap::new(), true),
            Err(e) => {
                warn!(
                    event_name = "store.file.unavailable",
                    event_domain = "store",
                    "Session file '{}' is unreadable ({}); keeping tokens in memory only",
                    path.display(),
                    e
                );
                (HashMap::new(), false)
            }
        };

        Self {
            path,
            entries: RwLock::new(entries),
            persistent: AtomicBool::new(persistent),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &HashMap<String, String>) {
        if !self.persistent.load(Ordering::Acquire) {
            return;
        }
        if let Err(e) = self.write_file(entries).await {
            warn!(
                event_name = "store.file.unavailable",
                event_domain = "store",
                "Failed to write session file '{}' ({}); keeping tokens in memory only",
                self.path.display(),
                e
            );
            self.persistent.store(false, Ordering::Release);
        }
    }

    async fn write_file(&self, entries: &HashMap<String, String>) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("tmp");
        let bytes = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&tmp, bytes).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        tokio::fs::rename(&tmp, &self.path).await
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    fn get_name(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) {
        // Hold the write lock across the file write so writes land in order.
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries).await;
    }

    async fn remove(&self, key: &str) {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            self.persist(&entries).await;
        }
    }

    fn is_persistent(&self) -> bool {
        self.persistent.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileTokenStore::open(&path).await;
        store.set("accessToken", "A1").await;
        store.set("refreshToken", "R1").await;
        assert!(store.is_persistent());
        drop(store);

        let reopened = FileTokenStore::open(&path).await;
        assert_eq!(reopened.get("accessToken").await.as_deref(), Some("A1"));
        assert_eq!(reopened.get("refreshToken").await.as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_remove_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = FileTokenStore::open(&path).await;
        store.set("accessToken", "A1").await;
        store.remove("accessToken").await;

        let reopened = FileTokenStore::open(&path).await;
        assert_eq!(reopened.get("accessToken").await, None);
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"not json").unwrap();

        let store = FileTokenStore::open(&path).await;
        assert_eq!(store.get("accessToken").await, None);

        // The next write replaces the corrupt content.
        store.set("accessToken", "A1").await;
        let reopened = FileTokenStore::open(&path).await;
        assert_eq!(reopened.get("accessToken").await.as_deref(), Some("A1"));
    }

    #[tokio::test]
    async fn test_unwritable_location_falls_back_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the parent directory should be.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let path = blocker.join("session.json");

        let store = FileTokenStore::open(&path).await;
        store.set("accessToken", "A1").await;

        assert!(!store.is_persistent());
        assert_eq!(store.get("accessToken").await.as_deref(), Some("A1"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_unreadable_location_is_memory_only() {
        let dir = tempfile::tempdir().unwrap();
        // Reading a directory as a file fails with something other than NotFound.
        let store = FileTokenStore::open(dir.path()).await;

        assert!(!store.is_persistent());
        store.set("refreshToken", "R1").await;
        assert_eq!(store.get("refreshToken").await.as_deref(), Some("R1"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_session_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = FileTokenStore::open(&path).await;
        store.set("accessToken", "A1").await;

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
