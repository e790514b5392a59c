use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{file_store::FileTokenStore, memory_store::MemoryTokenStore};
use crate::config::StorageConfig;
use crate::models::Session;

/// Storage key of the short-lived bearer credential.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key of the credential exchanged for new access tokens.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// The TokenStore trait abstracts the client-side key-value storage (get, set, remove).
///
/// Operations never fail from the caller's point of view: a backend that loses
/// its durable medium keeps serving from memory.
#[async_trait]
pub trait TokenStore: Send + Sync {
    fn get_name(&self) -> &str;
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str);
    async fn remove(&self, key: &str);
    fn is_persistent(&self) -> bool {
        // Durable backends report true; memory-only ones (or ones that
        // fell back to memory) report false.
        true
    }
}

/// Creates a concrete store implementation based on the StorageConfig.
pub async fn create_store(config: &StorageConfig) -> Arc<dyn TokenStore> {
    match config {
        StorageConfig::File(file_config) => {
            let store = FileTokenStore::open(&file_config.path).await;
            info!(
                "Using file token store at '{}'",
                file_config.path.display()
            );
            Arc::new(store)
        }
        StorageConfig::Memory => {
            info!("Using in-memory token store; the session ends with the process.");
            Arc::new(MemoryTokenStore::new())
        }
    }
}

/// Session-level operations on top of any [`TokenStore`].
///
/// These keep the two tokens together: both are written on login and both
/// are removed on logout, with only the access token replaced by a refresh.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn access_token(&self) -> Option<String>;
    async fn refresh_token(&self) -> Option<String>;
    async fn set_access_token(&self, token: &str);
    async fn save_session(&self, session: &Session);
    async fn clear_session(&self);
    /// True only when both tokens are present.
    async fn has_session(&self) -> bool;
}

#[async_trait]
impl<S> SessionStore for S
where
    S: TokenStore + ?Sized,
{
    async fn access_token(&self) -> Option<String> {
        self.get(ACCESS_TOKEN_KEY).await
    }

    async fn refresh_token(&self) -> Option<String> {
        self.get(REFRESH_TOKEN_KEY).await
    }

    async fn set_access_token(&self, token: &str) {
        self.set(ACCESS_TOKEN_KEY, token).await;
    }

    async fn save_session(&self, session: &Session) {
        debug!(store = self.get_name(), "Saving session tokens");
        self.set(ACCESS_TOKEN_KEY, &session.access_token).await;
        self.set(REFRESH_TOKEN_KEY, &session.refresh_token).await;
    }

    async fn clear_session(&self) {
        debug!(store = self.get_name(), "Clearing session tokens");
        self.remove(ACCESS_TOKEN_KEY).await;
        self.remove(REFRESH_TOKEN_KEY).await;
    }

    async fn has_session(&self) -> bool {
        self.access_token().await.is_some() && self.refresh_token().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(access: &str, refresh: &str) -> Session {
        Session {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        }
    }

    #[tokio::test]
    async fn test_save_session_writes_both_keys() {
        let store = MemoryTokenStore::new();
        store.save_session(&session("A1", "R1")).await;

        assert_eq!(store.get(ACCESS_TOKEN_KEY).await.as_deref(), Some("A1"));
        assert_eq!(store.get(REFRESH_TOKEN_KEY).await.as_deref(), Some("R1"));
        assert!(store.has_session().await);
    }

    #[tokio::test]
    async fn test_set_access_token_keeps_refresh_token() {
        let store = MemoryTokenStore::new();
        store.save_session(&session("A1", "R1")).await;
        store.set_access_token("A2").await;

        assert_eq!(store.access_token().await.as_deref(), Some("A2"));
        assert_eq!(store.refresh_token().await.as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_clear_session_removes_both_keys() {
        let store = MemoryTokenStore::new();
        store.save_session(&session("A1", "R1")).await;
        store.clear_session().await;

        assert_eq!(store.access_token().await, None);
        assert_eq!(store.refresh_token().await, None);
        assert!(!store.has_session().await);
    }

    #[tokio::test]
    async fn test_session_helpers_work_through_trait_objects() {
        let store: Arc<dyn TokenStore> = create_store(&StorageConfig::Memory).await;
        store.save_session(&session("A1", "R1")).await;

        assert_eq!(store.access_token().await.as_deref(), Some("A1"));
        assert!(!store.is_persistent());
    }
}
