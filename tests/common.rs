use std::sync::Arc;

use mockito::{Server, ServerGuard};
use section_dashboard::api::Api;
use section_dashboard::client::{ApiClient, REFRESH_PATH};
use section_dashboard::config::{ApiConfig, CallerPolicyConfig};
use section_dashboard::models::Session;
use section_dashboard::routes::RecordingNavigator;
use section_dashboard::store::{MemoryTokenStore, SessionStore};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A mock backend plus a client wired to an in-memory store and a
/// navigator that records every redirect.
pub struct Harness {
    pub server: ServerGuard,
    pub store: Arc<MemoryTokenStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub client: ApiClient,
}

impl Harness {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let store = Arc::new(MemoryTokenStore::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let client = build_client(&server.url(), store.clone(), navigator.clone());
        Self {
            server,
            store,
            navigator,
            client,
        }
    }

    pub async fn with_session(access_token: &str, refresh_token: &str) -> Self {
        let harness = Self::new().await;
        harness
            .store
            .save_session(&Session {
                access_token: access_token.to_string(),
                refresh_token: refresh_token.to_string(),
            })
            .await;
        harness
    }

    pub fn api(&self) -> Api {
        self.api_with(CallerPolicyConfig::default())
    }

    pub fn api_with(&self, policy: CallerPolicyConfig) -> Api {
        Api::new(self.client.clone(), policy)
    }
}

pub fn build_client(
    base_url: &str,
    store: Arc<MemoryTokenStore>,
    navigator: Arc<RecordingNavigator>,
) -> ApiClient {
    ApiClient::new(&ApiConfig::new(base_url), store, navigator).unwrap()
}

/// A base URL nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// A base URL that accepts connections and never answers.
pub async fn silent_server() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    (format!("http://{}", addr), handle)
}

/// A base URL that answers every request with 401 and drops the connection
/// on the refresh call without responding.
pub async fn refresh_hangup_server() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(answer_or_hang_up(socket));
        }
    });
    (format!("http://{}", addr), handle)
}

async fn answer_or_hang_up(mut socket: TcpStream) {
    let mut buf = vec![0u8; 8192];
    let mut read = 0;
    while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") && read < buf.len() {
        match socket.read(&mut buf[read..]).await {
            Ok(0) | Err(_) => return,
            Ok(n) => read += n,
        }
    }

    let head = String::from_utf8_lossy(&buf[..read]);
    if head.starts_with(&format!("POST {}", REFRESH_PATH)) {
        return;
    }
    let _ = socket
        .write_all(b"HTTP/1.1 401 Unauthorized\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
        .await;
}

pub const SECTIONS_BODY: &str = r#"[
  {
    "_id": "sec-1",
    "title": "Grade 7",
    "sectionName": "Rizal",
    "usernames": [
      {"_id": "s1", "name": "Juan Dela Cruz"},
      {"_id": "s2", "name": "Maria Clara"}
    ]
  },
  {
    "_id": "sec-2",
    "title": "Grade 8",
    "sectionName": "Bonifacio",
    "usernames": [
      {"_id": "s3", "name": "Andres Santos"}
    ]
  }
]"#;
