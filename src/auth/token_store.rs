use crate::auth::types::Token;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Everything the auth subsystem persists between runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthRecord {
    pub token: Option<Token>,
    #[serde(default)]
    pub failure_count: u32,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Holder of the bearer token and the consecutive-failure counter.
///
/// All operations are total. Every mutation happens under the store's lock,
/// so a counter value returned from [`TokenStore::record_failure`] is the one
/// any later breaker check will observe.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self) -> Option<Token>;

    /// Store a token expiring `ttl` from now and reset the failure counter
    async fn set(&self, value: String, ttl: Duration) -> Token;

    /// Remove the token; the failure counter is left untouched
    async fn clear(&self);

    async fn is_valid(&self) -> bool {
        self.get().await.is_some_and(|token| token.is_valid())
    }

    async fn failure_count(&self) -> u32;

    /// Increment the failure counter and return the new value
    async fn record_failure(&self) -> u32;

    async fn reset_failures(&self);

    async fn record(&self) -> AuthRecord;
}

/// Process-local store, lost on exit
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    state: Mutex<AuthRecord>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: AuthRecord) -> Self {
        Self {
            state: Mutex::new(record),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self) -> Option<Token> {
        self.state.lock().await.token.clone()
    }

    async fn set(&self, value: String, ttl: Duration) -> Token {
        let mut state = self.state.lock().await;
        let token = Token::issue(value, ttl);
        state.token = Some(token.clone());
        state.failure_count = 0;
        state.updated_at = Some(Utc::now());
        token
    }

    async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.token = None;
        state.updated_at = Some(Utc::now());
    }

    async fn failure_count(&self) -> u32 {
        self.state.lock().await.failure_count
    }

    async fn record_failure(&self) -> u32 {
        let mut state = self.state.lock().await;
        state.failure_count = state.failure_count.saturating_add(1);
        state.updated_at = Some(Utc::now());
        state.failure_count
    }

    async fn reset_failures(&self) {
        let mut state = self.state.lock().await;
        state.failure_count = 0;
        state.updated_at = Some(Utc::now());
    }

    async fn record(&self) -> AuthRecord {
        self.state.lock().await.clone()
    }
}

/// JSON-file backed store so an unexpired token survives restarts.
///
/// The in-memory record is authoritative; write failures are logged and the
/// next mutation tries again.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    state: Mutex<AuthRecord>,
}

impl FileTokenStore {
    /// Open the record at `path`, starting empty if it is missing or unreadable
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let record = match async_fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<AuthRecord>(&content) {
                Ok(record) => {
                    debug!(
                        "Loaded auth record from {:?} (token: {}, failures: {})",
                        path,
                        record.token.is_some(),
                        record.failure_count
                    );
                    record
                }
                Err(e) => {
                    warn!("Ignoring corrupt auth record at {:?}: {}", path, e);
                    AuthRecord::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No auth record at {:?}, starting fresh", path);
                AuthRecord::default()
            }
            Err(e) => {
                warn!("Failed to read auth record at {:?}: {}", path, e);
                AuthRecord::default()
            }
        };

        Self {
            path,
            state: Mutex::new(record),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the record atomically: temp file in the same directory, then rename
    async fn persist(&self, record: &AuthRecord) {
        if let Err(e) = self.write_atomic(record).await {
            warn!("Failed to persist auth record to {:?}: {}", self.path, e);
        }
    }

    async fn write_atomic(&self, record: &AuthRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            async_fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_vec_pretty(record).map_err(std::io::Error::other)?;
        let temp_path = self.path.with_extension("json.tmp");

        let mut file = async_fs::File::create(&temp_path).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;
        drop(file);

        async_fs::rename(&temp_path, &self.path).await
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self) -> Option<Token> {
        self.state.lock().await.token.clone()
    }

    async fn set(&self, value: String, ttl: Duration) -> Token {
        let mut state = self.state.lock().await;
        let token = Token::issue(value, ttl);
        state.token = Some(token.clone());
        state.failure_count = 0;
        state.updated_at = Some(Utc::now());
        self.persist(&state).await;
        info!("Stored new auth token (expires {})", token.expiry);
        token
    }

    async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.token = None;
        state.updated_at = Some(Utc::now());
        self.persist(&state).await;
        debug!("Cleared stored auth token");
    }

    async fn failure_count(&self) -> u32 {
        self.state.lock().await.failure_count
    }

    async fn record_failure(&self) -> u32 {
        let mut state = self.state.lock().await;
        state.failure_count = state.failure_count.saturating_add(1);
        state.updated_at = Some(Utc::now());
        self.persist(&state).await;
        state.failure_count
    }

    async fn reset_failures(&self) {
        let mut state = self.state.lock().await;
        state.failure_count = 0;
        state.updated_at = Some(Utc::now());
        self.persist(&state).await;
    }

    async fn record(&self) -> AuthRecord {
        self.state.lock().await.clone()
    }
}
