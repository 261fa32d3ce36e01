//! File-backed secure store for headless hosts

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SecureStore,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const FILE_NAME: &str = "credentials.json";

/// Secure store persisting secrets to a single JSON file.
///
/// Values are base64 encoded; the file is written to a temporary sibling and
/// renamed into place so a crash never leaves a half-written file. On Unix the
/// temporary file is created with mode `0600`, so secrets are never readable by
/// others. An unparseable file fails reads but is replaced by the next write
/// and removed by the next delete.
///
/// Intended for hosts without an OS keychain (servers, containers, CI).
pub struct FileSecureStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSecureStore {
    /// Store under the platform data directory (`<data_dir>/<app_name>/credentials.json`)
    pub fn new(app_name: &str) -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".local")
                    .join("share")
            })
            .join(app_name);

        Self::with_path(data_dir.join(FILE_NAME))
    }

    /// Store at an explicit file path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Contents> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)
                .map(Contents::Entries)
                .unwrap_or_else(|e| {
                    warn!(error = %e, "Credential file is not valid JSON");
                    Contents::Corrupted(e.to_string())
                })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Contents::Entries(BTreeMap::new()))
            }
            Err(e) => Err(BridgeError::Io(e)),
        }
    }

    async fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(entries).map_err(|e| {
            BridgeError::OperationFailed(format!("Failed to encode credential file: {}", e))
        })?;

        let tmp = self.path.with_extension("json.tmp");
        // A leftover from a crash may carry looser permissions; start fresh.
        remove_if_present(&tmp).await?;

        let mut file = owner_only_options().open(&tmp).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, &self.path).await?;

        debug!(entries = entries.len(), "Credential file written");
        Ok(())
    }
}

/// Parsed credential file, or why it could not be parsed.
enum Contents {
    Entries(BTreeMap<String, String>),
    Corrupted(String),
}

fn owner_only_options() -> fs::OpenOptions {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    options
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BridgeError::Io(e)),
    }
}

#[async_trait]
impl SecureStore for FileSecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = match self.load().await? {
            Contents::Entries(entries) => entries,
            Contents::Corrupted(_) => {
                warn!("Replacing corrupted credential file");
                BTreeMap::new()
            }
        };
        entries.insert(key.to_string(), STANDARD.encode(value));
        self.write_all(&entries).await
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let _guard = self.lock.lock().await;
        let entries = match self.load().await? {
            Contents::Entries(entries) => entries,
            Contents::Corrupted(reason) => {
                return Err(BridgeError::OperationFailed(format!(
                    "Corrupted credential file: {}",
                    reason
                )))
            }
        };

        entries
            .get(key)
            .map(|encoded| {
                STANDARD.decode(encoded).map_err(|e| {
                    BridgeError::OperationFailed(format!("Failed to decode secret: {}", e))
                })
            })
            .transpose()
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = match self.load().await? {
            Contents::Entries(entries) => entries,
            Contents::Corrupted(_) => {
                // Unreadable, so the key may be in there: drop the whole file.
                warn!("Removing corrupted credential file");
                return remove_if_present(&self.path).await;
            }
        };

        if entries.remove(key).is_none() {
            return Ok(());
        }

        if entries.is_empty() {
            remove_if_present(&self.path).await
        } else {
            self.write_all(&entries).await
        }
    }
}
