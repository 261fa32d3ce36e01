//! Credential Storage
//!
//! Durable home of the current [`CredentialPair`], layered over the host's
//! [`SecureStore`].
//!
//! ## Security Features
//!
//! - Credential values are never logged or put into error messages
//! - Storage uses the injected `SecureStore` (OS keychain, file, memory)
//! - Unreadable entries are erased rather than surfaced to callers
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{CredentialPair, CredentialStore};
//! use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # async fn example(secure_store: Arc<dyn SecureStore>) -> core_auth::Result<()> {
//! let store = CredentialStore::new(secure_store, "opsdesk.session");
//!
//! store.set(CredentialPair::new("access", "refresh")).await?;
//! assert!(store.get().await.is_some());
//!
//! store.clear().await?;
//! assert!(store.get().await.is_none());
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::CredentialPair;
use bridge_traits::storage::SecureStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

enum Cached {
    Unloaded,
    Loaded(Option<CredentialPair>),
}

/// Persistent store for the session's credential pair.
///
/// Reads are served from memory after the first successful load; writes go
/// to the secure store first and then to memory, so a process restart sees
/// whatever the last successful `set` wrote.
///
/// Every `set` and `clear` bumps a generation counter while holding the write
/// lock. [`set_if_unchanged`](Self::set_if_unchanged) uses it to drop a write
/// that was computed from credentials someone else has since replaced.
pub struct CredentialStore {
    secure_store: Arc<dyn SecureStore>,
    key: String,
    cache: RwLock<Cached>,
    generation: AtomicU64,
}

impl CredentialStore {
    /// Create a store persisting under `key`
    pub fn new(secure_store: Arc<dyn SecureStore>, key: impl Into<String>) -> Self {
        debug!("Initializing CredentialStore");
        Self {
            secure_store,
            key: key.into(),
            cache: RwLock::new(Cached::Unloaded),
            generation: AtomicU64::new(0),
        }
    }

    /// Current credential pair, or `None` when signed out.
    ///
    /// Never fails. A storage read error is logged and reported as absent (the
    /// next call retries the read); an entry that cannot be decoded is deleted.
    pub async fn get(&self) -> Option<CredentialPair> {
        if let Cached::Loaded(pair) = &*self.cache.read().await {
            return pair.clone();
        }

        let mut cache = self.cache.write().await;
        if let Cached::Loaded(pair) = &*cache {
            return pair.clone();
        }

        let data = match self.secure_store.get_secret(&self.key).await {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "Failed to read credentials from secure storage");
                return None;
            }
        };

        let pair = match data {
            None => {
                debug!("No stored credentials");
                None
            }
            Some(bytes) => match serde_json::from_slice::<CredentialPair>(&bytes) {
                Ok(pair) => {
                    info!("Stored credentials loaded");
                    Some(pair)
                }
                Err(e) => {
                    warn!(error = %e, "Stored credentials are corrupted, deleting them");
                    if let Err(delete_err) = self.secure_store.delete_secret(&self.key).await {
                        warn!(error = %delete_err, "Failed to delete corrupted credentials");
                    }
                    None
                }
            },
        };

        *cache = Cached::Loaded(pair.clone());
        pair
    }

    /// Access credential of the current pair
    pub async fn access_token(&self) -> Option<String> {
        self.get().await.map(|pair| pair.access_token().to_string())
    }

    /// Refresh credential of the current pair, `None` when absent or empty
    pub async fn refresh_token(&self) -> Option<String> {
        self.get()
            .await
            .map(|pair| pair.refresh_token().to_string())
            .filter(|token| !token.is_empty())
    }

    /// Generation of the stored pair; changes on every `set` and `clear`.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Refresh credential together with the generation it was read at.
    pub async fn refresh_token_at_generation(&self) -> Option<(String, u64)> {
        // Generation first: a clear in between makes the token read absent.
        let generation = self.generation();
        self.refresh_token().await.map(|token| (token, generation))
    }

    /// Replace the stored pair.
    ///
    /// The in-memory copy is only updated once the secure store accepted the
    /// write.
    pub async fn set(&self, pair: CredentialPair) -> Result<()> {
        let mut cache = self.cache.write().await;
        self.write_locked(&mut cache, pair).await
    }

    /// Replace the stored pair only if nothing was stored or cleared since
    /// `generation` was read.
    ///
    /// Returns false, leaving storage untouched, when the pair was replaced
    /// or cleared in the meantime.
    pub async fn set_if_unchanged(&self, pair: CredentialPair, generation: u64) -> Result<bool> {
        let mut cache = self.cache.write().await;
        if self.generation() != generation {
            debug!("Credentials changed since read, discarding write");
            return Ok(false);
        }
        self.write_locked(&mut cache, pair).await?;
        Ok(true)
    }

    async fn write_locked(&self, cache: &mut Cached, pair: CredentialPair) -> Result<()> {
        let json = serde_json::to_vec(&pair)?;
        self.generation.fetch_add(1, Ordering::SeqCst);

        self.secure_store
            .set_secret(&self.key, &json)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to store credentials in secure storage");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        *cache = Cached::Loaded(Some(pair));
        info!("Credentials stored securely");
        Ok(())
    }

    /// Remove the stored pair only if nothing was stored or cleared since
    /// `generation` was read.
    pub async fn clear_if_unchanged(&self, generation: u64) -> Result<bool> {
        let mut cache = self.cache.write().await;
        if self.generation() != generation {
            return Ok(false);
        }
        self.clear_locked(&mut cache).await?;
        Ok(true)
    }

    /// Remove the stored pair.
    ///
    /// Memory is cleared even when the secure store fails to delete, so the
    /// running process stops sending the old credentials either way.
    pub async fn clear(&self) -> Result<()> {
        let mut cache = self.cache.write().await;
        self.clear_locked(&mut cache).await
    }

    async fn clear_locked(&self, cache: &mut Cached) -> Result<()> {
        *cache = Cached::Loaded(None);
        self.generation.fetch_add(1, Ordering::SeqCst);

        self.secure_store
            .delete_secret(&self.key)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to delete credentials from secure storage");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!("Credentials cleared");
        Ok(())
    }
}
