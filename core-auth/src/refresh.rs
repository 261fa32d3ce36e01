//! Single-flight credential renewal.
//!
//! Any number of requests can discover at the same moment that the access
//! credential expired. [`RefreshCoordinator::refresh`] makes sure only one
//! renewal call reaches the backend for all of them:
//!
//! 1. The first caller publishes an in-flight handle under a lock, then
//!    starts the renewal on a spawned task.
//! 2. Callers arriving while the handle is published wait on it instead of
//!    issuing their own call.
//! 3. The renewal writes its outcome to the [`CredentialStore`] (new pair, or
//!    cleared) before the handle resolves, so every waiter that retries reads
//!    the new credentials.
//!
//! The renewed pair is only written if the store was not cleared or replaced
//! while the call was in flight, so a logout (or a fresh login) racing a
//! renewal always wins.
//!
//! Because the renewal runs on its own task, dropping a waiting caller (for
//! example a cancelled request) never aborts a renewal others depend on.

use crate::credential_store::CredentialStore;
use crate::error::{AuthError, Result};
use crate::session::SessionTracker;
use crate::types::CredentialPair;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify, OnceCell};
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

/// Default deadline for the renewal call
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Outcome shared by every caller of one renewal.
struct InFlightState {
    result: OnceCell<bool>,
    notify: Notify,
}

impl InFlightState {
    fn new() -> Self {
        Self {
            result: OnceCell::new(),
            notify: Notify::new(),
        }
    }

    fn set_result(&self, renewed: bool) {
        let _ = self.result.set(renewed);
        self.notify.notify_waiters();
    }

    async fn wait(&self) -> bool {
        loop {
            if let Some(renewed) = self.result.get() {
                return *renewed;
            }

            let notified = self.notify.notified();
            if let Some(renewed) = self.result.get() {
                return *renewed;
            }

            notified.await;
        }
    }
}

struct Inner {
    http_client: Arc<dyn HttpClient>,
    credentials: Arc<CredentialStore>,
    tracker: Arc<SessionTracker>,
    event_bus: EventBus,
    refresh_url: String,
    timeout: Duration,
    in_flight: Mutex<Option<Arc<InFlightState>>>,
}

/// Coordinates credential renewal so that at most one renewal is in flight.
///
/// Cloning is cheap and clones share the in-flight handle.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    /// Create a coordinator posting to `refresh_url`
    /// (e.g. `https://host/api/auth/refresh`).
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        credentials: Arc<CredentialStore>,
        tracker: Arc<SessionTracker>,
        event_bus: EventBus,
        refresh_url: impl Into<String>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                http_client,
                credentials,
                tracker,
                event_bus,
                refresh_url: refresh_url.into(),
                timeout: DEFAULT_REFRESH_TIMEOUT,
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Override the renewal deadline. Only meaningful before the first clone.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.timeout = timeout;
        }
        self
    }

    /// Renew the credential pair, joining a renewal already in flight.
    ///
    /// Returns true when the store now holds a fresh pair. Returns false
    /// without any network call when no refresh credential is stored, and
    /// false after clearing the store when renewal fails for any reason.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> bool {
        let flight = {
            let mut slot = self.inner.in_flight.lock().await;

            if let Some(existing) = slot.as_ref() {
                debug!("Joining renewal already in flight");
                Arc::clone(existing)
            } else {
                let Some((refresh_token, generation)) =
                    self.inner.credentials.refresh_token_at_generation().await
                else {
                    debug!("No refresh credential stored, not renewing");
                    return false;
                };

                let flight = Arc::new(InFlightState::new());
                *slot = Some(Arc::clone(&flight));

                let inner = Arc::clone(&self.inner);
                let published = Arc::clone(&flight);
                tokio::spawn(async move {
                    let renewed = inner.renew(refresh_token, generation).await;
                    published.set_result(renewed);
                    inner.in_flight.lock().await.take();
                });

                flight
            }
        };

        flight.wait().await
    }

    /// Whether a renewal is currently in flight
    pub async fn is_refreshing(&self) -> bool {
        self.inner.in_flight.lock().await.is_some()
    }
}

impl Inner {
    async fn renew(&self, refresh_token: String, generation: u64) -> bool {
        info!("Renewing credentials");
        self.tracker.begin_refresh();
        let _ = self
            .event_bus
            .emit(CoreEvent::Session(SessionEvent::TokenRefreshing));

        let outcome = match timeout(self.timeout, self.request_pair(&refresh_token)).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::OperationTimeout {
                operation: "token refresh".to_string(),
            }),
        };

        let outcome = match outcome {
            Ok(pair) => self.credentials.set_if_unchanged(pair, generation).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(false) => {
                // Logout or login replaced the credentials meanwhile; whatever
                // is stored now is the answer.
                let current = self.credentials.get().await.is_some();
                warn!(current, "Credentials changed during renewal, renewed pair discarded");
                if current {
                    self.tracker.resume();
                }
                current
            }
            Ok(true) => {
                if !self.tracker.resume() {
                    warn!("Session ended while renewed credentials were stored");
                }
                let _ = self
                    .event_bus
                    .emit(CoreEvent::Session(SessionEvent::TokenRefreshed));
                info!("Credentials renewed");
                true
            }
            Err(e) => {
                error!(error = %e, "Credential renewal failed");
                match self.credentials.clear_if_unchanged(generation).await {
                    Ok(true) => {}
                    Ok(false) => {
                        if self.credentials.get().await.is_some() {
                            warn!("Credentials replaced during failed renewal, keeping them");
                            self.tracker.resume();
                            return true;
                        }
                    }
                    Err(clear_err) => {
                        warn!(error = %clear_err, "Failed to clear credentials after renewal failure");
                    }
                }
                let _ = self
                    .event_bus
                    .emit(CoreEvent::Session(SessionEvent::RefreshFailed {
                        reason: e.to_string(),
                    }));
                false
            }
        }
    }

    async fn request_pair(&self, refresh_token: &str) -> Result<CredentialPair> {
        let request = HttpRequest::new(HttpMethod::Post, &self.refresh_url)
            .json(&RefreshRequest { refresh_token })?
            .timeout(self.timeout);

        let response = self.http_client.execute(request).await?;

        if !response.is_success() {
            return Err(AuthError::TokenRefreshFailed(format!(
                "HTTP {}",
                response.status
            )));
        }

        response
            .json::<CredentialPair>()
            .map_err(|e| AuthError::TokenRefreshFailed(format!("invalid response body: {}", e)))
    }
}
