//! # Core Configuration Module
//!
//! Provides configuration management for the Opsdesk client core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds all necessary dependencies and settings for the core library.
//! It enforces fail-fast validation so a misconfigured host fails at startup rather
//! than on its first request.
//!
//! ## Required Settings
//!
//! - `base_url` - Backend origin (`http://` or `https://`)
//!
//! ## Bridges (with platform defaults)
//!
//! - `HttpClient` - Transport (default: reqwest)
//! - `SecureStore` - Credential persistence (default: OS keychain with
//!   `desktop-shims`, JSON file with `headless`)
//! - `Clock` - Time source (default: system clock)
//! - `Navigator` - Host routing hook (optional; termination is also published
//!   on the event bus)
//!
//! Without the `desktop-shims` or `headless` feature, `HttpClient` and
//! `SecureStore` must be injected or `build()` fails with
//! [`Error::CapabilityMissing`].
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .base_url("https://admin.example.com")
//!     .request_timeout(Duration::from_secs(15))
//!     .build()
//!     .expect("Failed to build config");
//!
//! assert_eq!(config.api_url("/tasks"), "https://admin.example.com/api/tasks");
//! ```
//!
//! ## Environment
//!
//! [`CoreConfigBuilder::from_env`] seeds a builder from `OPSDESK_API_URL`,
//! `OPSDESK_API_PREFIX` and `OPSDESK_REQUEST_TIMEOUT_SECS`.

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{Clock, HttpClient, Navigator, SecureStore, SystemClock};
use std::sync::Arc;
use std::time::Duration;

/// Default API path prefix joined to the base URL.
pub const DEFAULT_API_PREFIX: &str = "/api";

/// Default route the host shows after a forced sign-out.
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";

/// Default namespace for persisted credentials.
pub const DEFAULT_CREDENTIAL_NAMESPACE: &str = "opsdesk";

/// Default deadline for a single API request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default deadline for a credential renewal.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENV_API_URL: &str = "OPSDESK_API_URL";
pub const ENV_API_PREFIX: &str = "OPSDESK_API_PREFIX";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "OPSDESK_REQUEST_TIMEOUT_SECS";

/// Core configuration for the Opsdesk client core.
///
/// This struct holds all dependencies and settings required to initialize
/// the core library. Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Backend origin without trailing slash
    pub base_url: String,

    /// Path prefix for every API endpoint (e.g. `/api`), may be empty
    pub api_prefix: String,

    /// Deadline applied to each API request unless the request sets its own
    pub request_timeout: Duration,

    /// Deadline for the renewal call
    pub refresh_timeout: Duration,

    /// Route requested when the session is terminated
    pub login_route: String,

    /// Namespace for the persisted credential entry
    pub credential_namespace: String,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,

    /// Transport for all backend calls
    pub http_client: Arc<dyn HttpClient>,

    /// Durable credential storage
    pub secure_store: Arc<dyn SecureStore>,

    /// Host routing hook (optional)
    pub navigator: Option<Arc<dyn Navigator>>,

    /// Time source
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("base_url", &self.base_url)
            .field("api_prefix", &self.api_prefix)
            .field("request_timeout", &self.request_timeout)
            .field("refresh_timeout", &self.refresh_timeout)
            .field("login_route", &self.login_route)
            .field("credential_namespace", &self.credential_namespace)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("http_client", &"HttpClient { ... }")
            .field("secure_store", &"SecureStore { ... }")
            .field(
                "navigator",
                &self.navigator.as_ref().map(|_| "Navigator { ... }"),
            )
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Full URL for an API path such as `/tasks/7/complete`.
    pub fn api_url(&self, path: &str) -> String {
        if path.starts_with('/') || path.is_empty() {
            format!("{}{}{}", self.base_url, self.api_prefix, path)
        } else {
            format!("{}{}/{}", self.base_url, self.api_prefix, path)
        }
    }

    /// Key under which the credential pair is persisted.
    pub fn credential_key(&self) -> String {
        format!("{}.session", self.credential_namespace)
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Base URL uses http or https and names a host
    /// - API prefix and login route are absolute paths
    /// - Timeouts and buffer size are non-zero
    /// - Credential namespace is a plain identifier
    pub fn validate(&self) -> Result<()> {
        let rest = self
            .base_url
            .strip_prefix("https://")
            .or_else(|| self.base_url.strip_prefix("http://"))
            .ok_or_else(|| {
                Error::Config(format!(
                    "Base URL must start with http:// or https://, got '{}'",
                    self.base_url
                ))
            })?;

        if rest.is_empty() || rest.starts_with('/') {
            return Err(Error::Config(format!(
                "Base URL '{}' has no host",
                self.base_url
            )));
        }

        if !self.api_prefix.is_empty() && !self.api_prefix.starts_with('/') {
            return Err(Error::Config(format!(
                "API prefix must be empty or start with '/', got '{}'",
                self.api_prefix
            )));
        }

        if !self.login_route.starts_with('/') {
            return Err(Error::Config(format!(
                "Login route must start with '/', got '{}'",
                self.login_route
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.refresh_timeout.is_zero() {
            return Err(Error::Config(
                "Refresh timeout must be greater than zero".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than zero".to_string(),
            ));
        }

        if self.credential_namespace.is_empty()
            || !self
                .credential_namespace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::Config(format!(
                "Credential namespace must be non-empty and contain only [A-Za-z0-9_-], got '{}'",
                self.credential_namespace
            )));
        }

        Ok(())
    }
}

#[cfg(not(any(feature = "desktop-shims", feature = "headless")))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for backend calls. \
                 Enable the 'desktop-shims' or 'headless' feature to use the default \
                 ReqwestHttpClient, or inject your own transport."
            .to_string(),
    }
}

#[cfg(not(any(feature = "desktop-shims", feature = "headless")))]
fn secure_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SecureStore".to_string(),
        message: "SecureStore implementation is required for credential persistence. \
                 Desktop: enable the 'desktop-shims' feature to use the OS keychain. \
                 Servers and containers: enable the 'headless' feature to use a file store."
            .to_string(),
    }
}

#[cfg(any(feature = "desktop-shims", feature = "headless"))]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::try_with_timeout(timeout).map_err(|e| {
        Error::CapabilityMissing {
            capability: "HttpClient".to_string(),
            message: format!("Failed to build default ReqwestHttpClient: {}", e),
        }
    })?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(any(feature = "desktop-shims", feature = "headless")))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "headless")]
fn provide_default_secure_store(namespace: &str) -> Result<Arc<dyn SecureStore>> {
    use bridge_desktop::FileSecureStore;

    let store: Arc<dyn SecureStore> = Arc::new(FileSecureStore::new(namespace));
    Ok(store)
}

#[cfg(all(feature = "desktop-shims", not(feature = "headless")))]
fn provide_default_secure_store(namespace: &str) -> Result<Arc<dyn SecureStore>> {
    use bridge_desktop::KeyringSecureStore;

    let store: Arc<dyn SecureStore> =
        Arc::new(KeyringSecureStore::with_service_name(format!("{}-core", namespace)));
    Ok(store)
}

#[cfg(not(any(feature = "desktop-shims", feature = "headless")))]
fn provide_default_secure_store(_namespace: &str) -> Result<Arc<dyn SecureStore>> {
    Err(secure_store_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Use this builder to incrementally set configuration options and then
/// call [`build()`](CoreConfigBuilder::build) to create the final config.
#[derive(Default)]
pub struct CoreConfigBuilder {
    base_url: Option<String>,
    api_prefix: Option<String>,
    request_timeout: Option<Duration>,
    refresh_timeout: Option<Duration>,
    login_route: Option<String>,
    credential_namespace: Option<String>,
    event_buffer_size: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    navigator: Option<Arc<dyn Navigator>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CoreConfigBuilder {
    /// Seeds a builder from the process environment.
    ///
    /// Unset variables leave the corresponding setting at its default; a
    /// timeout that is not a whole number of seconds is an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            builder = builder.base_url(url);
        }

        if let Some(prefix) = lookup(ENV_API_PREFIX) {
            builder = builder.api_prefix(prefix);
        }

        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    ENV_REQUEST_TIMEOUT_SECS, raw
                ))
            })?;
            builder = builder.request_timeout(Duration::from_secs(secs));
        }

        Ok(builder)
    }

    /// Sets the backend origin, e.g. `https://admin.example.com`.
    ///
    /// A trailing slash is ignored.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the API path prefix (default `/api`).
    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = Some(prefix.into());
        self
    }

    /// Sets the default per-request deadline.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the deadline for the renewal call.
    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = Some(timeout);
        self
    }

    /// Sets the route requested on forced sign-out (default `/login`).
    pub fn login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = Some(route.into());
        self
    }

    pub fn credential_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.credential_namespace = Some(namespace.into());
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Injects the HTTP transport.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Injects the credential store.
    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Injects the host navigator notified on forced sign-out.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Injects the time source.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - The base URL is missing or malformed
    /// - A required bridge is missing and no platform default is compiled in
    /// - Any other value fails [`CoreConfig::validate`]
    pub fn build(self) -> Result<CoreConfig> {
        let base_url = self.base_url.ok_or_else(|| {
            Error::Config("Base URL is required. Use .base_url() to set it.".to_string())
        })?;
        let base_url = base_url.trim().trim_end_matches('/').to_string();

        let api_prefix = self
            .api_prefix
            .map(|p| p.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_PREFIX.to_string());

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let credential_namespace = self
            .credential_namespace
            .unwrap_or_else(|| DEFAULT_CREDENTIAL_NAMESPACE.to_string());

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout)?,
        };

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store(&credential_namespace)?,
        };

        let config = CoreConfig {
            base_url,
            api_prefix,
            request_timeout,
            refresh_timeout: self.refresh_timeout.unwrap_or(DEFAULT_REFRESH_TIMEOUT),
            login_route: self
                .login_route
                .unwrap_or_else(|| DEFAULT_LOGIN_ROUTE.to_string()),
            credential_namespace,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            http_client,
            secure_store,
            navigator: self.navigator,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        };

        config.validate()?;

        Ok(config)
    }
}
