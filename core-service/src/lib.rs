//! Core service façade and bootstrap helpers.
//!
//! This crate wires a validated [`CoreConfig`] into the shared client core:
//! one credential store, one session tracker, one API client and the feature
//! services built on it. Hosts construct a [`CoreService`] once at startup
//! and hand clones of it to every view. Desktop apps typically enable the
//! `desktop-shims` feature (reqwest transport, OS keychain), whereas
//! headless hosts enable `headless` (reqwest transport, file-backed
//! credentials).

pub mod error;

pub use error::{CoreError, Result};

pub use core_api::{ApiClient, ApiError, ApiRequest, ErrorKind};
pub use core_auth::SessionState;
pub use core_runtime::config::{CoreConfig, CoreConfigBuilder};
pub use core_runtime::events::{CoreEvent, EventStream, SessionEvent, TaskEvent};
pub use core_tasks::{Task, TaskId, TaskService};

use core_auth::{CredentialStore, SessionTracker};
use core_runtime::events::EventBus;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, instrument};

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<Inner>,
}

struct Inner {
    config: CoreConfig,
    event_bus: EventBus,
    credentials: Arc<CredentialStore>,
    tracker: Arc<SessionTracker>,
    api: ApiClient,
    tasks: TaskService,
}

impl CoreService {
    /// Create a new service from a configuration.
    ///
    /// The session starts as `NoSession`; call [`restore_session`] to pick
    /// up credentials persisted by a previous run.
    ///
    /// [`restore_session`]: CoreService::restore_session
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let credentials = Arc::new(CredentialStore::new(
            config.secure_store.clone(),
            config.credential_key(),
        ));
        let tracker = Arc::new(SessionTracker::default());
        let api = ApiClient::new(
            &config,
            credentials.clone(),
            tracker.clone(),
            event_bus.clone(),
        );
        let tasks = TaskService::new(api.clone(), config.clock.clone(), event_bus.clone());

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                event_bus,
                credentials,
                tracker,
                api,
                tasks,
            }),
        })
    }

    /// Resume a session persisted by a previous run.
    ///
    /// Returns whether stored credentials were found.
    #[instrument(skip(self))]
    pub async fn restore_session(&self) -> bool {
        match self.inner.credentials.get().await {
            Some(_) => {
                self.inner.tracker.set(SessionState::Authenticated);
                info!("Stored session restored");
                true
            }
            None => false,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.inner.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub fn tasks(&self) -> &TaskService {
        &self.inner.tasks
    }

    pub fn session_state(&self) -> SessionState {
        self.inner.tracker.state()
    }

    /// Receiver that yields every session state change.
    pub fn watch_session(&self) -> watch::Receiver<SessionState> {
        self.inner.tracker.subscribe()
    }

    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.inner.event_bus.subscribe())
    }

    /// Sign in and start a session.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        Ok(self.inner.api.login(email, password).await?)
    }

    /// Sign out at the user's request.
    pub async fn logout(&self) -> Result<()> {
        Ok(self.inner.api.logout().await?)
    }
}

/// Build a service from `OPSDESK_*` environment variables and restore any
/// stored session.
///
/// Transport and credential storage come from the enabled platform feature.
pub async fn bootstrap() -> Result<CoreService> {
    let config = CoreConfigBuilder::from_env()?.build()?;
    let core = CoreService::new(config)?;
    core.restore_session().await;
    Ok(core)
}
