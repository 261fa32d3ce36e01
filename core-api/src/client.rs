//! Public API client.

use crate::error::{ApiError, Result};
use crate::executor::RequestExecutor;
use crate::request::ApiRequest;
use crate::retry::RetryPolicy;
use bridge_traits::http::MultipartForm;
use core_auth::{
    CredentialPair, CredentialStore, RefreshCoordinator, SessionState, SessionTerminator,
    SessionTracker,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Entry point for every backend call.
///
/// Cheap to clone; clones share the executor, the renewal coordinator and the
/// session. Every call goes through the renew-and-retry policy, so an expired
/// access credential is transparent to callers.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    executor: RequestExecutor,
    policy: RetryPolicy,
    refresh: RefreshCoordinator,
    terminator: Arc<SessionTerminator>,
    credentials: Arc<CredentialStore>,
    tracker: Arc<SessionTracker>,
    event_bus: EventBus,
}

impl ApiClient {
    pub fn new(
        config: &CoreConfig,
        credentials: Arc<CredentialStore>,
        tracker: Arc<SessionTracker>,
        event_bus: EventBus,
    ) -> Self {
        let executor = RequestExecutor::new(
            config.http_client.clone(),
            credentials.clone(),
            config.api_url(""),
            config.request_timeout,
        );

        let refresh = RefreshCoordinator::new(
            config.http_client.clone(),
            credentials.clone(),
            tracker.clone(),
            event_bus.clone(),
            config.api_url("/auth/refresh"),
        )
        .with_timeout(config.refresh_timeout);

        let mut terminator = SessionTerminator::new(
            credentials.clone(),
            tracker.clone(),
            event_bus.clone(),
            config.login_route.clone(),
        );
        if let Some(navigator) = &config.navigator {
            terminator = terminator.with_navigator(navigator.clone());
        }
        let terminator = Arc::new(terminator);

        let policy = RetryPolicy::new(refresh.clone(), terminator.clone(), credentials.clone());

        Self {
            inner: Arc::new(Inner {
                executor,
                policy,
                refresh,
                terminator,
                credentials,
                tracker,
                event_bus,
            }),
        }
    }

    /// Perform a logical call, renewing the session once if needed.
    pub async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.inner
            .policy
            .execute(&self.inner.executor, &request)
            .await
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.call(ApiRequest::get(endpoint)).await
    }

    pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(ApiRequest::post(endpoint).json(body)?).await
    }

    pub async fn put<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(ApiRequest::put(endpoint).json(body)?).await
    }

    pub async fn patch<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(ApiRequest::patch(endpoint).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.call(ApiRequest::delete(endpoint)).await
    }

    /// POST a multipart form (file uploads).
    pub async fn upload<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        form: MultipartForm,
    ) -> Result<T> {
        self.call(ApiRequest::post(endpoint).multipart(form)).await
    }

    /// Exchange email and password for a credential pair and start a session.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let request = ApiRequest::post("/auth/login")
            .json(&LoginRequest { email, password })?
            .unauthenticated();

        let pair: CredentialPair = self.call(request).await?;

        self.inner
            .credentials
            .set(pair)
            .await
            .map_err(|e| ApiError::CredentialStorage(e.to_string()))?;
        self.inner.tracker.set(SessionState::Authenticated);

        info!("Signed in");
        let _ = self
            .inner
            .event_bus
            .emit(CoreEvent::Session(SessionEvent::SignedIn));
        Ok(())
    }

    /// End the session at the user's request. No navigation is forced.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let cleared = self.inner.credentials.clear().await;
        self.inner.tracker.set(SessionState::NoSession);

        let _ = self
            .inner
            .event_bus
            .emit(CoreEvent::Session(SessionEvent::SignedOut));

        cleared.map_err(|e| {
            warn!(error = %e, "Credentials could not be erased from storage");
            ApiError::CredentialStorage(e.to_string())
        })
    }

    pub fn session_state(&self) -> SessionState {
        self.inner.tracker.state()
    }

    pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.inner.refresh
    }

    pub fn terminator(&self) -> &Arc<SessionTerminator> {
        &self.inner.terminator
    }
}
