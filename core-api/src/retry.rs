//! Renew-and-retry handling for expired credentials.

use crate::error::{is_expiry_signal, ApiError, Result};
use crate::executor::RequestExecutor;
use crate::request::ApiRequest;
use core_auth::{CredentialStore, RefreshCoordinator, SessionTerminator};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Which pass of a logical call is being made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    First,
    Retried,
}

/// Whether a failure may be answered with one renewal and one retry.
///
/// Only an authenticated first attempt that failed with 401 and one of the
/// known expiry messages qualifies. A 401 on the retried attempt is final.
pub fn is_renewable(error: &ApiError, attempt: Attempt, authenticated: bool) -> bool {
    if attempt != Attempt::First || !authenticated {
        return false;
    }
    match error {
        ApiError::Http { status, message } => is_expiry_signal(*status, message),
        _ => false,
    }
}

/// Wraps a [`RequestExecutor`] call in the bounded renewal loop.
///
/// A logical call performs at most two attempts and at most one renewal. When
/// renewal fails the session is terminated and the caller sees
/// [`ApiError::SessionExpired`].
#[derive(Clone)]
pub struct RetryPolicy {
    refresh: RefreshCoordinator,
    terminator: Arc<SessionTerminator>,
    credentials: Arc<CredentialStore>,
}

impl RetryPolicy {
    pub fn new(
        refresh: RefreshCoordinator,
        terminator: Arc<SessionTerminator>,
        credentials: Arc<CredentialStore>,
    ) -> Self {
        Self {
            refresh,
            terminator,
            credentials,
        }
    }

    #[instrument(
        skip(self, executor, request),
        fields(method = %request.method, endpoint = %request.endpoint)
    )]
    pub async fn execute<T: DeserializeOwned>(
        &self,
        executor: &RequestExecutor,
        request: &ApiRequest,
    ) -> Result<T> {
        let mut attempt = Attempt::First;

        loop {
            let used = if request.authenticated {
                self.credentials.access_token().await
            } else {
                None
            };

            let error = match executor.call_with_token(request, used.as_deref()).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !is_renewable(&error, attempt, request.authenticated) {
                return Err(error);
            }
            attempt = Attempt::Retried;

            // Another call already renewed while this one was on the wire.
            let current = self.credentials.access_token().await;
            if current.is_some() && current != used {
                debug!("Credential changed since the attempt was sent, retrying without renewal");
                continue;
            }

            debug!("Access credential expired, renewing");
            let renewed = match &request.cancel {
                Some(token) => tokio::select! {
                    _ = token.cancelled() => return Err(ApiError::Cancelled),
                    renewed = self.refresh.refresh() => renewed,
                },
                None => self.refresh.refresh().await,
            };

            if !renewed {
                info!("Renewal failed, ending session");
                self.terminator.terminate().await;
                return Err(ApiError::SessionExpired);
            }
        }
    }
}
