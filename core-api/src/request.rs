//! Description of one logical API call.
//!
//! An [`ApiRequest`] is immutable once built; the retry loop re-issues the
//! same value, so a retried call is byte-for-byte the original apart from the
//! `Authorization` header.

use crate::error::{ApiError, Result};
use bridge_traits::http::{HttpMethod, MultipartForm};
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Request payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    None,
    /// Sent as `application/json`
    Json(serde_json::Value),
    /// Sent as `multipart/form-data`; the transport picks the boundary
    Multipart(MultipartForm),
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path under the API prefix, e.g. `/tasks/7/complete`
    pub endpoint: String,
    pub body: RequestBody,
    /// Extra headers. `Authorization` is always set by the executor.
    pub headers: Vec<(String, String)>,
    /// Overrides the configured request deadline
    pub timeout: Option<Duration>,
    /// Whether the stored credential is attached and expiry handling applies
    pub authenticated: bool,
    pub cancel: Option<CancellationToken>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            body: RequestBody::None,
            headers: Vec::new(),
            timeout: None,
            authenticated: true,
            cancel: None,
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, endpoint)
    }

    pub fn put(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, endpoint)
    }

    pub fn patch(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, endpoint)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, endpoint)
    }

    /// Attach a JSON body. Serialization happens here, once.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("JSON serialization failed: {}", e)))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Abort the call (including a pending retry) when `token` is cancelled.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Skip credentials and expiry handling (login and other public endpoints).
    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(CancellationToken::is_cancelled)
            .unwrap_or(false)
    }
}
