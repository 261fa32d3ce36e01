use serde::{Deserialize, Serialize};
use std::fmt;

/// The access/refresh credential pair issued by the backend.
///
/// Both values are opaque. `Debug` never prints them.
///
/// # Examples
///
/// ```
/// use core_auth::CredentialPair;
///
/// let pair: CredentialPair =
///     serde_json::from_str(r#"{"accessToken":"a-1","refreshToken":"r-1"}"#).unwrap();
/// assert_eq!(pair.access_token(), "a-1");
/// assert!(!format!("{:?}", pair).contains("a-1"));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    access_token: String,
    refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Session lifecycle as seen by the core.
///
/// ```text
/// NoSession ──login──> Authenticated ──401──> Refreshing ──ok──> Authenticated
///     ^                                           │
///     └──────────────── terminate ────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    NoSession,
    Authenticated,
    Refreshing,
}

impl SessionState {
    /// True while credentials are believed usable.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Authenticated | SessionState::Refreshing)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::NoSession => write!(f, "no-session"),
            SessionState::Authenticated => write!(f, "authenticated"),
            SessionState::Refreshing => write!(f, "refreshing"),
        }
    }
}
