//! # Authentication Module
//!
//! Session credentials for the Opsdesk client core.
//!
//! ## Overview
//!
//! This module owns everything that touches the access/refresh credential
//! pair: durable storage, single-flight renewal when the backend reports an
//! expired credential, and forced termination of the session when renewal
//! is impossible.
//!
//! ## Features
//!
//! - [`CredentialStore`]: credential pair persisted through the host `SecureStore`
//! - [`RefreshCoordinator`]: at most one renewal in flight, shared by all callers
//! - [`SessionTracker`]: observable `NoSession`/`Authenticated`/`Refreshing` state
//! - [`SessionTerminator`]: clear credentials and navigate to login exactly once
//! - Session events on the core `EventBus`

pub mod credential_store;
pub mod error;
pub mod refresh;
pub mod session;
pub mod types;

pub use credential_store::CredentialStore;
pub use error::{AuthError, Result};
pub use refresh::RefreshCoordinator;
pub use session::{SessionTerminator, SessionTracker};
pub use types::{CredentialPair, SessionState};
