//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop and server hosts
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides production-ready implementations of the bridge traits
//! using desktop-appropriate libraries:
//! - `HttpClient` using `reqwest` (JSON and multipart bodies)
//! - `SecureStore` using the `keyring` crate (OS keychain)
//! - `SecureStore` backed by a JSON file for hosts without a keychain
//! - `SecureStore` in memory for tests and throwaway sessions
//!
//! ## Feature Flags
//!
//! - `secure-store`: Enable OS keychain integration (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FileSecureStore, ReqwestHttpClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let http_client = ReqwestHttpClient::new();
//!     let secure_store = FileSecureStore::new("opsdesk");
//!
//!     // Use in core configuration
//! }
//! ```

mod file_store;
mod http;
mod memory_store;

#[cfg(feature = "secure-store")]
mod secure_store;

pub use file_store::FileSecureStore;
pub use http::ReqwestHttpClient;
pub use memory_store::MemorySecureStore;

#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;
