//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (e.g., `core-service`). Host applications can depend on
//! `opsdesk-workspace` and enable `desktop-shims` (OS keychain + reqwest
//! defaults) or `headless` (file-backed credentials) without wiring each
//! crate individually.

#[cfg(any(feature = "desktop-shims", feature = "headless"))]
pub use core_service::*;
