//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the Opsdesk client core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the core runtime utilities that other modules depend on.
//! It establishes the logging conventions, the validated configuration every
//! service is built from, and the event broadcasting used to tell the host
//! about session and task changes.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream, SessionEvent, TaskEvent};
