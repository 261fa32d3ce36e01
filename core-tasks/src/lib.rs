//! # Tasks Module
//!
//! Operational task list for the admin dashboard.
//!
//! Tasks are loaded once and kept in an [`OptimisticList`]; marking a task
//! complete or reopening it updates the list immediately and reverts the
//! change if the backend rejects it.

pub mod error;
pub mod models;
pub mod optimistic;
pub mod service;

pub use error::{Result, TaskError};
pub use models::{Identifiable, Task, TaskId};
pub use optimistic::{MissingEntity, OptimisticEdit, OptimisticList};
pub use service::TaskService;
