//! Task domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An entity that can be located in a local list by a stable id.
pub trait Identifiable {
    type Id: Clone + PartialEq + fmt::Debug + fmt::Display + Send + Sync;

    fn id(&self) -> &Self::Id;
}

/// Unique identifier for a task, as assigned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TaskId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Operational task shown on the admin dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            completed: false,
            completed_at: None,
        }
    }

    /// Copy of this task marked complete at `at`.
    pub fn completed_at(&self, at: DateTime<Utc>) -> Self {
        Self {
            completed: true,
            completed_at: Some(at),
            ..self.clone()
        }
    }

    /// Copy of this task marked open, without a completion timestamp.
    pub fn reopened(&self) -> Self {
        Self {
            completed: false,
            completed_at: None,
            ..self.clone()
        }
    }
}

impl Identifiable for Task {
    type Id = TaskId;

    fn id(&self) -> &TaskId {
        &self.id
    }
}

/// Body of `PATCH /tasks/{id}/complete`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CompleteTask {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}
