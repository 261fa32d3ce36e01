use crate::optimistic::MissingEntity;
use core_api::ApiError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    #[error("Task not found: {id}")]
    NotFound { id: String },

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl TaskError {
    /// The backend rejected the change because the task changed on the server
    pub fn is_conflict(&self) -> bool {
        matches!(self, TaskError::Api(ApiError::Conflict { .. }))
    }
}

impl From<MissingEntity> for TaskError {
    fn from(e: MissingEntity) -> Self {
        TaskError::NotFound { id: e.id }
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;
