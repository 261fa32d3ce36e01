use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error(transparent)]
    Api(#[from] core_api::ApiError),

    #[error(transparent)]
    Task(#[from] core_tasks::TaskError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
