use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("Credential serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Operation timed out: {operation}")]
    OperationTimeout { operation: String },

    #[error("Transport error: {0}")]
    Transport(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, AuthError>;
