use bridge_traits::BridgeError;
use thiserror::Error;

/// Message used when a failure body carries no readable `message`
pub const UNKNOWN_ERROR_MESSAGE: &str = "Erro desconhecido";

/// Message surfaced when the session could not be renewed
pub const SESSION_EXPIRED_MESSAGE: &str = "Sessão expirada. Faça login novamente.";

pub const TIMEOUT_MESSAGE: &str = "Tempo limite da requisição excedido";

pub const CANCELLED_MESSAGE: &str = "Requisição cancelada";

/// Backend messages that, together with HTTP 401, mean the access credential expired.
pub const EXPIRY_MESSAGES: [&str; 2] = ["Token expirado", "Não autorizado"];

/// Coarse classification callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request never produced an HTTP response (network, deadline, cancellation)
    TransientNetwork,
    /// 401 with an expiry message; renewed internally, visible only if it survives a retry
    AuthExpired,
    /// Renewal failed; the user must sign in again
    SessionTerminal,
    /// HTTP 409, the entity changed on the server
    Conflict,
    /// Any other failure
    ValidationOrGeneric,
}

/// Error returned by every API call.
///
/// `Display` yields the human-readable message, suitable for showing to the
/// user as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{message}")]
    Network { message: String },

    #[error("Tempo limite da requisição excedido")]
    Timeout,

    #[error("Requisição cancelada")]
    Cancelled,

    #[error("Sessão expirada. Faça login novamente.")]
    SessionExpired,

    #[error("{message}")]
    Conflict { message: String },

    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Invalid response body (HTTP {status}): {reason}")]
    InvalidResponse { status: u16, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Credential storage failed: {0}")]
    CredentialStorage(String),
}

impl ApiError {
    /// Build the error for a non-success response.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == 409 {
            ApiError::Conflict { message }
        } else {
            ApiError::Http { status, message }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Network { .. } | ApiError::Timeout | ApiError::Cancelled => {
                ErrorKind::TransientNetwork
            }
            ApiError::SessionExpired => ErrorKind::SessionTerminal,
            ApiError::Conflict { .. } => ErrorKind::Conflict,
            ApiError::Http { status, message } if is_expiry_signal(*status, message) => {
                ErrorKind::AuthExpired
            }
            ApiError::Http { .. }
            | ApiError::InvalidResponse { .. }
            | ApiError::InvalidRequest(_)
            | ApiError::CredentialStorage(_) => ErrorKind::ValidationOrGeneric,
        }
    }

    /// HTTP status associated with the error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } | ApiError::InvalidResponse { status, .. } => {
                Some(*status)
            }
            ApiError::Conflict { .. } => Some(409),
            ApiError::SessionExpired => Some(401),
            _ => None,
        }
    }

    /// Human-readable message.
    pub fn message(&self) -> String {
        match self {
            ApiError::Network { message }
            | ApiError::Conflict { message }
            | ApiError::Http { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::TransientNetwork
    }
}

/// 401 carrying one of the known expiry messages (exact, case-sensitive).
pub fn is_expiry_signal(status: u16, message: &str) -> bool {
    status == 401 && EXPIRY_MESSAGES.contains(&message)
}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Timeout => ApiError::Timeout,
            BridgeError::Network(message) => ApiError::Network { message },
            other => ApiError::Network {
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
