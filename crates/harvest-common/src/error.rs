use crate::error_mapping::classify_code;
use crate::outcome::TransportKind;

/// Errors raised by a fetch backend for a single request.
#[derive(thiserror::Error, Debug, Clone)]
pub enum FetchError {
    /// The fetch service rejected or failed the request with an error code.
    #[error("Service error [{code}]: {message}")]
    Service { code: String, message: String },

    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Not supported: {0}")]
    NotSupported(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Malformed(err.to_string())
    }
}

impl FetchError {
    /// Returns the error-code token used for classification.
    pub fn code(&self) -> &str {
        match self {
            FetchError::Service { code, .. } => code,
            FetchError::Timeout(_) => "CLIENT_TIMEOUT",
            FetchError::Network(_) => "NETWORK_ERROR",
            FetchError::Malformed(_) => "MALFORMED_RESPONSE",
            FetchError::NotSupported(_) => "NOT_SUPPORTED",
        }
    }

    pub fn kind(&self) -> TransportKind {
        classify_code(self.code())
    }
}
