//! Backend gateway error types.

use thiserror::Error;

/// Errors raised by a backend gateway adapter
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport-level failure (connection refused, TLS, timeout)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered with a non-success status
    #[error("Gateway returned {status}: {message}")]
    Api { status: u16, message: String },

    /// Account with this email already exists
    #[error("User already registered")]
    AlreadyExists,

    /// Email/password pair rejected
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// Operation needs an active session
    #[error("No active session")]
    NoSession,

    /// Requested document does not exist
    #[error("Document not found")]
    NotFound,

    /// Response body could not be decoded
    #[error("Failed to decode gateway response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Endpoint or redirect URL could not be built
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl GatewayError {
    /// Get a message safe to show in a form
    ///
    /// Transport and decode failures are collapsed into a generic network
    /// message; messages the gateway itself produced are passed through.
    pub fn client_message(&self) -> String {
        match self {
            GatewayError::Http(_) => "Network error, please try again".to_string(),
            GatewayError::Decode(_) | GatewayError::Url(_) => {
                "Unexpected response from server".to_string()
            }
            GatewayError::Api { message, .. } => message.clone(),
            _ => self.to_string(),
        }
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
