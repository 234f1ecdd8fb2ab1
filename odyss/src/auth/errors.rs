//! Authentication error types.

use thiserror::Error;

/// Authentication errors
///
/// Each variant carries the message shown inline in the relevant form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Client-side check failed; no gateway call was made
    #[error("{0}")]
    Validation(String),

    /// Bad credentials or missing profile
    #[error("{0}")]
    Authentication(String),

    /// Duplicate account or partial profile write
    #[error("{0}")]
    Registration(String),

    /// Status check found no valid session
    #[error("Not authenticated")]
    SessionExpired,

    /// Reset email or password update failed
    #[error("{0}")]
    PasswordReset(String),

    /// Confirmation email could not be sent or checked
    #[error("{0}")]
    Verification(String),

    /// Gateway refused to end the session
    #[error("{0}")]
    Logout(String),

    /// A newer request of the same kind settled this one's result
    #[error("Superseded by a newer request")]
    Superseded,
}

impl AuthError {
    /// Message stored in the session state's `error` field
    ///
    /// `None` for outcomes that are not user-visible failures.
    pub fn client_message(&self) -> Option<String> {
        match self {
            AuthError::SessionExpired | AuthError::Superseded => None,
            _ => Some(self.to_string()),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message() {
        assert_eq!(
            AuthError::Authentication("User data not found".to_string()).client_message(),
            Some("User data not found".to_string())
        );
        assert_eq!(AuthError::SessionExpired.client_message(), None);
        assert_eq!(AuthError::Superseded.client_message(), None);
    }
}
