//! Trip error types.

use thiserror::Error;

/// Trip errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TripError {
    /// Missing field or malformed date; no gateway call was made
    #[error("{0}")]
    Validation(String),

    /// Profile lookup or insert failed
    #[error("{0}")]
    CreateTrip(String),

    /// Listing failed
    #[error("{0}")]
    Fetch(String),

    /// A newer request of the same kind settled this one's result
    #[error("Superseded by a newer request")]
    Superseded,
}

impl TripError {
    /// Message stored in the trip state's `error` field
    pub fn client_message(&self) -> Option<String> {
        match self {
            TripError::Superseded => None,
            _ => Some(self.to_string()),
        }
    }
}

/// Result type for trip operations
pub type TripResult<T> = Result<T, TripError>;
