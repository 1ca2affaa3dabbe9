//! Error types for the transfers module

use std::fmt;

/// Error types for the transfers module
#[derive(Debug)]
pub enum TransferError {
    /// The attempt carries neither a chain transaction id nor an approval request id
    InvalidAttempt(String),
    /// Invalid parameters
    InvalidParameters(String),
    /// Database error
    DatabaseError(String),
    /// Attempt not found
    NotFound,
}

impl std::error::Error for TransferError {}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAttempt(message) => write!(f, "Invalid transfer attempt: {}", message),
            Self::InvalidParameters(message) => write!(f, "Invalid parameters: {}", message),
            Self::DatabaseError(message) => write!(f, "Database error: {}", message),
            Self::NotFound => write!(f, "Transfer attempt not found"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_error_display() {
        let err = TransferError::InvalidAttempt("no tracking id".to_string());
        assert_eq!(err.to_string(), "Invalid transfer attempt: no tracking id");

        let err = TransferError::NotFound;
        assert_eq!(err.to_string(), "Transfer attempt not found");
    }
}
