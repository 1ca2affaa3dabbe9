//! Error types for the messages module

use std::fmt;

/// Error types for the messages module
#[derive(Debug)]
pub enum MessageError {
    /// Invalid parameters
    InvalidParameters(String),
    /// Database error
    DatabaseError(String),
    /// A message already exists at `(peer_key, timestamp)`
    DuplicateKey {
        /// Peer of the conflicting row
        peer_key: String,
        /// Logical timestamp of the conflicting row
        timestamp: u64,
    },
    /// Message not found
    NotFound,
}

impl std::error::Error for MessageError {}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameters(message) => write!(f, "Invalid parameters: {}", message),
            Self::DatabaseError(message) => write!(f, "Database error: {}", message),
            Self::DuplicateKey {
                peer_key,
                timestamp,
            } => write!(
                f,
                "Message already exists for peer {} at {}",
                peer_key, timestamp
            ),
            Self::NotFound => write!(f, "Message not found"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_error_display_invalid_parameters() {
        let err = MessageError::InvalidParameters("missing field".to_string());
        assert_eq!(err.to_string(), "Invalid parameters: missing field");
    }

    #[test]
    fn test_message_error_display_duplicate_key() {
        let err = MessageError::DuplicateKey {
            peer_key: "0xPEER".to_string(),
            timestamp: 1700000000000,
        };
        assert_eq!(
            err.to_string(),
            "Message already exists for peer 0xPEER at 1700000000000"
        );
    }

    #[test]
    fn test_message_error_is_error() {
        let err: Box<dyn std::error::Error> =
            Box::new(MessageError::DatabaseError("test".to_string()));
        assert!(err.to_string().contains("Database error"));
    }
}
