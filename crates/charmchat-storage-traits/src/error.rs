//! Error types for CharmChat storage operations

use thiserror::Error;

use crate::conversations::error::ConversationError;
use crate::groups::error::GroupError;
use crate::messages::error::MessageError;
use crate::transfers::error::TransferError;

/// Unified error for callers that touch more than one storage area.
///
/// Each area keeps its own error enum; this type flattens them so the core can
/// propagate any storage failure with `?`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatStorageError {
    /// Database operation failed
    #[error("database error: {0}")]
    Database(String),

    /// A row with the same key already exists
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// A transfer attempt was rejected before insertion
    #[error("invalid transfer attempt: {0}")]
    InvalidAttempt(String),

    /// Caller supplied invalid parameters
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Requested item was not found
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<MessageError> for ChatStorageError {
    fn from(e: MessageError) -> Self {
        match e {
            MessageError::InvalidParameters(m) => Self::InvalidParameters(m),
            MessageError::DatabaseError(m) => Self::Database(m),
            MessageError::DuplicateKey { .. } => Self::DuplicateKey(e.to_string()),
            MessageError::NotFound => Self::NotFound("message".to_string()),
        }
    }
}

impl From<TransferError> for ChatStorageError {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::InvalidAttempt(m) => Self::InvalidAttempt(m),
            TransferError::InvalidParameters(m) => Self::InvalidParameters(m),
            TransferError::DatabaseError(m) => Self::Database(m),
            TransferError::NotFound => Self::NotFound("transfer attempt".to_string()),
        }
    }
}

impl From<ConversationError> for ChatStorageError {
    fn from(e: ConversationError) -> Self {
        match e {
            ConversationError::DatabaseError(m) => Self::Database(m),
        }
    }
}

impl From<GroupError> for ChatStorageError {
    fn from(e: GroupError) -> Self {
        match e {
            GroupError::InvalidParameters(m) => Self::InvalidParameters(m),
            GroupError::DatabaseError(m) => Self::Database(m),
            GroupError::NotFound => Self::NotFound("group".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_storage_error_display() {
        let err = ChatStorageError::Database("connection failed".to_string());
        assert_eq!(err.to_string(), "database error: connection failed");

        let err = ChatStorageError::InvalidAttempt("no tracking id".to_string());
        assert_eq!(err.to_string(), "invalid transfer attempt: no tracking id");

        let err = ChatStorageError::NotFound("group".to_string());
        assert_eq!(err.to_string(), "not found: group");
    }

    #[test]
    fn test_from_area_errors() {
        let err: ChatStorageError = MessageError::DuplicateKey {
            peer_key: "0xABC".to_string(),
            timestamp: 42,
        }
        .into();
        assert!(matches!(err, ChatStorageError::DuplicateKey(_)));
        assert!(err.to_string().contains("0xABC"));

        let err: ChatStorageError = TransferError::InvalidAttempt("empty".to_string()).into();
        assert_eq!(err, ChatStorageError::InvalidAttempt("empty".to_string()));

        let err: ChatStorageError = GroupError::NotFound.into();
        assert_eq!(err, ChatStorageError::NotFound("group".to_string()));
    }
}
