use charmchat_storage_traits::conversations::error::ConversationError;
use charmchat_storage_traits::groups::error::GroupError;
use charmchat_storage_traits::messages::error::MessageError;
use charmchat_storage_traits::transfers::error::TransferError;

use crate::codec::DecodeError;

/// Errors surfaced by the messaging core.
///
/// None of these reach the UI directly: a failed value transfer is reported by the
/// message state reaching `failed`, everything else is logged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An external send or query failed outright. Retried by the next sweep, never inline.
    #[error("transport error: {0}")]
    Transport(String),
    #[error("approval request {0} was denied")]
    ApprovalDenied(String),
    /// Approved, but the host failed to execute the transfer.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    #[error("message ({peer_key}, {timestamp}) already exists")]
    DuplicateKey { peer_key: String, timestamp: u64 },
    #[error("invalid transfer attempt: {0}")]
    InvalidAttempt(String),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("payload error: {0}")]
    Payload(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<MessageError> for Error {
    fn from(e: MessageError) -> Self {
        match e {
            MessageError::DuplicateKey {
                peer_key,
                timestamp,
            } => Self::DuplicateKey {
                peer_key,
                timestamp,
            },
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<TransferError> for Error {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::InvalidAttempt(message) => Self::InvalidAttempt(message),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<ConversationError> for Error {
    fn from(e: ConversationError) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<GroupError> for Error {
    fn from(e: GroupError) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Payload(e.to_string())
    }
}
