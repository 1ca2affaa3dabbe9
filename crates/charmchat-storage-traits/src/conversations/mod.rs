//! Conversations module
//!
//! Per-peer read markers and the mute / archive / favorite flags.

pub mod error;
pub mod types;

use self::error::ConversationError;
use self::types::*;

/// Storage traits for the conversations module
pub trait ConversationStorage {
    /// Flags for a peer; defaults when the peer has no stored row
    fn conversation_flags(&self, peer_key: &str) -> Result<ConversationFlags, ConversationError>;

    /// Set one boolean flag, creating the row if needed
    fn set_conversation_flag(
        &self,
        peer_key: &str,
        flag: ConversationFlag,
        value: bool,
    ) -> Result<(), ConversationError>;

    /// Store the last-opened marker. The marker never moves backwards.
    fn mark_opened(&self, peer_key: &str, timestamp: u64) -> Result<(), ConversationError>;
}
