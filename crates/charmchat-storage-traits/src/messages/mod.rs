//! Messages module
//!
//! Storage for 1:1 chat history. Rows are keyed by `(peer_key, timestamp)`.

pub mod error;
pub mod types;

use self::error::MessageError;
use self::types::*;

/// Storage traits for the messages module
pub trait MessageStorage {
    /// Insert a new message.
    ///
    /// Returns [`MessageError::DuplicateKey`] if a row already exists at
    /// `(peer_key, timestamp)`.
    fn insert_message(&self, message: ChatMessage) -> Result<(), MessageError>;

    /// Insert an outgoing message at the first free logical send time.
    ///
    /// Starting from `message.timestamp`, skips every timestamp already used by a
    /// message row for *any* peer or by a transfer attempt's `message_timestamp`,
    /// then inserts the message there. The search and the insert are atomic, so two
    /// concurrent callers never get the same timestamp. Returns the timestamp used.
    fn reserve_message(&self, message: ChatMessage) -> Result<u64, MessageError>;

    /// Find a message by its key
    fn find_message(
        &self,
        peer_key: &str,
        timestamp: u64,
    ) -> Result<Option<ChatMessage>, MessageError>;

    /// Update the state of a message, optionally re-keying it to `new_timestamp`.
    ///
    /// The row is updated in place; no second row is created. Re-keying onto a
    /// key that is already taken fails with [`MessageError::DuplicateKey`] and
    /// leaves the row untouched. Returns [`MessageError::NotFound`] when no row
    /// exists at `(peer_key, timestamp)`.
    fn update_message_state(
        &self,
        peer_key: &str,
        timestamp: u64,
        state: MessageState,
        new_timestamp: Option<u64>,
    ) -> Result<(), MessageError>;

    /// All messages exchanged with a peer, oldest first
    fn messages_by_peer(&self, peer_key: &str) -> Result<Vec<ChatMessage>, MessageError>;

    /// Every message still in [`MessageState::Pending`]
    fn pending_messages(&self) -> Result<Vec<ChatMessage>, MessageError>;

    /// One summary per peer, newest conversation first.
    ///
    /// `unread_count` counts remote messages strictly after the peer's
    /// last-opened marker.
    fn recent_by_peer(&self) -> Result<Vec<ConversationSummary>, MessageError>;

    /// Delete the whole conversation with a peer. Returns the number of rows removed.
    fn delete_messages_for_peer(&self, peer_key: &str) -> Result<usize, MessageError>;
}
