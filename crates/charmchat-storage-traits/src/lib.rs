//! CharmChat storage - storage provider traits and types for the chat, transfer and group tables.
//!
//! The traits in this crate are implemented by `charmchat-sqlite-storage` (persistent) and
//! `charmchat-memory-storage` (ephemeral). Both must behave identically; the shared test suite
//! under `tests/` runs against each of them.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod conversations;
pub mod error;
pub mod groups;
pub mod messages;
#[cfg(feature = "test-utils")]
pub mod test_utils;
pub mod transfers;

pub use error::ChatStorageError;

use self::conversations::ConversationStorage;
use self::groups::GroupStorage;
use self::messages::MessageStorage;
use self::transfers::TransferStorage;

/// Backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Memory
    Memory,
    /// SQLite
    SQLite,
}

impl Backend {
    /// Check if it's a persistent backend
    ///
    /// All values different from [`Backend::Memory`] are considered persistent
    pub fn is_persistent(&self) -> bool {
        !matches!(self, Self::Memory)
    }
}

/// Storage provider for CharmChat.
///
/// Combines every table the messaging core touches:
/// - Message storage for 1:1 chat history
/// - Transfer storage for the value-transfer ledger
/// - Conversation storage for per-peer flags and read markers
/// - Group storage for the group relay
///
/// Implementations must be safe to share across tasks; every method takes `&self`.
pub trait ChatStorageProvider:
    MessageStorage + TransferStorage + ConversationStorage + GroupStorage + Send + Sync
{
    /// Returns the backend type.
    fn backend(&self) -> Backend;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_is_persistent() {
        assert!(!Backend::Memory.is_persistent());
        assert!(Backend::SQLite.is_persistent());
    }
}
