//! Memory-based storage implementation for CharmChat.
//!
//! This module provides a memory-based storage implementation for the CharmChat messaging core.
//! It implements the `ChatStorageProvider` trait, allowing it to be used as an in-memory storage
//! backend.
//!
//! Memory-based storage is non-persistent and will be cleared when the application terminates.
//! It's useful for testing or ephemeral sessions where persistence isn't required.
//!
//! ## Memory Exhaustion Protection
//!
//! Peer-controlled input is bounded with the limits in [`ValidationLimits`]:
//!
//! - [`DEFAULT_MAX_MESSAGE_BODY_SIZE`]: Maximum size of a message body in bytes
//! - [`DEFAULT_MAX_DISPLAY_NAME_LENGTH`]: Maximum length of a display name in bytes
//! - [`DEFAULT_MAX_GROUP_NAME_LENGTH`]: Maximum length of a group name in bytes
//! - [`DEFAULT_MAX_TRANSFER_METADATA_SIZE`]: Maximum size of serialized transfer metadata
//!
//! ```rust
//! use charmchat_memory_storage::{ChatMemoryStorage, ValidationLimits};
//!
//! let limits = ValidationLimits::default().with_max_message_body_size(4096);
//! let storage = ChatMemoryStorage::with_limits(limits);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use charmchat_storage_traits::conversations::types::ConversationFlags;
use charmchat_storage_traits::groups::types::{Group, GroupMember, GroupMessage};
use charmchat_storage_traits::messages::types::ChatMessage;
use charmchat_storage_traits::transfers::types::{AttemptId, TransferAttempt};
use charmchat_storage_traits::{Backend, ChatStorageProvider};
use parking_lot::RwLock;

mod conversations;
mod groups;
mod messages;
mod transfers;

/// Default maximum size of a message body in bytes (256 KB)
pub const DEFAULT_MAX_MESSAGE_BODY_SIZE: usize = 256 * 1024;

/// Default maximum length of a display name in bytes
pub const DEFAULT_MAX_DISPLAY_NAME_LENGTH: usize = 255;

/// Default maximum length of a group name in bytes
pub const DEFAULT_MAX_GROUP_NAME_LENGTH: usize = 255;

/// Default maximum size of serialized transfer metadata in bytes (16 KB)
pub const DEFAULT_MAX_TRANSFER_METADATA_SIZE: usize = 16 * 1024;

/// Configurable validation limits for memory storage.
#[derive(Debug, Clone, Copy)]
pub struct ValidationLimits {
    /// Maximum size of a message body in bytes
    pub max_message_body_size: usize,
    /// Maximum length of a display name in bytes
    pub max_display_name_length: usize,
    /// Maximum length of a group name in bytes
    pub max_group_name_length: usize,
    /// Maximum size of serialized transfer metadata in bytes
    pub max_transfer_metadata_size: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_message_body_size: DEFAULT_MAX_MESSAGE_BODY_SIZE,
            max_display_name_length: DEFAULT_MAX_DISPLAY_NAME_LENGTH,
            max_group_name_length: DEFAULT_MAX_GROUP_NAME_LENGTH,
            max_transfer_metadata_size: DEFAULT_MAX_TRANSFER_METADATA_SIZE,
        }
    }
}

impl ValidationLimits {
    /// Creates a new `ValidationLimits` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum size of a message body in bytes.
    ///
    /// # Panics
    ///
    /// Panics if `limit` is 0.
    pub fn with_max_message_body_size(mut self, limit: usize) -> Self {
        assert!(limit > 0, "max_message_body_size must be greater than 0");
        self.max_message_body_size = limit;
        self
    }

    /// Sets the maximum length of a display name in bytes.
    ///
    /// # Panics
    ///
    /// Panics if `limit` is 0.
    pub fn with_max_display_name_length(mut self, limit: usize) -> Self {
        assert!(limit > 0, "max_display_name_length must be greater than 0");
        self.max_display_name_length = limit;
        self
    }

    /// Sets the maximum length of a group name in bytes.
    ///
    /// # Panics
    ///
    /// Panics if `limit` is 0.
    pub fn with_max_group_name_length(mut self, limit: usize) -> Self {
        assert!(limit > 0, "max_group_name_length must be greater than 0");
        self.max_group_name_length = limit;
        self
    }

    /// Sets the maximum size of serialized transfer metadata in bytes.
    ///
    /// # Panics
    ///
    /// Panics if `limit` is 0.
    pub fn with_max_transfer_metadata_size(mut self, limit: usize) -> Self {
        assert!(limit > 0, "max_transfer_metadata_size must be greater than 0");
        self.max_transfer_metadata_size = limit;
        self
    }
}

/// Every table guarded by one lock so compound operations (re-keying a message,
/// compare-and-set on an attempt) are atomic.
#[derive(Debug, Default)]
pub(crate) struct MemoryStorageInner {
    pub(crate) messages: BTreeMap<(String, u64), ChatMessage>,
    pub(crate) attempts: BTreeMap<AttemptId, TransferAttempt>,
    pub(crate) next_attempt_id: AttemptId,
    pub(crate) conversations: HashMap<String, ConversationFlags>,
    pub(crate) groups: HashMap<String, Group>,
    pub(crate) members: BTreeMap<(String, String), GroupMember>,
    pub(crate) group_messages: BTreeMap<(String, u64, String), GroupMessage>,
}

/// A memory-based storage implementation for CharmChat.
///
/// Cloning shares the underlying tables.
#[derive(Clone)]
pub struct ChatMemoryStorage {
    pub(crate) inner: Arc<RwLock<MemoryStorageInner>>,
    pub(crate) limits: ValidationLimits,
}

impl fmt::Debug for ChatMemoryStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("ChatMemoryStorage")
            .field("messages", &inner.messages.len())
            .field("attempts", &inner.attempts.len())
            .field("groups", &inner.groups.len())
            .field("limits", &self.limits)
            .finish()
    }
}

impl Default for ChatMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatMemoryStorage {
    /// Creates a new empty storage with default limits
    pub fn new() -> Self {
        Self::with_limits(ValidationLimits::default())
    }

    /// Creates a new empty storage with custom limits
    pub fn with_limits(limits: ValidationLimits) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryStorageInner {
                next_attempt_id: 1,
                ..Default::default()
            })),
            limits,
        }
    }

    /// Returns the current validation limits.
    pub fn limits(&self) -> &ValidationLimits {
        &self.limits
    }
}

impl ChatStorageProvider for ChatMemoryStorage {
    fn backend(&self) -> Backend {
        Backend::Memory
    }
}

/// Byte-length check shared by the table implementations
pub(crate) fn exceeds(value: &str, limit: usize) -> bool {
    value.len() > limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_is_memory() {
        let storage = ChatMemoryStorage::new();
        assert_eq!(storage.backend(), Backend::Memory);
        assert!(!storage.backend().is_persistent());
    }

    #[test]
    fn test_clones_share_tables() {
        use charmchat_storage_traits::messages::MessageStorage;
        use charmchat_storage_traits::messages::types::MessageState;
        use charmchat_storage_traits::test_utils::local_message;

        let storage = ChatMemoryStorage::new();
        let clone = storage.clone();
        storage
            .insert_message(local_message("0xPEER", 1, MessageState::Sent))
            .unwrap();
        assert!(clone.find_message("0xPEER", 1).unwrap().is_some());
    }

    #[test]
    #[should_panic(expected = "max_message_body_size must be greater than 0")]
    fn test_zero_limit_panics() {
        let _ = ValidationLimits::new().with_max_message_body_size(0);
    }
}
