//! Types for the conversations module

use serde::{Deserialize, Serialize};

/// Per-peer conversation flags.
///
/// A peer without a stored row has all flags cleared and `last_opened_at == 0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationFlags {
    /// Messaging key of the peer
    pub peer_key: String,
    /// Timestamp of the newest message seen when the conversation was last opened
    pub last_opened_at: u64,
    /// Notifications muted
    pub muted: bool,
    /// Hidden from the main list
    pub archived: bool,
    /// Pinned as favorite
    pub favorite: bool,
}

impl ConversationFlags {
    /// Flags for a peer that has never been touched
    pub fn new(peer_key: impl Into<String>) -> Self {
        Self {
            peer_key: peer_key.into(),
            ..Default::default()
        }
    }
}

/// A single boolean flag on a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversationFlag {
    /// [`ConversationFlags::muted`]
    Muted,
    /// [`ConversationFlags::archived`]
    Archived,
    /// [`ConversationFlags::favorite`]
    Favorite,
}

impl ConversationFlag {
    /// Column name used by SQL backends
    pub fn column(&self) -> &'static str {
        match self {
            Self::Muted => "muted",
            Self::Archived => "archived",
            Self::Favorite => "favorite",
        }
    }

    /// Apply the flag to a flags struct
    pub fn apply(&self, flags: &mut ConversationFlags, value: bool) {
        match self {
            Self::Muted => flags.muted = value,
            Self::Archived => flags.archived = value,
            Self::Favorite => flags.favorite = value,
        }
    }
}
