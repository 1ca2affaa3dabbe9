//! Types for the groups module

use serde::{Deserialize, Serialize};

use crate::messages::types::MessageState;

/// A chat group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group {
    /// Random group identifier shared with every member
    pub group_id: String,
    /// Display name
    pub name: String,
    /// Messaging key of the creator
    pub creator_key: String,
    /// Creation time in milliseconds
    pub created_at: u64,
}

/// A member of a group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupMember {
    /// Group the member belongs to
    pub group_id: String,
    /// Messaging key of the member
    pub member_key: String,
    /// Display name of the member
    pub display_name: String,
    /// Join time in milliseconds
    pub joined_at: u64,
}

/// A message posted to a group.
///
/// Unique per `(group_id, timestamp, sender_key)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupMessage {
    /// Group the message was posted to
    pub group_id: String,
    /// Messaging key of the author
    pub sender_key: String,
    /// Display name of the author
    pub sender_name: String,
    /// Logical message time in milliseconds
    pub timestamp: u64,
    /// Message text
    pub body: String,
    /// Local delivery state
    pub state: MessageState,
}
