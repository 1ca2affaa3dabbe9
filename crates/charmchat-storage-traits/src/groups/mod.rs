//! Groups module
//!
//! Groups, their members and the messages posted to them. Inbound messages arrive
//! through several paths (live fan-out and history sync) so insertion is idempotent.

pub mod error;
pub mod types;

use self::error::GroupError;
use self::types::*;
use crate::messages::types::MessageState;

/// Storage traits for the groups module
pub trait GroupStorage {
    /// Insert or update a group
    fn save_group(&self, group: Group) -> Result<(), GroupError>;

    /// Find a group by id
    fn find_group(&self, group_id: &str) -> Result<Option<Group>, GroupError>;

    /// All groups, ordered by creation time
    fn all_groups(&self) -> Result<Vec<Group>, GroupError>;

    /// Delete a group together with its members and messages
    fn delete_group(&self, group_id: &str) -> Result<(), GroupError>;

    /// Insert or update a member. Fails with [`GroupError::NotFound`] for an unknown group.
    fn save_member(&self, member: GroupMember) -> Result<(), GroupError>;

    /// Remove a member. Returns whether a row was removed.
    fn remove_member(&self, group_id: &str, member_key: &str) -> Result<bool, GroupError>;

    /// Members of a group, ordered by join time
    fn members(&self, group_id: &str) -> Result<Vec<GroupMember>, GroupError>;

    /// Insert a group message.
    ///
    /// Returns `Ok(false)` without changing anything when a message with the same
    /// `(group_id, timestamp, sender_key)` already exists.
    fn insert_group_message(&self, message: GroupMessage) -> Result<bool, GroupError>;

    /// Update the state of a group message. Returns whether a row changed.
    fn update_group_message_state(
        &self,
        group_id: &str,
        timestamp: u64,
        sender_key: &str,
        state: MessageState,
    ) -> Result<bool, GroupError>;

    /// Messages of a group with `timestamp > since`, oldest first
    fn group_messages_since(
        &self,
        group_id: &str,
        since: u64,
    ) -> Result<Vec<GroupMessage>, GroupError>;
}
