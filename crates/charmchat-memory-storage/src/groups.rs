//! Memory-based storage implementation of the GroupStorage trait

use charmchat_storage_traits::groups::GroupStorage;
use charmchat_storage_traits::groups::error::GroupError;
use charmchat_storage_traits::groups::types::*;
use charmchat_storage_traits::messages::types::MessageState;

use crate::{ChatMemoryStorage, exceeds};

impl GroupStorage for ChatMemoryStorage {
    fn save_group(&self, group: Group) -> Result<(), GroupError> {
        if exceeds(&group.name, self.limits.max_group_name_length) {
            return Err(GroupError::InvalidParameters(format!(
                "Group name exceeds maximum length of {} bytes",
                self.limits.max_group_name_length
            )));
        }

        let mut inner = self.inner.write();
        match inner.groups.get_mut(&group.group_id) {
            // Only the name is mutable; identity fields keep their first value.
            Some(existing) => existing.name = group.name,
            None => {
                inner.groups.insert(group.group_id.clone(), group);
            }
        }
        Ok(())
    }

    fn find_group(&self, group_id: &str) -> Result<Option<Group>, GroupError> {
        Ok(self.inner.read().groups.get(group_id).cloned())
    }

    fn all_groups(&self) -> Result<Vec<Group>, GroupError> {
        let inner = self.inner.read();
        let mut groups: Vec<Group> = inner.groups.values().cloned().collect();
        groups.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.group_id.cmp(&b.group_id))
        });
        Ok(groups)
    }

    fn delete_group(&self, group_id: &str) -> Result<(), GroupError> {
        let mut inner = self.inner.write();
        inner.groups.remove(group_id);
        inner.members.retain(|(gid, _), _| gid != group_id);
        inner.group_messages.retain(|(gid, _, _), _| gid != group_id);
        Ok(())
    }

    fn save_member(&self, member: GroupMember) -> Result<(), GroupError> {
        if exceeds(&member.display_name, self.limits.max_display_name_length) {
            return Err(GroupError::InvalidParameters(format!(
                "Display name exceeds maximum length of {} bytes",
                self.limits.max_display_name_length
            )));
        }

        let mut inner = self.inner.write();
        if !inner.groups.contains_key(&member.group_id) {
            return Err(GroupError::NotFound);
        }

        let key = (member.group_id.clone(), member.member_key.clone());
        match inner.members.get_mut(&key) {
            Some(existing) => existing.display_name = member.display_name,
            None => {
                inner.members.insert(key, member);
            }
        }
        Ok(())
    }

    fn remove_member(&self, group_id: &str, member_key: &str) -> Result<bool, GroupError> {
        let mut inner = self.inner.write();
        Ok(inner
            .members
            .remove(&(group_id.to_string(), member_key.to_string()))
            .is_some())
    }

    fn members(&self, group_id: &str) -> Result<Vec<GroupMember>, GroupError> {
        let inner = self.inner.read();
        let mut members: Vec<GroupMember> = inner
            .members
            .values()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect();
        members.sort_by(|a, b| {
            a.joined_at
                .cmp(&b.joined_at)
                .then_with(|| a.member_key.cmp(&b.member_key))
        });
        Ok(members)
    }

    fn insert_group_message(&self, message: GroupMessage) -> Result<bool, GroupError> {
        if exceeds(&message.body, self.limits.max_message_body_size) {
            return Err(GroupError::InvalidParameters(format!(
                "Message body exceeds maximum size of {} bytes",
                self.limits.max_message_body_size
            )));
        }

        let mut inner = self.inner.write();
        if !inner.groups.contains_key(&message.group_id) {
            return Err(GroupError::NotFound);
        }

        let key = (
            message.group_id.clone(),
            message.timestamp,
            message.sender_key.clone(),
        );
        if inner.group_messages.contains_key(&key) {
            return Ok(false);
        }
        inner.group_messages.insert(key, message);
        Ok(true)
    }

    fn update_group_message_state(
        &self,
        group_id: &str,
        timestamp: u64,
        sender_key: &str,
        state: MessageState,
    ) -> Result<bool, GroupError> {
        let mut inner = self.inner.write();
        match inner.group_messages.get_mut(&(
            group_id.to_string(),
            timestamp,
            sender_key.to_string(),
        )) {
            Some(message) => {
                message.state = state;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn group_messages_since(
        &self,
        group_id: &str,
        since: u64,
    ) -> Result<Vec<GroupMessage>, GroupError> {
        let inner = self.inner.read();
        // Keys sort by (group, timestamp, sender).
        Ok(inner
            .group_messages
            .values()
            .filter(|m| m.group_id == group_id && m.timestamp > since)
            .cloned()
            .collect())
    }
}
