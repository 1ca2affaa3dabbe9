//! Implementation of GroupStorage trait for SQLite storage.

use charmchat_storage_traits::groups::GroupStorage;
use charmchat_storage_traits::groups::error::GroupError;
use charmchat_storage_traits::groups::types::{Group, GroupMember, GroupMessage};
use charmchat_storage_traits::messages::types::MessageState;
use rusqlite::{OptionalExtension, params};

use crate::ChatSqliteStorage;
use crate::db;
use crate::validation::{
    MAX_DISPLAY_NAME_LENGTH, MAX_GROUP_NAME_LENGTH, MAX_MESSAGE_BODY_SIZE, validate_size,
    validate_string_length,
};

#[inline]
fn into_group_err<T>(e: T) -> GroupError
where
    T: std::error::Error,
{
    GroupError::DatabaseError(e.to_string())
}

impl GroupStorage for ChatSqliteStorage {
    fn save_group(&self, group: Group) -> Result<(), GroupError> {
        validate_string_length(&group.name, MAX_GROUP_NAME_LENGTH, "Group name")
            .map_err(|e| GroupError::InvalidParameters(e.to_string()))?;

        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO groups (group_id, name, creator_key, created_at)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(group_id) DO UPDATE SET name = excluded.name",
                params![
                    &group.group_id,
                    &group.name,
                    &group.creator_key,
                    group.created_at
                ],
            )
            .map_err(into_group_err)?;

            Ok(())
        })
    }

    fn find_group(&self, group_id: &str) -> Result<Option<Group>, GroupError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT group_id, name, creator_key, created_at FROM groups
                     WHERE group_id = ?",
                )
                .map_err(into_group_err)?;

            stmt.query_row(params![group_id], db::row_to_group)
                .optional()
                .map_err(into_group_err)
        })
    }

    fn all_groups(&self) -> Result<Vec<Group>, GroupError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT group_id, name, creator_key, created_at FROM groups
                     ORDER BY created_at ASC, group_id ASC",
                )
                .map_err(into_group_err)?;

            let groups = stmt
                .query_map([], db::row_to_group)
                .map_err(into_group_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(into_group_err)?;

            Ok(groups)
        })
    }

    fn delete_group(&self, group_id: &str) -> Result<(), GroupError> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM groups WHERE group_id = ?", params![group_id])
                .map_err(into_group_err)?;

            Ok(())
        })
    }

    fn save_member(&self, member: GroupMember) -> Result<(), GroupError> {
        validate_string_length(
            &member.display_name,
            MAX_DISPLAY_NAME_LENGTH,
            "Display name",
        )
        .map_err(|e| GroupError::InvalidParameters(e.to_string()))?;

        if self.find_group(&member.group_id)?.is_none() {
            return Err(GroupError::NotFound);
        }

        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO group_members (group_id, member_key, display_name, joined_at)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(group_id, member_key) DO UPDATE
                 SET display_name = excluded.display_name",
                params![
                    &member.group_id,
                    &member.member_key,
                    &member.display_name,
                    member.joined_at
                ],
            )
            .map_err(into_group_err)?;

            Ok(())
        })
    }

    fn remove_member(&self, group_id: &str, member_key: &str) -> Result<bool, GroupError> {
        self.with_connection(|conn| {
            let rows = conn
                .execute(
                    "DELETE FROM group_members WHERE group_id = ? AND member_key = ?",
                    params![group_id, member_key],
                )
                .map_err(into_group_err)?;

            Ok(rows > 0)
        })
    }

    fn members(&self, group_id: &str) -> Result<Vec<GroupMember>, GroupError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT group_id, member_key, display_name, joined_at FROM group_members
                     WHERE group_id = ? ORDER BY joined_at ASC, member_key ASC",
                )
                .map_err(into_group_err)?;

            let members = stmt
                .query_map(params![group_id], db::row_to_member)
                .map_err(into_group_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(into_group_err)?;

            Ok(members)
        })
    }

    fn insert_group_message(&self, message: GroupMessage) -> Result<bool, GroupError> {
        validate_size(message.body.as_bytes(), MAX_MESSAGE_BODY_SIZE, "Message body")
            .map_err(|e| GroupError::InvalidParameters(e.to_string()))?;

        if self.find_group(&message.group_id)?.is_none() {
            return Err(GroupError::NotFound);
        }

        self.with_connection(|conn| {
            let rows = conn
                .execute(
                    "INSERT OR IGNORE INTO group_messages
                     (group_id, sender_key, sender_name, timestamp, body, state)
                     VALUES (?, ?, ?, ?, ?, ?)",
                    params![
                        &message.group_id,
                        &message.sender_key,
                        &message.sender_name,
                        message.timestamp,
                        &message.body,
                        message.state.as_str(),
                    ],
                )
                .map_err(into_group_err)?;

            Ok(rows == 1)
        })
    }

    fn update_group_message_state(
        &self,
        group_id: &str,
        timestamp: u64,
        sender_key: &str,
        state: MessageState,
    ) -> Result<bool, GroupError> {
        self.with_connection(|conn| {
            let rows = conn
                .execute(
                    "UPDATE group_messages SET state = ?
                     WHERE group_id = ? AND timestamp = ? AND sender_key = ?",
                    params![state.as_str(), group_id, timestamp, sender_key],
                )
                .map_err(into_group_err)?;

            Ok(rows == 1)
        })
    }

    fn group_messages_since(
        &self,
        group_id: &str,
        since: u64,
    ) -> Result<Vec<GroupMessage>, GroupError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT group_id, sender_key, sender_name, timestamp, body, state
                     FROM group_messages WHERE group_id = ? AND timestamp > ?
                     ORDER BY timestamp ASC, sender_key ASC",
                )
                .map_err(into_group_err)?;

            let messages = stmt
                .query_map(params![group_id, since], db::row_to_group_message)
                .map_err(into_group_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(into_group_err)?;

            Ok(messages)
        })
    }
}
