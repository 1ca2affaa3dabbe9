//! Implementation of MessageStorage trait for SQLite storage.

use charmchat_storage_traits::conversations::types::ConversationFlags;
use charmchat_storage_traits::messages::MessageStorage;
use charmchat_storage_traits::messages::error::MessageError;
use charmchat_storage_traits::messages::types::{
    ChatMessage, ConversationSummary, LOCAL_DISPLAY_NAME, MessageState,
};
use rusqlite::{Connection, OptionalExtension, params};

use crate::db::{self, MESSAGE_COLUMNS, is_constraint_violation};
use crate::validation::{
    MAX_DISPLAY_NAME_LENGTH, MAX_MESSAGE_BODY_SIZE, validate_size, validate_string_length,
};
use crate::ChatSqliteStorage;

#[inline]
fn into_message_err<T>(e: T) -> MessageError
where
    T: std::error::Error,
{
    MessageError::DatabaseError(e.to_string())
}

fn validate_message(message: &ChatMessage) -> Result<(), MessageError> {
    validate_size(message.body.as_bytes(), MAX_MESSAGE_BODY_SIZE, "Message body")
        .map_err(|e| MessageError::InvalidParameters(e.to_string()))?;
    validate_string_length(
        &message.display_name,
        MAX_DISPLAY_NAME_LENGTH,
        "Display name",
    )
    .map_err(|e| MessageError::InvalidParameters(e.to_string()))
}

fn insert_row(conn: &Connection, message: &ChatMessage) -> Result<(), MessageError> {
    conn.execute(
        "INSERT INTO messages
         (peer_key, timestamp, display_name, kind, body, attached_amount, state)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            &message.peer_key,
            message.timestamp,
            &message.display_name,
            message.kind.as_str(),
            &message.body,
            &message.attached_amount,
            message.state.as_str(),
        ],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            MessageError::DuplicateKey {
                peer_key: message.peer_key.clone(),
                timestamp: message.timestamp,
            }
        } else {
            into_message_err(e)
        }
    })?;

    Ok(())
}

impl MessageStorage for ChatSqliteStorage {
    fn insert_message(&self, message: ChatMessage) -> Result<(), MessageError> {
        validate_message(&message)?;
        self.with_connection(|conn| insert_row(conn, &message))
    }

    fn reserve_message(&self, mut message: ChatMessage) -> Result<u64, MessageError> {
        validate_message(&message)?;

        self.with_connection(|conn| {
            let tx = conn.unchecked_transaction().map_err(into_message_err)?;
            {
                let mut taken = tx
                    .prepare(
                        "SELECT EXISTS(SELECT 1 FROM messages WHERE timestamp = ?1)
                             OR EXISTS(SELECT 1 FROM transfer_attempts
                                       WHERE message_timestamp = ?1)",
                    )
                    .map_err(into_message_err)?;

                while taken
                    .query_row(params![message.timestamp], |row| row.get::<_, bool>(0))
                    .map_err(into_message_err)?
                {
                    message.timestamp = message.timestamp.checked_add(1).ok_or_else(|| {
                        MessageError::InvalidParameters("no free timestamp left".to_string())
                    })?;
                }
            }

            insert_row(&tx, &message)?;
            tx.commit().map_err(into_message_err)?;
            Ok(message.timestamp)
        })
    }

    fn find_message(
        &self,
        peer_key: &str,
        timestamp: u64,
    ) -> Result<Option<ChatMessage>, MessageError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages WHERE peer_key = ? AND timestamp = ?"
                ))
                .map_err(into_message_err)?;

            stmt.query_row(params![peer_key, timestamp], db::row_to_message)
                .optional()
                .map_err(into_message_err)
        })
    }

    fn update_message_state(
        &self,
        peer_key: &str,
        timestamp: u64,
        state: MessageState,
        new_timestamp: Option<u64>,
    ) -> Result<(), MessageError> {
        let target = new_timestamp.unwrap_or(timestamp);

        self.with_connection(|conn| {
            let rows = conn
                .execute(
                    "UPDATE messages SET state = ?, timestamp = ?
                     WHERE peer_key = ? AND timestamp = ?",
                    params![state.as_str(), target, peer_key, timestamp],
                )
                .map_err(|e| {
                    if is_constraint_violation(&e) {
                        MessageError::DuplicateKey {
                            peer_key: peer_key.to_string(),
                            timestamp: target,
                        }
                    } else {
                        into_message_err(e)
                    }
                })?;

            if rows == 0 {
                return Err(MessageError::NotFound);
            }

            Ok(())
        })
    }

    fn messages_by_peer(&self, peer_key: &str) -> Result<Vec<ChatMessage>, MessageError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages WHERE peer_key = ?
                     ORDER BY timestamp ASC"
                ))
                .map_err(into_message_err)?;

            let messages = stmt
                .query_map(params![peer_key], db::row_to_message)
                .map_err(into_message_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(into_message_err)?;

            Ok(messages)
        })
    }

    fn pending_messages(&self) -> Result<Vec<ChatMessage>, MessageError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages WHERE state = 'pending'
                     ORDER BY timestamp ASC"
                ))
                .map_err(into_message_err)?;

            let messages = stmt
                .query_map([], db::row_to_message)
                .map_err(into_message_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(into_message_err)?;

            Ok(messages)
        })
    }

    fn recent_by_peer(&self) -> Result<Vec<ConversationSummary>, MessageError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT m.peer_key, m.timestamp, m.display_name, m.kind, m.body,
                            m.attached_amount, m.state,
                            COALESCE(c.last_opened_at, 0) AS last_opened_at,
                            COALESCE(c.muted, 0) AS muted,
                            COALESCE(c.archived, 0) AS archived,
                            COALESCE(c.favorite, 0) AS favorite,
                            (SELECT COUNT(*) FROM messages u
                             WHERE u.peer_key = m.peer_key
                               AND u.display_name != ?1
                               AND u.timestamp > COALESCE(c.last_opened_at, 0)) AS unread_count
                     FROM messages m
                     LEFT JOIN conversations c ON c.peer_key = m.peer_key
                     WHERE m.timestamp = (SELECT MAX(x.timestamp) FROM messages x
                                          WHERE x.peer_key = m.peer_key)
                     ORDER BY m.timestamp DESC",
                )
                .map_err(into_message_err)?;

            let summaries = stmt
                .query_map(params![LOCAL_DISPLAY_NAME], |row| {
                    let last_message = db::row_to_message(row)?;
                    let flags = ConversationFlags {
                        peer_key: last_message.peer_key.clone(),
                        last_opened_at: row.get("last_opened_at")?,
                        muted: row.get("muted")?,
                        archived: row.get("archived")?,
                        favorite: row.get("favorite")?,
                    };
                    Ok(ConversationSummary {
                        last_message,
                        unread_count: row.get("unread_count")?,
                        flags,
                    })
                })
                .map_err(into_message_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(into_message_err)?;

            Ok(summaries)
        })
    }

    fn delete_messages_for_peer(&self, peer_key: &str) -> Result<usize, MessageError> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM messages WHERE peer_key = ?", params![peer_key])
                .map_err(into_message_err)
        })
    }
}
