//! Implementation of ConversationStorage trait for SQLite storage.

use charmchat_storage_traits::conversations::ConversationStorage;
use charmchat_storage_traits::conversations::error::ConversationError;
use charmchat_storage_traits::conversations::types::{ConversationFlag, ConversationFlags};
use rusqlite::{OptionalExtension, params};

use crate::ChatSqliteStorage;
use crate::db;

#[inline]
fn into_conversation_err<T>(e: T) -> ConversationError
where
    T: std::error::Error,
{
    ConversationError::DatabaseError(e.to_string())
}

impl ConversationStorage for ChatSqliteStorage {
    fn conversation_flags(&self, peer_key: &str) -> Result<ConversationFlags, ConversationError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT peer_key, last_opened_at, muted, archived, favorite
                     FROM conversations WHERE peer_key = ?",
                )
                .map_err(into_conversation_err)?;

            let flags = stmt
                .query_row(params![peer_key], db::row_to_flags)
                .optional()
                .map_err(into_conversation_err)?;

            Ok(flags.unwrap_or_else(|| ConversationFlags::new(peer_key)))
        })
    }

    fn set_conversation_flag(
        &self,
        peer_key: &str,
        flag: ConversationFlag,
        value: bool,
    ) -> Result<(), ConversationError> {
        // Column names come from a closed enum, never from input.
        let column = flag.column();
        self.with_connection(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO conversations (peer_key, {column}) VALUES (?1, ?2)
                     ON CONFLICT(peer_key) DO UPDATE SET {column} = excluded.{column}"
                ),
                params![peer_key, value],
            )
            .map_err(into_conversation_err)?;

            Ok(())
        })
    }

    fn mark_opened(&self, peer_key: &str, timestamp: u64) -> Result<(), ConversationError> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO conversations (peer_key, last_opened_at) VALUES (?1, ?2)
                 ON CONFLICT(peer_key) DO UPDATE
                 SET last_opened_at = MAX(last_opened_at, excluded.last_opened_at)",
                params![peer_key, timestamp],
            )
            .map_err(into_conversation_err)?;

            Ok(())
        })
    }
}
