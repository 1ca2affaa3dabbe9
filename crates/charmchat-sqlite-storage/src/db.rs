//! Database utilities for SQLite storage.

use std::io::{Error as IoError, ErrorKind};
use std::str::FromStr;

use charmchat_storage_traits::conversations::types::ConversationFlags;
use charmchat_storage_traits::groups::types::{Group, GroupMember, GroupMessage};
use charmchat_storage_traits::messages::types::{ChatMessage, MessageKind, MessageState};
use charmchat_storage_traits::transfers::types::{
    TransferAttempt, TransferKind, TransferMetadata, TransferStatus,
};
use rusqlite::types::Type;
use rusqlite::{Error, Result as SqliteResult, Row};

/// Columns selected for a transfer attempt row
pub const ATTEMPT_COLUMNS: &str = "id, chain_tx_id, approval_request_id, kind, peer_key, \
     message_timestamp, status, created_at, updated_at, confirmed_at, metadata";

/// Columns selected for a message row
pub const MESSAGE_COLUMNS: &str =
    "peer_key, timestamp, display_name, kind, body, attached_amount, state";

#[inline]
fn map_to_text_boxed_error<T>(e: T) -> Error
where
    T: std::error::Error + Send + Sync + 'static,
{
    Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
}

#[inline]
fn map_invalid_text_data(msg: &str) -> Error {
    Error::FromSqlConversionFailure(
        0,
        Type::Text,
        Box::new(IoError::new(ErrorKind::InvalidData, msg.to_string())),
    )
}

/// Whether a rusqlite error is a UNIQUE / PRIMARY KEY violation
pub fn is_constraint_violation(e: &Error) -> bool {
    matches!(
        e,
        Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Convert a row to a ChatMessage struct
pub fn row_to_message(row: &Row) -> SqliteResult<ChatMessage> {
    let kind: &str = row.get_ref("kind")?.as_str()?;
    let kind =
        MessageKind::from_str(kind).map_err(|_| map_invalid_text_data("Invalid message kind"))?;
    let state: &str = row.get_ref("state")?.as_str()?;
    let state =
        MessageState::from_str(state).map_err(|_| map_invalid_text_data("Invalid state"))?;

    Ok(ChatMessage {
        peer_key: row.get("peer_key")?,
        display_name: row.get("display_name")?,
        kind,
        body: row.get("body")?,
        attached_amount: row.get("attached_amount")?,
        state,
        timestamp: row.get("timestamp")?,
    })
}

/// Convert a row to a TransferAttempt struct
pub fn row_to_attempt(row: &Row) -> SqliteResult<TransferAttempt> {
    let kind: &str = row.get_ref("kind")?.as_str()?;
    let kind =
        TransferKind::from_str(kind).map_err(|_| map_invalid_text_data("Invalid transfer kind"))?;
    let status: &str = row.get_ref("status")?.as_str()?;
    let status = TransferStatus::from_str(status)
        .map_err(|_| map_invalid_text_data("Invalid transfer status"))?;
    let metadata_json: &str = row.get_ref("metadata")?.as_str()?;
    let metadata: TransferMetadata =
        serde_json::from_str(metadata_json).map_err(map_to_text_boxed_error)?;

    Ok(TransferAttempt {
        id: row.get("id")?,
        chain_tx_id: row.get("chain_tx_id")?,
        approval_request_id: row.get("approval_request_id")?,
        kind,
        peer_key: row.get("peer_key")?,
        message_timestamp: row.get("message_timestamp")?,
        status,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        confirmed_at: row.get("confirmed_at")?,
        metadata,
    })
}

/// Convert a row to a ConversationFlags struct
pub fn row_to_flags(row: &Row) -> SqliteResult<ConversationFlags> {
    Ok(ConversationFlags {
        peer_key: row.get("peer_key")?,
        last_opened_at: row.get("last_opened_at")?,
        muted: row.get("muted")?,
        archived: row.get("archived")?,
        favorite: row.get("favorite")?,
    })
}

/// Convert a row to a Group struct
pub fn row_to_group(row: &Row) -> SqliteResult<Group> {
    Ok(Group {
        group_id: row.get("group_id")?,
        name: row.get("name")?,
        creator_key: row.get("creator_key")?,
        created_at: row.get("created_at")?,
    })
}

/// Convert a row to a GroupMember struct
pub fn row_to_member(row: &Row) -> SqliteResult<GroupMember> {
    Ok(GroupMember {
        group_id: row.get("group_id")?,
        member_key: row.get("member_key")?,
        display_name: row.get("display_name")?,
        joined_at: row.get("joined_at")?,
    })
}

/// Convert a row to a GroupMessage struct
pub fn row_to_group_message(row: &Row) -> SqliteResult<GroupMessage> {
    let state: &str = row.get_ref("state")?.as_str()?;
    let state =
        MessageState::from_str(state).map_err(|_| map_invalid_text_data("Invalid state"))?;

    Ok(GroupMessage {
        group_id: row.get("group_id")?,
        sender_key: row.get("sender_key")?,
        sender_name: row.get("sender_name")?,
        timestamp: row.get("timestamp")?,
        body: row.get("body")?,
        state,
    })
}
