//! Implementation of TransferStorage trait for SQLite storage.

use charmchat_storage_traits::transfers::TransferStorage;
use charmchat_storage_traits::transfers::error::TransferError;
use charmchat_storage_traits::transfers::types::{
    AttemptId, NewTransferAttempt, TransferAttempt, TransferStatus,
};
use rusqlite::{OptionalExtension, ToSql, params};

use crate::db::{self, ATTEMPT_COLUMNS, is_constraint_violation};
use crate::validation::{MAX_TRANSFER_METADATA_SIZE, validate_size};
use crate::ChatSqliteStorage;

#[inline]
fn into_transfer_err<T>(e: T) -> TransferError
where
    T: std::error::Error,
{
    TransferError::DatabaseError(e.to_string())
}

impl ChatSqliteStorage {
    fn find_attempt_where(
        &self,
        clause: &str,
        values: &[&dyn ToSql],
    ) -> Result<Option<TransferAttempt>, TransferError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {ATTEMPT_COLUMNS} FROM transfer_attempts WHERE {clause}
                     ORDER BY id DESC LIMIT 1"
                ))
                .map_err(into_transfer_err)?;

            stmt.query_row(values, db::row_to_attempt)
                .optional()
                .map_err(into_transfer_err)
        })
    }
}

impl TransferStorage for ChatSqliteStorage {
    fn insert_attempt(
        &self,
        attempt: NewTransferAttempt,
    ) -> Result<TransferAttempt, TransferError> {
        attempt.validate()?;

        let metadata_json = serde_json::to_string(&attempt.metadata)
            .map_err(|e| TransferError::InvalidParameters(e.to_string()))?;
        validate_size(
            metadata_json.as_bytes(),
            MAX_TRANSFER_METADATA_SIZE,
            "Transfer metadata",
        )
        .map_err(|e| TransferError::InvalidParameters(e.to_string()))?;

        let id = self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO transfer_attempts
                 (chain_tx_id, approval_request_id, kind, peer_key, message_timestamp,
                  status, created_at, updated_at, metadata)
                 VALUES (?, ?, ?, ?, ?, 'pending', ?, ?, ?)",
                params![
                    &attempt.chain_tx_id,
                    &attempt.approval_request_id,
                    attempt.kind.as_str(),
                    &attempt.peer_key,
                    attempt.message_timestamp,
                    attempt.created_at,
                    attempt.created_at,
                    &metadata_json,
                ],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    TransferError::InvalidAttempt(format!(
                        "tracking id already recorded: {e}"
                    ))
                } else {
                    into_transfer_err(e)
                }
            })?;

            Ok::<_, TransferError>(conn.last_insert_rowid() as AttemptId)
        })?;

        Ok(TransferAttempt {
            id,
            chain_tx_id: attempt.chain_tx_id,
            approval_request_id: attempt.approval_request_id,
            kind: attempt.kind,
            peer_key: attempt.peer_key,
            message_timestamp: attempt.message_timestamp,
            status: TransferStatus::Pending,
            created_at: attempt.created_at,
            updated_at: attempt.created_at,
            confirmed_at: None,
            metadata: attempt.metadata,
        })
    }

    fn find_attempt(&self, id: AttemptId) -> Result<Option<TransferAttempt>, TransferError> {
        self.find_attempt_where("id = ?", &[&id])
    }

    fn update_status(
        &self,
        id: AttemptId,
        status: TransferStatus,
        confirmed_at: Option<u64>,
        now: u64,
    ) -> Result<bool, TransferError> {
        if !status.is_terminal() {
            return Err(TransferError::InvalidParameters(
                "attempts can only move to a terminal status".to_string(),
            ));
        }

        let confirmed_at = match status {
            TransferStatus::Confirmed => confirmed_at.or(Some(now)),
            _ => None,
        };

        self.with_connection(|conn| {
            let rows = conn
                .execute(
                    "UPDATE transfer_attempts
                     SET status = ?, confirmed_at = COALESCE(?, confirmed_at), updated_at = ?
                     WHERE id = ? AND status = 'pending'",
                    params![status.as_str(), confirmed_at, now, id],
                )
                .map_err(into_transfer_err)?;

            Ok(rows == 1)
        })
    }

    fn fill_in_chain_tx_id(
        &self,
        approval_request_id: &str,
        chain_tx_id: &str,
    ) -> Result<bool, TransferError> {
        self.with_connection(|conn| {
            let rows = conn.execute(
                "UPDATE transfer_attempts SET chain_tx_id = ?
                 WHERE approval_request_id = ? AND chain_tx_id IS NULL",
                params![chain_tx_id, approval_request_id],
            );

            match rows {
                Ok(rows) => Ok(rows == 1),
                // Another attempt already owns this chain transaction id.
                Err(e) if is_constraint_violation(&e) => Ok(false),
                Err(e) => Err(into_transfer_err(e)),
            }
        })
    }

    fn fill_in_chain_tx_id_by_id(
        &self,
        id: AttemptId,
        chain_tx_id: &str,
    ) -> Result<bool, TransferError> {
        self.with_connection(|conn| {
            let rows = conn.execute(
                "UPDATE transfer_attempts SET chain_tx_id = ?
                 WHERE id = ? AND chain_tx_id IS NULL",
                params![chain_tx_id, id],
            );

            match rows {
                Ok(rows) => Ok(rows == 1),
                Err(e) if is_constraint_violation(&e) => Ok(false),
                Err(e) => Err(into_transfer_err(e)),
            }
        })
    }

    fn find_by_message(
        &self,
        peer_key: &str,
        message_timestamp: u64,
    ) -> Result<Option<TransferAttempt>, TransferError> {
        self.find_attempt_where(
            "peer_key = ? AND message_timestamp = ?",
            &[&peer_key, &message_timestamp],
        )
    }

    fn find_by_approval_request_id(
        &self,
        approval_request_id: &str,
    ) -> Result<Option<TransferAttempt>, TransferError> {
        self.find_attempt_where("approval_request_id = ?", &[&approval_request_id])
    }

    fn find_by_chain_tx_id(
        &self,
        chain_tx_id: &str,
    ) -> Result<Option<TransferAttempt>, TransferError> {
        self.find_attempt_where("chain_tx_id = ?", &[&chain_tx_id])
    }

    fn list_pending(&self) -> Result<Vec<TransferAttempt>, TransferError> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {ATTEMPT_COLUMNS} FROM transfer_attempts
                     WHERE status = 'pending' ORDER BY created_at ASC, id ASC"
                ))
                .map_err(into_transfer_err)?;

            let attempts = stmt
                .query_map([], db::row_to_attempt)
                .map_err(into_transfer_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(into_transfer_err)?;

            Ok(attempts)
        })
    }
}
