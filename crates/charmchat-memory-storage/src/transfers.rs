//! Memory-based storage implementation of the TransferStorage trait

use charmchat_storage_traits::transfers::TransferStorage;
use charmchat_storage_traits::transfers::error::TransferError;
use charmchat_storage_traits::transfers::types::*;

use crate::ChatMemoryStorage;

impl ChatMemoryStorage {
    fn find_attempt_by<F>(&self, predicate: F) -> Option<TransferAttempt>
    where
        F: Fn(&TransferAttempt) -> bool,
    {
        let inner = self.inner.read();
        inner
            .attempts
            .values()
            .rev()
            .find(|attempt| predicate(attempt))
            .cloned()
    }
}

impl TransferStorage for ChatMemoryStorage {
    fn insert_attempt(
        &self,
        attempt: NewTransferAttempt,
    ) -> Result<TransferAttempt, TransferError> {
        attempt.validate()?;

        let metadata_size = serde_json::to_vec(&attempt.metadata)
            .map_err(|e| TransferError::InvalidParameters(e.to_string()))?
            .len();
        if metadata_size > self.limits.max_transfer_metadata_size {
            return Err(TransferError::InvalidParameters(format!(
                "Transfer metadata exceeds maximum size of {} bytes",
                self.limits.max_transfer_metadata_size
            )));
        }

        let mut inner = self.inner.write();

        let duplicate = inner.attempts.values().any(|existing| {
            (attempt.chain_tx_id.is_some() && existing.chain_tx_id == attempt.chain_tx_id)
                || (attempt.approval_request_id.is_some()
                    && existing.approval_request_id == attempt.approval_request_id)
        });
        if duplicate {
            return Err(TransferError::InvalidAttempt(
                "tracking id already recorded".to_string(),
            ));
        }

        let id = inner.next_attempt_id;
        inner.next_attempt_id += 1;

        let stored = TransferAttempt {
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
        };
        inner.attempts.insert(id, stored.clone());

        Ok(stored)
    }

    fn find_attempt(&self, id: AttemptId) -> Result<Option<TransferAttempt>, TransferError> {
        Ok(self.inner.read().attempts.get(&id).cloned())
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

        let mut inner = self.inner.write();
        match inner.attempts.get_mut(&id) {
            Some(attempt) if attempt.status == TransferStatus::Pending => {
                attempt.status = status;
                attempt.updated_at = now;
                if status == TransferStatus::Confirmed {
                    attempt.confirmed_at = confirmed_at.or(Some(now));
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn fill_in_chain_tx_id(
        &self,
        approval_request_id: &str,
        chain_tx_id: &str,
    ) -> Result<bool, TransferError> {
        let mut inner = self.inner.write();
        if inner
            .attempts
            .values()
            .any(|a| a.chain_tx_id.as_deref() == Some(chain_tx_id))
        {
            return Ok(false);
        }

        match inner.attempts.values_mut().find(|a| {
            a.approval_request_id.as_deref() == Some(approval_request_id)
                && a.chain_tx_id.is_none()
        }) {
            Some(attempt) => {
                attempt.chain_tx_id = Some(chain_tx_id.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn fill_in_chain_tx_id_by_id(
        &self,
        id: AttemptId,
        chain_tx_id: &str,
    ) -> Result<bool, TransferError> {
        let mut inner = self.inner.write();
        if inner
            .attempts
            .values()
            .any(|a| a.chain_tx_id.as_deref() == Some(chain_tx_id))
        {
            return Ok(false);
        }

        match inner.attempts.get_mut(&id) {
            Some(attempt) if attempt.chain_tx_id.is_none() => {
                attempt.chain_tx_id = Some(chain_tx_id.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn find_by_message(
        &self,
        peer_key: &str,
        message_timestamp: u64,
    ) -> Result<Option<TransferAttempt>, TransferError> {
        Ok(self.find_attempt_by(|a| {
            a.peer_key == peer_key && a.message_timestamp == message_timestamp
        }))
    }

    fn find_by_approval_request_id(
        &self,
        approval_request_id: &str,
    ) -> Result<Option<TransferAttempt>, TransferError> {
        Ok(self.find_attempt_by(|a| a.approval_request_id.as_deref() == Some(approval_request_id)))
    }

    fn find_by_chain_tx_id(
        &self,
        chain_tx_id: &str,
    ) -> Result<Option<TransferAttempt>, TransferError> {
        Ok(self.find_attempt_by(|a| a.chain_tx_id.as_deref() == Some(chain_tx_id)))
    }

    fn list_pending(&self) -> Result<Vec<TransferAttempt>, TransferError> {
        let inner = self.inner.read();
        let mut pending: Vec<TransferAttempt> = inner
            .attempts
            .values()
            .filter(|a| a.status == TransferStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|a| (a.created_at, a.id));
        Ok(pending)
    }
}
