//! Transfers module
//!
//! The transaction ledger: one row per value-transfer attempt, linking the chat
//! message to the tracking ids returned by the host.
//!
//! Status updates are compare-and-set operations. Every implementation must only
//! move a row out of `pending`, and must report whether *this* call performed the
//! transition so that side effects (the deferred peer notification) run at most once.

pub mod error;
pub mod types;

use self::error::TransferError;
use self::types::*;

/// Storage traits for the transfers module
pub trait TransferStorage {
    /// Insert a new attempt and return it with its assigned id.
    ///
    /// Fails with [`TransferError::InvalidAttempt`] when both tracking ids are null.
    fn insert_attempt(&self, attempt: NewTransferAttempt)
    -> Result<TransferAttempt, TransferError>;

    /// Find an attempt by id
    fn find_attempt(&self, id: AttemptId) -> Result<Option<TransferAttempt>, TransferError>;

    /// Move a pending attempt to `status`.
    ///
    /// Equivalent to `UPDATE ... WHERE id = ? AND status = 'pending'`. Returns
    /// `Ok(true)` only when this call performed the transition; `Ok(false)` when
    /// the row is already terminal or does not exist. `confirmed_at` is recorded
    /// alongside a transition to `Confirmed`.
    fn update_status(
        &self,
        id: AttemptId,
        status: TransferStatus,
        confirmed_at: Option<u64>,
        now: u64,
    ) -> Result<bool, TransferError>;

    /// Record the chain transaction id of an attempt known only by its approval request.
    ///
    /// Only writes when the row's `chain_tx_id` is still null. Returns whether a row changed.
    fn fill_in_chain_tx_id(
        &self,
        approval_request_id: &str,
        chain_tx_id: &str,
    ) -> Result<bool, TransferError>;

    /// Record the chain transaction id on an attempt by id, only if still null
    fn fill_in_chain_tx_id_by_id(
        &self,
        id: AttemptId,
        chain_tx_id: &str,
    ) -> Result<bool, TransferError>;

    /// Find the attempt created for the chat message `(peer_key, message_timestamp)`
    fn find_by_message(
        &self,
        peer_key: &str,
        message_timestamp: u64,
    ) -> Result<Option<TransferAttempt>, TransferError>;

    /// Find an attempt by its approval request id
    fn find_by_approval_request_id(
        &self,
        approval_request_id: &str,
    ) -> Result<Option<TransferAttempt>, TransferError>;

    /// Find an attempt by its chain transaction id
    fn find_by_chain_tx_id(
        &self,
        chain_tx_id: &str,
    ) -> Result<Option<TransferAttempt>, TransferError>;

    /// All attempts still pending, oldest first
    fn list_pending(&self) -> Result<Vec<TransferAttempt>, TransferError>;
}
