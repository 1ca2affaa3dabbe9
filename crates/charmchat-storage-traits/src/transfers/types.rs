//! Types for the transfers module

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::TransferError;

/// Local surrogate key of a transfer attempt
pub type AttemptId = u64;

/// A value-transfer attempt tied to a chat message.
///
/// The true identity of the attempt is whichever tracking id is known:
/// `chain_tx_id` (may be filled in later, never changed once set) and/or
/// `approval_request_id`. `id` is a local row key only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAttempt {
    /// Local row key
    pub id: AttemptId,
    /// On-chain transaction id, once known
    pub chain_tx_id: Option<String>,
    /// Host approval request id for transfers queued behind manual approval
    pub approval_request_id: Option<String>,
    /// Charm or token
    pub kind: TransferKind,
    /// Recipient messaging key
    pub peer_key: String,
    /// Logical timestamp of the chat message created at send time
    pub message_timestamp: u64,
    /// Lifecycle status
    pub status: TransferStatus,
    /// Creation time in milliseconds
    pub created_at: u64,
    /// Last status change in milliseconds
    pub updated_at: u64,
    /// Chain confirmation time, set when the attempt is confirmed
    pub confirmed_at: Option<u64>,
    /// Data needed to replay the peer notification once confirmed
    pub metadata: TransferMetadata,
}

impl TransferAttempt {
    /// Where this attempt sits in the reconciliation lattice
    pub fn phase(&self) -> TrackingPhase {
        match self.status {
            TransferStatus::Confirmed => TrackingPhase::Confirmed,
            TransferStatus::Rejected => TrackingPhase::Rejected,
            TransferStatus::Pending => match (&self.chain_tx_id, &self.approval_request_id) {
                (Some(_), _) => TrackingPhase::PendingChain,
                (None, Some(_)) => TrackingPhase::PendingApproval,
                (None, None) => TrackingPhase::Untracked,
            },
        }
    }
}

/// Values required to insert a new transfer attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransferAttempt {
    /// On-chain transaction id, if returned synchronously
    pub chain_tx_id: Option<String>,
    /// Approval request id, if the send was queued
    pub approval_request_id: Option<String>,
    /// Charm or token
    pub kind: TransferKind,
    /// Recipient messaging key
    pub peer_key: String,
    /// Logical timestamp of the associated chat message
    pub message_timestamp: u64,
    /// Creation time in milliseconds
    pub created_at: u64,
    /// Notification replay data
    pub metadata: TransferMetadata,
}

impl NewTransferAttempt {
    /// Reject attempts that carry no tracking id at all
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.chain_tx_id.is_none() && self.approval_request_id.is_none() {
            return Err(TransferError::InvalidAttempt(
                "either chain_tx_id or approval_request_id is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything needed to rebuild the peer-facing notification.
///
/// Stored as a JSON column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferMetadata {
    /// Our display name as the peer should see it
    pub display_name: String,
    /// Decimal amount
    pub amount: String,
    /// Token identifier (`0x00` for the native coin)
    pub token_id: String,
    /// Charm identifier for charm transfers
    pub charm_id: Option<String>,
    /// Optional message text sent along with the transfer
    pub message: Option<String>,
}

/// Reconciliation phase derived from the tracking ids and status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingPhase {
    /// Approval request known, chain transaction not yet known
    PendingApproval,
    /// Chain transaction known, not yet in a block
    PendingChain,
    /// No tracking id at all
    Untracked,
    /// Terminal success
    Confirmed,
    /// Terminal failure
    Rejected,
}

/// Declared type of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferKind {
    /// Charm with an attached amount
    Charm,
    /// Plain token transfer
    Token,
}

impl TransferKind {
    /// Get as `&str`
    pub fn as_str(&self) -> &str {
        match self {
            Self::Charm => "charm",
            Self::Token => "token",
        }
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransferKind {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "charm" => Ok(Self::Charm),
            "token" => Ok(Self::Token),
            _ => Err(TransferError::InvalidParameters(format!(
                "Invalid transfer kind: {}",
                s
            ))),
        }
    }
}

impl Serialize for TransferKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TransferKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Ledger status. Only ever moves forward from `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferStatus {
    /// Outcome not yet known
    Pending,
    /// Confirmed on chain (terminal)
    Confirmed,
    /// Denied, failed at execution, or expired (terminal)
    Rejected,
}

impl TransferStatus {
    /// Get as `&str`
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        }
    }

    /// Confirmed and rejected never change again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransferStatus {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "rejected" => Ok(Self::Rejected),
            _ => Err(TransferError::InvalidParameters(format!(
                "Invalid transfer status: {}",
                s
            ))),
        }
    }
}

impl Serialize for TransferStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TransferStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
