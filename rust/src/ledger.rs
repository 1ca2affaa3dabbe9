//! Contracts with the host collaborators: the chain ledger and the peer transport.
//!
//! Both are injected as trait objects so tests can substitute fakes. Raw host responses
//! stay `serde_json::Value` here; [`crate::normalize`] is the only place that reads them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// State marker attached to an on-chain transaction at send time.
///
/// Lets a later history or mempool lookup find the originating attempt even when the
/// local approval request id was lost.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackingTag {
    pub message_timestamp: u64,
    pub application_tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub amount: String,
    /// Recipient wallet address.
    pub address: String,
    pub token_id: String,
    pub state: Option<TrackingTag>,
}

/// A transaction as reported by a history or mempool listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTransaction {
    pub chain_tx_id: String,
    /// Block time in milliseconds; `None` while in the mempool.
    pub confirmed_at: Option<u64>,
    pub tag: Option<TrackingTag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionLookup {
    Confirmed { confirmed_at: u64 },
    Pending,
    NotFound,
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Issue a value transfer. Returns the raw host response, whatever its shape.
    async fn send(&self, request: &SendRequest) -> Result<serde_json::Value>;

    async fn transaction_by_id(&self, chain_tx_id: &str) -> Result<TransactionLookup>;

    /// Bounded confirmed history of our account, newest first.
    async fn transactions_by_address(&self, limit: usize) -> Result<Vec<ChainTransaction>>;

    /// Bounded list of our broadcast but unconfirmed transactions.
    async fn mempool_by_address(&self, limit: usize) -> Result<Vec<ChainTransaction>>;

    /// Whether a queued approval request is still waiting for a human decision.
    async fn approval_outstanding(&self, request_id: &str) -> Result<bool>;
}

/// Fire-and-forget peer messaging. No delivery or ordering guarantee.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn send(&self, peer_key: &str, application_tag: &str, hex_payload: &str) -> Result<()>;
}

/// A payload received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub from: String,
    pub application_tag: String,
    pub hex_payload: String,
}

/// Pushed by the host when a human approves or denies a queued transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalEvent {
    pub request_id: String,
    pub accepted: bool,
    pub execution_result: serde_json::Value,
}
