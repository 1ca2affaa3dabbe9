//! Send Orchestrator: entry point for outgoing text and value transfers.
//!
//! A value transfer is issued through the ledger, recorded as a pending chat message plus
//! a transfer attempt, and classified as sent, queued or failed. The peer-facing
//! charm/token payload is not sent here; the reconciler sends it through
//! [`SendOrchestrator::notify_peer`] once the transfer is confirmed on chain.

use std::sync::Arc;

use charmchat_storage_traits::messages::types::{
    ChatMessage, MessageKind, MessageState, LOCAL_DISPLAY_NAME,
};
use charmchat_storage_traits::transfers::types::{
    AttemptId, NewTransferAttempt, TransferAttempt, TransferKind, TransferMetadata,
};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::ledger::{Ledger, SendRequest, TrackingTag};
use crate::messenger::Messenger;
use crate::normalize::{normalize_send_response, SendStatus};
use crate::payload::ChatPayload;
use crate::store::ChatStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub peer_key: String,
    /// Recipient wallet address on chain.
    pub address: String,
    pub kind: TransferKind,
    pub amount: String,
    pub token_id: String,
    /// Required for charms.
    pub charm_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Queued,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub outcome: SendOutcome,
    pub chain_tx_id: Option<String>,
    pub approval_request_id: Option<String>,
    /// Key of the local chat message, absent when nothing was stored.
    pub message_timestamp: Option<u64>,
    pub attempt_id: Option<AttemptId>,
}

pub struct SendOrchestrator {
    store: Arc<ChatStore>,
    ledger: Arc<dyn Ledger>,
    messenger: Arc<Messenger>,
    clock: Arc<dyn Clock>,
    display_name: String,
}

impl SendOrchestrator {
    pub fn new(
        store: Arc<ChatStore>,
        ledger: Arc<dyn Ledger>,
        messenger: Arc<Messenger>,
        clock: Arc<dyn Clock>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            ledger,
            messenger,
            clock,
            display_name: display_name.into(),
        }
    }

    /// Issue a value transfer and record it as a pending chat message.
    ///
    /// The message is stored before the ledger is called so its timestamp, which is also
    /// the on-chain tracking tag, is claimed before any transfer exists.
    pub async fn send_value_transfer(&self, request: TransferRequest) -> Result<SendReceipt> {
        if request.kind == TransferKind::Charm && request.charm_id.is_none() {
            return Err(Error::Payload("charm transfers need a charm id".to_string()));
        }

        let timestamp = self.store.reserve_message(transfer_message(
            &request,
            self.clock.now_ms(),
            MessageState::Pending,
        ))?;
        let send = SendRequest {
            amount: request.amount.clone(),
            address: request.address.clone(),
            token_id: request.token_id.clone(),
            state: Some(TrackingTag {
                message_timestamp: timestamp,
                application_tag: self.messenger.application_tag().to_string(),
            }),
        };

        let normalized = match self.ledger.send(&send).await {
            Ok(response) => normalize_send_response(&response),
            Err(e) => {
                warn!(peer_key = %request.peer_key, %e, "value transfer could not be issued");
                return self.record_failure(&request, timestamp, e.to_string());
            }
        };

        // Pending in both cases: the message becomes `sent` only once the chain confirms.
        let outcome = match normalized.status {
            SendStatus::Sent => SendOutcome::Sent,
            SendStatus::Queued => SendOutcome::Queued,
            SendStatus::Failed(reason) => {
                warn!(peer_key = %request.peer_key, %reason, "value transfer rejected by host");
                return self.record_failure(&request, timestamp, reason);
            }
        };

        let attempt_id = if normalized.chain_tx_id.is_some()
            || normalized.approval_request_id.is_some()
        {
            let attempt = self.store.insert_attempt(NewTransferAttempt {
                chain_tx_id: normalized.chain_tx_id.clone(),
                approval_request_id: normalized.approval_request_id.clone(),
                kind: request.kind,
                peer_key: request.peer_key.clone(),
                message_timestamp: timestamp,
                created_at: timestamp,
                metadata: TransferMetadata {
                    display_name: self.display_name.clone(),
                    amount: request.amount.clone(),
                    token_id: request.token_id.clone(),
                    charm_id: request.charm_id.clone(),
                    message: request.message.clone(),
                },
            })?;
            Some(attempt.id)
        } else {
            // The message sweep fails this row after the grace period.
            warn!(
                peer_key = %request.peer_key,
                timestamp,
                "host returned no tracking id; message left untracked"
            );
            None
        };

        info!(
            peer_key = %request.peer_key,
            timestamp,
            ?outcome,
            chain_tx_id = ?normalized.chain_tx_id,
            approval_request_id = ?normalized.approval_request_id,
            "value transfer recorded"
        );

        Ok(SendReceipt {
            outcome,
            chain_tx_id: normalized.chain_tx_id,
            approval_request_id: normalized.approval_request_id,
            message_timestamp: Some(timestamp),
            attempt_id,
        })
    }

    fn record_failure(
        &self,
        request: &TransferRequest,
        timestamp: u64,
        reason: String,
    ) -> Result<SendReceipt> {
        self.store
            .update_message_state(&request.peer_key, timestamp, MessageState::Failed, None)?;
        Ok(SendReceipt {
            outcome: SendOutcome::Failed(reason),
            chain_tx_id: None,
            approval_request_id: None,
            message_timestamp: Some(timestamp),
            attempt_id: None,
        })
    }

    /// Send a text message. Returns the key of the stored message.
    pub async fn send_text(&self, peer_key: &str, text: &str) -> Result<u64> {
        let timestamp = self.store.reserve_message(ChatMessage {
            peer_key: peer_key.to_string(),
            display_name: LOCAL_DISPLAY_NAME.to_string(),
            kind: MessageKind::Text,
            body: text.to_string(),
            attached_amount: None,
            state: MessageState::Pending,
            timestamp: self.clock.now_ms(),
        })?;
        let payload = ChatPayload::Text {
            username: self.display_name.clone(),
            message: text.to_string(),
            timestamp,
        };

        let state = match self.messenger.send(peer_key, &payload).await {
            Ok(()) => MessageState::Sent,
            Err(e) => {
                warn!(peer_key, %e, "text message not handed to transport");
                MessageState::Failed
            }
        };
        self.store
            .update_message_state(peer_key, timestamp, state, None)?;
        Ok(timestamp)
    }

    /// The deferred charm/token payload for a confirmed attempt.
    ///
    /// Re-sends against `existing_timestamp`: no chat message row is created.
    pub async fn notify_peer(&self, attempt: &TransferAttempt, existing_timestamp: u64) -> Result<()> {
        let metadata = &attempt.metadata;
        let username = if metadata.display_name.is_empty() {
            self.display_name.clone()
        } else {
            metadata.display_name.clone()
        };
        let payload = match attempt.kind {
            TransferKind::Charm => ChatPayload::Charm {
                username,
                charm_id: metadata.charm_id.clone().unwrap_or_default(),
                amount: metadata.amount.clone(),
                message: metadata.message.clone(),
                timestamp: existing_timestamp,
                chain_tx_id: attempt.chain_tx_id.clone(),
            },
            TransferKind::Token => ChatPayload::Token {
                username,
                token_id: metadata.token_id.clone(),
                amount: metadata.amount.clone(),
                message: metadata.message.clone(),
                timestamp: existing_timestamp,
                chain_tx_id: attempt.chain_tx_id.clone(),
            },
        };
        self.messenger.send(&attempt.peer_key, &payload).await?;
        info!(
            attempt_id = attempt.id,
            peer_key = %attempt.peer_key,
            timestamp = existing_timestamp,
            "peer notified of confirmed transfer"
        );
        Ok(())
    }
}

fn transfer_message(request: &TransferRequest, timestamp: u64, state: MessageState) -> ChatMessage {
    ChatMessage {
        peer_key: request.peer_key.clone(),
        display_name: LOCAL_DISPLAY_NAME.to_string(),
        kind: match request.kind {
            TransferKind::Charm => MessageKind::Charm,
            TransferKind::Token => MessageKind::Token,
        },
        body: request.message.clone().unwrap_or_default(),
        attached_amount: Some(request.amount.clone()),
        state,
        timestamp,
    }
}
