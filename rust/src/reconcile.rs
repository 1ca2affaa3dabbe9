//! Reconciliation engine.
//!
//! Three triggers drive a transfer attempt out of `pending`: the host's approval event,
//! the periodic sweep, and the balance-changed signal (which just re-runs the sweep).
//! Each trigger turns what it learned into a [`Signal`] and hands it to
//! [`Reconciler::reconcile`], the only code that moves an attempt.
//!
//! Every transition is a compare-and-set from `pending`. Only the caller that wins it
//! touches the chat message or notifies the peer, so concurrent triggers can overlap
//! freely without double notifications or status regressions.

use std::sync::Arc;

use charmchat_storage_traits::messages::types::MessageState;
use charmchat_storage_traits::transfers::types::{AttemptId, TransferAttempt, TransferStatus};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::ledger::{ApprovalEvent, ChainTransaction, Ledger, TrackingTag, TransactionLookup};
use crate::normalize::{normalize_execution_result, ExecutionOutcome};
use crate::orchestrator::SendOrchestrator;
use crate::store::ChatStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerSettings {
    pub application_tag: String,
    pub grace_period_ms: u64,
    pub history_limit: usize,
    pub mempool_limit: usize,
}

impl From<&AppConfig> for ReconcilerSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            application_tag: config.application_tag.clone(),
            grace_period_ms: config.grace_period_ms(),
            history_limit: config.history_limit,
            mempool_limit: config.mempool_limit,
        }
    }
}

/// What a trigger learned about an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// In a block at `confirmed_at`.
    Confirmed {
        chain_tx_id: Option<String>,
        confirmed_at: u64,
    },
    /// Broadcast but not yet in a block.
    Broadcast { chain_tx_id: String },
    Rejected { reason: String },
    /// Nothing conclusive; stay pending.
    Inconclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Confirmed { confirmed_at: u64 },
    Rejected,
    StillPending,
    /// Another trigger already moved the attempt out of pending.
    AlreadyResolved,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub examined: usize,
    pub confirmed: usize,
    pub rejected: usize,
    pub still_pending: usize,
    pub already_resolved: usize,
    pub errors: usize,
    /// Pending chat messages repaired or failed without going through an attempt.
    pub messages_repaired: usize,
}

impl SweepReport {
    fn record(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Confirmed { .. } => self.confirmed += 1,
            Resolution::Rejected => self.rejected += 1,
            Resolution::StillPending => self.still_pending += 1,
            Resolution::AlreadyResolved => self.already_resolved += 1,
        }
    }
}

/// History and mempool, fetched once per sweep. `None` when the fetch failed.
#[derive(Debug, Default)]
struct ChainSnapshot {
    history: Option<Vec<ChainTransaction>>,
    mempool: Option<Vec<ChainTransaction>>,
}

impl ChainSnapshot {
    fn is_complete(&self) -> bool {
        self.history.is_some() && self.mempool.is_some()
    }

    fn find_confirmed(&self, attempt: &TransferAttempt, tag: &str) -> Option<&ChainTransaction> {
        self.history
            .as_deref()?
            .iter()
            .find(|tx| tx.confirmed_at.is_some() && matches_attempt(tx, attempt, tag))
    }

    fn find_broadcast(&self, attempt: &TransferAttempt, tag: &str) -> Option<&ChainTransaction> {
        self.mempool
            .as_deref()?
            .iter()
            .find(|tx| matches_attempt(tx, attempt, tag))
    }
}

/// A chain transaction belongs to an attempt when it carries the attempt's tracking tag
/// or its chain id.
fn matches_attempt(tx: &ChainTransaction, attempt: &TransferAttempt, application_tag: &str) -> bool {
    let tagged = tx.tag.as_ref().is_some_and(|tag: &TrackingTag| {
        tag.message_timestamp == attempt.message_timestamp && tag.application_tag == application_tag
    });
    tagged || attempt.chain_tx_id.as_deref() == Some(tx.chain_tx_id.as_str())
}

fn grace_elapsed(now: u64, since: u64, grace_period_ms: u64) -> bool {
    now.saturating_sub(since) > grace_period_ms
}

pub struct Reconciler {
    store: Arc<ChatStore>,
    ledger: Arc<dyn Ledger>,
    orchestrator: Arc<SendOrchestrator>,
    clock: Arc<dyn Clock>,
    settings: ReconcilerSettings,
}

impl Reconciler {
    pub fn new(
        store: Arc<ChatStore>,
        ledger: Arc<dyn Ledger>,
        orchestrator: Arc<SendOrchestrator>,
        clock: Arc<dyn Clock>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            store,
            ledger,
            orchestrator,
            clock,
            settings,
        }
    }

    /// Approval event pushed by the host. Returns `None` for a request we never issued.
    pub async fn handle_approval(&self, event: ApprovalEvent) -> Result<Option<Resolution>> {
        let Some(attempt) = self.store.find_by_approval_request_id(&event.request_id)? else {
            debug!(request_id = %event.request_id, "approval event for unknown request");
            return Ok(None);
        };

        let signal = if !event.accepted {
            Signal::Rejected {
                reason: Error::ApprovalDenied(event.request_id.clone()).to_string(),
            }
        } else {
            match normalize_execution_result(&event.execution_result) {
                ExecutionOutcome::Failed(reason) => Signal::Rejected {
                    reason: Error::ExecutionFailed(reason).to_string(),
                },
                ExecutionOutcome::Succeeded {
                    chain_tx_id,
                    confirmed_at: Some(confirmed_at),
                } => Signal::Confirmed {
                    chain_tx_id,
                    confirmed_at,
                },
                // No block time yet: the sweep confirms it at the chain's time.
                ExecutionOutcome::Succeeded {
                    chain_tx_id: Some(chain_tx_id),
                    confirmed_at: None,
                } => Signal::Broadcast { chain_tx_id },
                ExecutionOutcome::Succeeded {
                    chain_tx_id: None,
                    confirmed_at: None,
                } => Signal::Inconclusive,
            }
        };

        info!(
            attempt_id = attempt.id,
            request_id = %event.request_id,
            accepted = event.accepted,
            "approval event"
        );
        self.reconcile(attempt.id, signal).await.map(Some)
    }

    /// Coarse "something settled" signal from the host.
    pub async fn on_balance_changed(&self) -> Result<SweepReport> {
        debug!("balance changed; sweeping");
        self.sweep().await
    }

    /// Examine every pending attempt, then every pending message with no attempt behind it.
    ///
    /// Row errors are logged and counted; they never abort the rest of the sweep.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        let pending = self.store.list_pending_attempts()?;

        if !pending.is_empty() {
            let snapshot = self.fetch_snapshot().await;
            for attempt in pending {
                report.examined += 1;
                let id = attempt.id;
                let signal = self.assess(&attempt, &snapshot).await;
                match self.reconcile(id, signal).await {
                    Ok(resolution) => report.record(resolution),
                    Err(e) => {
                        warn!(attempt_id = id, %e, "reconcile failed");
                        report.errors += 1;
                    }
                }
            }
        }

        match self.sweep_untracked_messages().await {
            Ok(repaired) => report.messages_repaired = repaired,
            Err(e) => {
                warn!(%e, "pending message sweep failed");
                report.errors += 1;
            }
        }

        debug!(?report, "sweep finished");
        Ok(report)
    }

    async fn fetch_snapshot(&self) -> ChainSnapshot {
        let (history, mempool) = tokio::join!(
            self.ledger
                .transactions_by_address(self.settings.history_limit),
            self.ledger.mempool_by_address(self.settings.mempool_limit),
        );
        ChainSnapshot {
            history: history
                .map_err(|e| warn!(%e, "history lookup failed"))
                .ok(),
            mempool: mempool
                .map_err(|e| warn!(%e, "mempool lookup failed"))
                .ok(),
        }
    }

    async fn assess(&self, attempt: &TransferAttempt, snapshot: &ChainSnapshot) -> Signal {
        let tag = self.settings.application_tag.as_str();

        if let Some(tx) = snapshot.find_confirmed(attempt, tag) {
            if let Some(confirmed_at) = tx.confirmed_at {
                return Signal::Confirmed {
                    chain_tx_id: Some(tx.chain_tx_id.clone()),
                    confirmed_at,
                };
            }
        }
        if let Some(tx) = snapshot.find_broadcast(attempt, tag) {
            return Signal::Broadcast {
                chain_tx_id: tx.chain_tx_id.clone(),
            };
        }

        match (&attempt.chain_tx_id, &attempt.approval_request_id) {
            (Some(chain_tx_id), _) => self.assess_chain_tx(attempt, chain_tx_id, snapshot).await,
            (None, Some(request_id)) => {
                // Only an explicit denial fails an approval-only attempt.
                match self.ledger.approval_outstanding(request_id).await {
                    Ok(outstanding) => {
                        debug!(attempt_id = attempt.id, %request_id, outstanding, "approval check")
                    }
                    Err(e) => warn!(attempt_id = attempt.id, %request_id, %e, "approval check failed"),
                }
                Signal::Inconclusive
            }
            (None, None) => Signal::Rejected {
                reason: Error::InvalidAttempt(format!("attempt {} has no tracking id", attempt.id))
                    .to_string(),
            },
        }
    }

    async fn assess_chain_tx(
        &self,
        attempt: &TransferAttempt,
        chain_tx_id: &str,
        snapshot: &ChainSnapshot,
    ) -> Signal {
        match self.ledger.transaction_by_id(chain_tx_id).await {
            Ok(TransactionLookup::Confirmed { confirmed_at }) => Signal::Confirmed {
                chain_tx_id: None,
                confirmed_at,
            },
            Ok(TransactionLookup::Pending) => Signal::Inconclusive,
            Ok(TransactionLookup::NotFound) => {
                let now = self.clock.now_ms();
                if snapshot.is_complete()
                    && grace_elapsed(now, attempt.created_at, self.settings.grace_period_ms)
                {
                    Signal::Rejected {
                        reason: Error::Transport(format!(
                            "{chain_tx_id} not seen on chain within the grace period"
                        ))
                        .to_string(),
                    }
                } else {
                    Signal::Inconclusive
                }
            }
            Err(e) => {
                warn!(attempt_id = attempt.id, chain_tx_id, %e, "transaction lookup failed");
                Signal::Inconclusive
            }
        }
    }

    /// Apply a signal to an attempt. Safe to call concurrently for the same attempt.
    pub async fn reconcile(&self, id: AttemptId, signal: Signal) -> Result<Resolution> {
        let Some(mut attempt) = self.store.find_attempt(id)? else {
            return Err(Error::InvalidAttempt(format!("attempt {id} not found")));
        };
        if attempt.status.is_terminal() {
            return Ok(Resolution::AlreadyResolved);
        }

        match signal {
            Signal::Inconclusive => Ok(Resolution::StillPending),
            Signal::Broadcast { chain_tx_id } => {
                self.ensure_chain_tx_id(&mut attempt, &chain_tx_id)?;
                Ok(Resolution::StillPending)
            }
            Signal::Rejected { reason } => {
                let now = self.clock.now_ms();
                if !self
                    .store
                    .transition_attempt(id, TransferStatus::Rejected, None, now)?
                {
                    return Ok(Resolution::AlreadyResolved);
                }
                info!(attempt_id = id, peer_key = %attempt.peer_key, %reason, "transfer rejected");
                if let Err(e) = self.store.update_message_state(
                    &attempt.peer_key,
                    attempt.message_timestamp,
                    MessageState::Failed,
                    None,
                ) {
                    warn!(attempt_id = id, %e, "could not mark message failed");
                }
                Ok(Resolution::Rejected)
            }
            Signal::Confirmed {
                chain_tx_id,
                confirmed_at,
            } => {
                if let Some(chain_tx_id) = chain_tx_id {
                    self.ensure_chain_tx_id(&mut attempt, &chain_tx_id)?;
                }
                let now = self.clock.now_ms();
                if !self.store.transition_attempt(
                    id,
                    TransferStatus::Confirmed,
                    Some(confirmed_at),
                    now,
                )? {
                    return Ok(Resolution::AlreadyResolved);
                }
                info!(
                    attempt_id = id,
                    peer_key = %attempt.peer_key,
                    chain_tx_id = ?attempt.chain_tx_id,
                    confirmed_at,
                    "transfer confirmed"
                );

                let message_key = self.mark_message_sent(&attempt, confirmed_at);
                // Exactly one caller reaches this point per attempt; no retry on failure.
                if let Err(e) = self.orchestrator.notify_peer(&attempt, message_key).await {
                    warn!(attempt_id = id, peer_key = %attempt.peer_key, %e, "peer notification failed");
                }
                Ok(Resolution::Confirmed { confirmed_at })
            }
        }
    }

    fn ensure_chain_tx_id(&self, attempt: &mut TransferAttempt, chain_tx_id: &str) -> Result<()> {
        if attempt.chain_tx_id.is_some() {
            return Ok(());
        }
        if self.store.fill_in_chain_tx_id_by_id(attempt.id, chain_tx_id)? {
            debug!(attempt_id = attempt.id, chain_tx_id, "chain tx id filled in");
            attempt.chain_tx_id = Some(chain_tx_id.to_string());
        } else if let Some(current) = self.store.find_attempt(attempt.id)? {
            attempt.chain_tx_id = current.chain_tx_id;
        }
        Ok(())
    }

    /// Re-key the message to the chain time and mark it sent. Returns the key it ends up at.
    fn mark_message_sent(&self, attempt: &TransferAttempt, confirmed_at: u64) -> u64 {
        let original = attempt.message_timestamp;
        let new_timestamp = (confirmed_at != original).then_some(confirmed_at);
        match self.store.update_message_state(
            &attempt.peer_key,
            original,
            MessageState::Sent,
            new_timestamp,
        ) {
            Ok(()) => confirmed_at,
            Err(Error::DuplicateKey { .. }) => {
                warn!(
                    attempt_id = attempt.id,
                    original, confirmed_at, "confirmation time already taken; keeping original key"
                );
                if let Err(e) = self.store.update_message_state(
                    &attempt.peer_key,
                    original,
                    MessageState::Sent,
                    None,
                ) {
                    warn!(attempt_id = attempt.id, %e, "could not mark message sent");
                }
                original
            }
            Err(e) => {
                warn!(attempt_id = attempt.id, %e, "message for confirmed transfer not updated");
                confirmed_at
            }
        }
    }

    /// Pending local messages whose attempt is terminal (repair) or missing (grace rule).
    async fn sweep_untracked_messages(&self) -> Result<usize> {
        let now = self.clock.now_ms();
        let mut repaired = 0;

        for message in self.store.pending_messages()? {
            if !message.is_from_me() {
                continue;
            }
            let attempt = self
                .store
                .find_by_message(&message.peer_key, message.timestamp)?;

            let outcome = match attempt {
                Some(a) if a.status == TransferStatus::Pending => continue,
                Some(a) if a.status == TransferStatus::Confirmed => {
                    let confirmed_at = a.confirmed_at.unwrap_or(message.timestamp);
                    self.mark_message_sent(&a, confirmed_at);
                    "sent"
                }
                Some(_) => {
                    self.store.update_message_state(
                        &message.peer_key,
                        message.timestamp,
                        MessageState::Failed,
                        None,
                    )?;
                    "failed"
                }
                None if grace_elapsed(now, message.timestamp, self.settings.grace_period_ms) => {
                    self.store.update_message_state(
                        &message.peer_key,
                        message.timestamp,
                        MessageState::Failed,
                        None,
                    )?;
                    "failed"
                }
                None => continue,
            };
            info!(
                peer_key = %message.peer_key,
                timestamp = message.timestamp,
                outcome,
                "pending message repaired"
            );
            repaired += 1;
        }
        Ok(repaired)
    }
}
