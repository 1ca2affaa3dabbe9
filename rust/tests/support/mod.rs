#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use charmchat_core::{
    AppConfig, ChainTransaction, ChatCore, ChatPayload, Error, Ledger, ManualClock,
    PeerTransport, Result, SendRequest, TrackingTag, TransactionLookup,
};
use charmchat_memory_storage::ChatMemoryStorage;
use serde_json::{json, Value};

pub const PEER: &str = "0xPEER";
pub const ME: &str = "0xME";
pub const TAG: &str = "charmchat";
pub const MINUTE_MS: u64 = 60_000;

/// A scripted chain ledger. Every query answers from the tables below and counts calls.
#[derive(Default)]
pub struct FakeLedger {
    send_responses: Mutex<VecDeque<Value>>,
    history: Mutex<Vec<ChainTransaction>>,
    mempool: Mutex<Vec<ChainTransaction>>,
    lookups: Mutex<HashMap<String, TransactionLookup>>,
    outstanding: Mutex<HashSet<String>>,
    fail_queries: AtomicBool,
    pub sent: Mutex<Vec<SendRequest>>,
    pub send_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
    pub lookup_calls: AtomicUsize,
    pub approval_calls: AtomicUsize,
}

impl FakeLedger {
    pub fn push_send_response(&self, response: Value) {
        self.send_responses.lock().unwrap().push_back(response);
    }

    /// Synchronous success carrying a chain id.
    pub fn respond_sent(&self, chain_tx_id: &str) {
        self.push_send_response(json!({"status": true, "response": {"txpowid": chain_tx_id}}));
    }

    /// Queued behind manual approval.
    pub fn respond_queued(&self, request_id: &str) {
        self.push_send_response(json!({
            "status": false,
            "pending": true,
            "error": "Command pending approval",
            "response": {"pendinguid": request_id}
        }));
    }

    pub fn confirm_in_history(&self, chain_tx_id: &str, message_timestamp: u64, confirmed_at: u64) {
        self.history.lock().unwrap().push(ChainTransaction {
            chain_tx_id: chain_tx_id.to_string(),
            confirmed_at: Some(confirmed_at),
            tag: Some(tag(message_timestamp)),
        });
    }

    pub fn add_to_mempool(&self, chain_tx_id: &str, message_timestamp: u64) {
        self.mempool.lock().unwrap().push(ChainTransaction {
            chain_tx_id: chain_tx_id.to_string(),
            confirmed_at: None,
            tag: Some(tag(message_timestamp)),
        });
    }

    pub fn clear_mempool(&self) {
        self.mempool.lock().unwrap().clear();
    }

    pub fn set_lookup(&self, chain_tx_id: &str, lookup: TransactionLookup) {
        self.lookups
            .lock()
            .unwrap()
            .insert(chain_tx_id.to_string(), lookup);
    }

    pub fn set_outstanding(&self, request_id: &str) {
        self.outstanding
            .lock()
            .unwrap()
            .insert(request_id.to_string());
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    fn check_queries(&self) -> Result<()> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(Error::Transport("node unreachable".to_string()));
        }
        Ok(())
    }
}

pub fn tag(message_timestamp: u64) -> TrackingTag {
    TrackingTag {
        message_timestamp,
        application_tag: TAG.to_string(),
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn send(&self, request: &SendRequest) -> Result<Value> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(request.clone());
        // The host round-trip is a suspension point; let concurrent sends overlap it.
        tokio::task::yield_now().await;
        self.send_responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Transport("no scripted send response".to_string()))
    }

    async fn transaction_by_id(&self, chain_tx_id: &str) -> Result<TransactionLookup> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.check_queries()?;
        Ok(self
            .lookups
            .lock()
            .unwrap()
            .get(chain_tx_id)
            .copied()
            .unwrap_or(TransactionLookup::NotFound))
    }

    async fn transactions_by_address(&self, limit: usize) -> Result<Vec<ChainTransaction>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        // Give concurrent sweeps a chance to interleave.
        tokio::task::yield_now().await;
        self.check_queries()?;
        Ok(self
            .history
            .lock()
            .unwrap()
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mempool_by_address(&self, limit: usize) -> Result<Vec<ChainTransaction>> {
        tokio::task::yield_now().await;
        self.check_queries()?;
        Ok(self
            .mempool
            .lock()
            .unwrap()
            .iter()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn approval_outstanding(&self, request_id: &str) -> Result<bool> {
        self.approval_calls.fetch_add(1, Ordering::SeqCst);
        self.check_queries()?;
        Ok(self.outstanding.lock().unwrap().contains(request_id))
    }
}

/// Decodes and records everything handed to the transport.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, String, ChatPayload)>>,
    fail: AtomicBool,
}

impl RecordingTransport {
    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn payloads(&self) -> Vec<(String, ChatPayload)> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(peer, _, payload)| (peer.clone(), payload.clone()))
            .collect()
    }

    pub fn tags(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, tag, _)| tag.clone())
            .collect()
    }

    /// Charm and token notifications only.
    pub fn transfer_notifications(&self) -> Vec<ChatPayload> {
        self.payloads()
            .into_iter()
            .map(|(_, payload)| payload)
            .filter(|p| matches!(p, ChatPayload::Charm { .. } | ChatPayload::Token { .. }))
            .collect()
    }
}

#[async_trait]
impl PeerTransport for RecordingTransport {
    async fn send(&self, peer_key: &str, application_tag: &str, hex_payload: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Transport("peer unreachable".to_string()));
        }
        let payload = ChatPayload::from_hex(hex_payload)?;
        self.sent.lock().unwrap().push((
            peer_key.to_string(),
            application_tag.to_string(),
            payload,
        ));
        Ok(())
    }
}

pub struct Harness {
    pub core: Arc<ChatCore>,
    pub ledger: Arc<FakeLedger>,
    pub transport: Arc<RecordingTransport>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(now_ms: u64) -> Harness {
    harness_with_config(now_ms, AppConfig::default())
}

pub fn harness_with_config(now_ms: u64, config: AppConfig) -> Harness {
    let ledger = Arc::new(FakeLedger::default());
    let transport = Arc::new(RecordingTransport::default());
    let clock = Arc::new(ManualClock::new(now_ms));
    let core = Arc::new(ChatCore::with_clock(
        config,
        Arc::new(ChatMemoryStorage::new()),
        ledger.clone(),
        transport.clone(),
        clock.clone(),
        ME,
    ));
    Harness {
        core,
        ledger,
        transport,
        clock,
    }
}

pub async fn wait_until(what: &str, timeout: Duration, mut f: impl FnMut() -> bool) {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if f() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{what}: condition not met within {timeout:?}");
}
