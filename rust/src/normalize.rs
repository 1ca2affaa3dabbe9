//! Response-shape normalization at the host boundary.
//!
//! The host places transaction ids in several places depending on command and version:
//! at the top level, under `response`, under `body`, under `txpow`, or under
//! `response.txpow`. Everything past this module works with typed results only.

use serde_json::Value;

const CONTAINERS: &[&[&str]] = &[
    &[],
    &["response"],
    &["body"],
    &["txpow"],
    &["response", "txpow"],
    &["body", "txpow"],
];

const CHAIN_TX_ID_KEYS: &[&str] = &["txpowid"];
const APPROVAL_ID_KEYS: &[&str] = &["pendinguid", "uid"];
const TIME_PATHS: &[&[&str]] = &[
    &["header", "timemilli"],
    &["txpow", "header", "timemilli"],
    &["response", "txpow", "header", "timemilli"],
    &["response", "header", "timemilli"],
    &["body", "txpow", "header", "timemilli"],
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendStatus {
    /// Executed synchronously.
    Sent,
    /// Waiting for a human to approve it on the host.
    Queued,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSend {
    pub status: SendStatus,
    pub chain_tx_id: Option<String>,
    pub approval_request_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Succeeded {
        chain_tx_id: Option<String>,
        confirmed_at: Option<u64>,
    },
    Failed(String),
}

pub fn normalize_send_response(response: &Value) -> NormalizedSend {
    let chain_tx_id = find_string(response, CHAIN_TX_ID_KEYS);
    let approval_request_id = find_string(response, APPROVAL_ID_KEYS);

    let status = if is_pending(response) {
        SendStatus::Queued
    } else if reports_failure(response) {
        SendStatus::Failed(error_message(response))
    } else {
        SendStatus::Sent
    };

    NormalizedSend {
        status,
        chain_tx_id,
        approval_request_id,
    }
}

pub fn normalize_execution_result(result: &Value) -> ExecutionOutcome {
    if reports_failure(result) {
        return ExecutionOutcome::Failed(error_message(result));
    }
    ExecutionOutcome::Succeeded {
        chain_tx_id: find_string(result, CHAIN_TX_ID_KEYS),
        confirmed_at: TIME_PATHS.iter().find_map(|path| as_millis(lookup(result, path)?)),
    }
}

/// Either an explicit `pending: true`, or `status: false` with an error mentioning pending.
fn is_pending(response: &Value) -> bool {
    if response.get("pending").and_then(Value::as_bool) == Some(true) {
        return true;
    }
    response.get("status").and_then(Value::as_bool) == Some(false)
        && response
            .get("error")
            .and_then(Value::as_str)
            .is_some_and(|e| e.to_ascii_lowercase().contains("pending"))
}

fn reports_failure(value: &Value) -> bool {
    if value.get("status").and_then(Value::as_bool) == Some(false) {
        return true;
    }
    // Some commands answer `{"response": {"status": false, ...}}`.
    value
        .get("response")
        .and_then(|r| r.get("status"))
        .and_then(Value::as_bool)
        == Some(false)
}

fn error_message(value: &Value) -> String {
    value
        .get("error")
        .or_else(|| value.get("response").and_then(|r| r.get("error")))
        .and_then(Value::as_str)
        .filter(|e| !e.trim().is_empty())
        .unwrap_or("unknown error")
        .to_string()
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

fn find_string(value: &Value, keys: &[&str]) -> Option<String> {
    CONTAINERS.iter().find_map(|container| {
        let node = lookup(value, container)?;
        keys.iter().find_map(|key| {
            node.get(*key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
    })
}

fn as_millis(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
