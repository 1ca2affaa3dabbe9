//! Wire payloads exchanged with peers.
//!
//! Every payload is JSON tagged by `type`, then hex encoded by [`crate::codec`] before it
//! is handed to the transport.

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatPayload {
    Text {
        username: String,
        message: String,
        timestamp: u64,
    },
    /// Sent only after the transfer behind it is confirmed on chain.
    Charm {
        username: String,
        charm_id: String,
        amount: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        timestamp: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chain_tx_id: Option<String>,
    },
    Token {
        username: String,
        token_id: String,
        amount: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        timestamp: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chain_tx_id: Option<String>,
    },
    Delivered {
        timestamp: u64,
    },
    Read {
        timestamp: u64,
    },
    Ping {
        nonce: String,
    },
    Pong {
        nonce: String,
    },
    GroupMessage {
        group_id: String,
        group_name: String,
        sender_name: String,
        timestamp: u64,
        body: String,
    },
    /// Acknowledges the group message the recipient got from us at `timestamp`.
    GroupAck {
        group_id: String,
        timestamp: u64,
    },
    GroupSyncRequest {
        group_id: String,
        since: u64,
    },
    GroupSyncResponse {
        group_id: String,
        messages: Vec<SyncedGroupMessage>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedGroupMessage {
    pub sender_key: String,
    pub sender_name: String,
    pub timestamp: u64,
    pub body: String,
}

impl ChatPayload {
    pub fn to_hex(&self) -> Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(codec::encode(&json))
    }

    pub fn from_hex(hex: &str) -> Result<Self> {
        let json = codec::decode(hex)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChatPayload::Text { .. } => "text",
            ChatPayload::Charm { .. } => "charm",
            ChatPayload::Token { .. } => "token",
            ChatPayload::Delivered { .. } => "delivered",
            ChatPayload::Read { .. } => "read",
            ChatPayload::Ping { .. } => "ping",
            ChatPayload::Pong { .. } => "pong",
            ChatPayload::GroupMessage { .. } => "group_message",
            ChatPayload::GroupAck { .. } => "group_ack",
            ChatPayload::GroupSyncRequest { .. } => "group_sync_request",
            ChatPayload::GroupSyncResponse { .. } => "group_sync_response",
        }
    }
}
