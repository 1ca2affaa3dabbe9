//! Builders shared by storage and core tests.

use crate::groups::types::{Group, GroupMember, GroupMessage};
use crate::messages::types::{ChatMessage, LOCAL_DISPLAY_NAME, MessageKind, MessageState};
use crate::transfers::types::{NewTransferAttempt, TransferKind, TransferMetadata};

/// A local text message
pub fn local_message(peer_key: &str, timestamp: u64, state: MessageState) -> ChatMessage {
    ChatMessage {
        peer_key: peer_key.to_string(),
        display_name: LOCAL_DISPLAY_NAME.to_string(),
        kind: MessageKind::Text,
        body: format!("hello at {timestamp}"),
        attached_amount: None,
        state,
        timestamp,
    }
}

/// A message received from `peer_key`
pub fn remote_message(peer_key: &str, display_name: &str, timestamp: u64) -> ChatMessage {
    ChatMessage {
        peer_key: peer_key.to_string(),
        display_name: display_name.to_string(),
        kind: MessageKind::Text,
        body: format!("hi at {timestamp}"),
        attached_amount: None,
        state: MessageState::Delivered,
        timestamp,
    }
}

/// A local pending charm message
pub fn pending_charm(peer_key: &str, timestamp: u64, amount: &str) -> ChatMessage {
    ChatMessage {
        peer_key: peer_key.to_string(),
        display_name: LOCAL_DISPLAY_NAME.to_string(),
        kind: MessageKind::Charm,
        body: String::new(),
        attached_amount: Some(amount.to_string()),
        state: MessageState::Pending,
        timestamp,
    }
}

/// A new transfer attempt with the given tracking ids
pub fn new_attempt(
    peer_key: &str,
    message_timestamp: u64,
    chain_tx_id: Option<&str>,
    approval_request_id: Option<&str>,
) -> NewTransferAttempt {
    NewTransferAttempt {
        chain_tx_id: chain_tx_id.map(str::to_string),
        approval_request_id: approval_request_id.map(str::to_string),
        kind: TransferKind::Charm,
        peer_key: peer_key.to_string(),
        message_timestamp,
        created_at: message_timestamp,
        metadata: TransferMetadata {
            display_name: "alice".to_string(),
            amount: "5".to_string(),
            token_id: "0x00".to_string(),
            charm_id: Some("heart".to_string()),
            message: None,
        },
    }
}

/// A group created by `creator_key`
pub fn group(group_id: &str, creator_key: &str) -> Group {
    Group {
        group_id: group_id.to_string(),
        name: format!("group {group_id}"),
        creator_key: creator_key.to_string(),
        created_at: 1,
    }
}

/// A group member
pub fn member(group_id: &str, member_key: &str, joined_at: u64) -> GroupMember {
    GroupMember {
        group_id: group_id.to_string(),
        member_key: member_key.to_string(),
        display_name: format!("member {member_key}"),
        joined_at,
    }
}

/// A group message
pub fn group_message(group_id: &str, sender_key: &str, timestamp: u64) -> GroupMessage {
    GroupMessage {
        group_id: group_id.to_string(),
        sender_key: sender_key.to_string(),
        sender_name: format!("member {sender_key}"),
        timestamp,
        body: format!("group hello at {timestamp}"),
        state: MessageState::Delivered,
    }
}
