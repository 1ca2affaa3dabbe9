//! Shared test functions run against every storage backend

#![allow(dead_code)]

use charmchat_storage_traits::groups::types::{Group, GroupMember, GroupMessage};
use charmchat_storage_traits::messages::types::{
    ChatMessage, LOCAL_DISPLAY_NAME, MessageKind, MessageState,
};
use charmchat_storage_traits::transfers::types::{
    NewTransferAttempt, TransferKind, TransferMetadata,
};

pub mod conversation_tests;
pub mod group_tests;
pub mod message_tests;
pub mod transfer_tests;

pub const PEER_A: &str = "0x30819F300D06092A864886F70D010101050003818D0030818902818100A1";
pub const PEER_B: &str = "0x30819F300D06092A864886F70D010101050003818D0030818902818100B2";

/// Creates a message sent by us
pub fn create_local_message(peer_key: &str, timestamp: u64, state: MessageState) -> ChatMessage {
    ChatMessage {
        peer_key: peer_key.to_string(),
        display_name: LOCAL_DISPLAY_NAME.to_string(),
        kind: MessageKind::Text,
        body: format!("outgoing {timestamp}"),
        attached_amount: None,
        state,
        timestamp,
    }
}

/// Creates a message received from the peer
pub fn create_remote_message(peer_key: &str, timestamp: u64) -> ChatMessage {
    ChatMessage {
        peer_key: peer_key.to_string(),
        display_name: "Alice".to_string(),
        kind: MessageKind::Text,
        body: format!("incoming {timestamp}"),
        attached_amount: None,
        state: MessageState::Delivered,
        timestamp,
    }
}

/// Creates a pending token transfer message
pub fn create_pending_transfer_message(peer_key: &str, timestamp: u64) -> ChatMessage {
    ChatMessage {
        peer_key: peer_key.to_string(),
        display_name: LOCAL_DISPLAY_NAME.to_string(),
        kind: MessageKind::Token,
        body: String::new(),
        attached_amount: Some("1.5".to_string()),
        state: MessageState::Pending,
        timestamp,
    }
}

/// Creates a new attempt with the given tracking ids
pub fn create_new_attempt(
    message_timestamp: u64,
    chain_tx_id: Option<&str>,
    approval_request_id: Option<&str>,
) -> NewTransferAttempt {
    NewTransferAttempt {
        chain_tx_id: chain_tx_id.map(str::to_string),
        approval_request_id: approval_request_id.map(str::to_string),
        kind: TransferKind::Token,
        peer_key: PEER_A.to_string(),
        message_timestamp,
        created_at: message_timestamp,
        metadata: TransferMetadata {
            display_name: "Bob".to_string(),
            amount: "1.5".to_string(),
            token_id: "0x00".to_string(),
            charm_id: None,
            message: Some("for coffee".to_string()),
        },
    }
}

/// Creates a group
pub fn create_test_group(group_id: &str, created_at: u64) -> Group {
    Group {
        group_id: group_id.to_string(),
        name: format!("Group {group_id}"),
        creator_key: PEER_A.to_string(),
        created_at,
    }
}

/// Creates a group member
pub fn create_test_member(group_id: &str, member_key: &str, joined_at: u64) -> GroupMember {
    GroupMember {
        group_id: group_id.to_string(),
        member_key: member_key.to_string(),
        display_name: format!("Member {joined_at}"),
        joined_at,
    }
}

/// Creates a group message
pub fn create_test_group_message(group_id: &str, sender_key: &str, timestamp: u64) -> GroupMessage {
    GroupMessage {
        group_id: group_id.to_string(),
        sender_key: sender_key.to_string(),
        sender_name: "Alice".to_string(),
        timestamp,
        body: format!("group {timestamp}"),
        state: MessageState::Delivered,
    }
}
