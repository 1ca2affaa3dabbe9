//! Message storage test functions

use charmchat_storage_traits::conversations::ConversationStorage;
use charmchat_storage_traits::messages::MessageStorage;
use charmchat_storage_traits::messages::error::MessageError;
use charmchat_storage_traits::messages::types::MessageState;
use charmchat_storage_traits::transfers::TransferStorage;

use super::{
    PEER_A, PEER_B, create_local_message, create_new_attempt, create_pending_transfer_message,
    create_remote_message,
};

/// Test inserting and finding messages by their composite key
pub fn test_insert_and_find_message<S>(storage: S)
where
    S: MessageStorage,
{
    let message = create_local_message(PEER_A, 1_000, MessageState::Sent);
    storage.insert_message(message.clone()).unwrap();

    let found = storage.find_message(PEER_A, 1_000).unwrap();
    assert_eq!(found, Some(message));

    // Same timestamp, other peer: a distinct key
    assert!(storage.find_message(PEER_B, 1_000).unwrap().is_none());
    assert!(storage.find_message(PEER_A, 1_001).unwrap().is_none());
}

/// Test that the (peer, timestamp) key is unique
pub fn test_duplicate_message_key<S>(storage: S)
where
    S: MessageStorage,
{
    storage
        .insert_message(create_local_message(PEER_A, 1_000, MessageState::Sent))
        .unwrap();

    let result = storage.insert_message(create_remote_message(PEER_A, 1_000));
    match result {
        Err(MessageError::DuplicateKey { peer_key, timestamp }) => {
            assert_eq!(peer_key, PEER_A);
            assert_eq!(timestamp, 1_000);
        }
        other => panic!("expected DuplicateKey, got {other:?}"),
    }

    // The original row is untouched
    let found = storage.find_message(PEER_A, 1_000).unwrap().unwrap();
    assert!(found.is_from_me());

    storage.insert_message(create_remote_message(PEER_B, 1_000)).unwrap();
}

/// Test updating the state of a message, with and without re-keying
pub fn test_update_message_state<S>(storage: S)
where
    S: MessageStorage,
{
    storage
        .insert_message(create_pending_transfer_message(PEER_A, 1_000))
        .unwrap();

    storage
        .update_message_state(PEER_A, 1_000, MessageState::Sent, None)
        .unwrap();
    let found = storage.find_message(PEER_A, 1_000).unwrap().unwrap();
    assert_eq!(found.state, MessageState::Sent);

    // Re-key to the chain confirmation time
    storage
        .update_message_state(PEER_A, 1_000, MessageState::Delivered, Some(5_000))
        .unwrap();
    assert!(storage.find_message(PEER_A, 1_000).unwrap().is_none());
    let moved = storage.find_message(PEER_A, 5_000).unwrap().unwrap();
    assert_eq!(moved.state, MessageState::Delivered);
    assert_eq!(moved.timestamp, 5_000);
    assert_eq!(moved.attached_amount.as_deref(), Some("1.5"));

    // Missing rows are reported
    assert!(matches!(
        storage.update_message_state(PEER_A, 1_000, MessageState::Read, None),
        Err(MessageError::NotFound)
    ));
}

/// Test that re-keying onto an occupied key fails without losing either row
pub fn test_rekey_collision<S>(storage: S)
where
    S: MessageStorage,
{
    storage
        .insert_message(create_pending_transfer_message(PEER_A, 1_000))
        .unwrap();
    storage.insert_message(create_remote_message(PEER_A, 2_000)).unwrap();

    let result = storage.update_message_state(PEER_A, 1_000, MessageState::Sent, Some(2_000));
    assert!(matches!(
        result,
        Err(MessageError::DuplicateKey {
            timestamp: 2_000,
            ..
        })
    ));

    let pending = storage.find_message(PEER_A, 1_000).unwrap().unwrap();
    assert_eq!(pending.state, MessageState::Pending);
    let other = storage.find_message(PEER_A, 2_000).unwrap().unwrap();
    assert!(!other.is_from_me());
}

/// Test per-peer listing order and the pending index
pub fn test_messages_by_peer_and_pending<S>(storage: S)
where
    S: MessageStorage,
{
    storage.insert_message(create_remote_message(PEER_A, 3_000)).unwrap();
    storage
        .insert_message(create_local_message(PEER_A, 1_000, MessageState::Sent))
        .unwrap();
    storage
        .insert_message(create_pending_transfer_message(PEER_A, 2_000))
        .unwrap();
    storage
        .insert_message(create_pending_transfer_message(PEER_B, 500))
        .unwrap();

    let timestamps: Vec<u64> = storage
        .messages_by_peer(PEER_A)
        .unwrap()
        .iter()
        .map(|m| m.timestamp)
        .collect();
    assert_eq!(timestamps, vec![1_000, 2_000, 3_000]);

    let pending: Vec<(String, u64)> = storage
        .pending_messages()
        .unwrap()
        .into_iter()
        .map(|m| (m.peer_key, m.timestamp))
        .collect();
    assert_eq!(
        pending,
        vec![(PEER_B.to_string(), 500), (PEER_A.to_string(), 2_000)]
    );

    assert!(storage.messages_by_peer("0xNOBODY").unwrap().is_empty());
}

/// Test the conversation list: newest message per peer, unread counts and flags
pub fn test_recent_by_peer<S>(storage: S)
where
    S: MessageStorage + ConversationStorage,
{
    assert!(storage.recent_by_peer().unwrap().is_empty());

    storage.insert_message(create_remote_message(PEER_A, 1_000)).unwrap();
    storage.insert_message(create_remote_message(PEER_A, 2_000)).unwrap();
    storage
        .insert_message(create_local_message(PEER_A, 3_000, MessageState::Sent))
        .unwrap();
    storage.insert_message(create_remote_message(PEER_B, 4_000)).unwrap();

    let recent = storage.recent_by_peer().unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].last_message.peer_key, PEER_B);
    assert_eq!(recent[0].last_message.timestamp, 4_000);
    assert_eq!(recent[0].unread_count, 1);
    assert_eq!(recent[1].last_message.peer_key, PEER_A);
    assert_eq!(recent[1].last_message.timestamp, 3_000);
    // Our own messages never count as unread
    assert_eq!(recent[1].unread_count, 2);

    storage.mark_opened(PEER_A, 1_000).unwrap();
    let recent = storage.recent_by_peer().unwrap();
    let peer_a = recent
        .iter()
        .find(|s| s.last_message.peer_key == PEER_A)
        .unwrap();
    assert_eq!(peer_a.unread_count, 1);
    assert_eq!(peer_a.flags.last_opened_at, 1_000);
}

/// Test deleting a conversation's messages
pub fn test_delete_messages_for_peer<S>(storage: S)
where
    S: MessageStorage,
{
    storage.insert_message(create_remote_message(PEER_A, 1_000)).unwrap();
    storage.insert_message(create_remote_message(PEER_A, 2_000)).unwrap();
    storage.insert_message(create_remote_message(PEER_B, 1_000)).unwrap();

    assert_eq!(storage.delete_messages_for_peer(PEER_A).unwrap(), 2);
    assert_eq!(storage.delete_messages_for_peer(PEER_A).unwrap(), 0);
    assert!(storage.messages_by_peer(PEER_A).unwrap().is_empty());
    assert_eq!(storage.messages_by_peer(PEER_B).unwrap().len(), 1);
}

/// Test that reserved send times are unique across peers and transfer attempts
pub fn test_reserve_message_skips_taken_timestamps<S>(storage: S)
where
    S: MessageStorage + TransferStorage,
{
    assert_eq!(
        storage
            .reserve_message(create_pending_transfer_message(PEER_A, 1_000))
            .unwrap(),
        1_000
    );
    // Another peer at the same millisecond still gets a distinct time
    assert_eq!(
        storage
            .reserve_message(create_pending_transfer_message(PEER_B, 1_000))
            .unwrap(),
        1_001
    );

    // A received message holds its timestamp too
    storage.insert_message(create_remote_message(PEER_B, 1_002)).unwrap();
    // So does an attempt whose message was re-keyed away
    storage
        .insert_attempt(create_new_attempt(1_003, Some("0xTX"), None))
        .unwrap();

    let reserved = storage
        .reserve_message(create_local_message(PEER_A, 1_000, MessageState::Pending))
        .unwrap();
    assert_eq!(reserved, 1_004);

    let stored = storage.find_message(PEER_A, reserved).unwrap().unwrap();
    assert_eq!(stored.timestamp, reserved);
    assert_eq!(stored.state, MessageState::Pending);
    assert!(storage.find_message(PEER_B, 1_001).unwrap().is_some());
}
