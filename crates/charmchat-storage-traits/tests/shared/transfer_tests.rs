//! Transfer ledger test functions

use charmchat_storage_traits::transfers::TransferStorage;
use charmchat_storage_traits::transfers::error::TransferError;
use charmchat_storage_traits::transfers::types::{TrackingPhase, TransferStatus};

use charmchat_storage_traits::transfers::types::NewTransferAttempt;

use super::{PEER_A, PEER_B, create_new_attempt};

/// Test inserting attempts and finding them by every index
pub fn test_insert_and_find_attempt<S>(storage: S)
where
    S: TransferStorage,
{
    let first = storage
        .insert_attempt(create_new_attempt(1_000, Some("0xTX1"), None))
        .unwrap();
    let second = storage
        .insert_attempt(create_new_attempt(2_000, None, Some("REQ-2")))
        .unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(first.status, TransferStatus::Pending);
    assert_eq!(first.updated_at, first.created_at);
    assert_eq!(first.confirmed_at, None);

    assert_eq!(storage.find_attempt(first.id).unwrap(), Some(first.clone()));
    assert_eq!(
        storage.find_by_chain_tx_id("0xTX1").unwrap(),
        Some(first.clone())
    );
    assert_eq!(
        storage.find_by_approval_request_id("REQ-2").unwrap(),
        Some(second.clone())
    );
    assert_eq!(
        storage.find_by_message(PEER_A, 2_000).unwrap(),
        Some(second.clone())
    );
    assert_eq!(
        second.metadata.message.as_deref(),
        Some("for coffee")
    );

    assert!(storage.find_by_chain_tx_id("0xNOPE").unwrap().is_none());
    assert!(storage.find_by_approval_request_id("NOPE").unwrap().is_none());
    assert!(storage.find_by_message(PEER_A, 3_000).unwrap().is_none());
    assert!(storage.find_by_message(PEER_B, 2_000).unwrap().is_none());
}

/// Test that an attempt needs at least one tracking id
pub fn test_attempt_requires_tracking_id<S>(storage: S)
where
    S: TransferStorage,
{
    let result = storage.insert_attempt(create_new_attempt(1_000, None, None));
    assert!(matches!(result, Err(TransferError::InvalidAttempt(_))));
    assert!(storage.list_pending().unwrap().is_empty());

    let both = storage
        .insert_attempt(create_new_attempt(1_000, Some("0xTX"), Some("REQ")))
        .unwrap();
    assert_eq!(both.phase(), TrackingPhase::PendingChain);
}

/// Test that tracking ids are unique across attempts
pub fn test_duplicate_tracking_id<S>(storage: S)
where
    S: TransferStorage,
{
    storage
        .insert_attempt(create_new_attempt(1_000, Some("0xTX"), None))
        .unwrap();
    let result = storage.insert_attempt(create_new_attempt(2_000, Some("0xTX"), None));
    assert!(matches!(result, Err(TransferError::InvalidAttempt(_))));
    assert_eq!(storage.list_pending().unwrap().len(), 1);
}

/// Test that status changes are compare-and-set from pending
pub fn test_update_status_compare_and_set<S>(storage: S)
where
    S: TransferStorage,
{
    let attempt = storage
        .insert_attempt(create_new_attempt(1_000, Some("0xTX"), None))
        .unwrap();

    assert!(
        storage
            .update_status(attempt.id, TransferStatus::Confirmed, Some(7_000), 8_000)
            .unwrap()
    );
    // A second transition loses, in either direction
    assert!(
        !storage
            .update_status(attempt.id, TransferStatus::Confirmed, Some(9_000), 9_500)
            .unwrap()
    );
    assert!(
        !storage
            .update_status(attempt.id, TransferStatus::Rejected, None, 9_500)
            .unwrap()
    );

    let stored = storage.find_attempt(attempt.id).unwrap().unwrap();
    assert_eq!(stored.status, TransferStatus::Confirmed);
    assert_eq!(stored.confirmed_at, Some(7_000));
    assert_eq!(stored.updated_at, 8_000);
    assert_eq!(stored.phase(), TrackingPhase::Confirmed);

    // Unknown ids are not an error
    assert!(
        !storage
            .update_status(attempt.id + 100, TransferStatus::Rejected, None, 1)
            .unwrap()
    );

    // Pending is not a valid target
    assert!(matches!(
        storage.update_status(attempt.id, TransferStatus::Pending, None, 1),
        Err(TransferError::InvalidParameters(_))
    ));
}

/// Test that confirmations without an explicit time fall back to `now`
pub fn test_confirm_defaults_to_now<S>(storage: S)
where
    S: TransferStorage,
{
    let attempt = storage
        .insert_attempt(create_new_attempt(1_000, Some("0xTX"), None))
        .unwrap();
    assert!(
        storage
            .update_status(attempt.id, TransferStatus::Confirmed, None, 4_000)
            .unwrap()
    );
    let stored = storage.find_attempt(attempt.id).unwrap().unwrap();
    assert_eq!(stored.confirmed_at, Some(4_000));
}

/// Test filling in the chain id of an approval-tracked attempt
pub fn test_fill_in_chain_tx_id<S>(storage: S)
where
    S: TransferStorage,
{
    let attempt = storage
        .insert_attempt(create_new_attempt(1_000, None, Some("REQ")))
        .unwrap();
    assert_eq!(attempt.phase(), TrackingPhase::PendingApproval);

    assert!(storage.fill_in_chain_tx_id("REQ", "0xTX").unwrap());
    // Once set, never changed
    assert!(!storage.fill_in_chain_tx_id("REQ", "0xOTHER").unwrap());
    assert!(!storage.fill_in_chain_tx_id_by_id(attempt.id, "0xOTHER").unwrap());
    assert!(!storage.fill_in_chain_tx_id("UNKNOWN", "0xTX2").unwrap());

    let stored = storage.find_by_chain_tx_id("0xTX").unwrap().unwrap();
    assert_eq!(stored.id, attempt.id);
    assert_eq!(stored.phase(), TrackingPhase::PendingChain);

    let by_id = storage
        .insert_attempt(create_new_attempt(2_000, None, Some("REQ-B")))
        .unwrap();
    assert!(storage.fill_in_chain_tx_id_by_id(by_id.id, "0xTX-B").unwrap());
    assert_eq!(
        storage
            .find_attempt(by_id.id)
            .unwrap()
            .unwrap()
            .chain_tx_id
            .as_deref(),
        Some("0xTX-B")
    );

    // A chain id already owned by another attempt is not reassigned
    let third = storage
        .insert_attempt(create_new_attempt(3_000, None, Some("REQ-C")))
        .unwrap();
    assert!(!storage.fill_in_chain_tx_id("REQ-C", "0xTX").unwrap());
    assert!(
        storage
            .find_attempt(third.id)
            .unwrap()
            .unwrap()
            .chain_tx_id
            .is_none()
    );
}

/// Test that only pending attempts are listed, oldest first
pub fn test_list_pending<S>(storage: S)
where
    S: TransferStorage,
{
    let late = storage
        .insert_attempt(create_new_attempt(3_000, Some("0xC"), None))
        .unwrap();
    let early = storage
        .insert_attempt(create_new_attempt(1_000, Some("0xA"), None))
        .unwrap();
    let done = storage
        .insert_attempt(create_new_attempt(2_000, Some("0xB"), None))
        .unwrap();
    storage
        .update_status(done.id, TransferStatus::Rejected, None, 5_000)
        .unwrap();

    let ids: Vec<_> = storage
        .list_pending()
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(ids, vec![early.id, late.id]);
}

/// Test that lookups by message are scoped to the peer
pub fn test_find_by_message_is_per_peer<S>(storage: S)
where
    S: TransferStorage,
{
    let for_a = storage
        .insert_attempt(create_new_attempt(5_000, None, Some("REQ-A")))
        .unwrap();
    let for_b = storage
        .insert_attempt(NewTransferAttempt {
            peer_key: PEER_B.to_string(),
            ..create_new_attempt(5_000, None, Some("REQ-B"))
        })
        .unwrap();

    assert_eq!(storage.find_by_message(PEER_A, 5_000).unwrap(), Some(for_a));
    assert_eq!(storage.find_by_message(PEER_B, 5_000).unwrap(), Some(for_b));
}
