//! Group storage test functions

use charmchat_storage_traits::groups::GroupStorage;
use charmchat_storage_traits::groups::error::GroupError;
use charmchat_storage_traits::messages::types::MessageState;

use super::{
    PEER_A, PEER_B, create_test_group, create_test_group_message, create_test_member,
};

/// Test basic group save and find functionality
pub fn test_save_and_find_group<S>(storage: S)
where
    S: GroupStorage,
{
    let group = create_test_group("G1", 100);
    storage.save_group(group.clone()).unwrap();

    assert_eq!(storage.find_group("G1").unwrap(), Some(group.clone()));
    assert!(storage.find_group("G404").unwrap().is_none());

    // Saving again updates the name only
    let mut renamed = group.clone();
    renamed.name = "Renamed".to_string();
    renamed.created_at = 999;
    storage.save_group(renamed).unwrap();
    let found = storage.find_group("G1").unwrap().unwrap();
    assert_eq!(found.name, "Renamed");
    assert_eq!(found.created_at, 100);
}

/// Test listing all groups by creation time
pub fn test_all_groups<S>(storage: S)
where
    S: GroupStorage,
{
    assert!(storage.all_groups().unwrap().is_empty());

    storage.save_group(create_test_group("G2", 200)).unwrap();
    storage.save_group(create_test_group("G1", 100)).unwrap();

    let ids: Vec<String> = storage
        .all_groups()
        .unwrap()
        .into_iter()
        .map(|g| g.group_id)
        .collect();
    assert_eq!(ids, vec!["G1".to_string(), "G2".to_string()]);
}

/// Test membership management
pub fn test_group_members<S>(storage: S)
where
    S: GroupStorage,
{
    assert!(matches!(
        storage.save_member(create_test_member("G1", PEER_A, 1)),
        Err(GroupError::NotFound)
    ));

    storage.save_group(create_test_group("G1", 100)).unwrap();
    storage.save_member(create_test_member("G1", PEER_B, 20)).unwrap();
    storage.save_member(create_test_member("G1", PEER_A, 10)).unwrap();

    let keys: Vec<String> = storage
        .members("G1")
        .unwrap()
        .into_iter()
        .map(|m| m.member_key)
        .collect();
    assert_eq!(keys, vec![PEER_A.to_string(), PEER_B.to_string()]);

    assert!(storage.remove_member("G1", PEER_A).unwrap());
    assert!(!storage.remove_member("G1", PEER_A).unwrap());
    assert_eq!(storage.members("G1").unwrap().len(), 1);
}

/// Test that group messages are deduplicated and listed since a point in time
pub fn test_group_messages<S>(storage: S)
where
    S: GroupStorage,
{
    storage.save_group(create_test_group("G1", 100)).unwrap();

    assert!(
        storage
            .insert_group_message(create_test_group_message("G1", PEER_A, 1_000))
            .unwrap()
    );
    assert!(
        !storage
            .insert_group_message(create_test_group_message("G1", PEER_A, 1_000))
            .unwrap()
    );
    assert!(
        storage
            .insert_group_message(create_test_group_message("G1", PEER_B, 1_000))
            .unwrap()
    );
    assert!(
        storage
            .insert_group_message(create_test_group_message("G1", PEER_A, 2_000))
            .unwrap()
    );

    assert_eq!(storage.group_messages_since("G1", 0).unwrap().len(), 3);
    let since: Vec<u64> = storage
        .group_messages_since("G1", 1_000)
        .unwrap()
        .into_iter()
        .map(|m| m.timestamp)
        .collect();
    assert_eq!(since, vec![2_000]);

    assert!(
        storage
            .update_group_message_state("G1", 2_000, PEER_A, MessageState::Read)
            .unwrap()
    );
    assert!(
        !storage
            .update_group_message_state("G1", 3_000, PEER_A, MessageState::Read)
            .unwrap()
    );
    let updated = storage.group_messages_since("G1", 1_000).unwrap();
    assert_eq!(updated[0].state, MessageState::Read);

    assert!(matches!(
        storage.insert_group_message(create_test_group_message("G404", PEER_A, 1)),
        Err(GroupError::NotFound)
    ));
}

/// Test that deleting a group removes its members and messages
pub fn test_delete_group<S>(storage: S)
where
    S: GroupStorage,
{
    storage.save_group(create_test_group("G1", 100)).unwrap();
    storage.save_group(create_test_group("G2", 200)).unwrap();
    storage.save_member(create_test_member("G1", PEER_A, 1)).unwrap();
    storage.save_member(create_test_member("G2", PEER_A, 1)).unwrap();
    storage
        .insert_group_message(create_test_group_message("G1", PEER_A, 1_000))
        .unwrap();

    storage.delete_group("G1").unwrap();

    assert!(storage.find_group("G1").unwrap().is_none());
    assert!(storage.members("G1").unwrap().is_empty());
    assert!(storage.group_messages_since("G1", 0).unwrap().is_empty());
    assert_eq!(storage.members("G2").unwrap().len(), 1);

    // Recreating the group starts from a clean slate
    storage.save_group(create_test_group("G1", 300)).unwrap();
    assert!(storage.members("G1").unwrap().is_empty());
}
