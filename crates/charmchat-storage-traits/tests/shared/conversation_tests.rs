//! Conversation flag test functions

use charmchat_storage_traits::conversations::ConversationStorage;
use charmchat_storage_traits::conversations::types::{ConversationFlag, ConversationFlags};

use super::{PEER_A, PEER_B};

/// Test that untouched peers report default flags
pub fn test_default_flags<S>(storage: S)
where
    S: ConversationStorage,
{
    let flags = storage.conversation_flags(PEER_A).unwrap();
    assert_eq!(flags, ConversationFlags::new(PEER_A));
}

/// Test setting and clearing individual flags
pub fn test_set_conversation_flags<S>(storage: S)
where
    S: ConversationStorage,
{
    storage
        .set_conversation_flag(PEER_A, ConversationFlag::Muted, true)
        .unwrap();
    storage
        .set_conversation_flag(PEER_A, ConversationFlag::Favorite, true)
        .unwrap();

    let flags = storage.conversation_flags(PEER_A).unwrap();
    assert!(flags.muted);
    assert!(!flags.archived);
    assert!(flags.favorite);

    storage
        .set_conversation_flag(PEER_A, ConversationFlag::Muted, false)
        .unwrap();
    storage
        .set_conversation_flag(PEER_A, ConversationFlag::Archived, true)
        .unwrap();

    let flags = storage.conversation_flags(PEER_A).unwrap();
    assert!(!flags.muted);
    assert!(flags.archived);
    assert!(flags.favorite);

    // Other peers are unaffected
    assert_eq!(
        storage.conversation_flags(PEER_B).unwrap(),
        ConversationFlags::new(PEER_B)
    );
}

/// Test that the last-opened marker never moves backwards
pub fn test_mark_opened_is_monotonic<S>(storage: S)
where
    S: ConversationStorage,
{
    storage.mark_opened(PEER_A, 2_000).unwrap();
    storage.mark_opened(PEER_A, 1_000).unwrap();
    assert_eq!(storage.conversation_flags(PEER_A).unwrap().last_opened_at, 2_000);

    storage.mark_opened(PEER_A, 3_000).unwrap();
    assert_eq!(storage.conversation_flags(PEER_A).unwrap().last_opened_at, 3_000);

    // Flags survive marker updates
    storage
        .set_conversation_flag(PEER_A, ConversationFlag::Muted, true)
        .unwrap();
    storage.mark_opened(PEER_A, 4_000).unwrap();
    let flags = storage.conversation_flags(PEER_A).unwrap();
    assert!(flags.muted);
    assert_eq!(flags.last_opened_at, 4_000);
}
