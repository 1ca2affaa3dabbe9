//! Memory-based storage implementation of the ConversationStorage trait

use charmchat_storage_traits::conversations::ConversationStorage;
use charmchat_storage_traits::conversations::error::ConversationError;
use charmchat_storage_traits::conversations::types::*;

use crate::ChatMemoryStorage;

impl ConversationStorage for ChatMemoryStorage {
    fn conversation_flags(&self, peer_key: &str) -> Result<ConversationFlags, ConversationError> {
        let inner = self.inner.read();
        Ok(inner
            .conversations
            .get(peer_key)
            .cloned()
            .unwrap_or_else(|| ConversationFlags::new(peer_key)))
    }

    fn set_conversation_flag(
        &self,
        peer_key: &str,
        flag: ConversationFlag,
        value: bool,
    ) -> Result<(), ConversationError> {
        let mut inner = self.inner.write();
        let flags = inner
            .conversations
            .entry(peer_key.to_string())
            .or_insert_with(|| ConversationFlags::new(peer_key));
        flag.apply(flags, value);
        Ok(())
    }

    fn mark_opened(&self, peer_key: &str, timestamp: u64) -> Result<(), ConversationError> {
        let mut inner = self.inner.write();
        let flags = inner
            .conversations
            .entry(peer_key.to_string())
            .or_insert_with(|| ConversationFlags::new(peer_key));
        flags.last_opened_at = flags.last_opened_at.max(timestamp);
        Ok(())
    }
}
