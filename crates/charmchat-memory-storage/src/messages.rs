//! Memory-based storage implementation of the MessageStorage trait

use std::collections::HashMap;

use charmchat_storage_traits::conversations::types::ConversationFlags;
use charmchat_storage_traits::messages::MessageStorage;
use charmchat_storage_traits::messages::error::MessageError;
use charmchat_storage_traits::messages::types::*;

use crate::{ChatMemoryStorage, exceeds};

impl ChatMemoryStorage {
    fn validate_message(&self, message: &ChatMessage) -> Result<(), MessageError> {
        if exceeds(&message.body, self.limits.max_message_body_size) {
            return Err(MessageError::InvalidParameters(format!(
                "Message body exceeds maximum size of {} bytes",
                self.limits.max_message_body_size
            )));
        }
        if exceeds(&message.display_name, self.limits.max_display_name_length) {
            return Err(MessageError::InvalidParameters(format!(
                "Display name exceeds maximum length of {} bytes",
                self.limits.max_display_name_length
            )));
        }
        Ok(())
    }
}

impl MessageStorage for ChatMemoryStorage {
    fn insert_message(&self, message: ChatMessage) -> Result<(), MessageError> {
        self.validate_message(&message)?;

        let mut inner = self.inner.write();
        let key = (message.peer_key.clone(), message.timestamp);
        if inner.messages.contains_key(&key) {
            return Err(MessageError::DuplicateKey {
                peer_key: message.peer_key,
                timestamp: message.timestamp,
            });
        }
        inner.messages.insert(key, message);

        Ok(())
    }

    fn reserve_message(&self, mut message: ChatMessage) -> Result<u64, MessageError> {
        self.validate_message(&message)?;

        let mut inner = self.inner.write();
        let mut timestamp = message.timestamp;
        while inner.messages.keys().any(|(_, taken)| *taken == timestamp)
            || inner
                .attempts
                .values()
                .any(|a| a.message_timestamp == timestamp)
        {
            timestamp = timestamp.checked_add(1).ok_or_else(|| {
                MessageError::InvalidParameters("no free timestamp left".to_string())
            })?;
        }

        message.timestamp = timestamp;
        inner
            .messages
            .insert((message.peer_key.clone(), timestamp), message);

        Ok(timestamp)
    }

    fn find_message(
        &self,
        peer_key: &str,
        timestamp: u64,
    ) -> Result<Option<ChatMessage>, MessageError> {
        let inner = self.inner.read();
        Ok(inner
            .messages
            .get(&(peer_key.to_string(), timestamp))
            .cloned())
    }

    fn update_message_state(
        &self,
        peer_key: &str,
        timestamp: u64,
        state: MessageState,
        new_timestamp: Option<u64>,
    ) -> Result<(), MessageError> {
        let mut inner = self.inner.write();
        let key = (peer_key.to_string(), timestamp);
        let target = new_timestamp.unwrap_or(timestamp);

        if !inner.messages.contains_key(&key) {
            return Err(MessageError::NotFound);
        }

        if target == timestamp {
            if let Some(message) = inner.messages.get_mut(&key) {
                message.state = state;
            }
            return Ok(());
        }

        let target_key = (peer_key.to_string(), target);
        if inner.messages.contains_key(&target_key) {
            return Err(MessageError::DuplicateKey {
                peer_key: peer_key.to_string(),
                timestamp: target,
            });
        }

        if let Some(mut message) = inner.messages.remove(&key) {
            message.state = state;
            message.timestamp = target;
            inner.messages.insert(target_key, message);
        }

        Ok(())
    }

    fn messages_by_peer(&self, peer_key: &str) -> Result<Vec<ChatMessage>, MessageError> {
        let inner = self.inner.read();
        // Keys sort by (peer, timestamp) so the range is already oldest first.
        Ok(inner
            .messages
            .range((peer_key.to_string(), 0)..=(peer_key.to_string(), u64::MAX))
            .map(|(_, message)| message.clone())
            .collect())
    }

    fn pending_messages(&self) -> Result<Vec<ChatMessage>, MessageError> {
        let inner = self.inner.read();
        let mut pending: Vec<ChatMessage> = inner
            .messages
            .values()
            .filter(|m| m.state == MessageState::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|m| m.timestamp);
        Ok(pending)
    }

    fn recent_by_peer(&self) -> Result<Vec<ConversationSummary>, MessageError> {
        let inner = self.inner.read();

        let mut latest: HashMap<&str, &ChatMessage> = HashMap::new();
        for ((peer_key, _), message) in inner.messages.iter() {
            // Later keys for the same peer always carry a larger timestamp.
            latest.insert(peer_key.as_str(), message);
        }

        let mut summaries: Vec<ConversationSummary> = latest
            .into_iter()
            .map(|(peer_key, last_message)| {
                let flags = inner
                    .conversations
                    .get(peer_key)
                    .cloned()
                    .unwrap_or_else(|| ConversationFlags::new(peer_key));
                let unread_count = inner
                    .messages
                    .range((peer_key.to_string(), 0)..=(peer_key.to_string(), u64::MAX))
                    .filter(|(_, m)| !m.is_from_me() && m.timestamp > flags.last_opened_at)
                    .count() as u32;
                ConversationSummary {
                    last_message: last_message.clone(),
                    unread_count,
                    flags,
                }
            })
            .collect();

        summaries.sort_by(|a, b| b.last_message.timestamp.cmp(&a.last_message.timestamp));
        Ok(summaries)
    }

    fn delete_messages_for_peer(&self, peer_key: &str) -> Result<usize, MessageError> {
        let mut inner = self.inner.write();
        let before = inner.messages.len();
        inner.messages.retain(|(peer, _), _| peer != peer_key);
        Ok(before - inner.messages.len())
    }
}
