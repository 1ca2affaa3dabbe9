//! Receive path for 1:1 payloads and delivery/read receipts.

use std::sync::Arc;

use charmchat_storage_traits::messages::types::{
    ChatMessage, MessageKind, MessageState, LOCAL_DISPLAY_NAME,
};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::messenger::Messenger;
use crate::payload::ChatPayload;
use crate::store::ChatStore;

pub struct Inbox {
    store: Arc<ChatStore>,
    messenger: Arc<Messenger>,
}

impl Inbox {
    pub fn new(store: Arc<ChatStore>, messenger: Arc<Messenger>) -> Self {
        Self { store, messenger }
    }

    /// Store a text, charm or token payload from `from` and acknowledge it.
    ///
    /// Returns `false` for a payload we already have; it is still acknowledged, since the
    /// peer evidently missed our first receipt.
    pub async fn handle_chat(&self, from: &str, payload: ChatPayload) -> Result<bool> {
        let message = match payload {
            ChatPayload::Text {
                username,
                message,
                timestamp,
            } => remote(from, username, MessageKind::Text, message, None, timestamp),
            ChatPayload::Charm {
                username,
                amount,
                message,
                timestamp,
                ..
            } => remote(
                from,
                username,
                MessageKind::Charm,
                message.unwrap_or_default(),
                Some(amount),
                timestamp,
            ),
            ChatPayload::Token {
                username,
                amount,
                message,
                timestamp,
                ..
            } => remote(
                from,
                username,
                MessageKind::Token,
                message.unwrap_or_default(),
                Some(amount),
                timestamp,
            ),
            other => {
                return Err(Error::Payload(format!(
                    "{} is not a chat message",
                    other.kind()
                )))
            }
        };

        let timestamp = message.timestamp;
        let inserted = match self.store.insert_message(message) {
            Ok(()) => true,
            Err(Error::DuplicateKey { .. }) => {
                debug!(peer_key = from, timestamp, "duplicate message ignored");
                false
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = self
            .messenger
            .send(from, &ChatPayload::Delivered { timestamp })
            .await
        {
            warn!(peer_key = from, timestamp, %e, "delivered receipt not sent");
        }
        Ok(inserted)
    }

    /// Apply a delivered/read receipt to our own message at `timestamp`.
    ///
    /// Returns whether the message moved. Receipts never move a message backwards and never
    /// touch pending or failed messages.
    pub fn handle_receipt(&self, from: &str, timestamp: u64, next: MessageState) -> Result<bool> {
        let Some(message) = self.store.find_message(from, timestamp)? else {
            debug!(peer_key = from, timestamp, %next, "receipt for unknown message");
            return Ok(false);
        };
        if !message.is_from_me() || !message.state.accepts_receipt(next) {
            return Ok(false);
        }
        self.store.update_message_state(from, timestamp, next, None)?;
        Ok(true)
    }

    /// Move the last-opened marker to the newest message from `peer_key` and tell them.
    pub async fn mark_conversation_read(&self, peer_key: &str) -> Result<()> {
        let newest_remote = self
            .store
            .messages_by_peer(peer_key)?
            .into_iter()
            .filter(|m| !m.is_from_me())
            .map(|m| m.timestamp)
            .max();
        let Some(timestamp) = newest_remote else {
            return Ok(());
        };

        self.store.mark_opened(peer_key, timestamp)?;
        if let Err(e) = self
            .messenger
            .send(peer_key, &ChatPayload::Read { timestamp })
            .await
        {
            warn!(peer_key, timestamp, %e, "read receipt not sent");
        }
        Ok(())
    }
}

fn remote(
    from: &str,
    username: String,
    kind: MessageKind,
    body: String,
    attached_amount: Option<String>,
    timestamp: u64,
) -> ChatMessage {
    // Our own sentinel would flip the row's direction.
    let display_name = if username.is_empty() || username == LOCAL_DISPLAY_NAME {
        from.to_string()
    } else {
        username
    };
    ChatMessage {
        peer_key: from.to_string(),
        display_name,
        kind,
        body,
        attached_amount,
        state: MessageState::Delivered,
        timestamp,
    }
}
