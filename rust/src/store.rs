//! Message Store and Transaction Ledger facade.
//!
//! Wraps the storage provider and emits a dispatcher event after every successful
//! state-changing call, so callers never have to remember to notify the UI.

use std::sync::Arc;

use charmchat_storage_traits::conversations::types::{ConversationFlag, ConversationFlags};
use charmchat_storage_traits::conversations::ConversationStorage;
use charmchat_storage_traits::groups::types::{Group, GroupMember, GroupMessage};
use charmchat_storage_traits::groups::GroupStorage;
use charmchat_storage_traits::messages::types::{ChatMessage, ConversationSummary, MessageState};
use charmchat_storage_traits::messages::MessageStorage;
use charmchat_storage_traits::transfers::types::{
    AttemptId, NewTransferAttempt, TransferAttempt, TransferStatus,
};
use charmchat_storage_traits::transfers::TransferStorage;
use charmchat_storage_traits::ChatStorageProvider;

use crate::dispatcher::{ChatEvent, Dispatcher};
use crate::error::Result;

pub struct ChatStore {
    storage: Arc<dyn ChatStorageProvider>,
    dispatcher: Arc<Dispatcher>,
}

impl ChatStore {
    pub fn new(storage: Arc<dyn ChatStorageProvider>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            storage,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    // --- messages ---

    pub fn insert_message(&self, message: ChatMessage) -> Result<()> {
        let event = ChatEvent::MessageChanged {
            peer_key: message.peer_key.clone(),
            timestamp: message.timestamp,
        };
        self.storage.insert_message(message)?;
        self.dispatcher.emit(event);
        Ok(())
    }

    pub fn find_message(&self, peer_key: &str, timestamp: u64) -> Result<Option<ChatMessage>> {
        Ok(self.storage.find_message(peer_key, timestamp)?)
    }

    /// Update a message's state, optionally re-keying it to `new_timestamp`.
    pub fn update_message_state(
        &self,
        peer_key: &str,
        timestamp: u64,
        state: MessageState,
        new_timestamp: Option<u64>,
    ) -> Result<()> {
        self.storage
            .update_message_state(peer_key, timestamp, state, new_timestamp)?;
        self.dispatcher.emit(ChatEvent::MessageChanged {
            peer_key: peer_key.to_string(),
            timestamp: new_timestamp.unwrap_or(timestamp),
        });
        Ok(())
    }

    pub fn messages_by_peer(&self, peer_key: &str) -> Result<Vec<ChatMessage>> {
        Ok(self.storage.messages_by_peer(peer_key)?)
    }

    pub fn pending_messages(&self) -> Result<Vec<ChatMessage>> {
        Ok(self.storage.pending_messages()?)
    }

    pub fn recent_by_peer(&self) -> Result<Vec<ConversationSummary>> {
        Ok(self.storage.recent_by_peer()?)
    }

    pub fn delete_conversation(&self, peer_key: &str) -> Result<usize> {
        let removed = self.storage.delete_messages_for_peer(peer_key)?;
        self.dispatcher.emit(ChatEvent::ConversationCleared {
            peer_key: peer_key.to_string(),
        });
        Ok(removed)
    }

    /// Insert an outgoing message at the first send time no other row uses, on any
    /// peer. Returns the timestamp it landed on.
    pub fn reserve_message(&self, message: ChatMessage) -> Result<u64> {
        let peer_key = message.peer_key.clone();
        let timestamp = self.storage.reserve_message(message)?;
        self.dispatcher
            .emit(ChatEvent::MessageChanged { peer_key, timestamp });
        Ok(timestamp)
    }

    // --- transfer ledger ---

    pub fn insert_attempt(&self, attempt: NewTransferAttempt) -> Result<TransferAttempt> {
        Ok(self.storage.insert_attempt(attempt)?)
    }

    pub fn find_attempt(&self, id: AttemptId) -> Result<Option<TransferAttempt>> {
        Ok(self.storage.find_attempt(id)?)
    }

    /// Compare-and-set from pending. `true` only for the caller that moved the row.
    pub fn transition_attempt(
        &self,
        id: AttemptId,
        status: TransferStatus,
        confirmed_at: Option<u64>,
        now: u64,
    ) -> Result<bool> {
        Ok(self.storage.update_status(id, status, confirmed_at, now)?)
    }

    pub fn fill_in_chain_tx_id(&self, approval_request_id: &str, chain_tx_id: &str) -> Result<bool> {
        Ok(self
            .storage
            .fill_in_chain_tx_id(approval_request_id, chain_tx_id)?)
    }

    pub fn fill_in_chain_tx_id_by_id(&self, id: AttemptId, chain_tx_id: &str) -> Result<bool> {
        Ok(self.storage.fill_in_chain_tx_id_by_id(id, chain_tx_id)?)
    }

    pub fn find_by_message(&self, peer_key: &str, timestamp: u64) -> Result<Option<TransferAttempt>> {
        Ok(self.storage.find_by_message(peer_key, timestamp)?)
    }

    pub fn find_by_approval_request_id(&self, request_id: &str) -> Result<Option<TransferAttempt>> {
        Ok(self.storage.find_by_approval_request_id(request_id)?)
    }

    pub fn find_by_chain_tx_id(&self, chain_tx_id: &str) -> Result<Option<TransferAttempt>> {
        Ok(self.storage.find_by_chain_tx_id(chain_tx_id)?)
    }

    pub fn list_pending_attempts(&self) -> Result<Vec<TransferAttempt>> {
        Ok(self.storage.list_pending()?)
    }

    // --- conversations ---

    pub fn conversation_flags(&self, peer_key: &str) -> Result<ConversationFlags> {
        Ok(self.storage.conversation_flags(peer_key)?)
    }

    pub fn set_muted(&self, peer_key: &str, muted: bool) -> Result<()> {
        self.storage
            .set_conversation_flag(peer_key, ConversationFlag::Muted, muted)?;
        self.dispatcher.emit(ChatEvent::MuteChanged {
            peer_key: peer_key.to_string(),
            muted,
        });
        Ok(())
    }

    pub fn set_archived(&self, peer_key: &str, archived: bool) -> Result<()> {
        self.storage
            .set_conversation_flag(peer_key, ConversationFlag::Archived, archived)?;
        self.dispatcher.emit(ChatEvent::ArchiveChanged {
            peer_key: peer_key.to_string(),
            archived,
        });
        Ok(())
    }

    pub fn set_favorite(&self, peer_key: &str, favorite: bool) -> Result<()> {
        self.storage
            .set_conversation_flag(peer_key, ConversationFlag::Favorite, favorite)?;
        self.dispatcher.emit(ChatEvent::FavoriteChanged {
            peer_key: peer_key.to_string(),
            favorite,
        });
        Ok(())
    }

    /// Moves the last-opened marker; unread counts change, so message-changed fires.
    pub fn mark_opened(&self, peer_key: &str, timestamp: u64) -> Result<()> {
        self.storage.mark_opened(peer_key, timestamp)?;
        self.dispatcher.emit(ChatEvent::MessageChanged {
            peer_key: peer_key.to_string(),
            timestamp,
        });
        Ok(())
    }

    // --- groups ---

    pub fn save_group(&self, group: Group) -> Result<()> {
        let group_id = group.group_id.clone();
        self.storage.save_group(group)?;
        self.emit_group_changed(&group_id);
        Ok(())
    }

    pub fn find_group(&self, group_id: &str) -> Result<Option<Group>> {
        Ok(self.storage.find_group(group_id)?)
    }

    pub fn all_groups(&self) -> Result<Vec<Group>> {
        Ok(self.storage.all_groups()?)
    }

    pub fn delete_group(&self, group_id: &str) -> Result<()> {
        self.storage.delete_group(group_id)?;
        self.emit_group_changed(group_id);
        Ok(())
    }

    pub fn save_member(&self, member: GroupMember) -> Result<()> {
        let group_id = member.group_id.clone();
        self.storage.save_member(member)?;
        self.emit_group_changed(&group_id);
        Ok(())
    }

    pub fn remove_member(&self, group_id: &str, member_key: &str) -> Result<bool> {
        let removed = self.storage.remove_member(group_id, member_key)?;
        if removed {
            self.emit_group_changed(group_id);
        }
        Ok(removed)
    }

    pub fn members(&self, group_id: &str) -> Result<Vec<GroupMember>> {
        Ok(self.storage.members(group_id)?)
    }

    /// Returns `false` for a duplicate, which emits nothing.
    pub fn insert_group_message(&self, message: GroupMessage) -> Result<bool> {
        let group_id = message.group_id.clone();
        let inserted = self.storage.insert_group_message(message)?;
        if inserted {
            self.emit_group_changed(&group_id);
        }
        Ok(inserted)
    }

    pub fn update_group_message_state(
        &self,
        group_id: &str,
        timestamp: u64,
        sender_key: &str,
        state: MessageState,
    ) -> Result<bool> {
        let changed = self
            .storage
            .update_group_message_state(group_id, timestamp, sender_key, state)?;
        if changed {
            self.emit_group_changed(group_id);
        }
        Ok(changed)
    }

    pub fn group_messages_since(&self, group_id: &str, since: u64) -> Result<Vec<GroupMessage>> {
        Ok(self.storage.group_messages_since(group_id, since)?)
    }

    fn emit_group_changed(&self, group_id: &str) {
        self.dispatcher.emit(ChatEvent::GroupChanged {
            group_id: group_id.to_string(),
        });
    }
}
