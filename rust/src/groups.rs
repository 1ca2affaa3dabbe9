//! Group message relay.
//!
//! Groups have no server: a message is stored locally and fanned out to every member
//! one by one over the peer transport. Members acknowledge what they receive, and a
//! member that was offline can ask the others for history since a timestamp.

use std::sync::Arc;

use charmchat_storage_traits::groups::types::{Group, GroupMember, GroupMessage};
use charmchat_storage_traits::messages::types::MessageState;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::messenger::Messenger;
use crate::payload::{ChatPayload, SyncedGroupMessage};
use crate::store::ChatStore;

pub struct GroupRelay {
    store: Arc<ChatStore>,
    messenger: Arc<Messenger>,
    clock: Arc<dyn Clock>,
    my_key: String,
    my_name: String,
}

impl GroupRelay {
    pub fn new(
        store: Arc<ChatStore>,
        messenger: Arc<Messenger>,
        clock: Arc<dyn Clock>,
        my_key: impl Into<String>,
        my_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            messenger,
            clock,
            my_key: my_key.into(),
            my_name: my_name.into(),
        }
    }

    /// Create a group with ourselves and `members` (`(key, display_name)` pairs).
    pub fn create_group(&self, name: &str, members: &[(String, String)]) -> Result<Group> {
        let now = self.clock.now_ms();
        let group = Group {
            group_id: uuid::Uuid::new_v4().simple().to_string(),
            name: name.to_string(),
            creator_key: self.my_key.clone(),
            created_at: now,
        };
        self.store.save_group(group.clone())?;
        self.add_member(&group.group_id, &self.my_key, &self.my_name)?;
        for (key, display_name) in members {
            self.add_member(&group.group_id, key, display_name)?;
        }
        info!(group_id = %group.group_id, members = members.len(), "group created");
        Ok(group)
    }

    pub fn add_member(&self, group_id: &str, member_key: &str, display_name: &str) -> Result<()> {
        self.store.save_member(GroupMember {
            group_id: group_id.to_string(),
            member_key: member_key.to_string(),
            display_name: display_name.to_string(),
            joined_at: self.clock.now_ms(),
        })
    }

    pub fn remove_member(&self, group_id: &str, member_key: &str) -> Result<bool> {
        self.store.remove_member(group_id, member_key)
    }

    pub fn members(&self, group_id: &str) -> Result<Vec<GroupMember>> {
        self.store.members(group_id)
    }

    /// Store the message as sent and fan it out. Returns its timestamp.
    pub async fn send_group_message(&self, group_id: &str, body: &str) -> Result<u64> {
        let group = self.require_group(group_id)?;

        let mut timestamp = self.clock.now_ms();
        loop {
            let inserted = self.store.insert_group_message(GroupMessage {
                group_id: group_id.to_string(),
                sender_key: self.my_key.clone(),
                sender_name: self.my_name.clone(),
                timestamp,
                body: body.to_string(),
                state: MessageState::Sent,
            })?;
            if inserted {
                break;
            }
            timestamp += 1;
        }

        let payload = ChatPayload::GroupMessage {
            group_id: group_id.to_string(),
            group_name: group.name,
            sender_name: self.my_name.clone(),
            timestamp,
            body: body.to_string(),
        };
        let recipients = self.other_members(group_id)?;
        for member in &recipients {
            if let Err(e) = self.messenger.send(&member.member_key, &payload).await {
                warn!(group_id, peer_key = %member.member_key, %e, "group message not sent");
            }
        }
        debug!(group_id, timestamp, recipients = recipients.len(), "group message fanned out");
        Ok(timestamp)
    }

    /// Store a group message from `from`, creating the group on first contact.
    ///
    /// Once the group is known only members are heard; anyone else is dropped without
    /// an ack. Returns `false` for a duplicate or a dropped message.
    pub async fn handle_group_message(
        &self,
        from: &str,
        group_id: &str,
        group_name: &str,
        sender_name: &str,
        timestamp: u64,
        body: String,
    ) -> Result<bool> {
        if self.store.find_group(group_id)?.is_none() {
            self.store.save_group(Group {
                group_id: group_id.to_string(),
                name: group_name.to_string(),
                creator_key: from.to_string(),
                created_at: self.clock.now_ms(),
            })?;
            self.add_member(group_id, &self.my_key, &self.my_name)?;
            self.add_member(group_id, from, sender_name)?;
            info!(group_id, peer_key = from, "joined group on first message");
        } else if !self.is_member(group_id, from)? {
            debug!(group_id, peer_key = from, "group message from non-member dropped");
            return Ok(false);
        }

        let inserted = self.store.insert_group_message(GroupMessage {
            group_id: group_id.to_string(),
            sender_key: from.to_string(),
            sender_name: sender_name.to_string(),
            timestamp,
            body,
            state: MessageState::Delivered,
        })?;

        let ack = ChatPayload::GroupAck {
            group_id: group_id.to_string(),
            timestamp,
        };
        if let Err(e) = self.messenger.send(from, &ack).await {
            warn!(group_id, peer_key = from, %e, "group ack not sent");
        }
        Ok(inserted)
    }

    /// Mark our message at `timestamp` delivered. Returns whether it moved.
    pub fn handle_group_ack(&self, from: &str, group_id: &str, timestamp: u64) -> Result<bool> {
        let current = self
            .store
            .group_messages_since(group_id, timestamp.saturating_sub(1))?
            .into_iter()
            .find(|m| m.timestamp == timestamp && m.sender_key == self.my_key);
        match current {
            Some(message) if message.state.accepts_receipt(MessageState::Delivered) => self
                .store
                .update_group_message_state(
                    group_id,
                    timestamp,
                    &self.my_key,
                    MessageState::Delivered,
                ),
            Some(_) => Ok(false),
            None => {
                debug!(group_id, peer_key = from, timestamp, "ack for unknown group message");
                Ok(false)
            }
        }
    }

    /// Ask every other member for messages after `since`. Returns how many were asked.
    pub async fn request_history(&self, group_id: &str, since: u64) -> Result<usize> {
        let request = ChatPayload::GroupSyncRequest {
            group_id: group_id.to_string(),
            since,
        };
        let mut asked = 0;
        for member in self.other_members(group_id)? {
            match self.messenger.send(&member.member_key, &request).await {
                Ok(()) => asked += 1,
                Err(e) => warn!(group_id, peer_key = %member.member_key, %e, "sync request not sent"),
            }
        }
        Ok(asked)
    }

    /// Answer a member's history request. Requests from non-members are ignored.
    pub async fn handle_sync_request(&self, from: &str, group_id: &str, since: u64) -> Result<()> {
        if !self.is_member(group_id, from)? {
            debug!(group_id, peer_key = from, "sync request from non-member ignored");
            return Ok(());
        }
        let messages = self
            .store
            .group_messages_since(group_id, since)?
            .into_iter()
            .map(|m| SyncedGroupMessage {
                sender_key: m.sender_key,
                sender_name: m.sender_name,
                timestamp: m.timestamp,
                body: m.body,
            })
            .collect();
        self.messenger
            .send(
                from,
                &ChatPayload::GroupSyncResponse {
                    group_id: group_id.to_string(),
                    messages,
                },
            )
            .await
    }

    /// Merge a history reply from a member. Returns how many messages were new.
    ///
    /// Entries claiming to come from us are skipped: only we write our own messages.
    pub fn handle_sync_response(
        &self,
        from: &str,
        group_id: &str,
        messages: Vec<SyncedGroupMessage>,
    ) -> Result<usize> {
        if self.store.find_group(group_id)?.is_none() {
            debug!(group_id, peer_key = from, "sync response for unknown group");
            return Ok(0);
        }
        if !self.is_member(group_id, from)? {
            debug!(group_id, peer_key = from, "sync response from non-member ignored");
            return Ok(0);
        }
        let mut merged = 0;
        for synced in messages {
            if synced.sender_key == self.my_key {
                continue;
            }
            let inserted = self.store.insert_group_message(GroupMessage {
                group_id: group_id.to_string(),
                sender_key: synced.sender_key,
                sender_name: synced.sender_name,
                timestamp: synced.timestamp,
                body: synced.body,
                state: MessageState::Delivered,
            })?;
            if inserted {
                merged += 1;
            }
        }
        debug!(group_id, peer_key = from, merged, "group history merged");
        Ok(merged)
    }

    fn require_group(&self, group_id: &str) -> Result<Group> {
        self.store
            .find_group(group_id)?
            .ok_or_else(|| Error::Storage(format!("unknown group {group_id}")))
    }

    fn is_member(&self, group_id: &str, key: &str) -> Result<bool> {
        Ok(self
            .store
            .members(group_id)?
            .iter()
            .any(|m| m.member_key == key))
    }

    fn other_members(&self, group_id: &str) -> Result<Vec<GroupMember>> {
        Ok(self
            .store
            .members(group_id)?
            .into_iter()
            .filter(|m| m.member_key != self.my_key)
            .collect())
    }
}
