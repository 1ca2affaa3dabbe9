//! Typed pub/sub fan-out so UI code reacts to changes without polling the store.
//!
//! No ordering guarantee between subscribers. The same change may be emitted more than
//! once when a sweep and an event resolve the same row, so handlers must be idempotent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    MessageChanged,
    MuteChanged,
    ArchiveChanged,
    FavoriteChanged,
    GroupChanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// `timestamp` is the message's key after the change.
    MessageChanged { peer_key: String, timestamp: u64 },
    /// Every message with the peer was removed.
    ConversationCleared { peer_key: String },
    MuteChanged { peer_key: String, muted: bool },
    ArchiveChanged { peer_key: String, archived: bool },
    FavoriteChanged { peer_key: String, favorite: bool },
    GroupChanged { group_id: String },
}

impl ChatEvent {
    pub fn class(&self) -> EventClass {
        match self {
            ChatEvent::MessageChanged { .. } | ChatEvent::ConversationCleared { .. } => {
                EventClass::MessageChanged
            }
            ChatEvent::MuteChanged { .. } => EventClass::MuteChanged,
            ChatEvent::ArchiveChanged { .. } => EventClass::ArchiveChanged,
            ChatEvent::FavoriteChanged { .. } => EventClass::FavoriteChanged,
            ChatEvent::GroupChanged { .. } => EventClass::GroupChanged,
        }
    }
}

pub type Handler = Arc<dyn Fn(&ChatEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct Dispatcher {
    next_id: AtomicU64,
    handlers: RwLock<HashMap<EventClass, Vec<(SubscriptionId, Handler)>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, class: EventClass, handler: F) -> SubscriptionId
    where
        F: Fn(&ChatEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        handlers
            .entry(class)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Subscribe through a channel instead of a callback. The subscription lives until
    /// `unsubscribe` is called; events for a dropped receiver are discarded.
    pub fn subscribe_channel(
        &self,
        class: EventClass,
    ) -> (SubscriptionId, flume::Receiver<ChatEvent>) {
        let (tx, rx) = flume::unbounded();
        let id = self.subscribe(class, move |event| {
            let _ = tx.send(event.clone());
        });
        (id, rx)
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut removed = false;
        for list in handlers.values_mut() {
            let before = list.len();
            list.retain(|(sub, _)| *sub != id);
            removed |= list.len() != before;
        }
        removed
    }

    pub fn emit(&self, event: ChatEvent) {
        // Handlers run outside the lock so they may subscribe or unsubscribe.
        let targets: Vec<Handler> = {
            let handlers = self
                .handlers
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            handlers
                .get(&event.class())
                .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };
        tracing::trace!(?event, subscribers = targets.len(), "emit");
        for handler in targets {
            handler(&event);
        }
    }
}
