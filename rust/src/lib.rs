//! CharmChat messaging core.
//!
//! Peer-to-peer chat with value transfers attached to messages. A transfer is recorded
//! as a pending chat message plus a ledger attempt; the [`reconcile`] engine later
//! confirms or rejects it from host approval events, chain lookups and balance signals,
//! and only then tells the peer about it.

pub mod clock;
pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod groups;
pub mod inbox;
pub mod ledger;
pub mod liveness;
pub mod logging;
pub mod messenger;
pub mod normalize;
pub mod orchestrator;
pub mod payload;
pub mod reconcile;
pub mod runtime;
pub mod store;

use std::path::Path;
use std::sync::Arc;

use charmchat_sqlite_storage::ChatSqliteStorage;
use charmchat_storage_traits::messages::types::MessageState;
use charmchat_storage_traits::ChatStorageProvider;
use tracing::{debug, warn};

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::{default_config_json, load_app_config, AppConfig};
pub use crate::dispatcher::{ChatEvent, Dispatcher, EventClass, SubscriptionId};
pub use crate::error::{Error, Result};
pub use crate::ledger::{
    ApprovalEvent, ChainTransaction, InboundMessage, Ledger, PeerTransport, SendRequest,
    TrackingTag, TransactionLookup,
};
pub use crate::orchestrator::{SendOrchestrator, SendOutcome, SendReceipt, TransferRequest};
pub use crate::payload::ChatPayload;
pub use crate::reconcile::{Reconciler, ReconcilerSettings, Resolution, Signal, SweepReport};
pub use crate::runtime::{HostEvent, ReconcilerRuntime};
pub use crate::store::ChatStore;

/// Database file created under the data directory by [`ChatCore::open`].
pub const DATABASE_FILE_NAME: &str = "charmchat.sqlite3";

/// Every component, wired once at startup.
pub struct ChatCore {
    config: AppConfig,
    store: Arc<ChatStore>,
    messenger: Arc<messenger::Messenger>,
    orchestrator: Arc<SendOrchestrator>,
    reconciler: Arc<Reconciler>,
    inbox: inbox::Inbox,
    liveness: liveness::Liveness,
    groups: groups::GroupRelay,
}

impl ChatCore {
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn ChatStorageProvider>,
        ledger: Arc<dyn Ledger>,
        transport: Arc<dyn PeerTransport>,
        my_key: &str,
    ) -> Self {
        Self::with_clock(config, storage, ledger, transport, Arc::new(SystemClock), my_key)
    }

    pub fn with_clock(
        config: AppConfig,
        storage: Arc<dyn ChatStorageProvider>,
        ledger: Arc<dyn Ledger>,
        transport: Arc<dyn PeerTransport>,
        clock: Arc<dyn Clock>,
        my_key: &str,
    ) -> Self {
        let store = Arc::new(ChatStore::new(storage, Arc::new(Dispatcher::new())));
        let messenger = Arc::new(messenger::Messenger::new(
            transport,
            config.application_tag.clone(),
        ));
        let orchestrator = Arc::new(SendOrchestrator::new(
            store.clone(),
            ledger.clone(),
            messenger.clone(),
            clock.clone(),
            config.my_display_name.clone(),
        ));
        let reconciler = Arc::new(Reconciler::new(
            store.clone(),
            ledger,
            orchestrator.clone(),
            clock.clone(),
            ReconcilerSettings::from(&config),
        ));
        let inbox = inbox::Inbox::new(store.clone(), messenger.clone());
        let liveness = liveness::Liveness::new(messenger.clone());
        let groups = groups::GroupRelay::new(
            store.clone(),
            messenger.clone(),
            clock,
            my_key,
            config.my_display_name.clone(),
        );

        Self {
            config,
            store,
            messenger,
            orchestrator,
            reconciler,
            inbox,
            liveness,
            groups,
        }
    }

    /// Open (or create) the SQLite database and config under `data_dir`.
    pub fn open(
        data_dir: &str,
        ledger: Arc<dyn Ledger>,
        transport: Arc<dyn PeerTransport>,
        my_key: &str,
    ) -> Result<Self> {
        let config = load_app_config(data_dir);
        let path = Path::new(data_dir).join(DATABASE_FILE_NAME);
        let storage =
            ChatSqliteStorage::new(&path).map_err(|e| Error::Storage(e.to_string()))?;
        debug!(path = %path.display(), "chat database opened");
        Ok(Self::new(config, Arc::new(storage), ledger, transport, my_key))
    }

    /// Start the periodic sweep and the host event loop.
    pub fn spawn_runtime(&self) -> ReconcilerRuntime {
        ReconcilerRuntime::spawn(self.reconciler.clone(), self.config.sweep_interval())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ChatStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        self.store.dispatcher()
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    pub fn groups(&self) -> &groups::GroupRelay {
        &self.groups
    }

    pub async fn send_text(&self, peer_key: &str, text: &str) -> Result<u64> {
        self.orchestrator.send_text(peer_key, text).await
    }

    pub async fn send_value_transfer(&self, request: TransferRequest) -> Result<SendReceipt> {
        self.orchestrator.send_value_transfer(request).await
    }

    pub async fn mark_conversation_read(&self, peer_key: &str) -> Result<()> {
        self.inbox.mark_conversation_read(peer_key).await
    }

    pub async fn ping(&self, peer_key: &str) -> bool {
        self.liveness
            .ping(peer_key, self.config.ping_timeout())
            .await
    }

    /// Route one payload from the transport.
    ///
    /// Foreign application tags and undecodable payloads are dropped with a log line;
    /// peers are untrusted, so neither is an error for the caller.
    pub async fn handle_inbound(&self, inbound: InboundMessage) -> Result<()> {
        if inbound.application_tag != self.messenger.application_tag() {
            debug!(tag = %inbound.application_tag, "ignoring foreign application tag");
            return Ok(());
        }
        let payload = match ChatPayload::from_hex(&inbound.hex_payload) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(peer_key = %inbound.from, %e, "undecodable payload dropped");
                return Ok(());
            }
        };
        let from = inbound.from.as_str();
        debug!(peer_key = from, kind = payload.kind(), "inbound payload");

        match payload {
            chat @ (ChatPayload::Text { .. }
            | ChatPayload::Charm { .. }
            | ChatPayload::Token { .. }) => {
                self.inbox.handle_chat(from, chat).await?;
            }
            ChatPayload::Delivered { timestamp } => {
                self.inbox
                    .handle_receipt(from, timestamp, MessageState::Delivered)?;
            }
            ChatPayload::Read { timestamp } => {
                self.inbox.handle_receipt(from, timestamp, MessageState::Read)?;
            }
            ChatPayload::Ping { nonce } => self.liveness.handle_ping(from, nonce).await?,
            ChatPayload::Pong { nonce } => {
                self.liveness.handle_pong(from, &nonce);
            }
            ChatPayload::GroupMessage {
                group_id,
                group_name,
                sender_name,
                timestamp,
                body,
            } => {
                self.groups
                    .handle_group_message(from, &group_id, &group_name, &sender_name, timestamp, body)
                    .await?;
            }
            ChatPayload::GroupAck {
                group_id,
                timestamp,
            } => {
                self.groups.handle_group_ack(from, &group_id, timestamp)?;
            }
            ChatPayload::GroupSyncRequest { group_id, since } => {
                self.groups.handle_sync_request(from, &group_id, since).await?
            }
            ChatPayload::GroupSyncResponse { group_id, messages } => {
                self.groups
                    .handle_sync_response(from, &group_id, messages)?;
            }
        }
        Ok(())
    }
}
