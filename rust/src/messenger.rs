use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::ledger::PeerTransport;
use crate::payload::ChatPayload;

/// Encodes payloads and hands them to the peer transport under our application tag.
pub struct Messenger {
    transport: Arc<dyn PeerTransport>,
    application_tag: String,
}

impl Messenger {
    pub fn new(transport: Arc<dyn PeerTransport>, application_tag: impl Into<String>) -> Self {
        Self {
            transport,
            application_tag: application_tag.into(),
        }
    }

    pub fn application_tag(&self) -> &str {
        &self.application_tag
    }

    pub async fn send(&self, peer_key: &str, payload: &ChatPayload) -> Result<()> {
        let hex = payload.to_hex()?;
        debug!(peer_key, kind = payload.kind(), bytes = hex.len(), "sending payload");
        self.transport
            .send(peer_key, &self.application_tag, &hex)
            .await
    }
}
