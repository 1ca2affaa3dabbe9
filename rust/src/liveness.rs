//! Ping/pong peer liveness probe. The only operation in the core with a timeout.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::Result;
use crate::messenger::Messenger;
use crate::payload::ChatPayload;

pub struct Liveness {
    messenger: Arc<Messenger>,
    waiters: Mutex<HashMap<String, oneshot::Sender<()>>>,
}

impl Liveness {
    pub fn new(messenger: Arc<Messenger>) -> Self {
        Self {
            messenger,
            waiters: Mutex::new(HashMap::new()),
        }
    }

    /// `true` when the peer answers before `timeout`. Transport errors count as offline.
    pub async fn ping(&self, peer_key: &str, timeout: Duration) -> bool {
        let nonce = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.lock_waiters().insert(nonce.clone(), tx);

        let online = match self
            .messenger
            .send(peer_key, &ChatPayload::Ping { nonce: nonce.clone() })
            .await
        {
            Ok(()) => matches!(tokio::time::timeout(timeout, rx).await, Ok(Ok(()))),
            Err(e) => {
                warn!(peer_key, %e, "ping not sent");
                false
            }
        };

        self.lock_waiters().remove(&nonce);
        debug!(peer_key, online, "ping finished");
        online
    }

    pub async fn handle_ping(&self, from: &str, nonce: String) -> Result<()> {
        self.messenger
            .send(from, &ChatPayload::Pong { nonce })
            .await
    }

    /// Returns whether the pong matched an outstanding ping.
    pub fn handle_pong(&self, from: &str, nonce: &str) -> bool {
        match self.lock_waiters().remove(nonce) {
            Some(waiter) => waiter.send(()).is_ok(),
            None => {
                debug!(peer_key = from, nonce, "unsolicited pong");
                false
            }
        }
    }

    fn lock_waiters(&self) -> std::sync::MutexGuard<'_, HashMap<String, oneshot::Sender<()>>> {
        self.waiters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::ledger::PeerTransport;

    /// Answers every ping by feeding the pong straight back into the probe.
    struct Echo(Mutex<Option<Arc<Liveness>>>);

    #[async_trait]
    impl PeerTransport for Echo {
        async fn send(&self, peer_key: &str, _tag: &str, hex_payload: &str) -> Result<()> {
            if let ChatPayload::Ping { nonce } = ChatPayload::from_hex(hex_payload)? {
                let liveness = self.0.lock().unwrap().clone();
                if let Some(liveness) = liveness {
                    liveness.handle_pong(peer_key, &nonce);
                }
            }
            Ok(())
        }
    }

    struct Silent;

    #[async_trait]
    impl PeerTransport for Silent {
        async fn send(&self, _peer_key: &str, _tag: &str, _hex_payload: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn answered_ping_is_online() {
        let echo = Arc::new(Echo(Mutex::new(None)));
        let liveness = Arc::new(Liveness::new(Arc::new(Messenger::new(
            echo.clone(),
            "charmchat",
        ))));
        *echo.0.lock().unwrap() = Some(liveness.clone());

        assert!(liveness.ping("0xP", Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn silent_peer_times_out() {
        let liveness = Liveness::new(Arc::new(Messenger::new(Arc::new(Silent), "charmchat")));
        assert!(!liveness.ping("0xP", Duration::from_millis(50)).await);
        assert!(!liveness.handle_pong("0xP", "late"));
    }
}
