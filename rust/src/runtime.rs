//! Drives the reconciler: an eager sweep at startup, a periodic sweep, and host events.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::ledger::ApprovalEvent;
use crate::reconcile::Reconciler;

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Approval(ApprovalEvent),
    /// Something affecting our balance settled; re-sweep.
    BalanceChanged,
}

pub struct ReconcilerRuntime {
    events: flume::Sender<HostEvent>,
    shutdown: watch::Sender<bool>,
    driver: JoinHandle<()>,
    sweeper: JoinHandle<()>,
}

impl ReconcilerRuntime {
    /// Must be called from inside a tokio runtime.
    pub fn spawn(reconciler: Arc<Reconciler>, sweep_interval: Duration) -> Self {
        let (events_tx, events_rx) = flume::unbounded::<HostEvent>();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        // One queued request at most: requests made while a sweep runs collapse into
        // a single rerun.
        let (sweep_tx, sweep_rx) = flume::bounded::<()>(1);

        let sweeper = tokio::spawn({
            let reconciler = reconciler.clone();
            async move {
                while sweep_rx.recv_async().await.is_ok() {
                    match reconciler.sweep().await {
                        Ok(report) => debug!(?report, "sweep done"),
                        Err(e) => error!(%e, "sweep failed"),
                    }
                }
                debug!("sweeper stopped");
            }
        });

        let driver = tokio::spawn(drive(
            reconciler,
            sweep_interval,
            events_rx,
            sweep_tx,
            shutdown_rx,
        ));

        info!(interval_secs = sweep_interval.as_secs(), "reconciler runtime started");
        Self {
            events: events_tx,
            shutdown: shutdown_tx,
            driver,
            sweeper,
        }
    }

    /// Sender for host events. Cheap to clone.
    pub fn events(&self) -> flume::Sender<HostEvent> {
        self.events.clone()
    }

    pub fn submit(&self, event: HostEvent) {
        if self.events.send(event).is_err() {
            warn!("reconciler runtime already stopped; event dropped");
        }
    }

    /// Stop ticking and wait for an in-flight sweep to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.driver.await {
            error!(%e, "reconciler driver panicked");
        }
        if let Err(e) = self.sweeper.await {
            error!(%e, "sweeper panicked");
        }
        info!("reconciler runtime stopped");
    }
}

fn request_sweep(sweep_tx: &flume::Sender<()>) {
    // Full means a rerun is already queued.
    let _ = sweep_tx.try_send(());
}

async fn drive(
    reconciler: Arc<Reconciler>,
    period: Duration,
    events: flume::Receiver<HostEvent>,
    sweep_tx: flume::Sender<()>,
    mut shutdown: watch::Receiver<bool>,
) {
    request_sweep(&sweep_tx);

    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => request_sweep(&sweep_tx),
            event = events.recv_async() => match event {
                Ok(HostEvent::Approval(approval)) => {
                    let reconciler = reconciler.clone();
                    tokio::spawn(async move {
                        let request_id = approval.request_id.clone();
                        if let Err(e) = reconciler.handle_approval(approval).await {
                            error!(%request_id, %e, "approval handling failed");
                        }
                    });
                }
                Ok(HostEvent::BalanceChanged) => {
                    debug!("balance changed");
                    request_sweep(&sweep_tx);
                }
                Err(_) => break,
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    debug!("reconciler driver stopped");
}
