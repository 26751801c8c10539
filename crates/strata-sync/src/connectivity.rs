use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

/// Single authoritative online/offline flag for a client session.
///
/// The platform feeds transitions in via `set_online`/`set_offline`; every
/// mutation path reads the flag synchronously to decide direct-call versus
/// queue-and-optimistic-write. Purely event-driven: no timers, debounce or
/// reachability probing. Offline transitions have no side effect beyond
/// flipping the flag; in-flight calls fail naturally and fall back to
/// queueing.
pub struct ConnectivityMonitor {
    online: AtomicBool,
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Initial state comes from the platform's current network state.
    pub fn new(initially_online: bool) -> Self {
        let (tx, _rx) = watch::channel(initially_online);
        Self {
            online: AtomicBool::new(initially_online),
            tx,
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Redundant calls (already online) notify nobody, so platform event
    /// storms cannot trigger drain storms.
    pub fn set_online(&self) {
        if !self.online.swap(true, Ordering::AcqRel) {
            tracing::info!("connection restored");
            self.tx.send_replace(true);
        }
    }

    pub fn set_offline(&self) {
        if self.online.swap(false, Ordering::AcqRel) {
            tracing::info!("connection lost");
            self.tx.send_replace(false);
        }
    }

    /// Channel of transitions; `SyncEngine::drain_on_reconnect` watches it
    /// to trigger an automatic drain on each offline-to-online transition.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
