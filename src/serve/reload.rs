//! Live-reload fan-out to connected browsers

use crate::core::ReloadKind;
use tokio::sync::broadcast;
use tracing::debug;

/// Broadcasts reload signals to every connected browser
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadKind>,
}

impl ReloadHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadKind> {
        self.sender.subscribe()
    }

    /// Number of connected browsers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Send a signal; returns how many browsers were notified.
    /// `ReloadKind::None` is never sent.
    pub fn notify(&self, kind: ReloadKind) -> usize {
        if kind == ReloadKind::None {
            return 0;
        }

        // An error only means nobody is connected
        let delivered = self.sender.send(kind).unwrap_or(0);
        debug!("Reload {:?} sent to {} clients", kind, delivered);
        delivered
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new(16)
    }
}

/// Wire form of a reload signal
pub fn reload_message(kind: ReloadKind) -> &'static str {
    match kind {
        ReloadKind::None => "none",
        ReloadKind::Css => "css",
        ReloadKind::Full => "full",
    }
}
