//! STEAK callback-to-future bridge.
//!
//! Flow:
//! 1. Caller calls [`steak_channel`] to get a callback and a receiver
//! 2. Caller passes the callback to `submit()`
//! 3. The pipeline fires the callback once it has committed
//! 4. Caller awaits the receiver with its own timeout
//!
//! A timed-out wait means the outcome is unknown, not that the submission
//! failed: the pipeline may already have committed.

use crate::ports::SteakCallback;
use shared_types::Steak;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

/// Result of waiting for a STEAK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SteakOutcome {
    /// The pipeline delivered its STEAK.
    Ready(Steak),
    /// No STEAK arrived in time, or the submission ended without one.
    Unknown,
}

/// Receiving half of a STEAK callback.
#[derive(Debug)]
pub struct SteakReceiver {
    receiver: oneshot::Receiver<Steak>,
}

impl SteakReceiver {
    /// Wait up to `timeout` for the STEAK.
    pub async fn wait(self, timeout: Duration) -> SteakOutcome {
        match tokio::time::timeout(timeout, self.receiver).await {
            Ok(Ok(steak)) => SteakOutcome::Ready(steak),
            Ok(Err(_)) => {
                debug!("[ov-01] STEAK callback dropped without firing");
                SteakOutcome::Unknown
            }
            Err(_) => {
                debug!("[ov-01] Timed out after {:?} waiting for STEAK", timeout);
                SteakOutcome::Unknown
            }
        }
    }
}

/// Create a callback and the receiver that observes it.
pub fn steak_channel() -> (SteakCallback, SteakReceiver) {
    let (sender, receiver) = oneshot::channel();
    let callback: SteakCallback = Box::new(move |steak: &Steak| {
        // Receiver may already have given up.
        let _ = sender.send(steak.clone());
    });
    (callback, SteakReceiver { receiver })
}
