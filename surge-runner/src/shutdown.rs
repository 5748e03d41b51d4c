//! Run stop coordination
//!
//! The scheduler stops issuing iterations once a stop is requested and then
//! applies its graceful-stop window to whatever is still in flight.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

/// Why a run stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Ctrl-C or SIGINT
    Interrupted,
    /// Requested by the embedding program
    Requested,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Interrupted => write!(f, "interrupted"),
            StopReason::Requested => write!(f, "requested"),
        }
    }
}

/// Cloneable stop switch shared by the scheduler and signal handlers
#[derive(Debug, Clone)]
pub struct Shutdown {
    sender: Arc<watch::Sender<Option<StopReason>>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Request a stop. Only the first reason is kept.
    pub fn trigger(&self, reason: StopReason) {
        self.sender.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
    }

    pub fn reason(&self) -> Option<StopReason> {
        *self.sender.borrow()
    }

    pub fn is_triggered(&self) -> bool {
        self.reason().is_some()
    }

    /// Resolves once a stop has been requested
    pub async fn wait(&self) -> StopReason {
        let mut receiver = self.sender.subscribe();
        let reason = match receiver.wait_for(Option::is_some).await {
            Ok(reason) => (*reason).unwrap_or(StopReason::Requested),
            // The sender lives in `self`, so the channel cannot close while we wait
            Err(_) => StopReason::Requested,
        };
        reason
    }

    /// Trigger on Ctrl-C for the lifetime of the runtime
    pub fn listen_for_ctrl_c(&self) {
        let shutdown = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, no new iterations will start");
                shutdown.trigger(StopReason::Interrupted);
            }
        });
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
