//! Run state shared between the polling loop, stop handles and the signal listener.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use vkbot_core::{BotError, Result};

/// `Idle → Starting → Running → Stopping → Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifecycle::Idle => "idle",
            Lifecycle::Starting => "starting",
            Lifecycle::Running => "running",
            Lifecycle::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// One token per run; `None` while idle.
pub(crate) struct Control {
    token: Mutex<Option<CancellationToken>>,
    lifecycle: watch::Sender<Lifecycle>,
}

impl Control {
    pub(crate) fn new() -> Arc<Self> {
        let (lifecycle, _) = watch::channel(Lifecycle::Idle);
        Arc::new(Self {
            token: Mutex::new(None),
            lifecycle,
        })
    }

    fn token_slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.borrow()
    }

    /// Moves Idle → Starting and hands out a fresh token, or rejects a second run.
    pub(crate) fn begin(&self) -> Result<CancellationToken> {
        let mut slot = self.token_slot();
        let started = self.lifecycle.send_if_modified(|state| {
            if *state == Lifecycle::Idle {
                *state = Lifecycle::Starting;
                true
            } else {
                false
            }
        });
        if !started {
            return Err(BotError::AlreadyRunning);
        }
        let token = CancellationToken::new();
        *slot = Some(token.clone());
        Ok(token)
    }

    /// Starting → Running, unless a stop already arrived.
    pub(crate) fn mark_running(&self) {
        self.lifecycle.send_if_modified(|state| {
            if *state == Lifecycle::Starting {
                *state = Lifecycle::Running;
                true
            } else {
                false
            }
        });
    }

    /// Cancels the current run. No-op while idle or already stopping.
    pub(crate) fn request_stop(&self) {
        let slot = self.token_slot();
        let Some(token) = slot.as_ref() else {
            debug!("Stop requested while idle, ignoring");
            return;
        };
        let changed = self.lifecycle.send_if_modified(|state| match state {
            Lifecycle::Starting | Lifecycle::Running => {
                *state = Lifecycle::Stopping;
                true
            }
            _ => false,
        });
        if changed {
            info!("step: stop requested");
        }
        token.cancel();
    }

    /// Drops the run's token and releases `wait_idle` callers.
    pub(crate) fn finish(&self) {
        let mut slot = self.token_slot();
        *slot = None;
        self.lifecycle.send_replace(Lifecycle::Idle);
    }
}

/// Cloneable handle for stopping a dispatcher from another task.
#[derive(Clone)]
pub struct StopHandle {
    control: Arc<Control>,
}

impl StopHandle {
    pub(crate) fn new(control: Arc<Control>) -> Self {
        Self { control }
    }

    /// Requests a stop; idempotent, and a no-op when the dispatcher is idle.
    pub fn stop(&self) {
        self.control.request_stop();
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.control.lifecycle()
    }

    /// Resolves once the dispatcher is idle (immediately if it already is).
    pub async fn wait_idle(&self) {
        let mut rx = self.control.lifecycle.subscribe();
        // The sender lives in `control`, which this handle keeps alive.
        let _ = rx.wait_for(|state| *state == Lifecycle::Idle).await;
    }
}
