//! Periodic sweep that keeps idle streams alive and evicts dead ones.

use crate::manager::Manager;
use crate::message::HEARTBEAT_FRAME;
use log::*;
use std::sync::{Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Period used when none is configured.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

struct SweeperTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Slot for the single background sweeper task.
#[derive(Default)]
pub struct Heartbeat {
    task: Mutex<Option<SweeperTask>>,
}

impl Heartbeat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn the sweeper, cancelling any sweeper started earlier.
    ///
    /// The task only holds a weak reference to the manager, so it never keeps
    /// the manager (or the process) alive by itself.
    pub(crate) fn start(&self, manager: Weak<Manager>, period: Duration) {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            debug!("Cancelling previously running heartbeat sweeper");
            previous.cancel.cancel();
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(manager, period, cancel.clone()));
        *slot = Some(SweeperTask { cancel, handle });

        info!("Heartbeat sweeper started with a {}s period", period.as_secs_f64());
    }

    /// Cancel the sweeper. Returns whether one was running.
    pub(crate) fn stop(&self) -> bool {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match task {
            Some(task) => {
                task.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(manager: Weak<Manager>, period: Duration, cancel: CancellationToken) {
    // First tick lands one full period after start.
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Heartbeat sweeper shutting down");
                break;
            }
            _ = interval.tick() => {
                let Some(manager) = manager.upgrade() else {
                    debug!("SSE manager dropped, heartbeat sweeper exiting");
                    break;
                };
                sweep(&manager).await;
            }
        }
    }
}

/// One heartbeat pass over a snapshot of the registry.
///
/// Closed handles are evicted; open ones get a comment frame and are evicted
/// if that write fails. Evictions are keyed on the connection id, so a handle
/// replaced while the sweep runs is left alone.
pub(crate) async fn sweep(manager: &Manager) {
    let connections = manager.registry().snapshot();
    debug!("Heartbeat check - clients count: {}", connections.len());

    for (user_id, connection) in connections {
        if connection.handle.is_closed() {
            info!("Client for user {user_id} disconnected, removing from pool");
            manager
                .unregister_connection(&user_id, &connection.connection_id)
                .await;
            continue;
        }

        if let Err(e) = connection.handle.write(HEARTBEAT_FRAME) {
            error!("Error writing heartbeat to user {user_id}: {e}");
            manager
                .unregister_connection(&user_id, &connection.connection_id)
                .await;
        }
    }
}
