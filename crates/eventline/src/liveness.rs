//! Heartbeat liveness monitoring.
//!
//! A connected bridge (version 4.0.2 and later) pings the client
//! periodically. The monitor watches the gap since the last heartbeat on
//! its own timer task; once the gap exceeds the configured timeout it
//! signals the supervisor, which drops the connection exactly as if the
//! transport had closed unexpectedly. This is the only path that detects
//! a half-open connection the socket never reports as dead.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use eventline_session::ClientSession;

/// A running liveness monitor, owned by the connection epoch that
/// started it. Cancelled and joined on every teardown.
pub(crate) struct LivenessMonitor {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl LivenessMonitor {
    /// Starts monitoring `session` with the given heartbeat timeout.
    ///
    /// On expiry, one unit is sent on `expired` and the task exits; the
    /// session's heartbeat clock is sampled fresh on every tick.
    pub(crate) fn start(
        session: Arc<Mutex<Option<ClientSession>>>,
        timeout: Duration,
        expired: mpsc::Sender<()>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(timeout);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; the check starts one
            // full interval in.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = ticker.tick() => {
                        let elapsed = session.lock().as_ref().map(ClientSession::heartbeat_elapsed);
                        match elapsed {
                            Some(elapsed) if elapsed > timeout => {
                                tracing::warn!(
                                    elapsed_ms = elapsed.as_millis() as u64,
                                    timeout_ms = timeout.as_millis() as u64,
                                    "no heartbeat received, connection may be dead"
                                );
                                let _ = expired.try_send(());
                                return;
                            }
                            Some(_) => {}
                            // Session already cleared; teardown is under way.
                            None => return,
                        }
                    }
                }
            }
        });

        Self { cancel, task }
    }

    /// Stops the monitor and waits for its task to finish.
    pub(crate) async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}
