//! Driver spawns and manages the inbound event pump

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::bridge::StreamingBridge;
use crate::source::EventSource;

/// Handle to a spawned event pump
pub struct DriverHandle {
    /// Number of events handed to the bridge so far
    pub events: watch::Receiver<u64>,

    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,

    task: JoinHandle<()>,
}

impl DriverHandle {
    /// Cancel the pump and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.join().await;
    }

    /// Wait for the pump to exit on its own (source ended or failed).
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!("Event pump task failed: {}", e);
        }
    }

    /// Events processed so far.
    pub fn events_processed(&self) -> u64 {
        *self.events.borrow()
    }
}

/// Driver spawns the task that feeds peer events into a bridge
///
/// The task owns the [`EventSource`]; every event it yields is handed to
/// [`StreamingBridge::handle_event`] on the same task, so one source's
/// events are processed in delivery order.
pub struct Driver;

impl Driver {
    /// Spawn the event pump for `source`
    pub fn spawn<S>(source: S, bridge: Arc<StreamingBridge>) -> DriverHandle
    where
        S: EventSource,
    {
        let (events_tx, events_rx) = watch::channel(0);
        let cancel = CancellationToken::new();
        let cancel_pump = cancel.clone();

        let task = tokio::spawn(async move {
            Self::event_pump_task(source, bridge, events_tx, cancel_pump).await;
        });

        DriverHandle { events: events_rx, cancel, task }
    }

    /// Event pump task - reads events and drives the renewal engine
    async fn event_pump_task<S>(
        mut source: S,
        bridge: Arc<StreamingBridge>,
        events_tx: watch::Sender<u64>,
        cancel: CancellationToken,
    ) where
        S: EventSource,
    {
        info!("Event pump started");
        let mut event_count = 0u64;
        let mut error_count = 0u32;
        const MAX_ERRORS: u32 = 10;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Event pump cancelled");
                    break;
                }
                result = source.next_event() => result,
            };

            match result {
                Ok(Some(event)) => {
                    event_count += 1;
                    error_count = 0;

                    let outcome = bridge.handle_event(&event);
                    trace!(peer = %event.peer(), event = event_count, ?outcome, "Event handled");

                    events_tx.send_replace(event_count);
                }
                Ok(None) => {
                    info!("Event source ended after {} events", event_count);
                    break;
                }
                Err(e) => {
                    error_count += 1;
                    error!("Event source error ({}/{}): {}", error_count, MAX_ERRORS, e);

                    if error_count >= MAX_ERRORS {
                        error!("Too many event source errors, shutting down");
                        break;
                    }

                    // Exponential backoff: 50ms, 100ms, 200ms, ...
                    let backoff = std::time::Duration::from_millis(50 * (1 << error_count.min(5)));
                    debug!("Backing off for {:?}", backoff);
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        info!("Event pump ended (processed {} events)", event_count);
    }
}
