//! Peer command surface
//!
//! The controller issues three kinds of configuration commands. It never
//! waits for them: a [`CommandSink`] must accept a command without blocking,
//! and whatever writes it to the link does so on its own schedule.
//!
//! ```text
//!   SessionRegistry ──▶ ChannelCommandSink ──mpsc──▶ CommandDispatcher ──▶ Transport
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::Result;
use crate::config::DispatcherConfig;
use crate::types::{PeerId, StreamingParams};

/// A configuration command for one peer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum PeerCommand {
    /// Set data streaming parameters (all zero stops streaming)
    StreamingConfig(StreamingParams),

    /// Turn closed-loop stabilization on or off
    Stabilization { enabled: bool },

    /// Set the indicator output intensity in `[0, 1]`
    Indicator { intensity: f32 },
}

/// Non-blocking sink for peer commands.
///
/// Implementations must return promptly; the registry calls them while it
/// holds the peer's entry lock.
pub trait CommandSink: Send + Sync {
    /// Queue a command for delivery. Failures are the sink's concern.
    fn dispatch(&self, peer: &PeerId, command: PeerCommand);

    fn send_streaming_config(&self, peer: &PeerId, params: StreamingParams) {
        self.dispatch(peer, PeerCommand::StreamingConfig(params));
    }

    fn send_stabilization(&self, peer: &PeerId, enabled: bool) {
        self.dispatch(peer, PeerCommand::Stabilization { enabled });
    }

    /// Out-of-range intensities are clamped into `[0, 1]`.
    fn send_indicator(&self, peer: &PeerId, intensity: f32) {
        let intensity = if intensity.is_nan() { 0.0 } else { intensity.clamp(0.0, 1.0) };
        self.dispatch(peer, PeerCommand::Indicator { intensity });
    }
}

/// A command addressed to a peer, as queued for the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundCommand {
    pub peer: PeerId,
    pub command: PeerCommand,
}

/// Command sink that queues onto an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelCommandSink {
    tx: mpsc::UnboundedSender<OutboundCommand>,
}

impl ChannelCommandSink {
    /// Create a sink and the receiver a [`CommandDispatcher`] drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Check if the receiving side is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl CommandSink for ChannelCommandSink {
    fn dispatch(&self, peer: &PeerId, command: PeerCommand) {
        trace!(peer = %peer, ?command, "Queueing peer command");
        if self.tx.send(OutboundCommand { peer: peer.clone(), command }).is_err() {
            warn!(peer = %peer, ?command, "Command dispatcher gone, dropping command");
        }
    }
}

/// Writes commands onto the physical link.
///
/// Encoding and framing live behind this trait.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    /// Deliver one command to a peer.
    async fn send_command(&mut self, peer: &PeerId, command: &PeerCommand) -> Result<()>;
}

/// Handle to a running dispatcher task
pub struct DispatcherHandle {
    /// Commands the transport accepted so far
    pub delivered: watch::Receiver<u64>,

    /// Cancellation token for stopping the task
    pub cancel: CancellationToken,

    task: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Stop the dispatcher and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.join().await;
    }

    /// Wait for the dispatcher to exit on its own.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!("Command dispatcher task failed: {}", e);
        }
    }

    /// Number of commands delivered so far.
    pub fn delivered_count(&self) -> u64 {
        *self.delivered.borrow()
    }
}

/// Drains queued commands into a [`Transport`].
///
/// Failed commands are logged and dropped; a lost renewal is covered by the
/// renewal margin or not at all. Failures are tracked per peer, so an
/// unreachable peer never holds back commands for the others.
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Spawn the dispatcher task.
    ///
    /// The task ends when every sender is dropped or when cancelled. A peer
    /// whose commands fail `max_consecutive_errors` times in a row is reported
    /// unreachable once; its later commands are still attempted.
    pub fn spawn<T>(
        rx: mpsc::UnboundedReceiver<OutboundCommand>,
        transport: T,
        config: DispatcherConfig,
    ) -> DispatcherHandle
    where
        T: Transport,
    {
        let (delivered_tx, delivered_rx) = watch::channel(0);
        let cancel = CancellationToken::new();
        let cancel_task = cancel.clone();

        let task = tokio::spawn(async move {
            Self::dispatch_task(rx, transport, config, delivered_tx, cancel_task).await;
        });

        DispatcherHandle { delivered: delivered_rx, cancel, task }
    }

    async fn dispatch_task<T>(
        mut rx: mpsc::UnboundedReceiver<OutboundCommand>,
        mut transport: T,
        config: DispatcherConfig,
        delivered_tx: watch::Sender<u64>,
        cancel: CancellationToken,
    ) where
        T: Transport,
    {
        info!("Command dispatcher started");
        let mut delivered = 0u64;
        let mut failures: HashMap<PeerId, u32> = HashMap::new();

        loop {
            let outbound = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Command dispatcher cancelled");
                    break;
                }
                outbound = rx.recv() => match outbound {
                    Some(outbound) => outbound,
                    None => {
                        debug!("All command senders dropped");
                        break;
                    }
                },
            };

            match transport.send_command(&outbound.peer, &outbound.command).await {
                Ok(()) => {
                    delivered += 1;
                    let limit = config.max_consecutive_errors;
                    if failures.remove(&outbound.peer).is_some_and(|count| count >= limit) {
                        info!(peer = %outbound.peer, "Peer reachable again");
                    }
                    trace!(peer = %outbound.peer, command = ?outbound.command, "Command delivered");
                    delivered_tx.send_replace(delivered);
                }
                Err(e) => {
                    let count = failures.entry(outbound.peer.clone()).or_insert(0);
                    *count = count.saturating_add(1);
                    let count = *count;

                    if count < config.max_consecutive_errors {
                        warn!(
                            peer = %outbound.peer,
                            command = ?outbound.command,
                            "Transport error ({}/{}): {}",
                            count,
                            config.max_consecutive_errors,
                            e
                        );
                    } else if count == config.max_consecutive_errors {
                        error!(peer = %outbound.peer, "Peer unreachable after {} transport errors: {}", count, e);
                    } else {
                        debug!(peer = %outbound.peer, command = ?outbound.command, "Dropped command for unreachable peer: {}", e);
                    }
                }
            }
        }

        info!("Command dispatcher ended (delivered {} commands)", delivered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StreamingError;
    use crate::types::SensorMask;
    use std::sync::{Arc, Mutex};

    struct SharedTransport {
        sent: Arc<Mutex<Vec<(PeerId, PeerCommand)>>>,
        unreachable: Option<PeerId>,
    }

    #[async_trait::async_trait]
    impl Transport for SharedTransport {
        async fn send_command(&mut self, peer: &PeerId, command: &PeerCommand) -> Result<()> {
            if self.unreachable.as_ref() == Some(peer) {
                return Err(StreamingError::transport_failed("link down"));
            }
            self.sent.lock().expect("transport log").push((peer.clone(), *command));
            Ok(())
        }
    }

    #[test]
    fn indicator_intensity_is_clamped() {
        let (sink, mut rx) = ChannelCommandSink::new();
        let peer = PeerId::new("alpha");

        sink.send_indicator(&peer, 3.5);
        sink.send_indicator(&peer, -1.0);
        sink.send_indicator(&peer, f32::NAN);

        let intensities = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|outbound| match outbound.command {
                PeerCommand::Indicator { intensity } => intensity,
                other => panic!("unexpected command {:?}", other),
            })
            .collect::<Vec<_>>();
        assert_eq!(intensities, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn dispatch_after_receiver_drop_does_not_panic() {
        let (sink, rx) = ChannelCommandSink::new();
        drop(rx);
        assert!(sink.is_closed());
        sink.send_stabilization(&PeerId::new("alpha"), false);
    }

    #[tokio::test]
    async fn dispatcher_forwards_commands_in_order() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let (sink, rx) = ChannelCommandSink::new();
        let handle = CommandDispatcher::spawn(
            rx,
            SharedTransport { sent: Arc::clone(&sent), unreachable: None },
            DispatcherConfig::default(),
        );

        let peer = PeerId::new("alpha");
        let params = StreamingParams::new(4, 8, SensorMask::new(0x3F), 200);
        sink.send_stabilization(&peer, false);
        sink.send_indicator(&peer, 1.0);
        sink.send_streaming_config(&peer, params);
        drop(sink);

        handle.join().await;

        let sent = sent.lock().expect("transport log");
        assert_eq!(
            sent.iter().map(|(_, c)| *c).collect::<Vec<_>>(),
            vec![
                PeerCommand::Stabilization { enabled: false },
                PeerCommand::Indicator { intensity: 1.0 },
                PeerCommand::StreamingConfig(params),
            ]
        );
    }

    #[tokio::test]
    async fn unreachable_peer_does_not_block_other_peers() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let (sink, rx) = ChannelCommandSink::new();
        let dead = PeerId::new("dead");
        let alive = PeerId::new("alive");
        let handle = CommandDispatcher::spawn(
            rx,
            SharedTransport { sent: Arc::clone(&sent), unreachable: Some(dead.clone()) },
            DispatcherConfig { max_consecutive_errors: 3 },
        );

        let params = StreamingParams::new(4, 8, SensorMask::new(0x3F), 200);
        sink.send_streaming_config(&alive, params);
        for _ in 0..12 {
            sink.send_stabilization(&dead, false);
        }
        sink.send_streaming_config(&alive, params);
        sink.send_streaming_config(&dead, StreamingParams::STOP);
        sink.send_streaming_config(&alive, params);

        let delivered = handle.delivered.clone();
        assert!(!sink.is_closed());
        drop(sink);
        handle.join().await;

        assert_eq!(*delivered.borrow(), 3);
        let sent = sent.lock().expect("transport log");
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|(peer, command)| {
            peer == &alive && *command == PeerCommand::StreamingConfig(params)
        }));
    }

    #[tokio::test]
    async fn dispatcher_stops_on_cancel() {
        let (sink, rx) = ChannelCommandSink::new();
        let handle = CommandDispatcher::spawn(
            rx,
            SharedTransport { sent: Arc::new(Mutex::new(Vec::new())), unreachable: None },
            DispatcherConfig::default(),
        );

        handle.shutdown().await;
        assert!(sink.is_closed());
    }
}
