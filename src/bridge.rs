//! Streaming bridge façade
//!
//! [`StreamingBridge`] is the public surface a host application talks to.
//! It owns the session registry and the renewal engine, and exposes the
//! three host calls plus the event handler a transport invokes per
//! asynchronous peer message.

use futures::StreamExt;
use futures::stream::BoxStream;
use std::sync::Arc;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info};

use crate::command::{ChannelCommandSink, CommandDispatcher, CommandSink, DispatcherHandle, Transport};
use crate::config::{BridgeConfig, CounterSinkKind};
use crate::profile::StreamingProfile;
use crate::registry::SessionRegistry;
use crate::renewal::{RenewalEngine, RenewalOutcome};
use crate::sink::{CounterSink, CounterUpdate, NullCounterSink, TracingCounterSink, WatchCounterSink};
use crate::stream::ThrottleExt;
use crate::types::{MAX_SAMPLE_RATE_HZ, PeerEvent, PeerId, SensorMask, StreamingParams, UpdateRate};
use crate::{Result, StreamingError};

/// Session controller for any number of streaming peers.
///
/// # Example
///
/// ```rust
/// use orbstream::{BridgeConfig, ChannelCommandSink, PeerId, SensorMask, StreamingBridge};
/// use std::sync::Arc;
///
/// let (commands, _queued) = ChannelCommandSink::new();
/// let bridge = StreamingBridge::new(Arc::new(commands), BridgeConfig::default())?;
/// let peer = PeerId::new("sphero-RGB");
///
/// let armed = bridge.enable_continuous_streaming(&peer, 20, 1, SensorMask::QUATERNION_ALL);
/// assert_eq!(armed.packet_count, 200);
///
/// bridge.disable_continuous_streaming(&peer);
/// assert!(bridge.session_snapshot(&peer).is_none());
/// # Ok::<(), orbstream::StreamingError>(())
/// ```
pub struct StreamingBridge {
    registry: Arc<SessionRegistry>,
    engine: RenewalEngine,
    counter_watch: Option<Arc<WatchCounterSink>>,
    config: BridgeConfig,
}

impl StreamingBridge {
    /// Create a bridge with the counter sink named in `config`.
    pub fn new(commands: Arc<dyn CommandSink>, config: BridgeConfig) -> Result<Self> {
        let mut counter_watch = None;
        let counter_sink: Arc<dyn CounterSink> = match config.counter_sink {
            CounterSinkKind::Tracing => Arc::new(TracingCounterSink),
            CounterSinkKind::Watch => {
                let watch = Arc::new(WatchCounterSink::new());
                counter_watch = Some(Arc::clone(&watch));
                watch
            }
            CounterSinkKind::None => Arc::new(NullCounterSink),
        };
        Self::assemble(commands, counter_sink, counter_watch, config)
    }

    /// Create a bridge publishing counters to a caller-supplied sink.
    pub fn with_counter_sink(
        commands: Arc<dyn CommandSink>,
        counter_sink: Arc<dyn CounterSink>,
        config: BridgeConfig,
    ) -> Result<Self> {
        Self::assemble(commands, counter_sink, None, config)
    }

    /// Create a bridge whose commands are written by a spawned dispatcher.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<T>(transport: T, config: BridgeConfig) -> Result<(Self, DispatcherHandle)>
    where
        T: Transport,
    {
        config.validate()?;
        let (commands, rx) = ChannelCommandSink::new();
        let dispatcher = CommandDispatcher::spawn(rx, transport, config.dispatcher);
        let bridge = Self::new(Arc::new(commands), config)?;
        Ok((bridge, dispatcher))
    }

    fn assemble(
        commands: Arc<dyn CommandSink>,
        counter_sink: Arc<dyn CounterSink>,
        counter_watch: Option<Arc<WatchCounterSink>>,
        config: BridgeConfig,
    ) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(SessionRegistry::new(commands, config.renewal));
        let engine = RenewalEngine::new(Arc::clone(&registry), counter_sink);
        debug!(policy = ?config.renewal, counter_sink = ?config.counter_sink, "Streaming bridge ready");
        Ok(Self { registry, engine, counter_watch, config })
    }

    /// Begin or replace a session for `peer`.
    ///
    /// `packet_count == 0` streams until disabled. Returns the parameters
    /// sent to the peer.
    pub fn set_data_streaming(
        &self,
        peer: &PeerId,
        divisor: u16,
        packet_frames: u16,
        sensor_mask: SensorMask,
        packet_count: u8,
    ) -> StreamingParams {
        self.registry.begin_session(
            peer,
            StreamingParams::new(divisor, packet_frames, sensor_mask, packet_count),
        )
    }

    /// Controller-input setup: stabilization off, indicator on, stream forever.
    pub fn enable_continuous_streaming(
        &self,
        peer: &PeerId,
        divisor: u16,
        packet_frames: u16,
        sensor_mask: SensorMask,
    ) -> StreamingParams {
        let commands = self.registry.commands();
        commands.send_stabilization(peer, false);
        commands.send_indicator(peer, self.config.indicator_intensity);

        info!(peer = %peer, "Enabling continuous streaming");
        self.set_data_streaming(peer, divisor, packet_frames, sensor_mask, 0)
    }

    /// Tear down a continuous session.
    ///
    /// Sends the same stabilization and indicator commands as
    /// [`enable_continuous_streaming`](Self::enable_continuous_streaming);
    /// the previous state is not restored.
    pub fn disable_continuous_streaming(&self, peer: &PeerId) -> Option<StreamingProfile> {
        let commands = self.registry.commands();
        commands.send_stabilization(peer, false);
        commands.send_indicator(peer, self.config.indicator_intensity);

        info!(peer = %peer, "Disabling continuous streaming");
        self.registry.end_session(peer)
    }

    /// Handle one asynchronous peer message.
    ///
    /// Returns `None` for messages that are not sensor data.
    pub fn handle_event(&self, event: &PeerEvent) -> Option<RenewalOutcome> {
        match event {
            PeerEvent::SensorData(packet) => Some(self.engine.on_sensor_data(&packet.peer)),
            _ => None,
        }
    }

    /// Copy of the peer's current session profile.
    pub fn session_snapshot(&self, peer: &PeerId) -> Option<StreamingProfile> {
        self.registry.profile_for(peer)
    }

    /// Peers with an active session.
    pub fn active_peers(&self) -> Vec<PeerId> {
        self.registry.active_peers()
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Stream of `peer`'s counter updates, throttled to `rate`.
    ///
    /// Only available when the bridge was built with
    /// [`CounterSinkKind::Watch`]. Each peer streams independently; within a
    /// stream, updates are latest-wins.
    pub fn counter_updates(
        &self,
        peer: &PeerId,
        rate: UpdateRate,
    ) -> Result<BoxStream<'static, CounterUpdate>> {
        let Some(watch) = &self.counter_watch else {
            return Err(StreamingError::invalid_config(
                "counter updates require counter_sink: watch",
            ));
        };

        let updates = WatchStream::new(watch.subscribe(peer)).filter_map(|opt| async move { opt });

        match rate.throttle_interval(MAX_SAMPLE_RATE_HZ) {
            None => Ok(updates.boxed()),
            Some(interval) => Ok(updates.throttle(interval).boxed()),
        }
    }
}

impl std::fmt::Debug for StreamingBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingBridge")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::PeerCommand;
    use crate::test_utils::{RecordingCommandSink, RecordingCounterSink, sensor_events};
    use crate::types::SensorPacket;

    fn bridge_with(config: BridgeConfig) -> (StreamingBridge, Arc<RecordingCommandSink>) {
        let commands = Arc::new(RecordingCommandSink::new());
        let bridge = StreamingBridge::new(commands.clone(), config).expect("valid config");
        (bridge, commands)
    }

    #[test]
    fn enable_sends_setup_before_streaming() {
        let (bridge, commands) = bridge_with(BridgeConfig::default());
        let peer = PeerId::new("alpha");

        bridge.enable_continuous_streaming(&peer, 20, 1, SensorMask::QUATERNION_ALL);

        assert_eq!(
            commands.commands_for(&peer),
            vec![
                PeerCommand::Stabilization { enabled: false },
                PeerCommand::Indicator { intensity: 1.0 },
                PeerCommand::StreamingConfig(StreamingParams::new(20, 1, SensorMask::QUATERNION_ALL, 200)),
            ]
        );
        assert!(bridge.session_snapshot(&peer).expect("session").is_infinite());
    }

    #[test]
    fn disable_mirrors_enable_then_stops() {
        let (bridge, commands) = bridge_with(BridgeConfig::default());
        let peer = PeerId::new("alpha");
        bridge.enable_continuous_streaming(&peer, 20, 1, SensorMask::QUATERNION_ALL);
        commands.clear();

        let removed = bridge.disable_continuous_streaming(&peer);

        assert!(removed.is_some());
        assert_eq!(
            commands.commands_for(&peer),
            vec![
                PeerCommand::Stabilization { enabled: false },
                PeerCommand::Indicator { intensity: 1.0 },
                PeerCommand::StreamingConfig(StreamingParams::STOP),
            ]
        );
        assert!(bridge.active_peers().is_empty());
    }

    #[test]
    fn configured_indicator_intensity_is_used() {
        let config = BridgeConfig { indicator_intensity: 0.25, ..BridgeConfig::default() };
        let (bridge, commands) = bridge_with(config);
        let peer = PeerId::new("alpha");

        bridge.enable_continuous_streaming(&peer, 20, 1, SensorMask::QUATERNION_ALL);

        assert!(commands.commands_for(&peer).contains(&PeerCommand::Indicator { intensity: 0.25 }));
    }

    #[test]
    fn non_sensor_events_are_passed_over() {
        let (bridge, _commands) = bridge_with(BridgeConfig::default());
        let peer = PeerId::new("alpha");
        bridge.set_data_streaming(&peer, 4, 8, SensorMask::new(0x3F), 0);

        assert!(bridge.handle_event(&PeerEvent::Collision { peer: peer.clone() }).is_none());
        assert!(bridge.handle_event(&PeerEvent::PowerNotification { peer: peer.clone() }).is_none());
        assert_eq!(bridge.session_snapshot(&peer).expect("session").packet_counter(), 0);

        let outcome = bridge.handle_event(&PeerEvent::SensorData(SensorPacket::new(peer.clone(), vec![])));
        assert_eq!(outcome, Some(RenewalOutcome::Counted { packet_counter: 1 }));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = BridgeConfig::default();
        config.renewal.packet_count_threshold = 250;
        let err = StreamingBridge::new(Arc::new(RecordingCommandSink::new()), config).unwrap_err();
        assert!(matches!(err, StreamingError::Config { .. }));
    }

    #[test]
    fn counter_updates_need_watch_sink() {
        let bridge = StreamingBridge::with_counter_sink(
            Arc::new(RecordingCommandSink::new()),
            Arc::new(RecordingCounterSink::new()),
            BridgeConfig::default(),
        )
        .expect("valid config");
        assert!(bridge.counter_updates(&PeerId::new("alpha"), UpdateRate::Native).is_err());
    }

    #[tokio::test]
    async fn counter_updates_stream_latest_values() {
        let config = BridgeConfig { counter_sink: CounterSinkKind::Watch, ..BridgeConfig::default() };
        let (bridge, _commands) = bridge_with(config);
        let peer = PeerId::new("alpha");
        bridge.set_data_streaming(&peer, 4, 8, SensorMask::new(0x3F), 0);

        let mut updates =
            bridge.counter_updates(&peer, UpdateRate::Native).expect("watch sink configured");
        for event in sensor_events(&peer, 3) {
            bridge.handle_event(&event);
        }

        let update = updates.next().await.expect("stream open");
        assert_eq!(update.peer, peer);
        assert_eq!(update.packet_counter(), Some(3));
    }

    #[tokio::test]
    async fn counter_updates_are_kept_per_peer() {
        let config = BridgeConfig { counter_sink: CounterSinkKind::Watch, ..BridgeConfig::default() };
        let (bridge, _commands) = bridge_with(config);
        let first = PeerId::new("alpha");
        let second = PeerId::new("bravo");
        bridge.set_data_streaming(&first, 4, 8, SensorMask::new(0x3F), 0);
        bridge.set_data_streaming(&second, 4, 8, SensorMask::new(0x3F), 0);

        let mut first_updates =
            bridge.counter_updates(&first, UpdateRate::Native).expect("watch sink configured");
        let mut second_updates =
            bridge.counter_updates(&second, UpdateRate::Native).expect("watch sink configured");

        bridge.handle_event(&PeerEvent::SensorData(SensorPacket::new(first.clone(), vec![])));
        for event in sensor_events(&second, 2) {
            bridge.handle_event(&event);
        }

        let update = first_updates.next().await.expect("stream open");
        assert_eq!(update.peer, first);
        assert_eq!(update.packet_counter(), Some(1));

        let update = second_updates.next().await.expect("stream open");
        assert_eq!(update.peer, second);
        assert_eq!(update.packet_counter(), Some(2));
    }

    #[tokio::test]
    async fn unreachable_peer_does_not_starve_renewals() {
        use std::sync::Mutex;

        struct PartitionedTransport {
            unreachable: PeerId,
            delivered: Arc<Mutex<Vec<(PeerId, PeerCommand)>>>,
        }

        #[async_trait::async_trait]
        impl Transport for PartitionedTransport {
            async fn send_command(&mut self, peer: &PeerId, command: &PeerCommand) -> Result<()> {
                if *peer == self.unreachable {
                    return Err(StreamingError::transport_failed("peer out of range"));
                }
                self.delivered.lock().expect("transport log").push((peer.clone(), *command));
                Ok(())
            }
        }

        let dead = PeerId::new("dead");
        let alive = PeerId::new("alive");
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let transport =
            PartitionedTransport { unreachable: dead.clone(), delivered: Arc::clone(&delivered) };
        let (bridge, dispatcher) =
            StreamingBridge::spawn(transport, BridgeConfig::default()).expect("valid config");

        bridge.set_data_streaming(&alive, 4, 8, SensorMask::new(0x3F), 0);
        for _ in 0..4 {
            bridge.disable_continuous_streaming(&dead);
        }
        for event in sensor_events(&alive, 151) {
            bridge.handle_event(&event);
        }
        drop(bridge);
        dispatcher.join().await;

        let delivered = delivered.lock().expect("transport log");
        let arm = StreamingParams::new(4, 8, SensorMask::new(0x3F), 200);
        assert_eq!(
            delivered.iter().map(|(_, command)| *command).collect::<Vec<_>>(),
            vec![PeerCommand::StreamingConfig(arm), PeerCommand::StreamingConfig(arm)]
        );
        assert!(delivered.iter().all(|(peer, _)| *peer == alive));
    }

    #[tokio::test]
    async fn spawned_bridge_delivers_through_transport() {
        struct CountingTransport(Arc<std::sync::atomic::AtomicUsize>);

        #[async_trait::async_trait]
        impl Transport for CountingTransport {
            async fn send_command(&mut self, _peer: &PeerId, _command: &PeerCommand) -> Result<()> {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            }
        }

        let sent = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let (bridge, dispatcher) =
            StreamingBridge::spawn(CountingTransport(Arc::clone(&sent)), BridgeConfig::default())
                .expect("valid config");
        let peer = PeerId::new("alpha");

        bridge.enable_continuous_streaming(&peer, 20, 1, SensorMask::QUATERNION_ALL);
        bridge.disable_continuous_streaming(&peer);
        drop(bridge);
        dispatcher.join().await;

        assert_eq!(sent.load(std::sync::atomic::Ordering::SeqCst), 6);
    }
}
