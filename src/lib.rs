//! Continuous sensor-data streaming for quota-limited robot peers.
//!
//! A streaming peer only understands "send me N packets, then stop". Orbstream
//! turns that primitive into open-ended streaming: it arms each peer with a
//! fixed quota, counts the packets that come back, and re-arms the peer
//! shortly before the quota runs out. Any number of peers can stream at once.
//!
//! # Features
//!
//! - **Session Registry**: At most one session per peer, replace-on-restart semantics
//! - **Transparent Renewal**: Edge-triggered re-arming with a configurable safety margin
//! - **Fire-and-forget Commands**: A non-blocking command sink drained by a dispatcher task
//! - **Counter Observability**: Pluggable sinks, including a throttled `Stream` of updates
//!
//! # Architecture
//!
//! ```text
//!   host ──▶ StreamingBridge ──▶ SessionRegistry ──▶ CommandSink ──▶ Transport
//!                  ▲                   ▲
//!   EventSource ──▶ Driver ──▶ RenewalEngine ──▶ CounterSink
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use orbstream::sources::ChannelSource;
//! use orbstream::{
//!     BridgeConfig, Driver, PeerCommand, PeerId, SensorMask, StreamingBridge, Transport,
//! };
//! use std::sync::Arc;
//!
//! struct RadioLink;
//!
//! #[async_trait::async_trait]
//! impl Transport for RadioLink {
//!     async fn send_command(&mut self, peer: &PeerId, command: &PeerCommand) -> orbstream::Result<()> {
//!         println!("{peer}: {command:?}");
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> orbstream::Result<()> {
//!     let (bridge, _dispatcher) = StreamingBridge::spawn(RadioLink, BridgeConfig::default())?;
//!     let bridge = Arc::new(bridge);
//!
//!     // The transport pushes every asynchronous peer message into `events`.
//!     let (events, source) = ChannelSource::new();
//!     let pump = Driver::spawn(source, Arc::clone(&bridge));
//!
//!     let peer = PeerId::new("sphero-RGB");
//!     bridge.enable_continuous_streaming(
//!         &peer,
//!         20,
//!         1,
//!         SensorMask::ACCELEROMETER_FILTERED_ALL | SensorMask::QUATERNION_ALL,
//!     );
//!
//!     // ... later
//!     bridge.disable_continuous_streaming(&peer);
//!     drop(events);
//!     pump.join().await;
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
pub mod profile;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Session control
pub mod bridge;
pub mod registry;
pub mod renewal;

// Collaborator boundaries
pub mod command;
pub mod sink;
pub mod source;
pub mod sources;

// Async plumbing
pub mod driver;
pub mod stream;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use bridge::StreamingBridge;
pub use command::{
    ChannelCommandSink, CommandDispatcher, CommandSink, DispatcherHandle, OutboundCommand,
    PeerCommand, Transport,
};
pub use config::{BridgeConfig, CounterSinkKind, DispatcherConfig, RenewalPolicy};
pub use driver::{Driver, DriverHandle};
pub use profile::{PACKET_COUNT_THRESHOLD, StreamingProfile, TOTAL_PACKET_COUNT};
pub use registry::SessionRegistry;
pub use renewal::{RenewalEngine, RenewalOutcome};
pub use sink::{
    CallbackCounterSink, CounterSink, CounterUpdate, NullCounterSink, TracingCounterSink,
    WatchCounterSink,
};
pub use source::EventSource;

/// Install a `tracing` subscriber that honours `RUST_LOG`.
///
/// Defaults to `info` for this crate when `RUST_LOG` is unset. Safe to call
/// more than once; later calls are ignored.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("orbstream=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
