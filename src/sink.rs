//! Counter sinks
//!
//! After every sensor packet of a managed session the renewal engine hands
//! the session's packet counter, rendered as a decimal string, to a
//! [`CounterSink`]. Sinks are observability only: an error from one is
//! logged and the renewal path carries on.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::trace;

use crate::types::PeerId;
use crate::{Result, StreamingError};

/// Downstream consumer of per-packet counter values.
///
/// Values are published after the peer's session lock is released. When one
/// peer's packets are delivered from several threads, a sink may see that
/// peer's values out of order (a post-renewal `"0"` ahead of `"150"`).
pub trait CounterSink: Send + Sync {
    /// Accept the current counter value for `peer`.
    fn publish(&self, peer: &PeerId, counter: &str) -> Result<()>;
}

/// One counter value as seen by watch subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterUpdate {
    pub peer: PeerId,
    pub counter: String,
}

impl CounterUpdate {
    /// Counter value as a number, if it is one.
    pub fn packet_counter(&self) -> Option<u32> {
        self.counter.parse().ok()
    }
}

/// Logs counter values at trace level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingCounterSink;

impl CounterSink for TracingCounterSink {
    fn publish(&self, peer: &PeerId, counter: &str) -> Result<()> {
        trace!(peer = %peer, counter, "Packet counter");
        Ok(())
    }
}

/// Discards counter values.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCounterSink;

impl CounterSink for NullCounterSink {
    fn publish(&self, _peer: &PeerId, _counter: &str) -> Result<()> {
        Ok(())
    }
}

/// Republishes the latest counter value per peer on watch channels.
///
/// Each peer has its own channel, so a busy peer never hides a quiet one.
/// Within a peer, subscribers see only the newest update; intermediate
/// values may be skipped if they fall behind.
#[derive(Debug)]
pub struct WatchCounterSink {
    peers: DashMap<PeerId, watch::Sender<Option<CounterUpdate>>>,
}

impl Default for WatchCounterSink {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchCounterSink {
    pub fn new() -> Self {
        Self { peers: DashMap::new() }
    }

    /// Receiver yielding the latest update for `peer`.
    ///
    /// Subscribing before the peer's first packet is fine; the receiver
    /// starts at `None`.
    pub fn subscribe(&self, peer: &PeerId) -> watch::Receiver<Option<CounterUpdate>> {
        self.peers.entry(peer.clone()).or_insert_with(|| watch::channel(None).0).subscribe()
    }

    /// Most recent update for `peer`, if any.
    pub fn latest(&self, peer: &PeerId) -> Option<CounterUpdate> {
        self.peers.get(peer).and_then(|tx| tx.borrow().clone())
    }

    /// Peers that have a counter channel.
    pub fn peers(&self) -> Vec<PeerId> {
        self.peers.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl CounterSink for WatchCounterSink {
    fn publish(&self, peer: &PeerId, counter: &str) -> Result<()> {
        let update = Some(CounterUpdate { peer: peer.clone(), counter: counter.to_owned() });
        match self.peers.get(peer) {
            Some(tx) => {
                tx.send_replace(update);
            }
            None => {
                self.peers.entry(peer.clone()).or_insert_with(|| watch::channel(None).0).send_replace(update);
            }
        }
        Ok(())
    }
}

/// Forwards counter values to a closure, typically a host callback.
pub struct CallbackCounterSink<F> {
    callback: F,
}

impl<F> CallbackCounterSink<F>
where
    F: Fn(&PeerId, &str) -> std::result::Result<(), String> + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> CounterSink for CallbackCounterSink<F>
where
    F: Fn(&PeerId, &str) -> std::result::Result<(), String> + Send + Sync,
{
    fn publish(&self, peer: &PeerId, counter: &str) -> Result<()> {
        (self.callback)(peer, counter).map_err(StreamingError::sink_rejected)
    }
}
