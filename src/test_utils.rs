//! Test utilities for recording what the controller emits
//!
//! These sinks capture commands and counter values in memory so tests and
//! benchmarks can assert on exactly what left the session controller.

#![cfg(any(test, feature = "benchmark"))]

use std::sync::Mutex;

use crate::command::{CommandSink, OutboundCommand, PeerCommand};
use crate::sink::CounterSink;
use crate::types::{PeerEvent, PeerId, SensorPacket, StreamingParams};
use crate::{Result, StreamingError};

/// Command sink that remembers every command in arrival order.
#[derive(Debug, Default)]
pub struct RecordingCommandSink {
    sent: Mutex<Vec<OutboundCommand>>,
}

impl RecordingCommandSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command sent so far.
    pub fn commands(&self) -> Vec<OutboundCommand> {
        self.lock().clone()
    }

    /// Commands sent to one peer, in order.
    pub fn commands_for(&self, peer: &PeerId) -> Vec<PeerCommand> {
        self.lock().iter().filter(|c| &c.peer == peer).map(|c| c.command).collect()
    }

    /// Streaming configurations sent to one peer, in order.
    pub fn streaming_configs_for(&self, peer: &PeerId) -> Vec<StreamingParams> {
        self.commands_for(peer)
            .into_iter()
            .filter_map(|command| match command {
                PeerCommand::StreamingConfig(params) => Some(params),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<OutboundCommand>> {
        self.sent.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CommandSink for RecordingCommandSink {
    fn dispatch(&self, peer: &PeerId, command: PeerCommand) {
        self.lock().push(OutboundCommand { peer: peer.clone(), command });
    }
}

/// Counter sink that remembers every published value.
#[derive(Debug, Default)]
pub struct RecordingCounterSink {
    published: Mutex<Vec<(PeerId, String)>>,
    fail: bool,
}

impl RecordingCounterSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that records values and then rejects them.
    pub fn failing() -> Self {
        Self { published: Mutex::default(), fail: true }
    }

    /// Values published for one peer, in order.
    pub fn values_for(&self, peer: &PeerId) -> Vec<String> {
        self.lock().iter().filter(|(p, _)| p == peer).map(|(_, v)| v.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(PeerId, String)>> {
        self.published.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CounterSink for RecordingCounterSink {
    fn publish(&self, peer: &PeerId, counter: &str) -> Result<()> {
        self.lock().push((peer.clone(), counter.to_owned()));
        if self.fail {
            return Err(StreamingError::sink_rejected("recording sink set to fail"));
        }
        Ok(())
    }
}

/// `count` sensor-data events for `peer`, each with a small dummy payload.
pub fn sensor_events(peer: &PeerId, count: usize) -> Vec<PeerEvent> {
    (0..count)
        .map(|i| PeerEvent::SensorData(SensorPacket::new(peer.clone(), (i as u32).to_le_bytes().to_vec())))
        .collect()
}
