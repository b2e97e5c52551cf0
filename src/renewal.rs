//! Renewal engine
//!
//! Runs once per inbound sensor packet. Counts the packet against the
//! peer's session and, for infinite sessions past the renewal point,
//! re-arms the peer with a fresh quota and restarts the count. Bounded
//! sessions are left to run out on the peer.

use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::registry::SessionRegistry;
use crate::sink::CounterSink;
use crate::types::{PeerId, StreamingParams};

/// What the engine did with one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalOutcome {
    /// The peer has no session; the packet was ignored
    Unmanaged,

    /// Counted, renewal not due
    Counted { packet_counter: u32 },

    /// Renewal was due; the peer was re-armed and the counter reset
    Renewed { params: StreamingParams },

    /// Past the renewal point on a bounded session; nothing sent
    BoundedPastThreshold { packet_counter: u32 },
}

impl RenewalOutcome {
    /// Counter value after the packet, for managed peers.
    pub fn packet_counter(&self) -> Option<u32> {
        match self {
            RenewalOutcome::Unmanaged => None,
            RenewalOutcome::Counted { packet_counter }
            | RenewalOutcome::BoundedPastThreshold { packet_counter } => Some(*packet_counter),
            RenewalOutcome::Renewed { .. } => Some(0),
        }
    }

    /// Check if a re-arm command was issued.
    pub fn is_renewal(&self) -> bool {
        matches!(self, RenewalOutcome::Renewed { .. })
    }
}

/// Keeps infinite sessions armed as packets arrive.
pub struct RenewalEngine {
    registry: Arc<SessionRegistry>,
    counter_sink: Arc<dyn CounterSink>,
}

impl RenewalEngine {
    pub fn new(registry: Arc<SessionRegistry>, counter_sink: Arc<dyn CounterSink>) -> Self {
        Self { registry, counter_sink }
    }

    /// Account for one sensor packet from `peer`.
    ///
    /// The re-arm command is sent while the peer's session is locked, so
    /// commands stay in state order. The counter is published after the
    /// lock is released: with concurrent delivery for one peer, the sink may
    /// receive values out of order. The returned outcome always reflects
    /// this packet's own view of the session.
    pub fn on_sensor_data(&self, peer: &PeerId) -> RenewalOutcome {
        let outcome = self.registry.with_session(peer, |profile, commands| {
            let due = profile.observe_packet();

            if due && profile.is_infinite() {
                let params = profile.arm_params();
                commands.send_streaming_config(peer, params);
                profile.reset();
                RenewalOutcome::Renewed { params }
            } else if due {
                RenewalOutcome::BoundedPastThreshold { packet_counter: profile.packet_counter() }
            } else {
                RenewalOutcome::Counted { packet_counter: profile.packet_counter() }
            }
        });

        let Some(outcome) = outcome else {
            trace!(peer = %peer, "Sensor data from peer without a session");
            return RenewalOutcome::Unmanaged;
        };

        if let RenewalOutcome::Renewed { params } = &outcome {
            debug!(peer = %peer, packet_count = params.packet_count, "Renewed streaming quota");
        }

        if let Some(counter) = outcome.packet_counter() {
            if let Err(e) = self.counter_sink.publish(peer, &counter.to_string()) {
                warn!(peer = %peer, counter, "Counter sink failed: {}", e);
            }
        }

        outcome
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }
}
