//! Per-peer streaming profile
//!
//! A profile holds the parameters a session was armed with plus one
//! mutable counter of packets seen since the last arm. The peer only
//! knows fixed packet quotas, so infinite mode is emulated by arming
//! with [`TOTAL_PACKET_COUNT`] and re-arming once the counter passes
//! `TOTAL_PACKET_COUNT - PACKET_COUNT_THRESHOLD`.

use serde::{Deserialize, Serialize};

use crate::config::RenewalPolicy;
use crate::types::{SensorMask, StreamingParams};

/// Packet quota sent on every arm of an infinite session.
pub const TOTAL_PACKET_COUNT: u8 = 200;

/// Packets left in the quota when renewal becomes due.
pub const PACKET_COUNT_THRESHOLD: u8 = 50;

/// Streaming configuration and renewal state for one peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct StreamingProfile {
    divisor: u16,
    packet_frames: u16,
    sensor_mask: SensorMask,
    requested_packet_count: u8,
    effective_packet_count: u8,
    renewal_point: u32,
    packet_counter: u32,
}

impl StreamingProfile {
    /// Build a profile from requested parameters.
    ///
    /// A requested packet count of 0 selects infinite mode, which arms the
    /// peer with the policy's batch size instead.
    pub fn new(requested: StreamingParams, policy: &RenewalPolicy) -> Self {
        let effective_packet_count = if requested.packet_count == 0 {
            policy.total_packet_count
        } else {
            requested.packet_count
        };

        Self {
            divisor: requested.divisor,
            packet_frames: requested.packet_frames,
            sensor_mask: requested.sensor_mask,
            requested_packet_count: requested.packet_count,
            effective_packet_count,
            renewal_point: policy.renewal_point(),
            packet_counter: 0,
        }
    }

    /// Count one received packet.
    ///
    /// Returns true once the counter has passed the renewal point.
    pub fn observe_packet(&mut self) -> bool {
        self.packet_counter = self.packet_counter.saturating_add(1);
        self.packet_counter > self.renewal_point
    }

    /// Check if this session streams until disabled.
    pub fn is_infinite(&self) -> bool {
        self.requested_packet_count == 0
    }

    /// Restart counting after a re-arm command was sent.
    pub fn reset(&mut self) {
        self.packet_counter = 0;
    }

    /// Parameters of the command that (re-)arms this session on the wire.
    pub fn arm_params(&self) -> StreamingParams {
        StreamingParams::new(
            self.divisor,
            self.packet_frames,
            self.sensor_mask,
            self.effective_packet_count,
        )
    }

    pub fn divisor(&self) -> u16 {
        self.divisor
    }

    pub fn packet_frames(&self) -> u16 {
        self.packet_frames
    }

    pub fn sensor_mask(&self) -> SensorMask {
        self.sensor_mask
    }

    pub fn requested_packet_count(&self) -> u8 {
        self.requested_packet_count
    }

    /// Quota actually sent to the peer.
    pub fn effective_packet_count(&self) -> u8 {
        self.effective_packet_count
    }

    /// Packets observed since the last (re-)arm.
    pub fn packet_counter(&self) -> u32 {
        self.packet_counter
    }
}
