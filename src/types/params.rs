//! Streaming command parameters

use serde::{Deserialize, Serialize};

use super::SensorMask;

/// Maximum sensor sampling frequency of the peer, in Hz.
///
/// The streaming divisor is applied to this rate.
pub const MAX_SAMPLE_RATE_HZ: f64 = 400.0;

/// Parameters of one "set data streaming" command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct StreamingParams {
    /// Divisor of the peer's maximum sampling rate
    pub divisor: u16,

    /// Samples batched into one packet
    pub packet_frames: u16,

    /// Data sources included per sample
    pub sensor_mask: SensorMask,

    /// Packets to send before stopping (0 on the API means "forever")
    pub packet_count: u8,
}

impl StreamingParams {
    /// All-zero parameters; tells the peer to stop streaming.
    pub const STOP: Self =
        Self { divisor: 0, packet_frames: 0, sensor_mask: SensorMask::empty(), packet_count: 0 };

    /// Create a parameter set.
    pub fn new(divisor: u16, packet_frames: u16, sensor_mask: SensorMask, packet_count: u8) -> Self {
        Self { divisor, packet_frames, sensor_mask, packet_count }
    }

    /// Same parameters with a different packet count.
    pub fn with_packet_count(self, packet_count: u8) -> Self {
        Self { packet_count, ..self }
    }

    /// Check if these are the stop parameters.
    pub fn is_stop(&self) -> bool {
        *self == Self::STOP
    }

    /// Expected packet arrival rate in Hz, or 0 when streaming is off.
    pub fn packet_rate_hz(&self) -> f64 {
        if self.divisor == 0 || self.packet_frames == 0 {
            return 0.0;
        }
        MAX_SAMPLE_RATE_HZ / self.divisor as f64 / self.packet_frames as f64
    }
}
