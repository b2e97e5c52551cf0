//! Replay source for scripted peer sessions

use std::collections::VecDeque;
use tokio::time::{Duration, Interval, interval};
use tracing::{debug, info, trace, warn};

use crate::Result;
use crate::source::EventSource;
use crate::types::{PeerEvent, PeerId, SensorPacket};

/// Replays a fixed sequence of events at a steady packet rate.
pub struct ReplaySource {
    /// Events not yet delivered
    events: VecDeque<PeerEvent>,

    /// Playback speed multiplier (1.0 = normal, 2.0 = double speed)
    speed: f64,

    /// Event pacing interval
    interval: Interval,

    /// Nominal event rate in Hz
    rate_hz: f64,
}

impl ReplaySource {
    /// Create a replay of `events` delivered at `rate_hz`.
    pub fn new(events: impl IntoIterator<Item = PeerEvent>, rate_hz: f64) -> Self {
        let events: VecDeque<_> = events.into_iter().collect();
        let rate_hz = if rate_hz.is_finite() && rate_hz > 0.0 { rate_hz } else { 1.0 };

        info!("Replaying {} peer events at {}Hz", events.len(), rate_hz);

        Self { events, speed: 1.0, interval: interval(Duration::from_secs_f64(1.0 / rate_hz)), rate_hz }
    }

    /// A replay of `count` sensor packets from `peer`.
    pub fn sensor_burst(peer: &PeerId, count: usize, rate_hz: f64) -> Self {
        let events = (0..count)
            .map(|_| PeerEvent::SensorData(SensorPacket::new(peer.clone(), Vec::new())));
        Self::new(events, rate_hz)
    }

    /// Set playback speed
    ///
    /// Clamped to `0.1..=10.0`; a non-finite speed leaves playback unchanged.
    pub fn set_speed(&mut self, speed: f64) {
        if !speed.is_finite() {
            warn!("Ignoring non-finite playback speed {}", speed);
            return;
        }
        self.speed = speed.clamp(0.1, 10.0);

        let event_duration = Duration::from_secs_f64(1.0 / (self.rate_hz * self.speed));
        self.interval = interval(event_duration);

        debug!("Playback speed set to {}x", self.speed);
    }

    /// Get current playback speed
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Events left to deliver
    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

#[async_trait::async_trait]
impl EventSource for ReplaySource {
    async fn next_event(&mut self) -> Result<Option<PeerEvent>> {
        if self.events.is_empty() {
            debug!("Reached end of replay");
            return Ok(None);
        }

        self.interval.tick().await;

        let event = self.events.pop_front();
        if let Some(event) = &event {
            trace!(peer = %event.peer(), remaining = self.events.len(), "Replay event");
        }
        Ok(event)
    }
}
