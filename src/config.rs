//! Bridge configuration
//!
//! Every field has a default, so a config file only needs to name what it
//! changes:
//!
//! ```yaml
//! renewal:
//!   total_packet_count: 200
//!   packet_count_threshold: 50
//! indicator_intensity: 1.0
//! counter_sink: watch
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::profile::{PACKET_COUNT_THRESHOLD, TOTAL_PACKET_COUNT};
use crate::{Result, StreamingError};

/// Quota renewal policy for infinite-mode sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenewalPolicy {
    /// Packet quota sent to the peer on every arm/re-arm
    pub total_packet_count: u8,

    /// Safety margin: renew once fewer than this many packets remain
    pub packet_count_threshold: u8,
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self { total_packet_count: TOTAL_PACKET_COUNT, packet_count_threshold: PACKET_COUNT_THRESHOLD }
    }
}

impl RenewalPolicy {
    /// Packets that may be observed after an arm before renewal is due.
    ///
    /// Renewal fires on the first packet whose count exceeds this value.
    pub fn renewal_point(&self) -> u32 {
        u32::from(self.total_packet_count) - u32::from(self.packet_count_threshold)
    }

    /// Check the policy can sustain infinite streaming.
    pub fn validate(&self) -> Result<()> {
        if self.total_packet_count == 0 {
            return Err(StreamingError::invalid_config(
                "total_packet_count must be positive; 0 would request unlimited packets",
            ));
        }
        if self.packet_count_threshold >= self.total_packet_count {
            return Err(StreamingError::invalid_config(format!(
                "packet_count_threshold ({}) must be below total_packet_count ({})",
                self.packet_count_threshold, self.total_packet_count
            )));
        }
        Ok(())
    }
}

/// Which counter sink the bridge publishes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterSinkKind {
    /// Log every counter value at trace level
    #[default]
    Tracing,

    /// Publish through a watch channel for stream subscribers
    Watch,

    /// Discard counter values
    None,
}

/// Command dispatcher tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Consecutive transport failures for one peer before it is reported
    /// unreachable. Commands for that peer are still attempted.
    pub max_consecutive_errors: u32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { max_consecutive_errors: 10 }
    }
}

/// Top-level configuration for a [`StreamingBridge`](crate::StreamingBridge).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Renewal policy for infinite sessions
    pub renewal: RenewalPolicy,

    /// Indicator intensity used by the continuous-streaming helpers
    pub indicator_intensity: f32,

    /// Where per-packet counter values go
    pub counter_sink: CounterSinkKind,

    /// Dispatcher tuning
    pub dispatcher: DispatcherConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            renewal: RenewalPolicy::default(),
            indicator_intensity: 1.0,
            counter_sink: CounterSinkKind::default(),
            dispatcher: DispatcherConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a YAML config.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: BridgeConfig = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| StreamingError::config_file_error(path.to_path_buf(), e))?;
        debug!(path = %path.display(), bytes = yaml.len(), "Loaded bridge config");
        Self::from_yaml(&yaml)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.renewal.validate()?;
        if !self.indicator_intensity.is_finite() {
            return Err(StreamingError::invalid_config("indicator_intensity must be finite"));
        }
        if self.dispatcher.max_consecutive_errors == 0 {
            return Err(StreamingError::invalid_config(
                "dispatcher.max_consecutive_errors must be at least 1",
            ));
        }
        Ok(())
    }
}
