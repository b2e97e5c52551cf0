//! Core value types shared by the session controller.
//!
//! ## Architecture
//!
//! - [`PeerId`] identifies one remote robot for the lifetime of its link
//! - [`SensorMask`] selects which sensor sources the peer packs into each sample
//! - [`StreamingParams`] is the parameter set of one "set streaming" command
//! - [`PeerEvent`] is what a transport hands us for every asynchronous peer message
//! - [`UpdateRate`] controls how often counter observers are woken
//!
//! ## Usage Example
//!
//! ```rust
//! use orbstream::types::{PeerId, SensorMask, StreamingParams};
//!
//! let peer = PeerId::new("sphero-RGB");
//! let mask = SensorMask::ACCELEROMETER_FILTERED_ALL | SensorMask::QUATERNION_ALL;
//! let params = StreamingParams::new(20, 1, mask, 0);
//!
//! assert!(params.sensor_mask.has_flag(SensorMask::ACCELEROMETER_X_FILTERED));
//! assert_eq!(params.packet_rate_hz(), 20.0);
//! assert_eq!(peer.as_str(), "sphero-RGB");
//! ```

mod event;
mod params;
mod peer;
mod sensor_mask;
mod update_rate;

// Re-export all public types
pub use event::{PeerEvent, SensorPacket};
pub use params::{MAX_SAMPLE_RATE_HZ, StreamingParams};
pub use peer::PeerId;
pub use sensor_mask::SensorMask;
pub use update_rate::UpdateRate;
