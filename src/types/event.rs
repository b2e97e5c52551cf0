//! Asynchronous peer events delivered by a transport

use std::sync::Arc;

use super::PeerId;

/// One sensor-data packet received from a peer.
///
/// The sample batch is opaque here; decoding belongs to the consumer.
#[derive(Debug, Clone)]
pub struct SensorPacket {
    /// Peer the packet came from
    pub peer: PeerId,

    /// Raw sample batch (zero-copy via Arc)
    pub samples: Arc<[u8]>,
}

impl SensorPacket {
    /// Create a new sensor packet
    pub fn new(peer: PeerId, samples: Vec<u8>) -> Self {
        Self { peer, samples: samples.into() }
    }
}

/// Asynchronous message from a peer.
///
/// Only [`PeerEvent::SensorData`] drives session renewal; everything else
/// passes through the controller untouched.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// A streamed sensor-data packet
    SensorData(SensorPacket),

    /// The peer reported a collision
    Collision { peer: PeerId },

    /// Battery or charger state notification
    PowerNotification { peer: PeerId },

    /// Any other asynchronous message
    Other { peer: PeerId },
}

impl PeerEvent {
    /// The peer this event is attributed to.
    pub fn peer(&self) -> &PeerId {
        match self {
            PeerEvent::SensorData(packet) => &packet.peer,
            PeerEvent::Collision { peer }
            | PeerEvent::PowerNotification { peer }
            | PeerEvent::Other { peer } => peer,
        }
    }

    /// Check if this event carries sensor data.
    pub fn is_sensor_data(&self) -> bool {
        matches!(self, PeerEvent::SensorData(_))
    }
}

impl From<SensorPacket> for PeerEvent {
    fn from(packet: SensorPacket) -> Self {
        PeerEvent::SensorData(packet)
    }
}
