//! Session registry
//!
//! Maps each peer to at most one [`StreamingProfile`]. Every operation on a
//! peer runs under that peer's entry lock, and any command it implies is
//! queued on the [`CommandSink`] before the lock is released. Commands for
//! one peer therefore leave in the same order as the state changes that
//! produced them, while distinct peers never wait on each other beyond
//! shard contention.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use tracing::{debug, info};

use crate::command::CommandSink;
use crate::config::RenewalPolicy;
use crate::profile::StreamingProfile;
use crate::types::{PeerId, StreamingParams};

/// Active streaming sessions, keyed by peer.
pub struct SessionRegistry {
    sessions: DashMap<PeerId, StreamingProfile>,
    commands: Arc<dyn CommandSink>,
    policy: RenewalPolicy,
}

impl SessionRegistry {
    /// Create an empty registry issuing commands through `commands`.
    ///
    /// The sink must not call back into the registry.
    pub fn new(commands: Arc<dyn CommandSink>, policy: RenewalPolicy) -> Self {
        Self { sessions: DashMap::new(), commands, policy }
    }

    /// Start (or restart) a session and arm the peer.
    ///
    /// Any existing session for `peer` is discarded together with its
    /// renewal state. Returns the parameters sent on the wire.
    pub fn begin_session(&self, peer: &PeerId, requested: StreamingParams) -> StreamingParams {
        let profile = StreamingProfile::new(requested, &self.policy);
        let arm = profile.arm_params();

        match self.sessions.entry(peer.clone()) {
            Entry::Occupied(mut occupied) => {
                let previous = occupied.insert(profile);
                self.commands.send_streaming_config(peer, arm);
                debug!(
                    peer = %peer,
                    discarded_counter = previous.packet_counter(),
                    "Replaced existing streaming session"
                );
            }
            Entry::Vacant(vacant) => {
                let _entry = vacant.insert(profile);
                self.commands.send_streaming_config(peer, arm);
            }
        }

        info!(
            peer = %peer,
            divisor = arm.divisor,
            packet_frames = arm.packet_frames,
            sensor_mask = %arm.sensor_mask,
            packet_count = arm.packet_count,
            infinite = requested.packet_count == 0,
            "Streaming session started"
        );
        arm
    }

    /// Stop streaming on `peer` and drop its session.
    ///
    /// The stop command is sent whether or not a session existed. Returns
    /// the removed profile, if any.
    pub fn end_session(&self, peer: &PeerId) -> Option<StreamingProfile> {
        let removed = match self.sessions.entry(peer.clone()) {
            Entry::Occupied(occupied) => {
                self.commands.send_streaming_config(peer, StreamingParams::STOP);
                Some(occupied.remove())
            }
            Entry::Vacant(_vacant) => {
                self.commands.send_streaming_config(peer, StreamingParams::STOP);
                None
            }
        };

        match &removed {
            Some(profile) => info!(
                peer = %peer,
                packet_counter = profile.packet_counter(),
                "Streaming session ended"
            ),
            None => debug!(peer = %peer, "Stop sent to peer without a session"),
        }
        removed
    }

    /// Copy of the peer's current profile, if it has a session.
    pub fn profile_for(&self, peer: &PeerId) -> Option<StreamingProfile> {
        self.sessions.get(peer).map(|entry| entry.value().clone())
    }

    /// Run `f` on the peer's profile under its entry lock.
    ///
    /// Returns `None` without calling `f` if the peer has no session.
    pub(crate) fn with_session<R>(
        &self,
        peer: &PeerId,
        f: impl FnOnce(&mut StreamingProfile, &dyn CommandSink) -> R,
    ) -> Option<R> {
        let mut entry = self.sessions.get_mut(peer)?;
        Some(f(entry.value_mut(), self.commands.as_ref()))
    }

    /// Check if `peer` has an active session.
    pub fn contains(&self, peer: &PeerId) -> bool {
        self.sessions.contains_key(peer)
    }

    /// Peers with an active session, in no particular order.
    pub fn active_peers(&self) -> Vec<PeerId> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Renewal policy applied to new sessions.
    pub fn policy(&self) -> &RenewalPolicy {
        &self.policy
    }

    /// Sink the registry issues commands through.
    pub fn commands(&self) -> &Arc<dyn CommandSink> {
        &self.commands
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .field("policy", &self.policy)
            .finish()
    }
}
