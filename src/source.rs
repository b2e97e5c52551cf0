//! Event source trait for inbound peer messages

use crate::Result;
use crate::types::PeerEvent;

/// Trait for inbound peer event sources
///
/// Sources abstract over where asynchronous peer messages come from (a
/// radio transport, a recorded session, a test script) and handle their
/// own pacing internally.
#[async_trait::async_trait]
pub trait EventSource: Send + 'static {
    /// Get the next peer event
    ///
    /// Returns:
    /// - `Ok(Some(event))` - Event received
    /// - `Ok(None)` - Source ended (normal termination)
    /// - `Err(e)` - Transient error; the caller may try again
    async fn next_event(&mut self) -> Result<Option<PeerEvent>>;
}
