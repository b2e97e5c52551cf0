//! Channel-fed event source
//!
//! Transports that run their own notification thread push events through
//! the sender half; sending never blocks that thread.

use tokio::sync::mpsc;

use crate::Result;
use crate::source::EventSource;
use crate::types::PeerEvent;

/// Event source backed by an unbounded channel.
#[derive(Debug)]
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<PeerEvent>,
}

impl ChannelSource {
    /// Create a source and the sender a transport delivers events through.
    ///
    /// The source ends once every sender is dropped and the queue drains.
    pub fn new() -> (mpsc::UnboundedSender<PeerEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

#[async_trait::async_trait]
impl EventSource for ChannelSource {
    async fn next_event(&mut self) -> Result<Option<PeerEvent>> {
        Ok(self.rx.recv().await)
    }
}
