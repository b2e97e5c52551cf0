//! Event source implementations

pub mod channel;
pub mod replay;

pub use channel::ChannelSource;
pub use replay::ReplaySource;
