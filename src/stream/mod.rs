//! Stream utilities for counter observers

mod throttle;

pub use throttle::{Throttle, ThrottleExt};
