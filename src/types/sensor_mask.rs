//! SensorMask type for selecting streamed data sources

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Bit-set of sensor data sources included in each streamed sample.
///
/// The low 32 bits mirror the peer's first mask word and the high 32 bits
/// its second word. The session controller never interprets the bits; the
/// named constants exist for callers building a mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(transparent)]
pub struct SensorMask(pub u64);

impl SensorMask {
    pub const ACCELEROMETER_X_FILTERED: Self = Self(0x0000_8000);
    pub const ACCELEROMETER_Y_FILTERED: Self = Self(0x0000_4000);
    pub const ACCELEROMETER_Z_FILTERED: Self = Self(0x0000_2000);
    pub const ACCELEROMETER_FILTERED_ALL: Self = Self(0x0000_E000);

    pub const IMU_PITCH_FILTERED: Self = Self(0x0004_0000);
    pub const IMU_ROLL_FILTERED: Self = Self(0x0002_0000);
    pub const IMU_YAW_FILTERED: Self = Self(0x0001_0000);
    pub const IMU_ANGLES_FILTERED_ALL: Self = Self(0x0007_0000);

    pub const QUATERNION_Q0: Self = Self(0x8000_0000_0000_0000);
    pub const QUATERNION_Q1: Self = Self(0x4000_0000_0000_0000);
    pub const QUATERNION_Q2: Self = Self(0x2000_0000_0000_0000);
    pub const QUATERNION_Q3: Self = Self(0x1000_0000_0000_0000);
    pub const QUATERNION_ALL: Self = Self(0xF000_0000_0000_0000);

    /// Create a mask from raw bits.
    pub const fn new(bits: u64) -> Self {
        Self(bits)
    }

    /// The mask selecting no sources.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Get the raw bits.
    pub const fn bits(&self) -> u64 {
        self.0
    }

    /// Check if no source is selected.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Check if any bit of `flag` is set.
    pub const fn has_flag(&self, flag: Self) -> bool {
        (self.0 & flag.0) != 0
    }

    /// Check if every bit of `other` is set.
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl BitOr for SensorMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for SensorMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for SensorMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for SensorMask {
    fn from(bits: u64) -> Self {
        Self(bits)
    }
}
