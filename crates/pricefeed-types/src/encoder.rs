//! Relay encoder selector.

use serde::{Deserialize, Serialize};

/// `keccak256("FixedPointABI")[..4]`.
pub const FIXED_POINT_ABI_PREFIX: [u8; 4] = [0xcb, 0xa0, 0xad, 0x5a];

/// `keccak256("TickABI")[..4]`.
pub const TICK_ABI_PREFIX: [u8; 4] = [0xdb, 0x99, 0xb2, 0xb3];

/// How prices are represented in a relay payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoder {
    /// Prices as 1e9-scaled integers.
    FixedPoint,
    /// Prices as offset ticks on the 1.0001 ladder.
    Tick,
}

impl Encoder {
    /// The 4-byte payload prefix identifying this encoding.
    pub fn prefix(self) -> [u8; 4] {
        match self {
            Self::FixedPoint => FIXED_POINT_ABI_PREFIX,
            Self::Tick => TICK_ABI_PREFIX,
        }
    }
}
