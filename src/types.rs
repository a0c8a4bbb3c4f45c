// 1.0: primitives. identities, timestamps, the call context every mutating entry point takes.
// amounts are plain fixed-point integers (see math.rs). identities and time are newtypes so
// the compiler catches a trader passed where a timestamp was expected.

use serde::{Deserialize, Serialize};
use std::fmt;

// identity of a trader, the updater, the feed, the collateral ledger or the market itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Address(pub u64);

impl Address {
    pub const ZERO: Address = Address(0);

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(pub u32);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset-{}", self.0)
    }
}

// Long = profit when the index goes up. Short = profit when it goes down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn of(size: i128) -> Option<Self> {
        match size {
            s if s > 0 => Some(Side::Long),
            s if s < 0 => Some(Side::Short),
            _ => None,
        }
    }
}

// 1.1: unix timestamp in seconds. always supplied by the caller, never read from the clock
// inside the engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    // saturates: a clock that went backwards integrates nothing.
    pub fn elapsed_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn plus(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match chrono::DateTime::from_timestamp(self.0 as i64, 0) {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%SZ")),
            None => write!(f, "{}s", self.0),
        }
    }
}

// 1.2: who is calling and when. passed explicitly instead of an ambient "current caller".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self { caller, now }
    }

    pub fn at(caller: Address, secs: u64) -> Self {
        Self::new(caller, Timestamp::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_from_sign() {
        assert_eq!(Side::of(5), Some(Side::Long));
        assert_eq!(Side::of(-5), Some(Side::Short));
        assert_eq!(Side::of(0), None);
    }

    #[test]
    fn elapsed_saturates_backwards() {
        let t0 = Timestamp::from_secs(100);
        let t1 = Timestamp::from_secs(160);
        assert_eq!(t1.elapsed_since(t0), 60);
        assert_eq!(t0.elapsed_since(t1), 0);
    }

    #[test]
    fn timestamp_display_is_iso() {
        assert_eq!(Timestamp::from_secs(0).to_string(), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address(7).is_zero());
    }
}
