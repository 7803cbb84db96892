//! Hardware address handling

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MacParseError {
    #[error("expected 12 hex digits, got {0}")]
    Length(usize),
    #[error("invalid MAC address '{0}'")]
    Invalid(String),
}

/// A 6-octet MAC address. Displays as `AA:BB:CC:DD:EE:FF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Build an address from the last six arcs of a BRIDGE-MIB forwarding
    /// table OID, where each arc is one octet in decimal.
    ///
    /// Returns `None` if fewer than six arcs are given or any of the last
    /// six does not fit in a byte.
    pub fn from_oid_arcs(arcs: &[u32]) -> Option<Self> {
        if arcs.len() < 6 {
            return None;
        }
        let mut octets = [0u8; 6];
        for (slot, arc) in octets.iter_mut().zip(&arcs[arcs.len() - 6..]) {
            *slot = u8::try_from(*arc).ok()?;
        }
        Some(Self(octets))
    }
}

impl std::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a, b, c, d, e, g
        )
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    /// Accepts any separator style (`aa:bb..`, `aa-bb..`, `aabb.ccdd.eeff`,
    /// bare hex) in either case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: Vec<u8> = s
            .bytes()
            .filter(|b| !matches!(b, b':' | b'-' | b'.' | b' '))
            .collect();

        if digits.len() != 12 {
            return Err(MacParseError::Length(digits.len()));
        }

        if !digits.iter().all(u8::is_ascii_hexdigit) {
            return Err(MacParseError::Invalid(s.to_string()));
        }

        let mut octets = [0u8; 6];
        for (slot, pair) in octets.iter_mut().zip(digits.chunks(2)) {
            *slot = (hex_value(pair[0]) << 4) | hex_value(pair[1]);
        }
        Ok(Self(octets))
    }
}

/// Value of one ASCII hex digit; callers check `is_ascii_hexdigit` first
fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
