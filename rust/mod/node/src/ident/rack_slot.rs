//! Rack slot designators.
//!
//! A rack slot is written, disregarding case, as:
//!
//! * an optional initial `c`
//! * the hut: one of `F`, `N`, `S`
//! * a hexadecimal rack number, `0` through `E`
//! * `n` for hut `F`, `g` for the other huts
//! * a decimal slot number, `0` through `9`
//!
//! The canonical form is `c` + hut (lower) + rack (upper) + separator + slot,
//! e.g. `cnAg1` or `cf3n1`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use nodedb_core::TrackerError;

const GRAMMAR: &str = "expected c[ns][0-E]g[0-9] or cf[0-E]n[0-9]";

/// A canonical rack slot designator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RackSlot(String);

impl RackSlot {
    /// Hut letter, lower case: `f`, `n` or `s`.
    pub fn hut(&self) -> char {
        self.0.as_bytes()[1] as char
    }

    /// Rack number, 0 through 14.
    pub fn rack(&self) -> u8 {
        hex_value(self.0.as_bytes()[2])
    }

    /// Slot number within the rack, 0 through 9.
    pub fn slot(&self) -> u8 {
        self.0.as_bytes()[4] - b'0'
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        _ => b.to_ascii_lowercase() - b'a' + 10,
    }
}

/// Validate `text` and return its canonical designator.
///
/// Canonicalising an already canonical designator returns it unchanged.
pub fn canonicalize_rack_slot(text: &str) -> Result<RackSlot, TrackerError> {
    let malformed = || TrackerError::Malformed(format!("invalid rack slot {text:?}: {GRAMMAR}"));

    let lower = text.to_ascii_lowercase();
    let b = lower.as_bytes();

    let offset = match b.first() {
        Some(b'c') => 1,
        Some(_) => 0,
        None => return Err(malformed()),
    };
    if b.len() != 4 + offset {
        return Err(malformed());
    }

    let hut = b[offset];
    if !matches!(hut, b'f' | b'n' | b's') {
        return Err(malformed());
    }

    let rack = b[offset + 1];
    if !matches!(rack, b'0'..=b'9' | b'a'..=b'e') {
        return Err(malformed());
    }

    let separator = if hut == b'f' { b'n' } else { b'g' };
    if b[offset + 2] != separator {
        return Err(malformed());
    }

    let slot = b[offset + 3];
    if !slot.is_ascii_digit() {
        return Err(malformed());
    }

    let canonical = [b'c', hut, rack.to_ascii_uppercase(), separator, slot];
    Ok(RackSlot(canonical.iter().map(|&c| c as char).collect()))
}

impl FromStr for RackSlot {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        canonicalize_rack_slot(s)
    }
}

impl TryFrom<String> for RackSlot {
    type Error = TrackerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        canonicalize_rack_slot(&value)
    }
}

impl From<RackSlot> for String {
    fn from(slot: RackSlot) -> Self {
        slot.0
    }
}

impl fmt::Display for RackSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
