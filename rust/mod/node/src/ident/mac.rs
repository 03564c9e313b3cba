//! MAC addresses.
//!
//! A MAC address is a 48-bit number written as twelve hexadecimal digits,
//! optionally broken up by `:`, `-` or `.` into 6, 4, 3 or 2 equally sized
//! groups. Only one separator character may be used in an address. Hex
//! digits are case insensitive.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use nodedb_core::TrackerError;

const SEPARATORS: [char; 3] = [':', '-', '.'];
const GRAMMAR: &str =
    "expected 12 hex digits, optionally in 6, 4, 3 or 2 equal groups split by one of ':', '-', '.'";

/// A 48-bit hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress(u64);

impl MacAddress {
    pub const MAX: u64 = (1 << 48) - 1;

    pub fn from_u64(value: u64) -> Result<Self, TrackerError> {
        if value > Self::MAX {
            return Err(TrackerError::Malformed(format!(
                "{value:#x} does not fit in 48 bits"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Parse a MAC address in any of the accepted groupings.
pub fn parse_mac(text: &str) -> Result<MacAddress, TrackerError> {
    let malformed = |why: &str| TrackerError::Malformed(format!("invalid MAC address {text:?}: {why}; {GRAMMAR}"));

    let mut used = SEPARATORS.iter().filter(|s| text.contains(**s));
    let separator = used.next().copied();
    if used.next().is_some() {
        return Err(malformed("mixed separators"));
    }

    let digits: String = match separator {
        None => text.to_string(),
        Some(sep) => {
            let groups: Vec<&str> = text.split(sep).collect();
            if !matches!(groups.len(), 2 | 3 | 4 | 6) {
                return Err(malformed("wrong number of groups"));
            }
            let width = 12 / groups.len();
            if groups.iter().any(|g| g.len() != width) {
                return Err(malformed("unequal groups"));
            }
            groups.concat()
        }
    };

    if digits.len() != 12 {
        return Err(malformed("wrong length"));
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(malformed("not hexadecimal"));
    }

    u64::from_str_radix(&digits, 16)
        .map(MacAddress)
        .map_err(|_| malformed("not hexadecimal"))
}

impl FromStr for MacAddress {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_mac(s)
    }
}

impl TryFrom<String> for MacAddress {
    type Error = TrackerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_mac(&value)
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.to_string()
    }
}

/// `aa:bb:cc:dd:ee:ff`
impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0.to_be_bytes();
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[2], b[3], b[4], b[5], b[6], b[7]
        )
    }
}
