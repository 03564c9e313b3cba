//! Record numbers.
//!
//! A record number is a case-insensitive type letter, a number sign, and one
//! or more decimal digits. Leading zeros may be omitted:
//!
//! ```text
//! C#332   c#000332   - components
//! H#20432 h#00020432 - history entries
//! N#1987  n#01987    - nodes
//! R#101   r#0101     - RMA records
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use nodedb_core::TrackerError;

/// Entity type named by a record number's letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordKind {
    Component,
    Assembly,
    History,
    Rma,
}

impl RecordKind {
    pub fn letter(&self) -> char {
        match self {
            RecordKind::Component => 'C',
            RecordKind::Assembly => 'N',
            RecordKind::History => 'H',
            RecordKind::Rma => 'R',
        }
    }

    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'C' => Some(RecordKind::Component),
            'N' => Some(RecordKind::Assembly),
            'H' => Some(RecordKind::History),
            'R' => Some(RecordKind::Rma),
            _ => None,
        }
    }

    pub fn noun(&self) -> &'static str {
        match self {
            RecordKind::Component => "component",
            RecordKind::Assembly => "node",
            RecordKind::History => "history record",
            RecordKind::Rma => "RMA record",
        }
    }
}

/// A parsed record number, e.g. `C#000332`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordNumber {
    pub kind: RecordKind,
    pub id: i64,
}

/// The record kind if `token` starts with a known letter followed by `#`.
pub fn record_prefix(token: &str) -> Option<RecordKind> {
    let mut chars = token.chars();
    let letter = chars.next()?;
    if chars.next()? != '#' {
        return None;
    }
    RecordKind::from_letter(letter)
}

pub fn parse_record_number(token: &str) -> Result<RecordNumber, TrackerError> {
    let malformed = || {
        TrackerError::Malformed(format!(
            "bad record number {token:?}: expected a type letter (C, N, H, R), '#', and digits"
        ))
    };

    let kind = record_prefix(token).ok_or_else(malformed)?;
    let digits = &token[2..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let id = digits.parse::<i64>().map_err(|_| malformed())?;
    Ok(RecordNumber { kind, id })
}

impl FromStr for RecordNumber {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_record_number(s)
    }
}

impl fmt::Display for RecordNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{:06}", self.kind.letter(), self.id)
    }
}

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn record_number(&self) -> RecordNumber {
                RecordNumber { kind: $kind, id: self.0 }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.record_number(), f)
            }
        }
    };
}

record_id!(
    /// Primary identity of a component.
    ComponentId,
    RecordKind::Component
);
record_id!(
    /// Primary identity of a node.
    AssemblyId,
    RecordKind::Assembly
);
record_id!(HistoryId, RecordKind::History);
record_id!(RmaId, RecordKind::Rma);

/// A resolved reference to any tracked entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityRef {
    Component(ComponentId),
    Assembly(AssemblyId),
    History(HistoryId),
    Rma(RmaId),
}

impl EntityRef {
    pub fn record_number(&self) -> RecordNumber {
        match self {
            EntityRef::Component(id) => id.record_number(),
            EntityRef::Assembly(id) => id.record_number(),
            EntityRef::History(id) => id.record_number(),
            EntityRef::Rma(id) => id.record_number(),
        }
    }
}

impl From<RecordNumber> for EntityRef {
    fn from(rn: RecordNumber) -> Self {
        match rn.kind {
            RecordKind::Component => EntityRef::Component(ComponentId(rn.id)),
            RecordKind::Assembly => EntityRef::Assembly(AssemblyId(rn.id)),
            RecordKind::History => EntityRef::History(HistoryId(rn.id)),
            RecordKind::Rma => EntityRef::Rma(RmaId(rn.id)),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.record_number(), f)
    }
}
