use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nodedb_core::Author;

use crate::ident::{AssemblyId, ComponentId, HistoryId, RmaId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Add,
    Del,
    Nop,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Del => "DEL",
            Self::Nop => "NOP",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ADD" => Some(Self::Add),
            "DEL" => Some(Self::Del),
            "NOP" => Some(Self::Nop),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The entities a history record is about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assembly: Option<AssemblyId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<ComponentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rma: Option<RmaId>,
}

impl HistoryRefs {
    pub fn component(id: ComponentId) -> Self {
        Self { component: Some(id), ..Self::default() }
    }

    pub fn assembly(id: AssemblyId) -> Self {
        Self { assembly: Some(id), ..Self::default() }
    }

    pub fn installation(assembly: AssemblyId, component: ComponentId) -> Self {
        Self { assembly: Some(assembly), component: Some(component), rma: None }
    }

    pub fn rma(component: ComponentId, rma: RmaId) -> Self {
        Self { assembly: None, component: Some(component), rma: Some(rma) }
    }
}

/// An audit entry. Never updated or deleted once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: HistoryId,

    pub operation: Operation,

    #[serde(flatten)]
    pub refs: HistoryRefs,

    pub author: Author,

    pub timestamp: DateTime<Utc>,

    /// True when `note` was generated rather than supplied.
    pub autonote: bool,

    pub note: String,
}

/// A history record before it has been assigned an id.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub operation: Operation,
    pub refs: HistoryRefs,
    pub author: Author,
    pub timestamp: DateTime<Utc>,
    pub autonote: bool,
    pub note: String,
}

/// Filter for history queries. `start` is inclusive, `end` exclusive.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub assembly: Option<AssemblyId>,
    pub component: Option<ComponentId>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Number of history records per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationCounts {
    pub add: u64,
    pub del: u64,
    pub nop: u64,
}

impl OperationCounts {
    pub fn total(&self) -> u64 {
        self.add + self.del + self.nop
    }
}
