use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ident::{AssemblyId, ComponentId, RackSlot};
use super::ComponentKind;

// ---------------------------------------------------------------------------
// SlotKind
// ---------------------------------------------------------------------------

/// A named position on a node that holds at most one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotKind {
    Motherboard,
    Cpu0,
    Cpu1,
    Gpu0,
    Gpu1,
    Nic,
    Ram0,
    Ram1,
    Ram2,
    Ram3,
    Ram4,
    Ram5,
    Ram6,
    Ram7,
}

impl SlotKind {
    pub const ALL: [SlotKind; 14] = [
        Self::Motherboard,
        Self::Cpu0,
        Self::Cpu1,
        Self::Gpu0,
        Self::Gpu1,
        Self::Nic,
        Self::Ram0,
        Self::Ram1,
        Self::Ram2,
        Self::Ram3,
        Self::Ram4,
        Self::Ram5,
        Self::Ram6,
        Self::Ram7,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Motherboard => "MOTHERBOARD",
            Self::Cpu0 => "CPU0",
            Self::Cpu1 => "CPU1",
            Self::Gpu0 => "GPU0",
            Self::Gpu1 => "GPU1",
            Self::Nic => "NIC",
            Self::Ram0 => "RAM0",
            Self::Ram1 => "RAM1",
            Self::Ram2 => "RAM2",
            Self::Ram3 => "RAM3",
            Self::Ram4 => "RAM4",
            Self::Ram5 => "RAM5",
            Self::Ram6 => "RAM6",
            Self::Ram7 => "RAM7",
        }
    }

    /// Case-insensitive.
    pub fn from_str(s: &str) -> Option<Self> {
        let upper = s.to_ascii_uppercase();
        Self::ALL.into_iter().find(|k| k.as_str() == upper)
    }

    /// Whether a component of `kind` may occupy this slot.
    pub fn accepts(&self, kind: ComponentKind) -> bool {
        kind.legal_slots().contains(self)
    }
}

impl std::fmt::Display for SlotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AssemblyKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssemblyKind {
    #[default]
    GpuNode,
    FrbNode,
}

impl AssemblyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GpuNode => "GPU_NODE",
            Self::FrbNode => "FRB_NODE",
        }
    }

    /// Case-insensitive; the `_NODE` suffix may be omitted.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GPU_NODE" | "GPU" => Some(Self::GpuNode),
            "FRB_NODE" | "FRB" => Some(Self::FrbNode),
            _ => None,
        }
    }

    pub fn legal_slots(&self) -> &'static [SlotKind] {
        use SlotKind::*;
        match self {
            Self::GpuNode => &SlotKind::ALL,
            Self::FrbNode => &[
                Motherboard, Cpu0, Cpu1, Nic, Ram0, Ram1, Ram2, Ram3, Ram4, Ram5, Ram6, Ram7,
            ],
        }
    }

    pub fn has_slot(&self, slot: SlotKind) -> bool {
        self.legal_slots().contains(&slot)
    }

    /// Huts this kind of node is racked in: GPU nodes in N and S, FRB nodes
    /// in F.
    pub fn huts(&self) -> &'static [char] {
        match self {
            Self::GpuNode => &['n', 's'],
            Self::FrbNode => &['f'],
        }
    }

    pub fn fits(&self, rack_slot: &RackSlot) -> bool {
        self.huts().contains(&rack_slot.hut())
    }
}

impl std::fmt::Display for AssemblyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// A node built from components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assembly {
    pub id: AssemblyId,

    pub kind: AssemblyKind,

    pub serial: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rack_slot: Option<RackSlot>,

    /// Where the node is, when it is not in a rack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Every slot legal for `kind`, in slot order.
    pub slots: BTreeMap<SlotKind, Option<ComponentId>>,

    #[serde(default)]
    pub retired: bool,
}

impl Assembly {
    /// The empty slot map for a node of `kind`.
    pub fn empty_slots(kind: AssemblyKind) -> BTreeMap<SlotKind, Option<ComponentId>> {
        kind.legal_slots().iter().map(|s| (*s, None)).collect()
    }

    pub fn occupant(&self, slot: SlotKind) -> Option<ComponentId> {
        self.slots.get(&slot).copied().flatten()
    }

    /// Occupied slots and their components, in slot order.
    pub fn occupied(&self) -> Vec<(SlotKind, ComponentId)> {
        self.slots
            .iter()
            .filter_map(|(slot, c)| c.map(|c| (*slot, c)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.values().all(Option::is_none)
    }
}

/// Input for creating a node.
#[derive(Debug, Clone, Default)]
pub struct NewAssembly {
    pub kind: AssemblyKind,
    pub serial: String,
    pub location: Option<String>,
    /// Rack slot designator in any accepted spelling.
    pub rack_slot: Option<String>,
}

/// Where a node is: free-text location or a rack slot. Setting one clears
/// the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Placement {
    Location(String),
    RackSlot(RackSlot),
}

/// The slot a component occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    pub assembly: AssemblyId,
    pub slot: SlotKind,
}
