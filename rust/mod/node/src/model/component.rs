use serde::{Deserialize, Serialize};

use crate::ident::{ComponentId, MacAddress};
use super::SlotKind;

/// Kind of hardware part.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentKind {
    #[default]
    Cpu,
    Gpu,
    Motherboard,
    Nic,
    Ram,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 5] = [
        Self::Cpu,
        Self::Gpu,
        Self::Motherboard,
        Self::Nic,
        Self::Ram,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Gpu => "GPU",
            Self::Motherboard => "MOTHERBOARD",
            Self::Nic => "NIC",
            Self::Ram => "RAM",
        }
    }

    /// Case-insensitive; `MB` is accepted for motherboards.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CPU" => Some(Self::Cpu),
            "GPU" => Some(Self::Gpu),
            "MOTHERBOARD" | "MB" => Some(Self::Motherboard),
            "NIC" => Some(Self::Nic),
            "RAM" | "DIMM" => Some(Self::Ram),
            _ => None,
        }
    }

    /// The slot kinds a component of this kind may occupy.
    pub fn legal_slots(&self) -> &'static [SlotKind] {
        use SlotKind::*;
        match self {
            Self::Motherboard => &[Motherboard],
            Self::Cpu => &[Cpu0, Cpu1],
            Self::Gpu => &[Gpu0, Gpu1],
            Self::Nic => &[Nic],
            Self::Ram => &[Ram0, Ram1, Ram2, Ram3, Ram4, Ram5, Ram6, Ram7],
        }
    }

    /// How many NIC MAC addresses (NIC0, NIC1, ...) the part can carry.
    pub fn max_nic_macs(&self) -> usize {
        match self {
            Self::Motherboard => 4,
            Self::Nic => 1,
            Self::Cpu | Self::Gpu | Self::Ram => 0,
        }
    }

    /// Only motherboards carry an IPMI controller.
    pub fn has_ipmi(&self) -> bool {
        matches!(self, Self::Motherboard)
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational status of a component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentStatus {
    /// In use, or available for use.
    #[default]
    Ok,
    /// Sent back to the vendor.
    Rma,
    /// Discarded. Terminal.
    Gone,
}

impl ComponentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Rma => "RMA",
            Self::Gone => "GONE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "OK" => Some(Self::Ok),
            "RMA" => Some(Self::Rma),
            "GONE" => Some(Self::Gone),
            _ => None,
        }
    }
}

impl std::fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hardware part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: ComponentId,

    pub kind: ComponentKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,

    #[serde(default)]
    pub status: ComponentStatus,

    /// Where the part is, when it is not installed in a node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Which interface of a component a MAC address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MacRole {
    Nic0,
    Nic1,
    Nic2,
    Nic3,
    Ipmi,
}

impl MacRole {
    /// NIC role for the `n`th address in a creation request.
    pub fn nic(n: usize) -> Option<Self> {
        match n {
            0 => Some(Self::Nic0),
            1 => Some(Self::Nic1),
            2 => Some(Self::Nic2),
            3 => Some(Self::Nic3),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nic0 => "NIC0",
            Self::Nic1 => "NIC1",
            Self::Nic2 => "NIC2",
            Self::Nic3 => "NIC3",
            Self::Ipmi => "IPMI",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "NIC0" => Some(Self::Nic0),
            "NIC1" => Some(Self::Nic1),
            "NIC2" => Some(Self::Nic2),
            "NIC3" => Some(Self::Nic3),
            "IPMI" => Some(Self::Ipmi),
            _ => None,
        }
    }
}

impl std::fmt::Display for MacRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A MAC address owned by a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacRecord {
    pub address: MacAddress,
    pub component: ComponentId,
    pub role: MacRole,
}

/// Input for creating a component.
#[derive(Debug, Clone, Default)]
pub struct NewComponent {
    pub kind: ComponentKind,
    pub serial: Option<String>,
    pub model: Option<String>,
    pub location: Option<String>,
    /// NIC MAC addresses, assigned NIC0..NIC3 in order.
    pub macs: Vec<MacAddress>,
    pub ipmi: Option<MacAddress>,
}
