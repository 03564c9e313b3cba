//! Tracked entities.

mod assembly;
mod component;
mod history;
mod rma;

pub use assembly::{Assembly, AssemblyKind, Installation, NewAssembly, Placement, SlotKind};
pub use component::{
    Component, ComponentKind, ComponentStatus, MacRecord, MacRole, NewComponent,
};
pub use history::{
    HistoryEntry, HistoryFilter, HistoryRecord, HistoryRefs, Operation, OperationCounts,
};
pub use rma::{RmaRecord, RmaShipment};

pub use crate::ident::{AssemblyId, ComponentId, HistoryId, RmaId};
