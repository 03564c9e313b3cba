//! Identifier parsing and resolution.

mod mac;
mod rack_slot;
mod record;
mod resolver;

pub use mac::{parse_mac, MacAddress};
pub use rack_slot::{canonicalize_rack_slot, RackSlot};
pub use record::{
    parse_record_number, record_prefix, AssemblyId, ComponentId, EntityRef, HistoryId,
    RecordKind, RecordNumber, RmaId,
};
pub use resolver::Resolver;
