//! Hardware tracking for cluster nodes.
//!
//! Components (CPUs, GPUs, motherboards, NICs, memory) are installed into
//! nodes, moved around, sent out for RMA and eventually discarded. Every
//! change is recorded as one immutable history entry in the same
//! transaction as the change itself.
//!
//! ```no_run
//! use nodedb::{Author, NodeDb, NewComponent, ComponentKind};
//!
//! let db = NodeDb::open_in_memory()?;
//! let me = Author::from_env();
//! let cpu = db.create_component(
//!     &me,
//!     NewComponent { kind: ComponentKind::Cpu, serial: Some("CPU-001".into()), ..Default::default() },
//!     None,
//! )?;
//! println!("created {}", cpu.id);
//! # Ok::<(), nodedb::TrackerError>(())
//! ```

pub mod history;
pub mod ident;
pub mod model;
pub mod service;
pub mod store;

pub use ident::{
    canonicalize_rack_slot, parse_mac, parse_record_number, EntityRef, MacAddress, RackSlot,
    RecordNumber, Resolver,
};
pub use model::*;
pub use nodedb_core::{Author, TrackerConfig, TrackerError};
pub use service::NodeDb;
