use tracing::info;

use nodedb_core::{Author, TrackerError};

use super::component::uninstall_in;
use super::{clean, NodeDb};
use crate::history;
use crate::ident::{canonicalize_rack_slot, RackSlot};
use crate::model::{Assembly, AssemblyId, AssemblyKind, HistoryRefs, NewAssembly, Operation, Placement};
use crate::store::Entities;

fn check_hut(kind: AssemblyKind, rack_slot: &RackSlot) -> Result<(), TrackerError> {
    if kind.fits(rack_slot) {
        return Ok(());
    }
    Err(TrackerError::Conflict(format!(
        "a {kind} cannot be racked in hut {} ({rack_slot})",
        rack_slot.hut().to_ascii_uppercase()
    )))
}

impl NodeDb {
    /// Register a new, empty node. It may be given a location or a rack
    /// slot, not both.
    pub fn create_assembly(
        &self,
        author: &Author,
        new: NewAssembly,
        note: Option<&str>,
    ) -> Result<Assembly, TrackerError> {
        let serial = clean(Some(&new.serial))
            .ok_or_else(|| TrackerError::Malformed("a node needs a serial number".into()))?;
        let location = clean(new.location.as_deref());
        let rack_slot = clean(new.rack_slot.as_deref())
            .map(|s| canonicalize_rack_slot(&s))
            .transpose()?;
        if location.is_some() && rack_slot.is_some() {
            return Err(TrackerError::Conflict(
                "a node is either at a location or in a rack slot, not both".into(),
            ));
        }
        if let Some(slot) = &rack_slot {
            check_hut(new.kind, slot)?;
        }

        let assembly = self.atomic(|tx| {
            let store = Entities::new(tx);
            let id = store.insert_assembly(new.kind, &serial, rack_slot.as_ref(), location.as_deref())?;
            history::record(tx, author, Operation::Add, HistoryRefs::assembly(id), note)?;
            store.assembly(id)
        })?;

        info!(node = %assembly.id, kind = %assembly.kind, author = %author, "created node");
        Ok(assembly)
    }

    /// Move a node to a free-text location or into a rack slot. Setting one
    /// clears the other. The NOP history entry carries `note` verbatim.
    pub fn move_assembly(
        &self,
        author: &Author,
        assembly: AssemblyId,
        placement: Placement,
        note: &str,
    ) -> Result<Assembly, TrackerError> {
        if note.trim().is_empty() {
            return Err(TrackerError::Malformed("a move needs a note".into()));
        }

        let moved = self.atomic(|tx| {
            let store = Entities::new(tx);
            let mut node = store.assembly(assembly)?;
            if node.retired {
                return Err(TrackerError::Conflict(format!("{assembly} is retired")));
            }

            match placement {
                Placement::Location(location) => {
                    let location = clean(Some(&location))
                        .ok_or_else(|| TrackerError::Malformed("new location is empty".into()))?;
                    node.location = Some(location);
                    node.rack_slot = None;
                }
                Placement::RackSlot(slot) => {
                    check_hut(node.kind, &slot)?;
                    if let Some(other) = store.assembly_at(&slot)? {
                        if other != assembly {
                            return Err(TrackerError::Conflict(format!(
                                "rack slot {slot} is taken by {other}"
                            )));
                        }
                    }
                    node.rack_slot = Some(slot);
                    node.location = None;
                }
            }

            store.update_assembly(&node)?;
            history::record(tx, author, Operation::Nop, HistoryRefs::assembly(assembly), Some(note))?;
            Ok(node)
        })?;

        info!(
            node = %assembly,
            rack_slot = ?moved.rack_slot.as_ref().map(|s| s.as_str()),
            location = ?moved.location,
            author = %author,
            "moved node"
        );
        Ok(moved)
    }

    /// Retire a node. An occupied node is refused unless `remove_all` is set,
    /// in which case every component is uninstalled to `location` first.
    /// A retired node gives up its rack slot.
    pub fn discard_assembly(
        &self,
        author: &Author,
        assembly: AssemblyId,
        remove_all: bool,
        location: Option<&str>,
        note: Option<&str>,
    ) -> Result<Assembly, TrackerError> {
        let retired = self.atomic(|tx| {
            let store = Entities::new(tx);
            let node = store.assembly(assembly)?;
            if node.retired {
                return Err(TrackerError::Conflict(format!("{assembly} is already retired")));
            }

            let occupied = node.occupied();
            if !occupied.is_empty() && !remove_all {
                return Err(TrackerError::Conflict(format!(
                    "{assembly} still holds {} component(s)",
                    occupied.len()
                )));
            }
            for (_, component) in occupied {
                uninstall_in(tx, author, component, location, note)?;
            }

            let mut node = store.assembly(assembly)?;
            node.retired = true;
            node.rack_slot = None;
            store.update_assembly(&node)?;
            history::record(tx, author, Operation::Del, HistoryRefs::assembly(assembly), note)?;
            Ok(node)
        })?;

        info!(node = %assembly, author = %author, "retired node");
        Ok(retired)
    }
}
