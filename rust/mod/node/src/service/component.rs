use tracing::info;

use nodedb_core::{Author, TrackerError};
use nodedb_sql::Transaction;

use super::{clean, NodeDb};
use crate::history;
use crate::model::{
    AssemblyId, Component, ComponentId, ComponentStatus, HistoryRefs, Installation, MacRecord,
    MacRole, NewComponent, Operation, SlotKind,
};
use crate::store::Entities;

fn check_macs(new: &NewComponent) -> Result<(), TrackerError> {
    let kind = new.kind;
    let max = kind.max_nic_macs();
    if new.macs.len() > max {
        return Err(TrackerError::Malformed(match max {
            0 => format!("a {kind} has no MAC addresses"),
            1 => format!("a {kind} has a single MAC address"),
            n => format!("a {kind} has at most {n} MAC addresses"),
        }));
    }
    if new.ipmi.is_some() && !kind.has_ipmi() {
        return Err(TrackerError::Malformed(format!(
            "only motherboards have an IPMI MAC address, not a {kind}"
        )));
    }
    Ok(())
}

/// Refuse components that are not in service.
fn require_ok(c: &Component, action: &str) -> Result<(), TrackerError> {
    match c.status {
        ComponentStatus::Ok => Ok(()),
        ComponentStatus::Rma => Err(TrackerError::Conflict(format!(
            "cannot {action} {}: it is out for RMA",
            c.id
        ))),
        ComponentStatus::Gone => Err(TrackerError::Conflict(format!(
            "cannot {action} {}: it has been discarded",
            c.id
        ))),
    }
}

/// Take `component` out of its slot and leave it at `location`.
pub(super) fn uninstall_in(
    tx: &dyn Transaction,
    author: &Author,
    component: ComponentId,
    location: Option<&str>,
    note: Option<&str>,
) -> Result<Installation, TrackerError> {
    let store = Entities::new(tx);
    let mut c = store.component(component)?;
    let installation = store
        .installation_of(&c)?
        .ok_or_else(|| TrackerError::NotInstalled(format!("{component} is not installed in any node")))?;

    store.clear_slot(installation.assembly, installation.slot)?;
    c.location = clean(location);
    store.update_component(&c)?;
    history::record(
        tx,
        author,
        Operation::Del,
        HistoryRefs::installation(installation.assembly, component),
        note,
    )?;
    Ok(installation)
}

impl NodeDb {
    /// Register a new component with status OK.
    ///
    /// NIC MAC addresses take roles NIC0..NIC3 in the order given.
    pub fn create_component(
        &self,
        author: &Author,
        new: NewComponent,
        note: Option<&str>,
    ) -> Result<Component, TrackerError> {
        check_macs(&new)?;

        let component = self.atomic(|tx| {
            let store = Entities::new(tx);
            let id = store.insert_component(
                new.kind,
                clean(new.model.as_deref()).as_deref(),
                clean(new.serial.as_deref()).as_deref(),
                clean(new.location.as_deref()).as_deref(),
            )?;

            let roles = new.macs.iter().enumerate().map(|(i, mac)| (MacRole::nic(i), mac));
            for (role, address) in roles {
                let role = role.ok_or_else(|| TrackerError::Malformed("too many MAC addresses".into()))?;
                store.insert_mac(&MacRecord { address: *address, component: id, role })?;
            }
            if let Some(address) = new.ipmi {
                store.insert_mac(&MacRecord { address, component: id, role: MacRole::Ipmi })?;
            }

            history::record(tx, author, Operation::Add, HistoryRefs::component(id), note)?;
            store.component(id)
        })?;

        info!(component = %component.id, kind = %component.kind, author = %author, "created component");
        Ok(component)
    }

    /// Put `component` into `slot` of `assembly`.
    pub fn install(
        &self,
        author: &Author,
        assembly: AssemblyId,
        slot: SlotKind,
        component: ComponentId,
        note: Option<&str>,
    ) -> Result<Installation, TrackerError> {
        let installation = self.atomic(|tx| {
            let store = Entities::new(tx);
            let node = store.assembly(assembly)?;
            let mut c = store.component(component)?;
            if node.retired {
                return Err(TrackerError::Conflict(format!("{assembly} is retired")));
            }
            if !node.kind.has_slot(slot) {
                return Err(TrackerError::Conflict(format!(
                    "a {} has no {slot} slot",
                    node.kind
                )));
            }
            if let Some(occupant) = node.occupant(slot) {
                return Err(TrackerError::Conflict(format!(
                    "slot {slot} of {assembly} already holds {occupant}"
                )));
            }

            require_ok(&c, "install")?;
            if !slot.accepts(c.kind) {
                return Err(TrackerError::Conflict(format!(
                    "a {} cannot go in a {slot} slot",
                    c.kind
                )));
            }
            if let Some(current) = store.installation_of(&c)? {
                return Err(TrackerError::Conflict(format!(
                    "{component} is already installed in slot {} of {}",
                    current.slot, current.assembly
                )));
            }

            store.set_slot(assembly, slot, component)?;
            c.location = None;
            store.update_component(&c)?;
            history::record(
                tx,
                author,
                Operation::Add,
                HistoryRefs::installation(assembly, component),
                note,
            )?;
            Ok(Installation { assembly, slot })
        })?;

        info!(component = %component, node = %assembly, slot = %slot, author = %author, "installed component");
        Ok(installation)
    }

    /// Take `component` out of the node it is installed in.
    pub fn uninstall(
        &self,
        author: &Author,
        component: ComponentId,
        location: Option<&str>,
        note: Option<&str>,
    ) -> Result<Installation, TrackerError> {
        let installation = self.atomic(|tx| uninstall_in(tx, author, component, location, note))?;

        info!(
            component = %component,
            node = %installation.assembly,
            slot = %installation.slot,
            author = %author,
            "uninstalled component"
        );
        Ok(installation)
    }

    /// Record that an uninstalled component now lives at `location`. The
    /// NOP history entry carries `note` verbatim.
    pub fn move_component(
        &self,
        author: &Author,
        component: ComponentId,
        location: &str,
        note: &str,
    ) -> Result<Component, TrackerError> {
        let location = clean(Some(location))
            .ok_or_else(|| TrackerError::Malformed("new location is empty".into()))?;
        if note.trim().is_empty() {
            return Err(TrackerError::Malformed("a move needs a note".into()));
        }

        let moved = self.atomic(|tx| {
            let store = Entities::new(tx);
            let mut c = store.component(component)?;
            if c.status == ComponentStatus::Gone {
                return Err(TrackerError::Conflict(format!("{component} has been discarded")));
            }
            if let Some(current) = store.installation_of(&c)? {
                return Err(TrackerError::Conflict(format!(
                    "{component} is installed in {}; uninstall it instead",
                    current.assembly
                )));
            }

            c.location = Some(location);
            store.update_component(&c)?;
            history::record(tx, author, Operation::Nop, HistoryRefs::component(component), Some(note))?;
            Ok(c)
        })?;

        info!(component = %component, author = %author, "moved component");
        Ok(moved)
    }

    /// Mark a component GONE. An installed component is refused unless
    /// `force_uninstall` is set, in which case it is uninstalled first.
    pub fn discard_component(
        &self,
        author: &Author,
        component: ComponentId,
        force_uninstall: bool,
        note: Option<&str>,
    ) -> Result<Component, TrackerError> {
        let discarded = self.atomic(|tx| {
            let store = Entities::new(tx);
            let c = store.component(component)?;
            match c.status {
                ComponentStatus::Gone => {
                    return Err(TrackerError::Conflict(format!("{component} is already discarded")));
                }
                ComponentStatus::Rma => {
                    return Err(TrackerError::Conflict(format!("{component} is out for RMA")));
                }
                ComponentStatus::Ok => {}
            }

            if let Some(current) = store.installation_of(&c)? {
                if !force_uninstall {
                    return Err(TrackerError::Conflict(format!(
                        "{component} is installed in slot {} of {}",
                        current.slot, current.assembly
                    )));
                }
                uninstall_in(tx, author, component, None, note)?;
            }

            let mut c = store.component(component)?;
            c.status = ComponentStatus::Gone;
            store.update_component(&c)?;
            history::record(tx, author, Operation::Del, HistoryRefs::component(component), note)?;
            Ok(c)
        })?;

        info!(component = %component, author = %author, "discarded component");
        Ok(discarded)
    }
}
