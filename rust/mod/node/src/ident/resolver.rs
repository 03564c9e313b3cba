use nodedb_core::TrackerError;
use nodedb_sql::Executor;

use super::rack_slot::canonicalize_rack_slot;
use super::record::{
    parse_record_number, record_prefix, AssemblyId, ComponentId, EntityRef, RecordKind, RmaId,
};
use crate::store::Entities;

/// Resolves user-supplied tokens to entities that exist in the store.
///
/// A token that starts with a record prefix (`C#`, `N#`, `H#`, `R#`) is
/// always treated as a record number; anything else is a serial number.
pub struct Resolver<'a, E: Executor + ?Sized> {
    store: Entities<'a, E>,
}

impl<'a, E: Executor + ?Sized> Resolver<'a, E> {
    pub fn new(db: &'a E) -> Self {
        Self { store: Entities::new(db) }
    }

    /// Resolve a record number to an existing entity.
    pub fn resolve_record(&self, token: &str) -> Result<EntityRef, TrackerError> {
        let entity = EntityRef::from(parse_record_number(token.trim())?);
        match entity {
            EntityRef::Component(id) => self.store.component(id).map(|_| ()),
            EntityRef::Assembly(id) => self.store.assembly(id).map(|_| ()),
            EntityRef::History(id) => self.store.history(id).map(|_| ()),
            EntityRef::Rma(id) => self.store.rma(id).map(|_| ()),
        }?;
        Ok(entity)
    }

    /// Exact serial-number match against components and nodes.
    pub fn resolve_by_serial(&self, serial: &str) -> Result<EntityRef, TrackerError> {
        let serial = non_blank(serial)?;
        let component = self.store.component_by_serial(serial)?;
        let assembly = self.store.assembly_by_serial(serial)?;
        match (component, assembly) {
            (Some(c), None) => Ok(EntityRef::Component(c)),
            (None, Some(a)) => Ok(EntityRef::Assembly(a)),
            (Some(c), Some(a)) => Err(TrackerError::Conflict(format!(
                "serial {serial:?} names both {c} and {a}; use a record number"
            ))),
            (None, None) => Err(TrackerError::NotFound(format!(
                "no component or node has serial {serial:?}"
            ))),
        }
    }

    /// A component record number or component serial.
    pub fn component(&self, arg: &str) -> Result<ComponentId, TrackerError> {
        let arg = non_blank(arg)?;
        if record_prefix(arg).is_some() {
            let id = ComponentId(self.expect_kind(arg, RecordKind::Component)?);
            self.store.component(id)?;
            return Ok(id);
        }
        self.store
            .component_by_serial(arg)?
            .ok_or_else(|| TrackerError::NotFound(format!("no component has serial {arg:?}")))
    }

    /// A node record number, node serial, or the rack slot the node sits in.
    pub fn assembly(&self, arg: &str) -> Result<AssemblyId, TrackerError> {
        let arg = non_blank(arg)?;
        if record_prefix(arg).is_some() {
            let id = AssemblyId(self.expect_kind(arg, RecordKind::Assembly)?);
            self.store.assembly(id)?;
            return Ok(id);
        }
        if let Some(id) = self.store.assembly_by_serial(arg)? {
            return Ok(id);
        }
        if let Ok(slot) = canonicalize_rack_slot(arg) {
            if let Some(id) = self.store.assembly_at(&slot)? {
                return Ok(id);
            }
        }
        Err(TrackerError::NotFound(format!("no node has serial or rack slot {arg:?}")))
    }

    /// An RMA record number.
    pub fn rma(&self, arg: &str) -> Result<RmaId, TrackerError> {
        let arg = non_blank(arg)?;
        let id = RmaId(self.expect_kind(arg, RecordKind::Rma)?);
        self.store.rma(id)?;
        Ok(id)
    }

    /// Any record number, else a serial number.
    pub fn entity(&self, arg: &str) -> Result<EntityRef, TrackerError> {
        let arg = non_blank(arg)?;
        if record_prefix(arg).is_some() {
            return self.resolve_record(arg);
        }
        self.resolve_by_serial(arg)
    }

    fn expect_kind(&self, token: &str, want: RecordKind) -> Result<i64, TrackerError> {
        let rn = parse_record_number(token)?;
        if rn.kind != want {
            return Err(TrackerError::Malformed(format!(
                "{token:?} is a {} record number; expected a {} ({}#...)",
                rn.kind.noun(),
                want.noun(),
                want.letter()
            )));
        }
        Ok(rn.id)
    }
}

fn non_blank(arg: &str) -> Result<&str, TrackerError> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Err(TrackerError::Malformed("empty identifier".into()));
    }
    Ok(arg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodedb_sql::SqliteStore;

    use crate::ident::RackSlot;
    use crate::model::{AssemblyKind, ComponentKind};
    use crate::store::init_schema;

    struct Fixture {
        db: SqliteStore,
        cpu: ComponentId,
        node: AssemblyId,
    }

    fn fixture() -> Fixture {
        let db = SqliteStore::open_in_memory().unwrap();
        init_schema(&db).unwrap();
        let s = Entities::new(&db);
        let cpu = s.insert_component(ComponentKind::Cpu, None, Some("CPU-7"), None).unwrap();
        let slot: RackSlot = "cs3g2".parse().unwrap();
        let node = s
            .insert_assembly(AssemblyKind::GpuNode, "NODE-7", Some(&slot), None)
            .unwrap();
        // Same serial on a component and a node.
        s.insert_component(ComponentKind::Nic, None, Some("SHARED"), None).unwrap();
        s.insert_assembly(AssemblyKind::FrbNode, "SHARED", None, None).unwrap();
        Fixture { db, cpu, node }
    }

    #[test]
    fn record_numbers() {
        let f = fixture();
        let r = Resolver::new(&f.db);
        assert_eq!(r.resolve_record("c#1").unwrap(), EntityRef::Component(f.cpu));
        assert_eq!(r.resolve_record("N#000001").unwrap(), EntityRef::Assembly(f.node));
        assert!(matches!(r.resolve_record("C#404"), Err(TrackerError::NotFound(_))));
        assert!(matches!(r.resolve_record("H#1"), Err(TrackerError::NotFound(_))));
        assert!(matches!(r.resolve_record("C#x"), Err(TrackerError::Malformed(_))));
    }

    #[test]
    fn serials() {
        let f = fixture();
        let r = Resolver::new(&f.db);
        assert_eq!(r.resolve_by_serial("CPU-7").unwrap(), EntityRef::Component(f.cpu));
        assert_eq!(r.resolve_by_serial("NODE-7").unwrap(), EntityRef::Assembly(f.node));
        assert!(matches!(r.resolve_by_serial("nope"), Err(TrackerError::NotFound(_))));
        assert!(matches!(r.resolve_by_serial("SHARED"), Err(TrackerError::Conflict(_))));
        assert!(matches!(r.resolve_by_serial("  "), Err(TrackerError::Malformed(_))));
    }

    #[test]
    fn typed_arguments() {
        let f = fixture();
        let r = Resolver::new(&f.db);
        assert_eq!(r.component("CPU-7").unwrap(), f.cpu);
        assert_eq!(r.component("c#01").unwrap(), f.cpu);
        assert!(matches!(r.component("N#1"), Err(TrackerError::Malformed(_))));
        assert!(matches!(r.component("NODE-7"), Err(TrackerError::NotFound(_))));

        assert_eq!(r.assembly("NODE-7").unwrap(), f.node);
        assert_eq!(r.assembly("n#1").unwrap(), f.node);
        assert_eq!(r.assembly("s3g2").unwrap(), f.node);
        assert!(matches!(r.assembly("C#1"), Err(TrackerError::Malformed(_))));
        assert!(matches!(r.assembly("cn0g0"), Err(TrackerError::NotFound(_))));

        // A typed argument disambiguates a shared serial.
        assert!(r.component("SHARED").is_ok());
        assert!(r.assembly("SHARED").is_ok());
    }

    #[test]
    fn generic_entities() {
        let f = fixture();
        let r = Resolver::new(&f.db);
        assert_eq!(r.entity("C#1").unwrap(), EntityRef::Component(f.cpu));
        assert_eq!(r.entity("NODE-7").unwrap(), EntityRef::Assembly(f.node));
        assert!(matches!(r.entity("SHARED"), Err(TrackerError::Conflict(_))));
        assert!(matches!(r.rma("R#1"), Err(TrackerError::NotFound(_))));
        assert!(matches!(r.rma("C#1"), Err(TrackerError::Malformed(_))));
    }
}
