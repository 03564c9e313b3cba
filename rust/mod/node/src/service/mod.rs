//! Lifecycle manager.
//!
//! [`NodeDb`] is the state machine over components and nodes. Every mutating
//! operation takes the acting [`Author`] explicitly, runs as one transaction,
//! and writes its history record(s) inside that transaction. Any error rolls
//! the whole operation back.

mod assembly;
mod component;
mod rma;

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use nodedb_core::{Author, TrackerConfig, TrackerError};
use nodedb_sql::{SQLStore, SqliteStore, Transaction};

use crate::history;
use crate::ident::Resolver;
use crate::model::{
    Assembly, AssemblyId, Component, ComponentId, HistoryFilter, HistoryId, HistoryRecord,
    HistoryRefs, Installation, MacRecord, Operation, OperationCounts, RmaId, RmaRecord, SlotKind,
};
use crate::store::{init_schema, storage_err, Entities};

/// Trimmed text, or `None` when blank.
pub(crate) fn clean(text: Option<&str>) -> Option<String> {
    text.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string)
}

pub struct NodeDb {
    sql: Arc<dyn SQLStore>,
}

impl NodeDb {
    /// Wrap an existing store, creating the schema if needed.
    pub fn new(sql: Arc<dyn SQLStore>) -> Result<Self, TrackerError> {
        init_schema(&*sql)?;
        Ok(Self { sql })
    }

    pub fn open(path: &Path) -> Result<Self, TrackerError> {
        let store = SqliteStore::open(path).map_err(storage_err)?;
        info!(path = %path.display(), "opened node database");
        Self::new(Arc::new(store))
    }

    pub fn open_in_memory() -> Result<Self, TrackerError> {
        Self::new(Arc::new(SqliteStore::open_in_memory().map_err(storage_err)?))
    }

    pub fn from_config(config: &TrackerConfig) -> Result<Self, TrackerError> {
        Self::open(&config.resolve_db_path())
    }

    /// Run `f` in one transaction. Commits on `Ok`; an `Err` drops the
    /// transaction, which rolls it back.
    pub fn atomic<T>(
        &self,
        f: impl FnOnce(&dyn Transaction) -> Result<T, TrackerError>,
    ) -> Result<T, TrackerError> {
        let tx = self.sql.begin().map_err(storage_err)?;
        let out = f(&*tx)?;
        tx.commit().map_err(storage_err)?;
        Ok(out)
    }

    /// Read access outside any transaction.
    pub fn reader(&self) -> Entities<'_, dyn SQLStore> {
        Entities::new(&*self.sql)
    }

    pub fn resolver(&self) -> Resolver<'_, dyn SQLStore> {
        Resolver::new(&*self.sql)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn component(&self, id: ComponentId) -> Result<Component, TrackerError> {
        self.reader().component(id)
    }

    pub fn assembly(&self, id: AssemblyId) -> Result<Assembly, TrackerError> {
        self.reader().assembly(id)
    }

    pub fn rma(&self, id: RmaId) -> Result<RmaRecord, TrackerError> {
        self.reader().rma(id)
    }

    pub fn history_record(&self, id: HistoryId) -> Result<HistoryRecord, TrackerError> {
        self.reader().history(id)
    }

    pub fn macs_of(&self, component: ComponentId) -> Result<Vec<MacRecord>, TrackerError> {
        self.reader().component(component)?;
        self.reader().macs_of(component)
    }

    pub fn rmas_of(&self, component: ComponentId) -> Result<Vec<RmaRecord>, TrackerError> {
        self.reader().component(component)?;
        self.reader().rmas_of(component)
    }

    pub fn installation_of(&self, component: ComponentId) -> Result<Option<Installation>, TrackerError> {
        let store = self.reader();
        let c = store.component(component)?;
        store.installation_of(&c)
    }

    /// Installed components of a node, in slot order.
    pub fn components_in(&self, assembly: AssemblyId) -> Result<Vec<(SlotKind, Component)>, TrackerError> {
        let store = self.reader();
        store
            .assembly(assembly)?
            .occupied()
            .into_iter()
            .map(|(slot, id)| store.component(id).map(|c| (slot, c)))
            .collect()
    }

    pub fn query_history(&self, filter: &HistoryFilter) -> Result<Vec<HistoryRecord>, TrackerError> {
        self.reader().query_history(filter)
    }

    pub fn count_operations(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<OperationCounts, TrackerError> {
        self.reader().count_operations(start.as_ref(), end.as_ref())
    }

    // -----------------------------------------------------------------------
    // Notes
    // -----------------------------------------------------------------------

    /// Attach a free-text note to a node and/or component.
    pub fn annotate(
        &self,
        author: &Author,
        assembly: Option<AssemblyId>,
        component: Option<ComponentId>,
        note: &str,
    ) -> Result<HistoryRecord, TrackerError> {
        if note.trim().is_empty() {
            return Err(TrackerError::Malformed("annotation note is empty".into()));
        }
        if assembly.is_none() && component.is_none() {
            return Err(TrackerError::Malformed(
                "an annotation needs a node or a component".into(),
            ));
        }

        let record = self.atomic(|tx| {
            let store = Entities::new(tx);
            if let Some(a) = assembly {
                store.assembly(a)?;
            }
            if let Some(c) = component {
                store.component(c)?;
            }
            let refs = HistoryRefs { assembly, component, rma: None };
            history::record(tx, author, Operation::Nop, refs, Some(note))
        })?;

        info!(history = %record.id, author = %author, "annotated");
        Ok(record)
    }
}
