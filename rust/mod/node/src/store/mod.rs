//! Entity store: SQL persistence for components, nodes, MAC addresses, RMA
//! episodes and history.
//!
//! [`Entities`] borrows any [`Executor`], so the same code runs against the
//! bare store for reads and against an open transaction for mutations.

mod rows;
mod schema;

pub use schema::{init_schema, SCHEMA};

use chrono::{DateTime, Utc};
use tracing::warn;

use nodedb_core::{format_timestamp, TrackerError};
use nodedb_sql::{Executor, SQLError, Value};

use crate::ident::RackSlot;
use crate::model::{
    Assembly, AssemblyId, AssemblyKind, Component, ComponentId, ComponentKind, HistoryEntry,
    HistoryFilter, HistoryId, HistoryRecord, Installation, MacRecord, OperationCounts, RmaId,
    RmaRecord, RmaShipment, SlotKind,
};

/// Friendly messages for the constraints in [`SCHEMA`], matched against
/// SQLite's "UNIQUE constraint failed: <columns>" text.
const CONSTRAINT_MESSAGES: &[(&str, &str)] = &[
    ("component_mac.component, component_mac.role", "component already has a MAC address in that role"),
    ("component_mac.address", "MAC address is already registered"),
    ("component.serial", "component serial number is already in use"),
    ("node_slot.node, node_slot.slot", "slot is already occupied"),
    ("node_slot.component", "component is already installed"),
    ("node.serial", "node serial number is already in use"),
    ("node.rack_slot", "rack slot is already taken"),
    ("history records are immutable", "history records are immutable"),
];

/// Map a storage error into the tracker taxonomy. Constraint violations are
/// conflicts; anything else is internal.
pub fn storage_err(e: SQLError) -> TrackerError {
    match e {
        SQLError::Constraint(msg) => {
            let friendly = CONSTRAINT_MESSAGES
                .iter()
                .find(|(needle, _)| msg.contains(needle))
                .map(|(_, text)| (*text).to_string())
                .unwrap_or_else(|| format!("constraint violated: {msg}"));
            warn!(constraint = %msg, "store constraint reported as conflict");
            TrackerError::Conflict(friendly)
        }
        other => TrackerError::Internal(other.to_string()),
    }
}

fn id_value(id: i64) -> Value {
    Value::Integer(id)
}

fn time_value(ts: &DateTime<Utc>) -> Value {
    Value::Text(format_timestamp(ts))
}

fn returned_id(rows: &[nodedb_sql::Row]) -> Result<i64, TrackerError> {
    rows.first()
        .and_then(|r| r.get_i64("id"))
        .ok_or_else(|| TrackerError::Internal("insert returned no id".into()))
}

/// Typed access to the node tables through `db`.
pub struct Entities<'a, E: Executor + ?Sized> {
    db: &'a E,
}

impl<'a, E: Executor + ?Sized> Entities<'a, E> {
    pub fn new(db: &'a E) -> Self {
        Self { db }
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<nodedb_sql::Row>, TrackerError> {
        self.db.query(sql, params).map_err(storage_err)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, TrackerError> {
        self.db.exec(sql, params).map_err(storage_err)
    }

    // -----------------------------------------------------------------------
    // Components
    // -----------------------------------------------------------------------

    pub fn insert_component(
        &self,
        kind: ComponentKind,
        model: Option<&str>,
        serial: Option<&str>,
        location: Option<&str>,
    ) -> Result<ComponentId, TrackerError> {
        let rows = self.query(
            "INSERT INTO component (kind, model, serial, status, location) \
             VALUES (?1, ?2, ?3, 'OK', ?4) RETURNING id",
            &[
                Value::Text(kind.as_str().to_string()),
                Value::opt_text(model),
                Value::opt_text(serial),
                Value::opt_text(location),
            ],
        )?;
        returned_id(&rows).map(ComponentId)
    }

    pub fn component(&self, id: ComponentId) -> Result<Component, TrackerError> {
        let rows = self.query(
            "SELECT id, kind, model, serial, status, location FROM component WHERE id = ?1",
            &[id_value(id.0)],
        )?;
        let row = rows
            .first()
            .ok_or_else(|| TrackerError::NotFound(format!("component {id} does not exist")))?;
        rows::component(row)
    }

    pub fn component_by_serial(&self, serial: &str) -> Result<Option<ComponentId>, TrackerError> {
        let rows = self.query(
            "SELECT id FROM component WHERE serial = ?1",
            &[Value::Text(serial.to_string())],
        )?;
        Ok(rows.first().and_then(|r| r.get_i64("id")).map(ComponentId))
    }

    /// Write back the mutable columns of `c`.
    pub fn update_component(&self, c: &Component) -> Result<(), TrackerError> {
        let affected = self.exec(
            "UPDATE component SET model = ?1, serial = ?2, status = ?3, location = ?4 \
             WHERE id = ?5",
            &[
                Value::opt_text(c.model.as_deref()),
                Value::opt_text(c.serial.as_deref()),
                Value::Text(c.status.as_str().to_string()),
                Value::opt_text(c.location.as_deref()),
                id_value(c.id.0),
            ],
        )?;
        if affected == 0 {
            return Err(TrackerError::NotFound(format!("component {} does not exist", c.id)));
        }
        Ok(())
    }

    pub fn insert_mac(&self, mac: &MacRecord) -> Result<(), TrackerError> {
        self.exec(
            "INSERT INTO component_mac (address, component, role) VALUES (?1, ?2, ?3)",
            &[
                Value::Integer(mac.address.value() as i64),
                id_value(mac.component.0),
                Value::Text(mac.role.as_str().to_string()),
            ],
        )?;
        Ok(())
    }

    /// MAC addresses of `component`, NIC0 first and IPMI last.
    pub fn macs_of(&self, component: ComponentId) -> Result<Vec<MacRecord>, TrackerError> {
        let mut macs = self
            .query(
                "SELECT address, component, role FROM component_mac WHERE component = ?1",
                &[id_value(component.0)],
            )?
            .iter()
            .map(rows::mac)
            .collect::<Result<Vec<_>, _>>()?;
        macs.sort_by_key(|m| m.role);
        Ok(macs)
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    pub fn insert_assembly(
        &self,
        kind: AssemblyKind,
        serial: &str,
        rack_slot: Option<&RackSlot>,
        location: Option<&str>,
    ) -> Result<AssemblyId, TrackerError> {
        let rows = self.query(
            "INSERT INTO node (kind, serial, rack_slot, location, retired) \
             VALUES (?1, ?2, ?3, ?4, 0) RETURNING id",
            &[
                Value::Text(kind.as_str().to_string()),
                Value::Text(serial.to_string()),
                Value::opt_text(rack_slot.map(RackSlot::as_str)),
                Value::opt_text(location),
            ],
        )?;
        returned_id(&rows).map(AssemblyId)
    }

    /// Load a node together with its slot occupants.
    pub fn assembly(&self, id: AssemblyId) -> Result<Assembly, TrackerError> {
        let rows = self.query(
            "SELECT id, kind, serial, rack_slot, location, retired FROM node WHERE id = ?1",
            &[id_value(id.0)],
        )?;
        let row = rows
            .first()
            .ok_or_else(|| TrackerError::NotFound(format!("node {id} does not exist")))?;
        let mut assembly = rows::assembly(row)?;

        for row in self.query(
            "SELECT slot, component FROM node_slot WHERE node = ?1",
            &[id_value(id.0)],
        )? {
            let slot = row.get_str("slot").unwrap_or_default();
            let slot = SlotKind::from_str(slot).ok_or_else(|| {
                TrackerError::Internal(format!("unexpected value in node_slot.slot: {slot}"))
            })?;
            assembly.slots.insert(slot, row.get_i64("component").map(ComponentId));
        }
        Ok(assembly)
    }

    pub fn assembly_by_serial(&self, serial: &str) -> Result<Option<AssemblyId>, TrackerError> {
        let rows = self.query(
            "SELECT id FROM node WHERE serial = ?1",
            &[Value::Text(serial.to_string())],
        )?;
        Ok(rows.first().and_then(|r| r.get_i64("id")).map(AssemblyId))
    }

    pub fn assembly_at(&self, rack_slot: &RackSlot) -> Result<Option<AssemblyId>, TrackerError> {
        let rows = self.query(
            "SELECT id FROM node WHERE rack_slot = ?1",
            &[Value::Text(rack_slot.as_str().to_string())],
        )?;
        Ok(rows.first().and_then(|r| r.get_i64("id")).map(AssemblyId))
    }

    /// Write back placement and retirement. Slots are changed through
    /// [`Self::set_slot`] and [`Self::clear_slot`].
    pub fn update_assembly(&self, a: &Assembly) -> Result<(), TrackerError> {
        let affected = self.exec(
            "UPDATE node SET rack_slot = ?1, location = ?2, retired = ?3 WHERE id = ?4",
            &[
                Value::opt_text(a.rack_slot.as_ref().map(RackSlot::as_str)),
                Value::opt_text(a.location.as_deref()),
                Value::Integer(a.retired as i64),
                id_value(a.id.0),
            ],
        )?;
        if affected == 0 {
            return Err(TrackerError::NotFound(format!("node {} does not exist", a.id)));
        }
        Ok(())
    }

    pub fn set_slot(
        &self,
        assembly: AssemblyId,
        slot: SlotKind,
        component: ComponentId,
    ) -> Result<(), TrackerError> {
        self.exec(
            "INSERT INTO node_slot (node, slot, component) VALUES (?1, ?2, ?3)",
            &[
                id_value(assembly.0),
                Value::Text(slot.as_str().to_string()),
                id_value(component.0),
            ],
        )?;
        Ok(())
    }

    pub fn clear_slot(&self, assembly: AssemblyId, slot: SlotKind) -> Result<(), TrackerError> {
        self.exec(
            "DELETE FROM node_slot WHERE node = ?1 AND slot = ?2",
            &[id_value(assembly.0), Value::Text(slot.as_str().to_string())],
        )?;
        Ok(())
    }

    /// Where `component` is installed. Only the slot kinds legal for its kind
    /// are searched.
    pub fn installation_of(&self, component: &Component) -> Result<Option<Installation>, TrackerError> {
        let legal = component.kind.legal_slots();
        let placeholders: Vec<String> = (0..legal.len()).map(|i| format!("?{}", i + 2)).collect();
        let sql = format!(
            "SELECT node, slot FROM node_slot WHERE component = ?1 AND slot IN ({})",
            placeholders.join(", ")
        );
        let mut params = vec![id_value(component.id.0)];
        params.extend(legal.iter().map(|s| Value::Text(s.as_str().to_string())));

        let rows = self.query(&sql, &params)?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let slot = row.get_str("slot").and_then(SlotKind::from_str);
        match (row.get_i64("node"), slot) {
            (Some(node), Some(slot)) => Ok(Some(Installation { assembly: AssemblyId(node), slot })),
            _ => Err(TrackerError::Internal(format!(
                "unreadable node_slot row for component {}",
                component.id
            ))),
        }
    }

    // -----------------------------------------------------------------------
    // RMA
    // -----------------------------------------------------------------------

    pub fn insert_rma(&self, component: ComponentId, shipment: &RmaShipment) -> Result<RmaId, TrackerError> {
        let rows = self.query(
            "INSERT INTO rma (component, number, company, send_time) \
             VALUES (?1, ?2, ?3, ?4) RETURNING id",
            &[
                id_value(component.0),
                Value::opt_text(shipment.number.as_deref()),
                Value::opt_text(shipment.company.as_deref()),
                time_value(&shipment.send_time),
            ],
        )?;
        returned_id(&rows).map(RmaId)
    }

    pub fn rma(&self, id: RmaId) -> Result<RmaRecord, TrackerError> {
        let rows = self.query(
            "SELECT id, component, number, company, send_time, recv_time FROM rma WHERE id = ?1",
            &[id_value(id.0)],
        )?;
        let row = rows
            .first()
            .ok_or_else(|| TrackerError::NotFound(format!("RMA record {id} does not exist")))?;
        rows::rma(row)
    }

    pub fn set_rma_received(&self, id: RmaId, recv_time: &DateTime<Utc>) -> Result<(), TrackerError> {
        let affected = self.exec(
            "UPDATE rma SET recv_time = ?1 WHERE id = ?2 AND recv_time IS NULL",
            &[time_value(recv_time), id_value(id.0)],
        )?;
        if affected == 0 {
            return Err(TrackerError::Conflict(format!("RMA {id} has already been received")));
        }
        Ok(())
    }

    /// RMA episodes for `component`, oldest first.
    pub fn rmas_of(&self, component: ComponentId) -> Result<Vec<RmaRecord>, TrackerError> {
        self.query(
            "SELECT id, component, number, company, send_time, recv_time FROM rma \
             WHERE component = ?1 ORDER BY id",
            &[id_value(component.0)],
        )?
        .iter()
        .map(rows::rma)
        .collect()
    }

    pub fn outstanding_rma(&self, component: ComponentId) -> Result<Option<RmaRecord>, TrackerError> {
        let rows = self.query(
            "SELECT id, component, number, company, send_time, recv_time FROM rma \
             WHERE component = ?1 AND recv_time IS NULL ORDER BY id DESC LIMIT 1",
            &[id_value(component.0)],
        )?;
        rows.first().map(rows::rma).transpose()
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    pub fn insert_history(&self, entry: &HistoryEntry) -> Result<HistoryRecord, TrackerError> {
        let rows = self.query(
            "INSERT INTO history (operation, node, component, rma, author, timestamp, autonote, note) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) RETURNING id",
            &[
                Value::Text(entry.operation.as_str().to_string()),
                Value::opt_integer(entry.refs.assembly.map(|a| a.0)),
                Value::opt_integer(entry.refs.component.map(|c| c.0)),
                Value::opt_integer(entry.refs.rma.map(|r| r.0)),
                Value::Text(entry.author.as_str().to_string()),
                time_value(&entry.timestamp),
                Value::Integer(entry.autonote as i64),
                Value::Text(entry.note.clone()),
            ],
        )?;
        Ok(HistoryRecord {
            id: HistoryId(returned_id(&rows)?),
            operation: entry.operation,
            refs: entry.refs,
            author: entry.author.clone(),
            timestamp: entry.timestamp,
            autonote: entry.autonote,
            note: entry.note.clone(),
        })
    }

    pub fn history(&self, id: HistoryId) -> Result<HistoryRecord, TrackerError> {
        let rows = self.query(
            "SELECT id, operation, node, component, rma, author, timestamp, autonote, note \
             FROM history WHERE id = ?1",
            &[id_value(id.0)],
        )?;
        let row = rows
            .first()
            .ok_or_else(|| TrackerError::NotFound(format!("history record {id} does not exist")))?;
        rows::history(row)
    }

    /// Matching history records in ascending id order.
    pub fn query_history(&self, filter: &HistoryFilter) -> Result<Vec<HistoryRecord>, TrackerError> {
        let (where_sql, mut params) = history_where(
            filter.assembly,
            filter.component,
            filter.start.as_ref(),
            filter.end.as_ref(),
        );
        let mut sql = format!(
            "SELECT id, operation, node, component, rma, author, timestamp, autonote, note \
             FROM history {where_sql} ORDER BY id"
        );
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT ?{}", params.len() + 1));
            params.push(Value::Integer(limit as i64));
        }

        self.query(&sql, &params)?.iter().map(rows::history).collect()
    }

    pub fn count_operations(
        &self,
        start: Option<&DateTime<Utc>>,
        end: Option<&DateTime<Utc>>,
    ) -> Result<OperationCounts, TrackerError> {
        let (where_sql, params) = history_where(None, None, start, end);
        let rows = self.query(
            &format!("SELECT operation, COUNT(*) AS cnt FROM history {where_sql} GROUP BY operation"),
            &params,
        )?;

        let mut counts = OperationCounts::default();
        for row in rows {
            let n = row.get_i64("cnt").unwrap_or(0) as u64;
            match row.get_str("operation") {
                Some("ADD") => counts.add = n,
                Some("DEL") => counts.del = n,
                Some("NOP") => counts.nop = n,
                other => {
                    return Err(TrackerError::Internal(format!(
                        "unexpected value in history.operation: {other:?}"
                    )));
                }
            }
        }
        Ok(counts)
    }
}

/// WHERE clause for history filters; `start` inclusive, `end` exclusive.
fn history_where(
    assembly: Option<AssemblyId>,
    component: Option<ComponentId>,
    start: Option<&DateTime<Utc>>,
    end: Option<&DateTime<Utc>>,
) -> (String, Vec<Value>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let Some(a) = assembly {
        params.push(id_value(a.0));
        clauses.push(format!("node = ?{}", params.len()));
    }
    if let Some(c) = component {
        params.push(id_value(c.0));
        clauses.push(format!("component = ?{}", params.len()));
    }
    if let Some(ts) = start {
        params.push(time_value(ts));
        clauses.push(format!("timestamp >= ?{}", params.len()));
    }
    if let Some(ts) = end {
        params.push(time_value(ts));
        clauses.push(format!("timestamp < ?{}", params.len()));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    (where_sql, params)
}
