//! Row to model conversion.

use chrono::{DateTime, Utc};

use nodedb_core::{parse_timestamp, Author, TrackerError};
use nodedb_sql::Row;

use crate::ident::{canonicalize_rack_slot, MacAddress};
use crate::model::{
    Assembly, AssemblyId, AssemblyKind, Component, ComponentId, ComponentKind, ComponentStatus,
    HistoryId, HistoryRecord, HistoryRefs, MacRecord, MacRole, Operation, RmaId, RmaRecord,
};

fn corrupt(column: &str, value: impl std::fmt::Display) -> TrackerError {
    TrackerError::Internal(format!("unexpected value in {column}: {value}"))
}

fn text(row: &Row, column: &str) -> Result<String, TrackerError> {
    row.get_str(column)
        .map(str::to_string)
        .ok_or_else(|| corrupt(column, "NULL"))
}

fn opt_text(row: &Row, column: &str) -> Option<String> {
    row.get_str(column).map(str::to_string)
}

fn int(row: &Row, column: &str) -> Result<i64, TrackerError> {
    row.get_i64(column).ok_or_else(|| corrupt(column, "NULL"))
}

fn time(row: &Row, column: &str) -> Result<DateTime<Utc>, TrackerError> {
    let s = text(row, column)?;
    parse_timestamp(&s).map_err(|_| corrupt(column, s))
}

fn opt_time(row: &Row, column: &str) -> Result<Option<DateTime<Utc>>, TrackerError> {
    match row.get_str(column) {
        Some(s) => parse_timestamp(s).map(Some).map_err(|_| corrupt(column, s)),
        None => Ok(None),
    }
}

pub fn component(row: &Row) -> Result<Component, TrackerError> {
    let kind = text(row, "kind")?;
    let status = text(row, "status")?;
    Ok(Component {
        id: ComponentId(int(row, "id")?),
        kind: ComponentKind::from_str(&kind).ok_or_else(|| corrupt("component.kind", &kind))?,
        model: opt_text(row, "model"),
        serial: opt_text(row, "serial"),
        status: ComponentStatus::from_str(&status)
            .ok_or_else(|| corrupt("component.status", &status))?,
        location: opt_text(row, "location"),
    })
}

pub fn mac(row: &Row) -> Result<MacRecord, TrackerError> {
    let address = int(row, "address")?;
    let role = text(row, "role")?;
    Ok(MacRecord {
        address: MacAddress::from_u64(address as u64)
            .map_err(|_| corrupt("component_mac.address", address))?,
        component: ComponentId(int(row, "component")?),
        role: MacRole::from_str(&role).ok_or_else(|| corrupt("component_mac.role", &role))?,
    })
}

/// A node with every legal slot empty; the caller fills in `node_slot` rows.
pub fn assembly(row: &Row) -> Result<Assembly, TrackerError> {
    let kind = text(row, "kind")?;
    let kind = AssemblyKind::from_str(&kind).ok_or_else(|| corrupt("node.kind", &kind))?;
    let rack_slot = match row.get_str("rack_slot") {
        Some(s) => Some(canonicalize_rack_slot(s).map_err(|_| corrupt("node.rack_slot", s))?),
        None => None,
    };
    Ok(Assembly {
        id: AssemblyId(int(row, "id")?),
        kind,
        serial: text(row, "serial")?,
        rack_slot,
        location: opt_text(row, "location"),
        slots: Assembly::empty_slots(kind),
        retired: row.get_bool("retired").unwrap_or(false),
    })
}

pub fn rma(row: &Row) -> Result<RmaRecord, TrackerError> {
    Ok(RmaRecord {
        id: RmaId(int(row, "id")?),
        component: ComponentId(int(row, "component")?),
        number: opt_text(row, "number"),
        company: opt_text(row, "company"),
        send_time: time(row, "send_time")?,
        recv_time: opt_time(row, "recv_time")?,
    })
}

pub fn history(row: &Row) -> Result<HistoryRecord, TrackerError> {
    let operation = text(row, "operation")?;
    let author = text(row, "author")?;
    Ok(HistoryRecord {
        id: HistoryId(int(row, "id")?),
        operation: Operation::from_str(&operation)
            .ok_or_else(|| corrupt("history.operation", &operation))?,
        refs: HistoryRefs {
            assembly: row.get_i64("node").map(AssemblyId),
            component: row.get_i64("component").map(ComponentId),
            rma: row.get_i64("rma").map(RmaId),
        },
        author: Author::new(author.clone()).map_err(|_| corrupt("history.author", author))?,
        timestamp: time(row, "timestamp")?,
        autonote: row.get_bool("autonote").unwrap_or(false),
        note: text(row, "note")?,
    })
}
