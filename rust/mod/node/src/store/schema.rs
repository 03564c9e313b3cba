use nodedb_core::TrackerError;
use nodedb_sql::Executor;
use tracing::debug;

/// Tables for components, nodes, RMA episodes and history.
///
/// Uniqueness invariants live here as constraints; violations come back as
/// `SQLError::Constraint` and are turned into conflicts by the store.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS component (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    kind        TEXT NOT NULL CHECK (kind IN ('CPU', 'GPU', 'MOTHERBOARD', 'NIC', 'RAM')),
    model       TEXT,
    serial      TEXT UNIQUE,
    status      TEXT NOT NULL DEFAULT 'OK' CHECK (status IN ('OK', 'RMA', 'GONE')),
    location    TEXT
);

CREATE TABLE IF NOT EXISTS component_mac (
    address     INTEGER PRIMARY KEY,
    component   INTEGER NOT NULL REFERENCES component(id),
    role        TEXT NOT NULL CHECK (role IN ('NIC0', 'NIC1', 'NIC2', 'NIC3', 'IPMI')),
    UNIQUE (component, role)
);

CREATE TABLE IF NOT EXISTS node (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    kind        TEXT NOT NULL CHECK (kind IN ('GPU_NODE', 'FRB_NODE')),
    serial      TEXT NOT NULL UNIQUE,
    rack_slot   TEXT UNIQUE,
    location    TEXT,
    retired     INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS node_slot (
    node        INTEGER NOT NULL REFERENCES node(id),
    slot        TEXT NOT NULL,
    component   INTEGER NOT NULL UNIQUE REFERENCES component(id),
    PRIMARY KEY (node, slot)
);

CREATE TABLE IF NOT EXISTS rma (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    component   INTEGER NOT NULL REFERENCES component(id),
    number      TEXT,
    company     TEXT,
    send_time   TEXT NOT NULL,
    recv_time   TEXT
);
CREATE INDEX IF NOT EXISTS idx_rma_component ON rma(component);

CREATE TABLE IF NOT EXISTS history (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    operation   TEXT NOT NULL CHECK (operation IN ('ADD', 'DEL', 'NOP')),
    node        INTEGER REFERENCES node(id),
    component   INTEGER REFERENCES component(id),
    rma         INTEGER REFERENCES rma(id),
    author      TEXT NOT NULL,
    timestamp   TEXT NOT NULL,
    autonote    INTEGER NOT NULL,
    note        TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_history_node ON history(node);
CREATE INDEX IF NOT EXISTS idx_history_component ON history(component);
CREATE INDEX IF NOT EXISTS idx_history_timestamp ON history(timestamp);

CREATE TRIGGER IF NOT EXISTS history_no_update BEFORE UPDATE ON history
BEGIN
    SELECT RAISE(ABORT, 'history records are immutable');
END;
CREATE TRIGGER IF NOT EXISTS history_no_delete BEFORE DELETE ON history
BEGIN
    SELECT RAISE(ABORT, 'history records are immutable');
END;
";

/// Create any missing tables. Safe to run on every open.
pub fn init_schema<E: Executor + ?Sized>(db: &E) -> Result<(), TrackerError> {
    debug!("initialising node schema");
    db.exec_batch(SCHEMA)
        .map_err(|e| TrackerError::Internal(format!("node schema init: {e}")))
}
