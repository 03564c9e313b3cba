//! History logger.
//!
//! Every mutation writes exactly one history record through [`record`],
//! inside the transaction that performs the mutation. When the caller gives
//! no note for an ADD or DEL, one is derived from the operation and the
//! entities involved. NOP entries always carry the caller's note.

use nodedb_core::{now, Author, TrackerError};
use nodedb_sql::Executor;

use crate::model::{HistoryEntry, HistoryRecord, HistoryRefs, Operation};
use crate::store::Entities;

/// The generated note for `operation` over `refs`. NOP has none.
pub fn autonote(operation: Operation, refs: &HistoryRefs) -> Option<&'static str> {
    let rma = refs.rma.is_some();
    let assembly = refs.assembly.is_some();
    let component = refs.component.is_some();

    let note = match (operation, rma, assembly, component) {
        (Operation::Add, true, _, _) => "Sent component out for RMA.",
        (Operation::Del, true, _, _) => "Received component back from RMA.",
        (Operation::Add, false, false, _) => "Created component.",
        (Operation::Add, false, true, false) => "Created node.",
        (Operation::Add, false, true, true) => "Added component to node.",
        (Operation::Del, false, false, _) => "Retired component.",
        (Operation::Del, false, true, false) => "Retired node.",
        (Operation::Del, false, true, true) => "Removed component from node.",
        (Operation::Nop, _, _, _) => return None,
    };
    Some(note)
}

/// Append a history record. Never opens or commits a transaction.
pub fn record<E: Executor + ?Sized>(
    db: &E,
    author: &Author,
    operation: Operation,
    refs: HistoryRefs,
    note: Option<&str>,
) -> Result<HistoryRecord, TrackerError> {
    let supplied = note.filter(|n| !n.trim().is_empty());
    let (note, generated) = match supplied {
        Some(n) => (n.to_string(), false),
        None => {
            let derived = autonote(operation, &refs).ok_or_else(|| {
                TrackerError::Malformed("a note is required for this history entry".into())
            })?;
            (derived.to_string(), true)
        }
    };

    Entities::new(db).insert_history(&HistoryEntry {
        operation,
        refs,
        author: author.clone(),
        timestamp: now(),
        autonote: generated,
        note,
    })
}
