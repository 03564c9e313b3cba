use chrono::{DateTime, Utc};
use tracing::info;

use nodedb_core::{normalize_timestamp, Author, TrackerError};
use nodedb_sql::Transaction;

use super::{clean, NodeDb};
use crate::history;
use crate::model::{ComponentId, ComponentStatus, HistoryRefs, Operation, RmaId, RmaRecord, RmaShipment};
use crate::store::Entities;

fn receive_in(
    tx: &dyn Transaction,
    author: &Author,
    rma: RmaId,
    recv_time: DateTime<Utc>,
    note: Option<&str>,
) -> Result<RmaRecord, TrackerError> {
    let store = Entities::new(tx);
    let record = store.rma(rma)?;
    if let Some(received) = record.recv_time {
        return Err(TrackerError::Conflict(format!(
            "{rma} was already received on {received}"
        )));
    }
    let recv_time = normalize_timestamp(recv_time);
    if recv_time < record.send_time {
        return Err(TrackerError::Malformed(format!(
            "receive time {recv_time} is before send time {}",
            record.send_time
        )));
    }

    store.set_rma_received(rma, &recv_time)?;
    let mut component = store.component(record.component)?;
    component.status = ComponentStatus::Ok;
    store.update_component(&component)?;
    history::record(
        tx,
        author,
        Operation::Del,
        HistoryRefs::rma(record.component, rma),
        note,
    )?;
    store.rma(rma)
}

impl NodeDb {
    /// Send an uninstalled, in-service component back to its vendor.
    pub fn rma_out(
        &self,
        author: &Author,
        component: ComponentId,
        shipment: RmaShipment,
        note: Option<&str>,
    ) -> Result<RmaRecord, TrackerError> {
        let shipment = RmaShipment {
            number: clean(shipment.number.as_deref()),
            company: clean(shipment.company.as_deref()),
            send_time: normalize_timestamp(shipment.send_time),
        };

        let record = self.atomic(|tx| {
            let store = Entities::new(tx);
            let mut c = store.component(component)?;
            match c.status {
                ComponentStatus::Ok => {}
                ComponentStatus::Rma => {
                    return Err(TrackerError::Conflict(format!("{component} is already out for RMA")));
                }
                ComponentStatus::Gone => {
                    return Err(TrackerError::Conflict(format!("{component} has been discarded")));
                }
            }
            if let Some(current) = store.installation_of(&c)? {
                return Err(TrackerError::Conflict(format!(
                    "{component} is installed in {}; uninstall it first",
                    current.assembly
                )));
            }

            let rma = store.insert_rma(component, &shipment)?;
            c.status = ComponentStatus::Rma;
            store.update_component(&c)?;
            history::record(tx, author, Operation::Add, HistoryRefs::rma(component, rma), note)?;
            store.rma(rma)
        })?;

        info!(component = %component, rma = %record.id, author = %author, "sent component out for RMA");
        Ok(record)
    }

    /// Close an RMA episode: the component is back and in service.
    pub fn rma_in(
        &self,
        author: &Author,
        rma: RmaId,
        recv_time: DateTime<Utc>,
        note: Option<&str>,
    ) -> Result<RmaRecord, TrackerError> {
        let record = self.atomic(|tx| receive_in(tx, author, rma, recv_time, note))?;

        info!(component = %record.component, rma = %rma, author = %author, "received component back from RMA");
        Ok(record)
    }

    /// [`Self::rma_in`] for the component's outstanding RMA episode.
    pub fn rma_in_component(
        &self,
        author: &Author,
        component: ComponentId,
        recv_time: DateTime<Utc>,
        note: Option<&str>,
    ) -> Result<RmaRecord, TrackerError> {
        let record = self.atomic(|tx| {
            let store = Entities::new(tx);
            store.component(component)?;
            let open = store
                .outstanding_rma(component)?
                .ok_or_else(|| TrackerError::NotFound(format!("{component} has no outstanding RMA")))?;
            receive_in(tx, author, open.id, recv_time, note)
        })?;

        info!(component = %component, rma = %record.id, author = %author, "received component back from RMA");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::model::{ComponentKind, NewComponent};

    fn author() -> Author {
        Author::new("ops@bench").unwrap()
    }

    fn shipment(send_time: DateTime<Utc>) -> RmaShipment {
        RmaShipment { number: Some(" 77-1 ".into()), company: Some("Vendor".into()), send_time }
    }

    #[test]
    fn rma_by_component() {
        let db = NodeDb::open_in_memory().unwrap();
        let a = author();
        let c = db
            .create_component(&a, NewComponent { kind: ComponentKind::Gpu, ..Default::default() }, None)
            .unwrap();
        assert!(matches!(
            db.rma_in_component(&a, c.id, nodedb_core::now(), None),
            Err(TrackerError::NotFound(_))
        ));

        let sent = nodedb_core::now();
        let out = db.rma_out(&a, c.id, shipment(sent), None).unwrap();
        assert_eq!(out.number.as_deref(), Some("77-1"));
        assert!(out.is_outstanding());
        assert!(db.rma_out(&a, c.id, shipment(sent), None).unwrap_err().is_conflict());

        let back = db.rma_in_component(&a, c.id, sent + Duration::days(10), None).unwrap();
        assert_eq!(back.id, out.id);
        assert!(!back.is_outstanding());
        assert_eq!(db.component(c.id).unwrap().status, ComponentStatus::Ok);
    }

    #[test]
    fn receive_before_send_is_rejected() {
        let db = NodeDb::open_in_memory().unwrap();
        let a = author();
        let c = db
            .create_component(&a, NewComponent { kind: ComponentKind::Cpu, ..Default::default() }, None)
            .unwrap();
        let sent = nodedb_core::now();
        let out = db.rma_out(&a, c.id, shipment(sent), None).unwrap();
        let err = db.rma_in(&a, out.id, sent - Duration::hours(1), None).unwrap_err();
        assert!(matches!(err, TrackerError::Malformed(_)));
        assert_eq!(db.component(c.id).unwrap().status, ComponentStatus::Rma);
        assert!(db.rma(out.id).unwrap().is_outstanding());
    }

    #[test]
    fn discarded_components_cannot_ship() {
        let db = NodeDb::open_in_memory().unwrap();
        let a = author();
        let c = db
            .create_component(&a, NewComponent { kind: ComponentKind::Ram, ..Default::default() }, None)
            .unwrap();
        db.discard_component(&a, c.id, false, None).unwrap();
        let err = db.rma_out(&a, c.id, shipment(nodedb_core::now()), None).unwrap_err();
        assert!(err.to_string().contains("discarded"), "{err}");
        assert!(db.rmas_of(c.id).unwrap().is_empty());
    }
}
