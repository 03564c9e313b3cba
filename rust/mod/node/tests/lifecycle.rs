use chrono::{Duration, Utc};

use nodedb::{
    parse_mac, Assembly, AssemblyKind, Author, Component, ComponentKind, ComponentStatus,
    EntityRef, HistoryFilter, Installation, NewAssembly, NewComponent, NodeDb, Operation,
    OperationCounts, Placement, RmaShipment, SlotKind, TrackerError,
};

fn author() -> Author {
    Author::new("tech@hut-n").unwrap()
}

fn component(db: &NodeDb, kind: ComponentKind, serial: &str) -> Component {
    db.create_component(
        &author(),
        NewComponent {
            kind,
            serial: Some(serial.into()),
            location: Some("spares shelf".into()),
            ..Default::default()
        },
        None,
    )
    .unwrap()
}

fn node(db: &NodeDb, kind: AssemblyKind, serial: &str) -> Assembly {
    db.create_assembly(
        &author(),
        NewAssembly { kind, serial: serial.into(), location: Some("dock".into()), rack_slot: None },
        None,
    )
    .unwrap()
}

fn counts(db: &NodeDb) -> OperationCounts {
    db.count_operations(None, None).unwrap()
}

/// Assert `f` adds exactly one history record, written by `author()`.
fn one_record<T>(db: &NodeDb, op: Operation, f: impl FnOnce() -> T) -> T {
    let before = db.query_history(&HistoryFilter::default()).unwrap().len();
    let out = f();
    let after = db.query_history(&HistoryFilter::default()).unwrap();
    assert_eq!(after.len(), before + 1, "expected exactly one new history record");
    let last = after.last().unwrap();
    assert_eq!(last.operation, op);
    assert_eq!(last.author, author());
    out
}

#[test]
fn full_node_build() {
    let db = NodeDb::open_in_memory().unwrap();
    let a = author();

    let n = node(&db, AssemblyKind::GpuNode, "GN-0001");
    let mb = db
        .create_component(
            &a,
            NewComponent {
                kind: ComponentKind::Motherboard,
                serial: Some("MB-1".into()),
                macs: vec![parse_mac("aa:bb:cc:00:00:01").unwrap()],
                ipmi: Some(parse_mac("aabb.cc00.0002").unwrap()),
                ..Default::default()
            },
            None,
        )
        .unwrap();
    let cpu0 = component(&db, ComponentKind::Cpu, "CPU-A");
    let cpu1 = component(&db, ComponentKind::Cpu, "CPU-B");
    let gpu = component(&db, ComponentKind::Gpu, "GPU-A");
    let ram = component(&db, ComponentKind::Ram, "RAM-A");

    db.install(&a, n.id, SlotKind::Motherboard, mb.id, None).unwrap();
    db.install(&a, n.id, SlotKind::Cpu0, cpu0.id, None).unwrap();
    db.install(&a, n.id, SlotKind::Cpu1, cpu1.id, None).unwrap();
    db.install(&a, n.id, SlotKind::Gpu1, gpu.id, None).unwrap();
    db.install(&a, n.id, SlotKind::Ram5, ram.id, None).unwrap();

    let inside: Vec<_> = db
        .components_in(n.id)
        .unwrap()
        .into_iter()
        .map(|(slot, c)| (slot, c.serial.unwrap()))
        .collect();
    assert_eq!(
        inside,
        vec![
            (SlotKind::Motherboard, "MB-1".to_string()),
            (SlotKind::Cpu0, "CPU-A".to_string()),
            (SlotKind::Cpu1, "CPU-B".to_string()),
            (SlotKind::Gpu1, "GPU-A".to_string()),
            (SlotKind::Ram5, "RAM-A".to_string()),
        ]
    );
    // Installed components have no free-text location.
    assert_eq!(db.component(gpu.id).unwrap().location, None);

    let r = db.resolver();
    assert_eq!(r.entity("GPU-A").unwrap(), EntityRef::Component(gpu.id));
    assert_eq!(r.assembly(&n.id.to_string()).unwrap(), n.id);

    let history = db
        .query_history(&HistoryFilter { assembly: Some(n.id), ..Default::default() })
        .unwrap();
    let notes: Vec<_> = history.iter().map(|h| h.note.as_str()).collect();
    assert_eq!(notes[0], "Created node.");
    assert!(notes[1..].iter().all(|n| *n == "Added component to node."));
    assert_eq!(counts(&db), OperationCounts { add: 11, del: 0, nop: 0 });
}

#[test]
fn double_discard_conflicts_and_changes_nothing() {
    let db = NodeDb::open_in_memory().unwrap();
    let c = component(&db, ComponentKind::Nic, "NIC-1");

    let gone = one_record(&db, Operation::Del, || {
        db.discard_component(&author(), c.id, false, None).unwrap()
    });
    assert_eq!(gone.status, ComponentStatus::Gone);

    let before = counts(&db);
    let err = db.discard_component(&author(), c.id, false, None).unwrap_err();
    assert!(matches!(err, TrackerError::Conflict(ref m) if m.contains("already discarded")));
    assert_eq!(db.component(c.id).unwrap(), gone);
    assert_eq!(counts(&db), before);

    // Discarded parts cannot be installed.
    let n = node(&db, AssemblyKind::FrbNode, "FRB-1");
    assert!(db.install(&author(), n.id, SlotKind::Nic, c.id, None).unwrap_err().is_conflict());
}

#[test]
fn discard_installed_component() {
    let db = NodeDb::open_in_memory().unwrap();
    let n = node(&db, AssemblyKind::FrbNode, "FRB-1");
    let c = component(&db, ComponentKind::Cpu, "CPU-1");
    db.install(&author(), n.id, SlotKind::Cpu0, c.id, None).unwrap();

    let before = counts(&db);
    assert!(db.discard_component(&author(), c.id, false, None).unwrap_err().is_conflict());
    assert_eq!(counts(&db), before);
    assert_eq!(db.assembly(n.id).unwrap().occupant(SlotKind::Cpu0), Some(c.id));

    db.discard_component(&author(), c.id, true, Some("burnt")).unwrap();
    assert_eq!(db.component(c.id).unwrap().status, ComponentStatus::Gone);
    assert!(db.assembly(n.id).unwrap().is_empty());

    // Forced removal logs its own DEL before the retirement, with the same note.
    let tail = db
        .query_history(&HistoryFilter { component: Some(c.id), ..Default::default() })
        .unwrap();
    let tail: Vec<_> = tail.iter().rev().take(2).collect();
    assert_eq!(tail[0].refs.assembly, None);
    assert_eq!(tail[1].refs.assembly, Some(n.id));
    for h in tail {
        assert_eq!(h.operation, Operation::Del);
        assert_eq!(h.note, "burnt");
        assert!(!h.autonote);
    }
    assert_eq!(counts(&db).del, before.del + 2);
}

#[test]
fn install_into_occupied_slot() {
    let db = NodeDb::open_in_memory().unwrap();
    let n = node(&db, AssemblyKind::GpuNode, "GN-1");
    let first = component(&db, ComponentKind::Gpu, "GPU-1");
    let second = component(&db, ComponentKind::Gpu, "GPU-2");
    db.install(&author(), n.id, SlotKind::Gpu0, first.id, None).unwrap();

    let first_before = db.component(first.id).unwrap();
    let second_before = db.component(second.id).unwrap();
    let ops_before = counts(&db);

    let err = db.install(&author(), n.id, SlotKind::Gpu0, second.id, None).unwrap_err();
    assert!(matches!(err, TrackerError::Conflict(_)), "{err:?}");

    assert_eq!(db.component(first.id).unwrap(), first_before);
    assert_eq!(db.component(second.id).unwrap(), second_before);
    assert_eq!(db.installation_of(second.id).unwrap(), None);
    assert_eq!(db.assembly(n.id).unwrap().occupant(SlotKind::Gpu0), Some(first.id));
    assert_eq!(counts(&db), ops_before);
}

#[test]
fn uninstall_install_round_trip() {
    let db = NodeDb::open_in_memory().unwrap();
    let n = node(&db, AssemblyKind::GpuNode, "GN-1");
    let ram = component(&db, ComponentKind::Ram, "DIMM-1");
    db.install(&author(), n.id, SlotKind::Ram3, ram.id, None).unwrap();

    let node_before = db.assembly(n.id).unwrap();
    let ram_before = db.component(ram.id).unwrap();

    let removed = one_record(&db, Operation::Del, || {
        db.uninstall(&author(), ram.id, Some("ESD bag"), None).unwrap()
    });
    assert_eq!(removed, Installation { assembly: n.id, slot: SlotKind::Ram3 });
    assert_eq!(db.component(ram.id).unwrap().location.as_deref(), Some("ESD bag"));
    assert!(db.assembly(n.id).unwrap().is_empty());

    one_record(&db, Operation::Add, || {
        db.install(&author(), removed.assembly, removed.slot, ram.id, None).unwrap()
    });
    assert_eq!(db.assembly(n.id).unwrap(), node_before);
    assert_eq!(db.component(ram.id).unwrap(), ram_before);

    assert!(matches!(
        db.uninstall(&author(), component(&db, ComponentKind::Ram, "DIMM-2").id, None, None),
        Err(TrackerError::NotInstalled(_))
    ));
}

#[test]
fn every_operation_logs_once() {
    let db = NodeDb::open_in_memory().unwrap();
    let a = author();

    let n = one_record(&db, Operation::Add, || node(&db, AssemblyKind::FrbNode, "FRB-9"));
    let c = one_record(&db, Operation::Add, || component(&db, ComponentKind::Nic, "NIC-9"));
    one_record(&db, Operation::Add, || db.install(&a, n.id, SlotKind::Nic, c.id, None).unwrap());
    one_record(&db, Operation::Del, || db.uninstall(&a, c.id, None, None).unwrap());
    one_record(&db, Operation::Nop, || db.move_component(&a, c.id, "cage", "spares").unwrap());
    one_record(&db, Operation::Nop, || {
        db.move_assembly(&a, n.id, Placement::RackSlot("cf1n2".parse().unwrap()), "racked")
            .unwrap()
    });
    let rma = one_record(&db, Operation::Add, || {
        db.rma_out(
            &a,
            c.id,
            RmaShipment { number: None, company: None, send_time: Utc::now() },
            None,
        )
        .unwrap()
    });
    one_record(&db, Operation::Del, || {
        db.rma_in(&a, rma.id, Utc::now(), Some("tested good")).unwrap()
    });
    one_record(&db, Operation::Nop, || db.annotate(&a, Some(n.id), None, "label fixed").unwrap());
    one_record(&db, Operation::Del, || db.discard_component(&a, c.id, false, None).unwrap());
    one_record(&db, Operation::Del, || db.discard_assembly(&a, n.id, false, None, None).unwrap());

    let all = db.query_history(&HistoryFilter::default()).unwrap();
    let flags: Vec<_> = all.iter().map(|h| h.autonote).collect();
    assert_eq!(
        flags,
        vec![true, true, true, true, false, false, true, false, false, true, true]
    );
    assert_eq!(all[7].refs.rma, Some(rma.id));
    assert_eq!(all[7].refs.component, Some(c.id));
}

#[test]
fn rma_round_trip() {
    let db = NodeDb::open_in_memory().unwrap();
    let n = node(&db, AssemblyKind::GpuNode, "GN-1");
    let gpu = component(&db, ComponentKind::Gpu, "GPU-1");
    db.install(&author(), n.id, SlotKind::Gpu0, gpu.id, None).unwrap();

    let sent = Utc::now() - Duration::days(14);
    let shipment = RmaShipment {
        number: Some("RMA-5521".into()),
        company: Some("Acme".into()),
        send_time: sent,
    };
    let err = db.rma_out(&author(), gpu.id, shipment.clone(), None).unwrap_err();
    assert!(err.is_conflict(), "installed parts cannot ship: {err}");

    db.uninstall(&author(), gpu.id, Some("outbound"), None).unwrap();
    let out = db.rma_out(&author(), gpu.id, shipment, None).unwrap();
    assert_eq!(db.component(gpu.id).unwrap().status, ComponentStatus::Rma);
    assert!(db.install(&author(), n.id, SlotKind::Gpu0, gpu.id, None).unwrap_err().is_conflict());
    assert!(db.discard_component(&author(), gpu.id, true, None).unwrap_err().is_conflict());

    let received = Utc::now();
    let back = db.rma_in(&author(), out.id, received, None).unwrap();
    assert_eq!(db.component(gpu.id).unwrap().status, ComponentStatus::Ok);
    assert_eq!(back.send_time, out.send_time);
    assert!(back.recv_time.is_some());
    assert_eq!(db.rmas_of(gpu.id).unwrap(), vec![back.clone()]);

    let before = counts(&db);
    let err = db.rma_in(&author(), out.id, received, None).unwrap_err();
    assert!(matches!(err, TrackerError::Conflict(_)));
    assert_eq!(db.rma(out.id).unwrap(), back);
    assert_eq!(counts(&db), before);

    let notes: Vec<_> = db
        .query_history(&HistoryFilter { component: Some(gpu.id), ..Default::default() })
        .unwrap()
        .into_iter()
        .filter(|h| h.refs.rma.is_some())
        .map(|h| (h.operation, h.note))
        .collect();
    assert_eq!(
        notes,
        vec![
            (Operation::Add, "Sent component out for RMA.".to_string()),
            (Operation::Del, "Received component back from RMA.".to_string()),
        ]
    );
}

#[test]
fn discard_occupied_node_without_remove_all() {
    let db = NodeDb::open_in_memory().unwrap();
    let n = node(&db, AssemblyKind::FrbNode, "FRB-1");
    let mb = component(&db, ComponentKind::Motherboard, "MB-1");
    let cpu = component(&db, ComponentKind::Cpu, "CPU-1");
    db.install(&author(), n.id, SlotKind::Motherboard, mb.id, None).unwrap();
    db.install(&author(), n.id, SlotKind::Cpu1, cpu.id, None).unwrap();

    let node_before = db.assembly(n.id).unwrap();
    let mb_before = db.component(mb.id).unwrap();
    let cpu_before = db.component(cpu.id).unwrap();
    let ops_before = counts(&db);

    let err = db.discard_assembly(&author(), n.id, false, Some("scrap"), None).unwrap_err();
    assert!(matches!(err, TrackerError::Conflict(_)));

    assert_eq!(db.assembly(n.id).unwrap(), node_before);
    assert_eq!(db.component(mb.id).unwrap(), mb_before);
    assert_eq!(db.component(cpu.id).unwrap(), cpu_before);
    assert_eq!(counts(&db), ops_before);
}

#[test]
fn discard_node_with_remove_all() {
    let db = NodeDb::open_in_memory().unwrap();
    let n = node(&db, AssemblyKind::FrbNode, "FRB-1");
    let mb = component(&db, ComponentKind::Motherboard, "MB-1");
    let cpu = component(&db, ComponentKind::Cpu, "CPU-1");
    db.install(&author(), n.id, SlotKind::Motherboard, mb.id, None).unwrap();
    db.install(&author(), n.id, SlotKind::Cpu1, cpu.id, None).unwrap();
    let before = counts(&db);

    let retired = db
        .discard_assembly(&author(), n.id, true, Some("teardown cart"), Some("L1 teardown"))
        .unwrap();
    assert!(retired.retired);
    assert!(retired.is_empty());

    // One DEL per removed component plus one for the node.
    let after = counts(&db);
    assert_eq!(after.del, before.del + 3);
    assert_eq!(after.total(), before.total() + 3);

    for id in [mb.id, cpu.id] {
        let c = db.component(id).unwrap();
        assert_eq!(c.status, ComponentStatus::Ok);
        assert_eq!(c.location.as_deref(), Some("teardown cart"));
        assert_eq!(db.installation_of(id).unwrap(), None);
    }

    // Every removal carries the operator's note, and the node's own DEL is last.
    let all = db.query_history(&HistoryFilter::default()).unwrap();
    let dels = &all[all.len() - 3..];
    for h in dels {
        assert_eq!(h.operation, Operation::Del);
        assert_eq!(h.note, "L1 teardown");
        assert!(!h.autonote);
    }
    assert_eq!(dels[2].refs.assembly, Some(n.id));
    assert_eq!(dels[2].refs.component, None);
}

#[test]
fn history_time_window() {
    let db = NodeDb::open_in_memory().unwrap();
    let start = Utc::now() - Duration::seconds(1);
    let c = component(&db, ComponentKind::Cpu, "CPU-1");
    db.move_component(&author(), c.id, "rack 2", "restocked").unwrap();
    let end = Utc::now() + Duration::seconds(1);

    let inside = db
        .query_history(&HistoryFilter { start: Some(start), end: Some(end), ..Default::default() })
        .unwrap();
    assert_eq!(inside.len(), 2);

    let later = db
        .query_history(&HistoryFilter { start: Some(end), ..Default::default() })
        .unwrap();
    assert!(later.is_empty());

    let windowed = db.count_operations(Some(start), Some(end)).unwrap();
    assert_eq!(windowed, OperationCounts { add: 1, del: 0, nop: 1 });
    assert_eq!(db.count_operations(None, Some(start)).unwrap().total(), 0);
}

#[test]
fn persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nodes.sqlite");
    let (n, c) = {
        let db = NodeDb::open(&path).unwrap();
        let n = node(&db, AssemblyKind::GpuNode, "GN-1");
        let c = component(&db, ComponentKind::Gpu, "GPU-1");
        db.install(&author(), n.id, SlotKind::Gpu1, c.id, None).unwrap();
        (n, c)
    };

    let db = NodeDb::open(&path).unwrap();
    assert_eq!(db.assembly(n.id).unwrap().occupant(SlotKind::Gpu1), Some(c.id));
    assert_eq!(counts(&db).add, 3);
}
