use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nodedb::{
    AssemblyKind, Author, ComponentKind, HistoryFilter, NewAssembly, NewComponent, NodeDb, SlotKind,
};

fn populated(nodes: usize) -> (NodeDb, Author) {
    let db = NodeDb::open_in_memory().unwrap();
    let author = Author::new("bench@localhost").unwrap();
    for i in 0..nodes {
        let node = db
            .create_assembly(
                &author,
                NewAssembly {
                    kind: AssemblyKind::GpuNode,
                    serial: format!("GN-{i:05}"),
                    ..Default::default()
                },
                None,
            )
            .unwrap();
        for (kind, slot) in [(ComponentKind::Cpu, SlotKind::Cpu0), (ComponentKind::Gpu, SlotKind::Gpu0)] {
            let c = db
                .create_component(
                    &author,
                    NewComponent { kind, serial: Some(format!("{kind}-{i:05}")), ..Default::default() },
                    None,
                )
                .unwrap();
            db.install(&author, node.id, slot, c.id, None).unwrap();
        }
    }
    (db, author)
}

fn bench_uninstall_install(c: &mut Criterion) {
    let (db, author) = populated(100);
    let gpu = db.resolver().component("GPU-00042").unwrap();

    c.bench_function("node_uninstall_install", |b| {
        b.iter(|| {
            let at = db.uninstall(&author, black_box(gpu), Some("bench"), None).unwrap();
            db.install(&author, at.assembly, at.slot, gpu, None).unwrap();
        });
    });
}

fn bench_resolve_serial(c: &mut Criterion) {
    let (db, _) = populated(1000);
    let resolver = db.resolver();

    let mut i = 0usize;
    c.bench_function("node_resolve_serial", |b| {
        b.iter(|| {
            let serial = format!("CPU-{:05}", i % 1000);
            resolver.entity(black_box(&serial)).unwrap();
            i += 1;
        });
    });
}

fn bench_history_for_node(c: &mut Criterion) {
    let (db, _) = populated(1000);
    let node = db.resolver().assembly("GN-00500").unwrap();

    c.bench_function("node_history_query", |b| {
        b.iter(|| {
            let rows = db
                .query_history(&HistoryFilter { assembly: Some(black_box(node)), ..Default::default() })
                .unwrap();
            assert_eq!(rows.len(), 3);
        });
    });
}

criterion_group!(benches, bench_uninstall_install, bench_resolve_serial, bench_history_for_node);
criterion_main!(benches);
