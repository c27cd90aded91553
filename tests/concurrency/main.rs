//! Shared repositories and providers under concurrent callers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
#[cfg(feature = "device")]
use std::time::Duration;

#[cfg(feature = "device")]
use datarepo::gate::PortLockManager;
use datarepo::{
    Data, DataModel, DataProvider, DataQuery, MemoryTableProvider, ProviderRegistry, Repository,
    ValueKind, WriteStatus,
};

fn counter_model() -> Arc<DataModel> {
    let mut builder = DataModel::builder("bench.Counter", "counters");
    builder.add_key_field("Id", ValueKind::Long);
    builder.add_field("Owner", ValueKind::ShortString);
    builder.build()
}

fn shared_repository() -> Repository {
    let registry = ProviderRegistry::new();
    registry
        .register(Arc::new(MemoryTableProvider::default()))
        .unwrap();
    registry.set_default("memory").unwrap();
    Repository::new(Arc::new(registry))
}

// ============================================================================
// Writes
// ============================================================================

#[test]
fn parallel_inserts_land_exactly_once() {
    let repository = shared_repository();
    let model = counter_model();

    thread::scope(|scope| {
        for worker in 0..8i64 {
            let repository = &repository;
            let model = &model;
            scope.spawn(move || {
                for n in 0..25i64 {
                    let mut data = Data::new(model);
                    data.set("Id", worker * 100 + n);
                    data.set("Owner", format!("worker-{}", worker));
                    assert_eq!(repository.insert(&mut data).unwrap(), WriteStatus::SUCCESS);
                }
            });
        }
    });

    let template = Data::new(&model);
    assert_eq!(repository.select_count(&template, &DataQuery::new()).unwrap(), 200);
    let owned = DataQuery::by_property("Owner", "worker-3");
    assert_eq!(repository.select_count(&template, &owned).unwrap(), 25);
}

#[test]
fn racing_duplicate_inserts_keep_one_row() {
    let repository = shared_repository();
    let model = counter_model();
    let winners = AtomicUsize::new(0);

    thread::scope(|scope| {
        for _ in 0..6 {
            scope.spawn(|| {
                let mut data = Data::new(&model);
                data.set("Id", 1i64);
                if repository.insert(&mut data).unwrap().is_success() {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
    });

    assert_eq!(winners.load(Ordering::SeqCst), 1);
    assert_eq!(
        repository
            .select_count(&Data::new(&model), &DataQuery::new())
            .unwrap(),
        1
    );
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn concurrent_get_or_register_agrees_on_one_provider() {
    let registry = Arc::new(ProviderRegistry::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                registry
                    .get_or_register("lazy", || Arc::new(MemoryTableProvider::new("lazy")))
                    .unwrap()
            })
        })
        .collect();

    let providers: Vec<Arc<dyn DataProvider>> =
        handles.into_iter().map(|handle| handle.join().unwrap()).collect();
    for provider in &providers[1..] {
        assert!(Arc::ptr_eq(&providers[0], provider));
    }
    assert_eq!(registry.names().unwrap(), vec!["lazy".to_string()]);
}

// ============================================================================
// Port gates
// ============================================================================

#[cfg(feature = "device")]
#[test]
fn port_gate_admits_one_holder_at_a_time() {
    let manager = Arc::new(PortLockManager::new());
    let inside = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let manager = Arc::clone(&manager);
            let inside = Arc::clone(&inside);
            let peak = Arc::clone(&peak);
            thread::spawn(move || {
                let gate = manager.get_lock("COM3").unwrap();
                for _ in 0..5 {
                    let _guard = gate
                        .acquire_within(Duration::from_secs(5), Duration::from_millis(1))
                        .unwrap();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(1));
                    inside.fetch_sub(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert!(!manager.get_lock("COM3").unwrap().is_locked());
}
