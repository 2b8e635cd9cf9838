//! Concurrency tests: values written by calculation threads while the UI
//! thread reads labels, colours and snapshots.

use cubegui::synthetic::{build_profile, calculate_in_background, CalculationEvent, ProfileShape};
use cubegui::{CalculationStatus, Globals, Tree, TreeItemType, TreeType, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn test_snapshots_stay_consistent_under_writes() {
    let tree = Tree::new(&Globals::new(), TreeType::Call, "Call tree");
    let item = tree.add_item(None, "main", TreeItemType::CallItem, None);
    let values: Vec<Arc<Value>> = (1..=50).map(|i| Arc::new(Value::Double(i as f64))).collect();
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let item = Arc::clone(&item);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut checked = 0usize;
                while !done.load(Ordering::SeqCst) {
                    let (value, scalar, status) = item.inclusive_snapshot();
                    match value {
                        Some(value) => {
                            assert_eq!(value.get_double(), scalar);
                            assert_ne!(status, CalculationStatus::Invalid);
                        }
                        None => {
                            assert_eq!(scalar, 0.0);
                            assert_eq!(status, CalculationStatus::Invalid);
                        }
                    }
                    let _ = item.label();
                    let _ = item.color();
                    checked += 1;
                }
                checked
            })
        })
        .collect();

    let writer = {
        let item = Arc::clone(&item);
        thread::spawn(move || {
            for round in 0..200 {
                for value in &values {
                    item.set_inclusive_value(Some(Arc::clone(value)));
                }
                if round % 10 == 0 {
                    item.invalidate();
                }
            }
        })
    };

    writer.join().unwrap();
    done.store(true, Ordering::SeqCst);
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(item.get_total_value(), 50.0);
}

#[test]
fn test_ready_is_never_reached_with_stale_text() {
    let tree = Tree::new(&Globals::new(), TreeType::Call, "Call tree");
    let item = tree.add_item(None, "main", TreeItemType::CallItem, None);
    let writer = {
        let item = Arc::clone(&item);
        thread::spawn(move || {
            for i in 0..2000 {
                item.set_inclusive_value(Some(Arc::new(Value::Double(i as f64 + 1.0))));
            }
        })
    };
    while !writer.is_finished() {
        item.update_label();
    }
    writer.join().unwrap();
    // the final value always gets its own label
    assert_eq!(item.label(), "2000.00 main");
    assert_eq!(item.status(), CalculationStatus::Ready);
}

#[test]
fn test_background_calculation_with_concurrent_readers() {
    let profile = build_profile(&Globals::new(), &ProfileShape::default());
    let time = profile.metric("time").unwrap();
    let tree = Arc::clone(&profile.call_tree);
    let rx = calculate_in_background(Arc::clone(&tree), time, 5, 4);

    let mut finished = false;
    while !finished {
        for item in tree.items() {
            let _ = item.label();
            let _ = item.display_value();
        }
        for event in rx.try_iter() {
            if let CalculationEvent::Finished { items, .. } = event {
                assert_eq!(items, tree.items().len());
                finished = true;
            }
        }
        thread::yield_now();
    }

    let tree_items = tree.items();
    assert!(tree_items.iter().all(|i| i.is_calculated()));
    for item in tree_items {
        let children: f64 = item.children().iter().map(|c| c.get_total_value()).sum();
        assert!((item.get_total_value() - item.get_own_value() - children).abs() < 1e-9);
    }
}
