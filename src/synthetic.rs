//! Deterministic synthetic profiles.
//!
//! Builds a metric, a call and a system tree of configurable shape and fills
//! them with values derived from item ids, so that every run (and every test)
//! sees the same numbers. Values can be filled on a pool of worker threads;
//! workers only write item values, the tree structure is fixed before they start.

use crate::cube::{
    CnodeInfo, CubeObject, HistogramValue, MetricInfo, RegionInfo, SystemNodeInfo, TauAtomicValue,
    Value,
};
use crate::globals::Globals;
use crate::models::{Aggregation, DataType, TreeItemType, TreeType};
use crate::tree::{Tree, TreeItem};
use crossbeam_channel::{unbounded, Receiver};
use std::sync::Arc;
use std::time::Instant;

/// Shape of a synthetic profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileShape {
    pub machines: usize,
    pub nodes_per_machine: usize,
    pub processes_per_node: usize,
    pub threads_per_process: usize,
    /// Length of the recursive call chain below `solve`
    pub recursion_depth: usize,
}

impl Default for ProfileShape {
    fn default() -> Self {
        ProfileShape {
            machines: 1,
            nodes_per_machine: 2,
            processes_per_node: 4,
            threads_per_process: 2,
            recursion_depth: 6,
        }
    }
}

pub struct SyntheticProfile {
    pub metrics: Vec<Arc<MetricInfo>>,
    pub metric_tree: Arc<Tree>,
    pub call_tree: Arc<Tree>,
    pub system_tree: Arc<Tree>,
}

impl SyntheticProfile {
    pub fn metric(&self, unique_name: &str) -> Option<Arc<MetricInfo>> {
        self.metrics
            .iter()
            .find(|m| m.unique_name == unique_name)
            .cloned()
    }
}

/// Metric catalogue: (unique name, display name, data type, unit, aggregation, derived, parent)
const METRICS: [(&str, &str, DataType, &str, Aggregation, bool, Option<&str>); 7] = [
    ("time", "Time", DataType::Double, "sec", Aggregation::Sum, false, None),
    ("comp", "Computation", DataType::Double, "sec", Aggregation::Sum, false, Some("time")),
    ("mpi", "MPI", DataType::Double, "sec", Aggregation::Sum, false, Some("time")),
    ("visits", "Visits", DataType::Integer, "occ", Aggregation::Sum, false, None),
    ("max_rss", "Max RSS", DataType::Double, "bytes", Aggregation::Maximum, true, None),
    ("tau_time", "TAU time", DataType::TauAtomic, "sec", Aggregation::Sum, false, None),
    ("latency", "Message latency", DataType::Histogram, "sec", Aggregation::Sum, false, None),
];

/// Call tree template: (name, module, child names)
const CALLS: [(&str, &str, &[&str]); 11] = [
    ("main", "main.c", &["init", "solve", "finalize"]),
    ("init", "main.c", &["MPI_Init", "read_input"]),
    ("MPI_Init", "MPI", &[]),
    ("read_input", "io.c", &[]),
    ("solve", "solver.c", &["exchange_halo", "compute_kernel"]),
    ("exchange_halo", "halo.c", &["MPI_Send", "MPI_Recv"]),
    ("MPI_Send", "MPI", &[]),
    ("MPI_Recv", "MPI", &[]),
    ("compute_kernel", "kernel.c", &[]),
    ("finalize", "main.c", &["MPI_Finalize"]),
    ("MPI_Finalize", "MPI", &[]),
];

/// Builds the three trees of a synthetic profile.
pub fn build_profile(globals: &Arc<Globals>, shape: &ProfileShape) -> SyntheticProfile {
    let metric_tree = Tree::new(globals, TreeType::Metric, "Metric tree");
    let mut metrics = Vec::new();
    let mut metric_items: Vec<(&str, Arc<TreeItem>)> = Vec::new();
    for (name, display, data_type, unit, aggregation, derived, parent) in METRICS {
        let mut info = MetricInfo::new(name, display, data_type)
            .with_unit(unit)
            .with_aggregation(aggregation);
        if derived {
            info = info.derived();
        }
        let info = Arc::new(info);
        let parent_item = parent.and_then(|p| {
            metric_items
                .iter()
                .find(|(n, _)| *n == p)
                .map(|(_, item)| Arc::clone(item))
        });
        let item = metric_tree.add_item(
            parent_item.as_ref(),
            name,
            TreeItemType::MetricItem,
            Some(CubeObject::Metric(Arc::clone(&info))),
        );
        item.set_display_name(display);
        metric_items.push((name, item));
        metrics.push(info);
    }

    let call_tree = Tree::new(globals, TreeType::Call, "Call tree");
    build_call_tree(&call_tree, shape.recursion_depth);

    let system_tree = Tree::new(globals, TreeType::System, "System tree");
    build_system_tree(&system_tree, shape);

    log::info!(
        "[Synthetic] Built profile: {} metrics, {} call paths, {} system nodes",
        metrics.len(),
        call_tree.items().len(),
        system_tree.items().len()
    );

    SyntheticProfile {
        metrics,
        metric_tree,
        call_tree,
        system_tree,
    }
}

fn build_call_tree(tree: &Tree, recursion_depth: usize) {
    let regions: Vec<Arc<RegionInfo>> = CALLS
        .iter()
        .enumerate()
        .map(|(i, (name, module, _))| {
            let line = if *module == "MPI" { -1 } else { 10 * (i as i64 + 1) };
            Arc::new(RegionInfo::new(name, module, line, line + 25))
        })
        .collect();
    let region = |name: &str| regions.iter().find(|r| r.name == name).cloned();

    let cnode = |region: Arc<RegionInfo>, line: i64| {
        Some(CubeObject::Cnode(Arc::new(CnodeInfo { region, line })))
    };

    let Some(main_region) = region("main") else {
        return;
    };
    let main = tree.add_item(None, "main", TreeItemType::CallItem, cnode(main_region, 1));
    let mut stack = vec![(Arc::clone(&main), "main")];
    while let Some((parent, name)) = stack.pop() {
        let Some((_, _, children)) = CALLS.iter().find(|(n, _, _)| *n == name) else {
            continue;
        };
        for &child in children.iter() {
            if let Some(child_region) = region(child) {
                let line = child_region.begin_line;
                let item = tree.add_item(Some(&parent), child, TreeItemType::CallItem, cnode(child_region, line));
                stack.push((item, child));
            }
        }
    }

    // recursive chain below solve
    let recurse_region = Arc::new(RegionInfo::new("refine", "solver.c", 200, 240));
    let mut parent = tree
        .items()
        .into_iter()
        .find(|item| item.name() == "solve")
        .unwrap_or(main);
    for level in 0..recursion_depth {
        parent = tree.add_item(
            Some(&parent),
            "refine",
            TreeItemType::CallItem,
            cnode(Arc::clone(&recurse_region), 210 + level as i64),
        );
    }
}

fn build_system_tree(tree: &Tree, shape: &ProfileShape) {
    let node_info = |name: &str, class: &str, rank: Option<u32>| {
        Some(CubeObject::System(Arc::new(SystemNodeInfo {
            name: name.to_string(),
            class: class.to_string(),
            rank,
        })))
    };
    let mut rank = 0u32;
    for m in 0..shape.machines {
        let name = format!("machine {}", m);
        let machine = tree.add_item(None, &name, TreeItemType::SystemTreeNodeItem, node_info(&name, "machine", None));
        for n in 0..shape.nodes_per_machine {
            let name = format!("node {}", m * shape.nodes_per_machine + n);
            let node = tree.add_item(Some(&machine), &name, TreeItemType::SystemTreeNodeItem, node_info(&name, "node", None));
            for _ in 0..shape.processes_per_node {
                let name = format!("rank {}", rank);
                let process = tree.add_item(Some(&node), &name, TreeItemType::LocationGroupItem, node_info(&name, "process", Some(rank)));
                for t in 0..shape.threads_per_process {
                    let name = format!("thread {}", t);
                    tree.add_item(Some(&process), &name, TreeItemType::LocationItem, node_info(&name, "thread", Some(rank)));
                }
                rank += 1;
            }
        }
    }
}

// ============================================================================
// VALUES
// ============================================================================

/// splitmix64: small, well distributed, reproducible
fn mix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

fn unit_interval(h: u64) -> f64 {
    (h >> 11) as f64 / (1u64 << 53) as f64
}

/// Exclusive value of the item `id` for `metric`. About one item in seven is zero.
pub fn exclusive_value(metric: &MetricInfo, id: u64, salt: u64) -> Value {
    let h = mix(id ^ mix(salt ^ metric.unique_name.len() as u64));
    let zero = h % 7 == 0;
    match metric.data_type {
        DataType::Integer => Value::Integer(if zero { 0 } else { (h % 1000) as i64 + 1 }),
        DataType::TauAtomic => {
            if zero {
                return Value::TauAtomic(TauAtomicValue::from_samples(&[]));
            }
            let samples: Vec<f64> = (0..(h % 5 + 1))
                .map(|i| (unit_interval(mix(h + i)) * 100.0).round() / 100.0)
                .collect();
            Value::TauAtomic(TauAtomicValue::from_samples(&samples))
        }
        DataType::Histogram => {
            let buckets = (0..8)
                .map(|i| if zero { 0.0 } else { (mix(h + i) % 10) as f64 })
                .collect();
            Value::Histogram(HistogramValue::new(buckets, 0.0, 1e-3))
        }
        DataType::Double | DataType::None => {
            if zero {
                Value::Double(0.0)
            } else {
                Value::Double((unit_interval(h) * 1000.0).round() / 100.0)
            }
        }
    }
}

fn metric_of(item: &TreeItem, fallback: &MetricInfo) -> MetricInfo {
    item.cube_object()
        .and_then(|o| o.metric())
        .map(|m| m.as_ref().clone())
        .unwrap_or_else(|| fallback.clone())
}

/// Computes and stores exclusive and inclusive values of `items`.
///
/// The inclusive value is the aggregate of the exclusive values of the
/// subtree, so items can be processed in any order and on any thread.
pub fn fill_items(items: &[Arc<TreeItem>], metric: &MetricInfo, salt: u64) {
    for item in items {
        let own_metric = metric_of(item, metric);
        let own = exclusive_value(&own_metric, item.id().0, salt);
        let mut total = own.clone();
        for descendant in item.subtree().iter().skip(1) {
            let m = metric_of(descendant, metric);
            if m.data_type != own_metric.data_type {
                continue;
            }
            total = total.aggregate(&exclusive_value(&m, descendant.id().0, salt), m.aggregation);
        }
        item.set_exclusive_value(Some(Arc::new(own)));
        item.set_inclusive_value(Some(Arc::new(total)));
    }
}

/// Fills a whole tree on the calling thread.
pub fn fill_tree(tree: &Tree, metric: &MetricInfo, salt: u64) {
    prepare_tree(tree, metric);
    fill_items(&tree.items(), metric, salt);
    tree.values_changed();
}

fn prepare_tree(tree: &Tree, metric: &MetricInfo) {
    if tree.tree_type() != TreeType::Metric {
        tree.set_aggregation(metric.aggregation);
        tree.set_homogeneous_integer(Some(metric.is_integer()));
    }
}

/// Progress of a background calculation.
#[derive(Debug, Clone, PartialEq)]
pub enum CalculationEvent {
    ChunkDone { worker: usize, items: usize },
    Finished { tree: String, items: usize, elapsed_ms: u128 },
}

/// Fills `tree` on `workers` threads. The returned channel reports each
/// finished chunk and finally `Finished`, sent after derived tree state was refreshed.
pub fn calculate_in_background(
    tree: Arc<Tree>,
    metric: Arc<MetricInfo>,
    salt: u64,
    workers: usize,
) -> Receiver<CalculationEvent> {
    let (tx, rx) = unbounded();
    let workers = workers.max(1);
    std::thread::spawn(move || {
        let started = Instant::now();
        prepare_tree(&tree, &metric);
        tree.invalidate_all();
        let items = tree.items();
        let chunk_size = items.len().div_ceil(workers).max(1);

        std::thread::scope(|scope| {
            for (worker, chunk) in items.chunks(chunk_size).enumerate() {
                let tx = tx.clone();
                let metric = Arc::clone(&metric);
                scope.spawn(move || {
                    fill_items(chunk, &metric, salt);
                    log::debug!("[Calc] Worker {} filled {} items", worker, chunk.len());
                    let _ = tx.send(CalculationEvent::ChunkDone {
                        worker,
                        items: chunk.len(),
                    });
                });
            }
        });

        tree.values_changed();
        let elapsed_ms = started.elapsed().as_millis();
        log::info!(
            "[Calc] '{}' filled with {} ({} items, {} workers, {} ms)",
            tree.label(),
            metric.display_name,
            items.len(),
            workers,
            elapsed_ms
        );
        let _ = tx.send(CalculationEvent::Finished {
            tree: tree.label().to_string(),
            items: items.len(),
            elapsed_ms,
        });
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_shape() {
        let profile = build_profile(&Globals::new(), &ProfileShape::default());
        assert_eq!(profile.metrics.len(), 7);
        assert_eq!(profile.system_tree.depth(), 4);
        // 1 machine, 2 nodes, 8 processes, 16 threads
        assert_eq!(profile.system_tree.items().len(), 27);
        assert!(profile.call_tree.depth() >= 5);
        assert!(profile.metric("visits").unwrap().is_integer());
    }

    #[test]
    fn test_values_are_deterministic() {
        let metric = MetricInfo::new("time", "Time", DataType::Double);
        assert_eq!(exclusive_value(&metric, 42, 1), exclusive_value(&metric, 42, 1));
    }

    #[test]
    fn test_inclusive_is_subtree_sum() {
        let profile = build_profile(&Globals::new(), &ProfileShape::default());
        let time = profile.metric("time").unwrap();
        fill_tree(&profile.call_tree, &time, 7);
        for item in profile.call_tree.items() {
            let own = item.get_own_value();
            let children: f64 = item.children().iter().map(|c| c.get_total_value()).sum();
            assert!((item.get_total_value() - own - children).abs() < 1e-9);
        }
    }

    #[test]
    fn test_background_calculation_reports_completion() {
        let profile = build_profile(&Globals::new(), &ProfileShape::default());
        let time = profile.metric("time").unwrap();
        let rx = calculate_in_background(Arc::clone(&profile.system_tree), time, 3, 4);
        let events: Vec<CalculationEvent> = rx.iter().collect();
        let chunks: usize = events
            .iter()
            .filter_map(|e| match e {
                CalculationEvent::ChunkDone { items, .. } => Some(*items),
                _ => None,
            })
            .sum();
        assert_eq!(chunks, 27);
        assert!(matches!(events.last(), Some(CalculationEvent::Finished { items: 27, .. })));
        assert!(profile.system_tree.items().iter().all(|i| i.is_calculated()));
    }
}
