//! Integration tests for tree items and trees
//!
//! Covers value caching, the calculation status life cycle, expand state,
//! markers and traversal on deep and wide trees.

use cubegui::tree::TreeItemMarker;
use cubegui::{
    CalculationStatus, Globals, Tree, TreeItem, TreeItemType, TreeType, Value,
};
use egui::Color32;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

fn double(v: f64) -> Option<Arc<Value>> {
    Some(Arc::new(Value::Double(v)))
}

fn call_tree() -> Arc<Tree> {
    Tree::new(&Globals::new(), TreeType::Call, "Call tree")
}

/// Chain of `depth` items below the root; returns the items top down.
fn chain(tree: &Tree, depth: usize) -> Vec<Arc<TreeItem>> {
    let mut items: Vec<Arc<TreeItem>> = Vec::new();
    for level in 0..depth {
        let item = tree.add_item(
            items.last(),
            &format!("level{}", level),
            TreeItemType::CallItem,
            None,
        );
        items.push(item);
    }
    items
}

/// Tree where item i (1-based) hangs below item `parents[i-1] % i` (0 is the root).
fn random_tree(parents: &[usize]) -> (Arc<Tree>, Vec<Arc<TreeItem>>) {
    let tree = call_tree();
    let mut items = vec![Arc::clone(tree.root())];
    for (i, choice) in parents.iter().enumerate() {
        let parent = Arc::clone(&items[choice % (i + 1)]);
        let parent = if Arc::ptr_eq(&parent, tree.root()) { None } else { Some(parent) };
        let item = tree.add_item(parent.as_ref(), &format!("item{}", i), TreeItemType::CallItem, None);
        items.push(item);
    }
    (tree, items)
}

// ============================================================================
// Values and status
// ============================================================================

#[test]
fn test_collapsed_shows_inclusive_expanded_shows_exclusive() {
    let tree = call_tree();
    let parent = tree.add_item(None, "main", TreeItemType::CallItem, None);
    tree.add_item(Some(&parent), "child", TreeItemType::CallItem, None);
    parent.set_inclusive_value(double(10.0));
    parent.set_exclusive_value(double(4.0));

    assert!(!parent.is_expanded());
    assert_eq!(parent.get_value(), (10.0, true));
    assert_eq!(parent.label(), "10.00 main");

    parent.set_expanded(true);
    assert_eq!(parent.get_value(), (4.0, true));
    assert_eq!(parent.label(), "4.00 main");
}

#[test]
fn test_same_value_object_set_twice_is_kept() {
    let tree = call_tree();
    let item = tree.add_item(None, "main", TreeItemType::CallItem, None);
    let value = Arc::new(Value::Double(2.5));

    item.set_inclusive_value(Some(Arc::clone(&value)));
    item.set_inclusive_value(Some(Arc::clone(&value)));

    let stored = item.get_total_value_object().unwrap();
    assert!(Arc::ptr_eq(&stored, &value));
    // ours, the item's and `stored`
    assert_eq!(Arc::strong_count(&value), 3);
    assert_eq!(item.get_total_value(), 2.5);
}

#[test]
fn test_replaced_value_object_is_released() {
    let tree = call_tree();
    let item = tree.add_item(None, "main", TreeItemType::CallItem, None);
    let first = Arc::new(Value::Double(1.0));
    item.set_inclusive_value(Some(Arc::clone(&first)));
    item.set_inclusive_value(double(2.0));
    assert_eq!(Arc::strong_count(&first), 1);
}

#[test]
fn test_status_life_cycle() {
    let tree = call_tree();
    let item = tree.add_item(None, "main", TreeItemType::CallItem, None);
    assert_eq!(item.status(), CalculationStatus::Invalid);
    assert!(item.display_value().is_nan());
    assert_eq!(item.label(), "main");

    item.set_inclusive_value(double(3.0));
    assert_eq!(item.status(), CalculationStatus::Calculated);
    item.update_label();
    assert_eq!(item.status(), CalculationStatus::Ready);

    item.invalidate_label();
    assert_eq!(item.status(), CalculationStatus::Calculated);
    assert_eq!(item.get_total_value(), 3.0);

    item.invalidate();
    assert_eq!(item.status(), CalculationStatus::Invalid);
    assert!(item.get_total_value_object().is_none());
    assert_eq!(item.label(), "main");
}

#[test]
fn test_none_value_marks_invalid() {
    let tree = call_tree();
    let item = tree.add_item(None, "main", TreeItemType::CallItem, None);
    item.set_inclusive_value(double(3.0));
    item.set_inclusive_value(None);
    assert_eq!(item.inclusive_status(), CalculationStatus::Invalid);
    assert_eq!(item.get_total_value(), 0.0);
}

#[test]
fn test_new_value_invalidates_cached_label() {
    let tree = call_tree();
    let item = tree.add_item(None, "main", TreeItemType::CallItem, None);
    item.set_inclusive_value(double(1.0));
    assert_eq!(item.label(), "1.00 main");
    item.set_inclusive_value(double(7.0));
    assert_eq!(item.label(), "7.00 main");
}

// ============================================================================
// Structure
// ============================================================================

#[test]
fn test_subtree_is_pre_order() {
    let tree = call_tree();
    let a = tree.add_item(None, "a", TreeItemType::CallItem, None);
    let b = tree.add_item(Some(&a), "b", TreeItemType::CallItem, None);
    tree.add_item(Some(&b), "c", TreeItemType::CallItem, None);
    tree.add_item(Some(&a), "d", TreeItemType::CallItem, None);
    let names: Vec<String> = a.subtree().iter().map(|i| i.name().to_string()).collect();
    assert_eq!(names, vec!["a", "b", "c", "d"]);
}

#[test]
fn test_deep_chain_depth_and_leaf() {
    let tree = call_tree();
    let items = chain(&tree, 2000);
    assert_eq!(tree.depth(), 2000);
    let leafs = items[0].get_leafs();
    assert_eq!(leafs.len(), 1);
    assert!(Arc::ptr_eq(&leafs[0], &items[1999]));
    assert_eq!(items[0].subtree().len(), 2000);
}

// ============================================================================
// Markers
// ============================================================================

#[test]
fn test_marker_propagates_to_ancestors() {
    let tree = call_tree();
    let items = chain(&tree, 4);
    let marker = TreeItemMarker::new("hot", Color32::RED);
    items[3].set_marker(&marker, false, true);
    assert!(items[3].has_markers());
    for ancestor in &items[..3] {
        assert_eq!(ancestor.parent_markers().len(), 1);
        assert!(!ancestor.has_markers());
    }
    assert_eq!(tree.root().parent_markers().len(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_depth_matches_chain_length(depth in 5usize..60) {
        let tree = call_tree();
        let items = chain(&tree, depth);
        for (level, item) in items.iter().enumerate() {
            prop_assert_eq!(item.depth(), level + 1);
        }
        prop_assert_eq!(tree.depth(), depth);
    }

    #[test]
    fn prop_get_leafs_returns_exactly_the_leaves(parents in prop::collection::vec(0usize..1000, 1..80)) {
        let (tree, items) = random_tree(&parents);
        let from_root: HashSet<u64> = tree.root().get_leafs().iter().map(|i| i.id().0).collect();
        let expected: HashSet<u64> = items[1..]
            .iter()
            .filter(|i| i.is_leaf())
            .map(|i| i.id().0)
            .collect();
        prop_assert_eq!(from_root, expected);
    }

    #[test]
    fn prop_markers_round_trip(depth in 5usize..30, count in 1usize..6, mark_parents in any::<bool>()) {
        let tree = call_tree();
        let items = chain(&tree, depth);
        let leaf = &items[depth - 1];
        let markers: Vec<_> = (0..count)
            .map(|i| TreeItemMarker::new(&format!("m{}", i), Color32::BLUE))
            .collect();
        for marker in &markers {
            leaf.set_marker(marker, false, mark_parents);
        }
        prop_assert_eq!(leaf.markers().len(), count);
        for marker in &markers {
            leaf.remove_marker(marker);
        }
        prop_assert!(!leaf.has_markers());
        for item in &items {
            prop_assert!(item.parent_markers().is_empty());
        }
        prop_assert!(tree.root().parent_markers().is_empty());
    }
}
