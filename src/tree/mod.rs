//! Trees of items and their shared per-tree state.
//!
//! # Ownership
//!
//! A `Tree` owns its invisible root item; every item owns its children and
//! refers to its parent weakly. All items of a tree share one `TreeContext`
//! (tree type, value modus, aggregation, colour bounds, percent reference,
//! and the session `Globals`).
//!
//! Structure is edited only through `Tree` and `TreeModel`; value content may
//! be written from any thread.

pub mod item;
pub mod marker;

pub use item::{SourceInfo, TreeItem};
pub use marker::{MarkerRef, TreeItemMarker};

use crate::cube::CubeObject;
use crate::globals::Globals;
use crate::lock;
use crate::models::{Aggregation, ItemId, TreeItemType, TreeType, ValueModus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy)]
struct TreeState {
    value_modus: ValueModus,
    aggregation: Aggregation,
    /// Set when every metric shown in the tree is integer valued (or none is)
    homogeneous_integer: Option<bool>,
    min: f64,
    max: f64,
    /// Denominator of percent values
    reference: f64,
}

/// State shared by all items of one tree.
pub struct TreeContext {
    tree_type: TreeType,
    globals: Arc<Globals>,
    next_id: AtomicU64,
    state: RwLock<TreeState>,
}

impl TreeContext {
    fn new(globals: &Arc<Globals>, tree_type: TreeType) -> Self {
        TreeContext {
            tree_type,
            globals: Arc::clone(globals),
            next_id: AtomicU64::new(0),
            state: RwLock::new(TreeState {
                value_modus: ValueModus::Absolute,
                aggregation: Aggregation::Sum,
                homogeneous_integer: None,
                min: 0.0,
                max: 0.0,
                reference: 0.0,
            }),
        }
    }

    fn next_id(&self) -> ItemId {
        ItemId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn tree_type(&self) -> TreeType {
        self.tree_type
    }

    pub fn globals(&self) -> &Arc<Globals> {
        &self.globals
    }

    pub fn value_modus(&self) -> ValueModus {
        lock::read(&self.state).value_modus
    }

    pub fn aggregation(&self) -> Aggregation {
        lock::read(&self.state).aggregation
    }

    pub fn homogeneous_integer(&self) -> Option<bool> {
        lock::read(&self.state).homogeneous_integer
    }

    /// Colour bounds of the tree
    pub fn min_max(&self) -> (f64, f64) {
        let state = lock::read(&self.state);
        (state.min, state.max)
    }

    pub fn reference_value(&self) -> f64 {
        lock::read(&self.state).reference
    }
}

#[derive(Default)]
struct ItemIndex {
    /// Pre-order list of all items below the root
    list: Vec<Arc<TreeItem>>,
    by_id: HashMap<ItemId, Arc<TreeItem>>,
}

/// A tree of `TreeItem`s.
pub struct Tree {
    context: Arc<TreeContext>,
    label: String,
    root: Arc<TreeItem>,
    items: RwLock<ItemIndex>,
    rebuilding: AtomicBool,
}

impl Tree {
    /// Creates an empty tree and registers it with `globals` for re-derivation.
    pub fn new(globals: &Arc<Globals>, tree_type: TreeType, label: &str) -> Arc<Tree> {
        let context = Arc::new(TreeContext::new(globals, tree_type));
        let root = TreeItem::new(
            Arc::clone(&context),
            context.next_id(),
            label,
            TreeItemType::Root,
            None,
        );
        let tree = Arc::new(Tree {
            context,
            label: label.to_string(),
            root,
            items: RwLock::new(ItemIndex::default()),
            rebuilding: AtomicBool::new(false),
        });
        globals.register_tree(&tree);
        log::debug!("[Tree] Created {} '{}'", tree_type, label);
        tree
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn tree_type(&self) -> TreeType {
        self.context.tree_type()
    }

    pub fn context(&self) -> &Arc<TreeContext> {
        &self.context
    }

    pub fn globals(&self) -> &Arc<Globals> {
        self.context.globals()
    }

    pub fn root(&self) -> &Arc<TreeItem> {
        &self.root
    }

    /// Creates an item belonging to this tree without attaching it.
    pub fn create_item(
        &self,
        name: &str,
        item_type: TreeItemType,
        cube_object: Option<CubeObject>,
    ) -> Arc<TreeItem> {
        TreeItem::new(
            Arc::clone(&self.context),
            self.context.next_id(),
            name,
            item_type,
            cube_object,
        )
    }

    /// Creates an item and appends it to `parent` (the root if `None`).
    pub fn add_item(
        &self,
        parent: Option<&Arc<TreeItem>>,
        name: &str,
        item_type: TreeItemType,
        cube_object: Option<CubeObject>,
    ) -> Arc<TreeItem> {
        let item = self.create_item(name, item_type, cube_object);
        let parent = parent.unwrap_or(&self.root);
        parent.add_child(Arc::clone(&item));
        if !self.is_rebuilding() {
            let mut index = lock::write(&self.items);
            index.list.push(Arc::clone(&item));
            index.by_id.insert(item.id(), Arc::clone(&item));
        }
        item
    }

    /// Whether `item` was created by this tree.
    pub fn owns(&self, item: &TreeItem) -> bool {
        Arc::ptr_eq(item.context(), &self.context)
    }

    /// All items below the root.
    pub fn items(&self) -> Vec<Arc<TreeItem>> {
        lock::read(&self.items).list.clone()
    }

    pub fn item(&self, id: ItemId) -> Option<Arc<TreeItem>> {
        if id == self.root.id() {
            return Some(Arc::clone(&self.root));
        }
        lock::read(&self.items).by_id.get(&id).cloned()
    }

    pub fn contains(&self, item: &TreeItem) -> bool {
        self.item(item.id())
            .map(|found| std::ptr::eq(found.as_ref(), item))
            .unwrap_or(false)
    }

    /// Deepest item depth; 0 for an empty tree.
    pub fn depth(&self) -> usize {
        lock::read(&self.items)
            .list
            .iter()
            .map(|item| item.depth())
            .max()
            .unwrap_or(0)
    }

    /// Rebuilds the item index from the current structure.
    pub fn update_items(&self) {
        let mut list = self.root.subtree();
        list.remove(0);
        let by_id = list.iter().map(|item| (item.id(), Arc::clone(item))).collect();
        *lock::write(&self.items) = ItemIndex { list, by_id };
    }

    /// Suspends index maintenance during a full rebuild.
    pub fn begin_rebuild(&self) {
        self.rebuilding.store(true, Ordering::SeqCst);
    }

    pub fn end_rebuild(&self) {
        self.rebuilding.store(false, Ordering::SeqCst);
        self.update_items();
    }

    pub fn is_rebuilding(&self) -> bool {
        self.rebuilding.load(Ordering::SeqCst)
    }

    // ========================================================================
    // TREE WIDE SETTINGS
    // ========================================================================

    pub fn set_value_modus(&self, modus: ValueModus) {
        lock::write(&self.context.state).value_modus = modus;
        self.values_changed();
    }

    pub fn set_aggregation(&self, aggregation: Aggregation) {
        lock::write(&self.context.state).aggregation = aggregation;
        self.values_changed();
    }

    pub fn set_homogeneous_integer(&self, integer: Option<bool>) {
        lock::write(&self.context.state).homogeneous_integer = integer;
        self.invalidate_labels();
    }

    // ========================================================================
    // DERIVED STATE
    // ========================================================================

    /// Scans all calculated items for the colour bounds.
    pub fn compute_min_max(&self) -> (f64, f64) {
        let mut bounds: Option<(f64, f64)> = None;
        for item in self.items() {
            if !item.is_calculated() {
                continue;
            }
            let (value, ok) = item.get_value();
            if !ok || !value.is_finite() {
                continue;
            }
            bounds = Some(match bounds {
                Some((min, max)) => (min.min(value), max.max(value)),
                None => (value, value),
            });
        }
        let (min, max) = bounds.unwrap_or((0.0, 0.0));
        let mut state = lock::write(&self.context.state);
        state.min = min;
        state.max = max;
        (min, max)
    }

    /// Sum of the inclusive values of the top level items.
    pub fn compute_reference_value(&self) -> f64 {
        let aggregation = self.context.aggregation();
        let reference = self
            .root
            .children()
            .iter()
            .map(|item| item.get_total_value())
            .reduce(|acc, v| aggregation.combine(acc, v))
            .unwrap_or(0.0);
        lock::write(&self.context.state).reference = reference;
        reference
    }

    fn invalidate_labels(&self) {
        for item in self.items() {
            item.invalidate_label();
        }
    }

    /// New values were stored: refresh colour bounds, reference and labels.
    pub fn values_changed(&self) {
        self.compute_reference_value();
        self.compute_min_max();
        self.invalidate_labels();
    }

    /// The interpretation of cached values changed (value view, precision).
    pub fn rederive(&self) {
        for item in self.items() {
            item.refresh_scalars();
        }
        self.compute_reference_value();
        self.compute_min_max();
        log::debug!("[Tree] Re-derived '{}'", self.label);
    }

    /// Drops every value of the tree.
    pub fn invalidate_all(&self) {
        for item in self.items() {
            item.invalidate();
        }
        let mut state = lock::write(&self.context.state);
        state.min = 0.0;
        state.max = 0.0;
        state.reference = 0.0;
    }
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("label", &self.label)
            .field("type", &self.tree_type())
            .field("items", &lock::read(&self.items).list.len())
            .finish()
    }
}
