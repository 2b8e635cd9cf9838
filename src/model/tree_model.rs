//! Model over exactly one tree.
//!
//! # Hidden levels
//!
//! Levels of a system tree can be hidden (level = item depth; top level items
//! are level 1). Hiding level L promotes, for every visible item at the
//! nearest visible level above L, its descendants at the nearest visible
//! level below L to direct children. The promoted lists are stored per
//! visible ancestor (`hidden_children`), together with the reverse map from a
//! promoted item to its visible parent. `get_children` consults that table
//! before the real children.
//!
//! Structural edits keep the table in step: rows leaving or entering an
//! anchor's promoted list are announced on the anchor's index.

use super::{tooltip, ItemData, ItemRole, ModelEvent, ModelIndex, TreeModelInterface};
use crate::error::TreeError;
use crate::lock;
use crate::models::{ItemId, TreeType};
use crate::tree::{MarkerRef, Tree, TreeItem};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub struct TreeModel {
    tree: Arc<Tree>,
    /// Set when the root was removed; every row count is 0
    empty: bool,
    found_items: HashSet<ItemId>,
    found_parents: HashSet<ItemId>,
    selected_parents: HashSet<ItemId>,
    hidden_levels: BTreeSet<usize>,
    hidden_children: HashMap<ItemId, Vec<Arc<TreeItem>>>,
    visible_parent: HashMap<ItemId, ItemId>,
    subscribers: Mutex<Vec<Sender<ModelEvent>>>,
}

impl TreeModel {
    pub fn new(tree: Arc<Tree>) -> Self {
        TreeModel {
            tree,
            empty: false,
            found_items: HashSet::new(),
            found_parents: HashSet::new(),
            selected_parents: HashSet::new(),
            hidden_levels: BTreeSet::new(),
            hidden_children: HashMap::new(),
            visible_parent: HashMap::new(),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> Receiver<ModelEvent> {
        let (tx, rx) = unbounded();
        lock::lock(&self.subscribers).push(tx);
        rx
    }

    fn emit(&self, event: ModelEvent) {
        lock::lock(&self.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    // ========================================================================
    // VISIBLE HIERARCHY
    // ========================================================================

    /// Visible children of `parent` (the root if `None`).
    pub fn get_children(&self, parent: Option<&TreeItem>) -> Vec<Arc<TreeItem>> {
        if self.empty {
            return Vec::new();
        }
        let parent = parent.unwrap_or_else(|| self.tree.root().as_ref());
        if self.tree.tree_type() == TreeType::System && !self.hidden_levels.is_empty() {
            if let Some(children) = self.hidden_children.get(&parent.id()) {
                return children.clone();
            }
        }
        parent.children()
    }

    fn item_for(&self, index: &ModelIndex) -> Option<Arc<TreeItem>> {
        match index.id {
            None => Some(Arc::clone(self.tree.root())),
            Some(id) => self.tree.item(id),
        }
    }

    fn visible_parent_of(&self, item: &TreeItem) -> Option<Arc<TreeItem>> {
        match self.visible_parent.get(&item.id()) {
            Some(id) => self.tree.item(*id),
            None => item.parent(),
        }
    }

    /// Index of `item` in the visible hierarchy, computed along its visible parent.
    pub fn index_of(&self, item: &TreeItem) -> ModelIndex {
        if self.empty || std::ptr::eq(item, self.tree.root().as_ref()) {
            return ModelIndex::invalid();
        }
        if item.is_hidden() || !self.tree.contains(item) {
            return ModelIndex::invalid();
        }
        let Some(parent) = self.visible_parent_of(item) else {
            return ModelIndex::invalid();
        };
        self.get_children(Some(parent.as_ref()))
            .iter()
            .position(|child| std::ptr::eq(child.as_ref(), item))
            .map(|row| ModelIndex::new(row, 0, item.id()))
            .unwrap_or_default()
    }

    fn parent_index(&self, item: &TreeItem) -> ModelIndex {
        match self.visible_parent_of(item) {
            Some(parent) => self.index_of(&parent),
            None => ModelIndex::invalid(),
        }
    }

    // ========================================================================
    // HIDDEN TREE LEVELS
    // ========================================================================

    pub fn hidden_levels(&self) -> Vec<usize> {
        self.hidden_levels.iter().copied().collect()
    }

    /// Hides all items of `level` in a system tree.
    ///
    /// Hiding an already hidden level is a no-op. Levels must lie between 1
    /// and the tree depth (exclusive).
    pub fn hide_tree_level(&mut self, level: usize) -> Result<(), TreeError> {
        if self.tree.tree_type() != TreeType::System {
            return Err(TreeError::NotSystemTree);
        }
        let depth = self.tree.depth();
        if level == 0 || level >= depth {
            return Err(TreeError::InvalidLevel { level, depth });
        }
        if self.hidden_levels.contains(&level) {
            return Ok(());
        }

        let above = (0..level)
            .rev()
            .find(|l| !self.hidden_levels.contains(l))
            .unwrap_or(0);
        let below = (level + 1..=depth)
            .find(|l| !self.hidden_levels.contains(l))
            .unwrap_or(depth);

        // visible parents before the hierarchy changes
        let anchors: Vec<(Arc<TreeItem>, ModelIndex, usize)> = self
            .items_at_depth(above)
            .into_iter()
            .map(|item| {
                let index = self.index_of(&item);
                let rows = self.get_children(Some(item.as_ref())).len();
                (item, index, rows)
            })
            .collect();

        self.hidden_levels.insert(level);
        for item in self.items_at_depth(level) {
            item.set_hidden(true);
            self.hidden_children.remove(&item.id());
        }

        for (anchor, index, old_rows) in anchors {
            if old_rows > 0 {
                self.emit(ModelEvent::RowsAboutToBeRemoved {
                    parent: index,
                    first: 0,
                    last: old_rows - 1,
                });
            }
            self.hidden_children.insert(anchor.id(), Vec::new());
            if old_rows > 0 {
                self.emit(ModelEvent::RowsRemoved {
                    parent: index,
                    first: 0,
                    last: old_rows - 1,
                });
            }

            let promoted = descendants_at_depth(&anchor, below);
            if promoted.is_empty() {
                continue;
            }
            let last = promoted.len() - 1;
            self.emit(ModelEvent::RowsAboutToBeInserted { parent: index, first: 0, last });
            for item in &promoted {
                self.visible_parent.insert(item.id(), anchor.id());
            }
            self.hidden_children.insert(anchor.id(), promoted);
            self.emit(ModelEvent::RowsInserted { parent: index, first: 0, last });
        }
        log::info!(
            "[Model] Level {} of '{}' hidden ({} hidden levels)",
            level,
            self.tree.label(),
            self.hidden_levels.len()
        );
        Ok(())
    }

    /// Shows every hidden level again in one model reset.
    pub fn unhide_tree_level(&mut self) {
        if self.hidden_levels.is_empty() {
            return;
        }
        self.emit(ModelEvent::ModelAboutToBeReset);
        for item in self.tree.items() {
            if item.is_hidden() {
                item.set_hidden(false);
            }
        }
        self.hidden_levels.clear();
        self.hidden_children.clear();
        self.visible_parent.clear();
        self.emit(ModelEvent::ModelReset);
        log::info!("[Model] All levels of '{}' visible", self.tree.label());
    }

    fn items_at_depth(&self, depth: usize) -> Vec<Arc<TreeItem>> {
        if depth == 0 {
            return vec![Arc::clone(self.tree.root())];
        }
        self.tree
            .items()
            .into_iter()
            .filter(|item| item.depth() == depth)
            .collect()
    }

    // ========================================================================
    // STRUCTURAL EDITS
    // ========================================================================

    /// Removes `item` and its subtree. Removing the root empties the model.
    pub fn remove_item(&mut self, item: &Arc<TreeItem>) -> Result<(), TreeError> {
        if !self.tree.contains(item) {
            return Err(TreeError::ItemNotInTree(item.id()));
        }
        if Arc::ptr_eq(item, self.tree.root()) {
            self.empty_model();
        } else {
            let parent = item.parent().ok_or(TreeError::NoParent(item.id()))?;
            detach_markers(item);
            let index = self.index_of(item);
            let parent_index = self.parent_index(item);
            if index.is_valid() {
                self.emit(ModelEvent::RowsAboutToBeRemoved {
                    parent: parent_index,
                    first: index.row,
                    last: index.row,
                });
            } else {
                // a hidden item is only visible through its promoted descendants
                let removed: HashSet<ItemId> = item.subtree().iter().map(|i| i.id()).collect();
                self.remove_promoted(&removed);
            }
            parent.remove_child(item);
            self.forget(item);
            if index.is_valid() {
                self.emit(ModelEvent::RowsRemoved {
                    parent: parent_index,
                    first: index.row,
                    last: index.row,
                });
            }
            self.tree.update_items();
            log::debug!("[Model] Removed {} from '{}'", item.id(), self.tree.label());
        }
        self.emit(ModelEvent::TreeStructureChanged);
        Ok(())
    }

    fn empty_model(&mut self) {
        self.empty = true;
        let root = Arc::clone(self.tree.root());
        for child in root.children() {
            detach_markers(&child);
            self.emit(ModelEvent::RowsAboutToBeRemoved {
                parent: ModelIndex::invalid(),
                first: 0,
                last: 0,
            });
            root.remove_child(&child);
            self.emit(ModelEvent::RowsRemoved {
                parent: ModelIndex::invalid(),
                first: 0,
                last: 0,
            });
        }
        self.hidden_levels.clear();
        self.hidden_children.clear();
        self.visible_parent.clear();
        self.found_items.clear();
        self.found_parents.clear();
        self.selected_parents.clear();
        self.tree.update_items();
        log::info!("[Model] '{}' emptied", self.tree.label());
    }

    /// Takes the promoted rows of `removed` items out of the lists of the
    /// surviving anchors, one bracketed removal per contiguous run.
    fn remove_promoted(&mut self, removed: &HashSet<ItemId>) {
        let anchors: Vec<ItemId> = self
            .hidden_children
            .iter()
            .filter(|(id, list)| {
                !removed.contains(id) && list.iter().any(|child| removed.contains(&child.id()))
            })
            .map(|(id, _)| *id)
            .collect();
        for anchor_id in anchors {
            let Some(anchor) = self.tree.item(anchor_id) else {
                continue;
            };
            let parent = self.index_of(&anchor);
            let rows: Vec<usize> = self
                .hidden_children
                .get(&anchor_id)
                .map(|list| {
                    list.iter()
                        .enumerate()
                        .filter(|(_, child)| removed.contains(&child.id()))
                        .map(|(row, _)| row)
                        .collect()
                })
                .unwrap_or_default();
            // back to front so earlier runs keep their row numbers
            for (first, last) in contiguous_runs(&rows).into_iter().rev() {
                self.emit(ModelEvent::RowsAboutToBeRemoved { parent, first, last });
                if let Some(list) = self.hidden_children.get_mut(&anchor_id) {
                    list.drain(first..=last);
                }
                self.emit(ModelEvent::RowsRemoved { parent, first, last });
            }
        }
    }

    /// Drops hidden-level bookkeeping referring to a removed subtree.
    fn forget(&mut self, item: &Arc<TreeItem>) {
        let removed: HashSet<ItemId> = item.subtree().iter().map(|i| i.id()).collect();
        for list in self.hidden_children.values_mut() {
            list.retain(|child| !removed.contains(&child.id()));
        }
        self.hidden_children.retain(|id, _| !removed.contains(id));
        self.visible_parent.retain(|id, _| !removed.contains(id));
        self.found_items.retain(|id| !removed.contains(id));
    }

    /// Appends `new_item` (created by this tree) to `parent`, the root if `None`.
    ///
    /// With hidden levels the rows appear below the nearest visible ancestor
    /// of `parent`. An item landing on a hidden level is hidden itself and
    /// only its boundary descendants become rows.
    pub fn add_item(
        &mut self,
        new_item: Arc<TreeItem>,
        parent: Option<&Arc<TreeItem>>,
    ) -> Result<ModelIndex, TreeError> {
        if !self.tree.owns(&new_item) {
            return Err(TreeError::ItemNotInTree(new_item.id()));
        }
        let parent = match parent {
            Some(parent) if !self.tree.contains(parent) => {
                return Err(TreeError::ItemNotInTree(parent.id()))
            }
            Some(parent) => Arc::clone(parent),
            None => Arc::clone(self.tree.root()),
        };
        self.empty = false;
        let anchor = self.visible_anchor(&parent);
        let anchor_index = self.index_of(&anchor);

        if Arc::ptr_eq(&anchor, &parent) && !self.hidden_children.contains_key(&parent.id()) {
            let row = parent.child_count();
            self.emit(ModelEvent::RowsAboutToBeInserted {
                parent: anchor_index,
                first: row,
                last: row,
            });
            parent.add_child(Arc::clone(&new_item));
            self.tree.update_items();
            self.rebuild_hidden();
            self.emit(ModelEvent::RowsInserted {
                parent: anchor_index,
                first: row,
                last: row,
            });
        } else {
            // rows of the anchor come from its promoted list, which is still untouched
            let shown: HashSet<ItemId> = self
                .get_children(Some(anchor.as_ref()))
                .iter()
                .map(|child| child.id())
                .collect();
            parent.add_child(Arc::clone(&new_item));
            self.tree.update_items();
            let rows: Vec<usize> = self
                .projected_children(&anchor)
                .iter()
                .enumerate()
                .filter(|(_, child)| !shown.contains(&child.id()))
                .map(|(row, _)| row)
                .collect();
            match (rows.first(), rows.last()) {
                (Some(&first), Some(&last)) => {
                    self.emit(ModelEvent::RowsAboutToBeInserted {
                        parent: anchor_index,
                        first,
                        last,
                    });
                    self.rebuild_hidden();
                    self.emit(ModelEvent::RowsInserted {
                        parent: anchor_index,
                        first,
                        last,
                    });
                }
                _ => self.rebuild_hidden(),
            }
        }
        self.emit(ModelEvent::TreeStructureChanged);
        Ok(self.index_of(&new_item))
    }

    /// Puts `new_item` in the place of `old_item`, which is detached.
    pub fn replace_subtree(
        &mut self,
        old_item: &Arc<TreeItem>,
        new_item: Arc<TreeItem>,
    ) -> Result<(), TreeError> {
        if Arc::ptr_eq(old_item, self.tree.root()) {
            return Err(TreeError::RootNotReplaceable);
        }
        if !self.tree.owns(&new_item) {
            return Err(TreeError::ItemNotInTree(new_item.id()));
        }
        let parent = old_item.parent().ok_or(TreeError::NoParent(old_item.id()))?;
        let position = parent
            .child_position(old_item)
            .ok_or(TreeError::ItemNotInTree(old_item.id()))?;
        // promoted rows may move between anchors
        let reset = !self.hidden_levels.is_empty();
        if reset {
            self.emit(ModelEvent::ModelAboutToBeReset);
        }
        parent.remove_child(old_item);
        parent.insert_child(position, Arc::clone(&new_item));

        let kept: HashSet<ItemId> = new_item.subtree().iter().map(|i| i.id()).collect();
        let detached: Vec<Arc<TreeItem>> = old_item
            .subtree()
            .into_iter()
            .filter(|item| !kept.contains(&item.id()))
            .collect();
        for item in &detached {
            if item.is_hidden() {
                item.set_hidden(false);
            }
        }
        let removed: HashSet<ItemId> = detached.iter().map(|i| i.id()).collect();
        self.found_items.retain(|id| !removed.contains(id));
        self.rebuild_hidden();

        let rebuilding = self.tree.is_rebuilding();
        if !rebuilding {
            self.tree.update_items();
        }
        if reset {
            self.emit(ModelEvent::ModelReset);
        }
        if !rebuilding {
            self.emit(ModelEvent::TreeStructureChanged);
        }
        Ok(())
    }

    /// Nearest ancestor of `item` (or `item` itself) that is not hidden.
    fn visible_anchor(&self, item: &Arc<TreeItem>) -> Arc<TreeItem> {
        let mut current = Arc::clone(item);
        while current.is_hidden() {
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    /// First visible level below the hidden `level`.
    fn visible_depth_below(&self, level: usize) -> usize {
        (level + 1..)
            .find(|l| !self.hidden_levels.contains(l))
            .unwrap_or(level + 1)
    }

    /// Children `anchor` shows with the hidden levels applied to the current structure.
    fn projected_children(&self, anchor: &TreeItem) -> Vec<Arc<TreeItem>> {
        let next = anchor.depth() + 1;
        if self.hidden_levels.contains(&next) {
            descendants_at_depth(anchor, self.visible_depth_below(next))
        } else {
            anchor.children()
        }
    }

    /// Recomputes hidden flags and promoted lists from `hidden_levels`.
    fn rebuild_hidden(&mut self) {
        if self.hidden_levels.is_empty() {
            return;
        }
        self.hidden_children.clear();
        self.visible_parent.clear();
        for item in self.tree.root().subtree() {
            let depth = item.depth();
            let hidden = depth > 0 && self.hidden_levels.contains(&depth);
            if item.is_hidden() != hidden {
                item.set_hidden(hidden);
            }
            if !hidden && self.hidden_levels.contains(&(depth + 1)) {
                let promoted = self.projected_children(&item);
                for child in &promoted {
                    self.visible_parent.insert(child.id(), item.id());
                }
                self.hidden_children.insert(item.id(), promoted);
            }
        }
    }

    // ========================================================================
    // FOUND AND SELECTED STATE
    // ========================================================================

    fn ancestor_closure(&self, indices: &[ModelIndex]) -> HashSet<ItemId> {
        let mut closure = HashSet::new();
        for index in indices {
            let mut parent = self.parent(index);
            while let Some(id) = parent.id {
                if !closure.insert(id) {
                    break;
                }
                parent = self.parent(&parent);
            }
        }
        closure
    }

    /// Ancestors of the selection get highlighted.
    pub fn mark_selected_parents(&mut self, selected: &[ModelIndex]) {
        self.selected_parents = self.ancestor_closure(selected);
        self.emit(ModelEvent::ValuesChanged);
    }

    /// Valid until the next structural edit.
    pub fn set_found_items(&mut self, found: &[ModelIndex]) {
        self.found_items = found.iter().filter_map(|index| index.id).collect();
        self.found_parents = self.ancestor_closure(found);
        self.emit(ModelEvent::ValuesChanged);
    }

    pub fn found_items(&self) -> Vec<ItemId> {
        self.found_items.iter().copied().collect()
    }

    pub fn is_found(&self, id: ItemId) -> bool {
        self.found_items.contains(&id)
    }

    /// Refreshes derived tree state after values were stored.
    pub fn values_changed(&self) {
        self.tree.values_changed();
        self.emit(ModelEvent::ValuesChanged);
    }
}

impl TreeModelInterface for TreeModel {
    fn tree(&self) -> &Arc<Tree> {
        &self.tree
    }

    fn index(&self, row: usize, column: usize, parent: &ModelIndex) -> ModelIndex {
        if column != 0 {
            return ModelIndex::invalid();
        }
        let Some(parent) = self.item_for(parent) else {
            return ModelIndex::invalid();
        };
        self.get_children(Some(parent.as_ref()))
            .get(row)
            .map(|child| ModelIndex::new(row, column, child.id()))
            .unwrap_or_default()
    }

    fn parent(&self, index: &ModelIndex) -> ModelIndex {
        match self.get_tree_item(index) {
            Some(item) => self.parent_index(&item),
            None => ModelIndex::invalid(),
        }
    }

    fn row_count(&self, parent: &ModelIndex) -> usize {
        if self.empty || parent.column != 0 {
            return 0;
        }
        match self.item_for(parent) {
            Some(item) => self.get_children(Some(item.as_ref())).len(),
            None => 0,
        }
    }

    fn data(&self, index: &ModelIndex, role: ItemRole) -> ItemData {
        let Some(item) = self.get_tree_item(index) else {
            return ItemData::None;
        };
        match role {
            ItemRole::Display => ItemData::Text(item.label()),
            ItemRole::Value => ItemData::Number(item.display_value()),
            ItemRole::Icon => {
                // exclusive values of non-additive metrics are meaningless
                let gray_out = item.is_calculated() && !item.get_value().1;
                ItemData::Icon(item.value_view().get_icon(Some(item.as_ref()), gray_out))
            }
            ItemRole::Color => ItemData::Color(item.color()),
            ItemRole::ToolTip => ItemData::Text(tooltip(&item)),
            ItemRole::Selected => ItemData::Flag(item.is_selected()),
            ItemRole::Found => ItemData::Flag(self.found_items.contains(&item.id())),
            ItemRole::FoundParent => ItemData::Flag(self.found_parents.contains(&item.id())),
            ItemRole::SelectedParent => {
                ItemData::Flag(self.selected_parents.contains(&item.id()))
            }
            ItemRole::Markers => {
                let mut markers = item.markers();
                markers.extend(item.dependency_markers());
                if !item.is_expanded() {
                    markers.extend(item.parent_markers());
                }
                ItemData::Markers(markers)
            }
        }
    }
}

/// Visible-boundary descendants of `anchor` at `depth`, left to right.
fn descendants_at_depth(anchor: &TreeItem, depth: usize) -> Vec<Arc<TreeItem>> {
    let mut result = Vec::new();
    let mut stack: Vec<Arc<TreeItem>> = anchor.children().into_iter().rev().collect();
    while let Some(item) = stack.pop() {
        if item.depth() == depth {
            result.push(item);
        } else if item.depth() < depth {
            stack.extend(item.children().into_iter().rev());
        }
    }
    result
}

/// Ascending rows grouped into inclusive `(first, last)` runs.
fn contiguous_runs(rows: &[usize]) -> Vec<(usize, usize)> {
    let mut runs: Vec<(usize, usize)> = Vec::new();
    for &row in rows {
        match runs.last_mut() {
            Some((_, last)) if *last + 1 == row => *last = row,
            _ => runs.push((row, row)),
        }
    }
    runs
}

/// Detaches every marker held inside the subtree of `item`.
fn detach_markers(item: &Arc<TreeItem>) {
    for node in item.subtree() {
        let markers: Vec<MarkerRef> = node
            .markers()
            .into_iter()
            .chain(node.dependency_markers())
            .collect();
        for marker in markers {
            node.remove_marker(&marker);
        }
    }
}
