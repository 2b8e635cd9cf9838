//! Hierarchical item models on top of trees.
//!
//! `TreeModelInterface` is the contract tree widgets and proxies program
//! against. Indices name items by `ItemId`; the invalid index stands for the
//! (invisible) root. The visible hierarchy may differ from the tree structure
//! when levels of a system tree are hidden.
//!
//! Structural changes are announced as `ModelEvent`s over crossbeam channels,
//! always bracketed as begin/end pairs around the edit.

pub mod proxy;
pub mod tree_model;

pub use proxy::{SortKey, SortOrder, TreeModelProxy};
pub use tree_model::TreeModel;

use crate::globals::PrecisionFormat;
use crate::models::ItemId;
use crate::tree::{MarkerRef, Tree, TreeItem};
use egui::{Color32, ColorImage};
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::sync::Arc;

/// Separator of path segments in `find_path`
pub const PATH_SEPARATOR: &str = ":::";

/// Position of an item in the visible hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModelIndex {
    pub row: usize,
    pub column: usize,
    pub id: Option<ItemId>,
}

impl ModelIndex {
    pub fn new(row: usize, column: usize, id: ItemId) -> Self {
        ModelIndex {
            row,
            column,
            id: Some(id),
        }
    }

    /// The invalid index, parent of all top level rows.
    pub fn invalid() -> Self {
        ModelIndex::default()
    }

    pub fn is_valid(&self) -> bool {
        self.id.is_some()
    }
}

/// Kind of data requested from `TreeModelInterface::data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemRole {
    /// Label: value text and name
    Display,
    /// Display value, used for sorting
    Value,
    Icon,
    Color,
    ToolTip,
    Selected,
    Found,
    FoundParent,
    SelectedParent,
    Markers,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemData {
    None,
    Text(String),
    Number(f64),
    Icon(ColorImage),
    Color(Color32),
    Flag(bool),
    Markers(Vec<MarkerRef>),
}

impl ItemData {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ItemData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ItemData::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> bool {
        matches!(self, ItemData::Flag(true))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemFlags {
    pub enabled: bool,
    pub selectable: bool,
    pub has_children: bool,
}

/// Notifications emitted by models.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    RowsAboutToBeInserted { parent: ModelIndex, first: usize, last: usize },
    RowsInserted { parent: ModelIndex, first: usize, last: usize },
    RowsAboutToBeRemoved { parent: ModelIndex, first: usize, last: usize },
    RowsRemoved { parent: ModelIndex, first: usize, last: usize },
    ModelAboutToBeReset,
    ModelReset,
    /// Values, found or selected state changed; structure is unchanged
    ValuesChanged,
    /// Items were added, removed or replaced; derived trees must re-derive
    TreeStructureChanged,
}

/// Hierarchical model contract.
///
/// Searches walk the visible hierarchy breadth first with an explicit queue.
pub trait TreeModelInterface {
    fn tree(&self) -> &Arc<Tree>;

    /// Index of the child `row` of `parent`; invalid if out of range.
    fn index(&self, row: usize, column: usize, parent: &ModelIndex) -> ModelIndex;

    fn parent(&self, index: &ModelIndex) -> ModelIndex;

    fn row_count(&self, parent: &ModelIndex) -> usize;

    fn column_count(&self) -> usize {
        1
    }

    fn data(&self, index: &ModelIndex, role: ItemRole) -> ItemData;

    fn flags(&self, index: &ModelIndex) -> ItemFlags {
        match self.get_tree_item(index) {
            Some(_) => ItemFlags {
                enabled: true,
                selectable: true,
                has_children: self.row_count(index) > 0,
            },
            None => ItemFlags::default(),
        }
    }

    /// Item behind `index`; `None` for the invalid index.
    fn get_tree_item(&self, index: &ModelIndex) -> Option<Arc<TreeItem>> {
        self.tree().item(index.id?).filter(|item| !Arc::ptr_eq(item, self.tree().root()))
    }

    /// All visible items accepted by `predicate`, in breadth first order.
    fn find(&self, predicate: &dyn Fn(&TreeItem) -> bool) -> Vec<ModelIndex> {
        let mut result = Vec::new();
        let mut queue = VecDeque::from([ModelIndex::invalid()]);
        while let Some(parent) = queue.pop_front() {
            for row in 0..self.row_count(&parent) {
                let index = self.index(row, 0, &parent);
                if let Some(item) = self.get_tree_item(&index) {
                    if predicate(&item) {
                        result.push(index);
                    }
                    queue.push_back(index);
                }
            }
        }
        result
    }

    fn find_name(&self, name: &str) -> Vec<ModelIndex> {
        self.find(&|item: &TreeItem| item.name() == name)
    }

    /// Items whose display name matches `pattern`. A malformed pattern finds nothing.
    fn find_regex(&self, pattern: &str, case_sensitive: bool) -> Vec<ModelIndex> {
        let regex = match RegexBuilder::new(pattern)
            .case_insensitive(!case_sensitive)
            .build()
        {
            Ok(regex) => regex,
            Err(e) => {
                log::warn!("[Model] Invalid search pattern '{}': {}", pattern, e);
                return Vec::new();
            }
        };
        self.find(&|item: &TreeItem| regex.is_match(&item.display_name()))
    }

    /// Index of `item` in the visible hierarchy; stops at the first hit.
    fn find_item(&self, item: &TreeItem) -> ModelIndex {
        let mut queue = VecDeque::from([ModelIndex::invalid()]);
        while let Some(parent) = queue.pop_front() {
            for row in 0..self.row_count(&parent) {
                let index = self.index(row, 0, &parent);
                if index.id == Some(item.id()) {
                    return index;
                }
                queue.push_back(index);
            }
        }
        ModelIndex::invalid()
    }

    /// Follows `A:::B:::C` by item name, one segment per level.
    fn find_path(&self, path: &str) -> ModelIndex {
        let mut current = ModelIndex::invalid();
        for segment in path.split(PATH_SEPARATOR) {
            let next = (0..self.row_count(&current))
                .map(|row| self.index(row, 0, &current))
                .find(|index| {
                    self.get_tree_item(index)
                        .map(|item| item.name() == segment)
                        .unwrap_or(false)
                });
            match next {
                Some(index) => current = index,
                None => return ModelIndex::invalid(),
            }
        }
        current
    }
}

/// Tooltip: extended info of the value view, or name and value.
pub(crate) fn tooltip(item: &TreeItem) -> String {
    let info = item.value_view().get_extended_info(item);
    if !info.is_empty() {
        return format!("{}\n{}", item.display_name(), info);
    }
    if !item.is_calculated() {
        return item.display_name();
    }
    let globals = item.globals();
    format!(
        "{}: {}",
        item.display_name(),
        globals.format_number(
            item.display_value(),
            PrecisionFormat::Default,
            item.is_integer_type()
        )
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_index() {
        assert!(!ModelIndex::invalid().is_valid());
        assert!(ModelIndex::new(0, 0, ItemId(3)).is_valid());
    }

    #[test]
    fn test_item_data_accessors() {
        assert_eq!(ItemData::Text("a".into()).as_text(), Some("a"));
        assert_eq!(ItemData::Number(2.0).as_number(), Some(2.0));
        assert!(ItemData::Flag(true).as_flag());
        assert!(!ItemData::None.as_flag());
    }
}
