//! Sorting and filtering proxy over a `TreeModel`.
//!
//! Proxy indices carry the same item ids as source indices; only the rows
//! differ. Rows are mapped per parent on demand.

use super::{ItemData, ItemRole, ModelIndex, TreeModel, TreeModelInterface};
use crate::tree::{Tree, TreeItem};
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Value,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

type Filter = Box<dyn Fn(&TreeItem) -> bool + Send + Sync>;

pub struct TreeModelProxy {
    source: TreeModel,
    sort: Option<(SortKey, SortOrder)>,
    filter: Option<Filter>,
}

impl TreeModelProxy {
    pub fn new(source: TreeModel) -> Self {
        TreeModelProxy {
            source,
            sort: None,
            filter: None,
        }
    }

    pub fn source(&self) -> &TreeModel {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut TreeModel {
        &mut self.source
    }

    pub fn set_sort(&mut self, key: SortKey, order: SortOrder) {
        self.sort = Some((key, order));
    }

    /// Back to source order.
    pub fn clear_sort(&mut self) {
        self.sort = None;
    }

    /// Only rows accepted by `filter` are shown (with their subtrees).
    pub fn set_filter(&mut self, filter: impl Fn(&TreeItem) -> bool + Send + Sync + 'static) {
        self.filter = Some(Box::new(filter));
    }

    pub fn clear_filter(&mut self) {
        self.filter = None;
    }

    /// Hides rows whose value rounds to zero.
    pub fn filter_zero_values(&mut self) {
        self.set_filter(|item: &TreeItem| {
            let threshold = item
                .globals()
                .round_threshold(crate::globals::PrecisionFormat::Trees);
            !item.is_calculated() || item.get_value().0.abs() >= threshold
        });
    }

    /// Source indices of the proxy children of the source index `parent`.
    fn mapped_children(&self, source_parent: &ModelIndex) -> Vec<ModelIndex> {
        let mut rows: Vec<(ModelIndex, Arc<TreeItem>)> = (0..self.source.row_count(source_parent))
            .map(|row| self.source.index(row, 0, source_parent))
            .filter_map(|index| self.source.get_tree_item(&index).map(|item| (index, item)))
            .filter(|(_, item)| self.filter.as_ref().map(|f| f(item.as_ref())).unwrap_or(true))
            .collect();

        if let Some((key, order)) = self.sort {
            let mut keyed: Vec<(SortValue, ModelIndex)> = rows
                .drain(..)
                .map(|(index, item)| (SortValue::of(&item, key), index))
                .collect();
            keyed.sort_by(|(a, _), (b, _)| a.compare(b, order));
            return keyed.into_iter().map(|(_, index)| index).collect();
        }
        rows.into_iter().map(|(index, _)| index).collect()
    }

    /// Source index of the proxy index `index`.
    pub fn map_to_source(&self, index: &ModelIndex) -> ModelIndex {
        match self.get_tree_item(index) {
            Some(item) => self.source.index_of(&item),
            None => ModelIndex::invalid(),
        }
    }

    /// Proxy index of the source index `index`; invalid if filtered out.
    pub fn map_from_source(&self, index: &ModelIndex) -> ModelIndex {
        if !index.is_valid() {
            return ModelIndex::invalid();
        }
        let source_parent = self.source.parent(index);
        if source_parent.is_valid() && !self.map_from_source(&source_parent).is_valid() {
            return ModelIndex::invalid();
        }
        self.mapped_children(&source_parent)
            .iter()
            .position(|child| child.id == index.id)
            .map(|row| ModelIndex {
                row,
                column: index.column,
                id: index.id,
            })
            .unwrap_or_default()
    }
}

/// Sort key; NaN (uncalculated) values always sort last.
enum SortValue {
    Number(f64),
    Text(String),
}

impl SortValue {
    fn of(item: &TreeItem, key: SortKey) -> Self {
        match key {
            SortKey::Value => SortValue::Number(item.display_value()),
            SortKey::Name => SortValue::Text(item.display_name().to_lowercase()),
        }
    }

    /// `order` applies to comparable values only; NaN stays at the end.
    fn compare(&self, other: &SortValue, order: SortOrder) -> Ordering {
        let directed = |ordering: Ordering| match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        };
        match (self, other) {
            (SortValue::Number(a), SortValue::Number(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => directed(a.partial_cmp(b).unwrap_or(Ordering::Equal)),
            },
            (SortValue::Text(a), SortValue::Text(b)) => directed(a.cmp(b)),
            _ => Ordering::Equal,
        }
    }
}

impl TreeModelInterface for TreeModelProxy {
    fn tree(&self) -> &Arc<Tree> {
        self.source.tree()
    }

    fn index(&self, row: usize, column: usize, parent: &ModelIndex) -> ModelIndex {
        if column != 0 {
            return ModelIndex::invalid();
        }
        let source_parent = self.map_to_source(parent);
        if parent.is_valid() && !source_parent.is_valid() {
            return ModelIndex::invalid();
        }
        self.mapped_children(&source_parent)
            .get(row)
            .and_then(|child| child.id)
            .map(|id| ModelIndex::new(row, column, id))
            .unwrap_or_default()
    }

    fn parent(&self, index: &ModelIndex) -> ModelIndex {
        let source = self.map_to_source(index);
        if !source.is_valid() {
            return ModelIndex::invalid();
        }
        self.map_from_source(&self.source.parent(&source))
    }

    fn row_count(&self, parent: &ModelIndex) -> usize {
        if parent.column != 0 {
            return 0;
        }
        let source_parent = self.map_to_source(parent);
        if parent.is_valid() && !source_parent.is_valid() {
            return 0;
        }
        self.mapped_children(&source_parent).len()
    }

    fn data(&self, index: &ModelIndex, role: ItemRole) -> ItemData {
        self.source.data(&self.map_to_source(index), role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::Value;
    use crate::globals::Globals;
    use crate::models::{TreeItemType, TreeType};

    fn flat_proxy() -> TreeModelProxy {
        let tree = Tree::new(&Globals::new(), TreeType::Flat, "Flat tree");
        for (name, value) in [("beta", 2.0), ("alpha", 5.0), ("gamma", 0.0)] {
            let item = tree.add_item(None, name, TreeItemType::RegionItem, None);
            item.set_inclusive_value(Some(Arc::new(Value::Double(value))));
        }
        tree.add_item(None, "delta", TreeItemType::RegionItem, None);
        TreeModelProxy::new(TreeModel::new(tree))
    }

    fn names(proxy: &TreeModelProxy) -> Vec<String> {
        let root = ModelIndex::invalid();
        (0..proxy.row_count(&root))
            .map(|row| {
                let index = proxy.index(row, 0, &root);
                proxy.get_tree_item(&index).unwrap().name().to_string()
            })
            .collect()
    }

    #[test]
    fn test_sort_by_value_puts_uncalculated_last() {
        let mut proxy = flat_proxy();
        proxy.set_sort(SortKey::Value, SortOrder::Ascending);
        assert_eq!(names(&proxy), vec!["gamma", "beta", "alpha", "delta"]);
    }

    #[test]
    fn test_descending_value_sort_keeps_uncalculated_last() {
        let mut proxy = flat_proxy();
        proxy.set_sort(SortKey::Value, SortOrder::Descending);
        assert_eq!(names(&proxy), vec!["alpha", "beta", "gamma", "delta"]);
    }

    #[test]
    fn test_sort_by_name() {
        let mut proxy = flat_proxy();
        proxy.set_sort(SortKey::Name, SortOrder::Descending);
        assert_eq!(names(&proxy), vec!["gamma", "delta", "beta", "alpha"]);
        proxy.clear_sort();
        assert_eq!(names(&proxy), vec!["beta", "alpha", "gamma", "delta"]);
    }

    #[test]
    fn test_zero_filter_and_mapping() {
        let mut proxy = flat_proxy();
        proxy.filter_zero_values();
        assert_eq!(names(&proxy), vec!["beta", "alpha", "delta"]);

        let source_gamma = proxy.source().find_name("gamma")[0];
        assert!(!proxy.map_from_source(&source_gamma).is_valid());

        let source_alpha = proxy.source().find_name("alpha")[0];
        let mapped = proxy.map_from_source(&source_alpha);
        assert_eq!(mapped.row, 1);
        assert_eq!(proxy.map_to_source(&mapped), source_alpha);
    }
}
