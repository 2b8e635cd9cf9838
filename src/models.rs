//! Core data types for the CUBE tree viewer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a tree item within one `Tree`.
///
/// Model indices carry the id instead of a pointer so they stay `Copy` and hashable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Data type tag of a computed value. Selects the value view used to interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// No value / absent payload
    None,
    Double,
    Integer,
    Histogram,
    TauAtomic,
}

impl DataType {
    pub fn all() -> &'static [DataType] {
        &[
            DataType::None,
            DataType::Double,
            DataType::Integer,
            DataType::Histogram,
            DataType::TauAtomic,
        ]
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::None => "NONE",
            DataType::Double => "DOUBLE",
            DataType::Integer => "INTEGER",
            DataType::Histogram => "HISTOGRAM",
            DataType::TauAtomic => "TAU_ATOMIC",
        };
        f.write_str(name)
    }
}

/// The kind of tree an item lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreeType {
    Metric,
    Call,
    System,
    Flat,
}

impl fmt::Display for TreeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TreeType::Metric => "Metric tree",
            TreeType::Call => "Call tree",
            TreeType::System => "System tree",
            TreeType::Flat => "Flat tree",
        };
        f.write_str(name)
    }
}

/// Type of a single tree item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TreeItemType {
    /// Invisible root of every tree
    Root,
    MetricItem,
    CallItem,
    RegionItem,
    SystemTreeNodeItem,
    LocationGroupItem,
    LocationItem,
    /// Synthetic node without payload (aggregates, plugin items)
    Aggregated,
}

impl TreeItemType {
    /// Items that carry region metadata (and therefore source information)
    pub fn has_region(&self) -> bool {
        matches!(self, TreeItemType::CallItem | TreeItemType::RegionItem)
    }
}

/// Calculation status of one value (inclusive or exclusive) of a tree item.
///
/// `Invalid -> Calculated` once the value is set, `Calculated -> Ready` once
/// label and colour are derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CalculationStatus {
    #[default]
    Invalid,
    Calculated,
    Ready,
}

/// How values are presented in the trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ValueModus {
    /// Plain values in the unit of the metric
    #[default]
    Absolute,
    /// Percentage of the tree's reference value
    Percent,
}

/// How the values of several items of a metric combine.
///
/// Only additive metrics have a meaningful exclusive value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Aggregation {
    #[default]
    Sum,
    Minimum,
    Maximum,
}

impl Aggregation {
    /// Folds `other` into `acc` according to the aggregation kind.
    pub fn combine(&self, acc: f64, other: f64) -> f64 {
        match self {
            Aggregation::Sum => acc + other,
            Aggregation::Minimum => acc.min(other),
            Aggregation::Maximum => acc.max(other),
        }
    }

    pub fn is_additive(&self) -> bool {
        matches!(self, Aggregation::Sum)
    }
}

/// Display mode for TAU atomic values (persisted as an index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TauDisplayMode {
    /// Minimum, average and maximum side by side
    #[default]
    Full,
    Minimum,
    Average,
    Maximum,
}

impl TauDisplayMode {
    /// Convert to UI index (0=Full, 1=Minimum, 2=Average, 3=Maximum)
    pub fn to_index(&self) -> usize {
        match self {
            TauDisplayMode::Full => 0,
            TauDisplayMode::Minimum => 1,
            TauDisplayMode::Average => 2,
            TauDisplayMode::Maximum => 3,
        }
    }

    /// Convert from UI index; unknown indices fall back to `Full`
    pub fn from_index(index: usize) -> Self {
        match index {
            1 => TauDisplayMode::Minimum,
            2 => TauDisplayMode::Average,
            3 => TauDisplayMode::Maximum,
            _ => TauDisplayMode::Full,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TauDisplayMode::Full => "Min, avg, max",
            TauDisplayMode::Minimum => "Minimum",
            TauDisplayMode::Average => "Average",
            TauDisplayMode::Maximum => "Maximum",
        }
    }
}
