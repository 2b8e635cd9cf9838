//! Node metadata a tree item may refer to.
//!
//! All records are shared (`Arc`) with the profile that produced them; a tree
//! item never owns them.

use crate::models::{Aggregation, DataType};
use std::sync::Arc;

/// Description of a metric.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricInfo {
    pub unique_name: String,
    pub display_name: String,
    pub unit: String,
    pub data_type: DataType,
    pub aggregation: Aggregation,
    /// Derived metrics are computed from other metrics on demand
    pub derived: bool,
}

impl MetricInfo {
    pub fn new(unique_name: &str, display_name: &str, data_type: DataType) -> Self {
        MetricInfo {
            unique_name: unique_name.to_string(),
            display_name: display_name.to_string(),
            unit: "sec".to_string(),
            data_type,
            aggregation: Aggregation::Sum,
            derived: false,
        }
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = unit.to_string();
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn derived(mut self) -> Self {
        self.derived = true;
        self
    }

    /// Occurrence counts and byte counts are integral
    pub fn is_integer(&self) -> bool {
        self.data_type == DataType::Integer || matches!(self.unit.as_str(), "occ" | "bytes")
    }
}

/// Description of a source code region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionInfo {
    pub name: String,
    pub mangled_name: String,
    /// Source file, or a paradigm name for regions without source
    pub module: String,
    pub begin_line: i64,
    pub end_line: i64,
}

impl RegionInfo {
    pub fn new(name: &str, module: &str, begin_line: i64, end_line: i64) -> Self {
        RegionInfo {
            name: name.to_string(),
            mangled_name: name.to_string(),
            module: module.to_string(),
            begin_line,
            end_line,
        }
    }
}

/// A call path node: the region it calls plus the call site line.
#[derive(Debug, Clone, PartialEq)]
pub struct CnodeInfo {
    pub region: Arc<RegionInfo>,
    pub line: i64,
}

/// A node of the system hierarchy (machine, node, process, thread).
#[derive(Debug, Clone, PartialEq)]
pub struct SystemNodeInfo {
    pub name: String,
    pub class: String,
    pub rank: Option<u32>,
}

/// Reference into the profile a tree item stands for.
#[derive(Debug, Clone, PartialEq)]
pub enum CubeObject {
    Metric(Arc<MetricInfo>),
    Cnode(Arc<CnodeInfo>),
    Region(Arc<RegionInfo>),
    System(Arc<SystemNodeInfo>),
}

impl CubeObject {
    pub fn region(&self) -> Option<&Arc<RegionInfo>> {
        match self {
            CubeObject::Cnode(cnode) => Some(&cnode.region),
            CubeObject::Region(region) => Some(region),
            _ => None,
        }
    }

    pub fn metric(&self) -> Option<&Arc<MetricInfo>> {
        match self {
            CubeObject::Metric(metric) => Some(metric),
            _ => None,
        }
    }
}
