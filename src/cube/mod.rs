//! Slice of the profiling data model consumed by the trees.
//!
//! The profile library itself is external. This module only describes the
//! shape of what it hands over:
//! - `value`: computed values as a closed sum type keyed by `DataType`
//! - `metadata`: the metric/region/call-path/system node a tree item refers to

pub mod metadata;
pub mod value;

pub use metadata::{CnodeInfo, CubeObject, MetricInfo, RegionInfo, SystemNodeInfo};
pub use value::{HistogramValue, TauAtomicValue, TauPivot, Value};
