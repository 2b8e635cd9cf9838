//! CUBE tree viewer core
//!
//! Tree items cache the values computed for them and derive labels, colours
//! and icons from those values through exchangeable value views. Tree models
//! expose the trees to widgets, with hidden levels, search and sorting.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Core enums and identifiers
//! - **cube**: Value objects and profile metadata
//! - **globals**: Session context (value view registry, precision, fonts)
//! - **view**: Value views turning values into text and icons
//! - **tree**: Tree items, trees and markers
//! - **model**: Hierarchical models and the sorting/filtering proxy
//! - **config**: Persistent settings
//! - **log_collector**: Decoupled logging to disk
//! - **synthetic**: Deterministic profiles and background calculation
//! - **ui**: egui frontend

pub mod error;
pub mod models;

pub(crate) mod lock;

pub mod cube;
pub mod globals;
pub mod view;

pub mod model;
pub mod tree;

pub mod config;

// Robust, decoupled logging system
pub mod log_collector;

pub mod synthetic;

pub mod ui;

// Re-export the log crate for macro usage
pub use log;

pub use log_collector::{LogCollector, LogLine};

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use error::{AppError, ConfigError, Result, TreeError};

pub use models::{
    Aggregation, CalculationStatus, DataType, ItemId, TauDisplayMode, TreeItemType, TreeType,
    ValueModus,
};

pub use cube::{CubeObject, MetricInfo, Value};
pub use globals::{Globals, GlobalsEvent, PrecisionFormat, PrecisionSettings};
pub use view::{DefaultValueView, ValueView};

pub use tree::{MarkerRef, Tree, TreeContext, TreeItem};
pub use model::{ModelEvent, ModelIndex, TreeModel, TreeModelInterface, TreeModelProxy};

pub use config::{AppSettings, SettingsManager};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert_eq!(VERSION, "0.1.0");
    }

    #[test]
    fn test_error_reexport() {
        let _: Result<i32> = Ok(42);
        let err: AppError = TreeError::RootNotReplaceable.into();
        assert!(matches!(err, AppError::Tree(_)));
    }

    #[test]
    fn test_enum_variants_accessible() {
        assert_eq!(ValueModus::default(), ValueModus::Absolute);
        assert_eq!(CalculationStatus::default(), CalculationStatus::Invalid);
    }
}
