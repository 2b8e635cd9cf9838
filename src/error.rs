//! Unified error type hierarchy for the CUBE tree viewer
//!
//! Provides structured error handling with TreeError, ConfigError and AppError.
//! Missing data is never an error here: absent values are reported through
//! sentinels (NaN, empty strings, validity flags) by the tree items themselves.

use crate::models::ItemId;
use std::io;
use thiserror::Error;

/// Structural tree and tree model errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Tree levels can only be hidden in the system tree")]
    NotSystemTree,

    #[error("Invalid tree level {level} (tree depth is {depth})")]
    InvalidLevel { level: usize, depth: usize },

    #[error("Item {0} is not part of this tree")]
    ItemNotInTree(ItemId),

    #[error("Item {0} has no parent")]
    NoParent(ItemId),

    #[error("The root item cannot be replaced")]
    RootNotReplaceable,
}

/// Settings file parsing and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Settings file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid JSON in settings: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Settings validation failed: {0}")]
    ValidationFailed(String),

    #[error("IO error during settings operations: {0}")]
    IoError(#[from] io::Error),
}

/// Global error type for user facing failures.
#[derive(Error, Debug, Clone)]
pub enum AppError {
    /// Structural edit rejected by the tree
    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    /// Settings persist or deserialize error
    #[error("Settings error: {0}")]
    Settings(String),

    /// Logging could not be initialized
    #[error("Logging error: {0}")]
    Logging(String),

    /// Invalid input (e.g. malformed search pattern)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    /// Get a user-facing error message suitable for UI display
    pub fn user_message(&self) -> String {
        match self {
            AppError::Tree(e) => format!("The tree could not be changed: {}", e),
            AppError::Settings(msg) => format!("Settings error: {}", msg),
            AppError::Logging(msg) => format!("Logging unavailable: {}", msg),
            AppError::InvalidInput(msg) => format!("Invalid input: {}", msg),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Settings(e.to_string())
    }
}

/// Top-level result type for operations of the binary.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_error_display() {
        let err = TreeError::InvalidLevel { level: 4, depth: 3 };
        assert_eq!(err.to_string(), "Invalid tree level 4 (tree depth is 3)");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::FileNotFound("/etc/cubegui.json".to_string());
        assert_eq!(err.to_string(), "Settings file not found: /etc/cubegui.json");
    }

    #[test]
    fn test_app_error_from_tree_error() {
        let err: AppError = TreeError::NotSystemTree.into();
        assert!(err.user_message().contains("system tree"));
    }

    #[test]
    fn test_result_type_err() {
        let result: Result<i32> = Err("test error".into());
        assert!(result.is_err());
    }
}
