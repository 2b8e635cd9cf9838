//! Markers attached to tree items (search hits, advisor findings, dependencies).

use egui::Color32;
use std::sync::Arc;

/// A visual marker. Items hold shared references; identity is the allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeItemMarker {
    label: String,
    color: Color32,
    grayed: bool,
}

pub type MarkerRef = Arc<TreeItemMarker>;

impl TreeItemMarker {
    pub fn new(label: &str, color: Color32) -> MarkerRef {
        Arc::new(TreeItemMarker {
            label: label.to_string(),
            color,
            grayed: false,
        })
    }

    pub fn grayed(label: &str, color: Color32) -> MarkerRef {
        Arc::new(TreeItemMarker {
            label: label.to_string(),
            color,
            grayed: true,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn color(&self) -> Color32 {
        self.color
    }

    pub fn is_grayed(&self) -> bool {
        self.grayed
    }
}

/// Identity lookup; two markers with equal contents are still distinct.
pub(crate) fn position(list: &[MarkerRef], marker: &MarkerRef) -> Option<usize> {
    list.iter().position(|m| Arc::ptr_eq(m, marker))
}
