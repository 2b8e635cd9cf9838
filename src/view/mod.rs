//! Value views: interpretation of computed values for display.
//!
//! A value view turns the value object cached on a tree item into a scalar
//! (for colouring and sorting), a label suffix and an icon. Views are shared by
//! all items of a data type and are looked up through `Globals::value_view`.

pub mod color;
pub mod default_view;
pub mod icon;

use crate::config::AppSettings;
use crate::cube::Value;
use crate::models::DataType;
use crate::tree::TreeItem;
use egui::ColorImage;

pub use default_view::DefaultValueView;

/// Strategy interpreting values of one or more data types.
///
/// All methods must tolerate items without a value object and return a neutral
/// representation (empty text, blank icon) instead of failing.
pub trait ValueView: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this view can interpret values of `data_type`.
    fn is_available(&self, data_type: DataType) -> bool;

    /// Representative scalar of `value`. Must not mutate or lock anything the
    /// item holds: it is called while a new value is being installed.
    fn get_double_value(&self, value: &Value) -> f64;

    /// Label suffix of `item`.
    fn to_string(&self, item: &TreeItem) -> String;

    /// Icon of `item`; an item-less call yields a blank icon of default size.
    fn get_icon(&self, item: Option<&TreeItem>, gray_out: bool) -> ColorImage;

    fn get_icon_size(&self, item: Option<&TreeItem>) -> [usize; 2];

    /// Multi-line description for tooltips.
    fn get_extended_info(&self, _item: &TreeItem) -> String {
        String::new()
    }

    /// Draws the staged configuration; returns true when something was edited.
    fn config_ui(&self, _ui: &mut egui::Ui) -> bool {
        false
    }

    /// Commits staged configuration. Returns true if the committed state changed.
    fn apply_config(&self) -> bool {
        false
    }

    /// Discards staged configuration.
    fn cancel_config(&self) {}

    fn save_global_settings(&self, _settings: &mut AppSettings) {}

    fn load_global_settings(&self, _settings: &AppSettings) {}
}
