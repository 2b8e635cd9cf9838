//! Session-wide display context.
//!
//! `Globals` is created once per session and handed to every tree (and through
//! the trees to every item and value view). It owns:
//! - the registry mapping a `DataType` to the `ValueView` interpreting it,
//!   with a shared `DefaultValueView` as fallback
//! - precision settings and the number formatter
//! - font metrics (icon sizes) and the colour map
//!
//! Replacing a value view or the precision changes how every cached value is
//! interpreted, so all registered trees are re-derived and subscribers are
//! notified.

pub mod format;

use crate::config::AppSettings;
use crate::lock;
use crate::models::DataType;
use crate::tree::Tree;
use crate::view::color::ColorMap;
use crate::view::{DefaultValueView, ValueView};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock, Weak};

pub use format::{FormatPrecision, PrecisionFormat, PrecisionSettings};

/// Notifications broadcast by `Globals`.
#[derive(Debug, Clone, PartialEq)]
pub enum GlobalsEvent {
    /// The view for a data type changed (`None`: several types at once)
    ValueViewChanged(Option<DataType>),
    PrecisionChanged,
    FontChanged,
}

/// Font metrics relevant for icon sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    pub point_size: f32,
    /// Height of capital letters in pixels; scalar icons are squares of this size
    pub ascent: usize,
}

impl FontMetrics {
    pub fn from_point_size(point_size: f32) -> Self {
        let ascent = ((point_size * 0.8).round() as usize).max(4);
        FontMetrics { point_size, ascent }
    }
}

impl Default for FontMetrics {
    fn default() -> Self {
        FontMetrics::from_point_size(13.0)
    }
}

pub struct Globals {
    value_views: RwLock<HashMap<DataType, Arc<dyn ValueView>>>,
    default_value_view: Arc<DefaultValueView>,
    precision: RwLock<PrecisionSettings>,
    font: RwLock<FontMetrics>,
    color_map: RwLock<ColorMap>,
    trees: Mutex<Vec<Weak<Tree>>>,
    subscribers: Mutex<Vec<Sender<GlobalsEvent>>>,
}

impl Globals {
    pub fn new() -> Arc<Self> {
        Arc::new(Globals {
            value_views: RwLock::new(HashMap::new()),
            default_value_view: Arc::new(DefaultValueView::new()),
            precision: RwLock::new(PrecisionSettings::default()),
            font: RwLock::new(FontMetrics::default()),
            color_map: RwLock::new(ColorMap::default()),
            trees: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    /// Creates the context from persisted settings.
    pub fn from_settings(settings: &AppSettings) -> Arc<Self> {
        let globals = Globals::new();
        *lock::write(&globals.precision) = settings.precision;
        *lock::write(&globals.font) = FontMetrics::from_point_size(settings.font_size);
        globals.default_value_view.load_global_settings(settings);
        globals
    }

    // ========================================================================
    // VALUE VIEW REGISTRY
    // ========================================================================

    /// View responsible for `data_type`. Never fails: unregistered types get the default view.
    pub fn value_view(&self, data_type: DataType) -> Arc<dyn ValueView> {
        if let Some(view) = lock::read(&self.value_views).get(&data_type) {
            return Arc::clone(view);
        }
        self.default_value_view.clone()
    }

    pub fn default_value_view(&self) -> &Arc<DefaultValueView> {
        &self.default_value_view
    }

    /// Registers `view` for `data_type`; `None` restores the default view.
    ///
    /// Colour bounds depend on the interpreted values, so every tree is re-derived.
    pub fn set_value_view(&self, data_type: DataType, view: Option<Arc<dyn ValueView>>) {
        {
            let mut views = lock::write(&self.value_views);
            match view {
                Some(view) => {
                    log::info!("[Globals] Value view '{}' registered for {}", view.name(), data_type);
                    views.insert(data_type, view);
                }
                None => {
                    log::info!("[Globals] Default value view restored for {}", data_type);
                    views.remove(&data_type);
                }
            }
        }
        self.rederive_trees();
        self.notify(GlobalsEvent::ValueViewChanged(Some(data_type)));
    }

    /// Removes every registration of `view` (a view may serve several types).
    pub fn remove_value_view(&self, view: &Arc<dyn ValueView>) {
        let removed = {
            let mut views = lock::write(&self.value_views);
            let before = views.len();
            views.retain(|_, registered| !Arc::ptr_eq(registered, view));
            before - views.len()
        };
        if removed > 0 {
            log::info!("[Globals] Value view '{}' removed from {} data types", view.name(), removed);
            self.rederive_trees();
            self.notify(GlobalsEvent::ValueViewChanged(None));
        }
    }

    // ========================================================================
    // FORMATTING
    // ========================================================================

    pub fn precision(&self) -> PrecisionSettings {
        *lock::read(&self.precision)
    }

    pub fn set_precision(&self, precision: PrecisionSettings) {
        *lock::write(&self.precision) = precision;
        self.rederive_trees();
        self.notify(GlobalsEvent::PrecisionChanged);
    }

    pub fn format_number(&self, value: f64, format: PrecisionFormat, integer: bool) -> String {
        lock::read(&self.precision).format_number(value, format, integer)
    }

    pub fn round_threshold(&self, format: PrecisionFormat) -> f64 {
        lock::read(&self.precision).round_threshold(format)
    }

    pub fn round_number(&self, value: f64, format: PrecisionFormat) -> f64 {
        lock::read(&self.precision).round_number(value, format)
    }

    pub fn font_metrics(&self) -> FontMetrics {
        *lock::read(&self.font)
    }

    pub fn set_font_size(&self, point_size: f32) {
        *lock::write(&self.font) = FontMetrics::from_point_size(point_size);
        self.notify(GlobalsEvent::FontChanged);
    }

    pub fn color_map(&self) -> ColorMap {
        *lock::read(&self.color_map)
    }

    // ========================================================================
    // TREES AND SUBSCRIBERS
    // ========================================================================

    /// Trees register themselves on construction; dropped trees are pruned lazily.
    pub(crate) fn register_tree(&self, tree: &Arc<Tree>) {
        let mut trees = lock::lock(&self.trees);
        trees.retain(|t| t.strong_count() > 0);
        trees.push(Arc::downgrade(tree));
    }

    pub fn subscribe(&self) -> Receiver<GlobalsEvent> {
        let (tx, rx) = unbounded();
        lock::lock(&self.subscribers).push(tx);
        rx
    }

    /// Re-derives all live trees. Also used after value view configuration changes.
    pub fn rederive_trees(&self) {
        let trees: Vec<Arc<Tree>> = lock::lock(&self.trees)
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        log::debug!("[Globals] Re-deriving {} trees", trees.len());
        for tree in trees {
            tree.rederive();
        }
    }

    pub(crate) fn notify(&self, event: GlobalsEvent) {
        lock::lock(&self.subscribers).retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unregistered_type_gets_default_view() {
        let globals = Globals::new();
        let view = globals.value_view(DataType::Histogram);
        assert_eq!(view.name(), "Default");
    }

    #[test]
    fn test_font_metrics_from_point_size() {
        assert_eq!(FontMetrics::from_point_size(13.0).ascent, 10);
        assert_eq!(FontMetrics::from_point_size(1.0).ascent, 4);
    }

    #[test]
    fn test_subscribers_receive_precision_change() {
        let globals = Globals::new();
        let rx = globals.subscribe();
        globals.set_precision(PrecisionSettings::default());
        assert_eq!(rx.try_recv().ok(), Some(GlobalsEvent::PrecisionChanged));
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let globals = Globals::new();
        drop(globals.subscribe());
        globals.set_font_size(20.0);
        assert!(lock::lock(&globals.subscribers).is_empty());
        assert_eq!(globals.font_metrics().ascent, 16);
    }
}
