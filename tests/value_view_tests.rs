//! Integration tests for value views and the globals registry

use cubegui::cube::{HistogramValue, TauAtomicValue};
use cubegui::view::icon;
use cubegui::{
    AppSettings, DataType, Globals, GlobalsEvent, TauDisplayMode, Tree, TreeItem, TreeItemType,
    TreeType, Value, ValueModus, ValueView,
};
use egui::{Color32, ColorImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts how often values are interpreted.
#[derive(Default)]
struct SpyView {
    doubles: AtomicUsize,
}

impl ValueView for SpyView {
    fn name(&self) -> &str {
        "Spy"
    }

    fn is_available(&self, data_type: DataType) -> bool {
        data_type == DataType::Double
    }

    fn get_double_value(&self, value: &Value) -> f64 {
        self.doubles.fetch_add(1, Ordering::SeqCst);
        value.get_double() * 2.0
    }

    fn to_string(&self, item: &TreeItem) -> String {
        format!("spy:{}", item.get_value().0)
    }

    fn get_icon(&self, item: Option<&TreeItem>, _gray_out: bool) -> ColorImage {
        icon::blank_icon(self.get_icon_size(item))
    }

    fn get_icon_size(&self, _item: Option<&TreeItem>) -> [usize; 2] {
        [4, 4]
    }
}

fn flat_item(globals: &Arc<Globals>) -> (Arc<Tree>, Arc<TreeItem>) {
    let tree = Tree::new(globals, TreeType::Flat, "Flat tree");
    let item = tree.add_item(None, "region", TreeItemType::RegionItem, None);
    (tree, item)
}

#[test]
fn test_zero_value_skips_view() {
    let globals = Globals::new();
    let spy = Arc::new(SpyView::default());
    globals.set_value_view(DataType::Double, Some(spy.clone()));
    let (_tree, item) = flat_item(&globals);

    item.set_inclusive_value(Some(Arc::new(Value::Double(0.0))));
    assert_eq!(spy.doubles.load(Ordering::SeqCst), 0);
    assert_eq!(item.get_total_value(), 0.0);

    item.set_inclusive_value(Some(Arc::new(Value::Double(1.5))));
    assert_eq!(spy.doubles.load(Ordering::SeqCst), 1);
    assert_eq!(item.get_total_value(), 3.0);
    assert_eq!(item.label(), "spy:3 region");
}

#[test]
fn test_zero_exclusive_value_skips_view() {
    let globals = Globals::new();
    let spy = Arc::new(SpyView::default());
    globals.set_value_view(DataType::Double, Some(spy.clone()));
    let (_tree, item) = flat_item(&globals);

    item.set_exclusive_value(Some(Arc::new(Value::Double(0.0))));
    assert_eq!(spy.doubles.load(Ordering::SeqCst), 0);
    assert_eq!(item.get_own_value(), 0.0);

    item.set_exclusive_value(Some(Arc::new(Value::Double(2.0))));
    assert_eq!(spy.doubles.load(Ordering::SeqCst), 1);
    assert_eq!(item.get_own_value(), 4.0);
}

#[test]
fn test_registered_view_applies_only_to_its_type() {
    let globals = Globals::new();
    let spy: Arc<dyn ValueView> = Arc::new(SpyView::default());
    globals.set_value_view(DataType::Double, Some(Arc::clone(&spy)));
    assert_eq!(globals.value_view(DataType::Double).name(), "Spy");
    assert_eq!(globals.value_view(DataType::Integer).name(), "Default");

    globals.remove_value_view(&spy);
    assert_eq!(globals.value_view(DataType::Double).name(), "Default");
}

#[test]
fn test_view_change_rederives_cached_scalars() {
    let globals = Globals::new();
    let events = globals.subscribe();
    let (_tree, item) = flat_item(&globals);
    item.set_inclusive_value(Some(Arc::new(Value::Double(2.0))));
    assert_eq!(item.label(), "2.00 region");

    globals.set_value_view(DataType::Double, Some(Arc::new(SpyView::default())));
    assert_eq!(item.get_total_value(), 4.0);
    assert_eq!(item.label(), "spy:4 region");
    assert_eq!(
        events.try_recv().ok(),
        Some(GlobalsEvent::ValueViewChanged(Some(DataType::Double)))
    );

    globals.set_value_view(DataType::Double, None);
    assert_eq!(item.get_total_value(), 2.0);
}

#[test]
fn test_tau_template_full_mode() {
    let globals = Globals::new();
    let mut settings = AppSettings::default();
    settings.value_view.tau_display_mode = TauDisplayMode::Full.to_index();
    settings.value_view.tau_template = "VALUE".to_string();
    globals.default_value_view().load_global_settings(&settings);
    let (_tree, item) = flat_item(&globals);

    let tau = TauAtomicValue::new(3, 1.0, 3.0, 6.0, 14.0);
    item.set_inclusive_value(Some(Arc::new(Value::TauAtomic(tau))));
    assert_eq!(item.value_text(), "1.00, 2.00, 3.00");

    // three boxes in full mode
    let size = globals.default_value_view().get_icon_size(Some(&item));
    let ascent = globals.font_metrics().ascent;
    assert_eq!(size, [3 * ascent, ascent]);
}

#[test]
fn test_tau_template_placeholders() {
    let globals = Globals::new();
    let mut settings = AppSettings::default();
    settings.value_view.tau_display_mode = TauDisplayMode::Maximum.to_index();
    settings.value_view.tau_template = "VALUE (n=TAU_N, min TAU_MIN)".to_string();
    globals.default_value_view().load_global_settings(&settings);
    let (_tree, item) = flat_item(&globals);

    let tau = TauAtomicValue::from_samples(&[1.0, 2.0, 6.0]);
    item.set_inclusive_value(Some(Arc::new(Value::TauAtomic(tau))));
    assert_eq!(item.value_text(), "6.00 (n=3, min 1.00)");
    // scalar follows the pivot of the display mode
    assert_eq!(item.get_total_value(), 6.0);
}

#[test]
fn test_histogram_icon_through_view() {
    let globals = Globals::new();
    let mut settings = AppSettings::default();
    settings.value_view.histogram_icon_width = 30;
    settings.value_view.histogram_icon_height = 30;
    globals.default_value_view().load_global_settings(&settings);
    let (_tree, item) = flat_item(&globals);

    let histogram = HistogramValue::new(vec![1.0, 3.0, 2.0], 0.0, 1.0);
    item.set_inclusive_value(Some(Arc::new(Value::Histogram(histogram))));
    assert_eq!(item.get_total_value(), 6.0);

    let image = globals.default_value_view().get_icon(Some(&item), false);
    assert_eq!(image.size, [30, 30]);
    let filled = |x: usize| {
        (0..30)
            .filter(|y| image.pixels[y * 30 + x] != Color32::TRANSPARENT)
            .count()
    };
    assert_eq!((filled(5), filled(15), filled(25)), (10, 30, 20));
}

#[test]
fn test_histogram_width_rounds_up_to_bucket_multiple() {
    let globals = Globals::new();
    let (_tree, item) = flat_item(&globals);
    let histogram = HistogramValue::new(vec![1.0, 2.0, 3.0], 0.0, 1.0);
    item.set_inclusive_value(Some(Arc::new(Value::Histogram(histogram))));
    // default width 10 with three buckets
    assert_eq!(globals.default_value_view().get_icon_size(Some(&item)), [12, 10]);
}

#[test]
fn test_percent_label_suffix() {
    let globals = Globals::new();
    let (tree, item) = flat_item(&globals);
    let other = tree.add_item(None, "other", TreeItemType::RegionItem, None);
    item.set_inclusive_value(Some(Arc::new(Value::Double(1.0))));
    other.set_inclusive_value(Some(Arc::new(Value::Double(3.0))));
    tree.set_value_modus(ValueModus::Percent);
    tree.values_changed();
    assert_eq!(item.value_text(), "25.00 %");
    assert_eq!(other.value_text(), "75.00 %");
}
