//! Fallback value view handling every data type.

use super::icon::{self, Bevel};
use super::ValueView;
use crate::config::{AppSettings, ValueViewSettings};
use crate::cube::{TauAtomicValue, TauPivot, Value};
use crate::globals::{FontMetrics, PrecisionFormat};
use crate::lock;
use crate::models::{DataType, TauDisplayMode, ValueModus};
use crate::tree::TreeItem;
use egui::ColorImage;
use std::sync::{Mutex, RwLock};

/// Default interpretation of values.
///
/// Scalars are shown as numbers with a coloured box. TAU statistics are
/// rendered through a user-editable template and three boxes. Histograms are
/// drawn as bar charts. Configuration is staged by the configuration panel and
/// only takes effect on `apply_config`.
pub struct DefaultValueView {
    settings: RwLock<ValueViewSettings>,
    staged: Mutex<Option<ValueViewSettings>>,
}

impl Default for DefaultValueView {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultValueView {
    pub fn new() -> Self {
        DefaultValueView {
            settings: RwLock::new(ValueViewSettings::default()),
            staged: Mutex::new(None),
        }
    }

    /// Committed configuration
    pub fn settings(&self) -> ValueViewSettings {
        lock::read(&self.settings).clone()
    }

    pub fn tau_display_mode(&self) -> TauDisplayMode {
        TauDisplayMode::from_index(lock::read(&self.settings).tau_display_mode)
    }

    /// Configuration being edited; starts as a copy of the committed one.
    pub fn staged_settings(&self) -> ValueViewSettings {
        let mut staged = lock::lock(&self.staged);
        staged.get_or_insert_with(|| self.settings()).clone()
    }

    pub fn stage(&self, settings: ValueViewSettings) {
        *lock::lock(&self.staged) = Some(settings);
    }

    fn pivot(mode: TauDisplayMode) -> TauPivot {
        match mode {
            TauDisplayMode::Full | TauDisplayMode::Average => TauPivot::Average,
            TauDisplayMode::Minimum => TauPivot::Minimum,
            TauDisplayMode::Maximum => TauPivot::Maximum,
        }
    }

    /// Fills the TAU template. `VALUE` expands according to the display mode.
    fn tau_text(&self, tau: &TauAtomicValue, item: &TreeItem) -> String {
        let settings = self.settings();
        let globals = item.globals();
        let integer = item.is_integer_type();
        let fmt = |v: f64, integer: bool| globals.format_number(v, PrecisionFormat::Trees, integer);

        let value_text = match TauDisplayMode::from_index(settings.tau_display_mode) {
            TauDisplayMode::Full => format!(
                "{}, {}, {}",
                fmt(tau.get(TauPivot::Minimum), integer),
                fmt(tau.get(TauPivot::Average), false),
                fmt(tau.get(TauPivot::Maximum), integer)
            ),
            TauDisplayMode::Minimum => fmt(tau.get(TauPivot::Minimum), integer),
            TauDisplayMode::Average => fmt(tau.get(TauPivot::Average), false),
            TauDisplayMode::Maximum => fmt(tau.get(TauPivot::Maximum), integer),
        };

        settings
            .tau_template
            .replace("TAU_MIN", &fmt(tau.get(TauPivot::Minimum), integer))
            .replace("TAU_MAX", &fmt(tau.get(TauPivot::Maximum), integer))
            .replace("TAU_AVG", &fmt(tau.get(TauPivot::Average), false))
            .replace("TAU_DEV", &format!("\u{b1}{}", fmt(tau.get(TauPivot::Deviation), false)))
            .replace("TAU_SUM", &fmt(tau.get(TauPivot::Sum), integer))
            .replace("TAU_N", &fmt(tau.get(TauPivot::Count), true))
            .replace("VALUE", &value_text)
    }

    fn ascent(item: Option<&TreeItem>) -> usize {
        item.map(|i| i.globals().font_metrics().ascent)
            .unwrap_or_else(|| FontMetrics::default().ascent)
    }
}

impl ValueView for DefaultValueView {
    fn name(&self) -> &str {
        "Default"
    }

    fn is_available(&self, _data_type: DataType) -> bool {
        true
    }

    fn get_double_value(&self, value: &Value) -> f64 {
        match value {
            Value::TauAtomic(tau) => tau.get(Self::pivot(self.tau_display_mode())),
            other => other.get_double(),
        }
    }

    fn to_string(&self, item: &TreeItem) -> String {
        let Some(value) = item.get_value_object() else {
            return String::new();
        };
        match value.as_ref() {
            Value::TauAtomic(tau) => self.tau_text(tau, item),
            _ => {
                let text = item.globals().format_number(
                    item.display_value(),
                    PrecisionFormat::Trees,
                    item.is_integer_type(),
                );
                match item.value_modus() {
                    ValueModus::Absolute => text,
                    ValueModus::Percent => format!("{} %", text),
                }
            }
        }
    }

    fn get_icon(&self, item: Option<&TreeItem>, gray_out: bool) -> ColorImage {
        let size = self.get_icon_size(item);
        let Some(item) = item else {
            return icon::blank_icon(size);
        };
        let Some(value) = item.get_value_object() else {
            return icon::blank_icon(size);
        };
        let threshold = item.globals().round_threshold(PrecisionFormat::Trees);
        match value.as_ref() {
            Value::Histogram(histogram) => {
                icon::histogram_icon(size, histogram.buckets(), item.color(), gray_out)
            }
            Value::TauAtomic(tau) if self.tau_display_mode() == TauDisplayMode::Full => {
                let part = |pivot: TauPivot| {
                    let v = tau.get(pivot);
                    (item.color_for_value(v), Bevel::for_value(v, threshold))
                };
                icon::tau_icon(
                    size,
                    [
                        part(TauPivot::Minimum),
                        part(TauPivot::Average),
                        part(TauPivot::Maximum),
                    ],
                    gray_out,
                )
            }
            _ => icon::scalar_icon(
                size,
                item.color(),
                Bevel::for_value(item.display_value(), threshold),
                gray_out,
            ),
        }
    }

    fn get_icon_size(&self, item: Option<&TreeItem>) -> [usize; 2] {
        let ascent = Self::ascent(item);
        let Some(value) = item.and_then(|i| i.get_value_object()) else {
            return [ascent, ascent];
        };
        match value.as_ref() {
            Value::Histogram(histogram) => {
                let settings = self.settings();
                let n = histogram.buckets().len();
                let width = if n == 0 {
                    settings.histogram_icon_width
                } else {
                    settings.histogram_icon_width.div_ceil(n) * n
                };
                [width, settings.histogram_icon_height]
            }
            Value::TauAtomic(_) if self.tau_display_mode() == TauDisplayMode::Full => {
                [3 * ascent, ascent]
            }
            _ => [ascent, ascent],
        }
    }

    fn get_extended_info(&self, item: &TreeItem) -> String {
        let Some(value) = item.get_value_object() else {
            return String::new();
        };
        let Value::TauAtomic(tau) = value.as_ref() else {
            return String::new();
        };
        let globals = item.globals();
        TauPivot::all()
            .iter()
            .map(|pivot| {
                let integer = *pivot == TauPivot::Count;
                format!(
                    "{}: {}",
                    pivot.label(),
                    globals.format_number(tau.get(*pivot), PrecisionFormat::Default, integer)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn config_ui(&self, ui: &mut egui::Ui) -> bool {
        let mut staged = self.staged_settings();
        let before = staged.clone();

        let mut mode = TauDisplayMode::from_index(staged.tau_display_mode);
        egui::ComboBox::from_label("TAU atomic display")
            .selected_text(mode.label())
            .show_ui(ui, |ui| {
                for candidate in [
                    TauDisplayMode::Full,
                    TauDisplayMode::Minimum,
                    TauDisplayMode::Average,
                    TauDisplayMode::Maximum,
                ] {
                    ui.selectable_value(&mut mode, candidate, candidate.label());
                }
            });
        staged.tau_display_mode = mode.to_index();

        ui.horizontal(|ui| {
            ui.label("Template");
            ui.text_edit_singleline(&mut staged.tau_template);
        });
        ui.small("Placeholders: VALUE, TAU_MIN, TAU_MAX, TAU_AVG, TAU_DEV, TAU_N, TAU_SUM");

        ui.horizontal(|ui| {
            ui.label("Histogram icon");
            ui.add(egui::DragValue::new(&mut staged.histogram_icon_width).clamp_range(2..=200));
            ui.label("x");
            ui.add(egui::DragValue::new(&mut staged.histogram_icon_height).clamp_range(2..=100));
        });

        let changed = staged != before;
        if changed {
            self.stage(staged);
        }
        changed
    }

    fn apply_config(&self) -> bool {
        let Some(staged) = lock::lock(&self.staged).take() else {
            return false;
        };
        let mut settings = lock::write(&self.settings);
        if *settings == staged {
            return false;
        }
        log::info!(
            "[ValueView] Configuration applied: mode={}, template='{}', histogram icon={}x{}",
            staged.tau_display_mode,
            staged.tau_template,
            staged.histogram_icon_width,
            staged.histogram_icon_height
        );
        *settings = staged;
        true
    }

    fn cancel_config(&self) {
        if lock::lock(&self.staged).take().is_some() {
            log::debug!("[ValueView] Staged configuration discarded");
        }
    }

    fn save_global_settings(&self, settings: &mut AppSettings) {
        settings.value_view = self.settings();
    }

    fn load_global_settings(&self, settings: &AppSettings) {
        *lock::write(&self.settings) = settings.value_view.clone();
        *lock::lock(&self.staged) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::HistogramValue;

    #[test]
    fn test_double_value_follows_display_mode() {
        let view = DefaultValueView::new();
        let tau = Value::TauAtomic(TauAtomicValue::from_samples(&[1.0, 2.0, 6.0]));
        assert_eq!(view.get_double_value(&tau), 3.0);

        let mut staged = view.staged_settings();
        staged.tau_display_mode = TauDisplayMode::Maximum.to_index();
        view.stage(staged);
        // staged only
        assert_eq!(view.get_double_value(&tau), 3.0);
        assert!(view.apply_config());
        assert_eq!(view.get_double_value(&tau), 6.0);
    }

    #[test]
    fn test_cancel_restores_committed_settings() {
        let view = DefaultValueView::new();
        let mut staged = view.staged_settings();
        staged.tau_template = "TAU_N".to_string();
        view.stage(staged);
        view.cancel_config();
        assert_eq!(view.staged_settings().tau_template, "VALUE:TAU_DEV");
        assert!(!view.apply_config());
        assert_eq!(view.settings().tau_template, "VALUE:TAU_DEV");
    }

    #[test]
    fn test_blank_icon_without_item() {
        let view = DefaultValueView::new();
        let icon = view.get_icon(None, false);
        let ascent = FontMetrics::default().ascent;
        assert_eq!(icon.size, [ascent, ascent]);
    }

    #[test]
    fn test_histogram_double_is_total() {
        let view = DefaultValueView::new();
        let value = Value::Histogram(HistogramValue::new(vec![1.0, 3.0, 2.0], 0.0, 1.0));
        assert_eq!(view.get_double_value(&value), 6.0);
    }

    #[test]
    fn test_settings_roundtrip_through_app_settings() {
        let view = DefaultValueView::new();
        let mut settings = AppSettings::default();
        settings.value_view.histogram_icon_width = 42;
        view.load_global_settings(&settings);
        assert_eq!(view.settings().histogram_icon_width, 42);

        let mut saved = AppSettings::default();
        view.save_global_settings(&mut saved);
        assert_eq!(saved.value_view.histogram_icon_width, 42);
    }
}
