/// Settings View
///
/// Staged editing of precision, font size, value modus and the value view
/// configuration. Nothing takes effect before "Apply"; "Cancel" discards
/// the staged state, including the staged value view configuration.
use crate::config::{AppSettings, SettingsManager};
use crate::globals::{FormatPrecision, Globals, PrecisionSettings};
use crate::models::ValueModus;
use crate::tree::Tree;
use crate::view::ValueView;
use eframe::egui;
use std::path::Path;
use std::sync::Arc;

/// Staged settings shown in the settings window
#[derive(Clone, Debug, PartialEq)]
pub struct SettingsUIState {
    pub precision: PrecisionSettings,
    pub font_size: f32,
    pub value_modus: ValueModus,
    pub show_log_panel: bool,
    pub debug_logging: bool,
}

impl SettingsUIState {
    pub fn from_settings(settings: &AppSettings) -> Self {
        SettingsUIState {
            precision: settings.precision,
            font_size: settings.font_size,
            value_modus: settings.value_modus,
            show_log_panel: settings.show_log_panel,
            debug_logging: settings.debug_logging,
        }
    }
}

/// Outcome of one frame of the settings window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsAction {
    None,
    Applied,
    Cancelled,
}

fn precision_row(ui: &mut egui::Ui, label: &str, format: &mut FormatPrecision) {
    ui.horizontal(|ui| {
        ui.label(label);
        ui.add(egui::DragValue::new(&mut format.precision).clamp_range(0..=12).prefix("digits "));
        ui.add(egui::DragValue::new(&mut format.round_exponent).clamp_range(0..=30).prefix("zero below 1e-"));
        ui.add(
            egui::DragValue::new(&mut format.exponent_threshold)
                .clamp_range(1..=30)
                .prefix("exp. from 1e"),
        );
    });
}

/// Render the settings window contents
pub fn render_settings(ui: &mut egui::Ui, state: &mut SettingsUIState, globals: &Globals) -> SettingsAction {
    ui.group(|ui| {
        ui.label("Number Format");
        ui.separator();
        precision_row(ui, "Trees", &mut state.precision.trees);
        precision_row(ui, "Tooltips", &mut state.precision.default);
    });

    ui.group(|ui| {
        ui.label("Display");
        ui.separator();
        ui.add(egui::Slider::new(&mut state.font_size, 8.0..=32.0).text("Font size"));
        ui.horizontal(|ui| {
            ui.label("Values:");
            ui.radio_value(&mut state.value_modus, ValueModus::Absolute, "Absolute");
            ui.radio_value(&mut state.value_modus, ValueModus::Percent, "Percent");
        });
        ui.checkbox(&mut state.show_log_panel, "Show log panel");
        ui.checkbox(&mut state.debug_logging, "Debug logging (next start)");
    });

    ui.group(|ui| {
        ui.label("Value View");
        ui.separator();
        globals.default_value_view().config_ui(ui);
    });

    ui.separator();
    let mut action = SettingsAction::None;
    ui.horizontal(|ui| {
        if ui.button("Apply").clicked() {
            action = SettingsAction::Applied;
        }
        if ui.button("Cancel").clicked() {
            action = SettingsAction::Cancelled;
        }
    });
    action
}

/// Commits the staged state to globals and trees and persists it to `path`.
///
/// Trees are re-derived at most once even if several settings changed.
pub fn apply_settings(
    state: &SettingsUIState,
    settings: &mut AppSettings,
    globals: &Globals,
    trees: &[&Arc<Tree>],
    path: &Path,
) {
    let view_changed = globals.default_value_view().apply_config();

    if state.precision != globals.precision() {
        // re-derives and notifies on its own
        globals.set_precision(state.precision);
    } else if view_changed {
        globals.rederive_trees();
    }

    if (state.font_size - globals.font_metrics().point_size).abs() > f32::EPSILON {
        globals.set_font_size(state.font_size);
    }

    if state.value_modus != settings.value_modus {
        for tree in trees {
            tree.set_value_modus(state.value_modus);
        }
    }

    settings.precision = state.precision;
    settings.font_size = state.font_size;
    settings.value_modus = state.value_modus;
    settings.show_log_panel = state.show_log_panel;
    settings.debug_logging = state.debug_logging;
    globals.default_value_view().save_global_settings(settings);

    if let Err(e) = SettingsManager::save_to(settings, path) {
        log::error!("[Settings] Failed to save settings: {}", e);
    }
}

/// Discards staged edits and reloads the committed state.
pub fn cancel_settings(state: &mut SettingsUIState, settings: &AppSettings, globals: &Globals) {
    globals.default_value_view().cancel_config();
    *state = SettingsUIState::from_settings(settings);
}
