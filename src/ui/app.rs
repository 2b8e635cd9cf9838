/// Main application window
///
/// Three tree panes (metric, call, system) side by side, a toolbar for
/// search and system tree levels, a settings window and an optional log
/// panel. Selecting a metric or a call path starts a background
/// calculation; its progress arrives over crossbeam channels and is drained
/// once per frame.
use super::settings::{self, SettingsAction, SettingsUIState};
use super::tree_view::TreePane;
use super::widgets;
use crate::config::AppSettings;
use crate::cube::MetricInfo;
use crate::error::AppError;
use crate::globals::{Globals, GlobalsEvent};
use crate::log_collector::LogCollector;
use crate::models::ItemId;
use crate::synthetic::{self, CalculationEvent, SyntheticProfile};
use crossbeam_channel::Receiver;
use eframe::egui;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Transient messages disappear after this long
const MESSAGE_TTL: Duration = Duration::from_secs(6);

/// UI state not owned by any pane
pub struct UIState {
    pub search_text: String,
    pub case_sensitive: bool,
    pub show_config: bool,
    pub show_log: bool,
    pub hide_level: usize,
    pub sort_by_value: bool,
    pub hide_zero: bool,
    pub status: String,
    /// (text, is_error, created)
    pub messages: Vec<(String, bool, Instant)>,
}

impl Default for UIState {
    fn default() -> Self {
        UIState {
            search_text: String::new(),
            case_sensitive: false,
            show_config: false,
            show_log: false,
            hide_level: 1,
            sort_by_value: false,
            hide_zero: false,
            status: "Ready".to_string(),
            messages: Vec::new(),
        }
    }
}

impl UIState {
    fn push_message(&mut self, text: String, is_error: bool) {
        if is_error {
            log::warn!("[UI] {}", text);
        }
        self.messages.push((text, is_error, Instant::now()));
    }
}

pub struct CubeApp {
    globals: Arc<Globals>,
    profile: SyntheticProfile,
    settings: AppSettings,
    settings_path: PathBuf,
    settings_state: SettingsUIState,
    pub ui_state: UIState,
    metric_pane: TreePane,
    call_pane: TreePane,
    system_pane: TreePane,
    globals_rx: Receiver<GlobalsEvent>,
    calculations: Vec<Receiver<CalculationEvent>>,
    selected_metric: Option<Arc<MetricInfo>>,
    log_collector: Option<LogCollector>,
}

impl CubeApp {
    pub fn new(
        globals: Arc<Globals>,
        profile: SyntheticProfile,
        settings: AppSettings,
        settings_path: PathBuf,
        log_collector: Option<LogCollector>,
    ) -> Self {
        let globals_rx = globals.subscribe();
        for tree in [&profile.metric_tree, &profile.call_tree, &profile.system_tree] {
            tree.set_value_modus(settings.value_modus);
        }
        if let Some(first) = profile.metrics.first() {
            synthetic::fill_tree(&profile.metric_tree, first, 0);
        }

        let ui_state = UIState {
            show_log: settings.show_log_panel,
            ..UIState::default()
        };
        let mut app = CubeApp {
            metric_pane: TreePane::new(Arc::clone(&profile.metric_tree)),
            call_pane: TreePane::new(Arc::clone(&profile.call_tree)),
            system_pane: TreePane::new(Arc::clone(&profile.system_tree)),
            settings_state: SettingsUIState::from_settings(&settings),
            globals,
            profile,
            settings,
            settings_path,
            ui_state,
            globals_rx,
            calculations: Vec::new(),
            selected_metric: None,
            log_collector,
        };
        let initial = app.profile.metrics.first().cloned();
        if let Some(metric) = initial {
            app.select_metric(metric);
        }
        app
    }

    pub fn selected_metric(&self) -> Option<&Arc<MetricInfo>> {
        self.selected_metric.as_ref()
    }

    // ========================================================================
    // CALCULATION
    // ========================================================================

    fn select_metric(&mut self, metric: Arc<MetricInfo>) {
        log::info!("[UI] Metric selected: {}", metric.display_name);
        self.selected_metric = Some(metric);
        self.recalculate_call_tree();
        self.recalculate_system_tree();
    }

    fn recalculate_call_tree(&mut self) {
        let Some(metric) = self.selected_metric.clone() else {
            return;
        };
        let workers = self.settings.effective_worker_threads();
        self.calculations.push(synthetic::calculate_in_background(
            Arc::clone(&self.profile.call_tree),
            metric,
            0,
            workers,
        ));
        self.ui_state.status = "Calculating call tree...".to_string();
    }

    /// The system tree shows the values of the selected call path.
    fn recalculate_system_tree(&mut self) {
        let Some(metric) = self.selected_metric.clone() else {
            return;
        };
        let salt = self.call_pane.selected.map(|ItemId(id)| id).unwrap_or(0);
        let workers = self.settings.effective_worker_threads();
        self.calculations.push(synthetic::calculate_in_background(
            Arc::clone(&self.profile.system_tree),
            metric,
            salt,
            workers,
        ));
    }

    fn process_events(&mut self) {
        let mut globals_changed = false;
        while let Ok(event) = self.globals_rx.try_recv() {
            log::debug!("[UI] Globals event: {:?}", event);
            globals_changed = true;
        }
        if globals_changed {
            for pane in self.panes_mut() {
                pane.invalidate_icons();
            }
        }

        let mut finished = Vec::new();
        self.calculations.retain(|rx| loop {
            match rx.try_recv() {
                Ok(CalculationEvent::Finished { tree, items, elapsed_ms }) => {
                    finished.push(format!("{}: {} items in {} ms", tree, items, elapsed_ms));
                }
                Ok(CalculationEvent::ChunkDone { .. }) => {}
                Err(crossbeam_channel::TryRecvError::Empty) => break true,
                Err(crossbeam_channel::TryRecvError::Disconnected) => break false,
            }
        });
        if !finished.is_empty() {
            for pane in self.panes_mut() {
                pane.invalidate_icons();
            }
            self.ui_state.status = finished.join("; ");
        }

        for pane in self.panes_mut() {
            pane.poll_events();
        }

        self.ui_state
            .messages
            .retain(|(_, _, created)| created.elapsed() < MESSAGE_TTL);
    }

    fn panes_mut(&mut self) -> [&mut TreePane; 3] {
        [&mut self.metric_pane, &mut self.call_pane, &mut self.system_pane]
    }

    // ========================================================================
    // ACTIONS
    // ========================================================================

    fn run_search(&mut self) {
        let pattern = self.ui_state.search_text.clone();
        let case_sensitive = self.ui_state.case_sensitive;
        let hits: usize = self
            .panes_mut()
            .into_iter()
            .map(|pane| pane.search(&pattern, case_sensitive))
            .sum();
        if !pattern.is_empty() {
            self.ui_state.status = format!("{} items match '{}'", hits, pattern);
        }
    }

    fn hide_system_level(&mut self) {
        let level = self.ui_state.hide_level;
        match self.system_pane.model.source_mut().hide_tree_level(level) {
            Ok(()) => self.ui_state.status = format!("System tree level {} hidden", level),
            Err(e) => self.report_error(&AppError::from(e)),
        }
    }

    /// Shows `err` in the message strip.
    pub fn report_error(&mut self, err: &AppError) {
        self.ui_state.push_message(err.user_message(), true);
    }

    fn apply_view_options(&mut self) {
        let sort = self
            .ui_state
            .sort_by_value
            .then_some((crate::model::SortKey::Value, crate::model::SortOrder::Descending));
        let hide_zero = self.ui_state.hide_zero;
        for pane in [&mut self.call_pane, &mut self.system_pane] {
            pane.sort = sort;
            pane.hide_zero = hide_zero;
            pane.apply_view_options();
        }
    }

    // ========================================================================
    // RENDERING
    // ========================================================================

    fn render_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Find:");
                let response = ui.text_edit_singleline(&mut self.ui_state.search_text);
                let enter = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                ui.checkbox(&mut self.ui_state.case_sensitive, "Aa");
                if ui.button("Search").clicked() || enter {
                    self.run_search();
                }

                ui.separator();
                ui.label("System level:");
                ui.add(egui::DragValue::new(&mut self.ui_state.hide_level).clamp_range(1..=16));
                if ui.button("Hide").clicked() {
                    self.hide_system_level();
                }
                if ui.button("Unhide").clicked() {
                    self.system_pane.model.source_mut().unhide_tree_level();
                }

                ui.separator();
                let sort = ui.checkbox(&mut self.ui_state.sort_by_value, "Sort by value");
                let zero = ui.checkbox(&mut self.ui_state.hide_zero, "Hide zeros");
                if sort.changed() || zero.changed() {
                    self.apply_view_options();
                }

                ui.separator();
                if ui.button("Settings").clicked() {
                    self.settings_state = SettingsUIState::from_settings(&self.settings);
                    self.ui_state.show_config = true;
                }
                ui.toggle_value(&mut self.ui_state.show_log, "Log");
            });
        });
    }

    fn render_messages(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(self.ui_state.status.as_str());
                for (text, is_error, _) in &self.ui_state.messages {
                    ui.separator();
                    if *is_error {
                        ui.colored_label(egui::Color32::RED, text.as_str());
                    } else {
                        ui.label(text.as_str());
                    }
                }
            });
        });
    }

    fn render_log(&mut self, ctx: &egui::Context) {
        if !self.ui_state.show_log {
            return;
        }
        let content = match &self.log_collector {
            Some(collector) => collector
                .tail()
                .iter()
                .map(|line| format!("[{}] [{}] {}", line.timestamp, line.level, line.message))
                .collect::<Vec<_>>()
                .join("\n"),
            None => String::new(),
        };
        egui::TopBottomPanel::bottom("log")
            .resizable(true)
            .default_height(160.0)
            .show(ctx, |ui| widgets::terminal_viewport(ui, &content));
    }

    fn render_settings_window(&mut self, ctx: &egui::Context) {
        if !self.ui_state.show_config {
            return;
        }
        let mut open = true;
        let mut action = SettingsAction::None;
        egui::Window::new("Settings")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| {
                action = settings::render_settings(ui, &mut self.settings_state, &self.globals);
            });

        match action {
            SettingsAction::Applied => {
                let trees = [&self.profile.metric_tree, &self.profile.call_tree, &self.profile.system_tree];
                settings::apply_settings(
                    &self.settings_state,
                    &mut self.settings,
                    &self.globals,
                    &trees,
                    &self.settings_path,
                );
                self.ui_state.show_log = self.settings.show_log_panel;
                self.ui_state.show_config = false;
                self.ui_state.push_message("Settings applied".to_string(), false);
            }
            SettingsAction::Cancelled => {
                settings::cancel_settings(&mut self.settings_state, &self.settings, &self.globals);
                self.ui_state.show_config = false;
            }
            SettingsAction::None if !open => {
                settings::cancel_settings(&mut self.settings_state, &self.settings, &self.globals);
                self.ui_state.show_config = false;
            }
            SettingsAction::None => {}
        }
    }

    fn render_trees(&mut self, ctx: &egui::Context) {
        let mut metric_selected = None;
        let mut call_selected = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.columns(3, |columns| {
                columns[0].heading(self.metric_pane.title.as_str());
                metric_selected = self.metric_pane.show(&mut columns[0]);
                columns[1].heading(self.call_pane.title.as_str());
                call_selected = self.call_pane.show(&mut columns[1]);
                columns[2].heading(self.system_pane.title.as_str());
                self.system_pane.show(&mut columns[2]);
            });
        });

        if let Some(id) = metric_selected {
            let metric = self
                .profile
                .metric_tree
                .item(id)
                .and_then(|item| item.cube_object().and_then(|o| o.metric().cloned()));
            if let Some(metric) = metric {
                self.select_metric(metric);
            }
        }
        if call_selected.is_some() {
            self.recalculate_system_tree();
        }
    }
}

impl eframe::App for CubeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let font_size = self.globals.font_metrics().point_size;
        ctx.style_mut(|style| {
            for text_style in [egui::TextStyle::Body, egui::TextStyle::Button, egui::TextStyle::Monospace] {
                if let Some(font) = style.text_styles.get_mut(&text_style) {
                    font.size = font_size;
                }
            }
        });

        self.process_events();
        self.render_toolbar(ctx);
        self.render_messages(ctx);
        self.render_log(ctx);
        self.render_settings_window(ctx);
        self.render_trees(ctx);

        if !self.calculations.is_empty() || self.ui_state.show_log {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}
