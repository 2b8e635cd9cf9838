use anyhow::{anyhow, Context};
use std::sync::Arc;

use cubegui::config::loader::get_global_settings_path;
use cubegui::log_collector::{get_global_logs_path, DEFAULT_TAIL_CAPACITY};
use cubegui::synthetic::{build_profile, ProfileShape};
use cubegui::ui::CubeApp;
use cubegui::{AppError, Globals, LogCollector, SettingsManager};

fn main() -> anyhow::Result<()> {
    // =========================================================================
    // SETTINGS
    // =========================================================================
    // Loaded before logging so the debug flag can choose the level
    let settings_path = get_global_settings_path();
    let settings = SettingsManager::load_from(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;

    // =========================================================================
    // LOG COLLECTOR - DECOUPLED FROM UI
    // =========================================================================
    let max_level = if settings.debug_logging {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    let log_dir = get_global_logs_path().map_err(|e| anyhow!(e))?;
    let mut startup_error = None;
    let log_collector = match LogCollector::new(&log_dir, max_level, DEFAULT_TAIL_CAPACITY) {
        Ok(collector) => Some(collector),
        Err(e) => {
            eprintln!("[Main] WARNING: LogCollector initialization failed: {}", e);
            startup_error = Some(AppError::Logging(e));
            None
        }
    };
    if let Some(collector) = &log_collector {
        if let Err(e) = log::set_boxed_logger(Box::new(collector.clone()))
            .map(|()| log::set_max_level(max_level))
        {
            eprintln!("[Main] WARNING: Failed to set LogCollector as global logger: {}", e);
        } else {
            log::info!(
                "[Main] cubegui {} started, logging to {}",
                cubegui::VERSION,
                collector.log_path().display()
            );
        }
    }

    // =========================================================================
    // SESSION
    // =========================================================================
    let globals = Globals::from_settings(&settings);
    let profile = build_profile(&globals, &ProfileShape::default());
    log::info!(
        "[Main] {} calculation workers",
        settings.effective_worker_threads()
    );

    let mut app = CubeApp::new(
        Arc::clone(&globals),
        profile,
        settings,
        settings_path,
        log_collector.clone(),
    );
    if let Some(err) = &startup_error {
        app.report_error(err);
    }

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_title("CUBE")
            .with_inner_size([1200.0, 800.0]),
        ..Default::default()
    };
    let result = eframe::run_native("CUBE", options, Box::new(|_cc| Box::new(app)));

    log::info!("[Main] Shutting down");
    if let Some(collector) = &log_collector {
        if let Err(e) = collector.flush_blocking() {
            eprintln!("[Main] WARNING: Failed to flush logs: {}", e);
        }
    }

    result.map_err(|e| anyhow!("UI error: {}", e))
}
