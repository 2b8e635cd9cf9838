//! UI Module - egui frontend
//!
//! Shows the metric, call and system trees side by side. Everything here runs
//! on the UI thread; value calculation happens on workers and is picked up
//! through crossbeam channels once per frame.

pub mod app;
pub mod settings;
pub mod tree_view;
pub mod widgets;

pub use app::{CubeApp, UIState};
pub use tree_view::TreePane;
