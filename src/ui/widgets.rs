/// Small reusable widgets drawn with egui::Painter:
/// - marker dots shown next to tree rows
/// - a terminal-like viewport for the log tail
use crate::tree::MarkerRef;
use egui::{Color32, Sense, Stroke, Vec2};

/// Radius of a marker dot in points
const MARKER_RADIUS: f32 = 4.0;

/// Draws one dot per marker; grayed markers are drawn hollow.
pub fn marker_dots(ui: &mut egui::Ui, markers: &[MarkerRef]) -> egui::Response {
    let size = Vec2::new(markers.len() as f32 * (2.0 * MARKER_RADIUS + 2.0), 2.0 * MARKER_RADIUS);
    let (rect, response) = ui.allocate_exact_size(size, Sense::hover());
    let painter = ui.painter_at(rect);
    for (i, marker) in markers.iter().enumerate() {
        let center = rect.left_center()
            + Vec2::new(MARKER_RADIUS + i as f32 * (2.0 * MARKER_RADIUS + 2.0), 0.0);
        if marker.is_grayed() {
            painter.circle_stroke(center, MARKER_RADIUS - 0.5, Stroke::new(1.0, marker.color()));
        } else {
            painter.circle_filled(center, MARKER_RADIUS, marker.color());
        }
    }
    let labels: Vec<&str> = markers.iter().map(|m| m.label()).collect();
    if labels.is_empty() {
        response
    } else {
        response.on_hover_text(labels.join(", "))
    }
}

/// Background of found rows and rows leading to them
pub fn highlight_color(found: bool, found_parent: bool, selected_parent: bool) -> Option<Color32> {
    if found {
        Some(Color32::from_rgb(255, 236, 140))
    } else if found_parent {
        Some(Color32::from_rgb(255, 248, 205))
    } else if selected_parent {
        Some(Color32::from_rgb(222, 234, 250))
    } else {
        None
    }
}

pub fn terminal_viewport(ui: &mut egui::Ui, log_content: &str) {
    egui::ScrollArea::vertical()
        .auto_shrink([false; 2])
        .stick_to_bottom(true)
        .show(ui, |ui| {
            ui.monospace(if log_content.is_empty() {
                "No log output yet"
            } else {
                log_content
            });
        });
}
