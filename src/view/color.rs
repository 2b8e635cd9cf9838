//! Value to colour mapping used for labels and icons.

use egui::Color32;

/// Maps values inside `[min, max]` onto a blue -> green -> yellow -> red gradient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMap {
    /// Colour for values that round to zero
    pub zero_color: Color32,
    /// Colour used when an item has no value
    pub undefined_color: Color32,
}

impl Default for ColorMap {
    fn default() -> Self {
        ColorMap {
            zero_color: Color32::WHITE,
            undefined_color: Color32::from_gray(200),
        }
    }
}

impl ColorMap {
    /// Colour of `value` relative to the range `[min, max]`.
    ///
    /// `round_threshold` decides which values count as zero.
    pub fn color(&self, value: f64, min: f64, max: f64, round_threshold: f64) -> Color32 {
        if value.is_nan() {
            return self.undefined_color;
        }
        if value.abs() < round_threshold {
            return self.zero_color;
        }
        let range = max - min;
        let normalized = if range.abs() < f64::EPSILON || !range.is_finite() {
            1.0
        } else {
            ((value - min) / range).clamp(0.0, 1.0)
        } as f32;
        gradient(normalized)
    }
}

/// Piecewise linear gradient over four anchors.
fn gradient(t: f32) -> Color32 {
    const ANCHORS: [(u8, u8, u8); 4] = [(66, 110, 220), (40, 180, 80), (240, 210, 40), (220, 40, 30)];
    let scaled = t * (ANCHORS.len() - 1) as f32;
    let idx = (scaled.floor() as usize).min(ANCHORS.len() - 2);
    let local = scaled - idx as f32;
    let (r0, g0, b0) = ANCHORS[idx];
    let (r1, g1, b1) = ANCHORS[idx + 1];
    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * local).round() as u8;
    Color32::from_rgb(mix(r0, r1), mix(g0, g1), mix(b0, b1))
}
