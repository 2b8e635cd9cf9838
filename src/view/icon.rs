/// Icon rasterisation for tree item values
///
/// Icons are small `egui::ColorImage` pixel buffers so they can be uploaded as
/// textures by the tree view and inspected directly in tests:
/// - scalar icons: framed rectangle in the item colour with a 3D bevel keyed by sign
/// - TAU icons: three scalar icons side by side (minimum, average, maximum)
/// - histogram icons: one bar per bucket, scaled to the largest bucket

use egui::{Color32, ColorImage};

const FRAME_COLOR: Color32 = Color32::from_rgb(60, 60, 60);
const GRAY_FRAME_COLOR: Color32 = Color32::from_rgb(160, 160, 160);

/// 3D shading of a scalar icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bevel {
    /// Positive value at or above the round threshold
    Raised,
    /// Negative value below minus the round threshold
    Sunken,
    Flat,
}

impl Bevel {
    pub fn for_value(value: f64, round_threshold: f64) -> Self {
        if value >= round_threshold {
            Bevel::Raised
        } else if value < -round_threshold {
            Bevel::Sunken
        } else {
            Bevel::Flat
        }
    }
}

/// Halves the alpha of a colour (grayed out items).
pub fn dimmed(color: Color32) -> Color32 {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    Color32::from_rgba_unmultiplied(r, g, b, a / 2)
}

fn mix(color: Color32, target: u8, amount: f32) -> Color32 {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    let m = |c: u8| (c as f32 + (target as f32 - c as f32) * amount).round() as u8;
    Color32::from_rgba_unmultiplied(m(r), m(g), m(b), a)
}

struct Canvas {
    image: ColorImage,
}

impl Canvas {
    fn new(size: [usize; 2]) -> Self {
        Canvas {
            image: ColorImage::new(size, Color32::TRANSPARENT),
        }
    }

    fn width(&self) -> usize {
        self.image.size[0]
    }

    fn height(&self) -> usize {
        self.image.size[1]
    }

    fn set(&mut self, x: usize, y: usize, color: Color32) {
        let [w, h] = self.image.size;
        if x < w && y < h {
            self.image.pixels[y * w + x] = color;
        }
    }

    fn fill_rect(&mut self, x0: usize, y0: usize, w: usize, h: usize, color: Color32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                self.set(x, y, color);
            }
        }
    }

    fn frame(&mut self, x0: usize, y0: usize, w: usize, h: usize, color: Color32) {
        if w == 0 || h == 0 {
            return;
        }
        for x in x0..x0 + w {
            self.set(x, y0, color);
            self.set(x, y0 + h - 1, color);
        }
        for y in y0..y0 + h {
            self.set(x0, y, color);
            self.set(x0 + w - 1, y, color);
        }
    }

    /// Framed, bevelled box inside `(x0, y0, w, h)`.
    fn scalar_box(&mut self, x0: usize, y0: usize, w: usize, h: usize, fill: Color32, bevel: Bevel, gray_out: bool) {
        let fill = if gray_out { dimmed(fill) } else { fill };
        self.fill_rect(x0, y0, w, h, fill);
        if w > 4 && h > 4 {
            let light = mix(fill, 255, 0.6);
            let dark = mix(fill, 0, 0.5);
            let (top_left, bottom_right) = match bevel {
                Bevel::Raised => (Some(light), Some(dark)),
                Bevel::Sunken => (Some(dark), Some(light)),
                Bevel::Flat => (None, None),
            };
            if let (Some(tl), Some(br)) = (top_left, bottom_right) {
                for x in x0 + 1..x0 + w - 1 {
                    self.set(x, y0 + 1, tl);
                    self.set(x, y0 + h - 2, br);
                }
                for y in y0 + 1..y0 + h - 1 {
                    self.set(x0 + 1, y, tl);
                    self.set(x0 + w - 2, y, br);
                }
            }
        }
        let frame = if gray_out { GRAY_FRAME_COLOR } else { FRAME_COLOR };
        self.frame(x0, y0, w, h, frame);
    }
}

/// Transparent icon with a frame; used when there is nothing to show.
pub fn blank_icon(size: [usize; 2]) -> ColorImage {
    let mut canvas = Canvas::new(size);
    let (w, h) = (canvas.width(), canvas.height());
    canvas.frame(0, 0, w, h, GRAY_FRAME_COLOR);
    canvas.image
}

pub fn scalar_icon(size: [usize; 2], fill: Color32, bevel: Bevel, gray_out: bool) -> ColorImage {
    let mut canvas = Canvas::new(size);
    let (w, h) = (canvas.width(), canvas.height());
    canvas.scalar_box(0, 0, w, h, fill, bevel, gray_out);
    canvas.image
}

/// Three scalar boxes (minimum, average, maximum), each shaded on its own.
pub fn tau_icon(size: [usize; 2], parts: [(Color32, Bevel); 3], gray_out: bool) -> ColorImage {
    let mut canvas = Canvas::new(size);
    let part_width = canvas.width() / 3;
    let h = canvas.height();
    for (i, (fill, bevel)) in parts.iter().enumerate() {
        canvas.scalar_box(i * part_width, 0, part_width, h, *fill, *bevel, gray_out);
    }
    canvas.image
}

/// Bar heights in pixels, the largest bucket spanning the full `height`.
///
/// `None` for degenerate histograms (no buckets or no positive maximum).
pub fn histogram_bar_heights(buckets: &[f64], height: usize) -> Option<Vec<usize>> {
    let max = buckets.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if buckets.is_empty() || !max.is_finite() || max <= 0.0 {
        return None;
    }
    Some(
        buckets
            .iter()
            .map(|b| ((b.max(0.0) / max) * height as f64).round() as usize)
            .map(|bar| bar.min(height))
            .collect(),
    )
}

/// One bar per bucket; `size[0]` is expected to be a multiple of the bucket count.
pub fn histogram_icon(size: [usize; 2], buckets: &[f64], color: Color32, gray_out: bool) -> ColorImage {
    let mut canvas = Canvas::new(size);
    let (w, h) = (canvas.width(), canvas.height());
    let Some(heights) = histogram_bar_heights(buckets, h) else {
        canvas.frame(0, 0, w, h, GRAY_FRAME_COLOR);
        return canvas.image;
    };
    let bar_color = if gray_out { dimmed(color) } else { color };
    let bar_width = (w / heights.len()).max(1);
    for (i, bar) in heights.iter().enumerate() {
        canvas.fill_rect(i * bar_width, h - bar, bar_width, *bar, bar_color);
    }
    canvas.image
}
