// ============================================================================
// COMPOSITOR — the pure raster core
// ============================================================================
//
// Everything on screen (and everything exported) is produced by `render`:
// given the uploaded image, the grid configuration and the pan offset, it
// returns the composited 800×600 canvas plus the derived cm measurements.
// No hidden state — calling it twice with the same inputs yields identical
// bytes, which is what makes the export byte-identical to the preview.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

/// Fixed logical canvas size, matching the preview area.
pub const CANVAS_WIDTH: u32 = 800;
pub const CANVAS_HEIGHT: u32 = 600;

/// 96 DPI: 1 px = 0.0264583 cm.
pub const PIXEL_TO_CM: f64 = 0.0264583;

/// Display-space drag offset is clamped to ±150 px by the canvas view.
pub const MAX_DRAG_OFFSET: f32 = 150.0;
/// Drag offsets are scaled by this factor when translating the source rect.
pub const PAN_SENSITIVITY: f64 = 2.0;
/// The source rect may be translated by at most this fraction of its own size.
pub const PAN_RANGE_FRACTION: f64 = 0.3;

/// Grid strokes are drawn at 80% opacity, unaffected by the grayscale filter.
pub const GRID_LINE_ALPHA: f64 = 0.8;

pub const MIN_CELLS: u32 = 2;
pub const MAX_CELLS: u32 = 20;
pub const MIN_LINE_WIDTH: u32 = 1;
pub const MAX_LINE_WIDTH: u32 = 5;

/// Flat fill shown before any image is loaded.
const IDLE_FILL: Rgba<u8> = Rgba([44, 44, 50, 255]);

// ============================================================================
// Configuration value types
// ============================================================================

/// Target proportions for the cropped view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AspectRatio {
    /// Keep the image's native proportions (no crop).
    #[default]
    Original,
    /// Crop to a fixed W:H ratio, e.g. `Fixed(16, 9)`.
    Fixed(u32, u32),
}

impl AspectRatio {
    /// The presets offered by the control panel.
    pub fn all() -> &'static [AspectRatio] {
        &[
            AspectRatio::Original,
            AspectRatio::Fixed(1, 1),
            AspectRatio::Fixed(3, 4),
            AspectRatio::Fixed(4, 3),
            AspectRatio::Fixed(5, 4),
            AspectRatio::Fixed(3, 2),
            AspectRatio::Fixed(16, 9),
            AspectRatio::Fixed(21, 9),
        ]
    }

    pub fn label(&self) -> String {
        match self {
            AspectRatio::Original => "Original".to_string(),
            AspectRatio::Fixed(1, 1) => "Square (1:1)".to_string(),
            AspectRatio::Fixed(3, 4) => "Portrait (3:4)".to_string(),
            AspectRatio::Fixed(4, 3) => "Landscape (4:3)".to_string(),
            AspectRatio::Fixed(5, 4) => "Wide (5:4)".to_string(),
            AspectRatio::Fixed(3, 2) => "Photo (3:2)".to_string(),
            AspectRatio::Fixed(16, 9) => "Widescreen (16:9)".to_string(),
            AspectRatio::Fixed(21, 9) => "Ultra Wide (21:9)".to_string(),
            AspectRatio::Fixed(w, h) => format!("{}:{}", w, h),
        }
    }

    /// Parse `"original"` or `"W:H"` (used by the CLI).
    pub fn parse(s: &str) -> Option<AspectRatio> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("original") {
            return Some(AspectRatio::Original);
        }
        let (w, h) = s.split_once(':')?;
        let w: u32 = w.trim().parse().ok()?;
        let h: u32 = h.trim().parse().ok()?;
        if w == 0 || h == 0 {
            return None;
        }
        Some(AspectRatio::Fixed(w, h))
    }

    /// The width/height ratio to fit, given the image's native dimensions.
    pub fn target_ratio(&self, img_w: u32, img_h: u32) -> f64 {
        match self {
            AspectRatio::Original => img_w as f64 / img_h as f64,
            AspectRatio::Fixed(w, h) => *w as f64 / *h as f64,
        }
    }
}

/// Fixed grid-line palette (same swatches as the original tool).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GridColor {
    #[default]
    White,
    Black,
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Pink,
}

impl GridColor {
    pub fn all() -> &'static [GridColor] {
        &[
            GridColor::White,
            GridColor::Black,
            GridColor::Red,
            GridColor::Blue,
            GridColor::Green,
            GridColor::Yellow,
            GridColor::Purple,
            GridColor::Pink,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            GridColor::White => "White",
            GridColor::Black => "Black",
            GridColor::Red => "Red",
            GridColor::Blue => "Blue",
            GridColor::Green => "Green",
            GridColor::Yellow => "Yellow",
            GridColor::Purple => "Purple",
            GridColor::Pink => "Pink",
        }
    }

    pub fn rgb(&self) -> [u8; 3] {
        match self {
            GridColor::White => [0xff, 0xff, 0xff],
            GridColor::Black => [0x00, 0x00, 0x00],
            GridColor::Red => [0xef, 0x44, 0x44],
            GridColor::Blue => [0x3b, 0x82, 0xf6],
            GridColor::Green => [0x10, 0xb9, 0x81],
            GridColor::Yellow => [0xf5, 0x9e, 0x0b],
            GridColor::Purple => [0x8b, 0x5c, 0xf6],
            GridColor::Pink => [0xec, 0x48, 0x99],
        }
    }

    /// Parse a palette name (used by the CLI), case-insensitive.
    pub fn parse(s: &str) -> Option<GridColor> {
        GridColor::all()
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(s.trim()))
    }
}

/// Full grid configuration. Value type — replaced wholesale on every control
/// change, never mutated behind the compositor's back.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridConfig {
    pub cell_count: u32,
    pub line_color: GridColor,
    pub line_width: u32,
    pub grayscale: bool,
    pub aspect: AspectRatio,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            cell_count: 8,
            line_color: GridColor::White,
            line_width: 2,
            grayscale: false,
            aspect: AspectRatio::Original,
        }
    }
}

impl GridConfig {
    /// Clamp numeric fields to their valid ranges. Every path into `render`
    /// goes through this, so the compositor itself never validates.
    pub fn clamped(mut self) -> Self {
        self.cell_count = self.cell_count.clamp(MIN_CELLS, MAX_CELLS);
        self.line_width = self.line_width.clamp(MIN_LINE_WIDTH, MAX_LINE_WIDTH);
        self
    }
}

/// Display-space pan offset accumulated by dragging the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct PanOffset {
    pub x: f32,
    pub y: f32,
}

impl PanOffset {
    /// Clamp to the ±150 px drag range.
    pub fn clamp_drag(self) -> Self {
        PanOffset {
            x: self.x.clamp(-MAX_DRAG_OFFSET, MAX_DRAG_OFFSET),
            y: self.y.clamp(-MAX_DRAG_OFFSET, MAX_DRAG_OFFSET),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

// ============================================================================
// Derived values
// ============================================================================

/// Real-world grid dimensions at the fixed 96 DPI assumption,
/// rounded to one decimal. All zero while no image is loaded.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Measurements {
    pub cell_width_cm: f64,
    pub cell_height_cm: f64,
    pub total_width_cm: f64,
    pub total_height_cm: f64,
}

/// Resolved geometry for one composite pass: where the image lands on the
/// canvas (destination rect) and which part of it is shown (source rect).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Layout {
    pub draw_w: f64,
    pub draw_h: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub src_x: f64,
    pub src_y: f64,
    pub src_w: f64,
    pub src_h: f64,
}

/// One rendered frame: the canvas raster plus the measurements that were
/// computed from the very same draw dimensions.
#[derive(Clone)]
pub struct RenderOutput {
    pub pixels: RgbaImage,
    pub measurements: Measurements,
}

// ============================================================================
// Layout
// ============================================================================

/// Resolve destination and source rectangles for an `img_w`×`img_h` image.
///
/// The destination rect letterboxes the target ratio into the fixed canvas and
/// centers it. The source rect starts at the full image, is cropped
/// symmetrically along the axis that exceeds the target ratio, then translated
/// by the pan offset: scale by the sensitivity factor, clamp the translation
/// to ±30% of the crop size, clamp the resulting origin to the image bounds —
/// in that order.
pub fn compute_layout(img_w: u32, img_h: u32, config: &GridConfig, pan: PanOffset) -> Layout {
    let img_w = img_w as f64;
    let img_h = img_h as f64;

    let target = config.aspect.target_ratio(img_w as u32, img_h as u32);
    let canvas_w = CANVAS_WIDTH as f64;
    let canvas_h = CANVAS_HEIGHT as f64;
    let canvas_ratio = canvas_w / canvas_h;

    // Letterbox / pillarbox fit, centered.
    let (draw_w, draw_h) = if target > canvas_ratio {
        (canvas_w, canvas_w / target)
    } else {
        (canvas_h * target, canvas_h)
    };
    let offset_x = (canvas_w - draw_w) / 2.0;
    let offset_y = (canvas_h - draw_h) / 2.0;

    // Source crop: full extent, then trim the longer axis for fixed ratios.
    let mut src_x = 0.0;
    let mut src_y = 0.0;
    let mut src_w = img_w;
    let mut src_h = img_h;
    if let AspectRatio::Fixed(..) = config.aspect {
        let image_ratio = img_w / img_h;
        if target > image_ratio {
            // Image is taller than the target ratio — crop height.
            src_h = img_w / target;
            src_y = (img_h - src_h) / 2.0;
        } else if target < image_ratio {
            // Image is wider than the target ratio — crop width.
            src_w = img_h * target;
            src_x = (img_w - src_w) / 2.0;
        }
    }

    // Pan: dragging right reveals the left side, hence the negation.
    let pan_x = -(pan.x as f64) * PAN_SENSITIVITY;
    let pan_y = -(pan.y as f64) * PAN_SENSITIVITY;
    let max_pan_x = (src_w * PAN_RANGE_FRACTION).max(0.0);
    let max_pan_y = (src_h * PAN_RANGE_FRACTION).max(0.0);
    let pan_x = pan_x.clamp(-max_pan_x, max_pan_x);
    let pan_y = pan_y.clamp(-max_pan_y, max_pan_y);
    src_x = (src_x + pan_x).clamp(0.0, (img_w - src_w).max(0.0));
    src_y = (src_y + pan_y).clamp(0.0, (img_h - src_h).max(0.0));

    Layout {
        draw_w,
        draw_h,
        offset_x,
        offset_y,
        src_x,
        src_y,
        src_w,
        src_h,
    }
}

fn round_1dp(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Derive cm measurements from the same draw dimensions that were rasterized,
/// so the displayed numbers always match the visible grid.
pub fn measurements(layout: &Layout, cell_count: u32) -> Measurements {
    let cells = cell_count.max(1) as f64;
    Measurements {
        cell_width_cm: round_1dp(layout.draw_w / cells * PIXEL_TO_CM),
        cell_height_cm: round_1dp(layout.draw_h / cells * PIXEL_TO_CM),
        total_width_cm: round_1dp(layout.draw_w * PIXEL_TO_CM),
        total_height_cm: round_1dp(layout.draw_h * PIXEL_TO_CM),
    }
}

/// X coordinates of the `cell_count + 1` vertical grid lines. The first and
/// last coincide with the destination rectangle's edges.
pub fn vertical_line_positions(layout: &Layout, cell_count: u32) -> Vec<f64> {
    let cell_w = layout.draw_w / cell_count as f64;
    (0..=cell_count)
        .map(|i| layout.offset_x + i as f64 * cell_w)
        .collect()
}

/// Y coordinates of the `cell_count + 1` horizontal grid lines.
pub fn horizontal_line_positions(layout: &Layout, cell_count: u32) -> Vec<f64> {
    let cell_h = layout.draw_h / cell_count as f64;
    (0..=cell_count)
        .map(|i| layout.offset_y + i as f64 * cell_h)
        .collect()
}

// ============================================================================
// Rendering
// ============================================================================

/// Composite one frame.
///
/// With no image this is the defined idle state (flat fill, zero
/// measurements), not an error. With an image: bilinear-resample the source
/// rect into the destination rect (grayscale applied to the sampled pixels
/// only), then stroke the grid lines on top at 80% opacity. The area outside
/// the destination rect stays transparent, matching what the original canvas
/// exported.
pub fn render(image: Option<&RgbaImage>, config: &GridConfig, pan: PanOffset) -> RenderOutput {
    let Some(image) = image else {
        return RenderOutput {
            pixels: RgbaImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, IDLE_FILL),
            measurements: Measurements::default(),
        };
    };

    let layout = compute_layout(image.width(), image.height(), config, pan);
    let mut canvas = RgbaImage::new(CANVAS_WIDTH, CANVAS_HEIGHT);

    draw_image(&mut canvas, image, &layout, config.grayscale);
    draw_grid(&mut canvas, &layout, config);

    RenderOutput {
        pixels: canvas,
        measurements: measurements(&layout, config.cell_count),
    }
}

/// Resample the source rect into the destination rect, row-parallel.
fn draw_image(canvas: &mut RgbaImage, image: &RgbaImage, layout: &Layout, grayscale: bool) {
    let canvas_w = canvas.width() as usize;
    let stride = canvas_w * 4;

    // Destination pixel span (by pixel center coverage).
    let x0 = pixel_index(layout.offset_x, CANVAS_WIDTH);
    let x1 = pixel_index(layout.offset_x + layout.draw_w, CANVAS_WIDTH);
    let y0 = pixel_index(layout.offset_y, CANVAS_HEIGHT);
    let y1 = pixel_index(layout.offset_y + layout.draw_h, CANVAS_HEIGHT);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let raw: &mut [u8] = canvas.as_mut();
    raw.par_chunks_mut(stride)
        .enumerate()
        .skip(y0)
        .take(y1 - y0)
        .for_each(|(y, row)| {
            let v = layout.src_y
                + (y as f64 + 0.5 - layout.offset_y) / layout.draw_h * layout.src_h
                - 0.5;
            for x in x0..x1 {
                let u = layout.src_x
                    + (x as f64 + 0.5 - layout.offset_x) / layout.draw_w * layout.src_w
                    - 0.5;
                let mut px = bilinear_sample(image, u, v);
                if grayscale {
                    // BT.709 luminance, same weights as a desaturate pass.
                    let lum = (0.2126 * px[0] as f64
                        + 0.7152 * px[1] as f64
                        + 0.0722 * px[2] as f64)
                        .round()
                        .clamp(0.0, 255.0) as u8;
                    px = [lum, lum, lum, px[3]];
                }
                let off = x * 4;
                row[off..off + 4].copy_from_slice(&px);
            }
        });
}

/// Index of the first canvas pixel whose center lies at or after `edge`.
/// Applied to both ends of a half-open span this gives exact pixel-center
/// coverage, so adjacent spans never overlap or leave gaps.
fn pixel_index(edge: f64, limit: u32) -> usize {
    ((edge - 0.5).ceil().max(0.0) as usize).min(limit as usize)
}

/// Clamped bilinear sample at subpixel coordinate (u, v).
fn bilinear_sample(image: &RgbaImage, u: f64, v: f64) -> [u8; 4] {
    let w = image.width() as i64;
    let h = image.height() as i64;
    let u = u.clamp(0.0, (w - 1) as f64);
    let v = v.clamp(0.0, (h - 1) as f64);
    let ix = u.floor() as i64;
    let iy = v.floor() as i64;
    let fx = u - ix as f64;
    let fy = v - iy as f64;
    let x1 = (ix + 1).min(w - 1);
    let y1 = (iy + 1).min(h - 1);

    let p00 = image.get_pixel(ix as u32, iy as u32).0;
    let p10 = image.get_pixel(x1 as u32, iy as u32).0;
    let p01 = image.get_pixel(ix as u32, y1 as u32).0;
    let p11 = image.get_pixel(x1 as u32, y1 as u32).0;

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bot = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        out[c] = (top * (1.0 - fy) + bot * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Stroke the `cell_count + 1` vertical and horizontal lines over the image.
/// Strokes are centered on the line coordinate and clipped by the canvas only
/// (not the destination rect), the way a canvas stroke behaves; strokes that
/// straddle a canvas edge are nudged fully inside so edge lines keep their
/// full width.
fn draw_grid(canvas: &mut RgbaImage, layout: &Layout, config: &GridConfig) {
    let rgb = config.line_color.rgb();
    let width = config.line_width;

    let y0 = pixel_index(layout.offset_y, CANVAS_HEIGHT);
    let y1 = pixel_index(layout.offset_y + layout.draw_h, CANVAS_HEIGHT);
    for x in vertical_line_positions(layout, config.cell_count) {
        let (x0, x1) = stroke_span(x, width, CANVAS_WIDTH);
        blend_span(canvas, x0, x1, y0, y1, rgb);
    }

    let x0 = pixel_index(layout.offset_x, CANVAS_WIDTH);
    let x1 = pixel_index(layout.offset_x + layout.draw_w, CANVAS_WIDTH);
    for y in horizontal_line_positions(layout, config.cell_count) {
        let (y0, y1) = stroke_span(y, width, CANVAS_HEIGHT);
        blend_span(canvas, x0, x1, y0, y1, rgb);
    }
}

/// Pixel span of a stroke of `width` px centered on `center`, shifted to stay
/// inside `[0, limit)`.
///
/// Deliberate divergence from a browser canvas, which clips a stroke on the
/// canvas border to half its width: here the border lines keep their full
/// width, so the outermost grid lines stay as visible as the inner ones.
fn stroke_span(center: f64, width: u32, limit: u32) -> (usize, usize) {
    let width = (width.max(1) as i64).min(limit as i64);
    let start = (center - width as f64 / 2.0).round() as i64;
    let start = start.clamp(0, limit as i64 - width);
    (start as usize, (start + width) as usize)
}

/// Blend a solid rect onto the canvas at the grid stroke opacity.
fn blend_span(canvas: &mut RgbaImage, x0: usize, x1: usize, y0: usize, y1: usize, rgb: [u8; 3]) {
    for y in y0..y1 {
        for x in x0..x1 {
            let px = canvas.get_pixel_mut(x as u32, y as u32);
            px.0 = blend_over(px.0, rgb, GRID_LINE_ALPHA);
        }
    }
}

/// Source-over blend of an rgb color at `alpha` onto a (possibly transparent)
/// destination pixel.
fn blend_over(dst: [u8; 4], src_rgb: [u8; 3], alpha: f64) -> [u8; 4] {
    let da = dst[3] as f64 / 255.0;
    let out_a = alpha + da * (1.0 - alpha);
    if out_a <= 0.0 {
        return [0, 0, 0, 0];
    }
    let mut out = [0u8; 4];
    for c in 0..3 {
        let sc = src_rgb[c] as f64 / 255.0;
        let dc = dst[c] as f64 / 255.0;
        let v = (sc * alpha + dc * da * (1.0 - alpha)) / out_a;
        out[c] = (v * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_image(w: u32, h: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(rgba))
    }

    fn config_with(aspect: AspectRatio, cells: u32) -> GridConfig {
        GridConfig {
            cell_count: cells,
            aspect,
            ..GridConfig::default()
        }
        .clamped()
    }

    #[test]
    fn widescreen_fit_is_centered_letterbox() {
        let config = config_with(AspectRatio::Fixed(16, 9), 8);
        let layout = compute_layout(1600, 900, &config, PanOffset::default());
        assert!((layout.draw_w - 800.0).abs() < 1e-9);
        assert!((layout.draw_h - 450.0).abs() < 1e-9);
        assert!((layout.offset_x - 0.0).abs() < 1e-9);
        assert!((layout.offset_y - 75.0).abs() < 1e-9);
    }

    #[test]
    fn square_crop_of_landscape_image() {
        // 1200×800 at 1:1 → 600×600 dest at (100, 0), centered 800×800 source.
        let config = config_with(AspectRatio::Fixed(1, 1), 8);
        let layout = compute_layout(1200, 800, &config, PanOffset::default());
        assert!((layout.draw_w - 600.0).abs() < 1e-9);
        assert!((layout.draw_h - 600.0).abs() < 1e-9);
        assert!((layout.offset_x - 100.0).abs() < 1e-9);
        assert!((layout.offset_y - 0.0).abs() < 1e-9);
        assert!((layout.src_w - 800.0).abs() < 1e-9);
        assert!((layout.src_h - 800.0).abs() < 1e-9);
        assert!((layout.src_x - 200.0).abs() < 1e-9);
        assert!((layout.src_y - 0.0).abs() < 1e-9);
    }

    #[test]
    fn original_aspect_uses_full_extent() {
        let config = config_with(AspectRatio::Original, 8);
        let layout = compute_layout(1024, 768, &config, PanOffset::default());
        assert_eq!(layout.src_x, 0.0);
        assert_eq!(layout.src_y, 0.0);
        assert_eq!(layout.src_w, 1024.0);
        assert_eq!(layout.src_h, 768.0);
        // 4:3 fills the 600 px height: 800×600 canvas has ratio 4:3 exactly.
        assert!((layout.draw_w - 800.0).abs() < 1e-9);
        assert!((layout.draw_h - 600.0).abs() < 1e-9);
    }

    #[test]
    fn drag_clamp_limits_offset() {
        let pan = PanOffset { x: 900.0, y: -431.5 }.clamp_drag();
        assert_eq!(pan.x, MAX_DRAG_OFFSET);
        assert_eq!(pan.y, -MAX_DRAG_OFFSET);
    }

    #[test]
    fn pan_never_escapes_image_bounds() {
        let config = config_with(AspectRatio::Fixed(1, 1), 8);
        for &(x, y) in &[(150.0f32, 150.0f32), (-150.0, -150.0), (150.0, -150.0)] {
            let pan = PanOffset { x, y }.clamp_drag();
            let layout = compute_layout(1200, 800, &config, pan);
            assert!(layout.src_x >= 0.0);
            assert!(layout.src_y >= 0.0);
            assert!(layout.src_x + layout.src_w <= 1200.0 + 1e-9);
            assert!(layout.src_y + layout.src_h <= 800.0 + 1e-9);
        }
    }

    #[test]
    fn pan_clamps_follow_scale_then_range_then_bounds_order() {
        // 1200×800 at 1:1: crop is 800 wide at x = 200. A −150 px drag scales
        // to +300 source px, the 30% range clamp cuts that to 240
        // (→ origin 440), and the absolute bounds clamp then caps the origin
        // at 400 (= 1200 − 800).
        let config = config_with(AspectRatio::Fixed(1, 1), 8);
        let layout = compute_layout(
            1200,
            800,
            &config,
            PanOffset { x: -150.0, y: 0.0 }.clamp_drag(),
        );
        assert!((layout.src_x - 400.0).abs() < 1e-9);

        // A smaller drag stays below both clamps: −50 px → +100 source px.
        let layout = compute_layout(
            1200,
            800,
            &config,
            PanOffset { x: -50.0, y: 0.0 }.clamp_drag(),
        );
        assert!((layout.src_x - 300.0).abs() < 1e-9);
    }

    #[test]
    fn pan_has_no_effect_at_original_aspect() {
        // With the full extent as the source rect there is no room to pan:
        // the absolute bounds clamp pins the origin at zero.
        let config = config_with(AspectRatio::Original, 8);
        let layout = compute_layout(
            640,
            480,
            &config,
            PanOffset { x: 80.0, y: -40.0 }.clamp_drag(),
        );
        assert_eq!(layout.src_x, 0.0);
        assert_eq!(layout.src_y, 0.0);
    }

    #[test]
    fn grid_lines_span_destination_edges() {
        for cells in MIN_CELLS..=MAX_CELLS {
            for aspect in AspectRatio::all() {
                let config = config_with(*aspect, cells);
                let layout = compute_layout(1200, 800, &config, PanOffset::default());
                let xs = vertical_line_positions(&layout, cells);
                let ys = horizontal_line_positions(&layout, cells);
                assert_eq!(xs.len(), cells as usize + 1);
                assert_eq!(ys.len(), cells as usize + 1);
                assert!((xs[0] - layout.offset_x).abs() < 1e-9);
                assert!((xs[cells as usize] - (layout.offset_x + layout.draw_w)).abs() < 1e-9);
                assert!((ys[0] - layout.offset_y).abs() < 1e-9);
                assert!((ys[cells as usize] - (layout.offset_y + layout.draw_h)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn rendered_grid_pixels_match_line_positions() {
        // Black image, white 1 px grid: the canvas must show the stroke at
        // every line center and stay untouched mid-cell.
        let image = flat_image(800, 600, [0, 0, 0, 255]);
        let config = GridConfig {
            cell_count: 4,
            line_color: GridColor::White,
            line_width: 1,
            grayscale: false,
            aspect: AspectRatio::Original,
        };
        let out = render(Some(&image), &config, PanOffset::default());
        let layout = compute_layout(800, 600, &config, PanOffset::default());

        let expected_line = blend_over([0, 0, 0, 255], [255, 255, 255], GRID_LINE_ALPHA);
        assert_eq!(expected_line, [204, 204, 204, 255]);

        // Lines at x = 0, 200, 400, 600, 800; the last stroke is nudged
        // inside the canvas onto column 799.
        assert_eq!(vertical_line_positions(&layout, 4).len(), 5);
        for col in [0u32, 200, 400, 600, 799] {
            // Sample partway down the line, away from horizontal strokes.
            let sample = out.pixels.get_pixel(col, 230).0;
            assert_eq!(sample, expected_line, "no stroke at column {}", col);
        }
        // Mid-cell pixel is plain image.
        let mid = out.pixels.get_pixel(100, 230).0;
        assert_eq!(mid, [0, 0, 0, 255]);
    }

    #[test]
    fn render_is_idempotent() {
        let mut image = flat_image(320, 200, [10, 20, 30, 255]);
        image.put_pixel(5, 5, Rgba([200, 100, 50, 255]));
        let config = config_with(AspectRatio::Fixed(3, 2), 7);
        let pan = PanOffset { x: 12.0, y: -9.0 };
        let a = render(Some(&image), &config, pan);
        let b = render(Some(&image), &config, pan);
        assert_eq!(a.pixels.as_raw(), b.pixels.as_raw());
        assert_eq!(a.measurements, b.measurements);
    }

    #[test]
    fn measurements_are_consistent_with_draw_size() {
        for cells in MIN_CELLS..=MAX_CELLS {
            for aspect in AspectRatio::all() {
                let config = config_with(*aspect, cells);
                let layout = compute_layout(1200, 800, &config, PanOffset::default());
                // The unrounded cell size times the cell count is exactly the
                // total; the displayed values only differ by the final 1 dp
                // rounding of each.
                let cell = layout.draw_w / cells as f64 * PIXEL_TO_CM;
                let total = layout.draw_w * PIXEL_TO_CM;
                assert!((cell * cells as f64 - total).abs() < 1e-9);

                let m = measurements(&layout, cells);
                assert!((m.total_width_cm - total).abs() <= 0.05 + 1e-9);
                assert!((m.cell_width_cm - cell).abs() <= 0.05 + 1e-9);
            }
        }
    }

    #[test]
    fn measurements_match_rasterized_dimensions() {
        let config = config_with(AspectRatio::Fixed(16, 9), 10);
        let layout = compute_layout(1920, 1080, &config, PanOffset::default());
        let m = measurements(&layout, 10);
        // 800 px wide, 450 tall at 96 DPI.
        assert!((m.total_width_cm - 21.2).abs() < 1e-9);
        assert!((m.total_height_cm - 11.9).abs() < 1e-9);
        assert!((m.cell_width_cm - 2.1).abs() < 1e-9);
        assert!((m.cell_height_cm - 1.2).abs() < 1e-9);
    }

    #[test]
    fn idle_render_is_flat_fill_with_zero_measurements() {
        let config = GridConfig::default();
        let out = render(None, &config, PanOffset::default());
        assert_eq!(out.measurements, Measurements::default());
        assert_eq!(out.pixels.dimensions(), (CANVAS_WIDTH, CANVAS_HEIGHT));
        let first = out.pixels.get_pixel(0, 0);
        assert!(out.pixels.pixels().all(|p| p == first));
    }

    #[test]
    fn grayscale_changes_image_sampling_but_not_stroke_color() {
        let image = flat_image(400, 300, [200, 40, 40, 255]);
        let base = GridConfig {
            cell_count: 4,
            line_color: GridColor::Blue,
            line_width: 3,
            grayscale: false,
            aspect: AspectRatio::Original,
        };
        let gray = GridConfig {
            grayscale: true,
            ..base
        };
        let out_color = render(Some(&image), &base, PanOffset::default());
        let out_gray = render(Some(&image), &gray, PanOffset::default());

        // Mid-cell: sampled image pixel changes under the filter.
        let mid_color = out_color.pixels.get_pixel(100, 75).0;
        let mid_gray = out_gray.pixels.get_pixel(100, 75).0;
        assert_ne!(mid_color, mid_gray);
        assert_eq!(mid_gray[0], mid_gray[1]);
        assert_eq!(mid_gray[1], mid_gray[2]);

        // On a line: the stroke keeps its own color and opacity; the composite
        // in each case is exactly the blue stroke blended over that frame's
        // image pixel, proving the filter never touched the stroke.
        let stroke = GridColor::Blue.rgb();
        let line_color = out_color.pixels.get_pixel(0, 75).0;
        let line_gray = out_gray.pixels.get_pixel(0, 75).0;
        assert_eq!(line_color, blend_over(mid_color, stroke, GRID_LINE_ALPHA));
        assert_eq!(line_gray, blend_over(mid_gray, stroke, GRID_LINE_ALPHA));
    }

    #[test]
    fn letterbox_area_stays_transparent() {
        let image = flat_image(900, 900, [50, 90, 130, 255]);
        let config = config_with(AspectRatio::Original, 8); // square → pillarbox
        let out = render(Some(&image), &config, PanOffset::default());
        // Square image in a 800×600 canvas: 600×600 dest at x = 100.
        assert_eq!(out.pixels.get_pixel(10, 300).0, [0, 0, 0, 0]);
        assert_eq!(out.pixels.get_pixel(789, 300).0, [0, 0, 0, 0]);
        assert_eq!(out.pixels.get_pixel(400, 300).0[3], 255);
    }

    #[test]
    fn config_clamp_enforces_ranges() {
        let config = GridConfig {
            cell_count: 99,
            line_width: 0,
            ..GridConfig::default()
        }
        .clamped();
        assert_eq!(config.cell_count, MAX_CELLS);
        assert_eq!(config.line_width, MIN_LINE_WIDTH);
    }

    #[test]
    fn aspect_ratio_parsing() {
        assert_eq!(AspectRatio::parse("original"), Some(AspectRatio::Original));
        assert_eq!(AspectRatio::parse("16:9"), Some(AspectRatio::Fixed(16, 9)));
        assert_eq!(AspectRatio::parse(" 3 : 2 "), Some(AspectRatio::Fixed(3, 2)));
        assert_eq!(AspectRatio::parse("0:4"), None);
        assert_eq!(AspectRatio::parse("wat"), None);
    }

    #[test]
    fn grid_color_parsing() {
        assert_eq!(GridColor::parse("white"), Some(GridColor::White));
        assert_eq!(GridColor::parse("Purple"), Some(GridColor::Purple));
        assert_eq!(GridColor::parse("mauve"), None);
    }
}
