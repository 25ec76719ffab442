use eframe::egui;
use egui::{Align2, Color32, ColorImage, FontId, Pos2, TextureHandle, TextureOptions};

use crate::compositor::{CANVAS_HEIGHT, CANVAS_WIDTH, Measurements, PanOffset, RenderOutput};

/// What the canvas area reported back this frame.
#[derive(Default)]
pub struct CanvasResponse {
    /// The user clicked "Reset Position".
    pub reset_requested: bool,
}

/// The fixed 800×600 preview area: shows the composited raster, handles
/// drag-to-pan, and displays the derived grid measurements underneath.
pub struct CanvasView {
    texture: Option<TextureHandle>,
    /// Serial of the render currently uploaded — texture is only re-uploaded
    /// when the composite actually changed.
    uploaded_serial: Option<u64>,
    /// Pointer position minus the pan offset at drag start; the current pan
    /// is always `pointer − anchor`, clamped.
    drag_anchor: Option<Pos2>,
}

impl CanvasView {
    pub fn new() -> Self {
        CanvasView {
            texture: None,
            uploaded_serial: None,
            drag_anchor: None,
        }
    }

    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        render: &RenderOutput,
        render_serial: u64,
        has_image: bool,
        cell_count: u32,
        pan: &mut PanOffset,
    ) -> CanvasResponse {
        let mut out = CanvasResponse::default();

        self.upload_if_changed(ui.ctx(), render, render_serial);

        // -- Canvas -------------------------------------------------------
        let desired = egui::vec2(CANVAS_WIDTH as f32, CANVAS_HEIGHT as f32);
        let sense = if has_image {
            egui::Sense::click_and_drag()
        } else {
            egui::Sense::hover()
        };
        let (response, painter) = ui.allocate_painter(desired, sense);
        let rect = response.rect;

        // Backdrop behind the transparent letterbox areas.
        painter.rect_filled(rect, 4.0, ui.visuals().extreme_bg_color);
        if let Some(tex) = &self.texture {
            painter.image(
                tex.id(),
                rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }
        if !has_image {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                "Upload an image to start",
                FontId::proportional(18.0),
                ui.visuals().weak_text_color(),
            );
        }

        // -- Drag to pan --------------------------------------------------
        if has_image {
            if response.drag_started()
                && let Some(pos) = response.interact_pointer_pos()
            {
                self.drag_anchor = Some(pos - egui::vec2(pan.x, pan.y));
            }
            if response.dragged()
                && let Some(anchor) = self.drag_anchor
                && let Some(pos) = response.interact_pointer_pos()
            {
                let offset = pos - anchor;
                *pan = PanOffset {
                    x: offset.x,
                    y: offset.y,
                }
                .clamp_drag();
            }
            if response.drag_released() {
                self.drag_anchor = None;
            }
            let cursor = if self.drag_anchor.is_some() {
                egui::CursorIcon::Grabbing
            } else {
                egui::CursorIcon::Grab
            };
            response.on_hover_cursor(cursor);
        }

        // -- Reset position -----------------------------------------------
        if has_image && !pan.is_zero() {
            ui.add_space(6.0);
            ui.vertical_centered(|ui| {
                if ui.button("Reset Position").clicked() {
                    out.reset_requested = true;
                }
            });
        }

        // -- Measurements -------------------------------------------------
        if has_image {
            ui.add_space(10.0);
            measurements_strip(ui, &render.measurements, cell_count);
        }

        out
    }

    fn upload_if_changed(&mut self, ctx: &egui::Context, render: &RenderOutput, serial: u64) {
        if self.uploaded_serial == Some(serial) {
            return;
        }
        let img = &render.pixels;
        let color_image = ColorImage::from_rgba_unmultiplied(
            [img.width() as usize, img.height() as usize],
            img.as_raw(),
        );
        match &mut self.texture {
            Some(tex) => tex.set(color_image, TextureOptions::LINEAR),
            None => {
                self.texture = Some(ctx.load_texture("canvas", color_image, TextureOptions::LINEAR))
            }
        }
        self.uploaded_serial = Some(serial);
    }
}

/// The four cm readouts under the canvas. These come straight from the last
/// composite, so they always match the visible grid.
fn measurements_strip(ui: &mut egui::Ui, m: &Measurements, cell_count: u32) {
    ui.group(|ui| {
        ui.strong("Grid Measurements");
        ui.add_space(4.0);
        ui.horizontal(|ui| {
            badge(ui, "Cell Width", m.cell_width_cm);
            badge(ui, "Cell Height", m.cell_height_cm);
            badge(ui, "Total Width", m.total_width_cm);
            badge(ui, "Total Height", m.total_height_cm);
        });
        ui.add_space(4.0);
        ui.small(format!(
            "Tip: draw a matching {0}×{0} grid on your paper — each cell about {1:.1}×{2:.1} cm.",
            cell_count, m.cell_width_cm, m.cell_height_cm
        ));
    });
}

fn badge(ui: &mut egui::Ui, label: &str, value_cm: f64) {
    ui.vertical(|ui| {
        ui.small(label);
        ui.monospace(format!("{:.1} cm", value_cm));
    });
    ui.add_space(12.0);
}
