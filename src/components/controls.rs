use eframe::egui;
use egui::{Color32, Stroke};

use crate::compositor::{
    AspectRatio, GridColor, GridConfig, MAX_CELLS, MAX_LINE_WIDTH, MIN_CELLS, MIN_LINE_WIDTH,
};

/// What the panel reported back this frame.
#[derive(Default)]
pub struct ControlsResponse {
    /// The aspect ratio preset changed — the session resets the pan offset.
    pub aspect_changed: bool,
}

/// The grid controls side panel: aspect ratio, grayscale, grid size,
/// line width and line color. Values are clamped here, at the UI boundary,
/// so the compositor never sees out-of-range input.
#[derive(Default)]
pub struct ControlsPanel;

impl ControlsPanel {
    pub fn show(&mut self, ui: &mut egui::Ui, config: &mut GridConfig) -> ControlsResponse {
        let mut response = ControlsResponse::default();

        ui.heading("Grid Controls");
        ui.add_space(6.0);

        // -- Aspect ratio -------------------------------------------------
        ui.label("Aspect Ratio");
        let previous_aspect = config.aspect;
        egui::ComboBox::from_id_source("aspect_ratio")
            .width(ui.available_width() - 8.0)
            .selected_text(config.aspect.label())
            .show_ui(ui, |ui| {
                for preset in AspectRatio::all() {
                    ui.selectable_value(&mut config.aspect, *preset, preset.label());
                }
            });
        if config.aspect != previous_aspect {
            response.aspect_changed = true;
        }
        ui.small("Crop the image to fixed proportions for better composition");
        ui.add_space(10.0);

        // -- Grayscale ----------------------------------------------------
        ui.checkbox(&mut config.grayscale, "Black & White Mode");
        ui.small("Convert the image to grayscale for easier value reading");
        ui.add_space(10.0);

        // -- Grid size ----------------------------------------------------
        ui.horizontal(|ui| {
            ui.label(format!(
                "Grid Size: {}×{}",
                config.cell_count, config.cell_count
            ));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button("+").clicked() {
                    config.cell_count += 1;
                }
                if ui.small_button("−").clicked() {
                    config.cell_count = config.cell_count.saturating_sub(1);
                }
            });
        });
        ui.add(egui::Slider::new(&mut config.cell_count, MIN_CELLS..=MAX_CELLS).show_value(false));
        ui.add_space(10.0);

        // -- Line width ---------------------------------------------------
        ui.label(format!("Grid Line Width: {}px", config.line_width));
        ui.add(
            egui::Slider::new(&mut config.line_width, MIN_LINE_WIDTH..=MAX_LINE_WIDTH)
                .show_value(false),
        );
        ui.add_space(10.0);

        // -- Line color ---------------------------------------------------
        ui.label("Grid Color");
        egui::Grid::new("grid_color_palette")
            .num_columns(4)
            .spacing([6.0, 6.0])
            .show(ui, |ui| {
                for (i, color) in GridColor::all().iter().enumerate() {
                    if swatch(ui, *color, config.line_color == *color).clicked() {
                        config.line_color = *color;
                    }
                    if i % 4 == 3 {
                        ui.end_row();
                    }
                }
            });

        *config = config.clamped();
        response
    }
}

/// One clickable color swatch, with a selection ring around the active one.
fn swatch(ui: &mut egui::Ui, color: GridColor, selected: bool) -> egui::Response {
    let fill = grid_color32(color);
    let response = ui.add(
        egui::Button::new("")
            .fill(fill)
            .min_size(egui::vec2(38.0, 26.0)),
    );
    if selected {
        ui.painter().rect_stroke(
            response.rect.expand(2.0),
            4.0,
            Stroke::new(2.0, ui.visuals().selection.stroke.color),
        );
    }
    response.on_hover_text(color.label())
}

/// Palette color as an egui color (the compositor stays egui-free).
pub fn grid_color32(color: GridColor) -> Color32 {
    let [r, g, b] = color.rgb();
    Color32::from_rgb(r, g, b)
}
