use eframe::egui;

/// Closable help window with the grid-method walkthrough.
pub struct ManualWindow {
    pub open: bool,
}

const STEPS: &[(&str, &str, &str)] = &[
    (
        "1. Upload your reference",
        "Pick a reference photo (PNG, JPG, GIF, WebP or BMP), or drop one onto the window.",
        "High-resolution images work best; portrait and landscape are both fine.",
    ),
    (
        "2. Adjust the grid",
        "Set the grid size and line width to match your drawing needs.",
        "Start with 8×8; use 12–16 cells for detailed work.",
    ),
    (
        "3. Toggle black & white",
        "Grayscale makes values easier to judge while shading.",
        "Pick a line color that stays visible over the image.",
    ),
    (
        "4. Crop and pan",
        "Choose an aspect ratio to match your paper, then drag the image to frame the crop.",
        "Reset Position brings the crop back to center.",
    ),
    (
        "5. Measure your paper grid",
        "Use the cm readouts to draw a matching grid on your drawing surface.",
        "Cell-by-cell the proportions transfer exactly.",
    ),
    (
        "6. Draw cell by cell",
        "Focus on one cell at a time and copy only what you see inside it.",
        "Lightly number rows and columns on both grids to keep your place.",
    ),
];

impl ManualWindow {
    pub fn new() -> Self {
        ManualWindow { open: false }
    }

    pub fn show(&mut self, ctx: &egui::Context) {
        let mut open = self.open;
        egui::Window::new("Grid Method Guide")
            .open(&mut open)
            .default_width(420.0)
            .resizable(false)
            .collapsible(false)
            .show(ctx, |ui| {
                ui.label(
                    "The grid method: overlay a grid on a reference image and a matching \
                     grid on your paper, then copy the proportions cell by cell.",
                );
                ui.add_space(8.0);
                for (title, body, tip) in STEPS {
                    ui.strong(*title);
                    ui.label(*body);
                    ui.small(*tip);
                    ui.add_space(6.0);
                }
            });
        self.open = open;
    }
}
