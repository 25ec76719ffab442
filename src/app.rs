use std::path::PathBuf;
use std::sync::mpsc;

use eframe::egui;
use image::RgbaImage;

use crate::components::canvas_view::CanvasView;
use crate::components::controls::ControlsPanel;
use crate::components::manual::ManualWindow;
use crate::compositor::{self, GridConfig, PanOffset, RenderOutput};
use crate::io::{self, FileHandler};
use crate::{log_err, log_info, log_warn};

/// How long a toast stays on screen.
const TOAST_SECONDS: f64 = 3.0;

// ============================================================================
// ASYNC IO — background image decoding with channel completion
// ============================================================================

/// Result delivered from a background decode thread. Each carries the id of
/// the request that produced it; only the latest issued request may touch
/// session state, so a slow decode can never overwrite a newer upload.
pub enum IoResult {
    /// An image file was decoded, ready to replace the session image.
    ImageLoaded {
        image: RgbaImage,
        path: PathBuf,
        request: u64,
    },
    /// Image decoding failed; prior session state stays untouched.
    LoadFailed { message: String, request: u64 },
}

/// The uploaded reference image. Replaced wholesale on re-upload; the
/// generation ties rendered frames to a specific upload.
pub struct SourceImage {
    pub pixels: RgbaImage,
    pub file_name: String,
    pub generation: u64,
}

/// Inputs of the last composite. A new frame is rendered only when this
/// key changes — the composite is a pure function of it.
#[derive(Clone, Copy, PartialEq)]
struct RenderKey {
    image_generation: u64,
    config: GridConfig,
    pan: PanOffset,
}

// ============================================================================
// Transient notifications
// ============================================================================

enum ToastKind {
    Success,
    Error,
}

struct Toast {
    text: String,
    kind: ToastKind,
    expires_at: f64,
}

// ============================================================================
// Application
// ============================================================================

pub struct ArtGridApp {
    // Session state: the composite is a pure function of these three.
    image: Option<SourceImage>,
    config: GridConfig,
    pan: PanOffset,

    // Last composite + change detection.
    last_render: Option<RenderOutput>,
    last_key: Option<RenderKey>,
    render_serial: u64,

    // UI components
    controls: ControlsPanel,
    canvas_view: CanvasView,
    manual: ManualWindow,
    file_handler: FileHandler,

    // Background decode channel
    io_sender: mpsc::Sender<IoResult>,
    io_receiver: mpsc::Receiver<IoResult>,
    pending_loads: usize,
    next_generation: u64,
    next_request: u64,
    /// Id of the most recently issued decode request; results from any
    /// earlier request are stale and get discarded on arrival.
    latest_request: u64,

    toast: Option<Toast>,
}

impl ArtGridApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self::initial()
    }

    fn initial() -> Self {
        let (io_sender, io_receiver) = mpsc::channel();
        ArtGridApp {
            image: None,
            config: GridConfig::default(),
            pan: PanOffset::default(),
            last_render: None,
            last_key: None,
            render_serial: 0,
            controls: ControlsPanel::default(),
            canvas_view: CanvasView::new(),
            manual: ManualWindow::new(),
            file_handler: FileHandler::default(),
            io_sender,
            io_receiver,
            pending_loads: 0,
            next_generation: 1,
            next_request: 1,
            latest_request: 0,
            toast: None,
        }
    }

    /// Register a new decode request and return its id. The new id becomes
    /// the latest, so results of every earlier request turn stale.
    fn issue_request(&mut self) -> u64 {
        let request = self.next_request;
        self.next_request += 1;
        self.latest_request = request;
        self.pending_loads += 1;
        request
    }

    /// Decode `path` on a background thread; the result arrives through the
    /// IO channel. The previous image (or the idle placeholder) stays on
    /// screen until then.
    fn begin_load(&mut self, path: PathBuf, ctx: &egui::Context) {
        let request = self.issue_request();
        let sender = self.io_sender.clone();
        let repaint_ctx = ctx.clone();
        rayon::spawn(move || {
            let result = match io::load_image(&path) {
                Ok(image) => IoResult::ImageLoaded {
                    image,
                    path,
                    request,
                },
                Err(message) => IoResult::LoadFailed { message, request },
            };
            let _ = sender.send(result);
            repaint_ctx.request_repaint();
        });
    }

    fn poll_io(&mut self, ctx: &egui::Context) {
        while let Ok(result) = self.io_receiver.try_recv() {
            self.pending_loads = self.pending_loads.saturating_sub(1);
            let request = match &result {
                IoResult::ImageLoaded { request, .. } => *request,
                IoResult::LoadFailed { request, .. } => *request,
            };
            if request != self.latest_request {
                // A newer request was issued while this decode ran; drop the
                // result so arrival order can't resurrect an older upload.
                log_info!("Discarded stale decode result (request {})", request);
                continue;
            }
            match result {
                IoResult::ImageLoaded { image, path, .. } => {
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    log_info!(
                        "Loaded \"{}\" ({}×{})",
                        file_name,
                        image.width(),
                        image.height()
                    );
                    let generation = self.next_generation;
                    self.next_generation += 1;
                    self.image = Some(SourceImage {
                        pixels: image,
                        file_name,
                        generation,
                    });
                    // New image, fresh framing.
                    self.pan = PanOffset::default();
                    self.show_toast(ctx, "Image loaded", ToastKind::Success);
                }
                IoResult::LoadFailed { message, .. } => {
                    log_err!("Image load failed: {}", message);
                    self.show_toast(
                        ctx,
                        "Failed to load image — please try another file",
                        ToastKind::Error,
                    );
                }
            }
        }
        if self.pending_loads > 0 {
            ctx.request_repaint();
        }
    }

    /// Files dropped onto the window go through the same extension gate as
    /// the dialog; anything unsupported is ignored without an upload attempt.
    /// The session holds a single image, so of a multi-file drop only the
    /// last supported file is loaded.
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        let mut chosen: Option<PathBuf> = None;
        for path in dropped {
            if io::is_supported_path(&path) {
                if let Some(earlier) = chosen.replace(path) {
                    log_warn!("Skipped dropped file: {}", earlier.display());
                }
            } else {
                log_warn!("Ignored dropped file: {}", path.display());
            }
        }
        if let Some(path) = chosen {
            self.begin_load(path, ctx);
        }
    }

    /// Export the last composite as a PNG. With no image loaded this is a
    /// no-op — the defined idle behavior, not an error.
    fn export(&mut self, ctx: &egui::Context) {
        if self.image.is_none() {
            return;
        }
        let cells = self.config.cell_count;
        let Some(path) = self.file_handler.pick_export_target(cells) else {
            return;
        };
        let pixels = self.last_render.as_ref().map(|r| &r.pixels);
        match io::export_render(pixels, &path) {
            Ok(true) => {
                log_info!("Exported {}", path.display());
                self.show_toast(ctx, "Grid image exported", ToastKind::Success);
            }
            Ok(false) => {}
            Err(e) => {
                log_err!("Export failed: {}", e);
                self.show_toast(ctx, "Export failed — see session log", ToastKind::Error);
            }
        }
    }

    /// Re-run the compositor only when its inputs changed.
    fn recomposite_if_needed(&mut self) {
        let key = RenderKey {
            image_generation: self.image.as_ref().map_or(0, |i| i.generation),
            config: self.config,
            pan: self.pan,
        };
        if self.last_key == Some(key) && self.last_render.is_some() {
            return;
        }
        let pixels = self.image.as_ref().map(|i| &i.pixels);
        self.last_render = Some(compositor::render(pixels, &self.config, self.pan));
        self.last_key = Some(key);
        self.render_serial += 1;
    }

    fn show_toast(&mut self, ctx: &egui::Context, text: &str, kind: ToastKind) {
        self.toast = Some(Toast {
            text: text.to_string(),
            kind,
            expires_at: ctx.input(|i| i.time) + TOAST_SECONDS,
        });
    }

    fn paint_toast(&mut self, ctx: &egui::Context) {
        if let Some(toast) = &self.toast
            && ctx.input(|i| i.time) >= toast.expires_at
        {
            self.toast = None;
        }
        let Some(toast) = &self.toast else { return };

        egui::Area::new(egui::Id::new("toast"))
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-16.0, 16.0))
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                egui::Frame::popup(&ctx.style()).show(ui, |ui| {
                    let color = match toast.kind {
                        ToastKind::Success => egui::Color32::from_rgb(0x10, 0xb9, 0x81),
                        ToastKind::Error => egui::Color32::from_rgb(0xef, 0x44, 0x44),
                    };
                    ui.colored_label(color, toast.text.as_str());
                });
            });
        // Keep repainting so the toast expires even without input events.
        ctx.request_repaint_after(std::time::Duration::from_millis(250));
    }
}

impl eframe::App for ArtGridApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Dynamic window title: "ArtGrid — <file>" ---
        {
            let title = match &self.image {
                Some(image) => format!("ArtGrid — {}", image.file_name),
                None => "ArtGrid".to_string(),
            };
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title));
        }

        self.poll_io(ctx);
        self.handle_dropped_files(ctx);

        // --- Left panel: upload, grid controls, export ---
        egui::SidePanel::left("controls_panel")
            .resizable(false)
            .exact_width(272.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.add_space(8.0);
                    ui.heading("ArtGrid");
                    ui.small("Grid-method drawing reference");
                    ui.separator();

                    ui.strong("Reference Image");
                    match &self.image {
                        Some(image) => ui.small(image.file_name.as_str()),
                        None => ui.small("No image loaded — or drop a file here"),
                    };
                    let button_label = if self.image.is_some() {
                        "Change Image…"
                    } else {
                        "Select Image…"
                    };
                    // One upload at a time: the button stays disabled until
                    // the pending decode has resolved.
                    if ui
                        .add_enabled(self.pending_loads == 0, egui::Button::new(button_label))
                        .clicked()
                        && let Some(path) = self.file_handler.pick_image()
                    {
                        self.begin_load(path, ctx);
                    }
                    if self.pending_loads > 0 {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.small("Loading…");
                        });
                    }
                    ui.separator();

                    let controls = self.controls.show(ui, &mut self.config);
                    if controls.aspect_changed {
                        // New crop geometry invalidates the old pan.
                        self.pan = PanOffset::default();
                    }
                    ui.separator();

                    ui.strong("Export");
                    ui.small("Save the canvas with grid overlay as PNG");
                    if ui
                        .add_enabled(self.image.is_some(), egui::Button::new("Export PNG…"))
                        .clicked()
                    {
                        self.export(ctx);
                    }
                    ui.separator();

                    if ui.button("Grid Method Guide").clicked() {
                        self.manual.open = !self.manual.open;
                    }
                    ui.add_space(8.0);
                });
            });

        // --- Canvas ---
        self.recomposite_if_needed();
        let render_serial = self.render_serial;
        let has_image = self.image.is_some();
        let cell_count = self.config.cell_count;

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::both().show(ui, |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(12.0);
                    if let Some(render) = &self.last_render {
                        let canvas = self.canvas_view.show(
                            ui,
                            render,
                            render_serial,
                            has_image,
                            cell_count,
                            &mut self.pan,
                        );
                        if canvas.reset_requested {
                            self.pan = PanOffset::default();
                        }
                    }
                    ui.add_space(12.0);
                });
            });
        });

        self.manual.show(ctx);
        self.paint_toast(ctx);
    }
}
