use image::RgbaImage;
use image::codecs::png::PngEncoder;
use rfd::FileDialog;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Extensions the decode path accepts (lowercase). Anything else is turned
/// away before a decode is attempted — the desktop equivalent of the
/// original's `image/*` MIME gate.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// Check if a file extension is a supported raster format.
pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str())
}

/// Check a whole path against the extension gate.
pub fn is_supported_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(is_supported_extension)
}

/// Decode a reference image to RGBA. Safe to call from a background thread.
pub fn load_image(path: &Path) -> Result<RgbaImage, String> {
    if !is_supported_path(path) {
        return Err(format!(
            "unsupported file type: {}",
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string())
        ));
    }
    let img = image::open(path).map_err(|e| e.to_string())?;
    Ok(img.to_rgba8())
}

/// The export artifact's filename: `grid-drawing-{N}x{N}.png`.
pub fn export_file_name(cell_count: u32) -> String {
    format!("grid-drawing-{0}x{0}.png", cell_count)
}

/// Encode an RGBA raster as a PNG file.
/// Standalone function (no `&mut self`) so it can run off the UI thread.
pub fn encode_png(image: &RgbaImage, path: &Path) -> Result<(), String> {
    let file = File::create(path).map_err(|e| e.to_string())?;
    let mut writer = BufWriter::new(file);
    let encoder = PngEncoder::new(&mut writer);
    #[allow(deprecated)]
    encoder
        .encode(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ColorType::Rgba8,
        )
        .map_err(|e| e.to_string())
}

/// Export the current render to `path`. With no render available (no image
/// loaded yet) this is a defined no-op, never an error.
/// Returns whether a file was written.
pub fn export_render(render: Option<&RgbaImage>, path: &Path) -> Result<bool, String> {
    match render {
        Some(pixels) => {
            encode_png(pixels, path)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

// ============================================================================
// Native file dialogs
// ============================================================================

/// Wraps the open/export dialogs and remembers the last used directory so
/// consecutive dialogs reopen where the user left off.
#[derive(Default)]
pub struct FileHandler {
    pub last_dir: Option<PathBuf>,
}

impl FileHandler {
    /// Ask the user for a reference image. The filter list mirrors
    /// [`SUPPORTED_EXTENSIONS`], so undecodable types can't be picked here;
    /// the extension gate in [`load_image`] still covers dropped files.
    pub fn pick_image(&mut self) -> Option<PathBuf> {
        let mut dialog = FileDialog::new()
            .add_filter("Images", SUPPORTED_EXTENSIONS)
            .add_filter("All Files", &["*"]);
        if let Some(dir) = &self.last_dir {
            dialog = dialog.set_directory(dir);
        }
        let path = dialog.pick_file()?;
        self.last_dir = path.parent().map(Path::to_path_buf);
        Some(path)
    }

    /// Ask where to save the exported PNG, pre-filled with the export name.
    pub fn pick_export_target(&mut self, cell_count: u32) -> Option<PathBuf> {
        let mut dialog = FileDialog::new()
            .add_filter("PNG Image", &["png"])
            .set_file_name(&export_file_name(cell_count));
        if let Some(dir) = &self.last_dir {
            dialog = dialog.set_directory(dir);
        }
        let path = dialog.save_file()?;
        self.last_dir = path.parent().map(Path::to_path_buf);
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_gate() {
        assert!(is_supported_extension("png"));
        assert!(is_supported_extension("JPG"));
        assert!(!is_supported_extension("pdf"));
        assert!(is_supported_path(Path::new("a/b/photo.JPEG")));
        assert!(!is_supported_path(Path::new("a/b/document.txt")));
        assert!(!is_supported_path(Path::new("no_extension")));
    }

    #[test]
    fn export_name_embeds_cell_count() {
        assert_eq!(export_file_name(8), "grid-drawing-8x8.png");
        assert_eq!(export_file_name(20), "grid-drawing-20x20.png");
    }

    #[test]
    fn load_rejects_unsupported_type_without_reading() {
        // The path doesn't exist; the gate must reject on extension alone.
        let err = load_image(Path::new("/nonexistent/slide.pptx")).unwrap_err();
        assert!(err.contains("unsupported file type"));
    }

    #[test]
    fn export_without_render_is_a_no_op() {
        let target = std::env::temp_dir().join("artgrid-test-noop-export.png");
        let _ = std::fs::remove_file(&target);
        let written = export_render(None, &target).unwrap();
        assert!(!written);
        assert!(!target.exists());
    }

    #[test]
    fn export_writes_decodable_png() {
        let pixels = RgbaImage::from_pixel(4, 3, image::Rgba([9, 8, 7, 255]));
        let target = std::env::temp_dir().join("artgrid-test-export.png");
        let written = export_render(Some(&pixels), &target).unwrap();
        assert!(written);
        let back = image::open(&target).unwrap().to_rgba8();
        assert_eq!(back.dimensions(), (4, 3));
        assert_eq!(back.get_pixel(0, 0).0, [9, 8, 7, 255]);
        let _ = std::fs::remove_file(&target);
    }
}
