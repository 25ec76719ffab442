// ============================================================================
// ArtGrid CLI — headless gridding via command-line arguments
// ============================================================================
//
// Usage examples:
//   artgrid --input photo.png --output gridded.png
//   artgrid -i photo.jpg --cells 10 --color black --grayscale
//   artgrid -i *.jpg --output-dir gridded/ --aspect 1:1 --line-width 3
//
// No window is opened in CLI mode. Each input runs through the same
// compositor the GUI uses, at the default (zero) pan offset.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;

use crate::compositor::{self, AspectRatio, GridColor, GridConfig, PanOffset};
use crate::io::{encode_png, export_file_name, load_image};

/// ArtGrid headless grid compositor.
///
/// Overlay a drawing grid on reference images without opening the GUI.
#[derive(Parser, Debug)]
#[command(
    name = "artgrid",
    about = "ArtGrid headless grid compositor",
    long_about = "Composite a drawing grid over reference images and write the\n\
                  result as PNG, without opening the GUI. Accepts PNG, JPEG,\n\
                  GIF, WEBP and BMP input.\n\n\
                  Example:\n  \
                  artgrid --input photo.png --cells 10 --color black --output out.png\n  \
                  artgrid -i *.jpg --aspect 1:1 --output-dir gridded/"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Grid size: number of cells per side (2-20, clamped).
    #[arg(short, long, default_value_t = 8, value_name = "2-20")]
    pub cells: u32,

    /// Grid line width in pixels (1-5, clamped).
    #[arg(short = 'w', long, default_value_t = 2, value_name = "1-5")]
    pub line_width: u32,

    /// Grid line color: white, black, red, blue, green, yellow, purple, pink.
    #[arg(long, default_value = "white", value_name = "NAME")]
    pub color: String,

    /// Convert the image to grayscale (grid lines keep their color).
    #[arg(short, long)]
    pub grayscale: bool,

    /// Aspect ratio: "original" or "W:H" (e.g. 1:1, 4:3, 16:9).
    #[arg(short, long, default_value = "original", value_name = "RATIO")]
    pub aspect: String,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when any CLI-mode flag is present in the real process
    /// arguments. Used by `main()` to route before creating a window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--input" || a == "-i")
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> i32 {
    let config = match build_config(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            return 1;
        }
    };

    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return 1;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return 1;
    }

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!(
            "error: could not create output directory '{}': {}",
            dir.display(),
            e
        );
        return 1;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let output_path = build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            config.cell_count,
            multi,
        );

        match run_one(input_path, &output_path, &config) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { 1 } else { 0 }
}

// ============================================================================
// Per-file pipeline
// ============================================================================

fn run_one(input: &Path, output: &Path, config: &GridConfig) -> Result<(), String> {
    let image = load_image(input).map_err(|e| format!("load failed: {}", e))?;
    let out = compositor::render(Some(&image), config, PanOffset::default());
    encode_png(&out.pixels, output).map_err(|e| format!("save failed: {}", e))
}

// ============================================================================
// Helpers
// ============================================================================

/// Translate the raw CLI values into a clamped [`GridConfig`].
fn build_config(args: &CliArgs) -> Result<GridConfig, String> {
    let line_color = GridColor::parse(&args.color).ok_or_else(|| {
        format!(
            "unknown grid color '{}' (expected one of: {})",
            args.color,
            GridColor::all()
                .iter()
                .map(|c| c.label().to_lowercase())
                .collect::<Vec<_>>()
                .join(", ")
        )
    })?;
    let aspect = AspectRatio::parse(&args.aspect)
        .ok_or_else(|| format!("invalid aspect ratio '{}' (expected \"original\" or \"W:H\")", args.aspect))?;

    Ok(GridConfig {
        cell_count: args.cells,
        line_color,
        line_width: args.line_width,
        grayscale: args.grayscale,
        aspect,
    }
    .clamped())
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            // Literal path — use directly
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, single-file input)
/// 2. `--output-dir` + derived name
/// 3. Fallback: next to the input file
///
/// The derived name is the export contract's `grid-drawing-{N}x{N}.png`; in
/// batch mode the input stem is prefixed so outputs don't collide.
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    cell_count: u32,
    multi: bool,
) -> PathBuf {
    if let Some(out) = output {
        return out.to_path_buf();
    }

    let name = if multi {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        format!("{}-grid-{1}x{1}.png", stem, cell_count)
    } else {
        export_file_name(cell_count)
    };

    match output_dir {
        Some(dir) => dir.join(name),
        None => input.parent().unwrap_or(Path::new(".")).join(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["artgrid", "--input", "photo.png"];
        argv.extend_from_slice(extra);
        CliArgs::parse_from(argv)
    }

    #[test]
    fn config_from_defaults() {
        let config = build_config(&args(&[])).unwrap();
        assert_eq!(config, GridConfig::default());
    }

    #[test]
    fn config_parses_and_clamps() {
        let config = build_config(&args(&[
            "--cells",
            "99",
            "--line-width",
            "0",
            "--color",
            "Purple",
            "--grayscale",
            "--aspect",
            "16:9",
        ]))
        .unwrap();
        assert_eq!(config.cell_count, compositor::MAX_CELLS);
        assert_eq!(config.line_width, compositor::MIN_LINE_WIDTH);
        assert_eq!(config.line_color, GridColor::Purple);
        assert!(config.grayscale);
        assert_eq!(config.aspect, AspectRatio::Fixed(16, 9));
    }

    #[test]
    fn config_rejects_unknown_color_and_ratio() {
        assert!(build_config(&args(&["--color", "chartreuse"])).is_err());
        assert!(build_config(&args(&["--aspect", "16x9"])).is_err());
    }

    #[test]
    fn output_path_priorities() {
        let input = Path::new("shots/photo.jpg");

        let explicit = build_output_path(input, Some(Path::new("out.png")), None, 8, false);
        assert_eq!(explicit, PathBuf::from("out.png"));

        let in_dir = build_output_path(input, None, Some(Path::new("gridded")), 8, false);
        assert_eq!(in_dir, PathBuf::from("gridded/grid-drawing-8x8.png"));

        let next_to_input = build_output_path(input, None, None, 12, false);
        assert_eq!(next_to_input, PathBuf::from("shots/grid-drawing-12x12.png"));
    }

    #[test]
    fn batch_output_names_keep_the_stem() {
        let a = build_output_path(Path::new("a.png"), None, Some(Path::new("out")), 8, true);
        let b = build_output_path(Path::new("b.png"), None, Some(Path::new("out")), 8, true);
        assert_eq!(a, PathBuf::from("out/a-grid-8x8.png"));
        assert_eq!(b, PathBuf::from("out/b-grid-8x8.png"));
        assert_ne!(a, b);
    }
}
