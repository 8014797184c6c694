use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;

use photo_watermark::{
    default_output_path, load_watermark, system_font_candidates, FontSize, ImageWatermark,
    ImageWatermarkConfig, Placement, Position, ProcessOptions, ProcessResult, ScaleBasis,
    ShadowConfig, TextWatermarkConfig, WatermarkEngine, WatermarkFont, DEFAULT_JPEG_QUALITY,
};

#[derive(Parser)]
#[command(
    name = "photo-watermark",
    about = "Overlay text and image watermarks onto photographs",
    version,
    after_help = "Simple usage: photo-watermark photo.jpg --text \"(c) 2026\"  (writes photo_watermarked.jpg)\n\
                  Batch usage:  photo-watermark <input_dir> -o <output_dir> --text ... [--image logo.png]\n\n\
                  Positions: bottom-right, bottom-left, top-left, top-right, center\n\
                  Placements (image relative to text): above, below, left, right"
)]
struct Cli {
    /// Input image file or directory
    input: PathBuf,

    /// Output file or directory (default: {name}_watermarked.{ext})
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Watermark text (empty for image-only watermarks)
    #[arg(short, long, default_value = "")]
    text: String,

    /// TrueType/OpenType font file (default: first system font found, else bundled)
    #[arg(long)]
    font: Option<PathBuf>,

    /// Font size in pixels ("40") or percent of the short side ("5%")
    #[arg(short, long, default_value = "40")]
    size: FontSize,

    /// Text opacity in percent
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u8).range(0..=100))]
    opacity: u8,

    /// Text corner
    #[arg(short, long, default_value = "bottom-right")]
    position: Position,

    /// Horizontal offset from the corner in pixels
    #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
    offset_x: i32,

    /// Vertical offset from the corner in pixels
    #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
    offset_y: i32,

    /// Text rotation in degrees, counter-clockwise
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    rotation: f32,

    /// Drop shadow blur radius in pixels (0 disables the shadow)
    #[arg(long, default_value_t = 0.0)]
    shadow_radius: f32,

    /// Drop shadow intensity in percent
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u8).range(0..=100))]
    shadow_intensity: u8,

    /// Image watermark file (PNG with alpha recommended)
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Image watermark scale in percent
    #[arg(long, default_value_t = 20.0)]
    image_scale: f32,

    /// What the image scale is relative to: "target" (base short side) or "own"
    #[arg(long, default_value = "target")]
    image_basis: ScaleBasis,

    /// Image watermark opacity in percent
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u8).range(0..=100))]
    image_opacity: u8,

    /// Image watermark side relative to the text
    #[arg(long, default_value = "above")]
    placement: Placement,

    /// Image watermark rotation in degrees, counter-clockwise
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    image_rotation: f32,

    /// Gap between text and image watermark in pixels
    #[arg(long, default_value_t = 10)]
    spacing: i32,

    /// JPEG output quality (1-100)
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_millis()
        .init();

    if cli.text.trim().is_empty() && cli.image.is_none() {
        eprintln!("Error: Nothing to do, pass --text and/or --image");
        process::exit(1);
    }

    let font = match &cli.font {
        Some(path) => match WatermarkFont::from_path(path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        },
        None => WatermarkFont::resolve(&system_font_candidates()),
    };
    log::info!("font: {}", font.name());

    let image = match &cli.image {
        Some(path) => match load_watermark(path) {
            Ok(img) => Some(ImageWatermark::new(
                img,
                ImageWatermarkConfig {
                    scale: cli.image_scale,
                    basis: cli.image_basis,
                    opacity: cli.image_opacity,
                    placement: cli.placement,
                    spacing: cli.spacing,
                    rotation: cli.image_rotation,
                },
            )),
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        },
        None => None,
    };

    let opts = ProcessOptions {
        text: TextWatermarkConfig {
            text: cli.text.clone(),
            font_size: cli.size,
            opacity: cli.opacity,
            position: cli.position,
            offset_x: cli.offset_x,
            offset_y: cli.offset_y,
            shadow: (cli.shadow_radius > 0.0).then_some(ShadowConfig {
                radius: cli.shadow_radius,
                intensity: cli.shadow_intensity,
            }),
            rotation: cli.rotation,
        },
        image,
        jpeg_quality: cli.quality,
    };

    if let Err(e) = opts.validate() {
        eprintln!("Error: {e}");
        process::exit(1);
    }

    let engine = WatermarkEngine::with_font(font);

    let input_path = cli.input.as_path();
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", input_path.display());
        process::exit(1);
    }

    let results = if input_path.is_dir() {
        let Some(output_dir) = &cli.output else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: photo-watermark <input_dir> -o <output_dir> --text ...");
            process::exit(1);
        };
        engine.process_directory(input_path, output_dir, &opts)
    } else {
        let output_path = match &cli.output {
            Some(o) => o.clone(),
            None => default_output_path(input_path),
        };
        vec![engine.process_file(input_path, &output_path, &opts)]
    };

    let mut success_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, cli.quiet);
        if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !cli.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    )
}

fn print_result(result: &ProcessResult, quiet: bool) {
    let filename = display_name(&result.path);
    if result.success {
        if !quiet {
            eprintln!("[OK] {filename} -> {}", result.output.display());
        }
    } else {
        eprintln!("[FAIL] {filename}: {}", result.message);
    }
}
