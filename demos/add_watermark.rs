//! Add a text watermark to a single image.
//!
//! Usage:
//! ```sh
//! cargo run --example add_watermark -- input.jpg output.jpg "(c) 2026"
//! ```

use std::env;
use std::process;

use photo_watermark::{ProcessOptions, ShadowConfig, TextWatermarkConfig, WatermarkEngine};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <input> <output> <text>", args[0]);
        process::exit(1);
    }

    let engine = WatermarkEngine::new();
    let opts = ProcessOptions {
        text: TextWatermarkConfig {
            shadow: Some(ShadowConfig::default()),
            ..TextWatermarkConfig::with_text(args[3].as_str())
        },
        ..ProcessOptions::default()
    };
    let result = engine.process_file(args[1].as_ref(), args[2].as_ref(), &opts);

    if result.success {
        println!("Done: {}", result.output.display());
    } else {
        eprintln!("Error: {}", result.message);
        process::exit(1);
    }
}
