//! SobelForge CLI

use anyhow::{bail, Context, Result};
use clap::Parser;
use sobel_forge::{
    process_image,
    types::{BorderPolicy, EdgeConfig, RemainderPolicy, RunConfig, DEFAULT_THRESHOLD},
};
use std::io::{self, Write};
use std::path::PathBuf;

/// SobelForge: convert a PPM image to grayscale and extract a binary Sobel edge map
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input image (binary PPM; PNG/TIFF/JPEG are decoded as well). Prompted if omitted.
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output name without extension; writes STEM.ppm and STEM_grayscale.ppm. Prompted if omitted.
    #[arg(value_name = "OUTPUT_STEM")]
    output_stem: Option<PathBuf>,

    /// Number of parallel workers. Prompted if omitted.
    #[arg(short = 'p', long, value_name = "N")]
    workers: Option<usize>,

    /// Gradient magnitudes above this value become edge pixels
    #[arg(short = 't', long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: u32,

    /// Blank the first and last row of every band instead of only the image border
    #[arg(long)]
    band_borders: bool,

    /// Leave rows beyond an even split unprocessed instead of giving them to the last band
    #[arg(long)]
    drop_remainder: bool,

    /// Only print the timing line
    #[arg(short, long)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let input = match cli.input {
        Some(path) => path,
        None => PathBuf::from(prompt("Enter the name of the input PPM image (with extension)")?),
    };
    let output_stem = match cli.output_stem {
        Some(path) => path,
        None => PathBuf::from(prompt(
            "Enter the name to be given to the output file (without extension)",
        )?),
    };
    let workers = match cli.workers {
        Some(n) => n,
        None => {
            let answer = prompt("Number of processors")?;
            answer
                .parse::<usize>()
                .with_context(|| format!("'{}' is not a valid number of workers", answer))?
        }
    };

    if workers == 0 {
        bail!("Number of workers must be at least 1");
    }
    if !input.exists() {
        bail!("Input file does not exist: {}", input.display());
    }

    let run_config = RunConfig {
        input,
        output_stem,
        workers,
    };
    let edge_config = EdgeConfig {
        workers,
        threshold: cli.threshold,
        border: if cli.band_borders {
            BorderPolicy::Band
        } else {
            BorderPolicy::Image
        },
        remainder: if cli.drop_remainder {
            RemainderPolicy::Drop
        } else {
            RemainderPolicy::ExtendLast
        },
    };

    if !cli.quiet {
        println!("SobelForge v{}", env!("CARGO_PKG_VERSION"));
        println!("Input:  {}", run_config.input.display());
    }

    let report = process_image(&run_config, &edge_config).with_context(|| {
        format!("Failed to process {}", run_config.input.display())
    })?;

    println!("{}", report.output.summary());

    if !cli.quiet {
        println!("Image:  {}x{}", report.width, report.height);
        println!("Edges:  {}", report.edges_path.display());
        println!("Gray:   {}", report.grayscale_path.display());
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Ask on stdout, read one trimmed line from stdin
fn prompt(question: &str) -> Result<String> {
    println!("{}", question);
    io::stdout().flush()?;

    let mut line = String::new();
    let read = io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    let answer = line.trim();
    if read == 0 || answer.is_empty() {
        bail!("No answer given for: {}", question);
    }
    Ok(answer.to_string())
}
