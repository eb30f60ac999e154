//! SobelForge: parallel grayscale conversion and Sobel edge detection
//!
//! The input image is averaged down to one luminance channel, convolved with
//! the two 3×3 Sobel masks and thresholded into a binary edge map. Both passes
//! split the image into row bands and run them on a fixed-size worker pool;
//! the output does not depend on how many workers are used.

pub mod grayscale;
pub mod image_io;
pub mod parallel;
pub mod pipeline;
pub mod sobel;
pub mod types;

use log::{info, warn};
use pipeline::PipelineOutput;
use std::path::{Path, PathBuf};
use types::{EdgeConfig, PixelGrid, Result, RunConfig};

/// Where a run wrote its images, with the timing of the numeric phase
#[derive(Debug)]
pub struct RunReport {
    pub edges_path: PathBuf,
    pub grayscale_path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub output: PipelineOutput,
}

/// Main entry point: load an image, detect edges, save both result images
///
/// # Arguments
/// * `config` - Input path, output stem and worker count; `config.workers`
///   overrides `edge.workers`
/// * `edge` - Threshold and border/remainder policies
///
/// # Returns
/// Paths of `<stem>.ppm` (edge map) and `<stem>_grayscale.ppm`, both echoing
/// the input's maxval, plus the grids and timing of the run. If either write
/// fails, neither output file is left on disk.
pub fn process_image(config: &RunConfig, edge: &EdgeConfig) -> Result<RunReport> {
    let edge = EdgeConfig {
        workers: config.workers,
        ..edge.clone()
    };
    edge.validate()?;

    info!("Loading {}", config.input.display());
    let (grid, header) = image_io::load_image(&config.input)?;

    let output = pipeline::run(grid, &edge)?;

    let (edges_path, grayscale_path) = image_io::output_paths(&config.output_stem);
    save_all_or_none(
        &[
            (edges_path.as_path(), output.edges.to_pixel_grid()),
            (grayscale_path.as_path(), output.grayscale.to_pixel_grid()),
        ],
        header.max_val,
    )?;
    info!(
        "Wrote {} and {}",
        edges_path.display(),
        grayscale_path.display()
    );

    Ok(RunReport {
        edges_path,
        grayscale_path,
        width: header.width,
        height: header.height,
        output,
    })
}

/// Save every grid in order; on the first failure remove all files of this batch
fn save_all_or_none(outputs: &[(&Path, PixelGrid)], max_val: u16) -> Result<()> {
    for (idx, (path, grid)) in outputs.iter().enumerate() {
        if let Err(e) = image_io::save_ppm(path, grid, max_val) {
            warn!("Failed to write {}: {}", path.display(), e);
            // remove_file never touches directories
            for (written, _) in &outputs[..=idx] {
                std::fs::remove_file(written).ok();
            }
            return Err(e);
        }
    }
    Ok(())
}
