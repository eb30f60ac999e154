//! Grayscale reduction followed by Sobel convolution, timed

use crate::parallel::{build_pool, partition_rows};
use crate::types::{EdgeConfig, Error, LumaGrid, PixelGrid, Result};
use crate::{grayscale, sobel};
use log::info;
use std::time::{Duration, Instant};

/// Both grids produced by one run, owned by the caller
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub grayscale: LumaGrid,
    pub edges: LumaGrid,
    /// Wall time of the reduce + convolve phase only
    pub elapsed: Duration,
    pub workers: usize,
}

impl PipelineOutput {
    /// Timing line in the `Using P = N, Time taken = S sec` form
    pub fn summary(&self) -> String {
        format!(
            "Using P = {}, Time taken = {:.6} sec",
            self.workers,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Run the full numeric pipeline on `src`
///
/// Builds a pool of `config.workers` threads, partitions the rows, reduces to
/// grayscale and convolves each band. Only the reduce + convolve phase is timed.
///
/// # Arguments
/// * `src` - Color image; consumed, since only the grayscale grid is kept
/// * `config` - Worker count, threshold and border/remainder policies
///
/// # Returns
/// The grayscale and edge-map grids, owned by the caller, with the elapsed time.
/// Fails with `Error::Config` for zero workers and `Error::Format` for an empty grid.
pub fn run(src: PixelGrid, config: &EdgeConfig) -> Result<PipelineOutput> {
    config.validate()?;
    if src.rows() == 0 || src.cols() == 0 {
        return Err(Error::Format(format!(
            "cannot process an empty {}x{} image",
            src.cols(),
            src.rows()
        )));
    }

    let pool = build_pool(config.workers)?;
    let bands = partition_rows(src.rows(), src.cols(), config.workers, config.remainder)?;

    info!(
        "Processing {}x{} image with {} workers (border: {:?}, remainder: {:?}, threshold: {})",
        src.cols(),
        src.rows(),
        config.workers,
        config.border,
        config.remainder,
        config.threshold
    );

    let start = Instant::now();
    let gray = grayscale::to_luma(&src, &pool)?;
    let edges = sobel::convolve(&gray, &bands, config, &pool)?;
    let elapsed = start.elapsed();

    info!(
        "Reduce + convolve took {:.3} ms, {} edge pixels",
        elapsed.as_secs_f64() * 1000.0,
        edges.count_nonzero()
    );

    Ok(PipelineOutput {
        grayscale: gray,
        edges,
        elapsed,
        workers: config.workers,
    })
}
