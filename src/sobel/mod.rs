//! Single-pass Sobel edge detection with binary thresholding
//!
//! For every interior pixel the two 3×3 masks are correlated with the
//! luminance neighbourhood:
//!
//! ```text
//! GX:           GY:
//! [ 1  0 -1]    [ 1  2  1]
//! [ 2  0 -2]    [ 0  0  0]
//! [ 1  0 -1]    [-1 -2 -1]
//! ```
//!
//! Masks are indexed `[1 + dr][1 + dc]` (row offset, column offset). The
//! magnitude `floor(sqrt(gx² + gy²))` is compared against the threshold and
//! the output pixel becomes 255 or 0. Border pixels are always 0.
//!
//! Accumulation is signed (`i32`) and squaring is done in `i64`; only the
//! final binary value is narrowed to `u8`.

use crate::parallel::process_bands_parallel;
use crate::types::{BorderPolicy, EdgeConfig, LumaGrid, Result, WorkBand};
use log::{debug, warn};
use ndarray::{ArrayView2, ArrayViewMut2};
use rayon::ThreadPool;

type Kernel3 = [[i32; 3]; 3];

/// Horizontal-gradient mask
pub const GX: Kernel3 = [[1, 0, -1], [2, 0, -2], [1, 0, -1]];
/// Vertical-gradient mask
pub const GY: Kernel3 = [[1, 2, 1], [0, 0, 0], [-1, -2, -1]];

/// Largest magnitude reachable from 8-bit input: `floor(sqrt(2 * 1020²))`
pub const MAX_MAGNITUDE: u32 = 1442;

/// Whether (`i`, `j`) lies on the outer ring of a `rows x cols` image
#[inline]
pub fn is_border(i: usize, j: usize, rows: usize, cols: usize) -> bool {
    i == 0 || j == 0 || i + 1 >= rows || j + 1 >= cols
}

/// Band-relative border test: the band's own first and last rows count as border
#[inline]
pub fn is_band_border(i: usize, j: usize, band: WorkBand, cols: usize) -> bool {
    i == band.first || i + 1 == band.last || j == 0 || j + 1 >= cols
}

/// Signed `(gx, gy)` at (`i`, `j`), or `None` if the 3×3 window does not fit
pub fn gradient_at(src: &LumaGrid, i: usize, j: usize) -> Option<(i32, i32)> {
    if is_border(i, j, src.rows(), src.cols()) {
        return None;
    }
    Some(gradient_interior(&src.as_array().view(), i, j))
}

/// Caller guarantees `(i, j)` is not a border pixel
#[inline]
fn gradient_interior(src: &ArrayView2<'_, u8>, i: usize, j: usize) -> (i32, i32) {
    let mut gx = 0i32;
    let mut gy = 0i32;
    for (r, (kx_row, ky_row)) in GX.iter().zip(GY.iter()).enumerate() {
        let row = i + r - 1;
        for c in 0..3 {
            let value = src[(row, j + c - 1)] as i32;
            gx += value * kx_row[c];
            gy += value * ky_row[c];
        }
    }
    (gx, gy)
}

/// `floor(sqrt(gx² + gy²))`
pub fn magnitude(gx: i32, gy: i32) -> u32 {
    let squared = (gx as i64) * (gx as i64) + (gy as i64) * (gy as i64);
    let mut root = (squared as f64).sqrt() as i64;
    // f64 rounding can land one off near perfect squares
    while root * root > squared {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= squared {
        root += 1;
    }
    root as u32
}

/// 255 when `magnitude` is strictly above `threshold`, 0 otherwise
#[inline]
pub fn binarize(magnitude: u32, threshold: u32) -> u8 {
    if magnitude > threshold {
        255
    } else {
        0
    }
}

/// Fill the output rows of one band
///
/// `out` holds exactly the rows `[band.first, band.last)` of the edge map;
/// `src` is the whole grayscale grid since the window reaches one row
/// outside the band.
pub fn convolve_band(
    src: &LumaGrid,
    band: WorkBand,
    mut out: ArrayViewMut2<'_, u8>,
    config: &EdgeConfig,
) {
    let (rows, cols) = (src.rows(), src.cols());
    let view = src.as_array().view();

    for (offset, mut out_row) in out.rows_mut().into_iter().enumerate() {
        let i = band.first + offset;
        for j in 0..cols {
            let border = match config.border {
                BorderPolicy::Image => is_border(i, j, rows, cols),
                BorderPolicy::Band => {
                    is_band_border(i, j, band, cols) || is_border(i, j, rows, cols)
                }
            };

            out_row[j] = if border {
                0
            } else {
                let (gx, gy) = gradient_interior(&view, i, j);
                binarize(magnitude(gx, gy), config.threshold)
            };
        }
    }
}

/// Compute the binary edge map of `src`, one pool task per band
///
/// Rows that belong to no band are left black.
pub fn convolve(
    src: &LumaGrid,
    bands: &[WorkBand],
    config: &EdgeConfig,
    pool: &ThreadPool,
) -> Result<LumaGrid> {
    if config.threshold >= MAX_MAGNITUDE {
        warn!(
            "Threshold {} is at or above the maximum magnitude {}; the edge map will be black",
            config.threshold, MAX_MAGNITUDE
        );
    }

    let mut edges = LumaGrid::zeros(src.rows(), src.cols());
    process_bands_parallel(pool, edges.view_mut(), bands, |band, rows| {
        debug!("Convolving rows [{}, {})", band.first, band.last);
        convolve_band(src, band, rows, config);
    })?;

    Ok(edges)
}
