//! Core types and structures for SobelForge

use ndarray::{Array2, ArrayView2, ArrayViewMut2};
use std::path::PathBuf;
use thiserror::Error;

/// One color pixel with 8-bit channels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Pixel with all three channels set to `value`
    pub fn splat(value: u8) -> Self {
        Self {
            r: value,
            g: value,
            b: value,
        }
    }

    pub fn is_gray(&self) -> bool {
        self.r == self.g && self.g == self.b
    }
}

/// Dense row-major grid of color pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelGrid {
    data: Array2<Rgb>,
}

impl PixelGrid {
    /// Create an all-black grid of `rows x cols`
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), Rgb::BLACK),
        }
    }

    /// Wrap an existing pixel array
    pub fn from_array(data: Array2<Rgb>) -> Self {
        Self { data }
    }

    /// Build a grid from interleaved R,G,B bytes in row-major order
    pub fn from_raw_rgb(rows: usize, cols: usize, raw: &[u8]) -> Result<Self> {
        let expected = rows
            .checked_mul(cols)
            .and_then(|n| n.checked_mul(3))
            .ok_or_else(|| Error::Format(format!("image {}x{} is too large", cols, rows)))?;
        if raw.len() != expected {
            return Err(Error::Format(format!(
                "expected {} payload bytes for {}x{} pixels, got {}",
                expected,
                cols,
                rows,
                raw.len()
            )));
        }

        let pixels: Vec<Rgb> = raw
            .chunks_exact(3)
            .map(|c| Rgb::new(c[0], c[1], c[2]))
            .collect();
        let data = Array2::from_shape_vec((rows, cols), pixels)
            .map_err(|e| Error::Processing(format!("Array shape error: {}", e)))?;
        Ok(Self { data })
    }

    /// Flatten back into interleaved R,G,B bytes
    pub fn to_raw_rgb(&self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(self.data.len() * 3);
        for px in self.data.iter() {
            raw.extend_from_slice(&[px.r, px.g, px.b]);
        }
        raw
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Rgb> {
        self.data.get((row, col)).copied()
    }

    /// Replace the pixel at (`row`, `col`)
    ///
    /// Panics if the position is outside the grid, like ndarray indexing.
    pub fn set(&mut self, row: usize, col: usize, px: Rgb) {
        self.data[(row, col)] = px;
    }

    pub fn view(&self) -> ArrayView2<'_, Rgb> {
        self.data.view()
    }

    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, Rgb> {
        self.data.view_mut()
    }
}

/// Single-channel 8-bit grid, used for both the grayscale image and the edge map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LumaGrid {
    data: Array2<u8>,
}

impl LumaGrid {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::zeros((rows, cols)),
        }
    }

    pub fn from_array(data: Array2<u8>) -> Self {
        Self { data }
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        self.data.get((row, col)).copied()
    }

    pub fn as_array(&self) -> &Array2<u8> {
        &self.data
    }

    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, u8> {
        self.data.view_mut()
    }

    /// Expand to three equal channels for serialization
    pub fn to_pixel_grid(&self) -> PixelGrid {
        PixelGrid::from_array(self.data.mapv(Rgb::splat))
    }

    /// Number of pixels with a non-zero value
    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }
}

/// Half-open row range `[first, last)` handled by one worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkBand {
    pub first: usize,
    pub last: usize,
}

impl WorkBand {
    pub fn new(first: usize, last: usize) -> Self {
        Self { first, last }
    }

    pub fn len(&self) -> usize {
        self.last.saturating_sub(self.first)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, row: usize) -> bool {
        row >= self.first && row < self.last
    }
}

/// Which pixels count as border and are forced to black
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderPolicy {
    /// Only the outer ring of the image
    #[default]
    Image,
    /// First and last row of every band, plus the outer columns.
    /// Leaves a one-pixel seam at each interior band boundary.
    Band,
}

/// What happens to the `rows % workers` rows left after even division
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemainderPolicy {
    /// The last band runs to the final row
    #[default]
    ExtendLast,
    /// Trailing rows belong to no band and are never convolved
    Drop,
}

/// Numeric configuration for one edge-detection run
#[derive(Debug, Clone)]
pub struct EdgeConfig {
    /// Size of the worker pool (not auto-detected)
    pub workers: usize,
    /// Gradient magnitudes strictly above this become white
    pub threshold: u32,
    pub border: BorderPolicy,
    pub remainder: RemainderPolicy,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            threshold: DEFAULT_THRESHOLD,
            border: BorderPolicy::Image,
            remainder: RemainderPolicy::ExtendLast,
        }
    }
}

impl EdgeConfig {
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default binarization threshold for the gradient magnitude
pub const DEFAULT_THRESHOLD: u32 = 200;

/// The three user-supplied inputs of a run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Source image
    pub input: PathBuf,
    /// Output path without extension; `.ppm` and `_grayscale.ppm` are appended
    pub output_stem: PathBuf,
    pub workers: usize,
}

/// SobelForge error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid image format: {0}")]
    Format(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Processing error: {0}")]
    Processing(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_rgb() {
        let raw = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
        let grid = PixelGrid::from_raw_rgb(2, 2, &raw).unwrap();
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.cols(), 2);
        assert_eq!(grid.get(0, 1), Some(Rgb::new(4, 5, 6)));
        assert_eq!(grid.get(1, 0), Some(Rgb::new(7, 8, 9)));
        assert_eq!(grid.to_raw_rgb(), raw.to_vec());
    }

    #[test]
    fn test_from_raw_rgb_wrong_length() {
        let result = PixelGrid::from_raw_rgb(2, 2, &[0u8; 11]);
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[test]
    #[should_panic]
    fn test_set_out_of_range_panics() {
        let mut grid = PixelGrid::new(2, 2);
        grid.set(2, 0, Rgb::splat(9));
    }

    #[test]
    fn test_luma_expansion() {
        let mut luma = LumaGrid::zeros(2, 3);
        luma.view_mut()[(1, 2)] = 77;
        let grid = luma.to_pixel_grid();
        assert_eq!(grid.get(1, 2), Some(Rgb::splat(77)));
        assert_eq!(grid.get(0, 0), Some(Rgb::BLACK));
        assert_eq!(luma.count_nonzero(), 1);
    }

    #[test]
    fn test_work_band() {
        let band = WorkBand::new(3, 6);
        assert_eq!(band.len(), 3);
        assert!(band.contains(3));
        assert!(!band.contains(6));
        assert!(WorkBand::new(4, 4).is_empty());
    }

    #[test]
    fn test_edge_config_validate() {
        assert!(EdgeConfig::default().validate().is_ok());
        assert!(matches!(
            EdgeConfig::with_workers(0).validate(),
            Err(Error::Config(_))
        ));
    }
}
