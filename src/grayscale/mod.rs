//! Channel-average grayscale reduction
//!
//! The luminance of a pixel is the truncated mean of its three channels,
//! `(R + G + B) / 3`. Rows carry no cross-row dependency, so both entry points
//! split the grid into one band per pool thread and reduce bands concurrently.

use crate::parallel::{partition_rows, process_bands_parallel};
use crate::types::{LumaGrid, PixelGrid, RemainderPolicy, Result, Rgb};
use ndarray::{s, Zip};
use rayon::ThreadPool;

/// Truncated channel mean, summed in `u16` so it cannot wrap
#[inline]
pub fn luma(px: Rgb) -> u8 {
    ((px.r as u16 + px.g as u16 + px.b as u16) / 3) as u8
}

/// Overwrite every pixel with `(l, l, l)` where `l` is its luminance
///
/// Callers that still need the color image must clone it first.
pub fn reduce_in_place(grid: &mut PixelGrid, pool: &ThreadPool) -> Result<()> {
    let bands = partition_rows(
        grid.rows(),
        grid.cols(),
        pool.current_num_threads(),
        RemainderPolicy::ExtendLast,
    )?;

    process_bands_parallel(pool, grid.view_mut(), &bands, |_, mut rows| {
        rows.mapv_inplace(|px| Rgb::splat(luma(px)));
    })
}

/// Reduce into a new single-channel grid, leaving `grid` untouched
pub fn to_luma(grid: &PixelGrid, pool: &ThreadPool) -> Result<LumaGrid> {
    let mut out = LumaGrid::zeros(grid.rows(), grid.cols());
    let src = grid.view();
    let bands = partition_rows(
        grid.rows(),
        grid.cols(),
        pool.current_num_threads(),
        RemainderPolicy::ExtendLast,
    )?;

    process_bands_parallel(pool, out.view_mut(), &bands, |band, mut rows| {
        let src_rows = src.slice(s![band.first..band.last, ..]);
        Zip::from(&mut rows)
            .and(&src_rows)
            .for_each(|dst, &px| *dst = luma(px));
    })?;

    Ok(out)
}
