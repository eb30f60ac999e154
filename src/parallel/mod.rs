//! Row-band partitioning and the fixed-size worker pool

use crate::types::{Error, RemainderPolicy, Result, WorkBand};
use log::{debug, warn};
use ndarray::{ArrayViewMut2, Axis};
use rayon::prelude::*;
use rayon::ThreadPool;

/// Split `[0, total_rows)` into `workers` contiguous bands of equal height
///
/// Band `k` covers `[k*h, (k+1)*h)` with `h = total_rows / workers`. Rows left
/// over by the integer division go to the last band under
/// [`RemainderPolicy::ExtendLast`] and to no band under [`RemainderPolicy::Drop`].
///
/// Always returns exactly `workers` bands; some may be empty when there are
/// more workers than rows.
pub fn partition_rows(
    total_rows: usize,
    total_cols: usize,
    workers: usize,
    policy: RemainderPolicy,
) -> Result<Vec<WorkBand>> {
    if workers == 0 {
        return Err(Error::Config(
            "cannot partition rows across zero workers".to_string(),
        ));
    }

    let band_height = total_rows / workers;
    let mut bands: Vec<WorkBand> = (0..workers)
        .map(|k| WorkBand::new(k * band_height, (k + 1) * band_height))
        .collect();

    let covered = band_height * workers;
    if covered < total_rows {
        match policy {
            RemainderPolicy::ExtendLast => {
                if let Some(last) = bands.last_mut() {
                    last.last = total_rows;
                }
            }
            RemainderPolicy::Drop => {
                warn!(
                    "{} trailing rows are not assigned to any band ({} rows / {} workers)",
                    total_rows - covered,
                    total_rows,
                    workers
                );
            }
        }
    }

    if band_height == 0 && total_rows > 0 {
        warn!(
            "{} workers for {} rows: only the last band has work",
            workers, total_rows
        );
    }

    debug!(
        "Partitioned {}x{} grid into {} bands of height {}",
        total_rows, total_cols, workers, band_height
    );

    Ok(bands)
}

/// Build a pool with exactly `workers` threads
pub fn build_pool(workers: usize) -> Result<ThreadPool> {
    if workers == 0 {
        return Err(Error::Config("worker count must be at least 1".to_string()));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|idx| format!("sobel-worker-{}", idx))
        .build()?;
    Ok(pool)
}

/// Split a mutable grid view into one disjoint row view per band
///
/// Bands must be ascending, non-overlapping and inside the view. Gaps between
/// bands (and rows after the last band) are simply not handed out.
pub fn split_bands_mut<'a, T>(
    view: ArrayViewMut2<'a, T>,
    bands: &[WorkBand],
) -> Result<Vec<(WorkBand, ArrayViewMut2<'a, T>)>> {
    let total_rows = view.nrows();
    let mut pieces = Vec::with_capacity(bands.len());
    let mut rest = view;
    let mut offset = 0;

    for &band in bands {
        if band.first < offset || band.last < band.first || band.last > total_rows {
            return Err(Error::Processing(format!(
                "band [{}, {}) is out of order or outside {} rows",
                band.first, band.last, total_rows
            )));
        }

        let (_, tail) = rest.split_at(Axis(0), band.first - offset);
        let (head, tail) = tail.split_at(Axis(0), band.len());
        pieces.push((band, head));
        rest = tail;
        offset = band.last;
    }

    Ok(pieces)
}

/// Run `task` once per band on `pool`, each task owning its band's rows
pub fn process_bands_parallel<T, F>(
    pool: &ThreadPool,
    view: ArrayViewMut2<'_, T>,
    bands: &[WorkBand],
    task: F,
) -> Result<()>
where
    T: Send,
    F: Fn(WorkBand, ArrayViewMut2<'_, T>) + Send + Sync,
{
    let pieces = split_bands_mut(view, bands)?;
    pool.install(|| {
        pieces
            .into_par_iter()
            .for_each(|(band, rows)| task(band, rows));
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn test_partition_even() {
        let bands = partition_rows(12, 5, 3, RemainderPolicy::ExtendLast).unwrap();
        assert_eq!(
            bands,
            vec![WorkBand::new(0, 4), WorkBand::new(4, 8), WorkBand::new(8, 12)]
        );
    }

    #[test]
    fn test_partition_remainder_extends_last() {
        let bands = partition_rows(10, 5, 3, RemainderPolicy::ExtendLast).unwrap();
        assert_eq!(
            bands,
            vec![WorkBand::new(0, 3), WorkBand::new(3, 6), WorkBand::new(6, 10)]
        );
    }

    #[test]
    fn test_partition_remainder_dropped() {
        // Matches the original behavior: rows 9 and 10 belong to no band
        let bands = partition_rows(11, 5, 3, RemainderPolicy::Drop).unwrap();
        assert_eq!(bands.last(), Some(&WorkBand::new(6, 9)));
    }

    #[test]
    fn test_partition_covers_all_rows() {
        for rows in 1..20 {
            for workers in 1..=rows + 2 {
                let bands =
                    partition_rows(rows, 4, workers, RemainderPolicy::ExtendLast).unwrap();
                assert_eq!(bands.len(), workers);
                let mut next = 0;
                for band in &bands {
                    assert_eq!(band.first, next, "gap or overlap at {:?}", band);
                    next = band.last;
                }
                assert_eq!(next, rows);
            }
        }
    }

    #[test]
    fn test_partition_zero_workers() {
        let result = partition_rows(10, 10, 0, RemainderPolicy::ExtendLast);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_build_pool_size() {
        let pool = build_pool(3).unwrap();
        assert_eq!(pool.current_num_threads(), 3);
        assert!(build_pool(0).is_err());
    }

    #[test]
    fn test_split_bands_mut_with_gap() {
        let mut grid = Array2::<u8>::zeros((6, 2));
        let bands = [WorkBand::new(0, 2), WorkBand::new(3, 5)];
        let pieces = split_bands_mut(grid.view_mut(), &bands).unwrap();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].1.nrows(), 2);
        assert_eq!(pieces[1].1.nrows(), 2);

        for (band, mut rows) in pieces {
            rows.fill(band.first as u8 + 1);
        }
        assert_eq!(grid[(1, 0)], 1);
        assert_eq!(grid[(2, 0)], 0);
        assert_eq!(grid[(3, 1)], 4);
        assert_eq!(grid[(5, 0)], 0);
    }

    #[test]
    fn test_split_bands_mut_rejects_overlap() {
        let mut grid = Array2::<u8>::zeros((6, 2));
        let bands = [WorkBand::new(0, 3), WorkBand::new(2, 5)];
        assert!(split_bands_mut(grid.view_mut(), &bands).is_err());

        let beyond = [WorkBand::new(4, 7)];
        assert!(split_bands_mut(grid.view_mut(), &beyond).is_err());
    }

    #[test]
    fn test_process_bands_parallel() {
        let pool = build_pool(2).unwrap();
        let mut grid = Array2::<u8>::zeros((4, 3));
        let bands = partition_rows(4, 3, 2, RemainderPolicy::ExtendLast).unwrap();
        process_bands_parallel(&pool, grid.view_mut(), &bands, |band, mut rows| {
            rows.fill(band.first as u8 + 10);
        })
        .unwrap();
        assert_eq!(grid[(0, 0)], 10);
        assert_eq!(grid[(3, 2)], 12);
    }
}
