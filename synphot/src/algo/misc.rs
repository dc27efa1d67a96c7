//! Miscellaneous numerical utilities.
//!
//! This module provides the zero-filled linear resampling used when moving
//! spectra and throughput curves between wavelength grids. Tables are
//! validated up front and failures are reported through [`InterpError`]
//! instead of panicking.

use thiserror::Error;

/// Errors that can occur during interpolation operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpError {
    #[error("Input vectors must have at least 2 points")]
    InsufficientData,
    #[error("Input vectors must have the same length")]
    MismatchedLengths,
    #[error("X values must be sorted in ascending order")]
    UnsortedData,
}

/// Check that `xs`/`ys` form a usable interpolation table.
///
/// The abscissa must be strictly increasing, have at least two samples and
/// match the ordinate in length.
pub fn validate_table(xs: &[f64], ys: &[f64]) -> Result<(), InterpError> {
    if xs.len() != ys.len() {
        return Err(InterpError::MismatchedLengths);
    }

    if xs.len() < 2 {
        return Err(InterpError::InsufficientData);
    }

    if xs.iter().any(|x| x.is_nan()) || xs.windows(2).any(|w| w[1] <= w[0]) {
        return Err(InterpError::UnsortedData);
    }

    Ok(())
}

/// Resample a table onto a new set of abscissae.
///
/// Points of `grid` that fall outside `[xs[0], xs[n-1]]` are set to zero,
/// everything else is linearly interpolated. `grid` must be ascending, which
/// lets the walk through `xs` run in a single pass.
///
/// # Examples
///
/// ```rust
/// use synphot::algo::misc::resample_zero_fill;
///
/// let xs = [1.0, 2.0, 3.0];
/// let ys = [10.0, 20.0, 30.0];
/// let out = resample_zero_fill(&xs, &ys, &[0.5, 1.5, 3.0, 3.5]).unwrap();
/// assert_eq!(out, vec![0.0, 15.0, 30.0, 0.0]);
/// ```
pub fn resample_zero_fill(xs: &[f64], ys: &[f64], grid: &[f64]) -> Result<Vec<f64>, InterpError> {
    validate_table(xs, ys)?;

    if grid.windows(2).any(|w| w[1] < w[0]) {
        return Err(InterpError::UnsortedData);
    }

    let min_x = xs[0];
    let max_x = xs[xs.len() - 1];
    let mut out = Vec::with_capacity(grid.len());
    let mut seg = 0;

    for &x in grid {
        if !(min_x..=max_x).contains(&x) {
            out.push(0.0);
            continue;
        }

        while seg + 2 < xs.len() && xs[seg + 1] < x {
            seg += 1;
        }

        let (x1, x2) = (xs[seg], xs[seg + 1]);
        let value = if x == x2 {
            ys[seg + 1]
        } else {
            lerp(x, x1, x2, ys[seg], ys[seg + 1])
        };
        out.push(value);
    }

    Ok(out)
}

#[inline]
fn lerp(x: f64, x1: f64, x2: f64, y1: f64, y2: f64) -> f64 {
    let t = (x - x1) / (x2 - x1);
    y1 + t * (y2 - y1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_interpolation() {
        let xs = vec![1.0, 2.0, 3.0];
        let ys = vec![10.0, 20.0, 30.0];
        let out = resample_zero_fill(&xs, &ys, &[1.0, 1.5, 2.0, 2.5]).unwrap();
        assert_eq!(out, vec![10.0, 15.0, 20.0, 25.0]);
    }

    #[test]
    fn test_mismatched_lengths() {
        let xs = vec![1.0, 2.0, 3.0];
        let ys = vec![10.0, 20.0];
        assert!(matches!(
            resample_zero_fill(&xs, &ys, &[1.5]),
            Err(InterpError::MismatchedLengths)
        ));
    }

    #[test]
    fn test_insufficient_data() {
        let xs = vec![1.0];
        let ys = vec![10.0];
        assert!(matches!(
            validate_table(&xs, &ys),
            Err(InterpError::InsufficientData)
        ));
    }

    #[test]
    fn test_unsorted_data() {
        let xs = vec![2.0, 1.0, 3.0];
        let ys = vec![20.0, 10.0, 30.0];
        assert!(matches!(
            validate_table(&xs, &ys),
            Err(InterpError::UnsortedData)
        ));
        assert!(matches!(
            validate_table(&[1.0, f64::NAN], &[1.0, 2.0]),
            Err(InterpError::UnsortedData)
        ));
    }

    #[test]
    fn test_resample_zero_fill_outside_range() {
        let xs = vec![400.0, 500.0, 600.0];
        let ys = vec![1.0, 2.0, 3.0];
        let grid = vec![300.0, 350.0, 400.0, 450.0, 600.0, 650.0];

        let out = resample_zero_fill(&xs, &ys, &grid).unwrap();
        assert_eq!(out, vec![0.0, 0.0, 1.0, 1.5, 3.0, 0.0]);
    }

    #[test]
    fn test_resample_piecewise_linear_is_exact() {
        // |x - 500| is linear between knots because 500 is itself a knot
        let xs: Vec<f64> = (0..50).map(|i| 300.0 + 8.0 * i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| (x - 500.0).abs()).collect();
        let grid: Vec<f64> = (0..250).map(|i| 301.0 + 1.7 * i as f64).collect();

        let out = resample_zero_fill(&xs, &ys, &grid).unwrap();
        for (x, y) in grid.iter().zip(out.iter()) {
            let expected = if *x <= 692.0 { (x - 500.0).abs() } else { 0.0 };
            assert!((expected - y).abs() < 1e-9, "mismatch at {x}: {y} vs {expected}");
        }
    }

    #[test]
    fn test_resample_rejects_unsorted_grid() {
        let xs = vec![1.0, 2.0];
        let ys = vec![1.0, 2.0];
        assert!(matches!(
            resample_zero_fill(&xs, &ys, &[1.5, 1.2]),
            Err(InterpError::UnsortedData)
        ));
    }
}
