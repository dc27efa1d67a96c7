//! Fitting SED normalizations to catalog magnitudes, colors and de-reddening

use log::{debug, warn};
use ndarray::{Array1, Array2, Axis};

use super::bandpass::Bandpass;
use super::error::{PhotometryError, Result};
use super::magnitudes::MagnitudeCalculator;
use super::spectrum::SpectrumGrid;

/// Threshold on the increase of the squared residual that stops the search
const CONVERGENCE_TOLERANCE: f64 = 1e-10;

/// Options for [`calc_mag_norm`]
#[derive(Debug, Clone, PartialEq)]
pub struct MagNormSearch {
    /// Redshift applied (without dimming) to the spectrum before matching
    pub redshift: Option<f64>,

    /// Magnitude increment per step; the result is accurate to about this
    pub step_size: f64,

    /// Index of the target magnitude used as the first guess
    pub init_band: usize,

    /// Band indices to match against; also overrides `init_band` with its
    /// first entry. Useful when some bands have no data.
    pub filter_range: Option<Vec<usize>>,

    /// Per-band magnitude uncertainties; residuals are divided by these
    pub mag_errors: Option<Vec<f64>>,

    pub max_iterations: usize,
}

impl Default for MagNormSearch {
    fn default() -> Self {
        Self {
            redshift: None,
            step_size: 0.01,
            init_band: 0,
            filter_range: None,
            mag_errors: None,
            max_iterations: 10_000,
        }
    }
}

impl MagNormSearch {
    pub fn with_redshift(mut self, redshift: f64) -> Self {
        self.redshift = Some(redshift);
        self
    }

    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = step_size;
        self
    }

    pub fn with_init_band(mut self, init_band: usize) -> Self {
        self.init_band = init_band;
        self
    }

    pub fn with_filter_range(mut self, filter_range: Vec<usize>) -> Self {
        self.filter_range = Some(filter_range);
        self
    }

    pub fn with_mag_errors(mut self, mag_errors: Vec<f64>) -> Self {
        self.mag_errors = Some(mag_errors);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Find the magnitude in the 500 nm delta bandpass ("magNorm") that makes
/// `spectrum` best reproduce `target_mags` in the bands of `calc`.
///
/// This is a fixed-step hill climb: starting from a target magnitude it walks
/// in the direction of the largest residual until the summed squared residual
/// starts to grow, returning the best value seen. It is local and accurate to
/// roughly `search.step_size`.
///
/// Non-finite targets, bands where the spectrum has no flux and bands with a
/// non-positive error are left out of the fit. Returns `Ok(None)` if nothing
/// is left to fit. `spectrum` itself is never modified.
pub fn calc_mag_norm(
    target_mags: &[f64],
    spectrum: &SpectrumGrid,
    calc: &MagnitudeCalculator,
    search: &MagNormSearch,
) -> Result<Option<f64>> {
    let n_bands = calc.n_bands();
    if target_mags.len() != n_bands {
        return Err(PhotometryError::shape(
            "target magnitudes",
            n_bands,
            target_mags.len(),
        ));
    }
    if let Some(errors) = &search.mag_errors {
        if errors.len() != n_bands {
            return Err(PhotometryError::shape("magnitude errors", n_bands, errors.len()));
        }
    }
    if let Some(&bad) = search
        .filter_range
        .iter()
        .flatten()
        .find(|&&idx| idx >= n_bands)
    {
        return Err(PhotometryError::shape("filter range index bound", n_bands, bad + 1));
    }
    if search.init_band >= n_bands {
        return Err(PhotometryError::shape(
            "initial band index bound",
            n_bands,
            search.init_band + 1,
        ));
    }
    if !search.step_size.is_finite() || search.step_size <= 0.0 {
        return Err(PhotometryError::Domain(format!(
            "Step size must be positive, got: {}",
            search.step_size
        )));
    }

    let mut sed = spectrum.clone();
    if let Some(z) = search.redshift {
        sed.redshift(z, false)?;
    }

    // Magnitudes scale rigidly with the normalization, so the model for any
    // trial magNorm m is `unit_mags + (m - imsim_mag)`.
    let imsim_mag = sed.calc_mag(&Bandpass::imsim_default()?)?;
    sed.resample(calc.wavelen())?;
    sed.flambda_to_fnu();
    let unit_mags = calc.magnitudes_for_fnu(&sed.fnu_values());

    let candidates: Vec<usize> = match &search.filter_range {
        Some(range) => range.clone(),
        None => (0..n_bands).collect(),
    };
    let fitted: Vec<(usize, f64)> = candidates
        .into_iter()
        .filter_map(|idx| {
            let error = search.mag_errors.as_ref().map_or(1.0, |e| e[idx]);
            let usable = target_mags[idx].is_finite()
                && unit_mags[idx].is_finite()
                && error.is_finite()
                && error > 0.0;
            if !unit_mags[idx].is_finite() {
                warn!(
                    "Spectrum has no flux in band '{}'; excluded from magNorm fit",
                    calc.keys()[idx]
                );
            }
            usable.then_some((idx, error))
        })
        .collect();

    if fitted.is_empty() {
        debug!("No usable bands for magNorm fit");
        return Ok(None);
    }

    let preferred = search
        .filter_range
        .as_ref()
        .and_then(|range| range.first().copied())
        .unwrap_or(search.init_band);
    let seed_band = if fitted.iter().any(|(idx, _)| *idx == preferred) {
        preferred
    } else {
        fitted[0].0
    };

    let residuals = |mag_norm: f64| -> Vec<f64> {
        fitted
            .iter()
            .map(|&(idx, error)| (target_mags[idx] - (unit_mags[idx] + mag_norm - imsim_mag)) / error)
            .collect()
    };
    let sum_sq = |mag_norm: f64| -> f64 { residuals(mag_norm).iter().map(|r| r * r).sum() };

    let mut mag_norm = target_mags[seed_band];
    let largest = residuals(mag_norm)
        .into_iter()
        .fold(0.0_f64, |acc, r| if r.abs() > acc.abs() { r } else { acc });
    let step = if largest < 0.0 {
        -search.step_size
    } else {
        search.step_size
    };

    let mut current = sum_sq(mag_norm);
    let mut previous = current;
    let mut best = (mag_norm, current);
    let mut iterations = 0;

    while current - previous < CONVERGENCE_TOLERANCE {
        if iterations >= search.max_iterations {
            return Err(PhotometryError::Domain(format!(
                "magNorm search did not converge within {} steps of {}",
                search.max_iterations, search.step_size
            )));
        }
        iterations += 1;

        previous = current;
        mag_norm += step;
        current = sum_sq(mag_norm);
        if current < best.1 {
            best = (mag_norm, current);
        }
    }

    debug!(
        "magNorm converged to {:.4} after {} steps ({} bands, residual² {:.3e})",
        best.0,
        iterations,
        fitted.len(),
        best.1
    );
    Ok(Some(best.0))
}

/// Adjacent-band colors (`mag[i] - mag[i+1]`) of each spectrum.
///
/// A color is `None` when either magnitude is not finite. With
/// `make_copy == false` the spectra are resampled onto the calculator grid and
/// left in f_nu form; with `true` they are untouched.
pub fn calc_basic_colors(
    spectra: &mut [SpectrumGrid],
    calc: &MagnitudeCalculator,
    make_copy: bool,
) -> Result<Vec<Vec<Option<f64>>>> {
    spectra
        .iter_mut()
        .map(|spectrum| -> Result<Vec<Option<f64>>> {
            let mags = if make_copy {
                calc.mag_list(&mut spectrum.clone())?
            } else {
                calc.mag_list(spectrum)?
            };
            Ok(mags
                .windows(2)
                .map(|pair| {
                    (pair[0].is_finite() && pair[1].is_finite()).then(|| pair[0] - pair[1])
                })
                .collect())
        })
        .collect()
}

/// Remove extinction from a (objects × bands) magnitude table:
/// `mags[i][j] - ebv[i] * coeffs[j]`
pub fn de_redden_mags(
    ebv: &Array1<f64>,
    mags: &Array2<f64>,
    coeffs: &Array1<f64>,
) -> Result<Array2<f64>> {
    let (n_objects, n_bands) = mags.dim();
    if ebv.len() != n_objects {
        return Err(PhotometryError::shape("E(B-V) values", n_objects, ebv.len()));
    }
    if coeffs.len() != n_bands {
        return Err(PhotometryError::shape(
            "extinction coefficients",
            n_bands,
            coeffs.len(),
        ));
    }

    let extinction = &ebv.view().insert_axis(Axis(1)) * &coeffs.view();
    Ok(mags - &extinction)
}
