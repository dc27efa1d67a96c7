//! Stacked phi curves for computing many magnitudes with one matrix product

use log::warn;
use ndarray::{Array1, Array2};

use super::bandpass::BandpassSet;
use super::constants::PhotometricDefaults;
use super::error::{PhotometryError, Result};

/// Rows of normalized bandpass responses on a shared wavelength grid
///
/// Row `i` belongs to `keys()[i]`; the order is fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PhiArray {
    keys: Vec<String>,
    phi: Array2<f64>,
    wavelen: Array1<f64>,
    wavelen_step: f64,
}

impl PhiArray {
    /// Band keys, one per row
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// The (n_bands, n_wavelengths) phi matrix
    pub fn phi(&self) -> &Array2<f64> {
        &self.phi
    }

    /// Grid shared by all rows
    pub fn wavelen(&self) -> &Array1<f64> {
        &self.wavelen
    }

    pub fn wavelen_step(&self) -> f64 {
        self.wavelen_step
    }

    pub fn n_bands(&self) -> usize {
        self.keys.len()
    }

    /// AB magnitudes for an f_nu array already sampled on [`PhiArray::wavelen`]
    ///
    /// Bands with no positive flux come back as NaN.
    pub fn magnitudes(&self, fnu: &Array1<f64>) -> Array1<f64> {
        let zp = PhotometricDefaults::zero_point();
        (self.phi.dot(fnu) * self.wavelen_step).mapv(|flux| {
            if flux > 0.0 {
                -2.5 * flux.log10() - zp
            } else {
                f64::NAN
            }
        })
    }
}

/// Stack the phi curves of `ordered_keys` into a [`PhiArray`].
///
/// The first key's grid becomes the shared grid; any other band sampled
/// differently is resampled onto it with a warning.
pub fn build_phi_array<S: AsRef<str>>(set: &BandpassSet, ordered_keys: &[S]) -> Result<PhiArray> {
    let bandpasses = set.ordered(ordered_keys)?;
    let reference = bandpasses
        .first()
        .ok_or_else(|| PhotometryError::shape("phi array band keys", 1, 0))?;

    let wavelen = reference.wavelen().clone();
    let wavelen_step = reference.wavelen_step();
    let mut phi = Array2::zeros((bandpasses.len(), wavelen.len()));

    for (row, (key, bandpass)) in ordered_keys.iter().zip(&bandpasses).enumerate() {
        if bandpass.needs_resample(&wavelen) {
            warn!(
                "Bandpass '{}' is not on the grid of '{}'; resampling",
                key.as_ref(),
                ordered_keys[0].as_ref()
            );
            let resampled = bandpass.resample_onto(&wavelen)?;
            phi.row_mut(row).assign(resampled.phi());
        } else {
            phi.row_mut(row).assign(bandpass.phi());
        }
    }

    Ok(PhiArray {
        keys: ordered_keys.iter().map(|k| k.as_ref().to_string()).collect(),
        phi,
        wavelen,
        wavelen_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photometry::bandpass::Bandpass;
    use crate::photometry::spectrum::{SpectrumGrid, WavelengthGrid};
    use approx::assert_relative_eq;

    fn set() -> BandpassSet {
        let grid = WavelengthGrid::default();
        [("g", 400.0, 550.0), ("r", 550.0, 690.0), ("i", 690.0, 820.0)]
            .into_iter()
            .map(|(key, lo, hi)| (key, Bandpass::from_notch(lo, hi, 0.5, &grid).unwrap()))
            .collect()
    }

    #[test]
    fn test_rows_follow_requested_order() {
        let set = set();
        let phi = build_phi_array(&set, &["i", "g"]).unwrap();

        assert_eq!(phi.keys(), &["i".to_string(), "g".to_string()]);
        assert_eq!(phi.phi().dim(), (2, 8501));
        assert_eq!(phi.phi().row(0), set.get("i").unwrap().phi().view());
        assert_eq!(phi.phi().row(1), set.get("g").unwrap().phi().view());
    }

    #[test]
    fn test_empty_and_unknown_keys() {
        let set = set();
        let empty: [&str; 0] = [];
        assert!(matches!(
            build_phi_array(&set, &empty),
            Err(PhotometryError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            build_phi_array(&set, &["g", "y"]),
            Err(PhotometryError::UnknownBand(_))
        ));
    }

    #[test]
    fn test_off_grid_band_is_resampled() {
        let mut set = set();
        let coarse = WavelengthGrid::new(300.0, 1150.0, 0.5).unwrap();
        set.insert("z", Bandpass::from_notch(820.0, 920.0, 0.5, &coarse).unwrap());

        let phi = build_phi_array(&set, &["g", "z"]).unwrap();
        let row = phi.phi().row(1);
        assert_relative_eq!(row.sum() * phi.wavelen_step(), 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_flat_spectrum_magnitudes() {
        let phi = build_phi_array(&set(), &["g", "r", "i"]).unwrap();
        let flat = SpectrumGrid::flat(&WavelengthGrid::default());
        let mags = phi.magnitudes(&flat.fnu_values());
        for mag in mags.iter() {
            assert_relative_eq!(*mag, 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_no_flux_band_is_nan() {
        let phi = build_phi_array(&set(), &["g", "r"]).unwrap();
        let mut fnu = Array1::zeros(phi.wavelen().len());
        // Only light up the g band
        fnu.slice_mut(ndarray::s![1000..2500]).fill(3631.0);

        let mags = phi.magnitudes(&fnu);
        assert!(mags[0].is_finite());
        assert!(mags[1].is_nan());
    }
}
