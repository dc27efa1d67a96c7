//! Batched AB magnitudes for a fixed, ordered set of bandpasses

use log::debug;
use ndarray::Array1;
use rayon::prelude::*;

use super::bandpass::BandpassSet;
use super::error::{PhotometryError, Result};
use super::phi::{build_phi_array, PhiArray};
use super::spectrum::SpectrumGrid;

/// Magnitudes keyed by band, in phi-array order
#[derive(Debug, Clone, PartialEq)]
pub struct MagnitudeResult {
    entries: Vec<(String, f64)>,
}

impl MagnitudeResult {
    fn from_parts(keys: &[String], mags: &Array1<f64>) -> Self {
        Self {
            entries: keys.iter().cloned().zip(mags.iter().copied()).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, mag)| *mag)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Magnitudes in band order
    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, mag)| *mag).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, mag)| (k.as_str(), *mag))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Magnitudes of `spectrum` in every band of `phi`.
///
/// The spectrum is resampled in place onto the grid of `keys[0]` if needed and
/// left in f_nu form. `keys` must be the keys `phi` was built from, in order.
pub fn many_mag_calc_dict<S: AsRef<str>>(
    spectrum: &mut SpectrumGrid,
    phi: &PhiArray,
    set: &BandpassSet,
    keys: &[S],
) -> Result<MagnitudeResult> {
    let same_order = keys.len() == phi.n_bands()
        && keys
            .iter()
            .zip(phi.keys())
            .all(|(key, phi_key)| key.as_ref() == phi_key);
    if !same_order {
        return Err(PhotometryError::BandOrderMismatch {
            expected: phi.keys().to_vec(),
            actual: keys.iter().map(|k| k.as_ref().to_string()).collect(),
        });
    }

    let reference_key = phi.keys()[0].as_str();
    let reference = set
        .get(reference_key)
        .ok_or_else(|| PhotometryError::UnknownBand(reference_key.to_string()))?;

    if spectrum.needs_resample(reference.wavelen()) {
        spectrum.resample(reference.wavelen())?;
    }
    spectrum.flambda_to_fnu();

    let mags = spectrum.many_mag_calc(phi)?;
    Ok(MagnitudeResult::from_parts(phi.keys(), &mags))
}

/// Bandpasses plus their precomputed phi array
///
/// Built once, then shared (read-only) across any number of spectra,
/// including from multiple threads.
#[derive(Debug, Clone)]
pub struct MagnitudeCalculator {
    bandpasses: BandpassSet,
    phi: PhiArray,
}

impl MagnitudeCalculator {
    /// Build a calculator over `keys`, in that order
    pub fn new<S: AsRef<str>>(bandpasses: BandpassSet, keys: &[S]) -> Result<Self> {
        let phi = build_phi_array(&bandpasses, keys)?;
        debug!(
            "Built phi array for bands {:?} over {} samples",
            phi.keys(),
            phi.wavelen().len()
        );
        Ok(Self { bandpasses, phi })
    }

    /// Build a calculator over every band in insertion order
    pub fn from_bandpasses(bandpasses: BandpassSet) -> Result<Self> {
        let keys = bandpasses.keys().to_vec();
        Self::new(bandpasses, &keys)
    }

    pub fn keys(&self) -> &[String] {
        self.phi.keys()
    }

    pub fn bandpasses(&self) -> &BandpassSet {
        &self.bandpasses
    }

    pub fn phi(&self) -> &PhiArray {
        &self.phi
    }

    pub fn n_bands(&self) -> usize {
        self.phi.n_bands()
    }

    /// Wavelength grid spectra are brought onto before integration
    pub fn wavelen(&self) -> &Array1<f64> {
        self.phi.wavelen()
    }

    /// Magnitudes keyed by band. Resamples `spectrum` in place and leaves it
    /// in f_nu form; clone first to keep the original.
    pub fn many_mag_calc(&self, spectrum: &mut SpectrumGrid) -> Result<MagnitudeResult> {
        many_mag_calc_dict(spectrum, &self.phi, &self.bandpasses, self.phi.keys())
    }

    /// Magnitudes as a plain list in band order
    pub fn mag_list(&self, spectrum: &mut SpectrumGrid) -> Result<Vec<f64>> {
        Ok(self.many_mag_calc(spectrum)?.values())
    }

    /// Magnitudes of many spectra, computed in parallel
    pub fn many_mag_calc_batch(&self, spectra: &mut [SpectrumGrid]) -> Vec<Result<MagnitudeResult>> {
        spectra
            .par_iter_mut()
            .map(|spectrum| self.many_mag_calc(spectrum))
            .collect()
    }

    /// Magnitudes for an f_nu array already on [`MagnitudeCalculator::wavelen`]
    pub(crate) fn magnitudes_for_fnu(&self, fnu: &Array1<f64>) -> Array1<f64> {
        self.phi.magnitudes(fnu)
    }
}
