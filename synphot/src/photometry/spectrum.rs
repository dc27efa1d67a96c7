//! Sampled spectral energy distributions.
//!
//! A [`SpectrumGrid`] pairs a wavelength axis (nm) with exactly one flux-density
//! representation, either f_lambda (ergs/cm²/s/nm) or f_nu (Jansky). Switching
//! representation is an explicit in-place operation.
//!
//! Mutating operations take `&mut self`: [`SpectrumGrid::resample`],
//! [`SpectrumGrid::redshift`], [`SpectrumGrid::multiply_flux_norm`],
//! [`SpectrumGrid::flambda_to_fnu`] and [`SpectrumGrid::fnu_to_flambda`].
//! Everything that only measures the spectrum (`calc_mag`, `calc_flux_norm`,
//! `calc_adu`, `many_mag_calc`) takes `&self` and resamples a temporary copy
//! when the bandpass grid differs. Callers that need an untouched copy clone
//! first.

use std::borrow::Cow;

use log::debug;
use ndarray::{Array1, Zip};

use super::bandpass::Bandpass;
use super::constants::PhotometricDefaults;
use super::error::{PhotometryError, Result};
use super::phi::PhiArray;
use crate::algo::resample_zero_fill;

/// Tolerance in nm under which two wavelength samples are considered equal
const GRID_TOLERANCE_NM: f64 = 1e-9;

/// Boltzmann constant in erg/K
const BOLTZMANN_CGS: f64 = 1.380649e-16;

/// Speed of light in cm/s
const LIGHTSPEED_CGS: f64 = 2.99792458e10;

/// Uniform wavelength grid description
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavelengthGrid {
    /// First sample in nanometers
    pub min: f64,

    /// Last sample in nanometers
    pub max: f64,

    /// Spacing between samples in nanometers
    pub step: f64,
}

impl Default for WavelengthGrid {
    fn default() -> Self {
        Self {
            min: PhotometricDefaults::MIN_WAVELEN,
            max: PhotometricDefaults::MAX_WAVELEN,
            step: PhotometricDefaults::WAVELEN_STEP,
        }
    }
}

impl WavelengthGrid {
    /// Create a grid, validating that it holds at least two samples
    pub fn new(min: f64, max: f64, step: f64) -> Result<Self> {
        if !(min.is_finite() && max.is_finite() && step.is_finite()) {
            return Err(PhotometryError::Domain(
                "Wavelength grid bounds must be finite".to_string(),
            ));
        }
        if min <= 0.0 || step <= 0.0 || max - min < step {
            return Err(PhotometryError::Domain(format!(
                "Invalid wavelength grid {min}..{max} step {step}"
            )));
        }
        Ok(Self { min, max, step })
    }

    /// Number of samples on the grid (both ends inclusive)
    pub fn n_samples(&self) -> usize {
        ((self.max - self.min) / self.step + 1e-6).floor() as usize + 1
    }

    /// Materialize the sample positions
    pub fn samples(&self) -> Array1<f64> {
        Array1::from_iter((0..self.n_samples()).map(|i| self.min + i as f64 * self.step))
    }
}

/// The authoritative flux-density array of a spectrum
#[derive(Debug, Clone, PartialEq)]
pub enum FluxDensity {
    /// ergs/cm²/s/nm
    Flambda(Array1<f64>),

    /// Jansky
    Fnu(Array1<f64>),
}

impl FluxDensity {
    /// Raw values regardless of representation
    pub fn values(&self) -> &Array1<f64> {
        match self {
            FluxDensity::Flambda(values) | FluxDensity::Fnu(values) => values,
        }
    }

    fn values_mut(&mut self) -> &mut Array1<f64> {
        match self {
            FluxDensity::Flambda(values) | FluxDensity::Fnu(values) => values,
        }
    }

    /// Apply `f` to the values, keeping the representation
    fn map_values<F>(&self, f: F) -> Result<Self>
    where
        F: FnOnce(&Array1<f64>) -> Result<Array1<f64>>,
    {
        Ok(match self {
            FluxDensity::Flambda(values) => FluxDensity::Flambda(f(values)?),
            FluxDensity::Fnu(values) => FluxDensity::Fnu(f(values)?),
        })
    }
}

/// Provenance attached by SED loaders; not interpreted by the photometry code
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SedMetadata {
    pub name: Option<String>,
    /// Metallicity relative to solar (Z/Z☉) or log Z, as the loader defines it
    pub metallicity: Option<f64>,
    /// Effective temperature in Kelvin
    pub temperature: Option<f64>,
    pub log_g: Option<f64>,
    /// Age in years
    pub age: Option<f64>,
}

/// A spectral energy distribution sampled on a wavelength axis
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumGrid {
    wavelen: Array1<f64>,
    flux: FluxDensity,
    pub metadata: SedMetadata,
}

impl SpectrumGrid {
    /// Build a spectrum from wavelengths (nm) and f_lambda (ergs/cm²/s/nm)
    pub fn from_flambda(wavelen: Array1<f64>, flambda: Array1<f64>) -> Result<Self> {
        Self::new(wavelen, FluxDensity::Flambda(flambda))
    }

    /// Build a spectrum from wavelengths (nm) and f_nu (Jansky)
    pub fn from_fnu(wavelen: Array1<f64>, fnu: Array1<f64>) -> Result<Self> {
        Self::new(wavelen, FluxDensity::Fnu(fnu))
    }

    /// Build a spectrum from a wavelength axis and either flux representation
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The arrays have different lengths
    /// - There are fewer than two samples
    /// - Wavelengths are not strictly increasing
    pub fn new(wavelen: Array1<f64>, flux: FluxDensity) -> Result<Self> {
        if wavelen.len() != flux.values().len() {
            return Err(PhotometryError::shape(
                "spectrum flux density",
                wavelen.len(),
                flux.values().len(),
            ));
        }
        check_axis(&wavelen)?;

        Ok(Self {
            wavelen,
            flux,
            metadata: SedMetadata::default(),
        })
    }

    /// Attach loader provenance
    pub fn with_metadata(mut self, metadata: SedMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// A flat f_nu spectrum of 3631 Jy (AB magnitude 0 in every band)
    pub fn flat(grid: &WavelengthGrid) -> Self {
        let wavelen = grid.samples();
        let fnu = Array1::from_elem(wavelen.len(), PhotometricDefaults::AB_ZERO_POINT_JANSKY);
        Self {
            wavelen,
            flux: FluxDensity::Fnu(fnu),
            metadata: SedMetadata::default(),
        }
    }

    /// A blackbody f_lambda spectrum per steradian at `temperature` Kelvin.
    ///
    /// The absolute scale is Planck's law in ergs/cm²/s/nm/sr; normalize it
    /// with [`SpectrumGrid::calc_flux_norm`] before comparing to observations.
    pub fn blackbody(temperature: f64, grid: &WavelengthGrid) -> Result<Self> {
        if !temperature.is_finite() || temperature <= 0.0 {
            return Err(PhotometryError::Domain(format!(
                "Temperature must be positive, got: {temperature}"
            )));
        }

        let wavelen = grid.samples();
        let hc = PhotometricDefaults::PLANCK * LIGHTSPEED_CGS;
        let flambda = wavelen.mapv(|wl_nm| {
            let wl_cm = wl_nm * 1e-7;
            let exponent = hc / (wl_cm * BOLTZMANN_CGS * temperature);
            // Planck's law per cm of wavelength, converted to per nm
            2.0 * hc * LIGHTSPEED_CGS / (wl_cm.powi(5) * exponent.exp_m1()) * 1e-7
        });

        let metadata = SedMetadata {
            name: Some(format!("blackbody_{temperature:.0}K")),
            temperature: Some(temperature),
            ..SedMetadata::default()
        };

        Ok(Self {
            wavelen,
            flux: FluxDensity::Flambda(flambda),
            metadata,
        })
    }

    pub fn wavelen(&self) -> &Array1<f64> {
        &self.wavelen
    }

    pub fn flux(&self) -> &FluxDensity {
        &self.flux
    }

    /// The f_lambda array if that is the current representation
    pub fn flambda(&self) -> Option<&Array1<f64>> {
        match &self.flux {
            FluxDensity::Flambda(values) => Some(values),
            FluxDensity::Fnu(_) => None,
        }
    }

    /// The f_nu array if that is the current representation
    pub fn fnu(&self) -> Option<&Array1<f64>> {
        match &self.flux {
            FluxDensity::Fnu(values) => Some(values),
            FluxDensity::Flambda(_) => None,
        }
    }

    /// f_nu values, converting a copy when f_lambda is authoritative
    pub fn fnu_values(&self) -> Cow<'_, Array1<f64>> {
        match &self.flux {
            FluxDensity::Fnu(values) => Cow::Borrowed(values),
            FluxDensity::Flambda(values) => Cow::Owned(flambda_to_fnu_array(&self.wavelen, values)),
        }
    }

    /// f_lambda values, converting a copy when f_nu is authoritative
    pub fn flambda_values(&self) -> Cow<'_, Array1<f64>> {
        match &self.flux {
            FluxDensity::Flambda(values) => Cow::Borrowed(values),
            FluxDensity::Fnu(values) => Cow::Owned(fnu_to_flambda_array(&self.wavelen, values)),
        }
    }

    pub fn len(&self) -> usize {
        self.wavelen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelen.is_empty()
    }

    /// Mean spacing of the wavelength axis in nm
    pub fn wavelen_step(&self) -> f64 {
        let n = self.wavelen.len();
        (self.wavelen[n - 1] - self.wavelen[0]) / (n - 1) as f64
    }

    /// Whether this spectrum must be resampled to match `target`
    ///
    /// Returns false only when both grids have the same length and agree
    /// sample by sample, in which case resampling would be a pure loss of
    /// precision.
    pub fn needs_resample(&self, target: &Array1<f64>) -> bool {
        !grids_match(&self.wavelen, target)
    }

    /// Re-grid the spectrum onto `target` in place.
    ///
    /// The authoritative flux array is linearly interpolated; target samples
    /// outside the current wavelength range are set to zero. This is a no-op
    /// when [`SpectrumGrid::needs_resample`] is false.
    pub fn resample(&mut self, target: &Array1<f64>) -> Result<()> {
        if !self.needs_resample(target) {
            return Ok(());
        }
        check_axis(target)?;

        debug!(
            "Resampling spectrum of {} samples onto {} samples ({:.1}..{:.1} nm)",
            self.len(),
            target.len(),
            target[0],
            target[target.len() - 1]
        );

        let wavelen = &self.wavelen;
        self.flux = self
            .flux
            .map_values(|values| resample_array(wavelen, values, target))?;
        self.wavelen = target.clone();
        Ok(())
    }

    /// Re-grid onto a uniform grid description
    pub fn resample_to_grid(&mut self, grid: &WavelengthGrid) -> Result<()> {
        self.resample(&grid.samples())
    }

    /// Make f_nu (Jansky) the authoritative representation
    ///
    /// fnu = flambda * λ² * 1e-9 / c * 1e23
    pub fn flambda_to_fnu(&mut self) {
        if let FluxDensity::Flambda(flambda) = &self.flux {
            let fnu = flambda_to_fnu_array(&self.wavelen, flambda);
            self.flux = FluxDensity::Fnu(fnu);
        }
    }

    /// Make f_lambda (ergs/cm²/s/nm) the authoritative representation
    pub fn fnu_to_flambda(&mut self) {
        if let FluxDensity::Fnu(fnu) = &self.flux {
            let flambda = fnu_to_flambda_array(&self.wavelen, fnu);
            self.flux = FluxDensity::Flambda(flambda);
        }
    }

    /// Shift the spectrum to redshift `z` in place.
    ///
    /// Wavelengths are stretched by (1+z). With `dimming`, f_lambda is also
    /// divided by (1+z). The result is re-gridded onto a uniform grid with the
    /// original (mean) step covering the stretched range, and the original
    /// flux representation is kept.
    pub fn redshift(&mut self, z: f64, dimming: bool) -> Result<()> {
        if !z.is_finite() || z <= -1.0 {
            return Err(PhotometryError::Domain(format!(
                "Redshift must be finite and > -1, got: {z}"
            )));
        }
        if z == 0.0 {
            return Ok(());
        }

        let was_fnu = matches!(self.flux, FluxDensity::Fnu(_));
        let step = self.wavelen_step();
        let scale = 1.0 + z;

        let stretched = &self.wavelen * scale;
        let mut flambda = self.flambda_values().into_owned();
        if dimming {
            flambda /= scale;
        }

        let start = stretched[0];
        let span = stretched[stretched.len() - 1] - start;
        let n = (span / step + 1e-9).floor() as usize + 1;
        let target = Array1::from_iter((0..n).map(|i| start + i as f64 * step));

        let regridded = resample_array(&stretched, &flambda, &target)?;
        self.wavelen = target;
        self.flux = FluxDensity::Flambda(regridded);
        if was_fnu {
            self.flambda_to_fnu();
        }
        Ok(())
    }

    /// Integrated f_nu weighted by the bandpass phi, in Jansky
    pub fn calc_flux(&self, bandpass: &Bandpass) -> Result<f64> {
        let fnu = self.fnu_on(bandpass.wavelen())?;
        Ok(fnu.dot(bandpass.phi()) * bandpass.wavelen_step())
    }

    /// AB magnitude of this spectrum in `bandpass`
    ///
    /// mag = -2.5 log10(Σ phi·f_nu · Δλ) - zp
    pub fn calc_mag(&self, bandpass: &Bandpass) -> Result<f64> {
        let flux = self.calc_flux(bandpass)?;
        if !flux.is_finite() || flux <= 0.0 {
            return Err(PhotometryError::Domain(format!(
                "Spectrum has no flux overlap with bandpass (integrated flux {flux})"
            )));
        }
        Ok(-2.5 * flux.log10() - PhotometricDefaults::zero_point())
    }

    /// Factor that brings this spectrum to `target_mag` in `bandpass`
    pub fn calc_flux_norm(&self, target_mag: f64, bandpass: &Bandpass) -> Result<f64> {
        if !target_mag.is_finite() {
            return Err(PhotometryError::Domain(format!(
                "Target magnitude must be finite, got: {target_mag}"
            )));
        }
        let dmag = target_mag - self.calc_mag(bandpass)?;
        Ok(10f64.powf(-0.4 * dmag))
    }

    /// Scale the flux density in place; the wavelength axis is untouched
    pub fn multiply_flux_norm(&mut self, norm: f64) {
        self.flux.values_mut().mapv_inplace(|v| v * norm);
    }

    /// Magnitudes in every band of a precomputed phi array.
    ///
    /// The spectrum must already sit on the phi array's grid; use
    /// [`SpectrumGrid::needs_resample`] / [`SpectrumGrid::resample`] first.
    /// Bands where the spectrum has no flux come back as NaN.
    pub fn many_mag_calc(&self, phi: &PhiArray) -> Result<Array1<f64>> {
        if self.needs_resample(phi.wavelen()) {
            return Err(PhotometryError::shape(
                "spectrum grid vs phi array grid",
                phi.wavelen().len(),
                self.len(),
            ));
        }
        Ok(phi.magnitudes(&self.fnu_values()))
    }

    /// Counts (ADU) this spectrum produces through `bandpass`.
    ///
    /// # Arguments
    ///
    /// * `bandpass` - Throughput the photons pass through
    /// * `exp_time` - Total integration time in seconds
    /// * `effarea` - Collecting area in cm²
    /// * `gain` - Electrons per ADU
    pub fn calc_adu(
        &self,
        bandpass: &Bandpass,
        exp_time: f64,
        effarea: f64,
        gain: f64,
    ) -> Result<f64> {
        if gain.is_nan() || gain <= 0.0 {
            return Err(PhotometryError::Domain(format!(
                "Gain must be positive, got: {gain}"
            )));
        }

        let fnu = self.fnu_on(bandpass.wavelen())?;
        // Photon count in units of 1e-23 ergs/cm²/s/nm per erg⋅s
        let nphoton = Zip::from(&*fnu)
            .and(bandpass.wavelen())
            .and(bandpass.sb())
            .fold(0.0, |acc, &f, &wl, &sb| acc + f / wl * sb);

        Ok(nphoton
            * (exp_time * effarea / gain)
            * (1.0 / PhotometricDefaults::ERGSETC2JANSKY)
            * (1.0 / PhotometricDefaults::PLANCK)
            * bandpass.wavelen_step())
    }

    /// f_nu sampled on `wavelen`, resampling a copy only if the grids differ
    fn fnu_on(&self, wavelen: &Array1<f64>) -> Result<Cow<'_, Array1<f64>>> {
        if !self.needs_resample(wavelen) {
            return Ok(self.fnu_values());
        }
        let values = resample_array(&self.wavelen, self.flux.values(), wavelen)?;
        Ok(Cow::Owned(match self.flux {
            FluxDensity::Fnu(_) => values,
            FluxDensity::Flambda(_) => flambda_to_fnu_array(wavelen, &values),
        }))
    }
}

/// Whether two wavelength axes are identical to within [`GRID_TOLERANCE_NM`]
pub(crate) fn grids_match(a: &Array1<f64>, b: &Array1<f64>) -> bool {
    a.len() == b.len()
        && Zip::from(a)
            .and(b)
            .all(|&x, &y| (x - y).abs() <= GRID_TOLERANCE_NM)
}

/// Zero-filled linear resampling of `ys(xs)` onto `grid`
pub(crate) fn resample_array(
    xs: &Array1<f64>,
    ys: &Array1<f64>,
    grid: &Array1<f64>,
) -> Result<Array1<f64>> {
    let values = resample_zero_fill(&xs.to_vec(), &ys.to_vec(), &grid.to_vec())?;
    Ok(Array1::from(values))
}

fn check_axis(wavelen: &Array1<f64>) -> Result<()> {
    if wavelen.len() < 2 {
        return Err(PhotometryError::shape("spectrum wavelength axis", 2, wavelen.len()));
    }
    let ascending = wavelen
        .iter()
        .zip(wavelen.iter().skip(1))
        .all(|(a, b)| b > a);
    if !ascending {
        return Err(PhotometryError::Domain(
            "Wavelengths must be strictly increasing".to_string(),
        ));
    }
    Ok(())
}

fn flambda_to_fnu_array(wavelen: &Array1<f64>, flambda: &Array1<f64>) -> Array1<f64> {
    Zip::from(wavelen).and(flambda).map_collect(|&wl, &fl| {
        fl * wl * wl * PhotometricDefaults::NM2M / PhotometricDefaults::LIGHTSPEED
            * PhotometricDefaults::ERGSETC2JANSKY
    })
}

fn fnu_to_flambda_array(wavelen: &Array1<f64>, fnu: &Array1<f64>) -> Array1<f64> {
    Zip::from(wavelen).and(fnu).map_collect(|&wl, &f| {
        f / PhotometricDefaults::ERGSETC2JANSKY * PhotometricDefaults::LIGHTSPEED
            / PhotometricDefaults::NM2M
            / (wl * wl)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn r_band() -> Bandpass {
        Bandpass::from_notch(550.0, 690.0, 0.8, &WavelengthGrid::default()).unwrap()
    }

    #[test]
    fn test_default_grid_samples() {
        let grid = WavelengthGrid::default();
        let samples = grid.samples();

        assert_eq!(grid.n_samples(), 8501);
        assert_eq!(samples[0], 300.0);
        assert_relative_eq!(samples[8500], 1150.0, epsilon = 1e-9);
        assert_relative_eq!(samples[1] - samples[0], 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_grid() {
        assert!(WavelengthGrid::new(500.0, 400.0, 1.0).is_err());
        assert!(WavelengthGrid::new(300.0, 400.0, 0.0).is_err());
        assert!(WavelengthGrid::new(300.0, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_construction_validation() {
        let result = SpectrumGrid::from_flambda(
            Array1::from(vec![300.0, 400.0, 500.0]),
            Array1::from(vec![1.0, 2.0]),
        );
        assert!(matches!(result, Err(PhotometryError::ShapeMismatch { .. })));

        let result = SpectrumGrid::from_flambda(
            Array1::from(vec![300.0, 500.0, 400.0]),
            Array1::from(vec![1.0, 2.0, 3.0]),
        );
        assert!(matches!(result, Err(PhotometryError::Domain(_))));
    }

    #[test]
    fn test_flambda_fnu_round_trip() {
        let mut sed = SpectrumGrid::blackbody(5778.0, &WavelengthGrid::default()).unwrap();
        let original = sed.flambda().unwrap().clone();

        sed.flambda_to_fnu();
        assert!(sed.fnu().is_some());
        assert!(sed.flambda().is_none());

        sed.fnu_to_flambda();
        let round_trip = sed.flambda().unwrap();
        for (a, b) in original.iter().zip(round_trip.iter()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_flat_sed_is_zero_mag() {
        let flat = SpectrumGrid::flat(&WavelengthGrid::default());
        let mag = flat.calc_mag(&r_band()).unwrap();
        assert_relative_eq!(mag, 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_fnu_conversion_units() {
        // 3631 Jy at 500 nm is 3631e-23 * c / λ² in ergs/cm²/s/Hz → per nm
        let sed = SpectrumGrid::from_fnu(
            Array1::from(vec![499.0, 500.0, 501.0]),
            Array1::from(vec![3631.0; 3]),
        )
        .unwrap();
        let flambda = sed.flambda_values();
        let expected = 3631.0e-23 * 2.99792458e17 / (500.0 * 500.0);
        assert_relative_eq!(flambda[1], expected, max_relative = 1e-12);
    }

    #[test]
    fn test_resample_onto_own_grid_is_noop() {
        let mut sed = SpectrumGrid::blackbody(6000.0, &WavelengthGrid::default()).unwrap();
        let before = sed.clone();
        let own = sed.wavelen().clone();

        assert!(!sed.needs_resample(&own));
        sed.resample(&own).unwrap();
        assert_eq!(sed, before);
    }

    #[test]
    fn test_resample_zero_outside_range() {
        let mut sed = SpectrumGrid::from_flambda(
            Array1::from(vec![400.0, 500.0, 600.0]),
            Array1::from(vec![1.0, 2.0, 3.0]),
        )
        .unwrap();
        let target = Array1::from(vec![300.0, 450.0, 550.0, 700.0]);

        assert!(sed.needs_resample(&target));
        sed.resample(&target).unwrap();

        assert_eq!(sed.wavelen(), &target);
        assert_eq!(sed.flambda().unwrap().to_vec(), vec![0.0, 1.5, 2.5, 0.0]);
    }

    #[test]
    fn test_redshift_keeps_step_and_stretches() {
        let grid = WavelengthGrid::new(300.0, 1000.0, 1.0).unwrap();
        let mut sed = SpectrumGrid::blackbody(5000.0, &grid).unwrap();
        sed.redshift(0.5, false).unwrap();

        assert_relative_eq!(sed.wavelen()[0], 450.0, epsilon = 1e-9);
        assert_relative_eq!(sed.wavelen_step(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(sed.wavelen()[sed.len() - 1], 1500.0, epsilon = 1e-6);
        assert!(sed.flambda().is_some());
    }

    #[test]
    fn test_redshift_dimming() {
        let grid = WavelengthGrid::new(300.0, 1000.0, 1.0).unwrap();
        let mut plain = SpectrumGrid::blackbody(5000.0, &grid).unwrap();
        let mut dimmed = plain.clone();

        plain.redshift(1.0, false).unwrap();
        dimmed.redshift(1.0, true).unwrap();

        let ratio = dimmed.flambda().unwrap()[100] / plain.flambda().unwrap()[100];
        assert_relative_eq!(ratio, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_redshift_preserves_fnu_representation() {
        let mut sed = SpectrumGrid::flat(&WavelengthGrid::new(300.0, 1000.0, 1.0).unwrap());
        sed.redshift(0.2, false).unwrap();
        assert!(sed.fnu().is_some());
    }

    #[test]
    fn test_invalid_redshift() {
        let mut sed = SpectrumGrid::flat(&WavelengthGrid::default());
        assert!(matches!(
            sed.redshift(-1.0, false),
            Err(PhotometryError::Domain(_))
        ));
    }

    #[test]
    fn test_flux_norm_reproduces_target_mag() {
        let band = r_band();
        for temperature in [3500.0, 5778.0, 12000.0] {
            let mut sed = SpectrumGrid::blackbody(temperature, &WavelengthGrid::default()).unwrap();
            let norm = sed.calc_flux_norm(21.3, &band).unwrap();
            sed.multiply_flux_norm(norm);
            assert_relative_eq!(sed.calc_mag(&band).unwrap(), 21.3, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_flux_norm_no_overlap() {
        let sed = SpectrumGrid::from_flambda(
            Array1::from(vec![300.0, 350.0, 400.0]),
            Array1::from(vec![1.0, 1.0, 1.0]),
        )
        .unwrap();
        assert!(matches!(
            sed.calc_flux_norm(20.0, &r_band()),
            Err(PhotometryError::Domain(_))
        ));
    }

    #[test]
    fn test_calc_mag_on_coarse_grid_resamples_copy() {
        let coarse = WavelengthGrid::new(300.0, 1150.0, 5.0).unwrap();
        let sed = SpectrumGrid::flat(&coarse);
        let before = sed.clone();

        let mag = sed.calc_mag(&r_band()).unwrap();
        assert_relative_eq!(mag, 0.0, epsilon = 1e-9);
        assert_eq!(sed, before);
    }

    #[test]
    fn test_adu_scales_with_exposure_and_gain() {
        let band = r_band();
        let sed = SpectrumGrid::flat(&WavelengthGrid::default());

        let base = sed.calc_adu(&band, 15.0, 1.0, 1.0).unwrap();
        let doubled = sed.calc_adu(&band, 30.0, 1.0, 1.0).unwrap();
        let halved = sed.calc_adu(&band, 15.0, 1.0, 2.0).unwrap();

        assert!(base > 0.0);
        assert_relative_eq!(doubled, 2.0 * base, max_relative = 1e-12);
        assert_relative_eq!(halved, 0.5 * base, max_relative = 1e-12);
    }

    #[test]
    fn test_adu_matches_photon_integral() {
        // A 0 mag flat source through a perfect notch covering 11 samples:
        // N = f_nu / h * Δλ/λ with Δλ = 11 * 0.1 nm
        let grid = WavelengthGrid::default();
        let band = Bandpass::from_notch(599.45, 600.55, 1.0, &grid).unwrap();
        let sed = SpectrumGrid::flat(&grid);

        let adu = sed.calc_adu(&band, 1.0, 1.0, 1.0).unwrap();
        let expected = 3631.0e-23 / PhotometricDefaults::PLANCK * (1.1 / 600.0);
        assert_relative_eq!(adu, expected, max_relative = 1e-3);
    }

    #[test]
    fn test_adu_rejects_bad_gain() {
        let sed = SpectrumGrid::flat(&WavelengthGrid::default());
        assert!(sed.calc_adu(&r_band(), 15.0, 1.0, 0.0).is_err());
        assert!(matches!(
            sed.calc_adu(&r_band(), 15.0, 1.0, f64::NAN),
            Err(PhotometryError::Domain(_))
        ));
    }

    #[test]
    fn test_multiply_flux_norm_preserves_grid() {
        let mut sed = SpectrumGrid::blackbody(5000.0, &WavelengthGrid::default()).unwrap();
        let wavelen = sed.wavelen().clone();
        let mag = sed.calc_mag(&r_band()).unwrap();

        sed.multiply_flux_norm(100.0);

        assert_eq!(sed.wavelen(), &wavelen);
        assert_relative_eq!(sed.calc_mag(&r_band()).unwrap(), mag - 5.0, epsilon = 1e-9);
    }
}
