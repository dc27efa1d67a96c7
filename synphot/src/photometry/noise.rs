//! Survey noise model: sky background, instrument noise, m5, gamma and SNR
//!
//! Counts are in ADU unless a name says electrons. Sky spectra are surface
//! brightnesses: running [`SpectrumGrid::calc_adu`] through the hardware
//! bandpass gives counts per square arcsecond, which the plate scale turns into
//! counts per pixel. The 5-sigma relations follow equation 5 of the LSST
//! overview paper (arXiv:0805.2366).

use std::fs;
use std::path::Path;

use log::{debug, warn};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::bandpass::Bandpass;
use super::constants::PhotometricDefaults;
use super::error::{PhotometryError, Result};
use super::spectrum::{SpectrumGrid, WavelengthGrid};

/// Signal to noise that defines the limiting magnitude
const M5_SNR: f64 = 5.0;

/// Systematic floor of the gamma SNR model, in magnitudes squared
const GAMMA_SYSTEMATIC: f64 = 0.04;

/// Exposure, detector and site parameters shared by every noise calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseParameters {
    /// Duration of a single exposure in seconds
    pub exposure_time: f64,

    /// Number of exposures combined per visit
    pub n_exposures: u32,

    /// Electrons per pixel per exposure
    pub read_noise: f64,

    /// Electrons per pixel per second
    pub dark_current: f64,

    /// Electrons per pixel per exposure
    pub other_noise: f64,

    /// FWHM of the PSF in arcseconds
    pub seeing: f64,

    /// Arcseconds per pixel
    pub plate_scale: f64,

    /// Electrons per ADU
    pub gain: f64,

    /// Collecting area in cm²
    pub effective_area: f64,
}

impl Default for NoiseParameters {
    fn default() -> Self {
        Self {
            exposure_time: PhotometricDefaults::EXPTIME,
            n_exposures: PhotometricDefaults::NEXP,
            read_noise: PhotometricDefaults::READNOISE,
            dark_current: PhotometricDefaults::DARKCURRENT,
            other_noise: PhotometricDefaults::OTHERNOISE,
            seeing: PhotometricDefaults::SEEING,
            plate_scale: PhotometricDefaults::PLATESCALE,
            gain: PhotometricDefaults::GAIN,
            effective_area: PhotometricDefaults::EFFAREA,
        }
    }
}

impl NoiseParameters {
    /// Defaults with the standard seeing for `band` (falls back to 0.7")
    pub fn for_band(band: &str) -> Self {
        Self {
            seeing: PhotometricDefaults::seeing(band).unwrap_or(PhotometricDefaults::SEEING),
            ..Self::default()
        }
    }

    pub fn with_exposure(mut self, exposure_time: f64, n_exposures: u32) -> Self {
        self.exposure_time = exposure_time;
        self.n_exposures = n_exposures;
        self
    }

    pub fn with_seeing(mut self, seeing: f64) -> Self {
        self.seeing = seeing;
        self
    }

    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_plate_scale(mut self, plate_scale: f64) -> Self {
        self.plate_scale = plate_scale;
        self
    }

    pub fn with_effective_area(mut self, effective_area: f64) -> Self {
        self.effective_area = effective_area;
        self
    }

    /// Set read, dark and other noise together
    pub fn with_detector_noise(mut self, read_noise: f64, dark_current: f64, other_noise: f64) -> Self {
        self.read_noise = read_noise;
        self.dark_current = dark_current;
        self.other_noise = other_noise;
        self
    }

    /// Integration time summed over all exposures in seconds
    pub fn total_exposure_time(&self) -> f64 {
        self.exposure_time * self.n_exposures as f64
    }

    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json)
            .map_err(|e| PhotometryError::Configuration(format!("Invalid noise parameters: {e}")))?;
        params.validate()?;
        Ok(params)
    }

    /// Read a JSON configuration file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(PhotometryError::MissingResource(path.to_path_buf()));
        }
        let json = fs::read_to_string(path).map_err(|source| PhotometryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Check that every parameter is physically meaningful
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("exposure_time", self.exposure_time),
            ("seeing", self.seeing),
            ("plate_scale", self.plate_scale),
            ("gain", self.gain),
            ("effective_area", self.effective_area),
        ];
        if let Some((name, value)) = positive.iter().find(|(_, v)| !v.is_finite() || *v <= 0.0) {
            return Err(PhotometryError::Domain(format!(
                "{name} must be positive, got: {value}"
            )));
        }

        let non_negative = [
            ("read_noise", self.read_noise),
            ("dark_current", self.dark_current),
            ("other_noise", self.other_noise),
        ];
        if let Some((name, value)) = non_negative
            .iter()
            .find(|(_, v)| !v.is_finite() || *v < 0.0)
        {
            return Err(PhotometryError::Domain(format!(
                "{name} must be non-negative, got: {value}"
            )));
        }

        if self.n_exposures == 0 {
            return Err(PhotometryError::Domain(
                "n_exposures must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Breakdown of the per-source noise that does not come from the source
///
/// All `*_sq` fields are variances in ADU².
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonSourceNoise {
    /// `neff * (sky + instrument + sky measurement)`
    pub total_noise_sq: f64,

    /// Instrument noise per pixel
    pub instr_noise_sq: f64,

    /// Sky Poisson noise per pixel
    pub sky_noise_sq: f64,

    /// Sky-subtraction noise per pixel; not modeled, always zero
    pub sky_measurement_noise_sq: f64,

    /// Sky counts per pixel in ADU
    pub sky_counts: f64,

    /// Effective number of pixels in the PSF footprint
    pub neff: f64,
}

/// Effective number of pixels for a double-Gaussian PSF
///
/// neff = 2.266 (seeing / platescale)²
pub fn calc_neff(seeing: f64, plate_scale: f64) -> f64 {
    2.266 * (seeing / plate_scale).powi(2)
}

/// Instrument noise variance per pixel, in electrons², over all exposures
pub fn calc_instr_noise_sq_electrons(params: &NoiseParameters) -> f64 {
    let nexp = params.n_exposures as f64;
    nexp * params.read_noise.powi(2)
        + params.dark_current * params.exposure_time * nexp
        + nexp * params.other_noise.powi(2)
}

/// Background noise a point source sees, summed over its PSF footprint
pub fn calc_non_source_noise_sq(
    sky: &SpectrumGrid,
    hardware: &Bandpass,
    params: &NoiseParameters,
) -> Result<NonSourceNoise> {
    params.validate()?;

    let sky_counts = sky.calc_adu(
        hardware,
        params.total_exposure_time(),
        params.effective_area,
        params.gain,
    )? * params.plate_scale.powi(2);

    let instr_noise_sq = calc_instr_noise_sq_electrons(params) / params.gain.powi(2);
    let sky_noise_sq = sky_counts / params.gain;
    let sky_measurement_noise_sq = 0.0;
    let neff = calc_neff(params.seeing, params.plate_scale);

    Ok(NonSourceNoise {
        total_noise_sq: neff * (sky_noise_sq + instr_noise_sq + sky_measurement_noise_sq),
        instr_noise_sq,
        sky_noise_sq,
        sky_measurement_noise_sq,
        sky_counts,
        neff,
    })
}

/// Sky counts per pixel (ADU) that make a source of magnitude `m5` a
/// 5-sigma detection through `total`.
///
/// The result is negative when instrument noise alone already exceeds the
/// 5-sigma budget. That sky level is unphysical but still reproduces `m5`
/// through [`calc_m5`], so it is returned with a warning.
///
/// # Errors
///
/// [`PhotometryError::Domain`] if the source is too faint for any noise
/// budget, i.e. `counts²/25 - counts/gain <= 0`.
pub fn expected_sky_counts_for_m5(m5: f64, total: &Bandpass, params: &NoiseParameters) -> Result<f64> {
    params.validate()?;

    let counts = source_counts_at(m5, total, params)?;
    let neff = calc_neff(params.seeing, params.plate_scale);
    let instr_noise_sq = calc_instr_noise_sq_electrons(params) / params.gain.powi(2);

    let n_sigma_sq = counts * counts / (M5_SNR * M5_SNR) - counts / params.gain;
    if n_sigma_sq.is_nan() || n_sigma_sq <= 0.0 {
        return Err(PhotometryError::Domain(format!(
            "m5 = {m5} is unreachable: {counts:.3} ADU from the source leave no noise budget \
             at 5 sigma"
        )));
    }

    let sky_noise = n_sigma_sq / neff - instr_noise_sq;
    let sky_counts = sky_noise * params.gain;
    if sky_counts < 0.0 {
        warn!(
            "Sky counts for m5 = {m5} are negative ({sky_counts:.3} ADU/pixel): \
             instrument noise alone exceeds the 5-sigma budget"
        );
    }
    Ok(sky_counts)
}

/// A copy of `sky` rescaled so that [`calc_m5`] returns `m5`.
///
/// `total` is the full system throughput (hardware × atmosphere) and
/// `hardware` the instrument alone; the sky is seen only through the latter.
/// When the required sky level is negative the copy is scaled by a negative
/// factor; see [`expected_sky_counts_for_m5`].
pub fn set_m5(
    m5: f64,
    sky: &SpectrumGrid,
    total: &Bandpass,
    hardware: &Bandpass,
    params: &NoiseParameters,
) -> Result<SpectrumGrid> {
    let target_counts = expected_sky_counts_for_m5(m5, total, params)?;

    let current_counts = sky.calc_adu(
        hardware,
        params.total_exposure_time(),
        params.effective_area,
        params.gain,
    )? * params.plate_scale.powi(2);
    if current_counts.is_nan() || current_counts <= 0.0 {
        return Err(PhotometryError::Domain(
            "Sky spectrum produces no counts through the hardware bandpass".to_string(),
        ));
    }

    let mut scaled = sky.clone();
    scaled.multiply_flux_norm(target_counts / current_counts);
    debug!(
        "Scaled sky by {:.4e} to reach m5 = {m5} ({target_counts:.2} ADU/pixel)",
        target_counts / current_counts
    );
    Ok(scaled)
}

/// Magnitude of a flat-spectrum source detected at 5 sigma against `sky`
pub fn calc_m5(
    sky: &SpectrumGrid,
    total: &Bandpass,
    hardware: &Bandpass,
    params: &NoiseParameters,
) -> Result<f64> {
    let noise = calc_non_source_noise_sq(sky, hardware, params)?;
    let gain = params.gain;
    let snr_sq = M5_SNR * M5_SNR;

    let counts_5sigma = snr_sq / (2.0 * gain)
        + (snr_sq * snr_sq / (4.0 * gain * gain) + snr_sq * noise.total_noise_sq).sqrt();

    let mut source = SpectrumGrid::flat(&WavelengthGrid::default());
    let counts_flat = source.calc_adu(
        total,
        params.total_exposure_time(),
        params.effective_area,
        gain,
    )?;
    if counts_flat.is_nan() || counts_flat <= 0.0 {
        return Err(PhotometryError::Domain(
            "Total bandpass collects no counts from a flat source".to_string(),
        ));
    }

    source.multiply_flux_norm(counts_5sigma / counts_flat);
    source.calc_mag(total)
}

/// The gamma parameter of the SNR model for a band with limiting magnitude `m5`
///
/// gamma = 0.04 - 1 / (counts · gain), counts from a flat source at m5
pub fn calc_gamma(bandpass: &Bandpass, m5: f64, params: &NoiseParameters) -> Result<f64> {
    params.validate()?;
    let counts = source_counts_at(m5, bandpass, params)?;
    Ok(GAMMA_SYSTEMATIC - 1.0 / (counts * params.gain))
}

/// SNR of many objects from their fluxes and each band's m5 and gamma
///
/// `fluxes[[band, object]]` are in the same units as `10^(-0.4 m)` (maggies).
/// When `gamma` is `None` it is computed per band with [`calc_gamma`]; the
/// gamma values used are returned next to the SNR array.
///
/// σ² = (0.04 - γ)·x + γ·x² (+ sig2sys), x = 10^(-0.4 m5) / flux, SNR = 1/σ
pub fn calc_snr_gamma(
    fluxes: &Array2<f64>,
    bandpasses: &[&Bandpass],
    m5: &[f64],
    gamma: Option<&[f64]>,
    sig2sys: Option<f64>,
    params: &NoiseParameters,
) -> Result<(Array2<f64>, Vec<f64>)> {
    let n_bands = bandpasses.len();
    if fluxes.nrows() != n_bands {
        return Err(PhotometryError::shape("flux rows vs bandpasses", n_bands, fluxes.nrows()));
    }
    if m5.len() != n_bands {
        return Err(PhotometryError::shape("m5 values vs bandpasses", n_bands, m5.len()));
    }

    let gamma = match gamma {
        Some(gamma) if gamma.len() != n_bands => {
            return Err(PhotometryError::shape(
                "gamma values vs bandpasses",
                n_bands,
                gamma.len(),
            ))
        }
        Some(gamma) => gamma.to_vec(),
        None => bandpasses
            .iter()
            .zip(m5)
            .map(|(bandpass, &m5)| calc_gamma(bandpass, m5, params))
            .collect::<Result<Vec<_>>>()?,
    };
    let sig2sys = sig2sys.unwrap_or(0.0);

    let mut snr = Array2::zeros(fluxes.raw_dim());
    for (band, (mut snr_row, flux_row)) in snr.outer_iter_mut().zip(fluxes.outer_iter()).enumerate() {
        let m5_flux = 10f64.powf(-0.4 * m5[band]);
        let g = gamma[band];
        snr_row.zip_mut_with(&flux_row, |snr, &flux| {
            let ratio = m5_flux / flux;
            let sigma_sq = (GAMMA_SYSTEMATIC - g) * ratio + g * ratio * ratio + sig2sys;
            *snr = 1.0 / sigma_sq.sqrt();
        });
    }

    Ok((snr, gamma))
}

/// SNR of a specific source spectrum against the full noise budget
///
/// SNR = counts / sqrt(counts / gain + neff·(sky + instrument))
pub fn calc_snr_sed(
    source: &SpectrumGrid,
    total: &Bandpass,
    sky: &SpectrumGrid,
    hardware: &Bandpass,
    params: &NoiseParameters,
) -> Result<f64> {
    let noise = calc_non_source_noise_sq(sky, hardware, params)?;
    let counts = source.calc_adu(
        total,
        params.total_exposure_time(),
        params.effective_area,
        params.gain,
    )?;
    Ok(counts / (counts / params.gain + noise.total_noise_sq).sqrt())
}

/// Magnitude uncertainty implied by a signal to noise ratio
pub fn mag_error_from_snr(snr: f64) -> f64 {
    2.5 * (1.0 + 1.0 / snr).log10()
}

/// ADU collected from a flat source normalized to `mag` in `bandpass`
fn source_counts_at(mag: f64, bandpass: &Bandpass, params: &NoiseParameters) -> Result<f64> {
    let mut flat = SpectrumGrid::flat(&WavelengthGrid::default());
    let norm = flat.calc_flux_norm(mag, bandpass)?;
    flat.multiply_flux_norm(norm);
    flat.calc_adu(
        bandpass,
        params.total_exposure_time(),
        params.effective_area,
        params.gain,
    )
}
