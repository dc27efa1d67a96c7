//! Physical constants and survey defaults used by the photometry code.
//!
//! Units follow the conventions of the SED and throughput tables: wavelengths
//! in nanometers, f_lambda in ergs/cm²/s/nm and f_nu in Jansky.

/// Constants and default survey parameters
pub struct PhotometricDefaults {}

impl PhotometricDefaults {
    /// Speed of light
    /// Units: 299792458 m/s
    pub const LIGHTSPEED: f64 = 299_792_458.0;

    /// Planck's constant
    /// Units: 6.626068e-27 erg⋅s
    pub const PLANCK: f64 = 6.626068e-27;

    /// Nanometers to meters
    pub const NM2M: f64 = 1.0e-9;

    /// erg/cm²/s/Hz to Jansky
    pub const ERGSETC2JANSKY: f64 = 1.0e23;

    /// AB zero-point flux density in Jansky
    pub const AB_ZERO_POINT_JANSKY: f64 = 3631.0;

    /// Default wavelength grid lower bound in nm
    pub const MIN_WAVELEN: f64 = 300.0;

    /// Default wavelength grid upper bound in nm
    pub const MAX_WAVELEN: f64 = 1150.0;

    /// Default wavelength grid step in nm
    pub const WAVELEN_STEP: f64 = 0.1;

    /// Wavelength of the delta-function normalization bandpass in nm
    pub const IMSIM_WAVELEN: f64 = 500.0;

    /// Single exposure duration in seconds
    pub const EXPTIME: f64 = 15.0;

    /// Exposures combined per visit
    pub const NEXP: u32 = 2;

    /// Effective area of a 6.5 m diameter primary in cm²
    pub const EFFAREA: f64 = std::f64::consts::PI * 325.0 * 325.0;

    /// Electrons per ADU
    pub const GAIN: f64 = 2.3;

    // Read + dark (over 15 s) + other noise add up to the 12.7 e⁻/pixel requirement

    /// Read noise in electrons per pixel per exposure
    pub const READNOISE: f64 = 5.0;

    /// Dark current in electrons per pixel per second
    pub const DARKCURRENT: f64 = 0.2;

    /// Other noise in electrons per pixel per exposure
    pub const OTHERNOISE: f64 = 4.69;

    /// Plate scale in arcseconds per pixel
    pub const PLATESCALE: f64 = 0.2;

    /// Seeing used when no band-specific value applies, in arcseconds
    pub const SEEING: f64 = 0.7;

    /// Default seeing per band in arcseconds
    pub const SEEING_BY_BAND: [(&'static str, f64); 6] = [
        ("u", 0.77),
        ("g", 0.73),
        ("r", 0.70),
        ("i", 0.67),
        ("z", 0.65),
        ("y", 0.63),
    ];

    /// Reference 5-sigma limiting magnitudes for two 15 s exposures
    /// (table 2 of arXiv:0805.2366)
    pub const M5_BY_BAND: [(&'static str, f64); 6] = [
        ("u", 23.68),
        ("g", 24.89),
        ("r", 24.43),
        ("i", 24.00),
        ("z", 24.45),
        ("y", 22.60),
    ];

    /// Reference gamma parameters of the survey SNR model
    pub const GAMMA_BY_BAND: [(&'static str, f64); 6] = [
        ("u", 0.037),
        ("g", 0.038),
        ("r", 0.039),
        ("i", 0.039),
        ("z", 0.040),
        ("y", 0.040),
    ];

    /// Look up the default seeing for a band key
    pub fn seeing(band: &str) -> Option<f64> {
        lookup(&Self::SEEING_BY_BAND, band)
    }

    /// Look up the reference m5 for a band key
    pub fn m5(band: &str) -> Option<f64> {
        lookup(&Self::M5_BY_BAND, band)
    }

    /// Look up the reference gamma for a band key
    pub fn gamma(band: &str) -> Option<f64> {
        lookup(&Self::GAMMA_BY_BAND, band)
    }

    /// AB magnitude zero point: mag = -2.5 log10(f_nu / Jy) - zp
    pub fn zero_point() -> f64 {
        -2.5 * Self::AB_ZERO_POINT_JANSKY.log10()
    }
}

fn lookup(table: &[(&str, f64)], band: &str) -> Option<f64> {
    table
        .iter()
        .find(|(key, _)| *key == band)
        .map(|(_, value)| *value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_band_lookups() {
        assert_eq!(PhotometricDefaults::seeing("r"), Some(0.70));
        assert_eq!(PhotometricDefaults::m5("y"), Some(22.60));
        assert_eq!(PhotometricDefaults::gamma("u"), Some(0.037));
        assert_eq!(PhotometricDefaults::seeing("Q"), None);
    }

    #[test]
    fn test_zero_point_is_ab() {
        assert_relative_eq!(PhotometricDefaults::zero_point(), -8.9, epsilon = 1e-3);
    }

    #[test]
    fn test_default_noise_budget() {
        let total = PhotometricDefaults::READNOISE
            + PhotometricDefaults::DARKCURRENT * PhotometricDefaults::EXPTIME
            + PhotometricDefaults::OTHERNOISE;
        assert_relative_eq!(total, 12.7, epsilon = 0.02);
    }
}
