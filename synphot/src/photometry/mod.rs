//! Synthetic photometry: spectra, bandpasses, magnitudes and survey noise

pub mod bandpass;
pub mod constants;
pub mod error;
pub mod magnitudes;
pub mod matching;
pub mod noise;
pub mod phi;
pub mod spectrum;

pub use bandpass::{load_bandpasses, Bandpass, BandpassSet, THROUGHPUTS_DIR_ENV};
pub use constants::PhotometricDefaults;
pub use error::{PhotometryError, Result};
pub use magnitudes::{many_mag_calc_dict, MagnitudeCalculator, MagnitudeResult};
pub use matching::{calc_basic_colors, calc_mag_norm, de_redden_mags, MagNormSearch};
pub use noise::{
    calc_gamma, calc_instr_noise_sq_electrons, calc_m5, calc_neff, calc_non_source_noise_sq,
    calc_snr_gamma, calc_snr_sed, expected_sky_counts_for_m5, mag_error_from_snr, set_m5,
    NoiseParameters, NonSourceNoise,
};
pub use phi::{build_phi_array, PhiArray};
pub use spectrum::{FluxDensity, SedMetadata, SpectrumGrid, WavelengthGrid};
