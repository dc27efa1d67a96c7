//! Synthetic photometry and survey noise modeling.
//!
//! Spectra ([`photometry::SpectrumGrid`]) are integrated through filter
//! throughputs ([`photometry::Bandpass`]) to give AB magnitudes, fluxes and
//! detector counts. On top of that sit magNorm fitting, colors,
//! de-reddening and the m5 / gamma / SNR survey noise model.

pub mod algo;
pub mod photometry;
