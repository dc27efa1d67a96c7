//! Shared fixtures: a synthetic ugrizy system with a smooth atmosphere
#![allow(dead_code)]

use synphot::photometry::{Bandpass, BandpassSet, SpectrumGrid, WavelengthGrid};

/// Band key, lower and upper edge in nm
pub const SURVEY_BANDS: [(&str, f64, f64); 6] = [
    ("u", 320.0, 400.0),
    ("g", 400.0, 550.0),
    ("r", 550.0, 690.0),
    ("i", 690.0, 820.0),
    ("z", 820.0, 920.0),
    ("y", 920.0, 1050.0),
];

pub fn band_keys() -> Vec<&'static str> {
    SURVEY_BANDS.iter().map(|(key, _, _)| *key).collect()
}

/// Instrument-only throughputs
pub fn hardware_set() -> BandpassSet {
    let grid = WavelengthGrid::default();
    SURVEY_BANDS
        .iter()
        .map(|&(key, lo, hi)| (key, Bandpass::from_notch(lo, hi, 0.5, &grid).unwrap()))
        .collect()
}

/// Transmission rising from 0.6 in the UV to 0.95 in the near IR
pub fn atmosphere() -> Bandpass {
    Bandpass::from_table(
        vec![300.0, 1150.0],
        vec![0.6, 0.95],
        &WavelengthGrid::default(),
    )
    .unwrap()
}

/// Hardware × atmosphere
pub fn total_set() -> BandpassSet {
    let atmosphere = atmosphere();
    hardware_set()
        .iter()
        .map(|(key, bp)| (key.to_string(), bp.multiply(&atmosphere).unwrap()))
        .collect()
}

/// A reddish sky background surface brightness
pub fn sky() -> SpectrumGrid {
    SpectrumGrid::blackbody(4500.0, &WavelengthGrid::default()).unwrap()
}
