//! Fitting catalog magnitudes with template spectra

mod test_helpers;

use approx::assert_relative_eq;
use ndarray::{array, Array1};
use synphot::photometry::{
    calc_basic_colors, calc_mag_norm, de_redden_mags, Bandpass, MagNormSearch,
    MagnitudeCalculator, SpectrumGrid, WavelengthGrid,
};
use test_helpers::total_set;

fn calculator() -> MagnitudeCalculator {
    MagnitudeCalculator::from_bandpasses(total_set()).unwrap()
}

/// Observed magnitudes of `sed` redshifted to `z` and normalized to `mag_norm`
fn observe(calc: &MagnitudeCalculator, sed: &SpectrumGrid, z: f64, mag_norm: f64) -> Vec<f64> {
    let mut observed = sed.clone();
    observed.redshift(z, false).unwrap();
    let norm = observed
        .calc_flux_norm(mag_norm, &Bandpass::imsim_default().unwrap())
        .unwrap();
    observed.multiply_flux_norm(norm);
    calc.mag_list(&mut observed).unwrap()
}

#[test]
fn recovers_mag_norm_of_redshifted_blackbody() {
    let calc = calculator();
    let sed = SpectrumGrid::blackbody(6000.0, &WavelengthGrid::default()).unwrap();
    let targets = observe(&calc, &sed, 0.1, 20.0);

    let search = MagNormSearch::default().with_redshift(0.1);
    let found = calc_mag_norm(&targets, &sed, &calc, &search).unwrap().unwrap();
    assert!((found - 20.0).abs() < 0.01, "found {found}");
}

#[test]
fn recovers_mag_norm_with_filter_range_and_missing_band() {
    let calc = calculator();
    let sed = SpectrumGrid::blackbody(6000.0, &WavelengthGrid::default()).unwrap();
    let mut targets = observe(&calc, &sed, 0.1, 20.0);
    targets[3] = f64::NAN;

    let search = MagNormSearch::default()
        .with_redshift(0.1)
        .with_filter_range(vec![1, 2, 3, 4]);
    let found = calc_mag_norm(&targets, &sed, &calc, &search).unwrap().unwrap();
    assert!((found - 20.0).abs() < 0.01, "found {found}");
}

#[test]
fn mag_errors_downweight_outliers() {
    let calc = calculator();
    let sed = SpectrumGrid::blackbody(9000.0, &WavelengthGrid::default()).unwrap();
    let mut targets = observe(&calc, &sed, 0.0, 22.0);
    // A wildly wrong u magnitude with a huge error bar
    targets[0] += 1.0;

    let search = MagNormSearch::default()
        .with_init_band(2)
        .with_mag_errors(vec![100.0, 0.01, 0.01, 0.01, 0.01, 0.01]);
    let found = calc_mag_norm(&targets, &sed, &calc, &search).unwrap().unwrap();
    assert!((found - 22.0).abs() < 0.01, "found {found}");
}

#[test]
fn colors_have_one_fewer_entry_than_bands() {
    let calc = calculator();
    let grid = WavelengthGrid::default();
    let mut spectra: Vec<SpectrumGrid> = [3500.0, 6000.0, 15000.0]
        .iter()
        .map(|t| SpectrumGrid::blackbody(*t, &grid).unwrap())
        .collect();

    let colors = calc_basic_colors(&mut spectra, &calc, false).unwrap();
    assert_eq!(colors.len(), 3);
    for row in &colors {
        assert_eq!(row.len(), calc.n_bands() - 1);
        assert!(row.iter().all(Option::is_some));
    }
    // Hotter stars are bluer in g-r
    let g_r: Vec<f64> = colors.iter().map(|row| row[1].unwrap()).collect();
    assert!(g_r[0] > g_r[1] && g_r[1] > g_r[2]);
}

#[test]
fn de_reddening_is_exact() {
    let mags = array![[21.0, 20.5, 20.2], [19.0, 18.7, 18.6]];
    let ebv = Array1::from(vec![0.05, 0.2]);
    let coeffs = array![3.7, 2.7, 2.1];

    let out = de_redden_mags(&ebv, &mags, &coeffs).unwrap();
    for ((obj, band), value) in out.indexed_iter() {
        assert_relative_eq!(*value, mags[[obj, band]] - ebv[obj] * coeffs[band], epsilon = 0.0);
    }
}
