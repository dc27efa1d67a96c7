//! Limiting-magnitude calculator for a set of survey bandpasses
//!
//! For each band this scales a flat sky spectrum so that a 5-sigma point source
//! has the requested m5, then reports the implied sky counts per pixel, the m5
//! recovered from that sky, and the gamma parameter of the SNR model.
//!
//! Throughput tables are read from `<dir>/<root><band>.dat`, with the directory
//! taken from `--throughputs-dir` or the `SYNPHOT_THROUGHPUTS_DIR` environment
//! variable.

use std::path::PathBuf;

use clap::Parser;
use log::{info, warn};
use synphot::photometry::{
    calc_gamma, calc_m5, calc_non_source_noise_sq, load_bandpasses, set_m5, Bandpass,
    BandpassSet, NoiseParameters, PhotometricDefaults, SpectrumGrid, WavelengthGrid,
};

#[derive(Parser, Debug)]
#[command(
    name = "m5 Calculator",
    about = "Calculates sky counts, m5 and gamma per band from throughput tables",
    long_about = None
)]
struct Args {
    /// Directory holding the throughput tables (defaults to $SYNPHOT_THROUGHPUTS_DIR)
    #[arg(long)]
    throughputs_dir: Option<PathBuf>,

    /// Filename prefix of the total (hardware × atmosphere) throughputs
    #[arg(long, default_value = "total_")]
    filter_root: String,

    /// Filename prefix of the hardware-only throughputs (defaults to the totals)
    #[arg(long)]
    hardware_root: Option<String>,

    /// Bands to process, comma separated
    #[arg(long, value_delimiter = ',', default_value = "u,g,r,i,z,y")]
    bands: Vec<String>,

    /// Target m5 for every band (defaults to the per-band reference values)
    #[arg(long)]
    m5: Option<f64>,

    /// JSON file overriding noise parameters
    #[arg(long)]
    config: Option<PathBuf>,
}

struct BandReport {
    band: String,
    effective_wavelength: f64,
    m5_target: f64,
    sky_counts: f64,
    m5_recovered: f64,
    gamma: f64,
}

fn analyze_band(
    band: &str,
    m5_target: f64,
    total: &Bandpass,
    hardware: &Bandpass,
    params: &NoiseParameters,
) -> synphot::photometry::Result<BandReport> {
    let flat_sky = SpectrumGrid::flat(&WavelengthGrid::default());
    let sky = set_m5(m5_target, &flat_sky, total, hardware, params)?;
    let noise = calc_non_source_noise_sq(&sky, hardware, params)?;

    Ok(BandReport {
        band: band.to_string(),
        effective_wavelength: total.effective_wavelength(),
        m5_target,
        sky_counts: noise.sky_counts,
        m5_recovered: calc_m5(&sky, total, hardware, params)?,
        gamma: calc_gamma(total, m5_target, params)?,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let grid = WavelengthGrid::default();
    let dir = args.throughputs_dir.as_deref();

    let totals = load_bandpasses(&args.bands[..], dir, &args.filter_root, &grid)?;
    let hardware: BandpassSet = match &args.hardware_root {
        Some(root) => load_bandpasses(&args.bands[..], dir, root, &grid)?,
        None => totals.clone(),
    };

    let base_params = match &args.config {
        Some(path) => {
            info!("Loading noise parameters from {}", path.display());
            Some(NoiseParameters::load(path)?)
        }
        None => None,
    };

    println!("m5 Calculator");
    println!("=============");
    println!();

    let mut reports = Vec::new();
    for band in &args.bands {
        let Some(m5_target) = args.m5.or_else(|| PhotometricDefaults::m5(band)) else {
            warn!("No reference m5 for band '{band}' and no --m5 given; skipping");
            continue;
        };

        let params = base_params.unwrap_or_else(|| NoiseParameters::for_band(band));
        let (Some(total), Some(hw)) = (totals.get(band), hardware.get(band)) else {
            warn!("Band '{band}' missing from the loaded throughputs; skipping");
            continue;
        };

        match analyze_band(band, m5_target, total, hw, &params) {
            Ok(report) => reports.push(report),
            Err(e) => warn!("Band '{band}': {e}"),
        }
    }

    println!(
        "{:<6} {:>10} {:>10} {:>14} {:>12} {:>8}",
        "Band", "λeff (nm)", "m5 target", "Sky (ADU/pix)", "m5 (calc)", "gamma"
    );
    println!("{:-<65}", "");
    for report in &reports {
        println!(
            "{:<6} {:>10.1} {:>10.2} {:>14.2} {:>12.3} {:>8.4}",
            report.band,
            report.effective_wavelength,
            report.m5_target,
            report.sky_counts,
            report.m5_recovered,
            report.gamma
        );
    }

    Ok(())
}
