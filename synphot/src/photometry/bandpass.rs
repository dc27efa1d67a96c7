//! Filter throughput curves and the normalized response (phi) used for magnitudes

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use ndarray::{Array1, Zip};

use super::constants::PhotometricDefaults;
use super::error::{PhotometryError, Result};
use super::spectrum::{grids_match, resample_array, WavelengthGrid};
use crate::algo::misc::validate_table;

/// Environment variable consulted when no throughput directory is given
pub const THROUGHPUTS_DIR_ENV: &str = "SYNPHOT_THROUGHPUTS_DIR";

/// Prefixes marking comment lines in throughput tables
const COMMENT_PREFIXES: &[char] = &['#', '$', '!'];

/// A system response curve sampled on a uniform wavelength grid
///
/// Construction always resamples the throughput onto a [`WavelengthGrid`] and
/// precomputes phi, the throughput per unit wavelength normalized so that
/// `Σ phi · Δλ = 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bandpass {
    /// Wavelengths in nanometers (nm)
    wavelen: Array1<f64>,

    /// Throughput values (0.0 to 1.0) at each wavelength
    sb: Array1<f64>,

    phi: Array1<f64>,

    wavelen_step: f64,
}

impl Bandpass {
    /// Create a bandpass from a wavelength/throughput table
    ///
    /// # Arguments
    ///
    /// * `wavelengths` - Wavelengths in nanometers, must be in ascending order
    /// * `throughputs` - Throughput values (0.0 to 1.0) for each wavelength
    /// * `grid` - Grid the table is resampled onto; zero outside the table
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The vectors have different lengths or fewer than two entries
    /// - Wavelengths are not in ascending order
    /// - Any throughput value is outside the range [0.0, 1.0]
    /// - The throughput is zero everywhere on the grid
    pub fn from_table(
        wavelengths: Vec<f64>,
        throughputs: Vec<f64>,
        grid: &WavelengthGrid,
    ) -> Result<Self> {
        validate_table(&wavelengths, &throughputs)?;

        if let Some(bad) = throughputs.iter().find(|sb| !(0.0..=1.0).contains(*sb)) {
            return Err(PhotometryError::Domain(format!(
                "Throughput values must be between 0.0 and 1.0, got: {bad}"
            )));
        }

        let target = grid.samples();
        let sb = resample_array(
            &Array1::from(wavelengths),
            &Array1::from(throughputs),
            &target,
        )?;
        Self::on_grid(target, sb)
    }

    /// A top-hat bandpass of constant `efficiency` between two wavelengths
    pub fn from_notch(
        lower_nm: f64,
        upper_nm: f64,
        efficiency: f64,
        grid: &WavelengthGrid,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&efficiency) {
            return Err(PhotometryError::Domain(format!(
                "Notch efficiency must be between 0.0 and 1.0, got: {efficiency}"
            )));
        }

        // Small compared to any grid step, large enough to survive rounding
        let smol = 1e-8;

        let wavelengths = vec![lower_nm - smol, lower_nm, upper_nm, upper_nm + smol];
        let throughputs = vec![0.0, efficiency, efficiency, 0.0];

        Self::from_table(wavelengths, throughputs, grid)
    }

    /// A delta-function bandpass: throughput 1 at the grid sample nearest
    /// `wavelength_nm`, 0 elsewhere. Used as the reference band for
    /// magnitude normalization.
    pub fn imsim(wavelength_nm: f64, grid: &WavelengthGrid) -> Result<Self> {
        let target = grid.samples();
        let last = target[target.len() - 1];
        if !(target[0]..=last).contains(&wavelength_nm) {
            return Err(PhotometryError::Domain(format!(
                "Delta bandpass at {wavelength_nm} nm lies outside the grid [{}, {last}]",
                target[0]
            )));
        }

        let idx = ((wavelength_nm - grid.min) / grid.step).round() as usize;
        let mut sb = Array1::zeros(target.len());
        sb[idx.min(target.len() - 1)] = 1.0;
        Self::on_grid(target, sb)
    }

    /// The 500 nm delta bandpass on the default grid
    pub fn imsim_default() -> Result<Self> {
        Self::imsim(PhotometricDefaults::IMSIM_WAVELEN, &WavelengthGrid::default())
    }

    /// Read a two-column (wavelength nm, throughput) text table
    ///
    /// Blank lines and lines starting with `#`, `$` or `!` are skipped; extra
    /// columns are ignored and rows are sorted by wavelength before use.
    pub fn read_throughput(path: &Path, grid: &WavelengthGrid) -> Result<Self> {
        let (wavelengths, throughputs) = parse_throughput_table(path)?;
        debug!(
            "Read {} throughput rows from {}",
            wavelengths.len(),
            path.display()
        );
        Self::from_table(wavelengths, throughputs, grid)
    }

    /// Product of two throughput curves on this bandpass's grid
    pub fn multiply(&self, other: &Bandpass) -> Result<Self> {
        let other_sb = if grids_match(&self.wavelen, &other.wavelen) {
            other.sb.clone()
        } else {
            resample_array(&other.wavelen, &other.sb, &self.wavelen)?
        };
        Self::on_grid(self.wavelen.clone(), &self.sb * &other_sb)
    }

    /// Resample this throughput onto another uniform wavelength axis
    pub fn resample_onto(&self, target: &Array1<f64>) -> Result<Self> {
        if grids_match(&self.wavelen, target) {
            return Ok(self.clone());
        }
        let sb = resample_array(&self.wavelen, &self.sb, target)?;
        Self::on_grid(target.clone(), sb)
    }

    pub fn wavelen(&self) -> &Array1<f64> {
        &self.wavelen
    }

    /// Throughput (0.0 to 1.0) at each wavelength
    pub fn sb(&self) -> &Array1<f64> {
        &self.sb
    }

    /// Normalized response, `Σ phi · Δλ = 1`
    pub fn phi(&self) -> &Array1<f64> {
        &self.phi
    }

    /// Spacing of the wavelength grid in nm
    pub fn wavelen_step(&self) -> f64 {
        self.wavelen_step
    }

    /// Whether this bandpass must be resampled to match `target`
    pub fn needs_resample(&self, target: &Array1<f64>) -> bool {
        !grids_match(&self.wavelen, target)
    }

    /// Phi-weighted mean wavelength in nm
    pub fn effective_wavelength(&self) -> f64 {
        self.wavelen.dot(&self.phi) / self.phi.sum()
    }

    fn on_grid(wavelen: Array1<f64>, sb: Array1<f64>) -> Result<Self> {
        if wavelen.len() < 2 {
            return Err(PhotometryError::shape("bandpass grid", 2, wavelen.len()));
        }
        let wavelen_step = wavelen[1] - wavelen[0];

        let mut phi = Zip::from(&sb)
            .and(&wavelen)
            .map_collect(|&sb, &wl| sb / wl);
        let norm = phi.sum() * wavelen_step;
        if !norm.is_finite() || norm <= 0.0 {
            return Err(PhotometryError::Domain(
                "Bandpass has zero throughput on its wavelength grid".to_string(),
            ));
        }
        phi /= norm;

        Ok(Self {
            wavelen,
            sb,
            phi,
            wavelen_step,
        })
    }
}

/// Bandpasses keyed by band name, remembering insertion order
#[derive(Debug, Clone, Default)]
pub struct BandpassSet {
    keys: Vec<String>,
    bandpasses: HashMap<String, Bandpass>,
}

impl BandpassSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a band; replacing keeps the original position
    pub fn insert(&mut self, key: impl Into<String>, bandpass: Bandpass) {
        let key = key.into();
        if self.bandpasses.insert(key.clone(), bandpass).is_none() {
            self.keys.push(key);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Bandpass> {
        self.bandpasses.get(key)
    }

    /// Keys in insertion order
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bandpass)> {
        self.keys
            .iter()
            .filter_map(|key| self.bandpasses.get(key).map(|bp| (key.as_str(), bp)))
    }

    /// Look up several bands in the given order
    pub fn ordered<S: AsRef<str>>(&self, keys: &[S]) -> Result<Vec<&Bandpass>> {
        keys.iter()
            .map(|key| {
                let key = key.as_ref();
                self.get(key)
                    .ok_or_else(|| PhotometryError::UnknownBand(key.to_string()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Bandpass)> for BandpassSet {
    fn from_iter<I: IntoIterator<Item = (K, Bandpass)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (key, bandpass) in iter {
            set.insert(key, bandpass);
        }
        set
    }
}

/// Read `<dir>/<filename_root><key>.dat` for each key.
///
/// When `source_dir` is `None` the directory comes from the
/// `SYNPHOT_THROUGHPUTS_DIR` environment variable.
///
/// # Errors
///
/// - [`PhotometryError::Configuration`] if no directory is given and the
///   environment variable is unset
/// - [`PhotometryError::MissingResource`] if the directory or a band file
///   does not exist
pub fn load_bandpasses<S: AsRef<str>>(
    keys: &[S],
    source_dir: Option<&Path>,
    filename_root: &str,
    grid: &WavelengthGrid,
) -> Result<BandpassSet> {
    let dir = match source_dir {
        Some(dir) => dir.to_path_buf(),
        None => throughputs_dir_from(std::env::var_os(THROUGHPUTS_DIR_ENV))?,
    };

    if !dir.is_dir() {
        return Err(PhotometryError::MissingResource(dir));
    }

    let mut set = BandpassSet::new();
    for key in keys {
        let key = key.as_ref();
        let path = dir.join(format!("{filename_root}{key}.dat"));
        let bandpass = Bandpass::read_throughput(&path, grid)?;
        set.insert(key, bandpass);
    }

    info!(
        "Loaded {} bandpasses from {} (root '{}')",
        set.len(),
        dir.display(),
        filename_root
    );
    Ok(set)
}

fn throughputs_dir_from(value: Option<OsString>) -> Result<PathBuf> {
    match value {
        Some(value) if !value.is_empty() => Ok(PathBuf::from(value)),
        _ => Err(PhotometryError::Configuration(format!(
            "No throughput directory given and {THROUGHPUTS_DIR_ENV} is not set"
        ))),
    }
}

fn parse_throughput_table(path: &Path) -> Result<(Vec<f64>, Vec<f64>)> {
    if !path.is_file() {
        return Err(PhotometryError::MissingResource(path.to_path_buf()));
    }

    let contents = fs::read_to_string(path).map_err(|source| PhotometryError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut rows = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(COMMENT_PREFIXES) {
            continue;
        }

        let mut columns = line.split_whitespace();
        let wavelength = parse_column(columns.next(), path, idx + 1, "wavelength")?;
        let throughput = parse_column(columns.next(), path, idx + 1, "throughput")?;
        rows.push((wavelength, throughput));
    }

    rows.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(rows.into_iter().unzip())
}

fn parse_column(token: Option<&str>, path: &Path, line: usize, column: &str) -> Result<f64> {
    let parse_error = |message: String| PhotometryError::Parse {
        path: path.to_path_buf(),
        line,
        message,
    };

    let token = token.ok_or_else(|| parse_error(format!("missing {column} column")))?;
    token
        .parse::<f64>()
        .map_err(|e| parse_error(format!("invalid {column} '{token}': {e}")))
}
