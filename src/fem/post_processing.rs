use super::file_io::write_json;
use crate::StrError;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Holds the time series of volume-averaged results (one entry per load step)
///
/// The averages are taken over the gauge region with n = x-axis.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResultsSeries {
    /// Load factors
    pub load_factor: Vec<f64>,

    /// Average of E·n·n (Green-Lagrange strain)
    pub strain: Vec<f64>,

    /// Average of S·n·n (second Piola-Kirchhoff stress)
    pub stress: Vec<f64>,

    /// Average of P·n·n (plastic strain)
    pub plastic_strain: Vec<f64>,

    /// Average of the isotropic hardening
    pub isotropic_hardening: Vec<f64>,
}

impl ResultsSeries {
    /// Allocates a new (empty) instance
    pub fn new() -> Self {
        ResultsSeries::default()
    }

    /// Returns the number of entries
    pub fn len(&self) -> usize {
        self.load_factor.len()
    }

    /// Appends the results of one load step
    pub fn push(&mut self, load_factor: f64, strain: f64, stress: f64, plastic_strain: f64, isotropic_hardening: f64) {
        self.load_factor.push(load_factor);
        self.strain.push(strain);
        self.stress.push(stress);
        self.plastic_strain.push(plastic_strain);
        self.isotropic_hardening.push(isotropic_hardening);
    }

    /// Reads a JSON file containing this struct
    pub fn read_json<P>(full_path: &P) -> Result<Self, StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        let file = File::open(path).map_err(|_| "cannot open file")?;
        let buffered = BufReader::new(file);
        let series = serde_json::from_reader(buffered).map_err(|_| "cannot parse JSON file")?;
        Ok(series)
    }

    /// Writes a JSON file with this struct
    pub fn write_json<P>(&self, full_path: &P) -> Result<(), StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        write_json(self, full_path)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////
