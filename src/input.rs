//! Common routines for reading model input data.
//!
//! Calibration tables are CSV, the model definition is TOML and the demand/scenario files are
//! JSON maps keyed by period. All readers fail fast with the offending file path in the error
//! chain; no partially loaded model ever reaches the optimiser.
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub mod asset;
pub mod demand;

/// The error message to display for a bad input file
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read a series of type `T`s from a CSV file.
///
/// The file must contain at least one record.
pub fn read_csv<T: DeserializeOwned>(file_path: &Path) -> Result<impl Iterator<Item = T>> {
    let reader = csv::Reader::from_path(file_path).with_context(|| input_err_msg(file_path))?;
    let vec: Vec<T> = reader
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;
    ensure!(
        !vec.is_empty(),
        "CSV file {} cannot be empty",
        file_path.display()
    );

    Ok(vec.into_iter())
}

/// Parse a TOML file at the specified path.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))
}

/// Parse a JSON file at the specified path.
pub fn read_json<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let json_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    serde_json::from_str(&json_str).with_context(|| input_err_msg(file_path))
}

/// Convert a JSON-style map with string period keys into a map keyed by period number.
///
/// The demand and scenario files key their time series by stringified period labels; anything
/// that does not parse as a period number is a fatal input error.
pub fn parse_period_keys(map: &HashMap<String, f64>) -> Result<HashMap<u32, f64>> {
    map.iter()
        .map(|(key, value)| {
            let period: u32 = key
                .parse()
                .with_context(|| format!("Invalid period key '{key}'"))?;
            Ok((period, *value))
        })
        .collect()
}
