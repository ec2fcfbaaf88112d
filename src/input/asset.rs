//! Code for reading asset calibration tables from CSV files.
//!
//! Operating curves are keyed by calibration point (1 to 3); storage and grid tables are keyed by
//! a `min`/`max` limit label. A missing row or column is a fatal input error.
use super::*;
use crate::asset::{CURVE_POINTS, GridLimits, OperatingCurve};
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use std::path::Path;

/// A limit label keying a row of a storage or grid table
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, SerializeLabeledStringEnum, DeserializeLabeledStringEnum)]
pub enum Limit {
    /// Lower limit
    #[string = "min"]
    Min,
    /// Upper limit
    #[string = "max"]
    Max,
}

/// A row of an operating-curve CSV file
#[derive(Deserialize, PartialEq, Debug)]
struct CurveRow {
    /// Calibration point index (1-based)
    point: usize,
    heat: f64,
    eta_th: f64,
    eta_el: Option<f64>,
}

/// Read a three-point operating curve from a CSV file.
///
/// # Arguments
///
/// * `file_path` - Path to the calibration CSV file
/// * `has_power` - Whether the asset is a CHP (requires the `eta_el` column)
pub fn read_operating_curve(file_path: &Path, has_power: bool) -> Result<OperatingCurve> {
    read_operating_curve_from_iter(read_csv(file_path)?, has_power)
        .with_context(|| input_err_msg(file_path))
}

/// Assemble an operating curve from an iterator of rows.
fn read_operating_curve_from_iter<I>(iter: I, has_power: bool) -> Result<OperatingCurve>
where
    I: Iterator<Item = CurveRow>,
{
    let mut heat = [f64::NAN; CURVE_POINTS];
    let mut eta_th = [f64::NAN; CURVE_POINTS];
    let mut eta_el = [f64::NAN; CURVE_POINTS];
    let mut seen = [false; CURVE_POINTS];

    for row in iter {
        let idx = row
            .point
            .checked_sub(1)
            .filter(|idx| *idx < CURVE_POINTS)
            .with_context(|| {
                format!(
                    "Calibration point must be between 1 and {CURVE_POINTS} (got {})",
                    row.point
                )
            })?;
        ensure!(!seen[idx], "Duplicate calibration point {}", row.point);
        seen[idx] = true;

        heat[idx] = row.heat;
        eta_th[idx] = row.eta_th;
        if has_power {
            eta_el[idx] = row
                .eta_el
                .with_context(|| format!("Missing eta_el for calibration point {}", row.point))?;
        }
    }

    ensure!(
        seen.iter().all(|seen| *seen),
        "Operating curve requires all {CURVE_POINTS} calibration points"
    );

    OperatingCurve::from_calibration(heat, eta_th, has_power.then_some(eta_el))
}

/// Content and flow limits read from the heat storage CSV file.
#[derive(PartialEq, Debug)]
pub struct StorageTable {
    /// Minimum stored heat
    pub content_min: f64,
    /// Maximum stored heat
    pub content_max: f64,
    /// Maximum charge flow per period
    pub charge_max: f64,
    /// Maximum discharge flow per period
    pub discharge_max: f64,
}

/// A row of the heat storage CSV file
#[derive(Deserialize, PartialEq, Debug)]
struct StorageRow {
    limit: Limit,
    content: f64,
    charge: f64,
    discharge: f64,
}

/// Read the heat storage limits table from a CSV file.
pub fn read_storage_table(file_path: &Path) -> Result<StorageTable> {
    let mut min = None;
    let mut max = None;
    for row in read_csv::<StorageRow>(file_path)? {
        let slot = match row.limit {
            Limit::Min => &mut min,
            Limit::Max => &mut max,
        };
        ensure!(
            slot.replace(row).is_none(),
            "Duplicate storage limit row in {}",
            file_path.display()
        );
    }

    let min = min.with_context(|| format!("Missing 'min' row in {}", file_path.display()))?;
    let max = max.with_context(|| format!("Missing 'max' row in {}", file_path.display()))?;

    Ok(StorageTable {
        content_min: min.content,
        content_max: max.content,
        charge_max: max.charge,
        discharge_max: max.discharge,
    })
}

/// A row of a grid limits CSV file
#[derive(Deserialize, PartialEq, Debug)]
struct GridRow {
    limit: Limit,
    flow: f64,
}

/// Read a grid connection's flow limit from a CSV file.
///
/// Only the `max` row is used; a `min` row, if present, must be zero (the base model has no
/// must-run grid flows).
pub fn read_grid_limits(file_path: &Path) -> Result<GridLimits> {
    let mut max_flow = None;
    for row in read_csv::<GridRow>(file_path)? {
        match row.limit {
            Limit::Max => {
                ensure!(
                    max_flow.replace(row.flow).is_none(),
                    "Duplicate 'max' row in {}",
                    file_path.display()
                );
            }
            Limit::Min => ensure!(
                row.flow == 0.0,
                "Grid 'min' flow must be zero in {}",
                file_path.display()
            ),
        }
    }

    let max_flow =
        max_flow.with_context(|| format!("Missing 'max' row in {}", file_path.display()))?;
    GridLimits { max_flow }.validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let file_path = dir.join(name);
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
        file_path
    }

    #[test]
    fn test_read_operating_curve_chp() {
        let dir = tempdir().unwrap();
        let file_path = write_file(
            dir.path(),
            "chp.csv",
            "point,heat,eta_th,eta_el\n1,10,0.5,0.25\n3,70,0.55,0.38\n2,40,0.57,0.36",
        );

        let curve = read_operating_curve(&file_path, true).unwrap();
        assert_eq!(curve.heat, [10.0, 40.0, 70.0]);
        assert_approx_eq!(f64, curve.gas[0], 20.0);
        assert!(curve.has_power());
    }

    #[test]
    fn test_read_operating_curve_boiler_ignores_eta_el() {
        let dir = tempdir().unwrap();
        let file_path = write_file(
            dir.path(),
            "boiler.csv",
            "point,heat,eta_th\n1,20,0.9\n2,60,0.92\n3,100,0.9",
        );

        let curve = read_operating_curve(&file_path, false).unwrap();
        assert!(!curve.has_power());
    }

    #[test]
    fn test_read_operating_curve_missing_point() {
        let dir = tempdir().unwrap();
        let file_path = write_file(
            dir.path(),
            "chp.csv",
            "point,heat,eta_th,eta_el\n1,10,0.5,0.25\n2,40,0.57,0.36",
        );

        assert!(read_operating_curve(&file_path, true).is_err());
    }

    #[test]
    fn test_read_storage_table() {
        let dir = tempdir().unwrap();
        let file_path = write_file(
            dir.path(),
            "heat_storage.csv",
            "limit,content,charge,discharge\nmin,0,0,0\nmax,200,50,50",
        );

        let table = read_storage_table(&file_path).unwrap();
        assert_eq!(
            table,
            StorageTable {
                content_min: 0.0,
                content_max: 200.0,
                charge_max: 50.0,
                discharge_max: 50.0
            }
        );
    }

    #[test]
    fn test_read_grid_limits() {
        let dir = tempdir().unwrap();
        let file_path = write_file(dir.path(), "power_grid.csv", "limit,flow\nmax,500");
        assert_eq!(
            read_grid_limits(&file_path).unwrap(),
            GridLimits { max_flow: 500.0 }
        );

        let file_path = write_file(dir.path(), "bad_grid.csv", "limit,flow\nmin,1\nmax,500");
        assert!(read_grid_limits(&file_path).is_err());
    }
}
