//! The module responsible for writing output data to disk.
//!
//! A solved model produces three CSV files in the output directory:
//!
//! * `dispatch.csv` - every variable series of every scenario, one row per period
//! * `objective.csv` - the realised per-stage costs of each scenario
//! * `first_stage.csv` - the shared dispatch plan, written once
use crate::optimisation::scenario::DispatchSolution;
use crate::time_index::TimeIndex;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "heathub_results";

/// The output file name for the full dispatch
const DISPATCH_FILE_NAME: &str = "dispatch.csv";

/// The output file name for the per-scenario objective decomposition
const OBJECTIVE_FILE_NAME: &str = "objective.csv";

/// The output file name for the shared first-stage plan
const FIRST_STAGE_FILE_NAME: &str = "first_stage.csv";

/// Get the output directory for the model at the specified path.
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let model_dir = model_dir
        .canonicalize()
        .context("Could not resolve path to model")?;
    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create the output directory for a run.
pub fn create_output_directory(output_dir: &Path, overwrite: bool) -> Result<()> {
    ensure!(
        overwrite || !output_dir.is_dir(),
        "Output directory {} already exists (enable 'overwrite' in settings to reuse it)",
        output_dir.display()
    );
    fs::create_dir_all(output_dir)?;

    Ok(())
}

/// A row of the dispatch CSV file
#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct DispatchRow {
    scenario: Rc<str>,
    variable: String,
    period: u32,
    value: f64,
}

/// A row of the objective CSV file
#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct ObjectiveRow {
    scenario: Rc<str>,
    probability: f64,
    first_stage_cost: f64,
    second_stage_cost: f64,
    total_cost: f64,
}

/// A row of the first-stage CSV file
#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct FirstStageRow {
    variable: String,
    period: u32,
    value: f64,
}

/// Write all result files for a solved model.
pub fn write_results(
    output_dir: &Path,
    time_index: &TimeIndex,
    solution: &DispatchSolution,
) -> Result<()> {
    write_dispatch(output_dir, time_index, solution)?;
    write_objective(output_dir, solution)?;
    write_first_stage(output_dir, time_index, solution)?;

    Ok(())
}

/// Write every variable series of every scenario.
fn write_dispatch(
    output_dir: &Path,
    time_index: &TimeIndex,
    solution: &DispatchSolution,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_dir.join(DISPATCH_FILE_NAME))?;
    for scenario in &solution.scenarios {
        for (label, vars) in &scenario.series {
            for (period, &var) in time_index.iter().zip(vars) {
                writer.serialize(DispatchRow {
                    scenario: Rc::clone(&scenario.name),
                    variable: label.clone(),
                    period,
                    value: solution.solution.value(var),
                })?;
            }
        }
    }
    writer.flush()?;

    Ok(())
}

/// Write the realised per-stage costs of each scenario.
fn write_objective(output_dir: &Path, solution: &DispatchSolution) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_dir.join(OBJECTIVE_FILE_NAME))?;
    for (scenario, costs) in solution.scenarios.iter().zip(&solution.scenario_costs) {
        writer.serialize(ObjectiveRow {
            scenario: Rc::clone(&scenario.name),
            probability: scenario.probability,
            first_stage_cost: costs.first,
            second_stage_cost: costs.second,
            total_cost: costs.total(),
        })?;
    }
    writer.flush()?;

    Ok(())
}

/// Write the shared first-stage plan, taken from the first scenario.
fn write_first_stage(
    output_dir: &Path,
    time_index: &TimeIndex,
    solution: &DispatchSolution,
) -> Result<()> {
    let scenario = solution
        .scenarios
        .first()
        .context("No scenarios in solution")?;

    let mut writer = csv::Writer::from_path(output_dir.join(FIRST_STAGE_FILE_NAME))?;
    for label in &scenario.first_stage_labels {
        for (period, &var) in time_index.iter().zip(&scenario.series[label]) {
            writer.serialize(FirstStageRow {
                variable: label.clone(),
                period,
                value: solution.solution.value(var),
            })?;
        }
    }
    writer.flush()?;

    Ok(())
}
