//! The command line interface for the program.
use crate::hub::Hub;
use crate::log;
use crate::optimisation::scenario::build_extensive_form;
use crate::output::{create_output_directory, get_output_dir, write_results};
use crate::settings::Settings;
use ::log::info;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use itertools::Itertools;
use std::path::{Path, PathBuf};

/// The command line interface for the program.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// The available commands.
    #[command(subcommand)]
    pub command: Commands,
}

/// The available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run a dispatch model.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Directory for output files (defaults to a folder named after the model).
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Restrict the run to the named scenarios (default: all scenarios in the model).
        #[arg(short, long, value_delimiter = ',')]
        scenarios: Option<Vec<String>>,
    },
    /// Check that a model directory loads and validates.
    Validate {
        /// Path to the model directory.
        model_dir: PathBuf,
    },
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_dir: &Path,
    output_dir: Option<&Path>,
    scenarios: Option<&[String]>,
) -> Result<()> {
    let settings = Settings::from_path(model_dir)?;
    let output_dir = match output_dir {
        Some(output_dir) => output_dir.to_owned(),
        None => get_output_dir(model_dir)?,
    };
    create_output_directory(&output_dir, settings.overwrite)
        .context("Failed to create output directory.")?;
    log::init(settings.log_level.as_deref(), Some(&output_dir))
        .context("Failed to initialise logging.")?;

    let hub = Hub::from_path(model_dir).context("Failed to load model.")?;
    info!("Model loaded successfully.");

    let names: Vec<&str> = match scenarios {
        Some(names) => names.iter().map(String::as_str).collect(),
        None => hub.iter_scenario_names().map(|name| &**name).collect(),
    };
    let solution = build_extensive_form(&hub, names)?.solve(&hub.solver)?;
    info!(
        "Expected objective value: {:.4} ({})",
        solution.objective,
        solution
            .scenario_costs
            .iter()
            .zip(&solution.scenarios)
            .map(|(costs, scenario)| format!("{}: {:.4}", scenario.name, costs.total()))
            .join(", ")
    );

    write_results(&output_dir, &hub.time_index, &solution)?;
    info!("Results written to {}", output_dir.display());

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_dir: &Path) -> Result<()> {
    let settings = Settings::from_path(model_dir)?;
    log::init(settings.log_level.as_deref(), None).context("Failed to initialise logging.")?;

    let hub = Hub::from_path(model_dir).context("Failed to load model.")?;
    info!(
        "Model is valid: {} CHP unit(s), {} period(s), {} scenario(s)",
        hub.chps.len(),
        hub.time_index.len(),
        hub.scenarios.len()
    );

    Ok(())
}
