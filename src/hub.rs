//! The energy hub model definition.
//!
//! A model directory contains:
//!
//! * `hub.toml` - tariffs, asset roster, storage options and solver options
//! * `assets/<name>.csv` - one calibration table per dispatchable asset, plus the storage and
//!   grid limit tables
//! * `demands/heat_demand.json` - the forecast heat demand
//! * `demands/heat_demand_scenarios.json` - the demand scenarios with probabilities
//!
//! Loading validates everything up front: breakpoint monotonicity, efficiency ranges, storage
//! bounds and scenario coverage. A model that loads successfully can always be built into an
//! optimisation problem.
use crate::asset::{AssetName, GridLimits, OperatingCurve, StorageParams};
use crate::input::asset::{read_grid_limits, read_operating_curve, read_storage_table};
use crate::input::demand::{Scenario, read_heat_demand, read_scenarios};
use crate::input::read_toml;
use crate::optimisation::SolverOptions;
use crate::tariffs::Tariffs;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

/// The name of the model definition file within a model directory
const HUB_FILE_NAME: &str = "hub.toml";

/// The subdirectory holding asset calibration tables
const ASSETS_SUBDIR: &str = "assets";

/// The subdirectory holding demand files
const DEMANDS_SUBDIR: &str = "demands";

/// The file holding the forecast heat demand
const HEAT_DEMAND_FILE_NAME: &str = "heat_demand.json";

/// The file holding the demand scenarios
const SCENARIOS_FILE_NAME: &str = "heat_demand_scenarios.json";

/// A fully loaded and validated hub model.
///
/// Read-only after construction; scenario instancing borrows from it but never mutates it.
pub struct Hub {
    /// The dispatch periods, shared by every scenario instance
    pub time_index: Rc<crate::time_index::TimeIndex>,
    /// The CHP units, in roster order
    pub chps: Vec<(AssetName, OperatingCurve)>,
    /// The boiler
    pub boiler: (AssetName, OperatingCurve),
    /// Heat storage parameters
    pub storage: StorageParams,
    /// Electrical grid connection limits
    pub power_grid: GridLimits,
    /// Heat grid connection limits
    pub heat_grid: GridLimits,
    /// Prices and incentive rates
    pub tariffs: Tariffs,
    /// The demand scenarios, keyed by name
    pub scenarios: IndexMap<Rc<str>, Scenario>,
    /// Options passed through to the solver
    pub solver: SolverOptions,
}

/// The contents of the `hub.toml` model definition file
#[derive(Deserialize, PartialEq, Debug)]
struct HubFile {
    assets: AssetRoster,
    storage: StorageSection,
    tariffs: Tariffs,
    #[serde(default)]
    solver: SolverOptions,
}

/// The `[assets]` section: which dispatchable assets make up the hub
#[derive(Deserialize, PartialEq, Debug)]
struct AssetRoster {
    /// Names of the CHP units; each has a calibration table `assets/<name>.csv`
    chps: Vec<String>,
    /// Name of the boiler
    boiler: String,
}

/// The `[storage]` section: options not carried by the storage limits table
#[derive(Deserialize, PartialEq, Debug)]
struct StorageSection {
    /// State of charge before the first period
    initial_soc: f64,
    /// Whether to enforce the cyclic boundary condition
    #[serde(default)]
    cyclic: bool,
    /// Maximum recourse capacity extension above the nominal maximum
    #[serde(default)]
    extension_max: f64,
}

impl Hub {
    /// Load a hub model from the specified directory.
    pub fn from_path(model_dir: &Path) -> Result<Self> {
        let hub_file: HubFile = read_toml(&model_dir.join(HUB_FILE_NAME))?;
        ensure!(
            !hub_file.assets.chps.is_empty(),
            "The hub requires at least one CHP unit"
        );
        ensure!(
            hub_file.assets.chps.iter().all_unique(),
            "CHP names must be unique"
        );

        let assets_dir = model_dir.join(ASSETS_SUBDIR);
        let chps = hub_file
            .assets
            .chps
            .iter()
            .map(|name| -> Result<_> {
                let curve = read_operating_curve(&assets_dir.join(format!("{name}.csv")), true)?;
                Ok((Rc::from(name.as_str()), curve))
            })
            .try_collect()?;
        let boiler_name = &hub_file.assets.boiler;
        let boiler = (
            Rc::from(boiler_name.as_str()),
            read_operating_curve(&assets_dir.join(format!("{boiler_name}.csv")), false)?,
        );

        let table = read_storage_table(&assets_dir.join("heat_storage.csv"))?;
        let storage = StorageParams {
            content_min: table.content_min,
            content_max: table.content_max,
            charge_max: table.charge_max,
            discharge_max: table.discharge_max,
            initial_soc: hub_file.storage.initial_soc,
            cyclic: hub_file.storage.cyclic,
            extension_max: hub_file.storage.extension_max,
        }
        .validate()
        .context("Invalid heat storage configuration")?;

        let power_grid = read_grid_limits(&assets_dir.join("power_grid.csv"))?;
        let heat_grid = read_grid_limits(&assets_dir.join("heat_grid.csv"))?;

        let demands_dir = model_dir.join(DEMANDS_SUBDIR);
        let (time_index, heat_demand) =
            read_heat_demand(&demands_dir.join(HEAT_DEMAND_FILE_NAME))?;
        let scenarios = read_scenarios(
            &demands_dir.join(SCENARIOS_FILE_NAME),
            &time_index,
            &heat_demand,
        )?;
        ensure!(!scenarios.is_empty(), "The scenario file defines no scenarios");

        Ok(Self {
            time_index: Rc::new(time_index),
            chps,
            boiler,
            storage,
            power_grid,
            heat_grid,
            tariffs: hub_file.tariffs,
            scenarios,
            solver: hub_file.solver,
        })
    }

    /// Iterate over the names of all scenarios, in file order.
    pub fn iter_scenario_names(&self) -> impl Iterator<Item = &Rc<str>> {
        self.scenarios.keys()
    }
}
