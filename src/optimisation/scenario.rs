//! Assembly of scenario instances into the extensive-form program.
//!
//! Each scenario gets its own complete copy of the hub's variables and constraints, built from
//! the scenario's demand record and weighted by its probability. The first-stage variables of
//! every scenario are then pinned to those of the first scenario by explicit equality rows, so
//! the shared dispatch plan is an ordinary part of the deterministic-equivalent program rather
//! than a solver-specific annotation. Scenario builds are independent of one another; only the
//! final pinning step relates them.
use super::costs::CostRates;
use super::envelope::{EnvelopeVars, add_envelope};
use super::network::{FlowKind, Network, add_gas_grid, add_heat_grid, add_power_grid};
use super::storage::{StorageVars, add_storage};
use super::{
    ObjectiveTerm, Problem, ScenarioProblem, Solution, SolverOptions, StageCosts, Variable,
    evaluate_stage_costs,
};
use crate::hub::Hub;
use crate::input::demand::Scenario;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use log::info;
use std::rc::Rc;

/// The label under which the storage appears in results
const STORAGE_NAME: &str = "heat_storage";

/// The label under which the electrical grid appears in results
const POWER_GRID_NAME: &str = "power_grid";

/// The label under which the gas grid appears in results
const GAS_GRID_NAME: &str = "ngas_grid";

/// The label under which the heat grid appears in results
const HEAT_GRID_NAME: &str = "heat_grid";

/// One scenario's share of the extensive-form program.
///
/// Holds every variable series under its reporting label, the flattened first-stage variable
/// list (in a fixed order shared by all scenarios) and the scenario's unweighted objective terms.
#[derive(Debug)]
pub struct ScenarioModel {
    /// The scenario name
    pub name: Rc<str>,
    /// The scenario's probability weight
    pub probability: f64,
    /// Every variable series, keyed by `component.variable` label
    pub series: IndexMap<String, Vec<Variable>>,
    /// Labels of the series that belong to the first stage
    pub first_stage_labels: Vec<String>,
    /// The scenario's objective terms, unweighted
    pub objective: Vec<ObjectiveTerm>,
}

impl ScenarioModel {
    /// The first-stage variables, flattened in label order.
    pub fn first_stage_vars(&self) -> impl Iterator<Item = Variable> + '_ {
        self.first_stage_labels
            .iter()
            .flat_map(|label| self.series[label].iter().copied())
    }
}

/// Build one scenario instance into the shared problem.
fn build_scenario(
    problem: &mut Problem,
    hub: &Hub,
    scenario_data: &Scenario,
) -> Result<ScenarioModel> {
    let num_periods = hub.time_index.len();
    let rates = CostRates::from_tariffs(&hub.tariffs);
    let mut scenario = ScenarioProblem::new(problem, scenario_data.probability);
    let mut network = Network::new(num_periods);

    // Instantiate the assets and grids against this scenario's demand record
    let chps: Vec<_> = hub
        .chps
        .iter()
        .map(|(name, curve)| {
            (
                Rc::clone(name),
                add_envelope(&mut scenario, curve, &rates.chp, num_periods),
            )
        })
        .collect();
    let (boiler_name, boiler_curve) = &hub.boiler;
    let boiler = add_envelope(&mut scenario, boiler_curve, &rates.boiler, num_periods);
    let storage = add_storage(
        &mut scenario,
        &hub.storage,
        &rates.storage,
        &scenario_data.delta_heat_demand,
    );
    let power_grid = add_power_grid(&mut scenario, &mut network, &hub.power_grid, num_periods)?;
    let gas_grid = add_gas_grid(&mut scenario, &mut network, num_periods)?;
    let heat_grid = add_heat_grid(
        &mut scenario,
        &mut network,
        &hub.heat_grid,
        &scenario_data.heat_demand,
        &scenario_data.delta_heat_demand,
    )?;

    // Declare the arcs of the fixed topology, then expand them into conservation rows
    for (_, chp) in &chps {
        let power = chp.power.as_ref().expect("CHP always produces power");
        let power_out = network.add_port(FlowKind::Power, power.clone())?;
        let heat_out = network.add_port(FlowKind::Heat, chp.heat.clone())?;
        let gas_in = network.add_port(FlowKind::Gas, chp.gas.clone())?;
        network.connect(power_out, power_grid.feedin_port)?;
        network.connect(heat_out, heat_grid.feedin_port)?;
        network.connect(gas_grid.supply_port, gas_in)?;
    }
    let boiler_heat_out = network.add_port(FlowKind::Heat, boiler.heat.clone())?;
    let boiler_gas_in = network.add_port(FlowKind::Gas, boiler.gas.clone())?;
    network.connect(boiler_heat_out, heat_grid.feedin_port)?;
    network.connect(gas_grid.supply_port, boiler_gas_in)?;

    let storage_heat_out = network.add_port(FlowKind::Heat, storage.discharge.clone())?;
    let storage_heat_in = network.add_port(FlowKind::Heat, storage.charge.clone())?;
    network.connect(storage_heat_out, heat_grid.feedin_port)?;
    network.connect(heat_grid.supply_port, storage_heat_in)?;

    let storage_dispatch_out =
        network.add_port(FlowKind::Heat, storage.dispatch_discharge.clone())?;
    let storage_dispatch_in = network.add_port(FlowKind::Heat, storage.dispatch_charge.clone())?;
    network.connect(storage_dispatch_out, heat_grid.dispatch_feedin_port)?;
    network.connect(heat_grid.dispatch_supply_port, storage_dispatch_in)?;
    network.expand(&mut scenario);

    // Register every series under its reporting label and designate the first stage
    let mut series = IndexMap::new();
    let mut first_stage_labels = Vec::new();
    for (name, chp) in chps {
        first_stage_labels.extend(add_envelope_series(&mut series, &name, chp));
    }
    first_stage_labels.extend(add_envelope_series(&mut series, boiler_name, boiler));
    first_stage_labels.extend(add_storage_series(&mut series, storage));

    for (label, vars, first_stage) in [
        ("power_balance", power_grid.balance, true),
        ("power_supply", power_grid.supply, true),
        ("power_feedin", power_grid.feedin, true),
    ] {
        add_series(
            &mut series,
            &mut first_stage_labels,
            POWER_GRID_NAME,
            label,
            vars,
            first_stage,
        );
    }
    add_series(
        &mut series,
        &mut first_stage_labels,
        GAS_GRID_NAME,
        "gas_balance",
        gas_grid.balance,
        true,
    );
    for (label, vars, first_stage) in [
        ("heat_balance", heat_grid.balance, true),
        ("heat_supply", heat_grid.supply, true),
        ("heat_feedin", heat_grid.feedin, true),
        ("dispatch_heat_balance", heat_grid.dispatch_balance, false),
        ("dispatch_heat_supply", heat_grid.dispatch_supply, false),
        ("dispatch_heat_feedin", heat_grid.dispatch_feedin, false),
    ] {
        add_series(
            &mut series,
            &mut first_stage_labels,
            HEAT_GRID_NAME,
            label,
            vars,
            first_stage,
        );
    }

    Ok(ScenarioModel {
        name: Rc::clone(&scenario_data.name),
        probability: scenario_data.probability,
        series,
        first_stage_labels,
        objective: scenario.into_objective(),
    })
}

/// Insert one labelled series, recording it as first stage if so designated
fn add_series(
    series: &mut IndexMap<String, Vec<Variable>>,
    first_stage_labels: &mut Vec<String>,
    component: &str,
    label: &str,
    vars: Vec<Variable>,
    first_stage: bool,
) {
    let label = format!("{component}.{label}");
    if first_stage {
        first_stage_labels.push(label.clone());
    }
    series.insert(label, vars);
}

/// Insert a dispatchable asset's series; the whole envelope belongs to the first stage.
fn add_envelope_series(
    series: &mut IndexMap<String, Vec<Variable>>,
    name: &str,
    vars: EnvelopeVars,
) -> Vec<String> {
    let mut labels = Vec::new();
    let (y1, y2): (Vec<_>, Vec<_>) = vars.segments.iter().map(|[y1, y2]| (*y1, *y2)).unzip();
    let mut entries = vec![("bin", vars.bin)];
    if let Some(power) = vars.power {
        entries.push(("power", power));
    }
    entries.push(("gas", vars.gas));
    entries.push(("heat", vars.heat));
    entries.push(("eta_th", vars.eta_th));
    if let Some(eta_el) = vars.eta_el {
        entries.push(("eta_el", eta_el));
    }
    entries.push(("y1", y1));
    entries.push(("y2", y2));

    for (label, vars) in entries {
        let label = format!("{name}.{label}");
        labels.push(label.clone());
        series.insert(label, vars);
    }

    labels
}

/// Insert the storage series; the planned flows and state belong to the first stage.
fn add_storage_series(
    series: &mut IndexMap<String, Vec<Variable>>,
    vars: StorageVars,
) -> Vec<String> {
    let first_stage = [
        ("heat_charge", vars.charge),
        ("bin_charge", vars.bin_charge),
        ("heat_discharge", vars.discharge),
        ("bin_discharge", vars.bin_discharge),
        ("heat_capacity", vars.capacity),
    ];
    let second_stage = [
        ("dispatch_heat_charge", vars.dispatch_charge),
        ("dispatch_heat_discharge", vars.dispatch_discharge),
        ("dispatch_heat_capacity", vars.dispatch_capacity),
        ("dispatch_storage_capacity", vars.dispatch_storage_capacity),
        ("dispatch_extension", vars.dispatch_extension),
        ("use_extension", vars.use_extension),
    ];

    let mut labels = Vec::new();
    for (label, vars) in first_stage {
        let label = format!("{STORAGE_NAME}.{label}");
        labels.push(label.clone());
        series.insert(label, vars);
    }
    for (label, vars) in second_stage {
        series.insert(format!("{STORAGE_NAME}.{label}"), vars);
    }

    labels
}

/// The assembled deterministic-equivalent program, ready to solve.
#[derive(Debug)]
pub struct ExtensiveForm {
    problem: Problem,
    scenarios: Vec<ScenarioModel>,
}

/// Build the extensive-form program for the named scenarios.
///
/// A name with no entry in the hub's scenario data is a fatal error, raised before any solver
/// interaction.
pub fn build_extensive_form<'a, I>(hub: &Hub, names: I) -> Result<ExtensiveForm>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut problem = Problem::default();
    let scenarios: Vec<_> = names
        .into_iter()
        .map(|name| {
            let scenario_data = hub
                .scenarios
                .get(name)
                .with_context(|| format!("No demand data for scenario '{name}'"))?;
            build_scenario(&mut problem, hub, scenario_data)
        })
        .try_collect()?;
    ensure!(
        !scenarios.is_empty(),
        "The extensive form requires at least one scenario"
    );

    // Pin every scenario's first-stage variables to the first scenario's
    let (reference, rest) = scenarios.split_first().expect("at least one scenario");
    for scenario in rest {
        for (shared, own) in reference.first_stage_vars().zip_eq(scenario.first_stage_vars()) {
            problem.add_row(0.0..=0.0, [(shared, 1.0), (own, -1.0)]);
        }
    }

    info!(
        "Assembled extensive form with {} scenario(s) over {} period(s)",
        scenarios.len(),
        hub.time_index.len()
    );

    Ok(ExtensiveForm {
        problem,
        scenarios,
    })
}

impl ExtensiveForm {
    /// Solve the program and evaluate the per-scenario costs.
    pub fn solve(self, options: &SolverOptions) -> Result<DispatchSolution> {
        let solution = self.problem.solve(options).into_optimal()?;
        let scenario_costs: Vec<_> = self
            .scenarios
            .iter()
            .map(|scenario| evaluate_stage_costs(&solution, &scenario.objective))
            .collect();
        let objective = self
            .scenarios
            .iter()
            .zip(&scenario_costs)
            .map(|(scenario, costs)| scenario.probability * costs.total())
            .sum();
        info!("Model solved with objective value {objective:.4}");

        Ok(DispatchSolution {
            solution,
            scenarios: self.scenarios,
            scenario_costs,
            objective,
        })
    }
}

/// The solved dispatch, with per-scenario cost decomposition.
#[derive(Debug)]
pub struct DispatchSolution {
    /// The primal solution
    pub solution: Solution,
    /// The scenario models, in build order
    pub scenarios: Vec<ScenarioModel>,
    /// Realised per-stage costs per scenario, aligned with `scenarios`
    pub scenario_costs: Vec<StageCosts>,
    /// The probability-weighted objective value
    pub objective: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::write_model_dir;
    use tempfile::tempdir;

    fn load_hub() -> Hub {
        let dir = tempdir().unwrap();
        write_model_dir(dir.path());
        Hub::from_path(dir.path()).unwrap()
    }

    #[test]
    fn test_build_unknown_scenario_is_fatal() {
        let hub = load_hub();
        let result = build_extensive_form(&hub, ["NoSuchScenario"]);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("No demand data for scenario 'NoSuchScenario'")
        );
    }

    #[test]
    fn test_first_stage_lists_align_across_scenarios() {
        let hub = load_hub();
        let names: Vec<_> = hub.iter_scenario_names().map(|n| n.to_string()).collect();
        let ef = build_extensive_form(&hub, names.iter().map(String::as_str)).unwrap();
        let labels: Vec<_> = ef
            .scenarios
            .iter()
            .map(|s| s.first_stage_labels.clone())
            .collect();
        assert!(labels.windows(2).all(|pair| pair[0] == pair[1]));
        // The storage recourse stays out of the first stage
        assert!(
            !labels[0]
                .iter()
                .any(|label| label.contains("dispatch") || label.contains("use_extension"))
        );
    }
}
