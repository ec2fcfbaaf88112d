//! The heat storage state dynamics, in two stages.
//!
//! The first stage plans charge and discharge flows against the forecast demand, with the state
//! of charge following the recurrence
//!
//! ```text
//! capacity[1] = initial_soc + charge[1] - discharge[1]
//! capacity[t] = capacity[t-1] + charge[t] - discharge[t]
//! ```
//!
//! and, optionally, a cyclic boundary condition tying the final state back to the first period's
//! state. Charging and discharging are mutually exclusive through their indicator binaries.
//!
//! The second stage absorbs each scenario's demand deviation through recourse charge and
//! discharge flows on top of the plan. The recourse state of charge tracks the first-stage state
//! plus the accumulated recourse flows, and may exceed the nominal maximum content only through a
//! capacity extension that is gated by a binary switch: the switch can only activate when the
//! planned state is already at the nominal ceiling, and every active period is penalised in the
//! objective. The extension turns what would otherwise be recourse infeasibility into a priced
//! escape valve.
use super::costs::StorageCosts;
use super::{ScenarioProblem, StageCost, Variable};
use crate::asset::StorageParams;

/// The per-period decision variables of the heat storage, both stages.
///
/// All vectors are indexed by time index position.
pub struct StorageVars {
    /// Planned charge flow
    pub charge: Vec<Variable>,
    /// Planned discharge flow
    pub discharge: Vec<Variable>,
    /// Charge indicator
    pub bin_charge: Vec<Variable>,
    /// Discharge indicator
    pub bin_discharge: Vec<Variable>,
    /// Planned state of charge at the end of each period
    pub capacity: Vec<Variable>,
    /// Recourse charge flow
    pub dispatch_charge: Vec<Variable>,
    /// Recourse discharge flow
    pub dispatch_discharge: Vec<Variable>,
    /// Recourse state of charge at the end of each period
    pub dispatch_capacity: Vec<Variable>,
    /// Effective capacity ceiling in the recourse stage
    pub dispatch_storage_capacity: Vec<Variable>,
    /// Capacity extension above the nominal maximum
    pub dispatch_extension: Vec<Variable>,
    /// Extension switch
    pub use_extension: Vec<Variable>,
}

/// Add the heat storage dynamics to a scenario.
///
/// # Arguments
///
/// * `scenario` - The scenario under construction
/// * `params` - Validated storage parameters
/// * `costs` - Objective cost rates for the storage variables
/// * `delta` - The scenario's demand deviation (forecast minus realised) per period
pub fn add_storage(
    scenario: &mut ScenarioProblem,
    params: &StorageParams,
    costs: &StorageCosts,
    delta: &[f64],
) -> StorageVars {
    let num_periods = delta.len();
    let span = params.content_max - params.content_min;

    let charge: Vec<_> = (0..num_periods)
        .map(|_| scenario.add_continuous(costs.charge, 0.0..=params.charge_max))
        .collect();
    let discharge: Vec<_> = (0..num_periods)
        .map(|_| scenario.add_continuous(costs.discharge, 0.0..=params.discharge_max))
        .collect();
    let bin_charge: Vec<_> = (0..num_periods)
        .map(|_| scenario.add_binary(StageCost::ZERO))
        .collect();
    let bin_discharge: Vec<_> = (0..num_periods)
        .map(|_| scenario.add_binary(StageCost::ZERO))
        .collect();
    let capacity: Vec<_> = (0..num_periods)
        .map(|_| scenario.add_continuous(StageCost::ZERO, params.content_min..=params.content_max))
        .collect();

    // Recourse flows are fixed to zero in the direction the demand deviation cannot use: a
    // surplus (positive delta) can only be absorbed by charging, a deficit only covered by
    // discharging.
    let dispatch_charge: Vec<_> = delta
        .iter()
        .map(|&delta| {
            let upper = if delta < 0.0 { 0.0 } else { params.charge_max };
            scenario.add_continuous(costs.dispatch_charge, 0.0..=upper)
        })
        .collect();
    let dispatch_discharge: Vec<_> = delta
        .iter()
        .map(|&delta| {
            let upper = if delta >= 0.0 { 0.0 } else { params.discharge_max };
            scenario.add_continuous(costs.dispatch_discharge, 0.0..=upper)
        })
        .collect();
    let dispatch_capacity: Vec<_> = (0..num_periods)
        .map(|_| {
            scenario.add_continuous(
                StageCost::ZERO,
                params.content_min..=params.content_max + params.extension_max,
            )
        })
        .collect();
    let dispatch_storage_capacity: Vec<_> = (0..num_periods)
        .map(|_| {
            scenario.add_continuous(
                StageCost::ZERO,
                params.content_max..=params.content_max + params.extension_max,
            )
        })
        .collect();
    let dispatch_extension: Vec<_> = (0..num_periods)
        .map(|_| scenario.add_continuous(StageCost::ZERO, 0.0..=params.extension_max))
        .collect();
    let use_extension: Vec<_> = (0..num_periods)
        .map(|_| scenario.add_binary(costs.use_extension))
        .collect();

    for t in 0..num_periods {
        // Mutually exclusive charge/discharge, with the indicators gating the combined flows of
        // both stages
        scenario.add_row(..=1.0, [(bin_charge[t], 1.0), (bin_discharge[t], 1.0)]);
        scenario.add_row(
            ..=0.0,
            [
                (charge[t], 1.0),
                (dispatch_charge[t], 1.0),
                (bin_charge[t], -params.charge_max),
            ],
        );
        scenario.add_row(
            ..=0.0,
            [
                (discharge[t], 1.0),
                (dispatch_discharge[t], 1.0),
                (bin_discharge[t], -params.discharge_max),
            ],
        );

        // First-stage state of charge recurrence
        if t == 0 {
            scenario.add_row(
                params.initial_soc..=params.initial_soc,
                [(capacity[0], 1.0), (charge[0], -1.0), (discharge[0], 1.0)],
            );
        } else {
            scenario.add_row(
                0.0..=0.0,
                [
                    (capacity[t], 1.0),
                    (capacity[t - 1], -1.0),
                    (charge[t], -1.0),
                    (discharge[t], 1.0),
                ],
            );
        }

        // Recourse state of charge tracks the planned state plus accumulated recourse flows
        if t == 0 {
            scenario.add_row(
                0.0..=0.0,
                [
                    (dispatch_capacity[0], 1.0),
                    (capacity[0], -1.0),
                    (dispatch_charge[0], -1.0),
                    (dispatch_discharge[0], 1.0),
                ],
            );
        } else {
            scenario.add_row(
                0.0..=0.0,
                [
                    (dispatch_capacity[t], 1.0),
                    (dispatch_capacity[t - 1], -1.0),
                    (capacity[t], -1.0),
                    (capacity[t - 1], 1.0),
                    (dispatch_charge[t], -1.0),
                    (dispatch_discharge[t], 1.0),
                ],
            );
        }

        // The effective ceiling is the nominal maximum plus the extension, and the extension is
        // only available while the switch is active
        scenario.add_row(
            params.content_max..=params.content_max,
            [
                (dispatch_storage_capacity[t], 1.0),
                (dispatch_extension[t], -1.0),
            ],
        );
        scenario.add_row(
            ..=0.0,
            [
                (dispatch_extension[t], 1.0),
                (use_extension[t], -params.extension_max),
            ],
        );
        scenario.add_row(
            ..=0.0,
            [
                (dispatch_capacity[t], 1.0),
                (dispatch_storage_capacity[t], -1.0),
            ],
        );

        // The switch may only activate when the planned state is already at the nominal ceiling
        scenario.add_row(
            ..=-params.content_min,
            [(capacity[t], -1.0), (use_extension[t], span)],
        );
    }

    // Cyclic boundary condition: the final state matches the state after the first period
    if params.cyclic && num_periods > 1 {
        scenario.add_row(
            0.0..=0.0,
            [(capacity[num_periods - 1], 1.0), (capacity[0], -1.0)],
        );
    }

    StorageVars {
        charge,
        discharge,
        bin_charge,
        bin_discharge,
        capacity,
        dispatch_charge,
        dispatch_discharge,
        dispatch_capacity,
        dispatch_storage_capacity,
        dispatch_extension,
        use_extension,
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Problem, SolverOptions};
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn params() -> StorageParams {
        StorageParams {
            content_min: 0.0,
            content_max: 100.0,
            charge_max: 30.0,
            discharge_max: 30.0,
            initial_soc: 50.0,
            cyclic: false,
            extension_max: 40.0,
        }
    }

    fn costs() -> StorageCosts {
        StorageCosts {
            charge: StageCost::first(0.001),
            discharge: StageCost::first(0.001),
            dispatch_charge: StageCost::second(0.001),
            dispatch_discharge: StageCost::second(0.001),
            use_extension: StageCost::second(10.0),
        }
    }

    #[rstest]
    fn test_state_of_charge_recurrence(params: StorageParams) {
        let mut problem = Problem::default();
        let mut scenario = ScenarioProblem::new(&mut problem, 1.0);
        let vars = add_storage(&mut scenario, &params, &costs(), &[0.0, 0.0]);
        scenario.add_row(10.0..=10.0, [(vars.charge[0], 1.0)]);
        scenario.add_row(0.0..=0.0, [(vars.discharge[0], 1.0)]);
        scenario.add_row(25.0..=25.0, [(vars.discharge[1], 1.0)]);

        let solution = problem
            .solve(&SolverOptions::default())
            .into_optimal()
            .unwrap();
        assert_approx_eq!(f64, solution.value(vars.capacity[0]), 60.0, epsilon = 1e-4);
        assert_approx_eq!(f64, solution.value(vars.capacity[1]), 35.0, epsilon = 1e-4);
        // The indicators must be set for the flows to pass, and are mutually exclusive
        assert_approx_eq!(f64, solution.value(vars.bin_charge[0]), 1.0, epsilon = 1e-4);
        assert_approx_eq!(f64, solution.value(vars.bin_discharge[1]), 1.0, epsilon = 1e-4);
    }

    #[rstest]
    fn test_cyclic_condition(params: StorageParams) {
        let params = StorageParams {
            cyclic: true,
            ..params
        };
        let mut problem = Problem::default();
        let mut scenario = ScenarioProblem::new(&mut problem, 1.0);
        let vars = add_storage(&mut scenario, &params, &costs(), &[0.0, 0.0]);
        scenario.add_row(10.0..=10.0, [(vars.discharge[0], 1.0)]);

        let solution = problem
            .solve(&SolverOptions::default())
            .into_optimal()
            .unwrap();
        let first = solution.value(vars.capacity[0]);
        let last = solution.value(vars.capacity[1]);
        assert_approx_eq!(f64, first, 40.0, epsilon = 1e-4);
        assert_approx_eq!(f64, last, first, epsilon = 1e-4);
    }

    #[rstest]
    fn test_extension_absorbs_surplus_beyond_full_storage(params: StorageParams) {
        let params = StorageParams {
            initial_soc: 100.0,
            ..params
        };
        let mut problem = Problem::default();
        let mut scenario = ScenarioProblem::new(&mut problem, 1.0);
        // A surplus of 20 that must be charged even though the planned state is full
        let vars = add_storage(&mut scenario, &params, &costs(), &[20.0]);
        scenario.add_row(20.0..=20.0, [(vars.dispatch_charge[0], 1.0)]);
        scenario.add_row(0.0..=0.0, [(vars.charge[0], 1.0)]);
        scenario.add_row(0.0..=0.0, [(vars.discharge[0], 1.0)]);

        let solution = problem
            .solve(&SolverOptions::default())
            .into_optimal()
            .unwrap();
        assert_approx_eq!(f64, solution.value(vars.capacity[0]), 100.0, epsilon = 1e-4);
        assert_approx_eq!(
            f64,
            solution.value(vars.dispatch_capacity[0]),
            120.0,
            epsilon = 1e-4
        );
        assert_approx_eq!(f64, solution.value(vars.use_extension[0]), 1.0, epsilon = 1e-4);
        assert!(solution.value(vars.dispatch_extension[0]) >= 20.0 - 1e-4);
    }

    #[rstest]
    fn test_extension_blocked_when_plan_not_full(params: StorageParams) {
        // Same surplus, but the planned state is held below the ceiling and charging is
        // forbidden, so the recourse stage has nowhere to put the heat
        let mut problem = Problem::default();
        let mut scenario = ScenarioProblem::new(&mut problem, 1.0);
        let vars = add_storage(&mut scenario, &params, &costs(), &[20.0]);
        scenario.add_row(20.0..=20.0, [(vars.dispatch_charge[0], 1.0)]);
        scenario.add_row(0.0..=0.0, [(vars.charge[0], 1.0)]);
        scenario.add_row(0.0..=0.0, [(vars.discharge[0], 1.0)]);
        // Planned state is initial_soc = 50, well below the ceiling, so the switch must stay off
        // and the recourse state would need 70 <= 100: feasible without extension
        let solution = problem
            .solve(&SolverOptions::default())
            .into_optimal()
            .unwrap();
        assert_approx_eq!(f64, solution.value(vars.use_extension[0]), 0.0, epsilon = 1e-4);
        assert_approx_eq!(
            f64,
            solution.value(vars.dispatch_capacity[0]),
            70.0,
            epsilon = 1e-4
        );
    }

    #[rstest]
    fn test_deficit_fixes_recourse_charge_to_zero(params: StorageParams) {
        let mut problem = Problem::default();
        let mut scenario = ScenarioProblem::new(&mut problem, 1.0);
        let vars = add_storage(&mut scenario, &params, &costs(), &[-15.0]);
        scenario.add_row(15.0..=15.0, [(vars.dispatch_discharge[0], 1.0)]);

        let solution = problem
            .solve(&SolverOptions::default())
            .into_optimal()
            .unwrap();
        assert_approx_eq!(f64, solution.value(vars.dispatch_charge[0]), 0.0, epsilon = 1e-6);
        assert_approx_eq!(
            f64,
            solution.value(vars.dispatch_capacity[0]),
            35.0,
            epsilon = 1e-4
        );
    }
}
