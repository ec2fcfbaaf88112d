//! Construction and solving of the dispatch optimisation problem.
//!
//! The submodules build one scenario instance each of the piecewise asset envelopes, the storage
//! dynamics, the network balances and the objective, and combine the scenario instances into the
//! deterministic-equivalent (extensive-form) program. This module provides the shared plumbing:
//! a problem wrapper that tracks variables and their objective contributions, and the synchronous,
//! single-shot solving service around the HiGHS solver.
use anyhow::{Result, anyhow};
use highs::{HighsModelStatus, RowProblem, Sense};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fmt::Display;
use std::ops::RangeBounds;

pub mod costs;
pub mod envelope;
pub mod network;
pub mod scenario;
pub mod storage;

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
pub type Variable = highs::Col;

/// Which stage of the stochastic program an objective contribution belongs to
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Stage {
    /// Decided before the demand uncertainty resolves; shared across scenarios
    First,
    /// Scenario-specific recourse
    Second,
}

/// The objective cost rate of a decision variable, split by stage.
///
/// These are unweighted rates; the scenario's probability weight is applied when the column is
/// added to the problem.
#[derive(PartialEq, Clone, Copy, Debug, Default)]
pub struct StageCost {
    /// First-stage cost per unit of the variable
    pub first: f64,
    /// Second-stage cost per unit of the variable
    pub second: f64,
}

impl StageCost {
    /// A variable with no objective contribution
    pub const ZERO: Self = Self {
        first: 0.0,
        second: 0.0,
    };

    /// A pure first-stage cost rate
    pub fn first(cost: f64) -> Self {
        Self {
            first: cost,
            second: 0.0,
        }
    }

    /// A pure second-stage cost rate
    pub fn second(cost: f64) -> Self {
        Self {
            first: 0.0,
            second: cost,
        }
    }
}

/// One variable's unweighted contribution to a scenario's objective
#[derive(Clone, Debug)]
pub struct ObjectiveTerm {
    /// The contributing variable
    pub variable: Variable,
    /// Unweighted cost rate
    pub cost: f64,
    /// The stage the contribution belongs to
    pub stage: Stage,
}

/// The optimisation problem under construction.
///
/// Wraps the HiGHS row problem and keeps track of the position of every column in the solution
/// array, so that solved values can be looked up by [`Variable`].
#[derive(Debug, Default)]
pub struct Problem {
    problem: RowProblem,
    variable_to_index: IndexMap<Variable, usize>,
}

impl Problem {
    /// Add a continuous column with the given (probability-weighted) objective coefficient.
    pub fn add_column<B: RangeBounds<f64>>(&mut self, coefficient: f64, bounds: B) -> Variable {
        let var = self.problem.add_column(coefficient, bounds);
        self.track(var);
        var
    }

    /// Add a binary column with the given (probability-weighted) objective coefficient.
    pub fn add_binary(&mut self, coefficient: f64) -> Variable {
        let var = self.problem.add_integer_column(coefficient, 0.0..=1.0);
        self.track(var);
        var
    }

    /// Add a constraint row: `bounds.start <= sum of terms <= bounds.end`.
    pub fn add_row<B, I>(&mut self, bounds: B, terms: I)
    where
        B: RangeBounds<f64>,
        I: IntoIterator<Item = (Variable, f64)>,
    {
        self.problem.add_row(bounds, terms);
    }

    /// Record the solution-array position of a freshly added column
    fn track(&mut self, var: Variable) {
        let index = self.variable_to_index.len();
        let existing = self.variable_to_index.insert(var, index).is_some();
        assert!(!existing, "Duplicate entry for variable");
    }

    /// Hand the problem to the solver and wait for the outcome.
    ///
    /// This is synchronous and single-shot: no retries, no warm starts. Whatever status the
    /// solver reports is passed back unchanged for the caller to decide on.
    pub fn solve(self, options: &SolverOptions) -> SolveOutcome {
        let mut model = self.problem.optimise(Sense::Minimise);
        model.set_option("output_flag", options.log_to_console);
        if let Some(gap) = options.mip_rel_gap {
            model.set_option("mip_rel_gap", gap);
        }
        if let Some(limit) = options.time_limit {
            model.set_option("time_limit", limit);
        }

        let solved = model.solve();
        let status = SolveStatus::from(solved.status());
        let solution = (status == SolveStatus::Optimal).then(|| Solution {
            values: solved.get_solution().columns().to_vec(),
            variable_to_index: self.variable_to_index,
        });

        SolveOutcome { status, solution }
    }
}

/// A handle for building one scenario's share of the extensive-form problem.
///
/// Columns added through this handle carry the scenario's probability weight in their objective
/// coefficient; the unweighted per-stage contributions are recorded so that the scenario's
/// realised first- and second-stage costs can be recomputed from the solved values.
pub struct ScenarioProblem<'a> {
    problem: &'a mut Problem,
    weight: f64,
    objective: Vec<ObjectiveTerm>,
}

impl<'a> ScenarioProblem<'a> {
    /// Create a handle for a scenario with the given probability weight.
    pub fn new(problem: &'a mut Problem, weight: f64) -> Self {
        Self {
            problem,
            weight,
            objective: Vec::new(),
        }
    }

    /// Add a continuous variable with the given per-stage cost rates.
    pub fn add_continuous<B: RangeBounds<f64>>(&mut self, cost: StageCost, bounds: B) -> Variable {
        let var = self
            .problem
            .add_column(self.weight * (cost.first + cost.second), bounds);
        self.record(var, cost);
        var
    }

    /// Add a binary variable with the given per-stage cost rates.
    pub fn add_binary(&mut self, cost: StageCost) -> Variable {
        let var = self
            .problem
            .add_binary(self.weight * (cost.first + cost.second));
        self.record(var, cost);
        var
    }

    /// Add a constraint row scoped to this scenario.
    pub fn add_row<B, I>(&mut self, bounds: B, terms: I)
    where
        B: RangeBounds<f64>,
        I: IntoIterator<Item = (Variable, f64)>,
    {
        self.problem.add_row(bounds, terms);
    }

    /// The scenario's recorded objective terms (unweighted).
    pub fn into_objective(self) -> Vec<ObjectiveTerm> {
        self.objective
    }

    fn record(&mut self, variable: Variable, cost: StageCost) {
        if cost.first != 0.0 {
            self.objective.push(ObjectiveTerm {
                variable,
                cost: cost.first,
                stage: Stage::First,
            });
        }
        if cost.second != 0.0 {
            self.objective.push(ObjectiveTerm {
                variable,
                cost: cost.second,
                stage: Stage::Second,
            });
        }
    }
}

/// Options passed through to the solver.
#[derive(Deserialize, PartialEq, Clone, Debug, Default)]
pub struct SolverOptions {
    /// Relative MIP gap at which the solver may stop
    #[serde(default)]
    pub mip_rel_gap: Option<f64>,
    /// Wall-clock time limit in seconds
    #[serde(default)]
    pub time_limit: Option<f64>,
    /// Whether the solver should log to the console
    #[serde(default)]
    pub log_to_console: bool,
}

/// The solver's verdict on the problem, surfaced unchanged to the caller.
#[derive(PartialEq, Clone, Debug)]
pub enum SolveStatus {
    /// An optimal solution was found (within the MIP gap)
    Optimal,
    /// The problem has no feasible solution
    Infeasible,
    /// The objective is unbounded
    Unbounded,
    /// The solver could not distinguish infeasible from unbounded
    UnboundedOrInfeasible,
    /// The time limit was reached without proving optimality
    ReachedTimeLimit,
    /// Any other solver status
    Other(String),
}

impl From<HighsModelStatus> for SolveStatus {
    fn from(status: HighsModelStatus) -> Self {
        match status {
            HighsModelStatus::Optimal => Self::Optimal,
            HighsModelStatus::Infeasible => Self::Infeasible,
            HighsModelStatus::Unbounded => Self::Unbounded,
            HighsModelStatus::UnboundedOrInfeasible => Self::UnboundedOrInfeasible,
            HighsModelStatus::ReachedTimeLimit => Self::ReachedTimeLimit,
            other => Self::Other(format!("{other:?}")),
        }
    }
}

impl Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optimal => write!(f, "optimal"),
            Self::Infeasible => write!(f, "infeasible"),
            Self::Unbounded => write!(f, "unbounded"),
            Self::UnboundedOrInfeasible => write!(f, "unbounded or infeasible"),
            Self::ReachedTimeLimit => write!(f, "time limit reached"),
            Self::Other(status) => write!(f, "{status}"),
        }
    }
}

/// The result of one solver invocation: a status, plus the solution if one was found.
pub struct SolveOutcome {
    /// The solver's status
    pub status: SolveStatus,
    /// The primal solution; only present for [`SolveStatus::Optimal`]
    pub solution: Option<Solution>,
}

impl SolveOutcome {
    /// Unwrap the optimal solution, or report the solver status as an error.
    pub fn into_optimal(self) -> Result<Solution> {
        self.solution
            .ok_or_else(|| anyhow!("Could not solve: solver status was {}", self.status))
    }
}

/// The primal solution to the dispatch problem.
#[derive(Debug)]
pub struct Solution {
    values: Vec<f64>,
    variable_to_index: IndexMap<Variable, usize>,
}

impl Solution {
    /// The solved value of the given variable.
    pub fn value(&self, var: Variable) -> f64 {
        self.values[self.variable_to_index[&var]]
    }

    /// The solved values of a slice of variables, in order.
    pub fn values(&self, vars: &[Variable]) -> Vec<f64> {
        vars.iter().map(|var| self.value(*var)).collect()
    }
}

/// A scenario's realised cost, split by stage and recomputed from the solved values.
#[derive(PartialEq, Clone, Copy, Debug, Default)]
pub struct StageCosts {
    /// Realised first-stage cost
    pub first: f64,
    /// Realised second-stage cost
    pub second: f64,
}

impl StageCosts {
    /// The scenario's total objective value
    pub fn total(&self) -> f64 {
        self.first + self.second
    }
}

/// Recompute a scenario's per-stage costs from its objective terms and the solved values.
pub fn evaluate_stage_costs(solution: &Solution, terms: &[ObjectiveTerm]) -> StageCosts {
    let mut costs = StageCosts::default();
    for term in terms {
        let contribution = term.cost * solution.value(term.variable);
        match term.stage {
            Stage::First => costs.first += contribution,
            Stage::Second => costs.second += contribution,
        }
    }

    costs
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_solve_simple_lp() {
        // minimise x + 2y subject to x + y >= 4, x <= 3
        let mut problem = Problem::default();
        let x = problem.add_column(1.0, 0.0..=3.0);
        let y = problem.add_column(2.0, 0.0..);
        problem.add_row(4.0.., [(x, 1.0), (y, 1.0)]);

        let outcome = problem.solve(&SolverOptions::default());
        assert_eq!(outcome.status, SolveStatus::Optimal);
        let solution = outcome.into_optimal().unwrap();
        assert_approx_eq!(f64, solution.value(x), 3.0, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.value(y), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_solve_binary_column() {
        // minimise -x - b with x <= 10*b forces b = 1
        let mut problem = Problem::default();
        let x = problem.add_column(-1.0, 0.0..=8.0);
        let b = problem.add_binary(-1.0);
        problem.add_row(..=0.0, [(x, 1.0), (b, -10.0)]);

        let solution = problem.solve(&SolverOptions::default()).into_optimal().unwrap();
        assert_approx_eq!(f64, solution.value(b), 1.0, epsilon = 1e-6);
        assert_approx_eq!(f64, solution.value(x), 8.0, epsilon = 1e-6);
    }

    #[test]
    fn test_solve_infeasible() {
        let mut problem = Problem::default();
        let x = problem.add_column(1.0, 0.0..=1.0);
        problem.add_row(2.0.., [(x, 1.0)]);

        let outcome = problem.solve(&SolverOptions::default());
        assert_eq!(outcome.status, SolveStatus::Infeasible);
        assert!(outcome.into_optimal().is_err());
    }

    #[test]
    fn test_scenario_problem_weights_and_terms() {
        let mut problem = Problem::default();
        let mut scenario = ScenarioProblem::new(&mut problem, 0.5);
        let x = scenario.add_continuous(
            StageCost {
                first: 2.0,
                second: 1.0,
            },
            4.0..=4.0,
        );
        scenario.add_continuous(StageCost::ZERO, 0.0..);
        let terms = scenario.into_objective();
        assert_eq!(terms.len(), 2);

        let solution = problem.solve(&SolverOptions::default()).into_optimal().unwrap();
        let costs = evaluate_stage_costs(&solution, &terms);
        assert_approx_eq!(f64, costs.first, 8.0, epsilon = 1e-6);
        assert_approx_eq!(f64, costs.second, 4.0, epsilon = 1e-6);
        assert_approx_eq!(f64, costs.total(), 12.0, epsilon = 1e-6);

        let _ = x;
    }
}
