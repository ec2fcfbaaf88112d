//! The flow-conservation network linking asset ports to the grids.
//!
//! Every component exposes typed ports, one flow variable per period. Arcs connect an output
//! port to an input port; on expansion each arc gets its own non-negative flow variables and
//! every connected port is tied to the sum of its arc flows by equality rows. A port with several
//! arcs therefore aggregates (fan-in) or splits (fan-out) exactly, with no loss.
//!
//! The grid components live here too. The heat grid enforces the hard demand balance
//! `feed_in[t] - supply[t] == demand[t]` and, for the recourse stage, the dispatch balance
//! `dispatch_supply[t] - dispatch_feed_in[t] == delta[t]` that routes each period's demand
//! deviation through the storage. The electrical and gas grids carry bookkeeping balances that
//! aggregate their connected flows.
use super::{ScenarioProblem, StageCost, Variable};
use crate::asset::GridLimits;
use anyhow::{Result, ensure};

/// The carrier type of a port
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum FlowKind {
    /// Thermal flow
    Heat,
    /// Electrical flow
    Power,
    /// Fuel flow
    Gas,
}

/// A handle to a registered port
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct PortId(usize);

/// A registered port: a typed flow signal plus the arcs attached to it
struct PortEntry {
    kind: FlowKind,
    vars: Vec<Variable>,
    arcs: Vec<usize>,
}

/// The network under construction for one scenario.
///
/// Ports are registered first, then connected by arcs; [`Network::expand`] turns the arcs into
/// explicit flow variables and conservation rows. Expansion consumes the network, so no arc can
/// be added afterwards.
pub struct Network {
    num_periods: usize,
    ports: Vec<PortEntry>,
    num_arcs: usize,
}

impl Network {
    /// Create an empty network over the given number of periods.
    pub fn new(num_periods: usize) -> Self {
        Self {
            num_periods,
            ports: Vec::new(),
            num_arcs: 0,
        }
    }

    /// Register a port exposing the given per-period flow variables.
    pub fn add_port(&mut self, kind: FlowKind, vars: Vec<Variable>) -> Result<PortId> {
        ensure!(
            vars.len() == self.num_periods,
            "Port must expose one flow variable per period ({} != {})",
            vars.len(),
            self.num_periods
        );
        self.ports.push(PortEntry {
            kind,
            vars,
            arcs: Vec::new(),
        });

        Ok(PortId(self.ports.len() - 1))
    }

    /// Connect a source port to a destination port with an arc.
    pub fn connect(&mut self, source: PortId, destination: PortId) -> Result<()> {
        ensure!(source != destination, "An arc cannot connect a port to itself");
        ensure!(
            self.ports[source.0].kind == self.ports[destination.0].kind,
            "Arc endpoints must carry the same flow kind"
        );

        let arc = self.num_arcs;
        self.num_arcs += 1;
        self.ports[source.0].arcs.push(arc);
        self.ports[destination.0].arcs.push(arc);

        Ok(())
    }

    /// Expand all arcs into flow variables and conservation rows.
    ///
    /// Each arc gets one non-negative flow variable per period; each connected port's signal is
    /// constrained to equal the sum of its arc flows. Unconnected ports are left free.
    pub fn expand(self, scenario: &mut ScenarioProblem) {
        let arc_flows: Vec<Vec<Variable>> = (0..self.num_arcs)
            .map(|_| {
                (0..self.num_periods)
                    .map(|_| scenario.add_continuous(StageCost::ZERO, 0.0..))
                    .collect()
            })
            .collect();

        for port in &self.ports {
            if port.arcs.is_empty() {
                continue;
            }
            for t in 0..self.num_periods {
                let terms = std::iter::once((port.vars[t], 1.0)).chain(
                    port.arcs.iter().map(|&arc| (arc_flows[arc][t], -1.0)),
                );
                scenario.add_row(0.0..=0.0, terms);
            }
        }
    }
}

/// The electrical grid connection's per-period variables
pub struct PowerGridVars {
    /// Net exchange with the grid (supply minus feed-in)
    pub balance: Vec<Variable>,
    /// Power drawn from the grid
    pub supply: Vec<Variable>,
    /// Power fed into the grid
    pub feedin: Vec<Variable>,
    /// Input port collecting the hub's power production
    pub feedin_port: PortId,
}

/// Add the electrical grid connection to a scenario.
pub fn add_power_grid(
    scenario: &mut ScenarioProblem,
    network: &mut Network,
    limits: &GridLimits,
    num_periods: usize,
) -> Result<PowerGridVars> {
    let supply: Vec<_> = (0..num_periods)
        .map(|_| scenario.add_continuous(StageCost::ZERO, 0.0..=limits.max_flow))
        .collect();
    let feedin: Vec<_> = (0..num_periods)
        .map(|_| scenario.add_continuous(StageCost::ZERO, 0.0..))
        .collect();
    let balance: Vec<_> = (0..num_periods)
        .map(|_| scenario.add_continuous(StageCost::ZERO, ..))
        .collect();

    for t in 0..num_periods {
        scenario.add_row(..=limits.max_flow, [(feedin[t], 1.0)]);
        scenario.add_row(
            0.0..=0.0,
            [(balance[t], 1.0), (supply[t], -1.0), (feedin[t], 1.0)],
        );
    }

    let feedin_port = network.add_port(FlowKind::Power, feedin.clone())?;

    Ok(PowerGridVars {
        balance,
        supply,
        feedin,
        feedin_port,
    })
}

/// The gas grid connection's per-period variables
pub struct GasGridVars {
    /// Total gas drawn from the grid
    pub balance: Vec<Variable>,
    /// Output port feeding the hub's gas consumers
    pub supply_port: PortId,
}

/// Add the gas grid connection to a scenario.
///
/// The gas grid has no flow limit in this topology; its balance simply aggregates the connected
/// consumers.
pub fn add_gas_grid(
    scenario: &mut ScenarioProblem,
    network: &mut Network,
    num_periods: usize,
) -> Result<GasGridVars> {
    let balance: Vec<_> = (0..num_periods)
        .map(|_| scenario.add_continuous(StageCost::ZERO, 0.0..))
        .collect();
    let supply_port = network.add_port(FlowKind::Gas, balance.clone())?;

    Ok(GasGridVars {
        balance,
        supply_port,
    })
}

/// The heat grid's per-period variables, both stages
pub struct HeatGridVars {
    /// Feed-in minus supply minus demand; fixed to zero
    pub balance: Vec<Variable>,
    /// Heat routed back out of the grid (to storage charging)
    pub supply: Vec<Variable>,
    /// Heat delivered into the grid by the producers
    pub feedin: Vec<Variable>,
    /// Recourse feed-in minus supply minus deviation; fixed to zero
    pub dispatch_balance: Vec<Variable>,
    /// Recourse heat routed out of the grid
    pub dispatch_supply: Vec<Variable>,
    /// Recourse heat delivered into the grid
    pub dispatch_feedin: Vec<Variable>,
    /// Input port collecting producer heat
    pub feedin_port: PortId,
    /// Output port towards storage charging
    pub supply_port: PortId,
    /// Input port collecting recourse discharge
    pub dispatch_feedin_port: PortId,
    /// Output port towards recourse charging
    pub dispatch_supply_port: PortId,
}

/// Add the heat grid to a scenario.
///
/// The first-stage balance forces the producers to cover the forecast demand exactly; the
/// dispatch balance forces the recourse flows to cover the scenario's demand deviation exactly.
/// There is no shedding and no curtailment.
pub fn add_heat_grid(
    scenario: &mut ScenarioProblem,
    network: &mut Network,
    limits: &GridLimits,
    heat_demand: &[f64],
    delta: &[f64],
) -> Result<HeatGridVars> {
    let num_periods = heat_demand.len();
    let supply: Vec<_> = (0..num_periods)
        .map(|_| scenario.add_continuous(StageCost::ZERO, 0.0..=limits.max_flow))
        .collect();
    let feedin: Vec<_> = (0..num_periods)
        .map(|_| scenario.add_continuous(StageCost::ZERO, 0.0..=limits.max_flow))
        .collect();
    let balance: Vec<_> = (0..num_periods)
        .map(|_| scenario.add_continuous(StageCost::ZERO, 0.0..=0.0))
        .collect();
    let dispatch_supply: Vec<_> = (0..num_periods)
        .map(|_| scenario.add_continuous(StageCost::ZERO, 0.0..))
        .collect();
    let dispatch_feedin: Vec<_> = (0..num_periods)
        .map(|_| scenario.add_continuous(StageCost::ZERO, 0.0..))
        .collect();
    let dispatch_balance: Vec<_> = (0..num_periods)
        .map(|_| scenario.add_continuous(StageCost::ZERO, 0.0..=0.0))
        .collect();

    for t in 0..num_periods {
        scenario.add_row(
            heat_demand[t]..=heat_demand[t],
            [(balance[t], -1.0), (feedin[t], 1.0), (supply[t], -1.0)],
        );
        scenario.add_row(
            -delta[t]..=-delta[t],
            [
                (dispatch_balance[t], -1.0),
                (dispatch_feedin[t], 1.0),
                (dispatch_supply[t], -1.0),
            ],
        );
    }

    let feedin_port = network.add_port(FlowKind::Heat, feedin.clone())?;
    let supply_port = network.add_port(FlowKind::Heat, supply.clone())?;
    let dispatch_feedin_port = network.add_port(FlowKind::Heat, dispatch_feedin.clone())?;
    let dispatch_supply_port = network.add_port(FlowKind::Heat, dispatch_supply.clone())?;

    Ok(HeatGridVars {
        balance,
        supply,
        feedin,
        dispatch_balance,
        dispatch_supply,
        dispatch_feedin,
        feedin_port,
        supply_port,
        dispatch_feedin_port,
        dispatch_supply_port,
    })
}
