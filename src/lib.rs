//! A two-stage stochastic dispatch optimiser for a combined-heat-and-power energy hub.
//!
//! The hub couples CHP units, a gas boiler and a heat storage to the electricity, heat and gas
//! grids, and must meet an uncertain heat demand at minimum net cost. The dispatch problem is a
//! mixed-integer linear program: piecewise-linearised asset operating envelopes, the storage
//! state-of-charge dynamics and the network flow balances are built once per demand scenario,
//! combined into a single deterministic-equivalent program with a shared first-stage plan, and
//! handed to the HiGHS solver.
#![warn(missing_docs)]

pub mod asset;
pub mod commands;
pub mod hub;
pub mod input;
pub mod log;
pub mod optimisation;
pub mod output;
pub mod settings;
pub mod tariffs;
pub mod time_index;

#[cfg(test)]
mod fixture;
