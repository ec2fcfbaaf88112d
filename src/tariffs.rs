//! Prices, bonus rates and penalty rates used by the objective.
//!
//! All rates are read once from the model definition file and are read-only for the duration of a
//! run. They are passed explicitly into the cost assembler rather than living in global state.
use serde::Deserialize;

/// Per-unit prices, incentive rates and operating cost rates for the hub.
///
/// Prices are in currency per kWh of the respective carrier; shares are fractions in [0, 1].
#[derive(PartialEq, Clone, Debug, Deserialize)]
pub struct Tariffs {
    /// Gas purchase price (per kWh of fuel, higher heating value)
    pub gas_price: f64,
    /// Electricity price (per kWh electric)
    pub power_price: f64,
    /// Heat sales price (per kWh thermal)
    pub heat_price: f64,
    /// CHP bonus rate for self-consumed power (per kWh electric)
    pub chp_bonus_self_consumption: f64,
    /// CHP bonus rate for fed-in power (per kWh electric)
    pub chp_bonus: f64,
    /// EEX price index adjustment for fed-in power (per kWh electric)
    pub chp_index_eex: f64,
    /// Energy tax refund on CHP fuel (per kWh of gas)
    pub energy_tax_refund_gas: f64,
    /// Avoided-grid-fee credit for fed-in power (per kWh electric)
    pub avoided_grid_fees: f64,
    /// Fraction of CHP power that is self-consumed
    pub share_self_consumption: f64,
    /// Fraction of CHP power that is fed into the grid
    pub share_feed_in: f64,
    /// Auxiliary power cost of the boiler as a fraction of its heat output
    pub power_cost_to_heat_sales_ratio: f64,
    /// Storage charge operation cost (per kWh thermal)
    pub cost_charge: f64,
    /// Storage discharge operation cost (per kWh thermal)
    pub cost_discharge: f64,
    /// Flat maintenance cost per period a CHP unit is on
    pub maintenance_cost: f64,
    /// Penalty per period the storage capacity extension switch is active
    #[serde(default = "default_extension_penalty")]
    pub extension_penalty: f64,
}

/// Default penalty rate on the storage capacity extension switch
fn default_extension_penalty() -> f64 {
    10.0
}

#[cfg(test)]
impl Default for Tariffs {
    fn default() -> Self {
        Self {
            gas_price: 0.04,
            power_price: 0.25,
            heat_price: 0.09,
            chp_bonus_self_consumption: 0.03,
            chp_bonus: 0.08,
            chp_index_eex: 0.12,
            energy_tax_refund_gas: 0.0055,
            avoided_grid_fees: 0.005,
            share_self_consumption: 0.3,
            share_feed_in: 0.7,
            power_cost_to_heat_sales_ratio: 0.02,
            cost_charge: 0.001,
            cost_discharge: 0.001,
            maintenance_cost: 0.5,
            extension_penalty: 10.0,
        }
    }
}
