//! Assembly of per-variable objective cost rates from the tariff set.
//!
//! The objective minimises net cost, so revenues (heat and power sales, CHP incentives, the
//! energy tax refund on CHP fuel) enter as negative rates. All first-stage rates apply to the
//! planned dispatch; the second-stage rates price the recourse actions of the storage.
use super::StageCost;
use crate::tariffs::Tariffs;

/// Objective cost rates for the variables of a dispatchable asset's envelope
#[derive(PartialEq, Clone, Copy, Debug, Default)]
pub struct EnvelopeCosts {
    /// Rate on the on/off indicator
    pub bin: StageCost,
    /// Rate on heat output
    pub heat: StageCost,
    /// Rate on gas consumption
    pub gas: StageCost,
    /// Rate on power output
    pub power: StageCost,
}

/// Objective cost rates for the storage variables
#[derive(PartialEq, Clone, Copy, Debug, Default)]
pub struct StorageCosts {
    /// Rate on planned charge flow
    pub charge: StageCost,
    /// Rate on planned discharge flow
    pub discharge: StageCost,
    /// Rate on recourse charge flow
    pub dispatch_charge: StageCost,
    /// Rate on recourse discharge flow
    pub dispatch_discharge: StageCost,
    /// Rate on the capacity extension switch
    pub use_extension: StageCost,
}

/// The complete set of cost rates derived from a tariff set.
///
/// Grid balance and flow variables carry no rates of their own; all money flows are attached to
/// the asset-side variables.
#[derive(PartialEq, Clone, Copy, Debug)]
pub struct CostRates {
    /// Rates for every CHP unit
    pub chp: EnvelopeCosts,
    /// Rates for the boiler
    pub boiler: EnvelopeCosts,
    /// Rates for the heat storage
    pub storage: StorageCosts,
}

impl CostRates {
    /// Derive the cost rates from a tariff set.
    pub fn from_tariffs(tariffs: &Tariffs) -> Self {
        let chp = EnvelopeCosts {
            bin: StageCost::first(tariffs.maintenance_cost),
            heat: StageCost::first(-tariffs.heat_price),
            gas: StageCost::first(tariffs.gas_price - tariffs.energy_tax_refund_gas),
            power: StageCost::first(-chp_power_credit(tariffs)),
        };
        let boiler = EnvelopeCosts {
            bin: StageCost::ZERO,
            heat: StageCost::first(
                tariffs.power_cost_to_heat_sales_ratio * tariffs.power_price - tariffs.heat_price,
            ),
            gas: StageCost::first(tariffs.gas_price),
            power: StageCost::ZERO,
        };
        let storage = StorageCosts {
            charge: StageCost::first(tariffs.cost_charge),
            discharge: StageCost::first(tariffs.cost_discharge),
            dispatch_charge: StageCost::second(tariffs.cost_charge),
            dispatch_discharge: StageCost::second(tariffs.cost_discharge),
            use_extension: StageCost::second(tariffs.extension_penalty),
        };

        Self {
            chp,
            boiler,
            storage,
        }
    }
}

/// The total revenue rate per kWh of CHP power.
///
/// Self-consumed power earns its bonus rate on the self-consumption share; fed-in power earns the
/// CHP bonus on the feed-in share plus the EEX index and avoided grid fees on the non-self-consumed
/// share. The market power price applies to the full output.
pub fn chp_power_credit(tariffs: &Tariffs) -> f64 {
    tariffs.power_price
        + tariffs.chp_bonus_self_consumption * tariffs.share_self_consumption
        + tariffs.chp_bonus * tariffs.share_feed_in
        + (1.0 - tariffs.share_self_consumption)
            * (tariffs.chp_index_eex + tariffs.avoided_grid_fees)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_chp_power_credit() {
        let tariffs = Tariffs::default();
        // 0.25 + 0.03*0.3 + 0.08*0.7 + 0.7*(0.12 + 0.005)
        assert_approx_eq!(f64, chp_power_credit(&tariffs), 0.4025, epsilon = 1e-9);
    }

    #[test]
    fn test_cost_rates_signs() {
        let tariffs = Tariffs::default();
        let rates = CostRates::from_tariffs(&tariffs);

        // Revenues are negative, expenditures positive
        assert!(rates.chp.power.first < 0.0);
        assert!(rates.chp.heat.first < 0.0);
        assert!(rates.chp.gas.first > 0.0);
        assert_approx_eq!(f64, rates.chp.gas.first, 0.04 - 0.0055, epsilon = 1e-9);
        assert_approx_eq!(f64, rates.chp.bin.first, 0.5, epsilon = 1e-9);

        // Boiler heat carries the auxiliary power cost net of heat revenue
        assert_approx_eq!(
            f64,
            rates.boiler.heat.first,
            0.02 * 0.25 - 0.09,
            epsilon = 1e-9
        );
        assert_eq!(rates.boiler.power, StageCost::ZERO);

        // Recourse rates are pure second stage
        assert_eq!(rates.storage.dispatch_charge.first, 0.0);
        assert_approx_eq!(f64, rates.storage.dispatch_charge.second, 0.001, epsilon = 1e-9);
        assert_approx_eq!(f64, rates.storage.use_extension.second, 10.0, epsilon = 1e-9);
    }
}
