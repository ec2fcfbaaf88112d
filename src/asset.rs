//! Technical descriptions of the hub's dispatchable assets.
//!
//! A dispatchable asset (CHP or boiler) is calibrated by a three-point operating curve; heat
//! storage and the grid connections are described by simple capacity limits. These types are
//! validated on construction so that configuration errors (non-monotonic breakpoints, impossible
//! efficiencies) abort the run before any model is built, instead of surfacing as unexplained
//! solver infeasibility.
use anyhow::{Result, ensure};
use serde::Deserialize;
use std::rc::Rc;

/// The number of calibration points on an operating curve
pub const CURVE_POINTS: usize = 3;

/// The name of an asset (e.g. "chp1"), used to label variables in results
pub type AssetName = Rc<str>;

/// A piecewise-linear operating envelope calibrated by three points.
///
/// Points are strictly increasing in heat output. Gas consumption and (for CHP) power output are
/// derived from the calibrated efficiencies: `gas_i = heat_i / eta_th_i` and
/// `power_i = eta_el_i * gas_i`. All dependent quantities are linearly interpolated between
/// adjacent points, giving two linear segments.
#[derive(PartialEq, Clone, Debug)]
pub struct OperatingCurve {
    /// Heat output at each calibration point (kW thermal)
    pub heat: [f64; CURVE_POINTS],
    /// Gas consumption at each calibration point (kW fuel)
    pub gas: [f64; CURVE_POINTS],
    /// Thermal efficiency at each calibration point
    pub eta_th: [f64; CURVE_POINTS],
    /// Power output at each calibration point (kW electric); `None` for heat-only assets
    pub power: Option<[f64; CURVE_POINTS]>,
    /// Electrical efficiency at each calibration point; `None` for heat-only assets
    pub eta_el: Option<[f64; CURVE_POINTS]>,
}

impl OperatingCurve {
    /// Build an operating curve from calibrated breakpoints.
    ///
    /// # Arguments
    ///
    /// * `heat` - Heat output at each calibration point, strictly increasing
    /// * `eta_th` - Thermal efficiency at each point, in (0, 1]
    /// * `eta_el` - Electrical efficiency at each point (CHP only), in (0, 1]
    pub fn from_calibration(
        heat: [f64; CURVE_POINTS],
        eta_th: [f64; CURVE_POINTS],
        eta_el: Option<[f64; CURVE_POINTS]>,
    ) -> Result<Self> {
        ensure!(
            heat[0] > 0.0 && heat[0] < heat[1] && heat[1] < heat[2],
            "Operating curve breakpoints must be positive and strictly increasing in heat \
             (got {heat:?})"
        );
        for eta in eta_th.iter().chain(eta_el.iter().flatten()) {
            ensure!(
                (0.0..=1.0).contains(eta) && *eta > 0.0,
                "Efficiencies must lie in (0, 1] (got {eta})"
            );
        }

        let gas = std::array::from_fn(|i| heat[i] / eta_th[i]);
        let power = eta_el.map(|eta_el| std::array::from_fn(|i| eta_el[i] * gas[i]));

        Ok(Self {
            heat,
            gas,
            eta_th,
            power,
            eta_el,
        })
    }

    /// Whether the asset also produces power (CHP) or is heat-only (boiler)
    pub fn has_power(&self) -> bool {
        self.power.is_some()
    }

    /// The maximum heat output (the third calibration point)
    pub fn heat_max(&self) -> f64 {
        self.heat[CURVE_POINTS - 1]
    }
}

/// Capacity limits and boundary conditions for the heat storage.
#[derive(PartialEq, Clone, Debug)]
pub struct StorageParams {
    /// Minimum stored heat (kWh thermal)
    pub content_min: f64,
    /// Maximum nominal stored heat (kWh thermal)
    pub content_max: f64,
    /// Maximum charge flow per period (kW thermal)
    pub charge_max: f64,
    /// Maximum discharge flow per period (kW thermal)
    pub discharge_max: f64,
    /// State of charge before the first period (kWh thermal)
    pub initial_soc: f64,
    /// Whether the final state of charge must equal the state after the first period's dispatch
    pub cyclic: bool,
    /// Maximum recourse capacity extension above `content_max` (kWh thermal)
    pub extension_max: f64,
}

impl StorageParams {
    /// Validate the parameter set, returning it unchanged if consistent.
    pub fn validate(self) -> Result<Self> {
        ensure!(
            0.0 <= self.content_min && self.content_min < self.content_max,
            "Storage content bounds must satisfy 0 <= min < max"
        );
        ensure!(
            (self.content_min..=self.content_max).contains(&self.initial_soc),
            "Initial state of charge must lie within the content bounds"
        );
        ensure!(
            self.charge_max > 0.0 && self.discharge_max > 0.0,
            "Storage charge and discharge limits must be positive"
        );
        ensure!(
            self.extension_max >= 0.0,
            "Storage extension limit cannot be negative"
        );

        Ok(self)
    }
}

/// Flow limits for a grid connection.
///
/// The gas grid has no explicit limit in this topology; only the electrical and heat grids carry
/// one.
#[derive(PartialEq, Clone, Copy, Debug, Deserialize)]
pub struct GridLimits {
    /// Maximum flow in either direction per period (kW)
    pub max_flow: f64,
}

impl GridLimits {
    /// Validate the limits, returning them unchanged if consistent.
    pub fn validate(self) -> Result<Self> {
        ensure!(self.max_flow > 0.0, "Grid flow limit must be positive");
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    pub fn chp_curve() -> OperatingCurve {
        // Calibrated so that gas = [20, 70, 130] and power = [5, 25, 50]
        OperatingCurve::from_calibration(
            [10.0, 40.0, 70.0],
            [0.5, 4.0 / 7.0, 7.0 / 13.0],
            Some([0.25, 5.0 / 14.0, 5.0 / 13.0]),
        )
        .unwrap()
    }

    #[rstest]
    fn test_curve_derived_quantities(chp_curve: OperatingCurve) {
        for (i, expected) in [20.0, 70.0, 130.0].into_iter().enumerate() {
            assert_approx_eq!(f64, chp_curve.gas[i], expected, epsilon = 1e-9);
        }
        for (i, expected) in [5.0, 25.0, 50.0].into_iter().enumerate() {
            assert_approx_eq!(f64, chp_curve.power.unwrap()[i], expected, epsilon = 1e-9);
        }
        assert_approx_eq!(f64, chp_curve.heat_max(), 70.0);
    }

    #[test]
    fn test_curve_rejects_non_monotonic_heat() {
        let result =
            OperatingCurve::from_calibration([40.0, 10.0, 70.0], [0.5, 0.5, 0.5], None);
        assert!(result.is_err());
    }

    #[test]
    fn test_curve_rejects_bad_efficiency() {
        let result =
            OperatingCurve::from_calibration([10.0, 40.0, 70.0], [0.5, 1.5, 0.5], None);
        assert!(result.is_err());
    }

    #[test]
    fn test_storage_params_validate() {
        let params = StorageParams {
            content_min: 0.0,
            content_max: 100.0,
            charge_max: 20.0,
            discharge_max: 20.0,
            initial_soc: 50.0,
            cyclic: false,
            extension_max: 10.0,
        };
        assert!(params.clone().validate().is_ok());

        let bad = StorageParams {
            initial_soc: 150.0,
            ..params.clone()
        };
        assert!(bad.validate().is_err());

        let bad = StorageParams {
            content_max: -1.0,
            ..params
        };
        assert!(bad.validate().is_err());
    }
}
