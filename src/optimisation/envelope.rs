//! The piecewise-linear operating envelope of a dispatchable asset.
//!
//! A CHP or boiler is calibrated by three operating points, giving two linear segments. For each
//! period the builder emits an on/off indicator `bin`, one segment selector per segment and the
//! flow variables, then ties the dependent quantities (gas, power, efficiencies) to the chosen
//! segment's interpolation line with big-M constraints:
//!
//! * `y1[t] + y2[t] == bin[t]` so exactly one segment is active whenever the asset runs
//! * `heat` is confined to the active segment's breakpoint interval
//! * for each dependent quantity `q` and segment `k`,
//!   `|q[t] - slope_k * heat[t] - intercept_k * bin[t]| <= M * (1 - y_k[t])`
//!
//! The big-M value is sized analytically from the breakpoints so it always dominates the
//! constraint body on the inactive branch; an undersized M would silently cut off feasible
//! operating points.
use super::costs::EnvelopeCosts;
use super::{ScenarioProblem, StageCost, Variable};
use crate::asset::{CURVE_POINTS, OperatingCurve};

/// The number of linear segments of an operating curve
pub const SEGMENTS: usize = CURVE_POINTS - 1;

/// The per-period decision variables of one asset's operating envelope.
///
/// All vectors are indexed by time index position. `power` and `eta_el` are `None` for heat-only
/// assets.
pub struct EnvelopeVars {
    /// On/off indicator
    pub bin: Vec<Variable>,
    /// Segment selectors, one inner vector per period
    pub segments: Vec<[Variable; SEGMENTS]>,
    /// Heat output
    pub heat: Vec<Variable>,
    /// Gas consumption
    pub gas: Vec<Variable>,
    /// Thermal efficiency
    pub eta_th: Vec<Variable>,
    /// Power output (CHP only)
    pub power: Option<Vec<Variable>>,
    /// Electrical efficiency (CHP only)
    pub eta_el: Option<Vec<Variable>>,
}

/// One segment of the interpolation line for a dependent quantity
#[derive(PartialEq, Clone, Copy, Debug)]
struct Segment {
    slope: f64,
    intercept: f64,
    big_m: f64,
}

/// The interpolation segments for one dependent quantity.
///
/// The big-M value must dominate `|q - slope * heat - intercept * bin|` for every feasible
/// combination of the variables, which `q_max + |slope| * heat_max + |intercept|` does.
fn segments_for(heat: &[f64; CURVE_POINTS], values: &[f64; CURVE_POINTS]) -> [Segment; SEGMENTS] {
    let q_max = values.iter().copied().fold(f64::MIN, f64::max);
    let heat_max = heat[CURVE_POINTS - 1];
    std::array::from_fn(|k| {
        let slope = (values[k + 1] - values[k]) / (heat[k + 1] - heat[k]);
        let intercept = values[k] - slope * heat[k];
        Segment {
            slope,
            intercept,
            big_m: q_max + slope.abs() * heat_max + intercept.abs(),
        }
    })
}

/// Add one asset's operating envelope to a scenario.
///
/// # Arguments
///
/// * `scenario` - The scenario under construction
/// * `curve` - The asset's calibrated operating curve
/// * `costs` - Objective cost rates for the envelope variables
/// * `num_periods` - Number of dispatch periods
pub fn add_envelope(
    scenario: &mut ScenarioProblem,
    curve: &OperatingCurve,
    costs: &EnvelopeCosts,
    num_periods: usize,
) -> EnvelopeVars {
    let heat_min = curve.heat[0];
    let heat_mid = curve.heat[1];
    let heat_max = curve.heat_max();

    let bin: Vec<_> = (0..num_periods)
        .map(|_| scenario.add_binary(costs.bin))
        .collect();
    let segments: Vec<[Variable; SEGMENTS]> = (0..num_periods)
        .map(|_| std::array::from_fn(|_| scenario.add_binary(StageCost::ZERO)))
        .collect();
    let heat: Vec<_> = (0..num_periods)
        .map(|_| scenario.add_continuous(costs.heat, 0.0..=heat_max))
        .collect();

    for t in 0..num_periods {
        let [y1, y2] = segments[t];

        // Exactly one segment is active when the asset runs, none when it is off
        scenario.add_row(0.0..=0.0, [(y1, 1.0), (y2, 1.0), (bin[t], -1.0)]);

        // Thermal load bounds: heat lies within the full curve when on, is zero when off
        scenario.add_row(0.0.., [(heat[t], 1.0), (bin[t], -heat_min)]);
        scenario.add_row(..=0.0, [(heat[t], 1.0), (bin[t], -heat_max)]);

        // Segment selection: heat is confined to the active segment's breakpoint interval
        scenario.add_row(..=0.0, [(heat[t], 1.0), (y1, -heat_mid), (y2, -heat_max)]);
        scenario.add_row(0.0.., [(heat[t], 1.0), (y1, -heat_min), (y2, -heat_mid)]);
    }

    let gas = add_dependent(scenario, curve, &curve.gas, costs.gas, &bin, &segments, &heat);
    let eta_th = add_dependent(
        scenario,
        curve,
        &curve.eta_th,
        StageCost::ZERO,
        &bin,
        &segments,
        &heat,
    );
    let power = curve
        .power
        .as_ref()
        .map(|power| add_dependent(scenario, curve, power, costs.power, &bin, &segments, &heat));
    let eta_el = curve.eta_el.as_ref().map(|eta_el| {
        add_dependent(
            scenario,
            curve,
            eta_el,
            StageCost::ZERO,
            &bin,
            &segments,
            &heat,
        )
    });

    EnvelopeVars {
        bin,
        segments,
        heat,
        gas,
        eta_th,
        power,
        eta_el,
    }
}

/// Add a dependent quantity tied to the heat output by segment-wise interpolation.
fn add_dependent(
    scenario: &mut ScenarioProblem,
    curve: &OperatingCurve,
    values: &[f64; CURVE_POINTS],
    cost: StageCost,
    bin: &[Variable],
    segments: &[[Variable; SEGMENTS]],
    heat: &[Variable],
) -> Vec<Variable> {
    let lines = segments_for(&curve.heat, values);
    let q_max = values.iter().copied().fold(f64::MIN, f64::max);

    let vars: Vec<_> = (0..bin.len())
        .map(|_| scenario.add_continuous(cost, 0.0..=q_max))
        .collect();

    for (t, &q) in vars.iter().enumerate() {
        // Zero when off
        scenario.add_row(..=0.0, [(q, 1.0), (bin[t], -q_max)]);

        for (k, line) in lines.iter().enumerate() {
            let y = segments[t][k];
            // Both sides of |q - slope*heat - intercept*bin| <= M*(1 - y)
            scenario.add_row(
                ..=line.big_m,
                [
                    (q, 1.0),
                    (heat[t], -line.slope),
                    (bin[t], -line.intercept),
                    (y, line.big_m),
                ],
            );
            scenario.add_row(
                -line.big_m..,
                [
                    (q, 1.0),
                    (heat[t], -line.slope),
                    (bin[t], -line.intercept),
                    (y, -line.big_m),
                ],
            );
        }
    }

    vars
}
