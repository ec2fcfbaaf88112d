//! Code for reading heat demand and demand-scenario files.
//!
//! The forecast demand file is a JSON object with a single `heat_demand` map keyed by period.
//! The scenario file maps scenario names to objects holding a `Probability` entry plus one entry
//! per period with the scenario's realised demand. These are the formats produced by the demand
//! forecasting toolchain upstream of this program.
use super::*;
use crate::time_index::TimeIndex;
use float_cmp::approx_eq;
use indexmap::IndexMap;
use log::warn;
use std::path::Path;
use std::rc::Rc;

/// The key carrying the scenario probability in the scenario file
const PROBABILITY_KEY: &str = "Probability";

/// One demand scenario: a named realisation of the uncertain heat demand.
///
/// All series are stored by time index position. `delta_heat_demand` is the forecast minus the
/// realised demand: positive values mean the forecast over-estimated and the surplus must be
/// absorbed, negative values mean a deficit must be covered.
#[derive(PartialEq, Clone, Debug)]
pub struct Scenario {
    /// The scenario name, as given in the scenario file
    pub name: Rc<str>,
    /// The probability weight of this scenario
    pub probability: f64,
    /// Forecast heat demand per period (kW thermal)
    pub heat_demand: Vec<f64>,
    /// Realised heat demand per period under this scenario (kW thermal)
    pub heat_demand_scenario: Vec<f64>,
    /// Forecast minus realised demand per period (kW thermal)
    pub delta_heat_demand: Vec<f64>,
}

/// The contents of the forecast heat demand file
#[derive(Deserialize, PartialEq, Debug)]
struct DemandFile {
    heat_demand: HashMap<String, f64>,
}

/// Read the forecast heat demand file.
///
/// # Returns
///
/// The time index derived from the file's period keys, plus the forecast demand by position.
pub fn read_heat_demand(file_path: &Path) -> Result<(TimeIndex, Vec<f64>)> {
    let file: DemandFile = read_json(file_path)?;
    let by_period = parse_period_keys(&file.heat_demand).with_context(|| input_err_msg(file_path))?;
    let time_index = TimeIndex::new(by_period.keys().copied())?;
    let demand = time_index.iter().map(|t| by_period[&t]).collect();

    Ok((time_index, demand))
}

/// Read the demand scenario file and assemble the scenario records.
///
/// Every scenario must provide a probability and a demand value for every period of the time
/// index; a missing key is a fatal input error. Probabilities that do not sum to one are the
/// caller's responsibility and only produce a warning.
pub fn read_scenarios(
    file_path: &Path,
    time_index: &TimeIndex,
    heat_demand: &[f64],
) -> Result<IndexMap<Rc<str>, Scenario>> {
    let file: IndexMap<String, HashMap<String, f64>> = read_json(file_path)?;
    let scenarios = scenarios_from_maps(file, time_index, heat_demand)
        .with_context(|| input_err_msg(file_path))?;

    let total: f64 = scenarios.values().map(|s| s.probability).sum();
    if !approx_eq!(f64, total, 1.0, epsilon = 1e-6) {
        warn!("Scenario probabilities sum to {total}, not 1");
    }

    Ok(scenarios)
}

/// Assemble scenario records from raw per-scenario maps.
fn scenarios_from_maps(
    raw: IndexMap<String, HashMap<String, f64>>,
    time_index: &TimeIndex,
    heat_demand: &[f64],
) -> Result<IndexMap<Rc<str>, Scenario>> {
    raw.into_iter()
        .map(|(name, values)| {
            let scenario = scenario_from_map(&name, &values, time_index, heat_demand)
                .with_context(|| format!("Error in scenario '{name}'"))?;
            Ok((Rc::clone(&scenario.name), scenario))
        })
        .collect()
}

/// Assemble a single scenario record, checking coverage of every period.
fn scenario_from_map(
    name: &str,
    values: &HashMap<String, f64>,
    time_index: &TimeIndex,
    heat_demand: &[f64],
) -> Result<Scenario> {
    let probability = *values
        .get(PROBABILITY_KEY)
        .with_context(|| format!("Missing '{PROBABILITY_KEY}' key"))?;
    ensure!(
        (0.0..=1.0).contains(&probability),
        "Probability must lie in [0, 1] (got {probability})"
    );

    let heat_demand_scenario: Vec<f64> = time_index
        .iter()
        .map(|t| {
            values
                .get(&t.to_string())
                .copied()
                .with_context(|| format!("Missing demand for period {t}"))
        })
        .collect::<Result<_>>()?;

    let delta_heat_demand = heat_demand
        .iter()
        .zip(&heat_demand_scenario)
        .map(|(forecast, realised)| forecast - realised)
        .collect();

    Ok(Scenario {
        name: name.into(),
        probability,
        heat_demand: heat_demand.to_vec(),
        heat_demand_scenario,
        delta_heat_demand,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use map_macro::hash_map;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_read_heat_demand() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("heat_demand.json");
        {
            let mut file = File::create(&file_path).unwrap();
            write!(file, r#"{{"heat_demand": {{"2": 20.0, "1": 15.0}}}}"#).unwrap();
        }

        let (time_index, demand) = read_heat_demand(&file_path).unwrap();
        assert_eq!(time_index, TimeIndex::new([1, 2]).unwrap());
        assert_eq!(demand, vec![15.0, 20.0]);
    }

    #[test]
    fn test_scenario_from_map() {
        let time_index = TimeIndex::new([1, 2]).unwrap();
        let values = hash_map! {
            "Probability".to_string() => 0.4,
            "1".to_string() => 12.0,
            "2".to_string() => 22.0
        };

        let scenario = scenario_from_map("Scenario1", &values, &time_index, &[15.0, 20.0]).unwrap();
        assert_eq!(&*scenario.name, "Scenario1");
        assert_approx_eq!(f64, scenario.probability, 0.4);
        assert_eq!(scenario.heat_demand_scenario, vec![12.0, 22.0]);
        assert_eq!(scenario.delta_heat_demand, vec![3.0, -2.0]);
    }

    #[test]
    fn test_scenario_from_map_missing_period() {
        let time_index = TimeIndex::new([1, 2]).unwrap();
        let values = hash_map! {
            "Probability".to_string() => 1.0,
            "1".to_string() => 12.0
        };

        let result = scenario_from_map("Scenario1", &values, &time_index, &[15.0, 20.0]);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Missing demand for period 2")
        );
    }

    #[test]
    fn test_scenario_from_map_missing_probability() {
        let time_index = TimeIndex::new([1]).unwrap();
        let values = hash_map! {"1".to_string() => 12.0};
        assert!(scenario_from_map("Scenario1", &values, &time_index, &[15.0]).is_err());
    }
}
