//! Fixtures for tests
use std::fs;
use std::path::Path;

/// Write a minimal, consistent model directory with two demand scenarios.
///
/// The CHP curve is calibrated so that `gas = [20, 70, 130]` and `power = [5, 25, 50]`.
pub fn write_model_dir(dir: &Path) {
    let assets = dir.join("assets");
    let demands = dir.join("demands");
    fs::create_dir_all(&assets).unwrap();
    fs::create_dir_all(&demands).unwrap();

    fs::write(
        dir.join("hub.toml"),
        r#"
[assets]
chps = ["chp1"]
boiler = "boiler1"

[storage]
initial_soc = 10.0
cyclic = false
extension_max = 40.0

[tariffs]
gas_price = 0.04
power_price = 0.25
heat_price = 0.09
chp_bonus_self_consumption = 0.03
chp_bonus = 0.08
chp_index_eex = 0.12
energy_tax_refund_gas = 0.0055
avoided_grid_fees = 0.005
share_self_consumption = 0.3
share_feed_in = 0.7
power_cost_to_heat_sales_ratio = 0.02
cost_charge = 0.001
cost_discharge = 0.001
maintenance_cost = 0.5

[solver]
mip_rel_gap = 0.015
time_limit = 100.0
"#,
    )
    .unwrap();

    fs::write(
        assets.join("chp1.csv"),
        "point,heat,eta_th,eta_el\n\
         1,10,0.5,0.25\n\
         2,40,0.5714285714285714,0.35714285714285715\n\
         3,70,0.5384615384615384,0.38461538461538464\n",
    )
    .unwrap();
    fs::write(
        assets.join("boiler1.csv"),
        "point,heat,eta_th\n1,20,0.9\n2,60,0.92\n3,100,0.9\n",
    )
    .unwrap();
    fs::write(
        assets.join("heat_storage.csv"),
        "limit,content,charge,discharge\nmin,0,0,0\nmax,100,30,30\n",
    )
    .unwrap();
    fs::write(assets.join("power_grid.csv"), "limit,flow\nmax,1000\n").unwrap();
    fs::write(assets.join("heat_grid.csv"), "limit,flow\nmax,1000\n").unwrap();

    fs::write(
        demands.join("heat_demand.json"),
        r#"{"heat_demand": {"1": 15.0, "2": 15.0}}"#,
    )
    .unwrap();
    fs::write(
        demands.join("heat_demand_scenarios.json"),
        r#"{
            "Scenario1": {"Probability": 0.6, "1": 15.0, "2": 15.0},
            "Scenario2": {"Probability": 0.4, "1": 12.0, "2": 18.0}
        }"#,
    )
    .unwrap();
}
