//! Static catalog of Deye inverter sensors.
//!
//! Register addresses follow the Deye SUN-xK-G string and SUN-M micro
//! inverter holding register map. Multi-register values are low word first.

use crate::sensor::{Sensor, Words};

const STRING_MICRO: &[&str] = &["string", "micro"];
const STRING: &[&str] = &["string"];
const MICRO: &[&str] = &["micro"];
const ALARM: &[&str] = &["alarm"];

const RUN_STATES: &[(u16, &str)] = &[
    (0, "standby"),
    (1, "self-check"),
    (2, "normal"),
    (3, "alarm"),
    (4, "fault"),
];

/// Every sensor the bridge knows, in publishing order.
pub static SENSORS: &[Sensor] = &[
    Sensor::lookup("Run state", 0x3b, RUN_STATES)
        .metric("run_state")
        .groups(STRING_MICRO),
    Sensor::unsigned("Production today", 0x3c, 0.1, 1)
        .metric("day_energy")
        .unit("kWh")
        .groups(STRING_MICRO),
    Sensor::unsigned("Uptime", 0x3e, 1.0, 0)
        .metric("uptime")
        .unit("min")
        .groups(STRING_MICRO),
    Sensor::numeric("Total production", 0x3f, Words::Two, false, 0.1, 1)
        .metric("total_energy")
        .unit("kWh")
        .groups(STRING_MICRO),
    // Per-string daily production
    Sensor::unsigned("PV1 production today", 0x41, 0.1, 1)
        .metric("dc/pv1/day_energy")
        .unit("kWh")
        .groups(MICRO),
    Sensor::unsigned("PV2 production today", 0x42, 0.1, 1)
        .metric("dc/pv2/day_energy")
        .unit("kWh")
        .groups(MICRO),
    Sensor::unsigned("PV3 production today", 0x43, 0.1, 1)
        .metric("dc/pv3/day_energy")
        .unit("kWh")
        .groups(MICRO),
    Sensor::unsigned("PV4 production today", 0x44, 0.1, 1)
        .metric("dc/pv4/day_energy")
        .unit("kWh")
        .groups(MICRO),
    Sensor::numeric("PV1 total production", 0x45, Words::Two, false, 0.1, 1)
        .metric("dc/pv1/total_energy")
        .unit("kWh")
        .groups(MICRO),
    Sensor::numeric("PV2 total production", 0x47, Words::Two, false, 0.1, 1)
        .metric("dc/pv2/total_energy")
        .unit("kWh")
        .groups(MICRO),
    // AC side
    Sensor::unsigned("AC phase 1 voltage", 0x49, 0.1, 1)
        .metric("ac/l1/voltage")
        .unit("V")
        .groups(STRING_MICRO),
    Sensor::unsigned("AC phase 2 voltage", 0x4a, 0.1, 1)
        .metric("ac/l2/voltage")
        .unit("V")
        .groups(STRING),
    Sensor::unsigned("AC phase 3 voltage", 0x4b, 0.1, 1)
        .metric("ac/l3/voltage")
        .unit("V")
        .groups(STRING),
    Sensor::unsigned("AC phase 1 current", 0x4c, 0.1, 1)
        .metric("ac/l1/current")
        .unit("A")
        .groups(STRING_MICRO),
    Sensor::unsigned("AC phase 2 current", 0x4d, 0.1, 1)
        .metric("ac/l2/current")
        .unit("A")
        .groups(STRING),
    Sensor::unsigned("AC phase 3 current", 0x4e, 0.1, 1)
        .metric("ac/l3/current")
        .unit("A")
        .groups(STRING),
    Sensor::unsigned("AC frequency", 0x4f, 0.01, 2)
        .metric("ac/freq")
        .unit("Hz")
        .groups(STRING_MICRO),
    Sensor::unsigned("Operating power", 0x50, 0.1, 1)
        .metric("operating_power")
        .unit("W")
        .groups(STRING_MICRO),
    Sensor::numeric("AC active power", 0x56, Words::Two, false, 0.1, 1)
        .metric("ac/active_power")
        .unit("W")
        .groups(STRING_MICRO),
    Sensor::unsigned("Radiator temperature", 0x5a, 0.1, 1)
        .offset(-1000)
        .metric("radiator_temp")
        .unit("°C")
        .groups(STRING_MICRO),
    // DC side
    Sensor::unsigned("PV1 voltage", 0x6d, 0.1, 1)
        .metric("dc/pv1/voltage")
        .unit("V")
        .groups(STRING_MICRO),
    Sensor::unsigned("PV1 current", 0x6e, 0.1, 1)
        .metric("dc/pv1/current")
        .unit("A")
        .groups(STRING_MICRO),
    Sensor::unsigned("PV2 voltage", 0x6f, 0.1, 1)
        .metric("dc/pv2/voltage")
        .unit("V")
        .groups(STRING_MICRO),
    Sensor::unsigned("PV2 current", 0x70, 0.1, 1)
        .metric("dc/pv2/current")
        .unit("A")
        .groups(STRING_MICRO),
    Sensor::unsigned("PV3 voltage", 0x71, 0.1, 1)
        .metric("dc/pv3/voltage")
        .unit("V")
        .groups(MICRO),
    Sensor::unsigned("PV3 current", 0x72, 0.1, 1)
        .metric("dc/pv3/current")
        .unit("A")
        .groups(MICRO),
    Sensor::unsigned("PV4 voltage", 0x73, 0.1, 1)
        .metric("dc/pv4/voltage")
        .unit("V")
        .groups(MICRO),
    Sensor::unsigned("PV4 current", 0x74, 0.1, 1)
        .metric("dc/pv4/current")
        .unit("A")
        .groups(MICRO),
    // Alarm word. Decoded for the log only.
    Sensor::flag("Fan warning", 0x65, 1).groups(ALARM),
    Sensor::flag("Grid phase failure", 0x65, 3).groups(ALARM),
];

/// Sensors that belong to at least one of `groups`, in catalog order.
pub fn enabled_sensors<S: AsRef<str>>(groups: &[S]) -> Vec<&'static Sensor> {
    SENSORS.iter().filter(|s| s.in_any_group(groups)).collect()
}

/// Every group name used by the catalog.
pub fn known_groups() -> Vec<&'static str> {
    let mut groups: Vec<&'static str> = SENSORS
        .iter()
        .flat_map(|s| s.groups.iter().copied())
        .collect();
    groups.sort_unstable();
    groups.dedup();
    groups
}
