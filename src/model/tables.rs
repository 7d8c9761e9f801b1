//! Static sensor vocabulary of the Raritan JSON-RPC API (pdumodel 3.6.0).
//!
//! The order of `SENSOR_TYPES` and `SENSOR_UNITS` is significant: the
//! metric-type and unit indices returned by sensor metadata calls are
//! positions in these tables.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Sensor metric-type names, indexed by the vendor metric-type id
pub const SENSOR_TYPES: [&str; 46] = [
    "unspecified",
    "voltage",
    "current",
    "unbalance_current",
    "power",
    "power_factor",
    "energy",
    "frequency",
    "temperature",
    "humidity",
    "air_flow",
    "air_pressure",
    "contact_closure",
    "on_off_sensor",
    "trip_sensor",
    "vibration",
    "water_leak",
    "smoke_detector",
    "total_harmonic_distortion",
    "mass",
    "electrical_resistance",
    "flux",
    "luminous_intensity",
    "acceleration",
    "magnetic_flux_density",
    "electric_field_strength",
    "magnetic_field_strength",
    "angle",
    "selection",
    "fault_state",
    "power_quality",
    "rotational_speed",
    "luminous_energy",
    "luminous_flux",
    "illuminance",
    "luminous_emittance",
    "motion",
    "occupancy",
    "tamper",
    "dry_contact",
    "powered_dry_contact",
    "absolute_humidity",
    "door_state",
    "door_lock_state",
    "door_handle_lock",
    "crest_factor",
];

/// Units of measurement, indexed by the vendor unit id.
/// Index 0 is the "no unit" entry and never appears in metric names.
pub const SENSOR_UNITS: [&str; 51] = [
    "",
    "volt",
    "ampere",
    "watt",
    "volt_amp",
    "watt_hour",
    "volt_amp_hour",
    "degree_celsius",
    "hz",
    "percent",
    "meter_per_sec",
    "pascal",
    "g",
    "rpm",
    "meter",
    "hour",
    "minute",
    "second",
    "volt_amp_reactive",
    "volt_amp_reactive_hour",
    "gram",
    "ohm",
    "liters_per_hour",
    "candela",
    "meter_per_square_sec",
    "tesla",
    "volt_per_meter",
    "volt_per_ampere",
    "degree",
    "degree_fahrenheit",
    "kelvin",
    "joule",
    "coulomb",
    "nit",
    "lumen",
    "lumen_second",
    "lux",
    "psi",
    "newton",
    "foot",
    "foot_per_sec",
    "cubic_meter",
    "radiant",
    "steradiant",
    "henry",
    "farad",
    "mol",
    "becquerel",
    "gray",
    "sievert",
    "g_per_cubic_meter",
];

/// Vendor interfaces exported as Prometheus gauges, version suffix stripped
pub const GAUGE_INTERFACES: [&str; 2] = [
    "sensors.NumericSensor",
    "pdumodel.TypeBResidualCurrentNumericSensor",
];

/// Vendor interfaces exported as Prometheus counters, version suffix stripped
pub const COUNTER_INTERFACES: [&str; 1] = ["sensors.AccumulatingNumericSensor"];

/// Human descriptions, keyed by final metric name
pub static SENSOR_DESCRIPTIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (
            "raritan_sensors_voltage_volt",
            "RMS voltage measured at an inlet, outlet or inlet pole",
        ),
        (
            "raritan_sensors_current_ampere",
            "RMS current drawn through an inlet, outlet or inlet pole",
        ),
        (
            "raritan_sensors_unbalance_current_percent",
            "Current unbalance between the poles of a multi-phase inlet",
        ),
        (
            "raritan_sensors_active_power_watt",
            "Active power drawn through an inlet, outlet or inlet pole",
        ),
        (
            "raritan_sensors_apparent_power_volt_amp",
            "Apparent power drawn through an inlet, outlet or inlet pole",
        ),
        (
            "raritan_sensors_power_factor",
            "Ratio of active to apparent power",
        ),
        (
            "raritan_sensors_active_energy_watt_hour_total",
            "Active energy accumulated since the energy counter was last reset",
        ),
        (
            "raritan_sensors_apparent_energy_volt_amp_hour_total",
            "Apparent energy accumulated since the energy counter was last reset",
        ),
        (
            "raritan_sensors_frequency_hz",
            "Line frequency measured at an inlet",
        ),
        (
            "raritan_sensors_line_frequency_hz",
            "Line frequency measured at an inlet pole",
        ),
        (
            "raritan_sensors_temperature_degree_celsius",
            "Temperature reported by an environmental sensor",
        ),
        (
            "raritan_sensors_humidity_percent",
            "Relative humidity reported by an environmental sensor",
        ),
        (
            "raritan_sensors_absolute_humidity_g_per_cubic_meter",
            "Absolute humidity reported by an environmental sensor",
        ),
        (
            "raritan_sensors_crest_factor",
            "Ratio of peak to RMS current",
        ),
    ])
});
