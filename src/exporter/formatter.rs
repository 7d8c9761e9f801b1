//! Prometheus Exposition Format output
//!
//! Renders metric families into the text exposition format (version 0.0.4).
//!
//! # Format Specification
//!
//! ```text
//! # HELP <metric_name> <help_text>
//! # TYPE <metric_name> <type>
//! <metric_name>{<label1>="<value1>",...} <value> [<timestamp>]
//! ```

use crate::model::MetricFamily;

/// Prometheus exposition format formatter
///
/// Only gauge and counter families are rendered; other interface kinds
/// (state sensors) have no numeric export contract and are skipped
/// entirely. Non-numeric values within an exportable family are skipped
/// per value.
///
/// # Example
///
/// ```ignore
/// use rpdu_exporter::exporter::PrometheusFormatter;
///
/// let formatter = PrometheusFormatter::new();
/// let output = formatter.format_families(&families);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PrometheusFormatter {
    /// Include timestamp in output
    include_timestamp: bool,
}

impl PrometheusFormatter {
    /// Create a new formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to include timestamps in output
    pub fn with_timestamps(mut self, include: bool) -> Self {
        self.include_timestamp = include;
        self
    }

    /// Format metric families into Prometheus exposition format
    ///
    /// # Notes
    ///
    /// - HELP and TYPE lines are emitted once per family
    /// - Sample labels are emitted in fixed order:
    ///   pdu, label, type, connector_id
    pub fn format_families(&self, families: &[MetricFamily]) -> String {
        if families.is_empty() {
            return String::new();
        }

        let mut output = String::with_capacity(families.len() * 200);

        for family in families {
            let kind = match family.interface.as_str() {
                "gauge" => "gauge",
                "counter" => "counter",
                _ => continue, // state families are never emitted
            };

            output.push_str(&format!(
                "# HELP {} {}\n",
                family.name,
                Self::escape_help(&family.description)
            ));
            output.push_str(&format!("# TYPE {} {}\n", family.name, kind));

            for metric in &family.metrics {
                if !metric.is_numeric() {
                    continue;
                }
                let Some(value) = metric.value_f64() else {
                    continue;
                };

                let mut line = format!(
                    "{}{{pdu=\"{}\",label=\"{}\",type=\"{}\",connector_id=\"{}\"}} {}",
                    family.name,
                    Self::escape_label_value(&metric.pdu),
                    Self::escape_label_value(&metric.label),
                    Self::escape_label_value(&metric.parent_type),
                    Self::escape_label_value(&metric.connector_id),
                    Self::format_value(value)
                );

                if self.include_timestamp {
                    // exposition timestamps are in milliseconds
                    line.push_str(&format!(" {}", (metric.timestamp * 1000.0) as i64));
                }

                output.push_str(&line);
                output.push('\n');
            }
        }

        output
    }

    /// Format a numeric value for Prometheus
    ///
    /// - NaN → "NaN"
    /// - +Inf → "+Inf"
    /// - -Inf → "-Inf"
    /// - Integers are formatted without decimal point
    /// - Large/small floats use scientific notation
    fn format_value(value: f64) -> String {
        if value.is_nan() {
            "NaN".to_string()
        } else if value.is_infinite() {
            if value.is_sign_positive() {
                "+Inf".to_string()
            } else {
                "-Inf".to_string()
            }
        } else if value.fract() == 0.0 && value.abs() < 1e15 {
            format!("{}", value as i64)
        } else if value.abs() >= 1e6 || (value.abs() < 1e-3 && value != 0.0) {
            format!("{:e}", value)
        } else {
            format!("{}", value)
        }
    }

    /// Escape help text
    ///
    /// Escapes backslash and newline characters.
    fn escape_help(help: &str) -> String {
        help.replace('\\', "\\\\").replace('\n', "\\n")
    }

    /// Escape label value
    ///
    /// Escapes backslash, double-quote, and newline characters.
    fn escape_label_value(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len());
        for c in value.chars() {
            match c {
                '\\' => escaped.push_str("\\\\"),
                '"' => escaped.push_str("\\\""),
                '\n' => escaped.push_str("\\n"),
                _ => escaped.push(c),
            }
        }
        escaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Metric, MetricFamily};
    use serde_json::{json, Value};

    fn metric(name: &str, interface: &str, value: Value) -> Metric {
        Metric {
            name: name.to_string(),
            interface: interface.to_string(),
            pdu: "pdublue.rack0".to_string(),
            label: "1".to_string(),
            parent_type: "outlet".to_string(),
            connector_id: "1".to_string(),
            sensor_rid: "/tfwopaque/sensors.NumericSensor:4.0.3/I0Voltage".to_string(),
            value,
            timestamp: 1609459200.0,
        }
    }

    fn family(name: &str, interface: &str, values: Vec<Value>) -> MetricFamily {
        let mut values = values.into_iter();
        let mut family = MetricFamily::new(metric(name, interface, values.next().unwrap()));
        for value in values {
            family.add(metric(name, interface, value)).unwrap();
        }
        family
    }

    #[test]
    fn test_format_gauge_family() {
        let families = vec![family("raritan_sensors_voltage_volt", "gauge", vec![json!(229.8)])];

        let output = PrometheusFormatter::new().format_families(&families);

        assert!(output.contains("# HELP raritan_sensors_voltage_volt"));
        assert!(output.contains("# TYPE raritan_sensors_voltage_volt gauge"));
        assert!(output.contains(
            "raritan_sensors_voltage_volt{pdu=\"pdublue.rack0\",label=\"1\",type=\"outlet\",connector_id=\"1\"} 229.8"
        ));
    }

    #[test]
    fn test_format_counter_family() {
        let families = vec![family(
            "raritan_sensors_energy_watt_hour_total",
            "counter",
            vec![json!(150000)],
        )];

        let output = PrometheusFormatter::new().format_families(&families);

        assert!(output.contains("# TYPE raritan_sensors_energy_watt_hour_total counter"));
        assert!(output.contains("} 150000"));
    }

    #[test]
    fn test_help_and_type_once_per_family() {
        let families = vec![family(
            "raritan_sensors_voltage_volt",
            "gauge",
            vec![json!(229.8), json!(231.2)],
        )];

        let output = PrometheusFormatter::new().format_families(&families);

        assert_eq!(output.matches("# HELP raritan_sensors_voltage_volt").count(), 1);
        assert_eq!(output.matches("# TYPE raritan_sensors_voltage_volt").count(), 1);
        assert_eq!(output.matches("} 229.8").count(), 1);
        assert_eq!(output.matches("} 231.2").count(), 1);
    }

    #[test]
    fn test_state_families_never_emitted() {
        let exportable = vec![
            family("raritan_sensors_voltage_volt", "gauge", vec![json!(229.8)]),
            family("raritan_sensors_energy_watt_hour_total", "counter", vec![json!(1)]),
        ];
        let mut with_state = exportable.clone();
        with_state.push(family("raritan_sensors_door_state", "state", vec![json!(1)]));

        let formatter = PrometheusFormatter::new();
        assert_eq!(
            formatter.format_families(&exportable),
            formatter.format_families(&with_state)
        );
    }

    #[test]
    fn test_non_numeric_values_skipped_per_value() {
        let families = vec![family(
            "raritan_sensors_voltage_volt",
            "gauge",
            vec![json!(229.8), Value::Null, json!("none")],
        )];

        let output = PrometheusFormatter::new().format_families(&families);

        assert_eq!(output.matches("raritan_sensors_voltage_volt{").count(), 1);
        assert!(!output.contains("none"));
    }

    #[test]
    fn test_format_with_timestamp() {
        let families = vec![family("raritan_sensors_voltage_volt", "gauge", vec![json!(42)])];

        let output = PrometheusFormatter::new()
            .with_timestamps(true)
            .format_families(&families);
        assert!(output.contains("} 42 1609459200000"));

        let output = PrometheusFormatter::new().format_families(&families);
        assert!(!output.contains("1609459200000"));
    }

    #[test]
    fn test_format_value_special() {
        assert_eq!(PrometheusFormatter::format_value(f64::NAN), "NaN");
        assert_eq!(PrometheusFormatter::format_value(f64::INFINITY), "+Inf");
        assert_eq!(PrometheusFormatter::format_value(f64::NEG_INFINITY), "-Inf");
        assert_eq!(PrometheusFormatter::format_value(42.0), "42");
        assert_eq!(PrometheusFormatter::format_value(-100.0), "-100");
        assert!(PrometheusFormatter::format_value(1.23456).starts_with("1.23"));
        assert!(PrometheusFormatter::format_value(1.23e10).contains('e'));
        assert!(PrometheusFormatter::format_value(1.23e-6).contains('e'));
    }

    #[test]
    fn test_escape_help() {
        assert_eq!(PrometheusFormatter::escape_help("simple"), "simple");
        assert_eq!(
            PrometheusFormatter::escape_help("line1\nline2"),
            "line1\\nline2"
        );
    }

    #[test]
    fn test_escape_label_value() {
        assert_eq!(PrometheusFormatter::escape_label_value("simple"), "simple");
        assert_eq!(
            PrometheusFormatter::escape_label_value("with\"quote"),
            "with\\\"quote"
        );
        assert_eq!(
            PrometheusFormatter::escape_label_value("with\\backslash"),
            "with\\\\backslash"
        );
        assert_eq!(
            PrometheusFormatter::escape_label_value("all\"\\\n"),
            "all\\\"\\\\\\n"
        );
    }

    #[test]
    fn test_format_empty() {
        let output = PrometheusFormatter::new().format_families(&[]);
        assert!(output.is_empty());
    }

    #[test]
    fn test_format_preserves_family_order() {
        let families = vec![
            family("raritan_sensors_voltage_volt", "gauge", vec![json!(1)]),
            family("raritan_sensors_current_ampere", "gauge", vec![json!(2)]),
        ];

        let output = PrometheusFormatter::new().format_families(&families);
        let voltage = output.find("raritan_sensors_voltage_volt").unwrap();
        let current = output.find("raritan_sensors_current_ampere").unwrap();
        assert!(voltage < current);
    }
}
