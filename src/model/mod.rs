//! Typed entities for the PDU object graph.
//!
//! A [`crate::pdu::Pdu`] exclusively owns its connectors, poles and
//! sensors as flat vectors; sensors point back into those vectors with
//! [`ParentRef`] indices rather than shared-ownership pointers. Metrics
//! denormalize every identity field they need at read time, so the
//! aggregation stage never walks the graph again.

pub mod tables;

use serde_json::Value;
use tracing::debug;

use self::tables::{
    COUNTER_INTERFACES, GAUGE_INTERFACES, SENSOR_DESCRIPTIONS, SENSOR_TYPES, SENSOR_UNITS,
};
use crate::error::ModelError;
use crate::utils::camel_to_snake;
use crate::EXPORTER_PREFIX;

/// Coarse sensor kind, derived from the vendor interface string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceKind {
    Gauge,
    Counter,
}

impl InterfaceKind {
    /// Classify a raw vendor interface, stripping its trailing version
    /// token (`sensors.NumericSensor:4.0.3` → `sensors.NumericSensor`).
    ///
    /// # Errors
    /// Returns [`ModelError::UnknownInterface`] for interfaces outside the
    /// known gauge/counter families.
    pub fn classify(rid: &str, interface: &str) -> Result<Self, ModelError> {
        let base = base_interface(interface);
        if GAUGE_INTERFACES.contains(&base) {
            Ok(InterfaceKind::Gauge)
        } else if COUNTER_INTERFACES.contains(&base) {
            Ok(InterfaceKind::Counter)
        } else {
            Err(ModelError::UnknownInterface {
                rid: rid.to_string(),
                interface: interface.to_string(),
            })
        }
    }

    /// Whether a raw interface belongs to the exportable families.
    /// State sensors fail this check and are skipped during discovery.
    pub fn is_exportable(interface: &str) -> bool {
        let base = base_interface(interface);
        GAUGE_INTERFACES.contains(&base) || COUNTER_INTERFACES.contains(&base)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InterfaceKind::Gauge => "gauge",
            InterfaceKind::Counter => "counter",
        }
    }
}

fn base_interface(interface: &str) -> &str {
    interface.split(':').next().unwrap_or(interface)
}

/// Connector kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorType {
    Inlet,
    Outlet,
    Device,
}

impl ConnectorType {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "inlet" => Some(ConnectorType::Inlet),
            "outlet" => Some(ConnectorType::Outlet),
            "device" => Some(ConnectorType::Device),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorType::Inlet => "inlet",
            ConnectorType::Outlet => "outlet",
            ConnectorType::Device => "device",
        }
    }

    /// Vendor method used to enumerate this connector's sensors
    pub fn sensor_method(&self) -> &'static str {
        match self {
            ConnectorType::Inlet | ConnectorType::Outlet => "getSensors",
            ConnectorType::Device => "getDevice",
        }
    }
}

/// An inlet, outlet, or peripheral device slot on a PDU.
///
/// Immutable once built; metadata from the two discovery passes is folded
/// into a draft before construction.
#[derive(Debug, Clone)]
pub struct Connector {
    pub rid: String,
    pub id: String,
    pub name: String,
    pub kind: ConnectorType,
}

impl Connector {
    /// `id` falls back to the last path segment of the rid when the device
    /// returned no metadata label; `name` falls back to `id` when no custom
    /// name is set.
    pub fn new(rid: String, kind: ConnectorType, id: Option<String>, name: Option<String>) -> Self {
        let id = id
            .filter(|s| !is_blank(s))
            .unwrap_or_else(|| last_segment(&rid).to_string());
        let name = name.filter(|s| !is_blank(s)).unwrap_or_else(|| id.clone());

        Self {
            rid,
            id,
            name,
            kind,
        }
    }
}

/// One phase line of a multi-phase inlet.
///
/// Poles have no rid of their own; they are identified by the node id
/// reported with their inlet.
#[derive(Debug, Clone)]
pub struct Pole {
    pub id: i64,
    pub name: String,
}

impl Pole {
    pub fn new(id: i64, name: Option<String>) -> Self {
        let name = name
            .filter(|s| !is_blank(s))
            .unwrap_or_else(|| format!("L{id}"));
        Self { id, name }
    }
}

// the vendor API reports unset labels as a quoted empty string
fn is_blank(s: &str) -> bool {
    s.is_empty() || s == "''"
}

fn last_segment(rid: &str) -> &str {
    rid.rsplit('/').next().unwrap_or(rid)
}

/// Parent handle for a sensor: an index into the owning PDU's connector or
/// pole vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRef {
    Connector(usize),
    Pole(usize),
}

/// A single measurable or counted quantity exposed by a connector or pole
#[derive(Debug, Clone)]
pub struct Sensor {
    pub rid: String,
    pub kind: InterfaceKind,
    pub name: String,
    pub parent: ParentRef,
}

impl Sensor {
    /// Build a sensor once all of its metadata is resolved.
    ///
    /// The metric part of the name is the API slot name when the parent
    /// exposes named slots, otherwise the metric-type table entry; both go
    /// through [`camel_to_snake`]. Counters get a `_total` suffix.
    ///
    /// # Errors
    /// Returns [`ModelError::UnknownInterface`] for an interface outside
    /// the gauge/counter families.
    pub fn new(
        rid: String,
        interface: &str,
        parent: ParentRef,
        slot: Option<&str>,
        metric: usize,
        unit: usize,
    ) -> Result<Self, ModelError> {
        let kind = InterfaceKind::classify(&rid, interface)?;

        let metric = match slot {
            Some(slot) => slot,
            None => SENSOR_TYPES.get(metric).copied().unwrap_or_else(|| {
                debug!(rid = %rid, metric, "metric-type index out of range");
                SENSOR_TYPES[0]
            }),
        };
        let metric = camel_to_snake(metric);
        let unit = SENSOR_UNITS.get(unit).copied().unwrap_or_else(|| {
            debug!(rid = %rid, unit, "unit index out of range");
            SENSOR_UNITS[0]
        });

        let mut name = format!("{EXPORTER_PREFIX}_{metric}");
        if !unit.is_empty() {
            name.push('_');
            name.push_str(unit);
        }
        if kind == InterfaceKind::Counter {
            name.push_str("_total");
        }

        if metric == "unspecified" {
            debug!(sensor = %name, "sensor is of unspecified type");
        }

        Ok(Self {
            rid,
            kind,
            name,
            parent,
        })
    }
}

/// A single reading.
///
/// Identity fields are copied out of the originating sensor and its parent
/// chain so aggregation and rendering never touch the object graph.
#[derive(Debug, Clone)]
pub struct Metric {
    pub name: String,
    pub interface: String,
    pub pdu: String,
    pub label: String,
    pub parent_type: String,
    pub connector_id: String,
    pub sensor_rid: String,
    pub value: Value,
    pub timestamp: f64,
}

impl Metric {
    /// Whether the reading carries a numeric value.
    /// Non-numeric values are logged and excluded from emission.
    pub fn is_numeric(&self) -> bool {
        if self.value.is_number() {
            return true;
        }
        debug!(
            pdu = %self.pdu,
            sensor = %self.name,
            value = %self.value,
            "sensor does not have a numeric value"
        );
        false
    }

    pub fn value_f64(&self) -> Option<f64> {
        self.value.as_f64()
    }
}

/// All metrics sharing one (name, interface) pair
#[derive(Debug, Clone)]
pub struct MetricFamily {
    pub name: String,
    pub interface: String,
    pub description: String,
    pub metrics: Vec<Metric>,
}

impl MetricFamily {
    pub fn new(metric: Metric) -> Self {
        let description = SENSOR_DESCRIPTIONS
            .get(metric.name.as_str())
            .copied()
            .unwrap_or("none")
            .to_string();

        Self {
            name: metric.name.clone(),
            interface: metric.interface.clone(),
            description,
            metrics: vec![metric],
        }
    }

    /// Add a metric to this family.
    ///
    /// # Errors
    /// Returns [`ModelError::MetricMismatch`] when name or interface
    /// differ; this indicates a naming collision between logically
    /// distinct measurements and should never happen in correct operation.
    pub fn add(&mut self, metric: Metric) -> Result<(), ModelError> {
        if metric.name == self.name && metric.interface == self.interface {
            self.metrics.push(metric);
            return Ok(());
        }

        Err(ModelError::MetricMismatch {
            family: self.name.clone(),
            metric: metric.name.clone(),
        })
    }
}
