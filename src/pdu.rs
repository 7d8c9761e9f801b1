//! PDU topology discovery and sensor reads.
//!
//! A [`Pdu`] walks the device's object model in staged bulk calls:
//! connectors (inlets, outlets, device slots), connector metadata and
//! settings, inlet poles with their per-phase sensors, connector sensors,
//! and finally sensor metadata. Each stage is one performBulk request.
//!
//! Failure rules: a stage whose whole batch fails aborts discovery for
//! this PDU, except when the device cannot be reached at all, which leaves
//! the topology empty so sibling PDUs are unaffected. Missing responses
//! for individual entities within a successful batch are only logged.

use std::collections::HashSet;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{PduError, RpcError};
use crate::metrics::InternalMetrics;
use crate::model::{Connector, ConnectorType, InterfaceKind, Metric, ParentRef, Pole, Sensor};
use crate::rpc::{BulkClient, BulkReply, BulkRequest, PduAuth, Responses};

/// (rid, method, request id) triples of the connector-listing stage
const CONNECTOR_QUERIES: [(&str, &str, &str); 3] = [
    ("/model/pdu/0", "getInlets", "inlet"),
    ("/model/pdu/0", "getOutlets", "outlet"),
    ("/model/peripheraldevicemanager", "getDeviceSlots", "device"),
];

/// Pole record keys that describe the pole itself; every other non-null
/// key is a per-phase sensor slot.
const POLE_IDENTITY_KEYS: [&str; 3] = ["label", "line", "nodeId"];

/// Connector awaiting its metadata and settings passes
#[derive(Debug)]
struct ConnectorDraft {
    rid: String,
    kind: ConnectorType,
    id: Option<String>,
    name: Option<String>,
}

/// Sensor awaiting its metadata pass
#[derive(Debug)]
struct SensorDraft {
    rid: String,
    interface: String,
    parent: ParentRef,
    slot: Option<String>,
    metric: usize,
    unit: usize,
}

/// One Raritan PDU and its discovered object graph.
///
/// The graph is owned exclusively by this instance: connectors, poles and
/// sensors live in flat vectors, torn down and rebuilt together on every
/// [`Pdu::setup`].
#[derive(Debug)]
pub struct Pdu {
    pub name: String,
    auth: PduAuth,
    client: BulkClient,
    metrics: InternalMetrics,

    pub connectors: Vec<Connector>,
    pub poles: Vec<Pole>,
    pub sensors: Vec<Sensor>,

    pub n_inlets: usize,
    pub n_outlets: usize,
    pub n_devices: usize,
    pub n_poles: usize,
    pub n_sensors: usize,
}

impl Pdu {
    /// Create an empty topology for one endpoint.
    ///
    /// # Errors
    /// Fails when the HTTP client cannot be constructed.
    pub fn new(auth: PduAuth, metrics: InternalMetrics) -> Result<Self, RpcError> {
        let client = BulkClient::new(&auth)?;
        info!(pdu = %auth.name, url = %auth.url, "polling PDU");

        Ok(Self {
            name: auth.name.clone(),
            auth,
            client,
            metrics,
            connectors: Vec::new(),
            poles: Vec::new(),
            sensors: Vec::new(),
            n_inlets: 0,
            n_outlets: 0,
            n_devices: 0,
            n_poles: 0,
            n_sensors: 0,
        })
    }

    pub fn auth(&self) -> &PduAuth {
        &self.auth
    }

    /// Discover the connector, pole and sensor graph.
    ///
    /// Idempotent: calling again rebuilds the graph from scratch. A PDU
    /// that refuses the connection outright is logged and left empty;
    /// every other failure propagates.
    pub async fn setup(&mut self) -> Result<(), PduError> {
        self.clear();

        match self.discover().await {
            Ok(()) => {}
            Err(err) if err.is_connect() => {
                warn!(pdu = %self.name, error = %err, "PDU is unreachable, leaving topology empty");
                self.clear();
                return Ok(());
            }
            Err(err) => return Err(err),
        }

        self.n_inlets = self.count_connectors(ConnectorType::Inlet);
        self.n_outlets = self.count_connectors(ConnectorType::Outlet);
        self.n_devices = self.count_connectors(ConnectorType::Device);
        self.n_poles = self.poles.len();
        self.n_sensors = self.sensors.len();

        info!(
            pdu = %self.name,
            inlets = self.n_inlets,
            outlets = self.n_outlets,
            devices = self.n_devices,
            poles = self.n_poles,
            sensors = self.n_sensors,
            "discovery complete"
        );

        Ok(())
    }

    /// Read every known sensor in one bulk call.
    ///
    /// Reads never fail the exporter: any batch-level error is logged and
    /// yields zero metrics for this cycle.
    pub async fn read(&self, collect_id: &str) -> Vec<Metric> {
        if self.sensors.is_empty() {
            return Vec::new();
        }

        let mut request = BulkRequest::new();
        for (i, sensor) in self.sensors.iter().enumerate() {
            request.add(&sensor.rid, "getReading", i);
        }

        let result = match self.client.send(&request).await {
            Ok(BulkReply::Responses(responses)) => responses,
            Ok(BulkReply::Empty(cause)) => {
                warn!(pdu = %self.name, collect_id, error = %cause, "no readings returned");
                self.metrics.record_read_failure(&self.name);
                return Vec::new();
            }
            Err(err) => {
                error!(pdu = %self.name, collect_id, error = %err, "bulk read failed");
                self.metrics.record_read_failure(&self.name);
                return Vec::new();
            }
        };
        self.metrics.record_read_success(&self.name);

        if result.len() < self.sensors.len() {
            debug!(
                pdu = %self.name,
                collect_id,
                readings = result.len(),
                sensors = self.n_sensors,
                "API request returned fewer readings than known sensors"
            );
            self.debug_unanswered(
                "getReading",
                &self
                    .sensors
                    .iter()
                    .map(|s| s.name.clone())
                    .collect::<Vec<_>>(),
                &result,
            );
        }

        let mut metrics = Vec::new();
        for resp in result.responses {
            let Some(i) = resp.id.as_index() else { continue };
            let Some(sensor) = self.sensors.get(i) else {
                debug!(pdu = %self.name, collect_id, id = i, "reading for unknown sensor");
                continue;
            };

            let value = resp.ret.get("value").cloned().unwrap_or(Value::Null);
            let timestamp = resp
                .ret
                .get("timestamp")
                .and_then(Value::as_f64)
                .unwrap_or_default();
            metrics.push(self.metric_for(sensor, value, timestamp));
        }

        metrics
    }

    fn clear(&mut self) {
        self.connectors.clear();
        self.poles.clear();
        self.sensors.clear();
        self.n_inlets = 0;
        self.n_outlets = 0;
        self.n_devices = 0;
        self.n_poles = 0;
        self.n_sensors = 0;
    }

    fn count_connectors(&self, kind: ConnectorType) -> usize {
        self.connectors.iter().filter(|c| c.kind == kind).count()
    }

    async fn discover(&mut self) -> Result<(), PduError> {
        let drafts = self.connector_rids().await?;
        let drafts = self.connector_metadata(drafts).await?;
        let drafts = self.connector_settings(drafts).await?;
        self.connectors = drafts
            .into_iter()
            .map(|d| Connector::new(d.rid, d.kind, d.id, d.name))
            .collect();

        let mut sensor_drafts = self.pole_sensors().await?;
        sensor_drafts.extend(self.connector_sensors().await?);
        let sensor_drafts = self.sensor_metadata(sensor_drafts).await?;

        let mut sensors = Vec::with_capacity(sensor_drafts.len());
        for draft in sensor_drafts {
            sensors.push(Sensor::new(
                draft.rid,
                &draft.interface,
                draft.parent,
                draft.slot.as_deref(),
                draft.metric,
                draft.unit,
            )?);
        }
        self.sensors = sensors;

        Ok(())
    }

    /// Stage 1: list inlets, outlets and device slots in one batch.
    async fn connector_rids(&self) -> Result<Vec<ConnectorDraft>, RpcError> {
        let mut request = BulkRequest::new();
        for (rid, method, tag) in CONNECTOR_QUERIES {
            request.add(rid, method, tag);
        }

        let result = self.client.send(&request).await?.into_responses()?;

        let mut drafts = Vec::new();
        let mut answered: HashSet<&str> = HashSet::new();
        for resp in &result.responses {
            let Some(tag) = resp.id.as_tag() else {
                debug!(pdu = %self.name, id = %resp.id, "unexpected positional id, skipping");
                continue;
            };
            let Some(kind) = ConnectorType::from_tag(tag) else {
                debug!(pdu = %self.name, tag, "unknown connector tag, skipping");
                continue;
            };
            answered.insert(kind.as_str());

            let Some(rid) = resp.ret.get("rid").and_then(Value::as_str) else {
                debug!(pdu = %self.name, tag, "connector record without rid, skipping");
                continue;
            };
            drafts.push(ConnectorDraft {
                rid: rid.to_string(),
                kind,
                id: None,
                name: None,
            });
        }

        for (_, _, tag) in CONNECTOR_QUERIES {
            if !answered.contains(tag) {
                debug!(pdu = %self.name, stage = "connector_rids", missing = tag, "no response");
            }
        }

        Ok(drafts)
    }

    /// Stage 2: fold metadata labels into the drafts.
    /// Device slots carry no metadata and are not queried.
    async fn connector_metadata(
        &self,
        mut drafts: Vec<ConnectorDraft>,
    ) -> Result<Vec<ConnectorDraft>, RpcError> {
        let mut request = BulkRequest::new();
        for (i, draft) in drafts.iter().enumerate() {
            if draft.kind == ConnectorType::Device {
                continue;
            }
            request.add(&draft.rid, "getMetaData", i);
        }
        if request.is_empty() {
            return Ok(drafts);
        }

        let result = self.client.send(&request).await?.into_responses()?;

        for resp in &result.responses {
            let Some(i) = resp.id.as_index() else { continue };
            let Some(draft) = drafts.get_mut(i) else {
                continue;
            };
            draft.id = resp
                .ret
                .get("label")
                .and_then(Value::as_str)
                .map(str::to_string);
        }

        let names: Vec<String> = drafts.iter().map(|d| d.rid.clone()).collect();
        self.debug_unanswered("getMetaData", &names, &result);

        Ok(drafts)
    }

    /// Stage 3: fold custom display names into the drafts.
    async fn connector_settings(
        &self,
        mut drafts: Vec<ConnectorDraft>,
    ) -> Result<Vec<ConnectorDraft>, RpcError> {
        let mut request = BulkRequest::new();
        for (i, draft) in drafts.iter().enumerate() {
            request.add(&draft.rid, "getSettings", i);
        }
        if request.is_empty() {
            return Ok(drafts);
        }

        let result = self.client.send(&request).await?.into_responses()?;

        for resp in &result.responses {
            let Some(i) = resp.id.as_index() else { continue };
            let Some(draft) = drafts.get_mut(i) else {
                continue;
            };
            draft.name = resp
                .ret
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string);
        }

        let names: Vec<String> = drafts.iter().map(|d| d.rid.clone()).collect();
        self.debug_unanswered("getSettings", &names, &result);

        Ok(drafts)
    }

    /// Stage 4: discover inlet poles and their per-phase sensors.
    ///
    /// Each response record is one pole; its identity keys name the pole
    /// and every other non-null key is a sensor slot attached to the pole,
    /// not to the inlet.
    async fn pole_sensors(&mut self) -> Result<Vec<SensorDraft>, RpcError> {
        let inlets: Vec<(String, String)> = self
            .connectors
            .iter()
            .filter(|c| c.kind == ConnectorType::Inlet)
            .map(|c| (c.rid.clone(), c.name.clone()))
            .collect();

        let mut request = BulkRequest::new();
        for (i, (rid, _)) in inlets.iter().enumerate() {
            request.add(rid, "getPoles", i);
        }
        if request.is_empty() {
            return Ok(Vec::new());
        }

        let result = self.client.send(&request).await?.into_responses()?;

        let mut drafts = Vec::new();
        for resp in &result.responses {
            let Some(record) = resp.ret.as_object() else {
                debug!(pdu = %self.name, id = %resp.id, "malformed pole record, skipping");
                continue;
            };
            let Some(node_id) = record.get("nodeId").and_then(Value::as_i64) else {
                debug!(pdu = %self.name, id = %resp.id, "pole record without nodeId, skipping");
                continue;
            };
            let label = record
                .get("label")
                .and_then(Value::as_str)
                .map(str::to_string);

            self.poles.push(Pole::new(node_id, label));
            let pole_index = self.poles.len() - 1;

            for (slot, data) in record {
                if POLE_IDENTITY_KEYS.contains(&slot.as_str()) || data.is_null() {
                    continue;
                }
                let (Some(rid), Some(interface)) = (
                    data.get("rid").and_then(Value::as_str),
                    data.get("type").and_then(Value::as_str),
                ) else {
                    debug!(pdu = %self.name, slot = %slot, "malformed pole sensor slot, skipping");
                    continue;
                };

                drafts.push(SensorDraft {
                    rid: rid.to_string(),
                    interface: interface.to_string(),
                    parent: ParentRef::Pole(pole_index),
                    slot: Some(slot.clone()),
                    metric: 0,
                    unit: 0,
                });
            }
        }

        let names: Vec<String> = inlets.into_iter().map(|(_, name)| name).collect();
        self.debug_unanswered("getPoles", &names, &result);

        Ok(drafts)
    }

    /// Stage 5: discover connector-level sensors.
    ///
    /// Inlets and outlets return named, nullable sensor slots; device
    /// slots return a single nullable device. Sensors outside the
    /// gauge/counter interface families are state sensors and are skipped.
    async fn connector_sensors(&self) -> Result<Vec<SensorDraft>, RpcError> {
        let mut request = BulkRequest::new();
        for (i, connector) in self.connectors.iter().enumerate() {
            request.add(&connector.rid, connector.kind.sensor_method(), i);
        }
        if request.is_empty() {
            return Ok(Vec::new());
        }

        let result = self.client.send(&request).await?.into_responses()?;

        let mut drafts = Vec::new();
        for resp in &result.responses {
            let Some(i) = resp.id.as_index() else { continue };
            let Some(connector) = self.connectors.get(i) else {
                continue;
            };

            match connector.kind {
                ConnectorType::Device => {
                    let device = resp.ret.pointer("/value/device").cloned().unwrap_or(Value::Null);
                    if device.is_null() {
                        continue; // unused slot
                    }
                    let (Some(rid), Some(interface)) = (
                        device.get("rid").and_then(Value::as_str),
                        device.get("type").and_then(Value::as_str),
                    ) else {
                        debug!(pdu = %self.name, connector = %connector.name, "malformed device record, skipping");
                        continue;
                    };
                    if !InterfaceKind::is_exportable(interface) {
                        continue; // state sensor
                    }

                    drafts.push(SensorDraft {
                        rid: rid.to_string(),
                        interface: interface.to_string(),
                        parent: ParentRef::Connector(i),
                        slot: None,
                        metric: 0,
                        unit: 0,
                    });
                }
                ConnectorType::Inlet | ConnectorType::Outlet => {
                    let Some(slots) = resp.ret.as_object() else {
                        debug!(pdu = %self.name, connector = %connector.name, "malformed sensor record, skipping");
                        continue;
                    };
                    for (slot, data) in slots {
                        if data.is_null() {
                            continue; // unused slot
                        }
                        let (Some(rid), Some(interface)) = (
                            data.get("rid").and_then(Value::as_str),
                            data.get("type").and_then(Value::as_str),
                        ) else {
                            debug!(pdu = %self.name, slot = %slot, "malformed sensor slot, skipping");
                            continue;
                        };
                        if !InterfaceKind::is_exportable(interface) {
                            continue; // state sensor
                        }

                        drafts.push(SensorDraft {
                            rid: rid.to_string(),
                            interface: interface.to_string(),
                            parent: ParentRef::Connector(i),
                            slot: Some(slot.clone()),
                            metric: 0,
                            unit: 0,
                        });
                    }
                }
            }
        }

        let names: Vec<String> = self.connectors.iter().map(|c| c.name.clone()).collect();
        self.debug_unanswered(
            "getSensors/getDevice",
            &names,
            &result,
        );

        Ok(drafts)
    }

    /// Stage 6: resolve metric-type and unit indices for every sensor.
    async fn sensor_metadata(
        &self,
        mut drafts: Vec<SensorDraft>,
    ) -> Result<Vec<SensorDraft>, RpcError> {
        let mut request = BulkRequest::new();
        for (i, draft) in drafts.iter().enumerate() {
            request.add(&draft.rid, "getMetaData", i);
        }
        if request.is_empty() {
            return Ok(drafts);
        }

        let result = self.client.send(&request).await?.into_responses()?;

        for resp in &result.responses {
            let Some(i) = resp.id.as_index() else { continue };
            let Some(draft) = drafts.get_mut(i) else {
                continue;
            };
            draft.metric = resp
                .ret
                .pointer("/type/type")
                .and_then(Value::as_u64)
                .unwrap_or(0) as usize;
            draft.unit = resp
                .ret
                .pointer("/type/unit")
                .and_then(Value::as_u64)
                .unwrap_or(0) as usize;
        }

        let names: Vec<String> = drafts
            .iter()
            .map(|d| d.rid.rsplit('/').next().unwrap_or(&d.rid).to_string())
            .collect();
        self.debug_unanswered("getMetaData", &names, &result);

        Ok(drafts)
    }

    fn metric_for(&self, sensor: &Sensor, value: Value, timestamp: f64) -> Metric {
        let (label, parent_type, connector_id) = match sensor.parent {
            ParentRef::Connector(i) => self
                .connectors
                .get(i)
                .map(|c| (c.name.clone(), c.kind.as_str().to_string(), c.id.clone()))
                .unwrap_or_default(),
            ParentRef::Pole(i) => self
                .poles
                .get(i)
                .map(|p| (p.name.clone(), "pole".to_string(), p.id.to_string()))
                .unwrap_or_default(),
        };

        Metric {
            name: sensor.name.clone(),
            interface: sensor.kind.as_str().to_string(),
            pdu: self.name.clone(),
            label,
            parent_type,
            connector_id,
            sensor_rid: sensor.rid.clone(),
            value,
            timestamp,
        }
    }

    /// Log the entities of a batch that got no matching reply.
    fn debug_unanswered(&self, stage: &str, names: &[String], responses: &Responses) {
        if !tracing::enabled!(tracing::Level::DEBUG) {
            return;
        }

        let answered: HashSet<usize> = responses.answered_indices().collect();
        let missing: Vec<&str> = names
            .iter()
            .enumerate()
            .filter(|(i, _)| !answered.contains(i))
            .map(|(_, name)| name.as_str())
            .collect();

        if !missing.is_empty() {
            debug!(
                pdu = %self.name,
                stage,
                missing = %missing.join(", "),
                "no response for some requests"
            );
        }
    }
}
