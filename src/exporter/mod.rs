//! Multi-PDU collection.
//!
//! [`RaritanExporter`] owns one [`Pdu`] per configured endpoint. Discovery
//! runs concurrently at construction time; every scrape fans out one read
//! task per PDU, joins them, and folds the readings into metric families.
//! One PDU failing — at setup or at read time — never affects its
//! siblings.

mod formatter;

pub use formatter::PrometheusFormatter;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::metrics::InternalMetrics;
use crate::model::{Metric, MetricFamily};
use crate::pdu::Pdu;
use crate::rpc::PduAuth;

/// Group metrics into families keyed by (name, interface), preserving
/// first-seen order.
///
/// Pure and synchronous; re-run from scratch on every scrape. A family
/// mismatch cannot occur under this keying and is logged as an error if a
/// naming collision bug ever introduces one.
pub fn aggregate(metrics: Vec<Metric>) -> Vec<MetricFamily> {
    let mut families: Vec<MetricFamily> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for metric in metrics {
        let key = (metric.name.clone(), metric.interface.clone());
        match index.get(&key) {
            Some(&i) => {
                if let Err(err) = families[i].add(metric) {
                    error!(error = %err, "metric family mismatch");
                }
            }
            None => {
                index.insert(key, families.len());
                families.push(MetricFamily::new(metric));
            }
        }
    }

    families
}

/// Coordinates discovery and reads across all configured PDUs
pub struct RaritanExporter {
    pdus: Vec<Arc<Pdu>>,
    metrics: InternalMetrics,
    collect_seq: AtomicU64,
}

impl RaritanExporter {
    /// Build one topology per endpoint and discover them all concurrently.
    ///
    /// PDUs whose discovery fails are dropped with an error log; the
    /// remaining PDUs keep working. Unreachable PDUs stay registered with
    /// an empty topology and simply produce no readings.
    pub async fn new(auths: Vec<PduAuth>) -> Self {
        let metrics = InternalMetrics::new();

        let mut tasks = JoinSet::new();
        for (order, auth) in auths.into_iter().enumerate() {
            let handle = metrics.clone();
            tasks.spawn(async move {
                let name = auth.name.clone();
                let mut pdu = match Pdu::new(auth, handle) {
                    Ok(pdu) => pdu,
                    Err(err) => {
                        error!(pdu = %name, error = %err, "failed to build PDU client");
                        return None;
                    }
                };
                match pdu.setup().await {
                    Ok(()) => Some((order, pdu)),
                    Err(err) => {
                        error!(pdu = %name, error = %err, "discovery failed, dropping PDU");
                        None
                    }
                }
            });
        }

        let mut pdus: Vec<(usize, Pdu)> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(entry)) => pdus.push(entry),
                Ok(None) => {}
                Err(err) => error!(error = %err, "setup task failed"),
            }
        }
        // configuration order, not completion order
        pdus.sort_by_key(|(order, _)| *order);

        Self {
            pdus: pdus.into_iter().map(|(_, pdu)| Arc::new(pdu)).collect(),
            metrics,
            collect_seq: AtomicU64::new(0),
        }
    }

    pub fn pdus(&self) -> &[Arc<Pdu>] {
        &self.pdus
    }

    pub fn internal_metrics(&self) -> &InternalMetrics {
        &self.metrics
    }

    /// Read all PDUs concurrently and group the readings into families.
    pub async fn read(&self, collect_id: &str) -> Vec<MetricFamily> {
        let mut tasks = JoinSet::new();
        for (order, pdu) in self.pdus.iter().enumerate() {
            let pdu = Arc::clone(pdu);
            let collect_id = collect_id.to_string();
            tasks.spawn(async move { (order, pdu.read(&collect_id).await) });
        }

        let mut readings: Vec<(usize, Vec<Metric>)> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => readings.push(entry),
                Err(err) => error!(collect_id, error = %err, "read task failed"),
            }
        }
        // stable family order regardless of task completion order
        readings.sort_by_key(|(order, _)| *order);

        let metrics: Vec<Metric> = readings
            .into_iter()
            .flat_map(|(_, metrics)| metrics)
            .collect();

        aggregate(metrics)
    }

    /// Collect sensor readings and render them for one scrape.
    pub async fn collect(&self) -> String {
        let collect_id = format!("{:06x}", self.collect_seq.fetch_add(1, Ordering::Relaxed));
        debug!(%collect_id, "received collect request");

        let start = Instant::now();
        let families = self.read(&collect_id).await;
        let output = PrometheusFormatter::new().format_families(&families);
        let elapsed = start.elapsed().as_secs_f64();
        self.metrics.observe_collect(elapsed);

        let n_metrics: usize = families.iter().map(|f| f.metrics.len()).sum();
        debug!(
            %collect_id,
            families = families.len(),
            metrics = n_metrics,
            duration_ms = (elapsed * 1000.0) as u64,
            "completed collect"
        );

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn metric(pdu: &str, name: &str, interface: &str, value: Value) -> Metric {
        Metric {
            name: name.to_string(),
            interface: interface.to_string(),
            pdu: pdu.to_string(),
            label: "1".to_string(),
            parent_type: "outlet".to_string(),
            connector_id: "1".to_string(),
            sensor_rid: "rid/1".to_string(),
            value,
            timestamp: 1609459200.0,
        }
    }

    #[test]
    fn test_aggregate_groups_by_name_and_interface() {
        let metrics = vec![
            metric("a", "raritan_sensors_voltage_volt", "gauge", json!(1)),
            metric("a", "raritan_sensors_current_ampere", "gauge", json!(2)),
            metric("a", "raritan_sensors_voltage_volt", "gauge", json!(3)),
        ];

        let families = aggregate(metrics);
        assert_eq!(families.len(), 2);
        assert_eq!(families[0].name, "raritan_sensors_voltage_volt");
        assert_eq!(families[0].metrics.len(), 2);
        assert_eq!(families[1].name, "raritan_sensors_current_ampere");
        assert_eq!(families[1].metrics.len(), 1);
    }

    #[test]
    fn test_aggregate_folds_duplicates_across_pdus() {
        let forward = vec![
            metric("a", "raritan_sensors_voltage_volt", "gauge", json!(1)),
            metric("b", "raritan_sensors_voltage_volt", "gauge", json!(2)),
        ];
        let reverse: Vec<Metric> = forward.iter().rev().cloned().collect();

        let families = aggregate(forward);
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].metrics.len(), 2);
        assert_eq!(families[0].metrics[0].pdu, "a");

        // grouping is independent of PDU iteration order
        let families = aggregate(reverse);
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].metrics.len(), 2);
        assert_eq!(families[0].metrics[0].pdu, "b");
    }

    #[test]
    fn test_aggregate_same_name_different_interface() {
        let metrics = vec![
            metric("a", "raritan_sensors_power", "gauge", json!(1)),
            metric("a", "raritan_sensors_power", "counter", json!(2)),
        ];

        let families = aggregate(metrics);
        assert_eq!(families.len(), 2);
        assert_eq!(families[0].interface, "gauge");
        assert_eq!(families[1].interface, "counter");
    }

    #[test]
    fn test_aggregate_first_seen_order() {
        let metrics = vec![
            metric("a", "raritan_sensors_temperature_degree_celsius", "gauge", json!(21)),
            metric("a", "raritan_sensors_voltage_volt", "gauge", json!(230)),
            metric("a", "raritan_sensors_temperature_degree_celsius", "gauge", json!(22)),
        ];

        let families = aggregate(metrics);
        assert_eq!(families[0].name, "raritan_sensors_temperature_degree_celsius");
        assert_eq!(families[1].name, "raritan_sensors_voltage_volt");
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate(Vec::new()).is_empty());
    }

    #[tokio::test]
    async fn test_exporter_with_no_pdus() {
        let exporter = RaritanExporter::new(Vec::new()).await;
        assert!(exporter.pdus().is_empty());
        assert!(exporter.read("-").await.is_empty());

        // an empty fleet still serves a valid (empty) exposition body
        let output = exporter.collect().await;
        assert!(output.is_empty());
        let internal = exporter.internal_metrics().render();
        assert!(internal.contains("raritan_collector_collect_seconds_count 1"));
    }
}
