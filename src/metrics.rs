//! Internal observability metrics for rPDU-Exporter
//!
//! Tracks the exporter's own operation: per-PDU bulk read outcomes and
//! collection durations. The registry is a cheap cloneable handle that is
//! injected into the components that record into it; there is no global
//! instance.
//!
//! # Metrics
//!
//! - `raritan_pdu_read_success_total{pdu="..."}` - Counter of successful bulk reads
//! - `raritan_pdu_read_failure_total{pdu="..."}` - Counter of failed bulk reads
//! - `raritan_collector_collect_seconds_sum` / `_count` - Summary of collect durations

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Thread-safe counter using atomic operations
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    /// Increment the counter by 1
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current value
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Clone for Counter {
    fn clone(&self) -> Self {
        Self {
            value: AtomicU64::new(self.get()),
        }
    }
}

/// Thread-safe summary: sum and count of observed values
#[derive(Debug, Default)]
pub struct Summary {
    /// Stored as bits of f64 for atomic operations
    sum: AtomicU64,
    count: AtomicU64,
}

impl Summary {
    pub fn new() -> Self {
        Self {
            sum: AtomicU64::new(0.0_f64.to_bits()),
            count: AtomicU64::new(0),
        }
    }

    /// Observe a value
    pub fn observe(&self, v: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);

        // atomic f64 add
        loop {
            let current = self.sum.load(Ordering::Relaxed);
            let new = f64::from_bits(current) + v;
            if self
                .sum
                .compare_exchange_weak(current, new.to_bits(), Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }
    }

    pub fn sum(&self) -> f64 {
        f64::from_bits(self.sum.load(Ordering::Relaxed))
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Per-PDU read metrics
#[derive(Debug, Clone, Default)]
pub struct PduMetrics {
    /// Counter of bulk reads that returned readings
    pub read_success_total: Counter,
    /// Counter of bulk reads that failed or came back empty
    pub read_failure_total: Counter,
}

/// Internal metrics registry
///
/// Cloning shares the underlying storage.
#[derive(Debug, Clone, Default)]
pub struct InternalMetrics {
    /// Per-PDU metrics, keyed by PDU name
    pdus: Arc<RwLock<HashMap<String, PduMetrics>>>,
    /// Summary of collect durations
    collect_seconds: Arc<Summary>,
}

impl InternalMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create metrics for a PDU
    pub fn pdu(&self, name: &str) -> PduMetrics {
        {
            let pdus = self.pdus.read().expect("RwLock poisoned");
            if let Some(metrics) = pdus.get(name) {
                return metrics.clone();
            }
        }

        let mut pdus = self.pdus.write().expect("RwLock poisoned");
        pdus.entry(name.to_string()).or_default().clone()
    }

    /// Record a successful bulk read for a PDU
    pub fn record_read_success(&self, name: &str) {
        let mut pdus = self.pdus.write().expect("RwLock poisoned");
        pdus.entry(name.to_string())
            .or_default()
            .read_success_total
            .inc();
    }

    /// Record a failed bulk read for a PDU
    pub fn record_read_failure(&self, name: &str) {
        let mut pdus = self.pdus.write().expect("RwLock poisoned");
        pdus.entry(name.to_string())
            .or_default()
            .read_failure_total
            .inc();
    }

    /// Record the duration of one collect cycle
    pub fn observe_collect(&self, duration_seconds: f64) {
        self.collect_seconds.observe(duration_seconds);
    }

    /// Render all internal metrics in Prometheus exposition format
    pub fn render(&self) -> String {
        let mut output = String::new();

        let pdus = self.pdus.read().expect("RwLock poisoned");
        if !pdus.is_empty() {
            let mut names: Vec<&String> = pdus.keys().collect();
            names.sort();

            output.push_str(
                "# HELP raritan_pdu_read_success_total Total number of successful bulk reads\n",
            );
            output.push_str("# TYPE raritan_pdu_read_success_total counter\n");
            for name in &names {
                output.push_str(&format!(
                    "raritan_pdu_read_success_total{{pdu=\"{}\"}} {}\n",
                    name,
                    pdus[name.as_str()].read_success_total.get()
                ));
            }

            output.push_str(
                "# HELP raritan_pdu_read_failure_total Total number of failed bulk reads\n",
            );
            output.push_str("# TYPE raritan_pdu_read_failure_total counter\n");
            for name in &names {
                output.push_str(&format!(
                    "raritan_pdu_read_failure_total{{pdu=\"{}\"}} {}\n",
                    name,
                    pdus[name.as_str()].read_failure_total.get()
                ));
            }
        }
        drop(pdus);

        output.push_str(concat!(
            "# HELP raritan_collector_collect_seconds ",
            "Time spent to collect metrics from the Raritan PDUs\n",
            "# TYPE raritan_collector_collect_seconds summary\n",
        ));
        output.push_str(&format!(
            "raritan_collector_collect_seconds_sum {}\n",
            self.collect_seconds.sum()
        ));
        output.push_str(&format!(
            "raritan_collector_collect_seconds_count {}\n",
            self.collect_seconds.count()
        ));

        output
    }
}
