//! Decode and aggregation benchmarks
//!
//! Measures performBulk envelope decoding and metric-family grouping.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Value};

use rpdu_exporter::exporter::aggregate;
use rpdu_exporter::model::Metric;
use rpdu_exporter::rpc::Responses;

fn reading_envelope(count: usize) -> Value {
    let responses: Vec<Value> = (0..count)
        .map(|i| {
            json!({"json": {"id": i, "result": {"_ret_": {
                "value": 229.8 + i as f64,
                "timestamp": 1609459200
            }}}})
        })
        .collect();
    json!({"result": {"responses": responses}})
}

fn readings(count: usize) -> Vec<Metric> {
    (0..count)
        .map(|i| Metric {
            name: format!("raritan_sensors_metric_{}", i % 12),
            interface: if i % 4 == 0 { "counter" } else { "gauge" }.to_string(),
            pdu: format!("pdu.rack{}", i % 6),
            label: format!("{}", i % 36),
            parent_type: "outlet".to_string(),
            connector_id: format!("{}", i % 36),
            sensor_rid: format!("/tfwopaque/sensors.NumericSensor:4.0.3/S{i}"),
            value: json!(229.8),
            timestamp: 1609459200.0,
        })
        .collect()
}

fn benchmark_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_bulk_reply");

    for count in [8, 64, 512] {
        let envelope = reading_envelope(count);
        group.bench_with_input(
            BenchmarkId::from_parameter(count),
            &envelope,
            |b, envelope| b.iter(|| Responses::from_value(envelope.clone())),
        );
    }

    group.finish();
}

fn benchmark_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for count in [64, 512] {
        let metrics = readings(count);
        group.bench_with_input(
            BenchmarkId::from_parameter(count),
            &metrics,
            |b, metrics| b.iter(|| aggregate(metrics.clone())),
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_decode, benchmark_aggregate);
criterion_main!(benches);
