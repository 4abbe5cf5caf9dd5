//! Performance benchmarks for a3s-event-exporter
//!
//! Run with: cargo bench

use a3s_event_exporter::{
    ChannelReceiverRegistry, Config, EnhancedEvent, Engine, Event, MemorySink, ObjectReference,
    ReceiverRegistry,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::collections::HashMap;
use std::sync::Arc;

const ROUTE: &str = r#"
route:
  drop:
    - namespace: "^kube-system$"
  match:
    - reason: "^(Failed|BackOff)$"
      receiver: failures
  routes:
    - match:
        - namespace: "^prod"
          receiver: prod
    - match:
        - labels:
            team: "^payments$"
          receiver: payments
    - drop:
        - type: Normal
      match:
        - minCount: 5
          receiver: noisy
"#;

fn sample_event(namespace: &str, reason: &str) -> EnhancedEvent {
    let mut event = Event {
        reason: reason.to_string(),
        message: "Back-off restarting failed container".to_string(),
        event_type: "Warning".to_string(),
        count: 7,
        involved_object: ObjectReference {
            kind: "Pod".to_string(),
            namespace: namespace.to_string(),
            name: "checkout-7d9f".to_string(),
            api_version: "v1".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    event.metadata.namespace = namespace.to_string();

    EnhancedEvent::new(&event)
        .with_labels(HashMap::from([("team".to_string(), "payments".to_string())]))
        .with_annotations(HashMap::new())
}

fn registry() -> Arc<ChannelReceiverRegistry> {
    let registry = Arc::new(ChannelReceiverRegistry::new(1 << 16));
    for name in ["failures", "prod", "payments", "noisy"] {
        registry.register(name, Arc::new(MemorySink::new()));
    }
    registry
}

fn bench_route_evaluation(c: &mut Criterion) {
    let config = Config::from_yaml(ROUTE).unwrap();
    let matching = sample_event("prod-eu", "BackOff");
    let dropped = sample_event("kube-system", "BackOff");

    c.bench_function("find_matched_rules (match)", |b| {
        b.iter(|| config.route.find_matched_rules(&matching).matches_all);
    });

    c.bench_function("find_matched_rules (drop)", |b| {
        b.iter(|| config.route.find_matched_rules(&dropped).matches_all);
    });
}

fn bench_engine(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let config = Config::from_yaml(ROUTE).unwrap();
    let event = sample_event("prod-eu", "BackOff");

    // Worker tasks need a runtime to spawn on
    let engine = rt.block_on(async { Engine::with_route(config.route.clone(), registry()) });

    c.bench_function("Engine::on_check", |b| {
        b.iter(|| engine.on_check(&event));
    });

    c.bench_function("Engine::on_event (4 receivers)", |b| {
        b.to_async(&rt).iter(|| async { engine.on_event(&event) });
    });

    rt.block_on(engine.stop());
}

fn bench_enhanced_serialization(c: &mut Criterion) {
    let event = sample_event("prod-eu", "BackOff");

    c.bench_function("EnhancedEvent serialize", |b| {
        b.iter(|| serde_json::to_vec(&event).unwrap());
    });
}

criterion_group!(
    benches,
    bench_route_evaluation,
    bench_engine,
    bench_enhanced_serialization,
);
criterion_main!(benches);
