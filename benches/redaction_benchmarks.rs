use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use rask_client_telemetry::redaction::{ObjectNode, Payload, Preset, redact, redact_json};
use rask_client_telemetry::{RedactionPolicy, RedactionPolicyBuilder};
use serde_json::{Value, json};

fn sample_event() -> Value {
    json!({
        "user": {"id": 42, "email": "alice@example.com", "password": "hunter2"},
        "request": {
            "method": "POST",
            "path": "/api/orders",
            "headers": {"authorization": "Bearer abc.def", "accept": "application/json"},
            "body": {"items": [{"sku": "A-1", "qty": 2}, {"sku": "B-7", "qty": 1}], "card": "4111-1111-1111-1111"}
        },
        "tags": ["checkout", "web", "eu-west-1"],
        "durationMs": 183
    })
}

fn nested(levels: usize) -> Value {
    let mut value = json!({"leaf": "value", "token": "t"});
    for _ in 0..levels {
        value = json!({"child": value, "sibling": [1, 2, 3]});
    }
    value
}

fn benchmark_redaction(c: &mut Criterion) {
    let event = sample_event();
    let basic = RedactionPolicy::default();
    let production = RedactionPolicyBuilder::preset(Preset::Production)
        .pattern(r"\d{4}-\d{4}-\d{4}-\d{4}", "[CARD]")
        .build()
        .unwrap();

    let mut group = c.benchmark_group("redaction");
    group.throughput(Throughput::Bytes(event.to_string().len() as u64));

    group.bench_function("basic_event", |b| {
        b.iter(|| redact_json(std::hint::black_box(&event), &basic));
    });

    group.bench_function("production_event_with_patterns", |b| {
        b.iter(|| redact_json(std::hint::black_box(&event), &production));
    });

    group.finish();
}

fn benchmark_pathological_shapes(c: &mut Criterion) {
    let policy = RedactionPolicy::default();
    let deep = nested(50);

    c.bench_function("depth_limited_nesting", |b| {
        b.iter(|| redact_json(std::hint::black_box(&deep), &policy));
    });

    let node = ObjectNode::new();
    node.insert("name", "root");
    node.insert("self", node.clone());
    node.insert("payload", sample_event());
    let cyclic = Payload::Object(node);

    c.bench_function("cyclic_graph", |b| {
        b.iter(|| redact(std::hint::black_box(&cyclic), &policy));
    });
}

criterion_group!(benches, benchmark_redaction, benchmark_pathological_shapes);
criterion_main!(benches);
