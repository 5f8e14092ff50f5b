use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rubicon_bridge::{Bridge, BridgeConfig};
use rubicon_sdk::{ObjectRef, ScriptValue};
use rubicon_test::{HeapRuntime, ScriptedInterpreter};

fn started(reply: ScriptValue) -> (Bridge<ScriptedInterpreter>, Arc<HeapRuntime>) {
    let interp = ScriptedInterpreter::new();
    interp.define_function("rubicon.java", "dispatch", move |_| Ok(reply.clone()));
    let bridge = Bridge::new(interp);
    let runtime = Arc::new(HeapRuntime::new());
    bridge.start(runtime.clone(), &BridgeConfig::default()).unwrap();
    (bridge, runtime)
}

fn bench_results(c: &mut Criterion) {
    let mut group = c.benchmark_group("invoke_result");

    for (name, reply) in [
        ("absent", ScriptValue::None),
        ("boolean", ScriptValue::Bool(true)),
        ("integer", ScriptValue::Int(7)),
    ] {
        let (bridge, runtime) = started(reply);
        let target = runtime.python_instance(1);
        let method = runtime.method("run");
        let env = runtime.env();

        group.bench_function(name, |b| {
            b.iter(|| {
                bridge
                    .invoke(&env, black_box(target), black_box(method), ObjectRef::NULL)
                    .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_arguments(c: &mut Criterion) {
    let mut group = c.benchmark_group("invoke_args");
    let (bridge, runtime) = started(ScriptValue::None);
    let target = runtime.python_instance(1);
    let method = runtime.method("call");
    let env = runtime.env();

    for count in [0usize, 4, 16] {
        let items: Vec<_> = (0..count).map(|_| runtime.string("arg")).collect();
        let args = runtime.array(&items);
        group.bench_with_input(BenchmarkId::new("count", count), &args, |b, &args| {
            b.iter(|| bridge.invoke(&env, target, method, black_box(args)).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_results, bench_arguments);
criterion_main!(benches);
