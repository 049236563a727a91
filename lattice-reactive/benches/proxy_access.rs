use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lattice_reactive::{reactive, readonly, Effect, Value};

fn create_record(fields: usize) -> Value {
    Value::record((0..fields).map(|i| (format!("field{}", i), i)))
}

fn bench_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("reads");

    for fields in [8, 64, 512] {
        let raw = create_record(fields);
        let observed = reactive(&raw);
        let locked = readonly(&raw);

        group.bench_with_input(BenchmarkId::new("raw", fields), &raw, |b, raw| {
            b.iter(|| black_box(raw.get("field0")));
        });
        group.bench_with_input(BenchmarkId::new("reactive", fields), &observed, |b, observed| {
            b.iter(|| black_box(observed.get("field0")));
        });
        group.bench_with_input(BenchmarkId::new("readonly", fields), &locked, |b, locked| {
            b.iter(|| black_box(locked.get("field0")));
        });
    }

    group.finish();
}

fn bench_tracked_writes(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracked_writes");

    for readers in [1, 10, 100] {
        let observed = reactive(&create_record(8));
        let effects: Vec<Effect> = (0..readers)
            .map(|_| {
                let reader = observed.clone();
                Effect::new(move || {
                    black_box(reader.get("field0"));
                })
            })
            .collect();

        let mut next = 0;
        group.bench_function(BenchmarkId::from_parameter(readers), |b| {
            b.iter(|| {
                next += 1;
                observed.set("field0", next);
            });
        });

        drop(effects);
    }

    group.finish();
}

fn bench_array_push(c: &mut Criterion) {
    c.bench_function("array_push_1000", |b| {
        b.iter(|| {
            let list = reactive(&Value::array(Vec::<Value>::new()));
            for i in 0..1000 {
                list.call_method("push", &[Value::from(i)]).unwrap();
            }
            black_box(list.len())
        });
    });
}

criterion_group!(benches, bench_reads, bench_tracked_writes, bench_array_push);
criterion_main!(benches);
