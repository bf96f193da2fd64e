use config::EngineConfig;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use engine::Engine;
use tempfile::tempdir;

const N_KEYS: usize = 10_000;
const VALUE_SIZE: usize = 100;

fn huge_flush_threshold_config() -> EngineConfig {
    EngineConfig {
        rbtree_flush_size: 1024 * 1024 * 1024,
        ..EngineConfig::default()
    }
}

fn segment_flush_benchmark(c: &mut Criterion) {
    c.bench_function("segment_flush_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let mut engine = Engine::open(dir.path(), huge_flush_threshold_config()).unwrap();
                for i in 0..N_KEYS {
                    engine
                        .put(format!("key{}", i).as_bytes(), &vec![b'x'; VALUE_SIZE])
                        .unwrap();
                }
                (dir, engine)
            },
            |(_dir, mut engine)| {
                engine.force_flush().unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

fn segment_get_hit_benchmark(c: &mut Criterion) {
    c.bench_function("segment_get_hit_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let mut engine = Engine::open(dir.path(), huge_flush_threshold_config()).unwrap();
                for i in 0..N_KEYS {
                    engine
                        .put(format!("key{}", i).as_bytes(), &vec![b'x'; VALUE_SIZE])
                        .unwrap();
                }
                engine.force_flush().unwrap();
                (dir, engine)
            },
            |(_dir, engine)| {
                for i in 0..N_KEYS {
                    let key = format!("key{}", i).into_bytes();
                    engine.get(&key).unwrap();
                }
            },
            BatchSize::LargeInput,
        );
    });
}

fn segment_get_miss_benchmark(c: &mut Criterion) {
    c.bench_function("segment_get_miss_10k", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let mut engine = Engine::open(dir.path(), huge_flush_threshold_config()).unwrap();
                for i in 0..N_KEYS {
                    engine
                        .put(format!("key{}", i).as_bytes(), &vec![b'x'; VALUE_SIZE])
                        .unwrap();
                }
                engine.force_flush().unwrap();
                (dir, engine)
            },
            |(_dir, engine)| {
                for i in 0..N_KEYS {
                    let key = format!("missing{}", i).into_bytes();
                    assert!(engine.get(&key).is_err());
                }
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    segment_flush_benchmark,
    segment_get_hit_benchmark,
    segment_get_miss_benchmark
);
criterion_main!(benches);
