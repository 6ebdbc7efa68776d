//! Benchmarks for parallel forest construction.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use annforest::{AnnIndex, DistanceMetric};

fn create_random_vectors(n: usize, dim: usize) -> Vec<Vec<f32>> {
    (0..n)
        .map(|_| (0..dim).map(|_| rand::random::<f32>()).collect())
        .collect()
}

fn benchmark_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(10);

    let vectors = create_random_vectors(5000, 32);

    for trees in [1, 10, 50].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(trees), trees, |b, &trees| {
            b.iter(|| {
                let mut index = AnnIndex::new(32, DistanceMetric::Euclidean);
                index.set_seed(1).unwrap();
                for (i, v) in vectors.iter().enumerate() {
                    index.add_item(i as u32, v).unwrap();
                }
                index.build(black_box(trees)).unwrap();
                index
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_build);
criterion_main!(benches);
