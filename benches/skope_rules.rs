use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use linfa::prelude::*;
use linfa_rules::SkopeRules;
use ndarray::{concatenate, Array, Array1, Array2, Axis};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand::rngs::SmallRng;

/// Many negatives around the origin, a tenth as many positives around `shift`
fn generate_outliers(samples: usize, shift: f64, rng: &mut SmallRng) -> (Array2<f64>, Array1<usize>) {
    let n_features = 4;
    let n_outliers = samples / 10;

    let inliers = Array::random_using((samples, n_features), StandardNormal, rng);
    let outliers = Array::random_using((n_outliers, n_features), StandardNormal, rng) + shift;
    let x = concatenate(Axis(0), &[inliers.view(), outliers.view()]).unwrap();

    let y = std::iter::repeat(0)
        .take(samples)
        .chain(std::iter::repeat(1).take(n_outliers))
        .collect();

    (x, y)
}

fn skope_rules_bench(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(42);

    let training_set_sizes = &[100, 1000, 10000];

    let hyperparams = SkopeRules::params()
        .precision_min(0.3)
        .n_estimators(10)
        .random_state(Some(42));

    let mut group = c.benchmark_group("skope_rules");
    group.sample_size(10);

    for n in training_set_sizes.iter() {
        let (train_x, train_y) = generate_outliers(*n, 2.5, &mut rng);
        let dataset = DatasetBase::new(train_x, train_y);

        group.bench_with_input(BenchmarkId::from_parameter(n), &dataset, |b, d| {
            b.iter(|| hyperparams.fit(d))
        });
    }

    group.finish();
}

criterion_group!(benches, skope_rules_bench);
criterion_main!(benches);
