use criterion::{criterion_group, Criterion};
use keysafe_cryptography::{Curve, KeyGenerator};
use std::hint::black_box;

fn benchmark_key_generation(c: &mut Criterion) {
    let generator = KeyGenerator::new();
    c.bench_function(&format!("{}/curve={}", module_path!(), Curve::P256), |b| {
        b.iter(|| black_box(generator.generate(Curve::P256).unwrap()));
    });
}

criterion_group!(benches, benchmark_key_generation);
