use criterion::criterion_main;

mod key_generation;

criterion_main!(
    key_generation::benches,
    signature_generation::benches,
    signature_verification::benches,
);
