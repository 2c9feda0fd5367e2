use criterion::{black_box, criterion_group, criterion_main, Criterion};
use orbweave_core::prelude::*;

fn ring(n: usize) -> Vec<Vec2> {
    (0..n)
        .map(|i| {
            let a = i as f32 / n as f32 * TAU;
            Vec2::new(a.cos(), a.sin()) * (70.0 + 3.0 * (a * 3.3).sin())
        })
        .collect()
}

fn bench_spline(c: &mut Criterion) {
    let pts = ring(128);
    let mut out = Vec::new();
    c.bench_function("closed_spline 128x10", |b| {
        b.iter(|| closed_spline_into(black_box(&pts), 0.5, 10, &mut out));
    });
}

fn bench_noise(c: &mut Criterion) {
    let n = Perlin::new(0xB10B);
    c.bench_function("perlin 128 samples", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for i in 0..128 {
                let a = i as f32 * 0.049;
                acc += n.sample(black_box(a.cos() * 1.2), a.sin() * 1.2, 0.37);
            }
            acc
        });
    });
}

criterion_group!(benches, bench_spline, bench_noise);
criterion_main!(benches);
