//! Criterion benchmarks for ether-core DSP primitives
//!
//! Run with: cargo bench -p ether-core
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ether_core::{
    Biquad, Lfo, LfoWaveform, NoiseGenerator, OnePole, OnePoleMode, StateVariableFilter,
    lowpass_coefficients,
};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

fn generate_test_signal(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5
        })
        .collect()
}

fn bench_biquad(c: &mut Criterion) {
    let mut group = c.benchmark_group("Biquad");
    let coeffs = lowpass_coefficients(1000.0, 0.707, SAMPLE_RATE);

    for &block_size in BLOCK_SIZES {
        let input = generate_test_signal(block_size);
        group.bench_with_input(
            BenchmarkId::new("process", block_size),
            &block_size,
            |b, _| {
                let mut biquad = Biquad::new();
                biquad.set(coeffs);
                b.iter(|| {
                    for &sample in &input {
                        black_box(biquad.process(black_box(sample)));
                    }
                });
            },
        );
    }

    group.bench_function("coefficient_calc", |b| {
        b.iter(|| {
            black_box(lowpass_coefficients(
                black_box(2000.0),
                black_box(0.707),
                SAMPLE_RATE,
            ))
        });
    });

    group.finish();
}

fn bench_svf(c: &mut Criterion) {
    let mut group = c.benchmark_group("StateVariableFilter");

    for &block_size in BLOCK_SIZES {
        let input = generate_test_signal(block_size);
        group.bench_with_input(
            BenchmarkId::new("swept", block_size),
            &block_size,
            |b, _| {
                let mut svf = StateVariableFilter::new(SAMPLE_RATE);
                svf.set_resonance(4.0);
                b.iter(|| {
                    for (i, &sample) in input.iter().enumerate() {
                        svf.set_cutoff(500.0 + i as f32 * 10.0);
                        black_box(svf.process(black_box(sample)));
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_misc(c: &mut Criterion) {
    let mut group = c.benchmark_group("Primitives");

    group.bench_function("one_pole_hp_128", |b| {
        let input = generate_test_signal(128);
        let mut hp = OnePole::new(SAMPLE_RATE, 20.0);
        hp.set_mode(OnePoleMode::Highpass);
        b.iter(|| {
            for &sample in &input {
                black_box(hp.process(black_box(sample)));
            }
        });
    });

    group.bench_function("lfo_block_advance_x8", |b| {
        let mut lfos: Vec<Lfo> = (0..8)
            .map(|i| {
                let mut lfo = Lfo::new(SAMPLE_RATE, 0.5 + i as f32);
                lfo.set_waveform(LfoWaveform::from_index(i));
                lfo
            })
            .collect();
        b.iter(|| {
            for lfo in &mut lfos {
                black_box(lfo.advance_block(128));
            }
        });
    });

    group.bench_function("noise_128", |b| {
        let mut noise = NoiseGenerator::new(1);
        b.iter(|| {
            for _ in 0..128 {
                black_box(noise.next_bipolar());
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_biquad, bench_svf, bench_misc);
criterion_main!(benches);
