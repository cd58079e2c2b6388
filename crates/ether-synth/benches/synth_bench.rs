//! Criterion benchmarks for ether-synth engines and building blocks
//!
//! Run with: cargo bench -p ether-synth

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ether_core::AudioFrame;
use ether_synth::{
    AdsrEnvelope, DrumKitEngine, FmEngine, GranularEngine, Oscillator, SlideBassEngine,
    SubtractiveEngine, SynthEngine, VectorPath, WavetableEngine, Waveform,
};

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZES: &[usize] = &[64, 128, 256, 512];

// ============================================================================
// Building blocks
// ============================================================================

fn bench_oscillator_waveforms(c: &mut Criterion) {
    let mut group = c.benchmark_group("Oscillator");

    let waveforms = [
        ("Sine", Waveform::Sine),
        ("Saw", Waveform::Saw),
        ("Square", Waveform::Square),
        ("Pulse25", Waveform::Pulse(0.25)),
    ];

    for (name, waveform) in &waveforms {
        let mut osc = Oscillator::new(SAMPLE_RATE);
        osc.set_frequency(440.0);
        osc.set_waveform(*waveform);

        group.bench_function(*name, |b| {
            b.iter(|| {
                let mut sum = 0.0f32;
                for _ in 0..128 {
                    sum += osc.advance();
                }
                black_box(sum)
            })
        });
    }

    group.finish();
}

fn bench_envelope(c: &mut Criterion) {
    let mut env = AdsrEnvelope::new(SAMPLE_RATE);
    env.set_attack_ms(10.0);
    env.set_decay_ms(50.0);
    env.set_sustain(0.7);
    env.gate_on();

    c.bench_function("AdsrEnvelope/128", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for _ in 0..128 {
                sum += env.advance();
            }
            black_box(sum)
        })
    });
}

fn bench_vector_path(c: &mut Criterion) {
    let path = VectorPath::default();
    c.bench_function("VectorPath/position", |b| {
        let mut s = 0.0f32;
        b.iter(|| {
            s = (s + 0.001) % 1.0;
            black_box(path.position(black_box(s)))
        })
    });
}

// ============================================================================
// Engines
// ============================================================================

fn engines() -> Vec<(&'static str, Box<dyn SynthEngine>)> {
    let boxed: [Box<dyn SynthEngine>; 6] = [
        Box::new(SubtractiveEngine::new(SAMPLE_RATE)),
        Box::new(FmEngine::new(SAMPLE_RATE)),
        Box::new(WavetableEngine::new(SAMPLE_RATE)),
        Box::new(GranularEngine::new(SAMPLE_RATE)),
        Box::new(DrumKitEngine::new(SAMPLE_RATE)),
        Box::new(SlideBassEngine::new(SAMPLE_RATE)),
    ];
    boxed.into_iter().map(|e| (e.engine_type().name(), e)).collect()
}

fn bench_engines_chord(c: &mut Criterion) {
    let mut group = c.benchmark_group("Engine_4Notes");

    for (name, mut engine) in engines() {
        for &block_size in BLOCK_SIZES {
            let mut buf = vec![AudioFrame::SILENCE; block_size];
            group.bench_with_input(BenchmarkId::new(name, block_size), &block_size, |b, _| {
                b.iter(|| {
                    if engine.active_voice_count() == 0 {
                        for note in [36, 42, 48, 55] {
                            engine.note_on(note, 0.8, 0.0);
                        }
                    }
                    engine.process(&mut buf);
                    black_box(buf[0])
                })
            });
        }
    }

    group.finish();
}

fn bench_voice_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("Subtractive_VoiceScaling");

    for voices in [1usize, 4, 8, 16] {
        let mut synth = SubtractiveEngine::new(SAMPLE_RATE);
        for i in 0..voices {
            synth.note_on(48 + i as u8 * 3, 0.8, 0.0);
        }
        let mut buf = [AudioFrame::SILENCE; 128];
        group.bench_with_input(BenchmarkId::from_parameter(voices), &voices, |b, _| {
            b.iter(|| {
                synth.process(&mut buf);
                black_box(buf[0])
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_oscillator_waveforms,
    bench_envelope,
    bench_vector_path,
    bench_engines_chord,
    bench_voice_scaling,
);

criterion_main!(benches);
