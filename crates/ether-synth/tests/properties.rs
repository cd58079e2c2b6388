//! Property-based tests for ether-synth.
//!
//! Voice capacity, envelope range and monotonicity, one-shot decay rate,
//! parameter filtering and latched vector-path motion over randomized inputs.

use ether_core::AudioFrame;
use ether_synth::{
    AdsrEnvelope, DecayEnvelope, EnvelopeStage, GranularEngine, ParameterId, SubtractiveEngine,
    SynthEngine, VectorPath, WavetableEngine, Waypoint,
};
use proptest::prelude::*;

const SR: f32 = 48000.0;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Never more active voices than the limit, and each new note survives.
    #[test]
    fn voice_capacity_respected(
        limit in 1usize..=16,
        notes in prop::collection::vec(0u8..=127, 1..48),
    ) {
        let mut synth = SubtractiveEngine::new(SR);
        synth.set_voice_count(limit);
        for &note in &notes {
            synth.note_on(note, 0.8, 0.0);
            prop_assert!(synth.active_voice_count() <= limit);
            prop_assert!(
                synth.active_notes().any(|n| n == note),
                "note {} missing right after note-on", note
            );
        }
    }

    /// Envelope level stays in [0, 1], rises through attack and never rises
    /// after release.
    #[test]
    fn envelope_range_and_shape(
        attack in 0.1f32..200.0,
        decay in 1.0f32..500.0,
        sustain in 0.0f32..=1.0,
        release in 1.0f32..500.0,
        hold in 1usize..4000,
    ) {
        let mut env = AdsrEnvelope::new(SR);
        env.set_attack_ms(attack);
        env.set_decay_ms(decay);
        env.set_sustain(sustain);
        env.set_release_ms(release);
        env.gate_on();

        let mut last = 0.0f32;
        for _ in 0..hold {
            let attacking = env.stage() == EnvelopeStage::Attack;
            let level = env.advance();
            prop_assert!((0.0..=1.0).contains(&level), "level {} out of range", level);
            if attacking && env.stage() == EnvelopeStage::Attack {
                prop_assert!(level >= last);
            }
            last = level;
        }

        env.gate_off();
        for _ in 0..(SR as usize) {
            let level = env.advance();
            prop_assert!(level <= last + 1e-6, "release rose from {} to {}", last, level);
            last = level;
            if !env.is_active() {
                break;
            }
        }
    }

    /// A one-shot envelope loses 1/e of its level per decay time.
    #[test]
    fn decay_envelope_rate(decay_ms in 5.0f32..1000.0) {
        let mut env = DecayEnvelope::new();
        env.trigger(1.0, decay_ms, SR);
        let samples = (decay_ms * SR / 1000.0).round() as usize;
        for _ in 0..samples {
            env.advance();
        }
        let expected = (-1.0f32).exp();
        prop_assert!(
            (env.level() - expected).abs() < 0.02,
            "after {} ms level was {}, expected {}", decay_ms, env.level(), expected
        );
    }

    /// Setting an unsupported parameter changes neither its value nor the audio.
    #[test]
    fn unsupported_parameter_is_silent_noop(value in -2.0f32..2.0, pick in 0usize..27) {
        let id = ParameterId::ALL[pick];
        let mut a = GranularEngine::new(SR);
        prop_assume!(!a.has_parameter(id));
        let mut b = GranularEngine::new(SR);
        b.set_parameter(id, value);
        prop_assert_eq!(b.get_parameter(id), 0.0);

        a.note_on(60, 0.8, 0.0);
        b.note_on(60, 0.8, 0.0);
        let mut out_a = [AudioFrame::SILENCE; 256];
        let mut out_b = [AudioFrame::SILENCE; 256];
        a.process(&mut out_a);
        b.process(&mut out_b);
        prop_assert_eq!(out_a, out_b);
    }

    /// A latched path covers equal distance on the plane in equal time,
    /// even where the waypoints are unevenly spaced.
    #[test]
    fn latched_path_moves_uniformly(rate in 0.05f32..0.5, block in 64usize..512) {
        let path = VectorPath::from_waypoints(&[
            Waypoint::new(0.2, 0.2, 0.0),
            Waypoint::new(0.3, 0.22, 0.0),
            Waypoint::new(0.8, 0.3, 0.0),
            Waypoint::new(0.7, 0.8, 0.0),
            Waypoint::new(0.25, 0.7, 0.0),
        ]);
        let mut wt = WavetableEngine::new(SR);
        wt.set_path(path.clone());
        wt.set_path_playback_rate(rate);
        let mut buf = vec![AudioFrame::SILENCE; block];
        let fraction = rate * block as f32 / SR;
        let distance = fraction * path.total_length();
        let mut last = wt.path_progress();
        let mut last_point = wt.path_position();
        for _ in 0..64 {
            wt.process(&mut buf);
            let now = wt.path_progress();
            let step = (now - last).rem_euclid(1.0);
            prop_assert!((step - fraction).abs() < 1e-4, "step {} vs {}", step, fraction);

            let point = wt.path_position();
            let moved = ((point.0 - last_point.0).powi(2) + (point.1 - last_point.1).powi(2)).sqrt();
            prop_assert!(
                moved > distance * 0.5 && moved < distance * 1.1,
                "moved {} vs {}", moved, distance
            );
            last = now;
            last_point = point;
        }
    }
}
