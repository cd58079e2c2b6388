//! Integration tests for ether-synth.
//!
//! Tests cover the shared engine contract (overwrite rendering, parameter
//! filtering, note bookkeeping) across all six engines, voice stealing, and
//! the engine-specific behaviors a host relies on.

use ether_core::AudioFrame;
use ether_synth::{
    DrumKitEngine, EngineCategory, EngineType, FmAlgorithm, FmEngine, GranularEngine, PathPreset,
    ParameterId, SlideBassEngine, SubtractiveEngine, SynthEngine, WavetableEngine,
    velocity_from_midi,
};

const SR: f32 = 48000.0;
const BLOCK: usize = 128;

fn all_engines() -> Vec<Box<dyn SynthEngine>> {
    vec![
        Box::new(SubtractiveEngine::new(SR)),
        Box::new(FmEngine::new(SR)),
        Box::new(WavetableEngine::new(SR)),
        Box::new(GranularEngine::new(SR)),
        Box::new(DrumKitEngine::new(SR)),
        Box::new(SlideBassEngine::new(SR)),
    ]
}

fn render(engine: &mut dyn SynthEngine, blocks: usize) -> f32 {
    let mut buf = [AudioFrame::SILENCE; BLOCK];
    let mut peak = 0.0f32;
    for _ in 0..blocks {
        engine.process(&mut buf);
        for frame in &buf {
            assert!(frame.is_finite(), "{} produced a non-finite sample", engine.name());
            peak = peak.max(frame.peak());
        }
    }
    peak
}

// ---------------------------------------------------------------------------
// 1. Shared contract
// ---------------------------------------------------------------------------

#[test]
fn every_engine_sounds_and_stays_bounded() {
    for mut engine in all_engines() {
        engine.note_on(48, 0.8, 0.0);
        let peak = render(engine.as_mut(), 40);
        assert!(peak > 1e-3, "{} silent after note-on", engine.name());
        assert!(peak <= 1.5, "{} peaked at {peak}", engine.name());
    }
}

#[test]
fn process_overwrites_stale_buffer() {
    for mut engine in all_engines() {
        let mut buf = [AudioFrame::new(0.7, -0.7); BLOCK];
        engine.process(&mut buf);
        assert!(
            buf.iter().all(|f| f.peak() == 0.0),
            "{} left stale data in an idle render",
            engine.name()
        );
    }
}

#[test]
fn unsupported_parameters_are_ignored() {
    for mut engine in all_engines() {
        for id in ParameterId::ALL {
            if engine.has_parameter(id) {
                continue;
            }
            engine.set_parameter(id, 0.9);
            assert_eq!(engine.get_parameter(id), 0.0, "{} stored {:?}", engine.name(), id);
        }
    }
}

#[test]
fn supported_parameters_are_clamped() {
    for mut engine in all_engines() {
        for id in ParameterId::ALL {
            if !engine.has_parameter(id) {
                continue;
            }
            engine.set_parameter(id, 3.0);
            assert_eq!(engine.get_parameter(id), 1.0);
            engine.set_parameter(id, f32::NAN);
            assert_eq!(engine.get_parameter(id), 1.0, "NaN must leave {id:?} unchanged");
        }
    }
}

#[test]
fn out_of_range_note_is_ignored() {
    for mut engine in all_engines() {
        engine.note_on(200, 1.0, 0.0);
        assert_eq!(engine.active_voice_count(), 0, "{}", engine.name());
    }
}

#[test]
fn all_notes_off_silences_immediately() {
    for mut engine in all_engines() {
        for note in [36, 42, 60] {
            engine.note_on(note, 1.0, 0.0);
        }
        render(engine.as_mut(), 2);
        engine.all_notes_off();
        assert_eq!(engine.active_voice_count(), 0, "{}", engine.name());
        assert_eq!(render(engine.as_mut(), 1), 0.0);
    }
}

#[test]
fn engine_types_match_catalog() {
    let kinds: Vec<EngineType> = all_engines().iter().map(|e| e.engine_type()).collect();
    assert_eq!(
        kinds,
        [
            EngineType::MacroVa,
            EngineType::Classic4OpFm,
            EngineType::MacroWavetable,
            EngineType::Granular,
            EngineType::DrumKit,
            EngineType::SlideAccentBass,
        ]
    );
    assert_eq!(EngineType::DrumKit.category(), EngineCategory::Drum);
}

#[test]
fn midi_velocity_maps_to_unit_range() {
    assert_eq!(velocity_from_midi(0), 0.0);
    assert_eq!(velocity_from_midi(127), 1.0);
    assert!((velocity_from_midi(64) - 64.0 / 127.0).abs() < 1e-6);
}

// ---------------------------------------------------------------------------
// 2. Voice allocation
// ---------------------------------------------------------------------------

#[test]
fn polyphony_limit_steals_oldest() {
    let mut synth = SubtractiveEngine::new(SR);
    synth.set_voice_count(4);
    for note in [60, 64, 67, 72] {
        synth.note_on(note, 0.8, 0.0);
    }
    synth.note_on(76, 0.8, 0.0);

    assert_eq!(synth.active_voice_count(), 4, "count stays at polyphony limit");
    let notes: Vec<u8> = synth.active_notes().collect();
    assert!(!notes.contains(&60), "oldest note (60) should have been stolen");
    assert!(notes.contains(&76), "new note (76) should be present");
}

#[test]
fn lowering_voice_count_kills_excess_voices() {
    let mut synth = FmEngine::new(SR);
    for note in 60..68 {
        synth.note_on(note, 0.8, 0.0);
    }
    assert_eq!(synth.active_voice_count(), 8);
    synth.set_voice_count(2);
    assert!(synth.active_voice_count() <= 2);
    assert_eq!(synth.max_voice_count(), 2);
}

#[test]
fn release_returns_voices_to_idle() {
    for mut engine in all_engines() {
        engine.note_on(60, 0.8, 0.0);
        render(engine.as_mut(), 4);
        engine.note_off(60);
        render(engine.as_mut(), 3000);
        assert_eq!(engine.active_voice_count(), 0, "{} never went idle", engine.name());
    }
}

// ---------------------------------------------------------------------------
// 3. Engine-specific behavior
// ---------------------------------------------------------------------------

#[test]
fn single_note_renders_one_voice() {
    let mut synth = SubtractiveEngine::new(SR);
    synth.note_on(60, 0.8, 0.0);
    let peak = render(&mut synth, 100);
    assert_eq!(synth.active_voice_count(), 1);
    assert!(peak > 0.0 && peak <= 1.0);
}

#[test]
fn filter_type_selects_fm_algorithm() {
    let mut fm = FmEngine::new(SR);
    let target = FmAlgorithm::Additive;
    fm.set_parameter(ParameterId::FilterType, target.to_normalized());
    assert_eq!(fm.algorithm(), target);
}

#[test]
fn drum_hits_layer() {
    let mut kick = DrumKitEngine::new(SR);
    kick.note_on(36, 1.0, 0.0);
    let mut hat = DrumKitEngine::new(SR);
    hat.note_on(42, 1.0, 0.0);
    let mut both = DrumKitEngine::new(SR);
    both.note_on(36, 1.0, 0.0);
    both.note_on(42, 1.0, 0.0);
    assert_eq!(both.active_voice_count(), 2);

    let mut a = [AudioFrame::SILENCE; BLOCK];
    let mut b = [AudioFrame::SILENCE; BLOCK];
    let mut mix = [AudioFrame::SILENCE; BLOCK];
    kick.process(&mut a);
    hat.process(&mut b);
    both.process(&mut mix);
    assert_ne!(mix, a);
    assert_ne!(mix, b);
}

#[test]
fn bass_glides_between_legato_notes() {
    let mut bass = SlideBassEngine::new(SR);
    bass.set_slide_time_ms(Some(50.0));
    bass.note_on(48, 0.7, 0.0);
    render(&mut bass, 4);
    bass.note_on(55, 0.7, 0.0);

    let mut buf = [AudioFrame::SILENCE; 48];
    let mut trace = Vec::new();
    for _ in 0..60 {
        bass.process(&mut buf);
        trace.push(bass.current_note());
    }
    assert!(trace.windows(2).all(|w| w[1] >= w[0]), "pitch trace must be monotone");
    assert!(trace[..49].iter().all(|&n| n < 55.0));
    assert_eq!(trace[49], 55.0);
}

#[test]
fn wavetable_path_presets_all_render() {
    for preset in [PathPreset::Circle, PathPreset::FigureEight, PathPreset::Square, PathPreset::Diamond] {
        let mut wt = WavetableEngine::new(SR);
        wt.set_path_preset(preset);
        wt.set_path_playback_rate(2.0);
        wt.note_on(57, 0.9, 0.0);
        let peak = render(&mut wt, 20);
        assert!(peak > 1e-3, "{preset:?} silent");
    }
}

#[test]
fn granular_density_follows_timbre() {
    let mut grains = GranularEngine::new(SR);
    grains.set_parameter(ParameterId::Timbre, 0.0);
    assert!((grains.density() - 0.1).abs() < 1e-3);
    grains.set_parameter(ParameterId::Timbre, 1.0);
    assert!((grains.density() - 200.0).abs() < 0.5);
}
