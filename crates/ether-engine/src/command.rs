//! Commands sent from the control handle to the audio thread.

use ether_core::{LfoSync, LfoWaveform};
use ether_synth::{EngineType, ParameterId, SynthEngine};

/// Which shared effect a slot send feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FxSend {
    /// Feedback delay.
    Delay,
    /// Reverb.
    Reverb,
}

/// A change applied at the start of the next block.
pub(crate) enum Command {
    NoteOn {
        slot: usize,
        note: u8,
        velocity: f32,
        aftertouch: f32,
    },
    NoteOff {
        slot: usize,
        note: u8,
    },
    Aftertouch {
        slot: usize,
        note: u8,
        value: f32,
    },
    AllNotesOff,
    SetParameter {
        slot: usize,
        id: ParameterId,
        value: f32,
    },
    BindEngine {
        slot: usize,
        engine_type: EngineType,
        engine: Box<dyn SynthEngine>,
    },
    SetVoiceCount {
        slot: usize,
        count: usize,
    },
    SetSlotVolume {
        slot: usize,
        volume: f32,
    },
    SetFxSend {
        slot: usize,
        send: FxSend,
        amount: f32,
    },
    SetReverb {
        size: f32,
        damping: f32,
        mix: f32,
    },
    SetDelay {
        time: f32,
        feedback: f32,
        mix: f32,
    },
    AssignLfo {
        slot: usize,
        lfo: usize,
        id: ParameterId,
        depth: f32,
    },
    RemoveLfo {
        slot: usize,
        lfo: usize,
        id: ParameterId,
    },
    SetLfoRate {
        slot: usize,
        lfo: usize,
        hz: f32,
    },
    SetLfoDepth {
        slot: usize,
        lfo: usize,
        depth: f32,
    },
    SetLfoWaveform {
        slot: usize,
        lfo: usize,
        waveform: LfoWaveform,
    },
    SetLfoSync {
        slot: usize,
        lfo: usize,
        sync: LfoSync,
    },
    Shutdown,
}

impl Command {
    /// Short label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NoteOn { .. } => "note_on",
            Self::NoteOff { .. } => "note_off",
            Self::Aftertouch { .. } => "aftertouch",
            Self::AllNotesOff => "all_notes_off",
            Self::SetParameter { .. } => "set_parameter",
            Self::BindEngine { .. } => "bind_engine",
            Self::SetVoiceCount { .. } => "set_voice_count",
            Self::SetSlotVolume { .. } => "set_slot_volume",
            Self::SetFxSend { .. } => "set_fx_send",
            Self::SetReverb { .. } => "set_reverb",
            Self::SetDelay { .. } => "set_delay",
            Self::AssignLfo { .. } => "assign_lfo",
            Self::RemoveLfo { .. } => "remove_lfo",
            Self::SetLfoRate { .. } => "set_lfo_rate",
            Self::SetLfoDepth { .. } => "set_lfo_depth",
            Self::SetLfoWaveform { .. } => "set_lfo_waveform",
            Self::SetLfoSync { .. } => "set_lfo_sync",
            Self::Shutdown => "shutdown",
        }
    }
}
