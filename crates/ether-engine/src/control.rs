//! Control-thread handle to a running [`AudioEngine`](crate::AudioEngine).
//!
//! Scalar state goes straight into shared atomics. Everything that touches
//! engine or slot state is queued as a command and applied at the start of
//! the next block. Sends never block: a full queue drops the command.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use ether_core::{LfoSync, LfoWaveform};
use ether_registry::EngineRegistry;
use ether_synth::{EngineType, MAX_VOICES, ParameterId, SynthEngine};

use crate::command::{Command, FxSend};
use crate::modulation::LFO_COUNT;
use crate::shared::{SharedState, engine_snapshot};

/// Lowest note reachable from a key surface.
pub const KEY_BASE_NOTE: u8 = 60;

/// Cloneable, `Send` handle for UI, MIDI and sequencer threads.
#[derive(Clone)]
pub struct ControlHandle {
    commands: Sender<Command>,
    retired: Receiver<Box<dyn SynthEngine>>,
    shared: Arc<SharedState>,
    registry: EngineRegistry,
    sample_rate: f32,
    block_size: usize,
}

impl ControlHandle {
    pub(crate) fn new(
        commands: Sender<Command>,
        retired: Receiver<Box<dyn SynthEngine>>,
        shared: Arc<SharedState>,
        sample_rate: f32,
        block_size: usize,
    ) -> Self {
        Self {
            commands,
            retired,
            shared,
            registry: EngineRegistry::new(),
            sample_rate,
            block_size,
        }
    }

    fn send(&self, cmd: Command) -> bool {
        self.collect_retired();
        match self.commands.try_send(cmd) {
            Ok(()) => true,
            Err(TrySendError::Full(cmd)) => {
                self.shared.dropped_commands.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(command = cmd.label(), "command queue full, dropping");
                false
            }
            Err(TrySendError::Disconnected(cmd)) => {
                tracing::debug!(command = cmd.label(), "audio engine gone, dropping");
                false
            }
        }
    }

    fn valid_slot(&self, slot: usize) -> bool {
        slot < self.shared.slots.len()
    }

    fn active(&self) -> usize {
        self.shared.active_slot.load(Ordering::Acquire)
    }

    /// Drop engines the audio thread has retired. Returns how many.
    pub fn collect_retired(&self) -> usize {
        self.retired.try_iter().count()
    }

    /// Stop the engine: all voices off, effect tails cleared.
    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    /// False once the engine has shut down.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    // --- Transport ---

    /// Start the transport.
    pub fn play(&self) {
        self.shared.playing.store(true, Ordering::Release);
    }

    /// Stop the transport and recording.
    pub fn stop(&self) {
        self.shared.playing.store(false, Ordering::Release);
        self.shared.recording.store(false, Ordering::Release);
    }

    /// Flip the record flag. Returns the new state.
    pub fn toggle_record(&self) -> bool {
        !self.shared.recording.fetch_xor(true, Ordering::AcqRel)
    }

    /// Transport running.
    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::Acquire)
    }

    /// Record armed.
    pub fn is_recording(&self) -> bool {
        self.shared.recording.load(Ordering::Acquire)
    }

    /// Set the tempo, clamped to 20..=300 BPM.
    pub fn set_bpm(&self, bpm: f32) {
        self.shared.bpm.set(bpm);
    }

    /// Current tempo.
    pub fn bpm(&self) -> f32 {
        self.shared.bpm.get()
    }

    /// Master output level, 0 to 1.
    pub fn set_master_volume(&self, volume: f32) {
        self.shared.master_volume.set(volume);
    }

    /// Master output level.
    pub fn master_volume(&self) -> f32 {
        self.shared.master_volume.get()
    }

    // --- Notes ---

    /// Slot that receives notes.
    pub fn set_active_slot(&self, slot: usize) {
        if self.valid_slot(slot) {
            self.shared.active_slot.store(slot, Ordering::Release);
        }
    }

    /// Slot that receives notes.
    pub fn active_slot(&self) -> usize {
        self.active()
    }

    /// Note-on to the active slot. Velocity and aftertouch are 0 to 1.
    pub fn note_on(&self, note: u8, velocity: f32, aftertouch: f32) {
        if note > 127 || !velocity.is_finite() || !aftertouch.is_finite() {
            return;
        }
        self.send(Command::NoteOn {
            slot: self.active(),
            note,
            velocity: velocity.clamp(0.0, 1.0),
            aftertouch: aftertouch.clamp(0.0, 1.0),
        });
    }

    /// Note-off to the active slot.
    pub fn note_off(&self, note: u8) {
        if note <= 127 {
            self.send(Command::NoteOff {
                slot: self.active(),
                note,
            });
        }
    }

    /// Per-note pressure to the active slot.
    pub fn aftertouch(&self, note: u8, value: f32) {
        if note <= 127 && value.is_finite() {
            self.send(Command::Aftertouch {
                slot: self.active(),
                note,
                value: value.clamp(0.0, 1.0),
            });
        }
    }

    /// Release every voice in every slot.
    pub fn all_notes_off(&self) {
        self.send(Command::AllNotesOff);
    }

    /// Key-surface press: key `k` plays note 60 + k at full velocity.
    pub fn key_on(&self, key: usize) {
        if let Some(note) = key_note(key) {
            self.note_on(note, 1.0, 0.0);
        }
    }

    /// Key-surface release.
    pub fn key_off(&self, key: usize) {
        if let Some(note) = key_note(key) {
            self.note_off(note);
        }
    }

    // --- Parameters ---

    /// Write a normalized parameter on a slot.
    ///
    /// Post-chain ids (Hpf, cutoff, resonance, Volume, Amplitude, Pan,
    /// Clip) shape the slot output; cutoff and resonance also reach the
    /// engine; everything else goes to the engine alone.
    pub fn set_parameter(&self, slot: usize, id: ParameterId, value: f32) {
        let Some(shared) = self.shared.slot(slot) else {
            return;
        };
        if !value.is_finite() {
            return;
        }
        let value = value.clamp(0.0, 1.0);
        if self.send(Command::SetParameter { slot, id, value }) {
            shared.params[id.index()].set(value);
        }
    }

    /// Last value written, read from the shadow table.
    pub fn get_parameter(&self, slot: usize, id: ParameterId) -> f32 {
        self.shared
            .slot(slot)
            .map_or(0.0, |s| s.params[id.index()].get())
    }

    /// Replace a slot's engine. The engine is built here, on the calling thread.
    ///
    /// Returns false if the bind could not be queued; the slot then keeps
    /// its engine and the reported type and parameters are left alone.
    pub fn set_engine_type(&self, slot: usize, engine_type: EngineType) -> bool {
        let Some(shared) = self.shared.slot(slot) else {
            return false;
        };
        let mut engine = self.registry.create(engine_type, self.sample_rate);
        engine.set_voice_count(shared.voice_limit.load(Ordering::Acquire));
        engine.set_buffer_size(self.block_size);
        let snapshot = engine_snapshot(engine.as_ref());

        tracing::info!(
            slot,
            requested = engine_type.name(),
            built = engine.name(),
            "binding engine"
        );
        let queued = self.send(Command::BindEngine {
            slot,
            engine_type,
            engine,
        });
        if queued {
            self.shared.seed_snapshot(slot, &snapshot);
            shared
                .engine_type
                .store(engine_type.index() as u8, Ordering::Release);
        } else {
            tracing::warn!(slot, requested = engine_type.name(), "engine bind not queued");
        }
        queued
    }

    /// Type last requested for a slot.
    pub fn engine_type(&self, slot: usize) -> Option<EngineType> {
        self.shared.slot(slot).map(|s| s.engine_type())
    }

    /// Display name of an engine type.
    pub fn engine_name(&self, engine_type: EngineType) -> &'static str {
        self.registry
            .find(engine_type)
            .map_or(engine_type.name(), |d| d.name)
    }

    /// Display name of a parameter.
    pub fn parameter_name(&self, id: ParameterId) -> &'static str {
        id.name()
    }

    /// Polyphony limit for a slot, clamped to 1..=16.
    pub fn set_voice_count(&self, slot: usize, count: usize) {
        let Some(shared) = self.shared.slot(slot) else {
            return;
        };
        let count = count.clamp(1, MAX_VOICES);
        if self.send(Command::SetVoiceCount { slot, count }) {
            shared.voice_limit.store(count, Ordering::Release);
        }
    }

    /// Slot level into the master bus, 0 to 1.
    pub fn set_slot_volume(&self, slot: usize, volume: f32) {
        if self.valid_slot(slot) && volume.is_finite() {
            self.send(Command::SetSlotVolume { slot, volume });
        }
    }

    // --- Sends ---

    /// Slot send level into the delay or reverb, 0 to 1.
    pub fn set_fx_send(&self, slot: usize, send: FxSend, amount: f32) {
        if self.valid_slot(slot) && amount.is_finite() {
            self.send(Command::SetFxSend { slot, send, amount });
        }
    }

    /// Reverb size, damping and mix, normalized.
    pub fn set_reverb(&self, size: f32, damping: f32, mix: f32) {
        self.send(Command::SetReverb { size, damping, mix });
    }

    /// Delay time, feedback and mix, normalized.
    pub fn set_delay(&self, time: f32, feedback: f32, mix: f32) {
        self.send(Command::SetDelay {
            time,
            feedback,
            mix,
        });
    }

    // --- Modulation ---

    /// Route LFO `lfo` of `slot` onto `id` with `depth` (0 to 1).
    pub fn assign_lfo(&self, slot: usize, lfo: usize, id: ParameterId, depth: f32) {
        let Some(shared) = self.shared.slot(slot) else {
            return;
        };
        if lfo >= LFO_COUNT || !depth.is_finite() {
            return;
        }
        let queued = self.send(Command::AssignLfo {
            slot,
            lfo,
            id,
            depth,
        });
        if queued {
            shared.masks[id.index()].fetch_or(1 << lfo, Ordering::AcqRel);
        }
    }

    /// Remove a routing.
    pub fn remove_lfo(&self, slot: usize, lfo: usize, id: ParameterId) {
        let Some(shared) = self.shared.slot(slot) else {
            return;
        };
        if lfo >= LFO_COUNT {
            return;
        }
        if self.send(Command::RemoveLfo { slot, lfo, id }) {
            shared.masks[id.index()].fetch_and(!(1 << lfo), Ordering::AcqRel);
        }
    }

    /// LFO rate in Hz, clamped to 0.01..=50.
    pub fn set_lfo_rate(&self, slot: usize, lfo: usize, hz: f32) {
        if self.valid_slot(slot) && lfo < LFO_COUNT {
            self.send(Command::SetLfoRate { slot, lfo, hz });
        }
    }

    /// LFO output depth, 0 to 1.
    pub fn set_lfo_depth(&self, slot: usize, lfo: usize, depth: f32) {
        if self.valid_slot(slot) && lfo < LFO_COUNT {
            self.send(Command::SetLfoDepth { slot, lfo, depth });
        }
    }

    /// LFO waveform.
    pub fn set_lfo_waveform(&self, slot: usize, lfo: usize, waveform: LfoWaveform) {
        if self.valid_slot(slot) && lfo < LFO_COUNT {
            self.send(Command::SetLfoWaveform {
                slot,
                lfo,
                waveform,
            });
        }
    }

    /// LFO sync mode.
    pub fn set_lfo_sync(&self, slot: usize, lfo: usize, sync: LfoSync) {
        if self.valid_slot(slot) && lfo < LFO_COUNT {
            self.send(Command::SetLfoSync { slot, lfo, sync });
        }
    }

    /// Summed LFO modulation applied to `id` in the last block.
    pub fn modulation_value(&self, slot: usize, id: ParameterId) -> f32 {
        self.shared
            .slot(slot)
            .map_or(0.0, |s| s.modulation[id.index()].get())
    }

    /// Bitmask of LFOs routed to `id`.
    pub fn lfo_assignment_mask(&self, slot: usize, id: ParameterId) -> u8 {
        self.shared
            .slot(slot)
            .map_or(0, |s| s.masks[id.index()].load(Ordering::Acquire))
    }

    // --- Metering ---

    /// Smoothed DSP load, percent of real time.
    pub fn cpu_usage(&self) -> f32 {
        self.shared.cpu_usage.get()
    }

    /// Voices sounding across all slots.
    pub fn active_voices(&self) -> usize {
        self.shared.active_voices.load(Ordering::Relaxed)
    }

    /// Voices sounding in one slot.
    pub fn slot_voices(&self, slot: usize) -> usize {
        self.shared
            .slot(slot)
            .map_or(0, |s| s.voices.load(Ordering::Relaxed))
    }

    /// Output peak of the last block.
    pub fn peak(&self) -> f32 {
        self.shared.peak.get()
    }

    /// Output RMS of the last block.
    pub fn rms(&self) -> f32 {
        self.shared.rms.get()
    }

    /// Commands dropped because the queue was full.
    pub fn dropped_commands(&self) -> u64 {
        self.shared.dropped_commands.load(Ordering::Relaxed)
    }
}

/// Note for a key-surface index, if it is in MIDI range.
pub fn key_note(key: usize) -> Option<u8> {
    let note = KEY_BASE_NOTE as usize + key;
    (note <= 127).then_some(note as u8)
}

impl core::fmt::Debug for ControlHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControlHandle")
            .field("sample_rate", &self.sample_rate)
            .field("active_slot", &self.active())
            .field("bpm", &self.bpm())
            .finish_non_exhaustive()
    }
}
