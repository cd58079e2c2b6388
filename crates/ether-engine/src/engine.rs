//! The audio engine, owned by the audio thread.
//!
//! Every block: drain control commands, advance modulation, render and
//! post-process each slot, feed the send effects, then apply master volume
//! and a tanh limiter. Nothing here blocks or allocates once built.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use libm::tanhf;

use ether_config::{EngineConfig, FxConfig, SLOT_COUNT};
use ether_core::{AudioFrame, clamp_finite};
use ether_registry::create_engine;
use ether_synth::{ParameterId, SynthEngine};

use crate::command::Command;
use crate::control::ControlHandle;
use crate::error::Result;
use crate::fx::{SendDelay, SendReverb};
use crate::meter::{CpuMeter, measure};
use crate::shared::SharedState;
use crate::slot::Slot;

/// Capacity of the control → audio command queue.
pub const COMMAND_QUEUE_CAPACITY: usize = 1024;

/// Capacity of the audio → control queue for retired engines.
pub const RETIRE_QUEUE_CAPACITY: usize = 64;

/// Real-time synthesizer engine.
///
/// Build with [`AudioEngine::new`], which also returns the
/// [`ControlHandle`] for the other threads. Call [`process`](Self::process)
/// from the audio callback.
///
/// ```rust
/// use ether_config::EngineConfig;
/// use ether_core::AudioFrame;
/// use ether_engine::AudioEngine;
///
/// let (mut engine, control) = AudioEngine::new(EngineConfig::default()).unwrap();
/// control.note_on(60, 0.8, 0.0);
///
/// let mut block = [AudioFrame::SILENCE; 128];
/// engine.process(&mut block);
/// assert_eq!(control.slot_voices(0), 1);
/// ```
pub struct AudioEngine {
    sample_rate: f32,
    block_size: usize,
    slots: Vec<Slot>,
    delay: SendDelay,
    reverb: SendReverb,
    reverb_bus: Vec<AudioFrame>,
    delay_bus: Vec<AudioFrame>,
    interleave: Vec<AudioFrame>,
    commands: Receiver<Command>,
    retired: Sender<Box<dyn SynthEngine>>,
    parked: Vec<Box<dyn SynthEngine>>,
    shared: Arc<SharedState>,
    cpu: CpuMeter,
    bpm: f32,
    was_playing: bool,
}

impl AudioEngine {
    /// Build the engine and its control handle from a configuration.
    pub fn new(config: EngineConfig) -> Result<(Self, ControlHandle)> {
        config.validate()?;

        let sample_rate = config.sample_rate as f32;
        let block_size = config.buffer_size;
        let engines = config.slot_engines();
        let shared = Arc::new(SharedState::new(config.bpm, config.master_volume, &engines));

        let mut slots = Vec::with_capacity(SLOT_COUNT);
        for (index, &engine_type) in engines.iter().enumerate() {
            let slot_config = config.slots.get(index).cloned().unwrap_or_default();
            let mut engine = create_engine(engine_type, sample_rate);
            engine.set_voice_count(slot_config.voices);
            engine.set_buffer_size(block_size);

            shared.seed_post_params(index);
            shared.seed_engine_params(index, engine.as_ref());
            if let Some(s) = shared.slot(index) {
                s.params[ParameterId::Pan.index()].set(slot_config.pan);
                s.voice_limit.store(slot_config.voices, Ordering::Release);
            }

            let mut slot = Slot::new(engine, engine_type, sample_rate, block_size, &slot_config);
            slot.set_bpm(config.bpm);
            slots.push(slot);
        }

        let mut delay = SendDelay::new(sample_rate);
        let mut reverb = SendReverb::new(sample_rate);
        apply_fx(&config.fx, &mut delay, &mut reverb);

        let (command_tx, command_rx) = bounded(COMMAND_QUEUE_CAPACITY);
        let (retire_tx, retire_rx) = bounded(RETIRE_QUEUE_CAPACITY);

        tracing::info!(
            sample_rate = config.sample_rate,
            buffer_size = block_size,
            bpm = config.bpm,
            "audio engine ready"
        );

        let engine = Self {
            sample_rate,
            block_size,
            slots,
            delay,
            reverb,
            reverb_bus: vec![AudioFrame::SILENCE; block_size],
            delay_bus: vec![AudioFrame::SILENCE; block_size],
            interleave: vec![AudioFrame::SILENCE; block_size],
            commands: command_rx,
            retired: retire_tx,
            parked: Vec::with_capacity(COMMAND_QUEUE_CAPACITY),
            shared: Arc::clone(&shared),
            cpu: CpuMeter::default(),
            bpm: shared.bpm.get(),
            was_playing: false,
        };
        let control = ControlHandle::new(command_tx, retire_rx, shared, sample_rate, block_size);
        Ok((engine, control))
    }

    /// Load a TOML configuration file and build from it.
    pub fn from_config(path: impl AsRef<Path>) -> Result<(Self, ControlHandle)> {
        let path = path.as_ref();
        let config = EngineConfig::load(path)?;
        tracing::debug!(path = %path.display(), "loaded engine configuration");
        Self::new(config)
    }

    /// Output sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Largest block rendered in one pass; longer buffers are split.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Silence every voice and clear effect tails.
    ///
    /// The engine keeps rendering silence afterwards.
    pub fn shutdown(&mut self) {
        for slot in &mut self.slots {
            slot.reset();
        }
        self.delay.reset();
        self.reverb.reset();
        self.shared.running.store(false, Ordering::Release);
        self.shared.active_voices.store(0, Ordering::Release);
        for s in &self.shared.slots {
            s.voices.store(0, Ordering::Release);
        }
    }

    /// Render into a stereo buffer of any length.
    pub fn process(&mut self, output: &mut [AudioFrame]) {
        for chunk in output.chunks_mut(self.block_size) {
            self.process_block(chunk);
        }
    }

    /// Render into an interleaved `[l, r, l, r, ...]` buffer.
    ///
    /// A trailing odd sample is zeroed.
    pub fn process_interleaved(&mut self, output: &mut [f32]) {
        let mut frames = core::mem::take(&mut self.interleave);
        for chunk in output.chunks_mut(self.block_size * 2) {
            let n = chunk.len() / 2;
            let block = &mut frames[..n];
            self.process_block(block);
            for (pair, frame) in chunk.chunks_exact_mut(2).zip(block.iter()) {
                pair[0] = frame.left;
                pair[1] = frame.right;
            }
            if chunk.len() % 2 == 1 {
                chunk[chunk.len() - 1] = 0.0;
            }
        }
        self.interleave = frames;
    }

    fn process_block(&mut self, output: &mut [AudioFrame]) {
        let start = Instant::now();
        let frames = output.len();

        self.drain_commands();
        self.sync_transport();

        output.fill(AudioFrame::SILENCE);
        let reverb_bus = &mut self.reverb_bus[..frames];
        let delay_bus = &mut self.delay_bus[..frames];
        reverb_bus.fill(AudioFrame::SILENCE);
        delay_bus.fill(AudioFrame::SILENCE);

        let mut voices = 0;
        for (slot, shared) in self.slots.iter_mut().zip(&self.shared.slots) {
            let sums = slot.render(frames);
            for (value, sum) in shared.modulation.iter().zip(sums) {
                value.set(sum);
            }
            slot.mix_into(output, reverb_bus, delay_bus);

            let count = slot.engine().active_voice_count();
            shared.voices.store(count, Ordering::Relaxed);
            voices += count;
        }

        self.delay.process(delay_bus, output);
        self.reverb.process(reverb_bus, output);

        let master = self.shared.master_volume.get();
        for frame in output.iter_mut() {
            *frame = frame.map(|s| clamp_finite(tanhf(s * master)));
        }

        let (peak, rms) = measure(output);
        self.shared.peak.set(peak);
        self.shared.rms.set(rms);
        self.shared.active_voices.store(voices, Ordering::Relaxed);

        let usage = self.cpu.update(start.elapsed(), frames, self.sample_rate);
        self.shared.cpu_usage.set(usage);
    }

    fn drain_commands(&mut self) {
        self.flush_parked();
        while let Ok(cmd) = self.commands.try_recv() {
            self.apply(cmd);
        }
    }

    /// Hand a replaced engine back to the control side. A full queue parks
    /// it until a later block.
    fn retire(&mut self, engine: Box<dyn SynthEngine>) {
        if let Err(TrySendError::Full(engine)) = self.retired.try_send(engine) {
            // Capacity is reserved up front, so this push never reallocates.
            if self.parked.len() < self.parked.capacity() {
                self.parked.push(engine);
            }
        }
    }

    fn flush_parked(&mut self) {
        while let Some(engine) = self.parked.pop() {
            if let Err(TrySendError::Full(engine) | TrySendError::Disconnected(engine)) =
                self.retired.try_send(engine)
            {
                self.parked.push(engine);
                break;
            }
        }
    }

    fn sync_transport(&mut self) {
        let bpm = self.shared.bpm.get();
        if bpm != self.bpm {
            self.bpm = bpm;
            for slot in &mut self.slots {
                slot.set_bpm(bpm);
            }
        }

        let playing = self.shared.playing.load(Ordering::Acquire);
        if playing && !self.was_playing {
            for slot in &mut self.slots {
                slot.lfos.restart_tempo_synced();
            }
        }
        self.was_playing = playing;
    }

    fn apply(&mut self, cmd: Command) {
        match cmd {
            Command::NoteOn {
                slot,
                note,
                velocity,
                aftertouch,
            } => {
                if let Some(s) = self.slots.get_mut(slot) {
                    s.note_on(note, velocity, aftertouch);
                }
            }
            Command::NoteOff { slot, note } => {
                if let Some(s) = self.slots.get_mut(slot) {
                    s.note_off(note);
                }
            }
            Command::Aftertouch { slot, note, value } => {
                if let Some(s) = self.slots.get_mut(slot) {
                    s.aftertouch(note, value);
                }
            }
            Command::AllNotesOff => {
                for s in &mut self.slots {
                    s.all_notes_off();
                }
            }
            Command::SetParameter { slot, id, value } => {
                if let Some(s) = self.slots.get_mut(slot) {
                    s.set_parameter(id, value);
                }
            }
            Command::BindEngine {
                slot,
                engine_type,
                engine,
            } => {
                if let Some(s) = self.slots.get_mut(slot) {
                    let old = s.bind(engine, engine_type);
                    self.retire(old);
                }
            }
            Command::SetVoiceCount { slot, count } => {
                if let Some(s) = self.slots.get_mut(slot) {
                    s.set_voice_count(count);
                }
            }
            Command::SetSlotVolume { slot, volume } => {
                if let Some(s) = self.slots.get_mut(slot) {
                    s.set_volume(volume);
                }
            }
            Command::SetFxSend { slot, send, amount } => {
                if let Some(s) = self.slots.get_mut(slot) {
                    s.set_send(send, amount);
                }
            }
            Command::SetReverb { size, damping, mix } => self.reverb.set(size, damping, mix),
            Command::SetDelay {
                time,
                feedback,
                mix,
            } => self.delay.set(time, feedback, mix),
            Command::AssignLfo {
                slot,
                lfo,
                id,
                depth,
            } => {
                if let Some(s) = self.slots.get_mut(slot) {
                    s.modulation.assign(lfo, id, depth);
                }
            }
            Command::RemoveLfo { slot, lfo, id } => {
                if let Some(s) = self.slots.get_mut(slot) {
                    s.modulation.remove(lfo, id);
                }
            }
            Command::SetLfoRate { slot, lfo, hz } => {
                if let Some(s) = self.slots.get_mut(slot) {
                    s.lfos.set_rate(lfo, hz);
                }
            }
            Command::SetLfoDepth { slot, lfo, depth } => {
                if let Some(s) = self.slots.get_mut(slot) {
                    s.lfos.set_depth(lfo, depth);
                }
            }
            Command::SetLfoWaveform {
                slot,
                lfo,
                waveform,
            } => {
                if let Some(s) = self.slots.get_mut(slot) {
                    s.lfos.set_waveform(lfo, waveform);
                }
            }
            Command::SetLfoSync { slot, lfo, sync } => {
                if let Some(s) = self.slots.get_mut(slot) {
                    s.lfos.set_sync(lfo, sync);
                }
            }
            Command::Shutdown => self.shutdown(),
        }
    }
}

fn apply_fx(fx: &FxConfig, delay: &mut SendDelay, reverb: &mut SendReverb) {
    reverb.set(fx.reverb_size, fx.reverb_damping, fx.reverb_mix);
    delay.set(fx.delay_time, fx.delay_feedback, fx.delay_mix);
    delay.settle();
}

impl core::fmt::Debug for AudioEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AudioEngine")
            .field("sample_rate", &self.sample_rate)
            .field("block_size", &self.block_size)
            .field(
                "slots",
                &self
                    .slots
                    .iter()
                    .map(|s| s.engine_type().name())
                    .collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}
