//! Instrument slot: one engine with its post chain, LFOs and routing.

use ether_config::SlotConfig;
use ether_core::AudioFrame;
use ether_synth::{EngineType, PARAM_COUNT, ParameterId, SynthEngine};

use crate::command::FxSend;
use crate::modulation::{LfoBank, ModulationTable};
use crate::post::{PostChain, Routing};

pub(crate) struct Slot {
    engine: Box<dyn SynthEngine>,
    engine_type: EngineType,
    pub post: PostChain,
    pub lfos: LfoBank,
    pub modulation: ModulationTable,
    volume: f32,
    reverb_send: f32,
    delay_send: f32,
    scratch: Vec<AudioFrame>,
    bpm: f32,
}

impl Slot {
    pub fn new(
        engine: Box<dyn SynthEngine>,
        engine_type: EngineType,
        sample_rate: f32,
        max_block: usize,
        config: &SlotConfig,
    ) -> Self {
        let mut post = PostChain::new(sample_rate);
        post.set_parameter(ParameterId::Pan, config.pan);
        Self {
            engine,
            engine_type,
            post,
            lfos: LfoBank::new(sample_rate),
            modulation: ModulationTable::new(),
            volume: config.volume.clamp(0.0, 1.0),
            reverb_send: config.reverb_send.clamp(0.0, 1.0),
            delay_send: config.delay_send.clamp(0.0, 1.0),
            scratch: vec![AudioFrame::SILENCE; max_block],
            bpm: 120.0,
        }
    }

    pub fn engine(&self) -> &dyn SynthEngine {
        self.engine.as_ref()
    }

    pub fn engine_type(&self) -> EngineType {
        self.engine_type
    }

    /// Swap in a new engine, returning the old one for disposal.
    ///
    /// Post-chain settings, LFOs and routings stay with the slot.
    pub fn bind(
        &mut self,
        engine: Box<dyn SynthEngine>,
        engine_type: EngineType,
    ) -> Box<dyn SynthEngine> {
        self.engine_type = engine_type;
        self.post.reset();
        let old = core::mem::replace(&mut self.engine, engine);
        self.engine.set_tempo(self.bpm);
        old
    }

    /// Host tempo for the LFOs and the engine.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = bpm;
        self.lfos.set_bpm(bpm);
        self.engine.set_tempo(bpm);
    }

    pub fn note_on(&mut self, note: u8, velocity: f32, aftertouch: f32) {
        self.engine.note_on(note, velocity, aftertouch);
        self.lfos.note_on();
    }

    pub fn note_off(&mut self, note: u8) {
        self.engine.note_off(note);
    }

    pub fn aftertouch(&mut self, note: u8, value: f32) {
        self.engine.set_aftertouch(note, value);
    }

    pub fn all_notes_off(&mut self) {
        self.engine.all_notes_off();
    }

    pub fn set_voice_count(&mut self, count: usize) {
        self.engine.set_voice_count(count);
    }

    pub fn set_parameter(&mut self, id: ParameterId, value: f32) {
        if !value.is_finite() {
            return;
        }
        let routing = Routing::of(id);
        if routing != Routing::Engine {
            self.post.set_parameter(id, value);
        }
        if routing.reaches_engine() {
            self.engine.set_parameter(id, value);
        }
    }

    pub fn set_volume(&mut self, volume: f32) {
        if volume.is_finite() {
            self.volume = volume.clamp(0.0, 1.0);
        }
    }

    pub fn set_send(&mut self, send: FxSend, amount: f32) {
        if !amount.is_finite() {
            return;
        }
        let amount = amount.clamp(0.0, 1.0);
        match send {
            FxSend::Reverb => self.reverb_send = amount,
            FxSend::Delay => self.delay_send = amount,
        }
    }

    /// Advance LFOs, apply modulation and render `frames` frames.
    ///
    /// Returns the modulation sums used for the block.
    pub fn render(&mut self, frames: usize) -> [f32; PARAM_COUNT] {
        let frames = frames.min(self.scratch.len());
        let values = *self.lfos.advance(frames);
        let sums = self.modulation.compute(&values);
        self.post.apply_modulation(&sums);

        let buffer = &mut self.scratch[..frames];
        self.engine.process(buffer);
        self.post.process(buffer);
        sums
    }

    /// Add the last render into the master and send buses.
    pub fn mix_into(
        &self,
        master: &mut [AudioFrame],
        reverb_bus: &mut [AudioFrame],
        delay_bus: &mut [AudioFrame],
    ) {
        let volume = self.volume;
        let reverb = self.reverb_send;
        let delay = self.delay_send;
        for (((frame, out), rev), del) in self
            .scratch
            .iter()
            .zip(master.iter_mut())
            .zip(reverb_bus.iter_mut())
            .zip(delay_bus.iter_mut())
        {
            let level = *frame * volume;
            *out += level;
            *rev += level * reverb;
            *del += level * delay;
        }
    }

    pub fn reset(&mut self) {
        self.engine.all_notes_off();
        self.post.reset();
        self.scratch.fill(AudioFrame::SILENCE);
    }
}
