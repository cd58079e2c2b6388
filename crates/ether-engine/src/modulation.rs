//! Per-slot LFO bank and modulation assignment table.
//!
//! Each slot owns [`LFO_COUNT`] LFOs. Any LFO can be routed to any
//! parameter with its own depth; the sum over routed LFOs is the
//! parameter's modulation for the block.
//!
//! ```rust
//! use ether_engine::{LFO_COUNT, ModulationTable};
//! use ether_synth::ParameterId;
//!
//! let mut table = ModulationTable::new();
//! table.assign(2, ParameterId::FilterCutoff, 0.5);
//! assert_eq!(table.mask(ParameterId::FilterCutoff), 0b100);
//!
//! let mut values = [0.0; LFO_COUNT];
//! values[2] = 1.0;
//! let sums = table.compute(&values);
//! assert_eq!(sums[ParameterId::FilterCutoff.index()], 0.5);
//! ```

use ether_core::{Lfo, LfoSync, LfoWaveform};
use ether_synth::{PARAM_COUNT, ParameterId};

/// LFOs per slot.
pub const LFO_COUNT: usize = 8;

/// Routing of the slot's LFOs onto one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ModAssignment {
    /// Bit `i` set means LFO `i` is routed.
    pub mask: u8,
    /// Depth per LFO, 0 to 1.
    pub depths: [f32; LFO_COUNT],
}

impl ModAssignment {
    /// Sum of `value × depth` over routed LFOs; exactly 0 with an empty mask.
    #[inline]
    pub fn sum(&self, values: &[f32; LFO_COUNT]) -> f32 {
        if self.mask == 0 {
            return 0.0;
        }
        let mut total = 0.0;
        for (i, (&value, &depth)) in values.iter().zip(&self.depths).enumerate() {
            if self.mask & (1 << i) != 0 {
                total += value * depth;
            }
        }
        total
    }
}

/// Assignment per parameter for one slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ModulationTable {
    assignments: [ModAssignment; PARAM_COUNT],
}

impl Default for ModulationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ModulationTable {
    /// Table with nothing routed.
    pub fn new() -> Self {
        Self {
            assignments: [ModAssignment::default(); PARAM_COUNT],
        }
    }

    /// Route `lfo` to `id`. Out-of-range LFOs are ignored; depth is clamped.
    pub fn assign(&mut self, lfo: usize, id: ParameterId, depth: f32) {
        if lfo >= LFO_COUNT || !depth.is_finite() {
            return;
        }
        let entry = &mut self.assignments[id.index()];
        entry.mask |= 1 << lfo;
        entry.depths[lfo] = depth.clamp(0.0, 1.0);
    }

    /// Unroute `lfo` from `id`.
    pub fn remove(&mut self, lfo: usize, id: ParameterId) {
        if lfo >= LFO_COUNT {
            return;
        }
        let entry = &mut self.assignments[id.index()];
        entry.mask &= !(1 << lfo);
        entry.depths[lfo] = 0.0;
    }

    /// Routing for a parameter.
    pub fn get(&self, id: ParameterId) -> &ModAssignment {
        &self.assignments[id.index()]
    }

    /// Bitmask of LFOs routed to `id`.
    pub fn mask(&self, id: ParameterId) -> u8 {
        self.assignments[id.index()].mask
    }

    /// Modulation sum for every parameter, indexed by [`ParameterId::index`].
    pub fn compute(&self, values: &[f32; LFO_COUNT]) -> [f32; PARAM_COUNT] {
        core::array::from_fn(|i| self.assignments[i].sum(values))
    }

    /// Drop every routing.
    pub fn clear(&mut self) {
        self.assignments = [ModAssignment::default(); PARAM_COUNT];
    }
}

/// The slot's LFOs, advanced once per block.
#[derive(Debug, Clone)]
pub(crate) struct LfoBank {
    lfos: [Lfo; LFO_COUNT],
    values: [f32; LFO_COUNT],
}

impl LfoBank {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            lfos: core::array::from_fn(|_| Lfo::new(sample_rate, 1.0)),
            values: [0.0; LFO_COUNT],
        }
    }

    pub fn advance(&mut self, frames: usize) -> &[f32; LFO_COUNT] {
        for (lfo, value) in self.lfos.iter_mut().zip(self.values.iter_mut()) {
            *value = lfo.advance_block(frames);
        }
        &self.values
    }

    #[cfg(test)]
    pub fn lfo(&self, index: usize) -> Option<&Lfo> {
        self.lfos.get(index)
    }

    pub fn note_on(&mut self) {
        for lfo in &mut self.lfos {
            lfo.trigger();
        }
    }

    /// Restart tempo-synced LFOs so they line up with the transport.
    pub fn restart_tempo_synced(&mut self) {
        for lfo in self.lfos.iter_mut().filter(|l| l.sync() == LfoSync::Tempo) {
            lfo.reset();
        }
    }

    pub fn set_bpm(&mut self, bpm: f32) {
        for lfo in &mut self.lfos {
            lfo.set_bpm(bpm);
        }
    }

    pub fn set_rate(&mut self, index: usize, hz: f32) {
        if let Some(lfo) = self.lfos.get_mut(index)
            && hz.is_finite()
        {
            lfo.set_frequency(hz);
        }
    }

    pub fn set_depth(&mut self, index: usize, depth: f32) {
        if let Some(lfo) = self.lfos.get_mut(index)
            && depth.is_finite()
        {
            lfo.set_depth(depth);
        }
    }

    pub fn set_waveform(&mut self, index: usize, waveform: LfoWaveform) {
        if let Some(lfo) = self.lfos.get_mut(index) {
            lfo.set_waveform(waveform);
        }
    }

    pub fn set_sync(&mut self, index: usize, sync: LfoSync) {
        if let Some(lfo) = self.lfos.get_mut(index) {
            lfo.set_sync(sync);
        }
    }
}
