//! Parameter identifiers and per-engine parameter storage.
//!
//! Every value crossing the engine boundary is normalized to [0, 1]. Each
//! engine decides which [`ParameterId`]s it honors; setting any other ID is
//! a silent no-op.

/// Closed set of parameter destinations shared by all engines and the post chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ParameterId {
    /// Macro control 1.
    Harmonics,
    /// Macro control 2.
    Timbre,
    /// Macro control 3.
    Morph,
    /// Oscillator balance.
    OscMix,
    /// Oscillator detune.
    Detune,
    /// Sub-oscillator level.
    SubLevel,
    /// Sub-oscillator anchor/octave.
    SubAnchor,
    /// Low-pass cutoff.
    FilterCutoff,
    /// Filter resonance.
    FilterResonance,
    /// Filter type/mode.
    FilterType,
    /// Envelope attack time.
    Attack,
    /// Envelope decay time.
    Decay,
    /// Envelope sustain level.
    Sustain,
    /// Envelope release time.
    Release,
    /// LFO rate.
    LfoRate,
    /// LFO depth.
    LfoDepth,
    /// LFO waveform.
    LfoShape,
    /// Reverb size.
    ReverbSize,
    /// Reverb damping.
    ReverbDamping,
    /// Reverb mix.
    ReverbMix,
    /// Delay time.
    DelayTime,
    /// Delay feedback.
    DelayFeedback,
    /// Output volume.
    Volume,
    /// Stereo position.
    Pan,
    /// Post-chain high-pass cutoff.
    Hpf,
    /// Post-chain pre-gain.
    Amplitude,
    /// Post-chain drive.
    Clip,
}

/// Number of parameter IDs.
pub const PARAM_COUNT: usize = 27;

impl ParameterId {
    /// All parameter IDs in index order.
    pub const ALL: [ParameterId; PARAM_COUNT] = [
        ParameterId::Harmonics,
        ParameterId::Timbre,
        ParameterId::Morph,
        ParameterId::OscMix,
        ParameterId::Detune,
        ParameterId::SubLevel,
        ParameterId::SubAnchor,
        ParameterId::FilterCutoff,
        ParameterId::FilterResonance,
        ParameterId::FilterType,
        ParameterId::Attack,
        ParameterId::Decay,
        ParameterId::Sustain,
        ParameterId::Release,
        ParameterId::LfoRate,
        ParameterId::LfoDepth,
        ParameterId::LfoShape,
        ParameterId::ReverbSize,
        ParameterId::ReverbDamping,
        ParameterId::ReverbMix,
        ParameterId::DelayTime,
        ParameterId::DelayFeedback,
        ParameterId::Volume,
        ParameterId::Pan,
        ParameterId::Hpf,
        ParameterId::Amplitude,
        ParameterId::Clip,
    ];

    /// Index into per-parameter tables.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Parameter for a raw index, or `None` when out of range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Display name.
    pub const fn name(self) -> &'static str {
        match self {
            ParameterId::Harmonics => "Harmonics",
            ParameterId::Timbre => "Timbre",
            ParameterId::Morph => "Morph",
            ParameterId::OscMix => "Osc Mix",
            ParameterId::Detune => "Detune",
            ParameterId::SubLevel => "Sub Level",
            ParameterId::SubAnchor => "Sub Anchor",
            ParameterId::FilterCutoff => "Cutoff",
            ParameterId::FilterResonance => "Resonance",
            ParameterId::FilterType => "Filter Type",
            ParameterId::Attack => "Attack",
            ParameterId::Decay => "Decay",
            ParameterId::Sustain => "Sustain",
            ParameterId::Release => "Release",
            ParameterId::LfoRate => "LFO Rate",
            ParameterId::LfoDepth => "LFO Depth",
            ParameterId::LfoShape => "LFO Shape",
            ParameterId::ReverbSize => "Reverb Size",
            ParameterId::ReverbDamping => "Reverb Damping",
            ParameterId::ReverbMix => "Reverb Mix",
            ParameterId::DelayTime => "Delay Time",
            ParameterId::DelayFeedback => "Delay Feedback",
            ParameterId::Volume => "Volume",
            ParameterId::Pan => "Pan",
            ParameterId::Hpf => "HPF",
            ParameterId::Amplitude => "Amplitude",
            ParameterId::Clip => "Clip",
        }
    }
}

/// Normalized parameter values plus the set of IDs an engine honors.
///
/// Engines keep one of these as their user-facing parameter store. Writes to
/// unsupported IDs and non-finite values are dropped.
#[derive(Debug, Clone)]
pub struct ParameterBank {
    values: [f32; PARAM_COUNT],
    supported: u32,
}

impl ParameterBank {
    /// Build a bank from `(id, default)` pairs; every listed ID is supported.
    pub fn new(defaults: &[(ParameterId, f32)]) -> Self {
        let mut bank = Self {
            values: [0.0; PARAM_COUNT],
            supported: 0,
        };
        for &(id, value) in defaults {
            bank.supported |= 1 << id.index();
            bank.values[id.index()] = value.clamp(0.0, 1.0);
        }
        bank
    }

    /// Whether `id` is honored.
    #[inline]
    pub fn supports(&self, id: ParameterId) -> bool {
        self.supported & (1 << id.index()) != 0
    }

    /// Store a value clamped to [0, 1]. Returns `false` if it was rejected.
    pub fn set(&mut self, id: ParameterId, value: f32) -> bool {
        if !self.supports(id) || !value.is_finite() {
            return false;
        }
        self.values[id.index()] = value.clamp(0.0, 1.0);
        true
    }

    /// Current value; unsupported IDs read as 0.
    #[inline]
    pub fn get(&self, id: ParameterId) -> f32 {
        if self.supports(id) {
            self.values[id.index()]
        } else {
            0.0
        }
    }
}

/// Exponential map from a normalized value to `[min, max]`.
#[inline]
pub fn norm_to_exp(value: f32, min: f32, max: f32) -> f32 {
    min * libm::powf(max / min, value.clamp(0.0, 1.0))
}

/// Normalized attack value to milliseconds (0.5 ms .. 5 s).
#[inline]
pub fn attack_ms(value: f32) -> f32 {
    norm_to_exp(value, 0.5, 5000.0)
}

/// Normalized decay/release value to milliseconds (1 ms .. 5 s).
#[inline]
pub fn decay_ms(value: f32) -> f32 {
    norm_to_exp(value, 1.0, 5000.0)
}
