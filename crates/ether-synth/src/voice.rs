//! Fixed-capacity voice pool with oldest-voice stealing.
//!
//! Every note-on stamps its voice with a monotonically increasing counter.
//! When the pool is full, the voice with the smallest stamp (the largest
//! age) is stolen.

use crate::engine::MAX_VOICES;

/// What a polyphonic engine's voice exposes to the allocator.
pub trait PolyVoice {
    /// Whether the voice is sounding (attack through release).
    fn is_active(&self) -> bool;

    /// Note the voice is playing.
    fn note(&self) -> u8;

    /// Allocation stamp assigned at note-on.
    fn stamp(&self) -> u64;

    /// Silence immediately.
    fn kill(&mut self);
}

/// Result of asking the pool for a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
    /// An idle voice at this index.
    Free(usize),
    /// The oldest active voice at this index, to be retriggered.
    Stolen(usize),
}

impl Allocation {
    /// Voice index regardless of how it was obtained.
    pub fn index(self) -> usize {
        match self {
            Allocation::Free(i) | Allocation::Stolen(i) => i,
        }
    }
}

/// Pool of `N` voices of which the first `limit` may sound.
#[derive(Debug, Clone)]
pub struct VoicePool<V, const N: usize = MAX_VOICES> {
    voices: [V; N],
    limit: usize,
    counter: u64,
}

impl<V: PolyVoice, const N: usize> VoicePool<V, N> {
    /// Pool with every slot built by `make`, all allowed to sound.
    pub fn new(make: impl FnMut(usize) -> V) -> Self {
        Self {
            voices: core::array::from_fn(make),
            limit: N,
            counter: 0,
        }
    }

    /// Polyphony limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Change the polyphony limit (clamped to `1..=N`); voices above it are killed.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.clamp(1, N);
        for voice in &mut self.voices[self.limit..] {
            voice.kill();
        }
    }

    /// Next note-on stamp.
    pub fn next_stamp(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    /// Age of a stamp relative to the newest note-on.
    pub fn age(&self, stamp: u64) -> u64 {
        self.counter.saturating_sub(stamp)
    }

    /// Pick a voice for a new note.
    pub fn allocate(&self) -> Allocation {
        let voices = &self.voices[..self.limit];
        if let Some(i) = voices.iter().position(|v| !v.is_active()) {
            return Allocation::Free(i);
        }
        let oldest = voices
            .iter()
            .enumerate()
            .max_by_key(|(_, v)| self.age(v.stamp()))
            .map_or(0, |(i, _)| i);
        Allocation::Stolen(oldest)
    }

    /// Pick a voice for a new note and silence it if it was stolen, so the
    /// new note starts from a clean envelope.
    pub fn claim(&mut self) -> Allocation {
        let alloc = self.allocate();
        if let Allocation::Stolen(i) = alloc {
            self.voices[i].kill();
        }
        alloc
    }

    /// Active voices within the limit.
    pub fn active_count(&self) -> usize {
        self.voices[..self.limit].iter().filter(|v| v.is_active()).count()
    }

    /// Kill every voice.
    pub fn kill_all(&mut self) {
        for voice in &mut self.voices {
            voice.kill();
        }
    }

    /// Indices of active voices playing `note`.
    pub fn playing(&self, note: u8) -> impl Iterator<Item = usize> + '_ {
        self.voices[..self.limit]
            .iter()
            .enumerate()
            .filter(move |(_, v)| v.is_active() && v.note() == note)
            .map(|(i, _)| i)
    }

    /// Voices allowed to sound.
    pub fn voices(&self) -> &[V] {
        &self.voices[..self.limit]
    }

    /// Mutable access to the voices allowed to sound.
    pub fn voices_mut(&mut self) -> &mut [V] {
        &mut self.voices[..self.limit]
    }

    /// Mutable access to every voice, including those above the limit.
    pub fn all_voices_mut(&mut self) -> &mut [V; N] {
        &mut self.voices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct TestVoice {
        active: bool,
        note: u8,
        stamp: u64,
    }

    impl PolyVoice for TestVoice {
        fn is_active(&self) -> bool {
            self.active
        }
        fn note(&self) -> u8 {
            self.note
        }
        fn stamp(&self) -> u64 {
            self.stamp
        }
        fn kill(&mut self) {
            self.active = false;
        }
    }

    fn play(pool: &mut VoicePool<TestVoice, 4>, note: u8) -> Allocation {
        let alloc = pool.allocate();
        let stamp = pool.next_stamp();
        let v = &mut pool.voices_mut()[alloc.index()];
        v.active = true;
        v.note = note;
        v.stamp = stamp;
        alloc
    }

    #[test]
    fn test_fills_free_voices_first() {
        let mut pool: VoicePool<TestVoice, 4> = VoicePool::new(|_| TestVoice::default());
        for (i, note) in [60, 62, 64, 65].into_iter().enumerate() {
            assert_eq!(play(&mut pool, note), Allocation::Free(i));
        }
        assert_eq!(pool.active_count(), 4);
    }

    #[test]
    fn test_steals_oldest() {
        let mut pool: VoicePool<TestVoice, 4> = VoicePool::new(|_| TestVoice::default());
        for note in [60, 62, 64, 65] {
            play(&mut pool, note);
        }
        assert_eq!(play(&mut pool, 67), Allocation::Stolen(0));
        assert_eq!(play(&mut pool, 69), Allocation::Stolen(1));
        assert_eq!(pool.playing(60).count(), 0);
    }

    #[test]
    fn test_claim_silences_stolen_voice() {
        let mut pool: VoicePool<TestVoice, 4> = VoicePool::new(|_| TestVoice::default());
        for note in [60, 62, 64, 65] {
            play(&mut pool, note);
        }
        assert_eq!(pool.claim(), Allocation::Stolen(0));
        assert!(!pool.voices()[0].active);
        assert_eq!(pool.active_count(), 3);
        // the silenced slot is the next free one
        assert_eq!(pool.claim(), Allocation::Free(0));
    }

    #[test]
    fn test_limit_kills_upper_voices() {
        let mut pool: VoicePool<TestVoice, 4> = VoicePool::new(|_| TestVoice::default());
        for note in [60, 62, 64, 65] {
            play(&mut pool, note);
        }
        pool.set_limit(2);
        assert_eq!(pool.active_count(), 2);
        assert_eq!(pool.all_voices_mut().iter().filter(|v| v.active).count(), 2);
        pool.set_limit(0);
        assert_eq!(pool.limit(), 1);
        pool.set_limit(100);
        assert_eq!(pool.limit(), 4);
    }
}
