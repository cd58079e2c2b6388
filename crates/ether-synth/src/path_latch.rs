//! Latched playback along a [`VectorPath`].
//!
//! The latch owns a progress value in `[0, 1)` (a fraction of the path's arc
//! length) and moves it once per block. Speed is either free-running in
//! loops per second, or locked to the host tempo so one loop lasts a beat
//! division or a bar.
//!
//! | Mode       | Motion                                                   |
//! |------------|----------------------------------------------------------|
//! | `Forward`  | Wraps from the end back to the start                     |
//! | `Reverse`  | Runs backward, wrapping from the start to the end        |
//! | `PingPong` | Reflects at both ends                                    |
//! | `Random`   | Jumps between waypoints every tenth of a loop            |
//! | `Pendulum` | Sine swing across the whole path                         |
//! | `Freeze`   | Holds its position                                       |
//!
//! ```rust
//! use ether_synth::{LatchMode, PathLatch, VectorPath};
//!
//! let path = VectorPath::default();
//! let mut latch = PathLatch::new();
//! latch.set_mode(LatchMode::Reverse);
//! latch.set_rate(1.0);
//! let progress = latch.advance(0.25, &path);
//! assert!((progress - 0.75).abs() < 1e-6);
//! ```

use core::f32::consts::TAU;

use ether_core::NoiseGenerator;
use libm::{floorf, sinf};

use crate::vector_path::VectorPath;

/// Playback direction and shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatchMode {
    /// Loop forward.
    #[default]
    Forward,
    /// Loop backward.
    Reverse,
    /// Bounce between the ends.
    PingPong,
    /// Hop between waypoints.
    Random,
    /// Swing back and forth on a sine.
    Pendulum,
    /// Stay put.
    Freeze,
}

/// What one loop of the path is locked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LatchSync {
    /// Rate is loops per second.
    #[default]
    Free,
    /// One loop per beat division, times the rate.
    Beat,
    /// One loop per bar, times the rate.
    Bar,
}

/// Musical length of one loop under [`LatchSync::Beat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BeatDivision {
    /// 1/1
    Whole,
    /// 1/2
    Half,
    /// 1/4
    #[default]
    Quarter,
    /// 1/8
    Eighth,
    /// 1/16
    Sixteenth,
    /// 1/32
    ThirtySecond,
    /// 1/4.
    DottedQuarter,
    /// 1/8.
    DottedEighth,
    /// 1/4T
    TripletQuarter,
    /// 1/8T
    TripletEighth,
}

impl BeatDivision {
    /// Length in quarter-note beats.
    pub fn beats(self) -> f32 {
        match self {
            BeatDivision::Whole => 4.0,
            BeatDivision::Half => 2.0,
            BeatDivision::Quarter => 1.0,
            BeatDivision::Eighth => 0.5,
            BeatDivision::Sixteenth => 0.25,
            BeatDivision::ThirtySecond => 0.125,
            BeatDivision::DottedQuarter => 1.5,
            BeatDivision::DottedEighth => 0.75,
            BeatDivision::TripletQuarter => 1.0 / 3.0,
            BeatDivision::TripletEighth => 1.0 / 6.0,
        }
    }

    /// Short display label.
    pub fn label(self) -> &'static str {
        match self {
            BeatDivision::Whole => "1/1",
            BeatDivision::Half => "1/2",
            BeatDivision::Quarter => "1/4",
            BeatDivision::Eighth => "1/8",
            BeatDivision::Sixteenth => "1/16",
            BeatDivision::ThirtySecond => "1/32",
            BeatDivision::DottedQuarter => "1/4.",
            BeatDivision::DottedEighth => "1/8.",
            BeatDivision::TripletQuarter => "1/4T",
            BeatDivision::TripletEighth => "1/8T",
        }
    }
}

/// Travel between jumps in [`LatchMode::Random`], in loops.
const RANDOM_STEP: f32 = 0.1;

/// Automatic traversal of a vector path.
#[derive(Debug, Clone)]
pub struct PathLatch {
    mode: LatchMode,
    sync: LatchSync,
    division: BeatDivision,
    rate: f32,
    bpm: f32,
    beats_per_bar: u32,
    progress: f32,
    direction: f32,
    swing_phase: f32,
    jump_travel: f32,
    rng: NoiseGenerator,
}

impl Default for PathLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl PathLatch {
    /// Largest rate: 20 loops per second, or 20 loops per division.
    pub const MAX_RATE: f32 = 20.0;

    /// Stopped latch in forward, free-running mode at 120 BPM.
    pub fn new() -> Self {
        Self {
            mode: LatchMode::Forward,
            sync: LatchSync::Free,
            division: BeatDivision::Quarter,
            rate: 0.0,
            bpm: 120.0,
            beats_per_bar: 4,
            progress: 0.0,
            direction: 1.0,
            swing_phase: 0.0,
            jump_travel: 0.0,
            rng: NoiseGenerator::new(12345),
        }
    }

    /// Playback mode. Switching restarts the pendulum and random state.
    pub fn set_mode(&mut self, mode: LatchMode) {
        self.mode = mode;
        self.direction = 1.0;
        self.swing_phase = 0.0;
        self.jump_travel = 0.0;
    }

    /// Current playback mode.
    pub fn mode(&self) -> LatchMode {
        self.mode
    }

    /// Tempo lock.
    pub fn set_sync(&mut self, sync: LatchSync) {
        self.sync = sync;
    }

    /// Current tempo lock.
    pub fn sync(&self) -> LatchSync {
        self.sync
    }

    /// Loop length under [`LatchSync::Beat`].
    pub fn set_division(&mut self, division: BeatDivision) {
        self.division = division;
    }

    /// Current beat division.
    pub fn division(&self) -> BeatDivision {
        self.division
    }

    /// Speed, clamped to `0..=MAX_RATE`. Zero unlatches.
    pub fn set_rate(&mut self, rate: f32) {
        if rate.is_finite() {
            self.rate = rate.clamp(0.0, Self::MAX_RATE);
        }
    }

    /// Current speed setting.
    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Host tempo in BPM.
    pub fn set_bpm(&mut self, bpm: f32) {
        if bpm.is_finite() && bpm > 0.0 {
            self.bpm = bpm;
        }
    }

    /// Bar length for [`LatchSync::Bar`], at least one beat.
    pub fn set_beats_per_bar(&mut self, beats: u32) {
        self.beats_per_bar = beats.max(1);
    }

    /// Whether the latch is moving the path.
    pub fn is_latched(&self) -> bool {
        self.rate > 0.0
    }

    /// Progress along the path, `0..1`.
    pub fn progress(&self) -> f32 {
        self.progress
    }

    /// Place the latch at a fraction of the path.
    pub fn set_progress(&mut self, progress: f32) {
        if progress.is_finite() {
            self.progress = wrap(progress);
        }
    }

    /// Loops per second after tempo lock.
    pub fn loops_per_second(&self) -> f32 {
        let beat_seconds = 60.0 / self.bpm;
        match self.sync {
            LatchSync::Free => self.rate,
            LatchSync::Beat => self.rate / (beat_seconds * self.division.beats()),
            LatchSync::Bar => self.rate / (beat_seconds * self.beats_per_bar as f32),
        }
    }

    /// Move by `seconds` of playback and return the new progress.
    pub fn advance(&mut self, seconds: f32, path: &VectorPath) -> f32 {
        if !self.is_latched() || !(seconds.is_finite() && seconds > 0.0) {
            return self.progress;
        }
        let delta = self.loops_per_second() * seconds;
        match self.mode {
            LatchMode::Forward => self.progress = wrap(self.progress + delta),
            LatchMode::Reverse => self.progress = wrap(self.progress - delta),
            LatchMode::PingPong => {
                let mut p = self.progress + delta * self.direction;
                // a single step never exceeds one loop, so one reflection is enough
                if p > 1.0 {
                    p = 2.0 - p;
                    self.direction = -1.0;
                } else if p < 0.0 {
                    p = -p;
                    self.direction = 1.0;
                }
                self.progress = p.clamp(0.0, 1.0);
            }
            LatchMode::Random => {
                self.jump_travel += delta;
                if self.jump_travel >= RANDOM_STEP {
                    self.jump_travel = 0.0;
                    if !path.is_empty() {
                        let pick = self.rng.next_u32() as usize % path.len();
                        self.progress = path.waypoint_progress(pick).unwrap_or(self.progress);
                    }
                }
            }
            LatchMode::Pendulum => {
                self.swing_phase = wrap(self.swing_phase + delta);
                self.progress = 0.5 * (1.0 + sinf(self.swing_phase * TAU));
            }
            LatchMode::Freeze => {}
        }
        self.progress
    }
}

#[inline]
fn wrap(v: f32) -> f32 {
    let w = v - floorf(v);
    if w >= 1.0 { 0.0 } else { w }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_path::PathPreset;

    fn latch(mode: LatchMode, rate: f32) -> PathLatch {
        let mut latch = PathLatch::new();
        latch.set_mode(mode);
        latch.set_rate(rate);
        latch
    }

    #[test]
    fn test_stopped_latch_holds() {
        let path = VectorPath::default();
        let mut l = PathLatch::new();
        l.set_progress(0.3);
        assert_eq!(l.advance(1.0, &path), 0.3);
        assert!(!l.is_latched());
    }

    #[test]
    fn test_forward_and_reverse_wrap() {
        let path = VectorPath::default();
        let mut fwd = latch(LatchMode::Forward, 1.0);
        fwd.set_progress(0.9);
        assert!((fwd.advance(0.2, &path) - 0.1).abs() < 1e-5);

        let mut rev = latch(LatchMode::Reverse, 1.0);
        rev.set_progress(0.1);
        assert!((rev.advance(0.2, &path) - 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_ping_pong_reflects() {
        let path = VectorPath::default();
        let mut l = latch(LatchMode::PingPong, 1.0);
        l.set_progress(0.9);
        assert!((l.advance(0.2, &path) - 0.9).abs() < 1e-5);
        // now heading back toward the start
        assert!((l.advance(0.5, &path) - 0.4).abs() < 1e-5);
        assert!((l.advance(0.6, &path) - 0.2).abs() < 1e-5);
        assert!((l.advance(0.1, &path) - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_pendulum_swings_across_path() {
        let path = VectorPath::default();
        let mut l = latch(LatchMode::Pendulum, 1.0);
        assert!((l.advance(0.25, &path) - 1.0).abs() < 1e-5);
        assert!((l.advance(0.5, &path) - 0.0).abs() < 1e-5);
        assert!((l.advance(0.25, &path) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_freeze_holds() {
        let path = VectorPath::default();
        let mut l = latch(LatchMode::Freeze, 5.0);
        l.set_progress(0.42);
        for _ in 0..10 {
            assert_eq!(l.advance(0.1, &path), 0.42);
        }
    }

    #[test]
    fn test_random_lands_on_waypoints() {
        let path = VectorPath::preset(PathPreset::Square);
        let stops: [f32; 4] = core::array::from_fn(|i| path.waypoint_progress(i).unwrap());
        let mut l = latch(LatchMode::Random, 1.0);
        let mut visited = [false; 4];
        for _ in 0..200 {
            let p = l.advance(RANDOM_STEP, &path);
            let hit = stops.iter().position(|s| (s - p).abs() < 1e-5);
            let hit = hit.expect("random mode stops on a waypoint");
            visited[hit] = true;
        }
        assert!(visited.iter().all(|&v| v));
    }

    #[test]
    fn test_beat_sync_rates() {
        let mut l = latch(LatchMode::Forward, 1.0);
        l.set_sync(LatchSync::Beat);
        l.set_bpm(120.0);
        // a quarter at 120 BPM is half a second
        assert!((l.loops_per_second() - 2.0).abs() < 1e-5);
        l.set_division(BeatDivision::DottedEighth);
        assert!((l.loops_per_second() - 1.0 / 0.375).abs() < 1e-4);
        l.set_division(BeatDivision::TripletEighth);
        assert!((l.loops_per_second() - 12.0).abs() < 1e-3);

        l.set_sync(LatchSync::Bar);
        l.set_beats_per_bar(3);
        assert!((l.loops_per_second() - 1.0 / 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_one_loop_per_bar() {
        let path = VectorPath::default();
        let mut l = latch(LatchMode::Forward, 1.0);
        l.set_sync(LatchSync::Bar);
        l.set_bpm(60.0);
        for _ in 0..3 {
            l.advance(1.0, &path);
        }
        assert!((l.progress() - 0.75).abs() < 1e-5);
    }

    #[test]
    fn test_rate_clamped() {
        let mut l = PathLatch::new();
        l.set_rate(100.0);
        assert_eq!(l.rate(), PathLatch::MAX_RATE);
        l.set_rate(f32::NAN);
        assert_eq!(l.rate(), PathLatch::MAX_RATE);
        l.set_rate(-1.0);
        assert_eq!(l.rate(), 0.0);
    }

    #[test]
    fn test_division_labels() {
        assert_eq!(BeatDivision::DottedQuarter.label(), "1/4.");
        assert_eq!(BeatDivision::TripletEighth.label(), "1/8T");
        assert_eq!(BeatDivision::Whole.beats(), 4.0);
    }
}
