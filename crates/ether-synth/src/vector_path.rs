//! Closed Catmull-Rom paths over the 2-D vector-synthesis plane.
//!
//! A path is a loop through up to [`MAX_WAYPOINTS`] points in the unit
//! square. Playback positions are expressed as a fraction of the total arc
//! length, so equal steps in position move equal distances along the curve
//! no matter how unevenly the waypoints are spaced.
//!
//! The four corners of the plane are the four wavetable sources; see
//! [`corner_weights`].

use core::f32::consts::TAU;
use libm::{cosf, sinf, sqrtf};

/// Waypoint capacity.
pub const MAX_WAYPOINTS: usize = 16;

/// Entries in the arc-length table.
pub const ARC_LUT_SIZE: usize = 512;

/// A control point on the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    /// Horizontal position, 0 (corners A/D) to 1 (corners B/C).
    pub x: f32,
    /// Vertical position, 0 (corners A/B) to 1 (corners C/D).
    pub y: f32,
    /// 0 = loose Catmull-Rom, 1 = straight segments with eased ends.
    pub tension: f32,
}

impl Waypoint {
    /// Waypoint clamped to the unit square.
    pub fn new(x: f32, y: f32, tension: f32) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
            tension: tension.clamp(0.0, 1.0),
        }
    }
}

/// Built-in path shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPreset {
    /// Eight points on a circle of radius 0.4.
    Circle,
    /// Lemniscate through the centre.
    FigureEight,
    /// Axis-aligned square.
    Square,
    /// Square rotated 45 degrees.
    Diamond,
}

/// Closed path with a uniform arc-length parameterization.
#[derive(Debug, Clone)]
pub struct VectorPath {
    points: [Waypoint; MAX_WAYPOINTS],
    count: usize,
    arc: [f32; ARC_LUT_SIZE],
    total_length: f32,
}

impl Default for VectorPath {
    fn default() -> Self {
        Self::preset(PathPreset::Circle)
    }
}

impl VectorPath {
    /// Empty path; every position maps to the centre of the plane.
    pub fn new() -> Self {
        Self {
            points: [Waypoint::new(0.5, 0.5, 0.0); MAX_WAYPOINTS],
            count: 0,
            arc: [0.0; ARC_LUT_SIZE],
            total_length: 0.0,
        }
    }

    /// Path through `waypoints`; anything past [`MAX_WAYPOINTS`] is dropped.
    pub fn from_waypoints(waypoints: &[Waypoint]) -> Self {
        let mut path = Self::new();
        for &wp in waypoints.iter().take(MAX_WAYPOINTS) {
            path.points[path.count] = Waypoint::new(wp.x, wp.y, wp.tension);
            path.count += 1;
        }
        path.rebuild();
        path
    }

    /// One of the built-in shapes.
    pub fn preset(preset: PathPreset) -> Self {
        let mut pts = [Waypoint::new(0.5, 0.5, 0.0); MAX_WAYPOINTS];
        let n = match preset {
            PathPreset::Circle => {
                for (i, p) in pts.iter_mut().take(8).enumerate() {
                    let a = i as f32 / 8.0 * TAU;
                    *p = Waypoint::new(0.5 + 0.4 * cosf(a), 0.5 + 0.4 * sinf(a), 0.3);
                }
                8
            }
            PathPreset::FigureEight => {
                for (i, p) in pts.iter_mut().take(8).enumerate() {
                    let a = i as f32 / 8.0 * TAU;
                    *p = Waypoint::new(0.5 + 0.4 * sinf(a), 0.5 + 0.4 * sinf(a) * cosf(a), 0.3);
                }
                8
            }
            PathPreset::Square => {
                let corners = [(0.1, 0.1), (0.9, 0.1), (0.9, 0.9), (0.1, 0.9)];
                for (p, (x, y)) in pts.iter_mut().zip(corners) {
                    *p = Waypoint::new(x, y, 1.0);
                }
                4
            }
            PathPreset::Diamond => {
                let corners = [(0.5, 0.1), (0.9, 0.5), (0.5, 0.9), (0.1, 0.5)];
                for (p, (x, y)) in pts.iter_mut().zip(corners) {
                    *p = Waypoint::new(x, y, 1.0);
                }
                4
            }
        };
        Self::from_waypoints(&pts[..n])
    }

    /// Append a waypoint. Returns `false` when the path is full.
    pub fn add_waypoint(&mut self, waypoint: Waypoint) -> bool {
        if self.count >= MAX_WAYPOINTS {
            return false;
        }
        self.points[self.count] = Waypoint::new(waypoint.x, waypoint.y, waypoint.tension);
        self.count += 1;
        self.rebuild();
        true
    }

    /// Remove every waypoint.
    pub fn clear(&mut self) {
        self.count = 0;
        self.rebuild();
    }

    /// Current waypoints.
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.points[..self.count]
    }

    /// Number of waypoints.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the path has no waypoints.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Length of the closed loop in plane units.
    pub fn total_length(&self) -> f32 {
        self.total_length
    }

    /// Point at raw curve parameter `t` in [0, 1); not arc-length uniform.
    pub fn point_at_parameter(&self, t: f32) -> (f32, f32) {
        match self.count {
            0 => (0.5, 0.5),
            1 => (self.points[0].x, self.points[0].y),
            n => {
                let scaled = wrap_unit(t) * n as f32;
                let seg = (scaled as usize).min(n - 1);
                let local = scaled - seg as f32;
                let p = |k: usize| self.points[(seg + n + k - 1) % n];
                catmull_rom(p(0), p(1), p(2), p(3), local, self.points[seg].tension)
            }
        }
    }

    /// Point at fraction `s` of the total arc length (wrapped to [0, 1)).
    ///
    /// Paths that hug the edges can overshoot the unit square slightly
    /// between waypoints; [`corner_weights`] clamps when blending.
    pub fn position(&self, s: f32) -> (f32, f32) {
        self.point_at_parameter(self.t_from_arc_length(wrap_unit(s) * self.total_length))
    }

    /// Arc-length fraction at which the curve passes waypoint `index`.
    pub fn waypoint_progress(&self, index: usize) -> Option<f32> {
        if index >= self.count {
            return None;
        }
        if self.total_length <= 0.0 {
            return Some(0.0);
        }
        let at = index as f32 / self.count as f32 * (ARC_LUT_SIZE - 1) as f32;
        let lo = (at as usize).min(ARC_LUT_SIZE - 2);
        let frac = at - lo as f32;
        let length = self.arc[lo] + (self.arc[lo + 1] - self.arc[lo]) * frac;
        Some(length / self.total_length)
    }

    /// Curve parameter at arc length `length`, by binary search over the table.
    pub fn t_from_arc_length(&self, length: f32) -> f32 {
        if self.total_length <= 0.0 {
            return 0.0;
        }
        let length = length.clamp(0.0, self.total_length);
        let (mut lo, mut hi) = (0usize, ARC_LUT_SIZE - 1);
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.arc[mid] < length {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        let span = self.arc[hi] - self.arc[lo];
        let frac = if span > 0.0 { (length - self.arc[lo]) / span } else { 0.0 };
        (lo as f32 + frac) / (ARC_LUT_SIZE - 1) as f32
    }

    fn rebuild(&mut self) {
        self.arc[0] = 0.0;
        let mut prev = self.point_at_parameter(0.0);
        let mut total = 0.0;
        for i in 1..ARC_LUT_SIZE {
            let t = i as f32 / (ARC_LUT_SIZE - 1) as f32;
            // t = 1 closes the loop back onto the first waypoint
            let here = if i == ARC_LUT_SIZE - 1 {
                self.point_at_parameter(0.0)
            } else {
                self.point_at_parameter(t)
            };
            let (dx, dy) = (here.0 - prev.0, here.1 - prev.1);
            total += sqrtf(dx * dx + dy * dy);
            self.arc[i] = total;
            prev = here;
        }
        self.total_length = total;
    }
}

/// Equal-power blend weights `[A, B, C, D]` for a point on the plane.
///
/// Corners: A = (0, 0), B = (1, 0), C = (1, 1), D = (0, 1). Each weight is the
/// square root of its bilinear area weight, so the squares sum to one.
pub fn corner_weights(x: f32, y: f32) -> [f32; 4] {
    let x = x.clamp(0.0, 1.0);
    let y = y.clamp(0.0, 1.0);
    [
        sqrtf((1.0 - x) * (1.0 - y)),
        sqrtf(x * (1.0 - y)),
        sqrtf(x * y),
        sqrtf((1.0 - x) * y),
    ]
}

#[inline]
fn wrap_unit(v: f32) -> f32 {
    if !v.is_finite() {
        return 0.0;
    }
    let w = v - libm::floorf(v);
    if w >= 1.0 { 0.0 } else { w }
}

fn catmull_rom(p0: Waypoint, p1: Waypoint, p2: Waypoint, p3: Waypoint, t: f32, tension: f32) -> (f32, f32) {
    let alpha = (1.0 - tension) * 0.5;
    let t2 = t * t;
    let t3 = t2 * t;
    let b0 = -alpha * t + 2.0 * alpha * t2 - alpha * t3;
    let b1 = 1.0 + (alpha - 3.0) * t2 + (2.0 - alpha) * t3;
    let b2 = alpha * t + (3.0 - 2.0 * alpha) * t2 + (alpha - 2.0) * t3;
    let b3 = -alpha * t2 + alpha * t3;
    (
        b0 * p0.x + b1 * p1.x + b2 * p2.x + b3 * p3.x,
        b0 * p0.y + b1 * p1.y + b2 * p2.y + b3 * p3.y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist(a: (f32, f32), b: (f32, f32)) -> f32 {
        sqrtf((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2))
    }

    #[test]
    fn test_passes_through_waypoints() {
        let path = VectorPath::preset(PathPreset::Square);
        let (x, y) = path.point_at_parameter(0.0);
        assert!((x - 0.1).abs() < 1e-5 && (y - 0.1).abs() < 1e-5);
        let (x, y) = path.point_at_parameter(0.25);
        assert!((x - 0.9).abs() < 1e-5 && (y - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_square_perimeter() {
        let path = VectorPath::preset(PathPreset::Square);
        assert!((path.total_length() - 3.2).abs() < 0.01, "length {}", path.total_length());
    }

    #[test]
    fn test_uniform_arc_steps() {
        let path = VectorPath::preset(PathPreset::Circle);
        let steps = 64;
        let expected = path.total_length() / steps as f32;
        for k in 0..steps {
            let a = path.position(k as f32 / steps as f32);
            let b = path.position((k + 1) as f32 / steps as f32);
            let d = dist(a, b);
            assert!((d - expected).abs() < expected * 0.05, "step {k}: {d} vs {expected}");
        }
    }

    #[test]
    fn test_uneven_path_moves_at_constant_speed() {
        // one short hop and two long legs: uniform in t would crawl
        // through the first segment and race through the others
        let path = VectorPath::from_waypoints(&[
            Waypoint::new(0.3, 0.3, 0.0),
            Waypoint::new(0.33, 0.3, 0.0),
            Waypoint::new(0.7, 0.7, 0.0),
        ]);
        let steps = 200;
        let expected = path.total_length() / steps as f32;
        let mut shortest = f32::MAX;
        let mut longest = 0.0f32;
        for k in 0..steps {
            let a = path.position(k as f32 / steps as f32);
            let b = path.position((k + 1) as f32 / steps as f32);
            let d = dist(a, b);
            shortest = shortest.min(d);
            longest = longest.max(d);
        }
        assert!(shortest > expected * 0.6, "shortest {shortest} vs {expected}");
        assert!(longest < expected * 1.2, "longest {longest} vs {expected}");

        let raw_shortest = (0..steps)
            .map(|k| {
                let a = path.point_at_parameter(k as f32 / steps as f32);
                let b = path.point_at_parameter((k + 1) as f32 / steps as f32);
                dist(a, b)
            })
            .fold(f32::MAX, f32::min);
        assert!(raw_shortest < expected * 0.2, "raw parameter steps should be uneven");
    }

    #[test]
    fn test_edge_hugging_path_is_not_flattened() {
        let path = VectorPath::from_waypoints(&[
            Waypoint::new(0.0, 0.0, 0.0),
            Waypoint::new(1.0, 0.0, 0.0),
            Waypoint::new(1.0, 1.0, 0.0),
            Waypoint::new(0.0, 1.0, 0.0),
        ]);
        let steps = 64;
        let expected = path.total_length() / steps as f32;
        let mut outside = false;
        for k in 0..steps {
            let a = path.position(k as f32 / steps as f32);
            let b = path.position((k + 1) as f32 / steps as f32);
            let d = dist(a, b);
            assert!((d - expected).abs() < expected * 0.05, "step {k}: {d} vs {expected}");
            outside |= a.0 < 0.0 || a.0 > 1.0 || a.1 < 0.0 || a.1 > 1.0;
        }
        assert!(outside);
        let w = corner_weights(-0.05, 1.05);
        assert_eq!(w, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_waypoint_progress() {
        let path = VectorPath::preset(PathPreset::Square);
        for i in 0..4 {
            let p = path.waypoint_progress(i).unwrap();
            assert!((p - i as f32 * 0.25).abs() < 1e-3, "waypoint {i} at {p}");
            let (x, y) = path.position(p);
            let wp = path.waypoints()[i];
            assert!((x - wp.x).abs() < 0.01 && (y - wp.y).abs() < 0.01);
        }
        assert_eq!(path.waypoint_progress(4), None);
    }

    #[test]
    fn test_square_midpoint_by_arc_length() {
        let path = VectorPath::preset(PathPreset::Square);
        let (x, y) = path.position(0.125);
        assert!((x - 0.5).abs() < 0.01 && (y - 0.1).abs() < 0.01, "({x}, {y})");
    }

    #[test]
    fn test_corner_weights_equal_power() {
        for &(x, y) in &[(0.0, 0.0), (0.3, 0.7), (0.5, 0.5), (1.0, 0.2)] {
            let w = corner_weights(x, y);
            let power: f32 = w.iter().map(|v| v * v).sum();
            assert!((power - 1.0).abs() < 1e-5);
        }
        assert_eq!(corner_weights(0.0, 0.0), [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(corner_weights(1.0, 1.0), [0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_degenerate_paths() {
        let empty = VectorPath::new();
        assert_eq!(empty.position(0.3), (0.5, 0.5));
        let single = VectorPath::from_waypoints(&[Waypoint::new(0.2, 0.8, 0.0)]);
        assert_eq!(single.total_length(), 0.0);
        assert_eq!(single.position(0.9), (0.2, 0.8));
    }

    #[test]
    fn test_capacity() {
        let mut path = VectorPath::new();
        for i in 0..MAX_WAYPOINTS {
            assert!(path.add_waypoint(Waypoint::new(i as f32 / 16.0, 0.5, 0.0)));
        }
        assert!(!path.add_waypoint(Waypoint::new(0.0, 0.0, 0.0)));
        assert_eq!(path.len(), MAX_WAYPOINTS);
    }
}
