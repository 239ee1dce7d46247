//! Smoothed fingertip speed for the bar visualizer.

use hand_landmarks::Landmark;

/// Weight of the previous level in the exponential smoothing.
pub const SMOOTHING: f32 = 0.8;
/// Speed (normalized frame widths per second) at which the bars max out.
pub const MAX_SPEED: f32 = 3.0;
/// Bar oscillation angular speed, radians per second.
const WAVE_OMEGA: f64 = 6.0;
/// Phase offset between neighbouring bars.
const WAVE_PHASE: f64 = 0.6;

/// Exponentially smoothed speed of one tracked point:
/// `level = 0.8 * level + 0.2 * sample`, clamped to `[0, MAX_SPEED]`.
#[derive(Clone, Debug)]
pub struct VelocityMeter {
    level: f32,
    last:  Option<(Landmark, f64)>,
}

impl Default for VelocityMeter {
    fn default() -> Self {
        VelocityMeter::new()
    }
}

impl VelocityMeter {
    pub fn new() -> Self {
        VelocityMeter { level: 0.0, last: None }
    }

    /// Feed the tracked point's position at time `now` (seconds).
    /// The first sample after a gap only primes the meter.
    pub fn update(&mut self, point: Landmark, now: f64) -> f32 {
        let sample = match self.last {
            Some((prev, t)) if now > t => prev.distance(point) / (now - t) as f32,
            _ => 0.0,
        };
        self.last = Some((point, now));
        self.blend(sample)
    }

    /// No point this frame: decay toward zero and forget the last position.
    pub fn decay(&mut self) -> f32 {
        self.last = None;
        self.blend(0.0)
    }

    fn blend(&mut self, sample: f32) -> f32 {
        let sample = if sample.is_finite() { sample } else { 0.0 };
        self.level = (SMOOTHING * self.level + (1.0 - SMOOTHING) * sample).clamp(0.0, MAX_SPEED);
        self.level
    }

    pub fn level(&self) -> f32 { self.level }

    /// Level scaled into `[0, 1]`.
    pub fn normalized(&self) -> f32 { self.level / MAX_SPEED }

    /// Heights for `bars` bars at time `t`, each up to `max_height`.
    ///
    /// Bars ride a travelling sine wave whose amplitude follows the level,
    /// so a still hand gives flat bars and a fast hand gives a lively wave.
    pub fn bar_heights(&self, bars: usize, t: f64, max_height: f32) -> Vec<f32> {
        let amp = self.normalized() * max_height;
        (0..bars)
            .map(|i| {
                let wave = (t * WAVE_OMEGA + i as f64 * WAVE_PHASE).sin() as f32;
                amp * (0.5 + 0.5 * wave)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_only_primes() {
        let mut m = VelocityMeter::new();
        assert_eq!(m.update(Landmark::new(0.5, 0.5), 0.0), 0.0);
    }

    #[test]
    fn smoothing_step() {
        let mut m = VelocityMeter::new();
        m.update(Landmark::new(0.0, 0.0), 0.0);
        // 0.1 units in 0.1 s → sample 1.0 → level 0.2
        let v = m.update(Landmark::new(0.1, 0.0), 0.1);
        assert!((v - 0.2).abs() < 1e-5);
        // still → 0.8 * 0.2
        let v = m.update(Landmark::new(0.1, 0.0), 0.2);
        assert!((v - 0.16).abs() < 1e-5);
    }

    #[test]
    fn clamps_at_max() {
        let mut m = VelocityMeter::new();
        let mut t = 0.0;
        for i in 0..100 {
            let x = if i % 2 == 0 { 0.0 } else { 1.0 };
            m.update(Landmark::new(x, 0.0), t);
            t += 0.001;
        }
        assert_eq!(m.level(), MAX_SPEED);
        assert!((m.normalized() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn decays_to_zero() {
        let mut m = VelocityMeter::new();
        m.update(Landmark::new(0.0, 0.0), 0.0);
        m.update(Landmark::new(0.3, 0.0), 0.1);
        for _ in 0..200 { m.decay(); }
        assert!(m.level() < 1e-6);
    }

    #[test]
    fn same_timestamp_is_not_infinite() {
        let mut m = VelocityMeter::new();
        m.update(Landmark::new(0.0, 0.0), 1.0);
        let v = m.update(Landmark::new(0.5, 0.0), 1.0);
        assert_eq!(v, 0.0);
    }

    #[test]
    fn bars_bounded_by_level() {
        let mut m = VelocityMeter::new();
        m.update(Landmark::new(0.0, 0.0), 0.0);
        m.update(Landmark::new(0.2, 0.0), 0.05);
        let max = m.normalized() * 100.0;
        for h in m.bar_heights(12, 3.7, 100.0) {
            assert!(h >= 0.0 && h <= max + 1e-4);
        }
        assert!(VelocityMeter::new().bar_heights(8, 1.0, 100.0).iter().all(|&h| h == 0.0));
    }
}
