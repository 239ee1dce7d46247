//! Touch targets: geometry, fading colour, and bounce physics.

use crate::Canvas;

// ════════════════════════════════════════════════════════════════════════════
// Colours
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// 0.0–1.0
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Rgba { r, g, b, a }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Rgba { a: a.clamp(0.0, 1.0), ..self }
    }
}

/// Translucent fill plus opaque outline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SquareColor {
    pub fill:   Rgba,
    pub stroke: Rgba,
}

const FILL_ALPHA: f32 = 0.4;

const fn pair(r: u8, g: u8, b: u8) -> SquareColor {
    SquareColor { fill: Rgba::new(r, g, b, FILL_ALPHA), stroke: Rgba::new(r, g, b, 1.0) }
}

/// Red, green, blue, yellow, magenta, cyan.
pub const PALETTE: [SquareColor; 6] = [
    pair(255, 0, 0),
    pair(0, 255, 0),
    pair(0, 0, 255),
    pair(255, 255, 0),
    pair(255, 0, 255),
    pair(0, 255, 255),
];

impl SquareColor {
    /// Colours scaled by the square's remaining-life opacity.
    pub fn faded(&self, opacity: f32) -> SquareColor {
        let o = opacity.clamp(0.0, 1.0);
        SquareColor {
            fill:   self.fill.with_alpha(FILL_ALPHA * o),
            stroke: self.stroke.with_alpha(o),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Square
// ════════════════════════════════════════════════════════════════════════════

/// One live target.  `(x, y)` is the top-left corner in canvas pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct Square {
    pub id:         u64,
    pub x:          f32,
    pub y:          f32,
    pub size:       f32,
    pub spawned_at: f64,
    pub color:      SquareColor,
    /// Pixels per frame.
    pub vx:         f32,
    pub vy:         f32,
}

impl Square {
    /// Point-in-rectangle test, edges inclusive.
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.x + self.size && py >= self.y && py <= self.y + self.size
    }

    pub fn age(&self, now: f64) -> f64 {
        now - self.spawned_at
    }

    pub fn is_expired(&self, now: f64, lifetime: f64) -> bool {
        self.age(now) > lifetime
    }

    /// `1 - age / lifetime`, clamped to `[0, 1]`.
    pub fn opacity(&self, now: f64, lifetime: f64) -> f32 {
        if lifetime <= 0.0 {
            return 0.0;
        }
        (1.0 - self.age(now) / lifetime).clamp(0.0, 1.0) as f32
    }

    pub fn is_moving(&self) -> bool {
        self.vx != 0.0 || self.vy != 0.0
    }

    /// Advance one frame.  A square crossing an edge is put back against
    /// that edge and the matching velocity component is negated.
    pub fn step(&mut self, canvas: Canvas) {
        self.x += self.vx;
        self.y += self.vy;

        let max_x = (canvas.width - self.size).max(0.0);
        let max_y = (canvas.height - self.size).max(0.0);

        if self.x < 0.0 {
            self.x = 0.0;
            self.vx = -self.vx;
        } else if self.x > max_x {
            self.x = max_x;
            self.vx = -self.vx;
        }

        if self.y < 0.0 {
            self.y = 0.0;
            self.vy = -self.vy;
        } else if self.y > max_y {
            self.y = max_y;
            self.vy = -self.vy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f32, y: f32, vx: f32, vy: f32) -> Square {
        Square { id: 0, x, y, size: 40.0, spawned_at: 10.0, color: PALETTE[0], vx, vy }
    }

    #[test]
    fn contains_is_inclusive() {
        let s = square(100.0, 100.0, 0.0, 0.0);
        assert!(s.contains(100.0, 100.0));
        assert!(s.contains(140.0, 140.0));
        assert!(s.contains(120.0, 130.0));
        assert!(!s.contains(99.9, 120.0));
        assert!(!s.contains(120.0, 140.1));
    }

    #[test]
    fn opacity_fades_linearly() {
        let s = square(0.0, 0.0, 0.0, 0.0);
        assert_eq!(s.opacity(10.0, 2.0), 1.0);
        assert!((s.opacity(11.0, 2.0) - 0.5).abs() < 1e-6);
        assert_eq!(s.opacity(13.0, 2.0), 0.0);
    }

    #[test]
    fn expiry_is_strictly_after_lifetime() {
        let s = square(0.0, 0.0, 0.0, 0.0);
        assert!(!s.is_expired(12.0, 2.0));
        assert!(s.is_expired(12.01, 2.0));
    }

    #[test]
    fn bounce_off_right_edge() {
        let canvas = Canvas::new(200.0, 200.0);
        let mut s = square(159.0, 50.0, 2.0, 0.0);
        s.step(canvas);
        assert_eq!(s.x, 160.0);
        assert_eq!(s.vx, -2.0);
        s.step(canvas);
        assert_eq!(s.x, 158.0);
    }

    #[test]
    fn bounce_off_top_left_corner() {
        let canvas = Canvas::new(200.0, 200.0);
        let mut s = square(1.0, 0.5, -2.0, -1.5);
        s.step(canvas);
        assert_eq!((s.x, s.y), (0.0, 0.0));
        assert_eq!((s.vx, s.vy), (2.0, 1.5));
    }

    #[test]
    fn stays_clamped_over_many_frames() {
        let canvas = Canvas::new(320.0, 240.0);
        let mut s = square(10.0, 10.0, 1.9, -1.7);
        for _ in 0..5_000 {
            s.step(canvas);
            assert!(s.x >= 0.0 && s.x + s.size <= canvas.width);
            assert!(s.y >= 0.0 && s.y + s.size <= canvas.height);
        }
        assert_eq!(s.vx.abs(), 1.9);
        assert_eq!(s.vy.abs(), 1.7);
    }

    #[test]
    fn faded_scales_alpha() {
        let c = PALETTE[3].faded(0.5);
        assert!((c.fill.a - 0.2).abs() < 1e-6);
        assert!((c.stroke.a - 0.5).abs() < 1e-6);
        assert_eq!((c.fill.r, c.fill.g, c.fill.b), (255, 255, 0));
    }
}
