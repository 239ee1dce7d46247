//! Fingertip trail state.
//!
//! Each tracked fingertip leaves a short ring of timestamped points.  Points
//! fade as they age (`1 - age / ttl`) and the line through them runs from a
//! dim tail colour to the finger's bright head colour.

use std::collections::VecDeque;

use hand_landmarks::{Finger, Frame, Landmark};

// ════════════════════════════════════════════════════════════════════════════
// Colour helpers — packed 0xAARRGGBB
// ════════════════════════════════════════════════════════════════════════════

/// Convert HSV → packed ARGB (A=0xFF).  `h` in degrees.
pub fn hsv_to_argb(h: f32, s: f32, v: f32) -> u32 {
    let h  = h.rem_euclid(360.0);
    let hi = (h / 60.0) as u32;
    let f  = h / 60.0 - hi as f32;
    let p  = v * (1.0 - s);
    let q  = v * (1.0 - s * f);
    let t  = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match hi {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let to8 = |c: f32| ((c.clamp(0.0, 1.0) * 255.0) as u32) & 0xFF;
    0xFF000000 | (to8(r) << 16) | (to8(g) << 8) | to8(b)
}

/// Mix two ARGB colours. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
pub fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0 - t) + cb as f32 * t).round() as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF000000 | (lerp(ar, br) << 16) | (lerp(ag, bg) << 8) | lerp(ab, bb)
}

/// Hue per finger, spaced around the wheel.
pub fn finger_hue(finger: Finger) -> f32 {
    finger.slot() as f32 * 72.0
}

/// Colour at the newest point of a finger's trail.
pub fn head_color(finger: Finger) -> u32 {
    hsv_to_argb(finger_hue(finger), 0.85, 1.0)
}

/// Colour at the oldest point.
pub fn tail_color(finger: Finger) -> u32 {
    hsv_to_argb(finger_hue(finger) + 40.0, 0.6, 0.55)
}

// ════════════════════════════════════════════════════════════════════════════
// Trail
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrailPoint {
    pub point: Landmark,
    pub t:     f64,
}

/// One line piece ready to draw.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrailSegment {
    pub from:    Landmark,
    pub to:      Landmark,
    pub color:   u32,
    /// 0.0–1.0, from the age of the newer end.
    pub opacity: f32,
}

/// Bounded ring of recent positions for one fingertip, oldest first.
#[derive(Clone, Debug)]
pub struct Trail {
    points:   VecDeque<TrailPoint>,
    capacity: usize,
    /// Seconds a point stays visible.
    ttl:      f64,
}

impl Trail {
    pub fn new(capacity: usize, ttl: f64) -> Self {
        let capacity = capacity.max(2);
        Trail { points: VecDeque::with_capacity(capacity), capacity, ttl }
    }

    /// Append the latest position; the oldest point falls off when full.
    pub fn push(&mut self, point: Landmark, now: f64) {
        if self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(TrailPoint { point, t: now });
    }

    /// Drop points that have fully faded.
    pub fn prune(&mut self, now: f64) {
        while self.points.front().map_or(false, |p| now - p.t >= self.ttl) {
            self.points.pop_front();
        }
    }

    pub fn opacity(&self, p: &TrailPoint, now: f64) -> f32 {
        if self.ttl <= 0.0 {
            return 0.0;
        }
        (1.0 - (now - p.t) / self.ttl).clamp(0.0, 1.0) as f32
    }

    pub fn len(&self) -> usize { self.points.len() }
    pub fn is_empty(&self) -> bool { self.points.is_empty() }
    pub fn points(&self) -> impl Iterator<Item = &TrailPoint> { self.points.iter() }
    pub fn head(&self) -> Option<&TrailPoint> { self.points.back() }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Line pieces between consecutive points, tail → head, coloured along
    /// the gradient `tail → head`.
    pub fn segments(&self, tail: u32, head: u32, now: f64) -> Vec<TrailSegment> {
        let n = self.points.len();
        if n < 2 {
            return Vec::new();
        }
        self.points
            .iter()
            .zip(self.points.iter().skip(1))
            .enumerate()
            .map(|(i, (a, b))| TrailSegment {
                from:    a.point,
                to:      b.point,
                color:   blend(tail, head, (i + 1) as f32 / (n - 1) as f32),
                opacity: self.opacity(b, now),
            })
            .collect()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FingerTrails — every tracked fingertip of every hand
// ════════════════════════════════════════════════════════════════════════════

/// Trails indexed by `(hand, finger)`.  Hands beyond `max_hands` are ignored.
#[derive(Clone, Debug)]
pub struct FingerTrails {
    trails:    Vec<Trail>,
    max_hands: usize,
}

impl FingerTrails {
    pub fn new(max_hands: usize, capacity: usize, ttl: f64) -> Self {
        let max_hands = max_hands.max(1);
        FingerTrails {
            trails: vec![Trail::new(capacity, ttl); max_hands * Finger::ALL.len()],
            max_hands,
        }
    }

    fn index(hand: usize, finger: Finger) -> usize {
        hand * Finger::ALL.len() + finger.slot()
    }

    pub fn get(&self, hand: usize, finger: Finger) -> Option<&Trail> {
        if hand >= self.max_hands { return None; }
        self.trails.get(FingerTrails::index(hand, finger))
    }

    /// Record this frame's tips of `fingers` and fade everything else.
    pub fn update(&mut self, frame: &Frame, fingers: &[Finger], now: f64) {
        for tip in frame.fingertips(fingers) {
            if tip.hand >= self.max_hands { continue; }
            self.trails[FingerTrails::index(tip.hand, tip.finger)].push(tip.point, now);
        }
        for trail in &mut self.trails {
            trail.prune(now);
        }
    }

    /// Fade only (no frame this tick).
    pub fn prune(&mut self, now: f64) {
        for trail in &mut self.trails {
            trail.prune(now);
        }
    }

    pub fn clear(&mut self) {
        for trail in &mut self.trails {
            trail.clear();
        }
    }

    /// Every non-empty trail with its owner.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Finger, &Trail)> {
        self.trails.iter().enumerate().filter(|(_, t)| !t.is_empty()).filter_map(|(i, t)| {
            let n = Finger::ALL.len();
            Finger::from_slot(i % n).map(|f| (i / n, f, t))
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use hand_landmarks::Hand;

    #[test]
    fn hsv_primaries() {
        assert_eq!(hsv_to_argb(0.0,   1.0, 1.0), 0xFFFF0000);
        assert_eq!(hsv_to_argb(120.0, 1.0, 1.0), 0xFF00FF00);
        assert_eq!(hsv_to_argb(240.0, 1.0, 1.0), 0xFF0000FF);
        assert_eq!(hsv_to_argb(360.0, 1.0, 1.0), 0xFFFF0000);
    }

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 0.0), 0xFF000000);
        assert_eq!(blend(0xFF000000, 0xFFFFFFFF, 1.0), 0xFFFFFFFF);
        assert_eq!(blend(0xFF000000, 0xFF0000FF, 0.5), 0xFF000080);
    }

    #[test]
    fn trail_is_bounded() {
        let mut t = Trail::new(3, 10.0);
        for i in 0..5 {
            t.push(Landmark::new(i as f32 * 0.1, 0.0), i as f64);
        }
        assert_eq!(t.len(), 3);
        assert!((t.points().next().unwrap().point.x - 0.2).abs() < 1e-6);
    }

    #[test]
    fn opacity_decays_with_age() {
        let mut t = Trail::new(4, 0.5);
        t.push(Landmark::new(0.0, 0.0), 1.0);
        let p = *t.head().unwrap();
        assert_eq!(t.opacity(&p, 1.0), 1.0);
        assert!((t.opacity(&p, 1.25) - 0.5).abs() < 1e-6);
        assert_eq!(t.opacity(&p, 2.0), 0.0);
    }

    #[test]
    fn prune_drops_faded_points() {
        let mut t = Trail::new(8, 0.5);
        t.push(Landmark::new(0.0, 0.0), 0.0);
        t.push(Landmark::new(0.1, 0.0), 0.3);
        t.prune(0.6);
        assert_eq!(t.len(), 1);
        t.prune(0.8);
        assert!(t.is_empty());
    }

    #[test]
    fn segments_run_tail_to_head() {
        let mut t = Trail::new(8, 1.0);
        for i in 0..3 {
            t.push(Landmark::new(i as f32 * 0.1, 0.5), i as f64 * 0.1);
        }
        let segs = t.segments(0xFF000000, 0xFFFFFFFF, 0.2);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[1].color, 0xFFFFFFFF);
        assert!(segs[0].color < segs[1].color);
        assert!(segs[0].opacity < segs[1].opacity);
        assert_eq!(segs[1].opacity, 1.0);
    }

    #[test]
    fn finger_trails_follow_frames() {
        let mut trails = FingerTrails::new(1, 8, 0.5);
        let frame = Frame::new(0.0, vec![Hand::synthetic(0.5, 0.5, 0.05), Hand::synthetic(0.2, 0.5, 0.05)]);
        let fingers = [Finger::Thumb, Finger::Index, Finger::Middle];
        trails.update(&frame, &fingers, 0.0);
        trails.update(&frame, &fingers, 0.1);

        let owners: Vec<(usize, Finger)> = trails.iter().map(|(h, f, _)| (h, f)).collect();
        assert_eq!(owners, vec![(0, Finger::Thumb), (0, Finger::Index), (0, Finger::Middle)]);
        assert_eq!(trails.get(0, Finger::Index).unwrap().len(), 2);
        assert!(trails.get(1, Finger::Index).is_none());

        trails.update(&Frame::empty(1.0), &fingers, 1.0);
        assert_eq!(trails.iter().count(), 0);
    }

    #[test]
    fn finger_colours_differ() {
        let heads: Vec<u32> = Finger::ALL.iter().map(|&f| head_color(f)).collect();
        for i in 0..heads.len() {
            for j in i + 1..heads.len() {
                assert_ne!(heads[i], heads[j]);
            }
        }
    }
}
