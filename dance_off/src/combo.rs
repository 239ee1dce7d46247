//! Combo streak, round countdown, and the spawn clock.

/// How long a combo message stays on screen, in seconds.
pub const COMBO_DISPLAY_SECS: f64 = 2.0;

// ════════════════════════════════════════════════════════════════════════════
// Combo
// ════════════════════════════════════════════════════════════════════════════

/// Streak of consecutive touches plus the transient message it triggers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Combo {
    count:   u32,
    /// Message text and the time it was shown.
    message: Option<(String, f64)>,
}

impl Combo {
    pub fn new() -> Self {
        Combo::default()
    }

    /// Streaks that earn a message: exactly 3, then every multiple of 5.
    pub fn is_milestone(count: u32) -> bool {
        count == 3 || (count >= 5 && count % 5 == 0)
    }

    /// A square was touched.  Returns the new streak length.
    pub fn hit(&mut self, now: f64) -> u32 {
        self.count += 1;
        if Combo::is_milestone(self.count) {
            self.message = Some((format!("{} COMBO!", self.count), now));
        }
        self.count
    }

    /// A square expired untouched: streak over, message hidden.
    pub fn miss(&mut self) {
        self.count = 0;
        self.message = None;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// The message, if one is showing at `now`.
    pub fn visible_message(&self, now: f64) -> Option<&str> {
        match &self.message {
            Some((text, shown)) if now - shown < COMBO_DISPLAY_SECS => Some(text.as_str()),
            _ => None,
        }
    }

    /// Drop a message whose display time is over.
    pub fn prune(&mut self, now: f64) {
        if self.visible_message(now).is_none() {
            self.message = None;
        }
    }

    pub fn reset(&mut self) {
        *self = Combo::default();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Countdown
// ════════════════════════════════════════════════════════════════════════════

/// "3, 2, 1" before a round, one digit per second.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Countdown {
    pub started_at: f64,
    pub from:       u32,
}

impl Countdown {
    pub fn new(started_at: f64, from: u32) -> Self {
        Countdown { started_at, from }
    }

    /// Digit to display at `now`, or `None` once the countdown is over.
    pub fn value(&self, now: f64) -> Option<u32> {
        let elapsed = (now - self.started_at).max(0.0);
        let step = elapsed.floor() as u32;
        if step >= self.from { None } else { Some(self.from - step) }
    }

    pub fn is_finished(&self, now: f64) -> bool {
        self.value(now).is_none()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SpawnTimer
// ════════════════════════════════════════════════════════════════════════════

/// Fixed-period ticker.  The first tick falls one period after `start`.
///
/// Ticks missed during a stall are dropped, not replayed: at most one tick
/// fires per call and the schedule stays on its original grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnTimer {
    period:  f64,
    next_at: f64,
}

impl SpawnTimer {
    pub fn new(period: f64, start: f64) -> Self {
        let period = if period.is_finite() && period > 0.0 { period } else { 1.0 };
        SpawnTimer { period, next_at: start + period }
    }

    /// Whether a tick fell due up to `now`.  Any further ticks that were
    /// also due are skipped.
    pub fn due(&mut self, now: f64) -> bool {
        if !(now >= self.next_at) {
            return false;
        }
        let missed = ((now - self.next_at) / self.period).floor();
        self.next_at += (missed + 1.0) * self.period;
        if self.next_at <= now {
            // rounding with a tiny period
            self.next_at = now + self.period;
        }
        true
    }

    pub fn period(&self) -> f64 {
        self.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milestones() {
        let hits: Vec<u32> = (1..=31).filter(|&c| Combo::is_milestone(c)).collect();
        assert_eq!(hits, vec![3, 5, 10, 15, 20, 25, 30]);
    }

    #[test]
    fn message_on_third_hit() {
        let mut c = Combo::new();
        c.hit(0.0);
        c.hit(0.1);
        assert_eq!(c.visible_message(0.2), None);
        c.hit(0.3);
        assert_eq!(c.visible_message(0.3), Some("3 COMBO!"));
    }

    #[test]
    fn message_disappears_after_display_time() {
        let mut c = Combo::new();
        for t in 0..3 { c.hit(t as f64); }
        // shown at t = 2.0
        assert!(c.visible_message(3.99).is_some());
        assert!(c.visible_message(4.0).is_none());
        c.prune(4.0);
        assert_eq!(c, Combo { count: 3, message: None });
    }

    #[test]
    fn fourth_hit_keeps_earlier_message_timer() {
        let mut c = Combo::new();
        for _ in 0..3 { c.hit(0.0); }
        c.hit(1.5);
        assert_eq!(c.visible_message(1.9), Some("3 COMBO!"));
        assert!(c.visible_message(2.1).is_none());
    }

    #[test]
    fn miss_resets_and_hides() {
        let mut c = Combo::new();
        for _ in 0..5 { c.hit(0.0); }
        assert_eq!(c.visible_message(0.5), Some("5 COMBO!"));
        c.miss();
        assert_eq!(c.count(), 0);
        assert_eq!(c.visible_message(0.5), None);
    }

    #[test]
    fn countdown_digits() {
        let cd = Countdown::new(10.0, 3);
        assert_eq!(cd.value(10.0), Some(3));
        assert_eq!(cd.value(11.5), Some(2));
        assert_eq!(cd.value(12.99), Some(1));
        assert_eq!(cd.value(13.0), None);
        assert!(cd.is_finished(20.0));
    }

    #[test]
    fn spawn_timer_ticks() {
        let mut t = SpawnTimer::new(1.5, 0.0);
        assert!(!t.due(1.0));
        assert!(t.due(1.5));
        assert!(!t.due(2.0));
        assert!(t.due(3.0));
    }

    #[test]
    fn spawn_timer_skips_ticks_missed_in_a_stall() {
        let mut t = SpawnTimer::new(1.5, 0.0);
        assert!(t.due(6.1));
        // 1.5, 3.0, 4.5 and 6.0 collapse into one; next on the grid is 7.5
        assert!(!t.due(6.2));
        assert!(!t.due(7.4));
        assert!(t.due(7.5));
    }

    #[test]
    fn tiny_period_fires_once_per_call() {
        let mut t = SpawnTimer::new(1e-6, 0.0);
        assert!(t.due(5.0));
        assert!(!t.due(5.0));
        assert!(t.due(5.1));
    }

    #[test]
    fn bad_period_falls_back_to_one_second() {
        for p in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let t = SpawnTimer::new(p, 0.0);
            assert_eq!(t.period(), 1.0);
        }
        let mut t = SpawnTimer::new(1.0, 0.0);
        assert!(!t.due(f64::NAN));
        assert!(t.due(1.0));
    }
}
