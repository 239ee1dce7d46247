//! The round state machine: `Idle → Countdown → Running → Idle`.
//!
//! Every frame the caller hands [`Game::update`] the current time and the
//! fingertip positions in canvas pixels.  The game spawns, moves, touches,
//! and expires squares and reports what happened as [`GameEvent`]s.

use hand_landmarks::{Finger, Frame};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::combo::{Combo, Countdown, SpawnTimer};
use crate::square::{Square, PALETTE};
use crate::{Canvas, Difficulty, DifficultySettings};

/// Digits shown before a round begins.
pub const COUNTDOWN_FROM: u32 = 3;

// ════════════════════════════════════════════════════════════════════════════
// Phase / GameEvent
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Phase {
    Idle,
    Countdown(Countdown),
    Running,
}

/// Something the frame loop may want to react to (sound, logging, UI).
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    /// Countdown finished; squares start spawning.
    RoundStarted,
    Spawned { id: u64 },
    /// A fingertip hit the square.  `score` and `combo` are the new totals.
    Touched { id: u64, score: u32, combo: u32 },
    /// The square aged out untouched; the combo is broken.
    Expired { id: u64 },
}

// ════════════════════════════════════════════════════════════════════════════
// Game
// ════════════════════════════════════════════════════════════════════════════

pub struct Game {
    difficulty: Difficulty,
    /// Settings overrides per difficulty; `None` → built-in table.
    overrides:  Vec<(Difficulty, DifficultySettings)>,
    /// Settings of the round in progress (fixed at round start).
    settings:   DifficultySettings,
    phase:      Phase,
    squares:    Vec<Square>,
    spawner:    SpawnTimer,
    combo:      Combo,
    score:      u32,
    next_id:    u64,
    rng:        StdRng,
}

impl Game {
    pub fn new(difficulty: Difficulty) -> Self {
        Game::with_rng(difficulty, StdRng::from_entropy())
    }

    /// Deterministic spawns, for tests and demos.
    pub fn with_seed(difficulty: Difficulty, seed: u64) -> Self {
        Game::with_rng(difficulty, StdRng::seed_from_u64(seed))
    }

    fn with_rng(difficulty: Difficulty, rng: StdRng) -> Self {
        let settings = difficulty.settings();
        Game {
            difficulty,
            overrides: Vec::new(),
            spawner: SpawnTimer::new(settings.spawn_every, 0.0),
            settings,
            phase: Phase::Idle,
            squares: Vec::new(),
            combo: Combo::new(),
            score: 0,
            next_id: 0,
            rng,
        }
    }

    /// Replace the built-in settings for one difficulty.
    pub fn override_settings(&mut self, difficulty: Difficulty, settings: DifficultySettings) {
        self.overrides.retain(|(d, _)| *d != difficulty);
        self.overrides.push((difficulty, settings.sanitized(difficulty)));
    }

    /// Settings that a round started now at `difficulty` would use.
    pub fn settings_for(&self, difficulty: Difficulty) -> DifficultySettings {
        self.overrides
            .iter()
            .find(|(d, _)| *d == difficulty)
            .map(|(_, s)| s.clone())
            .unwrap_or_else(|| difficulty.settings())
    }

    /// Choose the difficulty for the next round.  A round in progress keeps
    /// the settings it started with.
    pub fn set_difficulty(&mut self, difficulty: Difficulty) {
        info!("Difficulty set to: {}", difficulty.name());
        self.difficulty = difficulty;
    }

    // ── start / stop ──────────────────────────────────────────────────────

    /// Start/stop button: idle → countdown, anything else → idle.
    pub fn toggle(&mut self, now: f64) {
        match self.phase {
            Phase::Idle => self.start(now),
            _           => self.stop(),
        }
    }

    /// Begin the countdown.  Ignored unless idle.
    pub fn start(&mut self, now: f64) {
        if self.phase != Phase::Idle {
            return;
        }
        self.settings = self.settings_for(self.difficulty);
        self.phase = Phase::Countdown(Countdown::new(now, COUNTDOWN_FROM));
        debug!("Starting countdown with {} difficulty", self.difficulty.name());
    }

    /// End the round and clear the board.  Score stays readable until the
    /// next round begins.
    pub fn stop(&mut self) {
        if self.phase != Phase::Idle {
            info!("Stopping game (score {})", self.score);
        }
        self.phase = Phase::Idle;
        self.squares.clear();
    }

    // ── per-frame update ──────────────────────────────────────────────────

    /// Advance the game to `now`.  `tips` are fingertip positions in canvas
    /// pixels (already mirrored if the display is mirrored).
    pub fn update(&mut self, now: f64, tips: &[(f32, f32)], canvas: Canvas) -> Vec<GameEvent> {
        let mut events = Vec::new();

        if let Phase::Countdown(cd) = self.phase {
            if cd.is_finished(now) {
                self.begin_round(now);
                events.push(GameEvent::RoundStarted);
            }
        }

        if self.phase != Phase::Running {
            self.combo.prune(now);
            return events;
        }

        if self.spawner.due(now) {
            let id = self.spawn(now, canvas);
            events.push(GameEvent::Spawned { id });
        }

        let lifetime = self.settings.lifetime;
        let mut remaining = Vec::with_capacity(self.squares.len());

        for mut sq in self.squares.drain(..) {
            if sq.is_moving() {
                sq.step(canvas);
            }

            let touched = tips.iter().any(|&(px, py)| sq.contains(px, py));
            if touched {
                self.score += 1;
                let combo = self.combo.hit(now);
                debug!("Square touched! Score: {}", self.score);
                events.push(GameEvent::Touched { id: sq.id, score: self.score, combo });
            } else if sq.is_expired(now, lifetime) {
                self.combo.miss();
                debug!("Square expired (miss)");
                events.push(GameEvent::Expired { id: sq.id });
            } else {
                remaining.push(sq);
            }
        }

        self.squares = remaining;
        self.combo.prune(now);
        events
    }

    /// [`Game::update`] fed straight from a landmark frame.
    pub fn update_frame(
        &mut self,
        now: f64,
        frame: &Frame,
        fingers: &[Finger],
        canvas: Canvas,
        mirror: bool,
    ) -> Vec<GameEvent> {
        let tips: Vec<(f32, f32)> = frame
            .fingertips(fingers)
            .map(|t| {
                let p = if mirror { t.point.mirrored() } else { t.point };
                p.to_pixels(canvas.width, canvas.height)
            })
            .collect();
        self.update(now, &tips, canvas)
    }

    fn begin_round(&mut self, now: f64) {
        self.phase   = Phase::Running;
        self.score   = 0;
        self.squares.clear();
        self.combo.reset();
        self.spawner = SpawnTimer::new(self.settings.spawn_every, now);
        info!("Game initialised: {} difficulty", self.difficulty.name());
    }

    fn spawn(&mut self, now: f64, canvas: Canvas) -> u64 {
        let s = &self.settings;
        let (lo, hi) = (s.size.min.min(s.size.max), s.size.max.max(s.size.min));
        let size = self.rng.gen_range(lo..=hi) as f32;

        let x = (self.rng.gen::<f32>() * (canvas.width - size).max(0.0)).floor();
        let y = (self.rng.gen::<f32>() * (canvas.height - size).max(0.0)).floor();
        let color = PALETTE[self.rng.gen_range(0..PALETTE.len())];

        let (vx, vy) = if s.moving {
            let m = s.max_speed;
            (self.rng.gen::<f32>() * 2.0 * m - m, self.rng.gen::<f32>() * 2.0 * m - m)
        } else {
            (0.0, 0.0)
        };

        let id = self.next_id;
        self.next_id += 1;
        self.squares.push(Square { id, x, y, size, spawned_at: now, color, vx, vy });
        debug!("Spawned square {} at ({}, {}) size {}", id, x, y, size);
        id
    }

    // ── accessors for the render loop ─────────────────────────────────────

    pub fn phase(&self)      -> Phase              { self.phase }
    pub fn is_running(&self) -> bool               { self.phase == Phase::Running }
    pub fn is_idle(&self)    -> bool               { self.phase == Phase::Idle }
    pub fn squares(&self)    -> &[Square]          { &self.squares }
    pub fn score(&self)      -> u32                { self.score }
    pub fn combo(&self)      -> &Combo             { &self.combo }
    pub fn difficulty(&self) -> Difficulty         { self.difficulty }
    pub fn settings(&self)   -> &DifficultySettings { &self.settings }

    /// Countdown digit to draw, if counting down.
    pub fn countdown_value(&self, now: f64) -> Option<u32> {
        match self.phase {
            Phase::Countdown(cd) => cd.value(now),
            _ => None,
        }
    }

    #[cfg(test)]
    fn place(&mut self, sq: Square) {
        self.squares.push(sq);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use hand_landmarks::{Hand, Landmark};

    const CANVAS: Canvas = Canvas { width: 640.0, height: 480.0 };

    /// A game already past its countdown, started at t = 0.
    fn running(difficulty: Difficulty) -> Game {
        let mut g = Game::with_seed(difficulty, 42);
        g.start(-3.0);
        let ev = g.update(0.0, &[], CANVAS);
        assert_eq!(ev, vec![GameEvent::RoundStarted]);
        g
    }

    fn square_at(id: u64, x: f32, y: f32, spawned_at: f64) -> Square {
        Square { id, x, y, size: 50.0, spawned_at, color: PALETTE[0], vx: 0.0, vy: 0.0 }
    }

    #[test]
    fn toggle_cycles_phases() {
        let mut g = Game::with_seed(Difficulty::Medium, 1);
        assert!(g.is_idle());
        g.toggle(0.0);
        assert!(matches!(g.phase(), Phase::Countdown(_)));
        assert_eq!(g.countdown_value(0.5), Some(3));
        assert_eq!(g.countdown_value(2.5), Some(1));
        g.update(2.9, &[], CANVAS);
        assert!(matches!(g.phase(), Phase::Countdown(_)));
        g.update(3.0, &[], CANVAS);
        assert!(g.is_running());
        g.toggle(4.0);
        assert!(g.is_idle());
        assert!(g.squares().is_empty());
    }

    #[test]
    fn no_spawns_before_round() {
        let mut g = Game::with_seed(Difficulty::Hard, 1);
        assert!(g.update(100.0, &[], CANVAS).is_empty());
        g.start(100.0);
        assert!(g.update(101.0, &[], CANVAS).is_empty());
        assert!(g.squares().is_empty());
    }

    #[test]
    fn spawns_on_period() {
        let mut g = running(Difficulty::Medium);
        assert!(g.update(1.0, &[], CANVAS).is_empty());
        assert_eq!(g.update(1.5, &[], CANVAS), vec![GameEvent::Spawned { id: 0 }]);
        assert_eq!(g.update(3.0, &[], CANVAS), vec![GameEvent::Spawned { id: 1 }]);
        assert_eq!(g.squares().len(), 2);
    }

    #[test]
    fn stall_spawns_a_single_square() {
        let mut g = running(Difficulty::Medium);
        assert_eq!(g.update(30.0, &[], CANVAS), vec![GameEvent::Spawned { id: 0 }]);
        assert_eq!(g.squares().len(), 1);
        // next tick stays on the 1.5 s grid
        assert!(g.update(30.5, &[], CANVAS).is_empty());
        assert_eq!(g.update(31.5, &[], CANVAS), vec![GameEvent::Spawned { id: 1 }]);
    }

    #[test]
    fn spawned_squares_fit_canvas_and_settings() {
        let mut g = running(Difficulty::Easy);
        let mut t = 0.0;
        for _ in 0..40 {
            t += 2.0;
            g.update(t, &[], CANVAS);
            for sq in g.squares() {
                assert!((50.0..=80.0).contains(&sq.size));
                assert!(sq.x >= 0.0 && sq.x + sq.size <= CANVAS.width);
                assert!(sq.y >= 0.0 && sq.y + sq.size <= CANVAS.height);
                assert!(!sq.is_moving());
            }
        }
    }

    #[test]
    fn hard_squares_move_within_speed() {
        let mut g = running(Difficulty::Hard);
        for i in 1..=20 {
            g.update(i as f64, &[], CANVAS);
        }
        assert!(!g.squares().is_empty());
        for sq in g.squares() {
            assert!(sq.vx.abs() <= 2.0 && sq.vy.abs() <= 2.0);
        }
    }

    #[test]
    fn touch_scores_and_removes() {
        let mut g = running(Difficulty::Medium);
        g.place(square_at(7, 100.0, 100.0, 0.0));
        let ev = g.update(0.5, &[(125.0, 125.0)], CANVAS);
        assert_eq!(ev, vec![GameEvent::Touched { id: 7, score: 1, combo: 1 }]);
        assert!(g.squares().is_empty());
        assert_eq!(g.score(), 1);
    }

    #[test]
    fn expiry_breaks_combo() {
        let mut g = running(Difficulty::Medium);
        g.place(square_at(1, 0.0, 0.0, 0.0));
        g.place(square_at(2, 300.0, 300.0, 0.0));
        g.update(0.1, &[(10.0, 10.0)], CANVAS);
        assert_eq!(g.combo().count(), 1);
        // lifetime 3 s; the second square ages out
        let ev = g.update(3.01, &[], CANVAS);
        assert!(ev.contains(&GameEvent::Expired { id: 2 }));
        assert_eq!(g.combo().count(), 0);
        assert_eq!(g.score(), 1);
    }

    #[test]
    fn each_square_leaves_exactly_once() {
        let mut g = running(Difficulty::Hard);
        let mut t = 0.0;
        let mut removed = std::collections::HashMap::new();
        for frame in 0..2_000 {
            t += 1.0 / 60.0;
            // sweep a fingertip across the frame to touch some squares
            let tip = ((frame * 7 % 640) as f32, (frame * 3 % 480) as f32);
            for ev in g.update(t, &[tip], CANVAS) {
                match ev {
                    GameEvent::Touched { id, .. } | GameEvent::Expired { id } => {
                        *removed.entry(id).or_insert(0) += 1;
                    }
                    _ => {}
                }
            }
        }
        assert!(!removed.is_empty());
        assert!(removed.values().all(|&n| n == 1));
        for sq in g.squares() {
            assert!(!removed.contains_key(&sq.id));
        }
    }

    #[test]
    fn combo_message_at_three() {
        let mut g = running(Difficulty::Medium);
        for (i, x) in [0.0f32, 100.0, 200.0].iter().enumerate() {
            g.place(square_at(i as u64, *x, 0.0, 0.0));
        }
        let tips = [(10.0, 10.0), (110.0, 10.0), (210.0, 10.0)];
        g.update(0.2, &tips, CANVAS);
        assert_eq!(g.combo().count(), 3);
        assert_eq!(g.combo().visible_message(0.2), Some("3 COMBO!"));
        g.update(2.3, &[], CANVAS);
        assert_eq!(g.combo().visible_message(2.3), None);
    }

    #[test]
    fn new_round_resets_score() {
        let mut g = running(Difficulty::Medium);
        g.place(square_at(0, 0.0, 0.0, 0.0));
        g.update(0.1, &[(1.0, 1.0)], CANVAS);
        assert_eq!(g.score(), 1);
        g.stop();
        assert_eq!(g.score(), 1);
        g.start(10.0);
        g.update(13.0, &[], CANVAS);
        assert_eq!(g.score(), 0);
    }

    #[test]
    fn difficulty_change_waits_for_next_round() {
        let mut g = running(Difficulty::Medium);
        g.set_difficulty(Difficulty::Hard);
        assert_eq!(g.settings().lifetime, 3.0);
        g.stop();
        g.start(0.0);
        assert_eq!(g.settings().lifetime, 2.0);
    }

    #[test]
    fn overrides_apply() {
        let mut g = Game::with_seed(Difficulty::Easy, 3);
        let mut s = Difficulty::Easy.settings();
        s.lifetime = 9.0;
        g.override_settings(Difficulty::Easy, s);
        g.start(0.0);
        assert_eq!(g.settings().lifetime, 9.0);
    }

    #[test]
    fn runaway_override_spawns_at_a_sane_rate() {
        let mut g = Game::with_seed(Difficulty::Medium, 3);
        let s = DifficultySettings { spawn_every: 1e-6, ..Difficulty::Medium.settings() };
        g.override_settings(Difficulty::Medium, s);
        g.start(-3.0);
        g.update(0.0, &[], CANVAS);
        assert_eq!(g.settings().spawn_every, 1.5);
        g.update(5.0, &[], CANVAS);
        assert_eq!(g.squares().len(), 1);
    }

    #[test]
    fn update_frame_mirrors_tips() {
        let mut g = running(Difficulty::Medium);
        // square on the right-hand side of the canvas
        g.place(square_at(5, 500.0, 100.0, 0.0));
        let mut hand = Hand::new(vec![Landmark::new(0.0, 0.0); 21]);
        // index tip at x = 0.2 → mirrored to 0.8 → 512 px
        hand.landmarks[8] = Landmark::new(0.2, 0.25);
        let frame = Frame::new(0.5, vec![hand]);

        let ev = g.update_frame(0.5, &frame, &[Finger::Index], CANVAS, false);
        assert!(ev.is_empty());
        let ev = g.update_frame(0.6, &frame, &[Finger::Index], CANVAS, true);
        assert_eq!(ev.len(), 1);
    }
}
