//! # dance_off
//!
//! A reaction game played with fingertips: coloured squares spawn on a
//! timer and must be touched before they fade out.
//!
//! * Touching a square scores a point and extends the combo.
//! * Letting a square expire is a miss and breaks the combo.
//! * Combos of 3, 5, 10, 15, … flash a message for two seconds.
//! * On **hard**, squares drift and bounce off the edges of the frame.
//!
//! The crate is pure game state: time is passed in as seconds, fingertips
//! as pixel positions, randomness through a seeded [`rand`] generator.
//! Drawing and music are the caller's business.
//!
//! ```rust
//! use dance_off::{Canvas, Difficulty, Game, GameEvent};
//!
//! let canvas = Canvas::new(640.0, 480.0);
//! let mut game = Game::with_seed(Difficulty::Easy, 7);
//! game.toggle(0.0);                       // countdown 3‥2‥1
//! let events = game.update(3.0, &[], canvas);
//! assert!(events.contains(&GameEvent::RoundStarted));
//! ```

use log::warn;
use serde::{Deserialize, Serialize};

pub mod combo;
pub mod game;
pub mod square;

pub use combo::{Combo, Countdown, SpawnTimer, COMBO_DISPLAY_SECS};
pub use game::{Game, GameEvent, Phase};
pub use square::{Rgba, Square, SquareColor, PALETTE};

// ════════════════════════════════════════════════════════════════════════════
// Canvas
// ════════════════════════════════════════════════════════════════════════════

/// Size of the drawing surface in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width:  f32,
    pub height: f32,
}

impl Canvas {
    pub fn new(width: f32, height: f32) -> Self {
        Canvas { width, height }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Difficulty
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Unknown selector values fall back to medium.
    pub fn from_selector(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "hard" => Difficulty::Hard,
            _      => Difficulty::Medium,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy   => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard   => "hard",
        }
    }

    pub fn settings(self) -> DifficultySettings {
        DifficultySettings::for_difficulty(self)
    }
}

/// Inclusive square side-length range in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRange {
    pub min: u32,
    pub max: u32,
}

/// Everything a difficulty level changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultySettings {
    /// Seconds between spawns.
    pub spawn_every: f64,
    pub size:        SizeRange,
    /// Seconds a square stays alive untouched.
    pub lifetime:    f64,
    /// Background track for the round.
    pub music:       String,
    /// Squares drift and bounce.
    #[serde(default)]
    pub moving:      bool,
    /// Largest per-frame velocity component for moving squares, in pixels.
    #[serde(default = "default_max_speed")]
    pub max_speed:   f32,
}

fn default_max_speed() -> f32 { 2.0 }

/// Shortest spawn period accepted from user settings, in seconds.
pub const MIN_SPAWN_EVERY: f64 = 0.1;

impl DifficultySettings {
    pub fn for_difficulty(d: Difficulty) -> Self {
        match d {
            Difficulty::Easy => DifficultySettings {
                spawn_every: 2.0,
                size:        SizeRange { min: 50, max: 80 },
                lifetime:    4.0,
                music:       "music/dance_off/Senorita.wav".to_string(),
                moving:      false,
                max_speed:   default_max_speed(),
            },
            Difficulty::Medium => DifficultySettings {
                spawn_every: 1.5,
                size:        SizeRange { min: 40, max: 60 },
                lifetime:    3.0,
                music:       "music/dance_off/CountingStars.wav".to_string(),
                moving:      false,
                max_speed:   default_max_speed(),
            },
            Difficulty::Hard => DifficultySettings {
                spawn_every: 1.0,
                size:        SizeRange { min: 30, max: 40 },
                lifetime:    2.0,
                music:       "music/dance_off/Greedy.wav".to_string(),
                moving:      true,
                max_speed:   default_max_speed(),
            },
        }
    }

    /// Replace unusable values with the built-in ones for `d`, logging each
    /// replacement.  A reversed size range is swapped.
    pub fn sanitized(mut self, d: Difficulty) -> Self {
        let builtin = d.settings();
        if !(self.spawn_every.is_finite() && self.spawn_every >= MIN_SPAWN_EVERY) {
            warn!(
                "{}: spawn_every {} below {}s; using {}",
                d.name(), self.spawn_every, MIN_SPAWN_EVERY, builtin.spawn_every,
            );
            self.spawn_every = builtin.spawn_every;
        }
        if !(self.lifetime.is_finite() && self.lifetime > 0.0) {
            warn!("{}: lifetime {} not positive; using {}", d.name(), self.lifetime, builtin.lifetime);
            self.lifetime = builtin.lifetime;
        }
        if self.size.min > self.size.max {
            warn!("{}: size min {} > max {}; swapping", d.name(), self.size.min, self.size.max);
            self.size = SizeRange { min: self.size.max, max: self.size.min };
        }
        if self.size.min == 0 {
            warn!("{}: zero square size; using {:?}", d.name(), builtin.size);
            self.size = builtin.size;
        }
        if !(self.max_speed.is_finite() && self.max_speed >= 0.0) {
            warn!("{}: max_speed {} invalid; using {}", d.name(), self.max_speed, builtin.max_speed);
            self.max_speed = builtin.max_speed;
        }
        self
    }
}
