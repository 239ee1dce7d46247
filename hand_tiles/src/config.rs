//! Application configuration: defaults, RON file, command-line overrides.
//!
//! ```ron
//! (
//!     mode: dance,
//!     difficulty: hard,
//!     density: 3,
//!     style: vibes,
//!     detector: Some("python3 hand_detect.py"),
//! )
//! ```
//!
//! Every field is optional in the file; missing fields keep their defaults.

use std::collections::HashMap;
use std::path::Path;

use dance_off::{Difficulty, DifficultySettings};
use finger_notes::{
    density_from_selector, InstrumentStyle, NoteScale, NoteValue, DEFAULT_DENSITY, DENSITIES,
    FAST_NOTE_INTERVAL, MIN_NOTE_INTERVAL,
};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::args::Args;
use crate::error::AppError;

// ════════════════════════════════════════════════════════════════════════════
// Mode
// ════════════════════════════════════════════════════════════════════════════

/// Which toy the fingertips drive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Fingertip x picks notes.
    #[default]
    Piano,
    /// Fingertips touch squares.
    Dance,
}

impl Mode {
    /// Unknown selector values fall back to piano.
    pub fn from_selector(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "dance" | "dance_off" | "dance-off" => Mode::Dance,
            _ => Mode::Piano,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Mode::Piano => "piano",
            Mode::Dance => "dance",
        }
    }

    pub fn other(self) -> Self {
        match self {
            Mode::Piano => Mode::Dance,
            Mode::Dance => Mode::Piano,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for the full application.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mode:              Mode,
    pub difficulty:        Difficulty,
    /// Notes per finger: 3, 5 or 7.
    pub density:           usize,
    pub style:             InstrumentStyle,
    pub scale:             NoteScale,
    /// Seconds a finger must wait before its next note.
    pub min_note_interval: f64,
    pub note_value:        NoteValue,
    pub tempo_bpm:         u32,
    pub velocity:          u8,
    pub channel:           u8,
    /// Selfie view: flip everything drawn horizontally.
    pub mirror:            bool,
    /// 1 or 2.
    pub max_hands:         usize,
    pub window_width:      usize,
    pub window_height:     usize,
    /// Points kept per fingertip trail.
    pub trail_length:      usize,
    /// Seconds a trail point stays visible.
    pub trail_ttl:         f64,
    /// Shell-style command printing JSON landmark frames on stdout.
    /// `None` → mouse-driven simulated hand.
    pub detector:          Option<String>,
    /// 0.0–1.0
    pub music_volume:      f32,
    /// Replaces the built-in table for the listed difficulties.
    pub difficulty_overrides: HashMap<Difficulty, DifficultySettings>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            mode:              Mode::Piano,
            difficulty:        Difficulty::Medium,
            density:           DEFAULT_DENSITY,
            style:             InstrumentStyle::default(),
            scale:             NoteScale::big_scale(),
            min_note_interval: MIN_NOTE_INTERVAL,
            note_value:        NoteValue::default(),
            tempo_bpm:         120,
            velocity:          100,
            channel:           0,
            mirror:            true,
            max_hands:         1,
            window_width:      640,
            window_height:     480,
            trail_length:      12,
            trail_ttl:         0.5,
            detector:          None,
            music_volume:      0.5,
            difficulty_overrides: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Parse RON text.
    pub fn from_ron_str(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text).map(AppConfig::sanitized)
    }

    /// Load a RON config file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path).map_err(|source| AppError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        AppConfig::from_ron_str(&text).map_err(|source| AppError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// File (if any) then command-line flags.
    pub fn from_args(args: &Args) -> Result<Self, AppError> {
        let mut cfg = match &args.config {
            Some(path) => AppConfig::load(path)?,
            None       => AppConfig::default(),
        };
        cfg.apply_args(args);
        Ok(cfg)
    }

    /// Command-line flags win over file values.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(m) = &args.mode       { self.mode       = Mode::from_selector(m); }
        if let Some(d) = &args.difficulty { self.difficulty = Difficulty::from_selector(d); }
        if let Some(d) = &args.density    { self.density    = density_from_selector(d); }
        if let Some(s) = &args.style      { self.style      = InstrumentStyle::from_selector(s); }
        if let Some(d) = &args.detector   { self.detector   = Some(d.clone()); }
        if let Some(h) = args.hands       { self.max_hands  = h; }
        if args.fast      { self.min_note_interval = FAST_NOTE_INTERVAL; }
        if args.no_mirror { self.mirror = false; }
        *self = std::mem::take(self).sanitized();
    }

    /// Pull out-of-range values back to something playable.  Every change
    /// is logged with the value that replaces it.
    fn sanitized(mut self) -> Self {
        if !DENSITIES.contains(&self.density) {
            warn!("density {} not one of {:?}; using {}", self.density, DENSITIES, DEFAULT_DENSITY);
            self.density = DEFAULT_DENSITY;
        }
        if self.scale.is_empty() {
            warn!("empty scale; using C4..C6");
            self.scale = NoteScale::big_scale();
        }
        if !(self.min_note_interval.is_finite() && self.min_note_interval >= 0.0) {
            warn!("min_note_interval {} invalid; using {}", self.min_note_interval, MIN_NOTE_INTERVAL);
            self.min_note_interval = MIN_NOTE_INTERVAL;
        }
        self.tempo_bpm     = clamped("tempo_bpm", self.tempo_bpm, 20, 300);
        self.velocity      = clamped("velocity", self.velocity, 0, 127);
        self.channel       = clamped("channel", self.channel, 0, 15);
        self.max_hands     = clamped("max_hands", self.max_hands, 1, 2);
        self.window_width  = clamped("window_width", self.window_width, 160, usize::MAX);
        self.window_height = clamped("window_height", self.window_height, 120, usize::MAX);
        self.trail_length  = clamped("trail_length", self.trail_length, 2, usize::MAX);
        if !(self.trail_ttl.is_finite() && self.trail_ttl > 0.0) {
            warn!("trail_ttl {} not positive; using 0.5", self.trail_ttl);
            self.trail_ttl = 0.5;
        }
        if !self.music_volume.is_finite() {
            warn!("music_volume {} invalid; using 0.5", self.music_volume);
            self.music_volume = 0.5;
        }
        self.music_volume = clamped("music_volume", self.music_volume, 0.0, 1.0);
        self.difficulty_overrides = self
            .difficulty_overrides
            .into_iter()
            .map(|(d, settings)| (d, settings.sanitized(d)))
            .collect();
        self
    }

    /// Settings a round at `difficulty` will use.
    pub fn difficulty_settings(&self, difficulty: Difficulty) -> DifficultySettings {
        self.difficulty_overrides
            .get(&difficulty)
            .cloned()
            .unwrap_or_else(|| difficulty.settings())
    }
}

/// `value` limited to `lo..=hi`, with a warning when that changes it.
fn clamped<T>(field: &str, value: T, lo: T, hi: T) -> T
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    let out = if value < lo { lo } else if value > hi { hi } else { value };
    if out != value {
        warn!("{} {} out of range; using {}", field, value, out);
    }
    out
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn defaults_are_playable() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.density, 5);
        assert_eq!(cfg.scale.len(), 15);
        assert_eq!(cfg.min_note_interval, 0.25);
        assert_eq!(cfg.note_value, NoteValue::Eighth);
        assert!(cfg.mirror);
        assert_eq!(cfg.max_hands, 1);
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let cfg = AppConfig::from_ron_str("(mode: dance, difficulty: hard, density: 3)").unwrap();
        assert_eq!(cfg.mode, Mode::Dance);
        assert_eq!(cfg.difficulty, Difficulty::Hard);
        assert_eq!(cfg.density, 3);
        assert_eq!(cfg.tempo_bpm, 120);
    }

    #[test]
    fn ron_scale_and_note_value() {
        let cfg = AppConfig::from_ron_str(
            r#"(scale: (notes: ["A3", "C4", "D4", "E4", "G4", "A4"]), note_value: "16n")"#,
        )
        .unwrap();
        assert_eq!(cfg.scale.len(), 6);
        assert_eq!(cfg.scale.notes()[0].to_string(), "A3");
        assert_eq!(cfg.note_value, NoteValue::Sixteenth);
    }

    #[test]
    fn bad_values_are_sanitized() {
        let cfg = AppConfig::from_ron_str("(density: 4, max_hands: 9, velocity: 200, tempo_bpm: 5)")
            .unwrap();
        assert_eq!(cfg.density, 5);
        assert_eq!(cfg.max_hands, 2);
        assert_eq!(cfg.velocity, 127);
        assert_eq!(cfg.tempo_bpm, 20);
    }

    #[test]
    fn every_clamped_field_is_pulled_into_range() {
        let cfg = AppConfig::from_ron_str(
            "(tempo_bpm: 900, channel: 40, max_hands: 0, window_width: 10, window_height: 5, \
              trail_length: 0, trail_ttl: -1.0, music_volume: 3.5, min_note_interval: -0.2)",
        )
        .unwrap();
        assert_eq!(cfg.tempo_bpm, 300);
        assert_eq!(cfg.channel, 15);
        assert_eq!(cfg.max_hands, 1);
        assert_eq!(cfg.window_width, 160);
        assert_eq!(cfg.window_height, 120);
        assert_eq!(cfg.trail_length, 2);
        assert_eq!(cfg.trail_ttl, 0.5);
        assert_eq!(cfg.music_volume, 1.0);
        assert_eq!(cfg.min_note_interval, MIN_NOTE_INTERVAL);
    }

    #[test]
    fn in_range_values_are_kept() {
        assert_eq!(clamped("velocity", 90u8, 0, 127), 90);
        assert_eq!(clamped("music_volume", 0.0f32, 0.0, 1.0), 0.0);
        assert_eq!(clamped("tempo_bpm", 5u32, 20, 300), 20);
        let cfg = AppConfig::default();
        assert_eq!(cfg.clone().sanitized(), cfg);
    }

    #[test]
    fn bad_difficulty_overrides_are_replaced() {
        let cfg = AppConfig::from_ron_str(
            r#"(
                difficulty_overrides: {
                    hard: (
                        spawn_every: 0.000001,
                        size: (min: 40, max: 10),
                        lifetime: -4.0,
                        music: "fast.wav",
                        moving: true,
                        max_speed: -1.0,
                    ),
                },
            )"#,
        )
        .unwrap();
        let hard = cfg.difficulty_settings(Difficulty::Hard);
        assert_eq!(hard.spawn_every, 1.0);
        assert_eq!(hard.lifetime, 2.0);
        assert_eq!(hard.max_speed, 2.0);
        assert_eq!((hard.size.min, hard.size.max), (10, 40));
        assert_eq!(hard.music, "fast.wav");
    }

    #[test]
    fn malformed_ron_is_an_error() {
        assert!(AppConfig::from_ron_str("(mode: banjo)").is_err());
        assert!(AppConfig::from_ron_str("(density: ").is_err());
    }

    #[test]
    fn difficulty_override_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            r#"(
                difficulty_overrides: {{
                    easy: (
                        spawn_every: 3.0,
                        size: (min: 90, max: 100),
                        lifetime: 6.0,
                        music: "music/dance_off/Calm.wav",
                    ),
                }},
            )"#
        )
        .unwrap();

        let cfg = AppConfig::load(f.path()).unwrap();
        let easy = cfg.difficulty_settings(Difficulty::Easy);
        assert_eq!(easy.lifetime, 6.0);
        assert_eq!(easy.size.min, 90);
        assert!(!easy.moving);
        assert_eq!(easy.max_speed, 2.0);
        // untouched levels use the built-in table
        assert_eq!(cfg.difficulty_settings(Difficulty::Hard), Difficulty::Hard.settings());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(&dir.path().join("nope.ron")).unwrap_err();
        assert!(matches!(err, AppError::ConfigIo { .. }));
    }

    #[test]
    fn flags_override_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "(mode: piano, density: 7, mirror: true)").unwrap();
        let path = f.path().to_string_lossy().to_string();

        let args = Args::parse_from([
            "hand_tiles", "--config", &path, "--mode", "dance", "--fast", "--no-mirror",
            "--style", "strings",
        ]);
        let cfg = AppConfig::from_args(&args).unwrap();
        assert_eq!(cfg.mode, Mode::Dance);
        assert_eq!(cfg.density, 7);
        assert_eq!(cfg.min_note_interval, 0.15);
        assert!(!cfg.mirror);
        assert_eq!(cfg.style, InstrumentStyle::Strings);
    }

    #[test]
    fn unknown_selectors_fall_back() {
        let args = Args::parse_from([
            "hand_tiles", "--mode", "karaoke", "--difficulty", "insane", "--density", "11",
            "--style", "kazoo",
        ]);
        let cfg = AppConfig::from_args(&args).unwrap();
        assert_eq!(cfg.mode, Mode::Piano);
        assert_eq!(cfg.difficulty, Difficulty::Medium);
        assert_eq!(cfg.density, 5);
        assert_eq!(cfg.style, InstrumentStyle::Triangle);
    }
}
