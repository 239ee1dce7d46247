//! # finger_notes
//!
//! Musical vocabulary for a hand-driven instrument:
//!
//! * [`NoteName`] — scientific pitch names (`"C4"`, `"F#3"`, `"Bb5"`) and
//!   their MIDI numbers.
//! * [`NoteScale`] — an ordered run of note names that the fingers share.
//!   Each finger plays its own contiguous slice of the run.
//! * [`NoteValue`] — note lengths in the `"8n"` notation the instrument
//!   backend understands.
//! * [`NoteMapper`] — fingertip x-position → note, debounced per finger.
//! * [`VelocityMeter`] — smoothed fingertip speed driving a bar visualizer.
//!
//! ## Quick start
//!
//! ```rust
//! use finger_notes::{NoteMapper, NoteScale};
//! use hand_landmarks::Finger;
//!
//! let mut mapper = NoteMapper::new(NoteScale::big_scale(), 5, 0.25);
//! let hit = mapper.handle(Finger::Index, 0.0, 1.0).unwrap();
//! assert_eq!(hit.note.to_string(), "A4");
//! // Same note again → debounced.
//! assert!(mapper.handle(Finger::Index, 0.05, 2.0).is_none());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod mapper;
pub mod meter;

pub use mapper::{NoteMapper, NoteTrigger, TriggerState, FAST_NOTE_INTERVAL, MIN_NOTE_INTERVAL};
pub use meter::VelocityMeter;

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NoteError {
    #[error("empty note name")]
    Empty,
    #[error("unknown note letter '{0}'")]
    Letter(char),
    #[error("bad octave in note name \"{0}\"")]
    Octave(String),
    #[error("note \"{0}\" is outside the MIDI range")]
    OutOfRange(String),
    #[error("unknown note value \"{0}\" (expected 1n, 2n, 4n, 8n, 16n or 32n)")]
    Value(String),
}

// ════════════════════════════════════════════════════════════════════════════
// NoteName
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accidental {
    Natural,
    Sharp,
    Flat,
}

/// A note in scientific pitch notation.  Middle C is `C4` (MIDI 60).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NoteName {
    letter:     char,
    accidental: Accidental,
    octave:     i8,
}

const SHARP_NAMES: [(char, Accidental); 12] = [
    ('C', Accidental::Natural), ('C', Accidental::Sharp),
    ('D', Accidental::Natural), ('D', Accidental::Sharp),
    ('E', Accidental::Natural),
    ('F', Accidental::Natural), ('F', Accidental::Sharp),
    ('G', Accidental::Natural), ('G', Accidental::Sharp),
    ('A', Accidental::Natural), ('A', Accidental::Sharp),
    ('B', Accidental::Natural),
];

impl NoteName {
    /// Spell a MIDI note number with sharps (`61` → `C#4`).
    pub fn from_midi(midi: u8) -> Self {
        let (letter, accidental) = SHARP_NAMES[(midi % 12) as usize];
        NoteName { letter, accidental, octave: (midi / 12) as i8 - 1 }
    }

    /// MIDI note number, `C4` = 60.
    pub fn midi(&self) -> u8 {
        self.pitch().clamp(0, 127) as u8
    }

    /// Unbounded semitone number on the MIDI scale.
    fn pitch(&self) -> i32 {
        let natural = match self.letter {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            _   => 11,
        };
        let shift = match self.accidental {
            Accidental::Natural => 0,
            Accidental::Sharp   => 1,
            Accidental::Flat    => -1,
        };
        (self.octave as i32 + 1) * 12 + natural + shift
    }

    pub fn octave(&self) -> i8 { self.octave }
    pub fn letter(&self) -> char { self.letter }

    /// Equal-tempered frequency in Hz (A4 = 440).
    pub fn frequency(&self) -> f32 {
        440.0 * 2f32.powf((self.midi() as f32 - 69.0) / 12.0)
    }
}

impl FromStr for NoteName {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let letter = chars.next().ok_or(NoteError::Empty)?.to_ascii_uppercase();
        if !('A'..='G').contains(&letter) {
            return Err(NoteError::Letter(letter));
        }
        let rest = chars.as_str();
        let (accidental, octave_str) = match rest.chars().next() {
            Some('#') => (Accidental::Sharp, &rest[1..]),
            Some('b') => (Accidental::Flat, &rest[1..]),
            _         => (Accidental::Natural, rest),
        };
        let octave: i8 = octave_str
            .parse()
            .map_err(|_| NoteError::Octave(s.to_string()))?;
        let note = NoteName { letter, accidental, octave };

        if !(0..=127).contains(&note.pitch()) {
            return Err(NoteError::OutOfRange(s.to_string()));
        }
        Ok(note)
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let acc = match self.accidental {
            Accidental::Natural => "",
            Accidental::Sharp   => "#",
            Accidental::Flat    => "b",
        };
        write!(f, "{}{}{}", self.letter, acc, self.octave)
    }
}

impl Serialize for NoteName {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NoteName {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ScaleKind — interval sets for building note runs
// ════════════════════════════════════════════════════════════════════════════

/// Interval pattern used by [`NoteScale::run`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleKind {
    Major,
    Minor,
    PentatonicMajor,
    PentatonicMinor,
    Dorian,
    Chromatic,
}

impl ScaleKind {
    /// Semitone offsets from the root within one octave.
    pub fn intervals(self) -> &'static [u8] {
        match self {
            ScaleKind::Major           => &[0, 2, 4, 5, 7, 9, 11],
            ScaleKind::Minor           => &[0, 2, 3, 5, 7, 8, 10],
            ScaleKind::PentatonicMajor => &[0, 2, 4, 7, 9],
            ScaleKind::PentatonicMinor => &[0, 3, 5, 7, 10],
            ScaleKind::Dorian          => &[0, 2, 3, 5, 7, 9, 10],
            ScaleKind::Chromatic       => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// NoteScale
// ════════════════════════════════════════════════════════════════════════════

/// Ordered note names shared out among the fingers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteScale {
    notes: Vec<NoteName>,
}

impl NoteScale {
    pub fn new(notes: Vec<NoteName>) -> Self {
        NoteScale { notes }
    }

    /// Parse a list like `["C4", "D4", ...]`.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, NoteError> {
        let notes = names
            .iter()
            .map(|n| n.as_ref().parse())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(NoteScale { notes })
    }

    /// The fifteen white keys from `C4` to `C6`: three fingers × five notes.
    pub fn big_scale() -> Self {
        NoteScale::run(NoteName::from_midi(60), ScaleKind::Major, 15)
    }

    /// `count` consecutive scale degrees of `kind` starting at `root`,
    /// wrapping across octaves and stopping at MIDI 127.
    pub fn run(root: NoteName, kind: ScaleKind, count: usize) -> Self {
        let intervals = kind.intervals();
        let root = root.midi() as usize;
        let notes = (0..count)
            .map(|i| root + (i / intervals.len()) * 12 + intervals[i % intervals.len()] as usize)
            .take_while(|&m| m <= 127)
            .map(|m| NoteName::from_midi(m as u8))
            .collect();
        NoteScale { notes }
    }

    pub fn len(&self) -> usize { self.notes.len() }
    pub fn is_empty(&self) -> bool { self.notes.is_empty() }
    pub fn notes(&self) -> &[NoteName] { &self.notes }

    /// The slice of the scale played by finger `slot` when every finger
    /// gets `density` notes: `scale[slot*density .. slot*density + density]`
    /// clamped to the scale.
    ///
    /// A slot that starts past the end of the scale falls back to the last
    /// note, so a non-empty scale never yields an empty slice.
    pub fn sub_range(&self, slot: usize, density: usize) -> &[NoteName] {
        if self.notes.is_empty() {
            return &[];
        }
        let density = density.max(1);
        let last  = self.notes.len() - 1;
        let start = slot.saturating_mul(density).min(last);
        let end   = start.saturating_add(density).min(self.notes.len());
        &self.notes[start..end]
    }

    /// Number of leading finger slots that get a slice of their own.
    pub fn slots_for(&self, density: usize) -> usize {
        let density = density.max(1);
        (self.notes.len() + density - 1) / density
    }
}

// ════════════════════════════════════════════════════════════════════════════
// NoteValue — "8n" style durations
// ════════════════════════════════════════════════════════════════════════════

/// Serialized as its `"8n"` string in every format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteValue {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
}

impl NoteValue {
    fn divisor(self) -> u64 {
        match self {
            NoteValue::Whole        => 1,
            NoteValue::Half         => 2,
            NoteValue::Quarter      => 4,
            NoteValue::Eighth       => 8,
            NoteValue::Sixteenth    => 16,
            NoteValue::ThirtySecond => 32,
        }
    }

    /// Length in milliseconds at `bpm` quarter notes per minute.
    pub fn millis(self, bpm: u32) -> u64 {
        let ms_per_beat = 60_000 / bpm.max(1) as u64;
        ms_per_beat * 4 / self.divisor()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NoteValue::Whole        => "1n",
            NoteValue::Half         => "2n",
            NoteValue::Quarter      => "4n",
            NoteValue::Eighth       => "8n",
            NoteValue::Sixteenth    => "16n",
            NoteValue::ThirtySecond => "32n",
        }
    }
}

impl Default for NoteValue {
    fn default() -> Self { NoteValue::Eighth }
}

impl FromStr for NoteValue {
    type Err = NoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1n"  => Ok(NoteValue::Whole),
            "2n"  => Ok(NoteValue::Half),
            "4n"  => Ok(NoteValue::Quarter),
            "8n"  => Ok(NoteValue::Eighth),
            "16n" => Ok(NoteValue::Sixteenth),
            "32n" => Ok(NoteValue::ThirtySecond),
            other => Err(NoteError::Value(other.to_string())),
        }
    }
}

impl fmt::Display for NoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NoteValue {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NoteValue {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Selector values
// ════════════════════════════════════════════════════════════════════════════

/// Instrument-style selector.  Each style maps to a General MIDI program.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentStyle {
    /// Soft, near-sine voice.
    #[default]
    Triangle,
    Piano,
    Vibes,
    Strings,
    Lead,
}

impl InstrumentStyle {
    pub const ALL: [InstrumentStyle; 5] = [
        InstrumentStyle::Triangle,
        InstrumentStyle::Piano,
        InstrumentStyle::Vibes,
        InstrumentStyle::Strings,
        InstrumentStyle::Lead,
    ];

    /// Unknown selector values fall back to the default style.
    pub fn from_selector(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "piano"   => InstrumentStyle::Piano,
            "vibes" | "vibraphone" => InstrumentStyle::Vibes,
            "strings" => InstrumentStyle::Strings,
            "lead"    => InstrumentStyle::Lead,
            _         => InstrumentStyle::Triangle,
        }
    }

    /// General MIDI program number (0-indexed).
    pub fn program(self) -> u8 {
        match self {
            InstrumentStyle::Triangle => 79, // Ocarina
            InstrumentStyle::Piano    => 0,
            InstrumentStyle::Vibes    => 11,
            InstrumentStyle::Strings  => 48,
            InstrumentStyle::Lead     => 80,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            InstrumentStyle::Triangle => "triangle",
            InstrumentStyle::Piano    => "piano",
            InstrumentStyle::Vibes    => "vibes",
            InstrumentStyle::Strings  => "strings",
            InstrumentStyle::Lead     => "lead",
        }
    }

    /// Next style in selector order, wrapping.
    pub fn next(self) -> Self {
        let i = InstrumentStyle::ALL.iter().position(|&s| s == self).unwrap_or(0);
        InstrumentStyle::ALL[(i + 1) % InstrumentStyle::ALL.len()]
    }
}

/// Notes assigned to each finger.
pub const DENSITIES: [usize; 3] = [3, 5, 7];
pub const DEFAULT_DENSITY: usize = 5;

/// Note-density selector; unknown values fall back to five notes per finger.
pub fn density_from_selector(value: &str) -> usize {
    value
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|d| DENSITIES.contains(d))
        .unwrap_or(DEFAULT_DENSITY)
}

/// Next density in selector order, wrapping.
pub fn next_density(density: usize) -> usize {
    let i = DENSITIES.iter().position(|&d| d == density).unwrap_or(0);
    DENSITIES[(i + 1) % DENSITIES.len()]
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
