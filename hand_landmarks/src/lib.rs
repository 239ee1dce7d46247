//! # hand_landmarks
//!
//! Per-frame hand-landmark data as produced by a hand-landmark detector:
//! every detected hand is an ordered sequence of 21 keypoints with
//! normalized `(x, y)` coordinates in `[0, 1]`.
//!
//! The detector itself is an external collaborator.  This crate only knows
//! the shape of its output and the JSON-lines wire format it speaks:
//!
//! ```text
//! {"timestamp": 1.25, "hands": [{"handedness": "Right", "landmarks": [{"x": 0.4, "y": 0.6}, ...]}]}
//! ```
//!
//! ## Quick start
//!
//! ```rust
//! use hand_landmarks::{Finger, Frame};
//!
//! let line = r#"{"timestamp": 0.5, "hands": []}"#;
//! let frame = Frame::from_json_line(line).unwrap();
//! assert!(frame.hands.is_empty());
//! assert_eq!(Finger::Index.landmark_index(), 8);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of keypoints the detector reports for every hand.
pub const LANDMARKS_PER_HAND: usize = 21;

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum LandmarkError {
    /// The line was not a valid frame document.
    #[error("malformed landmark frame: {0}")]
    Json(#[from] serde_json::Error),

    /// A coordinate was NaN or infinite.
    #[error("non-finite coordinate in hand {hand}, landmark {index}")]
    NonFinite { hand: usize, index: usize },
}

// ════════════════════════════════════════════════════════════════════════════
// Landmark
// ════════════════════════════════════════════════════════════════════════════

/// One normalized keypoint.  `(0, 0)` is the top-left of the video frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Landmark { x, y }
    }

    /// Copy with both coordinates clamped into `[0, 1]`.
    pub fn clamped(self) -> Self {
        Landmark { x: self.x.clamp(0.0, 1.0), y: self.y.clamp(0.0, 1.0) }
    }

    /// Scale to pixel coordinates on a `width × height` canvas.
    pub fn to_pixels(self, width: f32, height: f32) -> (f32, f32) {
        (self.x * width, self.y * height)
    }

    /// Horizontally mirrored copy (selfie view).
    pub fn mirrored(self) -> Self {
        Landmark { x: 1.0 - self.x, y: self.y }
    }

    pub fn distance(self, other: Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Finger
// ════════════════════════════════════════════════════════════════════════════

/// The five tracked fingertips, in slot order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    /// Landmark index of this fingertip in the detector's 21-point layout.
    pub fn landmark_index(self) -> usize {
        match self {
            Finger::Thumb  => 4,
            Finger::Index  => 8,
            Finger::Middle => 12,
            Finger::Ring   => 16,
            Finger::Pinky  => 20,
        }
    }

    /// Position in [`Finger::ALL`]; used to pick a finger's slice of a scale
    /// and to index per-finger state arrays.
    pub fn slot(self) -> usize {
        self as usize
    }

    pub fn from_slot(slot: usize) -> Option<Finger> {
        Finger::ALL.get(slot).copied()
    }

    pub fn from_landmark_index(index: usize) -> Option<Finger> {
        Finger::ALL.iter().copied().find(|f| f.landmark_index() == index)
    }

    pub fn name(self) -> &'static str {
        match self {
            Finger::Thumb  => "thumb",
            Finger::Index  => "index",
            Finger::Middle => "middle",
            Finger::Ring   => "ring",
            Finger::Pinky  => "pinky",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Hand
// ════════════════════════════════════════════════════════════════════════════

/// One detected hand.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Hand {
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
    /// "Left" / "Right" as reported by the detector, if it reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handedness: Option<String>,
}

impl Hand {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Hand { landmarks, handedness: None }
    }

    /// The fingertip keypoint, or `None` when the detector reported fewer
    /// points than the tip's index.
    pub fn tip(&self, finger: Finger) -> Option<Landmark> {
        self.landmarks.get(finger.landmark_index()).copied()
    }

    pub fn is_complete(&self) -> bool {
        self.landmarks.len() >= LANDMARKS_PER_HAND
    }

    /// Build a plausible open hand whose index fingertip sits at `(cx, cy)`.
    ///
    /// The five tips fan out `spread` apart horizontally (thumb leftmost)
    /// with the outer fingers slightly lower, and the remaining joints sit
    /// on straight lines back toward a wrist below the palm.  Used by the
    /// mouse-driven simulator and by tests.
    pub fn synthetic(cx: f32, cy: f32, spread: f32) -> Self {
        let wrist = Landmark::new(cx + spread, cy + spread * 4.0).clamped();
        let mut landmarks = vec![wrist; LANDMARKS_PER_HAND];

        // tip offsets relative to the index fingertip
        let offsets: [(f32, f32); 5] = [
            (-1.0, 1.5),
            (0.0, 0.0),
            (1.0, -0.2),
            (2.0, 0.1),
            (3.0, 0.8),
        ];

        for (finger, (ox, oy)) in Finger::ALL.iter().zip(offsets.iter()) {
            let tip = Landmark::new(cx + ox * spread, cy + oy * spread);
            let tip_idx = finger.landmark_index();
            // joints tip-3 .. tip, interpolated from wrist to tip
            for j in 0..3 {
                let t = (j + 1) as f32 / 4.0;
                landmarks[tip_idx - 3 + j] = Landmark::new(
                    wrist.x + (tip.x - wrist.x) * t,
                    wrist.y + (tip.y - wrist.y) * t,
                )
                .clamped();
            }
            landmarks[tip_idx] = tip.clamped();
        }

        Hand::new(landmarks)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Frame
// ════════════════════════════════════════════════════════════════════════════

/// A fingertip located in a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fingertip {
    /// Index of the hand in [`Frame::hands`].
    pub hand:   usize,
    pub finger: Finger,
    pub point:  Landmark,
}

/// Everything the detector saw at one instant.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Seconds on the detector's clock.
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub hands: Vec<Hand>,
}

impl Frame {
    pub fn new(timestamp: f64, hands: Vec<Hand>) -> Self {
        Frame { timestamp, hands }
    }

    pub fn empty(timestamp: f64) -> Self {
        Frame { timestamp, hands: Vec::new() }
    }

    /// Iterate the requested fingertips of every hand, skipping tips the
    /// detector did not report.
    pub fn fingertips<'a>(&'a self, fingers: &'a [Finger]) -> impl Iterator<Item = Fingertip> + 'a {
        self.hands.iter().enumerate().flat_map(move |(hand, h)| {
            fingers.iter().filter_map(move |&finger| {
                h.tip(finger).map(|point| Fingertip { hand, finger, point })
            })
        })
    }

    /// Drop hands beyond `max` (single/double hand mode).
    pub fn limit_hands(&mut self, max: usize) {
        self.hands.truncate(max);
    }

    /// Parse one JSON line from a detector process.
    ///
    /// Coordinates are clamped into `[0, 1]`; non-finite coordinates are
    /// rejected.
    pub fn from_json_line(line: &str) -> Result<Frame, LandmarkError> {
        let mut frame: Frame = serde_json::from_str(line.trim())?;
        for (h, hand) in frame.hands.iter_mut().enumerate() {
            for (i, lm) in hand.landmarks.iter_mut().enumerate() {
                if !lm.is_finite() {
                    return Err(LandmarkError::NonFinite { hand: h, index: i });
                }
                *lm = lm.clamped();
            }
        }
        Ok(frame)
    }

    pub fn to_json_line(&self) -> Result<String, LandmarkError> {
        Ok(serde_json::to_string(self)?)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
