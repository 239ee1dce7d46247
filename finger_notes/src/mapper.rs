//! Fingertip position → note, with per-finger debouncing.
//!
//! The frame loop re-evaluates every fingertip on every frame, so a finger
//! held still (or drifting inside one note's band) would otherwise retrigger
//! the instrument sixty times a second.  A finger fires only when its note
//! index differs from the one it last fired AND more than `min_interval`
//! seconds have passed since that fire.

use hand_landmarks::Finger;

use crate::{NoteName, NoteScale, NoteValue};

/// Default gap between two notes from the same finger.
pub const MIN_NOTE_INTERVAL: f64 = 0.25;
/// Gap used by the quicker, more responsive variant.
pub const FAST_NOTE_INTERVAL: f64 = 0.15;

// ════════════════════════════════════════════════════════════════════════════
// TriggerState
// ════════════════════════════════════════════════════════════════════════════

/// Last-fire bookkeeping for one finger.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerState {
    /// Index into the finger's sub-range of the last note fired.
    pub last_index: Option<usize>,
    /// Timestamp (seconds) of the last fire.
    pub last_time:  f64,
}

impl Default for TriggerState {
    fn default() -> Self {
        TriggerState { last_index: None, last_time: f64::NEG_INFINITY }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// NoteTrigger — what the mapper asks the instrument to play
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteTrigger {
    pub finger: Finger,
    /// Index within the finger's sub-range.
    pub index:  usize,
    pub note:   NoteName,
    pub value:  NoteValue,
    /// Start time in seconds: the `now` the trigger was decided at.
    pub time:   f64,
}

// ════════════════════════════════════════════════════════════════════════════
// NoteMapper
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct NoteMapper {
    scale:        NoteScale,
    density:      usize,
    min_interval: f64,
    value:        NoteValue,
    states:       [TriggerState; 5],
}

impl NoteMapper {
    pub fn new(scale: NoteScale, density: usize, min_interval: f64) -> Self {
        NoteMapper {
            scale,
            density: density.max(1),
            min_interval,
            value: NoteValue::default(),
            states: [TriggerState::default(); 5],
        }
    }

    /// Builder-style note length.
    pub fn with_value(mut self, value: NoteValue) -> Self {
        self.value = value;
        self
    }

    pub fn scale(&self) -> &NoteScale { &self.scale }
    pub fn density(&self) -> usize { self.density }
    pub fn min_interval(&self) -> f64 { self.min_interval }
    pub fn value(&self) -> NoteValue { self.value }
    pub fn state(&self, finger: Finger) -> TriggerState { self.states[finger.slot()] }

    /// Change notes-per-finger.  Old note indices no longer mean the same
    /// notes, so last-index bookkeeping is cleared; last-fire times are kept
    /// so the interval still holds across the change.
    pub fn set_density(&mut self, density: usize) {
        self.density = density.max(1);
        for s in &mut self.states {
            s.last_index = None;
        }
    }

    pub fn set_min_interval(&mut self, secs: f64) {
        self.min_interval = secs;
    }

    /// Fingers that own a slice of the scale at the current density.
    pub fn playable_fingers(&self) -> Vec<Finger> {
        let n = self.scale.slots_for(self.density);
        Finger::ALL.iter().copied().take(n).collect()
    }

    /// The finger's slice of the scale.
    pub fn sub_range(&self, finger: Finger) -> &[NoteName] {
        self.scale.sub_range(finger.slot(), self.density)
    }

    /// `floor(x * len)` clamped into the finger's sub-range.  `None` only
    /// for an empty scale.
    pub fn note_index(&self, finger: Finger, x: f32) -> Option<usize> {
        let len = self.sub_range(finger).len();
        if len == 0 {
            return None;
        }
        let raw = (x * len as f32).floor();
        // NaN → 0 via the float-to-int cast
        let idx = if raw < 0.0 { 0 } else { raw as usize };
        Some(idx.min(len - 1))
    }

    pub fn note_for(&self, finger: Finger, x: f32) -> Option<NoteName> {
        let idx = self.note_index(finger, x)?;
        self.sub_range(finger).get(idx).copied()
    }

    /// Evaluate one fingertip sample.  Returns the note to play when the
    /// debounce gate opens, updating the finger's bookkeeping.
    pub fn handle(&mut self, finger: Finger, x: f32, now: f64) -> Option<NoteTrigger> {
        let index = self.note_index(finger, x)?;
        let state = &mut self.states[finger.slot()];

        if state.last_index == Some(index) || now - state.last_time <= self.min_interval {
            return None;
        }

        let note = self.scale.sub_range(finger.slot(), self.density)[index];
        state.last_index = Some(index);
        state.last_time  = now;

        Some(NoteTrigger { finger, index, note, value: self.value, time: now })
    }

    /// Forget all per-finger history.
    pub fn reset(&mut self) {
        self.states = [TriggerState::default(); 5];
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mapper() -> NoteMapper {
        NoteMapper::new(NoteScale::big_scale(), 5, MIN_NOTE_INTERVAL)
    }

    #[test]
    fn index_finger_extremes() {
        let m = mapper();
        assert_eq!(m.note_for(Finger::Index, 0.0).unwrap().to_string(), "A4");
        assert_eq!(m.note_for(Finger::Index, 0.99).unwrap().to_string(), "E5");
        // x == 1.0 would floor to len; clamped to the last note
        assert_eq!(m.note_for(Finger::Index, 1.0).unwrap().to_string(), "E5");
    }

    #[test]
    fn out_of_range_x_is_clamped() {
        let m = mapper();
        assert_eq!(m.note_index(Finger::Thumb, -3.0), Some(0));
        assert_eq!(m.note_index(Finger::Thumb, 7.5), Some(4));
        assert_eq!(m.note_index(Finger::Thumb, f32::NAN), Some(0));
    }

    #[test]
    fn first_sample_fires() {
        let mut m = mapper();
        let t = m.handle(Finger::Middle, 0.5, 0.0).unwrap();
        assert_eq!(t.note.to_string(), "A5");
        assert_eq!(t.value, NoteValue::Eighth);
        assert_eq!(m.state(Finger::Middle).last_index, Some(2));
    }

    #[test]
    fn same_note_never_refires() {
        let mut m = mapper();
        assert!(m.handle(Finger::Thumb, 0.1, 0.0).is_some());
        for i in 1..50 {
            assert!(m.handle(Finger::Thumb, 0.1, i as f64).is_none());
        }
    }

    #[test]
    fn new_note_waits_for_interval() {
        let mut m = mapper();
        assert!(m.handle(Finger::Thumb, 0.1, 1.0).is_some());
        // changed note, too soon
        assert!(m.handle(Finger::Thumb, 0.9, 1.2).is_none());
        // exactly at the interval is still too soon
        assert!(m.handle(Finger::Thumb, 0.9, 1.25).is_none());
        assert!(m.handle(Finger::Thumb, 0.9, 1.3).is_some());
    }

    #[test]
    fn fixed_sample_sequence_trigger_count() {
        let mut m = mapper();
        // (x, t) for the index finger
        let samples = [
            (0.05, 0.00), // A4 fires
            (0.05, 0.10), // same note
            (0.30, 0.20), // new note, too soon
            (0.30, 0.30), // B4 fires (0.30 s since A4)
            (0.50, 0.40), // too soon
            (0.70, 0.56), // D5 fires
            (0.70, 1.00), // same note
            (0.10, 1.00), // A4 fires
            (0.90, 1.10), // too soon
        ];
        let fired: Vec<String> = samples
            .iter()
            .filter_map(|&(x, t)| m.handle(Finger::Index, x, t))
            .map(|t| t.note.to_string())
            .collect();
        assert_eq!(fired, vec!["A4", "B4", "D5", "A4"]);
    }

    #[test]
    fn fingers_are_independent() {
        let mut m = mapper();
        assert!(m.handle(Finger::Thumb, 0.1, 0.0).is_some());
        assert!(m.handle(Finger::Index, 0.1, 0.01).is_some());
        assert!(m.handle(Finger::Middle, 0.1, 0.02).is_some());
    }

    #[test]
    fn density_change_clears_last_index() {
        let mut m = mapper();
        m.handle(Finger::Thumb, 0.0, 0.0);
        m.set_density(3);
        assert_eq!(m.state(Finger::Thumb).last_index, None);
        assert_eq!(m.state(Finger::Thumb).last_time, 0.0);
        assert_eq!(m.playable_fingers().len(), 5);
    }

    #[test]
    fn fast_variant_interval() {
        let mut m = NoteMapper::new(NoteScale::big_scale(), 5, FAST_NOTE_INTERVAL);
        assert!(m.handle(Finger::Index, 0.0, 0.0).is_some());
        assert!(m.handle(Finger::Index, 0.9, 0.16).is_some());
    }

    #[test]
    fn empty_scale_is_silent() {
        let mut m = NoteMapper::new(NoteScale::new(vec![]), 5, MIN_NOTE_INTERVAL);
        assert_eq!(m.note_index(Finger::Index, 0.5), None);
        assert!(m.handle(Finger::Index, 0.5, 1.0).is_none());
    }

    proptest! {
        #[test]
        fn index_stays_in_sub_range(x in 0.0f32..=1.0, density in 1usize..9, slot in 0usize..5) {
            let m = NoteMapper::new(NoteScale::big_scale(), density, MIN_NOTE_INTERVAL);
            let finger = Finger::from_slot(slot).unwrap();
            let len = m.sub_range(finger).len();
            prop_assert!(len >= 1);
            let idx = m.note_index(finger, x).unwrap();
            prop_assert!(idx < len);
            prop_assert!(m.note_for(finger, x).is_some());
        }
    }
}
