// This module provides the following structs:
// Key: a pitch class (one of the 12 semitones in Western tuning)
// Note: a note, with same values as MIDI (0 is C(-1), 60 is C4, etc.)

// The scheduler does its arithmetic on plain i32 semitones and only turns
// the result into a Note at the very end, clamping into the MIDI range.

use std::fmt::{self, Debug, Display};

const KEY_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

// Represents any of the 12 distinct keys in Western tuning
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Key(i8);

impl Key {
    pub fn new(key: i32) -> Self {
        // rem_euclid keeps the value in 0..12, so the cast is lossless.
        Self(key.rem_euclid(12) as i8)
    }

    pub fn name(&self) -> &'static str {
        KEY_NAMES[self.0 as usize]
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

// A wrapper around a note, with the height being the same as in MIDI
// (0 is C-1, 60 is C4 etc.)
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct Note(pub u8);

impl Note {
    pub const MAX: u8 = 127;

    /// Build a note from an arbitrary semitone value, clamping into 0..=127.
    pub fn clamped(semitones: i32) -> Self {
        Self(semitones.clamp(0, i32::from(Self::MAX)) as u8)
    }

    // Decompose a Note into its Key and octave
    pub fn decompose(&self) -> (Key, i8) {
        let key = self.0 % 12;
        let octave = (self.0 / 12) as i8 - 1;
        (Key::new(i32::from(key)), octave)
    }
}

impl Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (key, octave) = self.decompose();
        write!(f, "{}{}", key, octave)
    }
}

impl Debug for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self, self.0)
    }
}
