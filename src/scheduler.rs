// Measure-by-measure composition of four voices.
//
// Each pass of the loop writes one 4-beat measure for every voice, all of
// them starting at the same measure time, then moves the harmonic root with
// a random walk. Randomness is only consumed through the decision helpers at
// the bottom of this file, in a fixed order per measure: lead steps, lead
// pitches and rests, then the walk.

use log::{debug, info};

use crate::catalog::GenreProfile;
use crate::pitch::Note;
use crate::random::{chance, pick, RandomSource};

pub const BEATS_PER_MEASURE: u32 = 4;

/// Range the initial root is drawn from.
pub const ROOT_START: (i32, i32) = (55, 60);
/// Band the root is clamped into after every walk step.
pub const ROOT_BAND: (i32, i32) = (45, 65);

// General MIDI percussion keys.
pub const KICK: u8 = 36;
pub const SNARE: u8 = 38;
pub const CLOSED_HAT: u8 = 42;

const HATS_PER_MEASURE: u32 = 8;

const LEAD_MAX_NOTES: usize = 8;
/// Lead note lengths, in beats.
const LEAD_STEPS: [f64; 3] = [0.5, 1.0, 1.5];
const LEAD_COLOR_TONES: [i32; 4] = [2, 5, 9, 14];
const LEAD_JITTER: i32 = 3;
const LEAD_PLAY_CHANCE: f64 = 0.75;

const WALK_LEAP_CHANCE: f64 = 0.6;
const WALK_LEAPS: [i32; 5] = [0, 5, -5, 7, -7];
const WALK_STEPS: [i32; 3] = [-2, 2, 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Voice {
    Lead,
    Harmony,
    Bass,
    Percussion,
}

impl Voice {
    pub const ALL: [Voice; 4] = [Voice::Lead, Voice::Harmony, Voice::Bass, Voice::Percussion];

    pub fn index(&self) -> usize {
        match self {
            Voice::Lead => 0,
            Voice::Harmony => 1,
            Voice::Bass => 2,
            Voice::Percussion => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Voice::Lead => "Lead",
            Voice::Harmony => "Harmony",
            Voice::Bass => "Bass",
            Voice::Percussion => "Percussion",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    pub voice: Voice,
    pub pitch: Note,
    pub start_seconds: f64,
    pub duration_seconds: f64,
    pub velocity: u8,
}

impl NoteEvent {
    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.duration_seconds
    }
}

/// Tonal center and position of the measure being written. Lives for a
/// single `compose` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarmonicState {
    pub root: i32,
    pub measure_start: f64,
}

/// Compose `duration_seconds` worth of music for the given profile.
///
/// The loop only stops on measure boundaries, so the last measure may run
/// past the requested duration by less than one measure. A non-positive
/// duration yields no events.
pub fn compose(
    profile: &GenreProfile,
    duration_seconds: i64,
    rng: &mut dyn RandomSource,
) -> Vec<NoteEvent> {
    if duration_seconds <= 0 {
        return Vec::new();
    }

    let target = duration_seconds as f64;
    let beat = profile.beat_seconds();
    let measure = profile.measure_seconds();
    let palette = lead_palette(&profile.chord_intervals);

    let mut state = HarmonicState {
        root: rng.between(ROOT_START.0, ROOT_START.1),
        measure_start: 0.0,
    };
    let mut events = Vec::new();
    let mut measures: u32 = 0;

    while state.measure_start < target {
        debug!(
            "Measure {} at {:.2}s, root {}",
            measures + 1,
            state.measure_start,
            Note::clamped(state.root)
        );

        percussion_measure(&state, beat, &mut events);
        bass_measure(&state, beat, &mut events);
        harmony_measure(&state, measure, &profile.chord_intervals, &mut events);
        lead_measure(&state, beat, &palette, rng, &mut events);

        state.root = walk_root(state.root, rng);
        measures += 1;
        state.measure_start = measure * f64::from(measures);
    }

    info!(
        "Composed {} measures ({:.1}s) with {} note events at {} BPM",
        measures,
        state.measure_start,
        events.len(),
        profile.tempo_bpm
    );
    events
}

fn push(
    events: &mut Vec<NoteEvent>,
    voice: Voice,
    pitch: Note,
    start_seconds: f64,
    duration_seconds: f64,
) {
    events.push(NoteEvent {
        voice,
        pitch,
        start_seconds,
        duration_seconds,
        velocity: velocity(voice, pitch),
    });
}

/// Melodic voices play at a fixed level per voice; drums by instrument.
pub fn velocity(voice: Voice, pitch: Note) -> u8 {
    match voice {
        Voice::Lead => 100,
        Voice::Harmony => 70,
        Voice::Bass => 95,
        Voice::Percussion => match pitch.0 {
            KICK => 110,
            SNARE => 100,
            _ => 70,
        },
    }
}

// Kick on beats 1 and 3, snare on 2 and 4, hats on every half beat.
fn percussion_measure(state: &HarmonicState, beat: f64, events: &mut Vec<NoteEvent>) {
    for beat_index in 0..BEATS_PER_MEASURE {
        let key = if beat_index % 2 == 0 { KICK } else { SNARE };
        push(
            events,
            Voice::Percussion,
            Note(key),
            state.measure_start + beat * f64::from(beat_index),
            beat / 2.0,
        );
    }

    let hat_spacing = beat * f64::from(BEATS_PER_MEASURE) / f64::from(HATS_PER_MEASURE);
    for hat in 0..HATS_PER_MEASURE {
        push(
            events,
            Voice::Percussion,
            Note(CLOSED_HAT),
            state.measure_start + hat_spacing * f64::from(hat),
            hat_spacing / 2.0,
        );
    }
}

fn bass_measure(state: &HarmonicState, beat: f64, events: &mut Vec<NoteEvent>) {
    let pitch = Note::clamped(state.root - 12);
    for beat_index in 0..BEATS_PER_MEASURE {
        push(
            events,
            Voice::Bass,
            pitch,
            state.measure_start + beat * f64::from(beat_index),
            beat,
        );
    }
}

fn harmony_measure(
    state: &HarmonicState,
    measure: f64,
    intervals: &[i32],
    events: &mut Vec<NoteEvent>,
) {
    for interval in intervals {
        push(
            events,
            Voice::Harmony,
            Note::clamped(state.root + interval),
            state.measure_start,
            measure,
        );
    }
}

fn lead_measure(
    state: &HarmonicState,
    beat: f64,
    palette: &[i32],
    rng: &mut dyn RandomSource,
    events: &mut Vec<NoteEvent>,
) {
    let measure_beats = f64::from(BEATS_PER_MEASURE);
    let mut offset_beats = 0.0;

    for _ in 0..LEAD_MAX_NOTES {
        let step = lead_step(rng);
        if offset_beats + step > measure_beats {
            break;
        }
        let pitch = lead_pitch(state.root, palette, rng);
        if lead_plays(rng) {
            push(
                events,
                Voice::Lead,
                pitch,
                state.measure_start + offset_beats * beat,
                step * beat,
            );
        }
        offset_beats += step;
    }
}

/// Chord intervals followed by the color tones they do not already contain.
pub fn lead_palette(intervals: &[i32]) -> Vec<i32> {
    let mut palette = intervals.to_vec();
    for tone in LEAD_COLOR_TONES {
        if !palette.contains(&tone) {
            palette.push(tone);
        }
    }
    palette
}

/// Length of the next lead note, in beats.
pub fn lead_step(rng: &mut dyn RandomSource) -> f64 {
    *pick(rng, &LEAD_STEPS)
}

/// One octave above the root, on a palette tone, nudged by up to 3 semitones.
pub fn lead_pitch(root: i32, palette: &[i32], rng: &mut dyn RandomSource) -> Note {
    let tone = *pick(rng, palette);
    let jitter = rng.between(-LEAD_JITTER, LEAD_JITTER);
    Note::clamped(root + 12 + tone + jitter)
}

/// Whether a lead slot sounds or rests.
pub fn lead_plays(rng: &mut dyn RandomSource) -> bool {
    chance(rng, LEAD_PLAY_CHANCE)
}

/// Next root: mostly a fourth or fifth leap (or staying put), otherwise a
/// step, clamped into `ROOT_BAND`.
pub fn walk_root(root: i32, rng: &mut dyn RandomSource) -> i32 {
    let shift = if chance(rng, WALK_LEAP_CHANCE) {
        *pick(rng, &WALK_LEAPS)
    } else {
        *pick(rng, &WALK_STEPS)
    };
    (root + shift).clamp(ROOT_BAND.0, ROOT_BAND.1)
}
