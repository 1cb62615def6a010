use std::io;

use midly::num::{u15, u24, u28, u4, u7};
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
};

use crate::catalog::GenreProfile;
use crate::scheduler::{NoteEvent, Voice};

/// Ticks per quarter note (one beat) in the written file.
pub const TICKS_PER_BEAT: u16 = 480;

/// General MIDI reserves channel 10 (index 9) for percussion.
pub const PERCUSSION_CHANNEL: u8 = 9;

impl Voice {
    pub fn channel(&self) -> u8 {
        match self {
            Voice::Lead => 0,
            Voice::Harmony => 1,
            Voice::Bass => 2,
            Voice::Percussion => PERCUSSION_CHANNEL,
        }
    }
}

/// One MIDI track per voice, in `Voice::ALL` order.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTracks {
    tracks: Vec<Track<'static>>,
}

impl EncodedTracks {
    pub fn tracks(&self) -> &[Track<'static>] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// A format 1 (parallel tracks) standard MIDI file holding every track.
    pub fn to_smf(&self) -> Smf<'static> {
        Smf {
            header: Header::new(
                Format::Parallel,
                Timing::Metrical(u15::new(TICKS_PER_BEAT)),
            ),
            tracks: self.tracks.clone(),
        }
    }

    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.to_smf().write_std(&mut buf)?;
        Ok(buf)
    }
}

pub fn seconds_to_ticks(seconds: f64, tempo_bpm: u16) -> u32 {
    let beats = seconds * f64::from(tempo_bpm) / 60.0;
    (beats * f64::from(TICKS_PER_BEAT)).round().max(0.0) as u32
}

pub fn ticks_to_seconds(ticks: u32, tempo_bpm: u16) -> f64 {
    f64::from(ticks) / f64::from(TICKS_PER_BEAT) * 60.0 / f64::from(tempo_bpm)
}

pub fn tempo_micros_per_beat(tempo_bpm: u16) -> u32 {
    60_000_000 / u32::from(tempo_bpm.max(1))
}

/// Split the scheduler's events by voice and encode each voice as a track.
pub fn encode(events: &[NoteEvent], profile: &GenreProfile) -> EncodedTracks {
    let tracks = Voice::ALL
        .iter()
        .map(|voice| {
            let mut voice_events: Vec<&NoteEvent> =
                events.iter().filter(|e| e.voice == *voice).collect();
            // Stable, so simultaneous notes keep their emission order.
            voice_events.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));
            create_track(*voice, &voice_events, profile)
        })
        .collect();

    EncodedTracks { tracks }
}

// Note offs sort before note ons on the same tick, so a repeated pitch is
// released before it is struck again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Edge {
    Off,
    On,
}

/// Create a track of MIDI events for one voice: name, tempo and program at
/// tick 0, then a note on/off pair per event.
fn create_track(voice: Voice, events: &[&NoteEvent], profile: &GenreProfile) -> Track<'static> {
    let channel = u4::new(voice.channel());
    let tempo = profile.tempo_bpm;
    let mut track_events = Vec::<TrackEvent>::with_capacity(events.len() * 2 + 4);

    track_events.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(voice.name().as_bytes())),
    });

    track_events.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo_micros_per_beat(tempo)))),
    });

    track_events.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Midi {
            channel,
            message: MidiMessage::ProgramChange {
                program: u7::new(profile.timbres.for_voice(voice)),
            },
        },
    });

    let mut edges: Vec<(u32, Edge, u8, u8)> = Vec::with_capacity(events.len() * 2);
    for event in events {
        let start = seconds_to_ticks(event.start_seconds, tempo);
        let end = seconds_to_ticks(event.end_seconds(), tempo).max(start + 1);
        edges.push((start, Edge::On, event.pitch.0, event.velocity));
        edges.push((end, Edge::Off, event.pitch.0, 0));
    }
    edges.sort_by_key(|(tick, edge, _, _)| (*tick, *edge));

    let mut last_tick: u32 = 0;
    for (tick, edge, key, vel) in edges {
        let message = match edge {
            Edge::On => MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(vel),
            },
            Edge::Off => MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            },
        };
        track_events.push(TrackEvent {
            delta: u28::new(tick - last_tick),
            kind: TrackEventKind::Midi { channel, message },
        });
        last_tick = tick;
    }

    // Track end
    track_events.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    track_events
}
