// Cadenza: procedural multi-track MIDI composition.
//
// A request names a genre and a duration. The catalog turns the genre into a
// profile (tempo, chord intervals, one General MIDI program per voice), the
// scheduler writes measure after measure of lead, harmony, bass and
// percussion, the encoder turns each voice into a MIDI track, and the
// emitter stores the file under a name no other request can take.
//
// - pitch.rs: MIDI note and pitch-class types, note names for logs
// - random.rs: pluggable random source and the decision helpers
// - catalog.rs: genre catalog (built-in JSON table, custom catalogs, fallback)
// - scheduler.rs: measure loop, voices, harmonic walk
// - encoder.rs: standard MIDI file tracks via midly
// - emitter.rs: collision-free file output
// - engine.rs: request façade wiring the above together
// - config.rs, error.rs: configuration and error types

pub mod catalog;
pub mod config;
pub mod emitter;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod pitch;
pub mod random;
pub mod scheduler;

pub use catalog::{Catalog, GenreProfile, Timbres};
pub use config::EngineConfig;
pub use engine::{CompositionArtifact, CompositionRequest, Engine};
pub use error::{EngineError, Result};
pub use scheduler::{NoteEvent, Voice};
