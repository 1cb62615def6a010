use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use indexmap::IndexMap;
use log::{debug, warn};
use regex::Regex;
use serde_json::Value;

use crate::error::{EngineError, Result};
use crate::random::{pick, RandomSource};
use crate::scheduler::Voice;

// This is the definition of the JSON catalog format.
//
// Catalog = { name<String>: Genre }
// Genre   = { "tempo": int, "chords": [ int* ], "lead": u7, "harmony": u7,
//             "bass": u7, "percussion": u7, "aliases"?: [ String* ] }

const BUILTIN_CATALOG: &str = include_str!("catalog.json");

// 4 BPM is the slowest tempo whose microseconds per beat still fit the
// 24-bit MIDI tempo field.
pub const MIN_TEMPO: u16 = 4;
pub const MAX_TEMPO: u16 = 400;
pub const MAX_INTERVAL: i32 = 24;

/// Tempo range for profiles improvised for unknown genres.
pub const FALLBACK_TEMPO: (u16, u16) = (70, 140);

/// Redraws allowed for a repeated timbre before taking the next free program.
const TIMBRE_REDRAWS: usize = 32;

/// Stock triads an improvised profile chooses its harmony from.
pub const STOCK_TRIADS: [[i32; 3]; 4] = [[0, 4, 7], [0, 3, 7], [0, 5, 7], [0, 3, 6]];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timbres {
    pub lead: u8,
    pub harmony: u8,
    pub bass: u8,
    pub percussion: u8,
}

impl Timbres {
    pub fn for_voice(&self, voice: Voice) -> u8 {
        match voice {
            Voice::Lead => self.lead,
            Voice::Harmony => self.harmony,
            Voice::Bass => self.bass,
            Voice::Percussion => self.percussion,
        }
    }

    pub fn all(&self) -> [u8; 4] {
        [self.lead, self.harmony, self.bass, self.percussion]
    }

    pub fn are_distinct(&self) -> bool {
        let all = self.all();
        all.iter()
            .enumerate()
            .all(|(i, timbre)| !all[i + 1..].contains(timbre))
    }
}

/// Musical parameters for one genre. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreProfile {
    pub tempo_bpm: u16,
    pub chord_intervals: Vec<i32>,
    pub timbres: Timbres,
}

impl GenreProfile {
    pub fn beat_seconds(&self) -> f64 {
        60.0 / f64::from(self.tempo_bpm)
    }

    pub fn measure_seconds(&self) -> f64 {
        self.beat_seconds() * f64::from(crate::scheduler::BEATS_PER_MEASURE)
    }
}

/// Read-only genre table. Canonical names keep their document order.
#[derive(Debug, Clone)]
pub struct Catalog {
    profiles: IndexMap<String, GenreProfile>,
    aliases: IndexMap<String, String>,
}

/// Lowercase, trim, and collapse inner whitespace to single spaces.
pub fn normalize_genre(genre: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").unwrap());
    whitespace
        .replace_all(genre.trim(), " ")
        .to_lowercase()
}

impl Catalog {
    /// The built-in catalog, parsed on first use and shared afterwards.
    pub fn builtin() -> &'static Catalog {
        static BUILTIN: OnceLock<Catalog> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            Catalog::from_json(BUILTIN_CATALOG).expect("built-in genre catalog is valid")
        })
    }

    pub fn load(path: &Path) -> Result<Catalog> {
        let input = fs::read_to_string(path).map_err(|err| {
            EngineError::Catalog(format!("could not read {}: {}", path.display(), err))
        })?;
        Catalog::from_json(&input)
    }

    pub fn from_json(input: &str) -> Result<Catalog> {
        let json: Value = serde_json::from_str(input)
            .map_err(|err| catalog_error(format!("could not parse JSON: {}", err)))?;

        let genres_json = json
            .as_object()
            .ok_or_else(|| catalog_error("catalog should be a JSON object"))?;

        let mut catalog = Catalog {
            profiles: IndexMap::new(),
            aliases: IndexMap::new(),
        };

        for (name, genre_json) in genres_json {
            let name = normalize_genre(name);
            if name.is_empty() {
                return Err(catalog_error("genre names must not be empty"));
            }
            let (profile, aliases) = parse_genre(&name, genre_json)?;
            catalog.claim_name(&name)?;
            catalog.profiles.insert(name.clone(), profile);
            for alias in aliases {
                catalog.claim_name(&alias)?;
                catalog.aliases.insert(alias, name.clone());
            }
        }

        if catalog.profiles.is_empty() {
            return Err(catalog_error("catalog should define at least one genre"));
        }
        debug!(
            "Loaded genre catalog with {} genres and {} aliases",
            catalog.profiles.len(),
            catalog.aliases.len()
        );
        Ok(catalog)
    }

    fn claim_name(&self, name: &str) -> Result<()> {
        if self.profiles.contains_key(name) || self.aliases.contains_key(name) {
            Err(catalog_error(format!("genre name '{}' is defined twice", name)))
        } else {
            Ok(())
        }
    }

    /// Stored profile for a known genre or alias.
    pub fn get(&self, genre: &str) -> Option<&GenreProfile> {
        let genre = normalize_genre(genre);
        let canonical = self.aliases.get(&genre).unwrap_or(&genre);
        self.profiles.get(canonical)
    }

    /// Resolve a genre to a usable profile. Never fails: an unknown genre
    /// gets a freshly improvised profile.
    pub fn lookup(&self, genre: &str, rng: &mut dyn RandomSource) -> GenreProfile {
        match self.get(genre) {
            Some(profile) => profile.clone(),
            None => {
                let profile = improvise_profile(rng);
                warn!(
                    "Genre '{}' is not in the catalog, improvised {} BPM {:?} with timbres {:?}",
                    genre,
                    profile.tempo_bpm,
                    profile.chord_intervals,
                    profile.timbres.all()
                );
                profile
            }
        }
    }

    pub fn is_known_genre(&self, genre: &str) -> bool {
        self.get(genre).is_some()
    }

    /// Canonical genre names, in catalog order. Aliases are not listed.
    pub fn list_known_genres(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    pub fn aliases_of(&self, genre: &str) -> Vec<&str> {
        let genre = normalize_genre(genre);
        self.aliases
            .iter()
            .filter(|(_, canonical)| **canonical == genre)
            .map(|(alias, _)| alias.as_str())
            .collect()
    }
}

/// Build a profile for a genre the catalog does not know: random tempo,
/// one of the stock triads, and four distinct random timbres.
pub fn improvise_profile(rng: &mut dyn RandomSource) -> GenreProfile {
    let tempo_bpm = rng.between(i32::from(FALLBACK_TEMPO.0), i32::from(FALLBACK_TEMPO.1)) as u16;
    let chord_intervals = pick(rng, &STOCK_TRIADS).to_vec();

    let mut timbres: Vec<u8> = Vec::with_capacity(4);
    while timbres.len() < 4 {
        let mut timbre = rng.between(0, 127) as u8;
        let mut redraws = 0;
        while timbres.contains(&timbre) && redraws < TIMBRE_REDRAWS {
            timbre = rng.between(0, 127) as u8;
            redraws += 1;
        }
        if timbres.contains(&timbre) {
            // Only a degenerate source gets here. At most three programs are
            // taken, so a free one always exists.
            timbre = (0..=127u8)
                .map(|offset| (timbre + offset) % 128)
                .find(|candidate| !timbres.contains(candidate))
                .unwrap_or(timbre);
        }
        timbres.push(timbre);
    }

    GenreProfile {
        tempo_bpm,
        chord_intervals,
        timbres: Timbres {
            lead: timbres[0],
            harmony: timbres[1],
            bass: timbres[2],
            percussion: timbres[3],
        },
    }
}

fn catalog_error(message: impl Into<String>) -> EngineError {
    EngineError::Catalog(message.into())
}

fn parse_genre(name: &str, genre_json: &Value) -> Result<(GenreProfile, Vec<String>)> {
    let genre_json = genre_json
        .as_object()
        .ok_or_else(|| catalog_error(format!("genre '{}' should be a JSON object", name)))?;

    let mut tempo: Option<u16> = None;
    let mut chords: Option<Vec<i32>> = None;
    let mut lead: Option<u8> = None;
    let mut harmony: Option<u8> = None;
    let mut bass: Option<u8> = None;
    let mut percussion: Option<u8> = None;
    let mut aliases: Vec<String> = Vec::new();

    for (key, value) in genre_json {
        match key.as_str() {
            "tempo" => {
                let tempo_u64 = value
                    .as_u64()
                    .ok_or_else(|| catalog_error(format!("{}: tempo should be an uint", name)))?;
                let tempo_u16 = u16::try_from(tempo_u64)
                    .ok()
                    .filter(|bpm| (MIN_TEMPO..=MAX_TEMPO).contains(bpm))
                    .ok_or_else(|| {
                        catalog_error(format!(
                            "{}: tempo should be between {} and {}",
                            name, MIN_TEMPO, MAX_TEMPO
                        ))
                    })?;
                tempo = Some(tempo_u16);
            }
            "chords" => {
                chords = Some(parse_chords(name, value)?);
            }
            "lead" => lead = Some(parse_timbre(name, key, value)?),
            "harmony" => harmony = Some(parse_timbre(name, key, value)?),
            "bass" => bass = Some(parse_timbre(name, key, value)?),
            "percussion" => percussion = Some(parse_timbre(name, key, value)?),
            "aliases" => {
                let aliases_json = value
                    .as_array()
                    .ok_or_else(|| catalog_error(format!("{}: aliases should be an array", name)))?;
                for alias_json in aliases_json {
                    let alias = alias_json.as_str().ok_or_else(|| {
                        catalog_error(format!("{}: each alias should be a string", name))
                    })?;
                    let alias = normalize_genre(alias);
                    if alias.is_empty() {
                        return Err(catalog_error(format!("{}: aliases must not be empty", name)));
                    }
                    aliases.push(alias);
                }
            }
            other => {
                return Err(catalog_error(format!("{}: incorrect key '{}'", name, other)));
            }
        }
    }

    if let (
        Some(tempo_bpm),
        Some(chord_intervals),
        Some(lead),
        Some(harmony),
        Some(bass),
        Some(percussion),
    ) = (tempo, chords, lead, harmony, bass, percussion)
    {
        let timbres = Timbres {
            lead,
            harmony,
            bass,
            percussion,
        };
        if !timbres.are_distinct() {
            return Err(catalog_error(format!("{}: the four timbres must be distinct", name)));
        }
        Ok((
            GenreProfile {
                tempo_bpm,
                chord_intervals,
                timbres,
            },
            aliases,
        ))
    } else {
        Err(catalog_error(format!("{}: some parameters were missing", name)))
    }
}

fn parse_chords(name: &str, value: &Value) -> Result<Vec<i32>> {
    let chords_json = value
        .as_array()
        .ok_or_else(|| catalog_error(format!("{}: chords should be an array", name)))?;

    let mut chords = Vec::with_capacity(chords_json.len());
    for interval_json in chords_json {
        let interval = interval_json
            .as_i64()
            .and_then(|interval| i32::try_from(interval).ok())
            .filter(|interval| interval.abs() <= MAX_INTERVAL)
            .ok_or_else(|| {
                catalog_error(format!(
                    "{}: chord intervals should be ints within ±{}",
                    name, MAX_INTERVAL
                ))
            })?;
        if chords.contains(&interval) {
            return Err(catalog_error(format!(
                "{}: chord interval {} appears twice",
                name, interval
            )));
        }
        chords.push(interval);
    }

    if chords.len() < 2 {
        return Err(catalog_error(format!(
            "{}: chords need at least two intervals",
            name
        )));
    }
    Ok(chords)
}

fn parse_timbre(name: &str, key: &str, value: &Value) -> Result<u8> {
    value
        .as_u64()
        .and_then(|timbre| u8::try_from(timbre).ok())
        .filter(|timbre| *timbre <= 127)
        .ok_or_else(|| catalog_error(format!("{}: {} should be a program in 0..=127", name, key)))
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::random::scripted::Scripted;
    use crate::random::RngSource;

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = Catalog::builtin();
        assert!(catalog.list_known_genres().len() >= 10);
        for genre in catalog.list_known_genres() {
            let profile = catalog.get(genre).unwrap();
            assert!(profile.tempo_bpm > 0);
            assert!(profile.chord_intervals.len() >= 2);
            assert!(profile.timbres.are_distinct());
            assert!(profile.timbres.all().iter().all(|timbre| *timbre <= 127));
        }
    }

    #[test]
    fn known_genres_resolve_deterministically() {
        let catalog = Catalog::builtin();
        let mut first = RngSource(StdRng::seed_from_u64(1));
        let mut second = RngSource(StdRng::seed_from_u64(2));
        for genre in catalog.list_known_genres() {
            assert_eq!(
                catalog.lookup(genre, &mut first),
                catalog.lookup(genre, &mut second)
            );
        }
    }

    #[test]
    fn jazz_profile() {
        let catalog = Catalog::builtin();
        let jazz = catalog.lookup("jazz", &mut Scripted::default());
        assert!((90..=95).contains(&jazz.tempo_bpm));
        assert_eq!(jazz.chord_intervals, vec![0, 3, 7, 10]);
    }

    #[test]
    fn genre_names_are_normalized() {
        let catalog = Catalog::builtin();
        assert!(catalog.is_known_genre("  JAZZ "));
        assert!(catalog.is_known_genre("Hip   Hop"));
        assert!(catalog.is_known_genre("Electrónica"));
        assert_eq!(catalog.get("edm"), catalog.get("electronic"));
        assert_eq!(normalize_genre("\tHeavy \n Metal "), "heavy metal");
    }

    #[test]
    fn aliases_are_not_listed() {
        let catalog = Catalog::builtin();
        let genres = catalog.list_known_genres();
        assert_eq!(genres[0], "jazz");
        assert!(!genres.contains(&"bebop"));
        assert_eq!(catalog.aliases_of("Jazz"), vec!["bebop", "swing"]);
    }

    #[test]
    fn unknown_genres_get_usable_profiles() {
        let catalog = Catalog::builtin();
        let mut rng = RngSource(StdRng::seed_from_u64(99));
        for genre in ["unknowngenre123", "", "polka-step", "???"] {
            assert!(!catalog.is_known_genre(genre));
            for _ in 0..50 {
                let profile = catalog.lookup(genre, &mut rng);
                assert!((70..=140).contains(&profile.tempo_bpm));
                assert!(STOCK_TRIADS
                    .iter()
                    .any(|triad| triad[..] == profile.chord_intervals[..]));
                assert!(profile.timbres.are_distinct());
                assert!(profile.timbres.all().iter().all(|timbre| *timbre <= 127));
            }
        }
    }

    #[test]
    fn repeated_timbre_draws_are_redrawn() {
        // Tempo, triad index, then timbres with repeats in between.
        let mut rng = Scripted::new(&[], &[100, 1, 64, 64, 10, 64, 10, 20, 90]);
        let profile = improvise_profile(&mut rng);
        assert_eq!(profile.tempo_bpm, 100);
        assert_eq!(profile.chord_intervals, vec![0, 3, 7]);
        assert_eq!(profile.timbres.all(), [64, 10, 20, 90]);
    }

    #[test]
    fn degenerate_source_still_gets_distinct_timbres() {
        // After the tempo and triad, the exhausted script answers 0 forever.
        let mut rng = Scripted::new(&[], &[100, 1]);
        let profile = improvise_profile(&mut rng);
        assert_eq!(profile.timbres.all(), [0, 1, 2, 3]);
    }

    #[test]
    fn tempo_must_fit_the_midi_tempo_field() {
        let genre = |tempo: u32| {
            format!(
                r#"{{"dirge": {{"tempo": {}, "chords": [0, 7], "lead": 1, "harmony": 2, "bass": 3, "percussion": 4}}}}"#,
                tempo
            )
        };
        for tempo in [1, 2, 3, 401] {
            assert!(
                matches!(Catalog::from_json(&genre(tempo)), Err(EngineError::Catalog(_))),
                "accepted {} BPM",
                tempo
            );
        }
        let slowest = Catalog::from_json(&genre(4)).unwrap();
        assert_eq!(slowest.get("dirge").unwrap().tempo_bpm, 4);
    }

    #[test]
    fn rejects_invalid_documents() {
        let cases = [
            "not json",
            "[]",
            "{}",
            r#"{"x": {"tempo": 0, "chords": [0, 7], "lead": 1, "harmony": 2, "bass": 3, "percussion": 4}}"#,
            r#"{"x": {"tempo": 90, "chords": [0], "lead": 1, "harmony": 2, "bass": 3, "percussion": 4}}"#,
            r#"{"x": {"tempo": 90, "chords": [0, 7], "lead": 1, "harmony": 1, "bass": 3, "percussion": 4}}"#,
            r#"{"x": {"tempo": 90, "chords": [0, 7], "lead": 128, "harmony": 2, "bass": 3, "percussion": 4}}"#,
            r#"{"x": {"tempo": 90, "chords": [0, 7], "lead": 1, "harmony": 2, "bass": 3}}"#,
            r#"{"x": {"tempo": 90, "chords": [0, 7], "lead": 1, "harmony": 2, "bass": 3, "percussion": 4, "swing": true}}"#,
            r#"{"x": {"tempo": 90, "chords": [0, 7], "lead": 1, "harmony": 2, "bass": 3, "percussion": 4, "aliases": ["X"]}}"#,
        ];
        for case in cases {
            assert!(
                matches!(Catalog::from_json(case), Err(EngineError::Catalog(_))),
                "accepted {}",
                case
            );
        }
    }

    #[test]
    fn custom_catalog_keeps_order() {
        let catalog = Catalog::from_json(
            r#"{
                "Zydeco": {"tempo": 140, "chords": [0, 4, 7], "lead": 21, "harmony": 0, "bass": 32, "percussion": 1},
                "Ballad": {"tempo": 66, "chords": [0, 4, 7, 11], "lead": 0, "harmony": 48, "bass": 32, "percussion": 1,
                           "aliases": ["Slow  Song"]}
            }"#,
        )
        .unwrap();
        assert_eq!(catalog.list_known_genres(), vec!["zydeco", "ballad"]);
        assert!(catalog.is_known_genre("slow song"));
        assert!(!catalog.is_known_genre("jazz"));
    }
}
