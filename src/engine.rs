use std::path::PathBuf;

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::catalog::{normalize_genre, Catalog};
use crate::config::EngineConfig;
use crate::emitter::emit;
use crate::encoder::encode;
use crate::error::{EngineError, Result};
use crate::random::{RandomSource, RngSource};
use crate::scheduler::compose;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionRequest {
    pub genre: String,
    pub duration_seconds: i64,
    pub voice_style: Option<String>,
}

impl CompositionRequest {
    pub fn new(genre: impl Into<String>, duration_seconds: i64) -> Self {
        Self {
            genre: genre.into(),
            duration_seconds,
            voice_style: None,
        }
    }

    pub fn with_voice_style(mut self, voice_style: impl Into<String>) -> Self {
        self.voice_style = Some(voice_style.into());
        self
    }
}

/// What a finished request produced. `file_name` is the artifact identifier
/// callers turn into a download reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionArtifact {
    pub file_name: String,
    pub path: PathBuf,
    pub genre: String,
    pub known_genre: bool,
    pub tempo_bpm: u16,
    pub duration_seconds: i64,
    pub voice_style: Option<String>,
    pub track_count: usize,
    pub note_count: usize,
}

/// Catalog → scheduler → encoder → emitter, one request at a time.
///
/// The random source is seeded once when the engine is built and then
/// shared by every request the engine serves.
pub struct Engine {
    config: EngineConfig,
    catalog: Catalog,
    rng: Box<dyn RandomSource + Send>,
}

impl Engine {
    /// Engine seeded from OS entropy.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_source(config, Box::new(RngSource(StdRng::from_entropy())))
    }

    /// Engine whose output is reproducible for a given seed.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Result<Self> {
        Self::with_source(config, Box::new(RngSource(StdRng::seed_from_u64(seed))))
    }

    pub fn with_source(
        config: EngineConfig,
        rng: Box<dyn RandomSource + Send>,
    ) -> Result<Self> {
        let catalog = match &config.catalog_path {
            Some(path) => Catalog::load(path)?,
            None => Catalog::builtin().clone(),
        };
        Ok(Self {
            config,
            catalog,
            rng,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn is_known_genre(&self, genre: &str) -> bool {
        self.catalog.is_known_genre(genre)
    }

    pub fn list_known_genres(&self) -> Vec<&str> {
        self.catalog.list_known_genres()
    }

    /// For callers that want to reject unsupported genres up front instead
    /// of getting an improvised profile.
    pub fn require_known_genre(&self, genre: &str) -> Result<()> {
        if self.is_known_genre(genre) {
            Ok(())
        } else {
            Err(EngineError::UnknownGenre {
                genre: genre.to_string(),
            })
        }
    }

    pub fn compose(&mut self, request: &CompositionRequest) -> Result<CompositionArtifact> {
        if request.duration_seconds <= 0 {
            return Err(EngineError::InvalidDuration(request.duration_seconds));
        }

        let genre = normalize_genre(&request.genre);
        let known_genre = self.catalog.is_known_genre(&genre);
        info!(
            "Composing {}s of '{}'{}",
            request.duration_seconds,
            genre,
            request
                .voice_style
                .as_deref()
                .map(|style| format!(" in '{}' style", style))
                .unwrap_or_default()
        );

        let profile = self.catalog.lookup(&genre, self.rng.as_mut());
        let events = compose(&profile, request.duration_seconds, self.rng.as_mut());
        let tracks = encode(&events, &profile);
        let file_name = emit(
            &tracks,
            &genre,
            request.duration_seconds,
            &self.config.output_dir,
        )?;

        Ok(CompositionArtifact {
            path: self.config.output_dir.join(&file_name),
            file_name,
            genre,
            known_genre,
            tempo_bpm: profile.tempo_bpm,
            duration_seconds: request.duration_seconds,
            voice_style: request.voice_style.clone(),
            track_count: tracks.len(),
            note_count: events.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        let config = EngineConfig {
            output_dir: std::env::temp_dir().join("cadenza-engine-unit"),
            catalog_path: None,
        };
        Engine::with_seed(config, 5).unwrap()
    }

    #[test]
    fn rejects_non_positive_durations_before_writing() {
        let mut engine = engine();
        for duration in [0, -5] {
            assert!(matches!(
                engine.compose(&CompositionRequest::new("jazz", duration)),
                Err(EngineError::InvalidDuration(d)) if d == duration
            ));
        }
    }

    #[test]
    fn membership_check_is_separate_from_composing() {
        let engine = engine();
        assert!(engine.require_known_genre("Jazz").is_ok());
        assert!(matches!(
            engine.require_known_genre("unknowngenre123"),
            Err(EngineError::UnknownGenre { genre }) if genre == "unknowngenre123"
        ));
        assert_eq!(engine.list_known_genres()[0], "jazz");
    }

    #[test]
    fn missing_custom_catalog_fails_construction() {
        let config = EngineConfig {
            catalog_path: Some(PathBuf::from("/definitely/not/here/genres.json")),
            ..EngineConfig::default()
        };
        assert!(matches!(Engine::new(config), Err(EngineError::Catalog(_))));
    }
}
