use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::error::{EngineError, Result};

pub const OUTPUT_DIR_ENV: &str = "CADENZA_OUTPUT_DIR";
pub const DEFAULT_OUTPUT_DIR: &str = "generated_music";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Where generated MIDI files are written.
    pub output_dir: PathBuf,
    /// Optional genre catalog replacing the built-in one.
    pub catalog_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            catalog_path: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|err| EngineError::Config(err.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let input = fs::read_to_string(path)
            .map_err(|err| EngineError::Config(format!("could not read {}: {}", path.display(), err)))?;
        let config = Self::from_json(&input)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply `CADENZA_OUTPUT_DIR` if it is set and not empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = env::var_os(OUTPUT_DIR_ENV).filter(|dir| !dir.is_empty()) {
            debug!("{} overrides output directory", OUTPUT_DIR_ENV);
            self.output_dir = PathBuf::from(dir);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = EngineConfig::from_json(r#"{"catalog_path": "genres.json"}"#).unwrap();
        assert_eq!(config.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert_eq!(config.catalog_path, Some(PathBuf::from("genres.json")));
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"output": "x"}"#),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let path = Path::new("/definitely/not/here/cadenza.json");
        assert!(matches!(EngineConfig::from_file(path), Err(EngineError::Config(_))));
    }
}
