use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::Local;
use log::{info, warn};
use regex::Regex;

use crate::catalog::normalize_genre;
use crate::encoder::EncodedTracks;
use crate::error::{EngineError, Result};

/// How many fresh suffixes to try when a file name is already taken.
const NAME_ATTEMPTS: usize = 16;

/// Genre as it appears in file names: lowercase ASCII letters and digits,
/// with every other run of characters turned into a single underscore.
pub fn genre_token(genre: &str) -> String {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    let separators = SEPARATORS.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap());
    let normalized = normalize_genre(genre);
    let token = separators.replace_all(&normalized, "_");
    let token = token.trim_matches('_');
    if token.is_empty() {
        "untitled".to_string()
    } else {
        token.to_string()
    }
}

/// `<genre>_<duration>s_<local time to the millisecond>_<random hex>.mid`
pub fn artifact_name(genre: &str, duration_seconds: i64) -> String {
    format!(
        "{}_{}s_{}_{:08x}.mid",
        genre_token(genre),
        duration_seconds,
        Local::now().format("%Y%m%d_%H%M%S_%3f"),
        rand::random::<u32>()
    )
}

/// Write the tracks as a MIDI file under `dir` and return the file name.
///
/// The directory is created if needed. Files are only ever created, never
/// overwritten: a name that already exists gets a new random suffix.
pub fn emit(
    tracks: &EncodedTracks,
    genre: &str,
    duration_seconds: i64,
    dir: &Path,
) -> Result<String> {
    fs::create_dir_all(dir).map_err(|source| EngineError::StorageFailure {
        path: dir.to_path_buf(),
        source,
    })?;

    let payload = tracks.to_bytes().map_err(|source| EngineError::StorageFailure {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut last_taken: Option<PathBuf> = None;
    for _ in 0..NAME_ATTEMPTS {
        let file_name = artifact_name(genre, duration_seconds);
        let path = dir.join(&file_name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let written = file.write_all(&payload).and_then(|_| file.sync_all());
                drop(file);
                discard_on_error(&path, written)?;
                info!("Wrote {} ({} bytes)", path.display(), payload.len());
                return Ok(file_name);
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                warn!("{} already exists, drawing another name", path.display());
                last_taken = Some(path);
            }
            Err(source) => return Err(EngineError::StorageFailure { path, source }),
        }
    }

    Err(EngineError::StorageFailure {
        path: last_taken.unwrap_or_else(|| dir.to_path_buf()),
        source: io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free file name after {} attempts", NAME_ATTEMPTS),
        ),
    })
}

/// Turn a failed write into a `StorageFailure`, removing the partial file
/// first so nobody picks it up as a finished artifact.
fn discard_on_error<T>(path: &Path, result: io::Result<T>) -> Result<T> {
    result.map_err(|source| {
        if let Err(err) = fs::remove_file(path) {
            warn!("Could not remove partial file {}: {}", path.display(), err);
        }
        EngineError::StorageFailure {
            path: path.to_path_buf(),
            source,
        }
    })
}
