#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Local persistence for the player profile.
//!
//! The profile lives in a single JSON document. A missing file means nobody
//! is signed in; [`ProfileStore::clear`] removes it again.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::Utc;
use root_racer_core::{
    normalize_username, MatchOutcome, MatchRecord, PlayerProfile, STARTING_RATING,
};
use root_racer_system_rating::apply_outcome;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Errors raised while reading or writing the profile file.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The profile file could not be read or written.
    #[error("profile file {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The profile file does not contain a valid profile.
    #[error("profile file {path} is corrupt: {source}")]
    Corrupt {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
    /// The requested username is blank.
    #[error("username must contain at least one visible character")]
    InvalidUsername,
}

/// Profile persistence backed by one JSON file.
#[derive(Clone, Debug)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    /// Creates a store over the provided file path. Nothing is read yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the profile file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored profile, returning `None` when no profile exists.
    pub fn load(&self) -> Result<Option<PlayerProfile>, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no stored profile");
                return Ok(None);
            }
            Err(source) => return Err(self.io_error(source)),
        };
        let profile = serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(profile))
    }

    /// Creates and stores a fresh profile, replacing any existing one.
    pub fn create(&self, username: &str) -> Result<PlayerProfile, StorageError> {
        let username = normalize_username(username).ok_or(StorageError::InvalidUsername)?;
        let profile = PlayerProfile {
            id: Uuid::new_v4().to_string(),
            username,
            rating: STARTING_RATING,
            matches_played: 0,
            wins: 0,
            best_score: 0,
            history: Vec::new(),
        };
        self.save(&profile)?;
        info!(username = %profile.username, id = %profile.id, "created profile");
        Ok(profile)
    }

    /// Writes the profile to disk.
    ///
    /// The document is written to a sibling file first and then renamed over
    /// the old one, so a crash never leaves a half-written profile behind.
    pub fn save(&self, profile: &PlayerProfile) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(profile).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, bytes).map_err(|source| self.io_error(source))?;
        fs::rename(&staging, &self.path).map_err(|source| self.io_error(source))?;
        debug!(path = %self.path.display(), "saved profile");
        Ok(())
    }

    /// Applies a finished match to the stored profile.
    ///
    /// Returns the updated profile and the record added to its history, or
    /// `None` when no profile is stored.
    pub fn record_match(
        &self,
        outcome: MatchOutcome,
    ) -> Result<Option<(PlayerProfile, MatchRecord)>, StorageError> {
        let Some(mut profile) = self.load()? else {
            warn!("match finished without a stored profile; result not recorded");
            return Ok(None);
        };
        let record = apply_outcome(&mut profile, outcome, Utc::now());
        self.save(&profile)?;
        info!(
            rating = profile.rating,
            change = record.rating_change,
            placement = record.placement,
            "recorded match"
        );
        Ok(Some((profile, record)))
    }

    /// Removes the stored profile. Succeeds when none exists.
    pub fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "cleared profile");
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
