//! Engine configuration.
//!
//! `EngineConfig` holds the tunables every replica must agree on. It is
//! loaded from JSON; missing fields take their defaults. `GameSetup` pairs
//! a config with the session shape (participants and seating).

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::faction::Seating;

pub const BUILTIN_ENGINE_CONFIG: &str = include_str!("../data/engine_config.json");

/// Replica-wide tunables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum moves dispatched by a single `run` before it gives up.
    pub step_budget: usize,

    /// Rounds played before the game ends without a victor.
    pub max_rounds: u32,

    /// Seed for the shared random source.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_budget: 10_000,
            max_rounds: 9,
            seed: 0,
        }
    }
}

impl EngineConfig {
    /// The configuration shipped with the crate.
    pub fn builtin() -> Self {
        Self::from_json_str(BUILTIN_ENGINE_CONFIG).unwrap_or_default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&contents)?;
        Ok(config)
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_step_budget(mut self, budget: usize) -> Self {
        self.step_budget = budget;
        self
    }

    #[must_use]
    pub fn with_max_rounds(mut self, rounds: u32) -> Self {
        self.max_rounds = rounds;
        self
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read engine config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Session shape shared by every replica.
#[derive(Clone, Debug)]
pub struct GameSetup {
    pub config: EngineConfig,

    /// Connected participants (1-255).
    pub participant_count: usize,

    /// Faction order and control.
    pub seating: Seating,
}

impl GameSetup {
    pub fn new(participant_count: usize, seating: Seating) -> Self {
        assert!(participant_count > 0, "Must have at least 1 participant");
        assert!(participant_count <= 255, "At most 255 participants supported");

        let setup = Self {
            config: EngineConfig::default(),
            participant_count,
            seating,
        };
        setup.assert_seats_in_session();
        setup
    }

    /// Panics if any faction is controlled by a participant outside the
    /// session; its decisions could never be answered.
    pub fn assert_seats_in_session(&self) {
        for faction in self.seating.factions() {
            if let Some(participant) = self.seating.controller_of(faction) {
                assert!(
                    participant.index() < self.participant_count,
                    "Faction `{faction}` is seated to participant {participant}, outside a session of {}",
                    self.participant_count
                );
            }
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }
}
