//! Core engine types: participants, factions, phases, state, RNG, configuration.
//!
//! This module contains the building blocks every other module shares.
//! Game content plugs in through handlers rather than modifying the core.

pub mod participant;
pub mod faction;
pub mod phase;
pub mod rng;
pub mod config;
pub mod state;

pub use participant::{ParticipantId, ParticipantMap};
pub use faction::{FactionId, Seating};
pub use phase::Phase;
pub use rng::{GameRng, GameRngState};
pub use config::{ConfigError, EngineConfig, GameSetup};
pub use state::EngineState;
