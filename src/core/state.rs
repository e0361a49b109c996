//! Engine state.
//!
//! Everything the simulation reads or writes lives in one `EngineState`,
//! passed by reference into every handler call. Two replicas that have
//! processed the same move-log prefix hold equal states; [`EngineState`]
//! derives `PartialEq` and serializes deterministically (persistent ordered
//! maps throughout), so `bincode` output is bit-identical too.
//!
//! ## Paths
//!
//! `paths` is a flat `path → value` map for engine-level bookkeeping that no
//! handler owns (`set` moves write it). Values are strings like every other
//! wire argument; [`EngineState::path_int`] reads numeric ones.

use im::{OrdMap, OrdSet};
use serde::{Deserialize, Serialize};

use super::faction::{FactionId, Seating};
use super::phase::Phase;
use super::rng::GameRng;
use crate::barrier::ConfirmationState;
use crate::board::{SpaceId, SpaceState};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    participant_count: usize,

    /// Current phase.
    pub phase: Phase,

    /// Round number (0 before the first round starts).
    pub round: u32,

    /// Faction order and control.
    pub seating: Seating,

    /// Barrier confirmation flags, one per participant.
    pub confirmations: ConfirmationState,

    /// Shared random source.
    pub rng: GameRng,

    /// Winner, once decided.
    pub winner: Option<FactionId>,

    /// Set when `GameOver` is entered.
    pub finished: bool,

    paths: OrdMap<String, String>,
    passed: OrdSet<FactionId>,
    spaces: OrdMap<SpaceId, SpaceState>,
}

impl EngineState {
    /// Create the state for a session.
    #[must_use]
    pub fn new(participant_count: usize, seating: Seating, seed: u64) -> Self {
        assert!(participant_count > 0, "Must have at least 1 participant");
        assert!(participant_count <= 255, "At most 255 participants supported");

        Self {
            participant_count,
            phase: Phase::Round,
            round: 0,
            seating,
            confirmations: ConfirmationState::new(participant_count),
            rng: GameRng::new(seed),
            winner: None,
            finished: false,
            paths: OrdMap::new(),
            passed: OrdSet::new(),
            spaces: OrdMap::new(),
        }
    }

    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.participant_count
    }

    // === Phases ===

    /// Record entry into `phase`.
    ///
    /// Entering `Round` advances the round counter, `Action` clears the
    /// pass set, and `GameOver` marks the session finished.
    pub fn enter_phase(&mut self, phase: Phase) {
        self.phase = phase;
        match phase {
            Phase::Round => self.round += 1,
            Phase::Action => self.passed = OrdSet::new(),
            Phase::GameOver => self.finished = true,
            _ => {}
        }
    }

    // === Paths ===

    #[must_use]
    pub fn path(&self, path: &str) -> Option<&str> {
        self.paths.get(path).map(String::as_str)
    }

    #[must_use]
    pub fn path_int(&self, path: &str, default: i64) -> i64 {
        self.path(path).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    pub fn set_path(&mut self, path: impl Into<String>, value: impl Into<String>) {
        self.paths.insert(path.into(), value.into());
    }

    /// Add `delta` to a numeric path (missing or non-numeric counts as 0).
    pub fn modify_path(&mut self, path: &str, delta: i64) -> i64 {
        let value = self.path_int(path, 0) + delta;
        self.paths.insert(path.to_string(), value.to_string());
        value
    }

    pub fn clear_path(&mut self, path: &str) {
        self.paths.remove(path);
    }

    // === Passing ===

    pub fn mark_passed(&mut self, faction: FactionId) {
        self.passed.insert(faction);
    }

    #[must_use]
    pub fn has_passed(&self, faction: &FactionId) -> bool {
        self.passed.contains(faction)
    }

    /// Whether every seated faction has passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.seating.factions().iter().all(|f| self.passed.contains(f))
    }

    // === Spaces ===

    /// State of `space` (default if never touched).
    #[must_use]
    pub fn space(&self, space: &SpaceId) -> SpaceState {
        self.spaces.get(space).cloned().unwrap_or_default()
    }

    /// Apply `update` to a space's state.
    pub fn update_space<F>(&mut self, space: &SpaceId, update: F)
    where
        F: FnOnce(&mut SpaceState),
    {
        let mut current = self.space(space);
        update(&mut current);
        self.spaces.insert(space.clone(), current);
    }

    /// Spaces with any recorded state, in order.
    pub fn touched_spaces(&self) -> impl Iterator<Item = (&SpaceId, &SpaceState)> {
        self.spaces.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> EngineState {
        EngineState::new(2, Seating::new(["north", "south"]), 42)
    }

    #[test]
    fn test_new_state() {
        let state = state();
        assert_eq!(state.participant_count(), 2);
        assert_eq!(state.round, 0);
        assert_eq!(state.confirmations.len(), 2);
        assert!(!state.finished);
    }

    #[test]
    fn test_enter_phase() {
        let mut state = state();
        state.enter_phase(Phase::Round);
        assert_eq!(state.round, 1);

        state.mark_passed("north".into());
        state.enter_phase(Phase::Action);
        assert!(!state.has_passed(&"north".into()));

        state.enter_phase(Phase::GameOver);
        assert!(state.finished);
    }

    #[test]
    fn test_paths() {
        let mut state = state();
        assert_eq!(state.path("treaty.north"), None);

        state.set_path("treaty.north", "south");
        assert_eq!(state.path("treaty.north"), Some("south"));

        assert_eq!(state.modify_path("vp.north", 2), 2);
        assert_eq!(state.modify_path("vp.north", 3), 5);
        assert_eq!(state.path_int("vp.north", 0), 5);
        assert_eq!(state.path_int("treaty.north", -1), -1);

        state.clear_path("vp.north");
        assert_eq!(state.path("vp.north"), None);
    }

    #[test]
    fn test_all_passed() {
        let mut state = state();
        assert!(!state.all_passed());
        state.mark_passed("north".into());
        assert!(!state.all_passed());
        state.mark_passed("south".into());
        assert!(state.all_passed());
    }

    #[test]
    fn test_update_space() {
        let mut state = state();
        let keep = SpaceId::from("keep");
        state.update_space(&keep, |s| s.add_units(&"north".into(), 2));
        assert_eq!(state.space(&keep).units(&"north".into()), 2);
        assert_eq!(state.touched_spaces().count(), 1);
    }

    #[test]
    fn test_bincode_is_stable() {
        let mut a = state();
        let mut b = state();
        for s in [&mut a, &mut b] {
            s.set_path("x", "1");
            s.rng.roll(6);
        }
        assert_eq!(bincode::serialize(&a).unwrap(), bincode::serialize(&b).unwrap());
    }
}
