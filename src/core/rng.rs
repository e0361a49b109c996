//! Shared deterministic random source.
//!
//! ## Contract
//!
//! Every replica seeds the same `GameRng` and must make the same calls, in
//! the same order, for the same prefix of the move log. `draws()` counts the
//! calls made so far; two replicas that processed the same prefix report the
//! same count. Anything that runs on only some replicas (menus, presentation,
//! the waiting side of a decision) must never touch the RNG.
//!
//! ```
//! use rust_lockstep::core::GameRng;
//!
//! let mut a = GameRng::new(7);
//! let mut b = GameRng::new(7);
//!
//! let rolls_a: Vec<_> = (0..5).map(|_| a.roll(6)).collect();
//! let rolls_b: Vec<_> = (0..5).map(|_| b.roll(6)).collect();
//!
//! assert_eq!(rolls_a, rolls_b);
//! assert_eq!(a.draws(), 5);
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Deterministic RNG with a monotonically increasing draw counter.
///
/// Serializes through [`GameRngState`], so it can live inside the engine
/// state and be part of bit-identical snapshots.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(into = "GameRngState", from = "GameRngState")]
pub struct GameRng {
    inner: ChaCha8Rng,
    seed: u64,
    draws: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
            draws: 0,
        }
    }

    /// Roll a die with `faces` faces, returning `1..=faces`.
    ///
    /// A zero-faced die returns 0 but still counts as a draw.
    pub fn roll(&mut self, faces: u32) -> u32 {
        self.draws += 1;
        if faces == 0 {
            return 0;
        }
        self.inner.gen_range(1..=faces)
    }

    /// Pick an index in `0..len`. Counts as one draw.
    ///
    /// Returns `None` without drawing when `len` is 0.
    pub fn pick(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        self.draws += 1;
        Some(self.inner.gen_range(0..len))
    }

    /// Shuffle a slice in place. Counts as one draw.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        use rand::seq::SliceRandom;
        self.draws += 1;
        slice.shuffle(&mut self.inner);
    }

    /// Number of draws consumed so far.
    #[must_use]
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// The seed this RNG started from.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Get the current state for serialization.
    #[must_use]
    pub fn state(&self) -> GameRngState {
        GameRngState {
            seed: self.seed,
            word_pos: self.inner.get_word_pos(),
            draws: self.draws,
        }
    }

    /// Restore from a saved state.
    #[must_use]
    pub fn from_state(state: &GameRngState) -> Self {
        let mut inner = ChaCha8Rng::seed_from_u64(state.seed);
        inner.set_word_pos(state.word_pos);
        Self {
            inner,
            seed: state.seed,
            draws: state.draws,
        }
    }
}

impl PartialEq for GameRng {
    fn eq(&self, other: &Self) -> bool {
        self.state() == other.state()
    }
}

impl Eq for GameRng {}

/// Serializable RNG state.
///
/// Uses the ChaCha8 word position, so capture and restore are O(1)
/// regardless of how many values were generated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRngState {
    /// Original seed
    pub seed: u64,
    /// ChaCha8 word position (128-bit counter)
    pub word_pos: u128,
    /// Draws consumed
    pub draws: u64,
}

impl From<GameRng> for GameRngState {
    fn from(rng: GameRng) -> Self {
        rng.state()
    }
}

impl From<GameRngState> for GameRng {
    fn from(state: GameRngState) -> Self {
        GameRng::from_state(&state)
    }
}
