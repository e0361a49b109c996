//! The move queue.
//!
//! Operated as a stack: the last move pushed runs next. To run steps 1, 2,
//! 3 in that order they must be pushed 3, 2, 1; [`MoveQueue::push_sequence`]
//! does that inversion for you.
//!
//! Positions are addressed by *depth*: depth 0 is the top (next to run),
//! depth 1 the entry beneath it, and so on. Besides push/pop there are two
//! bounded ways to reach below the top:
//!
//! - [`MoveQueue::prepend_after_marker`] splices a move in just ahead of a
//!   matching future entry, so it runs before that continuation.
//! - [`MoveQueue::remove_range`] / [`MoveQueue::remove_at`] cancel moves
//!   that have not run yet.
//!
//! Nothing else reorders entries.
//!
//! ```
//! use rust_lockstep::moves::Move;
//! use rust_lockstep::queue::MoveQueue;
//!
//! let mut queue = MoveQueue::new();
//! queue.push_sequence([Move::rule("a", ["north"]), Move::rule("b", ["north"])]);
//!
//! assert_eq!(queue.pop().unwrap().opcode(), "a");
//! assert_eq!(queue.pop().unwrap().opcode(), "b");
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::moves::Move;

/// Ordered collection of pending moves (index 0 = bottom, last = top).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveQueue {
    entries: Vec<Move>,
}

impl MoveQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending moves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Push a move; it becomes the top and runs next.
    pub fn push(&mut self, mv: Move) {
        self.entries.push(mv);
    }

    /// Push moves given in intended execution order.
    ///
    /// The first element ends up on top.
    pub fn push_sequence<I>(&mut self, moves: I)
    where
        I: IntoIterator<Item = Move>,
        I::IntoIter: DoubleEndedIterator,
    {
        for mv in moves.into_iter().rev() {
            self.entries.push(mv);
        }
    }

    /// Peek at the top without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&Move> {
        self.entries.last()
    }

    /// Remove and return the top.
    pub fn pop(&mut self) -> Option<Move> {
        self.entries.pop()
    }

    /// The move at `depth`, if any.
    #[must_use]
    pub fn get(&self, depth: usize) -> Option<&Move> {
        let index = self.index_of(depth)?;
        self.entries.get(index)
    }

    /// Iterate from the top down.
    pub fn iter_from_top(&self) -> impl Iterator<Item = &Move> {
        self.entries.iter().rev()
    }

    /// Depth of the first entry (from the top) satisfying `pred`.
    pub fn position<F>(&self, pred: F) -> Option<usize>
    where
        F: Fn(&Move) -> bool,
    {
        self.iter_from_top().position(pred)
    }

    /// Insert `mv` immediately ahead of the first entry matching `matcher`,
    /// scanning from the top outward.
    ///
    /// Returns `false`, leaving the queue untouched, when nothing matches.
    pub fn prepend_after_marker<F>(&mut self, mv: Move, matcher: F) -> bool
    where
        F: Fn(&Move) -> bool,
    {
        let Some(depth) = self.position(matcher) else {
            warn!(opcode = %mv.opcode(), "no marker found; move not inserted");
            return false;
        };
        debug!(opcode = %mv.opcode(), depth, "splicing move ahead of marker");
        let index = self.entries.len() - depth;
        self.entries.insert(index, mv);
        true
    }

    /// Insert `mv` so that it sits at `depth` (0 = new top).
    ///
    /// A depth past the bottom places the move at the bottom.
    pub fn insert_at(&mut self, depth: usize, mv: Move) {
        let index = self.entries.len().saturating_sub(depth);
        self.entries.insert(index, mv);
    }

    /// Remove the move at `depth`. Out of range (including an empty queue)
    /// is a no-op returning `None`.
    pub fn remove_at(&mut self, depth: usize) -> Option<Move> {
        let index = self.index_of(depth)?;
        Some(self.entries.remove(index))
    }

    /// Remove entries from the top down to, but not including, the first
    /// entry that fails `matcher`. Returns the removed moves, top first.
    pub fn remove_range<F>(&mut self, matcher: F) -> Vec<Move>
    where
        F: Fn(&Move) -> bool,
    {
        self.remove_range_from(0, matcher)
    }

    /// Like [`MoveQueue::remove_range`], but the run starts at `depth`;
    /// entries above it are left alone.
    ///
    /// Used by reactions that cancel the continuation sitting beneath the
    /// barrier they answer.
    pub fn remove_range_from<F>(&mut self, depth: usize, matcher: F) -> Vec<Move>
    where
        F: Fn(&Move) -> bool,
    {
        let end = self.entries.len().saturating_sub(depth);
        let start = self.entries[..end]
            .iter()
            .rposition(|mv| !matcher(mv))
            .map_or(0, |i| i + 1);
        let mut removed: Vec<Move> = self.entries.drain(start..end).collect();
        removed.reverse();
        if !removed.is_empty() {
            debug!(count = removed.len(), depth, "cancelled pending moves");
        }
        removed
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn index_of(&self, depth: usize) -> Option<usize> {
        self.entries.len().checked_sub(depth + 1)
    }
}

impl FromIterator<Move> for MoveQueue {
    /// Collect moves given in execution order (first = top).
    fn from_iter<I: IntoIterator<Item = Move>>(iter: I) -> Self {
        let mut entries: Vec<Move> = iter.into_iter().collect();
        entries.reverse();
        Self { entries }
    }
}
