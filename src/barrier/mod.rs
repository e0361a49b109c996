//! Synchronization barriers.
//!
//! A barrier is a distributed AND over every connected participant: it
//! stays on top of the queue while any participant's confirmation flag is
//! set, and removes itself once all flags are clear.
//!
//! ## Posting
//!
//! A barrier must arm its flags before it can wait on them, otherwise it
//! would close immediately. [`SynchronizationBarrier::post`] pushes the
//! pair in the right order:
//!
//! ```text
//! top → reset_confirm          (arms every participant)
//!       barrier <event> args   (waits until all have acted)
//!       ...continuation
//! ```
//!
//! Every participant then owes exactly one response: a plain acknowledge
//! or a counter picked from [`SynchronizationBarrier::reactions`].

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::{EngineState, ParticipantId, ParticipantMap};
use crate::handlers::{HandlerRegistry, ReactionContext};
use crate::moves::{Choice, Move, Recipients};
use crate::queue::MoveQueue;

/// One confirmation flag per connected participant. A set flag means the
/// participant still owes a response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationState {
    flags: ParticipantMap<bool>,
}

impl ConfirmationState {
    /// All flags clear.
    #[must_use]
    pub fn new(participant_count: usize) -> Self {
        Self {
            flags: ParticipantMap::with_value(participant_count, false),
        }
    }

    /// Set the flags of `recipients`. Out-of-range participants are ignored.
    pub fn arm(&mut self, recipients: &Recipients) {
        match recipients {
            Recipients::All => {
                for (_, flag) in self.flags.iter_mut() {
                    *flag = true;
                }
            }
            Recipients::Only(who) => {
                for &participant in who {
                    match self.flags.get_mut(participant) {
                        Some(flag) => *flag = true,
                        None => warn!(%participant, "reset names an unknown participant"),
                    }
                }
            }
        }
    }

    /// Clear one flag. Returns whether it was set.
    pub fn clear(&mut self, participant: ParticipantId) -> bool {
        match self.flags.get_mut(participant) {
            Some(flag) => std::mem::replace(flag, false),
            None => false,
        }
    }

    #[must_use]
    pub fn is_pending(&self, participant: ParticipantId) -> bool {
        self.flags.get(participant).copied().unwrap_or(false)
    }

    /// Whether nobody owes a response.
    #[must_use]
    pub fn all_clear(&self) -> bool {
        self.flags.iter().all(|(_, &flag)| !flag)
    }

    /// Participants that still owe a response, in index order.
    #[must_use]
    pub fn pending(&self) -> Vec<ParticipantId> {
        self.flags
            .iter()
            .filter(|(_, &flag)| flag)
            .map(|(p, _)| p)
            .collect()
    }

    /// Number of flags (always the participant count).
    #[must_use]
    pub fn len(&self) -> usize {
        self.flags.participant_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Barrier helpers shared by the dispatcher, handlers and replicas.
pub struct SynchronizationBarrier;

impl SynchronizationBarrier {
    /// Post a barrier over `event` that every participant must answer.
    pub fn post<I, S>(queue: &mut MoveQueue, event: impl Into<String>, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let barrier = Move::barrier(event, args);
        debug!(barrier = %barrier, "posting barrier");
        queue.push_sequence([Move::ResetConfirmations(Recipients::All), barrier]);
    }

    /// Counter options open to `participant` at the barrier over `event`.
    ///
    /// Empty when the participant has already responded; only a pending
    /// participant may counter.
    #[must_use]
    pub fn reactions(
        registry: &HandlerRegistry,
        state: &EngineState,
        participant: ParticipantId,
        event: &str,
        args: &[String],
    ) -> Vec<Choice> {
        if !state.confirmations.is_pending(participant) {
            return Vec::new();
        }
        let ctx = ReactionContext {
            event,
            args,
            participant,
            state,
        };
        registry.reactions(&ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(i: u8) -> ParticipantId {
        ParticipantId::new(i)
    }

    #[test]
    fn test_new_is_clear() {
        let flags = ConfirmationState::new(3);
        assert_eq!(flags.len(), 3);
        assert!(flags.all_clear());
        assert!(flags.pending().is_empty());
    }

    #[test]
    fn test_arm_all_then_clear() {
        let mut flags = ConfirmationState::new(3);
        flags.arm(&Recipients::All);
        assert_eq!(flags.pending(), vec![p(0), p(1), p(2)]);

        assert!(flags.clear(p(1)));
        assert!(!flags.clear(p(1)));
        assert!(!flags.is_pending(p(1)));
        assert!(!flags.all_clear());

        flags.clear(p(0));
        flags.clear(p(2));
        assert!(flags.all_clear());
    }

    #[test]
    fn test_arm_subset() {
        let mut flags = ConfirmationState::new(3);
        flags.arm(&Recipients::Only(vec![p(2), p(9)]));
        assert_eq!(flags.pending(), vec![p(2)]);
        assert_eq!(flags.len(), 3);
    }

    #[test]
    fn test_clear_out_of_range() {
        let mut flags = ConfirmationState::new(2);
        assert!(!flags.clear(p(7)));
        assert!(!flags.is_pending(p(7)));
    }

    #[test]
    fn test_post_arms_before_waiting() {
        let mut queue = MoveQueue::new();
        queue.push(Move::rule("assault_roll", ["north"]));
        SynchronizationBarrier::post(&mut queue, "assault_declared", ["north", "keep"]);

        let tags: Vec<_> = queue.iter_from_top().map(Move::opcode).collect();
        assert_eq!(tags, ["reset_confirm", "barrier", "assault_roll"]);
    }
}
