//! Pluggable rule handlers.
//!
//! Every card, persona and faction contributes one [`Handler`]. The
//! dispatcher offers it rule moves; barriers ask it for counters; decisions
//! ask it for options. All hooks default to doing nothing, so a handler
//! implements only what its entity needs.
//!
//! ## Implementation Notes
//!
//! - `on_popped`: return [`Flow::Unclaimed`] for moves you don't handle.
//!   A claimed move must remove itself (usually via [`Dispatch::finish`])
//!   unless it halts.
//! - Everything a handler reads must come from the [`EngineState`] it is
//!   handed; no replica-local data may influence a result.
//! - Option lists must be built in a stable order. Automatic factions
//!   index into them with the shared random source.

mod registry;

pub use registry::{Claim, HandlerRegistry};

use serde::{Deserialize, Serialize};

use crate::barrier::SynchronizationBarrier;
use crate::core::{EngineState, ParticipantId};
use crate::moves::{Choice, DecisionRequest, Move, RuleMove};
use crate::present::Notification;
use crate::queue::MoveQueue;

/// What kind of entity owns a handler. Dispatch order follows this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OwnerKind {
    /// Engine-internal handlers (turn sequencing).
    Engine,
    Faction,
    Card,
    Persona,
}

/// Identity of a handler's owning entity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HandlerOwner {
    pub kind: OwnerKind,
    pub id: String,
}

impl HandlerOwner {
    pub fn new(kind: OwnerKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }

    pub fn faction(id: impl Into<String>) -> Self {
        Self::new(OwnerKind::Faction, id)
    }

    pub fn card(id: impl Into<String>) -> Self {
        Self::new(OwnerKind::Card, id)
    }

    pub fn persona(id: impl Into<String>) -> Self {
        Self::new(OwnerKind::Persona, id)
    }
}

impl std::fmt::Display for HandlerOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self.kind, self.id)
    }
}

/// Result of offering a move to a handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Not mine; offer it to the next handler.
    Unclaimed,

    /// Handled; the dispatcher re-peeks the top.
    Continue,

    /// Handled, but dispatch stops here until an external event.
    Halt,
}

/// Mutable view handed to [`Handler::on_popped`].
pub struct Dispatch<'a> {
    pub state: &'a mut EngineState,
    pub queue: &'a mut MoveQueue,
    notes: &'a mut Vec<Notification>,
}

impl<'a> Dispatch<'a> {
    pub fn new(state: &'a mut EngineState, queue: &'a mut MoveQueue, notes: &'a mut Vec<Notification>) -> Self {
        Self { state, queue, notes }
    }

    /// Send a one-way notification to the presentation layer.
    pub fn notify(&mut self, note: Notification) {
        self.notes.push(note);
    }

    /// Remove the move at `depth` and keep dispatching.
    pub fn finish(&mut self, depth: usize) -> Flow {
        self.queue.remove_at(depth);
        Flow::Continue
    }

    /// Schedule moves to run next, in the given order.
    pub fn schedule(&mut self, moves: Vec<Move>) {
        self.queue.push_sequence(moves);
    }

    /// Schedule a decision for the controller of its faction.
    pub fn decide(&mut self, request: DecisionRequest) {
        self.queue.push(request.into_move());
    }

    /// Post a barrier over `event` (see [`SynchronizationBarrier::post`]).
    pub fn post_barrier<I, S>(&mut self, event: impl Into<String>, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SynchronizationBarrier::post(self.queue, event, args);
    }
}

/// Read-only context for barrier reaction queries.
#[derive(Clone, Copy, Debug)]
pub struct ReactionContext<'a> {
    /// The barrier's event name.
    pub event: &'a str,
    pub args: &'a [String],

    /// Whose reactions are being collected.
    pub participant: ParticipantId,
    pub state: &'a EngineState,
}

/// Per-entity capability interface.
pub trait Handler {
    /// The owning entity.
    fn owner(&self) -> HandlerOwner;

    /// Opcodes this handler may claim. Empty means "offer me everything".
    fn opcodes(&self) -> &[&'static str] {
        &[]
    }

    /// Can the event behind `ctx.event` be answered by this entity now?
    fn can_trigger(&self, _ctx: &ReactionContext<'_>) -> bool {
        false
    }

    /// The counter this entity offers at a barrier, when `can_trigger` holds.
    fn menu_option(&self, _ctx: &ReactionContext<'_>) -> Option<Choice> {
        None
    }

    /// Options this entity contributes to a decision.
    fn decision_options(&self, _request: &DecisionRequest, _state: &EngineState) -> Vec<Choice> {
        Vec::new()
    }

    /// Handle the rule move at `depth`.
    fn on_popped(&self, _cx: &mut Dispatch<'_>, _depth: usize, _mv: &RuleMove) -> Flow {
        Flow::Unclaimed
    }
}
