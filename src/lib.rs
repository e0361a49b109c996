//! # rust-lockstep
//!
//! A deterministic, resumable move-queue engine for lockstep multi-faction
//! strategy games.
//!
//! Every replica runs the same engine over the same ordered stream of move
//! records and ends up with bit-identical state. Nothing but those records
//! crosses the wire.
//!
//! ## Design Principles
//!
//! 1. **One Queue**: All game progress is a LIFO queue of [`Move`]s. Phases,
//!    decisions, barriers and rule steps are moves; pushing `[a, b, c]` runs
//!    `a`, then `b`, then `c`.
//!
//! 2. **Determinism First**: Handlers read only [`EngineState`]. Automatic
//!    decisions draw from the shared [`GameRng`]; human decisions never do.
//!
//! 3. **Suspend, Don't Block**: Dispatch stops at barriers, human decisions
//!    and holds, and picks up from the same queue when the matching record
//!    arrives.
//!
//! 4. **Refuse Before Mutating**: A record that does not fit the local
//!    queue is rejected with an [`EngineError`] and changes nothing.
//!
//! ## Modules
//!
//! - `core`: Participants, factions and seating, phases, RNG, config, state
//! - `moves`: The `Move` type, decision requests and the wire format
//! - `queue`: The move queue and its splice primitives
//! - `board`: Read-only board topology and per-space state
//! - `barrier`: Confirmation flags and barrier posting
//! - `handlers`: The handler capability trait and registry
//! - `broker`: Decision routing (automatic, local or remote)
//! - `turn`: Phase scaffolding and the impulse loop
//! - `dispatch`: The dispatch loop
//! - `replica`: Per-participant facade, move records and replay
//! - `present`: One-way notifications for a presentation layer
//! - `games`: Sample game catalogs

pub mod core;
pub mod moves;
pub mod queue;
pub mod board;
pub mod barrier;
pub mod handlers;
pub mod broker;
pub mod turn;
pub mod dispatch;
pub mod replica;
pub mod present;
pub mod games;

// Re-export commonly used types
pub use crate::core::{
    ParticipantId, ParticipantMap,
    FactionId, Seating,
    Phase, GameRng, GameRngState,
    ConfigError, EngineConfig, GameSetup,
    EngineState,
};

pub use crate::moves::{Move, RuleMove, Recipients, Choice, ChoiceDomain, DecisionRequest, WireError};

pub use crate::queue::MoveQueue;

pub use crate::board::{Board, GraphBoard, SpaceId, SpaceState};

pub use crate::barrier::{ConfirmationState, SynchronizationBarrier};

pub use crate::handlers::{
    Handler, HandlerOwner, OwnerKind, HandlerRegistry,
    Dispatch, Flow, ReactionContext,
};

pub use crate::broker::{DecisionBroker, ParticipantContext, Control, Route};

pub use crate::turn::TurnController;

pub use crate::dispatch::{CommandDispatcher, DispatchOutcome, Suspension};

pub use crate::replica::{Replica, Status, MoveRecord, RecordKind, EngineError};

pub use crate::present::Notification;
