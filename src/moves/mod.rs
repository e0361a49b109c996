//! Moves: the unit of execution and synchronization.
//!
//! A move is an opcode plus ordered string arguments. The engine's own
//! opcodes are enum variants so the dispatcher can match them
//! exhaustively; everything else is a [`RuleMove`] claimed by a registered
//! handler.
//!
//! ## Wire form
//!
//! Every move flattens to a list of UTF-8 fields, field 0 being the opcode
//! tag (see [`wire`]). The reserved tags are `phase`, `set`,
//! `reset_confirm`, `barrier`, `ack`, `hold`, `release` and `decide`.
//!
//! ```
//! use rust_lockstep::moves::Move;
//!
//! let mv = Move::rule("build_regular", ["north", "harbor"]);
//! assert_eq!(mv.opcode(), "build_regular");
//! assert_eq!(mv.to_fields(), vec!["build_regular", "north", "harbor"]);
//! ```

mod choice;
pub mod wire;

pub use choice::{Choice, ChoiceDomain, DecisionRequest};
pub use wire::WireError;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{FactionId, ParticipantId, Phase};

/// Argument storage. Most moves carry at most four arguments.
pub type Args = SmallVec<[String; 4]>;

/// Collect anything string-like into [`Args`].
pub fn args<I, S>(items: I) -> Args
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

/// Which participants a confirmation reset re-arms.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipients {
    All,
    Only(Vec<ParticipantId>),
}

/// A single instruction on the move queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    /// Phase boundary marker.
    Phase(Phase),

    /// Engine-level bookkeeping: set `path` to `value`.
    SetPath { path: String, value: String },

    /// Re-arm confirmation flags.
    ResetConfirmations(Recipients),

    /// Synchronization barrier over a visible game event.
    Barrier { event: String, args: Args },

    /// A participant acknowledges the barrier on top of the queue.
    Acknowledge(ParticipantId),

    /// Halt without consuming until a matching release.
    Hold { token: String },

    /// Remove the first hold carrying `token`.
    Release { token: String },

    /// A choice owed by whoever controls a faction.
    Decide(DecisionRequest),

    /// Game-rule opcode claimed by a registered handler.
    Rule(RuleMove),
}

impl Move {
    /// Build a rule move. `opcode` must not be one of the reserved tags.
    pub fn rule<I, S>(opcode: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Move::Rule(RuleMove::new(opcode, arguments))
    }

    /// Build a barrier over `event`.
    pub fn barrier<I, S>(event: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Move::Barrier {
            event: event.into(),
            args: args(arguments),
        }
    }

    /// Build a state-path set.
    pub fn set(path: impl Into<String>, value: impl Into<String>) -> Self {
        Move::SetPath {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Build a hold.
    pub fn hold(token: impl Into<String>) -> Self {
        Move::Hold { token: token.into() }
    }

    /// Build a release.
    pub fn release(token: impl Into<String>) -> Self {
        Move::Release { token: token.into() }
    }

    /// The opcode tag (field 0 of the wire form).
    #[must_use]
    pub fn opcode(&self) -> &str {
        match self {
            Move::Phase(_) => wire::PHASE,
            Move::SetPath { .. } => wire::SET,
            Move::ResetConfirmations(_) => wire::RESET_CONFIRM,
            Move::Barrier { .. } => wire::BARRIER,
            Move::Acknowledge(_) => wire::ACK,
            Move::Hold { .. } => wire::HOLD,
            Move::Release { .. } => wire::RELEASE,
            Move::Decide(_) => wire::DECIDE,
            Move::Rule(rule) => &rule.opcode,
        }
    }

    /// The rule payload, if this is a rule move.
    #[must_use]
    pub fn as_rule(&self) -> Option<&RuleMove> {
        match self {
            Move::Rule(rule) => Some(rule),
            _ => None,
        }
    }

    /// Whether this is a rule move with the given opcode.
    #[must_use]
    pub fn is_rule(&self, opcode: &str) -> bool {
        matches!(self, Move::Rule(rule) if rule.opcode == opcode)
    }

    /// Stamp the sender on rule moves; built-ins carry no origin.
    #[must_use]
    pub fn with_origin(self, origin: ParticipantId) -> Self {
        match self {
            Move::Rule(rule) => Move::Rule(rule.with_origin(origin)),
            other => other,
        }
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_fields().join(" "))
    }
}

/// A game-rule move: opcode, arguments, and the participant that sent it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMove {
    pub opcode: String,
    pub args: Args,

    /// Sender, stamped when the move arrives in a broadcast record.
    /// `None` for moves the engine produced itself.
    pub origin: Option<ParticipantId>,
}

impl RuleMove {
    pub fn new<I, S>(opcode: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let opcode = opcode.into();
        debug_assert!(!wire::is_reserved(&opcode), "`{opcode}` is a reserved move tag");
        Self {
            opcode,
            args: args(arguments),
            origin: None,
        }
    }

    #[must_use]
    pub fn with_origin(mut self, origin: ParticipantId) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Argument `index`, if present.
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Argument `index` read as a faction name.
    #[must_use]
    pub fn faction(&self, index: usize) -> Option<FactionId> {
        self.arg(index).map(FactionId::from)
    }

    /// Argument `index` parsed as an integer.
    #[must_use]
    pub fn int(&self, index: usize) -> Option<i64> {
        self.arg(index).and_then(|a| a.parse().ok())
    }
}
