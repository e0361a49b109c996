//! Handler registry.
//!
//! Handlers are registered once at setup and live for the session. Order
//! is fixed at registration: by owner kind (engine, factions, cards,
//! personas), then by registration sequence within a kind. Every query
//! walks handlers in that order, so results are identical on every
//! replica that registered the same handlers in the same order.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::core::EngineState;
use crate::moves::{wire, Choice, DecisionRequest, RuleMove};

use super::{Dispatch, Flow, Handler, HandlerOwner, ReactionContext};

/// A handler took a rule move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Claim {
    pub owner: HandlerOwner,

    /// The handler returned [`Flow::Halt`].
    pub halted: bool,
}

struct Entry {
    owner: HandlerOwner,
    seq: usize,
    handler: Box<dyn Handler>,
}

/// Ordered set of handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    /// Sorted by (owner kind, registration sequence).
    entries: Vec<Entry>,

    /// Opcode → positions in `entries`, ascending.
    by_opcode: FxHashMap<&'static str, Vec<usize>>,

    /// Positions of handlers that declared no opcodes.
    wildcards: Vec<usize>,

    next_seq: usize,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler.
    ///
    /// Several handlers may list the same opcode (one per faction, say);
    /// at dispatch time the first in order that claims a move wins.
    pub fn register(&mut self, handler: Box<dyn Handler>) {
        let owner = handler.owner();
        if let Some(tag) = handler.opcodes().iter().find(|op| wire::is_reserved(op)) {
            panic!("{owner} declares reserved opcode `{tag}`");
        }
        debug!(%owner, opcodes = ?handler.opcodes(), "handler registered");
        self.entries.push(Entry {
            owner,
            seq: self.next_seq,
            handler,
        });
        self.next_seq += 1;
        self.entries
            .sort_by(|a, b| a.owner.kind.cmp(&b.owner.kind).then(a.seq.cmp(&b.seq)));
        self.reindex();
    }

    /// Register a handler (builder pattern).
    #[must_use]
    pub fn with(mut self, handler: impl Handler + 'static) -> Self {
        self.register(Box::new(handler));
        self
    }

    fn reindex(&mut self) {
        self.by_opcode.clear();
        self.wildcards.clear();
        for (position, entry) in self.entries.iter().enumerate() {
            let opcodes = entry.handler.opcodes();
            if opcodes.is_empty() {
                self.wildcards.push(position);
            }
            for &opcode in opcodes {
                self.by_opcode.entry(opcode).or_default().push(position);
            }
        }
    }

    /// Positions to offer `opcode` to, in dispatch order.
    fn candidates(&self, opcode: &str) -> Vec<usize> {
        let mut positions = self.wildcards.clone();
        if let Some(indexed) = self.by_opcode.get(opcode) {
            positions.extend_from_slice(indexed);
        }
        positions.sort_unstable();
        positions
    }

    /// Offer a rule move to each candidate handler until one claims it.
    ///
    /// Returns the claim, or `None` if nobody claimed it.
    pub fn dispatch(&self, cx: &mut Dispatch<'_>, depth: usize, mv: &RuleMove) -> Option<Claim> {
        for position in self.candidates(&mv.opcode) {
            let entry = &self.entries[position];
            let halted = match entry.handler.on_popped(cx, depth, mv) {
                Flow::Unclaimed => continue,
                Flow::Continue => false,
                Flow::Halt => true,
            };
            return Some(Claim {
                owner: entry.owner.clone(),
                halted,
            });
        }
        None
    }

    /// Counter options for a barrier, in registry order.
    pub fn reactions(&self, ctx: &ReactionContext<'_>) -> Vec<Choice> {
        self.entries
            .iter()
            .filter(|e| e.handler.can_trigger(ctx))
            .filter_map(|e| e.handler.menu_option(ctx))
            .collect()
    }

    /// Options for a decision, concatenated in registry order.
    pub fn decision_options(&self, request: &DecisionRequest, state: &EngineState) -> Vec<Choice> {
        self.entries
            .iter()
            .flat_map(|e| e.handler.decision_options(request, state))
            .collect()
    }

    /// Owners in dispatch order.
    pub fn owners(&self) -> impl Iterator<Item = &HandlerOwner> {
        self.entries.iter().map(|e| &e.owner)
    }

    /// Get total handler count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("owners", &self.owners().collect::<Vec<_>>())
            .finish()
    }
}
