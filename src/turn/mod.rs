//! Turn sequencing.
//!
//! Phases are static move lists pushed at phase boundaries. Entering
//! `Round` schedules the round skeleton:
//!
//! ```text
//! phase card_draw → phase diplomacy → phase deployment
//!   → phase action → phase winter → phase victory_check
//! ```
//!
//! and each phase marker in turn schedules its own steps: one per faction
//! for card draw, diplomacy, deployment and winter, then a single
//! `victory_check` and `round_end`. The only branching here is the impulse loop:
//! whoever has not passed acts next, and once everyone has passed the loop
//! simply stops, letting the already-queued `winter` marker run. Rule
//! content for each step lives in game handlers.

use tracing::{debug, info};

use crate::core::{EngineState, FactionId, Phase};
use crate::handlers::{Dispatch, Flow, Handler, HandlerOwner, OwnerKind};
use crate::moves::{Choice, ChoiceDomain, DecisionRequest, Move, RuleMove};

/// Opcode that offers the next unpassed faction its impulse.
pub const IMPULSE: &str = "impulse";
/// Opcode marking a faction as passed for this action phase.
pub const PASS: &str = "pass";
/// Decision purpose for an impulse.
pub const IMPULSE_ACTION: &str = "impulse_action";
/// Closes a round: next round or game over.
pub const ROUND_END: &str = "round_end";

pub const CARD_DRAW: &str = "card_draw";
pub const DIPLOMACY: &str = "diplomacy";
pub const DEPLOYMENT: &str = "deployment";
pub const WINTER: &str = "winter";
pub const VICTORY_CHECK: &str = "victory_check";

/// Phase scaffolding and the impulse loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TurnController {
    max_rounds: u32,
}

impl TurnController {
    #[must_use]
    pub const fn new(max_rounds: u32) -> Self {
        Self { max_rounds }
    }

    #[must_use]
    pub const fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Moves that `phase` schedules on entry, in execution order.
    #[must_use]
    pub fn scaffold(&self, phase: Phase, state: &EngineState) -> Vec<Move> {
        let factions = state.seating.factions();
        let per_faction = |opcode: &str| -> Vec<Move> {
            factions
                .iter()
                .map(|f| Move::rule(opcode, [f.as_str()]))
                .collect()
        };
        match phase {
            Phase::Round => Phase::ROUND.iter().map(|&p| Move::Phase(p)).collect(),
            Phase::CardDraw => per_faction(CARD_DRAW),
            Phase::Diplomacy => per_faction(DIPLOMACY),
            Phase::Deployment => per_faction(DEPLOYMENT),
            Phase::Action => factions
                .first()
                .map(|f| vec![Move::rule(IMPULSE, [f.as_str()])])
                .unwrap_or_default(),
            Phase::Winter => per_faction(WINTER),
            Phase::VictoryCheck => vec![
                Move::rule(VICTORY_CHECK, Vec::<String>::new()),
                Move::rule(ROUND_END, Vec::<String>::new()),
            ],
            Phase::GameOver => Vec::new(),
        }
    }

    /// First faction at or after `from` (cyclically) that has not passed.
    fn next_unpassed(state: &EngineState, from: &FactionId) -> Option<FactionId> {
        let order = state.seating.factions();
        let start = order.iter().position(|f| f == from).unwrap_or(0);
        (0..order.len())
            .map(|offset| &order[(start + offset) % order.len()])
            .find(|f| !state.has_passed(f))
            .cloned()
    }

    fn successor(state: &EngineState, faction: &FactionId) -> Option<FactionId> {
        let order = state.seating.factions();
        let index = order.iter().position(|f| f == faction)?;
        order.get((index + 1) % order.len()).cloned()
    }

    fn impulse(&self, cx: &mut Dispatch<'_>, depth: usize, mv: &RuleMove) -> Flow {
        cx.finish(depth);
        let Some(from) = mv.faction(0) else {
            return Flow::Continue;
        };
        if cx.state.all_passed() {
            info!(round = cx.state.round, "all factions passed");
            return Flow::Continue;
        }
        let Some(actor) = Self::next_unpassed(cx.state, &from) else {
            return Flow::Continue;
        };
        let next = Self::successor(cx.state, &actor).unwrap_or_else(|| actor.clone());
        debug!(faction = %actor, "impulse");
        cx.schedule(vec![
            DecisionRequest::new(actor, ChoiceDomain::Action, IMPULSE_ACTION).into_move(),
            Move::rule(IMPULSE, [next.as_str()]),
        ]);
        Flow::Continue
    }

    fn round_end(&self, cx: &mut Dispatch<'_>, depth: usize) -> Flow {
        cx.finish(depth);
        let over = cx.state.winner.is_some() || cx.state.round >= self.max_rounds;
        let next = if over { Phase::GameOver } else { Phase::Round };
        info!(round = cx.state.round, next = %next, "round over");
        cx.queue.push(Move::Phase(next));
        Flow::Continue
    }
}

impl Handler for TurnController {
    fn owner(&self) -> HandlerOwner {
        HandlerOwner::new(OwnerKind::Engine, "turn")
    }

    fn opcodes(&self) -> &[&'static str] {
        &[IMPULSE, PASS, ROUND_END]
    }

    fn decision_options(&self, request: &DecisionRequest, _state: &EngineState) -> Vec<Choice> {
        if request.purpose != IMPULSE_ACTION {
            return Vec::new();
        }
        vec![Choice::single(PASS, Move::rule(PASS, [request.faction.as_str()]))]
    }

    fn on_popped(&self, cx: &mut Dispatch<'_>, depth: usize, mv: &RuleMove) -> Flow {
        match mv.opcode.as_str() {
            IMPULSE => self.impulse(cx, depth, mv),
            PASS => {
                if let Some(faction) = mv.faction(0) {
                    debug!(%faction, "passed");
                    cx.state.mark_passed(faction);
                }
                cx.finish(depth)
            }
            ROUND_END => self.round_end(cx, depth),
            _ => Flow::Unclaimed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Seating;
    use crate::queue::MoveQueue;

    fn state() -> EngineState {
        EngineState::new(2, Seating::new(["north", "south", "east"]), 1)
    }

    fn tags(moves: &[Move]) -> Vec<String> {
        moves.iter().map(ToString::to_string).collect()
    }

    fn popped(turn: &TurnController, state: &mut EngineState, mv: Move) -> MoveQueue {
        let mut queue: MoveQueue = [mv.clone()].into_iter().collect();
        let mut notes = Vec::new();
        let mut cx = Dispatch::new(state, &mut queue, &mut notes);
        let rule = mv.as_rule().cloned().unwrap();
        assert_eq!(turn.on_popped(&mut cx, 0, &rule), Flow::Continue);
        queue
    }

    #[test]
    fn test_round_scaffold() {
        let turn = TurnController::new(3);
        let moves = turn.scaffold(Phase::Round, &state());
        assert_eq!(
            tags(&moves),
            [
                "phase card_draw",
                "phase diplomacy",
                "phase deployment",
                "phase action",
                "phase winter",
                "phase victory_check"
            ]
        );
    }

    #[test]
    fn test_faction_phase_scaffold() {
        let turn = TurnController::new(3);
        let moves = turn.scaffold(Phase::Deployment, &state());
        assert_eq!(tags(&moves), ["deployment north", "deployment south", "deployment east"]);
        assert_eq!(tags(&turn.scaffold(Phase::Action, &state())), ["impulse north"]);
        assert!(turn.scaffold(Phase::GameOver, &state()).is_empty());
    }

    #[test]
    fn test_impulse_skips_passed() {
        let turn = TurnController::new(3);
        let mut state = state();
        state.mark_passed("north".into());

        let queue = popped(&turn, &mut state, Move::rule(IMPULSE, ["north"]));
        let order: Vec<_> = queue.iter_from_top().map(ToString::to_string).collect();
        assert_eq!(order, ["decide south action impulse_action", "impulse east"]);
    }

    #[test]
    fn test_impulse_stops_when_all_passed() {
        let turn = TurnController::new(3);
        let mut state = state();
        for f in ["north", "south", "east"] {
            state.mark_passed(f.into());
        }
        assert!(popped(&turn, &mut state, Move::rule(IMPULSE, ["south"])).is_empty());
    }

    #[test]
    fn test_pass_marks_faction() {
        let turn = TurnController::new(3);
        let mut state = state();
        let queue = popped(&turn, &mut state, Move::rule(PASS, ["east"]));
        assert!(queue.is_empty());
        assert!(state.has_passed(&"east".into()));
    }

    #[test]
    fn test_round_end() {
        let turn = TurnController::new(2);
        let mut state = state();
        state.round = 1;
        let queue = popped(&turn, &mut state, Move::rule(ROUND_END, Vec::<String>::new()));
        assert_eq!(queue.peek(), Some(&Move::Phase(Phase::Round)));

        state.round = 2;
        let queue = popped(&turn, &mut state, Move::rule(ROUND_END, Vec::<String>::new()));
        assert_eq!(queue.peek(), Some(&Move::Phase(Phase::GameOver)));

        state.round = 1;
        state.winner = Some("north".into());
        let queue = popped(&turn, &mut state, Move::rule(ROUND_END, Vec::<String>::new()));
        assert_eq!(queue.peek(), Some(&Move::Phase(Phase::GameOver)));
    }

    #[test]
    fn test_impulse_offers_pass() {
        let turn = TurnController::new(3);
        let request = DecisionRequest::new("north", ChoiceDomain::Action, IMPULSE_ACTION);
        let options = turn.decision_options(&request, &state());
        assert_eq!(options, vec![Choice::single("pass", Move::rule("pass", ["north"]))]);

        let other = DecisionRequest::new("north", ChoiceDomain::Space, "build");
        assert!(turn.decision_options(&other, &state()).is_empty());
    }
}
