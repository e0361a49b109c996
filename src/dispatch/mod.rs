//! The command dispatcher.
//!
//! `run` repeatedly peeks the top of the queue and executes it:
//!
//! 1. Built-in moves are matched exhaustively (phase markers, path sets,
//!    confirmation resets, barriers, acknowledgements, holds, releases,
//!    decisions).
//! 2. Rule moves are offered to the [`HandlerRegistry`] in its fixed order;
//!    the first handler to claim one decides whether dispatch continues.
//! 3. Rule moves nobody claims are logged and dropped. Malformed or stale
//!    moves never abort the loop; a fault on one replica must not
//!    desynchronize it from the others.
//!
//! A halted move stays on top. Calling `run` again re-examines it, so
//! halting itself never changes state and replicas may re-run freely.
//!
//! ## Step budget
//!
//! Each `run` dispatches at most `step_budget` moves. A handler that keeps
//! re-pushing work without making progress ends in
//! [`DispatchOutcome::BudgetExhausted`] with the queue intact rather than
//! spinning forever.

use tracing::{debug, info, trace, warn};

use crate::broker::{Control, DecisionBroker};
use crate::core::{EngineConfig, EngineState, ParticipantId};
use crate::handlers::{Claim, Dispatch, Handler, HandlerOwner, HandlerRegistry};
use crate::moves::{Args, DecisionRequest, Move, RuleMove};
use crate::present::Notification;
use crate::queue::MoveQueue;
use crate::turn::TurnController;

/// Why dispatch stopped with work still queued.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Suspension {
    /// A barrier is waiting on these participants.
    Barrier {
        event: String,
        args: Args,
        pending: Vec<ParticipantId>,
    },

    /// A human decision is owed by `controller`.
    Decision {
        request: DecisionRequest,
        controller: ParticipantId,
    },

    /// A hold is waiting for its release.
    Held { token: String },

    /// A handler halted on its own move.
    Handler { owner: HandlerOwner, opcode: String },
}

/// Result of a `run`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The queue is empty.
    Idle,

    /// Waiting on an external event.
    Halted(Suspension),

    /// The step budget ran out; the queue is left as it was.
    BudgetExhausted { steps: usize },
}

impl DispatchOutcome {
    #[must_use]
    pub fn suspension(&self) -> Option<&Suspension> {
        match self {
            DispatchOutcome::Halted(s) => Some(s),
            _ => None,
        }
    }
}

/// Built-ins first, then the first-claiming handler.
#[derive(Debug)]
pub struct CommandDispatcher {
    registry: HandlerRegistry,
    turn: TurnController,
    broker: DecisionBroker,
    step_budget: usize,
}

impl CommandDispatcher {
    /// Create a dispatcher. The turn controller is registered as the
    /// first engine handler.
    pub fn new(config: &EngineConfig) -> Self {
        let turn = TurnController::new(config.max_rounds);
        let mut registry = HandlerRegistry::new();
        registry.register(Box::new(turn));
        Self {
            registry,
            turn,
            broker: DecisionBroker,
            step_budget: config.step_budget,
        }
    }

    /// Register a game handler.
    pub fn register(&mut self, handler: Box<dyn Handler>) {
        self.registry.register(handler);
    }

    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    #[must_use]
    pub fn broker(&self) -> &DecisionBroker {
        &self.broker
    }

    #[must_use]
    pub fn step_budget(&self) -> usize {
        self.step_budget
    }

    /// Dispatch until the queue empties, something halts, or the budget
    /// runs out.
    pub fn run(&self, state: &mut EngineState, queue: &mut MoveQueue, notes: &mut Vec<Notification>) -> DispatchOutcome {
        let mut steps = 0;
        while let Some(top) = queue.peek().cloned() {
            if steps >= self.step_budget {
                warn!(steps, top = %top, "step budget exhausted");
                return DispatchOutcome::BudgetExhausted { steps };
            }
            steps += 1;
            trace!(step = steps, mv = %top, "dispatch");

            if let Some(suspension) = self.step(top, state, queue, notes) {
                debug!(?suspension, steps, "dispatch halted");
                return DispatchOutcome::Halted(suspension);
            }
        }
        DispatchOutcome::Idle
    }

    /// Execute the top move. `None` means keep going.
    fn step(
        &self,
        top: Move,
        state: &mut EngineState,
        queue: &mut MoveQueue,
        notes: &mut Vec<Notification>,
    ) -> Option<Suspension> {
        match top {
            Move::Phase(phase) => {
                queue.pop();
                state.enter_phase(phase);
                info!(%phase, round = state.round, "phase");
                notes.push(Notification::PhaseChanged {
                    phase,
                    round: state.round,
                });
                queue.push_sequence(self.turn.scaffold(phase, state));
                None
            }
            Move::SetPath { path, value } => {
                queue.pop();
                state.set_path(path, value);
                None
            }
            Move::ResetConfirmations(recipients) => {
                queue.pop();
                state.confirmations.arm(&recipients);
                None
            }
            Move::Barrier { event, args } => {
                if state.confirmations.all_clear() {
                    queue.pop();
                    info!(%event, "barrier closed");
                    notes.push(Notification::BarrierClosed { event });
                    None
                } else {
                    Some(Suspension::Barrier {
                        event,
                        args,
                        pending: state.confirmations.pending(),
                    })
                }
            }
            Move::Acknowledge(participant) => {
                queue.pop();
                if !state.confirmations.clear(participant) {
                    debug!(%participant, "acknowledgement with nothing pending");
                }
                None
            }
            Move::Hold { token } => Some(Suspension::Held { token }),
            Move::Release { token } => {
                queue.pop();
                let found = queue.position(|m| matches!(m, Move::Hold { token: t } if *t == token));
                match found {
                    Some(depth) => {
                        queue.remove_at(depth);
                        debug!(%token, depth, "hold released");
                    }
                    None => warn!(%token, "release without a matching hold"),
                }
                None
            }
            Move::Decide(request) => self.decide(request, state, queue),
            Move::Rule(rule) => self.rule(rule, state, queue, notes),
        }
    }

    fn decide(&self, request: DecisionRequest, state: &mut EngineState, queue: &mut MoveQueue) -> Option<Suspension> {
        if !state.seating.contains(&request.faction) {
            warn!(faction = %request.faction, purpose = %request.purpose, "decision for unknown faction dropped");
            queue.pop();
            return None;
        }
        let options = self.registry.decision_options(&request, state);
        if options.is_empty() {
            warn!(faction = %request.faction, purpose = %request.purpose, "decision has no options; dropped");
            queue.pop();
            return None;
        }

        match self.broker.control(&state.seating, &request.faction) {
            Control::Automatic => {
                queue.pop();
                if let Some(index) = self.broker.auto_resolve(&mut state.rng, &options) {
                    let choice = &options[index];
                    debug!(faction = %request.faction, choice = %choice.label, "resolved automatically");
                    queue.push_sequence(choice.moves.clone());
                }
                None
            }
            Control::Human(controller) => Some(Suspension::Decision { request, controller }),
        }
    }

    fn rule(
        &self,
        rule: RuleMove,
        state: &mut EngineState,
        queue: &mut MoveQueue,
        notes: &mut Vec<Notification>,
    ) -> Option<Suspension> {
        let claimed = {
            let mut cx = Dispatch::new(state, queue, notes);
            self.registry.dispatch(&mut cx, 0, &rule)
        };
        match claimed {
            None => {
                warn!(opcode = %rule.opcode, args = ?rule.args, "unknown opcode; skipped");
                queue.pop();
                None
            }
            Some(Claim { halted: false, .. }) => None,
            Some(Claim { owner, halted: true }) => Some(Suspension::Handler {
                owner,
                opcode: rule.opcode,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Phase, Seating};
    use crate::handlers::{Flow, OwnerKind};
    use crate::moves::{Choice, ChoiceDomain, Recipients};

    fn setup(participants: usize) -> (CommandDispatcher, EngineState, MoveQueue, Vec<Notification>) {
        let mut seating = Seating::new(["north", "south", "rebels"]);
        seating.seat("north", ParticipantId::new(0));
        (
            CommandDispatcher::new(&EngineConfig::default().with_step_budget(50)),
            EngineState::new(participants, seating, 9),
            MoveQueue::new(),
            Vec::new(),
        )
    }

    /// Re-pushes its own move forever.
    struct Echo;

    impl Handler for Echo {
        fn owner(&self) -> HandlerOwner {
            HandlerOwner::new(OwnerKind::Card, "echo")
        }

        fn opcodes(&self) -> &[&'static str] {
            &["echo"]
        }

        fn on_popped(&self, cx: &mut Dispatch<'_>, _depth: usize, mv: &RuleMove) -> Flow {
            cx.queue.push(Move::Rule(mv.clone()));
            Flow::Continue
        }
    }

    /// Halts on `wait` until `go` is set, then consumes it.
    struct Gate;

    impl Handler for Gate {
        fn owner(&self) -> HandlerOwner {
            HandlerOwner::new(OwnerKind::Card, "gate")
        }

        fn opcodes(&self) -> &[&'static str] {
            &["wait"]
        }

        fn on_popped(&self, cx: &mut Dispatch<'_>, depth: usize, _mv: &RuleMove) -> Flow {
            if cx.state.path("go").is_none() {
                return Flow::Halt;
            }
            cx.finish(depth)
        }
    }

    /// Offers two build sites.
    struct Sites;

    impl Handler for Sites {
        fn owner(&self) -> HandlerOwner {
            HandlerOwner::faction("builder")
        }

        fn decision_options(&self, request: &DecisionRequest, _state: &EngineState) -> Vec<Choice> {
            ["harbor", "keep"]
                .into_iter()
                .map(|s| Choice::single(s, Move::set(format!("built.{}", request.faction), s)))
                .collect()
        }
    }

    #[test]
    fn test_empty_queue_is_idle() {
        let (dispatcher, mut state, mut queue, mut notes) = setup(1);
        assert_eq!(dispatcher.run(&mut state, &mut queue, &mut notes), DispatchOutcome::Idle);
    }

    #[test]
    fn test_unknown_opcode_is_noop() {
        let (dispatcher, mut state, mut queue, mut notes) = setup(1);
        let before = state.clone();
        queue.push_sequence([Move::rule("no_such_rule", ["north"]), Move::set("after", "1")]);

        assert_eq!(dispatcher.run(&mut state, &mut queue, &mut notes), DispatchOutcome::Idle);
        assert_eq!(state.path("after"), Some("1"));
        state.clear_path("after");
        assert_eq!(state, before);
    }

    #[test]
    fn test_budget_exhausted_leaves_queue() {
        let (mut dispatcher, mut state, mut queue, mut notes) = setup(1);
        dispatcher.register(Box::new(Echo));
        queue.push(Move::rule("echo", ["north"]));

        let outcome = dispatcher.run(&mut state, &mut queue, &mut notes);
        assert_eq!(outcome, DispatchOutcome::BudgetExhausted { steps: 50 });
        assert!(queue.peek().unwrap().is_rule("echo"));
    }

    #[test]
    fn test_phase_marker_schedules_steps() {
        let (dispatcher, mut state, mut queue, mut notes) = setup(1);
        queue.push(Move::Phase(Phase::Winter));
        dispatcher.run(&mut state, &mut queue, &mut notes);

        assert_eq!(state.phase, Phase::Winter);
        assert_eq!(
            notes.first(),
            Some(&Notification::PhaseChanged {
                phase: Phase::Winter,
                round: 0
            })
        );
    }

    #[test]
    fn test_hold_until_release() {
        let (dispatcher, mut state, mut queue, mut notes) = setup(1);
        queue.push_sequence([Move::hold("setup"), Move::set("done", "yes")]);

        let outcome = dispatcher.run(&mut state, &mut queue, &mut notes);
        assert_eq!(outcome, DispatchOutcome::Halted(Suspension::Held { token: "setup".into() }));
        assert_eq!(dispatcher.run(&mut state, &mut queue, &mut notes), outcome);

        queue.push(Move::release("setup"));
        assert_eq!(dispatcher.run(&mut state, &mut queue, &mut notes), DispatchOutcome::Idle);
        assert_eq!(state.path("done"), Some("yes"));
    }

    #[test]
    fn test_release_without_hold_is_noop() {
        let (dispatcher, mut state, mut queue, mut notes) = setup(1);
        queue.push(Move::release("nothing"));
        assert_eq!(dispatcher.run(&mut state, &mut queue, &mut notes), DispatchOutcome::Idle);
    }

    #[test]
    fn test_barrier_waits_for_everyone() {
        let (dispatcher, mut state, mut queue, mut notes) = setup(2);
        queue.push_sequence([Move::ResetConfirmations(Recipients::All), Move::barrier("event_x", ["north"])]);

        let outcome = dispatcher.run(&mut state, &mut queue, &mut notes);
        assert!(matches!(
            outcome,
            DispatchOutcome::Halted(Suspension::Barrier { ref pending, .. }) if pending.len() == 2
        ));

        queue.push(Move::Acknowledge(ParticipantId::new(1)));
        assert!(matches!(dispatcher.run(&mut state, &mut queue, &mut notes), DispatchOutcome::Halted(_)));

        queue.push(Move::Acknowledge(ParticipantId::new(0)));
        assert_eq!(dispatcher.run(&mut state, &mut queue, &mut notes), DispatchOutcome::Idle);
        assert!(notes.contains(&Notification::BarrierClosed { event: "event_x".into() }));
    }

    #[test]
    fn test_human_decision_halts_without_mutation() {
        let (mut dispatcher, mut state, mut queue, mut notes) = setup(1);
        dispatcher.register(Box::new(Sites));
        queue.push(DecisionRequest::new("north", ChoiceDomain::Space, "build").into_move());
        let before = (state.clone(), queue.clone());

        let outcome = dispatcher.run(&mut state, &mut queue, &mut notes);
        assert!(matches!(
            outcome,
            DispatchOutcome::Halted(Suspension::Decision { controller, .. }) if controller == ParticipantId::new(0)
        ));
        assert_eq!((state, queue), before);
    }

    #[test]
    fn test_automatic_decision_draws_once() {
        let (mut dispatcher, mut state, mut queue, mut notes) = setup(1);
        dispatcher.register(Box::new(Sites));
        queue.push(DecisionRequest::new("rebels", ChoiceDomain::Space, "build").into_move());

        assert_eq!(dispatcher.run(&mut state, &mut queue, &mut notes), DispatchOutcome::Idle);
        assert_eq!(state.rng.draws(), 1);
        assert!(matches!(state.path("built.rebels"), Some("harbor" | "keep")));
    }

    #[test]
    fn test_decision_without_options_dropped() {
        let (dispatcher, mut state, mut queue, mut notes) = setup(1);
        queue.push(DecisionRequest::new("north", ChoiceDomain::Space, "build").into_move());
        queue.push(DecisionRequest::new("atlantis", ChoiceDomain::Space, "build").into_move());

        assert_eq!(dispatcher.run(&mut state, &mut queue, &mut notes), DispatchOutcome::Idle);
        assert_eq!(state.rng.draws(), 0);
    }

    #[test]
    fn test_handler_halt_keeps_move_on_top() {
        let (mut dispatcher, mut state, mut queue, mut notes) = setup(1);
        dispatcher.register(Box::new(Gate));
        queue.push_sequence([Move::rule("wait", ["north"]), Move::set("after", "1")]);

        assert_eq!(
            dispatcher.run(&mut state, &mut queue, &mut notes),
            DispatchOutcome::Halted(Suspension::Handler {
                owner: HandlerOwner::card("gate"),
                opcode: "wait".into(),
            })
        );
        assert!(queue.peek().unwrap().is_rule("wait"));
        assert_eq!(state.path("after"), None);

        state.set_path("go", "1");
        assert_eq!(dispatcher.run(&mut state, &mut queue, &mut notes), DispatchOutcome::Idle);
        assert_eq!(state.path("after"), Some("1"));
    }
}
