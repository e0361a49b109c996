//! One participant's full copy of the engine.
//!
//! A `Replica` owns the engine state, the move queue and the dispatcher,
//! and speaks for exactly one participant. Replicas never share memory;
//! they converge by applying the same records in the same order.
//!
//! ## Lifecycle
//!
//! 1. `new` with the shared [`GameSetup`], the local participant and the
//!    game's handlers (same handlers, same order, on every replica).
//! 2. `start` schedules the first round and runs until something halts.
//! 3. Inspect [`Replica::status`]. When it asks for local input, call
//!    `choose`, `acknowledge`, `counter` or `release`; each checks the
//!    answer and queues a record in the outbox without applying it.
//! 4. Hand outbox records to the transport and feed every delivered
//!    record to `receive` in delivery order, the replica's own included.
//!    A local record takes effect only when it comes back, so every
//!    replica applies the same records in the same order even when
//!    participants answer a barrier at the same time.
//!
//! Only one local record may be in flight. Until it is delivered, further
//! local actions are refused with [`EngineError::AwaitingDelivery`].
//!
//! After [`Status::BudgetExhausted`], `receive` runs the queue once more
//! before looking at the record. If the budget runs out again the record
//! is refused with [`EngineError::BudgetExhausted`]; call `resume` and
//! deliver it again.
//!
//! ## Validation
//!
//! Every record is checked against the locally recomputed options before
//! anything changes. A refused record returns an [`EngineError`] and leaves
//! state, queue and log exactly as they were.

mod error;
mod record;

pub use error::EngineError;
pub use record::{MoveRecord, RecordKind};

use im::Vector;
use tracing::{debug, info, warn};

use crate::barrier::SynchronizationBarrier;
use crate::broker::{Control, ParticipantContext};
use crate::core::{EngineState, FactionId, GameSetup, ParticipantId, Phase};
use crate::dispatch::{CommandDispatcher, DispatchOutcome, Suspension};
use crate::handlers::{Handler, HandlerOwner};
use crate::moves::{Choice, DecisionRequest, Move};
use crate::present::Notification;
use crate::queue::MoveQueue;

/// What the replica is waiting for, from the local participant's view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// Nothing queued.
    Idle,

    /// The game is over.
    Finished,

    /// A `run` gave up after this many steps; call `resume`.
    BudgetExhausted { steps: usize },

    /// The local participant owes this decision.
    Choose {
        request: DecisionRequest,
        options: Vec<Choice>,
    },

    /// Another participant owes a decision.
    Awaiting {
        faction: FactionId,
        controller: ParticipantId,
    },

    /// The local participant must acknowledge or counter `event`.
    Confirm { event: String, counters: Vec<Choice> },

    /// The local participant has answered; others have not.
    AwaitingConfirmations {
        event: String,
        pending: Vec<ParticipantId>,
    },

    /// A hold is waiting for its release.
    Held { token: String },

    /// A handler halted on its own move.
    Blocked { owner: HandlerOwner, opcode: String },
}

pub struct Replica {
    state: EngineState,
    queue: MoveQueue,
    dispatcher: CommandDispatcher,
    context: ParticipantContext,
    outcome: DispatchOutcome,
    log: Vector<MoveRecord>,
    outbox: Vec<MoveRecord>,
    notes: Vec<Notification>,
    next_seq: u64,

    /// Sequence number of the local record awaiting delivery.
    in_flight: Option<u64>,
}

impl Replica {
    /// Create a replica for `local`.
    pub fn new<I>(setup: &GameSetup, local: ParticipantId, handlers: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn Handler>>,
    {
        assert!(
            local.index() < setup.participant_count,
            "Local participant must be part of the session"
        );
        setup.assert_seats_in_session();

        let mut dispatcher = CommandDispatcher::new(&setup.config);
        for handler in handlers {
            dispatcher.register(handler);
        }

        Self {
            state: EngineState::new(setup.participant_count, setup.seating.clone(), setup.config.seed),
            queue: MoveQueue::new(),
            dispatcher,
            context: ParticipantContext::new(local),
            outcome: DispatchOutcome::Idle,
            log: Vector::new(),
            outbox: Vec::new(),
            notes: Vec::new(),
            next_seq: 0,
            in_flight: None,
        }
    }

    /// Schedule the first round and run.
    pub fn start(&mut self) -> Status {
        self.start_with(vec![Move::Phase(Phase::Round)])
    }

    /// Schedule `moves` (in execution order) and run.
    ///
    /// Setup only: every replica must start with the same moves.
    pub fn start_with(&mut self, moves: Vec<Move>) -> Status {
        info!(local = %self.context.local, count = moves.len(), "replica starting");
        self.queue.push_sequence(moves);
        self.run();
        self.status()
    }

    /// Run again after a budget exhaustion or a handler halt.
    pub fn resume(&mut self) -> Status {
        self.run();
        self.status()
    }

    // === Accessors ===

    #[must_use]
    pub fn local(&self) -> ParticipantId {
        self.context.local
    }

    #[must_use]
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    #[must_use]
    pub fn queue(&self) -> &MoveQueue {
        &self.queue
    }

    #[must_use]
    pub fn outcome(&self) -> &DispatchOutcome {
        &self.outcome
    }

    /// Every record applied so far, in application order.
    #[must_use]
    pub fn log(&self) -> &Vector<MoveRecord> {
        &self.log
    }

    /// Sequence number of the local record sent but not yet delivered.
    #[must_use]
    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    /// Records produced locally since the last drain.
    pub fn drain_outbox(&mut self) -> Vec<MoveRecord> {
        std::mem::take(&mut self.outbox)
    }

    /// Notifications since the last drain.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notes)
    }

    /// Deterministic encoding of state and queue. Equal on every replica
    /// that applied the same records.
    pub fn snapshot(&self) -> Result<Vec<u8>, EngineError> {
        Ok(bincode::serialize(&(&self.state, &self.queue))?)
    }

    // === Status ===

    /// What the replica is waiting for.
    #[must_use]
    pub fn status(&self) -> Status {
        match &self.outcome {
            DispatchOutcome::Idle if self.state.finished => Status::Finished,
            DispatchOutcome::Idle => Status::Idle,
            DispatchOutcome::BudgetExhausted { steps } => Status::BudgetExhausted { steps: *steps },
            DispatchOutcome::Halted(suspension) => self.suspension_status(suspension),
        }
    }

    fn suspension_status(&self, suspension: &Suspension) -> Status {
        match suspension {
            Suspension::Decision { request, controller } if *controller == self.context.local => Status::Choose {
                request: request.clone(),
                options: self.dispatcher.registry().decision_options(request, &self.state),
            },
            Suspension::Decision { request, controller } => Status::Awaiting {
                faction: request.faction.clone(),
                controller: *controller,
            },
            Suspension::Barrier { event, args, .. } if self.state.confirmations.is_pending(self.context.local) => {
                Status::Confirm {
                    event: event.clone(),
                    counters: self.counters_for(self.context.local, event, args),
                }
            }
            Suspension::Barrier { event, pending, .. } => Status::AwaitingConfirmations {
                event: event.clone(),
                pending: pending.clone(),
            },
            Suspension::Held { token } => Status::Held { token: token.clone() },
            Suspension::Handler { owner, opcode } => Status::Blocked {
                owner: owner.clone(),
                opcode: opcode.clone(),
            },
        }
    }

    fn counters_for(&self, participant: ParticipantId, event: &str, args: &[String]) -> Vec<Choice> {
        SynchronizationBarrier::reactions(self.dispatcher.registry(), &self.state, participant, event, args)
    }

    // === Local actions ===

    /// Resolve the local decision with option `index`.
    pub fn choose(&mut self, index: usize) -> Result<MoveRecord, EngineError> {
        self.ensure_nothing_in_flight()?;
        let Status::Choose { request, options } = self.status() else {
            return Err(EngineError::NoPendingDecision(self.pending_faction()));
        };
        let choice = options.into_iter().nth(index).ok_or(EngineError::NoSuchOption(index))?;
        debug!(faction = %request.faction, choice = %choice.label, "local decision");
        self.submit(RecordKind::Decision { faction: request.faction }, choice.moves)
    }

    /// Answer the pending barrier without countering.
    pub fn acknowledge(&mut self) -> Result<MoveRecord, EngineError> {
        self.ensure_confirmable()?;
        self.submit(RecordKind::Confirmation, Vec::new())
    }

    /// Answer the pending barrier with counter `index`.
    pub fn counter(&mut self, index: usize) -> Result<MoveRecord, EngineError> {
        let Status::Confirm { counters, .. } = self.ensure_confirmable()? else {
            return Err(EngineError::NoPendingBarrier);
        };
        let choice = counters.into_iter().nth(index).ok_or(EngineError::NoSuchOption(index))?;
        debug!(counter = %choice.label, "local counter");
        self.submit(RecordKind::Confirmation, choice.moves)
    }

    /// Release the hold carrying `token`.
    pub fn release(&mut self, token: impl Into<String>) -> Result<MoveRecord, EngineError> {
        self.ensure_nothing_in_flight()?;
        self.submit(RecordKind::Signal, vec![Move::release(token)])
    }

    fn ensure_nothing_in_flight(&self) -> Result<(), EngineError> {
        match self.in_flight {
            Some(seq) => Err(EngineError::AwaitingDelivery(seq)),
            None => Ok(()),
        }
    }

    fn ensure_confirmable(&self) -> Result<Status, EngineError> {
        self.ensure_nothing_in_flight()?;
        match self.status() {
            status @ Status::Confirm { .. } => Ok(status),
            Status::AwaitingConfirmations { .. } => Err(EngineError::StaleResolution(self.context.local)),
            _ => Err(EngineError::NoPendingBarrier),
        }
    }

    fn pending_faction(&self) -> FactionId {
        match self.queue.peek() {
            Some(Move::Decide(request)) => request.faction.clone(),
            _ => FactionId::new(""),
        }
    }

    fn submit(&mut self, kind: RecordKind, moves: Vec<Move>) -> Result<MoveRecord, EngineError> {
        let record = MoveRecord {
            origin: self.context.local,
            seq: self.next_seq,
            kind,
            moves,
        };
        self.validate(&record)?;
        debug!(record = %record, "record sent");
        self.next_seq += 1;
        self.in_flight = Some(record.seq);
        self.outbox.push(record.clone());
        Ok(record)
    }

    // === Delivery ===

    /// Apply a record delivered by the transport, local records included.
    pub fn receive(&mut self, record: MoveRecord) -> Result<(), EngineError> {
        if let DispatchOutcome::BudgetExhausted { .. } = self.outcome {
            self.run();
            if let DispatchOutcome::BudgetExhausted { steps } = self.outcome {
                return Err(EngineError::BudgetExhausted { steps });
            }
        }
        if record.origin == self.context.local && self.in_flight == Some(record.seq) {
            self.in_flight = None;
        }
        self.apply(record)
    }

    /// Apply a transport frame.
    pub fn receive_frame(&mut self, bytes: &[u8]) -> Result<(), EngineError> {
        let record = MoveRecord::from_frame(bytes)?;
        self.receive(record)
    }

    /// Apply a whole log, in order.
    pub fn replay<'a, I>(&mut self, records: I) -> Result<(), EngineError>
    where
        I: IntoIterator<Item = &'a MoveRecord>,
    {
        for record in records {
            self.receive(record.clone())?;
        }
        Ok(())
    }

    fn apply(&mut self, record: MoveRecord) -> Result<(), EngineError> {
        if record.origin.index() >= self.state.participant_count() {
            return Err(EngineError::UnknownParticipant(record.origin));
        }
        let scheduled = self.validate(&record)?;
        debug!(record = %record, "applying record");

        if matches!(record.kind, RecordKind::Decision { .. }) {
            self.queue.pop();
        }
        self.queue.push_sequence(scheduled);

        if record.origin == self.context.local {
            self.next_seq = self.next_seq.max(record.seq + 1);
        }
        self.log.push_back(record);
        self.run();
        Ok(())
    }

    /// Check a record against the current top and return the moves it
    /// schedules. Must not mutate anything.
    fn validate(&self, record: &MoveRecord) -> Result<Vec<Move>, EngineError> {
        let origin = record.origin;
        let stamped = || record.moves.iter().cloned().map(|m| m.with_origin(origin));

        match &record.kind {
            RecordKind::Decision { faction } => {
                let request = match self.queue.peek() {
                    Some(Move::Decide(request)) if request.faction == *faction => request,
                    _ => return Err(EngineError::NoPendingDecision(faction.clone())),
                };
                if self.dispatcher.broker().control(&self.state.seating, faction) != Control::Human(origin) {
                    return Err(EngineError::NotController {
                        faction: faction.clone(),
                        participant: origin,
                    });
                }
                let options = self.dispatcher.registry().decision_options(request, &self.state);
                if !options.iter().any(|c| c.moves == record.moves) {
                    return Err(EngineError::InvalidChoice);
                }
                Ok(stamped().collect())
            }
            RecordKind::Confirmation => {
                let Some(Move::Barrier { event, args }) = self.queue.peek() else {
                    return Err(EngineError::NoPendingBarrier);
                };
                if !self.state.confirmations.is_pending(origin) {
                    return Err(EngineError::StaleResolution(origin));
                }
                if !record.moves.is_empty() {
                    let counters = self.counters_for(origin, event, args);
                    if !counters.iter().any(|c| c.moves == record.moves) {
                        return Err(EngineError::InvalidChoice);
                    }
                }
                Ok(std::iter::once(Move::Acknowledge(origin)).chain(stamped()).collect())
            }
            RecordKind::Signal => {
                if record.moves.is_empty() || !record.moves.iter().all(|m| matches!(m, Move::Release { .. })) {
                    return Err(EngineError::InvalidSignal);
                }
                Ok(record.moves.clone())
            }
        }
    }

    // === Dispatch ===

    fn run(&mut self) {
        let outcome = self.dispatcher.run(&mut self.state, &mut self.queue, &mut self.notes);
        if outcome != self.outcome {
            self.announce(&outcome);
        }
        if let DispatchOutcome::BudgetExhausted { steps } = outcome {
            warn!(steps, "dispatch stopped by step budget");
        }
        self.outcome = outcome;
    }

    /// Presentation notices for a new halt. Reads state, never writes it.
    fn announce(&mut self, outcome: &DispatchOutcome) {
        let note = match outcome.suspension() {
            Some(Suspension::Decision { request, controller }) => {
                let options = if *controller == self.context.local {
                    self.dispatcher.registry().decision_options(request, &self.state)
                } else {
                    Vec::new()
                };
                self.dispatcher.broker().view(&self.context, request, *controller, &options)
            }
            Some(Suspension::Barrier { event, args, pending }) => {
                if pending.contains(&self.context.local) {
                    let counters = self.counters_for(self.context.local, event, args);
                    Notification::ShowReactions {
                        event: event.clone(),
                        labels: counters.into_iter().map(|c| c.label).collect(),
                    }
                } else {
                    Notification::AwaitingConfirmations {
                        event: event.clone(),
                        pending: pending.clone(),
                    }
                }
            }
            Some(Suspension::Held { token }) => Notification::Status(format!("waiting for release of {token}")),
            Some(Suspension::Handler { owner, opcode }) => Notification::Status(format!("{owner} is resolving {opcode}")),
            None => return,
        };
        self.notes.push(note);
    }
}

impl std::fmt::Debug for Replica {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replica")
            .field("local", &self.context.local)
            .field("phase", &self.state.phase)
            .field("round", &self.state.round)
            .field("queued", &self.queue.len())
            .field("outcome", &self.outcome)
            .finish()
    }
}
