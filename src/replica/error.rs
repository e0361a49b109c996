use thiserror::Error;

use crate::core::{FactionId, ParticipantId};
use crate::moves::WireError;

/// A record or local action was refused. Refusal never changes state.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("participant {0} is not part of this session")]
    UnknownParticipant(ParticipantId),

    #[error("no decision is pending for `{0}`")]
    NoPendingDecision(FactionId),

    #[error("participant {participant} does not control `{faction}`")]
    NotController {
        faction: FactionId,
        participant: ParticipantId,
    },

    #[error("option {0} is not on offer")]
    NoSuchOption(usize),

    #[error("moves do not match any option on offer")]
    InvalidChoice,

    #[error("no barrier is pending")]
    NoPendingBarrier,

    #[error("participant {0} has already answered this barrier")]
    StaleResolution(ParticipantId),

    #[error("signal records may only carry releases")]
    InvalidSignal,

    #[error("local record {0} has not been delivered yet")]
    AwaitingDelivery(u64),

    #[error("dispatch stopped after {steps} steps; resume before delivering")]
    BudgetExhausted { steps: usize },

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("snapshot failed: {0}")]
    Snapshot(#[from] bincode::Error),
}
