//! One-way notifications for the presentation layer.
//!
//! The engine appends notifications while it runs; the host drains them
//! with [`crate::replica::Replica::drain_notifications`]. Nothing flows
//! back except through a decision or confirmation.

use serde::{Deserialize, Serialize};

use crate::board::SpaceId;
use crate::core::{FactionId, ParticipantId, Phase};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    /// A phase marker was entered.
    PhaseChanged { phase: Phase, round: u32 },

    /// Per-space state changed (occupancy, control, flags).
    SpaceChanged(SpaceId),

    /// The local participant must pick one of these labels.
    ShowChoice { faction: FactionId, labels: Vec<String> },

    /// Someone else owes a decision.
    Awaiting { faction: FactionId, controller: ParticipantId },

    /// The local participant may acknowledge or counter `event`.
    ShowReactions { event: String, labels: Vec<String> },

    /// A barrier is waiting on these participants.
    AwaitingConfirmations { event: String, pending: Vec<ParticipantId> },

    /// Every participant responded; the barrier closed.
    BarrierClosed { event: String },

    /// Free-form status line.
    Status(String),
}
