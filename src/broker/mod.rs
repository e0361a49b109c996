//! Decision routing.
//!
//! A decision belongs to whoever controls its faction, following delegated
//! control. Three outcomes:
//!
//! - **Automatic**: nobody controls the faction. Every replica resolves it
//!   identically with the shared random source; nothing is broadcast.
//! - **Local**: this replica's participant is the controller. It is shown
//!   the options and its pick is broadcast as a record.
//! - **Remote**: someone else decides. This replica mutates nothing and
//!   shows a passive wait notice.
//!
//! ## Random draws
//!
//! Automatic resolution draws exactly once when there are two or more
//! options and never otherwise. Human resolution never draws. Option lists
//! come from shared state only, so the draw count for any log prefix is the
//! same on every replica.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{FactionId, GameRng, ParticipantId, Seating};
use crate::moves::{Choice, DecisionRequest};
use crate::present::Notification;

/// Which participant this replica speaks for. The only replica-local input
/// to the engine; it must never influence simulation state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantContext {
    pub local: ParticipantId,
}

impl ParticipantContext {
    #[must_use]
    pub const fn new(local: ParticipantId) -> Self {
        Self { local }
    }

    /// Factions whose decisions land on this replica.
    pub fn controlled<'a>(&self, seating: &'a Seating) -> impl Iterator<Item = &'a FactionId> + 'a {
        seating.factions_of(self.local)
    }

    #[must_use]
    pub fn controls(&self, seating: &Seating, faction: &FactionId) -> bool {
        seating.controller_of(faction) == Some(self.local)
    }
}

/// Who resolves a decision, independent of which replica asks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Automatic,
    Human(ParticipantId),
}

/// Who resolves a decision, from one replica's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Automatic,
    Local,
    Remote(ParticipantId),
}

/// Stateless routing rules.
#[derive(Clone, Copy, Debug, Default)]
pub struct DecisionBroker;

impl DecisionBroker {
    #[must_use]
    pub fn control(&self, seating: &Seating, faction: &FactionId) -> Control {
        match seating.controller_of(faction) {
            Some(participant) => Control::Human(participant),
            None => Control::Automatic,
        }
    }

    #[must_use]
    pub fn route(&self, context: &ParticipantContext, seating: &Seating, faction: &FactionId) -> Route {
        match self.control(seating, faction) {
            Control::Automatic => Route::Automatic,
            Control::Human(p) if p == context.local => Route::Local,
            Control::Human(p) => Route::Remote(p),
        }
    }

    /// Pick an option for an automatic faction.
    ///
    /// Draws once from `rng` when there is a real choice; a single option
    /// is taken without drawing. `None` only when there are no options.
    pub fn auto_resolve(&self, rng: &mut GameRng, options: &[Choice]) -> Option<usize> {
        let index = match options.len() {
            0 => return None,
            1 => 0,
            len => rng.pick(len)?,
        };
        debug!(index, count = options.len(), draws = rng.draws(), "automatic decision");
        Some(index)
    }

    /// What this replica should show while a human decision is pending.
    #[must_use]
    pub fn view(
        &self,
        context: &ParticipantContext,
        request: &DecisionRequest,
        controller: ParticipantId,
        options: &[Choice],
    ) -> Notification {
        if controller == context.local {
            Notification::ShowChoice {
                faction: request.faction.clone(),
                labels: options.iter().map(|c| c.label.clone()).collect(),
            }
        } else {
            Notification::Awaiting {
                faction: request.faction.clone(),
                controller,
            }
        }
    }
}
