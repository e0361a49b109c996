//! Factions and who controls them.
//!
//! A faction is identified on the wire by its name. `Seating` is shared
//! simulation state: it maps factions to the participant that makes their
//! decisions, records delegated (allied) control, and fixes the impulse
//! order. Factions with no controller are automatic.
//!
//! ```
//! use rust_lockstep::core::{FactionId, ParticipantId, Seating};
//!
//! let mut seating = Seating::new(["north", "south", "rebels"]);
//! seating.seat("north", ParticipantId::new(0));
//! seating.seat("south", ParticipantId::new(1));
//!
//! assert_eq!(seating.controller_of(&FactionId::from("north")), Some(ParticipantId::new(0)));
//! assert_eq!(seating.controller_of(&FactionId::from("rebels")), None);
//!
//! // The rebels ally with the south and take its orders.
//! seating.delegate("rebels", "south");
//! assert_eq!(seating.controller_of(&FactionId::from("rebels")), Some(ParticipantId::new(1)));
//! ```

use im::OrdMap;
use serde::{Deserialize, Serialize};

use super::participant::ParticipantId;

/// Faction identifier (its wire name).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FactionId(pub String);

impl FactionId {
    /// Create a faction ID.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The wire name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FactionId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl std::fmt::Display for FactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Faction control table, identical on every replica.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seating {
    order: Vec<FactionId>,
    controllers: OrdMap<FactionId, ParticipantId>,
    delegates: OrdMap<FactionId, FactionId>,
}

impl Seating {
    /// Create a seating with the given factions in impulse order, all automatic.
    pub fn new<I, S>(factions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            order: factions.into_iter().map(|f| FactionId(f.into())).collect(),
            controllers: OrdMap::new(),
            delegates: OrdMap::new(),
        }
    }

    /// Seat a participant as the controller of a faction.
    pub fn seat(&mut self, faction: impl Into<FactionId>, participant: ParticipantId) {
        self.controllers.insert(faction.into(), participant);
    }

    /// Remove a faction's human controller, making it automatic.
    pub fn unseat(&mut self, faction: &FactionId) {
        self.controllers.remove(faction);
    }

    /// Hand a faction's decisions to whoever controls `to`.
    pub fn delegate(&mut self, faction: impl Into<FactionId>, to: impl Into<FactionId>) {
        self.delegates.insert(faction.into(), to.into());
    }

    /// End a delegation.
    pub fn revoke(&mut self, faction: &FactionId) {
        self.delegates.remove(faction);
    }

    /// Factions in impulse order.
    #[must_use]
    pub fn factions(&self) -> &[FactionId] {
        &self.order
    }

    /// Whether the faction is part of this session.
    #[must_use]
    pub fn contains(&self, faction: &FactionId) -> bool {
        self.order.contains(faction)
    }

    /// Resolve the participant that decides for `faction`.
    ///
    /// Delegations are followed until a faction with no further delegate.
    /// A delegation cycle falls back to the faction's own controller.
    #[must_use]
    pub fn controller_of(&self, faction: &FactionId) -> Option<ParticipantId> {
        let mut current = faction;
        let mut hops = 0;
        while let Some(next) = self.delegates.get(current) {
            hops += 1;
            if hops > self.delegates.len() {
                return self.controllers.get(faction).copied();
            }
            current = next;
        }
        self.controllers.get(current).copied()
    }

    /// Factions whose decisions land on `participant` (directly or by delegation).
    pub fn factions_of(&self, participant: ParticipantId) -> impl Iterator<Item = &FactionId> + '_ {
        self.order
            .iter()
            .filter(move |f| self.controller_of(f) == Some(participant))
    }

    /// Whether nobody controls this faction.
    #[must_use]
    pub fn is_automatic(&self, faction: &FactionId) -> bool {
        self.controller_of(faction).is_none()
    }
}

impl From<String> for FactionId {
    fn from(name: String) -> Self {
        Self(name)
    }
}
