//! "Skirmish": a small three-faction game for exercising the engine.
//!
//! - Six spaces on a ring with one chord; each faction has a home space.
//! - Card draw gives every faction two cards (hand limit four).
//! - Diplomacy lets each faction declare peace with one rival; factions at
//!   peace cannot assault each other.
//! - Deployment builds one regular at home or next to an occupied space.
//! - Impulses spend a card to march, assault, play a card or convert a
//!   space, until everyone passes.
//! - Assaults post a barrier so every participant can react; a defender
//!   holding *Ambush* can cancel the assault outright.
//! - Winter discards hands and pays one coin per controlled space.
//! - The first faction to control four spaces wins.
//!
//! Supports any seating of the three factions, including fully automatic.

mod cards;
mod factions;
mod personas;

pub use cards::{Ambush, EventX};
pub use factions::{FactionRules, VictoryRules};
pub use personas::Reformer;

use std::sync::Arc;

use crate::board::{GraphBoard, SpaceId};
use crate::core::{FactionId, GameSetup, ParticipantId, Seating};
use crate::handlers::Handler;

pub const SPEND_CARD: &str = "spend_card";
pub const BUILD_REGULAR: &str = "build_regular";
pub const BUILD_MERCENARY: &str = "build_mercenary";
pub const MARCH: &str = "march";
pub const ASSAULT_DECLARE: &str = "assault_declare";
pub const ASSAULT_ROLL: &str = "assault_roll";
pub const ASSAULT_CASUALTIES: &str = "assault_casualties";
/// Barrier event posted when an assault is declared.
pub const ASSAULT_DECLARED: &str = "assault_declared";
pub const PEACE: &str = "peace";
pub const EVENT_X: &str = "event_x";
pub const AMBUSH: &str = "ambush";
pub const CONVERT: &str = "convert";

/// Most cards a faction may hold.
pub const HAND_LIMIT: i64 = 4;

/// Spaces needed to win.
pub const VICTORY_TARGET: usize = 4;

/// State path holding a faction's hand size.
pub fn hand_path(faction: &FactionId) -> String {
    format!("hand.{faction}")
}

/// State path holding a faction's coins.
pub fn treasury_path(faction: &FactionId) -> String {
    format!("treasury.{faction}")
}

/// State path holding a faction's declared peace partner.
pub fn treaty_path(faction: &FactionId) -> String {
    format!("treaty.{faction}")
}

/// Game definition: board, homes and card holders.
#[derive(Clone, Debug)]
pub struct Skirmish {
    board: Arc<GraphBoard>,
    homes: Vec<(FactionId, SpaceId)>,
}

/// Builder for [`Skirmish`].
#[derive(Clone, Debug)]
pub struct SkirmishBuilder {
    board: GraphBoard,
    homes: Vec<(FactionId, SpaceId)>,
}

impl Default for SkirmishBuilder {
    fn default() -> Self {
        let board = GraphBoard::new()
            .with_edge("harbor", "keep")
            .with_edge("keep", "pass")
            .with_edge("pass", "fort")
            .with_edge("fort", "marsh")
            .with_edge("marsh", "ford")
            .with_edge("ford", "harbor")
            .with_edge("keep", "ford");
        let homes = [("north", "harbor"), ("south", "fort"), ("rebels", "marsh")]
            .into_iter()
            .map(|(f, s)| (FactionId::from(f), SpaceId::from(s)))
            .collect();
        Self { board, homes }
    }
}

impl SkirmishBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the board.
    #[must_use]
    pub fn board(mut self, board: GraphBoard) -> Self {
        self.board = board;
        self
    }

    /// Replace the factions and their homes (impulse order).
    #[must_use]
    pub fn homes(mut self, homes: &[(&str, &str)]) -> Self {
        self.homes = homes
            .iter()
            .map(|&(f, s)| (FactionId::from(f), SpaceId::from(s)))
            .collect();
        self
    }

    pub fn build(self) -> Skirmish {
        Skirmish {
            board: Arc::new(self.board),
            homes: self.homes,
        }
    }
}

impl Skirmish {
    /// The standard three-faction game.
    pub fn standard() -> Self {
        SkirmishBuilder::default().build()
    }

    #[must_use]
    pub fn board(&self) -> &GraphBoard {
        &self.board
    }

    /// Factions in impulse order.
    pub fn factions(&self) -> impl Iterator<Item = &FactionId> {
        self.homes.iter().map(|(f, _)| f)
    }

    /// Home space of `faction`.
    #[must_use]
    pub fn home(&self, faction: &FactionId) -> Option<&SpaceId> {
        self.homes.iter().find(|(f, _)| f == faction).map(|(_, s)| s)
    }

    /// Session shape with the given seats; unseated factions are automatic.
    pub fn setup(&self, participant_count: usize, seats: &[(&str, ParticipantId)]) -> GameSetup {
        let mut seating = Seating::new(self.factions().map(|f| f.as_str().to_string()));
        for &(faction, participant) in seats {
            seating.seat(faction, participant);
        }
        GameSetup::new(participant_count, seating)
    }

    /// Handlers for every faction, card and persona. Register the same list
    /// on every replica.
    ///
    /// The first faction holds *Event X*, the second *Ambush*, and the
    /// third the *Reformer* persona.
    pub fn handlers(&self) -> Vec<Box<dyn Handler>> {
        let mut handlers: Vec<Box<dyn Handler>> = self
            .homes
            .iter()
            .map(|(faction, home)| {
                Box::new(FactionRules::new(faction.clone(), home.clone(), Arc::clone(&self.board))) as Box<dyn Handler>
            })
            .collect();
        handlers.push(Box::new(VictoryRules::new(VICTORY_TARGET)));

        let mut holders = self.homes.iter();
        if let Some((faction, home)) = holders.next() {
            handlers.push(Box::new(EventX::new(faction.clone(), home.clone())));
        }
        if let Some((faction, _)) = holders.next() {
            handlers.push(Box::new(Ambush::new(faction.clone())));
        }
        if let Some((faction, _)) = holders.next() {
            handlers.push(Box::new(Reformer::new(faction.clone())));
        }
        handlers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::handlers::{HandlerOwner, OwnerKind};

    #[test]
    fn test_standard_layout() {
        let game = Skirmish::standard();
        assert_eq!(game.board().spaces().len(), 6);
        assert_eq!(game.home(&"south".into()), Some(&SpaceId::from("fort")));

        let names: Vec<_> = game.factions().map(FactionId::as_str).collect();
        assert_eq!(names, ["north", "south", "rebels"]);
    }

    #[test]
    fn test_setup_seats() {
        let game = Skirmish::standard();
        let setup = game.setup(2, &[("north", ParticipantId::new(0)), ("south", ParticipantId::new(1))]);
        assert_eq!(setup.participant_count, 2);
        assert!(setup.seating.is_automatic(&"rebels".into()));
    }

    #[test]
    #[should_panic(expected = "outside a session")]
    fn test_setup_refuses_absent_controller() {
        Skirmish::standard().setup(2, &[("north", ParticipantId::new(5))]);
    }

    #[test]
    fn test_handler_catalog() {
        let owners: Vec<HandlerOwner> = Skirmish::standard().handlers().iter().map(|h| h.owner()).collect();
        assert_eq!(owners.len(), 7);
        assert_eq!(owners.iter().filter(|o| o.kind == OwnerKind::Faction).count(), 3);
        assert!(owners.contains(&HandlerOwner::card("ambush")));
        assert!(owners.contains(&HandlerOwner::persona("reformer")));
    }

    #[test]
    fn test_custom_homes() {
        let game = SkirmishBuilder::new().homes(&[("east", "keep"), ("west", "ford")]).build();
        assert_eq!(game.factions().count(), 2);
        assert_eq!(game.handlers().len(), 5);
    }
}
