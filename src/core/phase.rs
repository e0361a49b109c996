//! Game phases.
//!
//! A round walks the phases in declaration order from `CardDraw` to
//! `VictoryCheck`. `Round` is the boundary marker that starts the next
//! round; `GameOver` ends the session.

use serde::{Deserialize, Serialize};

/// A phase boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Round boundary. Entering it starts a new round.
    Round,
    CardDraw,
    Diplomacy,
    Deployment,
    Action,
    Winter,
    VictoryCheck,
    GameOver,
}

impl Phase {
    /// The phases of one round, in execution order.
    pub const ROUND: [Phase; 6] = [
        Phase::CardDraw,
        Phase::Diplomacy,
        Phase::Deployment,
        Phase::Action,
        Phase::Winter,
        Phase::VictoryCheck,
    ];

    /// Stable wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::Round => "round",
            Phase::CardDraw => "card_draw",
            Phase::Diplomacy => "diplomacy",
            Phase::Deployment => "deployment",
            Phase::Action => "action",
            Phase::Winter => "winter",
            Phase::VictoryCheck => "victory_check",
            Phase::GameOver => "game_over",
        }
    }

    /// Parse a wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "round" => Phase::Round,
            "card_draw" => Phase::CardDraw,
            "diplomacy" => Phase::Diplomacy,
            "deployment" => Phase::Deployment,
            "action" => Phase::Action,
            "winter" => Phase::Winter,
            "victory_check" => Phase::VictoryCheck,
            "game_over" => Phase::GameOver,
            _ => return None,
        })
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
