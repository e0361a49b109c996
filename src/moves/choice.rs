//! Decision requests and the choices that answer them.

use serde::{Deserialize, Serialize};

use crate::core::FactionId;

use super::{Args, Move};

/// What kind of thing a decision picks from. Informs presentation and lets
/// handlers decide whether they supply options for a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoiceDomain {
    Space,
    Unit,
    Card,
    Faction,
    /// Free-form action menu (an impulse, a diplomacy offer).
    Action,
}

impl ChoiceDomain {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ChoiceDomain::Space => "space",
            ChoiceDomain::Unit => "unit",
            ChoiceDomain::Card => "card",
            ChoiceDomain::Faction => "faction",
            ChoiceDomain::Action => "action",
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "space" => ChoiceDomain::Space,
            "unit" => ChoiceDomain::Unit,
            "card" => ChoiceDomain::Card,
            "faction" => ChoiceDomain::Faction,
            "action" => ChoiceDomain::Action,
            _ => return None,
        })
    }
}

/// A choice owed by the controller of `faction`.
///
/// `purpose` names what the choice is for (usually the opcode the chosen
/// moves will carry); handlers match on it to supply options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub faction: FactionId,
    pub domain: ChoiceDomain,
    pub purpose: String,
    pub args: Args,
}

impl DecisionRequest {
    pub fn new(faction: impl Into<FactionId>, domain: ChoiceDomain, purpose: impl Into<String>) -> Self {
        Self {
            faction: faction.into(),
            domain,
            purpose: purpose.into(),
            args: Args::new(),
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = super::args(arguments);
        self
    }

    /// Wrap as a queue move.
    #[must_use]
    pub fn into_move(self) -> Move {
        Move::Decide(self)
    }
}

/// One selectable option: a label for presentation and the concrete moves
/// that run, in order, if it is picked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub moves: Vec<Move>,
}

impl Choice {
    pub fn new(label: impl Into<String>, moves: Vec<Move>) -> Self {
        Self {
            label: label.into(),
            moves,
        }
    }

    /// A choice consisting of a single move.
    pub fn single(label: impl Into<String>, mv: Move) -> Self {
        Self::new(label, vec![mv])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_names() {
        for domain in [
            ChoiceDomain::Space,
            ChoiceDomain::Unit,
            ChoiceDomain::Card,
            ChoiceDomain::Faction,
            ChoiceDomain::Action,
        ] {
            assert_eq!(ChoiceDomain::parse(domain.as_str()), Some(domain));
        }
        assert_eq!(ChoiceDomain::parse("weather"), None);
    }

    #[test]
    fn test_request_builder() {
        let req = DecisionRequest::new("north", ChoiceDomain::Space, "build").with_args(["regular"]);
        assert_eq!(req.faction, FactionId::from("north"));
        assert_eq!(req.args.as_slice(), ["regular".to_string()]);
        assert!(matches!(req.into_move(), Move::Decide(_)));
    }
}
