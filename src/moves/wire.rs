//! Field encoding for moves.
//!
//! The field list is the replica-compatible form: it is what gets
//! broadcast and what a replay log stores. Decoding is strict for the
//! reserved tags and permissive for everything else (any other tag is a
//! rule opcode with arbitrary arguments).

use thiserror::Error;

use crate::core::{FactionId, ParticipantId, Phase};

use super::{Args, ChoiceDomain, DecisionRequest, Move, Recipients, RuleMove};

pub const PHASE: &str = "phase";
pub const SET: &str = "set";
pub const RESET_CONFIRM: &str = "reset_confirm";
pub const BARRIER: &str = "barrier";
pub const ACK: &str = "ack";
pub const HOLD: &str = "hold";
pub const RELEASE: &str = "release";
pub const DECIDE: &str = "decide";

/// Tags the engine interprets itself.
pub const RESERVED: [&str; 8] = [PHASE, SET, RESET_CONFIRM, BARRIER, ACK, HOLD, RELEASE, DECIDE];

/// Whether `tag` is interpreted by the engine rather than a handler.
#[must_use]
pub fn is_reserved(tag: &str) -> bool {
    RESERVED.contains(&tag)
}

/// Check that every rule move keeps its meaning on the wire.
pub fn check_encodable(moves: &[Move]) -> Result<(), WireError> {
    match moves
        .iter()
        .filter_map(Move::as_rule)
        .find(|rule| rule.opcode.is_empty() || is_reserved(&rule.opcode))
    {
        Some(rule) if rule.opcode.is_empty() => Err(WireError::EmptyOpcode),
        Some(rule) => Err(WireError::ReservedOpcode(rule.opcode.clone())),
        None => Ok(()),
    }
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("move has no fields")]
    Empty,
    #[error("move opcode is empty")]
    EmptyOpcode,
    #[error("rule opcode `{0}` collides with a reserved tag")]
    ReservedOpcode(String),
    #[error("`{tag}` expects {expected} argument(s), found {found}")]
    Arity {
        tag: &'static str,
        expected: &'static str,
        found: usize,
    },
    #[error("unknown phase `{0}`")]
    UnknownPhase(String),
    #[error("unknown choice domain `{0}`")]
    UnknownDomain(String),
    #[error("`{0}` is not a participant index")]
    BadParticipant(String),
    #[error("malformed frame: {0}")]
    Frame(#[from] bincode::Error),
}

impl Move {
    /// Flatten into wire fields.
    #[must_use]
    pub fn to_fields(&self) -> Vec<String> {
        let mut fields = vec![self.opcode().to_string()];
        match self {
            Move::Phase(phase) => fields.push(phase.as_str().to_string()),
            Move::SetPath { path, value } => {
                fields.push(path.clone());
                fields.push(value.clone());
            }
            Move::ResetConfirmations(Recipients::All) => {}
            Move::ResetConfirmations(Recipients::Only(who)) => {
                fields.extend(who.iter().map(ToString::to_string));
            }
            Move::Barrier { event, args } => {
                fields.push(event.clone());
                fields.extend(args.iter().cloned());
            }
            Move::Acknowledge(participant) => fields.push(participant.to_string()),
            Move::Hold { token } | Move::Release { token } => fields.push(token.clone()),
            Move::Decide(req) => {
                fields.push(req.faction.to_string());
                fields.push(req.domain.as_str().to_string());
                fields.push(req.purpose.clone());
                fields.extend(req.args.iter().cloned());
            }
            Move::Rule(rule) => fields.extend(rule.args.iter().cloned()),
        }
        fields
    }

    /// Rebuild a move from wire fields.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Result<Move, WireError> {
        let (tag, rest) = fields.split_first().ok_or(WireError::Empty)?;
        let tag = tag.as_ref();
        let rest: Vec<&str> = rest.iter().map(AsRef::as_ref).collect();

        let mv = match tag {
            "" => return Err(WireError::EmptyOpcode),
            PHASE => {
                let [name] = exact::<1>(PHASE, "1", &rest)?;
                Move::Phase(Phase::parse(name).ok_or_else(|| WireError::UnknownPhase(name.to_string()))?)
            }
            SET => {
                let [path, value] = exact::<2>(SET, "2", &rest)?;
                Move::set(path, value)
            }
            RESET_CONFIRM => {
                if rest.is_empty() {
                    Move::ResetConfirmations(Recipients::All)
                } else {
                    let who = rest
                        .iter()
                        .map(|f| participant(f))
                        .collect::<Result<Vec<_>, _>>()?;
                    Move::ResetConfirmations(Recipients::Only(who))
                }
            }
            BARRIER => {
                let (event, args) = rest.split_first().ok_or(WireError::Arity {
                    tag: BARRIER,
                    expected: "at least 1",
                    found: 0,
                })?;
                Move::barrier(*event, args.iter().copied())
            }
            ACK => {
                let [who] = exact::<1>(ACK, "1", &rest)?;
                Move::Acknowledge(participant(who)?)
            }
            HOLD => {
                let [token] = exact::<1>(HOLD, "1", &rest)?;
                Move::hold(token)
            }
            RELEASE => {
                let [token] = exact::<1>(RELEASE, "1", &rest)?;
                Move::release(token)
            }
            DECIDE => {
                if rest.len() < 3 {
                    return Err(WireError::Arity {
                        tag: DECIDE,
                        expected: "at least 3",
                        found: rest.len(),
                    });
                }
                let domain = ChoiceDomain::parse(rest[1])
                    .ok_or_else(|| WireError::UnknownDomain(rest[1].to_string()))?;
                Move::Decide(DecisionRequest {
                    faction: FactionId::from(rest[0]),
                    domain,
                    purpose: rest[2].to_string(),
                    args: rest[3..].iter().map(|s| s.to_string()).collect::<Args>(),
                })
            }
            opcode => Move::Rule(RuleMove::new(opcode, rest.iter().copied())),
        };
        Ok(mv)
    }
}

fn exact<'a, const N: usize>(
    tag: &'static str,
    expected: &'static str,
    rest: &[&'a str],
) -> Result<[&'a str; N], WireError> {
    <[&str; N]>::try_from(rest).map_err(|_| WireError::Arity {
        tag,
        expected,
        found: rest.len(),
    })
}

fn participant(field: &str) -> Result<ParticipantId, WireError> {
    ParticipantId::parse(field).ok_or_else(|| WireError::BadParticipant(field.to_string()))
}
