//! Broadcast records.
//!
//! A record is the only thing replicas exchange: the moves a participant
//! contributed when it resolved a decision, answered a barrier, or
//! released a hold. Records are applied in the order the transport
//! delivers them, which must be the same total order on every replica.
//!
//! On the wire a record is a `bincode` frame whose moves are field lists
//! (see [`crate::moves::wire`]); origins are not framed because the
//! receiving replica stamps them from the record's sender.

use serde::{Deserialize, Serialize};

use crate::core::{FactionId, ParticipantId};
use crate::moves::{wire, Move, WireError};

/// What a record answers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// The sender resolved the pending decision for `faction`.
    Decision { faction: FactionId },

    /// The sender answered the pending barrier; `moves` is empty for a
    /// plain acknowledgement or holds the chosen counter.
    Confirmation,

    /// Releases for pending holds.
    Signal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub origin: ParticipantId,

    /// Per-origin sequence number, starting at 0.
    pub seq: u64,
    pub kind: RecordKind,
    pub moves: Vec<Move>,
}

#[derive(Serialize, Deserialize)]
struct Frame {
    origin: u8,
    seq: u64,
    kind: RecordKind,
    moves: Vec<Vec<String>>,
}

impl MoveRecord {
    /// Encode for the transport. Refuses rule moves whose opcode would
    /// decode as a built-in.
    pub fn frame(&self) -> Result<Vec<u8>, WireError> {
        wire::check_encodable(&self.moves)?;
        let frame = Frame {
            origin: self.origin.0,
            seq: self.seq,
            kind: self.kind.clone(),
            moves: self.moves.iter().map(Move::to_fields).collect(),
        };
        Ok(bincode::serialize(&frame)?)
    }

    /// Decode a transport frame.
    pub fn from_frame(bytes: &[u8]) -> Result<Self, WireError> {
        let frame: Frame = bincode::deserialize(bytes)?;
        let moves = frame
            .moves
            .iter()
            .map(|fields| Move::from_fields(fields))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            origin: ParticipantId(frame.origin),
            seq: frame.seq,
            kind: frame.kind,
            moves,
        })
    }
}

impl std::fmt::Display for MoveRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}.{} {:?}", self.origin, self.seq, self.kind)?;
        for mv in &self.moves {
            write!(f, " [{mv}]")?;
        }
        Ok(())
    }
}
