//! Participant identification and per-participant data storage.
//!
//! ## ParticipantId
//!
//! Type-safe identifier for a connected participant (one replica each),
//! supporting 1-255 participants.
//!
//! ## ParticipantMap
//!
//! Per-participant storage backed by `Vec` for O(1) access. Its length is
//! fixed at construction, which is what keeps the confirmation vector the
//! same size as the participant count.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Participant identifier supporting 1-255 participants.
///
/// Indices are 0-based: the first participant is `ParticipantId(0)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub u8);

impl ParticipantId {
    /// Create a new participant ID.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Get the raw participant index (0-based).
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Iterate over all participant IDs for a session with `count` participants.
    ///
    /// ```
    /// use rust_lockstep::core::ParticipantId;
    ///
    /// let all: Vec<_> = ParticipantId::all(3).collect();
    /// assert_eq!(all, vec![ParticipantId(0), ParticipantId(1), ParticipantId(2)]);
    /// ```
    pub fn all(count: usize) -> impl Iterator<Item = ParticipantId> {
        (0..count as u8).map(ParticipantId)
    }

    /// Parse the wire form (a decimal index).
    #[must_use]
    pub fn parse(field: &str) -> Option<Self> {
        field.parse::<u8>().ok().map(Self)
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-participant data storage with O(1) access.
///
/// ## Example
///
/// ```
/// use rust_lockstep::core::{ParticipantId, ParticipantMap};
///
/// let mut pending: ParticipantMap<bool> = ParticipantMap::with_value(3, true);
/// pending[ParticipantId::new(1)] = false;
///
/// assert!(pending[ParticipantId::new(0)]);
/// assert!(!pending[ParticipantId::new(1)]);
/// assert_eq!(pending.participant_count(), 3);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantMap<T> {
    data: Vec<T>,
}

impl<T> ParticipantMap<T> {
    /// Create a new map with values from a factory function.
    pub fn new(count: usize, factory: impl Fn(ParticipantId) -> T) -> Self {
        assert!(count > 0, "Must have at least 1 participant");
        assert!(count <= 255, "At most 255 participants supported");

        let data = (0..count as u8).map(|i| factory(ParticipantId(i))).collect();
        Self { data }
    }

    /// Create a new map with all entries set to the same value.
    pub fn with_value(count: usize, value: T) -> Self
    where
        T: Clone,
    {
        Self::new(count, |_| value.clone())
    }

    /// Create a new map with default values.
    pub fn with_default(count: usize) -> Self
    where
        T: Default,
    {
        Self::new(count, |_| T::default())
    }

    /// Number of participants.
    #[must_use]
    pub fn participant_count(&self) -> usize {
        self.data.len()
    }

    /// Whether `participant` is in range for this map.
    #[must_use]
    pub fn contains(&self, participant: ParticipantId) -> bool {
        participant.index() < self.data.len()
    }

    /// Get a participant's entry, if in range.
    #[must_use]
    pub fn get(&self, participant: ParticipantId) -> Option<&T> {
        self.data.get(participant.index())
    }

    /// Get a mutable reference to a participant's entry, if in range.
    pub fn get_mut(&mut self, participant: ParticipantId) -> Option<&mut T> {
        self.data.get_mut(participant.index())
    }

    /// Iterate over (ParticipantId, &T) pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (ParticipantId, &T)> {
        self.data
            .iter()
            .enumerate()
            .map(|(i, v)| (ParticipantId(i as u8), v))
    }

    /// Iterate over (ParticipantId, &mut T) pairs in index order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ParticipantId, &mut T)> {
        self.data
            .iter_mut()
            .enumerate()
            .map(|(i, v)| (ParticipantId(i as u8), v))
    }

    /// Iterate over all participant IDs.
    pub fn participant_ids(&self) -> impl Iterator<Item = ParticipantId> {
        (0..self.data.len() as u8).map(ParticipantId)
    }
}

impl<T> Index<ParticipantId> for ParticipantMap<T> {
    type Output = T;

    fn index(&self, participant: ParticipantId) -> &Self::Output {
        &self.data[participant.index()]
    }
}

impl<T> IndexMut<ParticipantId> for ParticipantMap<T> {
    fn index_mut(&mut self, participant: ParticipantId) -> &mut Self::Output {
        &mut self.data[participant.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_id_basics() {
        let p = ParticipantId::new(2);
        assert_eq!(p.index(), 2);
        assert_eq!(format!("{}", p), "2");
        assert_eq!(ParticipantId::parse("2"), Some(p));
        assert_eq!(ParticipantId::parse("north"), None);
        assert_eq!(ParticipantId::parse("300"), None);
    }

    #[test]
    fn test_map_new_and_index() {
        let map: ParticipantMap<i32> = ParticipantMap::new(4, |p| p.index() as i32 * 10);

        assert_eq!(map[ParticipantId::new(0)], 0);
        assert_eq!(map[ParticipantId::new(3)], 30);
        assert_eq!(map.participant_count(), 4);
    }

    #[test]
    fn test_map_get_out_of_range() {
        let mut map: ParticipantMap<bool> = ParticipantMap::with_value(2, true);

        assert!(map.contains(ParticipantId::new(1)));
        assert!(!map.contains(ParticipantId::new(2)));
        assert_eq!(map.get(ParticipantId::new(5)), None);
        assert!(map.get_mut(ParticipantId::new(5)).is_none());
    }

    #[test]
    fn test_map_iter_order() {
        let map: ParticipantMap<u8> = ParticipantMap::new(3, |p| p.0);
        let ids: Vec<_> = map.iter().map(|(p, _)| p).collect();
        assert_eq!(ids, ParticipantId::all(3).collect::<Vec<_>>());
    }

    #[test]
    fn test_map_serialization() {
        let map: ParticipantMap<bool> = ParticipantMap::new(3, |p| p.0 % 2 == 0);
        let json = serde_json::to_string(&map).unwrap();
        let back: ParticipantMap<bool> = serde_json::from_str(&json).unwrap();
        assert_eq!(map, back);
    }

    #[test]
    #[should_panic(expected = "Must have at least 1 participant")]
    fn test_map_zero_participants() {
        let _: ParticipantMap<bool> = ParticipantMap::with_value(0, false);
    }
}
