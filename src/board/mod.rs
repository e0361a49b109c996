//! Board boundary.
//!
//! Topology is read-only: the engine asks [`Board`] about spaces,
//! adjacency and paths but never changes it. What the engine does own is
//! per-space state ([`SpaceState`]), stored in the engine state and changed
//! only by moves.
//!
//! ```
//! use rust_lockstep::board::{Board, GraphBoard, SpaceId};
//!
//! let board = GraphBoard::new()
//!     .with_edge("harbor", "keep")
//!     .with_edge("keep", "pass");
//!
//! assert!(board.is_adjacent(&SpaceId::from("harbor"), &SpaceId::from("keep")));
//! let path = board.path(&SpaceId::from("harbor"), &SpaceId::from("pass")).unwrap();
//! assert_eq!(path.len(), 3);
//! ```

use std::collections::VecDeque;

use im::{OrdMap, OrdSet};
use serde::{Deserialize, Serialize};

use crate::core::FactionId;

/// Space identifier (its wire name).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpaceId(pub String);

impl SpaceId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SpaceId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl std::fmt::Display for SpaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only board topology.
///
/// Implementations must return spaces and neighbors in a stable order;
/// option lists built from them feed the shared random source.
pub trait Board {
    /// All spaces, in a stable order.
    fn spaces(&self) -> Vec<SpaceId>;

    /// Neighbors of `space`, in a stable order.
    fn neighbors(&self, space: &SpaceId) -> Vec<SpaceId>;

    fn contains(&self, space: &SpaceId) -> bool {
        self.spaces().contains(space)
    }

    fn is_adjacent(&self, a: &SpaceId, b: &SpaceId) -> bool {
        self.neighbors(a).contains(b)
    }

    /// Shortest path from `from` to `to`, both ends included.
    fn path(&self, from: &SpaceId, to: &SpaceId) -> Option<Vec<SpaceId>> {
        if !self.contains(from) || !self.contains(to) {
            return None;
        }
        let mut came_from: OrdMap<SpaceId, SpaceId> = OrdMap::new();
        let mut frontier = VecDeque::from([from.clone()]);
        let mut seen = OrdSet::unit(from.clone());

        while let Some(current) = frontier.pop_front() {
            if &current == to {
                let mut path = vec![current.clone()];
                let mut cursor = current;
                while let Some(prev) = came_from.get(&cursor) {
                    path.push(prev.clone());
                    cursor = prev.clone();
                }
                path.reverse();
                return Some(path);
            }
            for next in self.neighbors(&current) {
                if !seen.contains(&next) {
                    seen.insert(next.clone());
                    came_from.insert(next.clone(), current.clone());
                    frontier.push_back(next);
                }
            }
        }
        None
    }
}

/// Undirected adjacency-list board.
#[derive(Clone, Debug, Default)]
pub struct GraphBoard {
    adjacency: OrdMap<SpaceId, Vec<SpaceId>>,
}

impl GraphBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an isolated space.
    #[must_use]
    pub fn with_space(mut self, space: &str) -> Self {
        let space = SpaceId::from(space);
        if !self.adjacency.contains_key(&space) {
            self.adjacency.insert(space, Vec::new());
        }
        self
    }

    /// Add an undirected edge (creating both spaces if needed).
    #[must_use]
    pub fn with_edge(mut self, a: &str, b: &str) -> Self {
        let (a, b) = (SpaceId::from(a), SpaceId::from(b));
        self.link(&a, &b);
        self.link(&b, &a);
        self
    }

    fn link(&mut self, from: &SpaceId, to: &SpaceId) {
        let mut neighbors = self.adjacency.get(from).cloned().unwrap_or_default();
        if !neighbors.contains(to) {
            neighbors.push(to.clone());
        }
        self.adjacency.insert(from.clone(), neighbors);
    }
}

impl Board for GraphBoard {
    fn spaces(&self) -> Vec<SpaceId> {
        self.adjacency.keys().cloned().collect()
    }

    fn neighbors(&self, space: &SpaceId) -> Vec<SpaceId> {
        self.adjacency.get(space).cloned().unwrap_or_default()
    }

    fn contains(&self, space: &SpaceId) -> bool {
        self.adjacency.contains_key(space)
    }
}

/// Mutable per-space state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceState {
    /// Units present, per faction.
    pub occupants: OrdMap<FactionId, u32>,

    /// Political controller.
    pub controller: Option<FactionId>,

    /// Status flags (unrest, besieged, reformed, ...).
    pub flags: OrdSet<String>,
}

impl SpaceState {
    /// Units `faction` has here.
    #[must_use]
    pub fn units(&self, faction: &FactionId) -> u32 {
        self.occupants.get(faction).copied().unwrap_or(0)
    }

    pub fn add_units(&mut self, faction: &FactionId, count: u32) {
        let current = self.units(faction);
        self.occupants.insert(faction.clone(), current + count);
    }

    /// Remove up to `count` units; returns how many were removed.
    pub fn remove_units(&mut self, faction: &FactionId, count: u32) -> u32 {
        let current = self.units(faction);
        let removed = current.min(count);
        if current == removed {
            self.occupants.remove(faction);
        } else {
            self.occupants.insert(faction.clone(), current - removed);
        }
        removed
    }

    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }
}
