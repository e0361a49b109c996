//! Game catalogs built on the engine.

pub mod skirmish;
