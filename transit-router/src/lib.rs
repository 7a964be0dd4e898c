//! Offline itinerary routing core for a metropolitan transit network.
//!
//! Answers "how do I get from here to there, leaving now?" against a
//! bundled static timetable: stop search by name, nearest-stop queries,
//! and multi-leg journey computation with a round-based router, fronted
//! by a two-tier (memory + disk) cache.

pub mod cache;
pub mod config;
pub mod domain;
pub mod engine;
pub mod index;
pub mod repository;
