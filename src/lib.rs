//! # Chess Pairing
//!
//! Round-robin pairing and scoring for local chess tournaments.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (IDs, players, matches, rounds, errors)
//! - **pairing**: Circle-method schedule generation and ranking-driven selection
//! - **tournament**: Tournament lifecycle, scores and ranking
//! - **storage**: Flat-file JSONL records and tournament load/save
//! - **config**: Configuration loading and validation

pub mod config;
pub mod models;
pub mod pairing;
pub mod storage;
pub mod tournament;

pub use models::*;
pub use pairing::{Configuration, Pair, Pairing, RandomSource, SeededRng, SystemRng};
pub use tournament::{Participant, Ranking, Tournament};
