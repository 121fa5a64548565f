//! Core entities: players, matches, rounds and their IDs.

mod error;
mod game;
mod ids;
mod player;
mod round;

pub use error::*;
pub use game::*;
pub use ids::*;
pub use player::*;
pub use round::*;
