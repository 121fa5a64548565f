//! Errors raised by the pairing and progression engine.

use thiserror::Error;

use super::{MatchId, PlayerId};

/// Broad category of a [`TournamentError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input: unknown player, malformed field, unsupported roster.
    Validation,
    /// Operation not allowed in the current lifecycle state.
    State,
    /// Unknown round, match or tournament.
    NotFound,
    /// No legal next configuration exists.
    Exhaustion,
}

/// Errors that can occur while running a tournament.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TournamentError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Player {player} is not part of match {match_id}")]
    PlayerNotInMatch { player: PlayerId, match_id: MatchId },

    #[error("Player {0} is not a participant")]
    UnknownParticipant(PlayerId),

    #[error("Player {0} is already a participant")]
    DuplicateParticipant(PlayerId),

    #[error("Roster of {0} players is odd: byes are not supported")]
    OddRoster(usize),

    #[error("Roster needs at least 2 players, got {0}")]
    RosterTooSmall(usize),

    #[error("{rounds} rounds requested but {players} players only allow {max}")]
    TooManyRounds { rounds: u32, players: usize, max: usize },

    #[error("Match {0} has already been decided")]
    MatchAlreadyDecided(MatchId),

    #[error("Match {0} has no result to reset")]
    MatchNotDecided(MatchId),

    #[error("{0} is already finished")]
    RoundAlreadyFinished(String),

    #[error("{round} still has {pending} undecided matches")]
    RoundHasPendingMatches { round: String, pending: usize },

    #[error("Tournament has already started")]
    AlreadyStarted,

    #[error("Tournament has not started")]
    NotStarted,

    #[error("Tournament is complete")]
    TournamentComplete,

    #[error("{requested} is not the current round (current: {current})")]
    NotCurrentRound { requested: String, current: String },

    #[error("{0} is still open")]
    RoundStillOpen(String),

    #[error("{0} has not been created yet")]
    RoundNotCreated(String),

    #[error("Round {0} not found")]
    RoundNotFound(String),

    #[error("Match {0} not found")]
    MatchNotFound(MatchId),

    #[error("No unplayed configuration left for the next round")]
    Exhausted,
}

impl TournamentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TournamentError::InvalidInput(_)
            | TournamentError::PlayerNotInMatch { .. }
            | TournamentError::UnknownParticipant(_)
            | TournamentError::DuplicateParticipant(_)
            | TournamentError::OddRoster(_)
            | TournamentError::RosterTooSmall(_)
            | TournamentError::TooManyRounds { .. } => ErrorKind::Validation,

            TournamentError::MatchAlreadyDecided(_)
            | TournamentError::MatchNotDecided(_)
            | TournamentError::RoundAlreadyFinished(_)
            | TournamentError::RoundHasPendingMatches { .. }
            | TournamentError::AlreadyStarted
            | TournamentError::NotStarted
            | TournamentError::TournamentComplete
            | TournamentError::NotCurrentRound { .. }
            | TournamentError::RoundStillOpen(_)
            | TournamentError::RoundNotCreated(_) => ErrorKind::State,

            TournamentError::RoundNotFound(_) | TournamentError::MatchNotFound(_) => {
                ErrorKind::NotFound
            }

            TournamentError::Exhausted => ErrorKind::Exhaustion,
        }
    }
}
