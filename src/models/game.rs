//! Match model: the outcome ledger for one pair of players.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{MatchId, PlayerId, TournamentError};
use crate::pairing::Pair;

pub const WIN: f64 = 1.0;
pub const DRAW: f64 = 0.5;
pub const LOSS: f64 = 0.0;

/// One game between two players.
///
/// Pending matches score 0 for both sides. A decided match always scores
/// exactly 1 in total: 1/0 for a win, 0.5/0.5 for a draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MatchRecord", into = "MatchRecord")]
pub struct Match {
    id: MatchId,
    pair: Pair,
    /// Scores aligned with `pair.first()` and `pair.second()`
    scores: [f64; 2],
    is_finished: bool,
}

impl Match {
    /// Create a pending match. The players are stored in canonical order.
    pub fn new(id: MatchId, a: PlayerId, b: PlayerId) -> Result<Self, TournamentError> {
        if a == b {
            return Err(TournamentError::InvalidInput(format!(
                "player {} cannot play against themselves",
                a
            )));
        }
        Ok(Self::from_pair(id, Pair::new(a, b)))
    }

    pub(crate) fn from_pair(id: MatchId, pair: Pair) -> Self {
        Self {
            id,
            pair,
            scores: [LOSS, LOSS],
            is_finished: false,
        }
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn pair(&self) -> Pair {
        self.pair
    }

    pub fn players(&self) -> [PlayerId; 2] {
        [self.pair.first(), self.pair.second()]
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    fn slot(&self, player: PlayerId) -> Result<usize, TournamentError> {
        if player == self.pair.first() {
            Ok(0)
        } else if player == self.pair.second() {
            Ok(1)
        } else {
            Err(TournamentError::PlayerNotInMatch {
                player,
                match_id: self.id,
            })
        }
    }

    pub fn score_of(&self, player: PlayerId) -> Result<f64, TournamentError> {
        Ok(self.scores[self.slot(player)?])
    }

    pub fn opponent_of(&self, player: PlayerId) -> Result<PlayerId, TournamentError> {
        let slot = self.slot(player)?;
        Ok(self.players()[1 - slot])
    }

    /// The winner, if the match was decided by a win.
    pub fn winner(&self) -> Option<PlayerId> {
        if !self.is_finished {
            return None;
        }
        self.outcomes()
            .find(|(_, score)| *score == WIN)
            .map(|(player, _)| player)
    }

    /// Per-player outcomes in canonical player order.
    pub fn outcomes(&self) -> impl Iterator<Item = (PlayerId, f64)> + '_ {
        self.players().into_iter().zip(self.scores)
    }

    /// Record a win for `player`.
    pub fn decide_win(&mut self, player: PlayerId) -> Result<(), TournamentError> {
        if self.is_finished {
            return Err(TournamentError::MatchAlreadyDecided(self.id));
        }
        let slot = self.slot(player)?;
        self.scores[slot] = WIN;
        self.scores[1 - slot] = LOSS;
        self.is_finished = true;
        Ok(())
    }

    pub fn decide_draw(&mut self) -> Result<(), TournamentError> {
        if self.is_finished {
            return Err(TournamentError::MatchAlreadyDecided(self.id));
        }
        self.scores = [DRAW, DRAW];
        self.is_finished = true;
        Ok(())
    }

    /// Undo a result entered by mistake.
    pub fn reset(&mut self) -> Result<(), TournamentError> {
        if !self.is_finished {
            return Err(TournamentError::MatchNotDecided(self.id));
        }
        self.scores = [LOSS, LOSS];
        self.is_finished = false;
        Ok(())
    }
}

/// Persisted shape: score map keyed by player ID plus the completion flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MatchRecord {
    id: MatchId,
    score: BTreeMap<PlayerId, f64>,
    is_finished: bool,
}

impl From<Match> for MatchRecord {
    fn from(m: Match) -> Self {
        Self {
            id: m.id,
            score: m.outcomes().collect(),
            is_finished: m.is_finished,
        }
    }
}

impl TryFrom<MatchRecord> for Match {
    type Error = TournamentError;

    fn try_from(record: MatchRecord) -> Result<Self, Self::Error> {
        let invalid = |reason: &str| {
            TournamentError::InvalidInput(format!("match {}: {}", record.id, reason))
        };

        let entries: Vec<(PlayerId, f64)> =
            record.score.iter().map(|(p, s)| (*p, *s)).collect();
        let &[(a, score_a), (b, score_b)] = entries.as_slice() else {
            return Err(invalid("score must list exactly two players"));
        };

        let scores = [score_a, score_b];
        if record.is_finished {
            let valid = scores.iter().all(|s| [WIN, DRAW, LOSS].contains(s));
            if !valid || score_a + score_b != WIN {
                return Err(invalid("finished scores must sum to 1"));
            }
        } else if scores != [LOSS, LOSS] {
            return Err(invalid("pending match must score 0 for both players"));
        }

        // BTreeMap iteration already yields canonical order.
        let mut m = Match::new(record.id, a, b)?;
        m.scores = scores;
        m.is_finished = record.is_finished;
        Ok(m)
    }
}
