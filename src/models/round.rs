//! Round model: one cycle of the schedule.

use chrono::{DateTime, Utc};

use super::{EntityKind, IdAllocator, Match, MatchId, PlayerId, RoundId, TournamentError};
use crate::pairing::{Configuration, Pair};

/// Name of the round slot with the given 1-based number, e.g. "Round_3".
pub fn round_name(number: usize) -> String {
    format!("Round_{}", number)
}

/// An ordered group of matches played together.
#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    pub id: RoundId,

    /// Ordinal name ("Round_1", "Round_2", ...)
    pub name: String,

    pub time_start: DateTime<Utc>,

    /// Set once when the round is closed
    pub time_end: Option<DateTime<Utc>>,

    pub is_finished: bool,

    pub matches: Vec<Match>,
}

impl Round {
    /// Create an open round without matches.
    pub fn new(id: RoundId, name: String) -> Self {
        Self {
            id,
            name,
            time_start: Utc::now(),
            time_end: None,
            is_finished: false,
            matches: Vec::new(),
        }
    }

    /// Create round `number` with one pending match per configuration pair.
    pub fn from_configuration(
        id: RoundId,
        number: usize,
        configuration: &Configuration,
        ids: &mut dyn IdAllocator,
    ) -> Self {
        let mut round = Self::new(id, round_name(number));
        round.matches = configuration
            .pairs()
            .iter()
            .map(|pair| Match::from_pair(ids.allocate(EntityKind::Match), *pair))
            .collect();
        round
    }

    pub fn add_match(&mut self, m: Match) {
        self.matches.push(m);
    }

    pub fn get_match(&self, id: MatchId) -> Option<&Match> {
        self.matches.iter().find(|m| m.id() == id)
    }

    pub fn match_mut(&mut self, id: MatchId) -> Result<&mut Match, TournamentError> {
        self.matches
            .iter_mut()
            .find(|m| m.id() == id)
            .ok_or(TournamentError::MatchNotFound(id))
    }

    /// Find the match between two players, in either order.
    pub fn find_match(&self, a: PlayerId, b: PlayerId) -> Option<&Match> {
        let pair = Pair::new(a, b);
        self.matches.iter().find(|m| m.pair() == pair)
    }

    pub fn pending_matches(&self) -> usize {
        self.matches.iter().filter(|m| !m.is_finished()).count()
    }

    pub fn pairs(&self) -> impl Iterator<Item = Pair> + '_ {
        self.matches.iter().map(Match::pair)
    }

    /// Close the round. Every match must have a result.
    pub fn end_round(&mut self) -> Result<(), TournamentError> {
        if self.is_finished {
            return Err(TournamentError::RoundAlreadyFinished(self.name.clone()));
        }

        let pending = self.pending_matches();
        if pending > 0 {
            return Err(TournamentError::RoundHasPendingMatches {
                round: self.name.clone(),
                pending,
            });
        }

        self.time_end = Some(Utc::now());
        self.is_finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityId, ErrorKind, SequentialIds};

    fn p(n: u32) -> PlayerId {
        EntityId::player(n).unwrap()
    }

    fn two_match_round() -> Round {
        let configuration = Configuration::new(vec![Pair::new(p(1), p(4)), Pair::new(p(3), p(2))]);
        let mut ids = SequentialIds::new();
        let id = ids.allocate(EntityKind::Round);
        Round::from_configuration(id, 1, &configuration, &mut ids)
    }

    #[test]
    fn test_round_name() {
        assert_eq!(round_name(3), "Round_3");
    }

    #[test]
    fn test_round_from_configuration() {
        let round = two_match_round();

        assert_eq!(round.name, "Round_1");
        assert_eq!(round.id.to_string(), "r_1");
        assert!(!round.is_finished);
        assert!(round.time_end.is_none());
        assert_eq!(round.matches.len(), 2);
        assert_eq!(round.matches[0].id().to_string(), "m_1");
        assert_eq!(round.matches[0].players(), [p(1), p(4)]);
        assert_eq!(round.matches[1].players(), [p(2), p(3)]);
    }

    #[test]
    fn test_find_match_any_order() {
        let round = two_match_round();
        assert!(round.find_match(p(4), p(1)).is_some());
        assert!(round.find_match(p(1), p(2)).is_none());
    }

    #[test]
    fn test_end_round_requires_results() {
        let mut round = two_match_round();
        let err = round.end_round().unwrap_err();
        assert_eq!(
            err,
            TournamentError::RoundHasPendingMatches {
                round: "Round_1".to_string(),
                pending: 2,
            }
        );
        assert!(!round.is_finished);
    }

    #[test]
    fn test_end_round_once() {
        let mut round = two_match_round();
        round.matches[0].decide_win(p(1)).unwrap();
        round.matches[1].decide_draw().unwrap();

        round.end_round().unwrap();
        assert!(round.is_finished);
        assert!(round.time_end.is_some());

        let err = round.end_round().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[test]
    fn test_match_mut_unknown() {
        let mut round = two_match_round();
        let missing = EntityId::new(EntityKind::Match, 99).unwrap();
        assert_eq!(
            round.match_mut(missing).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}
