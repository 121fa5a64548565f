//! Tournament orchestration.
//!
//! A tournament moves through three phases:
//!
//! - **Unstarted**: participants can be added or removed.
//! - **In progress**: `initialize_first_round` froze the roster and seeded the
//!   pairing. Exactly one round slot is current at a time; it is closed with
//!   `complete_round` and the next one is opened with `create_next_round`.
//! - **Complete**: every round slot exists and is finished.

mod ranking;

pub use ranking::*;

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::models::{
    round_name, EntityKind, IdAllocator, Match, MatchId, PlayerId, Round, TournamentError,
    TournamentId,
};
use crate::pairing::{Pair, Pairing, RandomSource};

/// Default number of rounds when none is configured.
pub const DEFAULT_ROUNDS_NUMBER: u32 = 4;

/// A multi-round event where every pair of players meets at most once.
#[derive(Debug, Clone)]
pub struct Tournament {
    pub id: TournamentId,

    pub name: String,

    pub place: String,

    pub date_start: NaiveDate,

    pub date_end: NaiveDate,

    pub description: String,

    rounds_number: u32,

    participants: BTreeMap<PlayerId, Participant>,

    /// One slot per configured round, filled lazily in order
    rounds: Vec<Option<Round>>,

    pairing: Option<Pairing>,

    is_complete: bool,
}

impl Tournament {
    /// Create an unstarted tournament with every round slot empty.
    pub fn new(
        id: TournamentId,
        name: &str,
        place: &str,
        date_start: NaiveDate,
        date_end: NaiveDate,
        rounds_number: u32,
    ) -> Result<Self, TournamentError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TournamentError::InvalidInput(
                "tournament name must not be empty".to_string(),
            ));
        }
        if date_end < date_start {
            return Err(TournamentError::InvalidInput(format!(
                "tournament ends ({}) before it starts ({})",
                date_end, date_start
            )));
        }
        if rounds_number == 0 {
            return Err(TournamentError::InvalidInput(
                "a tournament needs at least one round".to_string(),
            ));
        }

        Ok(Self {
            id,
            name: name.to_string(),
            place: place.trim().to_string(),
            date_start,
            date_end,
            description: String::new(),
            rounds_number,
            participants: BTreeMap::new(),
            rounds: vec![None; rounds_number as usize],
            pairing: None,
            is_complete: false,
        })
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.trim().to_string();
        self
    }

    pub fn rounds_number(&self) -> u32 {
        self.rounds_number
    }

    pub fn is_started(&self) -> bool {
        self.pairing.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn pairing(&self) -> Option<&Pairing> {
        self.pairing.as_ref()
    }

    /// The seed permutation to persist, once the tournament has started.
    pub fn first_pairing_seed(&self) -> Option<&[PlayerId]> {
        self.pairing.as_ref().map(Pairing::seed)
    }

    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    pub fn participant(&self, player: PlayerId) -> Option<&Participant> {
        self.participants.get(&player)
    }

    pub fn add_participant(&mut self, player: PlayerId) -> Result<(), TournamentError> {
        if self.is_started() {
            return Err(TournamentError::AlreadyStarted);
        }
        if self.participants.contains_key(&player) {
            return Err(TournamentError::DuplicateParticipant(player));
        }
        self.participants.insert(player, Participant::new(player));
        debug!(tournament = %self.id, %player, "Added participant");
        Ok(())
    }

    pub fn remove_participant(&mut self, player: PlayerId) -> Result<(), TournamentError> {
        if self.is_started() {
            return Err(TournamentError::AlreadyStarted);
        }
        self.participants
            .remove(&player)
            .map(|_| ())
            .ok_or(TournamentError::UnknownParticipant(player))
    }

    /// Round slots in order, with their names.
    pub fn rounds(&self) -> impl Iterator<Item = (String, Option<&Round>)> {
        self.rounds
            .iter()
            .enumerate()
            .map(|(i, slot)| (round_name(i + 1), slot.as_ref()))
    }

    fn slot_index(&self, name: &str) -> Option<usize> {
        (1..=self.rounds.len())
            .find(|n| round_name(*n) == name)
            .map(|n| n - 1)
    }

    pub fn round(&self, name: &str) -> Result<&Round, TournamentError> {
        self.slot_index(name)
            .and_then(|i| self.rounds[i].as_ref())
            .ok_or_else(|| TournamentError::RoundNotFound(name.to_string()))
    }

    /// Index of the earliest slot that is empty or not finished.
    pub fn check_current_round(&self) -> Option<usize> {
        self.rounds
            .iter()
            .position(|slot| slot.as_ref().map_or(true, |r| !r.is_finished))
    }

    pub fn current_round_name(&self) -> Option<String> {
        self.check_current_round().map(|i| round_name(i + 1))
    }

    /// The open round, if one has been created and not closed yet.
    pub fn current_round(&self) -> Option<&Round> {
        self.check_current_round()
            .and_then(|i| self.rounds[i].as_ref())
    }

    /// A match of the open round, for entering or correcting a result.
    pub fn current_match_mut(&mut self, match_id: MatchId) -> Result<&mut Match, TournamentError> {
        if !self.is_started() {
            return Err(TournamentError::NotStarted);
        }
        let index = self
            .check_current_round()
            .ok_or(TournamentError::TournamentComplete)?;
        match self.rounds[index].as_mut() {
            Some(round) => round.match_mut(match_id),
            None => Err(TournamentError::MatchNotFound(match_id)),
        }
    }

    /// Pairs of every scheduled match, finished or not.
    pub fn played_pairs(&self) -> BTreeSet<Pair> {
        self.rounds
            .iter()
            .flatten()
            .flat_map(|round| round.pairs())
            .collect()
    }

    /// Freeze the roster, seed the pairing and open Round_1.
    pub fn initialize_first_round<R: RandomSource>(
        &mut self,
        rng: &mut R,
        ids: &mut dyn IdAllocator,
    ) -> Result<&Round, TournamentError> {
        if self.is_started() {
            return Err(TournamentError::AlreadyStarted);
        }

        let roster: Vec<PlayerId> = self.participants.keys().copied().collect();
        let players = roster.len();
        let mut pairing = Pairing::new(roster, rng)?;

        let max = players - 1;
        if self.rounds_number as usize > max {
            return Err(TournamentError::TooManyRounds {
                rounds: self.rounds_number,
                players,
                max,
            });
        }

        let configuration = pairing.first_round_configuration()?;
        let round = Round::from_configuration(
            ids.allocate(EntityKind::Round),
            1,
            &configuration,
            ids,
        );

        info!(
            tournament = %self.id,
            players,
            rounds = self.rounds_number,
            "Tournament started"
        );
        self.pairing = Some(pairing);
        Ok(self.rounds[0].insert(round))
    }

    /// Close the current round and add its results to participant scores.
    pub fn complete_round(&mut self, name: &str) -> Result<(), TournamentError> {
        if !self.is_started() {
            return Err(TournamentError::NotStarted);
        }
        let index = self
            .check_current_round()
            .ok_or(TournamentError::TournamentComplete)?;

        let current = round_name(index + 1);
        if name != current {
            return Err(TournamentError::NotCurrentRound {
                requested: name.to_string(),
                current,
            });
        }

        let round = self.rounds[index]
            .as_mut()
            .ok_or(TournamentError::RoundNotCreated(current))?;
        round.end_round()?;

        for m in &round.matches {
            for (player, score) in m.outcomes() {
                let participant = self
                    .participants
                    .get_mut(&player)
                    .ok_or(TournamentError::UnknownParticipant(player))?;
                participant.score += score;
            }
        }
        info!(tournament = %self.id, round = %round.name, "Round completed");

        if self.rounds.iter().all(|slot| slot.as_ref().is_some_and(|r| r.is_finished)) {
            self.is_complete = true;
            info!(tournament = %self.id, "Tournament complete");
        }
        Ok(())
    }

    /// Open the next round, pairing leaders who have not met yet.
    pub fn create_next_round(&mut self, ids: &mut dyn IdAllocator) -> Result<&Round, TournamentError> {
        if !self.is_started() {
            return Err(TournamentError::NotStarted);
        }
        if self.is_complete {
            return Err(TournamentError::TournamentComplete);
        }
        let index = self
            .check_current_round()
            .ok_or(TournamentError::TournamentComplete)?;
        if let Some(open) = &self.rounds[index] {
            return Err(TournamentError::RoundStillOpen(open.name.clone()));
        }

        let groups = self.get_ranking().player_groups();
        let pairing = self.pairing.as_mut().ok_or(TournamentError::NotStarted)?;
        let configuration = pairing.next_configuration_from_ranking(&groups)?;

        let round = Round::from_configuration(
            ids.allocate(EntityKind::Round),
            index + 1,
            &configuration,
            ids,
        );
        info!(tournament = %self.id, round = %round.name, "Round created");
        Ok(self.rounds[index].insert(round))
    }

    /// Participants grouped by cumulative score, best first.
    pub fn get_ranking(&self) -> Ranking {
        Ranking::from_participants(self.participants.values())
    }

    /// Participants sorted by score (descending), then by ID.
    pub fn standings(&self) -> Vec<Participant> {
        let mut standings: Vec<Participant> = self.participants.values().copied().collect();
        standings.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.player_id.cmp(&b.player_id))
        });
        standings
    }

    /// Reattach persisted progress to a freshly built tournament.
    ///
    /// The pairing is rebuilt from `seed` and the pairs of every scheduled
    /// match; completion is recomputed from the round slots.
    pub fn restore_progress(
        mut self,
        participants: impl IntoIterator<Item = Participant>,
        rounds: Vec<Option<Round>>,
        seed: Option<Vec<PlayerId>>,
    ) -> Result<Self, TournamentError> {
        if rounds.len() != self.rounds.len() {
            return Err(TournamentError::InvalidInput(format!(
                "expected {} round slots, found {}",
                self.rounds.len(),
                rounds.len()
            )));
        }
        for (i, slot) in rounds.iter().enumerate() {
            if let Some(round) = slot {
                let expected = round_name(i + 1);
                if round.name != expected {
                    return Err(TournamentError::InvalidInput(format!(
                        "round {} stored in slot {}",
                        round.name, expected
                    )));
                }
            }
        }

        self.participants = participants
            .into_iter()
            .map(|p| (p.player_id, p))
            .collect();
        self.rounds = rounds;

        self.pairing = match seed {
            Some(seed) => {
                let roster: Vec<PlayerId> = self.participants.keys().copied().collect();
                Some(Pairing::instantiate(roster, seed, self.played_pairs())?)
            }
            None if self.rounds.iter().any(Option::is_some) => {
                return Err(TournamentError::InvalidInput(
                    "rounds exist but no pairing seed was stored".to_string(),
                ));
            }
            None => None,
        };

        self.is_complete = self
            .rounds
            .iter()
            .all(|slot| slot.as_ref().is_some_and(|r| r.is_finished));
        Ok(self)
    }
}
