//! Persisted shapes for rounds and tournaments, plus tournament load/save.
//!
//! Rounds reference their matches by ID and tournaments reference their rounds
//! by ID, so a tournament is written as three collections and reassembled on
//! load. The pairing itself is never stored: only the seed permutation is, and
//! the remaining configurations are rebuilt from it and the scheduled matches.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{Record, RecordStore, StorageError};
use crate::models::{
    round_name, EntityId, EntityKind, Match, MatchId, PlayerId, Round, RoundId, TournamentId,
};
use crate::tournament::{Participant, Tournament};

/// A round as stored in `rounds.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub id: RoundId,
    pub name: String,
    pub time_start: DateTime<Utc>,
    pub time_end: Option<DateTime<Utc>>,
    pub is_finished: bool,
    pub matches: Vec<MatchId>,
}

impl From<&Round> for RoundRecord {
    fn from(round: &Round) -> Self {
        Self {
            id: round.id,
            name: round.name.clone(),
            time_start: round.time_start,
            time_end: round.time_end,
            is_finished: round.is_finished,
            matches: round.matches.iter().map(Match::id).collect(),
        }
    }
}

impl RoundRecord {
    /// Resolve match IDs against the loaded matches.
    pub fn into_round(self, matches: &HashMap<MatchId, Match>) -> Result<Round, StorageError> {
        let resolved = self
            .matches
            .iter()
            .map(|id| {
                matches.get(id).cloned().ok_or(StorageError::NotFound {
                    kind: EntityKind::Match,
                    id: *id,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if self.is_finished && resolved.iter().any(|m| !m.is_finished()) {
            return Err(StorageError::InvalidRecord(format!(
                "{} is finished but has undecided matches",
                self.name
            )));
        }

        Ok(Round {
            id: self.id,
            name: self.name,
            time_start: self.time_start,
            time_end: self.time_end,
            is_finished: self.is_finished,
            matches: resolved,
        })
    }
}

impl Record for RoundRecord {
    const KIND: EntityKind = EntityKind::Round;

    fn id(&self) -> EntityId {
        self.id
    }
}

/// A tournament as stored in `tournaments.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentRecord {
    pub id: TournamentId,
    pub name: String,
    pub place: String,
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    #[serde(default)]
    pub description: String,
    pub rounds_number: u32,
    /// Player ID to cumulative score
    pub participants: BTreeMap<PlayerId, f64>,
    /// Round name to round ID, `null` for slots not created yet
    pub rounds: BTreeMap<String, Option<RoundId>>,
    /// Seed permutation, set once the tournament has started
    pub first_pairing: Option<Vec<PlayerId>>,
    pub is_complete: bool,
}

impl From<&Tournament> for TournamentRecord {
    fn from(tournament: &Tournament) -> Self {
        Self {
            id: tournament.id,
            name: tournament.name.clone(),
            place: tournament.place.clone(),
            date_start: tournament.date_start,
            date_end: tournament.date_end,
            description: tournament.description.clone(),
            rounds_number: tournament.rounds_number(),
            participants: tournament
                .participants()
                .map(|p| (p.player_id, p.score))
                .collect(),
            rounds: tournament
                .rounds()
                .map(|(name, round)| (name, round.map(|r| r.id)))
                .collect(),
            first_pairing: tournament.first_pairing_seed().map(<[PlayerId]>::to_vec),
            is_complete: tournament.is_complete(),
        }
    }
}

impl Record for TournamentRecord {
    const KIND: EntityKind = EntityKind::Tournament;

    fn id(&self) -> EntityId {
        self.id
    }
}

/// Write a tournament with all of its rounds and matches.
pub fn save_tournament<S: RecordStore>(
    store: &mut S,
    tournament: &Tournament,
) -> Result<(), StorageError> {
    let rounds: Vec<&Round> = tournament.rounds().filter_map(|(_, round)| round).collect();
    let matches: Vec<Match> = rounds
        .iter()
        .flat_map(|round| round.matches.iter().cloned())
        .collect();
    let round_records: Vec<RoundRecord> = rounds.iter().map(|r| RoundRecord::from(*r)).collect();

    store.save_all(&matches)?;
    store.save_all(&round_records)?;
    store.save(&TournamentRecord::from(tournament))?;

    info!(
        tournament = %tournament.id,
        rounds = round_records.len(),
        matches = matches.len(),
        "Saved tournament"
    );
    Ok(())
}

/// Load a tournament, resolving its rounds and matches and rebuilding the pairing.
pub fn load_tournament<S: RecordStore>(
    store: &S,
    id: TournamentId,
) -> Result<Tournament, StorageError> {
    let record: TournamentRecord = store.load(id)?;

    if record.rounds.len() != record.rounds_number as usize {
        return Err(StorageError::InvalidRecord(format!(
            "tournament {} lists {} round slots for {} rounds",
            id,
            record.rounds.len(),
            record.rounds_number
        )));
    }

    let needs_rounds = record.rounds.values().any(Option::is_some);
    let (matches, mut round_records) = if needs_rounds {
        let matches: HashMap<MatchId, Match> = store
            .load_all::<Match>()?
            .into_iter()
            .map(|m| (m.id(), m))
            .collect();
        let round_records: HashMap<RoundId, RoundRecord> = store
            .load_all::<RoundRecord>()?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();
        (matches, round_records)
    } else {
        (HashMap::new(), HashMap::new())
    };

    let mut rounds = Vec::with_capacity(record.rounds_number as usize);
    for number in 1..=record.rounds_number as usize {
        let name = round_name(number);
        let slot = record.rounds.get(&name).ok_or_else(|| {
            StorageError::InvalidRecord(format!("tournament {} has no slot {}", id, name))
        })?;
        let round = match slot {
            Some(round_id) => {
                let round_record = round_records.remove(round_id).ok_or(StorageError::NotFound {
                    kind: EntityKind::Round,
                    id: *round_id,
                })?;
                Some(round_record.into_round(&matches)?)
            }
            None => None,
        };
        rounds.push(round);
    }

    let participants = record
        .participants
        .iter()
        .map(|(player_id, score)| Participant {
            player_id: *player_id,
            score: *score,
        });

    let tournament = Tournament::new(
        record.id,
        &record.name,
        &record.place,
        record.date_start,
        record.date_end,
        record.rounds_number,
    )?
    .with_description(&record.description)
    .restore_progress(participants, rounds, record.first_pairing.clone())?;

    if tournament.is_complete() != record.is_complete {
        warn!(
            tournament = %id,
            stored = record.is_complete,
            "Stored completion flag disagrees with rounds, using rounds"
        );
    }
    Ok(tournament)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SequentialIds;
    use crate::pairing::SeededRng;
    use crate::storage::{InMemoryStore, JsonlStore, StorageConfig};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn p(n: u32) -> PlayerId {
        EntityId::player(n).unwrap()
    }

    fn tournament(players: u32, rounds: u32) -> Tournament {
        let id = EntityId::new(EntityKind::Tournament, 1).unwrap();
        let start = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2021, 3, 7).unwrap();
        let mut t = Tournament::new(id, "Spring Open", "Lyon", start, end, rounds)
            .unwrap()
            .with_description("Rapid");
        for n in 1..=players {
            t.add_participant(p(n)).unwrap();
        }
        t
    }

    fn decide_all(t: &mut Tournament) {
        let ids: Vec<MatchId> = t
            .current_round()
            .unwrap()
            .matches
            .iter()
            .map(Match::id)
            .collect();
        for id in ids {
            t.current_match_mut(id).unwrap().decide_draw().unwrap();
        }
    }

    /// Six players, Round_1 closed, Round_2 open with one result entered.
    fn tournament_in_progress(ids: &mut SequentialIds) -> Tournament {
        let mut t = tournament(6, 4);
        t.initialize_first_round(&mut SeededRng::from_seed(3), ids)
            .unwrap();
        decide_all(&mut t);
        t.complete_round("Round_1").unwrap();
        t.create_next_round(ids).unwrap();

        let first = t.current_round().unwrap().matches[0].clone();
        t.current_match_mut(first.id())
            .unwrap()
            .decide_win(first.players()[1])
            .unwrap();
        t
    }

    #[test]
    fn test_tournament_record_shape() {
        let t = tournament(2, 1);
        let record = TournamentRecord::from(&t);

        assert_eq!(record.participants.len(), 2);
        assert_eq!(record.rounds.get("Round_1"), Some(&None));
        assert_eq!(record.first_pairing, None);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "t_1");
        assert_eq!(json["participants"]["p_1"], 0.0);
        assert!(json["rounds"]["Round_1"].is_null());
    }

    #[test]
    fn test_round_record_lists_match_ids() {
        let mut ids = SequentialIds::new();
        let t = tournament_in_progress(&mut ids);
        let round = t.round("Round_2").unwrap();
        let record = RoundRecord::from(round);

        assert_eq!(record.name, "Round_2");
        assert_eq!(record.matches.len(), 3);
        assert_eq!(record.matches[0], round.matches[0].id());
    }

    #[test]
    fn test_round_trip_in_memory() {
        let mut ids = SequentialIds::new();
        let live = tournament_in_progress(&mut ids);

        let mut store = InMemoryStore::new();
        save_tournament(&mut store, &live).unwrap();
        assert_eq!(store.len(EntityKind::Round), 2);
        assert_eq!(store.len(EntityKind::Match), 6);

        let loaded = load_tournament(&store, live.id).unwrap();
        assert_eq!(loaded.name, "Spring Open");
        assert_eq!(loaded.description, "Rapid");
        assert_eq!(loaded.standings(), live.standings());
        assert_eq!(loaded.round("Round_1").unwrap(), live.round("Round_1").unwrap());
        assert_eq!(loaded.round("Round_2").unwrap(), live.round("Round_2").unwrap());
        assert_eq!(loaded.current_round_name().as_deref(), Some("Round_2"));
        assert_eq!(loaded.first_pairing_seed(), live.first_pairing_seed());
        assert_eq!(
            loaded.pairing().unwrap().played_pairs(),
            live.pairing().unwrap().played_pairs()
        );
    }

    #[test]
    fn test_round_trip_jsonl_continues_like_live() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = JsonlStore::new(StorageConfig::new(temp_dir.path().to_path_buf()));

        let mut ids = SequentialIds::new();
        let mut live = tournament(6, 4);
        live.initialize_first_round(&mut SeededRng::from_seed(11), &mut ids)
            .unwrap();
        decide_all(&mut live);
        live.complete_round("Round_1").unwrap();
        save_tournament(&mut store, &live).unwrap();

        let mut loaded = load_tournament(&store, live.id).unwrap();

        let mut live_ids = store.id_allocator().unwrap();
        let mut loaded_ids = store.id_allocator().unwrap();
        let expected: Vec<_> = live.create_next_round(&mut live_ids).unwrap().pairs().collect();
        let actual: Vec<_> = loaded
            .create_next_round(&mut loaded_ids)
            .unwrap()
            .pairs()
            .collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_save_is_idempotent() {
        let mut ids = SequentialIds::new();
        let live = tournament_in_progress(&mut ids);

        let mut store = InMemoryStore::new();
        save_tournament(&mut store, &live).unwrap();
        save_tournament(&mut store, &live).unwrap();

        assert_eq!(store.len(EntityKind::Tournament), 1);
        assert_eq!(store.len(EntityKind::Round), 2);
        assert_eq!(store.len(EntityKind::Match), 6);
    }

    #[test]
    fn test_load_unstarted_tournament() {
        let mut store = InMemoryStore::new();
        let live = tournament(4, 3);
        save_tournament(&mut store, &live).unwrap();

        let loaded = load_tournament(&store, live.id).unwrap();
        assert!(!loaded.is_started());
        assert_eq!(loaded.participants().count(), 4);
    }

    #[test]
    fn test_load_missing_tournament() {
        let store = InMemoryStore::new();
        let id = EntityId::new(EntityKind::Tournament, 4).unwrap();
        let err = load_tournament(&store, id).unwrap_err();
        assert!(matches!(
            err,
            StorageError::NotFound {
                kind: EntityKind::Tournament,
                ..
            }
        ));
    }

    #[test]
    fn test_load_with_missing_match_fails() {
        let mut ids = SequentialIds::new();
        let live = tournament_in_progress(&mut ids);

        let mut store = InMemoryStore::new();
        let round = live.round("Round_1").unwrap();
        store.save(&RoundRecord::from(round)).unwrap();
        store.save(&TournamentRecord::from(&live)).unwrap();

        let err = load_tournament(&store, live.id).unwrap_err();
        assert!(matches!(
            err,
            StorageError::NotFound {
                kind: EntityKind::Match,
                ..
            }
        ));
    }

    #[test]
    fn test_load_rejects_missing_slot() {
        let mut store = InMemoryStore::new();
        let mut record = TournamentRecord::from(&tournament(4, 3));
        record.rounds.remove("Round_3");
        store.save(&record).unwrap();

        let err = load_tournament(&store, record.id).unwrap_err();
        assert!(matches!(err, StorageError::InvalidRecord(_)));
    }

    #[test]
    fn test_load_rejects_finished_round_with_pending_match() {
        let mut ids = SequentialIds::new();
        let live = tournament_in_progress(&mut ids);

        let mut store = InMemoryStore::new();
        save_tournament(&mut store, &live).unwrap();

        let mut record = RoundRecord::from(live.round("Round_2").unwrap());
        record.is_finished = true;
        store.save(&record).unwrap();

        let err = load_tournament(&store, live.id).unwrap_err();
        assert!(matches!(err, StorageError::InvalidRecord(_)));
    }
}
