//! Score aggregation and dense ranking.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::PlayerId;

/// A player's entry in a tournament, owned by the tournament.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub player_id: PlayerId,

    /// Cumulative score over closed rounds
    pub score: f64,
}

impl Participant {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            score: 0.0,
        }
    }
}

/// Participants tied on the same score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankGroup {
    /// Dense rank, starting at 1
    pub rank: u32,
    pub score: f64,
    /// Sorted by player ID
    pub players: Vec<PlayerId>,
}

/// Rank groups ordered best-first.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Ranking {
    groups: Vec<RankGroup>,
}

impl Ranking {
    /// Group participants by score, highest score first.
    pub fn from_participants<'a>(participants: impl IntoIterator<Item = &'a Participant>) -> Self {
        let mut sorted: Vec<&Participant> = participants.into_iter().collect();
        sorted.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.player_id.cmp(&b.player_id))
        });

        let mut groups: Vec<RankGroup> = Vec::new();
        for participant in sorted {
            match groups.last_mut() {
                Some(group) if group.score == participant.score => {
                    group.players.push(participant.player_id);
                }
                _ => {
                    let rank = groups.len() as u32 + 1;
                    groups.push(RankGroup {
                        rank,
                        score: participant.score,
                        players: vec![participant.player_id],
                    });
                }
            }
        }

        Self { groups }
    }

    pub fn groups(&self) -> &[RankGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn rank_of(&self, player: PlayerId) -> Option<u32> {
        self.groups
            .iter()
            .find(|g| g.players.contains(&player))
            .map(|g| g.rank)
    }

    /// Player IDs per group, best group first.
    pub fn player_groups(&self) -> Vec<Vec<PlayerId>> {
        self.groups.iter().map(|g| g.players.clone()).collect()
    }

    /// Rank number to the players holding it.
    pub fn as_map(&self) -> BTreeMap<u32, Vec<PlayerId>> {
        self.groups
            .iter()
            .map(|g| (g.rank, g.players.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityId;
    use pretty_assertions::assert_eq;

    fn entry(n: u32, score: f64) -> Participant {
        Participant {
            player_id: EntityId::player(n).unwrap(),
            score,
        }
    }

    fn p(n: u32) -> PlayerId {
        EntityId::player(n).unwrap()
    }

    #[test]
    fn test_dense_ranks_descending_score() {
        let participants = vec![
            entry(1, 1.0),
            entry(2, 0.0),
            entry(3, 0.5),
            entry(4, 0.5),
        ];
        let ranking = Ranking::from_participants(&participants);

        let mut expected = BTreeMap::new();
        expected.insert(1, vec![p(1)]);
        expected.insert(2, vec![p(3), p(4)]);
        expected.insert(3, vec![p(2)]);
        assert_eq!(ranking.as_map(), expected);
    }

    #[test]
    fn test_all_tied_share_rank_one() {
        let participants: Vec<Participant> = (1..=4).map(|n| entry(n, 0.0)).collect();
        let ranking = Ranking::from_participants(&participants);

        assert_eq!(ranking.groups().len(), 1);
        assert_eq!(ranking.groups()[0].rank, 1);
        assert_eq!(ranking.groups()[0].players, vec![p(1), p(2), p(3), p(4)]);
    }

    #[test]
    fn test_ranks_are_dense() {
        let participants = vec![entry(1, 2.0), entry(2, 2.0), entry(3, 1.5), entry(4, 0.0)];
        let ranking = Ranking::from_participants(&participants);

        assert_eq!(ranking.rank_of(p(1)), Some(1));
        assert_eq!(ranking.rank_of(p(2)), Some(1));
        assert_eq!(ranking.rank_of(p(3)), Some(2));
        assert_eq!(ranking.rank_of(p(4)), Some(3));
        assert_eq!(ranking.rank_of(p(9)), None);
    }

    #[test]
    fn test_player_groups_order() {
        let participants = vec![entry(10, 0.5), entry(2, 1.0), entry(3, 0.5)];
        let ranking = Ranking::from_participants(&participants);
        assert_eq!(
            ranking.player_groups(),
            vec![vec![p(2)], vec![p(3), p(10)]]
        );
    }

    #[test]
    fn test_empty_ranking() {
        let ranking = Ranking::from_participants(&Vec::<Participant>::new());
        assert!(ranking.is_empty());
    }
}
