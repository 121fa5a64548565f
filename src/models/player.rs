//! Player model.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{PlayerId, TournamentError};

/// National chess federation ID: two letters then five digits.
fn chess_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z]{2}[0-9]{5}$").expect("valid chess id regex"))
}

/// A registered player. Tournaments refer to players by ID only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,

    pub last_name: String,

    pub first_name: String,

    pub birth_date: NaiveDate,

    /// National federation ID, e.g. "AB12345"
    pub chess_id: String,
}

impl Player {
    /// Create a player, normalizing names and the chess ID.
    pub fn new(
        id: PlayerId,
        last_name: &str,
        first_name: &str,
        birth_date: NaiveDate,
        chess_id: &str,
    ) -> Result<Self, TournamentError> {
        let last_name = capitalize(last_name);
        let first_name = capitalize(first_name);
        if last_name.is_empty() || first_name.is_empty() {
            return Err(TournamentError::InvalidInput(
                "player names must not be empty".to_string(),
            ));
        }

        let chess_id = chess_id.trim().to_uppercase();
        if !chess_id_pattern().is_match(&chess_id) {
            return Err(TournamentError::InvalidInput(format!(
                "invalid chess id {:?}, expected format AA00000",
                chess_id
            )));
        }

        Ok(Self {
            id,
            last_name,
            first_name,
            birth_date,
            chess_id,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.trim().chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityId;

    fn birth() -> NaiveDate {
        NaiveDate::from_ymd_opt(1990, 11, 30).unwrap()
    }

    #[test]
    fn test_player_creation_normalizes() {
        let player = Player::new(
            EntityId::player(1).unwrap(),
            "  carlsen",
            "MAGNUS",
            birth(),
            "aa00010",
        )
        .unwrap();

        assert_eq!(player.last_name, "Carlsen");
        assert_eq!(player.first_name, "Magnus");
        assert_eq!(player.chess_id, "AA00010");
        assert_eq!(player.full_name(), "Magnus Carlsen");
    }

    #[test]
    fn test_player_rejects_bad_chess_id() {
        let id = EntityId::player(1).unwrap();
        assert!(Player::new(id, "Doe", "Jane", birth(), "A000001").is_err());
        assert!(Player::new(id, "Doe", "Jane", birth(), "AA0001").is_err());
        assert!(Player::new(id, "Doe", "Jane", birth(), "AA000011").is_err());
    }

    #[test]
    fn test_player_rejects_empty_name() {
        let id = EntityId::player(1).unwrap();
        let err = Player::new(id, "  ", "Jane", birth(), "AA00001").unwrap_err();
        assert_eq!(err.kind(), crate::models::ErrorKind::Validation);
    }

    #[test]
    fn test_player_serialization() {
        let player = Player::new(
            EntityId::player(4).unwrap(),
            "Polgar",
            "Judit",
            NaiveDate::from_ymd_opt(1976, 7, 23).unwrap(),
            "HU00004",
        )
        .unwrap();

        let json = serde_json::to_string(&player).unwrap();
        assert!(json.contains("\"id\":\"p_4\""));
        assert!(json.contains("\"birth_date\":\"1976-07-23\""));

        let deserialized: Player = serde_json::from_str(&json).unwrap();
        assert_eq!(player, deserialized);
    }
}
