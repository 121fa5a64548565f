//! Sequential entity IDs of the form `<kind>_<number>`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::TournamentError;

/// The kinds of record the repository stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Player,
    Match,
    Round,
    Tournament,
}

impl EntityKind {
    /// All kinds, in storage order.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Player,
        EntityKind::Match,
        EntityKind::Round,
        EntityKind::Tournament,
    ];

    /// Single-letter prefix used in the textual ID.
    pub fn prefix(&self) -> char {
        match self {
            EntityKind::Player => 'p',
            EntityKind::Match => 'm',
            EntityKind::Round => 'r',
            EntityKind::Tournament => 't',
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "p" => Some(EntityKind::Player),
            "m" => Some(EntityKind::Match),
            "r" => Some(EntityKind::Round),
            "t" => Some(EntityKind::Tournament),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Player => write!(f, "player"),
            EntityKind::Match => write!(f, "match"),
            EntityKind::Round => write!(f, "round"),
            EntityKind::Tournament => write!(f, "tournament"),
        }
    }
}

/// An entity ID such as `p_12`.
///
/// IDs order by kind first and then by numeric suffix, so sorting two
/// player IDs gives the canonical order used for match pairs (`p_2` < `p_10`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    kind: EntityKind,
    number: u32,
}

impl EntityId {
    /// Create an ID. Numbers start at 1.
    pub fn new(kind: EntityKind, number: u32) -> Result<Self, TournamentError> {
        if number == 0 {
            return Err(TournamentError::InvalidInput(format!(
                "{} id number must be at least 1",
                kind
            )));
        }
        Ok(Self { kind, number })
    }

    pub fn player(number: u32) -> Result<Self, TournamentError> {
        Self::new(EntityKind::Player, number)
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn number(&self) -> u32 {
        self.number
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind.prefix(), self.number)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self)
    }
}

impl FromStr for EntityId {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TournamentError::InvalidInput(format!("malformed id: {:?}", s));

        let (prefix, number) = s.trim().split_once('_').ok_or_else(invalid)?;
        let kind = EntityKind::from_prefix(prefix).ok_or_else(invalid)?;
        let number: u32 = number.parse().map_err(|_| invalid())?;
        Self::new(kind, number)
    }
}

impl TryFrom<String> for EntityId {
    type Error = TournamentError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.to_string()
    }
}

/// Type alias for player IDs
pub type PlayerId = EntityId;

/// Type alias for match IDs
pub type MatchId = EntityId;

/// Type alias for round IDs
pub type RoundId = EntityId;

/// Type alias for tournament IDs
pub type TournamentId = EntityId;

/// Source of fresh IDs for records created by the core.
pub trait IdAllocator {
    fn allocate(&mut self, kind: EntityKind) -> EntityId;
}

/// Monotonic per-kind counters.
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    next: BTreeMap<EntityKind, u32>,
}

impl SequentialIds {
    /// Counters starting at 1 for every kind.
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue after existing records: `next` maps a kind to its next free number.
    pub fn starting_at(next: BTreeMap<EntityKind, u32>) -> Self {
        Self { next }
    }
}

impl IdAllocator for SequentialIds {
    fn allocate(&mut self, kind: EntityKind) -> EntityId {
        let counter = self.next.entry(kind).or_insert(1);
        let number = (*counter).max(1);
        *counter = number + 1;
        EntityId { kind, number }
    }
}
