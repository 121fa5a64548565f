//! Round-robin pairing engine.
//!
//! A [`Pairing`] is built from a fixed, even-sized roster and a seed
//! permutation of it. The circle method turns the seed into N-1
//! configurations (perfect matchings) that together cover every pair of
//! players exactly once. Rounds consume configurations:
//!
//! - the first round takes the last generated configuration;
//! - later rounds search the pool for a configuration pairing two
//!   highly-ranked players who have not met yet.
//!
//! Only the seed permutation needs to be persisted: [`Pairing::instantiate`]
//! regenerates the same configurations and prunes the ones already used.

mod rng;

pub use rng::*;

use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

use crate::models::{PlayerId, TournamentError};

/// An unordered pair of players, stored in canonical (ascending ID) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pair(PlayerId, PlayerId);

impl Pair {
    pub fn new(a: PlayerId, b: PlayerId) -> Self {
        if a <= b {
            Pair(a, b)
        } else {
            Pair(b, a)
        }
    }

    pub fn first(&self) -> PlayerId {
        self.0
    }

    pub fn second(&self) -> PlayerId {
        self.1
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.0 == player || self.1 == player
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} vs {}", self.0, self.1)
    }
}

/// One round's perfect matching: disjoint pairs covering the whole roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pairs: Vec<Pair>,
}

impl Configuration {
    pub fn new(pairs: Vec<Pair>) -> Self {
        Self { pairs }
    }

    /// Pair element `i` with element `n-1-i` of a circle arrangement.
    fn from_arrangement(arrangement: &[PlayerId]) -> Self {
        let n = arrangement.len();
        let pairs = (0..n / 2)
            .map(|i| Pair::new(arrangement[i], arrangement[n - 1 - i]))
            .collect();
        Self { pairs }
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    pub fn contains(&self, pair: &Pair) -> bool {
        self.pairs.contains(pair)
    }

    /// True if any pair of this configuration is in `played`.
    pub fn intersects(&self, played: &BTreeSet<Pair>) -> bool {
        self.pairs.iter().any(|pair| played.contains(pair))
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self.pairs.iter().map(Pair::to_string).collect();
        write!(f, "[{}]", pairs.join(", "))
    }
}

/// One step of the circle method: keep the first element fixed and move
/// the last element to the second position.
pub fn rotate(arrangement: &[PlayerId]) -> Vec<PlayerId> {
    let n = arrangement.len();
    if n < 3 {
        return arrangement.to_vec();
    }

    let mut next = Vec::with_capacity(n);
    next.push(arrangement[0]);
    next.push(arrangement[n - 1]);
    next.extend_from_slice(&arrangement[1..n - 1]);
    next
}

/// All N-1 configurations derived from `seed`, in generation order.
pub fn generate_circle_configurations(seed: &[PlayerId]) -> Vec<Configuration> {
    let mut current = seed.to_vec();
    (1..seed.len())
        .map(|_| {
            current = rotate(&current);
            Configuration::from_arrangement(&current)
        })
        .collect()
}

/// Every unordered pair of roster members.
pub fn all_pairs(roster: &[PlayerId]) -> BTreeSet<Pair> {
    let mut pairs = BTreeSet::new();
    for (i, a) in roster.iter().enumerate() {
        for b in &roster[i + 1..] {
            pairs.insert(Pair::new(*a, *b));
        }
    }
    pairs
}

fn validate_roster(roster: &[PlayerId]) -> Result<(), TournamentError> {
    if roster.len() < 2 {
        return Err(TournamentError::RosterTooSmall(roster.len()));
    }
    if roster.len() % 2 != 0 {
        return Err(TournamentError::OddRoster(roster.len()));
    }

    let mut seen = BTreeSet::new();
    for player in roster {
        if !seen.insert(*player) {
            return Err(TournamentError::DuplicateParticipant(*player));
        }
    }
    Ok(())
}

/// Round-robin schedule state for a fixed roster.
#[derive(Debug, Clone)]
pub struct Pairing {
    roster: Vec<PlayerId>,
    seed: Vec<PlayerId>,
    remaining: Vec<Configuration>,
    played: BTreeSet<Pair>,
}

impl Pairing {
    /// Draw a random seed permutation of `roster` and generate its schedule.
    pub fn new<R: RandomSource>(roster: Vec<PlayerId>, rng: &mut R) -> Result<Self, TournamentError> {
        validate_roster(&roster)?;

        let mut seed = roster.clone();
        rng.shuffle(&mut seed);
        debug!(players = roster.len(), "Seeded pairing");

        Ok(Self::from_seed(roster, seed))
    }

    fn from_seed(roster: Vec<PlayerId>, seed: Vec<PlayerId>) -> Self {
        let remaining = generate_circle_configurations(&seed);
        Self {
            roster,
            seed,
            remaining,
            played: BTreeSet::new(),
        }
    }

    /// Rebuild a pairing from a persisted seed and the pairs already played.
    ///
    /// Any configuration sharing at least one pair with `played` is dropped
    /// as a whole.
    pub fn instantiate(
        roster: Vec<PlayerId>,
        seed: Vec<PlayerId>,
        played: impl IntoIterator<Item = Pair>,
    ) -> Result<Self, TournamentError> {
        validate_roster(&roster)?;

        let mut sorted_seed = seed.clone();
        sorted_seed.sort();
        let mut sorted_roster = roster.clone();
        sorted_roster.sort();
        if sorted_seed != sorted_roster {
            return Err(TournamentError::InvalidInput(
                "pairing seed is not a permutation of the roster".to_string(),
            ));
        }

        let mut pairing = Self::from_seed(roster, seed);
        pairing.played.extend(played);

        let played = &pairing.played;
        pairing.remaining.retain(|c| !c.intersects(played));

        debug!(
            remaining = pairing.remaining.len(),
            played = pairing.played.len(),
            "Reconstructed pairing"
        );
        Ok(pairing)
    }

    pub fn roster(&self) -> &[PlayerId] {
        &self.roster
    }

    /// The seed permutation; persist this to rebuild the schedule later.
    pub fn seed(&self) -> &[PlayerId] {
        &self.seed
    }

    pub fn remaining_configurations(&self) -> &[Configuration] {
        &self.remaining
    }

    pub fn played_pairs(&self) -> &BTreeSet<Pair> {
        &self.played
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining.is_empty()
    }

    fn take(&mut self, index: usize) -> Configuration {
        let configuration = self.remaining.swap_remove(index);
        self.played.extend(configuration.pairs().iter().copied());
        configuration
    }

    /// Configuration for the first round: the last one generated.
    pub fn first_round_configuration(&mut self) -> Result<Configuration, TournamentError> {
        if self.remaining.is_empty() {
            return Err(TournamentError::Exhausted);
        }
        let last = self.remaining.len() - 1;
        Ok(self.take(last))
    }

    /// Take the configuration holding the first unplayed pair of `pool`,
    /// scanning pairs `(i, j)` with `i < j` in pool order.
    pub fn try_configuration_for_pool(&mut self, pool: &[PlayerId]) -> Option<Configuration> {
        for (i, a) in pool.iter().enumerate() {
            for b in &pool[i + 1..] {
                let pair = Pair::new(*a, *b);
                if self.played.contains(&pair) {
                    continue;
                }
                if let Some(index) = self.remaining.iter().position(|c| c.contains(&pair)) {
                    debug!(%pair, "Selected configuration for unplayed pair");
                    return Some(self.take(index));
                }
            }
        }
        None
    }

    /// Pick the next configuration from rank groups ordered best-first.
    ///
    /// The candidate pool starts with the best group and grows one group at
    /// a time until it holds an unplayed pair.
    pub fn next_configuration_from_ranking(
        &mut self,
        rank_groups: &[Vec<PlayerId>],
    ) -> Result<Configuration, TournamentError> {
        if let Some(unknown) = rank_groups
            .iter()
            .flatten()
            .find(|p| !self.roster.contains(p))
        {
            return Err(TournamentError::UnknownParticipant(*unknown));
        }
        if self.remaining.is_empty() {
            return Err(TournamentError::Exhausted);
        }

        let mut pool = Vec::with_capacity(self.roster.len());
        for group in rank_groups {
            pool.extend_from_slice(group);
            if let Some(configuration) = self.try_configuration_for_pool(&pool) {
                return Ok(configuration);
            }
        }

        Err(TournamentError::Exhausted)
    }
}
