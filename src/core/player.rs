//! Player identification and per-player data storage.
//!
//! ## PlayerId
//!
//! Type-safe seat index. Seat order is turn order.
//!
//! ## PlayerMap
//!
//! Per-player data backed by `Vec` for O(1) access, indexable by `PlayerId`.
//!
//! ## PlayerState
//!
//! Life total, poison counters, mana pool and the per-turn bookkeeping the
//! rules need (land drops, empty-library draws, elimination).

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

use crate::cards::ManaPool;

/// Player identifier (seat index, 0-based).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// Create a new player ID.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Get the raw player index (0-based).
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Iterate over all player IDs for a game with `player_count` players.
    pub fn all(player_count: usize) -> impl Iterator<Item = PlayerId> {
        (0..player_count as u8).map(PlayerId)
    }

    /// The next seat in turn order.
    #[must_use]
    pub fn next(self, player_count: usize) -> PlayerId {
        PlayerId(((self.index() + 1) % player_count) as u8)
    }

    /// Players in APNAP order: the active player first, then the others in
    /// turn order.
    ///
    /// ```
    /// use rust_tcg::core::PlayerId;
    ///
    /// let order = PlayerId::apnap(PlayerId::new(2), 4);
    /// assert_eq!(order, vec![PlayerId::new(2), PlayerId::new(3), PlayerId::new(0), PlayerId::new(1)]);
    /// ```
    #[must_use]
    pub fn apnap(active: PlayerId, player_count: usize) -> Vec<PlayerId> {
        (0..player_count)
            .map(|offset| PlayerId(((active.index() + offset) % player_count) as u8))
            .collect()
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Player {}", self.0)
    }
}

/// Per-player data storage with O(1) access.
///
/// ## Example
///
/// ```
/// use rust_tcg::core::{PlayerId, PlayerMap};
///
/// let mut life: PlayerMap<i32> = PlayerMap::new(2, |_| 20);
/// life[PlayerId::new(1)] -= 3;
/// assert_eq!(life[PlayerId::new(1)], 17);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerMap<T> {
    data: Vec<T>,
}

impl<T> PlayerMap<T> {
    /// Create a new PlayerMap with values from a factory function.
    pub fn new(player_count: usize, factory: impl Fn(PlayerId) -> T) -> Self {
        assert!(player_count > 0, "Must have at least 1 player");
        assert!(player_count <= 255, "At most 255 players supported");

        let data = (0..player_count as u8).map(|i| factory(PlayerId(i))).collect();

        Self { data }
    }

    /// Create a new PlayerMap with all entries set to the same value.
    pub fn with_value(player_count: usize, value: T) -> Self
    where
        T: Clone,
    {
        Self::new(player_count, |_| value.clone())
    }

    /// Create a new PlayerMap with default values.
    pub fn with_default(player_count: usize) -> Self
    where
        T: Default,
    {
        Self::new(player_count, |_| T::default())
    }

    /// Get the number of players.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.data.len()
    }

    /// Get a reference to a player's data.
    #[must_use]
    pub fn get(&self, player: PlayerId) -> &T {
        &self.data[player.index()]
    }

    /// Get a mutable reference to a player's data.
    pub fn get_mut(&mut self, player: PlayerId) -> &mut T {
        &mut self.data[player.index()]
    }

    /// Iterate over (PlayerId, &T) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &T)> {
        self.data.iter().enumerate().map(|(i, v)| (PlayerId(i as u8), v))
    }

    /// Iterate over (PlayerId, &mut T) pairs.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PlayerId, &mut T)> {
        self.data
            .iter_mut()
            .enumerate()
            .map(|(i, v)| (PlayerId(i as u8), v))
    }

    /// Iterate over all player IDs.
    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> {
        (0..self.data.len() as u8).map(PlayerId)
    }
}

impl<T> Index<PlayerId> for PlayerMap<T> {
    type Output = T;

    fn index(&self, player: PlayerId) -> &Self::Output {
        self.get(player)
    }
}

impl<T> IndexMut<PlayerId> for PlayerMap<T> {
    fn index_mut(&mut self, player: PlayerId) -> &mut Self::Output {
        self.get_mut(player)
    }
}

/// Rules-relevant facts about one player.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Current life total.
    pub life: i32,

    /// Poison counters.
    pub poison: u32,

    /// Unspent mana. Emptied at the end of every step.
    pub mana_pool: ManaPool,

    /// Lands played during the current turn.
    pub lands_played: u32,

    /// Set when the player was asked to draw from an empty library.
    /// Checked (and acted on) by state-based actions.
    pub drew_from_empty_library: bool,

    /// The player has left the game.
    pub has_lost: bool,
}

impl PlayerState {
    /// Fresh state with the given starting life.
    #[must_use]
    pub fn new(life: i32) -> Self {
        Self {
            life,
            ..Self::default()
        }
    }

    /// Is the player still in the game?
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.has_lost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_basics() {
        let p0 = PlayerId::new(0);
        assert_eq!(p0.index(), 0);
        assert_eq!(format!("{}", p0), "Player 0");
        assert_eq!(p0.next(2), PlayerId::new(1));
        assert_eq!(PlayerId::new(1).next(2), PlayerId::new(0));
    }

    #[test]
    fn test_apnap_wraps_around() {
        let order = PlayerId::apnap(PlayerId::new(1), 3);
        assert_eq!(order, vec![PlayerId::new(1), PlayerId::new(2), PlayerId::new(0)]);
    }

    #[test]
    fn test_player_map_new() {
        let map: PlayerMap<i32> = PlayerMap::new(4, |p| p.index() as i32 * 10);
        assert_eq!(map[PlayerId::new(0)], 0);
        assert_eq!(map[PlayerId::new(3)], 30);
        assert_eq!(map.player_count(), 4);
    }

    #[test]
    fn test_player_map_mutation() {
        let mut map: PlayerMap<PlayerState> = PlayerMap::new(2, |_| PlayerState::new(20));
        map[PlayerId::new(1)].life -= 5;
        assert_eq!(map[PlayerId::new(0)].life, 20);
        assert_eq!(map[PlayerId::new(1)].life, 15);
        assert!(map[PlayerId::new(1)].is_active());
    }

    #[test]
    fn test_player_map_serialization() {
        let map: PlayerMap<i32> = PlayerMap::new(2, |p| p.index() as i32 + 1);
        let json = serde_json::to_string(&map).unwrap();
        let deserialized: PlayerMap<i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(map, deserialized);
    }

    #[test]
    #[should_panic(expected = "Must have at least 1 player")]
    fn test_player_map_zero_players() {
        let _: PlayerMap<i32> = PlayerMap::with_value(0, 0);
    }
}
