//! Entity identifiers and timestamps.
//!
//! Every game object (player, card, token, ability on the stack) is an
//! entity with a unique `EntityId`. Facts about an entity live in the
//! component store; the id itself carries no data.
//!
//! ## ID Layout
//!
//! - `0..player_count`: reserved for players
//! - `player_count..`: cards, tokens and stack objects, allocated in order
//!
//! ## Usage
//!
//! ```
//! use rust_tcg::core::{EntityId, PlayerId};
//!
//! let p1 = EntityId::player(PlayerId::new(1));
//! assert!(p1.is_player(2));
//! assert_eq!(p1.as_player(2), Some(PlayerId::new(1)));
//!
//! let card = EntityId(10);
//! assert!(!card.is_player(2));
//! ```

use serde::{Deserialize, Serialize};

use super::player::PlayerId;

/// Unique identifier for any game entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    /// First id available for non-player entities.
    #[must_use]
    pub const fn first_non_player(player_count: usize) -> u32 {
        player_count as u32
    }

    /// Does this id refer to a player?
    #[must_use]
    pub const fn is_player(self, player_count: usize) -> bool {
        self.0 < player_count as u32
    }

    /// Convert to a `PlayerId` if this is a player entity.
    #[must_use]
    pub fn as_player(self, player_count: usize) -> Option<PlayerId> {
        if self.is_player(player_count) {
            Some(PlayerId::new(self.0 as u8))
        } else {
            None
        }
    }

    /// Entity id of a player.
    #[must_use]
    pub const fn player(id: PlayerId) -> Self {
        Self(id.0 as u32)
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Monotonic game timestamp.
///
/// Assigned when an object enters a zone, when a continuous or replacement
/// effect is created, and when a trigger is recorded. Later timestamps are
/// strictly greater.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Get the raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{}", self.0)
    }
}
