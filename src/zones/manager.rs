//! Zone manager for object locations and movement.
//!
//! The `ZoneManager` tracks which zone every object is in and the order of
//! objects inside each zone. Every zone is ordered: for libraries the last
//! element is the top card, for the battlefield it is the most recent
//! arrival, for graveyards the most recent card put there.
//!
//! Both maps are persistent (`im`), so snapshots are O(1).
//!
//! ## Usage
//!
//! ```
//! use rust_tcg::core::{EntityId, PlayerId};
//! use rust_tcg::zones::{ZoneId, ZoneManager, ZonePosition};
//!
//! let mut zones = ZoneManager::new();
//! let library = ZoneId::library(PlayerId::new(0));
//!
//! zones.add_to_zone(EntityId(10), library, ZonePosition::Top).unwrap();
//! zones.add_to_zone(EntityId(11), library, ZonePosition::Bottom).unwrap();
//! assert_eq!(zones.top_card(library), Some(EntityId(10)));
//! ```

use im::{OrdMap, Vector};
use serde::{Deserialize, Serialize};

use crate::core::{EntityId, GameRng, PlayerId, RulesError, RulesResult};

/// The kinds of zone in the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ZoneKind {
    Library,
    Hand,
    Battlefield,
    Graveyard,
    Exile,
    Stack,
    Command,
}

impl ZoneKind {
    /// Is this zone scoped to one player?
    #[must_use]
    pub const fn is_player_scoped(self) -> bool {
        matches!(self, Self::Library | Self::Hand | Self::Graveyard | Self::Exile)
    }

    /// Static label, used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Library => "library",
            Self::Hand => "hand",
            Self::Battlefield => "battlefield",
            Self::Graveyard => "graveyard",
            Self::Exile => "exile",
            Self::Stack => "stack",
            Self::Command => "command",
        }
    }
}

/// A concrete zone: a kind plus, for player-scoped kinds, its owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneId {
    pub kind: ZoneKind,
    pub owner: Option<PlayerId>,
}

impl ZoneId {
    /// Zone of `kind`, scoped to `owner` when the kind is player-scoped.
    #[must_use]
    pub fn of(kind: ZoneKind, owner: PlayerId) -> Self {
        if kind.is_player_scoped() {
            Self { kind, owner: Some(owner) }
        } else {
            Self { kind, owner: None }
        }
    }

    #[must_use]
    pub const fn library(owner: PlayerId) -> Self {
        Self { kind: ZoneKind::Library, owner: Some(owner) }
    }

    #[must_use]
    pub const fn hand(owner: PlayerId) -> Self {
        Self { kind: ZoneKind::Hand, owner: Some(owner) }
    }

    #[must_use]
    pub const fn graveyard(owner: PlayerId) -> Self {
        Self { kind: ZoneKind::Graveyard, owner: Some(owner) }
    }

    #[must_use]
    pub const fn exile(owner: PlayerId) -> Self {
        Self { kind: ZoneKind::Exile, owner: Some(owner) }
    }

    #[must_use]
    pub const fn battlefield() -> Self {
        Self { kind: ZoneKind::Battlefield, owner: None }
    }

    #[must_use]
    pub const fn stack() -> Self {
        Self { kind: ZoneKind::Stack, owner: None }
    }

    #[must_use]
    pub const fn command() -> Self {
        Self { kind: ZoneKind::Command, owner: None }
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.owner {
            Some(owner) => write!(f, "{} ({})", self.kind.name(), owner),
            None => write!(f, "{}", self.kind.name()),
        }
    }
}

/// Position for inserting into a zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZonePosition {
    /// Add to top of zone (end of the order).
    Top,
    /// Add to bottom of zone.
    Bottom,
    /// Insert at specific index (0 = bottom).
    Index(usize),
}

/// Tracks object locations and per-zone order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneManager {
    /// Object locations: entity -> zone
    locations: OrdMap<EntityId, ZoneId>,

    /// Order within each zone (index 0 = bottom).
    zone_order: OrdMap<ZoneId, Vector<EntityId>>,
}

impl ZoneManager {
    /// Create a new empty zone manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_ordered(&mut self, entity: EntityId, zone: ZoneId, position: ZonePosition) {
        let mut order = self.zone_order.get(&zone).cloned().unwrap_or_default();
        match position {
            ZonePosition::Top => order.push_back(entity),
            ZonePosition::Bottom => order.push_front(entity),
            ZonePosition::Index(i) => {
                let idx = i.min(order.len());
                order.insert(idx, entity);
            }
        }
        self.zone_order.insert(zone, order);
    }

    fn remove_ordered(&mut self, entity: EntityId, zone: ZoneId) -> RulesResult<()> {
        let mut order = self.zone_order.get(&zone).cloned().unwrap_or_default();
        let index = order.index_of(&entity).ok_or_else(|| {
            RulesError::inconsistent(format!("{entity} is located in {zone} but missing from its order"))
        })?;
        order.remove(index);
        self.zone_order.insert(zone, order);
        Ok(())
    }

    /// Add a new object to a zone.
    ///
    /// Fails with `InconsistentState` if the entity is already located
    /// somewhere: an entity belongs to exactly one zone.
    pub fn add_to_zone(&mut self, entity: EntityId, zone: ZoneId, position: ZonePosition) -> RulesResult<()> {
        if let Some(existing) = self.locations.get(&entity) {
            return Err(RulesError::inconsistent(format!(
                "{entity} added to {zone} while already in {existing}"
            )));
        }
        self.locations.insert(entity, zone);
        self.insert_ordered(entity, zone, position);
        Ok(())
    }

    /// Move an object to another zone atomically. Returns the old zone.
    pub fn move_to_zone(
        &mut self,
        entity: EntityId,
        new_zone: ZoneId,
        position: ZonePosition,
    ) -> RulesResult<ZoneId> {
        let old_zone = self
            .get_zone(entity)
            .ok_or_else(|| RulesError::inconsistent(format!("{entity} is not in any zone")))?;

        self.remove_ordered(entity, old_zone)?;
        self.locations.insert(entity, new_zone);
        self.insert_ordered(entity, new_zone, position);

        Ok(old_zone)
    }

    /// Remove an object from the manager entirely (tokens ceasing to exist).
    pub fn remove(&mut self, entity: EntityId) -> RulesResult<ZoneId> {
        let zone = self
            .locations
            .remove(&entity)
            .ok_or_else(|| RulesError::inconsistent(format!("{entity} removed but not in any zone")))?;
        self.remove_ordered(entity, zone)?;
        Ok(zone)
    }

    /// Get the zone an object is in.
    #[must_use]
    pub fn get_zone(&self, entity: EntityId) -> Option<ZoneId> {
        self.locations.get(&entity).copied()
    }

    /// Check if an object is in a specific zone.
    #[must_use]
    pub fn is_in_zone(&self, entity: EntityId, zone: ZoneId) -> bool {
        self.locations.get(&entity) == Some(&zone)
    }

    /// Objects in a zone, bottom to top.
    #[must_use]
    pub fn cards_in_zone(&self, zone: ZoneId) -> Vector<EntityId> {
        self.zone_order.get(&zone).cloned().unwrap_or_default()
    }

    /// Number of objects in a zone.
    #[must_use]
    pub fn zone_size(&self, zone: ZoneId) -> usize {
        self.zone_order.get(&zone).map_or(0, Vector::len)
    }

    /// Top object of a zone.
    #[must_use]
    pub fn top_card(&self, zone: ZoneId) -> Option<EntityId> {
        self.zone_order.get(&zone)?.last().copied()
    }

    /// Bottom object of a zone.
    #[must_use]
    pub fn bottom_card(&self, zone: ZoneId) -> Option<EntityId> {
        self.zone_order.get(&zone)?.front().copied()
    }

    /// Shuffle a zone.
    pub fn shuffle_zone(&mut self, zone: ZoneId, rng: &mut GameRng) {
        if let Some(order) = self.zone_order.get(&zone) {
            let mut cards: Vec<EntityId> = order.iter().copied().collect();
            rng.shuffle(&mut cards);
            self.zone_order.insert(zone, Vector::from(cards));
        }
    }

    /// Get total number of objects tracked.
    #[must_use]
    pub fn total_cards(&self) -> usize {
        self.locations.len()
    }

    /// Check if the manager contains an entity.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.locations.contains_key(&entity)
    }

    /// Every (entity, zone) pair in entity order.
    pub fn locations(&self) -> impl Iterator<Item = (EntityId, ZoneId)> + '_ {
        self.locations.iter().map(|(&e, &z)| (e, z))
    }
}
