//! Component store: typed facts attached to entities.
//!
//! Components are data only. Each kind lives in its own persistent map
//! keyed by `EntityId`, so a `GameState` clone stays O(1) and iteration
//! order is deterministic.
//!
//! Battlefield status (tapped, damage, counters, attachment, face-down,
//! controller, granted abilities) is wiped when an object leaves the
//! battlefield: the rules treat it as a new object afterwards.

use im::{OrdMap, OrdSet, Vector};
use serde::{Deserialize, Serialize};

use super::entity::{EntityId, Timestamp};
use super::player::PlayerId;
use crate::cards::AbilityDef;
use crate::layers::Duration;

/// Kinds of counters.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CounterType {
    PlusOnePlusOne,
    MinusOneMinusOne,
    Loyalty,
    Depletion,
    Charge,
    Poison,
    Named(String),
}

/// An ability granted to an object by an effect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantedAbility {
    /// The granted ability.
    pub ability: AbilityDef,
    /// Object whose effect granted it.
    pub source: Option<EntityId>,
    /// How long the grant lasts.
    pub expiry: Duration,
    /// Player whose effect created the grant.
    pub grantor: PlayerId,
    /// Turn the grant was created.
    pub created_turn: u32,
}

/// A single component, as exposed to readers of the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Component {
    Tapped,
    Damage(u32),
    DeathtouchDamage,
    Counters(OrdMap<CounterType, u32>),
    AttachedTo(EntityId),
    FaceDown,
    Controller(PlayerId),
    GrantedAbility(GrantedAbility),
    ZoneTimestamp(Timestamp),
    ControlledSinceTurn(u32),
}

/// Persistent per-component maps.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentStore {
    tapped: OrdSet<EntityId>,
    damage: OrdMap<EntityId, u32>,
    deathtouch_damage: OrdSet<EntityId>,
    counters: OrdMap<EntityId, OrdMap<CounterType, u32>>,
    attached_to: OrdMap<EntityId, EntityId>,
    face_down: OrdSet<EntityId>,
    controller: OrdMap<EntityId, PlayerId>,
    granted: OrdMap<EntityId, Vector<GrantedAbility>>,
    zone_timestamp: OrdMap<EntityId, Timestamp>,
    controlled_since: OrdMap<EntityId, u32>,
}

impl ComponentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // === Tapped ===

    #[must_use]
    pub fn is_tapped(&self, entity: EntityId) -> bool {
        self.tapped.contains(&entity)
    }

    /// Set the tapped status. Returns `true` if it changed.
    pub fn set_tapped(&mut self, entity: EntityId, tapped: bool) -> bool {
        if tapped {
            self.tapped.insert(entity).is_none()
        } else {
            self.tapped.remove(&entity).is_some()
        }
    }

    // === Damage ===

    /// Damage marked on a permanent this turn.
    #[must_use]
    pub fn damage(&self, entity: EntityId) -> u32 {
        self.damage.get(&entity).copied().unwrap_or(0)
    }

    /// Mark damage; `deathtouch` records that a deathtouch source dealt some.
    pub fn add_damage(&mut self, entity: EntityId, amount: u32, deathtouch: bool) {
        let total = self.damage(entity).saturating_add(amount);
        self.damage.insert(entity, total);
        if deathtouch && amount > 0 {
            self.deathtouch_damage.insert(entity);
        }
    }

    #[must_use]
    pub fn has_deathtouch_damage(&self, entity: EntityId) -> bool {
        self.deathtouch_damage.contains(&entity)
    }

    /// Remove all marked damage from every permanent (cleanup step).
    pub fn clear_all_damage(&mut self) {
        self.damage = OrdMap::new();
        self.deathtouch_damage = OrdSet::new();
    }

    // === Counters ===

    /// All counters on an entity.
    #[must_use]
    pub fn counters(&self, entity: EntityId) -> OrdMap<CounterType, u32> {
        self.counters.get(&entity).cloned().unwrap_or_default()
    }

    /// Number of counters of one type.
    #[must_use]
    pub fn counter(&self, entity: EntityId, counter: &CounterType) -> u32 {
        self.counters
            .get(&entity)
            .and_then(|map| map.get(counter))
            .copied()
            .unwrap_or(0)
    }

    pub fn add_counters(&mut self, entity: EntityId, counter: CounterType, amount: u32) {
        if amount == 0 {
            return;
        }
        let mut map = self.counters(entity);
        let current = map.get(&counter).copied().unwrap_or(0);
        map.insert(counter, current + amount);
        self.counters.insert(entity, map);
    }

    /// Remove up to `amount` counters. Returns how many were removed.
    pub fn remove_counters(&mut self, entity: EntityId, counter: &CounterType, amount: u32) -> u32 {
        let mut map = self.counters(entity);
        let current = map.get(counter).copied().unwrap_or(0);
        let removed = current.min(amount);
        if removed == 0 {
            return 0;
        }
        if current == removed {
            map.remove(counter);
        } else {
            map.insert(counter.clone(), current - removed);
        }
        if map.is_empty() {
            self.counters.remove(&entity);
        } else {
            self.counters.insert(entity, map);
        }
        removed
    }

    // === Attachment ===

    #[must_use]
    pub fn attached_to(&self, entity: EntityId) -> Option<EntityId> {
        self.attached_to.get(&entity).copied()
    }

    pub fn attach(&mut self, entity: EntityId, host: EntityId) {
        self.attached_to.insert(entity, host);
    }

    /// Returns the previous host, if any.
    pub fn detach(&mut self, entity: EntityId) -> Option<EntityId> {
        self.attached_to.remove(&entity)
    }

    /// Everything attached to `host`, in entity order.
    #[must_use]
    pub fn attachments_of(&self, host: EntityId) -> Vec<EntityId> {
        self.attached_to
            .iter()
            .filter(|(_, &h)| h == host)
            .map(|(&e, _)| e)
            .collect()
    }

    /// All (attachment, host) pairs.
    pub fn attachments(&self) -> impl Iterator<Item = (EntityId, EntityId)> + '_ {
        self.attached_to.iter().map(|(&e, &h)| (e, h))
    }

    // === Face-down ===

    #[must_use]
    pub fn is_face_down(&self, entity: EntityId) -> bool {
        self.face_down.contains(&entity)
    }

    pub fn set_face_down(&mut self, entity: EntityId, face_down: bool) {
        if face_down {
            self.face_down.insert(entity);
        } else {
            self.face_down.remove(&entity);
        }
    }

    // === Control ===

    /// Controller recorded when the object entered its zone. Layer 2
    /// effects are applied on top of this by the projector.
    #[must_use]
    pub fn controller(&self, entity: EntityId) -> Option<PlayerId> {
        self.controller.get(&entity).copied()
    }

    pub fn set_controller(&mut self, entity: EntityId, player: PlayerId) {
        self.controller.insert(entity, player);
    }

    /// Turn since which the current controller has controlled the object.
    #[must_use]
    pub fn controlled_since(&self, entity: EntityId) -> Option<u32> {
        self.controlled_since.get(&entity).copied()
    }

    pub fn set_controlled_since(&mut self, entity: EntityId, turn: u32) {
        self.controlled_since.insert(entity, turn);
    }

    // === Granted abilities ===

    #[must_use]
    pub fn granted(&self, entity: EntityId) -> Vector<GrantedAbility> {
        self.granted.get(&entity).cloned().unwrap_or_default()
    }

    pub fn grant(&mut self, entity: EntityId, grant: GrantedAbility) {
        let mut list = self.granted(entity);
        list.push_back(grant);
        self.granted.insert(entity, list);
    }

    /// Keep only the grants for which `keep` returns true.
    pub fn retain_granted(&mut self, mut keep: impl FnMut(&GrantedAbility) -> bool) {
        let entities: Vec<EntityId> = self.granted.keys().copied().collect();
        for entity in entities {
            let mut list = self.granted(entity);
            list.retain(|grant| keep(grant));
            if list.is_empty() {
                self.granted.remove(&entity);
            } else {
                self.granted.insert(entity, list);
            }
        }
    }

    // === Zone timestamps ===

    /// When the entity entered its current zone.
    #[must_use]
    pub fn zone_timestamp(&self, entity: EntityId) -> Option<Timestamp> {
        self.zone_timestamp.get(&entity).copied()
    }

    pub fn set_zone_timestamp(&mut self, entity: EntityId, timestamp: Timestamp) {
        self.zone_timestamp.insert(entity, timestamp);
    }

    // === Lifecycle ===

    /// Drop every battlefield-only component of `entity`, control included.
    pub fn clear_battlefield_status(&mut self, entity: EntityId) {
        self.tapped.remove(&entity);
        self.damage.remove(&entity);
        self.deathtouch_damage.remove(&entity);
        self.counters.remove(&entity);
        self.attached_to.remove(&entity);
        self.face_down.remove(&entity);
        self.granted.remove(&entity);
        self.controlled_since.remove(&entity);
        self.controller.remove(&entity);
    }

    /// Drop every component of `entity` (tokens ceasing to exist).
    pub fn remove_entity(&mut self, entity: EntityId) {
        self.clear_battlefield_status(entity);
        self.zone_timestamp.remove(&entity);
    }

    /// All components attached to `entity`.
    #[must_use]
    pub fn components_of(&self, entity: EntityId) -> Vec<Component> {
        let mut out = Vec::new();
        if self.is_tapped(entity) {
            out.push(Component::Tapped);
        }
        if let Some(&damage) = self.damage.get(&entity) {
            out.push(Component::Damage(damage));
        }
        if self.has_deathtouch_damage(entity) {
            out.push(Component::DeathtouchDamage);
        }
        if let Some(counters) = self.counters.get(&entity) {
            out.push(Component::Counters(counters.clone()));
        }
        if let Some(host) = self.attached_to(entity) {
            out.push(Component::AttachedTo(host));
        }
        if self.is_face_down(entity) {
            out.push(Component::FaceDown);
        }
        if let Some(player) = self.controller(entity) {
            out.push(Component::Controller(player));
        }
        for grant in self.granted(entity) {
            out.push(Component::GrantedAbility(grant));
        }
        if let Some(ts) = self.zone_timestamp(entity) {
            out.push(Component::ZoneTimestamp(ts));
        }
        if let Some(turn) = self.controlled_since(entity) {
            out.push(Component::ControlledSinceTurn(turn));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tapped() {
        let mut store = ComponentStore::new();
        assert!(store.set_tapped(EntityId(5), true));
        assert!(!store.set_tapped(EntityId(5), true));
        assert!(store.is_tapped(EntityId(5)));
        assert!(store.set_tapped(EntityId(5), false));
        assert!(!store.is_tapped(EntityId(5)));
    }

    #[test]
    fn test_counters_add_remove() {
        let mut store = ComponentStore::new();
        let e = EntityId(7);
        store.add_counters(e, CounterType::PlusOnePlusOne, 3);
        assert_eq!(store.counter(e, &CounterType::PlusOnePlusOne), 3);

        assert_eq!(store.remove_counters(e, &CounterType::PlusOnePlusOne, 5), 3);
        assert_eq!(store.counter(e, &CounterType::PlusOnePlusOne), 0);
        assert!(store.counters(e).is_empty());
    }

    #[test]
    fn test_damage_and_deathtouch() {
        let mut store = ComponentStore::new();
        store.add_damage(EntityId(3), 2, false);
        store.add_damage(EntityId(3), 1, true);
        assert_eq!(store.damage(EntityId(3)), 3);
        assert!(store.has_deathtouch_damage(EntityId(3)));

        store.clear_all_damage();
        assert_eq!(store.damage(EntityId(3)), 0);
        assert!(!store.has_deathtouch_damage(EntityId(3)));
    }

    #[test]
    fn test_clear_battlefield_status_keeps_timestamp() {
        let mut store = ComponentStore::new();
        let e = EntityId(9);
        store.set_tapped(e, true);
        store.attach(e, EntityId(4));
        store.set_zone_timestamp(e, Timestamp(12));
        store.set_controller(e, PlayerId::new(1));

        store.clear_battlefield_status(e);
        assert_eq!(store.components_of(e), vec![Component::ZoneTimestamp(Timestamp(12))]);
    }

    #[test]
    fn test_attachments_of() {
        let mut store = ComponentStore::new();
        store.attach(EntityId(10), EntityId(4));
        store.attach(EntityId(11), EntityId(4));
        store.attach(EntityId(12), EntityId(5));
        assert_eq!(store.attachments_of(EntityId(4)), vec![EntityId(10), EntityId(11)]);
        assert_eq!(store.detach(EntityId(12)), Some(EntityId(5)));
        assert!(store.attachments_of(EntityId(5)).is_empty());
    }
}
