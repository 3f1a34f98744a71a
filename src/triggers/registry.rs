//! Delayed trigger registry.
//!
//! Delayed triggers are created by resolving effects ("at the beginning of
//! the next end step, ...") and are not printed on any object. They fire
//! once and are then removed. The registry is indexed by event kind so only
//! triggers that can possibly match an event are evaluated.

use im::{OrdMap, OrdSet};
use serde::{Deserialize, Serialize};

use super::condition::TriggerCondition;
use super::event::EventKind;
use crate::core::{EntityId, PlayerId};
use crate::effects::Effect;

/// Identifier of a delayed trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DelayedTriggerId(pub u32);

impl std::fmt::Display for DelayedTriggerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DelayedTrigger({})", self.0)
    }
}

/// A one-shot trigger created by an effect.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayedTrigger {
    pub id: DelayedTriggerId,
    /// Object whose ability created it.
    pub source: EntityId,
    pub controller: PlayerId,
    pub condition: TriggerCondition,
    pub effects: Vec<Effect>,
    pub created_turn: u32,
}

/// Storage and lookup of delayed triggers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayedTriggerRegistry {
    triggers: OrdMap<DelayedTriggerId, DelayedTrigger>,
    by_kind: OrdMap<EventKind, OrdSet<DelayedTriggerId>>,
    next_id: u32,
}

impl DelayedTriggerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trigger, assigning its id.
    pub fn register(&mut self, mut trigger: DelayedTrigger) -> DelayedTriggerId {
        self.next_id += 1;
        let id = DelayedTriggerId(self.next_id);
        trigger.id = id;
        for kind in trigger.condition.event_kinds() {
            let mut ids = self.by_kind.get(&kind).cloned().unwrap_or_default();
            ids.insert(id);
            self.by_kind.insert(kind, ids);
        }
        self.triggers.insert(id, trigger);
        id
    }

    pub fn remove(&mut self, id: DelayedTriggerId) -> Option<DelayedTrigger> {
        let trigger = self.triggers.remove(&id)?;
        for kind in trigger.condition.event_kinds() {
            if let Some(ids) = self.by_kind.get(&kind) {
                let remaining = ids.without(&id);
                if remaining.is_empty() {
                    self.by_kind.remove(&kind);
                } else {
                    self.by_kind.insert(kind, remaining);
                }
            }
        }
        Some(trigger)
    }

    #[must_use]
    pub fn get(&self, id: DelayedTriggerId) -> Option<&DelayedTrigger> {
        self.triggers.get(&id)
    }

    /// Triggers that listen for `kind`, in registration order.
    #[must_use]
    pub fn candidates(&self, kind: EventKind) -> Vec<&DelayedTrigger> {
        self.by_kind
            .get(&kind)
            .map(|ids| ids.iter().filter_map(|id| self.triggers.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DelayedTrigger> {
        self.triggers.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end_step_draw() -> DelayedTrigger {
        DelayedTrigger {
            id: DelayedTriggerId(0),
            source: EntityId(5),
            controller: PlayerId::new(0),
            condition: TriggerCondition::next_end_step(),
            effects: vec![Effect::draw(1)],
            created_turn: 1,
        }
    }

    #[test]
    fn test_register_indexes_by_kind() {
        let mut registry = DelayedTriggerRegistry::new();
        let id = registry.register(end_step_draw());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.candidates(EventKind::StepBegan).len(), 1);
        assert!(registry.candidates(EventKind::ZoneChanged).is_empty());
        assert_eq!(registry.get(id).map(|t| t.source), Some(EntityId(5)));
    }

    #[test]
    fn test_remove_clears_index() {
        let mut registry = DelayedTriggerRegistry::new();
        let first = registry.register(end_step_draw());
        let second = registry.register(end_step_draw());
        assert_ne!(first, second);
        registry.remove(first);
        assert_eq!(registry.candidates(EventKind::StepBegan).len(), 1);
        registry.remove(second);
        assert!(registry.candidates(EventKind::StepBegan).is_empty());
        assert!(registry.is_empty());
    }
}
