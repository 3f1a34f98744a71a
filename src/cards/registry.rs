//! Card registry for definition lookup.
//!
//! The registry is the boundary to the card catalogue: definitions are
//! registered once and looked up by id or by name. Games hold the returned
//! `Arc`s, so a definition is shared by every copy of the card.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::definition::{CardDefinition, CardId};
use crate::core::RegistryError;

/// Registry of card definitions.
///
/// ## Example
///
/// ```
/// use rust_tcg::cards::{CardDefinition, CardRegistry};
///
/// let mut registry = CardRegistry::new();
/// let id = registry.register(CardDefinition::creature("Grizzly Bears", "1G", 2, 2)).unwrap();
///
/// assert_eq!(registry.get(id).unwrap().name, "Grizzly Bears");
/// assert_eq!(registry.get_by_name("Grizzly Bears").unwrap().id, id);
/// ```
#[derive(Clone, Debug, Default)]
pub struct CardRegistry {
    cards: FxHashMap<CardId, Arc<CardDefinition>>,
    by_name: FxHashMap<String, CardId>,
    next_id: u32,
}

impl CardRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, assigning it the next id.
    ///
    /// Names are unique.
    pub fn register(&mut self, mut card: CardDefinition) -> Result<CardId, RegistryError> {
        if self.by_name.contains_key(&card.name) {
            return Err(RegistryError::DuplicateName(card.name));
        }
        self.next_id += 1;
        let id = CardId::new(self.next_id);
        card.id = id;
        self.by_name.insert(card.name.clone(), id);
        self.cards.insert(id, Arc::new(card));
        Ok(id)
    }

    /// Get a card definition by ID.
    #[must_use]
    pub fn get(&self, id: CardId) -> Option<Arc<CardDefinition>> {
        self.cards.get(&id).cloned()
    }

    /// Get a card definition by name.
    pub fn get_by_name(&self, name: &str) -> Result<Arc<CardDefinition>, RegistryError> {
        self.by_name
            .get(name)
            .and_then(|id| self.cards.get(id))
            .cloned()
            .ok_or_else(|| RegistryError::UnknownName(name.to_string()))
    }

    /// Get the number of registered cards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Find cards matching a predicate, in id order.
    pub fn find<F>(&self, predicate: F) -> Vec<Arc<CardDefinition>>
    where
        F: Fn(&CardDefinition) -> bool,
    {
        let mut found: Vec<_> = self.cards.values().filter(|c| predicate(c)).cloned().collect();
        found.sort_by_key(|c| c.id);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardType;

    #[test]
    fn test_register_assigns_ids() {
        let mut registry = CardRegistry::new();
        let a = registry.register(CardDefinition::creature("A", "1", 1, 1)).unwrap();
        let b = registry.register(CardDefinition::creature("B", "2", 2, 2)).unwrap();
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(b).unwrap().id, b);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = CardRegistry::new();
        registry.register(CardDefinition::new("Shock")).unwrap();
        assert_eq!(
            registry.register(CardDefinition::new("Shock")),
            Err(RegistryError::DuplicateName("Shock".to_string()))
        );
    }

    #[test]
    fn test_unknown_name() {
        let registry = CardRegistry::new();
        assert_eq!(
            registry.get_by_name("Nope").unwrap_err(),
            RegistryError::UnknownName("Nope".to_string())
        );
    }

    #[test]
    fn test_find_with_predicate() {
        let mut registry = CardRegistry::new();
        registry.register(CardDefinition::creature("Bear", "1G", 2, 2)).unwrap();
        registry.register(CardDefinition::instant("Shock", "R")).unwrap();
        registry.register(CardDefinition::creature("Ogre", "2R", 3, 3)).unwrap();

        let creatures = registry.find(|c| c.has_type(CardType::Creature));
        assert_eq!(creatures.len(), 2);
        assert_eq!(creatures[0].name, "Bear");
    }
}
