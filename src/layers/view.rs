//! Projected characteristics: what is actually true right now.

use std::sync::Arc;

use im::{OrdMap, OrdSet};
use serde::{Deserialize, Serialize};

use crate::cards::{CardDefinition, CardType, ColorSet, Keyword, ManaCost, Subtype, Supertype};
use crate::core::{EntityId, PlayerId};
use crate::zones::ZoneKind;

/// Effective characteristics of one object after all layers.
///
/// Also carries a snapshot of battlefield status (tapped, attacking,
/// blocking) so filters can be evaluated against a single value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristics {
    pub name: String,
    pub mana_cost: Option<ManaCost>,
    pub card_types: OrdSet<CardType>,
    pub supertypes: OrdSet<Supertype>,
    pub subtypes: OrdSet<Subtype>,
    pub colors: ColorSet,
    pub keywords: OrdSet<Keyword>,
    pub power: Option<i32>,
    pub toughness: Option<i32>,
    pub owner: PlayerId,
    pub controller: PlayerId,
    pub zone: ZoneKind,
    pub is_token: bool,
    pub face_down: bool,
    /// Set by a layer 6 "loses all abilities" effect.
    pub abilities_removed: bool,
    /// Definition whose printed abilities this object has. Differs from the
    /// object's own definition while it is a copy or face down.
    pub ability_source: Arc<CardDefinition>,
    pub tapped: bool,
    pub attacking: bool,
    pub blocking: bool,
}

impl Characteristics {
    /// Printed characteristics of `definition`.
    #[must_use]
    pub fn printed(definition: &Arc<CardDefinition>, owner: PlayerId, zone: ZoneKind) -> Self {
        Self {
            name: definition.name.clone(),
            mana_cost: definition.mana_cost.clone(),
            card_types: definition.card_types.iter().copied().collect(),
            supertypes: definition.supertypes.iter().copied().collect(),
            subtypes: definition.subtypes.iter().cloned().collect(),
            colors: definition.colors,
            keywords: definition.keywords.iter().cloned().collect(),
            power: definition.power,
            toughness: definition.toughness,
            owner,
            controller: owner,
            zone,
            is_token: false,
            face_down: false,
            abilities_removed: false,
            ability_source: Arc::clone(definition),
            tapped: false,
            attacking: false,
            blocking: false,
        }
    }

    /// A face-down permanent: nameless, colorless 2/2 creature without
    /// abilities.
    #[must_use]
    pub fn face_down(owner: PlayerId, zone: ZoneKind) -> Self {
        let blank = Arc::new(CardDefinition::new(""));
        let mut ch = Self::printed(&blank, owner, zone);
        ch.card_types.insert(CardType::Creature);
        ch.power = Some(2);
        ch.toughness = Some(2);
        ch.face_down = true;
        ch
    }

    #[must_use]
    pub fn has_type(&self, card_type: CardType) -> bool {
        self.card_types.contains(&card_type)
    }

    #[must_use]
    pub fn is_creature(&self) -> bool {
        self.has_type(CardType::Creature)
    }

    #[must_use]
    pub fn is_land(&self) -> bool {
        self.has_type(CardType::Land)
    }

    #[must_use]
    pub fn is_planeswalker(&self) -> bool {
        self.has_type(CardType::Planeswalker)
    }

    #[must_use]
    pub fn has_keyword(&self, keyword: &Keyword) -> bool {
        self.keywords.contains(keyword)
    }

    #[must_use]
    pub fn has_subtype(&self, subtype: &Subtype) -> bool {
        self.subtypes.contains(subtype)
    }

    #[must_use]
    pub fn is_legendary(&self) -> bool {
        self.supertypes.contains(&Supertype::Legendary)
    }

    #[must_use]
    pub fn on_battlefield(&self) -> bool {
        self.zone == ZoneKind::Battlefield
    }

    /// Printed abilities currently in effect (none once removed).
    #[must_use]
    pub fn printed_abilities(&self) -> &[crate::cards::AbilityDef] {
        if self.abilities_removed {
            &[]
        } else {
            &self.ability_source.abilities
        }
    }

    /// Is this object protected from sources of `colors`?
    #[must_use]
    pub fn protected_from(&self, colors: ColorSet) -> bool {
        colors
            .iter()
            .any(|c| self.keywords.contains(&Keyword::ProtectionFrom(c)))
    }
}

/// The result of projecting a game state through the layer system.
///
/// Keyed by entity; covers every card and token in any zone. Only
/// battlefield objects are affected by continuous effects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedView {
    objects: OrdMap<EntityId, Characteristics>,
}

impl ProjectedView {
    #[must_use]
    pub fn new(objects: OrdMap<EntityId, Characteristics>) -> Self {
        Self { objects }
    }

    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<&Characteristics> {
        self.objects.get(&entity)
    }

    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.objects.contains_key(&entity)
    }

    pub(crate) fn get_mut(&mut self, entity: EntityId) -> Option<&mut Characteristics> {
        self.objects.get_mut(&entity)
    }

    /// Effective power.
    #[must_use]
    pub fn power(&self, entity: EntityId) -> Option<i32> {
        self.get(entity).and_then(|c| c.power)
    }

    /// Effective toughness.
    #[must_use]
    pub fn toughness(&self, entity: EntityId) -> Option<i32> {
        self.get(entity).and_then(|c| c.toughness)
    }

    #[must_use]
    pub fn controller(&self, entity: EntityId) -> Option<PlayerId> {
        self.get(entity).map(|c| c.controller)
    }

    #[must_use]
    pub fn colors(&self, entity: EntityId) -> ColorSet {
        self.get(entity).map_or(ColorSet::COLORLESS, |c| c.colors)
    }

    #[must_use]
    pub fn card_types(&self, entity: EntityId) -> OrdSet<CardType> {
        self.get(entity).map(|c| c.card_types.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn subtypes(&self, entity: EntityId) -> OrdSet<Subtype> {
        self.get(entity).map(|c| c.subtypes.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn keywords(&self, entity: EntityId) -> OrdSet<Keyword> {
        self.get(entity).map(|c| c.keywords.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn has_keyword(&self, entity: EntityId, keyword: &Keyword) -> bool {
        self.get(entity).is_some_and(|c| c.has_keyword(keyword))
    }

    #[must_use]
    pub fn has_type(&self, entity: EntityId, card_type: CardType) -> bool {
        self.get(entity).is_some_and(|c| c.has_type(card_type))
    }

    /// Every projected object in entity order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Characteristics)> {
        self.objects.iter().map(|(&e, c)| (e, c))
    }

    /// Battlefield objects in entity order.
    pub fn battlefield(&self) -> impl Iterator<Item = (EntityId, &Characteristics)> {
        self.iter().filter(|(_, c)| c.on_battlefield())
    }

    /// Battlefield creatures controlled by `player`.
    pub fn creatures_of(&self, player: PlayerId) -> impl Iterator<Item = (EntityId, &Characteristics)> {
        self.battlefield()
            .filter(move |(_, c)| c.is_creature() && c.controller == player)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Color;

    #[test]
    fn test_printed_characteristics() {
        let def = Arc::new(
            CardDefinition::creature("Knight", "1W", 2, 2).with_keyword(Keyword::ProtectionFrom(Color::Black)),
        );
        let ch = Characteristics::printed(&def, PlayerId::new(1), ZoneKind::Battlefield);
        assert!(ch.is_creature());
        assert_eq!(ch.controller, PlayerId::new(1));
        assert!(ch.protected_from(ColorSet::single(Color::Black)));
        assert!(!ch.protected_from(ColorSet::single(Color::Red)));
    }

    #[test]
    fn test_face_down_characteristics() {
        let ch = Characteristics::face_down(PlayerId::new(0), ZoneKind::Battlefield);
        assert_eq!(ch.name, "");
        assert_eq!((ch.power, ch.toughness), (Some(2), Some(2)));
        assert!(ch.colors.is_colorless());
        assert!(ch.printed_abilities().is_empty());
        assert!(ch.face_down);
    }
}
