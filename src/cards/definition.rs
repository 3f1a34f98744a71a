//! Card definitions - static card data.
//!
//! `CardDefinition` holds the printed characteristics of a card plus its
//! ability script. Everything that changes during a game (tapped, damage,
//! counters, zone) lives in the component store, and everything that
//! modifies characteristics is applied by the layer projector.

use serde::{Deserialize, Serialize};

use super::ability::{AbilityDef, ActivatedAbility};
use super::mana::{ManaCost, ManaType};
use super::types::{CardType, ColorSet, Keyword, Subtype, Supertype};
use crate::effects::{Cost, Effect, ObjectFilter, TargetSpec};

/// Unique identifier for a card definition.
///
/// This identifies the card ("Grizzly Bears"), not a copy of it in a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CardId(pub u32);

impl CardId {
    /// Create a new card ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Card({})", self.0)
    }
}

/// Printed card data.
///
/// ## Example
///
/// ```
/// use rust_tcg::cards::{CardDefinition, CardType, Keyword};
///
/// let bears = CardDefinition::new("Grizzly Bears")
///     .with_cost("1G")
///     .with_types(&[CardType::Creature])
///     .with_subtypes(&["Bear"])
///     .with_power_toughness(2, 2);
///
/// assert!(bears.is_permanent());
/// assert_eq!(bears.power, Some(2));
///
/// let bird = CardDefinition::creature("Storm Crow", "1U", 1, 2).with_keyword(Keyword::Flying);
/// assert!(bird.keywords.contains(&Keyword::Flying));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDefinition {
    /// Registry id (assigned on registration, 0 until then).
    pub id: CardId,
    pub name: String,
    pub mana_cost: Option<ManaCost>,
    pub card_types: Vec<CardType>,
    pub supertypes: Vec<Supertype>,
    pub subtypes: Vec<Subtype>,
    /// Color indicator; defaults to the colors of the mana cost.
    pub colors: ColorSet,
    pub power: Option<i32>,
    pub toughness: Option<i32>,
    /// Starting loyalty for planeswalkers.
    pub loyalty: Option<u32>,
    pub keywords: Vec<Keyword>,
    pub abilities: Vec<AbilityDef>,
    /// Targets chosen when this instant/sorcery is cast.
    pub spell_targets: Vec<TargetSpec>,
    /// Instructions executed when this instant/sorcery resolves.
    pub spell_effects: Vec<Effect>,
    /// Morph cost; the card may be cast face down for {3}.
    pub morph: Option<ManaCost>,
    /// What an Aura can enchant.
    pub enchant: Option<ObjectFilter>,
}

impl CardDefinition {
    /// Create an empty definition.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CardId::new(0),
            name: name.into(),
            mana_cost: None,
            card_types: Vec::new(),
            supertypes: Vec::new(),
            subtypes: Vec::new(),
            colors: ColorSet::COLORLESS,
            power: None,
            toughness: None,
            loyalty: None,
            keywords: Vec::new(),
            abilities: Vec::new(),
            spell_targets: Vec::new(),
            spell_effects: Vec::new(),
            morph: None,
            enchant: None,
        }
    }

    /// Shorthand for a vanilla creature.
    #[must_use]
    pub fn creature(name: impl Into<String>, cost: &str, power: i32, toughness: i32) -> Self {
        Self::new(name)
            .with_cost(cost)
            .with_types(&[CardType::Creature])
            .with_power_toughness(power, toughness)
    }

    /// Shorthand for a basic land with "{T}: Add one mana of `mana`".
    #[must_use]
    pub fn basic_land(name: impl Into<String>, mana: ManaType) -> Self {
        Self::new(name)
            .with_types(&[CardType::Land])
            .with_supertypes(&[Supertype::Basic])
            .with_ability(AbilityDef::Activated(
                ActivatedAbility::new(vec![Cost::Tap], vec![Effect::AddMana { mana, amount: 1 }]).mana_ability(),
            ))
    }

    /// Shorthand for an instant.
    #[must_use]
    pub fn instant(name: impl Into<String>, cost: &str) -> Self {
        Self::new(name).with_cost(cost).with_types(&[CardType::Instant])
    }

    /// Shorthand for a sorcery.
    #[must_use]
    pub fn sorcery(name: impl Into<String>, cost: &str) -> Self {
        Self::new(name).with_cost(cost).with_types(&[CardType::Sorcery])
    }

    /// Set the mana cost from text. Unparseable text leaves no cost.
    #[must_use]
    pub fn with_cost(mut self, cost: &str) -> Self {
        self.mana_cost = ManaCost::parse(cost);
        if let Some(cost) = &self.mana_cost {
            self.colors = cost.colors();
        }
        self
    }

    #[must_use]
    pub fn with_types(mut self, types: &[CardType]) -> Self {
        self.card_types = types.to_vec();
        self
    }

    #[must_use]
    pub fn with_supertypes(mut self, supertypes: &[Supertype]) -> Self {
        self.supertypes = supertypes.to_vec();
        self
    }

    #[must_use]
    pub fn with_subtypes(mut self, subtypes: &[&str]) -> Self {
        self.subtypes = subtypes.iter().map(|s| Subtype::new(*s)).collect();
        self
    }

    #[must_use]
    pub fn with_colors(mut self, colors: ColorSet) -> Self {
        self.colors = colors;
        self
    }

    #[must_use]
    pub fn with_power_toughness(mut self, power: i32, toughness: i32) -> Self {
        self.power = Some(power);
        self.toughness = Some(toughness);
        self
    }

    #[must_use]
    pub fn with_loyalty(mut self, loyalty: u32) -> Self {
        self.loyalty = Some(loyalty);
        self
    }

    #[must_use]
    pub fn with_keyword(mut self, keyword: Keyword) -> Self {
        self.keywords.push(keyword);
        self
    }

    #[must_use]
    pub fn with_ability(mut self, ability: AbilityDef) -> Self {
        self.abilities.push(ability);
        self
    }

    /// Set the resolution script of an instant or sorcery.
    #[must_use]
    pub fn with_spell(mut self, targets: Vec<TargetSpec>, effects: Vec<Effect>) -> Self {
        self.spell_targets = targets;
        self.spell_effects = effects;
        self
    }

    #[must_use]
    pub fn with_morph(mut self, cost: &str) -> Self {
        self.morph = ManaCost::parse(cost);
        self
    }

    /// Make this an Aura that enchants objects matching `filter`.
    #[must_use]
    pub fn with_enchant(mut self, filter: ObjectFilter) -> Self {
        if !self.subtypes.contains(&Subtype::aura()) {
            self.subtypes.push(Subtype::aura());
        }
        self.enchant = Some(filter);
        self
    }

    // === Queries ===

    #[must_use]
    pub fn has_type(&self, card_type: CardType) -> bool {
        self.card_types.contains(&card_type)
    }

    /// Would this card become a permanent on resolution?
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        self.card_types.iter().any(|t| t.is_permanent_type())
    }

    #[must_use]
    pub fn is_aura(&self) -> bool {
        self.subtypes.contains(&Subtype::aura())
    }

    /// Can be cast at instant speed.
    #[must_use]
    pub fn has_flash(&self) -> bool {
        self.has_type(CardType::Instant) || self.keywords.contains(&Keyword::Flash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::types::Color;

    #[test]
    fn test_creature_shorthand() {
        let bears = CardDefinition::creature("Grizzly Bears", "1G", 2, 2);
        assert!(bears.has_type(CardType::Creature));
        assert_eq!(bears.colors, ColorSet::single(Color::Green));
        assert_eq!(bears.mana_cost.as_ref().map(ManaCost::mana_value), Some(2));
        assert!(bears.is_permanent());
        assert!(!bears.has_flash());
    }

    #[test]
    fn test_basic_land_has_mana_ability() {
        let forest = CardDefinition::basic_land("Forest", ManaType::Green);
        assert!(forest.has_type(CardType::Land));
        let ability = forest.abilities[0].as_activated().unwrap();
        assert!(ability.mana_ability);
        assert_eq!(ability.costs, vec![Cost::Tap]);
    }

    #[test]
    fn test_aura_subtype_added() {
        let aura = CardDefinition::new("Pacifism")
            .with_cost("1W")
            .with_types(&[CardType::Enchantment])
            .with_enchant(ObjectFilter::creature());
        assert!(aura.is_aura());
        assert!(aura.enchant.is_some());
    }
}
