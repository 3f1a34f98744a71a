//! Ability definitions: the card script vocabulary.
//!
//! A card's behavior is a list of [`AbilityDef`]s built from the engine's
//! primitive vocabulary (effects, costs, targets, trigger conditions,
//! layer modifications). New cards are new combinations of primitives.
//!
//! ```
//! use rust_tcg::cards::{AbilityDef, ActivatedAbility, TriggeredAbility};
//! use rust_tcg::effects::{Amount, Cost, Effect, PlayerSelector, Selector, Subject, TargetSpec};
//! use rust_tcg::triggers::TriggerCondition;
//!
//! // "{T}: This deals 1 damage to any target."
//! let ping = AbilityDef::Activated(
//!     ActivatedAbility::new(vec![Cost::Tap], vec![Effect::deal_damage(1, Selector::Targets(0))])
//!         .with_targets(vec![TargetSpec::any_target()]),
//! );
//!
//! // "When this dies, draw a card."
//! let on_death = AbilityDef::Triggered(TriggeredAbility::new(
//!     TriggerCondition::Dies(Subject::This),
//!     vec![Effect::DrawCards { player: PlayerSelector::You, amount: Amount::Fixed(1) }],
//! ));
//! # let _ = (ping, on_death);
//! ```

use serde::{Deserialize, Serialize};

use crate::core::CounterType;
use crate::effects::{Cost, Effect, ReplacementKind, ReplacementScope, Subject, TargetSpec};
use crate::layers::Modification;
use crate::triggers::TriggerCondition;

/// One ability printed on (or granted to) an object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbilityDef {
    Static(StaticAbility),
    Triggered(TriggeredAbility),
    Activated(ActivatedAbility),
}

impl AbilityDef {
    #[must_use]
    pub fn as_activated(&self) -> Option<&ActivatedAbility> {
        match self {
            Self::Activated(ability) => Some(ability),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_triggered(&self) -> Option<&TriggeredAbility> {
        match self {
            Self::Triggered(ability) => Some(ability),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_static(&self) -> Option<&StaticAbility> {
        match self {
            Self::Static(ability) => Some(ability),
            _ => None,
        }
    }
}

/// Static abilities: always on while the source is on the battlefield.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaticAbility {
    /// A continuous effect applied through the layer system.
    Continuous {
        affected: Subject,
        modifications: Vec<Modification>,
    },

    /// A replacement effect.
    Replacement {
        applies_to: ReplacementScope,
        kind: ReplacementKind,
    },

    /// Sacrifice the source once it has `threshold` or more counters of a
    /// kind. Checked as a state-based action.
    SacrificeAtCounters { counter: CounterType, threshold: u32 },
}

/// "When/Whenever/At ..." abilities.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggeredAbility {
    pub condition: TriggerCondition,
    pub targets: Vec<TargetSpec>,
    pub effects: Vec<Effect>,
    /// "you may": the controller is asked yes/no on resolution.
    pub optional: bool,
}

impl TriggeredAbility {
    #[must_use]
    pub fn new(condition: TriggerCondition, effects: Vec<Effect>) -> Self {
        Self {
            condition,
            targets: Vec::new(),
            effects,
            optional: false,
        }
    }

    #[must_use]
    pub fn with_targets(mut self, targets: Vec<TargetSpec>) -> Self {
        self.targets = targets;
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// "[Cost]: [Effect]" abilities.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivatedAbility {
    pub costs: Vec<Cost>,
    pub targets: Vec<TargetSpec>,
    pub effects: Vec<Effect>,
    /// Only when a sorcery could be cast.
    pub sorcery_speed: bool,
    /// Resolves immediately without using the stack.
    pub mana_ability: bool,
}

impl ActivatedAbility {
    #[must_use]
    pub fn new(costs: Vec<Cost>, effects: Vec<Effect>) -> Self {
        Self {
            costs,
            targets: Vec::new(),
            effects,
            sorcery_speed: false,
            mana_ability: false,
        }
    }

    #[must_use]
    pub fn with_targets(mut self, targets: Vec<TargetSpec>) -> Self {
        self.targets = targets;
        self
    }

    #[must_use]
    pub fn sorcery_speed(mut self) -> Self {
        self.sorcery_speed = true;
        self
    }

    #[must_use]
    pub fn mana_ability(mut self) -> Self {
        self.mana_ability = true;
        self
    }
}
