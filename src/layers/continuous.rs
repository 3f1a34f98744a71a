//! Continuous effects and their arena.
//!
//! A continuous effect is a timestamped, duration-scoped list of
//! [`Modification`]s. Effects never touch printed characteristics: the
//! projector layers them on read.
//!
//! ## Layers
//!
//! | Layer | Modifications |
//! |-------|---------------|
//! | 1 Copy | `CopyOf` |
//! | 2 Control | `SetController` |
//! | 4 Type | `AddTypes`, `RemoveTypes`, `AddSubtypes`, `SetSubtypes` |
//! | 5 Color | `SetColors`, `AddColors` |
//! | 6 Ability | `AddKeywords`, `RemoveKeywords`, `RemoveAllAbilities` |
//! | 7a CDA | `SetPowerToughnessCda` |
//! | 7b Setting | `SetPowerToughness` |
//! | 7c Modifying | `ModifyPowerToughness` (counters follow) |
//! | 7d Switching | `SwitchPowerToughness` |

use im::OrdMap;
use serde::{Deserialize, Serialize};

use crate::cards::{CardType, ColorSet, Keyword, Subtype};
use crate::core::{EntityId, PlayerId, Timestamp};
use crate::effects::ObjectFilter;

/// Layers of the continuous-effect system, in application order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Layer {
    Copy,
    Control,
    Type,
    Color,
    Ability,
    PowerToughness,
}

impl Layer {
    /// Every layer in application order.
    pub const ORDER: [Layer; 6] = [
        Layer::Copy,
        Layer::Control,
        Layer::Type,
        Layer::Color,
        Layer::Ability,
        Layer::PowerToughness,
    ];
}

/// Sublayers of the power/toughness layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PtSublayer {
    /// 7a: characteristic-defining abilities.
    CharacteristicDefining,
    /// 7b: effects that set power and/or toughness.
    Setting,
    /// 7c: effects that raise or lower, then counters.
    Modifying,
    /// 7d: switching.
    Switching,
}

impl PtSublayer {
    pub const ORDER: [PtSublayer; 4] = [
        PtSublayer::CharacteristicDefining,
        PtSublayer::Setting,
        PtSublayer::Modifying,
        PtSublayer::Switching,
    ];
}

/// A value for characteristic-defining power or toughness.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PtValue {
    Fixed(i32),
    /// Number of objects matching the filter, from the effect controller's
    /// point of view.
    CountOf(ObjectFilter),
}

/// One change to an object's characteristics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modification {
    // === Layer 1 ===
    /// Take on the copiable values of another object.
    CopyOf(EntityId),

    // === Layer 2 ===
    SetController(PlayerId),

    // === Layer 4 ===
    AddTypes(Vec<CardType>),
    RemoveTypes(Vec<CardType>),
    AddSubtypes(Vec<Subtype>),
    SetSubtypes(Vec<Subtype>),

    // === Layer 5 ===
    SetColors(ColorSet),
    AddColors(ColorSet),

    // === Layer 6 ===
    AddKeywords(Vec<Keyword>),
    RemoveKeywords(Vec<Keyword>),
    RemoveAllAbilities,

    // === Layer 7 ===
    SetPowerToughnessCda { power: PtValue, toughness: PtValue },
    SetPowerToughness { power: i32, toughness: i32 },
    ModifyPowerToughness { power: i32, toughness: i32 },
    SwitchPowerToughness,
}

impl Modification {
    /// The layer this modification applies in.
    #[must_use]
    pub fn layer(&self) -> Layer {
        match self {
            Self::CopyOf(_) => Layer::Copy,
            Self::SetController(_) => Layer::Control,
            Self::AddTypes(_) | Self::RemoveTypes(_) | Self::AddSubtypes(_) | Self::SetSubtypes(_) => Layer::Type,
            Self::SetColors(_) | Self::AddColors(_) => Layer::Color,
            Self::AddKeywords(_) | Self::RemoveKeywords(_) | Self::RemoveAllAbilities => Layer::Ability,
            Self::SetPowerToughnessCda { .. }
            | Self::SetPowerToughness { .. }
            | Self::ModifyPowerToughness { .. }
            | Self::SwitchPowerToughness => Layer::PowerToughness,
        }
    }

    /// The P/T sublayer, for layer 7 modifications.
    #[must_use]
    pub fn sublayer(&self) -> Option<PtSublayer> {
        match self {
            Self::SetPowerToughnessCda { .. } => Some(PtSublayer::CharacteristicDefining),
            Self::SetPowerToughness { .. } => Some(PtSublayer::Setting),
            Self::ModifyPowerToughness { .. } => Some(PtSublayer::Modifying),
            Self::SwitchPowerToughness => Some(PtSublayer::Switching),
            _ => None,
        }
    }
}

/// How long an effect lasts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Duration {
    /// Until the cleanup step of this turn.
    EndOfTurn,
    /// Until the effect is removed by another rule.
    Indefinite,
    /// As long as the source stays on the battlefield.
    WhileSourceOnBattlefield,
    /// Until the controller's next turn begins.
    UntilYourNextTurn,
}

/// Which objects an effect applies to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Affected {
    /// A fixed list, chosen when the effect was created.
    Objects(Vec<EntityId>),
    /// Every battlefield object matching the filter when the effect first
    /// applies in a projection.
    Filter(ObjectFilter),
}

/// Identifier of an effect in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EffectId(pub u32);

impl std::fmt::Display for EffectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Effect({})", self.0)
    }
}

/// A continuous effect created by a resolving spell or ability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuousEffect {
    pub id: EffectId,
    pub source: Option<EntityId>,
    pub controller: PlayerId,
    pub timestamp: Timestamp,
    pub duration: Duration,
    /// Turn the effect was created in.
    pub created_turn: u32,
    pub affected: Affected,
    pub modifications: Vec<Modification>,
}

impl ContinuousEffect {
    /// New effect; the arena assigns the id.
    #[must_use]
    pub fn new(controller: PlayerId, affected: Affected, modifications: Vec<Modification>) -> Self {
        Self {
            id: EffectId(0),
            source: None,
            controller,
            timestamp: Timestamp::default(),
            duration: Duration::EndOfTurn,
            created_turn: 0,
            affected,
            modifications,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: EntityId) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn with_turn(mut self, turn: u32) -> Self {
        self.created_turn = turn;
        self
    }
}

/// Arena of active continuous effects, keyed by id (creation order).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectArena {
    effects: OrdMap<EffectId, ContinuousEffect>,
    next_id: u32,
}

impl EffectArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an effect, assigning its id.
    pub fn add(&mut self, mut effect: ContinuousEffect) -> EffectId {
        self.next_id += 1;
        let id = EffectId(self.next_id);
        effect.id = id;
        self.effects.insert(id, effect);
        id
    }

    pub fn remove(&mut self, id: EffectId) -> Option<ContinuousEffect> {
        self.effects.remove(&id)
    }

    #[must_use]
    pub fn get(&self, id: EffectId) -> Option<&ContinuousEffect> {
        self.effects.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContinuousEffect> {
        self.effects.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Remove effects for which `keep` is false. Returns how many went.
    pub fn retain(&mut self, mut keep: impl FnMut(&ContinuousEffect) -> bool) -> usize {
        let doomed: Vec<EffectId> = self
            .effects
            .values()
            .filter(|e| !keep(e))
            .map(|e| e.id)
            .collect();
        for id in &doomed {
            self.effects.remove(id);
        }
        doomed.len()
    }

    /// Cleanup step: "until end of turn" effects end.
    pub fn expire_end_of_turn(&mut self) -> usize {
        self.retain(|e| e.duration != Duration::EndOfTurn)
    }

    /// The source left the battlefield.
    pub fn expire_for_source(&mut self, source: EntityId) -> usize {
        self.retain(|e| !(e.duration == Duration::WhileSourceOnBattlefield && e.source == Some(source)))
    }

    /// Drop effects locked to objects that are all gone. `live(entity,
    /// created)` says whether `entity` is still the battlefield object that
    /// existed when an effect timestamped `created` began.
    pub fn prune_orphaned(&mut self, live: impl Fn(EntityId, Timestamp) -> bool) -> usize {
        self.retain(|e| match &e.affected {
            Affected::Objects(objects) => objects.iter().any(|&o| live(o, e.timestamp)),
            Affected::Filter(_) => true,
        })
    }

    /// `player`'s turn began.
    pub fn expire_at_turn_start(&mut self, player: PlayerId, turn: u32) -> usize {
        self.retain(|e| {
            !(e.duration == Duration::UntilYourNextTurn && e.controller == player && e.created_turn < turn)
        })
    }
}
