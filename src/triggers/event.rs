//! Game events.
//!
//! Every mutation of a `GameState` is recorded as a `GameEvent` in the
//! state's event log. Triggered abilities are matched against the log, and
//! callers receive the events produced by each command.
//!
//! Events that move an object out of a zone carry [`LastKnown`]: the
//! object's characteristics and status right before it moved. This is what
//! "look back in time" triggers (dies, leaves the battlefield) evaluate.

use im::OrdMap;
use serde::{Deserialize, Serialize};

use crate::cards::{AbilityDef, ManaType};
use crate::combat::AttackTarget;
use crate::core::{CounterType, EntityId, GameState, PlayerId};
use crate::effects::Target;
use crate::layers::{object_abilities, Characteristics, ProjectedView};
use crate::stack::Step;
use crate::zones::{ZoneId, ZoneKind};

/// Snapshot of an object right before it changed zones.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastKnown {
    pub entity: EntityId,
    pub characteristics: Characteristics,
    pub abilities: Vec<AbilityDef>,
    pub damage: u32,
    pub counters: OrdMap<CounterType, u32>,
    pub attached_to: Option<EntityId>,
}

impl LastKnown {
    /// Capture `entity` as it currently is.
    #[must_use]
    pub fn capture(state: &GameState, view: &ProjectedView, entity: EntityId) -> Option<Self> {
        let characteristics = view.get(entity)?.clone();
        Some(Self {
            entity,
            abilities: object_abilities(state, entity, &characteristics),
            characteristics,
            damage: state.components.damage(entity),
            counters: state.components.counters(entity),
            attached_to: state.components.attached_to(entity),
        })
    }
}

/// Why a player lost.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LossReason {
    ZeroLife,
    Poison,
    EmptyLibrary,
    Conceded,
}

/// Something that happened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// `from` is `None` for tokens coming into existence.
    ZoneChanged {
        object: EntityId,
        from: Option<ZoneId>,
        to: ZoneId,
        last_known: Option<LastKnown>,
    },
    DamageDealt {
        source: EntityId,
        source_controller: PlayerId,
        target: Target,
        amount: u32,
        combat: bool,
    },
    DamagePrevented { source: EntityId, target: Target, amount: u32 },
    LifeGained { player: PlayerId, amount: u32 },
    LifeLost { player: PlayerId, amount: u32 },
    PoisonGiven { player: PlayerId, amount: u32 },
    Tapped { object: EntityId },
    Untapped { object: EntityId },
    CountersAdded { object: EntityId, counter: CounterType, amount: u32 },
    CountersRemoved { object: EntityId, counter: CounterType, amount: u32 },
    CardDrawn { player: PlayerId, card: EntityId },
    ManaAdded { player: PlayerId, mana: ManaType, amount: u32 },
    SpellCast { card: EntityId, controller: PlayerId },
    AbilityActivated { source: EntityId, controller: PlayerId },
    AttackerDeclared { attacker: EntityId, target: AttackTarget, controller: PlayerId },
    BlockerDeclared { blocker: EntityId, attacker: EntityId },
    StepBegan { step: Step, active: PlayerId, turn: u32 },
    TurnedFaceUp { object: EntityId },
    Attached { object: EntityId, host: EntityId },
    Unattached { object: EntityId, host: EntityId },
    TokenCreated { token: EntityId, controller: PlayerId },
    SpellCountered { card: EntityId },
    /// A spell or ability resolved with every target illegal.
    Fizzled { source: EntityId, controller: PlayerId },
    LibraryShuffled { player: PlayerId },
    PlayerLost { player: PlayerId, reason: LossReason },
}

/// Event discriminant, used to index delayed triggers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventKind {
    ZoneChanged,
    DamageDealt,
    DamagePrevented,
    LifeGained,
    LifeLost,
    PoisonGiven,
    Tapped,
    Untapped,
    CountersAdded,
    CountersRemoved,
    CardDrawn,
    ManaAdded,
    SpellCast,
    AbilityActivated,
    AttackerDeclared,
    BlockerDeclared,
    StepBegan,
    TurnedFaceUp,
    Attached,
    Unattached,
    TokenCreated,
    SpellCountered,
    Fizzled,
    LibraryShuffled,
    PlayerLost,
}

impl GameEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ZoneChanged { .. } => EventKind::ZoneChanged,
            Self::DamageDealt { .. } => EventKind::DamageDealt,
            Self::DamagePrevented { .. } => EventKind::DamagePrevented,
            Self::LifeGained { .. } => EventKind::LifeGained,
            Self::LifeLost { .. } => EventKind::LifeLost,
            Self::PoisonGiven { .. } => EventKind::PoisonGiven,
            Self::Tapped { .. } => EventKind::Tapped,
            Self::Untapped { .. } => EventKind::Untapped,
            Self::CountersAdded { .. } => EventKind::CountersAdded,
            Self::CountersRemoved { .. } => EventKind::CountersRemoved,
            Self::CardDrawn { .. } => EventKind::CardDrawn,
            Self::ManaAdded { .. } => EventKind::ManaAdded,
            Self::SpellCast { .. } => EventKind::SpellCast,
            Self::AbilityActivated { .. } => EventKind::AbilityActivated,
            Self::AttackerDeclared { .. } => EventKind::AttackerDeclared,
            Self::BlockerDeclared { .. } => EventKind::BlockerDeclared,
            Self::StepBegan { .. } => EventKind::StepBegan,
            Self::TurnedFaceUp { .. } => EventKind::TurnedFaceUp,
            Self::Attached { .. } => EventKind::Attached,
            Self::Unattached { .. } => EventKind::Unattached,
            Self::TokenCreated { .. } => EventKind::TokenCreated,
            Self::SpellCountered { .. } => EventKind::SpellCountered,
            Self::Fizzled { .. } => EventKind::Fizzled,
            Self::LibraryShuffled { .. } => EventKind::LibraryShuffled,
            Self::PlayerLost { .. } => EventKind::PlayerLost,
        }
    }

    /// The object the event is mainly about.
    #[must_use]
    pub fn object(&self) -> Option<EntityId> {
        match self {
            Self::ZoneChanged { object, .. }
            | Self::Tapped { object }
            | Self::Untapped { object }
            | Self::CountersAdded { object, .. }
            | Self::CountersRemoved { object, .. }
            | Self::TurnedFaceUp { object }
            | Self::Attached { object, .. }
            | Self::Unattached { object, .. } => Some(*object),
            Self::DamageDealt { source, .. } | Self::DamagePrevented { source, .. } => Some(*source),
            Self::CardDrawn { card, .. } | Self::SpellCast { card, .. } | Self::SpellCountered { card } => {
                Some(*card)
            }
            Self::AbilityActivated { source, .. } | Self::Fizzled { source, .. } => Some(*source),
            Self::AttackerDeclared { attacker, .. } => Some(*attacker),
            Self::BlockerDeclared { blocker, .. } => Some(*blocker),
            Self::TokenCreated { token, .. } => Some(*token),
            _ => None,
        }
    }

    /// The player the event is mainly about.
    #[must_use]
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            Self::LifeGained { player, .. }
            | Self::LifeLost { player, .. }
            | Self::PoisonGiven { player, .. }
            | Self::CardDrawn { player, .. }
            | Self::ManaAdded { player, .. }
            | Self::LibraryShuffled { player }
            | Self::PlayerLost { player, .. } => Some(*player),
            Self::DamageDealt { target, .. } | Self::DamagePrevented { target, .. } => target.player(),
            Self::SpellCast { controller, .. }
            | Self::AbilityActivated { controller, .. }
            | Self::AttackerDeclared { controller, .. }
            | Self::TokenCreated { controller, .. } => Some(*controller),
            Self::StepBegan { active, .. } => Some(*active),
            _ => None,
        }
    }

    /// Numeric payload: damage, life, counters.
    #[must_use]
    pub fn amount(&self) -> Option<u32> {
        match self {
            Self::DamageDealt { amount, .. }
            | Self::DamagePrevented { amount, .. }
            | Self::LifeGained { amount, .. }
            | Self::LifeLost { amount, .. }
            | Self::PoisonGiven { amount, .. }
            | Self::CountersAdded { amount, .. }
            | Self::CountersRemoved { amount, .. }
            | Self::ManaAdded { amount, .. } => Some(*amount),
            _ => None,
        }
    }

    /// Snapshot of the object before a zone change.
    #[must_use]
    pub fn last_known(&self) -> Option<&LastKnown> {
        match self {
            Self::ZoneChanged { last_known, .. } => last_known.as_ref(),
            _ => None,
        }
    }

    /// An object left the battlefield.
    #[must_use]
    pub fn left_battlefield(&self) -> bool {
        matches!(self, Self::ZoneChanged { from: Some(from), .. } if from.kind == ZoneKind::Battlefield)
    }

    /// An object entered the battlefield.
    #[must_use]
    pub fn entered_battlefield(&self) -> bool {
        matches!(self, Self::ZoneChanged { to, .. } if to.kind == ZoneKind::Battlefield)
    }

    /// A permanent went from the battlefield to a graveyard.
    #[must_use]
    pub fn is_death(&self) -> bool {
        matches!(
            self,
            Self::ZoneChanged { from: Some(from), to, .. }
                if from.kind == ZoneKind::Battlefield && to.kind == ZoneKind::Graveyard
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moved(from: Option<ZoneId>, to: ZoneId) -> GameEvent {
        GameEvent::ZoneChanged {
            object: EntityId(7),
            from,
            to,
            last_known: None,
        }
    }

    #[test]
    fn test_zone_change_classification() {
        let p = PlayerId::new(0);
        let dies = moved(Some(ZoneId::battlefield()), ZoneId::graveyard(p));
        assert!(dies.is_death());
        assert!(dies.left_battlefield());
        assert!(!dies.entered_battlefield());

        let exiled = moved(Some(ZoneId::battlefield()), ZoneId::exile(p));
        assert!(!exiled.is_death());
        assert!(exiled.left_battlefield());

        let token = moved(None, ZoneId::battlefield());
        assert!(token.entered_battlefield());
        assert!(!token.left_battlefield());
    }

    #[test]
    fn test_accessors() {
        let event = GameEvent::DamageDealt {
            source: EntityId(3),
            source_controller: PlayerId::new(0),
            target: Target::Player(PlayerId::new(1)),
            amount: 4,
            combat: true,
        };
        assert_eq!(event.kind(), EventKind::DamageDealt);
        assert_eq!(event.object(), Some(EntityId(3)));
        assert_eq!(event.player(), Some(PlayerId::new(1)));
        assert_eq!(event.amount(), Some(4));
    }
}
