//! Effect primitives: the instruction set of card scripts.
//!
//! A spell or ability resolves by executing its `Vec<Effect>` in order.
//! Instructions name the objects and players they act on through
//! [`Selector`] and [`PlayerSelector`], and numbers through [`Amount`], so
//! the same primitive works for every card that uses it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::targeting::ObjectFilter;
use crate::cards::{AbilityDef, CardDefinition, ManaType};
use crate::core::{CounterType, PlayerId};
use crate::layers::{Duration, Modification};
use crate::triggers::TriggerCondition;
use crate::zones::ZoneKind;

/// Objects an instruction acts on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selector {
    /// The object the spell or ability comes from.
    Source,
    /// Still-legal targets of target group `n` (players included).
    Targets(usize),
    /// The permanent the source is attached to.
    Host,
    /// The object named by the triggering event.
    TriggeringObject,
    /// Every object matching the filter, evaluated on execution.
    All(ObjectFilter),
    /// Objects picked by an earlier `ChooseObjects`.
    Chosen,
}

/// Players an instruction acts on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerSelector {
    /// The controller of the spell or ability.
    You,
    /// Players in target group `n`.
    Targets(usize),
    EachOpponent,
    EachPlayer,
    Active,
    /// Controllers of the objects in target group `n`.
    ControllerOfTargets(usize),
    /// The player named by the triggering event.
    TriggeringPlayer,
    /// Controller of the triggering object (last known if it left).
    ControllerOfTriggeringObject,
    /// A fixed player.
    Player(PlayerId),
}

/// A number used by an instruction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Amount {
    Fixed(i32),
    /// The X paid when casting or activating.
    X,
    /// The number picked by an earlier `ChooseNumber`.
    ChosenNumber,
    /// Number of objects matching the filter.
    CountOf(ObjectFilter),
    /// Power of the source, last known if it left the battlefield.
    SourcePower,
    /// Amount carried by the triggering event (damage dealt, life gained).
    EventAmount,
}

/// Condition for [`Effect::If`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectCondition {
    /// You control at least `count` objects matching the filter.
    YouControl { filter: ObjectFilter, count: usize },
    /// The last yes/no question was answered yes.
    ChoseYes,
    /// The source is still on the battlefield.
    SourceOnBattlefield,
    /// Your life total is at most the value.
    LifeAtMost(i32),
    /// Target group `n` still has a legal target.
    TargetLegal(usize),
    Not(Box<EffectCondition>),
}

/// One instruction of a card script.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    // === Damage and life ===
    DealDamage { amount: Amount, to: Selector },
    DealDamageToPlayers { amount: Amount, to: PlayerSelector },
    /// Divide `amount` among the targets of group `group`, at least
    /// `min_each` to each. The controller chooses the split.
    DistributeDamage { amount: u32, group: usize, min_each: u32 },
    GainLife { player: PlayerSelector, amount: Amount },
    LoseLife { player: PlayerSelector, amount: Amount },
    GivePoison { player: PlayerSelector, amount: Amount },
    /// Prevent damage that would be dealt to the selected objects or players
    /// (`None` prevents all of it).
    PreventDamage { to: Selector, amount: Option<u32>, duration: Duration },

    // === Cards ===
    DrawCards { player: PlayerSelector, amount: Amount },
    Discard { player: PlayerSelector, amount: Amount },
    /// Search your library for up to `count` cards matching the filter and
    /// put them into `to`, then shuffle.
    SearchLibrary { filter: ObjectFilter, count: u32, to: ZoneKind },
    Shuffle { player: PlayerSelector },

    // === Counters ===
    AddCounters { to: Selector, counter: CounterType, amount: Amount },
    RemoveCounters { from: Selector, counter: CounterType, amount: Amount },

    // === Zone changes ===
    Destroy(Selector),
    Exile(Selector),
    ReturnToHand(Selector),
    /// Each selected player sacrifices `count` permanents matching the filter.
    Sacrifice { player: PlayerSelector, filter: ObjectFilter, count: u32 },
    SacrificeObjects(Selector),
    CreateTokens { token: Arc<CardDefinition>, count: Amount, controller: PlayerSelector },
    CounterSpell(Selector),

    // === Permanent status ===
    Tap(Selector),
    Untap(Selector),
    Attach { object: Selector, to: Selector },

    // === Continuous effects ===
    Pump { to: Selector, power: i32, toughness: i32, duration: Duration },
    ApplyContinuous { to: Selector, modifications: Vec<Modification>, duration: Duration },
    GainControl { of: Selector, duration: Duration },
    GrantAbility { to: Selector, ability: Box<AbilityDef>, duration: Duration },
    /// Uses the color picked by an earlier `ChooseColor`.
    BecomeChosenColor { to: Selector, duration: Duration },
    /// Uses the type picked by an earlier `ChooseCreatureType`.
    AddChosenCreatureType { to: Selector, duration: Duration },

    // === Mana ===
    AddMana { mana: ManaType, amount: u32 },
    AddManaOfChosenColor { amount: u32 },

    // === Choices and control flow ===
    /// "You may": ask the controller, run `effects` on yes.
    May { effects: Vec<Effect> },
    /// Choose one of the modes and run it.
    ChooseMode { modes: Vec<Vec<Effect>> },
    ChooseColor,
    ChooseNumber { min: i64, max: i64 },
    ChooseCreatureType,
    /// The controller picks between `min` and `max` matching objects.
    ChooseObjects { filter: ObjectFilter, min: u32, max: u32 },
    If { condition: EffectCondition, then: Vec<Effect>, otherwise: Vec<Effect> },

    // === Triggers ===
    /// "When/At ... this turn": a one-shot delayed trigger.
    CreateDelayedTrigger { condition: TriggerCondition, effects: Vec<Effect> },
}

impl Effect {
    /// "Deal `amount` damage to `to`."
    #[must_use]
    pub fn deal_damage(amount: i32, to: Selector) -> Self {
        Self::DealDamage {
            amount: Amount::Fixed(amount),
            to,
        }
    }

    /// "`to` gets +power/+toughness until end of turn."
    #[must_use]
    pub fn pump(to: Selector, power: i32, toughness: i32) -> Self {
        Self::Pump {
            to,
            power,
            toughness,
            duration: Duration::EndOfTurn,
        }
    }

    /// "Draw `n` cards."
    #[must_use]
    pub fn draw(n: i32) -> Self {
        Self::DrawCards {
            player: PlayerSelector::You,
            amount: Amount::Fixed(n),
        }
    }

    /// "Gain `n` life."
    #[must_use]
    pub fn gain_life(n: i32) -> Self {
        Self::GainLife {
            player: PlayerSelector::You,
            amount: Amount::Fixed(n),
        }
    }
}
