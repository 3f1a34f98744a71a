//! Costs of spells and activated abilities.
//!
//! Costs are checked as a whole before anything is paid, then paid in order.
//! A failed check leaves the state untouched; the engine additionally rolls
//! back the whole command on error.

use serde::{Deserialize, Serialize};

use crate::cards::{Keyword, ManaCost};
use crate::core::{CounterType, EntityId, GameState, IllegalAction, PlayerId, RulesResult};
use crate::effects::actions;
use crate::layers::ProjectedView;
use crate::zones::ZoneKind;

/// One cost component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cost {
    Mana(ManaCost),
    /// {T}
    Tap,
    /// {Q}
    Untap,
    PayLife(u32),
    SacrificeSelf,
    RemoveCounters { counter: CounterType, amount: u32 },
    AddCounters { counter: CounterType, amount: u32 },
}

impl Cost {
    /// Mana cost from text, e.g. `Cost::mana("2R")`. Unparseable text is
    /// treated as free.
    #[must_use]
    pub fn mana(text: &str) -> Self {
        Self::Mana(ManaCost::parse(text).unwrap_or_default())
    }
}

/// What was actually paid, kept on the stack object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostRecord {
    pub mana: Option<ManaCost>,
    pub x: u32,
    pub life_paid: u32,
    pub tapped: Vec<EntityId>,
    pub sacrificed: Vec<EntityId>,
    pub counters_removed: u32,
}

/// Checks and pays costs for one object.
pub struct CostPayment<'a> {
    pub source: EntityId,
    pub payer: PlayerId,
    pub x: u32,
    pub view: &'a ProjectedView,
}

impl CostPayment<'_> {
    /// Can every cost be paid right now?
    pub fn check(&self, state: &GameState, costs: &[Cost]) -> Result<(), IllegalAction> {
        let mut total_mana = ManaCost::default();
        for cost in costs {
            match cost {
                Cost::Mana(mana) => total_mana = combine(&total_mana, mana),
                Cost::Tap | Cost::Untap => {
                    self.require_on_battlefield()?;
                    let tapped = state.components.is_tapped(self.source);
                    if matches!(cost, Cost::Tap) == tapped {
                        return Err(IllegalAction::CannotPayCost(format!(
                            "{} is {}",
                            self.source,
                            if tapped { "tapped" } else { "untapped" }
                        )));
                    }
                    if self.summoning_sick(state) {
                        return Err(IllegalAction::CannotPayCost(format!(
                            "{} has summoning sickness",
                            self.source
                        )));
                    }
                }
                Cost::PayLife(life) => {
                    if i64::from(state.players[self.payer].life) < i64::from(*life) {
                        return Err(IllegalAction::CannotPayCost(format!("not enough life to pay {life}")));
                    }
                }
                Cost::SacrificeSelf => self.require_on_battlefield()?,
                Cost::RemoveCounters { counter, amount } => {
                    if state.components.counter(self.source, counter) < *amount {
                        return Err(IllegalAction::CannotPayCost(format!(
                            "{} has fewer than {amount} {counter:?} counters",
                            self.source
                        )));
                    }
                }
                Cost::AddCounters { .. } => self.require_on_battlefield()?,
            }
        }
        if self.x > 0 && total_mana.x == 0 {
            return Err(IllegalAction::UnexpectedX(self.x));
        }
        if !state.players[self.payer].mana_pool.can_pay(&total_mana, self.x) {
            return Err(IllegalAction::CannotPayCost(format!("insufficient mana for {total_mana}")));
        }
        Ok(())
    }

    /// Check, then pay every cost.
    pub fn pay(&self, state: &mut GameState, costs: &[Cost]) -> RulesResult<CostRecord> {
        self.check(state, costs)?;
        let mut record = CostRecord {
            x: self.x,
            ..CostRecord::default()
        };
        for cost in costs {
            match cost {
                Cost::Mana(mana) => {
                    state.players[self.payer]
                        .mana_pool
                        .pay(mana, self.x)
                        .map_err(IllegalAction::CannotPayCost)?;
                    record.mana = Some(combine(&record.mana.unwrap_or_default(), mana));
                }
                Cost::Tap => {
                    actions::tap(state, self.source);
                    record.tapped.push(self.source);
                }
                Cost::Untap => actions::untap(state, self.source),
                Cost::PayLife(life) => {
                    actions::lose_life(state, self.payer, *life);
                    record.life_paid += life;
                }
                Cost::SacrificeSelf => {
                    actions::sacrifice(state, self.source)?;
                    record.sacrificed.push(self.source);
                }
                Cost::RemoveCounters { counter, amount } => {
                    record.counters_removed += actions::remove_counters(state, self.source, counter.clone(), *amount);
                }
                Cost::AddCounters { counter, amount } => {
                    actions::add_counters(state, self.source, counter.clone(), *amount);
                }
            }
        }
        Ok(record)
    }

    fn require_on_battlefield(&self) -> Result<(), IllegalAction> {
        match self.view.get(self.source) {
            Some(ch) if ch.zone == ZoneKind::Battlefield => Ok(()),
            _ => Err(IllegalAction::WrongZone {
                object: self.source,
                expected: "battlefield",
            }),
        }
    }

    /// Creatures can't use {T}/{Q} costs unless controlled continuously
    /// since the start of the turn or they have haste.
    fn summoning_sick(&self, state: &GameState) -> bool {
        let Some(ch) = self.view.get(self.source) else {
            return false;
        };
        ch.is_creature() && !ch.has_keyword(&Keyword::Haste) && is_new_to_control(state, self.source)
    }
}

/// Has `entity` come under its controller's control this turn?
#[must_use]
pub fn is_new_to_control(state: &GameState, entity: EntityId) -> bool {
    state
        .components
        .controlled_since(entity)
        .map_or(true, |turn| turn >= state.turn.turn_number && state.turn.turn_number > 0)
}

fn combine(a: &ManaCost, b: &ManaCost) -> ManaCost {
    let mut out = a.clone();
    out.generic += b.generic;
    out.colorless += b.colorless;
    for (total, pips) in out.colored.iter_mut().zip(b.colored) {
        *total += pips;
    }
    out.x += b.x;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CardDefinition, ManaType};
    use crate::core::GameConfig;
    use crate::layers::project;
    use crate::zones::ZoneId;
    use std::sync::Arc;

    fn setup() -> (GameState, EntityId) {
        let mut state = GameState::new(GameConfig::new(2));
        let bear = state
            .create_object(
                PlayerId::new(0),
                Arc::new(CardDefinition::creature("Bear", "1G", 2, 2)),
                ZoneId::battlefield(),
                false,
            )
            .unwrap();
        (state, bear)
    }

    #[test]
    fn test_mana_shortfall_is_rejected_without_payment() {
        let (mut state, bear) = setup();
        state.players[PlayerId::new(0)].mana_pool.add(ManaType::Red, 1);
        let view = project(&state);
        let payment = CostPayment {
            source: bear,
            payer: PlayerId::new(0),
            x: 0,
            view: &view,
        };
        let err = payment.pay(&mut state, &[Cost::Tap, Cost::mana("2")]).unwrap_err();
        assert!(matches!(
            err,
            crate::core::RulesError::IllegalAction(IllegalAction::CannotPayCost(_))
        ));
        assert!(!state.components.is_tapped(bear));
        assert_eq!(state.players[PlayerId::new(0)].mana_pool.total(), 1);
    }

    #[test]
    fn test_x_needs_an_x_cost() {
        let (mut state, bear) = setup();
        state.players[PlayerId::new(0)].mana_pool.add(ManaType::Red, 4);
        let view = project(&state);
        let payment = CostPayment {
            source: bear,
            payer: PlayerId::new(0),
            x: 3,
            view: &view,
        };
        assert_eq!(
            payment.check(&state, &[Cost::mana("R")]),
            Err(IllegalAction::UnexpectedX(3))
        );
        assert!(payment.check(&state, &[Cost::mana("XR")]).is_ok());
    }

    #[test]
    fn test_tap_cost_and_life() {
        let (mut state, bear) = setup();
        let view = project(&state);
        let payment = CostPayment {
            source: bear,
            payer: PlayerId::new(0),
            x: 0,
            view: &view,
        };
        let record = payment.pay(&mut state, &[Cost::Tap, Cost::PayLife(2)]).unwrap();
        assert!(state.components.is_tapped(bear));
        assert_eq!(record.life_paid, 2);
        assert_eq!(state.players[PlayerId::new(0)].life, 18);
    }

    #[test]
    fn test_summoning_sickness_blocks_tap() {
        let (mut state, bear) = setup();
        state.turn.turn_number = 3;
        state.components.set_controlled_since(bear, 3);
        let view = project(&state);
        let payment = CostPayment {
            source: bear,
            payer: PlayerId::new(0),
            x: 0,
            view: &view,
        };
        assert!(payment.check(&state, &[Cost::Tap]).is_err());
        state.components.set_controlled_since(bear, 2);
        assert!(payment.check(&state, &[Cost::Tap]).is_ok());
    }
}
