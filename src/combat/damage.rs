//! Combat damage assignment.
//!
//! Every participating creature's assignment is settled first; only then
//! is damage dealt, all of it as one batch of proposals. An attacker
//! blocked by two or more creatures has its split chosen by its controller
//! through a decision. A single blocker is assigned automatically.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CombatState;
use crate::cards::Keyword;
use crate::core::{EntityId, GameState, RulesResult};
use crate::decision::{Continuation, DecisionKind};
use crate::effects::{actions, replacement, DamageEvent, Proposal, ProposedEvent, Target};
use crate::layers::{project, ProjectedView};

/// How an attacker's combat damage is divided.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub to_blockers: Vec<(EntityId, u32)>,
    pub to_defender: u32,
}

impl Assignment {
    #[must_use]
    pub fn total(&self) -> u32 {
        self.to_blockers.iter().map(|(_, n)| n).sum::<u32>() + self.to_defender
    }
}

/// Damage that is lethal to a creature with `toughness` and `marked`
/// damage, for a source with or without deathtouch.
#[must_use]
pub fn lethal_damage(toughness: i32, marked: u32, deathtouch: bool) -> u32 {
    if deathtouch {
        return 1;
    }
    u32::try_from(toughness).unwrap_or(0).saturating_sub(marked)
}

/// Assign `power` to blockers in order, lethal damage to each before the
/// next. Leftover damage goes to the defender with trample, otherwise onto
/// the last blocker.
#[must_use]
pub fn auto_assign(power: u32, blockers: &[(EntityId, u32)], trample: bool) -> Assignment {
    let mut remaining = power;
    let mut to_blockers = Vec::with_capacity(blockers.len());
    for &(blocker, lethal) in blockers {
        let amount = lethal.min(remaining);
        remaining -= amount;
        to_blockers.push((blocker, amount));
    }
    let mut assignment = Assignment {
        to_blockers,
        to_defender: 0,
    };
    if remaining > 0 {
        if trample || blockers.is_empty() {
            assignment.to_defender = remaining;
        } else if let Some(last) = assignment.to_blockers.last_mut() {
            last.1 += remaining;
        }
    }
    assignment
}

/// Does any creature in combat have first strike or double strike?
#[must_use]
pub fn needs_first_strike_step(view: &ProjectedView, combat: &CombatState) -> bool {
    combat
        .attackers
        .keys()
        .chain(combat.blockers.keys())
        .any(|&e| view.has_keyword(e, &Keyword::FirstStrike) || view.has_keyword(e, &Keyword::DoubleStrike))
}

fn deals_damage_now(view: &ProjectedView, combat: &CombatState, creature: EntityId, first_strike: bool) -> bool {
    let Some(ch) = view.get(creature) else {
        return false;
    };
    if !ch.on_battlefield() || !ch.is_creature() {
        return false;
    }
    let double = ch.has_keyword(&Keyword::DoubleStrike);
    if first_strike {
        double || ch.has_keyword(&Keyword::FirstStrike)
    } else {
        double || !combat.first_strike_dealt.contains(&creature)
    }
}

fn power_of(view: &ProjectedView, creature: EntityId) -> u32 {
    u32::try_from(view.power(creature).unwrap_or(0)).unwrap_or(0)
}

/// Blockers of `attacker` with the damage that is lethal to each.
fn lethal_table(state: &GameState, view: &ProjectedView, combat: &CombatState, attacker: EntityId) -> Vec<(EntityId, u32)> {
    let deathtouch = view.has_keyword(attacker, &Keyword::Deathtouch);
    combat
        .blockers_of(attacker)
        .into_iter()
        .filter(|b| view.get(*b).is_some_and(|ch| ch.on_battlefield()))
        .map(|b| {
            let toughness = view.toughness(b).unwrap_or(0);
            (b, lethal_damage(toughness, state.components.damage(b), deathtouch))
        })
        .collect()
}

/// Run one combat damage step. Returns `true` if an attacker's controller
/// must divide its damage first; call again after the decision resolves.
pub fn perform(state: &mut GameState, first_strike: bool) -> RulesResult<bool> {
    let view = project(state);
    let Some(combat) = state.combat.clone() else {
        return Ok(false);
    };

    for (&attacker, target) in &combat.attackers {
        if combat.assignments.contains_key(&attacker) || !deals_damage_now(&view, &combat, attacker, first_strike) {
            continue;
        }
        let power = power_of(&view, attacker);
        let trample = view.has_keyword(attacker, &Keyword::Trample);
        let blockers = lethal_table(state, &view, &combat, attacker);

        let assignment = if power == 0 {
            Assignment::default()
        } else if !combat.is_blocked(attacker) {
            Assignment {
                to_blockers: Vec::new(),
                to_defender: power,
            }
        } else if blockers.is_empty() {
            Assignment {
                to_blockers: Vec::new(),
                to_defender: if trample { power } else { 0 },
            }
        } else if blockers.len() == 1 {
            auto_assign(power, &blockers, trample)
        } else {
            let player = view.controller(attacker).unwrap_or(state.turn.active_player);
            debug!(target: "engine.combat", attacker = %attacker, power, "damage assignment requested");
            state.request_decision(
                player,
                DecisionKind::AssignCombatDamage {
                    attacker,
                    power,
                    blockers,
                    trample,
                    defender: Some(target.as_target()),
                },
                Continuation::CombatDamage { attacker },
            );
            return Ok(true);
        };
        if let Some(combat) = state.combat.as_mut() {
            combat.assignments.insert(attacker, assignment);
        }
    }

    deal_assigned(state, &view, first_strike);
    Ok(false)
}

/// Record the attacker's controller's split of its damage.
pub fn resume_assignment(state: &mut GameState, attacker: EntityId, blockers: &[(EntityId, u32)], to_blockers: &[u32], to_defender: u32) {
    let assignment = Assignment {
        to_blockers: blockers.iter().map(|(b, _)| *b).zip(to_blockers.iter().copied()).collect(),
        to_defender,
    };
    if let Some(combat) = state.combat.as_mut() {
        combat.assignments.insert(attacker, assignment);
    }
}

fn deal_assigned(state: &mut GameState, view: &ProjectedView, first_strike: bool) {
    let Some(combat) = state.combat.clone() else {
        return;
    };
    let mut proposals = Vec::new();
    let mut dealt = Vec::new();

    for (attacker, assignment) in &combat.assignments {
        dealt.push(*attacker);
        let source = actions::damage_source(state, view, *attacker);
        for &(blocker, amount) in &assignment.to_blockers {
            if amount > 0 {
                proposals.push(DamageEvent {
                    source: source.clone(),
                    target: Target::Object(blocker),
                    amount,
                    combat: true,
                });
            }
        }
        if assignment.to_defender > 0 {
            if let Some(target) = combat.attackers.get(attacker) {
                proposals.push(DamageEvent {
                    source: source.clone(),
                    target: target.as_target(),
                    amount: assignment.to_defender,
                    combat: true,
                });
            }
        }
    }

    for (&blocker, &attacker) in &combat.blockers {
        if !deals_damage_now(view, &combat, blocker, first_strike) {
            continue;
        }
        dealt.push(blocker);
        let power = power_of(view, blocker);
        if power > 0 && combat.is_attacking(attacker) {
            proposals.push(DamageEvent {
                source: actions::damage_source(state, view, blocker),
                target: Target::Object(attacker),
                amount: power,
                combat: true,
            });
        }
    }

    debug!(target: "engine.combat", first_strike, events = proposals.len(), "combat damage dealt");
    for damage in proposals {
        replacement::enqueue(state, Proposal::new(ProposedEvent::Damage(damage)));
    }
    if let Some(combat) = state.combat.as_mut() {
        if first_strike {
            for creature in dealt {
                combat.first_strike_dealt.insert(creature);
            }
        }
        combat.assignments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lethal_damage() {
        assert_eq!(lethal_damage(3, 0, false), 3);
        assert_eq!(lethal_damage(3, 2, false), 1);
        assert_eq!(lethal_damage(3, 5, false), 0);
        assert_eq!(lethal_damage(5, 0, true), 1);
        assert_eq!(lethal_damage(-1, 0, false), 0);
    }

    #[test]
    fn test_auto_assign_without_trample_piles_on_last() {
        let blockers = [(EntityId(10), 2), (EntityId(11), 2)];
        let assignment = auto_assign(5, &blockers, false);
        assert_eq!(assignment.to_blockers, vec![(EntityId(10), 2), (EntityId(11), 3)]);
        assert_eq!(assignment.to_defender, 0);
    }

    #[test]
    fn test_auto_assign_with_trample() {
        let blockers = [(EntityId(10), 2)];
        let assignment = auto_assign(5, &blockers, true);
        assert_eq!(assignment.to_blockers, vec![(EntityId(10), 2)]);
        assert_eq!(assignment.to_defender, 3);
        assert_eq!(assignment.total(), 5);
    }

    #[test]
    fn test_auto_assign_short_power() {
        let blockers = [(EntityId(10), 3), (EntityId(11), 3)];
        let assignment = auto_assign(2, &blockers, true);
        assert_eq!(assignment.to_blockers, vec![(EntityId(10), 2), (EntityId(11), 0)]);
        assert_eq!(assignment.to_defender, 0);
    }
}
