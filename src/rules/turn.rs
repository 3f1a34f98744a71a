//! Turn structure: beginning steps, turn-based actions and moving on.
//!
//! Every step starts in [`StepStage::Start`]. [`perform_turn_based`] runs the
//! step's turn-based actions and leaves it in one of:
//!
//! - `Priority`: players may act; the step ends when all pass with an empty
//!   stack
//! - `AwaitingAttackers` / `AwaitingBlockers`: waiting for a declaration
//!   command
//! - `Start` with a pending decision: called again once it is answered
//!
//! Untap and cleanup give no priority and move on by themselves (cleanup
//! does give priority when something happened during it).

use tracing::debug;

use crate::combat::{self, damage, declare, CombatState};
use crate::core::{EntityId, GameState, PlayerId, RulesResult};
use crate::decision::{Continuation, DecisionKind};
use crate::effects::actions;
use crate::layers::{project, Duration};
use crate::stack::{Step, StepStage};
use crate::triggers::GameEvent;
use crate::zones::ZoneId;

/// What the step needs after its turn-based actions ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepFlow {
    /// Continue with the current stage (priority or a declaration).
    Stay,
    /// A decision is pending.
    Suspended,
    /// The step gives no priority; move to the next one.
    Advance,
}

/// Begin turn `turn_number + 1` for `player`.
pub fn begin_turn(state: &mut GameState, player: PlayerId) {
    state.turn.turn_number += 1;
    state.turn.active_player = player;
    state.turn.cleanup_needs_priority = false;
    let turn = state.turn.turn_number;
    for (_, p) in state.players.iter_mut() {
        p.lands_played = 0;
    }
    state.effects.expire_at_turn_start(player, turn);
    state.replacements.expire_at_turn_start(player, turn);
    state
        .components
        .retain_granted(|g| !(g.expiry == Duration::UntilYourNextTurn && g.grantor == player && g.created_turn < turn));
    debug!(target: "engine.priority", turn, player = %player, "turn began");
    begin_step(state, Step::Untap);
}

/// Enter `step`: nobody has priority until its turn-based actions ran.
pub fn begin_step(state: &mut GameState, step: Step) {
    state.turn.step = step;
    state.turn.stage = StepStage::Start;
    state.stack.clear_priority();
    debug!(target: "engine.priority", turn = state.turn.turn_number, step = ?step, "step began");
    actions::emit(
        state,
        GameEvent::StepBegan {
            step,
            active: state.turn.active_player,
            turn: state.turn.turn_number,
        },
    );
}

/// Run the current step's turn-based actions. Safe to call again after a
/// decision it requested was answered.
pub fn perform_turn_based(state: &mut GameState) -> RulesResult<StepFlow> {
    let active = state.turn.active_player;
    let flow = match state.turn.step {
        Step::Untap => {
            let view = project(state);
            let permanents: Vec<EntityId> = view
                .battlefield()
                .filter(|(_, ch)| ch.controller == active && ch.tapped)
                .map(|(e, _)| e)
                .collect();
            for permanent in permanents {
                actions::untap(state, permanent);
            }
            StepFlow::Advance
        }
        Step::Draw => {
            let skip = state.turn.turn_number == 1 && state.config.skip_first_draw;
            if !skip {
                actions::draw(state, active)?;
            }
            StepFlow::Stay
        }
        Step::BeginCombat => {
            if state.combat.is_none() {
                state.combat = Some(CombatState::new());
            }
            StepFlow::Stay
        }
        Step::DeclareAttackers => declare_attackers_step(state),
        Step::DeclareBlockers => return declare_blockers_step(state),
        Step::FirstStrikeDamage => {
            if damage::perform(state, true)? {
                return Ok(StepFlow::Suspended);
            }
            StepFlow::Stay
        }
        Step::CombatDamage => {
            if damage::perform(state, false)? {
                return Ok(StepFlow::Suspended);
            }
            StepFlow::Stay
        }
        Step::Cleanup => return cleanup(state),
        Step::Upkeep | Step::PrecombatMain | Step::EndCombat | Step::PostcombatMain | Step::End => StepFlow::Stay,
    };
    if flow == StepFlow::Stay && state.turn.stage == StepStage::Start {
        state.turn.stage = StepStage::Priority;
    }
    Ok(flow)
}

fn declare_attackers_step(state: &mut GameState) -> StepFlow {
    let declared = state.combat.as_ref().is_some_and(|c| c.attackers_declared);
    if !declared {
        let view = project(state);
        if declare::has_potential_attackers(state, &view) {
            state.turn.stage = StepStage::AwaitingAttackers;
            return StepFlow::Stay;
        }
        debug!(target: "engine.combat", "no creature can attack");
        state.combat.get_or_insert_with(CombatState::new).attackers_declared = true;
    }
    StepFlow::Stay
}

/// The player who must declare blockers next, if any.
#[must_use]
pub fn next_defender(state: &GameState) -> Option<PlayerId> {
    state.combat.as_ref().and_then(|c| c.defenders_pending.front().copied())
}

fn declare_blockers_step(state: &mut GameState) -> RulesResult<StepFlow> {
    let view = project(state);
    let Some(combat) = state.combat.clone() else {
        state.turn.stage = StepStage::Priority;
        return Ok(StepFlow::Stay);
    };

    if !combat.defenders_listed {
        let attackers: Vec<EntityId> = combat.attackers.keys().copied().collect();
        let defenders: Vec<PlayerId> = state
            .apnap_order()
            .into_iter()
            .filter(|p| {
                combat
                    .attackers
                    .values()
                    .any(|target| target.defending_player(state) == Some(*p))
            })
            .filter(|p| declare::has_potential_blockers(&view, *p, &attackers))
            .collect();
        if let Some(combat) = state.combat.as_mut() {
            combat.defenders_listed = true;
            combat.defenders_pending = defenders.into_iter().collect();
        }
    }

    if next_defender(state).is_some() {
        state.turn.stage = StepStage::AwaitingBlockers;
        return Ok(StepFlow::Stay);
    }
    if let Some(combat) = state.combat.as_mut() {
        combat.blockers_declared = true;
    }

    // The attacking player orders each attacker's blockers.
    let Some(combat) = state.combat.clone() else {
        return Ok(StepFlow::Stay);
    };
    for &attacker in combat.attackers.keys() {
        let blockers = combat.blockers_of(attacker);
        if blockers.len() > 1 && !combat.damage_order.contains_key(&attacker) {
            let player = view.controller(attacker).unwrap_or(state.turn.active_player);
            state.request_decision(
                player,
                DecisionKind::Order { items: blockers },
                Continuation::BlockerOrder { attacker },
            );
            return Ok(StepFlow::Suspended);
        }
    }
    state.turn.stage = StepStage::Priority;
    Ok(StepFlow::Stay)
}

fn cleanup(state: &mut GameState) -> RulesResult<StepFlow> {
    let active = state.turn.active_player;
    let hand: Vec<EntityId> = state.zones.cards_in_zone(ZoneId::hand(active)).into_iter().collect();
    let max = state.config.max_hand_size;
    if hand.len() > max {
        let excess = hand.len() - max;
        state.request_decision(
            active,
            DecisionKind::SelectFromSet {
                options: hand,
                min: excess,
                max: excess,
            },
            Continuation::CleanupDiscard { player: active },
        );
        return Ok(StepFlow::Suspended);
    }

    state.components.clear_all_damage();
    let expired = state.effects.expire_end_of_turn();
    state.replacements.expire_end_of_turn();
    state.components.retain_granted(|g| g.expiry != Duration::EndOfTurn);
    debug!(target: "engine.priority", expired, "cleanup");
    Ok(StepFlow::Advance)
}

/// Leave the current step for the next one (or the next turn).
pub fn advance_step(state: &mut GameState) {
    for (_, player) in state.players.iter_mut() {
        player.mana_pool.empty();
    }
    let step = state.turn.step;
    if step == Step::EndCombat {
        state.combat = None;
    }

    if step == Step::Cleanup {
        if state.turn.cleanup_needs_priority {
            state.turn.cleanup_needs_priority = false;
            begin_step(state, Step::Cleanup);
            return;
        }
        let active = state.turn.active_player;
        let next = PlayerId::apnap(active, state.player_count())
            .into_iter()
            .skip(1)
            .find(|p| state.players[*p].is_active())
            .unwrap_or(active);
        begin_turn(state, next);
        return;
    }

    let no_attackers = state.combat.as_ref().map_or(true, |c| c.attackers.is_empty());
    let next = match step {
        Step::DeclareAttackers if no_attackers => Step::EndCombat,
        Step::DeclareBlockers => {
            let view = project(state);
            let first_strike = state
                .combat
                .as_ref()
                .is_some_and(|c| combat::damage::needs_first_strike_step(&view, c));
            if first_strike {
                Step::FirstStrikeDamage
            } else {
                Step::CombatDamage
            }
        }
        _ => step.next().unwrap_or(Step::Cleanup),
    };
    begin_step(state, next);
}
