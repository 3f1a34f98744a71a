//! Attack and block declarations.
//!
//! A declaration is checked as a whole against the projected view. Evasion
//! and "can't block" restrictions are checked per blocker; menace and lure
//! requirements are checked across the whole declaration.

use super::AttackTarget;
use crate::cards::{CardType, Color, Keyword};
use crate::core::{EntityId, GameState, IllegalAction, PlayerId};
use crate::effects::is_new_to_control;
use crate::layers::{Characteristics, ProjectedView};

/// Could `ch` attack this turn, ignoring what it would attack?
pub fn can_attack(state: &GameState, entity: EntityId, ch: &Characteristics) -> Result<(), &'static str> {
    if !ch.on_battlefield() || !ch.is_creature() {
        return Err("not a creature on the battlefield");
    }
    if ch.controller != state.turn.active_player {
        return Err("not controlled by the active player");
    }
    if ch.tapped {
        return Err("tapped");
    }
    if ch.has_keyword(&Keyword::Defender) || ch.has_keyword(&Keyword::CantAttack) {
        return Err("can't attack");
    }
    if !ch.has_keyword(&Keyword::Haste) && is_new_to_control(state, entity) {
        return Err("summoning sickness");
    }
    Ok(())
}

/// Does the active player control any creature able to attack?
#[must_use]
pub fn has_potential_attackers(state: &GameState, view: &ProjectedView) -> bool {
    view.creatures_of(state.turn.active_player)
        .any(|(e, ch)| can_attack(state, e, ch).is_ok())
}

/// Validate an attack declaration by the active player.
pub fn validate_attackers(
    state: &GameState,
    view: &ProjectedView,
    attackers: &[(EntityId, AttackTarget)],
) -> Result<(), IllegalAction> {
    let active = state.turn.active_player;
    for (i, &(creature, target)) in attackers.iter().enumerate() {
        if attackers[..i].iter().any(|(e, _)| *e == creature) {
            return Err(IllegalAction::IllegalAttack {
                creature,
                reason: "declared twice",
            });
        }
        let ch = view.get(creature).ok_or(IllegalAction::ObjectNotFound(creature))?;
        can_attack(state, creature, ch).map_err(|reason| IllegalAction::IllegalAttack { creature, reason })?;

        let target_ok = match target {
            AttackTarget::Player(player) => {
                player != active
                    && player.index() < state.players.player_count()
                    && state.players[player].is_active()
            }
            AttackTarget::Planeswalker(walker) => view
                .get(walker)
                .is_some_and(|w| w.on_battlefield() && w.is_planeswalker() && w.controller != active),
        };
        if !target_ok {
            return Err(IllegalAction::IllegalAttack {
                creature,
                reason: "illegal attack target",
            });
        }
    }
    Ok(())
}

/// Could `blocker` block `attacker`? Returns the restriction that forbids it.
pub fn can_block(blocker: &Characteristics, attacker: &Characteristics) -> Result<(), &'static str> {
    if !blocker.on_battlefield() || !blocker.is_creature() {
        return Err("not a creature on the battlefield");
    }
    if blocker.tapped {
        return Err("tapped");
    }
    if blocker.has_keyword(&Keyword::CantBlock) {
        return Err("can't block");
    }
    if attacker.has_keyword(&Keyword::Unblockable) {
        return Err("attacker can't be blocked");
    }
    if attacker.has_keyword(&Keyword::Flying)
        && !blocker.has_keyword(&Keyword::Flying)
        && !blocker.has_keyword(&Keyword::Reach)
    {
        return Err("flying");
    }
    if attacker.has_keyword(&Keyword::Shadow) != blocker.has_keyword(&Keyword::Shadow) {
        return Err("shadow");
    }
    let artifact = blocker.has_type(CardType::Artifact);
    if attacker.has_keyword(&Keyword::Fear) && !artifact && !blocker.colors.contains(Color::Black) {
        return Err("fear");
    }
    if attacker.has_keyword(&Keyword::Intimidate) && !artifact && !blocker.colors.intersects(attacker.colors) {
        return Err("intimidate");
    }
    if attacker.protected_from(blocker.colors) {
        return Err("protection");
    }
    let blocker_power = blocker.power.unwrap_or(0);
    let too_weak = attacker
        .keywords
        .iter()
        .any(|k| matches!(k, Keyword::CantBeBlockedByPowerOrLess(n) if blocker_power <= *n));
    if too_weak {
        return Err("blocker's power is too low");
    }
    Ok(())
}

/// Does `defender` control an untapped creature that could block at all?
#[must_use]
pub fn has_potential_blockers(view: &ProjectedView, defender: PlayerId, attackers: &[EntityId]) -> bool {
    view.creatures_of(defender).any(|(_, blocker)| {
        attackers
            .iter()
            .filter_map(|a| view.get(*a))
            .any(|attacker| can_block(blocker, attacker).is_ok())
    })
}

/// Validate `defender`'s block declaration (blocker, attacker pairs).
pub fn validate_blockers(
    state: &GameState,
    view: &ProjectedView,
    defender: PlayerId,
    blocks: &[(EntityId, EntityId)],
) -> Result<(), IllegalAction> {
    let combat = state.combat.as_ref().ok_or(IllegalAction::NotAwaiting { what: "blockers" })?;
    let attacks_defender = |attacker: EntityId| {
        combat
            .attackers
            .get(&attacker)
            .and_then(|target| target.defending_player(state))
            == Some(defender)
    };

    for (i, &(blocker, attacker)) in blocks.iter().enumerate() {
        if blocks[..i].iter().any(|(b, _)| *b == blocker) {
            return Err(IllegalAction::IllegalBlock {
                blocker,
                reason: "a creature can block only one attacker",
            });
        }
        let blocker_ch = view.get(blocker).ok_or(IllegalAction::ObjectNotFound(blocker))?;
        if blocker_ch.controller != defender {
            return Err(IllegalAction::NotController {
                player: defender,
                object: blocker,
            });
        }
        if !attacks_defender(attacker) {
            return Err(IllegalAction::IllegalBlock {
                blocker,
                reason: "that creature is not attacking you",
            });
        }
        let attacker_ch = view.get(attacker).ok_or(IllegalAction::ObjectNotFound(attacker))?;
        can_block(blocker_ch, attacker_ch).map_err(|reason| IllegalAction::IllegalBlock { blocker, reason })?;
    }

    // Menace: zero or at least two blockers.
    for (&attacker, _) in combat.attackers.iter().filter(|(a, _)| attacks_defender(**a)) {
        let count = blocks.iter().filter(|(_, a)| *a == attacker).count();
        if count == 1 && view.has_keyword(attacker, &Keyword::Menace) {
            return Err(IllegalAction::BlockRequirement("a creature with menace needs two or more blockers"));
        }
    }

    // Lure: every creature able to block a lure attacker blocks one.
    let lures: Vec<EntityId> = combat
        .attackers
        .keys()
        .copied()
        .filter(|&a| attacks_defender(a) && view.has_keyword(a, &Keyword::Lure))
        .collect();
    if !lures.is_empty() {
        for (candidate, candidate_ch) in view.creatures_of(defender) {
            let able = lures
                .iter()
                .filter_map(|a| view.get(*a))
                .any(|lure| can_block(candidate_ch, lure).is_ok());
            let blocks_lure = blocks.iter().any(|(b, a)| *b == candidate && lures.contains(a));
            if able && !blocks_lure {
                return Err(IllegalAction::BlockRequirement(
                    "every creature able to block an attacker with lure must do so",
                ));
            }
        }
    }
    Ok(())
}
