//! Primitive state mutations.
//!
//! Every change to a `GameState` made during play goes through one of these
//! functions, and each one records what it did as a [`GameEvent`]. Damage
//! and zone changes are performed here only after replacement effects had
//! their chance (see [`replacement`](super::replacement)); callers that want
//! replacement processing propose the event instead of calling
//! [`move_object`] or [`deal_damage`] directly.

use std::sync::Arc;

use tracing::{debug, trace};

use super::replacement::{self, DamageEvent, DamageSource, ProposedEvent, ZoneChange};
use super::targeting::Target;
use crate::cards::{CardDefinition, CardObject, Keyword, ManaType};
use crate::core::{CounterType, EntityId, GameState, PlayerId, RulesError, RulesResult};
use crate::layers::{project, ProjectedView};
use crate::triggers::{GameEvent, LastKnown, LossReason, TriggerEngine};
use crate::zones::{ZoneId, ZoneKind, ZonePosition};

/// Record an event.
pub fn emit(state: &mut GameState, event: GameEvent) {
    trace!(target: "engine.resolve", event = ?event, "event");
    state.events.push_back(event);
    TriggerEngine::observe(state);
}

/// The damage source as it currently is, falling back to the owner for
/// objects that are not projected.
#[must_use]
pub fn damage_source(state: &GameState, view: &ProjectedView, entity: EntityId) -> DamageSource {
    match view.get(entity) {
        Some(ch) => DamageSource {
            entity,
            controller: ch.controller,
            colors: ch.colors,
            deathtouch: ch.has_keyword(&Keyword::Deathtouch),
            lifelink: ch.has_keyword(&Keyword::Lifelink),
        },
        None => DamageSource {
            entity,
            controller: state.controller_of(entity).unwrap_or(state.turn.active_player),
            colors: crate::cards::ColorSet::COLORLESS,
            deathtouch: false,
            lifelink: false,
        },
    }
}

// === Zone changes ===

/// Move an object to another zone, applying the new-object rule.
///
/// Leaving the battlefield drops every battlefield component, ends effects
/// that last while the object stays there and removes it from combat.
/// Entering the battlefield sets control, status and starting counters.
pub fn move_object(state: &mut GameState, change: &ZoneChange) -> RulesResult<()> {
    let entity = change.object;
    let (owner, loyalty) = {
        let object = state
            .objects
            .get(&entity)
            .ok_or_else(|| RulesError::inconsistent(format!("{entity} moved but has no object")))?;
        (object.owner, object.definition.loyalty)
    };
    let to = if change.to.kind.is_player_scoped() {
        ZoneId::of(change.to.kind, owner)
    } else {
        change.to
    };
    let from = state.zones.get_zone(entity);

    let mut last_known = None;
    let left_battlefield = from.is_some_and(|z| z.kind == ZoneKind::Battlefield);
    if left_battlefield {
        let view = project(state);
        last_known = LastKnown::capture(state, &view, entity);
        for attached in state.components.attachments_of(entity) {
            unattach(state, attached);
        }
        if let Some(host) = state.components.attached_to(entity) {
            emit(state, GameEvent::Unattached { object: entity, host });
        }
        state.components.clear_battlefield_status(entity);
        state.effects.expire_for_source(entity);
        state.replacements.expire_for_source(entity);
        state
            .components
            .retain_granted(|g| !(g.expiry == crate::layers::Duration::WhileSourceOnBattlefield && g.source == Some(entity)));
        if let Some(combat) = state.combat.as_mut() {
            combat.remove(entity);
        }
    }

    match from {
        Some(_) => {
            state.zones.move_to_zone(entity, to, change.position)?;
        }
        None => state.zones.add_to_zone(entity, to, change.position)?,
    }
    let timestamp = state.next_timestamp();
    state.components.set_zone_timestamp(entity, timestamp);
    if left_battlefield {
        let (zones, components) = (&state.zones, &state.components);
        state.effects.prune_orphaned(|e, created| {
            zones.get_zone(e) == Some(ZoneId::battlefield())
                && components.zone_timestamp(e).is_some_and(|entered| entered <= created)
        });
    }

    if to.kind == ZoneKind::Battlefield {
        let controller = change.controller.unwrap_or(owner);
        state.components.set_controller(entity, controller);
        state.components.set_controlled_since(entity, state.turn.turn_number);
        state.components.set_tapped(entity, change.tapped);
        state.components.set_face_down(entity, change.face_down);
        if let Some(loyalty) = loyalty.filter(|_| !change.face_down) {
            state.components.add_counters(entity, CounterType::Loyalty, loyalty);
        }
        for (counter, amount) in &change.counters {
            add_counters(state, entity, counter.clone(), *amount);
        }
        if let Some(host) = change.attach_to {
            attach(state, entity, host);
        }
    } else {
        state.components.set_face_down(entity, false);
    }

    debug!(target: "engine.resolve", object = %entity, from = ?from, to = %to, "zone change");
    emit(
        state,
        GameEvent::ZoneChanged {
            object: entity,
            from,
            to,
            last_known,
        },
    );
    Ok(())
}

/// Put an object into its owner's graveyard now, with replacements
/// chosen automatically.
pub fn put_into_graveyard(state: &mut GameState, entity: EntityId) -> RulesResult<()> {
    let owner = state
        .objects
        .get(&entity)
        .map(|o| o.owner)
        .ok_or_else(|| RulesError::inconsistent(format!("{entity} has no object")))?;
    replacement::apply_now(
        state,
        ProposedEvent::ZoneChange(ZoneChange::new(entity, ZoneId::graveyard(owner))),
    )
}

/// Sacrifice a permanent (as a cost or a state-based action).
pub fn sacrifice(state: &mut GameState, entity: EntityId) -> RulesResult<()> {
    put_into_graveyard(state, entity)
}

/// Create a token under `controller`'s control directly on the
/// battlefield.
pub fn create_token(state: &mut GameState, controller: PlayerId, definition: Arc<CardDefinition>) -> RulesResult<EntityId> {
    let entity = state.allocate_entity();
    state
        .objects
        .insert(entity, CardObject::token(entity, definition, controller));
    move_object(state, &ZoneChange::new(entity, ZoneId::battlefield()).under(controller))?;
    emit(state, GameEvent::TokenCreated { token: entity, controller });
    Ok(entity)
}

/// Remove a spell from the stack and put it into its owner's graveyard.
/// Returns `false` if it was no longer on the stack.
pub fn counter_spell(state: &mut GameState, stack_id: EntityId) -> bool {
    let Some(object) = state.stack.remove(stack_id) else {
        return false;
    };
    debug!(target: "engine.resolve", object = %stack_id, "countered");
    emit(state, GameEvent::SpellCountered { card: stack_id });
    if object.is_spell() {
        if let Some(owner) = state.objects.get(&stack_id).map(|o| o.owner) {
            replacement::enqueue(
                state,
                replacement::Proposal::new(ProposedEvent::ZoneChange(ZoneChange::new(
                    stack_id,
                    ZoneId::graveyard(owner),
                ))),
            );
        }
    }
    true
}

/// Discard a card: propose moving it from hand to graveyard.
pub fn discard(state: &mut GameState, card: EntityId) {
    if let Some(owner) = state.objects.get(&card).map(|o| o.owner) {
        replacement::enqueue(
            state,
            replacement::Proposal::new(ProposedEvent::ZoneChange(ZoneChange::new(card, ZoneId::graveyard(owner)))),
        );
    }
}

// === Damage and life ===

fn life_amount(amount: u32) -> i32 {
    i32::try_from(amount).unwrap_or(i32::MAX)
}

/// Deal damage after replacement effects were applied.
pub fn deal_damage(state: &mut GameState, damage: &DamageEvent) {
    if damage.amount == 0 {
        return;
    }
    match damage.target {
        Target::Player(player) => {
            if !state.players[player].is_active() {
                return;
            }
            state.players[player].life = state.players[player].life.saturating_sub(life_amount(damage.amount));
            emit(
                state,
                GameEvent::LifeLost {
                    player,
                    amount: damage.amount,
                },
            );
        }
        Target::Object(object) => {
            let view = project(state);
            let Some(ch) = view.get(object).filter(|ch| ch.on_battlefield()) else {
                return;
            };
            if ch.protected_from(damage.source.colors) {
                emit(
                    state,
                    GameEvent::DamagePrevented {
                        source: damage.source.entity,
                        target: damage.target,
                        amount: damage.amount,
                    },
                );
                return;
            }
            let (is_walker, is_creature) = (ch.is_planeswalker(), ch.is_creature());
            if is_walker {
                remove_counters(state, object, CounterType::Loyalty, damage.amount);
            }
            if is_creature {
                state
                    .components
                    .add_damage(object, damage.amount, damage.source.deathtouch);
            }
        }
    }
    trace!(target: "engine.resolve", source = %damage.source.entity, target = %damage.target, amount = damage.amount, "damage dealt");
    emit(
        state,
        GameEvent::DamageDealt {
            source: damage.source.entity,
            source_controller: damage.source.controller,
            target: damage.target,
            amount: damage.amount,
            combat: damage.combat,
        },
    );
    if damage.source.lifelink {
        gain_life(state, damage.source.controller, damage.amount);
    }
}

pub fn gain_life(state: &mut GameState, player: PlayerId, amount: u32) {
    if amount == 0 || !state.players[player].is_active() {
        return;
    }
    state.players[player].life = state.players[player].life.saturating_add(life_amount(amount));
    emit(state, GameEvent::LifeGained { player, amount });
}

pub fn lose_life(state: &mut GameState, player: PlayerId, amount: u32) {
    if amount == 0 || !state.players[player].is_active() {
        return;
    }
    state.players[player].life = state.players[player].life.saturating_sub(life_amount(amount));
    emit(state, GameEvent::LifeLost { player, amount });
}

pub fn give_poison(state: &mut GameState, player: PlayerId, amount: u32) {
    if amount == 0 {
        return;
    }
    state.players[player].poison += amount;
    emit(state, GameEvent::PoisonGiven { player, amount });
}

/// Remove a player from the game.
pub fn lose_game(state: &mut GameState, player: PlayerId, reason: LossReason) {
    if state.players[player].has_lost {
        return;
    }
    state.players[player].has_lost = true;
    debug!(target: "engine.sba", player = %player, reason = ?reason, "player lost");
    emit(state, GameEvent::PlayerLost { player, reason });
}

// === Cards ===

/// Draw one card. Drawing from an empty library only flags the player for
/// the state-based check.
pub fn draw(state: &mut GameState, player: PlayerId) -> RulesResult<Option<EntityId>> {
    let Some(card) = state.zones.top_card(ZoneId::library(player)) else {
        state.players[player].drew_from_empty_library = true;
        return Ok(None);
    };
    state.zones.move_to_zone(card, ZoneId::hand(player), ZonePosition::Top)?;
    let timestamp = state.next_timestamp();
    state.components.set_zone_timestamp(card, timestamp);
    emit(state, GameEvent::CardDrawn { player, card });
    Ok(Some(card))
}

pub fn draw_cards(state: &mut GameState, player: PlayerId, count: u32) -> RulesResult<()> {
    for _ in 0..count {
        draw(state, player)?;
    }
    Ok(())
}

pub fn shuffle(state: &mut GameState, player: PlayerId) {
    let library = ZoneId::library(player);
    state.zones.shuffle_zone(library, &mut state.rng);
    emit(state, GameEvent::LibraryShuffled { player });
}

// === Permanent status ===

pub fn tap(state: &mut GameState, entity: EntityId) {
    if state.components.set_tapped(entity, true) {
        emit(state, GameEvent::Tapped { object: entity });
    }
}

pub fn untap(state: &mut GameState, entity: EntityId) {
    if state.components.set_tapped(entity, false) {
        emit(state, GameEvent::Untapped { object: entity });
    }
}

pub fn add_counters(state: &mut GameState, entity: EntityId, counter: CounterType, amount: u32) {
    if amount == 0 {
        return;
    }
    state.components.add_counters(entity, counter.clone(), amount);
    emit(
        state,
        GameEvent::CountersAdded {
            object: entity,
            counter,
            amount,
        },
    );
}

/// Remove up to `amount` counters. Returns how many were removed.
pub fn remove_counters(state: &mut GameState, entity: EntityId, counter: CounterType, amount: u32) -> u32 {
    let removed = state.components.remove_counters(entity, &counter, amount);
    if removed > 0 {
        emit(
            state,
            GameEvent::CountersRemoved {
                object: entity,
                counter,
                amount: removed,
            },
        );
    }
    removed
}

/// Attach `object` to `host`, leaving any previous host.
pub fn attach(state: &mut GameState, object: EntityId, host: EntityId) {
    if state.components.attached_to(object) == Some(host) {
        return;
    }
    unattach(state, object);
    state.components.attach(object, host);
    emit(state, GameEvent::Attached { object, host });
}

pub fn unattach(state: &mut GameState, object: EntityId) {
    if let Some(host) = state.components.detach(object) {
        emit(state, GameEvent::Unattached { object, host });
    }
}

/// Turn a face-down permanent face up.
pub fn turn_face_up(state: &mut GameState, entity: EntityId) {
    if !state.components.is_face_down(entity) {
        return;
    }
    state.components.set_face_down(entity, false);
    debug!(target: "engine.resolve", object = %entity, "turned face up");
    emit(state, GameEvent::TurnedFaceUp { object: entity });
}

// === Mana ===

pub fn add_mana(state: &mut GameState, player: PlayerId, mana: ManaType, amount: u32) {
    if amount == 0 {
        return;
    }
    state.players[player].mana_pool.add(mana, amount);
    emit(state, GameEvent::ManaAdded { player, mana, amount });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Color, ColorSet};
    use crate::core::GameConfig;
    use crate::layers::{Affected, ContinuousEffect, Duration, Modification};

    fn state_with_bear() -> (GameState, EntityId) {
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

    fn damage(target: Target, amount: u32, colors: ColorSet, lifelink: bool) -> DamageEvent {
        DamageEvent {
            source: DamageSource {
                entity: EntityId(50),
                controller: PlayerId::new(1),
                colors,
                deathtouch: false,
                lifelink,
            },
            target,
            amount,
            combat: false,
        }
    }

    #[test]
    fn test_leaving_battlefield_clears_status() {
        let (mut state, bear) = state_with_bear();
        tap(&mut state, bear);
        add_counters(&mut state, bear, CounterType::PlusOnePlusOne, 2);
        state.components.add_damage(bear, 1, false);

        move_object(&mut state, &ZoneChange::new(bear, ZoneId::hand(PlayerId::new(0)))).unwrap();
        assert!(!state.components.is_tapped(bear));
        assert_eq!(state.components.damage(bear), 0);
        assert!(state.components.counters(bear).is_empty());
        assert_eq!(state.components.controller(bear), None);

        let last = state.events.back().unwrap();
        assert!(last.left_battlefield());
        let lki = last.last_known().unwrap();
        assert!(lki.characteristics.tapped);
        assert_eq!(lki.counters.get(&CounterType::PlusOnePlusOne), Some(&2));
    }

    #[test]
    fn test_effects_on_departed_object_are_dropped() {
        let (mut state, bear) = state_with_bear();
        let timestamp = state.next_timestamp();
        state.effects.add(
            ContinuousEffect::new(
                PlayerId::new(0),
                Affected::Objects(vec![bear]),
                vec![Modification::ModifyPowerToughness { power: 1, toughness: 1 }],
            )
            .with_duration(Duration::Indefinite)
            .with_timestamp(timestamp),
        );
        assert_eq!(state.effects.len(), 1);

        move_object(&mut state, &ZoneChange::new(bear, ZoneId::hand(PlayerId::new(0)))).unwrap();
        move_object(&mut state, &ZoneChange::new(bear, ZoneId::battlefield())).unwrap();
        assert!(state.effects.is_empty());
    }

    #[test]
    fn test_zone_change_goes_to_owner_zone() {
        let (mut state, bear) = state_with_bear();
        move_object(&mut state, &ZoneChange::new(bear, ZoneId::graveyard(PlayerId::new(1)))).unwrap();
        assert_eq!(state.zones.get_zone(bear), Some(ZoneId::graveyard(PlayerId::new(0))));
    }

    #[test]
    fn test_damage_to_player_and_lifelink() {
        let (mut state, _) = state_with_bear();
        deal_damage(&mut state, &damage(Target::Player(PlayerId::new(0)), 3, ColorSet::COLORLESS, true));
        assert_eq!(state.players[PlayerId::new(0)].life, 17);
        assert_eq!(state.players[PlayerId::new(1)].life, 23);
    }

    #[test]
    fn test_huge_amounts_saturate_life() {
        let (mut state, _) = state_with_bear();
        deal_damage(&mut state, &damage(Target::Player(PlayerId::new(0)), u32::MAX, ColorSet::COLORLESS, true));
        assert_eq!(state.players[PlayerId::new(0)].life, 20 - i32::MAX);
        assert_eq!(state.players[PlayerId::new(1)].life, i32::MAX);

        lose_life(&mut state, PlayerId::new(0), u32::MAX);
        assert_eq!(state.players[PlayerId::new(0)].life, i32::MIN);
        gain_life(&mut state, PlayerId::new(1), 5);
        assert_eq!(state.players[PlayerId::new(1)].life, i32::MAX);
    }

    #[test]
    fn test_protection_prevents_damage() {
        let mut state = GameState::new(GameConfig::new(2));
        let knight = state
            .create_object(
                PlayerId::new(0),
                Arc::new(CardDefinition::creature("Knight", "1W", 2, 2).with_keyword(Keyword::ProtectionFrom(Color::Red))),
                ZoneId::battlefield(),
                false,
            )
            .unwrap();
        deal_damage(&mut state, &damage(Target::Object(knight), 3, ColorSet::single(Color::Red), false));
        assert_eq!(state.components.damage(knight), 0);
        assert!(matches!(state.events.back(), Some(GameEvent::DamagePrevented { .. })));
    }

    #[test]
    fn test_draw_from_empty_library_flags_player() {
        let mut state = GameState::new(GameConfig::new(2));
        assert_eq!(draw(&mut state, PlayerId::new(1)).unwrap(), None);
        assert!(state.players[PlayerId::new(1)].drew_from_empty_library);
    }

    #[test]
    fn test_token_creation() {
        let mut state = GameState::new(GameConfig::new(2));
        let token = create_token(
            &mut state,
            PlayerId::new(1),
            Arc::new(CardDefinition::creature("Soldier", "", 1, 1)),
        )
        .unwrap();
        assert!(state.objects[&token].is_token);
        assert_eq!(state.components.controller(token), Some(PlayerId::new(1)));
        assert!(matches!(state.events.back(), Some(GameEvent::TokenCreated { .. })));
    }

    #[test]
    fn test_tap_emits_only_on_change() {
        let (mut state, bear) = state_with_bear();
        tap(&mut state, bear);
        tap(&mut state, bear);
        let taps = state
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::Tapped { .. }))
            .count();
        assert_eq!(taps, 1);
    }
}
