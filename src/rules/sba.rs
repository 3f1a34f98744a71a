//! State-based actions.
//!
//! Checked whenever a player would receive priority. One pass collects every
//! applicable action from the same snapshot, then performs them all; passes
//! repeat until one changes nothing. No state-based action asks a player
//! anything: replacement effects on the resulting events are chosen
//! automatically.

use std::collections::BTreeMap;

use im::OrdSet;
use tracing::debug;

use crate::cards::{AbilityDef, CardType, Keyword, StaticAbility, Subtype};
use crate::core::{CounterType, EntityId, GameResult, GameState, PlayerId, RulesResult};
use crate::effects::{actions, FilterContext};
use crate::layers::{object_abilities, project, ProjectedView};
use crate::triggers::LossReason;
use crate::zones::ZoneKind;

/// Everything one pass found.
#[derive(Debug, Default)]
struct Findings {
    losers: Vec<(PlayerId, LossReason)>,
    to_graveyard: OrdSet<EntityId>,
    sacrifice: OrdSet<EntityId>,
    unattach: OrdSet<EntityId>,
    annihilate: Vec<(EntityId, u32)>,
    vanished_tokens: Vec<EntityId>,
}

impl Findings {
    fn is_empty(&self) -> bool {
        self.losers.is_empty()
            && self.to_graveyard.is_empty()
            && self.sacrifice.is_empty()
            && self.unattach.is_empty()
            && self.annihilate.is_empty()
            && self.vanished_tokens.is_empty()
    }
}

pub struct StateBasedActionChecker;

impl StateBasedActionChecker {
    /// Run one pass. Returns `true` if any action was performed.
    pub fn check(state: &mut GameState) -> RulesResult<bool> {
        let view = project(state);
        let mut found = Findings::default();

        Self::check_players(state, &mut found);
        Self::check_creatures(state, &view, &mut found);
        Self::check_planeswalkers(state, &view, &mut found);
        Self::check_legend_rule(state, &view, &mut found);
        Self::check_attachments(state, &view, &mut found);
        Self::check_counters(state, &view, &mut found);
        Self::check_tokens(state, &mut found);

        if found.is_empty() {
            return Ok(false);
        }
        debug!(
            target: "engine.sba",
            losers = found.losers.len(),
            destroyed = found.to_graveyard.len(),
            sacrificed = found.sacrifice.len(),
            unattached = found.unattach.len(),
            "state-based actions"
        );

        for (player, reason) in found.losers {
            actions::lose_game(state, player, reason);
        }
        for entity in found.unattach {
            actions::unattach(state, entity);
        }
        for (entity, amount) in found.annihilate {
            actions::remove_counters(state, entity, CounterType::PlusOnePlusOne, amount);
            actions::remove_counters(state, entity, CounterType::MinusOneMinusOne, amount);
        }
        for entity in &found.to_graveyard {
            actions::put_into_graveyard(state, *entity)?;
        }
        for entity in found.sacrifice.iter().filter(|e| !found.to_graveyard.contains(e)) {
            actions::sacrifice(state, *entity)?;
        }
        for token in found.vanished_tokens {
            state.zones.remove(token)?;
            state.objects.remove(&token);
            state.components.remove_entity(token);
        }
        Ok(true)
    }

    /// Repeat passes until nothing changes. Returns `true` if anything did.
    pub fn apply_until_stable(state: &mut GameState) -> RulesResult<bool> {
        let mut changed = false;
        while Self::check(state)? {
            changed = true;
        }
        Self::check_game_over(state);
        Ok(changed)
    }

    /// Record the result once at most one player remains.
    pub fn check_game_over(state: &mut GameState) -> Option<GameResult> {
        if state.result.is_none() {
            let remaining = state.active_players();
            state.result = match remaining.as_slice() {
                [] => Some(GameResult::Draw),
                [winner] => Some(GameResult::Winner(*winner)),
                _ => None,
            };
            if let Some(result) = state.result {
                debug!(target: "engine.sba", result = ?result, "game over");
            }
        }
        state.result
    }

    fn check_players(state: &GameState, found: &mut Findings) {
        for player in state.active_players() {
            let p = &state.players[player];
            let reason = if p.life <= 0 {
                Some(LossReason::ZeroLife)
            } else if p.poison >= state.config.poison_threshold {
                Some(LossReason::Poison)
            } else if p.drew_from_empty_library {
                Some(LossReason::EmptyLibrary)
            } else {
                None
            };
            if let Some(reason) = reason {
                found.losers.push((player, reason));
            }
        }
    }

    fn check_creatures(state: &GameState, view: &ProjectedView, found: &mut Findings) {
        for (entity, ch) in view.battlefield().filter(|(_, ch)| ch.is_creature()) {
            let toughness = ch.toughness.unwrap_or(0);
            if toughness <= 0 {
                found.to_graveyard.insert(entity);
                continue;
            }
            if ch.has_keyword(&Keyword::Indestructible) {
                continue;
            }
            let damage = i64::from(state.components.damage(entity));
            if damage >= i64::from(toughness) || state.components.has_deathtouch_damage(entity) {
                found.to_graveyard.insert(entity);
            }
        }
    }

    fn check_planeswalkers(state: &GameState, view: &ProjectedView, found: &mut Findings) {
        for (entity, _) in view.battlefield().filter(|(_, ch)| ch.is_planeswalker()) {
            if state.components.counter(entity, &CounterType::Loyalty) == 0 {
                found.to_graveyard.insert(entity);
            }
        }
    }

    /// Among legendary permanents with the same name and controller, only
    /// the newest stays.
    fn check_legend_rule(state: &GameState, view: &ProjectedView, found: &mut Findings) {
        let mut groups: BTreeMap<(PlayerId, &str), Vec<EntityId>> = BTreeMap::new();
        for (entity, ch) in view.battlefield() {
            if ch.is_legendary() && !ch.name.is_empty() {
                groups.entry((ch.controller, ch.name.as_str())).or_default().push(entity);
            }
        }
        for (_, mut group) in groups.into_iter().filter(|(_, g)| g.len() > 1) {
            group.sort_by_key(|e| state.components.zone_timestamp(*e));
            group.pop();
            found.to_graveyard.extend(group);
        }
    }

    fn check_attachments(state: &GameState, view: &ProjectedView, found: &mut Findings) {
        let aura = Subtype::aura();
        let equipment = Subtype::equipment();

        for (entity, ch) in view.battlefield() {
            if !ch.has_subtype(&aura) || !ch.has_type(CardType::Enchantment) {
                continue;
            }
            let host = state
                .components
                .attached_to(entity)
                .and_then(|h| view.get(h).map(|host_ch| (h, host_ch)))
                .filter(|(_, host_ch)| host_ch.on_battlefield());
            let legal = host.is_some_and(|(h, host_ch)| {
                let enchant_ok = match state.object(entity).and_then(|o| o.definition.enchant.as_ref()) {
                    Some(filter) => {
                        let filter = filter.clone().in_zone(Some(ZoneKind::Battlefield));
                        filter.matches(h, host_ch, &FilterContext::new(ch.controller, Some(entity)))
                    }
                    None => true,
                };
                enchant_ok && !host_ch.protected_from(ch.colors) && h != entity
            });
            if !legal {
                found.to_graveyard.insert(entity);
            }
        }

        for (attachment, host) in state.components.attachments() {
            let Some(ch) = view.get(attachment) else {
                found.unattach.insert(attachment);
                continue;
            };
            if ch.has_subtype(&aura) && ch.has_type(CardType::Enchantment) {
                continue;
            }
            let host_ok = view.get(host).is_some_and(|host_ch| {
                host_ch.on_battlefield()
                    && host != attachment
                    && (!ch.has_subtype(&equipment) || host_ch.is_creature())
                    && !host_ch.protected_from(ch.colors)
            });
            if !ch.on_battlefield() || !host_ok || ch.is_creature() {
                found.unattach.insert(attachment);
            }
        }
    }

    fn check_counters(state: &GameState, view: &ProjectedView, found: &mut Findings) {
        for (entity, ch) in view.battlefield() {
            let plus = state.components.counter(entity, &CounterType::PlusOnePlusOne);
            let minus = state.components.counter(entity, &CounterType::MinusOneMinusOne);
            if plus > 0 && minus > 0 {
                found.annihilate.push((entity, plus.min(minus)));
            }

            for ability in object_abilities(state, entity, ch) {
                if let AbilityDef::Static(StaticAbility::SacrificeAtCounters { counter, threshold }) = ability {
                    if state.components.counter(entity, &counter) >= threshold {
                        found.sacrifice.insert(entity);
                    }
                }
            }
        }
    }

    fn check_tokens(state: &GameState, found: &mut Findings) {
        for (entity, object) in &state.objects {
            if !object.is_token {
                continue;
            }
            let off_battlefield = state
                .zones
                .get_zone(*entity)
                .is_some_and(|zone| zone.kind != ZoneKind::Battlefield && zone.kind != ZoneKind::Stack);
            if off_battlefield {
                found.vanished_tokens.push(*entity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CardDefinition, ManaType, Supertype};
    use crate::core::GameConfig;
    use crate::zones::ZoneId;
    use std::sync::Arc;

    fn state() -> GameState {
        GameState::new(GameConfig::new(2))
    }

    fn put(state: &mut GameState, owner: u8, def: CardDefinition) -> EntityId {
        state
            .create_object(PlayerId::new(owner), Arc::new(def), ZoneId::battlefield(), false)
            .unwrap()
    }

    #[test]
    fn test_lethal_damage_destroys() {
        let mut state = state();
        let bear = put(&mut state, 0, CardDefinition::creature("Bear", "1G", 2, 2));
        state.components.add_damage(bear, 2, false);
        assert!(StateBasedActionChecker::apply_until_stable(&mut state).unwrap());
        assert_eq!(state.zones.get_zone(bear), Some(ZoneId::graveyard(PlayerId::new(0))));
    }

    #[test]
    fn test_indestructible_survives_damage_not_zero_toughness() {
        let mut state = state();
        let wall = put(
            &mut state,
            0,
            CardDefinition::creature("Wall", "2", 0, 2).with_keyword(Keyword::Indestructible),
        );
        state.components.add_damage(wall, 5, true);
        assert!(!StateBasedActionChecker::apply_until_stable(&mut state).unwrap());

        let weak = put(
            &mut state,
            0,
            CardDefinition::creature("Shade", "B", 0, 0).with_keyword(Keyword::Indestructible),
        );
        StateBasedActionChecker::apply_until_stable(&mut state).unwrap();
        assert_eq!(state.zones.get_zone(weak), Some(ZoneId::graveyard(PlayerId::new(0))));
        assert_eq!(state.zones.get_zone(wall), Some(ZoneId::battlefield()));
    }

    #[test]
    fn test_deathtouch_damage_is_lethal() {
        let mut state = state();
        let giant = put(&mut state, 1, CardDefinition::creature("Giant", "4G", 6, 6));
        state.components.add_damage(giant, 1, true);
        StateBasedActionChecker::apply_until_stable(&mut state).unwrap();
        assert_eq!(state.zones.get_zone(giant), Some(ZoneId::graveyard(PlayerId::new(1))));
    }

    #[test]
    fn test_legend_rule_keeps_newest() {
        let mut state = state();
        let legend = CardDefinition::creature("Kiki", "2RRR", 2, 2).with_supertypes(&[Supertype::Legendary]);
        let older = put(&mut state, 0, legend.clone());
        let newer = put(&mut state, 0, legend);
        StateBasedActionChecker::apply_until_stable(&mut state).unwrap();
        assert_eq!(state.zones.get_zone(older), Some(ZoneId::graveyard(PlayerId::new(0))));
        assert_eq!(state.zones.get_zone(newer), Some(ZoneId::battlefield()));
    }

    #[test]
    fn test_player_at_zero_life_loses_and_game_ends() {
        let mut state = state();
        state.players[PlayerId::new(1)].life = 0;
        StateBasedActionChecker::apply_until_stable(&mut state).unwrap();
        assert!(state.players[PlayerId::new(1)].has_lost);
        assert_eq!(state.result, Some(GameResult::Winner(PlayerId::new(0))));
    }

    #[test]
    fn test_simultaneous_loss_is_a_draw() {
        let mut state = state();
        state.players[PlayerId::new(0)].life = 0;
        state.players[PlayerId::new(1)].poison = 10;
        StateBasedActionChecker::apply_until_stable(&mut state).unwrap();
        assert_eq!(state.result, Some(GameResult::Draw));
    }

    #[test]
    fn test_counters_annihilate() {
        let mut state = state();
        let bear = put(&mut state, 0, CardDefinition::creature("Bear", "1G", 2, 2));
        state.components.add_counters(bear, CounterType::PlusOnePlusOne, 2);
        state.components.add_counters(bear, CounterType::MinusOneMinusOne, 1);
        StateBasedActionChecker::apply_until_stable(&mut state).unwrap();
        assert_eq!(state.components.counter(bear, &CounterType::PlusOnePlusOne), 1);
        assert_eq!(state.components.counter(bear, &CounterType::MinusOneMinusOne), 0);
    }

    #[test]
    fn test_sacrifice_at_counter_threshold() {
        let mut state = state();
        let land = put(
            &mut state,
            0,
            CardDefinition::basic_land("Depleted Mine", ManaType::Red).with_ability(AbilityDef::Static(
                StaticAbility::SacrificeAtCounters {
                    counter: CounterType::Depletion,
                    threshold: 4,
                },
            )),
        );
        state.components.add_counters(land, CounterType::Depletion, 3);
        assert!(!StateBasedActionChecker::apply_until_stable(&mut state).unwrap());
        state.components.add_counters(land, CounterType::Depletion, 1);
        assert!(StateBasedActionChecker::apply_until_stable(&mut state).unwrap());
        assert_eq!(state.zones.get_zone(land), Some(ZoneId::graveyard(PlayerId::new(0))));
    }

    #[test]
    fn test_aura_without_host_goes_to_graveyard() {
        let mut state = state();
        let aura = put(
            &mut state,
            0,
            CardDefinition::new("Pacifism")
                .with_cost("1W")
                .with_types(&[CardType::Enchantment])
                .with_subtypes(&["Aura"]),
        );
        StateBasedActionChecker::apply_until_stable(&mut state).unwrap();
        assert_eq!(state.zones.get_zone(aura), Some(ZoneId::graveyard(PlayerId::new(0))));
    }

    #[test]
    fn test_token_ceases_to_exist() {
        let mut state = state();
        let token = actions::create_token(
            &mut state,
            PlayerId::new(0),
            Arc::new(CardDefinition::creature("Soldier", "", 1, 1)),
        )
        .unwrap();
        state.components.add_damage(token, 1, false);
        StateBasedActionChecker::apply_until_stable(&mut state).unwrap();
        assert!(state.object(token).is_none());
        assert!(!state.zones.contains(token));
    }

    #[test]
    fn test_stable_state_is_idempotent() {
        let mut state = state();
        let bear = put(&mut state, 0, CardDefinition::creature("Bear", "1G", 2, 2));
        state.components.add_damage(bear, 1, false);
        StateBasedActionChecker::apply_until_stable(&mut state).unwrap();
        let before = state.clone();
        assert!(!StateBasedActionChecker::apply_until_stable(&mut state).unwrap());
        assert_eq!(before, state);
    }
}
