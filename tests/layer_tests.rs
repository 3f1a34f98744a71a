//! Characteristic projection through the layer system.

use std::sync::Arc;

use proptest::prelude::*;
use rust_tcg::core::{CounterType, GameConfig, GameState, PlayerId};
use rust_tcg::layers::{project, Affected, ContinuousEffect, Duration, Modification};
use rust_tcg::{CardDefinition, EntityId, ZoneId};

fn state_with_creature(power: i32, toughness: i32) -> (GameState, EntityId) {
    let mut state = GameState::new(GameConfig::new(2));
    let creature = state
        .create_object(
            PlayerId::new(0),
            Arc::new(CardDefinition::creature("Test Creature", "1G", power, toughness)),
            ZoneId::battlefield(),
            false,
        )
        .unwrap();
    (state, creature)
}

fn apply(state: &mut GameState, target: EntityId, modification: Modification) {
    let timestamp = state.next_timestamp();
    state.effects.add(
        ContinuousEffect::new(PlayerId::new(0), Affected::Objects(vec![target]), vec![modification])
            .with_timestamp(timestamp)
            .with_duration(Duration::Indefinite),
    );
}

#[test]
fn test_setting_applies_before_modifying_regardless_of_timestamp() {
    let (mut state, bear) = state_with_creature(2, 2);
    apply(&mut state, bear, Modification::ModifyPowerToughness { power: 3, toughness: 3 });
    apply(&mut state, bear, Modification::SetPowerToughness { power: 0, toughness: 0 });

    let view = project(&state);
    assert_eq!(view.power(bear), Some(3));
    assert_eq!(view.toughness(bear), Some(3));
}

#[test]
fn test_counters_apply_after_setting() {
    let (mut state, bear) = state_with_creature(2, 2);
    state.components.add_counters(bear, CounterType::PlusOnePlusOne, 1);
    apply(&mut state, bear, Modification::SetPowerToughness { power: 0, toughness: 0 });

    let view = project(&state);
    assert_eq!(view.power(bear), Some(1));
    assert_eq!(view.toughness(bear), Some(1));
}

#[test]
fn test_switching_applies_last() {
    let (mut state, creature) = state_with_creature(1, 4);
    apply(&mut state, creature, Modification::SwitchPowerToughness);
    apply(&mut state, creature, Modification::ModifyPowerToughness { power: 2, toughness: 0 });

    let view = project(&state);
    assert_eq!(view.power(creature), Some(4));
    assert_eq!(view.toughness(creature), Some(3));
}

#[test]
fn test_control_change_is_visible_in_projection() {
    let (mut state, bear) = state_with_creature(2, 2);
    apply(&mut state, bear, Modification::SetController(PlayerId::new(1)));

    let view = project(&state);
    assert_eq!(view.controller(bear), Some(PlayerId::new(1)));
    assert_eq!(state.components.controller(bear), Some(PlayerId::new(0)));
}

#[test]
fn test_removed_effect_stops_applying() {
    let (mut state, bear) = state_with_creature(2, 2);
    let timestamp = state.next_timestamp();
    let id = state.effects.add(
        ContinuousEffect::new(
            PlayerId::new(0),
            Affected::Objects(vec![bear]),
            vec![Modification::ModifyPowerToughness { power: 2, toughness: 2 }],
        )
        .with_timestamp(timestamp),
    );
    assert_eq!(project(&state).power(bear), Some(4));

    state.effects.remove(id);
    assert_eq!(project(&state).power(bear), Some(2));
}

proptest! {
    #[test]
    fn prop_modifications_sum(mods in prop::collection::vec((-5i32..=5, -5i32..=5), 0..8)) {
        let (mut state, creature) = state_with_creature(3, 3);
        for &(power, toughness) in &mods {
            apply(&mut state, creature, Modification::ModifyPowerToughness { power, toughness });
        }
        let view = project(&state);
        let power: i32 = 3 + mods.iter().map(|(p, _)| p).sum::<i32>();
        let toughness: i32 = 3 + mods.iter().map(|(_, t)| t).sum::<i32>();
        prop_assert_eq!(view.power(creature), Some(power));
        prop_assert_eq!(view.toughness(creature), Some(toughness));
    }

    #[test]
    fn prop_projection_is_pure(mods in prop::collection::vec((-3i32..=3, any::<bool>()), 0..8)) {
        let (mut state, creature) = state_with_creature(2, 2);
        for &(n, set) in &mods {
            let modification = if set {
                Modification::SetPowerToughness { power: n, toughness: n }
            } else {
                Modification::ModifyPowerToughness { power: n, toughness: n }
            };
            apply(&mut state, creature, modification);
        }
        let before = state.clone();
        let first = project(&state);
        let second = project(&state);
        prop_assert_eq!(first, second);
        prop_assert_eq!(state, before);
    }
}
