//! Triggered abilities: APNAP placement, ordering, targets, look-back.

mod common;

use common::{all_pass, battlefield, game, hand, priority_in, P0, P1};
use std::sync::Arc;

use rust_tcg::effects::{actions, Amount, ObjectFilter, PlayerRelation, PlayerSelector, Subject};
use rust_tcg::{
    AbilityDef, CardDefinition, Command, DecisionKind, DecisionResponse, Effect, ManaType, Progress, Selector, Step,
    Target, TargetSpec, TriggerCondition, TriggeredAbility, ZoneId,
};
use smallvec::smallvec;

/// "At the beginning of each upkeep, you gain 1 life."
fn upkeep_gainer(name: &str) -> CardDefinition {
    CardDefinition::new(name)
        .with_cost("2")
        .with_types(&[rust_tcg::CardType::Artifact])
        .with_ability(AbilityDef::Triggered(TriggeredAbility::new(
            TriggerCondition::StepBegins {
                step: Step::Upkeep,
                whose: PlayerRelation::Any,
            },
            vec![Effect::gain_life(1)],
        )))
}

#[test]
fn test_active_players_triggers_go_on_stack_first() {
    let mut game = game(2);
    battlefield(&mut game, P0, upkeep_gainer("Ivory Cup"));
    battlefield(&mut game, P1, upkeep_gainer("Jade Cup"));
    let outcome = game.start().unwrap();
    assert_eq!(outcome.progress, Progress::Priority(P0));

    let controllers: Vec<_> = game.state().stack.iter().map(|o| o.controller).collect();
    assert_eq!(controllers, vec![P0, P1]);

    all_pass(&mut game);
    assert_eq!(game.state().players[P1].life, 21);
    assert_eq!(game.state().players[P0].life, 20);
    all_pass(&mut game);
    assert_eq!(game.state().players[P0].life, 21);
}

#[test]
fn test_controller_orders_simultaneous_triggers() {
    let mut game = game(2);
    battlefield(&mut game, P0, upkeep_gainer("Ivory Cup"));
    battlefield(&mut game, P0, upkeep_gainer("Jade Cup"));
    game.start().unwrap();

    let Progress::Decision { id, player } = game.progress() else {
        panic!("expected trigger ordering");
    };
    assert_eq!(player, P0);
    let DecisionKind::Order { items } = game.pending_decision().unwrap().kind.clone() else {
        panic!("expected an order decision");
    };

    game.submit_response(P0, id, DecisionResponse::Order(vec![1, 0])).unwrap();
    let sources: Vec<_> = game.state().stack.iter().map(|o| o.source).collect();
    assert_eq!(sources, vec![items[1], items[0]]);
}

/// Dies triggers see the creature as it last existed on the battlefield.
#[test]
fn test_dies_trigger_fires_after_destruction() {
    let mut game = game(2);
    let martyr = battlefield(
        &mut game,
        P0,
        CardDefinition::creature("Doomed Martyr", "W", 1, 1).with_ability(AbilityDef::Triggered(
            TriggeredAbility::new(TriggerCondition::Dies(Subject::This), vec![Effect::gain_life(3)]),
        )),
    );
    let shock = hand(
        &mut game,
        P0,
        CardDefinition::instant("Shock", "R")
            .with_spell(vec![TargetSpec::any_target()], vec![Effect::deal_damage(2, Selector::Targets(0))]),
    );
    game.start().unwrap();
    actions::add_mana(game.state_mut(), P0, ManaType::Red, 1);
    game.apply(
        P0,
        Command::CastSpell {
            card: shock,
            targets: vec![smallvec![Target::Object(martyr)]],
            x: 0,
        },
    )
    .unwrap();
    all_pass(&mut game);

    assert_eq!(game.state().zones.get_zone(martyr), Some(ZoneId::graveyard(P0)));
    assert_eq!(game.state().stack.len(), 1);
    all_pass(&mut game);
    assert_eq!(game.state().players[P0].life, 23);
}

#[test]
fn test_targeted_trigger_asks_for_targets() {
    let mut game = game(2);
    let elemental = hand(
        &mut game,
        P0,
        CardDefinition::creature("Spark Elemental", "1R", 1, 1).with_ability(AbilityDef::Triggered(
            TriggeredAbility::new(
                TriggerCondition::EntersBattlefield(Subject::This),
                vec![Effect::deal_damage(1, Selector::Targets(0))],
            )
            .with_targets(vec![TargetSpec::any_target()]),
        )),
    );
    game.start().unwrap();
    priority_in(&mut game, Step::PrecombatMain);
    actions::add_mana(game.state_mut(), P0, ManaType::Red, 2);
    game.apply(
        P0,
        Command::CastSpell {
            card: elemental,
            targets: Vec::new(),
            x: 0,
        },
    )
    .unwrap();
    all_pass(&mut game);
    assert_eq!(game.state().zones.get_zone(elemental), Some(ZoneId::battlefield()));

    let Progress::Decision { id, player } = game.progress() else {
        panic!("expected a target choice");
    };
    assert_eq!(player, P0);
    assert!(matches!(
        game.pending_decision().unwrap().kind,
        DecisionKind::ChooseTargets { .. }
    ));
    game.submit_response(P0, id, DecisionResponse::Targets(vec![smallvec![Target::Player(P1)]]))
        .unwrap();
    assert_eq!(game.state().stack.len(), 1);
    all_pass(&mut game);
    assert_eq!(game.state().players[P1].life, 19);
}

/// A permanent that arrives later in the same resolution did not see the
/// damage dealt before it entered.
#[test]
fn test_permanent_entering_after_event_does_not_trigger() {
    let mut game = game(2);
    let bear = battlefield(&mut game, P1, CardDefinition::creature("Grizzly Bears", "1G", 2, 2));
    let watcher = CardDefinition::creature("Pain Watcher", "", 0, 4).with_ability(AbilityDef::Triggered(
        TriggeredAbility::new(
            TriggerCondition::IsDealtDamage(Subject::Matching(ObjectFilter::creature())),
            vec![Effect::gain_life(1)],
        ),
    ));
    let storm = hand(
        &mut game,
        P0,
        CardDefinition::instant("Sparkstorm", "R").with_spell(
            Vec::new(),
            vec![
                Effect::deal_damage(1, Selector::All(ObjectFilter::creature())),
                Effect::CreateTokens {
                    token: Arc::new(watcher),
                    count: Amount::Fixed(1),
                    controller: PlayerSelector::You,
                },
            ],
        ),
    );
    let shock = hand(
        &mut game,
        P0,
        CardDefinition::instant("Shock", "R")
            .with_spell(vec![TargetSpec::any_target()], vec![Effect::deal_damage(2, Selector::Targets(0))]),
    );
    game.start().unwrap();
    actions::add_mana(game.state_mut(), P0, ManaType::Red, 2);

    game.apply(
        P0,
        Command::CastSpell {
            card: storm,
            targets: Vec::new(),
            x: 0,
        },
    )
    .unwrap();
    all_pass(&mut game);
    assert_eq!(game.state().components.damage(bear), 1);
    assert!(game.state().stack.is_empty());
    assert!(game.state().pending_triggers.is_empty());
    assert_eq!(game.state().players[P0].life, 20);

    game.apply(
        P0,
        Command::CastSpell {
            card: shock,
            targets: vec![smallvec![Target::Object(bear)]],
            x: 0,
        },
    )
    .unwrap();
    all_pass(&mut game);
    assert_eq!(game.state().stack.len(), 1);
    all_pass(&mut game);
    assert_eq!(game.state().players[P0].life, 21);
}
