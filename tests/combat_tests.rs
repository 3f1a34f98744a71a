//! Combat through the public driver: declarations, blocks, damage.

mod common;

use common::{all_pass, battlefield, game, priority_in, run_until, P0, P1};
use rust_tcg::{
    AttackTarget, CardDefinition, Command, DecisionKind, DecisionResponse, Game, IllegalAction, Keyword, Progress,
    RulesError, Step, ZoneId,
};

fn to_declare_attackers(game: &mut Game) {
    game.start().unwrap();
    run_until(game, |g| matches!(g.progress(), Progress::AwaitingAttackers(_)));
}

fn to_declare_blockers(game: &mut Game) {
    run_until(game, |g| matches!(g.progress(), Progress::AwaitingBlockers(_)));
}

#[test]
fn test_blocked_attacker_dies_to_bigger_blocker() {
    let mut game = game(2);
    let bear = battlefield(&mut game, P0, CardDefinition::creature("Grizzly Bears", "1G", 2, 2));
    let giant = battlefield(&mut game, P1, CardDefinition::creature("Hill Giant", "3R", 3, 3));
    to_declare_attackers(&mut game);

    game.apply(P0, Command::DeclareAttackers(vec![(bear, AttackTarget::Player(P1))]))
        .unwrap();
    assert!(game.state().components.is_tapped(bear));
    to_declare_blockers(&mut game);
    assert_eq!(game.progress(), Progress::AwaitingBlockers(P1));
    game.apply(P1, Command::DeclareBlockers(vec![(giant, bear)])).unwrap();

    priority_in(&mut game, Step::CombatDamage);
    assert_eq!(game.state().zones.get_zone(bear), Some(ZoneId::graveyard(P0)));
    assert_eq!(game.state().zones.get_zone(giant), Some(ZoneId::battlefield()));
    assert_eq!(game.state().components.damage(giant), 2);
    assert_eq!(game.state().players[P1].life, 20);
}

#[test]
fn test_unblocked_attacker_damages_player() {
    let mut game = game(2);
    let bear = battlefield(&mut game, P0, CardDefinition::creature("Grizzly Bears", "1G", 2, 2));
    to_declare_attackers(&mut game);

    game.apply(P0, Command::DeclareAttackers(vec![(bear, AttackTarget::Player(P1))]))
        .unwrap();
    priority_in(&mut game, Step::CombatDamage);
    assert_eq!(game.state().players[P1].life, 18);
}

#[test]
fn test_vigilance_attacker_stays_untapped() {
    let mut game = game(2);
    let knight = battlefield(
        &mut game,
        P0,
        CardDefinition::creature("Vigilant Knight", "1W", 2, 2).with_keyword(Keyword::Vigilance),
    );
    to_declare_attackers(&mut game);
    game.apply(P0, Command::DeclareAttackers(vec![(knight, AttackTarget::Player(P1))]))
        .unwrap();
    assert!(!game.state().components.is_tapped(knight));
}

#[test]
fn test_illegal_attack_changes_nothing() {
    let mut game = game(2);
    let wall = battlefield(
        &mut game,
        P0,
        CardDefinition::creature("Wall of Stone", "1RR", 0, 8).with_keyword(Keyword::Defender),
    );
    let bear = battlefield(&mut game, P0, CardDefinition::creature("Grizzly Bears", "1G", 2, 2));
    to_declare_attackers(&mut game);
    let before = game.state().clone();

    let err = game
        .apply(
            P0,
            Command::DeclareAttackers(vec![
                (bear, AttackTarget::Player(P1)),
                (wall, AttackTarget::Player(P1)),
            ]),
        )
        .unwrap_err();
    assert!(matches!(err, RulesError::IllegalAction(IllegalAction::IllegalAttack { .. })));
    assert_eq!(game.state(), &before);

    let err = game
        .apply(P0, Command::DeclareAttackers(vec![(bear, AttackTarget::Player(P0))]))
        .unwrap_err();
    assert!(matches!(err, RulesError::IllegalAction(IllegalAction::IllegalAttack { .. })));
}

/// Every creature able to block a lure attacker must block it.
#[test]
fn test_lure_forces_blocks() {
    let mut game = game(2);
    let lure = battlefield(
        &mut game,
        P0,
        CardDefinition::creature("Irresistible Prey", "G", 1, 1).with_keyword(Keyword::Lure),
    );
    let first = battlefield(&mut game, P1, CardDefinition::creature("Llanowar Elves", "G", 1, 1));
    let second = battlefield(&mut game, P1, CardDefinition::creature("Fyndhorn Elves", "G", 1, 1));
    to_declare_attackers(&mut game);
    game.apply(P0, Command::DeclareAttackers(vec![(lure, AttackTarget::Player(P1))]))
        .unwrap();
    to_declare_blockers(&mut game);

    let err = game.apply(P1, Command::DeclareBlockers(Vec::new())).unwrap_err();
    assert!(matches!(err, RulesError::IllegalAction(IllegalAction::BlockRequirement(_))));
    let err = game.apply(P1, Command::DeclareBlockers(vec![(first, lure)])).unwrap_err();
    assert!(matches!(err, RulesError::IllegalAction(IllegalAction::BlockRequirement(_))));

    game.apply(P1, Command::DeclareBlockers(vec![(first, lure), (second, lure)]))
        .unwrap();
    assert!(matches!(game.progress(), Progress::Decision { player, .. } if player == P0));
}

/// Two blockers: the attacking player orders them, then divides damage.
#[test]
fn test_double_block_order_and_assignment() {
    let mut game = game(2);
    let giant = battlefield(&mut game, P0, CardDefinition::creature("Craw Wurm", "4GG", 4, 4));
    let first = battlefield(&mut game, P1, CardDefinition::creature("Grizzly Bears", "1G", 2, 2));
    let second = battlefield(&mut game, P1, CardDefinition::creature("Balduvian Bears", "1G", 2, 2));
    to_declare_attackers(&mut game);
    game.apply(P0, Command::DeclareAttackers(vec![(giant, AttackTarget::Player(P1))]))
        .unwrap();
    to_declare_blockers(&mut game);
    game.apply(P1, Command::DeclareBlockers(vec![(first, giant), (second, giant)]))
        .unwrap();

    let Progress::Decision { id, player } = game.progress() else {
        panic!("expected blocker ordering");
    };
    assert_eq!(player, P0);
    let DecisionKind::Order { items } = game.pending_decision().unwrap().kind.clone() else {
        panic!("expected an order decision");
    };
    assert_eq!(items.len(), 2);
    game.submit_response(P0, id, DecisionResponse::Order(vec![1, 0])).unwrap();
    let combat = game.state().combat.as_ref().unwrap();
    let order: Vec<_> = combat.damage_order.get(&giant).unwrap().iter().copied().collect();
    assert_eq!(order, vec![items[1], items[0]]);

    all_pass(&mut game);
    let Progress::Decision { id, .. } = game.progress() else {
        panic!("expected damage assignment");
    };
    assert!(matches!(
        game.pending_decision().unwrap().kind,
        DecisionKind::AssignCombatDamage { power: 4, .. }
    ));
    let err = game
        .submit_response(
            P0,
            id,
            DecisionResponse::DamageAssignment {
                to_blockers: vec![1, 3],
                to_defender: 0,
            },
        )
        .unwrap_err();
    assert!(matches!(err, RulesError::InvalidResponse(_)));

    game.submit_response(
        P0,
        id,
        DecisionResponse::DamageAssignment {
            to_blockers: vec![2, 2],
            to_defender: 0,
        },
    )
    .unwrap();
    assert_eq!(game.state().zones.get_zone(first), Some(ZoneId::graveyard(P1)));
    assert_eq!(game.state().zones.get_zone(second), Some(ZoneId::graveyard(P1)));
    assert_eq!(game.state().zones.get_zone(giant), Some(ZoneId::graveyard(P0)));
}
