//! Shared scenario builders for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use rust_tcg::{
    CardDefinition, Command, EntityId, Game, GameConfig, ManaType, PlayerId, Progress, Step, StepStage, ZoneId,
};

pub const P0: PlayerId = PlayerId::new(0);
pub const P1: PlayerId = PlayerId::new(1);

/// A game with `players` seats and 20 Mountains in every library.
pub fn game(players: usize) -> Game {
    let mut game = Game::new(GameConfig::new(players)).unwrap();
    for seat in 0..players {
        let player = PlayerId::new(seat as u8);
        for _ in 0..20 {
            let mountain = Arc::new(CardDefinition::basic_land("Mountain", ManaType::Red));
            game.add_card(player, mountain, ZoneId::library(player)).unwrap();
        }
    }
    game
}

/// Put a card onto the battlefield before the game starts.
pub fn battlefield(game: &mut Game, owner: PlayerId, definition: CardDefinition) -> EntityId {
    game.add_card(owner, Arc::new(definition), ZoneId::battlefield()).unwrap()
}

pub fn hand(game: &mut Game, owner: PlayerId, definition: CardDefinition) -> EntityId {
    game.add_card(owner, Arc::new(definition), ZoneId::hand(owner)).unwrap()
}

/// Pass priority (and declare no attacks) until the game stops at
/// `predicate`. Panics on any decision.
pub fn run_until(game: &mut Game, predicate: impl Fn(&Game) -> bool) {
    for _ in 0..200 {
        if predicate(game) {
            return;
        }
        match game.progress() {
            Progress::Priority(player) => {
                game.apply(player, Command::PassPriority).unwrap();
            }
            Progress::AwaitingAttackers(player) => {
                game.apply(player, Command::DeclareAttackers(Vec::new())).unwrap();
            }
            Progress::AwaitingBlockers(player) => {
                game.apply(player, Command::DeclareBlockers(Vec::new())).unwrap();
            }
            other => panic!("unexpected progress {other:?}"),
        }
    }
    panic!("condition never reached");
}

/// Run until players have priority in `step` of the current turn.
pub fn priority_in(game: &mut Game, step: Step) {
    run_until(game, |g| g.state().turn.step == step && g.state().turn.stage == StepStage::Priority);
}

/// Everyone passes once, starting with the priority holder.
pub fn all_pass(game: &mut Game) {
    let seats = game.state().active_players().len();
    for _ in 0..seats {
        match game.progress() {
            Progress::Priority(player) => {
                game.apply(player, Command::PassPriority).unwrap();
            }
            _ => return,
        }
    }
}
