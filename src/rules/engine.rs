//! The game driver: commands in, progress out.
//!
//! [`Game`] owns one [`GameState`]. Every command and every decision
//! response runs as a transaction: the state is snapshotted (cheap, all
//! collections are persistent), the call is applied and the rules are run
//! forward until a player has to act. If anything fails the snapshot is
//! restored, so a rejected call leaves no trace.
//!
//! ## Running the rules forward
//!
//! Each iteration handles the first thing that applies:
//!
//! 1. the game is over, or a decision is pending: stop
//! 2. proposed events in the action queue: perform them (replacement
//!    effects may ask for a choice)
//! 3. a spell or ability is resolving: run its next instructions
//! 4. the current step's turn-based actions have not run: run them
//! 5. players are about to receive priority: state-based actions until
//!    stable, then triggered abilities go on the stack, then priority
//!
//! The loop only ever stops with the game over, a pending decision, a
//! declaration to make, or a player holding priority.

use tracing::{debug, error};

use super::sba::StateBasedActionChecker;
use super::turn::{self, StepFlow};
use crate::cards::{CardDefinition, CardType, Keyword, ManaCost};
use crate::combat::{self, damage, declare, AttackTarget};
use crate::core::{
    ActionRecord, Command, EntityId, GameConfig, GameResult, GameState, IllegalAction, InvalidResponse,
    PriorityAfterAction, PlayerId, RulesError, RulesResult,
};
use crate::decision::{Continuation, Decision, DecisionId, DecisionKind, DecisionResponse};
use crate::effects::{
    actions, replacement, resolver, Cost, CostPayment, Proposal, ProposedEvent, TargetGroup, TargetRules, TargetSpec,
    ZoneChange,
};
use crate::layers::{object_abilities, project, ProjectedView};
use crate::stack::{PassOutcome, StackObject, StackObjectKind, Step, StepStage};
use crate::triggers::{GameEvent, LastKnown, LossReason, TriggerEngine};
use crate::zones::{ZoneId, ZoneKind};

use std::sync::Arc;

/// What the game is waiting for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Progress {
    /// `player` holds priority.
    Priority(PlayerId),
    /// `player` must answer decision `id`.
    Decision { id: DecisionId, player: PlayerId },
    AwaitingAttackers(PlayerId),
    AwaitingBlockers(PlayerId),
    GameOver(GameResult),
}

/// Result of an accepted command or response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOutcome {
    pub progress: Progress,
    /// Events that happened while processing it, in order.
    pub events: Vec<GameEvent>,
}

/// One game in progress.
#[derive(Clone, Debug)]
pub struct Game {
    state: GameState,
}

impl Game {
    /// A game with empty zones at turn 0. Add cards, then call [`start`].
    ///
    /// [`start`]: Game::start
    pub fn new(config: GameConfig) -> RulesResult<Self> {
        config.validate()?;
        Ok(Self {
            state: GameState::new(config),
        })
    }

    /// Continue from an existing state.
    #[must_use]
    pub fn from_state(state: GameState) -> Self {
        Self { state }
    }

    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Direct access for setting up scenarios. Bypasses every rule.
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    #[must_use]
    pub fn into_state(self) -> GameState {
        self.state
    }

    /// The effective characteristics of every object.
    #[must_use]
    pub fn project(&self) -> ProjectedView {
        project(&self.state)
    }

    /// Put a card into a zone (setup).
    pub fn add_card(&mut self, owner: PlayerId, definition: Arc<CardDefinition>, zone: ZoneId) -> RulesResult<EntityId> {
        self.state.create_object(owner, definition, zone, false)
    }

    #[must_use]
    pub fn pending_decision(&self) -> Option<&Decision> {
        self.state.pending_decision.as_ref().map(|p| &p.decision)
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        progress(&self.state)
    }

    /// Shuffle libraries, draw opening hands and begin the first turn.
    pub fn start(&mut self) -> RulesResult<CommandOutcome> {
        self.transaction(|state| {
            if state.turn.turn_number != 0 {
                return Err(IllegalAction::NotAwaiting { what: "the game to start" }.into());
            }
            let hand_size = state.config.opening_hand_size as u32;
            for player in state.apnap_order() {
                actions::shuffle(state, player);
                actions::draw_cards(state, player, hand_size)?;
            }
            let first = state.turn.active_player;
            turn::begin_turn(state, first);
            Ok(())
        })
    }

    /// Apply `player`'s command.
    pub fn apply(&mut self, player: PlayerId, command: Command) -> RulesResult<CommandOutcome> {
        self.transaction(|state| {
            debug!(target: "engine.priority", player = %player, command = command.name(), "command");
            execute(state, player, &command)?;
            let turn = state.turn.turn_number;
            let sequence = state.history.iter().filter(|r| r.turn == turn).count() as u32;
            state.history.push_back(ActionRecord::new(player, command, turn, sequence));
            Ok(())
        })
    }

    /// Answer the pending decision.
    pub fn submit_response(
        &mut self,
        player: PlayerId,
        id: DecisionId,
        response: DecisionResponse,
    ) -> RulesResult<CommandOutcome> {
        self.transaction(|state| answer(state, player, id, response))
    }

    /// Encode the whole game, including any suspended resolution.
    pub fn checkpoint(&self) -> RulesResult<Vec<u8>> {
        bincode::serialize(&self.state).map_err(|e| RulesError::Checkpoint(e.to_string()))
    }

    /// Decode a game written by [`checkpoint`](Game::checkpoint).
    pub fn restore(bytes: &[u8]) -> RulesResult<Self> {
        let state: GameState = bincode::deserialize(bytes).map_err(|e| RulesError::Checkpoint(e.to_string()))?;
        Ok(Self { state })
    }

    fn transaction(&mut self, f: impl FnOnce(&mut GameState) -> RulesResult<()>) -> RulesResult<CommandOutcome> {
        let snapshot = self.state.clone();
        let first_event = self.state.events.len();
        match f(&mut self.state).and_then(|()| run(&mut self.state)) {
            Ok(()) => Ok(CommandOutcome {
                progress: progress(&self.state),
                events: self.state.events.iter().skip(first_event).cloned().collect(),
            }),
            Err(err) => {
                if err.is_inconsistent() {
                    error!(target: "engine.priority", error = %err, "inconsistent state, transaction rolled back");
                }
                self.state = snapshot;
                Err(err)
            }
        }
    }
}

fn progress(state: &GameState) -> Progress {
    if let Some(result) = state.result {
        return Progress::GameOver(result);
    }
    if let Some(pending) = &state.pending_decision {
        return Progress::Decision {
            id: pending.decision.id,
            player: pending.decision.player,
        };
    }
    let active = state.turn.active_player;
    match state.turn.stage {
        StepStage::AwaitingAttackers => Progress::AwaitingAttackers(active),
        StepStage::AwaitingBlockers => Progress::AwaitingBlockers(turn::next_defender(state).unwrap_or(active)),
        StepStage::Start | StepStage::Priority => Progress::Priority(state.stack.priority_player().unwrap_or(active)),
    }
}

// === Running the rules ===

fn run(state: &mut GameState) -> RulesResult<()> {
    loop {
        if state.is_over() || state.pending_decision.is_some() {
            return Ok(());
        }
        if !state.actions.is_empty() {
            replacement::drain(state)?;
            continue;
        }
        if state.resolving.is_some() {
            resolver::advance(state)?;
            continue;
        }
        TriggerEngine::collect(state);

        match state.turn.stage {
            StepStage::Start => match turn::perform_turn_based(state)? {
                StepFlow::Advance => {
                    if state.turn.step == Step::Cleanup && cleanup_needs_priority(state)? {
                        continue;
                    }
                    turn::advance_step(state);
                }
                StepFlow::Stay | StepFlow::Suspended => {}
            },
            StepStage::AwaitingAttackers | StepStage::AwaitingBlockers => return Ok(()),
            StepStage::Priority => {
                let changed = StateBasedActionChecker::apply_until_stable(state)?;
                if state.is_over() {
                    return Ok(());
                }
                TriggerEngine::collect(state);
                let triggered = !state.pending_triggers.is_empty();
                if triggered && TriggerEngine::place(state)? {
                    continue;
                }
                if changed || triggered || !state.actions.is_empty() {
                    continue;
                }
                if state.stack.priority_player().is_none() {
                    state.stack.grant(state.turn.active_player);
                }
                return Ok(());
            }
        }
    }
}

/// During cleanup, players get priority only if a state-based action or a
/// trigger happened; another cleanup step follows.
fn cleanup_needs_priority(state: &mut GameState) -> RulesResult<bool> {
    let changed = StateBasedActionChecker::apply_until_stable(state)?;
    TriggerEngine::collect(state);
    if changed || !state.pending_triggers.is_empty() {
        state.turn.cleanup_needs_priority = true;
        state.turn.stage = StepStage::Priority;
        return Ok(true);
    }
    Ok(false)
}

// === Commands ===

fn execute(state: &mut GameState, player: PlayerId, command: &Command) -> RulesResult<()> {
    if state.is_over() {
        return Err(IllegalAction::GameOver.into());
    }
    if state.pending_decision.is_some() {
        return Err(IllegalAction::DecisionPending.into());
    }
    if player.index() >= state.player_count() || !state.players[player].is_active() {
        return Err(IllegalAction::WrongPlayer { player }.into());
    }
    match command {
        Command::PassPriority => pass_priority(state, player),
        Command::PlayLand { card } => play_land(state, player, *card),
        Command::CastSpell { card, targets, x } => cast_spell(state, player, *card, targets, *x),
        Command::CastFaceDown { card } => cast_face_down(state, player, *card),
        Command::ActivateAbility {
            source,
            index,
            targets,
            x,
        } => activate_ability(state, player, *source, *index, targets, *x),
        Command::DeclareAttackers(attackers) => declare_attackers(state, player, attackers),
        Command::DeclareBlockers(blocks) => declare_blockers(state, player, blocks),
        Command::TurnFaceUp { object } => turn_face_up(state, player, *object),
        Command::Concede => {
            concede(state, player);
            Ok(())
        }
    }
}

fn require_priority(state: &GameState, player: PlayerId) -> Result<(), IllegalAction> {
    if state.turn.stage != StepStage::Priority || state.stack.priority_player() != Some(player) {
        return Err(IllegalAction::NoPriority { player });
    }
    Ok(())
}

fn require_sorcery_timing(state: &GameState, player: PlayerId, object: EntityId) -> Result<(), IllegalAction> {
    if !state.turn.is_sorcery_window(player) || !state.stack.is_empty() {
        return Err(IllegalAction::SorcerySpeedOnly(object));
    }
    Ok(())
}

fn require_in_hand(state: &GameState, player: PlayerId, card: EntityId) -> RulesResult<Arc<CardDefinition>> {
    let object = state.object(card).ok_or(IllegalAction::ObjectNotFound(card))?;
    if state.zones.get_zone(card) != Some(ZoneId::hand(player)) {
        return Err(IllegalAction::WrongZone {
            object: card,
            expected: "your hand",
        }
        .into());
    }
    Ok(object.definition.clone())
}

/// Priority after a spell or ability was put on the stack.
fn priority_after_action(state: &mut GameState, player: PlayerId) {
    let holder = match state.config.priority_after_action {
        PriorityAfterAction::ActivePlayer => state.turn.active_player,
        PriorityAfterAction::Acting => player,
    };
    state.stack.grant(holder);
}

fn pass_priority(state: &mut GameState, player: PlayerId) -> RulesResult<()> {
    require_priority(state, player)?;
    let seats = state.apnap_order();
    match state.stack.pass(player, &seats) {
        PassOutcome::NextPlayer(next) => {
            debug!(target: "engine.priority", player = %player, next = %next, "passed");
        }
        PassOutcome::AllPassed => match state.stack.pop() {
            Some(object) => {
                debug!(target: "engine.priority", object = %object.id, "all passed, resolving top of stack");
                resolver::begin(state, object, false)?;
            }
            None => {
                debug!(target: "engine.priority", step = ?state.turn.step, "all passed, step ends");
                turn::advance_step(state);
            }
        },
    }
    Ok(())
}

fn play_land(state: &mut GameState, player: PlayerId, card: EntityId) -> RulesResult<()> {
    require_priority(state, player)?;
    let definition = require_in_hand(state, player, card)?;
    if !definition.has_type(CardType::Land) {
        return Err(IllegalAction::NotCastable(card).into());
    }
    require_sorcery_timing(state, player, card)?;
    if state.players[player].lands_played >= state.config.lands_per_turn {
        return Err(IllegalAction::LandLimitReached.into());
    }
    state.players[player].lands_played += 1;
    replacement::enqueue(
        state,
        Proposal::new(ProposedEvent::ZoneChange(
            ZoneChange::new(card, ZoneId::battlefield()).under(player),
        )),
    );
    state.stack.grant(player);
    Ok(())
}

fn cast_spell(state: &mut GameState, player: PlayerId, card: EntityId, targets: &[TargetGroup], x: u32) -> RulesResult<()> {
    require_priority(state, player)?;
    let definition = require_in_hand(state, player, card)?;
    if definition.has_type(CardType::Land) {
        return Err(IllegalAction::NotCastable(card).into());
    }
    let cost = definition.mana_cost.clone().ok_or(IllegalAction::NotCastable(card))?;
    if !definition.has_flash() {
        require_sorcery_timing(state, player, card)?;
    }

    let specs: Vec<TargetSpec> = match (&definition.enchant, definition.is_aura()) {
        (Some(filter), true) => vec![TargetSpec::object(filter.clone())],
        _ => definition.spell_targets.clone(),
    };
    let view = project(state);
    TargetRules::validate(state, &view, &specs, targets, card, player)?;
    let payment = CostPayment {
        source: card,
        payer: player,
        x,
        view: &view,
    };
    let costs = payment.pay(state, &[Cost::Mana(cost)])?;

    actions::move_object(state, &ZoneChange::new(card, ZoneId::stack()))?;
    let timestamp = state.next_timestamp();
    state.stack.push(StackObject {
        id: card,
        kind: StackObjectKind::Spell { face_down: false },
        source: card,
        controller: player,
        target_specs: specs,
        targets: targets.to_vec(),
        effects: definition.spell_effects.clone(),
        x,
        costs,
        source_snapshot: None,
        trigger_event: None,
        timestamp,
    });
    debug!(target: "engine.priority", card = %card, player = %player, name = %definition.name, "spell cast");
    actions::emit(state, GameEvent::SpellCast { card, controller: player });
    priority_after_action(state, player);
    Ok(())
}

fn cast_face_down(state: &mut GameState, player: PlayerId, card: EntityId) -> RulesResult<()> {
    require_priority(state, player)?;
    let definition = require_in_hand(state, player, card)?;
    if definition.morph.is_none() {
        return Err(IllegalAction::NoMorphCost(card).into());
    }
    require_sorcery_timing(state, player, card)?;

    let view = project(state);
    let payment = CostPayment {
        source: card,
        payer: player,
        x: 0,
        view: &view,
    };
    let costs = payment.pay(state, &[Cost::Mana(ManaCost::generic(3))])?;

    actions::move_object(state, &ZoneChange::new(card, ZoneId::stack()))?;
    state.components.set_face_down(card, true);
    let timestamp = state.next_timestamp();
    state.stack.push(StackObject {
        id: card,
        kind: StackObjectKind::Spell { face_down: true },
        source: card,
        controller: player,
        target_specs: Vec::new(),
        targets: Vec::new(),
        effects: Vec::new(),
        x: 0,
        costs,
        source_snapshot: None,
        trigger_event: None,
        timestamp,
    });
    debug!(target: "engine.priority", card = %card, player = %player, "spell cast face down");
    actions::emit(state, GameEvent::SpellCast { card, controller: player });
    priority_after_action(state, player);
    Ok(())
}

fn activate_ability(
    state: &mut GameState,
    player: PlayerId,
    source: EntityId,
    index: usize,
    targets: &[TargetGroup],
    x: u32,
) -> RulesResult<()> {
    require_priority(state, player)?;
    let view = project(state);
    let ch = view.get(source).ok_or(IllegalAction::ObjectNotFound(source))?;
    if !ch.on_battlefield() {
        return Err(IllegalAction::WrongZone {
            object: source,
            expected: "battlefield",
        }
        .into());
    }
    if ch.controller != player {
        return Err(IllegalAction::NotController { player, object: source }.into());
    }
    let ability = object_abilities(state, source, ch)
        .get(index)
        .and_then(|a| a.as_activated().cloned())
        .ok_or(IllegalAction::NoSuchAbility {
            source_object: source,
            index,
        })?;
    if ability.sorcery_speed {
        require_sorcery_timing(state, player, source)?;
    }
    TargetRules::validate(state, &view, &ability.targets, targets, source, player)?;

    let snapshot = LastKnown::capture(state, &view, source);
    let payment = CostPayment {
        source,
        payer: player,
        x,
        view: &view,
    };
    let costs = payment.pay(state, &ability.costs)?;

    let object = StackObject {
        id: state.allocate_entity(),
        kind: StackObjectKind::Activated { index },
        source,
        controller: player,
        target_specs: ability.targets.clone(),
        targets: targets.to_vec(),
        effects: ability.effects.clone(),
        x,
        costs,
        source_snapshot: snapshot,
        trigger_event: None,
        timestamp: state.next_timestamp(),
    };
    actions::emit(state, GameEvent::AbilityActivated { source, controller: player });
    if ability.mana_ability {
        debug!(target: "engine.resolve", source = %source, index, "mana ability");
        resolver::begin(state, object, true)?;
    } else {
        debug!(target: "engine.priority", source = %source, index, "ability activated");
        state.stack.push(object);
        priority_after_action(state, player);
    }
    Ok(())
}

fn declare_attackers(state: &mut GameState, player: PlayerId, attackers: &[(EntityId, AttackTarget)]) -> RulesResult<()> {
    if state.turn.stage != StepStage::AwaitingAttackers {
        return Err(IllegalAction::NotAwaiting { what: "attackers" }.into());
    }
    if player != state.turn.active_player {
        return Err(IllegalAction::WrongPlayer { player }.into());
    }
    let view = project(state);
    declare::validate_attackers(state, &view, attackers)?;

    for &(attacker, target) in attackers {
        if !view.has_keyword(attacker, &Keyword::Vigilance) {
            actions::tap(state, attacker);
        }
        if let Some(combat) = state.combat.as_mut() {
            combat.attackers.insert(attacker, target);
        }
        actions::emit(
            state,
            GameEvent::AttackerDeclared {
                attacker,
                target,
                controller: player,
            },
        );
    }
    debug!(target: "engine.combat", count = attackers.len(), "attackers declared");
    state.combat.get_or_insert_with(combat::CombatState::new).attackers_declared = true;
    state.turn.stage = StepStage::Start;
    Ok(())
}

fn declare_blockers(state: &mut GameState, player: PlayerId, blocks: &[(EntityId, EntityId)]) -> RulesResult<()> {
    if state.turn.stage != StepStage::AwaitingBlockers {
        return Err(IllegalAction::NotAwaiting { what: "blockers" }.into());
    }
    if turn::next_defender(state) != Some(player) {
        return Err(IllegalAction::WrongPlayer { player }.into());
    }
    let view = project(state);
    declare::validate_blockers(state, &view, player, blocks)?;

    for &(blocker, attacker) in blocks {
        if let Some(combat) = state.combat.as_mut() {
            combat.blockers.insert(blocker, attacker);
            combat.blocked.insert(attacker);
        }
        actions::emit(state, GameEvent::BlockerDeclared { blocker, attacker });
    }
    debug!(target: "engine.combat", defender = %player, count = blocks.len(), "blockers declared");
    if let Some(combat) = state.combat.as_mut() {
        combat.defenders_pending.pop_front();
    }
    state.turn.stage = StepStage::Start;
    Ok(())
}

fn turn_face_up(state: &mut GameState, player: PlayerId, object: EntityId) -> RulesResult<()> {
    require_priority(state, player)?;
    if state.zones.get_zone(object) != Some(ZoneId::battlefield()) {
        return Err(IllegalAction::WrongZone {
            object,
            expected: "battlefield",
        }
        .into());
    }
    if !state.components.is_face_down(object) {
        return Err(IllegalAction::NotFaceDown(object).into());
    }
    if state.controller_of(object) != Some(player) {
        return Err(IllegalAction::NotController { player, object }.into());
    }
    let morph = state
        .object(object)
        .and_then(|o| o.definition.morph.clone())
        .ok_or(IllegalAction::NoMorphCost(object))?;
    let view = project(state);
    let payment = CostPayment {
        source: object,
        payer: player,
        x: 0,
        view: &view,
    };
    payment.pay(state, &[Cost::Mana(morph)])?;
    actions::turn_face_up(state, object);
    state.stack.grant(player);
    Ok(())
}

fn concede(state: &mut GameState, player: PlayerId) {
    actions::lose_game(state, player, LossReason::Conceded);
    if let Some(combat) = state.combat.as_mut() {
        combat.defenders_pending.retain(|p| *p != player);
    }
    if state.stack.priority_player() == Some(player) {
        if let Some(next) = state.seats_from(player).into_iter().find(|p| *p != player) {
            state.stack.grant(next);
        }
    }
    if state.turn.stage == StepStage::AwaitingBlockers && turn::next_defender(state).is_none() {
        state.turn.stage = StepStage::Start;
    }
    StateBasedActionChecker::check_game_over(state);
}

// === Decisions ===

fn answer(state: &mut GameState, player: PlayerId, id: DecisionId, response: DecisionResponse) -> RulesResult<()> {
    let pending = state
        .pending_decision
        .as_ref()
        .ok_or(InvalidResponse::NoPendingDecision)?;
    let decision = &pending.decision;
    if decision.id != id {
        return Err(InvalidResponse::StaleDecision {
            expected: decision.id.0,
            got: id.0,
        }
        .into());
    }
    if decision.player != player {
        return Err(InvalidResponse::WrongPlayer {
            expected: decision.player,
            got: player,
        }
        .into());
    }
    decision.kind.validate(&response)?;

    let pending = state
        .pending_decision
        .take()
        .ok_or(InvalidResponse::NoPendingDecision)?;
    debug!(target: "engine.decision", id = %id, player = %player, kind = pending.decision.kind.name(), "decision answered");
    let kind = pending.decision.kind;

    match (pending.continuation, response) {
        (Continuation::Resolution, response) => resolver::resume(state, response)?,
        (Continuation::Replacement(proposal), DecisionResponse::Replacement(index)) => {
            let DecisionKind::ChooseReplacement { options } = kind else {
                return Err(RulesError::inconsistent("replacement continuation without replacement options"));
            };
            let key = options
                .get(index)
                .copied()
                .ok_or(InvalidResponse::NotAnOption)?;
            replacement::resume(state, proposal, key)?;
        }
        (Continuation::TriggerOrder { player }, DecisionResponse::Order(order)) => {
            TriggerEngine::resume_order(state, player, &order);
        }
        (Continuation::TriggerTargets(trigger), DecisionResponse::Targets(groups)) => {
            TriggerEngine::resume_targets(state, trigger, groups);
        }
        (Continuation::BlockerOrder { attacker }, DecisionResponse::Order(order)) => {
            let DecisionKind::Order { items } = kind else {
                return Err(RulesError::inconsistent("blocker order continuation without items"));
            };
            let ordered: im::Vector<EntityId> = order.iter().filter_map(|&i| items.get(i).copied()).collect();
            if let Some(combat) = state.combat.as_mut() {
                combat.damage_order.insert(attacker, ordered);
            }
        }
        (
            Continuation::CombatDamage { attacker },
            DecisionResponse::DamageAssignment {
                to_blockers,
                to_defender,
            },
        ) => {
            let DecisionKind::AssignCombatDamage { blockers, .. } = kind else {
                return Err(RulesError::inconsistent("damage continuation without blockers"));
            };
            damage::resume_assignment(state, attacker, &blockers, &to_blockers, to_defender);
        }
        (Continuation::CleanupDiscard { .. }, DecisionResponse::Selection(cards)) => {
            for card in cards {
                actions::discard(state, card);
            }
        }
        (_, response) => {
            debug!(target: "engine.decision", response = response.name(), "response does not fit continuation");
            return Err(InvalidResponse::WrongKind {
                expected: kind.name(),
            }
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::ManaType;
    use crate::effects::{Effect, Selector, Target};
    use smallvec::smallvec;

    fn game() -> Game {
        let mut game = Game::new(GameConfig::new(2)).unwrap();
        for player in [PlayerId::new(0), PlayerId::new(1)] {
            for _ in 0..20 {
                game.add_card(
                    player,
                    Arc::new(CardDefinition::basic_land("Mountain", ManaType::Red)),
                    ZoneId::library(player),
                )
                .unwrap();
            }
        }
        game
    }

    fn pass_until(game: &mut Game, step: Step) {
        for _ in 0..64 {
            if game.state().turn.step == step && game.state().turn.stage == StepStage::Priority {
                return;
            }
            match game.progress() {
                Progress::Priority(p) => {
                    game.apply(p, Command::PassPriority).unwrap();
                }
                Progress::AwaitingAttackers(p) => {
                    game.apply(p, Command::DeclareAttackers(Vec::new())).unwrap();
                }
                other => panic!("unexpected progress {other:?}"),
            }
        }
        panic!("never reached {step:?}");
    }

    #[test]
    fn test_start_gives_priority_in_upkeep() {
        let mut game = game();
        let outcome = game.start().unwrap();
        assert_eq!(outcome.progress, Progress::Priority(PlayerId::new(0)));
        assert_eq!(game.state().turn.turn_number, 1);
        assert_eq!(game.state().turn.step, Step::Upkeep);
        assert_eq!(game.state().zones.zone_size(ZoneId::hand(PlayerId::new(0))), 7);
    }

    #[test]
    fn test_wrong_player_cannot_pass() {
        let mut game = game();
        game.start().unwrap();
        let before = game.state().clone();
        let err = game.apply(PlayerId::new(1), Command::PassPriority).unwrap_err();
        assert_eq!(err, RulesError::IllegalAction(IllegalAction::NoPriority { player: PlayerId::new(1) }));
        assert_eq!(game.state(), &before);
    }

    #[test]
    fn test_play_land_once_per_turn() {
        let mut game = game();
        game.start().unwrap();
        pass_until(&mut game, Step::PrecombatMain);
        let hand: Vec<EntityId> = game
            .state()
            .zones
            .cards_in_zone(ZoneId::hand(PlayerId::new(0)))
            .into_iter()
            .collect();
        game.apply(PlayerId::new(0), Command::PlayLand { card: hand[0] }).unwrap();
        assert_eq!(game.state().zones.get_zone(hand[0]), Some(ZoneId::battlefield()));
        let err = game.apply(PlayerId::new(0), Command::PlayLand { card: hand[1] }).unwrap_err();
        assert_eq!(err, RulesError::IllegalAction(IllegalAction::LandLimitReached));
    }

    #[test]
    fn test_cast_and_resolve_burn_spell() {
        let mut game = game();
        let shock = game
            .add_card(
                PlayerId::new(0),
                Arc::new(
                    CardDefinition::instant("Shock", "R")
                        .with_spell(vec![TargetSpec::any_target()], vec![Effect::deal_damage(2, Selector::Targets(0))]),
                ),
                ZoneId::hand(PlayerId::new(0)),
            )
            .unwrap();
        game.start().unwrap();
        actions::add_mana(game.state_mut(), PlayerId::new(0), ManaType::Red, 1);
        game.apply(
            PlayerId::new(0),
            Command::CastSpell {
                card: shock,
                targets: vec![smallvec![Target::Player(PlayerId::new(1))]],
                x: 0,
            },
        )
        .unwrap();
        assert_eq!(game.state().stack.len(), 1);
        game.apply(PlayerId::new(0), Command::PassPriority).unwrap();
        let outcome = game.apply(PlayerId::new(1), Command::PassPriority).unwrap();
        assert_eq!(game.state().players[PlayerId::new(1)].life, 18);
        assert_eq!(game.state().zones.get_zone(shock), Some(ZoneId::graveyard(PlayerId::new(0))));
        assert!(outcome
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::DamageDealt { amount: 2, .. })));
        assert_eq!(outcome.progress, Progress::Priority(PlayerId::new(0)));
    }

    #[test]
    fn test_failed_cast_rolls_back() {
        let mut game = game();
        let shock = game
            .add_card(
                PlayerId::new(0),
                Arc::new(
                    CardDefinition::instant("Shock", "R")
                        .with_spell(vec![TargetSpec::any_target()], vec![Effect::deal_damage(2, Selector::Targets(0))]),
                ),
                ZoneId::hand(PlayerId::new(0)),
            )
            .unwrap();
        game.start().unwrap();
        let before = game.state().clone();
        let err = game
            .apply(
                PlayerId::new(0),
                Command::CastSpell {
                    card: shock,
                    targets: vec![smallvec![Target::Player(PlayerId::new(1))]],
                    x: 0,
                },
            )
            .unwrap_err();
        assert!(matches!(err, RulesError::IllegalAction(IllegalAction::CannotPayCost(_))));
        assert_eq!(game.state(), &before);

        actions::add_mana(game.state_mut(), PlayerId::new(0), ManaType::Red, 4);
        let before = game.state().clone();
        let err = game
            .apply(
                PlayerId::new(0),
                Command::CastSpell {
                    card: shock,
                    targets: vec![smallvec![Target::Player(PlayerId::new(1))]],
                    x: 3,
                },
            )
            .unwrap_err();
        assert_eq!(err, RulesError::IllegalAction(IllegalAction::UnexpectedX(3)));
        assert_eq!(game.state(), &before);
    }

    #[test]
    fn test_morph_cast_face_down_then_turned_up() {
        let mut game = game();
        let p0 = PlayerId::new(0);
        let beast = game
            .add_card(
                p0,
                Arc::new(CardDefinition::creature("Hidden Beast", "4GG", 5, 5).with_morph("2G")),
                ZoneId::hand(p0),
            )
            .unwrap();
        game.start().unwrap();
        pass_until(&mut game, Step::PrecombatMain);
        actions::add_mana(game.state_mut(), p0, ManaType::Red, 3);
        game.apply(p0, Command::CastFaceDown { card: beast }).unwrap();
        game.apply(p0, Command::PassPriority).unwrap();
        game.apply(PlayerId::new(1), Command::PassPriority).unwrap();

        assert_eq!(game.state().zones.get_zone(beast), Some(ZoneId::battlefield()));
        assert!(game.state().components.is_face_down(beast));
        assert_eq!(game.project().power(beast), Some(2));

        let err = game.apply(p0, Command::TurnFaceUp { object: beast }).unwrap_err();
        assert!(matches!(err, RulesError::IllegalAction(IllegalAction::CannotPayCost(_))));
        actions::add_mana(game.state_mut(), p0, ManaType::Green, 3);
        game.apply(p0, Command::TurnFaceUp { object: beast }).unwrap();
        assert!(!game.state().components.is_face_down(beast));
        assert_eq!(game.project().power(beast), Some(5));
        assert_eq!(game.project().toughness(beast), Some(5));
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let mut game = game();
        game.start().unwrap();
        let bytes = game.checkpoint().unwrap();
        let restored = Game::restore(&bytes).unwrap();
        assert_eq!(restored.state(), game.state());
    }
}
