//! Resolution of spells and abilities.
//!
//! A resolving object's script runs one instruction at a time on an
//! explicit cursor stack ([`Frame`]s of instructions plus a program
//! counter). The whole in-flight resolution lives in
//! `GameState::resolving`, so it can be serialized, and is resumed at the
//! instruction boundary where it stopped:
//!
//! - after an instruction that proposed damage or zone changes (the engine
//!   drains the action queue, then calls [`advance`] again)
//! - after an instruction that asked a player something (the engine calls
//!   [`resume`] with the validated answer)
//!
//! Nested scripts (`May`, `ChooseMode`, `If`, per-player expansions) push a
//! new frame; a finished frame is popped.
//!
//! ## Targets
//!
//! When resolution begins, every target is checked again. Objects that
//! changed zones since the object was put on the stack are new objects and
//! no longer legal. If the object had targets and none is legal anymore it
//! fizzles: nothing happens and a spell goes to its owner's graveyard.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::actions;
use super::effect::{Amount, Effect, EffectCondition, PlayerSelector, Selector};
use super::replacement::{
    self, DamageEvent, DamageSource, Proposal, ProposedEvent, ReplacementEffect, ReplacementId, ReplacementKind, ZoneChange,
};
use super::targeting::{FilterContext, ObjectFilter, Target, TargetRules, TargetSpec};
use crate::cards::{Color, ColorSet, Keyword, ManaType, Subtype};
use crate::core::{EntityId, GameState, GrantedAbility, InvalidResponse, PlayerId, RulesError, RulesResult};
use crate::decision::{Continuation, DecisionKind, DecisionResponse};
use crate::layers::{project, Affected, ContinuousEffect, Duration, Modification, ProjectedView};
use crate::stack::{StackObject, StackObjectKind};
use crate::triggers::{DelayedTrigger, DelayedTriggerId, GameEvent};
use crate::zones::{ZoneId, ZoneKind};

/// A script and the index of its next instruction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub effects: Vec<Effect>,
    pub pc: usize,
}

impl Frame {
    fn new(effects: Vec<Effect>) -> Self {
        Self { effects, pc: 0 }
    }
}

/// Values chosen earlier in the same resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bindings {
    pub color: Option<Color>,
    pub number: Option<i64>,
    pub creature_type: Option<Subtype>,
    pub chosen: Vec<EntityId>,
    pub answered_yes: Option<bool>,
}

/// What the suspended resolution does with the answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Awaiting {
    May(Vec<Effect>),
    Mode(Vec<Vec<Effect>>),
    Color,
    Number,
    CreatureType,
    Objects,
    Distribute { recipients: Vec<Target>, source: DamageSource },
    Search { player: PlayerId, to: ZoneKind },
    Discard,
    Sacrifice,
}

/// A spell or ability part-way through resolving.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub object: StackObject,
    pub frames: Vec<Frame>,
    pub bindings: Bindings,
    pub awaiting: Option<Awaiting>,
    /// Mana abilities resolve without the stack; their activator keeps
    /// priority.
    pub mana_ability: bool,
}

/// Start resolving `object`, which was already taken off the stack.
pub fn begin(state: &mut GameState, mut object: StackObject, mana_ability: bool) -> RulesResult<()> {
    let view = project(state);
    let had_targets = object.has_targets();
    let checked: Vec<_> = (0..object.targets.len())
        .map(|group| current_targets(state, &view, &object, group).into_iter().collect())
        .collect();
    object.targets = checked;

    if had_targets && !object.has_targets() {
        debug!(target: "engine.resolve", object = %object.id, source = %object.source, "fizzled");
        actions::emit(
            state,
            GameEvent::Fizzled {
                source: object.source,
                controller: object.controller,
            },
        );
        if object.is_spell() {
            let owner = state
                .objects
                .get(&object.id)
                .map(|o| o.owner)
                .ok_or_else(|| RulesError::inconsistent(format!("spell {} has no card", object.id)))?;
            replacement::enqueue(
                state,
                Proposal::new(ProposedEvent::ZoneChange(ZoneChange::new(object.id, ZoneId::graveyard(owner)))),
            );
        }
        if !mana_ability {
            state.stack.grant(state.turn.active_player);
        }
        return Ok(());
    }

    debug!(target: "engine.resolve", object = %object.id, source = %object.source, "resolving");
    state.resolving = Some(Resolution {
        frames: vec![Frame::new(object.effects.clone())],
        object,
        bindings: Bindings::default(),
        awaiting: None,
        mana_ability,
    });
    Ok(())
}

/// Run instructions until the resolution finishes, proposes events or
/// asks a question.
pub fn advance(state: &mut GameState) -> RulesResult<()> {
    while state.pending_decision.is_none() && state.actions.is_empty() {
        let Some(mut resolution) = state.resolving.take() else {
            return Ok(());
        };
        if resolution.awaiting.is_some() {
            state.resolving = Some(resolution);
            return Ok(());
        }
        let Some(frame) = resolution.frames.last_mut() else {
            return finish(state, resolution);
        };
        if frame.pc >= frame.effects.len() {
            resolution.frames.pop();
            state.resolving = Some(resolution);
            continue;
        }
        let effect = frame.effects[frame.pc].clone();
        frame.pc += 1;
        execute(state, &mut resolution, &effect)?;
        state.resolving = Some(resolution);
    }
    Ok(())
}

/// Feed a validated answer to the suspended resolution.
pub fn resume(state: &mut GameState, response: DecisionResponse) -> RulesResult<()> {
    let mut resolution = state
        .resolving
        .take()
        .ok_or_else(|| RulesError::inconsistent("decision answered but nothing is resolving"))?;
    let awaiting = resolution
        .awaiting
        .take()
        .ok_or_else(|| RulesError::inconsistent("resolution was not waiting for an answer"))?;
    let controller = resolution.object.controller;

    match (awaiting, response) {
        (Awaiting::May(effects), DecisionResponse::YesNo(yes)) => {
            resolution.bindings.answered_yes = Some(yes);
            if yes {
                resolution.frames.push(Frame::new(effects));
            }
        }
        (Awaiting::Mode(mut modes), DecisionResponse::Mode(index)) if index < modes.len() => {
            resolution.frames.push(Frame::new(modes.swap_remove(index)));
        }
        (Awaiting::Color, DecisionResponse::Color(color)) => resolution.bindings.color = Some(color),
        (Awaiting::Number, DecisionResponse::Number(n)) => resolution.bindings.number = Some(n),
        (Awaiting::CreatureType, DecisionResponse::CreatureType(t)) => resolution.bindings.creature_type = Some(t),
        (Awaiting::Objects, DecisionResponse::Selection(chosen)) => resolution.bindings.chosen = chosen,
        (Awaiting::Distribute { recipients, source }, DecisionResponse::Distribution(amounts)) => {
            for (target, amount) in recipients.into_iter().zip(amounts) {
                propose_damage(state, &source, target, amount);
            }
        }
        (Awaiting::Search { player, to }, DecisionResponse::Selection(cards)) => {
            for card in cards {
                let zone = ZoneId::of(to, player);
                let change = ZoneChange::new(card, zone);
                let change = if to == ZoneKind::Battlefield {
                    change.under(player)
                } else {
                    change
                };
                replacement::enqueue(state, Proposal::new(ProposedEvent::ZoneChange(change)));
            }
        }
        (Awaiting::Discard, DecisionResponse::Selection(cards)) => {
            for card in cards {
                actions::discard(state, card);
            }
        }
        (Awaiting::Sacrifice, DecisionResponse::Selection(permanents)) => {
            for permanent in permanents {
                propose_graveyard(state, permanent);
            }
        }
        (awaiting, response) => {
            debug!(target: "engine.resolve", controller = %controller, response = response.name(), "mismatched answer");
            return Err(RulesError::InvalidResponse(InvalidResponse::WrongKind {
                expected: awaiting_name(&awaiting),
            }));
        }
    }
    state.resolving = Some(resolution);
    Ok(())
}

fn awaiting_name(awaiting: &Awaiting) -> &'static str {
    match awaiting {
        Awaiting::May(_) => "yes/no",
        Awaiting::Mode(_) => "mode",
        Awaiting::Color => "color",
        Awaiting::Number => "number",
        Awaiting::CreatureType => "creature type",
        Awaiting::Objects | Awaiting::Search { .. } | Awaiting::Discard | Awaiting::Sacrifice => "selection",
        Awaiting::Distribute { .. } => "distribution",
    }
}

fn finish(state: &mut GameState, resolution: Resolution) -> RulesResult<()> {
    let object = resolution.object;
    if let StackObjectKind::Spell { face_down } = object.kind {
        let card = object.id;
        let (owner, permanent, aura) = {
            let card_object = state
                .objects
                .get(&card)
                .ok_or_else(|| RulesError::inconsistent(format!("spell {card} has no card")))?;
            (
                card_object.owner,
                face_down || card_object.definition.is_permanent(),
                card_object.definition.is_aura(),
            )
        };
        if state.zones.get_zone(card) == Some(ZoneId::stack()) {
            let change = if permanent {
                let mut change = ZoneChange::new(card, ZoneId::battlefield()).under(object.controller);
                change.face_down = face_down;
                if aura && !face_down {
                    change.attach_to = object.targets.first().and_then(|g| g.first()).and_then(|t| t.object());
                }
                change
            } else {
                ZoneChange::new(card, ZoneId::graveyard(owner))
            };
            replacement::enqueue(state, Proposal::new(ProposedEvent::ZoneChange(change)));
        }
    }
    debug!(target: "engine.resolve", object = %object.id, "resolved");
    if !resolution.mana_ability {
        state.stack.grant(state.turn.active_player);
    }
    Ok(())
}

// === Selectors ===

fn still_legal(state: &GameState, view: &ProjectedView, object: &StackObject, spec: &TargetSpec, target: Target) -> bool {
    if let Target::Object(entity) = target {
        let moved = state
            .components
            .zone_timestamp(entity)
            .map_or(true, |ts| ts > object.timestamp);
        if moved {
            return false;
        }
    }
    TargetRules::is_legal(state, view, spec, target, object.source, object.controller)
}

fn current_targets(state: &GameState, view: &ProjectedView, object: &StackObject, group: usize) -> Vec<Target> {
    let (Some(spec), Some(targets)) = (object.target_specs.get(group), object.targets.get(group)) else {
        return Vec::new();
    };
    targets
        .iter()
        .copied()
        .filter(|t| still_legal(state, view, object, spec, *t))
        .collect()
}

fn host_of(state: &GameState, object: &StackObject) -> Option<EntityId> {
    state
        .components
        .attached_to(object.source)
        .or_else(|| object.source_snapshot.as_ref().and_then(|s| s.attached_to))
}

fn select_targets(state: &GameState, view: &ProjectedView, res: &Resolution, selector: &Selector) -> Vec<Target> {
    let object = &res.object;
    match selector {
        Selector::Source => vec![Target::Object(object.source)],
        Selector::Targets(group) => current_targets(state, view, object, *group),
        Selector::Host => host_of(state, object).map(Target::Object).into_iter().collect(),
        Selector::TriggeringObject => object
            .trigger_event
            .as_ref()
            .and_then(GameEvent::object)
            .map(Target::Object)
            .into_iter()
            .collect(),
        Selector::All(filter) => filter
            .matching(view, &FilterContext::new(object.controller, Some(object.source)))
            .into_iter()
            .map(Target::Object)
            .collect(),
        Selector::Chosen => res.bindings.chosen.iter().copied().map(Target::Object).collect(),
    }
}

fn select_objects(state: &GameState, view: &ProjectedView, res: &Resolution, selector: &Selector) -> Vec<EntityId> {
    select_targets(state, view, res, selector)
        .into_iter()
        .filter_map(Target::object)
        .collect()
}

fn select_players(state: &GameState, view: &ProjectedView, res: &Resolution, selector: &PlayerSelector) -> Vec<PlayerId> {
    let object = &res.object;
    let players: Vec<PlayerId> = match selector {
        PlayerSelector::You => vec![object.controller],
        PlayerSelector::Targets(group) => current_targets(state, view, object, *group)
            .into_iter()
            .filter_map(Target::player)
            .collect(),
        PlayerSelector::EachOpponent => state
            .seats_from(object.controller)
            .into_iter()
            .filter(|p| *p != object.controller)
            .collect(),
        PlayerSelector::EachPlayer => state.apnap_order(),
        PlayerSelector::Active => vec![state.turn.active_player],
        PlayerSelector::ControllerOfTargets(group) => {
            let mut controllers = Vec::new();
            for entity in current_targets(state, view, object, *group).into_iter().filter_map(Target::object) {
                if let Some(controller) = view.controller(entity) {
                    if !controllers.contains(&controller) {
                        controllers.push(controller);
                    }
                }
            }
            controllers
        }
        PlayerSelector::TriggeringPlayer => object
            .trigger_event
            .as_ref()
            .and_then(GameEvent::player)
            .into_iter()
            .collect(),
        PlayerSelector::ControllerOfTriggeringObject => object
            .trigger_event
            .as_ref()
            .and_then(|event| {
                if let GameEvent::DamageDealt { source_controller, .. } = event {
                    return Some(*source_controller);
                }
                event
                    .last_known()
                    .map(|lki| lki.characteristics.controller)
                    .or_else(|| event.object().and_then(|e| state.controller_of(e)))
            })
            .into_iter()
            .collect(),
        PlayerSelector::Player(player) => vec![*player],
    };
    players
        .into_iter()
        .filter(|p| p.index() < state.player_count() && state.players[*p].is_active())
        .collect()
}

fn amount(state: &GameState, view: &ProjectedView, res: &Resolution, amount: &Amount) -> i32 {
    let object = &res.object;
    match amount {
        Amount::Fixed(n) => *n,
        Amount::X => i32::try_from(object.x).unwrap_or(i32::MAX),
        Amount::ChosenNumber => res.bindings.number.and_then(|n| i32::try_from(n).ok()).unwrap_or(0),
        Amount::CountOf(filter) => {
            let count = filter
                .matching(view, &FilterContext::new(object.controller, Some(object.source)))
                .len();
            i32::try_from(count).unwrap_or(i32::MAX)
        }
        Amount::SourcePower => match view.get(object.source).filter(|ch| ch.on_battlefield()) {
            Some(ch) => ch.power.unwrap_or(0),
            None => object
                .source_snapshot
                .as_ref()
                .and_then(|s| s.characteristics.power)
                .unwrap_or(0),
        },
        Amount::EventAmount => object
            .trigger_event
            .as_ref()
            .and_then(GameEvent::amount)
            .map_or(0, |n| i32::try_from(n).unwrap_or(i32::MAX)),
    }
}

fn count(state: &GameState, view: &ProjectedView, res: &Resolution, value: &Amount) -> u32 {
    u32::try_from(amount(state, view, res, value)).unwrap_or(0)
}

fn condition_holds(state: &GameState, view: &ProjectedView, res: &Resolution, condition: &EffectCondition) -> bool {
    let object = &res.object;
    match condition {
        EffectCondition::YouControl { filter, count } => {
            filter
                .clone()
                .you_control()
                .matching(view, &FilterContext::new(object.controller, Some(object.source)))
                .len()
                >= *count
        }
        EffectCondition::ChoseYes => res.bindings.answered_yes == Some(true),
        EffectCondition::SourceOnBattlefield => view.get(object.source).is_some_and(|ch| ch.on_battlefield()),
        EffectCondition::LifeAtMost(life) => state.players[object.controller].life <= *life,
        EffectCondition::TargetLegal(group) => !current_targets(state, view, object, *group).is_empty(),
        EffectCondition::Not(inner) => !condition_holds(state, view, res, inner),
    }
}

/// The source of damage dealt by this resolution: as it is now, or as it
/// last existed if it left the battlefield.
fn resolution_source(state: &GameState, view: &ProjectedView, object: &StackObject) -> DamageSource {
    let present = view
        .get(object.source)
        .is_some_and(|ch| ch.on_battlefield() || ch.zone == ZoneKind::Stack);
    match (&object.source_snapshot, present) {
        (Some(snapshot), false) => DamageSource {
            entity: object.source,
            controller: object.controller,
            colors: snapshot.characteristics.colors,
            deathtouch: snapshot.characteristics.has_keyword(&Keyword::Deathtouch),
            lifelink: snapshot.characteristics.has_keyword(&Keyword::Lifelink),
        },
        _ => {
            let mut source = actions::damage_source(state, view, object.source);
            source.controller = object.controller;
            source
        }
    }
}

// === Execution ===

fn propose_damage(state: &mut GameState, source: &DamageSource, target: Target, amount: u32) {
    if amount == 0 {
        return;
    }
    replacement::enqueue(
        state,
        Proposal::new(ProposedEvent::Damage(DamageEvent {
            source: source.clone(),
            target,
            amount,
            combat: false,
        })),
    );
}

fn propose_move(state: &mut GameState, entity: EntityId, zone: fn(PlayerId) -> ZoneId) {
    if let Some(owner) = state.objects.get(&entity).map(|o| o.owner) {
        replacement::enqueue(state, Proposal::new(ProposedEvent::ZoneChange(ZoneChange::new(entity, zone(owner)))));
    }
}

fn propose_graveyard(state: &mut GameState, entity: EntityId) {
    propose_move(state, entity, ZoneId::graveyard);
}

fn add_effect(state: &mut GameState, res: &Resolution, objects: Vec<EntityId>, modifications: Vec<Modification>, duration: Duration) {
    if objects.is_empty() {
        return;
    }
    let timestamp = state.next_timestamp();
    let effect = ContinuousEffect::new(res.object.controller, Affected::Objects(objects), modifications)
        .with_source(res.object.source)
        .with_duration(duration)
        .with_timestamp(timestamp)
        .with_turn(state.turn.turn_number);
    state.effects.add(effect);
}

fn ask(state: &mut GameState, res: &mut Resolution, player: PlayerId, kind: DecisionKind, awaiting: Awaiting) {
    res.awaiting = Some(awaiting);
    state.request_decision(player, kind, Continuation::Resolution);
}

fn execute(state: &mut GameState, res: &mut Resolution, effect: &Effect) -> RulesResult<()> {
    let view = project(state);
    let controller = res.object.controller;
    let source = res.object.source;

    match effect {
        // === Damage and life ===
        Effect::DealDamage { amount: value, to } => {
            let damage = count(state, &view, res, value);
            let source = resolution_source(state, &view, &res.object);
            for target in select_targets(state, &view, res, to) {
                propose_damage(state, &source, target, damage);
            }
        }
        Effect::DealDamageToPlayers { amount: value, to } => {
            let damage = count(state, &view, res, value);
            let source = resolution_source(state, &view, &res.object);
            for player in select_players(state, &view, res, to) {
                propose_damage(state, &source, Target::Player(player), damage);
            }
        }
        Effect::DistributeDamage { amount: total, group, min_each } => {
            let recipients = current_targets(state, &view, &res.object, *group);
            let source = resolution_source(state, &view, &res.object);
            match recipients.len() {
                0 => {}
                1 => propose_damage(state, &source, recipients[0], *total),
                _ => {
                    let kind = DecisionKind::Distribute {
                        amount: *total,
                        recipients: recipients.clone(),
                        min_each: *min_each,
                    };
                    ask(state, res, controller, kind, Awaiting::Distribute { recipients, source });
                }
            }
        }
        Effect::GainLife { player, amount: value } => {
            let n = count(state, &view, res, value);
            for p in select_players(state, &view, res, player) {
                actions::gain_life(state, p, n);
            }
        }
        Effect::LoseLife { player, amount: value } => {
            let n = count(state, &view, res, value);
            for p in select_players(state, &view, res, player) {
                actions::lose_life(state, p, n);
            }
        }
        Effect::GivePoison { player, amount: value } => {
            let n = count(state, &view, res, value);
            for p in select_players(state, &view, res, player) {
                actions::give_poison(state, p, n);
            }
        }
        Effect::PreventDamage { to, amount: shield, duration } => {
            let affects = select_targets(state, &view, res, to);
            if !affects.is_empty() {
                let timestamp = state.next_timestamp();
                state.replacements.add(ReplacementEffect {
                    id: ReplacementId(0),
                    source: Some(source),
                    controller,
                    affects,
                    kind: ReplacementKind::PreventDamage { amount: *shield },
                    duration: *duration,
                    timestamp,
                    created_turn: state.turn.turn_number,
                });
            }
        }

        // === Cards ===
        Effect::DrawCards { player, amount: value } => {
            let n = count(state, &view, res, value);
            for p in select_players(state, &view, res, player) {
                actions::draw_cards(state, p, n)?;
            }
        }
        Effect::Discard { player, amount: value } => {
            let n = count(state, &view, res, value);
            let players = select_players(state, &view, res, player);
            if let [player] = players.as_slice() {
                let hand: Vec<EntityId> = state.zones.cards_in_zone(ZoneId::hand(*player)).into_iter().collect();
                let n = (n as usize).min(hand.len());
                if n == hand.len() {
                    for card in hand {
                        actions::discard(state, card);
                    }
                } else if n > 0 {
                    let kind = DecisionKind::SelectFromSet {
                        options: hand,
                        min: n,
                        max: n,
                    };
                    ask(state, res, *player, kind, Awaiting::Discard);
                }
            } else {
                let each = players
                    .into_iter()
                    .map(|p| Effect::Discard {
                        player: PlayerSelector::Player(p),
                        amount: Amount::Fixed(i32::try_from(n).unwrap_or(i32::MAX)),
                    })
                    .collect();
                res.frames.push(Frame::new(each));
            }
        }
        Effect::SearchLibrary { filter, count: up_to, to } => {
            res.frames.push(Frame::new(vec![Effect::Shuffle {
                player: PlayerSelector::You,
            }]));
            let filter = filter.clone().in_zone(Some(ZoneKind::Library));
            let ctx = FilterContext::new(controller, Some(source));
            let library = ZoneId::library(controller);
            let options: Vec<EntityId> = state
                .zones
                .cards_in_zone(library)
                .into_iter()
                .filter(|card| view.get(*card).is_some_and(|ch| filter.matches(*card, ch, &ctx)))
                .collect();
            if !options.is_empty() && *up_to > 0 {
                let max = (*up_to as usize).min(options.len());
                let kind = DecisionKind::SelectFromSet { options, min: 0, max };
                ask(
                    state,
                    res,
                    controller,
                    kind,
                    Awaiting::Search {
                        player: controller,
                        to: *to,
                    },
                );
            }
        }
        Effect::Shuffle { player } => {
            for p in select_players(state, &view, res, player) {
                actions::shuffle(state, p);
            }
        }

        // === Counters ===
        Effect::AddCounters { to, counter, amount: value } => {
            let n = count(state, &view, res, value);
            for entity in select_objects(state, &view, res, to) {
                actions::add_counters(state, entity, counter.clone(), n);
            }
        }
        Effect::RemoveCounters { from, counter, amount: value } => {
            let n = count(state, &view, res, value);
            for entity in select_objects(state, &view, res, from) {
                actions::remove_counters(state, entity, counter.clone(), n);
            }
        }

        // === Zone changes ===
        Effect::Destroy(selector) => {
            for entity in select_objects(state, &view, res, selector) {
                let destroyable = view
                    .get(entity)
                    .is_some_and(|ch| ch.on_battlefield() && !ch.has_keyword(&Keyword::Indestructible));
                if destroyable {
                    propose_graveyard(state, entity);
                }
            }
        }
        Effect::Exile(selector) => {
            for entity in select_objects(state, &view, res, selector) {
                if view.get(entity).is_some_and(|ch| ch.zone != ZoneKind::Stack) {
                    propose_move(state, entity, ZoneId::exile);
                }
            }
        }
        Effect::ReturnToHand(selector) => {
            for entity in select_objects(state, &view, res, selector) {
                if view.get(entity).is_some_and(|ch| ch.zone != ZoneKind::Stack) {
                    propose_move(state, entity, ZoneId::hand);
                }
            }
        }
        Effect::Sacrifice { player, filter, count: n } => {
            let players = select_players(state, &view, res, player);
            if let [player] = players.as_slice() {
                let ctx = FilterContext::new(*player, Some(source));
                let candidates: Vec<EntityId> = filter
                    .matching(&view, &ctx)
                    .into_iter()
                    .filter(|e| view.controller(*e) == Some(*player) && view.get(*e).is_some_and(|c| c.on_battlefield()))
                    .collect();
                let n = *n as usize;
                if candidates.len() <= n {
                    for entity in candidates {
                        propose_graveyard(state, entity);
                    }
                } else if n > 0 {
                    let kind = DecisionKind::SelectFromSet {
                        options: candidates,
                        min: n,
                        max: n,
                    };
                    ask(state, res, *player, kind, Awaiting::Sacrifice);
                }
            } else {
                let each = players
                    .into_iter()
                    .map(|p| Effect::Sacrifice {
                        player: PlayerSelector::Player(p),
                        filter: filter.clone(),
                        count: *n,
                    })
                    .collect();
                res.frames.push(Frame::new(each));
            }
        }
        Effect::SacrificeObjects(selector) => {
            for entity in select_objects(state, &view, res, selector) {
                if view.get(entity).is_some_and(|ch| ch.on_battlefield()) {
                    propose_graveyard(state, entity);
                }
            }
        }
        Effect::CreateTokens { token, count: value, controller: who } => {
            let n = count(state, &view, res, value);
            for player in select_players(state, &view, res, who) {
                for _ in 0..n {
                    actions::create_token(state, player, token.clone())?;
                }
            }
        }
        Effect::CounterSpell(selector) => {
            for entity in select_objects(state, &view, res, selector) {
                actions::counter_spell(state, entity);
            }
        }

        // === Permanent status ===
        Effect::Tap(selector) => {
            for entity in select_objects(state, &view, res, selector) {
                actions::tap(state, entity);
            }
        }
        Effect::Untap(selector) => {
            for entity in select_objects(state, &view, res, selector) {
                actions::untap(state, entity);
            }
        }
        Effect::Attach { object, to } => {
            let attachment = select_objects(state, &view, res, object).into_iter().next();
            let host = select_objects(state, &view, res, to).into_iter().next();
            if let (Some(attachment), Some(host)) = (attachment, host) {
                let both_present = [attachment, host]
                    .iter()
                    .all(|e| view.get(*e).is_some_and(|ch| ch.on_battlefield()));
                if both_present {
                    actions::attach(state, attachment, host);
                }
            }
        }

        // === Continuous effects ===
        Effect::Pump {
            to,
            power,
            toughness,
            duration,
        } => {
            let objects = select_objects(state, &view, res, to);
            let modification = Modification::ModifyPowerToughness {
                power: *power,
                toughness: *toughness,
            };
            add_effect(state, res, objects, vec![modification], *duration);
        }
        Effect::ApplyContinuous {
            to,
            modifications,
            duration,
        } => {
            let objects = select_objects(state, &view, res, to);
            add_effect(state, res, objects, modifications.clone(), *duration);
        }
        Effect::GainControl { of, duration } => {
            let objects = select_objects(state, &view, res, of);
            for entity in &objects {
                if view.controller(*entity) != Some(controller) {
                    state.components.set_controlled_since(*entity, state.turn.turn_number);
                }
            }
            add_effect(state, res, objects, vec![Modification::SetController(controller)], *duration);
        }
        Effect::GrantAbility { to, ability, duration } => {
            for entity in select_objects(state, &view, res, to) {
                state.components.grant(
                    entity,
                    GrantedAbility {
                        ability: (**ability).clone(),
                        source: Some(source),
                        expiry: *duration,
                        grantor: controller,
                        created_turn: state.turn.turn_number,
                    },
                );
            }
        }
        Effect::BecomeChosenColor { to, duration } => {
            if let Some(color) = res.bindings.color {
                let objects = select_objects(state, &view, res, to);
                add_effect(
                    state,
                    res,
                    objects,
                    vec![Modification::SetColors(ColorSet::single(color))],
                    *duration,
                );
            }
        }
        Effect::AddChosenCreatureType { to, duration } => {
            if let Some(subtype) = res.bindings.creature_type.clone() {
                let objects = select_objects(state, &view, res, to);
                add_effect(state, res, objects, vec![Modification::AddSubtypes(vec![subtype])], *duration);
            }
        }

        // === Mana ===
        Effect::AddMana { mana, amount: n } => actions::add_mana(state, controller, *mana, *n),
        Effect::AddManaOfChosenColor { amount: n } => {
            if let Some(color) = res.bindings.color {
                actions::add_mana(state, controller, ManaType::of_color(color), *n);
            }
        }

        // === Choices and control flow ===
        Effect::May { effects } => {
            ask(state, res, controller, DecisionKind::YesNo { source }, Awaiting::May(effects.clone()));
        }
        Effect::ChooseMode { modes } => match modes.len() {
            0 => {}
            1 => res.frames.push(Frame::new(modes[0].clone())),
            n => ask(state, res, controller, DecisionKind::ChooseMode { modes: n }, Awaiting::Mode(modes.clone())),
        },
        Effect::ChooseColor => ask(state, res, controller, DecisionKind::ChooseColor, Awaiting::Color),
        Effect::ChooseNumber { min, max } => ask(
            state,
            res,
            controller,
            DecisionKind::ChooseNumber { min: *min, max: *max },
            Awaiting::Number,
        ),
        Effect::ChooseCreatureType => ask(
            state,
            res,
            controller,
            DecisionKind::ChooseCreatureType,
            Awaiting::CreatureType,
        ),
        Effect::ChooseObjects { filter, min, max } => {
            let options = choose_options(&view, res, filter);
            let (min, max) = (*min as usize, *max as usize);
            if options.len() <= min {
                res.bindings.chosen = options;
            } else {
                let kind = DecisionKind::SelectFromSet {
                    max: max.min(options.len()),
                    options,
                    min,
                };
                ask(state, res, controller, kind, Awaiting::Objects);
            }
        }
        Effect::If {
            condition,
            then,
            otherwise,
        } => {
            let branch = if condition_holds(state, &view, res, condition) {
                then
            } else {
                otherwise
            };
            if !branch.is_empty() {
                res.frames.push(Frame::new(branch.clone()));
            }
        }

        // === Triggers ===
        Effect::CreateDelayedTrigger { condition, effects } => {
            let id = state.delayed_triggers.register(DelayedTrigger {
                id: DelayedTriggerId(0),
                source,
                controller,
                condition: condition.clone(),
                effects: effects.clone(),
                created_turn: state.turn.turn_number,
            });
            debug!(target: "engine.triggers", id = %id, source = %source, "delayed trigger created");
        }
    }
    Ok(())
}

fn choose_options(view: &ProjectedView, res: &Resolution, filter: &ObjectFilter) -> Vec<EntityId> {
    filter.matching(view, &FilterContext::new(res.object.controller, Some(res.object.source)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardDefinition;
    use crate::core::{GameConfig, Timestamp};
    use crate::effects::CostRecord;
    use smallvec::smallvec;
    use std::sync::Arc;

    fn setup() -> (GameState, EntityId, EntityId) {
        let mut state = GameState::new(GameConfig::new(2));
        let shock = state
            .create_object(
                PlayerId::new(0),
                Arc::new(CardDefinition::instant("Shock", "R")),
                ZoneId::stack(),
                false,
            )
            .unwrap();
        let bear = state
            .create_object(
                PlayerId::new(1),
                Arc::new(CardDefinition::creature("Bear", "1G", 2, 2)),
                ZoneId::battlefield(),
                false,
            )
            .unwrap();
        (state, shock, bear)
    }

    fn spell(state: &mut GameState, card: EntityId, targets: Vec<Target>, effects: Vec<Effect>) -> StackObject {
        let timestamp = state.next_timestamp();
        StackObject {
            id: card,
            kind: StackObjectKind::Spell { face_down: false },
            source: card,
            controller: PlayerId::new(0),
            target_specs: if targets.is_empty() {
                Vec::new()
            } else {
                vec![TargetSpec::any_target().count(1, targets.len())]
            },
            targets: if targets.is_empty() {
                Vec::new()
            } else {
                vec![targets.into_iter().collect()]
            },
            effects,
            x: 0,
            costs: CostRecord::default(),
            source_snapshot: None,
            trigger_event: None,
            timestamp,
        }
    }

    /// Drive a resolution with no decisions to completion.
    fn run(state: &mut GameState) {
        loop {
            replacement::drain(state).unwrap();
            if state.resolving.is_none() && state.actions.is_empty() {
                break;
            }
            advance(state).unwrap();
        }
    }

    #[test]
    fn test_damage_spell_resolves_and_goes_to_graveyard() {
        let (mut state, shock, bear) = setup();
        let object = spell(
            &mut state,
            shock,
            vec![Target::Object(bear)],
            vec![Effect::deal_damage(2, Selector::Targets(0))],
        );
        begin(&mut state, object, false).unwrap();
        run(&mut state);
        assert_eq!(state.components.damage(bear), 2);
        assert_eq!(state.zones.get_zone(shock), Some(ZoneId::graveyard(PlayerId::new(0))));
    }

    #[test]
    fn test_fizzles_when_target_changed_zones() {
        let (mut state, shock, bear) = setup();
        let object = spell(
            &mut state,
            shock,
            vec![Target::Object(bear)],
            vec![Effect::deal_damage(2, Selector::Targets(0))],
        );
        actions::move_object(&mut state, &ZoneChange::new(bear, ZoneId::hand(PlayerId::new(1)))).unwrap();
        actions::move_object(&mut state, &ZoneChange::new(bear, ZoneId::battlefield())).unwrap();

        begin(&mut state, object, false).unwrap();
        run(&mut state);
        assert_eq!(state.components.damage(bear), 0);
        assert!(state.events.iter().any(|e| matches!(e, GameEvent::Fizzled { .. })));
        assert_eq!(state.zones.get_zone(shock), Some(ZoneId::graveyard(PlayerId::new(0))));
    }

    #[test]
    fn test_partial_fizzle_keeps_legal_targets() {
        let (mut state, shock, bear) = setup();
        let object = spell(
            &mut state,
            shock,
            vec![Target::Object(bear), Target::Player(PlayerId::new(1))],
            vec![Effect::deal_damage(1, Selector::Targets(0))],
        );
        actions::move_object(&mut state, &ZoneChange::new(bear, ZoneId::hand(PlayerId::new(1)))).unwrap();
        begin(&mut state, object, false).unwrap();
        run(&mut state);
        assert_eq!(state.players[PlayerId::new(1)].life, 19);
    }

    #[test]
    fn test_may_suspends_and_resumes() {
        let (mut state, shock, _) = setup();
        let object = spell(
            &mut state,
            shock,
            Vec::new(),
            vec![
                Effect::May {
                    effects: vec![Effect::gain_life(3)],
                },
                Effect::gain_life(1),
            ],
        );
        begin(&mut state, object, false).unwrap();
        advance(&mut state).unwrap();
        let pending = state.pending_decision.take().unwrap();
        assert!(matches!(pending.decision.kind, DecisionKind::YesNo { .. }));
        assert_eq!(state.players[PlayerId::new(0)].life, 20);

        resume(&mut state, DecisionResponse::YesNo(true)).unwrap();
        run(&mut state);
        assert_eq!(state.players[PlayerId::new(0)].life, 24);
    }

    #[test]
    fn test_chosen_color_binding() {
        let (mut state, shock, bear) = setup();
        let object = spell(
            &mut state,
            shock,
            vec![Target::Object(bear)],
            vec![
                Effect::ChooseColor,
                Effect::BecomeChosenColor {
                    to: Selector::Targets(0),
                    duration: Duration::EndOfTurn,
                },
            ],
        );
        begin(&mut state, object, false).unwrap();
        advance(&mut state).unwrap();
        state.pending_decision = None;
        resume(&mut state, DecisionResponse::Color(Color::Blue)).unwrap();
        run(&mut state);
        assert_eq!(project(&state).colors(bear), ColorSet::single(Color::Blue));
    }

    #[test]
    fn test_destroy_respects_indestructible() {
        let (mut state, shock, bear) = setup();
        let wall = state
            .create_object(
                PlayerId::new(1),
                Arc::new(CardDefinition::creature("Wall", "2", 0, 4).with_keyword(Keyword::Indestructible)),
                ZoneId::battlefield(),
                false,
            )
            .unwrap();
        let object = spell(
            &mut state,
            shock,
            Vec::new(),
            vec![Effect::Destroy(Selector::All(ObjectFilter::creature()))],
        );
        begin(&mut state, object, false).unwrap();
        run(&mut state);
        assert_eq!(state.zones.get_zone(bear), Some(ZoneId::graveyard(PlayerId::new(1))));
        assert_eq!(state.zones.get_zone(wall), Some(ZoneId::battlefield()));
    }

    #[test]
    fn test_distribute_asks_when_several_recipients() {
        let (mut state, shock, bear) = setup();
        let object = spell(
            &mut state,
            shock,
            vec![Target::Object(bear), Target::Player(PlayerId::new(1))],
            vec![Effect::DistributeDamage {
                amount: 3,
                group: 0,
                min_each: 1,
            }],
        );
        begin(&mut state, object, false).unwrap();
        advance(&mut state).unwrap();
        let pending = state.pending_decision.take().unwrap();
        assert!(matches!(pending.decision.kind, DecisionKind::Distribute { amount: 3, .. }));

        resume(&mut state, DecisionResponse::Distribution(vec![1, 2])).unwrap();
        run(&mut state);
        assert_eq!(state.components.damage(bear), 1);
        assert_eq!(state.players[PlayerId::new(1)].life, 18);
    }

    #[test]
    fn test_resolution_state_serializes() {
        let (mut state, shock, bear) = setup();
        let mut object = spell(&mut state, shock, vec![Target::Object(bear)], vec![Effect::ChooseColor]);
        object.targets = vec![smallvec![Target::Object(bear)]];
        object.timestamp = Timestamp(u64::MAX);
        begin(&mut state, object, false).unwrap();
        advance(&mut state).unwrap();
        let bytes = bincode::serialize(&state).unwrap();
        let back: GameState = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back.resolving, state.resolving);
        assert!(back.pending_decision.is_some());
    }
}
