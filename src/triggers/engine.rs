//! Trigger collection and placement.
//!
//! [`TriggerEngine::observe`] runs as each event is emitted and records
//! every battlefield ability or delayed trigger whose condition matched as a
//! [`PendingTrigger`], so only permanents present at that moment can
//! trigger. [`TriggerEngine::collect`] later scans the batch for "dies" and
//! "leaves" abilities of objects that left the battlefield, using their
//! last-known state.
//!
//! [`TriggerEngine::place`] runs when a player would receive priority. It
//! puts pending triggers on the stack in APNAP order: all of the active
//! player's triggers first (so they resolve last), then each other player's
//! in turn order. A player with several simultaneous triggers orders them
//! through a decision; the first one listed goes on the stack first.

use im::Vector;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::condition::{ConditionEvaluator, TriggerContext};
use super::event::{GameEvent, LastKnown};
use super::registry::DelayedTriggerId;
use crate::core::{EntityId, GameState, PlayerId, RulesResult, Timestamp};
use crate::decision::{Continuation, DecisionKind};
use crate::effects::{CostRecord, Effect, Target, TargetGroup, TargetRules, TargetSpec};
use crate::layers::{object_abilities, project};
use crate::stack::{StackObject, StackObjectKind};

/// Where a triggered ability came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerOrigin {
    /// Ability `index` of the source.
    Ability { index: usize },
    Delayed(DelayedTriggerId),
}

/// A triggered ability waiting to be put on the stack.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTrigger {
    pub source: EntityId,
    pub controller: PlayerId,
    pub origin: TriggerOrigin,
    pub targets: Vec<TargetSpec>,
    pub effects: Vec<Effect>,
    pub optional: bool,
    /// The event that triggered it.
    pub event: GameEvent,
    /// The source at trigger time.
    pub source_snapshot: Option<LastKnown>,
    pub timestamp: Timestamp,
    /// The controller already put it in order with its siblings.
    pub ordered: bool,
}

/// Trigger collection and placement.
pub struct TriggerEngine;

fn returned(events: &[GameEvent], entity: EntityId) -> bool {
    events
        .iter()
        .any(|e| e.entered_battlefield() && e.object() == Some(entity))
}

impl TriggerEngine {
    /// Match battlefield abilities and delayed triggers against the event
    /// that was just emitted, with the board as it stood at that moment.
    pub fn observe(state: &mut GameState) {
        let Some(event) = state.events.back().cloned() else {
            return;
        };
        let view = project(state);
        let mut found = Vec::new();
        for (source, ch) in view.battlefield() {
            let host = state.components.attached_to(source);
            for (index, ability) in object_abilities(state, source, ch).into_iter().enumerate() {
                let Some(triggered) = ability.as_triggered() else {
                    continue;
                };
                let ctx = TriggerContext {
                    view: &view,
                    event: &event,
                    source,
                    host,
                    controller: ch.controller,
                };
                if ConditionEvaluator::matches(&triggered.condition, &ctx) {
                    found.push(PendingTrigger {
                        source,
                        controller: ch.controller,
                        origin: TriggerOrigin::Ability { index },
                        targets: triggered.targets.clone(),
                        effects: triggered.effects.clone(),
                        optional: triggered.optional,
                        event: event.clone(),
                        source_snapshot: LastKnown::capture(state, &view, source),
                        timestamp: Timestamp::default(),
                        ordered: false,
                    });
                }
            }
        }

        let mut fired = Vec::new();
        for delayed in state.delayed_triggers.candidates(event.kind()) {
            let ctx = TriggerContext {
                view: &view,
                event: &event,
                source: delayed.source,
                host: state.components.attached_to(delayed.source),
                controller: delayed.controller,
            };
            if ConditionEvaluator::matches(&delayed.condition, &ctx) {
                fired.push(delayed.id);
                found.push(PendingTrigger {
                    source: delayed.source,
                    controller: delayed.controller,
                    origin: TriggerOrigin::Delayed(delayed.id),
                    targets: Vec::new(),
                    effects: delayed.effects.clone(),
                    optional: false,
                    event: event.clone(),
                    source_snapshot: LastKnown::capture(state, &view, delayed.source),
                    timestamp: Timestamp::default(),
                    ordered: false,
                });
            }
        }
        for id in fired {
            state.delayed_triggers.remove(id);
        }
        Self::record(state, found);
    }

    /// Record look-back triggers for events logged since the last call.
    ///
    /// An object that left the battlefield sees its own departure and every
    /// later departure in the batch through its last-known abilities, until
    /// it returns to the battlefield. Earlier events were already matched
    /// by [`observe`](Self::observe) while it was still there.
    pub fn collect(state: &mut GameState) {
        if state.trigger_cursor >= state.events.len() {
            return;
        }
        let batch: Vec<GameEvent> = state.events.iter().skip(state.trigger_cursor).cloned().collect();
        state.trigger_cursor = state.events.len();

        let view = project(state);
        let departures: Vec<(usize, &LastKnown)> = batch
            .iter()
            .enumerate()
            .filter(|(_, e)| e.left_battlefield())
            .filter_map(|(i, e)| e.last_known().map(|lki| (i, lki)))
            .collect();

        let mut found = Vec::new();
        for (at, event) in batch.iter().enumerate().filter(|(_, e)| e.left_battlefield()) {
            for &(left, lki) in &departures {
                if left > at || returned(&batch[left + 1..=at], lki.entity) {
                    continue;
                }
                for (index, ability) in lki.abilities.iter().enumerate() {
                    let Some(triggered) = ability.as_triggered() else {
                        continue;
                    };
                    if !triggered.condition.looks_back() {
                        continue;
                    }
                    let controller = lki.characteristics.controller;
                    let ctx = TriggerContext {
                        view: &view,
                        event,
                        source: lki.entity,
                        host: lki.attached_to,
                        controller,
                    };
                    if ConditionEvaluator::matches(&triggered.condition, &ctx) {
                        found.push(PendingTrigger {
                            source: lki.entity,
                            controller,
                            origin: TriggerOrigin::Ability { index },
                            targets: triggered.targets.clone(),
                            effects: triggered.effects.clone(),
                            optional: triggered.optional,
                            event: event.clone(),
                            source_snapshot: Some(lki.clone()),
                            timestamp: Timestamp::default(),
                            ordered: false,
                        });
                    }
                }
            }
        }
        Self::record(state, found);
    }

    fn record(state: &mut GameState, found: Vec<PendingTrigger>) {
        for mut trigger in found {
            trigger.timestamp = state.next_timestamp();
            trace!(target: "engine.triggers", source = %trigger.source, controller = %trigger.controller, "triggered");
            state.pending_triggers.push_back(trigger);
        }
    }

    /// Put pending triggers on the stack. Returns `true` if a decision
    /// (ordering or targets) suspended placement.
    pub fn place(state: &mut GameState) -> RulesResult<bool> {
        loop {
            let order = state.apnap_order();
            state.pending_triggers.retain(|t| order.contains(&t.controller));
            let Some(player) = order
                .iter()
                .copied()
                .find(|p| state.pending_triggers.iter().any(|t| t.controller == *p))
            else {
                return Ok(false);
            };

            let mine: Vec<usize> = state
                .pending_triggers
                .iter()
                .enumerate()
                .filter(|(_, t)| t.controller == player)
                .map(|(i, _)| i)
                .collect();
            if mine.len() > 1 && mine.iter().any(|&i| !state.pending_triggers[i].ordered) {
                let items = mine.iter().map(|&i| state.pending_triggers[i].source).collect();
                state.request_decision(player, DecisionKind::Order { items }, Continuation::TriggerOrder { player });
                return Ok(true);
            }

            let trigger = state.pending_triggers.remove(mine[0]);
            if trigger.targets.is_empty() {
                Self::push(state, trigger, Vec::new());
                continue;
            }

            let view = project(state);
            let legal: Vec<Vec<Target>> = trigger
                .targets
                .iter()
                .map(|spec| TargetRules::legal_targets(state, &view, spec, trigger.source, trigger.controller))
                .collect();
            if trigger.targets.iter().zip(&legal).any(|(spec, l)| l.len() < spec.min) {
                debug!(target: "engine.triggers", source = %trigger.source, "trigger removed: no legal targets");
                continue;
            }
            state.request_decision(
                player,
                DecisionKind::ChooseTargets {
                    source: trigger.source,
                    specs: trigger.targets.clone(),
                    legal,
                },
                Continuation::TriggerTargets(trigger),
            );
            return Ok(true);
        }
    }

    /// Apply `player`'s ordering of their pending triggers.
    pub fn resume_order(state: &mut GameState, player: PlayerId, order: &[usize]) {
        let (mine, others): (Vector<PendingTrigger>, Vector<PendingTrigger>) =
            state.pending_triggers.iter().cloned().partition(|t| t.controller == player);
        let mut reordered = others;
        for &index in order {
            if let Some(trigger) = mine.get(index) {
                let mut trigger = trigger.clone();
                trigger.ordered = true;
                reordered.push_back(trigger);
            }
        }
        state.pending_triggers = reordered;
    }

    /// Put a trigger whose targets were just chosen on the stack.
    pub fn resume_targets(state: &mut GameState, trigger: PendingTrigger, targets: Vec<TargetGroup>) {
        Self::push(state, trigger, targets);
    }

    fn push(state: &mut GameState, trigger: PendingTrigger, targets: Vec<TargetGroup>) {
        let effects = if trigger.optional {
            vec![Effect::May {
                effects: trigger.effects,
            }]
        } else {
            trigger.effects
        };
        let object = StackObject {
            id: state.allocate_entity(),
            kind: StackObjectKind::Triggered { origin: trigger.origin },
            source: trigger.source,
            controller: trigger.controller,
            target_specs: trigger.targets,
            targets,
            effects,
            x: 0,
            costs: CostRecord::default(),
            source_snapshot: trigger.source_snapshot,
            trigger_event: Some(trigger.event),
            timestamp: state.next_timestamp(),
        };
        debug!(target: "engine.triggers", source = %object.source, controller = %object.controller, "trigger put on the stack");
        state.stack.push(object);
        state.stack.grant(state.turn.active_player);
    }
}
