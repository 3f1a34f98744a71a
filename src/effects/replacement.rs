//! Replacement effects and the proposed-event pipeline.
//!
//! Damage and zone changes are not applied directly. They are first
//! *proposed*; every replacement effect that applies to the proposal and has
//! not modified it yet may rewrite it, one at a time, until none is left.
//! Only then is the (possibly changed, possibly cancelled) event applied.
//!
//! When more than one replacement applies, the affected object's controller
//! (or the affected player) chooses which goes first through a
//! `ChooseReplacement` decision. Proposals made by state-based actions and
//! cost payment choose automatically in timestamp order.

use im::OrdMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::actions;
use super::targeting::{FilterContext, PlayerRelation, Subject, Target};
use crate::cards::{AbilityDef, ColorSet, StaticAbility};
use crate::core::{CounterType, EntityId, GameState, PlayerId, RulesResult, Timestamp};
use crate::decision::{Continuation, DecisionKind};
use crate::layers::{object_abilities, project, Duration, ProjectedView};
use crate::triggers::GameEvent;
use crate::zones::{ZoneId, ZoneKind, ZonePosition};

/// What a replacement effect does.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplacementKind {
    /// Prevent damage; `None` prevents all of it, `Some(n)` is a shield that
    /// prevents the next `n`.
    PreventDamage { amount: Option<u32> },
    /// Put that many counters on the object instead of dealing damage to it.
    DamageAsCounters { counter: CounterType },
    /// Exile instead of putting into a graveyard.
    ExileInsteadOfGraveyard,
    EntersTapped,
    EntersWithCounters { counter: CounterType, amount: u32 },
}

/// What a static replacement ability watches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplacementScope {
    Object(Subject),
    Player(PlayerRelation),
}

/// Identifier of a floating replacement effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReplacementId(pub u32);

/// Identity of a replacement across the lifetime of one proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReplacementKey {
    Floating(ReplacementId),
    /// Ability `index` of `source`.
    Static { source: EntityId, index: usize },
}

/// A replacement effect created by a resolving spell or ability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementEffect {
    pub id: ReplacementId,
    pub source: Option<EntityId>,
    pub controller: PlayerId,
    pub affects: Vec<Target>,
    pub kind: ReplacementKind,
    pub duration: Duration,
    pub timestamp: Timestamp,
    pub created_turn: u32,
}

/// Floating replacement effects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementArena {
    effects: OrdMap<ReplacementId, ReplacementEffect>,
    next_id: u32,
}

impl ReplacementArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mut effect: ReplacementEffect) -> ReplacementId {
        self.next_id += 1;
        let id = ReplacementId(self.next_id);
        effect.id = id;
        self.effects.insert(id, effect);
        id
    }

    #[must_use]
    pub fn get(&self, id: ReplacementId) -> Option<&ReplacementEffect> {
        self.effects.get(&id)
    }

    pub fn remove(&mut self, id: ReplacementId) -> Option<ReplacementEffect> {
        self.effects.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReplacementEffect> {
        self.effects.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Use up to `amount` of a prevention shield. Returns what it prevented.
    pub fn consume_shield(&mut self, id: ReplacementId, amount: u32) -> u32 {
        let Some(effect) = self.effects.get_mut(&id) else {
            return 0;
        };
        let ReplacementKind::PreventDamage { amount: Some(shield) } = &mut effect.kind else {
            return amount;
        };
        let prevented = (*shield).min(amount);
        *shield -= prevented;
        if *shield == 0 {
            self.effects.remove(&id);
        }
        prevented
    }

    fn retain(&mut self, mut keep: impl FnMut(&ReplacementEffect) -> bool) {
        let doomed: Vec<ReplacementId> = self.effects.values().filter(|e| !keep(e)).map(|e| e.id).collect();
        for id in doomed {
            self.effects.remove(&id);
        }
    }

    pub fn expire_end_of_turn(&mut self) {
        self.retain(|e| e.duration != Duration::EndOfTurn);
    }

    pub fn expire_for_source(&mut self, source: EntityId) {
        self.retain(|e| !(e.duration == Duration::WhileSourceOnBattlefield && e.source == Some(source)));
    }

    pub fn expire_at_turn_start(&mut self, player: PlayerId, turn: u32) {
        self.retain(|e| !(e.duration == Duration::UntilYourNextTurn && e.controller == player && e.created_turn < turn));
    }
}

/// The damage source as it was when the damage was proposed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageSource {
    pub entity: EntityId,
    pub controller: PlayerId,
    pub colors: ColorSet,
    pub deathtouch: bool,
    pub lifelink: bool,
}

/// Damage about to be dealt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageEvent {
    pub source: DamageSource,
    pub target: Target,
    pub amount: u32,
    pub combat: bool,
}

/// A zone change about to happen, with the modifications replacements may
/// make to how the object arrives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneChange {
    pub object: EntityId,
    pub to: ZoneId,
    pub position: ZonePosition,
    pub tapped: bool,
    pub counters: Vec<(CounterType, u32)>,
    /// Controller on the battlefield; owner when `None`.
    pub controller: Option<PlayerId>,
    pub face_down: bool,
    /// An Aura entering attached to this object.
    pub attach_to: Option<EntityId>,
}

impl ZoneChange {
    #[must_use]
    pub fn new(object: EntityId, to: ZoneId) -> Self {
        Self {
            object,
            to,
            position: ZonePosition::Top,
            tapped: false,
            counters: Vec::new(),
            controller: None,
            face_down: false,
            attach_to: None,
        }
    }

    #[must_use]
    pub fn at(mut self, position: ZonePosition) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn under(mut self, controller: PlayerId) -> Self {
        self.controller = Some(controller);
        self
    }
}

/// An event that replacement effects may modify.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposedEvent {
    Damage(DamageEvent),
    ZoneChange(ZoneChange),
}

/// A proposed event together with the replacements already applied to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub event: ProposedEvent,
    pub applied: Vec<ReplacementKey>,
    /// Choose among competing replacements by timestamp instead of asking.
    pub auto_choose: bool,
}

impl Proposal {
    #[must_use]
    pub fn new(event: ProposedEvent) -> Self {
        Self {
            event,
            applied: Vec::new(),
            auto_choose: false,
        }
    }

    #[must_use]
    pub fn automatic(event: ProposedEvent) -> Self {
        Self {
            auto_choose: true,
            ..Self::new(event)
        }
    }
}

/// A replacement that could apply to a proposal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub key: ReplacementKey,
    pub kind: ReplacementKind,
    pub timestamp: Timestamp,
}

/// Replacements that apply to `proposal` and have not been applied yet,
/// in timestamp order.
#[must_use]
pub fn candidates(state: &GameState, view: &ProjectedView, proposal: &Proposal) -> Vec<Candidate> {
    let mut out = Vec::new();

    for effect in state.replacements.iter() {
        let key = ReplacementKey::Floating(effect.id);
        if proposal.applied.contains(&key) || !kind_fits(&effect.kind, &proposal.event) {
            continue;
        }
        let hit = match &proposal.event {
            ProposedEvent::Damage(damage) => effect.affects.contains(&damage.target),
            ProposedEvent::ZoneChange(change) => effect.affects.contains(&Target::Object(change.object)),
        };
        if hit {
            out.push(Candidate {
                key,
                kind: effect.kind.clone(),
                timestamp: effect.timestamp,
            });
        }
    }

    for (source, ch) in view.battlefield() {
        let timestamp = state.components.zone_timestamp(source).unwrap_or_default();
        for (index, ability) in object_abilities(state, source, ch).into_iter().enumerate() {
            if let AbilityDef::Static(StaticAbility::Replacement { applies_to, kind }) = ability {
                let key = ReplacementKey::Static { source, index };
                if !proposal.applied.contains(&key)
                    && kind_fits(&kind, &proposal.event)
                    && scope_hits(state, view, &applies_to, source, ch.controller, &proposal.event)
                {
                    out.push(Candidate { key, kind, timestamp });
                }
            }
        }
    }

    // "This enters tapped" and similar abilities of the entering object.
    if let ProposedEvent::ZoneChange(change) = &proposal.event {
        if change.to.kind == ZoneKind::Battlefield && !change.face_down {
            if let Some(object) = state.objects.get(&change.object) {
                for (index, ability) in object.definition.abilities.iter().enumerate() {
                    if let AbilityDef::Static(StaticAbility::Replacement {
                        applies_to: ReplacementScope::Object(Subject::This),
                        kind,
                    }) = ability
                    {
                        let key = ReplacementKey::Static {
                            source: change.object,
                            index,
                        };
                        let on_battlefield = view.get(change.object).is_some_and(|c| c.on_battlefield());
                        if !on_battlefield && !proposal.applied.contains(&key) && kind_fits(kind, &proposal.event) {
                            out.push(Candidate {
                                key,
                                kind: kind.clone(),
                                timestamp: Timestamp::default(),
                            });
                        }
                    }
                }
            }
        }
    }

    out.sort_by(|a, b| (a.timestamp, a.key).cmp(&(b.timestamp, b.key)));
    out
}

fn kind_fits(kind: &ReplacementKind, event: &ProposedEvent) -> bool {
    match (kind, event) {
        (ReplacementKind::PreventDamage { .. }, ProposedEvent::Damage(_)) => true,
        (ReplacementKind::DamageAsCounters { .. }, ProposedEvent::Damage(d)) => matches!(d.target, Target::Object(_)),
        (ReplacementKind::ExileInsteadOfGraveyard, ProposedEvent::ZoneChange(c)) => c.to.kind == ZoneKind::Graveyard,
        (ReplacementKind::EntersTapped | ReplacementKind::EntersWithCounters { .. }, ProposedEvent::ZoneChange(c)) => {
            c.to.kind == ZoneKind::Battlefield
        }
        _ => false,
    }
}

fn scope_hits(
    state: &GameState,
    view: &ProjectedView,
    scope: &ReplacementScope,
    source: EntityId,
    controller: PlayerId,
    event: &ProposedEvent,
) -> bool {
    let affected = match event {
        ProposedEvent::Damage(d) => d.target,
        ProposedEvent::ZoneChange(c) => Target::Object(c.object),
    };
    match (scope, affected) {
        (ReplacementScope::Player(relation), Target::Player(player)) => relation.matches(player, controller),
        (ReplacementScope::Object(subject), Target::Object(entity)) => {
            let Some(current) = view.get(entity) else {
                return false;
            };
            // Entering objects are judged as they would exist on the battlefield.
            let mut ch = current.clone();
            if let ProposedEvent::ZoneChange(change) = event {
                if change.to.kind == ZoneKind::Battlefield {
                    ch.zone = ZoneKind::Battlefield;
                    ch.controller = change.controller.unwrap_or(ch.owner);
                }
            }
            let host = state.components.attached_to(source);
            match subject {
                Subject::Matching(filter) => filter.matches(entity, &ch, &FilterContext::new(controller, Some(source))),
                other => other.matches(entity, &ch, source, host, controller),
            }
        }
        _ => false,
    }
}

/// The player who chooses among competing replacements.
#[must_use]
pub fn affected_player(state: &GameState, view: &ProjectedView, event: &ProposedEvent) -> PlayerId {
    let object = match event {
        ProposedEvent::Damage(DamageEvent {
            target: Target::Player(player),
            ..
        }) => return *player,
        ProposedEvent::Damage(DamageEvent {
            target: Target::Object(object),
            ..
        }) => *object,
        ProposedEvent::ZoneChange(change) => change.object,
    };
    view.controller(object)
        .or_else(|| state.objects.get(&object).map(|o| o.owner))
        .unwrap_or(state.turn.active_player)
}

/// Put a proposal at the back of the action queue.
pub fn enqueue(state: &mut GameState, proposal: Proposal) {
    state.actions.push_back(proposal);
}

/// Process one proposal right now, choosing automatically. Never suspends.
pub fn apply_now(state: &mut GameState, event: ProposedEvent) -> RulesResult<()> {
    process(state, Proposal::automatic(event)).map(|_| ())
}

/// Drain the action queue. Returns `true` if a decision suspended it.
pub fn drain(state: &mut GameState) -> RulesResult<bool> {
    while let Some(proposal) = state.actions.pop_front() {
        if process(state, proposal)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Apply replacements to `proposal` and then perform it. Returns `true` if
/// the controller of the affected object must choose a replacement first.
pub fn process(state: &mut GameState, mut proposal: Proposal) -> RulesResult<bool> {
    loop {
        let view = project(state);
        let candidates = candidates(state, &view, &proposal);
        match candidates.len() {
            0 => {
                perform(state, proposal.event)?;
                return Ok(false);
            }
            1 => {}
            _ if proposal.auto_choose => {}
            _ => {
                let chooser = affected_player(state, &view, &proposal.event);
                let options = candidates.iter().map(|c| c.key).collect();
                state.request_decision(
                    chooser,
                    DecisionKind::ChooseReplacement { options },
                    Continuation::Replacement(proposal),
                );
                return Ok(true);
            }
        }
        let Some(event) = apply(state, &candidates[0], &mut proposal) else {
            return Ok(false);
        };
        proposal.event = event;
    }
}

/// Continue a proposal after its chooser picked `choice`.
pub fn resume(state: &mut GameState, mut proposal: Proposal, choice: ReplacementKey) -> RulesResult<()> {
    let view = project(state);
    let picked = candidates(state, &view, &proposal).into_iter().find(|c| c.key == choice);
    if let Some(candidate) = picked {
        match apply(state, &candidate, &mut proposal) {
            Some(event) => proposal.event = event,
            None => return Ok(()),
        }
    }
    state.actions.push_front(proposal);
    Ok(())
}

/// Apply one replacement. Returns the modified event, or `None` if the
/// event was replaced away entirely.
fn apply(state: &mut GameState, candidate: &Candidate, proposal: &mut Proposal) -> Option<ProposedEvent> {
    proposal.applied.push(candidate.key);
    trace!(target: "engine.resolve", key = ?candidate.key, kind = ?candidate.kind, "replacement applied");
    match (&candidate.kind, proposal.event.clone()) {
        (ReplacementKind::PreventDamage { amount }, ProposedEvent::Damage(mut damage)) => {
            let prevented = match (amount, candidate.key) {
                (None, _) => damage.amount,
                (Some(_), ReplacementKey::Floating(id)) => state.replacements.consume_shield(id, damage.amount),
                (Some(n), ReplacementKey::Static { .. }) => (*n).min(damage.amount),
            };
            if prevented > 0 {
                actions::emit(
                    state,
                    GameEvent::DamagePrevented {
                        source: damage.source.entity,
                        target: damage.target,
                        amount: prevented,
                    },
                );
            }
            damage.amount -= prevented;
            (damage.amount > 0).then_some(ProposedEvent::Damage(damage))
        }
        (ReplacementKind::DamageAsCounters { counter }, ProposedEvent::Damage(damage)) => {
            if let Target::Object(object) = damage.target {
                actions::add_counters(state, object, counter.clone(), damage.amount);
            }
            None
        }
        (ReplacementKind::ExileInsteadOfGraveyard, ProposedEvent::ZoneChange(mut change)) => {
            let owner = state.objects.get(&change.object).map(|o| o.owner)?;
            change.to = ZoneId::exile(owner);
            Some(ProposedEvent::ZoneChange(change))
        }
        (ReplacementKind::EntersTapped, ProposedEvent::ZoneChange(mut change)) => {
            change.tapped = true;
            Some(ProposedEvent::ZoneChange(change))
        }
        (ReplacementKind::EntersWithCounters { counter, amount }, ProposedEvent::ZoneChange(mut change)) => {
            change.counters.push((counter.clone(), *amount));
            Some(ProposedEvent::ZoneChange(change))
        }
        (_, event) => Some(event),
    }
}

fn perform(state: &mut GameState, event: ProposedEvent) -> RulesResult<()> {
    match event {
        ProposedEvent::Damage(damage) => {
            actions::deal_damage(state, &damage);
            Ok(())
        }
        ProposedEvent::ZoneChange(change) => actions::move_object(state, &change),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardDefinition;
    use crate::core::GameConfig;
    use crate::effects::ObjectFilter;
    use std::sync::Arc;

    fn damage_to(target: Target, amount: u32) -> ProposedEvent {
        ProposedEvent::Damage(DamageEvent {
            source: DamageSource {
                entity: EntityId(99),
                controller: PlayerId::new(1),
                colors: ColorSet::COLORLESS,
                deathtouch: false,
                lifelink: false,
            },
            target,
            amount,
            combat: false,
        })
    }

    fn shield(state: &mut GameState, target: Target, amount: Option<u32>) -> ReplacementId {
        let timestamp = state.next_timestamp();
        state.replacements.add(ReplacementEffect {
            id: ReplacementId(0),
            source: None,
            controller: PlayerId::new(0),
            affects: vec![target],
            kind: ReplacementKind::PreventDamage { amount },
            duration: Duration::EndOfTurn,
            timestamp,
            created_turn: 0,
        })
    }

    #[test]
    fn test_shield_prevents_part_of_damage() {
        let mut state = GameState::new(GameConfig::new(2));
        let p0 = Target::Player(PlayerId::new(0));
        shield(&mut state, p0, Some(2));
        apply_now(&mut state, damage_to(p0, 5)).unwrap();
        assert_eq!(state.players[PlayerId::new(0)].life, 17);
        assert!(state.replacements.is_empty());
    }

    #[test]
    fn test_each_replacement_applies_once() {
        let mut state = GameState::new(GameConfig::new(2));
        let p0 = Target::Player(PlayerId::new(0));
        shield(&mut state, p0, Some(1));
        shield(&mut state, p0, Some(1));
        apply_now(&mut state, damage_to(p0, 3)).unwrap();
        assert_eq!(state.players[PlayerId::new(0)].life, 19);
    }

    #[test]
    fn test_competing_replacements_ask_affected_player() {
        let mut state = GameState::new(GameConfig::new(2));
        let bear = state
            .create_object(
                PlayerId::new(1),
                Arc::new(CardDefinition::creature("Bear", "1G", 2, 2)),
                ZoneId::battlefield(),
                false,
            )
            .unwrap();
        shield(&mut state, Target::Object(bear), None);
        shield(&mut state, Target::Object(bear), Some(1));

        let suspended = process(&mut state, Proposal::new(damage_to(Target::Object(bear), 2))).unwrap();
        assert!(suspended);
        let pending = state.pending_decision.as_ref().unwrap();
        assert_eq!(pending.decision.player, PlayerId::new(1));
        assert_eq!(state.components.damage(bear), 0);
    }

    #[test]
    fn test_exile_instead_of_graveyard_static() {
        let mut state = GameState::new(GameConfig::new(2));
        let rest = CardDefinition::new("Rest").with_ability(AbilityDef::Static(StaticAbility::Replacement {
            applies_to: ReplacementScope::Object(Subject::Matching(ObjectFilter::creature())),
            kind: ReplacementKind::ExileInsteadOfGraveyard,
        }));
        state
            .create_object(PlayerId::new(0), Arc::new(rest), ZoneId::battlefield(), false)
            .unwrap();
        let bear = state
            .create_object(
                PlayerId::new(1),
                Arc::new(CardDefinition::creature("Bear", "1G", 2, 2)),
                ZoneId::battlefield(),
                false,
            )
            .unwrap();

        apply_now(
            &mut state,
            ProposedEvent::ZoneChange(ZoneChange::new(bear, ZoneId::graveyard(PlayerId::new(1)))),
        )
        .unwrap();
        assert_eq!(state.zones.get_zone(bear), Some(ZoneId::exile(PlayerId::new(1))));
    }
}
