//! Trigger conditions.
//!
//! A condition is a predicate over one [`GameEvent`], evaluated relative to
//! the ability's source and controller. Objects named by the event are
//! judged by their last-known characteristics when the event moved them off
//! the battlefield, and by their current projected characteristics
//! otherwise.

use serde::{Deserialize, Serialize};

use super::event::{EventKind, GameEvent};
use crate::core::{CounterType, EntityId, PlayerId};
use crate::effects::{FilterContext, ObjectFilter, PlayerRelation, Subject, Target};
use crate::layers::{Characteristics, ProjectedView};
use crate::stack::Step;

/// When a triggered ability triggers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerCondition {
    // === Zone changes ===
    EntersBattlefield(Subject),
    /// Put into a graveyard from the battlefield.
    Dies(Subject),
    LeavesBattlefield(Subject),

    // === Damage ===
    DealsDamage {
        subject: Subject,
        combat_only: bool,
        to_player_only: bool,
    },
    IsDealtDamage(Subject),

    // === Combat ===
    Attacks(Subject),
    Blocks(Subject),

    // === Status ===
    BecomesTapped(Subject),
    /// `None` matches any counter type.
    CountersPlaced {
        subject: Subject,
        counter: Option<CounterType>,
    },

    // === Players ===
    /// A player related to the controller casts a spell matching the
    /// filter. The filter's zone restriction is ignored.
    SpellCast {
        caster: PlayerRelation,
        filter: ObjectFilter,
    },
    /// "At the beginning of [whose] [step]".
    StepBegins { step: Step, whose: PlayerRelation },
    LifeGained(PlayerRelation),
    CardDrawn(PlayerRelation),

    /// Any of the conditions.
    Any(Vec<TriggerCondition>),
}

impl TriggerCondition {
    /// "At the beginning of your upkeep."
    #[must_use]
    pub fn your_upkeep() -> Self {
        Self::StepBegins {
            step: Step::Upkeep,
            whose: PlayerRelation::You,
        }
    }

    /// "At the beginning of the next end step."
    #[must_use]
    pub fn next_end_step() -> Self {
        Self::StepBegins {
            step: Step::End,
            whose: PlayerRelation::Any,
        }
    }

    /// Event kinds that can satisfy this condition.
    #[must_use]
    pub fn event_kinds(&self) -> Vec<EventKind> {
        match self {
            Self::EntersBattlefield(_) | Self::Dies(_) | Self::LeavesBattlefield(_) => vec![EventKind::ZoneChanged],
            Self::DealsDamage { .. } | Self::IsDealtDamage(_) => vec![EventKind::DamageDealt],
            Self::Attacks(_) => vec![EventKind::AttackerDeclared],
            Self::Blocks(_) => vec![EventKind::BlockerDeclared],
            Self::BecomesTapped(_) => vec![EventKind::Tapped],
            Self::CountersPlaced { .. } => vec![EventKind::CountersAdded],
            Self::SpellCast { .. } => vec![EventKind::SpellCast],
            Self::StepBegins { .. } => vec![EventKind::StepBegan],
            Self::LifeGained(_) => vec![EventKind::LifeGained],
            Self::CardDrawn(_) => vec![EventKind::CardDrawn],
            Self::Any(conditions) => {
                let mut kinds: Vec<EventKind> = conditions.iter().flat_map(Self::event_kinds).collect();
                kinds.sort();
                kinds.dedup();
                kinds
            }
        }
    }

    /// Does this condition look back in time at an object leaving the
    /// battlefield?
    #[must_use]
    pub fn looks_back(&self) -> bool {
        match self {
            Self::Dies(_) | Self::LeavesBattlefield(_) => true,
            Self::Any(conditions) => conditions.iter().any(Self::looks_back),
            _ => false,
        }
    }
}

/// What a condition is evaluated against.
pub struct TriggerContext<'a> {
    pub view: &'a ProjectedView,
    pub event: &'a GameEvent,
    /// Source of the ability.
    pub source: EntityId,
    /// What the source is attached to.
    pub host: Option<EntityId>,
    pub controller: PlayerId,
}

impl TriggerContext<'_> {
    /// Characteristics of an object named by the event.
    fn characteristics_of(&self, entity: EntityId) -> Option<&Characteristics> {
        match self.event.last_known() {
            Some(lki) if lki.entity == entity => Some(&lki.characteristics),
            _ => self.view.get(entity),
        }
    }

    fn subject_matches(&self, subject: &Subject, entity: EntityId) -> bool {
        if matches!(subject, Subject::This) {
            return entity == self.source;
        }
        self.characteristics_of(entity)
            .is_some_and(|ch| subject.matches(entity, ch, self.source, self.host, self.controller))
    }
}

/// Evaluates trigger conditions.
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    #[must_use]
    pub fn matches(condition: &TriggerCondition, ctx: &TriggerContext<'_>) -> bool {
        let event = ctx.event;
        match condition {
            TriggerCondition::EntersBattlefield(subject) => {
                event.entered_battlefield() && event.object().is_some_and(|e| ctx.subject_matches(subject, e))
            }
            TriggerCondition::Dies(subject) => {
                event.is_death() && event.object().is_some_and(|e| ctx.subject_matches(subject, e))
            }
            TriggerCondition::LeavesBattlefield(subject) => {
                event.left_battlefield() && event.object().is_some_and(|e| ctx.subject_matches(subject, e))
            }
            TriggerCondition::DealsDamage {
                subject,
                combat_only,
                to_player_only,
            } => match event {
                GameEvent::DamageDealt {
                    source, target, combat, ..
                } => {
                    (!combat_only || *combat)
                        && (!to_player_only || matches!(target, Target::Player(_)))
                        && ctx.subject_matches(subject, *source)
                }
                _ => false,
            },
            TriggerCondition::IsDealtDamage(subject) => match event {
                GameEvent::DamageDealt {
                    target: Target::Object(object),
                    ..
                } => ctx.subject_matches(subject, *object),
                _ => false,
            },
            TriggerCondition::Attacks(subject) => match event {
                GameEvent::AttackerDeclared { attacker, .. } => ctx.subject_matches(subject, *attacker),
                _ => false,
            },
            TriggerCondition::Blocks(subject) => match event {
                GameEvent::BlockerDeclared { blocker, .. } => ctx.subject_matches(subject, *blocker),
                _ => false,
            },
            TriggerCondition::BecomesTapped(subject) => match event {
                GameEvent::Tapped { object } => ctx.subject_matches(subject, *object),
                _ => false,
            },
            TriggerCondition::CountersPlaced { subject, counter } => match event {
                GameEvent::CountersAdded { object, counter: added, .. } => {
                    counter.as_ref().map_or(true, |c| c == added) && ctx.subject_matches(subject, *object)
                }
                _ => false,
            },
            TriggerCondition::SpellCast { caster, filter } => match event {
                GameEvent::SpellCast { card, controller } => {
                    let filter = filter.clone().in_zone(None);
                    caster.matches(*controller, ctx.controller)
                        && ctx.view.get(*card).is_some_and(|ch| {
                            filter.matches(*card, ch, &FilterContext::new(ctx.controller, Some(ctx.source)))
                        })
                }
                _ => false,
            },
            TriggerCondition::StepBegins { step, whose } => match event {
                GameEvent::StepBegan { step: began, active, .. } => {
                    began == step && whose.matches(*active, ctx.controller)
                }
                _ => false,
            },
            TriggerCondition::LifeGained(relation) => match event {
                GameEvent::LifeGained { player, .. } => relation.matches(*player, ctx.controller),
                _ => false,
            },
            TriggerCondition::CardDrawn(relation) => match event {
                GameEvent::CardDrawn { player, .. } => relation.matches(*player, ctx.controller),
                _ => false,
            },
            TriggerCondition::Any(conditions) => conditions.iter().any(|c| Self::matches(c, ctx)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardDefinition;
    use crate::triggers::LastKnown;
    use crate::zones::{ZoneId, ZoneKind};
    use im::OrdMap;
    use std::sync::Arc;

    fn lki(entity: EntityId, owner: PlayerId) -> LastKnown {
        let def = Arc::new(CardDefinition::creature("Bear", "1G", 2, 2));
        LastKnown {
            entity,
            characteristics: Characteristics::printed(&def, owner, ZoneKind::Battlefield),
            abilities: Vec::new(),
            damage: 0,
            counters: OrdMap::new(),
            attached_to: None,
        }
    }

    fn death(entity: EntityId, owner: PlayerId) -> GameEvent {
        GameEvent::ZoneChanged {
            object: entity,
            from: Some(ZoneId::battlefield()),
            to: ZoneId::graveyard(owner),
            last_known: Some(lki(entity, owner)),
        }
    }

    #[test]
    fn test_dies_this_uses_identity() {
        let view = ProjectedView::default();
        let event = death(EntityId(9), PlayerId::new(0));
        let ctx = TriggerContext {
            view: &view,
            event: &event,
            source: EntityId(9),
            host: None,
            controller: PlayerId::new(0),
        };
        assert!(ConditionEvaluator::matches(&TriggerCondition::Dies(Subject::This), &ctx));
        assert!(!ConditionEvaluator::matches(&TriggerCondition::EntersBattlefield(Subject::This), &ctx));
    }

    #[test]
    fn test_dies_filter_looks_back() {
        // The dead creature is not in the current view; its last-known
        // characteristics decide.
        let view = ProjectedView::default();
        let event = death(EntityId(9), PlayerId::new(1));
        let ctx = TriggerContext {
            view: &view,
            event: &event,
            source: EntityId(4),
            host: None,
            controller: PlayerId::new(0),
        };
        let opponents = TriggerCondition::Dies(Subject::Matching(ObjectFilter::creature().opponent_controls()));
        let yours = TriggerCondition::Dies(Subject::Matching(ObjectFilter::creature().you_control()));
        assert!(ConditionEvaluator::matches(&opponents, &ctx));
        assert!(!ConditionEvaluator::matches(&yours, &ctx));
    }

    #[test]
    fn test_step_begins_relation() {
        let view = ProjectedView::default();
        let event = GameEvent::StepBegan {
            step: Step::Upkeep,
            active: PlayerId::new(1),
            turn: 2,
        };
        let ctx = TriggerContext {
            view: &view,
            event: &event,
            source: EntityId(4),
            host: None,
            controller: PlayerId::new(0),
        };
        assert!(!ConditionEvaluator::matches(&TriggerCondition::your_upkeep(), &ctx));
        let any_upkeep = TriggerCondition::StepBegins {
            step: Step::Upkeep,
            whose: PlayerRelation::Any,
        };
        assert!(ConditionEvaluator::matches(&any_upkeep, &ctx));
    }

    #[test]
    fn test_event_kinds_of_any() {
        let cond = TriggerCondition::Any(vec![
            TriggerCondition::Dies(Subject::This),
            TriggerCondition::LeavesBattlefield(Subject::This),
            TriggerCondition::LifeGained(PlayerRelation::You),
        ]);
        assert_eq!(cond.event_kinds(), vec![EventKind::ZoneChanged, EventKind::LifeGained]);
        assert!(cond.looks_back());
    }
}
