//! The layer projector: `GameState -> ProjectedView`.
//!
//! Projection is pure. It starts from printed characteristics (or the
//! face-down template), then applies every active continuous effect layer by
//! layer:
//!
//! - layer 1: copy effects
//! - layer 2: control-changing effects
//! - layer 4: type-changing effects (text changing, layer 3, is not modelled)
//! - layer 5: color-changing effects
//! - layer 6: ability adding/removing effects
//! - layer 7: power/toughness in sublayers 7a-7d, with +1/+1 and -1/-1
//!   counters applied at the end of 7c
//!
//! Within a layer effects apply in timestamp order unless one depends on
//! another (see [`dependency`](super::dependency)).
//!
//! ## Affected sets
//!
//! The set of objects an effect applies to is determined the first time the
//! effect applies in a projection and then reused for every later layer.
//! Floating effects created for specific objects only apply to the
//! incarnation of the object that existed when the effect was created: an
//! object that left the battlefield and came back is a new object.
//!
//! ## Static abilities
//!
//! Continuous static abilities of battlefield permanents are collected on
//! every projection, timestamped with the permanent's zone timestamp. Their
//! controller is the permanent's current controller. A static effect whose
//! source lost its abilities in layer 6 does not start applying in layer 7.

use im::{OrdMap, OrdSet};

use super::continuous::{Affected, EffectId, Layer, Modification, PtSublayer, PtValue};
use super::dependency;
use super::view::{Characteristics, ProjectedView};
use crate::cards::{AbilityDef, StaticAbility};
use crate::core::{CounterType, EntityId, GameState, PlayerId, Timestamp};
use crate::effects::{FilterContext, ObjectFilter, Subject};
use crate::zones::ZoneKind;

/// Project `state` through the layer system.
///
/// ```
/// use rust_tcg::cards::CardDefinition;
/// use rust_tcg::core::{GameConfig, GameState, PlayerId};
/// use rust_tcg::layers::project;
/// use rust_tcg::zones::ZoneId;
/// use std::sync::Arc;
///
/// let mut state = GameState::new(GameConfig::new(2));
/// let bear = state
///     .create_object(PlayerId::new(0), Arc::new(CardDefinition::creature("Bear", "1G", 2, 2)), ZoneId::battlefield(), false)
///     .unwrap();
///
/// let view = project(&state);
/// assert_eq!(view.power(bear), Some(2));
/// assert_eq!(project(&state), view);
/// ```
#[must_use]
pub fn project(state: &GameState) -> ProjectedView {
    Projector::new(state).run()
}

/// Every ability an object currently has: printed (or copied) abilities
/// followed by granted ones. Empty once a layer 6 effect removed them.
#[must_use]
pub fn object_abilities(state: &GameState, entity: EntityId, ch: &Characteristics) -> Vec<AbilityDef> {
    if ch.abilities_removed {
        return Vec::new();
    }
    let mut abilities = ch.printed_abilities().to_vec();
    abilities.extend(state.components.granted(entity).iter().map(|g| g.ability.clone()));
    abilities
}

/// Identity of an effect inside one projection.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum EffectKey {
    Floating(EffectId),
    Static { source: EntityId, index: usize },
}

#[derive(Clone, Debug)]
enum Scope {
    /// Specific objects; only incarnations that existed at `created`.
    Objects { objects: Vec<EntityId>, created: Timestamp },
    Filter(ObjectFilter),
    Subject(Subject),
}

#[derive(Clone, Debug)]
struct ActiveEffect {
    key: EffectKey,
    timestamp: Timestamp,
    source: Option<EntityId>,
    /// Fixed for floating effects; static effects follow their source.
    controller: Option<PlayerId>,
    scope: Scope,
    modifications: Vec<Modification>,
}

impl ActiveEffect {
    fn is_static(&self) -> bool {
        matches!(self.key, EffectKey::Static { .. })
    }

    fn touches(&self, layer: Layer, sublayer: Option<PtSublayer>) -> bool {
        self.modifications
            .iter()
            .any(|m| m.layer() == layer && m.sublayer() == sublayer)
    }
}

struct Projector<'a> {
    state: &'a GameState,
    locked: OrdMap<EffectKey, Vec<EntityId>>,
}

impl<'a> Projector<'a> {
    fn new(state: &'a GameState) -> Self {
        Self {
            state,
            locked: OrdMap::new(),
        }
    }

    fn run(mut self) -> ProjectedView {
        let mut working = self.base();
        let floating = self.floating();

        let mut effects = floating.clone();
        effects.extend(self.statics(&working));
        self.apply_layer(&mut working, &effects, Layer::Copy, None);

        // Copying can change which static abilities exist.
        let mut effects = floating;
        effects.extend(self.statics(&working));
        effects.sort_by(|a, b| (a.timestamp, &a.key).cmp(&(b.timestamp, &b.key)));

        for layer in [Layer::Control, Layer::Type, Layer::Color, Layer::Ability] {
            self.apply_layer(&mut working, &effects, layer, None);
        }

        self.normalize_power_toughness(&mut working);
        for sublayer in PtSublayer::ORDER {
            self.apply_layer(&mut working, &effects, Layer::PowerToughness, Some(sublayer));
            if sublayer == PtSublayer::Modifying {
                self.apply_counters(&mut working);
            }
        }
        working
    }

    // === Base characteristics ===

    fn base(&self) -> ProjectedView {
        let state = self.state;
        let mut objects = OrdMap::new();
        for (&entity, object) in &state.objects {
            let Some(zone) = state.zones.get_zone(entity) else {
                continue;
            };
            let mut ch = if state.components.is_face_down(entity) {
                Characteristics::face_down(object.owner, zone.kind)
            } else {
                Characteristics::printed(&object.definition, object.owner, zone.kind)
            };
            ch.is_token = object.is_token;
            ch.controller = match zone.kind {
                ZoneKind::Battlefield => state.components.controller(entity).unwrap_or(object.owner),
                ZoneKind::Stack => state.stack.spell_controller(entity).unwrap_or(object.owner),
                _ => object.owner,
            };
            ch.tapped = state.components.is_tapped(entity);
            if let Some(combat) = &state.combat {
                ch.attacking = combat.is_attacking(entity);
                ch.blocking = combat.is_blocking(entity);
            }
            objects.insert(entity, ch);
        }
        ProjectedView::new(objects)
    }

    fn floating(&self) -> Vec<ActiveEffect> {
        self.state
            .effects
            .iter()
            .map(|effect| ActiveEffect {
                key: EffectKey::Floating(effect.id),
                timestamp: effect.timestamp,
                source: effect.source,
                controller: Some(effect.controller),
                scope: match &effect.affected {
                    Affected::Objects(objects) => Scope::Objects {
                        objects: objects.clone(),
                        created: effect.timestamp,
                    },
                    Affected::Filter(filter) => Scope::Filter(filter.clone()),
                },
                modifications: effect.modifications.clone(),
            })
            .collect()
    }

    fn statics(&self, working: &ProjectedView) -> Vec<ActiveEffect> {
        let mut out = Vec::new();
        for (entity, ch) in working.battlefield() {
            let timestamp = self.state.components.zone_timestamp(entity).unwrap_or_default();
            for (index, ability) in object_abilities(self.state, entity, ch).into_iter().enumerate() {
                if let AbilityDef::Static(StaticAbility::Continuous { affected, modifications }) = ability {
                    out.push(ActiveEffect {
                        key: EffectKey::Static { source: entity, index },
                        timestamp,
                        source: Some(entity),
                        controller: None,
                        scope: Scope::Subject(affected),
                        modifications,
                    });
                }
            }
        }
        out
    }

    // === Layer application ===

    fn apply_layer(
        &mut self,
        working: &mut ProjectedView,
        effects: &[ActiveEffect],
        layer: Layer,
        sublayer: Option<PtSublayer>,
    ) {
        let mut remaining: Vec<&ActiveEffect> = effects
            .iter()
            .filter(|e| e.touches(layer, sublayer))
            .filter(|e| !(layer == Layer::PowerToughness && self.lost_source_abilities(working, e)))
            .collect();
        remaining.sort_by(|a, b| (a.timestamp, &a.key).cmp(&(b.timestamp, &b.key)));

        while !remaining.is_empty() {
            let pick = if remaining.len() == 1 {
                0
            } else {
                dependency::pick_next(remaining.len(), |dependent, on| {
                    self.depends_on(working, remaining[dependent], remaining[on], layer, sublayer)
                })
            };
            let effect = remaining.remove(pick);
            let targets = self.affected(working, effect);
            if !self.locked.contains_key(&effect.key) {
                self.locked.insert(effect.key.clone(), targets.clone());
            }
            self.apply_effect(working, effect, &targets, layer, sublayer);
        }
    }

    /// A static effect that has not started applying yet, whose source has
    /// lost its abilities.
    fn lost_source_abilities(&self, working: &ProjectedView, effect: &ActiveEffect) -> bool {
        effect.is_static()
            && !self.locked.contains_key(&effect.key)
            && effect
                .source
                .and_then(|s| working.get(s))
                .is_some_and(|ch| ch.abilities_removed)
    }

    /// Would applying `on` first change what `dependent` applies to?
    fn depends_on(
        &self,
        working: &ProjectedView,
        dependent: &ActiveEffect,
        on: &ActiveEffect,
        layer: Layer,
        sublayer: Option<PtSublayer>,
    ) -> bool {
        if self.locked.contains_key(&dependent.key) {
            return false;
        }
        let before = self.affected(working, dependent);
        let mut trial = working.clone();
        let targets = self.affected(&trial, on);
        self.apply_effect(&mut trial, on, &targets, layer, sublayer);
        before != self.affected(&trial, dependent)
    }

    fn controller_of(&self, working: &ProjectedView, effect: &ActiveEffect) -> PlayerId {
        effect
            .controller
            .or_else(|| effect.source.and_then(|s| working.controller(s)))
            .unwrap_or(PlayerId::new(0))
    }

    fn affected(&self, working: &ProjectedView, effect: &ActiveEffect) -> Vec<EntityId> {
        if let Some(locked) = self.locked.get(&effect.key) {
            return locked.clone();
        }
        let controller = self.controller_of(working, effect);
        match &effect.scope {
            Scope::Objects { objects, created } => objects
                .iter()
                .copied()
                .filter(|&e| working.get(e).is_some_and(Characteristics::on_battlefield))
                .filter(|&e| {
                    self.state
                        .components
                        .zone_timestamp(e)
                        .is_some_and(|entered| entered <= *created)
                })
                .collect(),
            Scope::Filter(filter) => filter.matching(working, &FilterContext::new(controller, effect.source)),
            Scope::Subject(subject) => {
                let Some(source) = effect.source else {
                    return Vec::new();
                };
                let host = self.state.components.attached_to(source);
                working
                    .battlefield()
                    .filter(|(e, ch)| subject.matches(*e, ch, source, host, controller))
                    .map(|(e, _)| e)
                    .collect()
            }
        }
    }

    fn apply_effect(
        &self,
        working: &mut ProjectedView,
        effect: &ActiveEffect,
        targets: &[EntityId],
        layer: Layer,
        sublayer: Option<PtSublayer>,
    ) {
        let ctx = FilterContext::new(self.controller_of(working, effect), effect.source);
        for modification in &effect.modifications {
            if modification.layer() != layer || modification.sublayer() != sublayer {
                continue;
            }
            for &target in targets {
                apply_modification(working, target, modification, &ctx);
            }
        }
    }

    // === Layer 7 helpers ===

    fn normalize_power_toughness(&self, working: &mut ProjectedView) {
        let creatures: Vec<EntityId> = working
            .battlefield()
            .filter(|(_, ch)| ch.is_creature())
            .map(|(e, _)| e)
            .collect();
        for entity in creatures {
            if let Some(ch) = working.get_mut(entity) {
                ch.power.get_or_insert(0);
                ch.toughness.get_or_insert(0);
            }
        }
    }

    fn apply_counters(&self, working: &mut ProjectedView) {
        let creatures: Vec<EntityId> = working
            .battlefield()
            .filter(|(_, ch)| ch.is_creature())
            .map(|(e, _)| e)
            .collect();
        for entity in creatures {
            let plus = self.state.components.counter(entity, &CounterType::PlusOnePlusOne) as i32;
            let minus = self.state.components.counter(entity, &CounterType::MinusOneMinusOne) as i32;
            if plus == minus {
                continue;
            }
            if let Some(ch) = working.get_mut(entity) {
                ch.power = ch.power.map(|p| p + plus - minus);
                ch.toughness = ch.toughness.map(|t| t + plus - minus);
            }
        }
    }
}

fn pt_value(working: &ProjectedView, value: &PtValue, ctx: &FilterContext) -> i32 {
    match value {
        PtValue::Fixed(n) => *n,
        PtValue::CountOf(filter) => filter.matching(working, ctx).len() as i32,
    }
}

fn apply_modification(working: &mut ProjectedView, target: EntityId, modification: &Modification, ctx: &FilterContext) {
    // Values that read other objects are computed before borrowing the target.
    let copied = match modification {
        Modification::CopyOf(original) => match working.get(*original) {
            Some(ch) => Some(ch.clone()),
            None => return,
        },
        _ => None,
    };
    let cda = match modification {
        Modification::SetPowerToughnessCda { power, toughness } => {
            Some((pt_value(working, power, ctx), pt_value(working, toughness, ctx)))
        }
        _ => None,
    };

    let Some(ch) = working.get_mut(target) else {
        return;
    };
    match modification {
        Modification::CopyOf(_) => {
            if let Some(original) = copied {
                ch.name = original.name;
                ch.mana_cost = original.mana_cost;
                ch.card_types = original.card_types;
                ch.supertypes = original.supertypes;
                ch.subtypes = original.subtypes;
                ch.colors = original.colors;
                ch.keywords = original.keywords;
                ch.power = original.power;
                ch.toughness = original.toughness;
                ch.ability_source = original.ability_source;
            }
        }
        Modification::SetController(player) => ch.controller = *player,
        Modification::AddTypes(types) => ch.card_types.extend(types.iter().copied()),
        Modification::RemoveTypes(types) => {
            for t in types {
                ch.card_types.remove(t);
            }
        }
        Modification::AddSubtypes(subtypes) => ch.subtypes.extend(subtypes.iter().cloned()),
        Modification::SetSubtypes(subtypes) => ch.subtypes = subtypes.iter().cloned().collect(),
        Modification::SetColors(colors) => ch.colors = *colors,
        Modification::AddColors(colors) => ch.colors = ch.colors.union(*colors),
        Modification::AddKeywords(keywords) => ch.keywords.extend(keywords.iter().cloned()),
        Modification::RemoveKeywords(keywords) => {
            for k in keywords {
                ch.keywords.remove(k);
            }
        }
        Modification::RemoveAllAbilities => {
            ch.keywords = OrdSet::new();
            ch.abilities_removed = true;
        }
        Modification::SetPowerToughnessCda { .. } => {
            if let Some((power, toughness)) = cda {
                ch.power = Some(power);
                ch.toughness = Some(toughness);
            }
        }
        Modification::SetPowerToughness { power, toughness } => {
            ch.power = Some(*power);
            ch.toughness = Some(*toughness);
        }
        Modification::ModifyPowerToughness { power, toughness } => {
            ch.power = Some(ch.power.unwrap_or(0) + power);
            ch.toughness = Some(ch.toughness.unwrap_or(0) + toughness);
        }
        Modification::SwitchPowerToughness => {
            std::mem::swap(&mut ch.power, &mut ch.toughness);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CardDefinition, CardType, Keyword};
    use crate::core::GameConfig;
    use crate::layers::{ContinuousEffect, Duration};
    use crate::zones::ZoneId;
    use std::sync::Arc;

    fn battlefield(state: &mut GameState, owner: u8, def: CardDefinition) -> EntityId {
        state
            .create_object(PlayerId::new(owner), Arc::new(def), ZoneId::battlefield(), false)
            .unwrap()
    }

    fn floating(state: &mut GameState, affected: Affected, modifications: Vec<Modification>) -> EffectId {
        let timestamp = state.next_timestamp();
        state.effects.add(
            ContinuousEffect::new(PlayerId::new(0), affected, modifications)
                .with_timestamp(timestamp)
                .with_duration(Duration::Indefinite),
        )
    }

    #[test]
    fn test_set_then_modify_sums() {
        let mut state = GameState::new(GameConfig::new(2));
        let bear = battlefield(&mut state, 0, CardDefinition::creature("Bear", "1G", 2, 2));
        floating(
            &mut state,
            Affected::Objects(vec![bear]),
            vec![Modification::SetPowerToughness { power: 0, toughness: 0 }],
        );
        floating(
            &mut state,
            Affected::Objects(vec![bear]),
            vec![Modification::ModifyPowerToughness { power: 3, toughness: 3 }],
        );
        let view = project(&state);
        assert_eq!((view.power(bear), view.toughness(bear)), (Some(3), Some(3)));
    }

    #[test]
    fn test_counters_apply_after_modify_before_switch() {
        let mut state = GameState::new(GameConfig::new(2));
        let bear = battlefield(&mut state, 0, CardDefinition::creature("Bear", "1G", 2, 3));
        state.components.add_counters(bear, CounterType::PlusOnePlusOne, 1);
        floating(&mut state, Affected::Objects(vec![bear]), vec![Modification::SwitchPowerToughness]);
        let view = project(&state);
        assert_eq!((view.power(bear), view.toughness(bear)), (Some(4), Some(3)));
    }

    #[test]
    fn test_static_anthem_follows_controller() {
        let mut state = GameState::new(GameConfig::new(2));
        let anthem = CardDefinition::new("Anthem")
            .with_types(&[CardType::Enchantment])
            .with_ability(AbilityDef::Static(StaticAbility::Continuous {
                affected: Subject::Matching(ObjectFilter::creature().you_control()),
                modifications: vec![Modification::ModifyPowerToughness { power: 1, toughness: 1 }],
            }));
        let source = battlefield(&mut state, 0, anthem);
        let mine = battlefield(&mut state, 0, CardDefinition::creature("Bear", "1G", 2, 2));
        let theirs = battlefield(&mut state, 1, CardDefinition::creature("Bear", "1G", 2, 2));

        let view = project(&state);
        assert_eq!(view.power(mine), Some(3));
        assert_eq!(view.power(theirs), Some(2));

        state.components.set_controller(source, PlayerId::new(1));
        let view = project(&state);
        assert_eq!(view.power(mine), Some(2));
        assert_eq!(view.power(theirs), Some(3));
    }

    #[test]
    fn test_removed_abilities_stop_static_pt() {
        let mut state = GameState::new(GameConfig::new(2));
        let lord = CardDefinition::creature("Lord", "1W", 1, 1).with_ability(AbilityDef::Static(
            StaticAbility::Continuous {
                affected: Subject::This,
                modifications: vec![Modification::ModifyPowerToughness { power: 2, toughness: 2 }],
            },
        ));
        let lord = battlefield(&mut state, 0, lord);
        assert_eq!(project(&state).power(lord), Some(3));

        floating(&mut state, Affected::Objects(vec![lord]), vec![Modification::RemoveAllAbilities]);
        let view = project(&state);
        assert_eq!(view.power(lord), Some(1));
        assert!(view.get(lord).unwrap().abilities_removed);
    }

    #[test]
    fn test_new_incarnation_ignores_old_effect() {
        let mut state = GameState::new(GameConfig::new(2));
        let bear = battlefield(&mut state, 0, CardDefinition::creature("Bear", "1G", 2, 2));
        floating(
            &mut state,
            Affected::Objects(vec![bear]),
            vec![Modification::ModifyPowerToughness { power: 2, toughness: 2 }],
        );
        assert_eq!(project(&state).power(bear), Some(4));

        let later = state.next_timestamp();
        state.components.set_zone_timestamp(bear, later);
        assert_eq!(project(&state).power(bear), Some(2));
    }

    #[test]
    fn test_type_dependency_beats_timestamp() {
        // An earlier "artifacts get flying" depends on a later "this is an
        // artifact": the type change applies first regardless of order.
        let mut state = GameState::new(GameConfig::new(2));
        let bear = battlefield(&mut state, 0, CardDefinition::creature("Bear", "1G", 2, 2));
        floating(
            &mut state,
            Affected::Filter(ObjectFilter::of_type(CardType::Artifact)),
            vec![Modification::AddTypes(vec![CardType::Enchantment])],
        );
        floating(
            &mut state,
            Affected::Objects(vec![bear]),
            vec![Modification::AddTypes(vec![CardType::Artifact])],
        );
        let view = project(&state);
        assert!(view.has_type(bear, CardType::Artifact));
        assert!(view.has_type(bear, CardType::Enchantment));
    }

    #[test]
    fn test_face_down_ignores_printed_keywords() {
        let mut state = GameState::new(GameConfig::new(2));
        let flier = battlefield(
            &mut state,
            0,
            CardDefinition::creature("Bird", "3U", 3, 3).with_keyword(Keyword::Flying),
        );
        state.components.set_face_down(flier, true);
        let view = project(&state);
        assert!(!view.has_keyword(flier, &Keyword::Flying));
        assert_eq!(view.power(flier), Some(2));
        assert_eq!(view.get(flier).unwrap().name, "");
    }
}
