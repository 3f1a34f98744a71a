//! Targets, target specifications and object filters.
//!
//! ## Key Types
//!
//! - `Target`: an object or a player
//! - `TargetGroup`: the targets chosen for one "target" word of a script
//! - `TargetSpec`: what a group may contain, with min/max cardinality
//! - `ObjectFilter`: predicate over projected characteristics
//! - `Subject`: "this", "enchanted creature" or "each matching object"
//!
//! Legality is always checked against the projected view, so hexproof,
//! shroud and protection granted by continuous effects count.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::cards::{CardType, ColorSet, Keyword, Subtype, Supertype};
use crate::core::{EntityId, GameState, IllegalAction, PlayerId};
use crate::layers::{Characteristics, ProjectedView};
use crate::zones::ZoneKind;

/// Something that can be targeted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Target {
    Object(EntityId),
    Player(PlayerId),
}

impl Target {
    #[must_use]
    pub fn object(self) -> Option<EntityId> {
        match self {
            Self::Object(e) => Some(e),
            Self::Player(_) => None,
        }
    }

    #[must_use]
    pub fn player(self) -> Option<PlayerId> {
        match self {
            Self::Player(p) => Some(p),
            Self::Object(_) => None,
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Object(e) => write!(f, "{e}"),
            Self::Player(p) => write!(f, "{p}"),
        }
    }
}

/// Targets chosen for one target specification.
pub type TargetGroup = SmallVec<[Target; 2]>;

/// Player relation relative to a controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerRelation {
    You,
    Opponent,
    #[default]
    Any,
}

impl PlayerRelation {
    #[must_use]
    pub fn matches(self, player: PlayerId, you: PlayerId) -> bool {
        match self {
            Self::You => player == you,
            Self::Opponent => player != you,
            Self::Any => true,
        }
    }
}

/// Who is asking: the controller and source of the effect or ability.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterContext {
    pub controller: PlayerId,
    pub source: Option<EntityId>,
}

impl FilterContext {
    #[must_use]
    pub fn new(controller: PlayerId, source: Option<EntityId>) -> Self {
        Self { controller, source }
    }
}

/// Predicate over projected characteristics.
///
/// Empty lists mean "no restriction". Type and subtype lists are any-of.
///
/// ```
/// use rust_tcg::effects::ObjectFilter;
/// use rust_tcg::cards::Keyword;
///
/// // "other creatures you control without flying"
/// let filter = ObjectFilter::creature().you_control().other().without(Keyword::Flying);
/// # let _ = filter;
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectFilter {
    pub card_types: Vec<CardType>,
    pub excluded_types: Vec<CardType>,
    pub subtypes: Vec<Subtype>,
    pub supertypes: Vec<Supertype>,
    pub colors: Option<ColorSet>,
    pub controller: PlayerRelation,
    pub with_keyword: Option<Keyword>,
    pub without_keyword: Option<Keyword>,
    /// Excludes the source object itself.
    pub other: bool,
    pub tapped: Option<bool>,
    pub attacking: Option<bool>,
    pub max_power: Option<i32>,
    pub tokens: Option<bool>,
    /// Zone the object must be in; `None` means any zone.
    pub zone: Option<ZoneKind>,
}

impl Default for ObjectFilter {
    fn default() -> Self {
        Self::any()
    }
}

impl ObjectFilter {
    /// Any permanent on the battlefield.
    #[must_use]
    pub fn any() -> Self {
        Self {
            card_types: Vec::new(),
            excluded_types: Vec::new(),
            subtypes: Vec::new(),
            supertypes: Vec::new(),
            colors: None,
            controller: PlayerRelation::Any,
            with_keyword: None,
            without_keyword: None,
            other: false,
            tapped: None,
            attacking: None,
            max_power: None,
            tokens: None,
            zone: Some(ZoneKind::Battlefield),
        }
    }

    /// Battlefield objects of a type.
    #[must_use]
    pub fn of_type(card_type: CardType) -> Self {
        Self {
            card_types: vec![card_type],
            ..Self::any()
        }
    }

    #[must_use]
    pub fn creature() -> Self {
        Self::of_type(CardType::Creature)
    }

    #[must_use]
    pub fn land() -> Self {
        Self::of_type(CardType::Land)
    }

    #[must_use]
    pub fn permanent() -> Self {
        Self::any()
    }

    /// Cards of any type in `zone`.
    #[must_use]
    pub fn card_in(zone: ZoneKind) -> Self {
        Self {
            zone: Some(zone),
            ..Self::any()
        }
    }

    #[must_use]
    pub fn also_type(mut self, card_type: CardType) -> Self {
        self.card_types.push(card_type);
        self
    }

    #[must_use]
    pub fn excluding(mut self, card_type: CardType) -> Self {
        self.excluded_types.push(card_type);
        self
    }

    #[must_use]
    pub fn with_subtype(mut self, subtype: impl Into<Subtype>) -> Self {
        self.subtypes.push(subtype.into());
        self
    }

    #[must_use]
    pub fn with_supertype(mut self, supertype: Supertype) -> Self {
        self.supertypes.push(supertype);
        self
    }

    #[must_use]
    pub fn with_colors(mut self, colors: ColorSet) -> Self {
        self.colors = Some(colors);
        self
    }

    #[must_use]
    pub fn you_control(mut self) -> Self {
        self.controller = PlayerRelation::You;
        self
    }

    #[must_use]
    pub fn opponent_controls(mut self) -> Self {
        self.controller = PlayerRelation::Opponent;
        self
    }

    #[must_use]
    pub fn with(mut self, keyword: Keyword) -> Self {
        self.with_keyword = Some(keyword);
        self
    }

    #[must_use]
    pub fn without(mut self, keyword: Keyword) -> Self {
        self.without_keyword = Some(keyword);
        self
    }

    #[must_use]
    pub fn other(mut self) -> Self {
        self.other = true;
        self
    }

    #[must_use]
    pub fn tapped(mut self, tapped: bool) -> Self {
        self.tapped = Some(tapped);
        self
    }

    #[must_use]
    pub fn attacking(mut self) -> Self {
        self.attacking = Some(true);
        self
    }

    #[must_use]
    pub fn power_at_most(mut self, power: i32) -> Self {
        self.max_power = Some(power);
        self
    }

    #[must_use]
    pub fn tokens_only(mut self, tokens: bool) -> Self {
        self.tokens = Some(tokens);
        self
    }

    #[must_use]
    pub fn in_zone(mut self, zone: Option<ZoneKind>) -> Self {
        self.zone = zone;
        self
    }

    /// Does `ch` (the characteristics of `entity`) match?
    #[must_use]
    pub fn matches(&self, entity: EntityId, ch: &Characteristics, ctx: &FilterContext) -> bool {
        if let Some(zone) = self.zone {
            if ch.zone != zone {
                return false;
            }
        }
        if self.other && ctx.source == Some(entity) {
            return false;
        }
        if !self.card_types.is_empty() && !self.card_types.iter().any(|t| ch.has_type(*t)) {
            return false;
        }
        if self.excluded_types.iter().any(|t| ch.has_type(*t)) {
            return false;
        }
        if !self.subtypes.is_empty() && !self.subtypes.iter().any(|s| ch.has_subtype(s)) {
            return false;
        }
        if !self.supertypes.iter().all(|s| ch.supertypes.contains(s)) {
            return false;
        }
        if let Some(colors) = self.colors {
            if !ch.colors.intersects(colors) {
                return false;
            }
        }
        if !self.controller.matches(ch.controller, ctx.controller) {
            return false;
        }
        if let Some(keyword) = &self.with_keyword {
            if !ch.has_keyword(keyword) {
                return false;
            }
        }
        if let Some(keyword) = &self.without_keyword {
            if ch.has_keyword(keyword) {
                return false;
            }
        }
        if self.tapped.is_some_and(|t| t != ch.tapped) {
            return false;
        }
        if self.attacking.is_some_and(|a| a != ch.attacking) {
            return false;
        }
        if let Some(max) = self.max_power {
            if ch.power.unwrap_or(0) > max {
                return false;
            }
        }
        if self.tokens.is_some_and(|t| t != ch.is_token) {
            return false;
        }
        true
    }

    /// Matching objects in a projected view, in entity order.
    #[must_use]
    pub fn matching(&self, view: &ProjectedView, ctx: &FilterContext) -> Vec<EntityId> {
        view.iter()
            .filter(|(e, ch)| self.matches(*e, ch, ctx))
            .map(|(e, _)| e)
            .collect()
    }
}

/// Objects an ability refers to relative to its source.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    /// The source object itself.
    This,
    /// The object the source is attached to.
    Host,
    /// Every object matching a filter.
    Matching(ObjectFilter),
}

impl Subject {
    /// Does `entity` (with `ch`) fall under this subject for an ability of
    /// `source` attached to `host`?
    #[must_use]
    pub fn matches(
        &self,
        entity: EntityId,
        ch: &Characteristics,
        source: EntityId,
        host: Option<EntityId>,
        controller: PlayerId,
    ) -> bool {
        match self {
            Self::This => entity == source,
            Self::Host => host == Some(entity),
            Self::Matching(filter) => filter.matches(entity, ch, &FilterContext::new(controller, Some(source))),
        }
    }
}

/// What a target group may contain.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetKind {
    /// An object matching the filter.
    Object(ObjectFilter),
    /// A player.
    Player(PlayerRelation),
    /// A creature, planeswalker or player ("any target").
    Any,
    /// A spell on the stack.
    Spell(ObjectFilter),
}

/// A target requirement with cardinality.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetSpec {
    pub kind: TargetKind,
    pub min: usize,
    pub max: usize,
}

impl TargetSpec {
    /// Exactly one target of `kind`.
    #[must_use]
    pub fn one(kind: TargetKind) -> Self {
        Self { kind, min: 1, max: 1 }
    }

    #[must_use]
    pub fn creature() -> Self {
        Self::one(TargetKind::Object(ObjectFilter::creature()))
    }

    #[must_use]
    pub fn object(filter: ObjectFilter) -> Self {
        Self::one(TargetKind::Object(filter))
    }

    #[must_use]
    pub fn any_target() -> Self {
        Self::one(TargetKind::Any)
    }

    #[must_use]
    pub fn player(relation: PlayerRelation) -> Self {
        Self::one(TargetKind::Player(relation))
    }

    #[must_use]
    pub fn spell() -> Self {
        Self::one(TargetKind::Spell(ObjectFilter::any().in_zone(Some(ZoneKind::Stack))))
    }

    /// Between `min` and `max` distinct targets.
    #[must_use]
    pub fn count(mut self, min: usize, max: usize) -> Self {
        self.min = min;
        self.max = max;
        self
    }
}

/// Target legality checks.
pub struct TargetRules;

impl TargetRules {
    /// Is `target` a legal choice for `spec` for an ability of `source`
    /// controlled by `controller`?
    #[must_use]
    pub fn is_legal(
        state: &GameState,
        view: &ProjectedView,
        spec: &TargetSpec,
        target: Target,
        source: EntityId,
        controller: PlayerId,
    ) -> bool {
        match target {
            Target::Player(player) => {
                let relation = match &spec.kind {
                    TargetKind::Player(relation) => *relation,
                    TargetKind::Any => PlayerRelation::Any,
                    _ => return false,
                };
                player.index() < state.players.player_count()
                    && state.players[player].is_active()
                    && relation.matches(player, controller)
            }
            Target::Object(entity) => {
                let Some(ch) = view.get(entity) else {
                    return false;
                };
                let ctx = FilterContext::new(controller, Some(source));
                let kind_ok = match &spec.kind {
                    TargetKind::Object(filter) => filter.matches(entity, ch, &ctx),
                    TargetKind::Spell(filter) => ch.zone == ZoneKind::Stack && filter.matches(entity, ch, &ctx),
                    TargetKind::Any => ch.on_battlefield() && (ch.is_creature() || ch.is_planeswalker()),
                    TargetKind::Player(_) => false,
                };
                kind_ok && Self::can_be_targeted_by(view, ch, source, controller)
            }
        }
    }

    /// Hexproof, shroud and protection.
    #[must_use]
    pub fn can_be_targeted_by(
        view: &ProjectedView,
        ch: &Characteristics,
        source: EntityId,
        controller: PlayerId,
    ) -> bool {
        if ch.has_keyword(&Keyword::Shroud) {
            return false;
        }
        if ch.has_keyword(&Keyword::Hexproof) && ch.controller != controller {
            return false;
        }
        !ch.protected_from(view.colors(source))
    }

    /// Every legal target for `spec`, objects first in entity order.
    #[must_use]
    pub fn legal_targets(
        state: &GameState,
        view: &ProjectedView,
        spec: &TargetSpec,
        source: EntityId,
        controller: PlayerId,
    ) -> Vec<Target> {
        let objects = view
            .iter()
            .map(|(e, _)| Target::Object(e))
            .filter(|t| Self::is_legal(state, view, spec, *t, source, controller));
        let players = PlayerId::all(state.players.player_count())
            .map(Target::Player)
            .filter(|t| Self::is_legal(state, view, spec, *t, source, controller));
        objects.chain(players).collect()
    }

    /// Validate chosen groups against their specs: cardinality, distinctness
    /// and legality.
    pub fn validate(
        state: &GameState,
        view: &ProjectedView,
        specs: &[TargetSpec],
        groups: &[TargetGroup],
        source: EntityId,
        controller: PlayerId,
    ) -> Result<(), IllegalAction> {
        if groups.len() != specs.len() {
            return Err(IllegalAction::WrongTargetCount {
                group: groups.len().min(specs.len()),
                min: specs.len(),
                max: specs.len(),
                got: groups.len(),
            });
        }
        for (group_index, (spec, group)) in specs.iter().zip(groups).enumerate() {
            if group.len() < spec.min || group.len() > spec.max {
                return Err(IllegalAction::WrongTargetCount {
                    group: group_index,
                    min: spec.min,
                    max: spec.max,
                    got: group.len(),
                });
            }
            for (i, target) in group.iter().enumerate() {
                if group[..i].contains(target) {
                    return Err(IllegalAction::IllegalTarget { group: group_index });
                }
                if !Self::is_legal(state, view, spec, *target, source, controller) {
                    return Err(IllegalAction::IllegalTarget { group: group_index });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CardDefinition, Color};
    use std::sync::Arc;

    fn bear(controller: u8) -> Characteristics {
        let def = Arc::new(CardDefinition::creature("Bear", "1G", 2, 2));
        Characteristics::printed(&def, PlayerId::new(controller), ZoneKind::Battlefield)
    }

    #[test]
    fn test_filter_controller_relation() {
        let ch = bear(1);
        let mine = FilterContext::new(PlayerId::new(1), None);
        let theirs = FilterContext::new(PlayerId::new(0), None);
        let filter = ObjectFilter::creature().you_control();
        assert!(filter.matches(EntityId(5), &ch, &mine));
        assert!(!filter.matches(EntityId(5), &ch, &theirs));
        assert!(ObjectFilter::creature().opponent_controls().matches(EntityId(5), &ch, &theirs));
    }

    #[test]
    fn test_filter_other_and_zone() {
        let ch = bear(0);
        let ctx = FilterContext::new(PlayerId::new(0), Some(EntityId(5)));
        assert!(!ObjectFilter::creature().other().matches(EntityId(5), &ch, &ctx));
        assert!(ObjectFilter::creature().other().matches(EntityId(6), &ch, &ctx));
        assert!(!ObjectFilter::card_in(ZoneKind::Graveyard).matches(EntityId(6), &ch, &ctx));
    }

    #[test]
    fn test_filter_colors_and_power() {
        let ch = bear(0);
        let ctx = FilterContext::new(PlayerId::new(0), None);
        assert!(ObjectFilter::any().with_colors(ColorSet::single(Color::Green)).matches(EntityId(1), &ch, &ctx));
        assert!(!ObjectFilter::any().with_colors(ColorSet::single(Color::Red)).matches(EntityId(1), &ch, &ctx));
        assert!(ObjectFilter::creature().power_at_most(2).matches(EntityId(1), &ch, &ctx));
        assert!(!ObjectFilter::creature().power_at_most(1).matches(EntityId(1), &ch, &ctx));
    }

    #[test]
    fn test_subject_matching() {
        let ch = bear(0);
        assert!(Subject::This.matches(EntityId(3), &ch, EntityId(3), None, PlayerId::new(0)));
        assert!(!Subject::This.matches(EntityId(4), &ch, EntityId(3), None, PlayerId::new(0)));
        assert!(Subject::Host.matches(EntityId(4), &ch, EntityId(3), Some(EntityId(4)), PlayerId::new(0)));
    }

    #[test]
    fn test_spec_count_builder() {
        let spec = TargetSpec::any_target().count(1, 3);
        assert_eq!((spec.min, spec.max), (1, 3));
        assert_eq!(spec.kind, TargetKind::Any);
    }
}
