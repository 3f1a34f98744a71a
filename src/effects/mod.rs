//! Effects: what spells and abilities do, and how it happens.
//!
//! - [`Effect`]: the instruction set card scripts are written in
//! - [`targeting`]: target specs, object filters and legality
//! - [`cost`]: costs and paying them
//! - [`replacement`]: the proposed-event pipeline and replacement effects
//! - [`actions`]: primitive state mutations that emit events
//! - [`resolver`]: the resumable interpreter that runs a script
//!
//! Damage and zone changes are never performed directly by a script; they
//! are proposed, modified by replacement effects, then performed by
//! [`actions`].

pub mod actions;
pub mod cost;
mod effect;
pub mod replacement;
pub mod resolver;
pub mod targeting;

pub use cost::{is_new_to_control, Cost, CostPayment, CostRecord};
pub use effect::{Amount, Effect, EffectCondition, PlayerSelector, Selector};
pub use replacement::{
    DamageEvent, DamageSource, Proposal, ProposedEvent, ReplacementArena, ReplacementEffect, ReplacementId, ReplacementKey,
    ReplacementKind, ReplacementScope, ZoneChange,
};
pub use resolver::Resolution;
pub use targeting::{
    FilterContext, ObjectFilter, PlayerRelation, Subject, Target, TargetGroup, TargetKind, TargetRules, TargetSpec,
};
