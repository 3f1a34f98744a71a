//! Events and triggered abilities.
//!
//! ## Key Components
//!
//! - [`GameEvent`]: an immutable record of one state mutation
//! - [`LastKnown`]: an object's characteristics right before it left the
//!   battlefield
//! - [`TriggerCondition`]: when a triggered ability triggers
//! - [`DelayedTriggerRegistry`]: one-shot triggers created by effects
//! - [`TriggerEngine`]: matches new events and puts triggers on the stack
//!   in APNAP order
//!
//! ## Example Usage
//!
//! ```
//! use rust_tcg::cards::{AbilityDef, CardDefinition, TriggeredAbility};
//! use rust_tcg::effects::{Effect, Subject};
//! use rust_tcg::triggers::TriggerCondition;
//!
//! // "When this creature dies, draw a card."
//! let def = CardDefinition::creature("Doomed Seer", "1U", 1, 1).with_ability(AbilityDef::Triggered(
//!     TriggeredAbility::new(TriggerCondition::Dies(Subject::This), vec![Effect::draw(1)]),
//! ));
//! assert_eq!(def.abilities.len(), 1);
//! ```

mod condition;
mod engine;
mod event;
mod registry;

pub use condition::{ConditionEvaluator, TriggerCondition, TriggerContext};
pub use engine::{PendingTrigger, TriggerEngine, TriggerOrigin};
pub use event::{EventKind, GameEvent, LastKnown, LossReason};
pub use registry::{DelayedTrigger, DelayedTriggerId, DelayedTriggerRegistry};
