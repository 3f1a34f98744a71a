//! # rust-tcg
//!
//! A rules engine for a trading card game in the tradition of Magic: The
//! Gathering.
//!
//! ## Design Principles
//!
//! 1. **Commands in, decisions out**: players act through [`Command`]s. When
//!    the rules need a choice in the middle of anything (a target, a color,
//!    the order of blockers) the engine stops with a [`Decision`] and picks
//!    up where it left off once [`Game::submit_response`] answers it.
//!
//! 2. **All-or-nothing**: every command runs as a transaction against a
//!    snapshot. A rejected command leaves the game exactly as it was.
//!
//! 3. **N-Player First**: turn order, priority and triggers use APNAP order
//!    over any number of seats.
//!
//! ## Architecture
//!
//! - **Persistent Data Structures**: the whole [`GameState`] clones in O(1)
//!   via `im`, which makes snapshots, rollback and look-back triggers cheap.
//!
//! - **Layers**: effective characteristics are never stored; they are
//!   projected from printed values plus continuous effects on demand
//!   ([`layers::project`]).
//!
//! - **Checkpoints**: the state, including a half-finished resolution, is
//!   serializable with `serde` and `bincode`.
//!
//! ## Modules
//!
//! - `core`: entity IDs, players, components, state, commands, RNG,
//!   configuration, errors
//! - `zones`: zone membership and ordering
//! - `cards`: card definitions, mana, abilities
//! - `layers`: continuous effects and the characteristic projector
//! - `effects`: effects, targeting, costs, replacement effects, resolution
//! - `triggers`: events, trigger conditions, delayed triggers
//! - `stack`: the stack, priority and turn structure
//! - `combat`: attack and block legality, combat damage
//! - `decision`: decisions and responses
//! - `rules`: state-based actions, turn-based actions and the [`Game`] driver
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use rust_tcg::{CardDefinition, Game, GameConfig, ManaType, PlayerId, Progress, ZoneId};
//!
//! let mut game = Game::new(GameConfig::new(2)).unwrap();
//! for seat in 0..2 {
//!     let player = PlayerId::new(seat);
//!     for _ in 0..40 {
//!         let forest = Arc::new(CardDefinition::basic_land("Forest", ManaType::Green));
//!         game.add_card(player, forest, ZoneId::library(player)).unwrap();
//!     }
//! }
//! let outcome = game.start().unwrap();
//! assert_eq!(outcome.progress, Progress::Priority(PlayerId::new(0)));
//! ```

pub mod cards;
pub mod combat;
pub mod core;
pub mod decision;
pub mod effects;
pub mod layers;
pub mod rules;
pub mod stack;
pub mod triggers;
pub mod zones;

// Re-export commonly used types
pub use crate::core::{
    ActionRecord, Command, ConfigError, EntityId, GameConfig, GameResult, GameRng, GameState, IllegalAction,
    InvalidResponse, PlayerId, PlayerMap, PriorityAfterAction, RulesError, RulesResult, Timestamp,
};

pub use crate::zones::{ZoneId, ZoneKind, ZoneManager, ZonePosition};

pub use crate::cards::{
    AbilityDef, ActivatedAbility, CardDefinition, CardId, CardRegistry, CardType, Color, ColorSet, Keyword, ManaCost,
    ManaType, StaticAbility, Subtype, Supertype, TriggeredAbility,
};

pub use crate::combat::{AttackTarget, CombatState};

pub use crate::decision::{Decision, DecisionId, DecisionKind, DecisionResponse};

pub use crate::effects::{Amount, Cost, Effect, Selector, Target, TargetGroup, TargetSpec};

pub use crate::layers::{Characteristics, ContinuousEffect, ProjectedView};

pub use crate::rules::{CommandOutcome, Game, Progress, StateBasedActionChecker};

pub use crate::stack::{Step, StepStage, StackObject};

pub use crate::triggers::{GameEvent, LossReason, TriggerCondition};
