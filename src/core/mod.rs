//! Core engine types: entities, players, components, state, commands, RNG,
//! configuration and errors.
//!
//! Everything the rules modules share lives here. [`GameState`] owns every
//! entity, component and zone of one game.

pub mod action;
pub mod component;
pub mod config;
pub mod entity;
pub mod error;
pub mod player;
pub mod rng;
pub mod state;

pub use action::{ActionRecord, Command};
pub use component::{Component, ComponentStore, CounterType, GrantedAbility};
pub use config::{GameConfig, PriorityAfterAction};
pub use entity::{EntityId, Timestamp};
pub use error::{ConfigError, IllegalAction, InvalidResponse, RegistryError, RulesError, RulesResult};
pub use player::{PlayerId, PlayerMap, PlayerState};
pub use rng::{GameRng, GameRngState};
pub use state::{GameResult, GameState};
