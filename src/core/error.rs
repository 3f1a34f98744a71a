//! Typed errors surfaced by the rules engine.
//!
//! ## Taxonomy
//!
//! - [`IllegalAction`]: a command broke a timing, cost or legality rule.
//!   The command is rejected and the game state is left untouched.
//! - [`InvalidResponse`]: a decision response failed its constraints.
//!   The decision stays pending.
//! - `InconsistentState`: an internal invariant was violated (an entity in
//!   two zones, a missing object). The offending transaction is rolled back
//!   and the failure is logged at `error` level.
//!
//! A spell that fizzles is not an error; it shows up as a
//! `GameEvent::Fizzled` in the event log.

use thiserror::Error;

use super::entity::EntityId;
use super::player::PlayerId;

/// Result alias used across the engine.
pub type RulesResult<T> = Result<T, RulesError>;

/// Top-level engine error.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RulesError {
    #[error("illegal action: {0}")]
    IllegalAction(#[from] IllegalAction),

    #[error("invalid response: {0}")]
    InvalidResponse(#[from] InvalidResponse),

    #[error("inconsistent state: {0}")]
    InconsistentState(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("checkpoint could not be encoded or decoded: {0}")]
    Checkpoint(String),
}

impl RulesError {
    /// Build an `InconsistentState` error.
    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::InconsistentState(message.into())
    }

    /// Is this an internal invariant violation?
    #[must_use]
    pub fn is_inconsistent(&self) -> bool {
        matches!(self, Self::InconsistentState(_))
    }
}

/// Reasons a command is rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum IllegalAction {
    // === Flow ===
    #[error("the game is over")]
    GameOver,

    #[error("a decision is pending and must be answered first")]
    DecisionPending,

    #[error("{player} does not have priority")]
    NoPriority { player: PlayerId },

    #[error("the game is not waiting for {what}")]
    NotAwaiting { what: &'static str },

    #[error("{player} is not the player expected to act")]
    WrongPlayer { player: PlayerId },

    // === Timing ===
    #[error("{0} can only be done at sorcery speed")]
    SorcerySpeedOnly(EntityId),

    #[error("no more lands can be played this turn")]
    LandLimitReached,

    // === Objects ===
    #[error("{0} does not exist")]
    ObjectNotFound(EntityId),

    #[error("{object} is not in the required zone ({expected})")]
    WrongZone { object: EntityId, expected: &'static str },

    #[error("{player} does not control {object}")]
    NotController { player: PlayerId, object: EntityId },

    #[error("{0} cannot be cast or played this way")]
    NotCastable(EntityId),

    #[error("{source_object} has no ability at index {index}")]
    NoSuchAbility { source_object: EntityId, index: usize },

    #[error("{0} is not face down")]
    NotFaceDown(EntityId),

    #[error("{0} has no morph cost")]
    NoMorphCost(EntityId),

    // === Costs and targets ===
    #[error("cannot pay cost: {0}")]
    CannotPayCost(String),

    #[error("X was announced as {0} but the cost has no {{X}}")]
    UnexpectedX(u32),

    #[error("target group {group} expects {min}..={max} targets, got {got}")]
    WrongTargetCount { group: usize, min: usize, max: usize, got: usize },

    #[error("illegal target in group {group}")]
    IllegalTarget { group: usize },

    // === Combat ===
    #[error("{creature} cannot attack: {reason}")]
    IllegalAttack { creature: EntityId, reason: &'static str },

    #[error("illegal block by {blocker}: {reason}")]
    IllegalBlock { blocker: EntityId, reason: &'static str },

    #[error("block declaration violates a requirement: {0}")]
    BlockRequirement(&'static str),
}

/// Reasons a decision response is refused.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvalidResponse {
    #[error("no decision is pending")]
    NoPendingDecision,

    #[error("decision {got} is stale, the pending decision is {expected}")]
    StaleDecision { expected: u64, got: u64 },

    #[error("{got} cannot answer a decision addressed to {expected}")]
    WrongPlayer { expected: PlayerId, got: PlayerId },

    #[error("response kind does not match the pending decision ({expected})")]
    WrongKind { expected: &'static str },

    #[error("expected between {min} and {max} choices, got {got}")]
    Cardinality { min: usize, max: usize, got: usize },

    #[error("value {got} outside {min}..={max}")]
    OutOfRange { min: i64, max: i64, got: i64 },

    #[error("choice is not among the offered options")]
    NotAnOption,

    #[error("the same option was chosen twice")]
    Duplicate,

    #[error("distribution must total {expected}, got {got}")]
    DistributionTotal { expected: u32, got: u32 },

    #[error("every recipient must receive at least {min}")]
    DistributionMinimum { min: u32 },

    #[error("damage assignment violates lethal-damage ordering: {0}")]
    AssignmentOrder(&'static str),
}

/// Invalid configuration values.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("player count must be between 2 and 8, got {0}")]
    PlayerCount(usize),

    #[error("starting life must be positive, got {0}")]
    StartingLife(i32),

    #[error("poison threshold must be positive")]
    PoisonThreshold,
}

/// Card catalogue problems.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("a card named {0:?} is already registered")]
    DuplicateName(String),

    #[error("no card named {0:?}")]
    UnknownName(String),
}
