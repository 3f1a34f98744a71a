//! The rules: turn structure, state-based actions and the game driver.
//!
//! [`Game`] is the entry point. It accepts [`Command`](crate::core::Command)s
//! and decision responses and runs everything else (turn-based actions,
//! state-based actions, triggers, resolution) until a player has to act.

pub mod engine;
pub mod sba;
pub mod turn;

pub use engine::{CommandOutcome, Game, Progress};
pub use sba::StateBasedActionChecker;
pub use turn::StepFlow;
