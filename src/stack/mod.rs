//! Turn structure, the stack and priority.
//!
//! ## Key Types
//!
//! - `Step` / `Phase` / `TurnState`: where the game is in the turn
//! - `StackObject`: a spell or ability waiting to resolve
//! - `PriorityStack`: LIFO stack plus the priority holder and pass succession
//!
//! The sequencing itself (turn-based actions, advancing steps, handing out
//! priority) lives in [`rules`](crate::rules); this module holds the data.

mod object;
mod priority;
mod turn;

pub use object::{StackObject, StackObjectKind};
pub use priority::{PassOutcome, PriorityStack};
pub use turn::{Phase, Step, StepStage, TurnState};
