//! Decision protocol: structured player input requested mid-resolution.
//!
//! ## Key Types
//!
//! - `Decision`: a pending question with an id, the player who must answer
//!   and its constraints (`DecisionKind`)
//! - `DecisionResponse`: one typed answer per kind
//! - `Continuation`: what the engine resumes once the answer arrives
//!
//! At most one decision is pending per game. Requesting one stores it in
//! `GameState::pending_decision` and the engine returns to the caller
//! instead of blocking. A response is validated against the original
//! constraints; an invalid response leaves the decision pending and the
//! state untouched.

pub mod kind;
pub mod response;

use serde::{Deserialize, Serialize};

use crate::core::{EntityId, PlayerId};
use crate::effects::Proposal;
use crate::triggers::PendingTrigger;

pub use kind::DecisionKind;
pub use response::DecisionResponse;

/// Identifier of a decision. Strictly increasing within a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DecisionId(pub u64);

impl std::fmt::Display for DecisionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Decision({})", self.0)
    }
}

/// A question addressed to one player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub id: DecisionId,
    pub player: PlayerId,
    pub kind: DecisionKind,
}

/// Where the engine picks up after the answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Continuation {
    /// The in-flight resolution (`GameState::resolving`) is waiting.
    Resolution,
    /// A proposed event is waiting for its replacement order.
    Replacement(Proposal),
    /// `player` orders their simultaneous triggers.
    TriggerOrder { player: PlayerId },
    /// A trigger waits for targets before going on the stack.
    TriggerTargets(PendingTrigger),
    /// The attacking player orders the blockers of `attacker`.
    BlockerOrder { attacker: EntityId },
    /// The attacking player divides `attacker`'s combat damage.
    CombatDamage { attacker: EntityId },
    /// `player` discards down to maximum hand size.
    CleanupDiscard { player: PlayerId },
}

/// A decision together with its continuation, as stored in the state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDecision {
    pub decision: Decision,
    pub continuation: Continuation,
}
