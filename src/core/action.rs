//! Player commands and the history of accepted ones.
//!
//! A command is what a player asks the engine to do. Each one is checked
//! against timing, cost and legality rules as a whole; a rejected command
//! changes nothing.
//!
//! ## Example
//!
//! ```
//! use rust_tcg::core::{Command, EntityId};
//!
//! let bolt = Command::CastSpell {
//!     card: EntityId(12),
//!     targets: Vec::new(),
//!     x: 0,
//! };
//! assert!(!bolt.is_pass());
//! assert!(Command::PassPriority.is_pass());
//! ```

use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use super::player::PlayerId;
use crate::combat::AttackTarget;
use crate::effects::TargetGroup;

/// Something a player does.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    PassPriority,
    PlayLand {
        card: EntityId,
    },
    /// Cast a spell from hand. `targets` has one group per target spec of
    /// the spell (the enchanted object for an Aura).
    CastSpell {
        card: EntityId,
        targets: Vec<TargetGroup>,
        x: u32,
    },
    /// Cast a card with morph face down for {3}.
    CastFaceDown {
        card: EntityId,
    },
    /// Activate ability `index` of a permanent.
    ActivateAbility {
        source: EntityId,
        index: usize,
        targets: Vec<TargetGroup>,
        x: u32,
    },
    DeclareAttackers(Vec<(EntityId, AttackTarget)>),
    /// (blocker, attacker) pairs.
    DeclareBlockers(Vec<(EntityId, EntityId)>),
    /// Special action: pay the morph cost and turn a permanent face up.
    TurnFaceUp {
        object: EntityId,
    },
    Concede,
}

impl Command {
    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::PassPriority)
    }

    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PassPriority => "pass",
            Self::PlayLand { .. } => "play land",
            Self::CastSpell { .. } => "cast",
            Self::CastFaceDown { .. } => "cast face down",
            Self::ActivateAbility { .. } => "activate",
            Self::DeclareAttackers(_) => "declare attackers",
            Self::DeclareBlockers(_) => "declare blockers",
            Self::TurnFaceUp { .. } => "turn face up",
            Self::Concede => "concede",
        }
    }
}

/// An accepted command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub player: PlayerId,
    pub command: Command,
    pub turn: u32,
    /// Position within the turn.
    pub sequence: u32,
}

impl ActionRecord {
    #[must_use]
    pub fn new(player: PlayerId, command: Command, turn: u32, sequence: u32) -> Self {
        Self {
            player,
            command,
            turn,
            sequence,
        }
    }
}
