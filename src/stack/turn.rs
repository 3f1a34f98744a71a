//! Turn structure: phases, steps and where the current step stands.

use serde::{Deserialize, Serialize};

use crate::core::PlayerId;

/// Phases of a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    Beginning,
    PrecombatMain,
    Combat,
    PostcombatMain,
    Ending,
}

/// Steps of a turn, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Step {
    Untap,
    Upkeep,
    Draw,
    PrecombatMain,
    BeginCombat,
    DeclareAttackers,
    DeclareBlockers,
    FirstStrikeDamage,
    CombatDamage,
    EndCombat,
    PostcombatMain,
    End,
    Cleanup,
}

impl Step {
    pub const ORDER: [Step; 13] = [
        Step::Untap,
        Step::Upkeep,
        Step::Draw,
        Step::PrecombatMain,
        Step::BeginCombat,
        Step::DeclareAttackers,
        Step::DeclareBlockers,
        Step::FirstStrikeDamage,
        Step::CombatDamage,
        Step::EndCombat,
        Step::PostcombatMain,
        Step::End,
        Step::Cleanup,
    ];

    #[must_use]
    pub fn phase(self) -> Phase {
        match self {
            Self::Untap | Self::Upkeep | Self::Draw => Phase::Beginning,
            Self::PrecombatMain => Phase::PrecombatMain,
            Self::BeginCombat
            | Self::DeclareAttackers
            | Self::DeclareBlockers
            | Self::FirstStrikeDamage
            | Self::CombatDamage
            | Self::EndCombat => Phase::Combat,
            Self::PostcombatMain => Phase::PostcombatMain,
            Self::End | Self::Cleanup => Phase::Ending,
        }
    }

    /// The following step in the same turn; `None` after cleanup.
    #[must_use]
    pub fn next(self) -> Option<Step> {
        let index = Self::ORDER.iter().position(|&s| s == self)?;
        Self::ORDER.get(index + 1).copied()
    }

    /// Do players normally receive priority in this step?
    #[must_use]
    pub fn has_priority(self) -> bool {
        !matches!(self, Self::Untap | Self::Cleanup)
    }

    #[must_use]
    pub fn is_main(self) -> bool {
        matches!(self, Self::PrecombatMain | Self::PostcombatMain)
    }

    #[must_use]
    pub fn is_combat(self) -> bool {
        self.phase() == Phase::Combat
    }
}

/// Progress within the current step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStage {
    /// Turn-based actions have not finished yet.
    #[default]
    Start,
    /// Waiting for the active player to declare attackers.
    AwaitingAttackers,
    /// Waiting for a defending player to declare blockers.
    AwaitingBlockers,
    /// Players pass priority.
    Priority,
}

/// Where the game is in the turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    /// 0 before the game starts; the first turn is 1.
    pub turn_number: u32,
    pub active_player: PlayerId,
    pub step: Step,
    pub stage: StepStage,
    /// Something happened during cleanup, so players get priority and
    /// another cleanup step follows.
    pub cleanup_needs_priority: bool,
}

impl TurnState {
    #[must_use]
    pub fn new(active_player: PlayerId) -> Self {
        Self {
            turn_number: 0,
            active_player,
            step: Step::Untap,
            stage: StepStage::Start,
            cleanup_needs_priority: false,
        }
    }

    /// Sorcery timing: a main phase of the player's own turn.
    #[must_use]
    pub fn is_sorcery_window(&self, player: PlayerId) -> bool {
        self.active_player == player && self.step.is_main() && self.stage == StepStage::Priority
    }
}
