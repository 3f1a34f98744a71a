//! Combat: declarations, restrictions and damage.
//!
//! ## Key Types
//!
//! - `AttackTarget`: a player or a planeswalker
//! - `CombatState`: attackers, blocks, damage assignment orders and the
//!   per-step damage assignments, present from beginning of combat until
//!   end of combat
//!
//! Declarations are validated as a whole ([`declare`]) and rejected without
//! partial commits. Damage ([`damage`]) is assigned for every creature first,
//! then dealt simultaneously.

pub mod damage;
pub mod declare;

use im::{OrdMap, OrdSet, Vector};
use serde::{Deserialize, Serialize};

use crate::core::{EntityId, GameState, PlayerId};
use crate::effects::Target;

pub use damage::{auto_assign, lethal_damage, Assignment};
pub use declare::{can_block, validate_attackers, validate_blockers};

/// What an attacking creature attacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AttackTarget {
    Player(PlayerId),
    Planeswalker(EntityId),
}

impl AttackTarget {
    /// The player defending against this attack.
    #[must_use]
    pub fn defending_player(self, state: &GameState) -> Option<PlayerId> {
        match self {
            Self::Player(player) => Some(player),
            Self::Planeswalker(walker) => state
                .components
                .controller(walker)
                .or_else(|| state.objects.get(&walker).map(|o| o.owner)),
        }
    }

    /// As a damage target.
    #[must_use]
    pub fn as_target(self) -> Target {
        match self {
            Self::Player(player) => Target::Player(player),
            Self::Planeswalker(walker) => Target::Object(walker),
        }
    }
}

/// Combat bookkeeping for the current turn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatState {
    pub attackers: OrdMap<EntityId, AttackTarget>,
    /// Blocker -> the attacker it blocks.
    pub blockers: OrdMap<EntityId, EntityId>,
    /// Attacker -> its blockers in damage assignment order.
    pub damage_order: OrdMap<EntityId, Vector<EntityId>>,
    /// Attackers that became blocked. They stay blocked even if every
    /// blocker is removed.
    pub blocked: OrdSet<EntityId>,
    /// Creatures that dealt damage in the first-strike damage step.
    pub first_strike_dealt: OrdSet<EntityId>,
    /// Damage assignments collected for the current damage step.
    pub assignments: OrdMap<EntityId, Assignment>,
    pub attackers_declared: bool,
    pub defenders_listed: bool,
    /// Defending players that still have to declare blockers, in APNAP
    /// order.
    pub defenders_pending: Vector<PlayerId>,
    pub blockers_declared: bool,
}

impl CombatState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_attacking(&self, entity: EntityId) -> bool {
        self.attackers.contains_key(&entity)
    }

    #[must_use]
    pub fn is_blocking(&self, entity: EntityId) -> bool {
        self.blockers.contains_key(&entity)
    }

    #[must_use]
    pub fn is_blocked(&self, attacker: EntityId) -> bool {
        self.blocked.contains(&attacker)
    }

    /// Blockers of `attacker`, in damage assignment order when one is set.
    #[must_use]
    pub fn blockers_of(&self, attacker: EntityId) -> Vec<EntityId> {
        if let Some(order) = self.damage_order.get(&attacker) {
            return order.iter().copied().filter(|b| self.blockers.contains_key(b)).collect();
        }
        self.blockers
            .iter()
            .filter(|(_, &a)| a == attacker)
            .map(|(&b, _)| b)
            .collect()
    }

    /// Remove a creature from combat (it left the battlefield).
    pub fn remove(&mut self, entity: EntityId) {
        self.attackers.remove(&entity);
        self.blockers.remove(&entity);
        self.damage_order.remove(&entity);
        self.assignments.remove(&entity);
        let attackers: Vec<EntityId> = self.damage_order.keys().copied().collect();
        for attacker in attackers {
            if let Some(order) = self.damage_order.get_mut(&attacker) {
                order.retain(|b| *b != entity);
            }
        }
    }
}
