//! The stack and the priority-passing protocol.
//!
//! Objects resolve in LIFO order. Players pass priority in turn order;
//! when every player still in the game has passed in succession, the top
//! object resolves (or, with an empty stack, the step ends). Any other
//! action resets the succession.

use im::Vector;
use serde::{Deserialize, Serialize};

use super::object::{StackObject, StackObjectKind};
use crate::core::{EntityId, PlayerId};

/// Result of a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassOutcome {
    /// Priority moves on to this player.
    NextPlayer(PlayerId),
    /// Everyone passed in succession.
    AllPassed,
}

/// The stack (index 0 = bottom, last = top) plus the priority holder.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityStack {
    objects: Vector<StackObject>,
    priority: Option<PlayerId>,
    passes: usize,
}

impl PriorityStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, object: StackObject) {
        self.objects.push_back(object);
    }

    pub fn pop(&mut self) -> Option<StackObject> {
        self.objects.pop_back()
    }

    #[must_use]
    pub fn top(&self) -> Option<&StackObject> {
        self.objects.back()
    }

    /// Take an object out of the stack wherever it is (countering).
    pub fn remove(&mut self, id: EntityId) -> Option<StackObject> {
        let index = self.objects.iter().position(|o| o.id == id)?;
        Some(self.objects.remove(index))
    }

    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&StackObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &StackObject> {
        self.objects.iter()
    }

    /// Controller of the spell whose card is `card`.
    #[must_use]
    pub fn spell_controller(&self, card: EntityId) -> Option<PlayerId> {
        self.objects
            .iter()
            .find(|o| o.id == card && matches!(o.kind, StackObjectKind::Spell { .. }))
            .map(|o| o.controller)
    }

    #[must_use]
    pub fn priority_player(&self) -> Option<PlayerId> {
        self.priority
    }

    /// Give priority to `player` and restart the pass succession.
    pub fn grant(&mut self, player: PlayerId) {
        self.priority = Some(player);
        self.passes = 0;
    }

    /// Nobody holds priority (between steps, during turn-based actions).
    pub fn clear_priority(&mut self) {
        self.priority = None;
        self.passes = 0;
    }

    /// `player` passes. `seats` lists the players still in the game in turn
    /// order.
    pub fn pass(&mut self, player: PlayerId, seats: &[PlayerId]) -> PassOutcome {
        self.passes += 1;
        if self.passes >= seats.len() {
            self.priority = None;
            self.passes = 0;
            return PassOutcome::AllPassed;
        }
        let next = seats
            .iter()
            .position(|&p| p == player)
            .map_or(seats[0], |i| seats[(i + 1) % seats.len()]);
        self.priority = Some(next);
        PassOutcome::NextPlayer(next)
    }
}
