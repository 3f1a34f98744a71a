//! Objects on the stack.

use serde::{Deserialize, Serialize};

use crate::core::{EntityId, PlayerId, Timestamp};
use crate::effects::{CostRecord, Effect, TargetGroup, TargetSpec};
use crate::triggers::{GameEvent, LastKnown, TriggerOrigin};

/// What kind of object this is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackObjectKind {
    /// A spell. Its id is the card's entity.
    Spell { face_down: bool },
    /// Activated ability `index` of the source.
    Activated { index: usize },
    Triggered { origin: TriggerOrigin },
}

/// A spell or ability waiting to resolve.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackObject {
    /// The card for spells; a fresh entity for abilities.
    pub id: EntityId,
    pub kind: StackObjectKind,
    pub source: EntityId,
    pub controller: PlayerId,
    pub target_specs: Vec<TargetSpec>,
    pub targets: Vec<TargetGroup>,
    pub effects: Vec<Effect>,
    pub x: u32,
    pub costs: CostRecord,
    /// The source as it was when the ability was activated or triggered.
    pub source_snapshot: Option<LastKnown>,
    pub trigger_event: Option<GameEvent>,
    pub timestamp: Timestamp,
}

impl StackObject {
    #[must_use]
    pub fn is_spell(&self) -> bool {
        matches!(self.kind, StackObjectKind::Spell { .. })
    }

    /// Did it have any target when it was put on the stack?
    #[must_use]
    pub fn has_targets(&self) -> bool {
        self.targets.iter().any(|group| !group.is_empty())
    }
}
