//! Typed answers to decisions.

use serde::{Deserialize, Serialize};

use crate::cards::{Color, Subtype};
use crate::core::EntityId;
use crate::effects::TargetGroup;

/// One answer per decision kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionResponse {
    /// One group per requested target spec.
    Targets(Vec<TargetGroup>),
    YesNo(bool),
    Number(i64),
    Color(Color),
    CreatureType(Subtype),
    /// Index of the chosen mode.
    Mode(usize),
    /// Permutation of item indices; the first listed comes first.
    Order(Vec<usize>),
    /// Amount per recipient, in recipient order.
    Distribution(Vec<u32>),
    Selection(Vec<EntityId>),
    DamageAssignment { to_blockers: Vec<u32>, to_defender: u32 },
    /// Index into the offered replacement options.
    Replacement(usize),
}

impl DecisionResponse {
    /// Short name of the response kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Targets(_) => "targets",
            Self::YesNo(_) => "yes/no",
            Self::Number(_) => "number",
            Self::Color(_) => "color",
            Self::CreatureType(_) => "creature type",
            Self::Mode(_) => "mode",
            Self::Order(_) => "order",
            Self::Distribution(_) => "distribution",
            Self::Selection(_) => "selection",
            Self::DamageAssignment { .. } => "damage assignment",
            Self::Replacement(_) => "replacement",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_serializes() {
        let response = DecisionResponse::DamageAssignment {
            to_blockers: vec![2, 1],
            to_defender: 0,
        };
        let json = serde_json::to_string(&response).unwrap();
        let back: DecisionResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back, response);
        assert_eq!(back.name(), "damage assignment");
    }
}
