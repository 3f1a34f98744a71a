//! Decision kinds and response validation.

use serde::{Deserialize, Serialize};

use super::response::DecisionResponse;
use crate::core::{EntityId, InvalidResponse};
use crate::effects::{ReplacementKey, Target, TargetSpec};

/// What is being asked, with the constraints an answer must satisfy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionKind {
    /// Pick targets for each spec; `legal[i]` lists the legal choices for
    /// `specs[i]`.
    ChooseTargets {
        source: EntityId,
        specs: Vec<TargetSpec>,
        legal: Vec<Vec<Target>>,
    },
    /// "You may ..."
    YesNo { source: EntityId },
    ChooseNumber { min: i64, max: i64 },
    ChooseColor,
    ChooseCreatureType,
    /// Pick one of `modes` modes by index.
    ChooseMode { modes: usize },
    /// Put `items` in order. The answer is a permutation of their indices.
    Order { items: Vec<EntityId> },
    /// Divide `amount` among `recipients`, at least `min_each` to each.
    Distribute {
        amount: u32,
        recipients: Vec<Target>,
        min_each: u32,
    },
    /// Pick between `min` and `max` of `options` (searching, discarding,
    /// sacrificing, choosing objects).
    SelectFromSet {
        options: Vec<EntityId>,
        min: usize,
        max: usize,
    },
    /// Divide `power` combat damage among ordered blockers. Each blocker is
    /// listed with the damage that counts as lethal for it.
    AssignCombatDamage {
        attacker: EntityId,
        power: u32,
        blockers: Vec<(EntityId, u32)>,
        trample: bool,
        defender: Option<Target>,
    },
    /// Pick which replacement effect applies first.
    ChooseReplacement { options: Vec<ReplacementKey> },
}

impl DecisionKind {
    /// Short name, used in error messages and logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChooseTargets { .. } => "targets",
            Self::YesNo { .. } => "yes/no",
            Self::ChooseNumber { .. } => "number",
            Self::ChooseColor => "color",
            Self::ChooseCreatureType => "creature type",
            Self::ChooseMode { .. } => "mode",
            Self::Order { .. } => "order",
            Self::Distribute { .. } => "distribution",
            Self::SelectFromSet { .. } => "selection",
            Self::AssignCombatDamage { .. } => "damage assignment",
            Self::ChooseReplacement { .. } => "replacement",
        }
    }

    /// Check `response` against the constraints of this decision.
    pub fn validate(&self, response: &DecisionResponse) -> Result<(), InvalidResponse> {
        let wrong_kind = || InvalidResponse::WrongKind { expected: self.name() };
        match (self, response) {
            (Self::ChooseTargets { specs, legal, .. }, DecisionResponse::Targets(groups)) => {
                cardinality(specs.len(), specs.len(), groups.len())?;
                for ((spec, legal), group) in specs.iter().zip(legal).zip(groups) {
                    cardinality(spec.min, spec.max, group.len())?;
                    distinct(group.iter())?;
                    if group.iter().any(|t| !legal.contains(t)) {
                        return Err(InvalidResponse::NotAnOption);
                    }
                }
                Ok(())
            }
            (Self::YesNo { .. }, DecisionResponse::YesNo(_))
            | (Self::ChooseColor, DecisionResponse::Color(_)) => Ok(()),
            (Self::ChooseCreatureType, DecisionResponse::CreatureType(subtype)) => {
                if subtype.0.trim().is_empty() {
                    Err(InvalidResponse::NotAnOption)
                } else {
                    Ok(())
                }
            }
            (Self::ChooseNumber { min, max }, DecisionResponse::Number(n)) => {
                if n < min || n > max {
                    Err(InvalidResponse::OutOfRange {
                        min: *min,
                        max: *max,
                        got: *n,
                    })
                } else {
                    Ok(())
                }
            }
            (Self::ChooseMode { modes }, DecisionResponse::Mode(mode)) => {
                if *mode >= *modes {
                    Err(InvalidResponse::OutOfRange {
                        min: 0,
                        max: *modes as i64 - 1,
                        got: *mode as i64,
                    })
                } else {
                    Ok(())
                }
            }
            (Self::Order { items }, DecisionResponse::Order(order)) => {
                cardinality(items.len(), items.len(), order.len())?;
                if order.iter().any(|&i| i >= items.len()) {
                    return Err(InvalidResponse::NotAnOption);
                }
                distinct(order.iter())
            }
            (
                Self::Distribute {
                    amount,
                    recipients,
                    min_each,
                },
                DecisionResponse::Distribution(split),
            ) => {
                cardinality(recipients.len(), recipients.len(), split.len())?;
                if split.iter().any(|part| part < min_each) {
                    return Err(InvalidResponse::DistributionMinimum { min: *min_each });
                }
                checked_total(*amount, split.iter().copied())
            }
            (Self::SelectFromSet { options, min, max }, DecisionResponse::Selection(picked)) => {
                cardinality(*min, *max, picked.len())?;
                if picked.iter().any(|e| !options.contains(e)) {
                    return Err(InvalidResponse::NotAnOption);
                }
                distinct(picked.iter())
            }
            (
                Self::AssignCombatDamage {
                    power,
                    blockers,
                    trample,
                    defender,
                    ..
                },
                DecisionResponse::DamageAssignment {
                    to_blockers,
                    to_defender,
                },
            ) => validate_assignment(*power, blockers, *trample, defender.is_some(), to_blockers, *to_defender),
            (Self::ChooseReplacement { options }, DecisionResponse::Replacement(index)) => {
                if *index < options.len() {
                    Ok(())
                } else {
                    Err(InvalidResponse::NotAnOption)
                }
            }
            _ => Err(wrong_kind()),
        }
    }
}

fn cardinality(min: usize, max: usize, got: usize) -> Result<(), InvalidResponse> {
    if got < min || got > max {
        Err(InvalidResponse::Cardinality { min, max, got })
    } else {
        Ok(())
    }
}

fn distinct<'a, T: PartialEq + 'a>(items: impl Iterator<Item = &'a T>) -> Result<(), InvalidResponse> {
    let items: Vec<&T> = items.collect();
    for (i, item) in items.iter().enumerate() {
        if items[..i].contains(item) {
            return Err(InvalidResponse::Duplicate);
        }
    }
    Ok(())
}

/// The parts must add up to exactly `expected`. A sum past `u32::MAX` is
/// reported as `got: u32::MAX`.
fn checked_total(expected: u32, parts: impl IntoIterator<Item = u32>) -> Result<(), InvalidResponse> {
    let total = parts
        .into_iter()
        .try_fold(0u32, |acc, part| acc.checked_add(part))
        .ok_or(InvalidResponse::DistributionTotal {
            expected,
            got: u32::MAX,
        })?;
    if total != expected {
        return Err(InvalidResponse::DistributionTotal { expected, got: total });
    }
    Ok(())
}

/// Combat damage must be lethal to a blocker before any is assigned to the
/// next one, and only trample lets the excess reach the defender.
fn validate_assignment(
    power: u32,
    blockers: &[(EntityId, u32)],
    trample: bool,
    has_defender: bool,
    to_blockers: &[u32],
    to_defender: u32,
) -> Result<(), InvalidResponse> {
    cardinality(blockers.len(), blockers.len(), to_blockers.len())?;
    checked_total(power, to_blockers.iter().copied().chain([to_defender]))?;
    let mut short = false;
    for (&(_, lethal), &assigned) in blockers.iter().zip(to_blockers) {
        if short && assigned > 0 {
            return Err(InvalidResponse::AssignmentOrder(
                "damage assigned past a blocker that was not assigned lethal damage",
            ));
        }
        short = assigned < lethal;
    }
    if to_defender > 0 {
        if !trample || !has_defender {
            return Err(InvalidResponse::AssignmentOrder("only trample assigns damage to the defender"));
        }
        if short {
            return Err(InvalidResponse::AssignmentOrder(
                "every blocker must be assigned lethal damage before trampling over",
            ));
        }
    }
    Ok(())
}
