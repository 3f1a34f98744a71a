//! Card objects - a card or token inside a game.
//!
//! A `CardObject` binds an entity to its printed definition and owner.
//! It is deliberately small: status lives in the component store and
//! location in the zone manager.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::definition::CardDefinition;
use crate::core::entity::EntityId;
use crate::core::player::PlayerId;

/// A card or token in a game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardObject {
    /// Entity id of this object.
    pub entity: EntityId,

    /// Printed characteristics and script.
    pub definition: Arc<CardDefinition>,

    /// Player who owns the card (started with it, or created the token).
    pub owner: PlayerId,

    /// Tokens cease to exist when they leave the battlefield.
    pub is_token: bool,
}

impl CardObject {
    /// A card owned by `owner`.
    #[must_use]
    pub fn card(entity: EntityId, definition: Arc<CardDefinition>, owner: PlayerId) -> Self {
        Self {
            entity,
            definition,
            owner,
            is_token: false,
        }
    }

    /// A token created under `owner`'s control.
    #[must_use]
    pub fn token(entity: EntityId, definition: Arc<CardDefinition>, owner: PlayerId) -> Self {
        Self {
            entity,
            definition,
            owner,
            is_token: true,
        }
    }

    /// Printed name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }
}
