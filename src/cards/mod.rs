//! Card system: characteristics, mana, abilities, definitions, registry.
//!
//! ## Key Types
//!
//! - `CardDefinition`: Printed characteristics and ability script
//! - `AbilityDef`: Static, triggered and activated abilities
//! - `ManaCost` / `ManaPool`: Costs and payment
//! - `CardObject`: A card or token inside a game
//! - `CardRegistry`: Definition lookup by id and name

pub mod ability;
pub mod definition;
pub mod instance;
pub mod mana;
pub mod registry;
pub mod types;

pub use ability::{AbilityDef, ActivatedAbility, StaticAbility, TriggeredAbility};
pub use definition::{CardDefinition, CardId};
pub use instance::CardObject;
pub use mana::{ManaCost, ManaPool, ManaType};
pub use registry::CardRegistry;
pub use types::{CardType, Color, ColorSet, Keyword, Subtype, Supertype};
