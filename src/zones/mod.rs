//! Zone system for object locations.
//!
//! Libraries, hands, graveyards and exile are scoped to a player; the
//! battlefield, stack and command zone are shared.
//!
//! ## Key Types
//!
//! - `ZoneKind`: Which kind of zone
//! - `ZoneId`: A kind plus optional owner
//! - `ZoneManager`: Location tracking and atomic movement
//! - `ZonePosition`: Position specifier for inserts

pub mod manager;

pub use manager::{ZoneId, ZoneKind, ZoneManager, ZonePosition};
