//! Continuous effects and the layer system.
//!
//! ## Key Types
//!
//! - `ContinuousEffect` / `EffectArena`: floating effects created by resolving
//!   spells and abilities
//! - `Modification`: one change to characteristics, tagged with its layer
//! - `Characteristics` / `ProjectedView`: effective values after all layers
//! - [`project`]: the pure projection function
//!
//! Nothing here mutates printed characteristics. Derived values are recomputed
//! on every projection instead of being cached on the state.

pub mod continuous;
pub mod dependency;
pub mod projector;
pub mod view;

pub use continuous::{
    Affected, ContinuousEffect, Duration, EffectArena, EffectId, Layer, Modification, PtSublayer, PtValue,
};
pub use projector::{object_abilities, project};
pub use view::{Characteristics, ProjectedView};
