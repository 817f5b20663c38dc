//! Shared wire types, state enums and protocol constants for the motion
//! controller core. Kept free of heap allocation in anything touched by the
//! hot path (step tick / control tick); the crate itself is a plain `std`
//! library, matching the rest of this workspace.
#![deny(clippy::disallowed_types)]

pub mod consts;
pub mod error;
pub mod state;
pub mod types;

pub mod prelude {
    pub use crate::consts::*;
    pub use crate::error::CoreError;
    pub use crate::state::{MotionState, SafetyState};
    pub use crate::types::{AxisConfig, MoveSegment, Q16_16};
}
