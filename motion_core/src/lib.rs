//! # Motion Core
//!
//! Real-time axis control brain for a three-axis CNC motion controller.
//! Provides the deterministic step-tick/control-tick pair that decodes SPI
//! frames from the host, runs the move queue and segment executor, the
//! trapezoidal ramp and position-loop controller, and the DDA pulse
//! generator, then encodes responses back onto the wire.
//!
//! ## Zero-Allocation Hot Path
//!
//! Axis state, the move queue and the SPI frame queues are fixed-size
//! (`heapless`), allocated once at [`core::MotionCore::new`]. Neither
//! [`core::MotionCore::step_tick`] nor [`core::MotionCore::control_tick`]
//! allocates.

#![deny(clippy::disallowed_types)]

pub mod config;
pub mod core;
pub mod dda;
pub mod encoder;
pub mod error;
pub mod executor;
pub mod fifo;
pub mod frame;
pub mod hal;
pub mod position_loop;
pub mod queue;
pub mod ramp;
pub mod router;
pub mod safety;
pub mod transport;

pub use crate::core::MotionCore;
