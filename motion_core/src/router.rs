//! Router: dispatch decoded requests to handlers, collect responses
//! (§4.9). Handler resolution is a fixed `match` over the opcode, compiling
//! down to a jump table — matching §9's "fixed map from opcode to handler
//! callable, resolved at init time; no dynamic registration after start"
//! without needing a runtime-built array.

use motion_common::consts::*;

use crate::core::MotionCore;

pub struct Router;

impl Router {
    /// Dispatches on `TYPE` at offset 1. Unknown types are logged as a
    /// `FRAMING` error and dropped (§4.9, §7).
    pub fn feed_bytes(core: &mut MotionCore, buf: &[u8], len: usize) {
        if len < 2 {
            core.log_error("framing", "frame shorter than 2 bytes, no TYPE field");
            return;
        }
        let opcode = buf[1];
        match opcode {
            OP_MOVE_QUEUE_ADD => core.handle_move_queue_add(buf, len),
            OP_MOVE_QUEUE_STATUS => core.handle_move_queue_status(buf, len),
            OP_START_MOVE => core.handle_start_move(buf, len),
            OP_MOVE_END => core.handle_move_end(buf, len),
            OP_LED_CTRL => core.handle_led_ctrl(buf, len),
            OP_SET_ORIGIN => core.handle_set_origin(buf, len),
            OP_ENCODER_STATUS => core.handle_encoder_status(buf, len),
            OP_SET_MICROSTEPS => core.handle_set_microsteps(buf, len),
            OP_SET_MICROSTEPS_AXES => core.handle_set_microsteps_axes(buf, len),
            other => {
                core.log_error("framing", "unknown opcode");
                let _ = other;
            }
        }
    }

    /// Drains every frame currently queued in `core`'s `SpiRxQueue` through
    /// [`Self::feed_bytes`]. Called once per main-poll iteration (§4.8 "the
    /// main poll drains SpiRxQueue into Router").
    pub fn drain_rx_queue(core: &mut MotionCore) {
        let mut buf = [0u8; MAX_FRAME_LEN];
        loop {
            match core.pop_rx_frame(&mut buf) {
                Some(len) => Self::feed_bytes(core, &buf, len),
                None => break,
            }
        }
    }
}
