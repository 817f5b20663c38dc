//! Wire constants and default configuration knobs (§6).
//!
//! These are the single source of truth referenced by `motion_core`'s frame
//! codec, transport and ramp/DDA engines; nothing here depends on `std`.

/// Request frame header byte.
pub const REQ_HEADER: u8 = 0xAA;
/// Request frame tail byte.
pub const REQ_TAIL: u8 = 0x55;
/// Response frame header byte.
pub const RESP_HEADER: u8 = 0xAB;
/// Response frame tail byte.
pub const RESP_TAIL: u8 = 0x54;

/// Maximum request/response length in bytes (protocol invariant).
pub const MAX_FRAME_LEN: usize = 42;

/// SPI handshake byte: device is ready to accept a new request.
pub const HANDSHAKE_READY: u8 = 0xA5;
/// SPI handshake byte: device's RX queue is full, host should back off.
pub const HANDSHAKE_BUSY: u8 = 0x5A;

/// Primary host "no request, just polling" filler byte.
pub const POLL_BYTE_PRIMARY: u8 = 0x3C;
/// Alternate poll filler byte.
pub const POLL_BYTE_ALTERNATE: u8 = 0xF7;

/// Opcode: queue a new move segment.
pub const OP_MOVE_QUEUE_ADD: u8 = 0x00;
/// Opcode: query queue/motion status.
pub const OP_MOVE_QUEUE_STATUS: u8 = 0x02;
/// Opcode: start executing the queue.
pub const OP_START_MOVE: u8 = 0x03;
/// Opcode: terminate the active move (host-initiated or natural/emergency report).
pub const OP_MOVE_END: u8 = 0x06;
/// Opcode: LED control.
pub const OP_LED_CTRL: u8 = 0x07;
/// Opcode: set encoder origin.
pub const OP_SET_ORIGIN: u8 = 0x24;
/// Opcode: encoder status report.
pub const OP_ENCODER_STATUS: u8 = 0x25;
/// Opcode: set a single microstep factor.
pub const OP_SET_MICROSTEPS: u8 = 0x26;
/// Opcode: set all three axes' microstep factors at once.
pub const OP_SET_MICROSTEPS_AXES: u8 = 0x27;

/// Number of axes this core supports. Non-goal: more than three.
pub const NUM_AXES: usize = 3;

/// High-rate step ISR frequency (Hz). Drives the DDA accumulator.
pub const STEP_TICK_HZ: u32 = 50_000;
/// Low-rate control ISR frequency (Hz). Drives encoder/PID/ramp updates.
pub const CONTROL_TICK_HZ: u32 = 1_000;

/// Minimum STEP-high pulse width, in step-tick periods.
pub const STEP_HIGH_TICKS_DEFAULT: u8 = 1;
/// Minimum STEP-low recovery width, in step-tick periods.
pub const STEP_LOW_TICKS_DEFAULT: u8 = 1;
/// DIR setup time before the first pulse of a segment, in step-tick periods.
pub const DIR_SETUP_TICKS_DEFAULT: u8 = 2;
/// ENABLE-to-first-pulse settle time, in step-tick periods.
pub const ENABLE_SETTLE_TICKS_DEFAULT: u8 = 2;

/// Hardware-derived upper bound on commanded velocity (steps/s):
/// `STEP_TICK_HZ / (STEP_HIGH_TICKS + STEP_LOW_TICKS)`.
pub const MAX_SPS_DEFAULT: u32 =
    STEP_TICK_HZ / (STEP_HIGH_TICKS_DEFAULT as u32 + STEP_LOW_TICKS_DEFAULT as u32);

/// Bounded ring capacity for `MoveQueue`.
pub const MOVE_QUEUE_CAPACITY: usize = 256;
/// Bounded ring capacity for `ResponseFifo` (protocol minimum is 8).
pub const RESP_FIFO_CAPACITY: usize = 8;
/// Bounded ring capacity for `SpiRxQueue`.
pub const SPI_RX_QUEUE_CAPACITY: usize = 8;

/// Default per-axis acceleration, steps/s^2.
pub const DEFAULT_ACCEL_SPS2: u32 = 200_000;

/// Position-loop error deadband, in physical steps.
pub const PI_DEADBAND_STEPS: i32 = 10;
/// Position-loop integral clamp.
pub const PI_I_CLAMP: i32 = 200_000;
/// Position-loop correction right-shift (Q8 gains -> steps/s).
pub const PI_SHIFT: u32 = 8;
/// Derivative low-pass filter shift (`d_filt += (draw - d_filt) >> ALPHA`).
pub const PI_DERIV_FILTER_ALPHA: u32 = 8;

/// Error-throttle: absolute physical-step error beyond which a non-master
/// axis is throttled to `ERR_THROTTLE_MIN_PERMILLE`.
pub const ERR_THROTTLE_THRESHOLD: i32 = 200;
/// Error-throttle: minimum permille (of 1000) applied to a fully-throttled
/// non-master axis.
pub const ERR_THROTTLE_MIN_PERMILLE: u32 = 250;

/// Fixed physical steps-per-revolution at 1x microstepping.
pub const BASE_STEPS_PER_REV: u32 = 400;

/// Per-axis encoder counts-per-revolution, compile-time board table.
/// Index by axis (0=X, 1=Y, 2=Z).
pub const ENC_COUNTS_PER_REV: [u32; NUM_AXES] = [4000, 4000, 4000];

/// Q16.16 fixed-point "one full step" threshold.
pub const DDA_ONE: u32 = 1 << 16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_sps_matches_spec_default() {
        assert_eq!(MAX_SPS_DEFAULT, 25_000);
    }

    #[test]
    fn frame_markers_distinct() {
        assert_ne!(REQ_HEADER, RESP_HEADER);
        assert_ne!(REQ_TAIL, RESP_TAIL);
        assert_ne!(HANDSHAKE_READY, HANDSHAKE_BUSY);
    }
}
