//! Shared wire-adjacent value types (§3).

use crate::consts::{DDA_ONE, NUM_AXES};

/// A queued move segment (§3 "MoveSegment").
///
/// Per-axis fields are carried as `[T; NUM_AXES]` arrays indexed `[X, Y, Z]`
/// rather than as `x`/`y`/`z` fields, so the executor and ramp planner can
/// iterate axes uniformly; the wire codec still reads/writes them in the
/// spec's `x, y, z` field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveSegment {
    /// Host-assigned frame id, echoed back in status/completion responses.
    pub frame_id: u8,
    /// Bit `i` = direction of axis `i`; `1` = forward.
    pub dir_mask: u8,
    /// Cruise velocity per axis, in k-steps/s (multiply by 1000 for steps/s).
    pub v_k_sps: [u16; NUM_AXES],
    /// Total physical steps to emit per axis.
    pub steps: [u32; NUM_AXES],
    /// Q8 proportional gain per axis.
    pub kp: [u16; NUM_AXES],
    /// Q8 integral gain per axis.
    pub ki: [u16; NUM_AXES],
    /// Q8 derivative gain per axis.
    pub kd: [u16; NUM_AXES],
}

impl MoveSegment {
    /// Direction bit for `axis`, `true` = forward.
    pub const fn dir_forward(&self, axis: usize) -> bool {
        (self.dir_mask & (1 << axis)) != 0
    }
}

impl Default for MoveSegment {
    fn default() -> Self {
        MoveSegment {
            frame_id: 0,
            dir_mask: 0,
            v_k_sps: [0; NUM_AXES],
            steps: [0; NUM_AXES],
            kp: [0; NUM_AXES],
            ki: [0; NUM_AXES],
            kd: [0; NUM_AXES],
        }
    }
}

/// Q16.16 fixed-point accumulator value (§4.5 DDA, GLOSSARY "DDA").
///
/// The low 16 bits are the fractional part; a tick is emitted whenever the
/// accumulator reaches or exceeds [`DDA_ONE`] (1.0 in this format).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Q16_16(pub u32);

impl Q16_16 {
    pub const ONE: Q16_16 = Q16_16(DDA_ONE);
    pub const ZERO: Q16_16 = Q16_16(0);

    /// Builds the DDA increment for one step tick from a velocity in
    /// steps/s and the step-tick frequency in Hz (§4.4 step 7):
    /// `dda_inc_q16 = (v_actual_sps << 16) / STEP_TICK_HZ`.
    pub const fn from_rate(steps_per_sec: u32, tick_hz: u32) -> Q16_16 {
        Q16_16((((steps_per_sec as u64) << 16) / tick_hz as u64) as u32)
    }

    pub const fn wrapping_add(self, rhs: Q16_16) -> Q16_16 {
        Q16_16(self.0.wrapping_add(rhs.0))
    }

    pub const fn checked_sub_one(self) -> Option<Q16_16> {
        if self.0 >= DDA_ONE {
            Some(Q16_16(self.0 - DDA_ONE))
        } else {
            None
        }
    }
}

/// Per-axis configuration the host can update at init or runtime
/// (microstepping factor; counts-per-rev is a compile-time board table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisConfig {
    /// Microstep factor in `{1,2,4,...,256}`; wire value `0` means `256`.
    pub microstep_factor: u16,
}

impl Default for AxisConfig {
    fn default() -> Self {
        AxisConfig {
            microstep_factor: 1,
        }
    }
}

/// Decodes a wire microstep value, where `0` means `256` (§6).
pub const fn decode_microsteps(wire: u16) -> u16 {
    if wire == 0 {
        256
    } else {
        wire
    }
}

/// Encodes a microstep factor back to its wire representation (`256 -> 0`).
pub const fn encode_microsteps(factor: u16) -> u16 {
    if factor == 256 {
        0
    } else {
        factor
    }
}

/// Saturating conversion used by `EncoderTracker` (§4.7) when building
/// host-visible absolute positions from a wider accumulator.
pub fn saturate_i32(value: i64) -> i32 {
    if value > i32::MAX as i64 {
        i32::MAX
    } else if value < i32::MIN as i64 {
        i32::MIN
    } else {
        value as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dda_rate_to_increment() {
        let inc = Q16_16::from_rate(25_000, 50_000);
        assert_eq!(inc, Q16_16(1 << 15)); // half a step per tick
    }

    #[test]
    fn microstep_zero_means_256() {
        assert_eq!(decode_microsteps(0), 256);
        assert_eq!(encode_microsteps(256), 0);
        assert_eq!(decode_microsteps(4), 4);
    }

    #[test]
    fn saturate_clamps() {
        assert_eq!(saturate_i32(i64::MAX), i32::MAX);
        assert_eq!(saturate_i32(i64::MIN), i32::MIN);
        assert_eq!(saturate_i32(42), 42);
    }

    #[test]
    fn dir_forward_bit() {
        let seg = MoveSegment {
            dir_mask: 0b101,
            ..Default::default()
        };
        assert!(seg.dir_forward(0));
        assert!(!seg.dir_forward(1));
        assert!(seg.dir_forward(2));
    }
}
