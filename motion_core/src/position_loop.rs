//! PositionLoop: PI/PID on encoder error, anti-windup, filtered derivative
//! (§4.4 step 4, §4.6). State lives here; the call site (control tick, in
//! [`crate::ramp::RampPlanner`]) supplies `err` already converted to
//! physical steps via [`crate::encoder::actual_steps`].
//!
//! Structurally this follows the teacher's `control/pid.rs` (integral state
//! + anti-windup + filtered derivative, `reset()` on segment start), but the
//! arithmetic is reworked from `f64` backward-Euler into the exact
//! fixed-point formula mandated by §4.4 — no floating point in the hot path.

use motion_common::consts::NUM_AXES;

/// Per-axis PID state (§4.6). Reset to zero on `begin_segment`.
#[derive(Debug, Clone, Copy, Default)]
struct AxisPidState {
    i_accum: i32,
    prev_err: i32,
    d_filt: i32,
}

/// Result of one [`PositionLoop::step`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PidStepResult {
    /// Error after deadband, in physical steps — what `MOVE_QUEUE_STATUS`
    /// reports as `pidErr` (saturated to `i8` by the caller).
    pub err: i32,
    /// `v_cmd + corr`, clamped to `[0, max_sps]` — not yet ramp-limited.
    pub v_adj: u32,
}

pub struct PositionLoop {
    axes: [AxisPidState; NUM_AXES],
}

impl PositionLoop {
    pub const fn new() -> Self {
        PositionLoop {
            axes: [AxisPidState {
                i_accum: 0,
                prev_err: 0,
                d_filt: 0,
            }; NUM_AXES],
        }
    }

    /// Zeroes all PID state for `axis`; called from `begin_segment` (§4.6).
    pub fn reset(&mut self, axis: usize) {
        self.axes[axis] = AxisPidState::default();
    }

    /// The deadbanded error computed by the most recent [`Self::step`] call
    /// for `axis`, used to fill `pidErr` fields in status/telemetry
    /// responses (§6 `MOVE_QUEUE_STATUS`, `ENCODER_STATUS`).
    pub fn last_err(&self, axis: usize) -> i32 {
        self.axes[axis].prev_err
    }

    /// §4.4 step 4. `desired`/`actual` are physical step counts; `v_cmd` is
    /// the pre-correction commanded velocity (steps/s) for this tick.
    /// Returns `v_cmd` unchanged (clamped) if `kp == ki == kd == 0`.
    #[allow(clippy::too_many_arguments)]
    pub fn step(
        &mut self,
        axis: usize,
        desired: i32,
        actual: i32,
        v_cmd: u32,
        kp: u16,
        ki: u16,
        kd: u16,
        deadband: i32,
        i_clamp: i32,
        shift: u32,
        deriv_alpha: u32,
        max_sps: u32,
    ) -> PidStepResult {
        if kp == 0 && ki == 0 && kd == 0 {
            return PidStepResult {
                err: 0,
                v_adj: v_cmd.min(max_sps),
            };
        }

        let raw_err = desired - actual;
        let err = if raw_err.abs() < deadband { 0 } else { raw_err };

        let st = &mut self.axes[axis];
        let i_candidate = (st.i_accum + err).clamp(-i_clamp, i_clamp);

        let draw = err - st.prev_err;
        let d_filt_new = st.d_filt + ((draw - st.d_filt) >> deriv_alpha);

        let corr_wide =
            (kp as i64 * err as i64) + (ki as i64 * i_candidate as i64) + (kd as i64 * d_filt_new as i64);
        let corr = (corr_wide >> shift).clamp(-(max_sps as i64), max_sps as i64) as i32;

        let v_adj_signed = (v_cmd as i64 + corr as i64).clamp(0, max_sps as i64);
        let v_adj = v_adj_signed as u32;

        // Anti-windup: only commit the integral if the output isn't saturated.
        let saturated = v_adj == 0 || v_adj == max_sps;
        if !saturated {
            st.i_accum = i_candidate;
        }
        st.prev_err = err;
        st.d_filt = d_filt_new;

        PidStepResult { err, v_adj }
    }
}

impl Default for PositionLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_SPS: u32 = 25_000;

    #[test]
    fn zero_gains_passes_through_v_cmd() {
        let mut pl = PositionLoop::new();
        let r = pl.step(0, 1000, 0, 5000, 0, 0, 0, 10, 200_000, 8, 8, MAX_SPS);
        assert_eq!(r.v_adj, 5000);
        assert_eq!(r.err, 0);
    }

    #[test]
    fn deadband_zeroes_small_error() {
        let mut pl = PositionLoop::new();
        let r = pl.step(0, 5, 0, 5000, 256, 0, 0, 10, 200_000, 8, 8, MAX_SPS);
        assert_eq!(r.err, 0);
    }

    #[test]
    fn positive_error_increases_velocity() {
        let mut pl = PositionLoop::new();
        let r = pl.step(0, 1000, 0, 5000, 256, 0, 0, 10, 200_000, 8, 8, MAX_SPS);
        assert!(r.v_adj > 5000);
        assert_eq!(r.err, 1000);
    }

    #[test]
    fn output_never_exceeds_max_sps() {
        let mut pl = PositionLoop::new();
        let r = pl.step(0, 1_000_000, 0, 20_000, 65535, 65535, 0, 10, 200_000, 8, 8, MAX_SPS);
        assert_eq!(r.v_adj, MAX_SPS);
    }

    #[test]
    fn anti_windup_holds_integral_while_saturated() {
        let mut pl = PositionLoop::new();
        // Drive hard positive error repeatedly; once output saturates at
        // MAX_SPS, i_accum should stop growing.
        for _ in 0..50 {
            let r = pl.step(0, 1_000_000, 0, 20_000, 65535, 65535, 0, 10, 200_000, 8, 8, MAX_SPS);
            assert_eq!(r.v_adj, MAX_SPS);
        }
        let held = pl.axes[0].i_accum;
        pl.step(0, 1_000_000, 0, 20_000, 65535, 65535, 0, 10, 200_000, 8, 8, MAX_SPS);
        assert_eq!(pl.axes[0].i_accum, held);
    }

    #[test]
    fn reset_zeroes_state() {
        let mut pl = PositionLoop::new();
        pl.step(0, 1000, 0, 5000, 256, 100, 10, 10, 200_000, 8, 8, MAX_SPS);
        pl.reset(0);
        assert_eq!(pl.axes[0].i_accum, 0);
        assert_eq!(pl.axes[0].prev_err, 0);
        assert_eq!(pl.axes[0].d_filt, 0);
    }
}
