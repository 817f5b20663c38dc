//! RampPlanner: per-axis trapezoidal ramp at control tick, master
//! selection, error throttle, brake-distance logic (§4.4).

use motion_common::consts::NUM_AXES;

use crate::encoder::{actual_steps, EncoderTracker};
use crate::executor::{AxisState, SegmentExecutor};
use crate::position_loop::PositionLoop;

/// Per-axis unit-conversion table needed to turn encoder counts into
/// physical steps (§4.4 "Unit conversion for actual_steps").
#[derive(Debug, Clone, Copy)]
pub struct RampConfig {
    pub max_sps: u32,
    pub step_tick_hz: u32,
    pub base_steps_per_rev: u32,
    pub enc_counts_per_rev: [u32; NUM_AXES],
    pub pi_deadband_steps: i32,
    pub pi_i_clamp: i32,
    pub pi_shift: u32,
    pub pi_deriv_alpha: u32,
    pub err_throttle_threshold: i32,
    pub err_throttle_min_permille: u32,
}

pub struct RampPlanner {
    config: RampConfig,
}

impl RampPlanner {
    pub const fn new(config: RampConfig) -> Self {
        RampPlanner { config }
    }

    /// One control-tick update across all axes (§4.4 steps 1-7).
    /// `progress_mode` selects the cross-axis master-selection/error-throttle
    /// scheme (GLOSSARY "Progress mode"); when `false`, each axis ramps
    /// independently against its own remaining distance.
    pub fn control_tick(
        &self,
        executor: &mut SegmentExecutor,
        queue_rem_steps: &[u32; NUM_AXES],
        encoders: &EncoderTracker,
        position_loop: &mut PositionLoop,
        progress_mode: bool,
    ) {
        let master = if progress_mode {
            self.select_master(executor, queue_rem_steps)
        } else {
            None
        };
        let master_rem = master.map(|m| self.axis_rem(executor, queue_rem_steps, m));

        for axis_idx in 0..NUM_AXES {
            if executor.axis(axis_idx).total_steps == 0 && queue_rem_steps[axis_idx] == 0 {
                // No work at all on this axis: force to rest.
                let a = executor.axis_mut(axis_idx);
                a.v_actual_sps = 0;
                a.ramp_accum = 0;
                a.recompute_dda_inc(self.config.step_tick_hz);
                continue;
            }

            let is_master = master == Some(axis_idx);

            // Step 1: base cruise velocity.
            let mut v_cmd = executor.axis(axis_idx).v_target_sps;

            // Step 3: error throttle (non-master axes only, progress mode only).
            let desired = executor.axis(axis_idx).target_steps as i32;
            let actual = actual_steps(
                encoders.relative(axis_idx),
                self.config.base_steps_per_rev,
                executor.axis(axis_idx).microstep_factor,
                self.config.enc_counts_per_rev[axis_idx],
            );
            if progress_mode && !is_master {
                v_cmd = self.throttle(v_cmd, desired, actual);
            }

            // Step 4: position loop.
            let axis = executor.axis(axis_idx);
            let (kp, ki, kd) = (axis.kp, axis.ki, axis.kd);
            let pid = position_loop.step(
                axis_idx,
                desired,
                actual,
                v_cmd,
                kp,
                ki,
                kd,
                self.config.pi_deadband_steps,
                self.config.pi_i_clamp,
                self.config.pi_shift,
                self.config.pi_deriv_alpha,
                self.config.max_sps,
            );
            let v_adj = pid.v_adj;

            // Step 5: trapezoidal ramp, braking distance taken from the
            // master's remaining work when this is a synchronized slave.
            let own_rem = self.axis_rem(executor, queue_rem_steps, axis_idx);
            let rem = if progress_mode && !is_master && master.is_some() {
                master_rem.unwrap_or(own_rem)
            } else {
                own_rem
            };

            let axis = executor.axis_mut(axis_idx);
            apply_trapezoidal_ramp(axis, rem, v_adj, self.config.max_sps);

            // Step 6 is folded into apply_trapezoidal_ramp's clamp + the
            // rem==0 guard above. Step 7: refresh the DDA increment.
            axis.recompute_dda_inc(self.config.step_tick_hz);
        }
    }

    fn axis_rem(&self, executor: &SegmentExecutor, queue_rem_steps: &[u32; NUM_AXES], axis: usize) -> u32 {
        executor.axis(axis).active_rem() + queue_rem_steps[axis]
    }

    /// §4.4 step 2: smallest `emitted_steps/total_steps` ratio among axes
    /// with remaining work, ties broken by axis index; falls back to the
    /// axis with the most total remaining work if none is eligible.
    fn select_master(&self, executor: &SegmentExecutor, queue_rem_steps: &[u32; NUM_AXES]) -> Option<usize> {
        let mut best: Option<(usize, u32, u32)> = None; // (axis, emitted, total)
        for axis_idx in 0..NUM_AXES {
            let a = executor.axis(axis_idx);
            let eligible = a.active_rem() > 0 && self.axis_rem(executor, queue_rem_steps, axis_idx) > 0;
            if !eligible {
                continue;
            }
            let ratio_less = match best {
                None => true,
                Some((_, be, bt)) => {
                    // emitted/total < be/bt  <=>  emitted*bt < be*total (bt, total > 0)
                    (a.emitted_steps as u64) * (bt as u64) < (be as u64) * (a.total_steps as u64)
                }
            };
            if ratio_less {
                best = Some((axis_idx, a.emitted_steps, a.total_steps));
            }
        }
        if let Some((axis, _, _)) = best {
            return Some(axis);
        }
        // Fallback: axis with the largest total remaining work.
        (0..NUM_AXES)
            .map(|axis| (axis, self.axis_rem(executor, queue_rem_steps, axis)))
            .filter(|&(_, rem)| rem > 0)
            .max_by_key(|&(_, rem)| rem)
            .map(|(axis, _)| axis)
    }

    /// §4.4 step 3: scale `v_cmd` linearly from 1000‰ at `err_abs == 0` down
    /// to `ERR_THROTTLE_MIN_PERMILLE` at `err_abs >= THRESHOLD`.
    fn throttle(&self, v_cmd: u32, desired: i32, actual: i32) -> u32 {
        let err_abs = (desired - actual).unsigned_abs();
        let threshold = self.config.err_throttle_threshold.max(1) as u32;
        let min_permille = self.config.err_throttle_min_permille;
        let scale = if err_abs >= threshold {
            min_permille
        } else {
            1000 - (1000 - min_permille) * err_abs / threshold
        };
        (v_cmd as u64 * scale as u64 / 1000) as u32
    }
}

/// `s_brake = v^2 / (2 * accel)`, saturating to `u32`.
fn brake_distance(v_actual_sps: u32, accel_sps2: u32) -> u32 {
    if accel_sps2 == 0 {
        return u32::MAX;
    }
    let v = v_actual_sps as u64;
    ((v * v) / (2 * accel_sps2 as u64)).min(u32::MAX as u64) as u32
}

/// §4.4 steps 5-6: discrete ramp accumulator. `rem == 0` forces an
/// immediate stop regardless of the accumulator's phase.
fn apply_trapezoidal_ramp(axis: &mut AxisState, rem: u32, v_adj: u32, max_sps: u32) {
    if rem == 0 {
        axis.v_actual_sps = 0;
        axis.ramp_accum = 0;
        return;
    }
    axis.ramp_accum += axis.accel_sps2;
    while axis.ramp_accum >= 1000 {
        axis.ramp_accum -= 1000;
        let s_brake = brake_distance(axis.v_actual_sps, axis.accel_sps2);
        if rem <= s_brake {
            axis.v_actual_sps = axis.v_actual_sps.saturating_sub(1);
        } else if axis.v_actual_sps < v_adj {
            axis.v_actual_sps += 1;
        } else if axis.v_actual_sps > v_adj {
            axis.v_actual_sps -= 1;
        }
    }
    axis.v_actual_sps = axis.v_actual_sps.min(max_sps);
}
