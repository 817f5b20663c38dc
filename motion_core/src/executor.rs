//! SegmentExecutor: active-segment state, chain to next, natural-done
//! detection (§3 "AxisState", §4.3).

use motion_common::consts::NUM_AXES;
use motion_common::types::{MoveSegment, Q16_16};

use crate::position_loop::PositionLoop;

/// Per-axis runtime state, owned by [`SegmentExecutor`] (§3 "AxisState").
/// Mutated by the main poll (on `begin_segment`) and by the step/control
/// ISRs for the DDA/pulse counters and `v_actual_sps` respectively — every
/// such ISR touch happens inside a critical section per §5.
#[derive(Debug, Clone, Copy, Default)]
pub struct AxisState {
    pub total_steps: u32,
    pub target_steps: u32,
    pub emitted_steps: u32,
    pub kp: u16,
    pub ki: u16,
    pub kd: u16,
    pub step_high_ticks: u8,
    pub step_low_ticks: u8,
    pub en_settle_ticks: u8,
    pub dir_settle_ticks: u8,
    pub dda_accum: Q16_16,
    pub dda_inc: Q16_16,
    pub dir_forward: bool,
    pub v_target_sps: u32,
    pub v_actual_sps: u32,
    pub accel_sps2: u32,
    /// Discrete ramp accumulator (§4.4 step 5's "Accumulator approach");
    /// carried on `AxisState` because it is per-axis persistent state
    /// touched every control tick, same lifetime as the rest of this struct.
    pub ramp_accum: u32,

    /// Microstep factor applied to this axis, host-configurable via
    /// `SET_MICROSTEPS`/`SET_MICROSTEPS_AXES` (§6). Defaults to 1x.
    pub microstep_factor: u16,
}

impl AxisState {
    /// Physical steps still to emit in the active segment.
    pub fn active_rem(&self) -> u32 {
        self.total_steps.saturating_sub(self.emitted_steps)
    }
}

pub struct SegmentExecutor {
    active_segment: Option<MoveSegment>,
    axes: [AxisState; NUM_AXES],
}

impl SegmentExecutor {
    pub fn new() -> Self {
        SegmentExecutor {
            active_segment: None,
            axes: [AxisState {
                microstep_factor: 1,
                ..Default::default()
            }; NUM_AXES],
        }
    }

    pub fn axis(&self, axis: usize) -> &AxisState {
        &self.axes[axis]
    }

    pub fn axis_mut(&mut self, axis: usize) -> &mut AxisState {
        &mut self.axes[axis]
    }

    pub fn has_active_segment(&self) -> bool {
        self.active_segment.is_some()
    }

    pub fn active_frame_id(&self) -> Option<u8> {
        self.active_segment.map(|s| s.frame_id)
    }

    /// Loads `seg` into per-axis state (§4.3 `begin_segment`). `was_running`
    /// decides whether `v_actual_sps` is preserved (smooth chaining while
    /// already RUNNING) or reset to zero (DESIGN.md Open Question 3).
    pub fn begin_segment(
        &mut self,
        seg: MoveSegment,
        max_sps: u32,
        default_accel_sps2: u32,
        dir_setup_ticks: u8,
        enable_settle_ticks: u8,
        was_running: bool,
        position_loop: &mut PositionLoop,
    ) {
        for axis in 0..NUM_AXES {
            let total = seg.steps[axis];
            let microstep_factor = self.axes[axis].microstep_factor;
            let a = &mut self.axes[axis];
            a.total_steps = total;
            a.emitted_steps = 0;
            a.target_steps = 0;
            a.dir_forward = seg.dir_forward(axis);
            a.kp = seg.kp[axis];
            a.ki = seg.ki[axis];
            a.kd = seg.kd[axis];
            a.step_high_ticks = 0;
            a.step_low_ticks = 0;
            if total > 0 {
                a.dir_settle_ticks = dir_setup_ticks;
                a.en_settle_ticks = enable_settle_ticks;
            } else {
                a.dir_settle_ticks = 0;
                a.en_settle_ticks = 0;
            }
            a.v_target_sps = (seg.v_k_sps[axis] as u32 * 1000).min(max_sps);
            a.accel_sps2 = default_accel_sps2;
            if !was_running {
                a.v_actual_sps = 0;
                a.ramp_accum = 0;
            }
            a.dda_accum = Q16_16::ZERO;
            a.dda_inc = Q16_16::ZERO;
            a.microstep_factor = microstep_factor;
            position_loop.reset(axis);
        }
        self.active_segment = Some(seg);
    }

    /// Natural-done condition (§4.3): every axis has emitted all its steps
    /// and is not mid-pulse; in progress mode, additionally require zero
    /// total remaining work (active + queued) across all axes.
    pub fn natural_done(&self, progress_mode: bool, queue_rem_steps: &[u32; NUM_AXES]) -> bool {
        let all_axes_idle = (0..NUM_AXES).all(|axis| {
            let a = &self.axes[axis];
            a.emitted_steps >= a.total_steps && a.step_high_ticks == 0
        });
        if !all_axes_idle {
            return false;
        }
        if !progress_mode {
            return true;
        }
        let total_rem: u32 = (0..NUM_AXES)
            .map(|axis| self.axes[axis].active_rem() + queue_rem_steps[axis])
            .sum();
        total_rem == 0
    }

    /// Drops the active segment and zeroes per-axis dynamic state, keeping
    /// configured `microstep_factor`. Used by emergency stop and natural
    /// completion with no next segment.
    pub fn clear(&mut self) {
        self.active_segment = None;
        for axis in self.axes.iter_mut() {
            let ms = axis.microstep_factor;
            *axis = AxisState {
                microstep_factor: ms,
                ..Default::default()
            };
        }
    }
}

impl Default for SegmentExecutor {
    fn default() -> Self {
        Self::new()
    }
}
