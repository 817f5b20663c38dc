//! DdaStepEngine: Q16.16 DDA at step tick, pulse-width timing, step/low
//! guards (§4.5, GLOSSARY "DDA", "Step tick").

use motion_common::types::Q16_16;

use crate::executor::AxisState;
use crate::hal::StepDriver;

/// Minimum pulse-phase widths, in step-tick periods (§6 config knobs).
#[derive(Debug, Clone, Copy)]
pub struct DdaTiming {
    pub step_high_ticks_min: u8,
    pub step_low_ticks_min: u8,
}

pub struct DdaStepEngine {
    timing: DdaTiming,
}

impl DdaStepEngine {
    pub const fn new(timing: DdaTiming) -> Self {
        DdaStepEngine { timing }
    }

    /// One step-tick update for a single axis (§4.5 steps 1-4). `queue_mode`
    /// controls whether `target_steps` follows `emitted_steps` (queue-driven
    /// execution, where the ramp supplies the velocity authority) as
    /// opposed to a fixed target set up-front.
    pub fn tick(&self, axis: &mut AxisState, driver: &mut dyn StepDriver, axis_index: usize, queue_mode: bool) {
        if axis.step_high_ticks > 0 {
            axis.step_high_ticks -= 1;
            if axis.step_high_ticks == 0 {
                driver.set_step_line(axis_index, false);
                axis.step_low_ticks = self.timing.step_low_ticks_min;
            }
            return;
        }
        if axis.step_low_ticks > 0 {
            axis.step_low_ticks -= 1;
            return;
        }
        if axis.en_settle_ticks > 0 {
            axis.en_settle_ticks -= 1;
            return;
        }
        if axis.dir_settle_ticks > 0 {
            axis.dir_settle_ticks -= 1;
            return;
        }
        if axis.emitted_steps < axis.total_steps {
            axis.dda_accum = axis.dda_accum.wrapping_add(axis.dda_inc);
            if let Some(remaining) = axis.dda_accum.checked_sub_one() {
                axis.dda_accum = remaining;
                driver.set_step_line(axis_index, true);
                axis.step_high_ticks = self.timing.step_high_ticks_min;
                axis.emitted_steps += 1;
                if queue_mode {
                    axis.target_steps = axis.emitted_steps;
                }
            }
        }
    }
}

impl AxisState {
    /// Rebuilds `dda_inc` from `v_actual_sps` at the configured step-tick
    /// rate (§4.4 step 7). Called from the control tick after the ramp
    /// planner updates `v_actual_sps`.
    pub fn recompute_dda_inc(&mut self, step_tick_hz: u32) {
        self.dda_inc = Q16_16::from_rate(self.v_actual_sps, step_tick_hz);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::SimStepDriver;

    fn timing() -> DdaTiming {
        DdaTiming {
            step_high_ticks_min: 1,
            step_low_ticks_min: 1,
        }
    }

    #[test]
    fn emits_step_when_accumulator_crosses_one() {
        let engine = DdaStepEngine::new(timing());
        let mut axis = AxisState {
            total_steps: 10,
            v_actual_sps: 25_000,
            ..Default::default()
        };
        axis.recompute_dda_inc(50_000); // half a step per tick
        let mut driver = SimStepDriver::new();

        engine.tick(&mut axis, &mut driver, 0, false);
        assert_eq!(axis.emitted_steps, 0); // accum = 0.5, no step yet

        engine.tick(&mut axis, &mut driver, 0, false);
        assert_eq!(axis.emitted_steps, 1); // accum crossed 1.0
        assert_eq!(driver.pulse_counts[0], 1);
        assert_eq!(axis.step_high_ticks, 1);
    }

    #[test]
    fn pulse_phase_blocks_new_steps_until_low_recovery_elapses() {
        let engine = DdaStepEngine::new(timing());
        let mut axis = AxisState {
            total_steps: 10,
            v_actual_sps: 50_000, // one step per tick, fastest possible
            ..Default::default()
        };
        axis.recompute_dda_inc(50_000);
        let mut driver = SimStepDriver::new();

        engine.tick(&mut axis, &mut driver, 0, false); // emits, enters HIGH
        assert_eq!(axis.emitted_steps, 1);
        assert_eq!(axis.step_high_ticks, 1);

        engine.tick(&mut axis, &mut driver, 0, false); // HIGH -> LOW
        assert_eq!(axis.step_high_ticks, 0);
        assert_eq!(axis.step_low_ticks, 1);
        assert_eq!(axis.emitted_steps, 1); // no new step while in LOW

        engine.tick(&mut axis, &mut driver, 0, false); // LOW elapses
        assert_eq!(axis.step_low_ticks, 0);
    }

    #[test]
    fn settle_ticks_delay_first_pulse() {
        let engine = DdaStepEngine::new(timing());
        let mut axis = AxisState {
            total_steps: 5,
            v_actual_sps: 50_000,
            dir_settle_ticks: 2,
            en_settle_ticks: 1,
            ..Default::default()
        };
        axis.recompute_dda_inc(50_000);
        let mut driver = SimStepDriver::new();

        engine.tick(&mut axis, &mut driver, 0, false); // en_settle
        engine.tick(&mut axis, &mut driver, 0, false); // dir_settle
        engine.tick(&mut axis, &mut driver, 0, false); // dir_settle
        assert_eq!(axis.emitted_steps, 0);
        engine.tick(&mut axis, &mut driver, 0, false); // now free to step
        assert_eq!(axis.emitted_steps, 1);
    }

    #[test]
    fn never_emits_past_total_steps() {
        let engine = DdaStepEngine::new(timing());
        let mut axis = AxisState {
            total_steps: 2,
            v_actual_sps: 50_000,
            ..Default::default()
        };
        axis.recompute_dda_inc(50_000);
        let mut driver = SimStepDriver::new();
        for _ in 0..20 {
            engine.tick(&mut axis, &mut driver, 0, false);
        }
        assert_eq!(axis.emitted_steps, 2);
        assert!(axis.emitted_steps <= axis.total_steps);
    }

    #[test]
    fn queue_mode_tracks_target_steps_to_emitted() {
        let engine = DdaStepEngine::new(timing());
        let mut axis = AxisState {
            total_steps: 3,
            v_actual_sps: 50_000,
            ..Default::default()
        };
        axis.recompute_dda_inc(50_000);
        let mut driver = SimStepDriver::new();
        engine.tick(&mut axis, &mut driver, 0, true);
        assert_eq!(axis.target_steps, axis.emitted_steps);
    }

    proptest::proptest! {
        #[test]
        fn emitted_never_exceeds_total(rate in 0u32..60_000, ticks in 0u32..2000) {
            let engine = DdaStepEngine::new(timing());
            let mut axis = AxisState { total_steps: 50, ..Default::default() };
            axis.v_actual_sps = rate.min(50_000);
            axis.recompute_dda_inc(50_000);
            let mut driver = SimStepDriver::new();
            let mut prev = 0u32;
            for _ in 0..ticks {
                engine.tick(&mut axis, &mut driver, 0, false);
                proptest::prop_assert!(axis.emitted_steps <= axis.total_steps);
                proptest::prop_assert!(axis.emitted_steps - prev <= 1);
                prev = axis.emitted_steps;
            }
        }
    }
}
