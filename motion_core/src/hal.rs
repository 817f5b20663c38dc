//! Boundary traits for collaborators the core treats as external (§1, §6,
//! SPEC_FULL §11): the GPIO/timer HAL, the raw encoder counters, the E-STOP
//! EXTI lines, and the telemetry sink. Only the trait boundary and a
//! simulation test double are implemented here — the real drivers are out
//! of scope, the same way the teacher keeps `evo_hal` behind a
//! `driver_registry` instead of inlining register access into the control
//! unit.

use motion_common::consts::NUM_AXES;

/// Per-axis GPIO/timer boundary: direction, enable, and a single step pulse.
/// Implementations must be callable from step-ISR context: no blocking, no
/// allocation (§5).
pub trait StepDriver {
    fn set_dir(&mut self, axis: usize, forward: bool);
    fn set_enable(&mut self, axis: usize, enabled: bool);
    /// Drives the STEP line for `axis` high or low. [`crate::dda::DdaStepEngine`]
    /// calls this on every phase transition; a rising edge (`high == true`)
    /// is the physical pulse.
    fn set_step_line(&mut self, axis: usize, high: bool);
}

/// Raw hardware counter boundary for one axis's quadrature encoder.
pub trait EncoderSource {
    /// Current raw counter value, native hardware width (16 or 32-bit,
    /// represented widened to `u32`; §4.7 computes deltas in native width).
    fn read_raw(&self, axis: usize) -> u32;
    /// Bit width of the underlying hardware counter (16 or 32).
    fn counter_bits(&self, axis: usize) -> u32;
}

/// Safety EXTI boundary: whether an E-STOP line is currently asserted.
pub trait SafetyInput {
    fn is_estop_asserted(&self) -> bool;
}

/// Minimal sink for the out-of-scope telemetry/log collaborator (§1, §7).
pub trait TelemetrySink {
    fn log_event(&mut self, message: &str);
    fn log_error(&mut self, tag: &'static str, message: &str);
}

/// Records every call for test assertions; does not simulate physical pulse
/// timing itself (that is `DdaStepEngine`'s job).
#[derive(Debug, Default)]
pub struct SimStepDriver {
    pub dir_calls: heapless::Vec<(usize, bool), 64>,
    pub enable_calls: heapless::Vec<(usize, bool), 64>,
    pub pulse_counts: [u32; NUM_AXES],
}

impl SimStepDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StepDriver for SimStepDriver {
    fn set_dir(&mut self, axis: usize, forward: bool) {
        let _ = self.dir_calls.push((axis, forward));
    }

    fn set_enable(&mut self, axis: usize, enabled: bool) {
        let _ = self.enable_calls.push((axis, enabled));
    }

    fn set_step_line(&mut self, axis: usize, high: bool) {
        if high {
            self.pulse_counts[axis] += 1;
        }
    }
}

/// Lets tests drive raw counts directly, including deliberate wraparound.
#[derive(Debug, Clone, Copy)]
pub struct SimEncoderSource {
    pub raw: [u32; NUM_AXES],
    pub bits: [u32; NUM_AXES],
}

impl Default for SimEncoderSource {
    fn default() -> Self {
        SimEncoderSource {
            raw: [0; NUM_AXES],
            bits: [32; NUM_AXES],
        }
    }
}

impl EncoderSource for SimEncoderSource {
    fn read_raw(&self, axis: usize) -> u32 {
        self.raw[axis]
    }

    fn counter_bits(&self, axis: usize) -> u32 {
        self.bits[axis]
    }
}

/// Lets tests assert/release E-STOP without real EXTI wiring.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimSafetyInput {
    pub asserted: bool,
}

impl SafetyInput for SimSafetyInput {
    fn is_estop_asserted(&self) -> bool {
        self.asserted
    }
}

/// Collects log lines in memory for test assertions instead of emitting to
/// the out-of-scope CSV/binary telemetry emitter.
#[derive(Debug, Default)]
pub struct SimTelemetrySink {
    pub events: heapless::Vec<heapless::String<96>, 32>,
    pub errors: heapless::Vec<(&'static str, heapless::String<96>), 32>,
}

impl TelemetrySink for SimTelemetrySink {
    fn log_event(&mut self, message: &str) {
        let mut s = heapless::String::new();
        let _ = s.push_str(message);
        let _ = self.events.push(s);
    }

    fn log_error(&mut self, tag: &'static str, message: &str) {
        let mut s = heapless::String::new();
        let _ = s.push_str(message);
        let _ = self.errors.push((tag, s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_step_driver_records_calls() {
        let mut d = SimStepDriver::new();
        d.set_dir(0, true);
        d.set_enable(0, true);
        d.set_step_line(0, true);
        d.set_step_line(0, false);
        d.set_step_line(0, true);
        assert_eq!(d.dir_calls.len(), 1);
        assert_eq!(d.pulse_counts[0], 2);
    }

    #[test]
    fn sim_safety_input_toggles() {
        let mut s = SimSafetyInput::default();
        assert!(!s.is_estop_asserted());
        s.asserted = true;
        assert!(s.is_estop_asserted());
    }
}
