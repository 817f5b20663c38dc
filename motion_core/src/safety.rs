//! SafetyGate: E-STOP state and admission checks for motion commands
//! (§4.10, §3 "SafetyState").

use motion_common::error::CoreError;
use motion_common::state::SafetyState;

/// E-STOP state holder and admission gate. The actual emergency-stop
/// sequencing (disable drivers, clear queue, drop active segment, emit
/// `MOVE_END(emergency)`) lives in [`crate::core::MotionCore::assert_estop`];
/// this type only tracks the state and the admission rule of §4.10.
#[derive(Debug, Default)]
pub struct SafetyGate {
    state: SafetyState,
}

impl SafetyGate {
    pub const fn new() -> Self {
        SafetyGate {
            state: SafetyState::Normal,
        }
    }

    pub fn state(&self) -> SafetyState {
        self.state
    }

    pub fn is_safe(&self) -> bool {
        self.state.is_safe()
    }

    /// `NORMAL -> ESTOP`. Called from EXTI ISR context on an asserting edge
    /// (§6); only flips the tag, callers perform the actual stop sequence.
    pub fn assert_estop(&mut self) {
        self.state.assert_estop();
    }

    /// `ESTOP -> RECOVERY_WAIT`. Called on a releasing edge.
    pub fn release_estop(&mut self) {
        self.state.release_estop();
    }

    /// Admission check for `MOVE_QUEUE_ADD`/`START_MOVE` (§4.10). Only
    /// `ESTOP` rejects; `RECOVERY_WAIT` admits and collapses to `NORMAL` on
    /// success, since `RECOVERY_WAIT -> NORMAL` is defined to happen "on
    /// next successful admission" (§3) — `is_safe()` alone would make that
    /// transition unreachable, so admission uses this wider check while
    /// `is_safe()` keeps the spec's narrower "true only in NORMAL" meaning.
    pub fn admit(&mut self) -> Result<(), CoreError> {
        if self.state == SafetyState::Estop {
            return Err(CoreError::RangeError("blocked_safety"));
        }
        self.state.clear_recovery();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_admits() {
        let mut gate = SafetyGate::new();
        assert!(gate.admit().is_ok());
    }

    #[test]
    fn estop_blocks_admission() {
        let mut gate = SafetyGate::new();
        gate.assert_estop();
        assert!(!gate.is_safe());
        assert!(matches!(gate.admit(), Err(CoreError::RangeError(_))));
    }

    #[test]
    fn recovery_wait_admits_and_clears() {
        let mut gate = SafetyGate::new();
        gate.assert_estop();
        gate.release_estop();
        assert_eq!(gate.state(), SafetyState::RecoveryWait);
        assert!(gate.admit().is_ok());
        assert_eq!(gate.state(), SafetyState::Normal);
    }
}
