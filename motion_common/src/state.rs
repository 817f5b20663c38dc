//! Tagged state-machine enums (§3, §4.3, §9 "no coroutine-like control flow").

/// Safety interlock state (§3 "SafetyState").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SafetyState {
    #[default]
    Normal = 0,
    Estop = 1,
    RecoveryWait = 2,
}

impl SafetyState {
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(SafetyState::Normal),
            1 => Some(SafetyState::Estop),
            2 => Some(SafetyState::RecoveryWait),
            _ => None,
        }
    }

    /// `NORMAL -> ESTOP`.
    pub fn assert_estop(&mut self) {
        *self = SafetyState::Estop;
    }

    /// `ESTOP -> RECOVERY_WAIT`.
    pub fn release_estop(&mut self) {
        if *self == SafetyState::Estop {
            *self = SafetyState::RecoveryWait;
        }
    }

    /// `RECOVERY_WAIT -> NORMAL` on next successful admission.
    pub fn clear_recovery(&mut self) {
        if *self == SafetyState::RecoveryWait {
            *self = SafetyState::Normal;
        }
    }

    pub const fn is_safe(self) -> bool {
        matches!(self, SafetyState::Normal)
    }
}

/// Move-execution state (§3 "MotionState", §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum MotionState {
    #[default]
    Idle = 0,
    Queued = 1,
    Running = 2,
    Paused = 3,
    Stopping = 4,
    Done = 5,
    Error = 6,
}

impl MotionState {
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(MotionState::Idle),
            1 => Some(MotionState::Queued),
            2 => Some(MotionState::Running),
            3 => Some(MotionState::Paused),
            4 => Some(MotionState::Stopping),
            5 => Some(MotionState::Done),
            6 => Some(MotionState::Error),
            _ => None,
        }
    }

    pub const fn is_running(self) -> bool {
        matches!(self, MotionState::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safety_transitions() {
        let mut s = SafetyState::Normal;
        assert!(s.is_safe());
        s.assert_estop();
        assert_eq!(s, SafetyState::Estop);
        assert!(!s.is_safe());
        s.release_estop();
        assert_eq!(s, SafetyState::RecoveryWait);
        s.clear_recovery();
        assert_eq!(s, SafetyState::Normal);
    }

    #[test]
    fn motion_roundtrip() {
        for raw in 0u8..7 {
            let s = MotionState::from_u8(raw).expect("valid");
            assert_eq!(s as u8, raw);
        }
        assert!(MotionState::from_u8(7).is_none());
    }
}
