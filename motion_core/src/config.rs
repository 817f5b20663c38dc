//! Init-time configuration knobs (§6, SPEC_FULL §10.3).
//!
//! Mirrors the teacher's `config.rs` shape: parse TOML, validate bounds,
//! build an immutable bundle. The target firmware can skip the filesystem
//! step entirely and link in [`LoadedConfig::default`]; the `sim`-feature
//! simulation binary loads an optional TOML override the way the teacher's
//! control unit does.

use std::path::Path;

use motion_common::consts;

use crate::error::ConfigError;

/// SPI TX layout policy for the pending-response window (§4.8 step 5,
/// DESIGN.md Open Question 1). `LeftFill` is the implemented policy;
/// `RightAlignedZeroPad` is documented but not built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxLayoutPolicy {
    /// Response bytes at offsets `0..len`, remaining bytes filled with the
    /// handshake status byte.
    LeftFill,
    /// Response right-aligned in the last 20 bytes, first 22 bytes zero.
    /// Guarantees the host never sees status bytes before the response
    /// header. Not implemented by [`crate::transport::SpiTransport`]; kept
    /// as an enum variant so the policy choice stays visible in config.
    RightAlignedZeroPad,
}

impl Default for TxLayoutPolicy {
    fn default() -> Self {
        TxLayoutPolicy::LeftFill
    }
}

/// Fully validated, immutable configuration bundle.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LoadedConfig {
    pub step_tick_hz: u32,
    pub control_tick_hz: u32,
    pub step_high_ticks: u8,
    pub step_low_ticks: u8,
    pub dir_setup_ticks: u8,
    pub enable_settle_ticks: u8,
    pub move_queue_capacity: usize,
    pub resp_fifo_capacity: usize,
    pub default_accel_sps2: u32,
    pub pi_deadband_steps: i32,
    pub pi_i_clamp: i32,
    pub pi_shift: u32,
    pub err_throttle_threshold: i32,
    pub err_throttle_min_permille: u32,
    pub enc_counts_per_rev: [u32; consts::NUM_AXES],
    pub base_steps_per_rev: u32,
    pub tx_layout_policy: TxLayoutPolicy,
}

impl LoadedConfig {
    /// Hardware-derived upper bound on commanded velocity (§4.4):
    /// `STEP_TICK_HZ / (STEP_HIGH_TICKS + STEP_LOW_TICKS)`.
    pub const fn max_sps(&self) -> u32 {
        self.step_tick_hz / (self.step_high_ticks as u32 + self.step_low_ticks as u32)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.step_tick_hz == 0 || self.control_tick_hz == 0 {
            return Err(ConfigError::Validation(
                "tick frequencies must be non-zero".into(),
            ));
        }
        if self.step_tick_hz < self.control_tick_hz {
            return Err(ConfigError::Validation(
                "step_tick_hz must be >= control_tick_hz".into(),
            ));
        }
        if self.step_high_ticks == 0 && self.step_low_ticks == 0 {
            return Err(ConfigError::Validation(
                "step_high_ticks and step_low_ticks cannot both be zero".into(),
            ));
        }
        if self.move_queue_capacity == 0 || self.move_queue_capacity > consts::MOVE_QUEUE_CAPACITY
        {
            return Err(ConfigError::Validation(format!(
                "move_queue_capacity must be in 1..={}",
                consts::MOVE_QUEUE_CAPACITY
            )));
        }
        if self.resp_fifo_capacity < 8 {
            return Err(ConfigError::Validation(
                "resp_fifo_capacity must be >= 8".into(),
            ));
        }
        if self.enc_counts_per_rev.iter().any(|&c| c == 0) {
            return Err(ConfigError::Validation(
                "enc_counts_per_rev entries must be non-zero".into(),
            ));
        }
        if self.base_steps_per_rev == 0 {
            return Err(ConfigError::Validation(
                "base_steps_per_rev must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for LoadedConfig {
    fn default() -> Self {
        LoadedConfig {
            step_tick_hz: consts::STEP_TICK_HZ,
            control_tick_hz: consts::CONTROL_TICK_HZ,
            step_high_ticks: consts::STEP_HIGH_TICKS_DEFAULT,
            step_low_ticks: consts::STEP_LOW_TICKS_DEFAULT,
            dir_setup_ticks: consts::DIR_SETUP_TICKS_DEFAULT,
            enable_settle_ticks: consts::ENABLE_SETTLE_TICKS_DEFAULT,
            move_queue_capacity: consts::MOVE_QUEUE_CAPACITY,
            resp_fifo_capacity: consts::RESP_FIFO_CAPACITY,
            default_accel_sps2: consts::DEFAULT_ACCEL_SPS2,
            pi_deadband_steps: consts::PI_DEADBAND_STEPS,
            pi_i_clamp: consts::PI_I_CLAMP,
            pi_shift: consts::PI_SHIFT,
            err_throttle_threshold: consts::ERR_THROTTLE_THRESHOLD,
            err_throttle_min_permille: consts::ERR_THROTTLE_MIN_PERMILLE,
            enc_counts_per_rev: consts::ENC_COUNTS_PER_REV,
            base_steps_per_rev: consts::BASE_STEPS_PER_REV,
            tx_layout_policy: TxLayoutPolicy::default(),
        }
    }
}

/// Reads, parses and validates a TOML configuration file. Unset fields fall
/// back to [`LoadedConfig::default`] per-field (`#[serde(default)]`).
pub fn load_config(path: impl AsRef<Path>) -> Result<LoadedConfig, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    let cfg: LoadedConfig = toml::from_str(&text)?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_matches_spec_section_6() {
        let cfg = LoadedConfig::default();
        assert_eq!(cfg.step_tick_hz, 50_000);
        assert_eq!(cfg.control_tick_hz, 1_000);
        assert_eq!(cfg.max_sps(), 25_000);
        assert_eq!(cfg.pi_deadband_steps, 10);
        assert_eq!(cfg.pi_i_clamp, 200_000);
        assert_eq!(cfg.pi_shift, 8);
        assert_eq!(cfg.err_throttle_threshold, 200);
        assert_eq!(cfg.err_throttle_min_permille, 250);
        assert_eq!(cfg.base_steps_per_rev, 400);
        assert_eq!(cfg.tx_layout_policy, TxLayoutPolicy::LeftFill);
    }

    #[test]
    fn loads_partial_override_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "control_tick_hz = 500").unwrap();
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.control_tick_hz, 500);
        assert_eq!(cfg.step_tick_hz, 50_000); // falls back to default
    }

    #[test]
    fn rejects_zero_tick_rate() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "step_tick_hz = 0").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn rejects_oversized_queue_capacity() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "move_queue_capacity = 99999").unwrap();
        assert!(load_config(file.path()).is_err());
    }
}
