//! Init-time configuration error taxonomy, separate from the wire-facing
//! [`motion_common::error::CoreError`].

/// Errors raised while loading and validating a [`crate::config::LoadedConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Validation(String),
}
