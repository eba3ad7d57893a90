use serde::{Deserialize, Serialize};
use std::path::Path;
use verdant_common::types::Tier;
use verdant_escalation::EscalationPolicy;

/// Errors raised while loading or validating the monitor configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config: failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config: failed to parse: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config: invalid value for '{field}': {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Escalation scheduler tick interval.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Bounded timeout for each notification channel call.
    #[serde(default = "default_channel_timeout_secs")]
    pub channel_timeout_secs: u64,
    /// Bounded timeout for each actuator call.
    #[serde(default = "default_actuator_timeout_secs")]
    pub actuator_timeout_secs: u64,
    /// Service tier of the owning client; gates channel eligibility.
    #[serde(default = "default_tier")]
    pub tier: Tier,
    #[serde(default)]
    pub escalation: EscalationPolicy,
    /// Notification channel instances to build at startup.
    #[serde(default)]
    pub channels: Vec<SeedChannel>,
}

/// One notification channel instance to instantiate through the plugin
/// registry at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedChannel {
    pub name: String,
    pub channel_type: String,
    #[serde(default = "default_seed_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub config: serde_json::Value,
}

fn default_tick_secs() -> u64 {
    5
}

fn default_channel_timeout_secs() -> u64 {
    5
}

fn default_actuator_timeout_secs() -> u64 {
    5
}

fn default_tier() -> Tier {
    Tier::Basic
}

fn default_seed_enabled() -> bool {
    true
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            channel_timeout_secs: default_channel_timeout_secs(),
            actuator_timeout_secs: default_actuator_timeout_secs(),
            tier: default_tier(),
            escalation: EscalationPolicy::default(),
            channels: Vec::new(),
        }
    }
}

impl MonitorConfig {
    /// Load and validate a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "tick_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.channel_timeout_secs == 0 || self.actuator_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "channel_timeout_secs/actuator_timeout_secs",
                reason: "timeouts must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
