use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Engine tuning knobs, read from `OFFLOAD_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Timeout for short probes (numeric, regex). Seconds.
    pub default_timeout_secs: u64,
    /// Timeout for long-running operations (media, batch). Seconds.
    pub long_timeout_secs: u64,
    /// Capacity of each per-task event channel.
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: 30,
            long_timeout_secs: 300,
            channel_capacity: 32,
        }
    }
}

impl EngineConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_timeout_secs: env_u64(
                "OFFLOAD_DEFAULT_TIMEOUT_SECS",
                defaults.default_timeout_secs,
            ),
            long_timeout_secs: env_u64("OFFLOAD_LONG_TIMEOUT_SECS", defaults.long_timeout_secs),
            channel_capacity: env_usize("OFFLOAD_CHANNEL_CAPACITY", defaults.channel_capacity)
                .max(1),
        }
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    pub fn long_timeout(&self) -> Duration {
        Duration::from_secs(self.long_timeout_secs)
    }
}
