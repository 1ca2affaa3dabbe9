use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "charmchat_config.json";

const DEFAULT_APPLICATION_TAG: &str = "charmchat";
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;
// Rows with a chain id that never shows up are failed after this long.
const DEFAULT_GRACE_PERIOD_SECS: u64 = 600;
const DEFAULT_HISTORY_LIMIT: usize = 100;
const DEFAULT_MEMPOOL_LIMIT: usize = 100;
const DEFAULT_PING_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application tag for the peer transport and the on-chain tracking tag.
    pub application_tag: String,
    pub sweep_interval_secs: u64,
    pub grace_period_secs: u64,
    pub history_limit: usize,
    pub mempool_limit: usize,
    pub ping_timeout_ms: u64,
    /// Name sent to peers in outgoing payloads.
    pub my_display_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            application_tag: DEFAULT_APPLICATION_TAG.to_string(),
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            grace_period_secs: DEFAULT_GRACE_PERIOD_SECS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            mempool_limit: DEFAULT_MEMPOOL_LIMIT,
            ping_timeout_ms: DEFAULT_PING_TIMEOUT_MS,
            my_display_name: "Me".to_string(),
        }
    }
}

impl AppConfig {
    pub fn sweep_interval(&self) -> Duration {
        // A zero period would make tokio's interval panic.
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn grace_period_ms(&self) -> u64 {
        self.grace_period_secs.saturating_mul(1_000)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(secs) = env_u64("CHARMCHAT_SWEEP_INTERVAL_SECS") {
            self.sweep_interval_secs = secs;
        }
        if let Some(secs) = env_u64("CHARMCHAT_GRACE_PERIOD_SECS") {
            self.grace_period_secs = secs;
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok()?.trim().parse().ok()
}

/// Missing or malformed files fall back to defaults.
pub fn load_app_config(data_dir: &str) -> AppConfig {
    let path = Path::new(data_dir).join(CONFIG_FILE_NAME);
    let mut config = match std::fs::read(&path) {
        Ok(bytes) => serde_json::from_slice::<AppConfig>(&bytes).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), %e, "ignoring malformed config");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    };
    config.apply_env_overrides();
    config
}

pub fn default_config_json() -> String {
    serde_json::to_string_pretty(&AppConfig::default()).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{"application_tag":"charmchat-dev","history_limit":25}"#,
        )
        .unwrap();

        let config = load_app_config(dir.path().to_str().unwrap());
        assert_eq!(config.application_tag, "charmchat-dev");
        assert_eq!(config.history_limit, 25);
        assert_eq!(config.mempool_limit, DEFAULT_MEMPOOL_LIMIT);
        assert_eq!(config.ping_timeout(), Duration::from_millis(5_000));
    }

    #[test]
    fn missing_or_malformed_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_str().unwrap();
        let config = load_app_config(data_dir);
        assert_eq!(config.application_tag, DEFAULT_APPLICATION_TAG);
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "{not json").unwrap();
        let config = load_app_config(data_dir);
        assert_eq!(config.application_tag, DEFAULT_APPLICATION_TAG);
        assert_eq!(config.my_display_name, "Me");
    }

    #[test]
    fn default_json_round_trips() {
        let parsed: AppConfig = serde_json::from_str(&default_config_json()).unwrap();
        assert_eq!(parsed, AppConfig::default());
        assert_eq!(parsed.grace_period_ms(), 600_000);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let config = AppConfig {
            sweep_interval_secs: 0,
            ..AppConfig::default()
        };
        assert_eq!(config.sweep_interval(), Duration::from_secs(1));
    }
}
