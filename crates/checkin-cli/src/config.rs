//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{NaiveTime, Weekday};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Sliding lifetime of cached daily totals.
    pub cache_ttl_hours: u64,
    /// Daily time at which open sessions are closed.
    pub auto_checkout_at: NaiveTime,
    /// Day of the weekly summary.
    pub weekly_summary_day: Weekday,
    /// Time of the weekly summary.
    pub weekly_summary_at: NaiveTime,
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Message delivery settings.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Slack-compatible incoming webhook. Messages are only logged without it.
    pub webhook_url: Option<String>,
    /// Address receiving the weekly overall summary.
    pub trainer: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("cache_ttl_hours", &self.cache_ttl_hours)
            .field("auto_checkout_at", &self.auto_checkout_at)
            .field("weekly_summary_day", &self.weekly_summary_day)
            .field("weekly_summary_at", &self.weekly_summary_at)
            .field("notify", &self.notify)
            .finish()
    }
}

impl fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyConfig")
            .field(
                "webhook_url",
                &self.webhook_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("trainer", &self.trainer)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("checkin.db"),
            cache_ttl_hours: 24,
            auto_checkout_at: NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN),
            weekly_summary_day: Weekday::Sun,
            weekly_summary_at: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or(NaiveTime::MIN),
            notify: NotifyConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(config_path).extract()
    }

    fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (CHECKIN_*, nested keys split on __)
        figment.merge(Env::prefixed("CHECKIN_").split("__"))
    }

    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours.saturating_mul(60 * 60))
    }
}

/// Returns the platform-specific config directory for checkin.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("checkin"))
}

/// Returns the platform-specific data directory for checkin.
///
/// On Linux: `~/.local/share/checkin`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("checkin"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_ends_with_checkin() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "checkin");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("checkin.db"));
        assert_eq!(config.cache_ttl(), Duration::from_secs(24 * 3600));
        assert_eq!(config.weekly_summary_day, Weekday::Sun);
    }

    #[test]
    fn test_file_and_env_layers_override_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "checkin.toml",
                r#"
                database_path = "/var/lib/checkin/checkin.db"
                auto_checkout_at = "23:30:00"
                weekly_summary_day = "Fri"

                [notify]
                trainer = "trainer@example.org"
                "#,
            )?;
            jail.set_env("CHECKIN_CACHE_TTL_HOURS", "2");
            jail.set_env("CHECKIN_NOTIFY__WEBHOOK_URL", "https://hooks.example.org/x");

            let config: Config = Config::figment(Some(Path::new("checkin.toml"))).extract()?;
            assert_eq!(config.database_path, PathBuf::from("/var/lib/checkin/checkin.db"));
            assert_eq!(config.auto_checkout_at, NaiveTime::from_hms_opt(23, 30, 0).unwrap());
            assert_eq!(config.weekly_summary_day, Weekday::Fri);
            assert_eq!(config.cache_ttl_hours, 2);
            assert_eq!(config.notify.trainer.as_deref(), Some("trainer@example.org"));
            assert_eq!(
                config.notify.webhook_url.as_deref(),
                Some("https://hooks.example.org/x")
            );
            Ok(())
        });
    }

    #[test]
    fn test_debug_redacts_webhook_url() {
        let mut config = Config::default();
        config.notify.webhook_url = Some("https://hooks.example.org/T000/secret".to_string());
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
