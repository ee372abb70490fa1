// src/config.rs
//! Configuration: TOML file, environment overrides, validation.
//!
//! Priority, highest to lowest: environment variables, config file
//! values, built-in defaults. A missing config file is fine; a file
//! that exists but does not parse is a hard error.

use crate::error::AppError;
use crate::types::PageId;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub notion_token: String,
    pub backup: BackupConfig,
    pub daily: DailyConfig,
    pub scheduler: SchedulerConfig,
    pub discord: DiscordConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub output_dir: PathBuf,
    pub include_attachments: bool,
    pub incremental: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./backups"),
            include_attachments: true,
            incremental: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DailyConfig {
    pub template_path: PathBuf,
    pub target_page_id: Option<String>,
}

impl Default for DailyConfig {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from("./templates/daily.md"),
            target_page_id: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// "hourly" or "daily".
    pub backup_schedule: String,
    /// 24-hour "HH:MM".
    pub daily_time: String,
    pub timezone: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            backup_schedule: "daily".to_string(),
            daily_time: "06:00".to_string(),
            timezone: "America/New_York".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub webhook_url: Option<String>,
    pub enabled: bool,
    pub notify_on_start: bool,
    pub notify_on_success: bool,
    pub notify_on_failure: bool,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            enabled: false,
            notify_on_start: true,
            notify_on_success: true,
            notify_on_failure: true,
        }
    }
}

impl Config {
    /// Validate the configuration; returns every problem found, not
    /// just the first.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.notion_token.is_empty() {
            errors.push(
                "notion_token is required (set in config or NOTION_TOKEN env var)".to_string(),
            );
        }

        if let Some(target) = &self.daily.target_page_id {
            if PageId::parse(target).is_err() {
                errors.push(format!("Invalid target_page_id: {}", target));
            }
            // The template only matters once daily publishing is
            // actually configured.
            if !self.daily.template_path.exists() {
                errors.push(format!(
                    "Template file not found: {}",
                    self.daily.template_path.display(),
                ));
            }
        }

        if self.discord.enabled && self.discord.webhook_url.is_none() {
            errors.push(
                "Discord webhook_url is required when notifications are enabled".to_string(),
            );
        }

        errors
    }
}

/// Load the configuration, merging file, environment, and defaults.
/// `config_path` defaults to `./config.toml`.
pub fn load_config(config_path: Option<&Path>) -> Result<Config, AppError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("./config.toml"));

    let mut config = if path.exists() {
        log::debug!("Loading config from {}", path.display());
        let raw = std::fs::read_to_string(&path)?;
        toml::from_str::<Config>(&raw).map_err(|e| {
            AppError::InvalidConfiguration(format!("failed to parse {}: {}", path.display(), e))
        })?
    } else {
        log::debug!("No config file found at {}, using defaults", path.display());
        Config::default()
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(token) = std::env::var("NOTION_TOKEN") {
        if !token.is_empty() {
            config.notion_token = token;
        }
    }
    if let Ok(output_dir) = std::env::var("NOTION_BACKUP_DIR") {
        if !output_dir.is_empty() {
            config.backup.output_dir = PathBuf::from(output_dir);
        }
    }
    if let Ok(target_page) = std::env::var("NOTION_DAILY_PAGE") {
        if !target_page.is_empty() {
            config.daily.target_page_id = Some(target_page);
        }
    }
    if let Ok(webhook_url) = std::env::var("DISCORD_WEBHOOK_URL") {
        if !webhook_url.is_empty() {
            config.discord.webhook_url = Some(webhook_url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.backup.output_dir, PathBuf::from("./backups"));
        assert!(config.backup.include_attachments);
        assert!(config.backup.incremental);
        assert_eq!(config.scheduler.backup_schedule, "daily");
        assert_eq!(config.scheduler.daily_time, "06:00");
        assert!(!config.discord.enabled);
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            notion_token = "secret_abc"

            [backup]
            output_dir = "/srv/notion"
            incremental = false

            [discord]
            enabled = true
            webhook_url = "https://discord.com/api/webhooks/x"
            "#,
        )
        .unwrap();

        assert_eq!(config.notion_token, "secret_abc");
        assert_eq!(config.backup.output_dir, PathBuf::from("/srv/notion"));
        assert!(!config.backup.incremental);
        // Untouched sections keep defaults.
        assert!(config.backup.include_attachments);
        assert_eq!(config.scheduler.daily_time, "06:00");
        assert!(config.discord.enabled);
    }

    #[test]
    fn missing_token_fails_validation() {
        let config = Config::default();
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("notion_token"));
    }

    #[test]
    fn bad_target_page_id_is_reported() {
        let mut config = Config {
            notion_token: "secret".to_string(),
            ..Config::default()
        };
        config.daily.target_page_id = Some("not-an-id".to_string());

        let errors = config.validate();
        assert!(errors.iter().any(|e| e.contains("Invalid target_page_id")));
    }

    #[test]
    fn discord_enabled_requires_webhook() {
        let mut config = Config {
            notion_token: "secret".to_string(),
            ..Config::default()
        };
        config.discord.enabled = true;

        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("webhook_url"));
    }

    #[test]
    fn template_check_only_when_daily_configured() {
        let config = Config {
            notion_token: "secret".to_string(),
            ..Config::default()
        };
        // No target page: the (missing) default template is not an
        // error.
        assert!(config.validate().is_empty());
    }
}
