// src/notify.rs
//! Discord webhook notifications.
//!
//! Notifications are best-effort: a failed webhook call is logged and
//! reported as `false`, never surfaced as an error, so notification
//! outages cannot break a backup.

use crate::config::DiscordConfig;
use crate::error::AppError;
use crate::output::{BackupResult, DailyResult};
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;

const COLOR_SUCCESS: u32 = 0x2ECC71;
const COLOR_FAILURE: u32 = 0xE74C3C;
const COLOR_INFO: u32 = 0x3498DB;

/// Sends embeds to a Discord webhook.
pub struct DiscordNotifier {
    config: DiscordConfig,
    client: reqwest::blocking::Client,
}

impl DiscordNotifier {
    pub fn new(config: DiscordConfig) -> Result<Self, AppError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn notify_backup_started(&self, output_dir: &str) -> bool {
        if !self.config.enabled || !self.config.notify_on_start {
            return true;
        }

        let embed = create_embed(
            "Backup Started",
            "Notion workspace backup has started.",
            COLOR_INFO,
            vec![field("Output Directory", output_dir, true)],
        );
        self.send_embed(embed)
    }

    pub fn notify_backup_complete(&self, result: &BackupResult) -> bool {
        if !self.wants_completion_notice(result.success) {
            return true;
        }

        let embed = if result.success {
            create_embed(
                "Backup Complete",
                "Notion workspace backup completed successfully.",
                COLOR_SUCCESS,
                vec![
                    field("Pages Backed Up", &result.pages_backed_up.to_string(), true),
                    field("Pages Skipped", &result.pages_skipped.to_string(), true),
                    field(
                        "Attachments",
                        &result.attachments_downloaded.to_string(),
                        true,
                    ),
                    field("Duration", &format!("{:.1}s", result.duration_seconds), true),
                ],
            )
        } else {
            let error_summary = match result.errors.as_slice() {
                [] => "0 error(s)".to_string(),
                [only] => only.message.clone(),
                [first, rest @ ..] => {
                    format!("{}\n... and {} more", first.message, rest.len())
                }
            };
            create_embed(
                "Backup Failed",
                "Notion workspace backup completed with errors.",
                COLOR_FAILURE,
                vec![
                    field("Pages Backed Up", &result.pages_backed_up.to_string(), true),
                    field("Errors", &error_summary, false),
                    field("Duration", &format!("{:.1}s", result.duration_seconds), true),
                ],
            )
        };

        self.send_embed(embed)
    }

    pub fn notify_daily_started(&self, page_id: &str) -> bool {
        if !self.config.enabled || !self.config.notify_on_start {
            return true;
        }

        let embed = create_embed(
            "Daily Content Started",
            "Daily content generation has started.",
            COLOR_INFO,
            vec![field("Target Page", &abbreviate(page_id), true)],
        );
        self.send_embed(embed)
    }

    pub fn notify_daily_complete(&self, result: &DailyResult) -> bool {
        if !self.wants_completion_notice(result.success) {
            return true;
        }

        let embed = if result.success {
            create_embed(
                "Daily Content Published",
                "Daily content was successfully added to Notion.",
                COLOR_SUCCESS,
                vec![
                    field("Blocks Added", &result.blocks_added.to_string(), true),
                    field("Page ID", &abbreviate(&result.page_id), true),
                ],
            )
        } else {
            create_embed(
                "Daily Content Failed",
                "Daily content generation failed.",
                COLOR_FAILURE,
                vec![
                    field(
                        "Error",
                        result.error.as_deref().unwrap_or("Unknown error"),
                        false,
                    ),
                    field("Page ID", &abbreviate(&result.page_id), true),
                ],
            )
        };

        self.send_embed(embed)
    }

    fn wants_completion_notice(&self, success: bool) -> bool {
        if !self.config.enabled {
            return false;
        }
        if success {
            self.config.notify_on_success
        } else {
            self.config.notify_on_failure
        }
    }

    fn send_embed(&self, embed: Value) -> bool {
        let Some(webhook_url) = self.config.webhook_url.as_deref() else {
            log::warn!("Discord webhook URL not configured");
            return false;
        };

        let payload = json!({ "embeds": [embed] });
        match self.client.post(webhook_url).json(&payload).send() {
            Ok(response) if response.status().is_success() => {
                log::debug!("Discord notification sent successfully");
                true
            }
            Ok(response) => {
                log::error!("Discord webhook returned error: {}", response.status());
                false
            }
            Err(err) => {
                log::error!("Failed to send Discord notification: {}", err);
                false
            }
        }
    }
}

fn create_embed(title: &str, description: &str, color: u32, fields: Vec<Value>) -> Value {
    let mut embed = json!({
        "title": title,
        "description": description,
        "color": color,
        "timestamp": Utc::now().to_rfc3339(),
        "footer": { "text": "notion-vault" },
    });
    if !fields.is_empty() {
        embed["fields"] = Value::Array(fields);
    }
    embed
}

fn field(name: &str, value: &str, inline: bool) -> Value {
    json!({ "name": name, "value": value, "inline": inline })
}

fn abbreviate(id: &str) -> String {
    format!("{}...", &id[..id.len().min(8)])
}
