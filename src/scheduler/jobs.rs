// src/scheduler/jobs.rs
//! Job bodies executed by the scheduler daemon.
//!
//! Jobs never propagate errors; a failed run is logged (and notified
//! when Discord is configured) and the daemon keeps its schedule.

use crate::backup::run_backup;
use crate::config::Config;
use crate::daily::{run_daily, TemplateEngine};
use crate::notify::DiscordNotifier;

pub fn backup_job(config: &Config) {
    log::info!("Starting scheduled backup job");

    let notifier = make_notifier(config);
    if let Some(notifier) = &notifier {
        notifier.notify_backup_started(&config.backup.output_dir.display().to_string());
    }

    let result = run_backup(config, None);

    if result.success {
        log::info!(
            "Backup job completed: {} pages backed up, {} skipped",
            result.pages_backed_up,
            result.pages_skipped,
        );
    } else {
        log::error!(
            "Backup job completed with errors: {} errors",
            result.errors.len(),
        );
    }

    if let Some(notifier) = &notifier {
        notifier.notify_backup_complete(&result);
    }
}

pub fn daily_job(config: &Config) {
    log::info!("Starting scheduled daily content job");

    let Some(target_page_id) = config.daily.target_page_id.as_deref() else {
        log::warn!("Daily job skipped: no target_page_id configured");
        return;
    };

    let template_content = match std::fs::read_to_string(&config.daily.template_path) {
        Ok(content) => content,
        Err(_) => {
            log::warn!(
                "Daily job skipped: template not found at {}",
                config.daily.template_path.display(),
            );
            return;
        }
    };

    let notifier = make_notifier(config);
    if let Some(notifier) = &notifier {
        notifier.notify_daily_started(target_page_id);
    }

    let rendered = TemplateEngine::new().render_now(&template_content);
    let result = run_daily(config, &rendered, false);

    if result.success {
        log::info!(
            "Daily job completed: {} blocks added to {}",
            result.blocks_added,
            &result.page_id[..result.page_id.len().min(8)],
        );
    } else {
        log::error!(
            "Daily job failed: {}",
            result.error.as_deref().unwrap_or("unknown error"),
        );
    }

    if let Some(notifier) = &notifier {
        notifier.notify_daily_complete(&result);
    }
}

fn make_notifier(config: &Config) -> Option<DiscordNotifier> {
    if !config.discord.enabled {
        return None;
    }
    match DiscordNotifier::new(config.discord.clone()) {
        Ok(notifier) => Some(notifier),
        Err(err) => {
            log::error!("Failed to initialize Discord notifier: {}", err);
            None
        }
    }
}
