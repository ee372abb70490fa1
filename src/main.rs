// src/main.rs

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use log4rs::{
    append::console::{ConsoleAppender, Target},
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};
use notion_vault::config::{load_config, Config};
use notion_vault::daily::TemplateEngine;
use notion_vault::output::{exit_code, OutputFormatter, StatusResult};
use notion_vault::scheduler::run_scheduler;
use std::fs;
use std::path::{Path, PathBuf};

/// Backup Notion workspaces to local markdown files, with scheduled
/// runs and daily template publishing.
#[derive(Parser)]
#[command(name = "notion-vault", version, about)]
struct Cli {
    /// Path to config file (default: ./config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Increase verbosity (can repeat: -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Backup the Notion workspace to local markdown files
    Backup {
        /// Override output directory for backups
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Backup only a specific page (by ID)
        #[arg(long, value_name = "ID")]
        page_id: Option<String>,

        /// Re-export everything instead of only changed documents
        #[arg(long)]
        full: bool,

        /// Show what would be backed up without doing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate and publish daily content from a template
    Daily {
        /// Override template file path
        #[arg(short, long, value_name = "FILE")]
        template: Option<PathBuf>,

        /// Override target Notion page ID
        #[arg(short = 'p', long, value_name = "ID")]
        target_page: Option<String>,

        /// Show rendered content without publishing
        #[arg(long)]
        dry_run: bool,
    },

    /// Run the scheduler daemon for automated tasks
    Schedule {
        /// Run in foreground (don't daemonize)
        #[arg(short, long)]
        foreground: bool,
    },

    /// Show configuration and last-backup status
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Validate current configuration
    Validate,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(cli.verbose, cli.quiet) {
        eprintln!("Failed to initialize logging: {:#}", e);
        std::process::exit(exit_code::GENERAL_ERROR);
    }

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(exit_code::CONFIGURATION_ERROR);
        }
    };

    let formatter = OutputFormatter::new(cli.json);
    let code = run_command(cli.command, config, &formatter);
    std::process::exit(code);
}

fn run_command(command: Command, mut config: Config, formatter: &OutputFormatter) -> i32 {
    match command {
        Command::Backup {
            output_dir,
            page_id,
            full,
            dry_run,
        } => {
            if config.notion_token.is_empty() {
                eprintln!("Error: NOTION_TOKEN environment variable is required");
                return exit_code::AUTHENTICATION_ERROR;
            }
            if let Some(output_dir) = output_dir {
                config.backup.output_dir = output_dir;
            }
            if full {
                config.backup.incremental = false;
            }

            if dry_run {
                println!(
                    "Dry run mode - would backup to: {}",
                    config.backup.output_dir.display()
                );
                return exit_code::SUCCESS;
            }

            let result = notion_vault::backup::run_backup(&config, page_id.as_deref());
            formatter.backup(&result);

            if result.success {
                exit_code::SUCCESS
            } else if result.pages_backed_up > 0 {
                exit_code::PARTIAL_FAILURE
            } else {
                exit_code::GENERAL_ERROR
            }
        }

        Command::Daily {
            template,
            target_page,
            dry_run,
        } => {
            if config.notion_token.is_empty() {
                eprintln!("Error: NOTION_TOKEN environment variable is required");
                return exit_code::AUTHENTICATION_ERROR;
            }
            if let Some(template) = template {
                config.daily.template_path = template;
            }
            if let Some(target_page) = target_page {
                config.daily.target_page_id = Some(target_page);
            }
            if config.daily.target_page_id.is_none() {
                eprintln!("Error: Target page ID is required (--target-page or config)");
                return exit_code::CONFIGURATION_ERROR;
            }

            let template_content = match fs::read_to_string(&config.daily.template_path) {
                Ok(content) => content,
                Err(e) => {
                    let err = notion_vault::AppError::TemplateNotFound {
                        path: config.daily.template_path.display().to_string(),
                        source: e,
                    };
                    eprintln!("Error: {}", err);
                    return exit_code::CONFIGURATION_ERROR;
                }
            };

            let rendered = TemplateEngine::new().render_now(&template_content);

            if dry_run {
                println!("Dry run mode - rendered content:");
                println!("{}", "-".repeat(40));
                println!("{}", rendered);
                println!("{}", "-".repeat(40));
            }

            let result = notion_vault::daily::run_daily(&config, &rendered, dry_run);
            formatter.daily(&result);

            if result.success {
                exit_code::SUCCESS
            } else {
                exit_code::GENERAL_ERROR
            }
        }

        Command::Schedule { foreground } => {
            if config.notion_token.is_empty() {
                eprintln!("Error: NOTION_TOKEN environment variable is required");
                return exit_code::AUTHENTICATION_ERROR;
            }

            println!(
                "Starting scheduler (backup: {}, daily: {})",
                config.scheduler.backup_schedule, config.scheduler.daily_time
            );
            run_scheduler(config, foreground);
            exit_code::SUCCESS
        }

        Command::Status => {
            let status = build_status(&config);
            formatter.status(&status);
            exit_code::SUCCESS
        }

        Command::Config { action } => match action {
            ConfigAction::Show => {
                show_config(&config, formatter);
                exit_code::SUCCESS
            }
            ConfigAction::Validate => {
                let errors = config.validate();
                if errors.is_empty() {
                    println!("Configuration is valid");
                    exit_code::SUCCESS
                } else {
                    eprintln!("Configuration errors:");
                    for error in &errors {
                        eprintln!("  - {}", error);
                    }
                    exit_code::CONFIGURATION_ERROR
                }
            }
        },
    }
}

/// Console logging goes to stderr so stdout stays clean for data
/// output; a debug-level copy always lands in a temp-dir log file.
fn setup_logging(verbose: u8, quiet: bool) -> anyhow::Result<()> {
    let log_level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let pattern = if verbose > 0 {
        "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}"
    } else {
        "{m}{n}"
    };

    let stderr_appender = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let log_file_path = std::env::temp_dir().join("notion_vault.log");
    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}",
        )))
        .build(&log_file_path)
        .with_context(|| format!("opening log file {}", log_file_path.display()))?;

    let log_config = log4rs::Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stderr")
                .appender("file")
                .build(log_level),
        )
        .context("assembling logging configuration")?;

    log4rs::init_config(log_config).context("installing the global logger")?;
    log::debug!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

fn build_status(config: &Config) -> StatusResult {
    let config_errors = config.validate();
    let backup_dir = &config.backup.output_dir;

    // Read the state file directly; status must not create the backup
    // directory tree as a side effect.
    let mut last_backup_time = None;
    let mut pages_count = 0;
    let mut databases_count = 0;
    let state_path = backup_dir.join(".state").join("checksums.json");
    if let Ok(raw) = fs::read_to_string(&state_path) {
        if let Ok(state) = serde_json::from_str::<serde_json::Value>(&raw) {
            last_backup_time = state
                .get("saved_at")
                .and_then(|v| v.as_str())
                .map(String::from);
            pages_count = state
                .get("pages")
                .and_then(|v| v.as_object())
                .map(|p| p.len())
                .unwrap_or(0);
            databases_count = state
                .get("databases")
                .and_then(|v| v.as_object())
                .map(|d| d.len())
                .unwrap_or(0);
        }
    }

    StatusResult {
        config_valid: config_errors.is_empty(),
        config_errors,
        last_backup_time,
        pages_count,
        databases_count,
        attachments_count: count_attachments(backup_dir),
        backup_dir: backup_dir.display().to_string(),
        backup_dir_exists: backup_dir.is_dir(),
        incremental_enabled: config.backup.incremental,
        discord_enabled: config.discord.enabled,
        discord_configured: config.discord.webhook_url.is_some(),
    }
}

fn count_attachments(backup_dir: &Path) -> usize {
    let Ok(pages) = fs::read_dir(backup_dir.join("pages")) else {
        return 0;
    };
    pages
        .flatten()
        .filter_map(|page| fs::read_dir(page.path().join("attachments")).ok())
        .map(|entries| entries.flatten().filter(|e| e.path().is_file()).count())
        .sum()
}

fn show_config(config: &Config, formatter: &OutputFormatter) {
    let token_display = if config.notion_token.is_empty() {
        "(not set)"
    } else {
        "***"
    };
    let target_page = config
        .daily
        .target_page_id
        .as_deref()
        .unwrap_or("(not set)");

    if formatter.is_json() {
        let view = serde_json::json!({
            "notion_token": token_display,
            "backup": {
                "output_dir": config.backup.output_dir.display().to_string(),
                "include_attachments": config.backup.include_attachments,
                "incremental": config.backup.incremental,
            },
            "daily": {
                "template_path": config.daily.template_path.display().to_string(),
                "target_page_id": target_page,
            },
            "scheduler": {
                "backup_schedule": config.scheduler.backup_schedule,
                "daily_time": config.scheduler.daily_time,
                "timezone": config.scheduler.timezone,
            },
        });
        println!("{}", serde_json::to_string_pretty(&view).unwrap_or_default());
    } else {
        println!("Current configuration:");
        println!();
        println!("  NOTION_TOKEN: {}", token_display);
        println!();
        println!("  [backup]");
        println!("    output_dir: {}", config.backup.output_dir.display());
        println!(
            "    include_attachments: {}",
            config.backup.include_attachments
        );
        println!("    incremental: {}", config.backup.incremental);
        println!();
        println!("  [daily]");
        println!(
            "    template_path: {}",
            config.daily.template_path.display()
        );
        println!("    target_page_id: {}", target_page);
        println!();
        println!("  [scheduler]");
        println!(
            "    backup_schedule: {}",
            config.scheduler.backup_schedule
        );
        println!("    daily_time: {}", config.scheduler.daily_time);
        println!("    timezone: {}", config.scheduler.timezone);
    }
}
