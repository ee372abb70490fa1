// src/output/report.rs
//! Result types for the CLI commands and their rendering.
//!
//! Data output goes to stdout; errors and diagnostics go to stderr.
//! JSON mode serializes the result structs verbatim so scripts get a
//! stable schema.

use serde::Serialize;

/// One recorded failure from a backup run.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Failure site: "page_error", "page_backup_error",
    /// "database_backup_error", or "backup_error".
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    pub message: String,
}

/// Result of a backup run.
#[derive(Debug, Clone, Serialize)]
pub struct BackupResult {
    pub success: bool,
    pub pages_backed_up: usize,
    pub pages_skipped: usize,
    pub databases_backed_up: usize,
    pub attachments_downloaded: usize,
    pub errors: Vec<ErrorRecord>,
    pub duration_seconds: f64,
}

/// Result of a daily publish run.
#[derive(Debug, Clone, Serialize)]
pub struct DailyResult {
    pub success: bool,
    pub page_id: String,
    pub blocks_added: usize,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a status check.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResult {
    pub config_valid: bool,
    pub config_errors: Vec<String>,
    pub last_backup_time: Option<String>,
    pub pages_count: usize,
    pub databases_count: usize,
    pub attachments_count: usize,
    pub backup_dir: String,
    pub backup_dir_exists: bool,
    pub incremental_enabled: bool,
    pub discord_enabled: bool,
    pub discord_configured: bool,
}

/// Renders command results to the terminal or as JSON.
pub struct OutputFormatter {
    json_mode: bool,
}

impl OutputFormatter {
    pub fn new(json_mode: bool) -> Self {
        Self { json_mode }
    }

    pub fn is_json(&self) -> bool {
        self.json_mode
    }

    pub fn backup(&self, result: &BackupResult) {
        if self.json_mode {
            self.print_json(result);
        } else if result.success {
            println!(
                "Backup complete: {} pages backed up, {} skipped, {} attachments downloaded ({:.1}s)",
                result.pages_backed_up,
                result.pages_skipped,
                result.attachments_downloaded,
                result.duration_seconds,
            );
        } else {
            eprintln!("Backup completed with {} errors", result.errors.len());
            for error in result.errors.iter().take(5) {
                eprintln!("  - {}", error.message);
            }
            if result.errors.len() > 5 {
                eprintln!("  ... and {} more errors", result.errors.len() - 5);
            }
        }
    }

    pub fn daily(&self, result: &DailyResult) {
        if self.json_mode {
            self.print_json(result);
        } else if result.success {
            let verb = if result.dry_run { "would add" } else { "added" };
            println!(
                "Daily content {}: {} blocks to page {}",
                verb, result.blocks_added, result.page_id
            );
        } else {
            eprintln!(
                "Daily content failed: {}",
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    pub fn status(&self, result: &StatusResult) {
        if self.json_mode {
            self.print_json(result);
            return;
        }

        println!("Status Check");
        println!("{}", "=".repeat(40));
        println!();

        println!("Configuration:");
        if result.config_valid {
            println!("  Status: valid");
        } else {
            eprintln!("  Status: INVALID");
            for error in &result.config_errors {
                eprintln!("    - {}", error);
            }
        }
        let dir_status = if result.backup_dir_exists {
            "exists"
        } else {
            "not found"
        };
        println!("  Backup directory: {} ({})", result.backup_dir, dir_status);
        println!(
            "  Incremental mode: {}",
            if result.incremental_enabled {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!();

        println!("Last Backup:");
        match &result.last_backup_time {
            Some(time) => {
                println!("  Time: {}", time);
                println!("  Pages: {}", result.pages_count);
                println!("  Databases: {}", result.databases_count);
                println!("  Attachments: {}", result.attachments_count);
            }
            None => println!("  No backups found"),
        }
        println!();

        println!("Notifications:");
        if result.discord_enabled {
            let webhook_status = if result.discord_configured {
                "webhook configured"
            } else {
                "webhook NOT configured"
            };
            println!("  Discord: enabled ({})", webhook_status);
        } else {
            println!("  Discord: disabled");
        }
    }

    fn print_json(&self, result: &impl Serialize) {
        match serde_json::to_string_pretty(result) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize result: {}", e),
        }
    }
}

/// Process exit codes, Unix conventions.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const CONFIGURATION_ERROR: i32 = 2;
    pub const AUTHENTICATION_ERROR: i32 = 3;
    pub const NETWORK_ERROR: i32 = 4;
    pub const RATE_LIMITED: i32 = 5;
    /// Some items succeeded, others failed.
    pub const PARTIAL_FAILURE: i32 = 6;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn error_record_omits_missing_document_id() {
        let record = ErrorRecord {
            kind: "backup_error".to_string(),
            document_id: None,
            message: "boom".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("document_id").is_none());
        assert_eq!(json["kind"], "backup_error");
    }

    #[test]
    fn backup_result_serializes_all_counters() {
        let result = BackupResult {
            success: true,
            pages_backed_up: 3,
            pages_skipped: 7,
            databases_backed_up: 1,
            attachments_downloaded: 2,
            errors: Vec::new(),
            duration_seconds: 1.5,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["pages_backed_up"], 3);
        assert_eq!(json["databases_backed_up"], 1);
        assert_eq!(json["duration_seconds"], 1.5);
    }
}
