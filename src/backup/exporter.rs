// src/backup/exporter.rs
//! Backup orchestration.
//!
//! A run walks every page and database the integration can see (or a
//! single page when targeted), exports the changed ones, and writes
//! the change-detection state back once at the end. Failures are
//! recorded per document; one broken page never aborts the run.

use crate::api::NotionClient;
use crate::backup::attachments::{process_blocks_for_attachments, AttachmentDownloader};
use crate::backup::frontmatter::{generate_database_schema, generate_frontmatter};
use crate::backup::markdown::MarkdownConverter;
use crate::backup::state::BackupState;
use crate::config::Config;
use crate::error::AppError;
use crate::model::{Block, Database, Page};
use crate::output::{atomic_write, safe_mkdir, BackupResult, ErrorRecord};
use crate::types::{BlockId, PageId};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

/// Outcome of exporting one page.
struct PageOutcome {
    backed_up: bool,
    skipped: bool,
    attachments: usize,
    error: Option<ErrorRecord>,
}

#[derive(Default)]
struct RunStats {
    pages_backed_up: usize,
    pages_skipped: usize,
    databases_backed_up: usize,
    attachments_downloaded: usize,
    errors: Vec<ErrorRecord>,
}

impl RunStats {
    fn apply(&mut self, outcome: PageOutcome) {
        if outcome.backed_up {
            self.pages_backed_up += 1;
            self.attachments_downloaded += outcome.attachments;
        } else if outcome.skipped {
            self.pages_skipped += 1;
        }
        if let Some(error) = outcome.error {
            self.errors.push(error);
        }
    }
}

/// Run a backup. `page_id` targets a single page; otherwise the whole
/// workspace is walked.
pub fn run_backup(config: &Config, page_id: Option<&str>) -> BackupResult {
    let start = Instant::now();
    let mut stats = RunStats::default();

    if let Err(err) = execute(config, page_id, &mut stats) {
        log::error!("Backup failed: {}", err);
        stats.errors.push(ErrorRecord {
            kind: "backup_error".to_string(),
            document_id: None,
            message: err.to_string(),
        });
    }

    let duration = start.elapsed().as_secs_f64();
    // A run that exported anything counts as a success even when some
    // documents failed; the error list tells the rest of the story.
    let success = stats.errors.is_empty() || stats.pages_backed_up > 0;

    log::info!(
        "Backup complete: {} pages backed up, {} skipped, {} attachments, {} errors ({:.1}s)",
        stats.pages_backed_up,
        stats.pages_skipped,
        stats.attachments_downloaded,
        stats.errors.len(),
        duration,
    );

    BackupResult {
        success,
        pages_backed_up: stats.pages_backed_up,
        pages_skipped: stats.pages_skipped,
        databases_backed_up: stats.databases_backed_up,
        attachments_downloaded: stats.attachments_downloaded,
        errors: stats.errors,
        duration_seconds: duration,
    }
}

fn execute(config: &Config, page_id: Option<&str>, stats: &mut RunStats) -> Result<(), AppError> {
    let client = NotionClient::from_config(config)?;
    let output_dir = safe_mkdir(&config.backup.output_dir)?;
    let mut state = BackupState::open(&output_dir.join(".state"))?;
    let downloader = if config.backup.include_attachments {
        Some(AttachmentDownloader::new(&output_dir)?)
    } else {
        None
    };
    let incremental = config.backup.incremental;

    if let Some(raw_id) = page_id {
        let target = PageId::parse(raw_id)?;
        match client.get_page(&target) {
            Ok(page) => {
                let outcome = backup_single_page(
                    &client,
                    &mut state,
                    &output_dir,
                    downloader.as_ref(),
                    &page,
                    incremental,
                );
                stats.apply(outcome);
            }
            Err(err) => {
                log::error!("Failed to backup page {}: {}", target.short(), err);
                stats.errors.push(ErrorRecord {
                    kind: "page_error".to_string(),
                    document_id: Some(target.as_str().to_string()),
                    message: err.to_string(),
                });
            }
        }
    } else {
        log::info!("Starting workspace backup to {}", output_dir.display());

        for page in client.pages() {
            match page {
                Ok(page) => {
                    let outcome = backup_single_page(
                        &client,
                        &mut state,
                        &output_dir,
                        downloader.as_ref(),
                        &page,
                        incremental,
                    );
                    stats.apply(outcome);
                }
                Err(err) => {
                    log::error!("Error listing pages: {}", err);
                    stats.errors.push(ErrorRecord {
                        kind: "page_backup_error".to_string(),
                        document_id: None,
                        message: err.to_string(),
                    });
                    break;
                }
            }
        }

        for database in client.databases() {
            match database {
                Ok(database) => {
                    match backup_database(&client, &mut state, &output_dir, &database, incremental)
                    {
                        Ok(schema_written) => {
                            if schema_written {
                                stats.databases_backed_up += 1;
                            }
                        }
                        Err(err) => {
                            log::error!(
                                "Error backing up database {}: {}",
                                database.id.short(),
                                err,
                            );
                            stats.errors.push(ErrorRecord {
                                kind: "database_backup_error".to_string(),
                                document_id: Some(database.id.as_str().to_string()),
                                message: err.to_string(),
                            });
                        }
                    }
                }
                Err(err) => {
                    log::error!("Error listing databases: {}", err);
                    stats.errors.push(ErrorRecord {
                        kind: "database_backup_error".to_string(),
                        document_id: None,
                        message: err.to_string(),
                    });
                    break;
                }
            }
        }
    }

    state.save()
}

fn backup_single_page(
    client: &NotionClient,
    state: &mut BackupState,
    output_dir: &Path,
    downloader: Option<&AttachmentDownloader>,
    page: &Page,
    incremental: bool,
) -> PageOutcome {
    let mut outcome = PageOutcome {
        backed_up: false,
        skipped: false,
        attachments: 0,
        error: None,
    };

    match export_page(client, state, output_dir, downloader, page, incremental) {
        Ok(Some(attachments)) => {
            outcome.backed_up = true;
            outcome.attachments = attachments;
        }
        Ok(None) => outcome.skipped = true,
        Err(err) => {
            log::error!("Failed to backup page {}: {}", page.id.short(), err);
            outcome.error = Some(ErrorRecord {
                kind: "page_error".to_string(),
                document_id: Some(page.id.as_str().to_string()),
                message: err.to_string(),
            });
        }
    }

    outcome
}

/// Export one page; `Ok(None)` means it was unchanged and skipped.
fn export_page(
    client: &NotionClient,
    state: &mut BackupState,
    output_dir: &Path,
    downloader: Option<&AttachmentDownloader>,
    page: &Page,
    incremental: bool,
) -> Result<Option<usize>, AppError> {
    if incremental && !state.needs_backup(page.id.as_str(), &page.last_edited_time, None) {
        return Ok(None);
    }

    let title = page.title();
    log::info!(
        "Backing up page: {} ({})",
        truncate(&title, 50),
        page.id.short(),
    );

    let mut blocks = fetch_blocks(client, &page.id)?;

    let mut attachments = 0;
    if let Some(downloader) = downloader {
        attachments = process_blocks_for_attachments(&mut blocks, downloader, &page.id);
    }

    let converter = MarkdownConverter::new(client);
    let content = format!(
        "{}{}",
        generate_frontmatter(page)?,
        converter.convert_blocks(&blocks, 0)?,
    );

    let output_file = output_dir
        .join("pages")
        .join(page.id.as_str())
        .join("index.md");
    atomic_write(&output_file, content.as_bytes())?;

    state.update_page(
        page.id.as_str(),
        &page.last_edited_time,
        &content,
        BTreeMap::new(),
    );

    Ok(Some(attachments))
}

/// Export a database schema and its rows. Returns whether the schema
/// file was (re)written.
fn backup_database(
    client: &NotionClient,
    state: &mut BackupState,
    output_dir: &Path,
    database: &Database,
    incremental: bool,
) -> Result<bool, AppError> {
    let database_id = database.id.as_str();
    let last_edited = &database.last_edited_time;

    let schema_changed = state
        .get_database_state(database_id)
        .map(|existing| existing.last_edited_time != *last_edited)
        .unwrap_or(true);

    log::info!(
        "Backing up database: {} ({})",
        truncate(&database.display_title(), 50),
        database.id.short(),
    );

    let db_dir = safe_mkdir(&output_dir.join("databases").join(database_id))?;

    let schema_written = schema_changed || !incremental;
    if schema_written {
        let schema = generate_database_schema(database)?;
        atomic_write(&db_dir.join("_schema.yaml"), schema.as_bytes())?;
        state.update_database(database_id, last_edited, &schema);
    }

    let converter = MarkdownConverter::new(client);
    for row in client.database_pages(&database.id) {
        let row = row?;
        if incremental && !state.needs_backup(row.id.as_str(), &row.last_edited_time, None) {
            continue;
        }

        let blocks = fetch_blocks(client, &row.id)?;
        let content = format!(
            "{}{}",
            generate_frontmatter(&row)?,
            converter.convert_blocks(&blocks, 0)?,
        );

        atomic_write(
            &db_dir.join(format!("{}.md", row.id)),
            content.as_bytes(),
        )?;
        state.update_page(row.id.as_str(), &row.last_edited_time, &content, BTreeMap::new());
    }

    Ok(schema_written)
}

fn fetch_blocks(client: &NotionClient, page_id: &PageId) -> Result<Vec<Block>, AppError> {
    // A page is a block as far as the children endpoint is concerned.
    let block_id = BlockId::parse(page_id.as_str())?;
    client.block_children(&block_id).collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
