// src/lib.rs
//! notion-vault library — incremental Notion workspace backup to
//! markdown, plus daily content publishing.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling** — `AppError`, `NotionErrorCode`
//! - **Configuration** — `Config`, `load_config`
//! - **Domain model** — `Page`, `Database`, `Block`, property types
//! - **Domain types** — `PageId`, `BlockId`, `DatabaseId`, rich text
//! - **API client** — `NotionClient`, pagination, rate limiting
//! - **Backup engine** — `run_backup`, `BackupState`, markdown and
//!   frontmatter generation
//! - **Daily publishing** — `run_daily`, `TemplateEngine`
//! - **Scheduling and notifications** — `run_scheduler`,
//!   `DiscordNotifier`

pub mod api;
pub mod backup;
pub mod config;
pub mod constants;
pub mod daily;
pub mod error;
pub mod model;
pub mod notify;
pub mod output;
pub mod scheduler;
pub mod types;

// --- Error Handling ---
pub use crate::error::{AppError, NotionErrorCode};

// --- Configuration ---
pub use crate::config::{load_config, Config};

// --- Domain Model ---
pub use crate::model::{
    Block, BlockCommon, Database, DatabaseProperty, Page, Parent, PropertyConfig, PropertyValue,
};

// --- Domain Types ---
pub use crate::types::{Annotations, BlockId, DatabaseId, PageId, RichTextItem};

// --- API Client ---
pub use crate::api::NotionClient;

// --- Backup Engine ---
pub use crate::backup::{run_backup, BackupState};

// --- Daily Publishing ---
pub use crate::daily::{run_daily, TemplateEngine};

// --- Scheduling and Notifications ---
pub use crate::notify::DiscordNotifier;
pub use crate::scheduler::run_scheduler;

// --- Results and Reporting ---
pub use crate::output::{BackupResult, DailyResult, OutputFormatter, StatusResult};
