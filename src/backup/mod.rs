// src/backup/mod.rs
//! Workspace backup: change detection, markdown conversion,
//! attachments, and orchestration.

pub mod attachments;
mod exporter;
pub mod frontmatter;
pub mod markdown;
mod state;

pub use exporter::run_backup;
pub use state::{compute_hash, BackupState, PageState};
