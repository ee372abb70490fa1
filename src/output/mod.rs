// src/output/mod.rs
//! Filesystem output and CLI result reporting.

mod atomic;
mod report;

pub use atomic::{atomic_write, safe_mkdir};
pub use report::{
    exit_code, BackupResult, DailyResult, ErrorRecord, OutputFormatter, StatusResult,
};
