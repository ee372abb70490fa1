// src/scheduler/mod.rs
//! Scheduled execution of backup and daily jobs.

mod daemon;
mod jobs;

pub use daemon::{run_scheduler, SchedulerDaemon, Slot};
pub use jobs::{backup_job, daily_job};
