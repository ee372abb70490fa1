// src/scheduler/daemon.rs
//! Long-running scheduler for backup and daily jobs.
//!
//! Scheduling is a plain polling loop: each job carries its next due
//! time, the loop wakes once a minute, runs whatever is due, and
//! computes the following occurrence. Job bodies run on the daemon
//! thread; a slow backup simply delays the next check.

use crate::config::Config;
use crate::scheduler::jobs::{backup_job, daily_job};
use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveTime};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// When a job recurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Hourly,
    DailyAt(NaiveTime),
}

impl Slot {
    /// Next occurrence strictly after `now`.
    pub fn next_after(&self, now: DateTime<Local>) -> DateTime<Local> {
        match self {
            Slot::Hourly => now + ChronoDuration::hours(1),
            Slot::DailyAt(time) => {
                let today = now.date_naive().and_time(*time);
                let candidate = today
                    .and_local_timezone(Local)
                    .earliest()
                    .unwrap_or(now);
                if candidate > now {
                    candidate
                } else {
                    candidate + ChronoDuration::days(1)
                }
            }
        }
    }
}

struct ScheduledJob {
    name: &'static str,
    slot: Slot,
    run: fn(&Config),
    next_run: DateTime<Local>,
}

/// Daemon that runs scheduled backup and daily jobs until stopped.
pub struct SchedulerDaemon {
    config: Config,
    jobs: Vec<ScheduledJob>,
}

impl SchedulerDaemon {
    pub fn new(config: Config) -> Self {
        let now = Local::now();
        let mut jobs = Vec::new();

        let backup_slot = parse_backup_schedule(&config.scheduler.backup_schedule);
        match backup_slot {
            Slot::Hourly => log::info!("Backup scheduled: every hour"),
            Slot::DailyAt(time) => {
                log::info!("Backup scheduled: daily at {}", time.format("%H:%M"))
            }
        }
        jobs.push(ScheduledJob {
            name: "backup",
            slot: backup_slot,
            run: backup_job,
            next_run: backup_slot.next_after(now),
        });

        if config.daily.target_page_id.is_some() {
            let time = parse_daily_time(&config.scheduler.daily_time);
            log::info!("Daily content scheduled: every day at {}", time.format("%H:%M"));
            let slot = Slot::DailyAt(time);
            jobs.push(ScheduledJob {
                name: "daily",
                slot,
                run: daily_job,
                next_run: slot.next_after(now),
            });
        } else {
            log::info!("Daily content not scheduled: no target_page_id configured");
        }

        Self { config, jobs }
    }

    /// Poll until `stop` flips to true. The flag is checked every
    /// second so shutdown never waits out a full poll interval.
    pub fn run(&mut self, stop: &AtomicBool) {
        log::info!("Starting scheduler daemon");
        for job in &self.jobs {
            log::info!("Next {} run: {}", job.name, job.next_run.format("%Y-%m-%d %H:%M"));
        }

        while !stop.load(Ordering::Relaxed) {
            let now = Local::now();
            for job in &mut self.jobs {
                if now >= job.next_run {
                    (job.run)(&self.config);
                    job.next_run = job.slot.next_after(Local::now());
                    log::info!(
                        "Next {} run: {}",
                        job.name,
                        job.next_run.format("%Y-%m-%d %H:%M"),
                    );
                }
            }

            let mut waited = Duration::ZERO;
            while waited < POLL_INTERVAL && !stop.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_secs(1));
                waited += Duration::from_secs(1);
            }
        }

        log::info!("Scheduler stopped");
    }
}

/// Run the scheduler until SIGINT or SIGTERM stops it. The signal
/// flag is observed between jobs, so a run in progress finishes.
pub fn run_scheduler(config: Config, foreground: bool) {
    if !foreground {
        log::warn!("Background mode not fully implemented, running in foreground");
    }

    let stop = Arc::new(AtomicBool::new(false));
    let signal_flag = Arc::clone(&stop);
    if let Err(err) = ctrlc::set_handler(move || {
        log::info!("Shutdown signal received, stopping scheduler");
        signal_flag.store(true, Ordering::Relaxed);
    }) {
        log::warn!("Could not install shutdown handler: {}", err);
    }
    SchedulerDaemon::new(config).run(&stop);
}

fn parse_backup_schedule(schedule: &str) -> Slot {
    match schedule.to_ascii_lowercase().as_str() {
        "hourly" => Slot::Hourly,
        "daily" => Slot::DailyAt(midnight()),
        other => {
            log::warn!("Unknown backup schedule '{}', defaulting to daily", other);
            Slot::DailyAt(midnight())
        }
    }
}

fn parse_daily_time(time: &str) -> NaiveTime {
    NaiveTime::parse_from_str(time, "%H:%M").unwrap_or_else(|_| {
        log::warn!("Invalid daily_time '{}', defaulting to 06:00", time);
        NaiveTime::from_hms_opt(6, 0, 0).expect("06:00 is a valid time")
    })
}

fn midnight() -> NaiveTime {
    NaiveTime::from_hms_opt(0, 0, 0).expect("midnight is a valid time")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 8, 6, h, m, 0).unwrap()
    }

    #[test]
    fn hourly_slot_advances_one_hour() {
        let next = Slot::Hourly.next_after(at(10, 30));
        assert_eq!(next, at(11, 30));
    }

    #[test]
    fn daily_slot_later_today() {
        let slot = Slot::DailyAt(NaiveTime::from_hms_opt(18, 0, 0).unwrap());
        assert_eq!(slot.next_after(at(10, 0)), at(18, 0));
    }

    #[test]
    fn daily_slot_rolls_to_tomorrow() {
        let slot = Slot::DailyAt(NaiveTime::from_hms_opt(6, 0, 0).unwrap());
        let next = slot.next_after(at(10, 0));
        assert_eq!(
            next,
            Local.with_ymd_and_hms(2025, 8, 7, 6, 0, 0).unwrap()
        );
    }

    #[test]
    fn unknown_schedule_defaults_to_daily_midnight() {
        assert_eq!(
            parse_backup_schedule("every-fortnight"),
            Slot::DailyAt(midnight())
        );
        assert_eq!(parse_backup_schedule("HOURLY"), Slot::Hourly);
    }

    #[test]
    fn run_exits_when_stop_flag_flips() {
        // Default config schedules nothing in the near future, so the
        // daemon just polls until the flag is set.
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            SchedulerDaemon::new(Config::default()).run(&flag);
        });

        std::thread::sleep(Duration::from_millis(200));
        stop.store(true, Ordering::Relaxed);
        handle.join().expect("daemon thread should exit cleanly");
    }

    #[test]
    fn bad_daily_time_falls_back() {
        assert_eq!(
            parse_daily_time("not-a-time"),
            NaiveTime::from_hms_opt(6, 0, 0).unwrap()
        );
        assert_eq!(
            parse_daily_time("23:45"),
            NaiveTime::from_hms_opt(23, 45, 0).unwrap()
        );
    }
}
