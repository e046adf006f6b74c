//! Single-threaded job scheduler
//!
//! A table of jobs, each with a schedule, its last and next run time and a
//! task. The loop checks the wall clock, runs every due job to completion in
//! registration order, then sleeps for a short tick:
//!
//! ```text
//! loop {
//!     for job in jobs where next_run <= now: run, log failure, reschedule
//!     sleep(tick)
//! }
//! ```
//!
//! Jobs never overlap: each one is awaited before the next is looked at. A
//! failing job is logged and rescheduled; it never stops the loop. The next
//! fire is computed from when the job finished, so a job that overruns its
//! interval does not fire again straight away.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveTime, TimeDelta, Utc, Weekday};
use tokio::time::Instant;
use tracing::{debug, error, instrument};

use crate::error::MonitorResult;

/// Sleep between two due-checks
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

#[async_trait]
pub trait Task: Send + Sync {
    async fn run(&self) -> MonitorResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Fixed interval, first run one interval after registration
    Every(TimeDelta),

    /// Once a week at a time of day (UTC)
    Weekly { weekday: Weekday, time: NaiveTime },
}

impl Schedule {
    pub fn every_secs(secs: u64) -> Self {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX);
        Schedule::Every(TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX))
    }

    /// Next fire time strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Schedule::Every(interval) => now
                .checked_add_signed(interval)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            Schedule::Weekly { weekday, time } => {
                let today = now.date_naive();
                let days_ahead = (weekday.num_days_from_monday() + 7
                    - today.weekday().num_days_from_monday())
                    % 7;

                let candidate = (today + TimeDelta::days(i64::from(days_ahead)))
                    .and_time(time)
                    .and_utc();

                if candidate <= now {
                    candidate + TimeDelta::days(7)
                } else {
                    candidate
                }
            }
        }
    }
}

pub struct Job {
    name: String,
    schedule: Schedule,
    last_run: Option<DateTime<Utc>>,
    next_run: DateTime<Utc>,
    task: Box<dyn Task>,
}

impl Job {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        self.last_run
    }

    pub fn next_run(&self) -> DateTime<Utc> {
        self.next_run
    }

    fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_run <= now
    }
}

pub struct Scheduler {
    jobs: Vec<Job>,
    tick: Duration,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_tick(DEFAULT_TICK)
    }

    pub fn with_tick(tick: Duration) -> Self {
        Self {
            jobs: Vec::new(),
            tick,
        }
    }

    /// Register a job; its first run is the schedule's next fire after `now`.
    pub fn add_job(
        &mut self,
        name: impl Into<String>,
        schedule: Schedule,
        task: impl Task + 'static,
        now: DateTime<Utc>,
    ) {
        let name = name.into();
        let next_run = schedule.next_after(now);
        debug!("registered job {name}, first run at {next_run}");

        self.jobs.push(Job {
            name,
            schedule,
            last_run: None,
            next_run,
            task: Box::new(task),
        });
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|job| job.name == name)
    }

    /// Run every job due at `now` and return how many ran.
    ///
    /// A job that ran is rescheduled from `now` plus its run time.
    #[instrument(skip(self))]
    pub async fn run_pending(&mut self, now: DateTime<Utc>) -> usize {
        let mut ran = 0;

        for job in self.jobs.iter_mut().filter(|job| job.is_due(now)) {
            debug!("running job {}", job.name);
            let started = Instant::now();

            if let Err(e) = job.task.run().await {
                error!("job {} failed ({:?}): {e}", job.name, e.kind());
            }

            // whole seconds, the loop only looks at the clock once per tick
            let elapsed = TimeDelta::try_seconds(
                i64::try_from(started.elapsed().as_secs()).unwrap_or(i64::MAX),
            )
            .unwrap_or(TimeDelta::MAX);
            let finished = now.checked_add_signed(elapsed).unwrap_or(DateTime::<Utc>::MAX_UTC);
            debug!("job {} finished after {}s", job.name, elapsed.num_seconds());

            job.last_run = Some(now);
            job.next_run = job.schedule.next_after(finished);
            ran += 1;
        }

        ran
    }

    /// Run forever.
    pub async fn run(mut self) {
        debug!("starting scheduler with {} jobs", self.jobs.len());

        loop {
            self.run_pending(Utc::now()).await;
            tokio::time::sleep(self.tick).await;
        }
    }
}
