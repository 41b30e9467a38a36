//! Recurring monitoring job.
//!
//! Responsibilities:
//! - Own the single job slot (`Idle` / `Running`); only `start` and `stop`
//!   mutate it.
//! - Fire the pipeline on every cron tick, independent of how long earlier
//!   runs take.
//! - Skip a tick while the previous run is still in flight.
//! - Publish every tick outcome on a broadcast channel and in the log.
//!
//! Non-responsibilities:
//! - Retrying failed runs (the next tick is the retry).
//! - Submitting deposits on-chain; a positive decision is only logged.

use crate::application::monitor::MonitorUseCase;
use crate::domain::entities::decision::MonitorReport;
use crate::domain::error::{DomainError, SchedulerStateError};
use crate::domain::values::preferences::UserPreferences;
use crate::domain::values::schedule::CronSchedule;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const EVENT_CAPACITY: usize = 64;

/// Outcome of one scheduled tick.
#[derive(Debug, Clone)]
pub enum TickEvent {
    Completed(Arc<MonitorReport>),
    Failed { message: String },
    /// The previous run was still in progress.
    Skipped,
}

/// The job as seen by callers of `start` and `stop`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledJob {
    pub interval: String,
    pub preferences: UserPreferences,
    pub active: bool,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub active: bool,
    pub interval: Option<String>,
    pub preferences: Option<UserPreferences>,
    pub started_at: Option<DateTime<Utc>>,
    pub next_tick: Option<DateTime<Utc>>,
    pub run_in_progress: bool,
    pub ticks_fired: u64,
    pub ticks_skipped: u64,
}

#[derive(Debug, Default)]
struct TickCounters {
    fired: AtomicU64,
    skipped: AtomicU64,
}

struct ActiveJob {
    schedule: CronSchedule,
    preferences: UserPreferences,
    started_at: DateTime<Utc>,
    handle: JoinHandle<()>,
}

impl ActiveJob {
    fn snapshot(&self, active: bool) -> ScheduledJob {
        ScheduledJob {
            interval: self.schedule.expression().to_string(),
            preferences: self.preferences.clone(),
            active,
            started_at: self.started_at,
        }
    }
}

/// Held for the duration of a pipeline run; releases the in-progress flag on
/// drop, including when the run panics.
struct RunPermit(Arc<AtomicBool>);

impl RunPermit {
    fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit(Arc::clone(flag)))
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Scheduler {
    monitor: Arc<MonitorUseCase>,
    job: Mutex<Option<ActiveJob>>,
    in_progress: Arc<AtomicBool>,
    counters: Arc<TickCounters>,
    events: broadcast::Sender<TickEvent>,
}

impl Scheduler {
    pub fn new(monitor: Arc<MonitorUseCase>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            monitor,
            job: Mutex::new(None),
            in_progress: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(TickCounters::default()),
            events,
        }
    }

    /// Receives every tick outcome from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TickEvent> {
        self.events.subscribe()
    }

    /// Starts the recurring job. Fails with `AlreadyRunning` if a job is
    /// active; invalid input is rejected before the slot is touched.
    pub async fn start(
        &self,
        interval: &str,
        preferences: UserPreferences,
    ) -> Result<ScheduledJob, DomainError> {
        preferences.validate()?;
        let schedule = CronSchedule::parse(interval)?;

        let mut slot = self.job.lock().await;
        if let Some(job) = slot.as_ref() {
            if !job.handle.is_finished() {
                return Err(SchedulerStateError::AlreadyRunning.into());
            }
        }

        let handle = tokio::spawn(tick_loop(
            Arc::clone(&self.monitor),
            schedule.clone(),
            preferences.clone(),
            Arc::clone(&self.in_progress),
            Arc::clone(&self.counters),
            self.events.clone(),
        ));

        let job = ActiveJob {
            schedule,
            preferences,
            started_at: Utc::now(),
            handle,
        };
        let snapshot = job.snapshot(true);
        *slot = Some(job);

        info!(
            interval = %snapshot.interval,
            risk = %snapshot.preferences.risk_tolerance,
            margin = snapshot.preferences.profit_margin,
            "monitoring job started"
        );
        Ok(snapshot)
    }

    /// Cancels the recurring timer. A run already in flight is allowed to
    /// finish.
    pub async fn stop(&self) -> Result<ScheduledJob, DomainError> {
        let mut slot = self.job.lock().await;
        let job = match slot.take() {
            Some(job) if !job.handle.is_finished() => job,
            _ => return Err(SchedulerStateError::NotRunning.into()),
        };
        job.handle.abort();
        info!(interval = %job.schedule, "monitoring job stopped");
        Ok(job.snapshot(false))
    }

    pub async fn status(&self) -> JobStatus {
        let slot = self.job.lock().await;
        let active = slot.as_ref().filter(|job| !job.handle.is_finished());
        JobStatus {
            active: active.is_some(),
            interval: active.map(|j| j.schedule.expression().to_string()),
            preferences: active.map(|j| j.preferences.clone()),
            started_at: active.map(|j| j.started_at),
            next_tick: active.and_then(|j| j.schedule.next_after(Utc::now())),
            run_in_progress: self.in_progress.load(Ordering::Acquire),
            ticks_fired: self.counters.fired.load(Ordering::Relaxed),
            ticks_skipped: self.counters.skipped.load(Ordering::Relaxed),
        }
    }

    /// Runs the pipeline once, regardless of whether a job is active.
    pub async fn trigger(&self, preferences: &UserPreferences) -> Result<MonitorReport, DomainError> {
        let outcome = self.monitor.run(preferences).await;
        if let Ok(report) = &outcome {
            log_report(report);
        }
        outcome
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        // `&mut self` gives exclusive access to the slot.
        if let Some(job) = self.job.get_mut().take() {
            job.handle.abort();
        }
    }
}

async fn tick_loop(
    monitor: Arc<MonitorUseCase>,
    schedule: CronSchedule,
    preferences: UserPreferences,
    in_progress: Arc<AtomicBool>,
    counters: Arc<TickCounters>,
    events: broadcast::Sender<TickEvent>,
) {
    let mut last_fire: Option<DateTime<Utc>> = None;
    loop {
        let now = Utc::now();
        // Never fire the same cron instant twice if the timer wakes early.
        let after = last_fire.map_or(now, |last| last.max(now));
        let Some(next) = schedule.next_after(after) else {
            info!(interval = %schedule, "schedule has no further fire times");
            return;
        };
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        tokio::time::sleep(wait).await;
        last_fire = Some(next);

        counters.fired.fetch_add(1, Ordering::Relaxed);
        let Some(permit) = RunPermit::try_acquire(&in_progress) else {
            counters.skipped.fetch_add(1, Ordering::Relaxed);
            warn!(tick = %next, "previous run still in progress; skipping tick");
            let _ = events.send(TickEvent::Skipped);
            continue;
        };

        let monitor = Arc::clone(&monitor);
        let preferences = preferences.clone();
        let events = events.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let event = match monitor.run(&preferences).await {
                Ok(report) => {
                    log_report(&report);
                    TickEvent::Completed(Arc::new(report))
                }
                Err(e) => {
                    error!(error = %e, "scheduled run failed; waiting for next tick");
                    TickEvent::Failed {
                        message: e.to_string(),
                    }
                }
            };
            let _ = events.send(event);
        });
    }
}

fn log_report(report: &MonitorReport) {
    let d = &report.decision;
    info!(
        run_id = %report.run_id,
        price = d.current_price,
        profit_pct = d.profit_pct,
        should_deposit = d.should_deposit,
        confidence = %d.confidence,
        degraded = report.degraded,
        "{}",
        d.reasoning
    );
    if d.should_deposit {
        warn!(
            target: "deposit_alert",
            run_id = %report.run_id,
            symbol = %report.observation.symbol,
            price = d.current_price,
            predicted = d.predicted_price,
            profit_pct = d.profit_pct,
            confidence = %d.confidence,
            "DEPOSIT SIGNAL: conditions favour a deposit; intent logged, no transaction submitted"
        );
    }
}
