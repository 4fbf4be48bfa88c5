//! Cron-driven trigger for reconciliation runs.
//!
//! Runs execute as background tokio tasks so the tick loop never blocks. At most
//! one run is in flight: a tick that lands while a run is still going is skipped.

use crate::reconcile::SyncJob;
use crate::{Error, Result};
use chrono::Utc;
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub struct SyncScheduler {
    expr: String,
    schedule: Schedule,
    job: Arc<dyn SyncJob>,
    in_flight: Arc<AtomicBool>,
}

/// Clears the in-flight flag when the run task ends, including on panic.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SyncScheduler {
    pub fn new(expr: &str, job: Arc<dyn SyncJob>) -> Result<Self> {
        let schedule = Schedule::from_str(expr)
            .map_err(|e| Error::Scheduling(format!("invalid cron expression '{expr}': {e}")))?;
        if schedule.upcoming(Utc).next().is_none() {
            return Err(Error::Scheduling(format!(
                "cron expression '{expr}' never fires"
            )));
        }
        Ok(Self {
            expr: expr.to_string(),
            schedule,
            job,
            in_flight: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn expr(&self) -> &str {
        &self.expr
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start the tick loop. Runs until the task is dropped or the schedule is exhausted.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(schedule = %self.expr, "sync scheduler started");
            loop {
                let Some(next) = self.schedule.upcoming(Utc).next() else {
                    tracing::error!(schedule = %self.expr, "schedule has no upcoming fire time; stopping");
                    return;
                };
                let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                tokio::time::sleep(wait).await;

                tracing::info!("running the scheduled sync");
                let _ = self.fire();
            }
        })
    }

    /// Launch one run in the background unless one is already in flight.
    ///
    /// Returns the run's task handle, or `None` when the tick was skipped.
    pub fn fire(&self) -> Option<tokio::task::JoinHandle<()>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("previous sync run still in flight; skipping this tick");
            return None;
        }

        let guard = InFlightGuard(self.in_flight.clone());
        let job = self.job.clone();
        Some(tokio::spawn(async move {
            let _guard = guard;
            match job.run().await {
                Ok(report) => {
                    tracing::info!(
                        updated = report.updated,
                        elapsed_ms = report.elapsed.as_millis() as u64,
                        "scheduled sync run finished"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, status = ?e.status(), "scheduled sync run failed");
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RunReport;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct CountingJob {
        runs: AtomicUsize,
        fail: bool,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl SyncJob for CountingJob {
        async fn run(&self) -> Result<RunReport> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail {
                return Err(Error::Api {
                    endpoint: "/crm/v3/objects/contacts/1".to_string(),
                    status: 500,
                    body: String::new(),
                });
            }
            Ok(RunReport::default())
        }
    }

    #[test]
    fn rejects_bad_cron() {
        let job = Arc::new(CountingJob::default());
        let err = SyncScheduler::new("every minute please", job).err().unwrap();
        assert!(matches!(err, Error::Scheduling(_)));
    }

    #[tokio::test]
    async fn failed_run_does_not_stop_later_runs() {
        let job = Arc::new(CountingJob {
            fail: true,
            ..Default::default()
        });
        let scheduler = SyncScheduler::new("0 * * * * *", job.clone()).unwrap();

        scheduler.fire().unwrap().await.unwrap();
        assert!(!scheduler.is_running());
        scheduler.fire().unwrap().await.unwrap();

        assert_eq!(job.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn overlapping_tick_is_skipped() {
        let gate = Arc::new(Notify::new());
        let job = Arc::new(CountingJob {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let scheduler = SyncScheduler::new("0 * * * * *", job.clone()).unwrap();

        let first = scheduler.fire().unwrap();
        assert!(scheduler.is_running());
        assert!(scheduler.fire().is_none());

        gate.notify_one();
        first.await.unwrap();
        assert!(!scheduler.is_running());

        gate.notify_one();
        scheduler.fire().unwrap().await.unwrap();
        assert_eq!(job.runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn loop_fires_on_schedule() {
        let job = Arc::new(CountingJob::default());
        let scheduler = Arc::new(SyncScheduler::new("* * * * * *", job.clone()).unwrap());
        let handle = scheduler.start();

        let fired = tokio::time::timeout(Duration::from_secs(5), async {
            while job.runs.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await;
        handle.abort();

        assert!(fired.is_ok(), "scheduler never fired");
    }
}
