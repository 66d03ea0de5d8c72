use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Fires a job once a day at a fixed wall-clock time in a given timezone.
#[derive(Debug, Clone)]
pub struct DailyScheduler {
    run_at: NaiveTime,
    timezone: Tz,
}

impl DailyScheduler {
    pub fn new(run_at: NaiveTime, timezone: Tz) -> Self {
        Self { run_at, timezone }
    }

    /// First trigger strictly after `now`.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.with_timezone(&self.timezone).date_naive();
        let mut day = today;
        loop {
            let candidate = self.resolve_local(day.and_time(self.run_at));
            if candidate > now {
                return candidate;
            }
            day = day.succ_opt().unwrap_or(day + ChronoDuration::days(1));
        }
    }

    // Local times skipped by a DST jump are pushed forward to the first valid instant.
    fn resolve_local(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        let mut candidate = naive;
        for _ in 0..4 {
            if let Some(dt) = self.timezone.from_local_datetime(&candidate).earliest() {
                return dt.with_timezone(&Utc);
            }
            candidate += ChronoDuration::minutes(30);
        }
        Utc.from_utc_datetime(&naive)
    }

    /// Run `job` daily until Ctrl-C. A run that has started always completes.
    pub async fn run<F, Fut>(&self, initial_run: bool, job: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        };
        self.run_until(initial_run, job, shutdown).await;
    }

    /// Like [`run`](Self::run) but stops when `shutdown` resolves.
    pub async fn run_until<F, Fut, S>(&self, initial_run: bool, mut job: F, shutdown: S)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        if initial_run {
            info!("Running initial sync");
            job().await;
        }

        loop {
            let next = self.next_run_after(Utc::now());
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            info!(
                "Next run at {} (in {}s)",
                next.with_timezone(&self.timezone).format("%Y-%m-%d %H:%M %Z"),
                wait.as_secs()
            );

            tokio::select! {
                _ = tokio::time::sleep(wait) => job().await,
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping scheduler");
                    break;
                }
            }
        }
    }
}
