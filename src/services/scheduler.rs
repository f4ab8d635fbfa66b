//! Daily credit reset scheduler
//!
//! A single periodic task that fires a [`ResetTrigger`] at local midnight
//! for a fixed UTC offset. Consecutive failures are counted; once the count
//! reaches the configured maximum the scheduler stops itself. The handle is
//! cheap to clone and lives in the application state.

use async_trait::async_trait;
use chrono::{DateTime, Days, FixedOffset, TimeZone, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::models::ResetSummary;
use crate::types::{FaceoffError, Result};

/// Path of the reset endpoint, relative to the service base URL
pub const RESET_PATH: &str = "/credits/reset";

/// Something that performs one credit reset
#[async_trait]
pub trait ResetTrigger: Send + Sync {
    async fn trigger(&self) -> Result<ResetSummary>;
}

/// Calls the service's own reset endpoint with the cron secret
pub struct HttpResetTrigger {
    client: reqwest::Client,
    url: String,
    secret: String,
}

impl HttpResetTrigger {
    pub fn new(app_url: &str, secret: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            url: format!("{}{}", app_url.trim_end_matches('/'), RESET_PATH),
            secret: secret.into(),
        })
    }
}

#[async_trait]
impl ResetTrigger for HttpResetTrigger {
    async fn trigger(&self) -> Result<ResetSummary> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.secret)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FaceoffError::Http(format!(
                "Reset API returned {}",
                status
            )));
        }

        Ok(response.json::<ResetSummary>().await?)
    }
}

/// Snapshot of the scheduler state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub is_running: bool,
    pub last_reset: Option<DateTime<Utc>>,
    pub next_reset: Option<DateTime<Utc>>,
    pub error_count: u32,
}

/// Result of a manually requested reset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualReset {
    pub success: bool,
    pub message: String,
}

#[derive(Clone)]
pub struct CreditResetScheduler {
    trigger: Arc<dyn ResetTrigger>,
    offset: FixedOffset,
    max_failures: u32,
    status: Arc<RwLock<SchedulerStatus>>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl CreditResetScheduler {
    pub fn new(trigger: Arc<dyn ResetTrigger>, offset: FixedOffset, max_failures: u32) -> Self {
        Self {
            trigger,
            offset,
            max_failures: max_failures.max(1),
            status: Arc::new(RwLock::new(SchedulerStatus::default())),
            task: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }

    /// Start the daily loop. Calling `start` on a running scheduler is a
    /// no-op.
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|h| !h.is_finished()) {
            info!("Credit reset scheduler is already running");
            return;
        }

        let next = next_local_midnight(Utc::now(), self.offset);
        {
            let mut status = self.status.write().await;
            status.is_running = true;
            status.next_reset = next;
        }

        let scheduler = self.clone();
        *task = Some(tokio::spawn(async move { scheduler.run_loop().await }));

        info!(
            offset = %self.offset,
            next_reset = ?next,
            "Credit reset scheduler started"
        );
    }

    /// Stop the loop; the status keeps the last reset and error count
    pub async fn stop(&self) {
        if let Some(handle) = self.task.lock().await.take() {
            handle.abort();
            info!("Credit reset scheduler stopped");
        }
        let mut status = self.status.write().await;
        status.is_running = false;
        status.next_reset = None;
    }

    /// Run one reset attempt now, outside the daily cadence
    pub async fn manual_reset(&self) -> ManualReset {
        match self.run_once().await {
            Ok(summary) => ManualReset {
                success: true,
                message: format!(
                    "Manual credit reset completed successfully ({} balances)",
                    summary.count
                ),
            },
            Err(e) => ManualReset {
                success: false,
                message: format!("Manual credit reset failed: {}", e),
            },
        }
    }

    /// One reset attempt with failure accounting
    pub async fn run_once(&self) -> Result<ResetSummary> {
        info!("Executing daily credit reset");

        match self.trigger.trigger().await {
            Ok(summary) => {
                let mut status = self.status.write().await;
                status.last_reset = Some(Utc::now());
                status.error_count = 0;
                if status.is_running {
                    status.next_reset = next_local_midnight(Utc::now(), self.offset);
                }
                info!(count = summary.count, "Daily credit reset completed");
                Ok(summary)
            }
            Err(e) => {
                let error_count = {
                    let mut status = self.status.write().await;
                    status.error_count += 1;
                    status.error_count
                };
                error!(
                    error = %e,
                    transient = e.is_transient(),
                    error_count,
                    "Failed to execute daily credit reset"
                );

                if error_count >= self.max_failures {
                    error!(
                        max_failures = self.max_failures,
                        "Too many consecutive errors, stopping credit reset scheduler"
                    );
                    self.disable().await;
                }
                Err(e)
            }
        }
    }

    async fn disable(&self) {
        {
            let mut status = self.status.write().await;
            status.is_running = false;
            status.next_reset = None;
        }
        if let Some(handle) = self.task.lock().await.take() {
            handle.abort();
        }
    }

    async fn run_loop(&self) {
        loop {
            let Some(next) = self.status.read().await.next_reset else {
                break;
            };

            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait).await;

            // Failures are counted inside run_once
            let _ = self.run_once().await;

            let mut status = self.status.write().await;
            if !status.is_running {
                break;
            }
            match next_local_midnight(Utc::now(), self.offset) {
                Some(n) => status.next_reset = Some(n),
                None => {
                    warn!("Could not compute next reset time, stopping scheduler");
                    status.is_running = false;
                    status.next_reset = None;
                    break;
                }
            }
        }
    }
}

/// The first midnight strictly after `now`, in the given offset
pub fn next_local_midnight(now: DateTime<Utc>, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let local = now.with_timezone(&offset);
    let tomorrow = local.date_naive().checked_add_days(Days::new(1))?;
    let midnight = tomorrow.and_hms_opt(0, 0, 0)?;
    offset
        .from_local_datetime(&midnight)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}
