//! Cron-driven template reconciliation.
//!
//! ```text
//! JobScheduler (RECONCILE_SCHEDULE, every minute by default)
//!     │
//!     └─► reconcile_due_templates()   skipped while the previous pass runs
//!             └─► one approval fetch per due template, on the reconcile pool
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, warn};

use crate::domains::templates::reconcile_due_templates;
use crate::kernel::ServerDeps;

/// Register the reconciliation job and start ticking.
///
/// The returned scheduler must be kept alive; dropping it stops the job.
pub async fn start_scheduler(deps: ServerDeps, schedule: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new()
        .await
        .context("Failed to create job scheduler")?;

    let running = Arc::new(AtomicBool::new(false));
    let reconcile_job = Job::new_async(schedule, move |_uuid, _lock| {
        let deps = deps.clone();
        let running = running.clone();
        Box::pin(async move {
            if running.swap(true, Ordering::SeqCst) {
                warn!("Previous reconciliation pass still running, skipping tick");
                return;
            }

            match reconcile_due_templates(&deps).await {
                Ok(report) if report.due == 0 => debug!("Reconciliation tick: nothing due"),
                Ok(report) => debug!(
                    due = report.due,
                    updated = report.updated,
                    failed = report.failed,
                    "Reconciliation tick finished"
                ),
                Err(e) => error!(error = %e, "Template reconciliation pass failed"),
            }

            running.store(false, Ordering::SeqCst);
        })
    })
    .with_context(|| format!("Invalid reconcile schedule: {}", schedule))?;

    scheduler.add(reconcile_job).await?;
    scheduler.start().await?;

    info!(schedule, "Template reconciliation scheduled");
    Ok(scheduler)
}
