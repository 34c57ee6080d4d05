//! Cron-driven trigger for reconciliation sweeps

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use cron::Schedule;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::cron_helper::{next_run_after, parse_schedule};
use crate::errors::AppError;
use crate::services::CatalogReconciler;

/// Sleeps until each cron occurrence (local time) and runs one sweep.
pub struct ReconcileScheduler {
    reconciler: Arc<CatalogReconciler>,
    schedule: Schedule,
    expression: String,
    run_on_startup: bool,
}

impl ReconcileScheduler {
    pub fn new(
        reconciler: Arc<CatalogReconciler>,
        cron_expression: &str,
        run_on_startup: bool,
    ) -> Result<Self, String> {
        Ok(Self {
            reconciler,
            schedule: parse_schedule(cron_expression)?,
            expression: cron_expression.to_string(),
            run_on_startup,
        })
    }

    /// Run until `cancellation_token` fires. A sweep in progress is allowed
    /// to finish; cancellation is only observed between sweeps.
    pub async fn run(&self, cancellation_token: CancellationToken) -> Result<()> {
        info!(
            "Starting reconcile scheduler with schedule '{}'",
            self.expression
        );

        if self.run_on_startup {
            info!("Running startup reconciliation");
            self.run_once().await;
        }

        loop {
            let now = Local::now();
            let Some(next) = next_run_after(&self.schedule, &now) else {
                warn!(
                    "Schedule '{}' has no future occurrences, stopping scheduler",
                    self.expression
                );
                break;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!(
                "Next poster reconciliation at {} (in {})",
                next.format("%Y-%m-%d %H:%M:%S %Z"),
                humantime::format_duration(Duration::from_secs(wait.as_secs()))
            );

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    self.run_once().await;
                }
                _ = cancellation_token.cancelled() => {
                    info!("Reconcile scheduler received cancellation signal, shutting down");
                    break;
                }
            }
        }

        info!("Reconcile scheduler stopped");
        Ok(())
    }

    async fn run_once(&self) {
        match self.reconciler.reconcile().await {
            Ok(stats) => debug!("Scheduled reconciliation finished: {:?}", stats),
            Err(AppError::OperationInProgress { .. }) => {
                info!("Skipping scheduled reconciliation, another sweep is running");
            }
            Err(e) => error!("Scheduled reconciliation failed: {}", e),
        }
    }
}
