//! Scheduled jobs for the weekly poll rotation.
//!
//! Two periodic tasks drive the rotation state machine: a slow tick
//! that features the next weekly poll when the slot is free, and a
//! fast tick that closes polls past their end time (which also hands
//! ended contests to resolution). Low volume by nature of the domain,
//! so plain tokio intervals are enough; there is no job queue.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Interval for the weekly rotation check (default: 1 hour).
    pub rotation_interval: Duration,
    /// Interval for closing overdue polls (default: 1 minute).
    pub close_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            rotation_interval: Duration::from_secs(3600),
            close_interval: Duration::from_secs(60),
        }
    }
}

/// Job executor trait for scheduled jobs.
#[async_trait::async_trait]
pub trait JobExecutor: Send + Sync {
    /// Feature the next weekly poll if none is active.
    ///
    /// Returns whether a poll was promoted.
    async fn rotate_weekly(&self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;

    /// Close polls whose end time has passed, resolving ended contests.
    ///
    /// Returns the number of polls closed.
    async fn close_due_polls(&self) -> Result<u64, Box<dyn std::error::Error + Send + Sync>>;
}

/// Run the scheduler with the given configuration and executor.
pub fn run_scheduler<E: JobExecutor + 'static>(config: SchedulerConfig, executor: Arc<E>) {
    let executor_rotation = executor.clone();
    let executor_close = executor;

    let rotation_interval = config.rotation_interval;
    let close_interval = config.close_interval;

    // Spawn weekly rotation task
    tokio::spawn(async move {
        let mut interval = interval(rotation_interval);
        loop {
            interval.tick().await;
            match executor_rotation.rotate_weekly().await {
                Ok(promoted) => {
                    if promoted {
                        tracing::info!("Rotated in a new weekly poll");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Weekly rotation failed");
                }
            }
        }
    });

    // Spawn overdue poll closing task
    tokio::spawn(async move {
        let mut interval = interval(close_interval);
        loop {
            interval.tick().await;
            match executor_close.close_due_polls().await {
                Ok(count) => {
                    if count > 0 {
                        tracing::info!(count, "Closed overdue polls");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to close overdue polls");
                }
            }
        }
    });
}
