// src/health/readiness.rs
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{error, info};

use super::probe::ProbeError;
use super::status::{LivenessReport, ReadinessDetails, ReadinessReport};

/// Computes which known schema migrations have not been applied yet.
#[async_trait]
pub trait MigrationPlanner: Send + Sync {
    /// Versions of the pending migrations, oldest first.
    async fn pending_migrations(&self) -> Result<Vec<i64>, ProbeError>;
}

pub struct ReadinessCheck {
    planner: Arc<dyn MigrationPlanner>,
    timeout: Duration,
}

impl ReadinessCheck {
    pub fn new(planner: Arc<dyn MigrationPlanner>, timeout: Duration) -> Self {
        Self { planner, timeout }
    }

    /// Ready iff the migration plan is empty. Planner errors mean not ready.
    pub async fn run(&self) -> ReadinessReport {
        let outcome = match timeout(self.timeout, self.planner.pending_migrations()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProbeError::Timeout(self.timeout)),
        };

        let (ready, migrations) = match outcome {
            Ok(pending) if pending.is_empty() => (true, "All migrations applied".to_string()),
            Ok(pending) => {
                info!("Not ready: {} pending migrations {:?}", pending.len(), pending);
                (false, "Pending migrations".to_string())
            }
            Err(e) => {
                error!("Readiness check failed: {}", e);
                (false, format!("Error checking migrations: {}", e))
            }
        };

        ReadinessReport {
            ready,
            details: ReadinessDetails { migrations },
        }
    }
}

/// Process-level liveness; touches no dependency.
pub fn liveness() -> LivenessReport {
    LivenessReport::ok()
}
