// src/health/probe.rs
use async_trait::async_trait;
use std::time::Duration;

use super::status::{CheckResult, CheckStatus};

/// A single dependency check.
///
/// `check` returns `Ok` whenever the probe managed to observe its dependency,
/// even if what it saw is unhealthy (e.g. a full disk). `Err` means the probe
/// itself failed; the aggregator turns that into a result with
/// [`Probe::failure_status`].
#[async_trait]
pub trait Probe: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self) -> Result<CheckResult, ProbeError>;

    fn failure_status(&self) -> CheckStatus {
        CheckStatus::Unhealthy
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("{0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Cache(#[from] redis::RedisError),

    #[error("{0}")]
    TaskQueue(#[from] reqwest::Error),

    #[error("{0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("{0}")]
    Disk(String),

    #[error("{0}")]
    UnexpectedResult(String),

    #[error("Probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("check panicked")]
    Panicked,
}
