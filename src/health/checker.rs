// src/health/checker.rs
use crate::metrics::{MetricsCollector, Timer};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

use super::probe::{Probe, ProbeError};
use super::status::{CheckResult, CheckStatus, Checks, HealthReport};

/// Runs every registered probe and merges the outcomes into one [`HealthReport`].
pub struct HealthAggregator {
    probes: Vec<Arc<dyn Probe>>,
    probe_timeout: Duration,
    metrics: Option<Arc<MetricsCollector>>,
}

impl HealthAggregator {
    pub fn new(probe_timeout: Duration) -> Self {
        Self {
            probes: Vec::new(),
            probe_timeout,
            metrics: None,
        }
    }

    /// Probes appear in the report in the order they are added.
    pub fn with_probe(mut self, probe: Arc<dyn Probe>) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Never fails: each probe error is folded into its own entry.
    pub async fn run(&self) -> HealthReport {
        let tasks = self.probes.iter().map(|probe| self.run_probe(probe.as_ref()));

        // join_all keeps input order, so the report follows registration order.
        let checks: Checks = futures::future::join_all(tasks).await.into_iter().collect();
        let report = HealthReport::from_checks(checks);

        if report.is_healthy() {
            debug!("Health check complete: healthy");
        } else {
            info!(
                "Health check complete: unhealthy ({})",
                report
                    .checks
                    .iter()
                    .filter(|c| c.status == CheckStatus::Unhealthy)
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        report
    }

    async fn run_probe(&self, probe: &dyn Probe) -> CheckResult {
        let name = probe.name();
        let timer = Timer::new();

        // a panicking check must not take the other entries down with it
        let check = AssertUnwindSafe(probe.check()).catch_unwind();
        let outcome = match timeout(self.probe_timeout, check).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ProbeError::Panicked),
            Err(_) => Err(ProbeError::Timeout(self.probe_timeout)),
        };

        let mut result = match outcome {
            Ok(result) => result,
            Err(e) => CheckResult::new(name, probe.failure_status()).with_error(e.to_string()),
        };
        // the aggregator owns the report keys
        result.name = name.to_string();

        match result.status {
            CheckStatus::Healthy => debug!("{} health check passed", name),
            CheckStatus::Unhealthy => error!(
                "{} health check failed: {}",
                name,
                result.error.as_deref().unwrap_or("unhealthy")
            ),
            CheckStatus::Unknown => warn!(
                "{} check failed: {}",
                name,
                result.error.as_deref().unwrap_or("unknown")
            ),
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_check(name, result.status, timer.elapsed());
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::OverallStatus;
    use async_trait::async_trait;

    struct FixedProbe {
        name: &'static str,
        outcome: fn(&'static str) -> Result<CheckResult, ProbeError>,
        failure: CheckStatus,
    }

    #[async_trait]
    impl Probe for FixedProbe {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn check(&self) -> Result<CheckResult, ProbeError> {
            (self.outcome)(self.name)
        }

        fn failure_status(&self) -> CheckStatus {
            self.failure
        }
    }

    struct SlowProbe;

    #[async_trait]
    impl Probe for SlowProbe {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn check(&self) -> Result<CheckResult, ProbeError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(CheckResult::healthy("slow"))
        }
    }

    struct PanickingCheck;

    #[async_trait]
    impl Probe for PanickingCheck {
        fn name(&self) -> &'static str {
            "redis"
        }

        async fn check(&self) -> Result<CheckResult, ProbeError> {
            panic!("connection pool poisoned");
        }
    }

    fn ok(name: &'static str) -> Arc<dyn Probe> {
        Arc::new(FixedProbe {
            name,
            outcome: |n| Ok(CheckResult::healthy(n)),
            failure: CheckStatus::Unhealthy,
        })
    }

    fn failing(name: &'static str, failure: CheckStatus) -> Arc<dyn Probe> {
        Arc::new(FixedProbe {
            name,
            outcome: |_| Err(ProbeError::UnexpectedResult("boom".to_string())),
            failure,
        })
    }

    fn aggregator(probes: Vec<Arc<dyn Probe>>) -> HealthAggregator {
        probes
            .into_iter()
            .fold(HealthAggregator::new(Duration::from_secs(1)), |agg, p| agg.with_probe(p))
    }

    #[tokio::test]
    async fn test_all_healthy() {
        let report = aggregator(vec![ok("database"), ok("redis"), ok("celery"), ok("disk")])
            .run()
            .await;
        assert_eq!(report.status, OverallStatus::Healthy);
        assert_eq!(report.checks.len(), 4);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let report = aggregator(vec![
            failing("database", CheckStatus::Unhealthy),
            ok("redis"),
            failing("celery", CheckStatus::Unhealthy),
            ok("disk"),
        ])
        .run()
        .await;

        assert_eq!(report.status, OverallStatus::Unhealthy);
        assert_eq!(report.checks.len(), 4);
        let database = report.checks.get("database").unwrap();
        assert_eq!(database.status, CheckStatus::Unhealthy);
        assert_eq!(database.error.as_deref(), Some("boom"));
        assert_eq!(report.checks.get("redis").unwrap().status, CheckStatus::Healthy);
    }

    #[tokio::test]
    async fn test_unknown_failure_keeps_aggregate_healthy() {
        let report = aggregator(vec![ok("database"), failing("disk", CheckStatus::Unknown)])
            .run()
            .await;
        assert_eq!(report.status, OverallStatus::Healthy);
        assert_eq!(report.checks.get("disk").unwrap().status, CheckStatus::Unknown);
    }

    #[tokio::test]
    async fn test_report_follows_registration_order() {
        let report = aggregator(vec![ok("database"), ok("redis"), ok("celery"), ok("disk")])
            .run()
            .await;
        let names: Vec<_> = report.checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["database", "redis", "celery", "disk"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_probe_times_out() {
        let agg = HealthAggregator::new(Duration::from_secs(2))
            .with_probe(Arc::new(SlowProbe))
            .with_probe(ok("database"));

        let report = agg.run().await;
        let slow = report.checks.get("slow").unwrap();
        assert_eq!(slow.status, CheckStatus::Unhealthy);
        assert!(slow.error.as_deref().unwrap().contains("timed out"));
        assert_eq!(report.checks.get("database").unwrap().status, CheckStatus::Healthy);
    }

    #[tokio::test]
    async fn test_panicking_check_is_reported_as_unhealthy() {
        let report = aggregator(vec![
            ok("database"),
            Arc::new(PanickingCheck),
            ok("celery"),
            ok("disk"),
        ])
        .run()
        .await;

        assert_eq!(report.status, OverallStatus::Unhealthy);
        assert_eq!(report.checks.len(), 4);
        let redis = report.checks.get("redis").unwrap();
        assert_eq!(redis.status, CheckStatus::Unhealthy);
        assert_eq!(redis.error.as_deref(), Some("check panicked"));
        for name in ["database", "celery", "disk"] {
            assert_eq!(report.checks.get(name).unwrap().status, CheckStatus::Healthy);
        }
    }

    #[tokio::test]
    async fn test_repeated_runs_report_same_statuses() {
        let agg = aggregator(vec![ok("database"), failing("celery", CheckStatus::Unhealthy)]);
        let first = agg.run().await;
        let second = agg.run().await;

        let statuses = |r: &HealthReport| r.checks.iter().map(|c| c.status).collect::<Vec<_>>();
        assert_eq!(first.status, second.status);
        assert_eq!(statuses(&first), statuses(&second));
    }
}
