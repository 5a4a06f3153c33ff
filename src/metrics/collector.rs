// src/metrics/collector.rs
use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Instant;

use crate::health::CheckStatus;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    // Request metrics
    pub requests_total: IntCounterVec,
    pub request_duration_seconds: HistogramVec,

    // Probe metrics
    pub checks_total: IntCounterVec,
    pub check_duration_seconds: HistogramVec,
    pub check_status: IntGaugeVec,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new("health_requests_total", "Total number of health endpoint requests"),
            &["path", "status_code"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "health_request_duration_seconds",
                "Health endpoint request duration in seconds",
            ),
            &["path"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        let checks_total = IntCounterVec::new(
            Opts::new("health_checks_total", "Total probe executions by outcome"),
            &["check", "status"],
        )?;
        registry.register(Box::new(checks_total.clone()))?;

        let check_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "health_check_duration_seconds",
                "Probe duration in seconds",
            ),
            &["check"],
        )?;
        registry.register(Box::new(check_duration_seconds.clone()))?;

        let check_status = IntGaugeVec::new(
            Opts::new(
                "health_check_status",
                "Last probe status (1=healthy, 0=unhealthy, -1=unknown)",
            ),
            &["check"],
        )?;
        registry.register(Box::new(check_status.clone()))?;

        Ok(Self {
            requests_total,
            request_duration_seconds,
            checks_total,
            check_duration_seconds,
            check_status,
        })
    }

    pub fn record_request(&self, path: &str, status_code: u16, duration: std::time::Duration) {
        let status = status_code.to_string();
        self.requests_total
            .with_label_values(&[path, &status])
            .inc();

        self.request_duration_seconds
            .with_label_values(&[path])
            .observe(duration.as_secs_f64());
    }

    pub fn record_check(&self, check: &str, status: CheckStatus, duration: std::time::Duration) {
        self.checks_total
            .with_label_values(&[check, status.as_str()])
            .inc();

        self.check_duration_seconds
            .with_label_values(&[check])
            .observe(duration.as_secs_f64());

        let value = match status {
            CheckStatus::Healthy => 1,
            CheckStatus::Unhealthy => 0,
            CheckStatus::Unknown => -1,
        };
        self.check_status.with_label_values(&[check]).set(value);
    }
}

// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}
