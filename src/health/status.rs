// src/health/status.rs
use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Outcome of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Healthy,
    Unhealthy,
    /// The probe could not determine the state; reported but never fails the aggregate.
    Unknown,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Healthy => "healthy",
            CheckStatus::Unhealthy => "unhealthy",
            CheckStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    #[serde(skip)]
    pub name: String,
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queues: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    pub fn new(name: impl Into<String>, status: CheckStatus) -> Self {
        Self {
            name: name.into(),
            status,
            response_time: None,
            workers: None,
            queues: None,
            usage_percent: None,
            error: None,
        }
    }

    pub fn healthy(name: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Healthy)
    }

    pub fn unhealthy(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Unhealthy).with_error(error)
    }

    pub fn unknown(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Unknown).with_error(error)
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_response_time(mut self, elapsed: std::time::Duration) -> Self {
        self.response_time = Some(format!("{:.3}", elapsed.as_secs_f64()));
        self
    }

    pub fn with_workers(mut self, workers: usize, queues: Vec<String>) -> Self {
        self.workers = Some(workers);
        self.queues = Some(queues);
        self
    }

    pub fn with_usage_percent(mut self, percent: f64) -> Self {
        self.usage_percent = Some((percent * 100.0).round() / 100.0);
        self
    }
}

/// Ordered set of check results, serialized as a JSON object keyed by check name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Checks(Vec<CheckResult>);

impl Checks {
    pub fn get(&self, name: &str) -> Option<&CheckResult> {
        self.0.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CheckResult> {
        self.0.iter()
    }
}

impl FromIterator<CheckResult> for Checks {
    fn from_iter<I: IntoIterator<Item = CheckResult>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for Checks {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for check in &self.0 {
            map.serialize_entry(&check.name, check)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: OverallStatus,
    pub timestamp: DateTime<Utc>,
    pub checks: Checks,
}

impl HealthReport {
    /// Unhealthy iff at least one check is unhealthy; `Unknown` never flips it.
    pub fn from_checks(checks: Checks) -> Self {
        let status = if checks.iter().any(|c| c.status == CheckStatus::Unhealthy) {
            OverallStatus::Unhealthy
        } else {
            OverallStatus::Healthy
        };

        Self {
            status,
            timestamp: Utc::now(),
            checks,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == OverallStatus::Healthy
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessDetails {
    pub migrations: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessReport {
    pub ready: bool,
    pub details: ReadinessDetails,
}

#[derive(Debug, Clone, Serialize)]
pub struct LivenessReport {
    pub status: &'static str,
}

impl LivenessReport {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}
