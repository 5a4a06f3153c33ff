// src/health/mod.rs
mod checker;
mod probe;
mod readiness;
mod status;

pub use checker::HealthAggregator;
pub use probe::{Probe, ProbeError};
pub use readiness::{liveness, MigrationPlanner, ReadinessCheck};
pub use status::{
    CheckResult, CheckStatus, Checks, HealthReport, LivenessReport, OverallStatus,
    ReadinessDetails, ReadinessReport,
};
