// src/probes/disk.rs
use async_trait::async_trait;
use nix::sys::statvfs::statvfs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::DiskConfig;
use crate::health::{CheckResult, CheckStatus, Probe, ProbeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

impl DiskUsage {
    pub fn percent(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            return None;
        }
        Some(self.used_bytes as f64 / self.total_bytes as f64 * 100.0)
    }

    /// Used counts every non-free block, including blocks reserved for root.
    pub fn from_blocks(blocks: u64, blocks_free: u64, fragment_size: u64) -> Self {
        Self {
            total_bytes: blocks.saturating_mul(fragment_size),
            used_bytes: blocks.saturating_sub(blocks_free).saturating_mul(fragment_size),
        }
    }
}

/// Filesystem stat collaborator. Blocking; callers run it off the async workers.
pub trait DiskStats: Send + Sync {
    fn usage(&self, path: &Path) -> Result<DiskUsage, ProbeError>;
}

/// Stats the filesystem holding the path with `statvfs(3)`.
#[derive(Debug, Default)]
pub struct SystemDiskStats;

impl DiskStats for SystemDiskStats {
    fn usage(&self, path: &Path) -> Result<DiskUsage, ProbeError> {
        let stat = statvfs(path)
            .map_err(|e| ProbeError::Disk(format!("statvfs {} failed: {}", path.display(), e)))?;

        Ok(DiskUsage::from_blocks(
            stat.blocks() as u64,
            stat.blocks_free() as u64,
            stat.fragment_size() as u64,
        ))
    }
}

pub struct DiskProbe {
    stats: Arc<dyn DiskStats>,
    path: PathBuf,
    threshold_percent: f64,
}

impl DiskProbe {
    pub const NAME: &'static str = "disk";

    pub fn new(stats: Arc<dyn DiskStats>, config: &DiskConfig) -> Self {
        Self {
            stats,
            path: config.path.clone(),
            threshold_percent: config.threshold_percent,
        }
    }
}

#[async_trait]
impl Probe for DiskProbe {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn check(&self) -> Result<CheckResult, ProbeError> {
        let stats = self.stats.clone();
        let path = self.path.clone();
        let usage = tokio::task::spawn_blocking(move || stats.usage(&path))
            .await
            .map_err(|e| ProbeError::Disk(e.to_string()))??;

        let percent = usage.percent().ok_or_else(|| {
            ProbeError::Disk(format!("Filesystem at {} reports zero size", self.path.display()))
        })?;

        let result = if percent < self.threshold_percent {
            CheckResult::healthy(Self::NAME)
        } else {
            CheckResult::unhealthy(
                Self::NAME,
                format!("Disk usage above {}%", self.threshold_percent),
            )
        };
        Ok(result.with_usage_percent(percent))
    }

    /// Unreadable stats are reported but do not fail the aggregate.
    fn failure_status(&self) -> CheckStatus {
        CheckStatus::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeDisk(Option<DiskUsage>);

    impl DiskStats for FakeDisk {
        fn usage(&self, _path: &Path) -> Result<DiskUsage, ProbeError> {
            self.0
                .ok_or_else(|| ProbeError::Disk("permission denied".to_string()))
        }
    }

    fn probe(usage: Option<DiskUsage>) -> DiskProbe {
        DiskProbe::new(Arc::new(FakeDisk(usage)), &DiskConfig::default())
    }

    fn used(used_bytes: u64) -> Option<DiskUsage> {
        Some(DiskUsage {
            total_bytes: 1000,
            used_bytes,
        })
    }

    #[tokio::test]
    async fn test_below_threshold_is_healthy() {
        let result = probe(used(500)).check().await.unwrap();
        assert_eq!(result.status, CheckStatus::Healthy);
        assert_eq!(result.usage_percent, Some(50.0));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_at_threshold_is_unhealthy() {
        let result = probe(used(900)).check().await.unwrap();
        assert_eq!(result.status, CheckStatus::Unhealthy);
        assert_eq!(result.usage_percent, Some(90.0));
        assert_eq!(result.error.as_deref(), Some("Disk usage above 90%"));
    }

    #[tokio::test]
    async fn test_threshold_is_configurable() {
        let config = DiskConfig {
            threshold_percent: 40.0,
            ..Default::default()
        };
        let probe = DiskProbe::new(Arc::new(FakeDisk(used(500))), &config);
        let result = probe.check().await.unwrap();
        assert_eq!(result.status, CheckStatus::Unhealthy);
        assert_eq!(result.error.as_deref(), Some("Disk usage above 40%"));
    }

    #[tokio::test]
    async fn test_stat_failure_maps_to_unknown() {
        let probe = probe(None);
        assert!(probe.check().await.is_err());
        assert_eq!(probe.failure_status(), CheckStatus::Unknown);
    }

    #[tokio::test]
    async fn test_zero_sized_filesystem_is_an_error() {
        let probe = probe(Some(DiskUsage {
            total_bytes: 0,
            used_bytes: 0,
        }));
        assert!(matches!(probe.check().await, Err(ProbeError::Disk(_))));
    }

    #[test]
    fn test_used_counts_reserved_blocks() {
        // 1000 blocks of 4 KiB, 250 free (of which fewer are available to non-root users)
        let usage = DiskUsage::from_blocks(1000, 250, 4096);
        assert_eq!(usage.total_bytes, 4_096_000);
        assert_eq!(usage.used_bytes, 750 * 4096);
        assert_eq!(usage.percent(), Some(75.0));
    }

    #[test]
    fn test_system_stats_read_root() {
        let usage = SystemDiskStats.usage(Path::new("/")).unwrap();
        assert!(usage.total_bytes > 0);
        assert!(usage.used_bytes <= usage.total_bytes);
    }

    #[test]
    fn test_system_stats_missing_path_is_an_error() {
        let err = SystemDiskStats
            .usage(Path::new("/nonexistent/health-disk-check"))
            .unwrap_err();
        assert!(matches!(err, ProbeError::Disk(_)));
    }
}
