// src/app.rs
// Wires the dependency clients into the health handler.
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

use crate::config::Config;
use crate::health::{HealthAggregator, MigrationPlanner, ReadinessCheck};
use crate::metrics::MetricsCollector;
use crate::probes::{
    CacheClient, CacheProbe, DatabaseClient, DatabaseProbe, DiskProbe, DiskStats,
    FlowerInspector, RedisCacheClient, SqlxMigrationPlanner, SystemDiskStats, TaskQueueProbe,
    WorkerInspector,
};
use crate::server::RequestHandler;

/// The collaborators the health checks query.
#[derive(Clone)]
pub struct Dependencies {
    pub database: Arc<dyn DatabaseClient>,
    pub cache: Arc<dyn CacheClient>,
    pub workers: Arc<dyn WorkerInspector>,
    pub disk: Arc<dyn DiskStats>,
    pub migrations: Arc<dyn MigrationPlanner>,
}

impl Dependencies {
    /// Builds production clients. Nothing is dialed here; connections open on first probe
    /// so the service starts even while its dependencies are down.
    pub fn connect(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .acquire_timeout(config.probes.timeout())
            .connect_lazy(&config.database.url)
            .context("Invalid database URL")?;

        let cache = RedisCacheClient::new(&config.cache.url).context("Invalid cache URL")?;
        let workers = FlowerInspector::new(&config.task_queue.url, config.probes.timeout())
            .context("Failed to create task-queue inspector")?;

        Ok(Self {
            database: Arc::new(pool.clone()),
            cache: Arc::new(cache),
            workers: Arc::new(workers),
            disk: Arc::new(SystemDiskStats),
            migrations: Arc::new(SqlxMigrationPlanner::new(
                pool,
                config.database.migrations_path.clone(),
            )),
        })
    }

    /// Database, cache, task queue, disk: the order the report lists them in.
    pub fn aggregator(&self, config: &Config) -> HealthAggregator {
        HealthAggregator::new(config.probes.timeout())
            .with_probe(Arc::new(DatabaseProbe::new(self.database.clone())))
            .with_probe(Arc::new(CacheProbe::new(self.cache.clone(), &config.cache)))
            .with_probe(Arc::new(TaskQueueProbe::new(self.workers.clone())))
            .with_probe(Arc::new(DiskProbe::new(self.disk.clone(), &config.disk)))
    }

    pub fn readiness(&self, config: &Config) -> ReadinessCheck {
        ReadinessCheck::new(self.migrations.clone(), config.probes.timeout())
    }

    pub fn handler(&self, config: &Config, metrics: Option<Arc<MetricsCollector>>) -> RequestHandler {
        let mut aggregator = self.aggregator(config);
        if let Some(metrics) = &metrics {
            aggregator = aggregator.with_metrics(metrics.clone());
        }

        let handler = RequestHandler::new(Arc::new(aggregator), Arc::new(self.readiness(config)));
        match metrics {
            Some(metrics) => handler.with_metrics(metrics),
            None => handler,
        }
    }
}
