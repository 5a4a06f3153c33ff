//
// src/probes/mod.rs
//
mod cache;
mod database;
mod disk;
mod migrations;
mod task_queue;

pub use cache::{CacheClient, CacheProbe, RedisCacheClient};
pub use database::{DatabaseClient, DatabaseProbe};
pub use disk::{DiskProbe, DiskStats, DiskUsage, SystemDiskStats};
pub use migrations::SqlxMigrationPlanner;
pub use task_queue::{ActiveQueues, FlowerInspector, TaskQueueProbe, WorkerInspector};
