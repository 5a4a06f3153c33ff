// src/probes/migrations.rs
use async_trait::async_trait;
use sqlx::migrate::{Migrate, Migrator};
use sqlx::PgPool;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::health::{MigrationPlanner, ProbeError};

/// Compares the migrations on disk with the `_sqlx_migrations` bookkeeping table.
pub struct SqlxMigrationPlanner {
    pool: PgPool,
    migrations_path: PathBuf,
}

impl SqlxMigrationPlanner {
    pub fn new(pool: PgPool, migrations_path: PathBuf) -> Self {
        Self {
            pool,
            migrations_path,
        }
    }

    async fn applied_versions(&self) -> Result<HashSet<i64>, ProbeError> {
        let mut conn = self.pool.acquire().await?;

        // A database that was never migrated has no bookkeeping table yet.
        let tracked: bool =
            sqlx::query_scalar("SELECT to_regclass('_sqlx_migrations') IS NOT NULL")
                .fetch_one(&mut *conn)
                .await?;
        if !tracked {
            return Ok(HashSet::new());
        }

        Ok(conn
            .list_applied_migrations()
            .await?
            .into_iter()
            .map(|m| m.version)
            .collect())
    }
}

#[async_trait]
impl MigrationPlanner for SqlxMigrationPlanner {
    async fn pending_migrations(&self) -> Result<Vec<i64>, ProbeError> {
        let migrator = Migrator::new(self.migrations_path.as_path()).await?;
        let applied = self.applied_versions().await?;
        Ok(pending_versions(&migrator, &applied))
    }
}

fn pending_versions(migrator: &Migrator, applied: &HashSet<i64>) -> Vec<i64> {
    let mut pending: Vec<i64> = migrator
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .map(|m| m.version)
        .filter(|v| !applied.contains(v))
        .collect();
    pending.sort_unstable();
    pending.dedup();
    pending
}
