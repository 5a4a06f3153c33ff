// src/probes/database.rs
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;

use crate::health::{CheckResult, Probe, ProbeError};

/// Narrow view of the relational store: run a query and fetch one scalar.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    async fn fetch_scalar(&self, sql: &str) -> Result<Option<i64>, ProbeError>;
}

#[async_trait]
impl DatabaseClient for PgPool {
    async fn fetch_scalar(&self, sql: &str) -> Result<Option<i64>, ProbeError> {
        let value = sqlx::query_scalar::<_, Option<i64>>(sql)
            .fetch_optional(self)
            .await?;
        Ok(value.flatten())
    }
}

pub struct DatabaseProbe {
    client: Arc<dyn DatabaseClient>,
}

impl DatabaseProbe {
    pub const NAME: &'static str = "database";

    pub fn new(client: Arc<dyn DatabaseClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Probe for DatabaseProbe {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn check(&self) -> Result<CheckResult, ProbeError> {
        let start = Instant::now();
        match self.client.fetch_scalar("SELECT 1::BIGINT").await? {
            Some(1) => Ok(CheckResult::healthy(Self::NAME).with_response_time(start.elapsed())),
            _ => Err(ProbeError::UnexpectedResult(
                "Database query returned unexpected result".to_string(),
            )),
        }
    }
}
