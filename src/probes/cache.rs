// src/probes/cache.rs
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::CacheConfig;
use crate::health::{CheckResult, Probe, ProbeError};

#[async_trait]
pub trait CacheClient: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ProbeError>;
    async fn get(&self, key: &str) -> Result<Option<String>, ProbeError>;
    async fn delete(&self, key: &str) -> Result<(), ProbeError>;
}

/// Redis-backed cache client. Connects on first use and reconnects after a failed command.
pub struct RedisCacheClient {
    client: redis::Client,
    conn: Mutex<Option<MultiplexedConnection>>,
}

impl RedisCacheClient {
    pub fn new(url: &str) -> Result<Self, ProbeError> {
        Ok(Self {
            client: redis::Client::open(url)?,
            conn: Mutex::new(None),
        })
    }

    async fn connection(&self) -> Result<MultiplexedConnection, ProbeError> {
        let mut slot = self.conn.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self.client.get_multiplexed_async_connection().await?;
        *slot = Some(conn.clone());
        Ok(conn)
    }

    async fn reset_on_error<T>(&self, result: redis::RedisResult<T>) -> Result<T, ProbeError> {
        if result.is_err() {
            *self.conn.lock().await = None;
        }
        Ok(result?)
    }
}

#[async_trait]
impl CacheClient for RedisCacheClient {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ProbeError> {
        let mut conn = self.connection().await?;
        let result = conn
            .pset_ex::<_, _, ()>(key, value, ttl.as_millis() as u64)
            .await;
        self.reset_on_error(result).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, ProbeError> {
        let mut conn = self.connection().await?;
        let result: redis::RedisResult<Option<String>> = conn.get(key).await;
        self.reset_on_error(result).await
    }

    async fn delete(&self, key: &str) -> Result<(), ProbeError> {
        let mut conn = self.connection().await?;
        let result = conn.del::<_, ()>(key).await;
        self.reset_on_error(result).await
    }
}

/// Deletes the sentinel key when dropped unless the probe already did.
/// Covers probes abandoned by a timeout or a cancelled request.
struct SentinelGuard {
    client: Arc<dyn CacheClient>,
    key: String,
    armed: bool,
}

impl SentinelGuard {
    fn new(client: Arc<dyn CacheClient>, key: &str) -> Self {
        Self {
            client,
            key: key.to_string(),
            armed: true,
        }
    }

    async fn release(mut self) -> Result<(), ProbeError> {
        self.armed = false;
        self.client.delete(&self.key).await
    }
}

impl Drop for SentinelGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let client = self.client.clone();
        let key = std::mem::take(&mut self.key);
        handle.spawn(async move {
            if let Err(e) = client.delete(&key).await {
                tracing::warn!("Failed to remove cache sentinel {}: {}", key, e);
            }
        });
    }
}

pub struct CacheProbe {
    client: Arc<dyn CacheClient>,
    key: String,
    value: String,
    ttl: Duration,
}

impl CacheProbe {
    pub const NAME: &'static str = "redis";

    pub fn new(client: Arc<dyn CacheClient>, config: &CacheConfig) -> Self {
        Self {
            client,
            key: config.sentinel_key.clone(),
            value: config.sentinel_value.clone(),
            ttl: config.ttl(),
        }
    }
}

#[async_trait]
impl Probe for CacheProbe {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn check(&self) -> Result<CheckResult, ProbeError> {
        self.client.set(&self.key, &self.value, self.ttl).await?;
        let guard = SentinelGuard::new(self.client.clone(), &self.key);

        let retrieved = self.client.get(&self.key).await?;
        if retrieved.as_deref() != Some(self.value.as_str()) {
            return Err(ProbeError::UnexpectedResult(
                "Cache test failed: value mismatch".to_string(),
            ));
        }

        guard.release().await?;
        Ok(CheckResult::healthy(Self::NAME))
    }
}
