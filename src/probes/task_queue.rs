// src/probes/task_queue.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::health::{CheckResult, Probe, ProbeError};

/// Active queues per worker, as reported by the task-queue control plane.
pub type ActiveQueues = BTreeMap<String, Vec<String>>;

#[async_trait]
pub trait WorkerInspector: Send + Sync {
    async fn active_queues(&self) -> Result<ActiveQueues, ProbeError>;
}

#[derive(Debug, Deserialize)]
struct FlowerWorker {
    #[serde(default)]
    active_queues: Vec<FlowerQueue>,
}

#[derive(Debug, Deserialize)]
struct FlowerQueue {
    name: String,
}

/// Inspects Celery workers through Flower's `GET /api/workers` endpoint.
pub struct FlowerInspector {
    client: Client,
    workers_url: Url,
}

impl FlowerInspector {
    pub fn new(base: &Url, timeout: Duration) -> Result<Self, ProbeError> {
        let client = Client::builder().timeout(timeout).build()?;
        let workers_url = base
            .join("api/workers")
            .map_err(|e| ProbeError::UnexpectedResult(format!("Invalid Flower URL: {}", e)))?;
        Ok(Self {
            client,
            workers_url,
        })
    }
}

#[async_trait]
impl WorkerInspector for FlowerInspector {
    async fn active_queues(&self) -> Result<ActiveQueues, ProbeError> {
        let workers: HashMap<String, FlowerWorker> = self
            .client
            .get(self.workers_url.clone())
            .query(&[("refresh", "true")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(workers
            .into_iter()
            .map(|(worker, info)| {
                let queues = info.active_queues.into_iter().map(|q| q.name).collect();
                (worker, queues)
            })
            .collect())
    }
}

pub struct TaskQueueProbe {
    inspector: Arc<dyn WorkerInspector>,
}

impl TaskQueueProbe {
    pub const NAME: &'static str = "celery";

    pub fn new(inspector: Arc<dyn WorkerInspector>) -> Self {
        Self { inspector }
    }
}

#[async_trait]
impl Probe for TaskQueueProbe {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn check(&self) -> Result<CheckResult, ProbeError> {
        let active = self.inspector.active_queues().await?;

        let serving: Vec<_> = active.values().filter(|queues| !queues.is_empty()).collect();
        if serving.is_empty() {
            return Ok(CheckResult::unhealthy(Self::NAME, "No active workers found"));
        }

        let queues: BTreeSet<String> = serving.iter().flat_map(|q| q.iter().cloned()).collect();
        Ok(CheckResult::healthy(Self::NAME).with_workers(serving.len(), queues.into_iter().collect()))
    }
}
