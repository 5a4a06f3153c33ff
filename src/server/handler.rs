// src/server/handler.rs
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response, StatusCode};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;
use tracing::Instrument;
use uuid::Uuid;

use crate::health::{liveness, HealthAggregator, ReadinessCheck};
use crate::metrics::{MetricsCollector, Timer};

pub const HEALTH_PATH: &str = "/health/";
pub const LIVENESS_PATH: &str = "/simple_health/";
pub const READINESS_PATH: &str = "/readiness_check/";

#[derive(Clone)]
pub struct RequestHandler {
    aggregator: Arc<HealthAggregator>,
    readiness: Arc<ReadinessCheck>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl RequestHandler {
    pub fn new(aggregator: Arc<HealthAggregator>, readiness: Arc<ReadinessCheck>) -> Self {
        Self {
            aggregator,
            readiness,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn handle(&self, req: Request<Body>) -> Result<Response<Body>, HandlerError> {
        let method = req.method();
        match (req.uri().path(), method) {
            (HEALTH_PATH, &Method::GET | &Method::HEAD) => {
                let report = self.aggregator.run().await;
                let status = if report.is_healthy() {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                };
                let response = json_response(status, &report)?;
                if method == Method::HEAD {
                    let (parts, _) = response.into_parts();
                    return Ok(Response::from_parts(parts, Body::empty()));
                }
                Ok(response)
            }
            (LIVENESS_PATH, &Method::GET) => json_response(StatusCode::OK, &liveness()),
            (READINESS_PATH, &Method::GET) => {
                let report = self.readiness.run().await;
                let status = if report.ready {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                };
                json_response(status, &report)
            }
            (HEALTH_PATH, _) => method_not_allowed("GET, HEAD"),
            (LIVENESS_PATH | READINESS_PATH, _) => method_not_allowed("GET"),
            _ => Ok(Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Body::from("Not Found"))?),
        }
    }
}

fn json_response<T: Serialize>(
    status: StatusCode,
    body: &T,
) -> Result<Response<Body>, HandlerError> {
    let bytes = serde_json::to_vec(body)?;
    Ok(Response::builder()
        .status(status)
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .body(Body::from(bytes))?)
}

fn method_not_allowed(allow: &'static str) -> Result<Response<Body>, HandlerError> {
    Ok(Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(ALLOW, HeaderValue::from_static(allow))
        .body(Body::empty())?)
}

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to build response: {0}")]
    Http(#[from] hyper::http::Error),
}

impl From<HandlerError> for Response<Body> {
    fn from(_: HandlerError) -> Self {
        let mut response = Response::new(Body::from("Internal Server Error"));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    }
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        let path = req.uri().path().to_string();
        let span = tracing::info_span!(
            "request",
            request_id = %Uuid::new_v4(),
            method = %req.method(),
            path = %path,
        );

        Box::pin(
            async move {
                let timer = Timer::new();
                let response = handler.handle(req).await.unwrap_or_else(|e| {
                    tracing::error!(%e, "handler error");
                    e.into()
                });

                if let Some(metrics) = &handler.metrics {
                    // unknown paths share one label to keep cardinality bounded
                    let label = match path.as_str() {
                        HEALTH_PATH | LIVENESS_PATH | READINESS_PATH => path.as_str(),
                        _ => "other",
                    };
                    metrics.record_request(label, response.status().as_u16(), timer.elapsed());
                }
                tracing::debug!(status = %response.status(), "request complete");

                Ok(response)
            }
            .instrument(span),
        )
    }
}
