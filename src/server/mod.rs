pub mod builder;
pub mod handler;
pub mod listener;

pub use builder::ServerBuilder;
pub use handler::{HandlerError, RequestHandler, HEALTH_PATH, LIVENESS_PATH, READINESS_PATH};
