//! HTTP surface: routes, handlers and the response envelope

pub mod envelope;
mod handlers;
mod routes;

pub use envelope::ResponseEnvelope;
pub use routes::build_router;

use crate::service::QueryService;
use std::sync::Arc;

/// Shared state for the HTTP API
#[derive(Clone)]
pub struct AppState {
    pub query_service: Arc<QueryService>,
}

impl AppState {
    pub fn new(query_service: Arc<QueryService>) -> Self {
        Self { query_service }
    }
}
