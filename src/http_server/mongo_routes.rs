//! Document Store HTTP Routes
//!
//! `GET /mongo/cities` lists every document in the city collection.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use uuid::Uuid;

use super::errors::{ApiError, ApiResult};
use crate::observability::{Event, Logger};
use crate::store::{DocumentCity, DocumentStore};

/// Document store state shared across handlers
pub struct DocumentState {
    pub store: Arc<dyn DocumentStore>,
}

impl DocumentState {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

/// Create document store routes
pub fn mongo_routes(state: Arc<DocumentState>) -> Router {
    Router::new()
        .route("/cities", get(list_cities_handler))
        .with_state(state)
}

async fn list_cities_handler(
    State(state): State<Arc<DocumentState>>,
) -> ApiResult<Json<Vec<DocumentCity>>> {
    let request_id = Uuid::new_v4().to_string();
    Logger::event(
        Event::CitiesRequest,
        &[("backend", "mongo"), ("method", "GET"), ("request_id", request_id.as_str())],
    );

    let cities = state
        .store
        .list_all()
        .await
        .map_err(|e| ApiError::from(e).logged(&request_id))?;

    Ok(Json(cities))
}
