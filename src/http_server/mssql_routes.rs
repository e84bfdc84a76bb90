//! Relational Store HTTP Routes
//!
//! - `GET /mssql/cities` lists every row of the `Cities` table
//! - `POST /mssql/cities` inserts the fixed Warsaw/Poland row and returns its id
//!
//! The POST body is never read.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use uuid::Uuid;

use super::errors::{ApiError, ApiResult};
use crate::observability::{Event, Logger};
use crate::store::{RelationalCity, RelationalStore};

/// Name written by every insert
pub const INSERTED_CITY_NAME: &str = "Warsaw";

/// Country written by every insert
pub const INSERTED_CITY_COUNTRY: &str = "Poland";

/// Relational store state shared across handlers
pub struct RelationalState {
    store: Option<Arc<dyn RelationalStore>>,
}

impl RelationalState {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store: Some(store) }
    }

    /// State for a service started without a relational store. Every
    /// relational request fails with a 500.
    pub fn uninitialized() -> Self {
        Self { store: None }
    }

    fn store(&self) -> ApiResult<&Arc<dyn RelationalStore>> {
        self.store
            .as_ref()
            .ok_or(ApiError::RelationalStoreUninitialized)
    }
}

/// Create relational store routes
pub fn mssql_routes(state: Arc<RelationalState>) -> Router {
    Router::new()
        .route("/cities", get(list_cities_handler).post(create_city_handler))
        .with_state(state)
}

fn log_request(method: &str) -> String {
    let request_id = Uuid::new_v4().to_string();
    Logger::event(
        Event::CitiesRequest,
        &[("backend", "mssql"), ("method", method), ("request_id", request_id.as_str())],
    );
    request_id
}

async fn list_cities_handler(
    State(state): State<Arc<RelationalState>>,
) -> ApiResult<Json<Vec<RelationalCity>>> {
    let request_id = log_request("GET");

    let store = state.store().map_err(|e| e.logged(&request_id))?;
    let cities = store
        .list_all()
        .await
        .map_err(|e| ApiError::from(e).logged(&request_id))?;

    Ok(Json(cities))
}

async fn create_city_handler(State(state): State<Arc<RelationalState>>) -> ApiResult<Json<i64>> {
    let request_id = log_request("POST");

    let store = state.store().map_err(|e| e.logged(&request_id))?;
    let id = store
        .insert_one(INSERTED_CITY_NAME, INSERTED_CITY_COUNTRY)
        .await
        .map_err(|e| ApiError::from(e).logged(&request_id))?;

    Logger::event(
        Event::CityInserted,
        &[("id", id.to_string().as_str()), ("request_id", request_id.as_str())],
    );

    Ok(Json(id))
}
