//! # HTTP Server Module
//!
//! The HTTP surface of the cities service.
//!
//! # Endpoints
//!
//! - `GET /mongo/cities` - list city documents
//! - `GET /mssql/cities` - list city rows
//! - `POST /mssql/cities` - insert the Warsaw/Poland row, returns its id
//! - `GET /health` - health check
//!
//! Failures are always `500 {"message": "..."}`; unknown paths and methods
//! fall through to the router's 404/405.

pub mod config;
pub mod errors;
pub mod mongo_routes;
pub mod mssql_routes;
pub mod observability_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use mssql_routes::{INSERTED_CITY_COUNTRY, INSERTED_CITY_NAME};
pub use server::HttpServer;
