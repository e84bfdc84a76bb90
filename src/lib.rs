//! cities-service - city listings over a document store and a relational store
//!
//! A thin HTTP layer over two independent backends:
//!
//! - `GET /mongo/cities` reads every document of a MongoDB collection
//! - `GET /mssql/cities` reads every row of a SQL Server `Cities` table
//! - `POST /mssql/cities` inserts a Warsaw/Poland row and returns its id
//!
//! The stores are built once at startup and handed to the router; handlers
//! hold no other state.

pub mod cli;
pub mod http_server;
pub mod observability;
pub mod store;
