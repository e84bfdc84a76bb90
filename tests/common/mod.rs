//! In-memory store doubles and request helpers shared by the HTTP tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use cities_service::http_server::{HttpServer, HttpServerConfig};
use cities_service::store::{
    DocumentCity, DocumentStore, RelationalCity, RelationalStore, StoreError, StoreResult,
};
use serde_json::Value;
use tower::util::ServiceExt;

/// Document collection held in memory
#[derive(Default)]
pub struct MemoryDocuments {
    documents: Mutex<Vec<DocumentCity>>,
    failure: Mutex<Option<StoreError>>,
}

impl MemoryDocuments {
    pub fn with(documents: Vec<DocumentCity>) -> Arc<Self> {
        Arc::new(Self {
            documents: Mutex::new(documents),
            failure: Mutex::new(None),
        })
    }

    pub fn fail_with(&self, err: StoreError) {
        *self.failure.lock().unwrap() = Some(err);
    }
}

#[async_trait]
impl DocumentStore for MemoryDocuments {
    async fn list_all(&self) -> StoreResult<Vec<DocumentCity>> {
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.documents.lock().unwrap().clone())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// `Cities` table held in memory, with an identity column starting at 1
#[derive(Default)]
pub struct MemoryTable {
    rows: Mutex<Vec<RelationalCity>>,
    unreachable: AtomicBool,
}

impl MemoryTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<RelationalCity> {
        self.rows.lock().unwrap().clone()
    }

    pub fn find(&self, id: i64) -> Option<RelationalCity> {
        self.rows.lock().unwrap().iter().find(|r| r.id == id).cloned()
    }
}

#[async_trait]
impl RelationalStore for MemoryTable {
    async fn ping(&self) -> StoreResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Ping(
                "dial tcp 127.0.0.1:1433: connection refused".to_string(),
            ));
        }
        Ok(())
    }

    async fn list_all(&self) -> StoreResult<Vec<RelationalCity>> {
        self.ping().await?;
        Ok(self.rows())
    }

    async fn insert_one(&self, name: &str, country: &str) -> StoreResult<i64> {
        self.ping().await?;
        let mut rows = self.rows.lock().unwrap();
        let id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        rows.push(RelationalCity::new(id, name, country));
        Ok(id)
    }
}

pub fn app(documents: Arc<MemoryDocuments>, table: Option<Arc<MemoryTable>>) -> Router {
    let relational = table.map(|t| t as Arc<dyn RelationalStore>);
    HttpServer::new(HttpServerConfig::default(), documents, relational).router()
}

/// Send one request, returning status, content type and body bytes
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Body,
) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().method(method).uri(uri).body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, content_type, bytes.to_vec())
}

/// Send a bodiless request and parse the response body as JSON
pub async fn send_json(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = send(app, method, uri, Body::empty()).await;
    let value = serde_json::from_slice(&body).unwrap();
    (status, value)
}
