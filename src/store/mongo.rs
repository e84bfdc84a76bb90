//! MongoDB document store client
//!
//! Holds one long-lived `mongodb::Client` (which pools internally) and
//! reads the configured collection. This service never writes documents.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use serde::Deserialize;

use super::city::DocumentCity;
use super::config::MongoConfig;
use super::errors::{with_deadline, StoreError, StoreResult};
use super::DocumentStore;
use crate::observability::{Event, Logger};

/// Shape of a city document as stored in the collection.
#[derive(Debug, Deserialize)]
struct StoredCity {
    #[serde(rename = "_id", default)]
    id: Option<Bson>,
    #[serde(default)]
    city: String,
    #[serde(default)]
    country: String,
}

impl From<StoredCity> for DocumentCity {
    fn from(stored: StoredCity) -> Self {
        DocumentCity {
            id: stored.id.map(render_id),
            city: stored.city,
            country: stored.country,
        }
    }
}

/// Render a document identifier of any BSON type as a string: object ids
/// as hex, strings as-is, anything else as relaxed extended JSON.
fn render_id(id: Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s,
        other => other.into_relaxed_extjson().to_string(),
    }
}

/// Document store backed by a MongoDB collection
#[derive(Debug, Clone)]
pub struct MongoDocumentStore {
    client: Client,
    config: MongoConfig,
}

impl MongoDocumentStore {
    /// Build the client from configuration.
    ///
    /// Option parsing (which may resolve SRV records) is bounded by the
    /// connect timeout, and the same timeout is applied to the driver's
    /// connect and server selection. The driver connects lazily, so an
    /// unreachable server shows up on the first query, not here.
    pub async fn connect(config: MongoConfig) -> StoreResult<Self> {
        let timeout = config.connect_timeout();

        let mut options = with_deadline("parse document store uri", timeout, async {
            ClientOptions::parse(config.uri.as_str())
                .await
                .map_err(|e| StoreError::Config(e.to_string()))
        })
        .await?;

        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());

        let client =
            Client::with_options(options).map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn collection(&self) -> Collection<Document> {
        self.client
            .database(&self.config.database)
            .collection(&self.config.collection)
    }

    async fn find_all(&self) -> StoreResult<Vec<DocumentCity>> {
        let mut cursor = self
            .collection()
            .find(doc! {})
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut cities = Vec::new();
        while let Some(document) = cursor
            .try_next()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?
        {
            if let Some(city) = decode_city(document) {
                cities.push(city);
            }
        }

        Ok(cities)
    }
}

/// Decode one document, logging and skipping it when it does not fit.
fn decode_city(document: Document) -> Option<DocumentCity> {
    let id = document
        .get("_id")
        .cloned()
        .map(render_id)
        .unwrap_or_default();

    match bson::from_document::<StoredCity>(document) {
        Ok(stored) => Some(stored.into()),
        Err(e) => {
            Logger::event(
                Event::DocumentDecodeSkipped,
                &[("id", id.as_str()), ("message", e.to_string().as_str())],
            );
            None
        }
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn list_all(&self) -> StoreResult<Vec<DocumentCity>> {
        with_deadline("list documents", self.config.query_timeout(), self.find_all()).await
    }

    async fn ping(&self) -> StoreResult<()> {
        with_deadline("document store ping", self.config.connect_timeout(), async {
            self.client
                .database("admin")
                .run_command(doc! { "ping": 1 })
                .await
                .map(|_| ())
                .map_err(|e| StoreError::Ping(e.to_string()))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::oid::ObjectId;

    use super::*;

    #[test]
    fn test_decode_full_document() {
        let oid = ObjectId::new();
        let document = doc! { "_id": oid, "city": "Gdansk", "country": "Poland" };

        let city = decode_city(document).unwrap();
        assert_eq!(city.id, Some(oid.to_hex()));
        assert_eq!(city.city, "Gdansk");
        assert_eq!(city.country, "Poland");
    }

    #[test]
    fn test_decode_string_id() {
        let document = doc! { "_id": "warsaw-1", "city": "Warsaw", "country": "Poland" };

        let city = decode_city(document).unwrap();
        assert_eq!(city.id.as_deref(), Some("warsaw-1"));
        assert_eq!(city.city, "Warsaw");
    }

    #[test]
    fn test_decode_integer_id() {
        let document = doc! { "_id": 7_i32, "city": "Krakow", "country": "Poland" };

        let city = decode_city(document).unwrap();
        assert_eq!(city.id.as_deref(), Some("7"));
    }

    #[test]
    fn test_render_id_matches_response_format() {
        let oid = ObjectId::new();
        assert_eq!(render_id(Bson::ObjectId(oid)), oid.to_hex());
        assert_eq!(render_id(Bson::String("abc".to_string())), "abc");
        assert_eq!(render_id(Bson::Int64(42)), "42");
    }

    #[test]
    fn test_decode_missing_fields_default_to_empty() {
        let document = doc! { "city": "Lisbon" };

        let city = decode_city(document).unwrap();
        assert_eq!(city.id, None);
        assert_eq!(city.country, "");
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let document = doc! { "city": "Rome", "country": "Italy", "population": 2_800_000 };
        assert!(decode_city(document).is_some());
    }

    #[test]
    fn test_malformed_document_is_skipped() {
        let document = doc! { "_id": ObjectId::new(), "city": 42, "country": "Nowhere" };
        assert!(decode_city(document).is_none());
    }

    #[tokio::test]
    async fn test_invalid_uri_is_config_error() {
        let config = MongoConfig {
            uri: "postgres://localhost".to_string(),
            ..MongoConfig::default()
        };

        let err = MongoDocumentStore::connect(config).await.unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }
}
