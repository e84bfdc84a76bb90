//! City records returned by the two stores
//!
//! The two shapes are unrelated; there is no identifier mapping between
//! the document collection and the relational table.

use serde::{Deserialize, Serialize};

/// A city document as rendered to HTTP callers.
///
/// Empty fields are left out of the JSON body, so a document without a
/// `country` renders as `{"_id": "...", "city": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCity {
    /// Store-assigned identifier, hex encoded
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub city: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub country: String,
}

impl DocumentCity {
    pub fn new(id: Option<String>, city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            id,
            city: city.into(),
            country: country.into(),
        }
    }
}

/// A row of the `Cities` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationalCity {
    #[serde(rename = "ID")]
    pub id: i64,

    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Country")]
    pub country: String,
}

impl RelationalCity {
    pub fn new(id: i64, name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            country: country.into(),
        }
    }
}
