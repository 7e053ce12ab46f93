//! Person record store.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     significant_people() → StaticStore::new (builds id index once)
//!     → shared via Arc<dyn PersonStore> to all handlers
//!
//! Per request:
//!     handler → list_all()  → &[PersonRecord] (declaration order)
//!     handler → get_by_id() → Option<&PersonRecord>
//! ```
//!
//! # Design Decisions
//! - Records are immutable for the process lifetime; no locking needed
//! - A missing id is an absent value, not an error
//! - Lookups go through an index so the collection can grow without
//!   turning every request into a linear scan

pub mod memory;

use serde::{Deserialize, Serialize};

pub use memory::{significant_people, StaticStore};

/// A single significant person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "FirstName")]
    pub first_name: String,

    #[serde(rename = "LastName")]
    pub last_name: String,

    #[serde(rename = "Occupation")]
    pub occupation: String,
}

impl PersonRecord {
    pub fn new(
        id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        occupation: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            occupation: occupation.into(),
        }
    }
}

/// Read-only access to the person collection.
pub trait PersonStore: Send + Sync {
    /// The full collection in insertion order.
    fn list_all(&self) -> &[PersonRecord];

    /// Look up a single record by id.
    fn get_by_id(&self, id: &str) -> Option<&PersonRecord>;
}
