//! Storage abstraction for the product index.
//!
//! The [`SearchStore`] trait is the only way the core talks to the search
//! engine. The application ships an HTTP Solr client; [`memory`] provides
//! an in-process implementation for tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//! Retries, if any, belong to the implementation, never to callers.

pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::document::ProductDocument;
use crate::error::StoreError;
use crate::query::{QueryOptions, QueryTree};

/// Count for one facet option value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetCount {
    pub value: String,
    pub count: u64,
}

/// Counts for one facet field, in engine order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetField {
    /// Physical field name as returned by the engine (`attr_allcategories`).
    pub field: String,
    pub values: Vec<FacetCount>,
}

/// Highlight fragments: document id → field → fragments.
pub type Highlights = HashMap<String, HashMap<String, Vec<String>>>;

/// Raw engine output for one query. Read-only to the core apart from
/// hero pinning, which reorders `documents` in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSearchResult {
    /// Documents in engine relevance order.
    pub documents: Vec<ProductDocument>,
    /// Total number of matches before the row cap.
    pub num_found: u64,
    pub facet_fields: Vec<FacetField>,
    pub highlights: Highlights,
    /// First spellcheck collation, if the engine produced one.
    pub collation: Option<String>,
}

impl RawSearchResult {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Fragments for a document field, if any were returned.
    pub fn highlight(&self, id: i64, field: &str) -> Option<&[String]> {
        self.highlights
            .get(&id.to_string())
            .and_then(|fields| fields.get(field))
            .map(Vec::as_slice)
    }
}

/// Abstract search backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`query`](SearchStore::query) | Execute a query tree with options |
/// | [`add`](SearchStore::add) | Add or replace documents by id |
/// | [`delete_by_id`](SearchStore::delete_by_id) | Remove one document |
/// | [`delete_all`](SearchStore::delete_all) | Remove every document |
/// | [`commit`](SearchStore::commit) | Make pending writes visible |
#[async_trait]
pub trait SearchStore: Send + Sync {
    /// Execute a query. Must honour the row cap, filters, facet exclusion
    /// tags, minimum facet count, highlighting and spellcheck options.
    async fn query(
        &self,
        query: &QueryTree,
        options: &QueryOptions,
    ) -> Result<RawSearchResult, StoreError>;

    /// Add documents, replacing any existing document with the same id.
    async fn add(&self, documents: &[ProductDocument]) -> Result<(), StoreError>;

    async fn delete_by_id(&self, id: i64) -> Result<(), StoreError>;

    async fn delete_all(&self) -> Result<(), StoreError>;

    async fn commit(&self) -> Result<(), StoreError>;
}
