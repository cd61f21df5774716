//! End-to-end product search.
//!
//! [`search_products`] operates entirely through the [`SearchStore`] and
//! [`CatalogLookup`] traits, with no HTTP or configuration dependencies.
//! The calling application supplies the store implementation, the catalog
//! and the immutable [`SearchSettings`].
//!
//! # Flow
//!
//! 1. Parse the facet selection (malformed segments dropped).
//! 2. Work out which facets to count: the request's list, or everything
//!    the catalog and settings make available.
//! 3. Run the two-phase query ([`composer::execute_search`]), with hero
//!    pinning applied to the returned documents.
//! 4. Assemble the response model ([`assembler::assemble_response`]).

use std::time::Duration;

use serde::Deserialize;

use crate::assembler::{self, SearchResponseModel};
use crate::composer::{self, SearchInput};
use crate::error::SearchError;
use crate::facets::{self, FacetSelection};
use crate::lookup::CatalogLookup;
use crate::settings::SearchSettings;
use crate::store::SearchStore;

/// One product search as submitted by a caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchRequest {
    /// Raw query text.
    pub q: String,
    /// Explicit language (short key or culture tag).
    pub language: Option<String>,
    /// Encoded facet selection (`allcategories:3|7,SA2:10`).
    pub facets: String,
    /// Facet names to count; `None` counts every available facet.
    pub return_facets: Option<Vec<String>>,
}

/// Per-call context that does not come from the request body.
#[derive(Debug, Clone, Default)]
pub struct SearchContext {
    /// Caller's working language, used when the request names none.
    pub working_language: Option<String>,
    /// Deadline for each store round-trip.
    pub timeout: Option<Duration>,
}

/// Run a product search and assemble the response.
pub async fn search_products<S, L>(
    store: &S,
    lookup: &L,
    request: &SearchRequest,
    context: &SearchContext,
    settings: &SearchSettings,
) -> Result<SearchResponseModel, SearchError>
where
    S: SearchStore + ?Sized,
    L: CatalogLookup + ?Sized,
{
    let mut selection = FacetSelection::parse(&request.facets);
    selection.retain(|facet| {
        let allowed = settings.facets.is_allowed(facet);
        if !allowed {
            tracing::warn!(facet = %facet, "dropping facet filter outside the allow-list");
        }
        allowed
    });

    let return_facets = match &request.return_facets {
        Some(requested) => requested
            .iter()
            .filter(|f| settings.facets.is_allowed(f))
            .cloned()
            .collect(),
        None => facets::available_facets(&settings.facets, lookup).await,
    };

    let input = SearchInput {
        query: &request.q,
        language: request.language.as_deref(),
        working_language: context.working_language.as_deref(),
        selection: &selection,
        return_facets: (!return_facets.is_empty()).then_some(return_facets.as_slice()),
        timeout: context.timeout,
    };
    let outcome = composer::execute_search(store, &input, settings).await?;

    let response = assembler::assemble_response(
        request.q.trim(),
        &outcome.language,
        &outcome.result,
        &selection,
        settings,
        lookup,
    )
    .await;

    tracing::info!(
        q = %response.q,
        language = %response.language,
        phase = ?outcome.phase,
        hits = response.products.len(),
        total = response.total,
        "product search complete"
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexing::{self, IndexingContext, LocalizedProductText, ProductRecord, StorefrontPermissions};
    use crate::lookup::Catalog;
    use crate::store::memory::InMemoryStore;
    use serde_json::json;

    fn catalog() -> Catalog {
        serde_json::from_value(json!({
            "resources": { "de": { "filtering.categoryfilteredlabel": "Kategorie" } },
            "categories": [
                { "id": 1, "name": "Shoes", "localized": { "de": "Schuhe" } },
                { "id": 2, "name": "Boots", "localized": { "de": "Stiefel" } }
            ]
        }))
        .unwrap()
    }

    async fn indexed_store(lookup: &Catalog) -> InMemoryStore {
        let store = InMemoryStore::new();
        let mut boot = ProductRecord {
            id: 2,
            name: "Leather boot".into(),
            category_ids: vec![2],
            ..Default::default()
        };
        boot.localized.insert(
            "de".into(),
            LocalizedProductText {
                name: "Lederstiefel".into(),
                ..Default::default()
            },
        );
        let products = vec![
            ProductRecord {
                id: 1,
                name: "Running shoe".into(),
                category_ids: vec![1],
                ..Default::default()
            },
            boot,
            ProductRecord {
                id: 3,
                name: "Trail shoe".into(),
                category_ids: vec![1, 2],
                ..Default::default()
            },
        ];
        let ctx = IndexingContext {
            default_language: "en".into(),
            languages: vec!["en".into(), "de".into()],
            permissions: StorefrontPermissions::default(),
        };
        indexing::reindex_all(&store, lookup, &products, &ctx)
            .await
            .unwrap();
        store
    }

    fn settings() -> SearchSettings {
        let mut s = SearchSettings::default();
        s.facets.include_categories = true;
        s
    }

    #[tokio::test]
    async fn test_filters_outside_allow_list_are_ignored() {
        let lookup = catalog();
        let store = indexed_store(&lookup).await;
        let mut settings = settings();
        settings.facets.allow_list = vec!["allmanufacturers".into()];
        let request = SearchRequest {
            q: "shoe".into(),
            facets: "allcategories:2,a}name_txt_en:x".into(),
            ..Default::default()
        };
        let response = search_products(&store, &lookup, &request, &SearchContext::default(), &settings)
            .await
            .unwrap();
        let ids: Vec<i64> = response.products.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_search_with_facets_and_filters() {
        let lookup = catalog();
        let store = indexed_store(&lookup).await;
        let request = SearchRequest {
            q: " shoe ".into(),
            facets: "allcategories:2".into(),
            ..Default::default()
        };
        let response = search_products(&store, &lookup, &request, &SearchContext::default(), &settings())
            .await
            .unwrap();

        assert_eq!(response.q, "shoe");
        let ids: Vec<i64> = response.products.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3]);

        let categories = &response.product_facets[0];
        assert_eq!(categories.facet_name, "allcategories");
        let active: Vec<&str> = categories
            .facet_values
            .iter()
            .filter(|v| v.filter_active)
            .map(|v| v.option_display_name.as_str())
            .collect();
        assert_eq!(active, vec!["Boots"]);
        assert_eq!(categories.facet_values[0].option_name, "2");
    }

    #[tokio::test]
    async fn test_working_language_and_fallback() {
        let lookup = catalog();
        let store = indexed_store(&lookup).await;
        let context = SearchContext {
            working_language: Some("de-DE".into()),
            ..Default::default()
        };

        let request = SearchRequest {
            q: "lederstiefel".into(),
            ..Default::default()
        };
        let response = search_products(&store, &lookup, &request, &context, &settings())
            .await
            .unwrap();
        assert_eq!(response.language, "de");
        assert_eq!(response.products[0].name, "Lederstiefel");
        assert_eq!(response.product_facets[0].facet_display_name, "Kategorie");

        let request = SearchRequest {
            q: "trail".into(),
            ..Default::default()
        };
        let response = search_products(&store, &lookup, &request, &context, &settings())
            .await
            .unwrap();
        assert_eq!(response.products.len(), 1);
        assert_eq!(response.products[0].name, "Trail shoe");
    }

    #[tokio::test]
    async fn test_no_match_is_empty_response() {
        let lookup = catalog();
        let store = indexed_store(&lookup).await;
        let request = SearchRequest {
            q: "umbrella".into(),
            ..Default::default()
        };
        let response = search_products(&store, &lookup, &request, &SearchContext::default(), &settings())
            .await
            .unwrap();
        assert!(response.no_results);
        assert!(response.product_facets.is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_errors_unless_allowed() {
        let lookup = catalog();
        let store = indexed_store(&lookup).await;
        let request = SearchRequest::default();
        let err = search_products(&store, &lookup, &request, &SearchContext::default(), &settings())
            .await
            .unwrap_err();
        assert_eq!(err, SearchError::EmptyQuery);

        let mut allow = settings();
        allow.allow_empty_search_query = true;
        let response = search_products(&store, &lookup, &request, &SearchContext::default(), &allow)
            .await
            .unwrap();
        assert_eq!(response.products.len(), 3);
    }
}
