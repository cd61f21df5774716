//! # Product Search Core
//!
//! Engine-independent logic for Solr-backed product search: field naming,
//! query composition with a default-language fallback, facet filters and
//! facet translation, hero product pinning, result assembly, the indexing
//! pipeline and the store abstraction.
//!
//! This crate contains no HTTP client, filesystem I/O or configuration
//! loading. The application supplies a [`store::SearchStore`] and a
//! [`lookup::CatalogLookup`] implementation.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`fields`] | Physical field names shared by indexing and querying |
//! | [`composer`] | Two-phase query composition and execution |
//! | [`facets`] | Facet selection wire format, filters, response facets |
//! | [`ranker`] | Hero product pinning |
//! | [`assembler`] | Response model assembly |
//! | [`indexing`] | Product records → engine documents |
//! | [`search`] | End-to-end search entry point |

pub mod assembler;
pub mod composer;
pub mod document;
pub mod error;
pub mod facets;
pub mod fields;
pub mod indexing;
pub mod lookup;
pub mod query;
pub mod ranker;
pub mod search;
pub mod settings;
pub mod store;
