//! # Solr Product Search
//!
//! Storefront product search on top of Apache Solr: localized full-text
//! queries with a default-language fallback, faceted filtering, hero product
//! pinning and index maintenance, exposed through the `sps` CLI and an HTTP
//! server.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────────┐   ┌──────────┐
//! │ catalog.json │──▶│ product-search-core  │──▶│   Solr   │
//! │ (lookups)    │   │ compose/facet/assemble│   │  (HTTP)  │
//! └──────────────┘   └──────────┬───────────┘   └──────────┘
//!                               │
//!                      ┌────────┴────────┐
//!                      ▼                 ▼
//!                 ┌──────────┐     ┌──────────┐
//!                 │   CLI    │     │   HTTP   │
//!                 │  (sps)   │     │  server  │
//!                 └──────────┘     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! sps index rebuild                         # push the catalog into Solr
//! sps search "running shoe" --lang de
//! sps search shoe --facets "allcategories:3|7"
//! sps serve                                 # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`solr`] | Solr HTTP store client |
//! | [`catalog`] | JSON catalog file and lookups |
//! | [`search`] | `sps search` command |
//! | [`index_cmd`] | Index rebuild and single-product updates |
//! | [`server`] | HTTP server |

pub mod catalog;
pub mod config;
pub mod index_cmd;
pub mod search;
pub mod server;
pub mod solr;
