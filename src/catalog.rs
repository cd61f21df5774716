//! JSON catalog file.
//!
//! The catalog carries everything search and indexing need from the shop:
//! enabled languages, localized resources, categories, manufacturers,
//! specification attributes and product records.
//!
//! ```json
//! {
//!   "languages": ["en-US", "de-DE"],
//!   "resources": { "de": { "filtering.categoryfilteredlabel": "Kategorie" } },
//!   "categories": [ { "id": 1, "name": "Shoes", "localized": { "de": "Schuhe" } } ],
//!   "manufacturers": [],
//!   "specification_attributes": [],
//!   "products": [ { "id": 1, "name": "Running shoe", "category_ids": [1] } ]
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use product_search_core::fields;
use product_search_core::indexing::{IndexingContext, ProductRecord};
use product_search_core::lookup::{Catalog, CatalogLookup, NamedEntity};
use serde::Deserialize;

use crate::config::Config;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFile {
    /// Culture tags of the enabled languages (`en-US`).
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(flatten)]
    pub catalog: Catalog,
    #[serde(default)]
    pub products: Vec<ProductRecord>,
}

impl CatalogFile {
    /// Short language keys, de-duplicated, in file order.
    pub fn language_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for culture in &self.languages {
            let key = fields::language_key(culture.trim()).to_lowercase();
            if !key.is_empty() && !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    pub fn product(&self, id: i64) -> Option<&ProductRecord> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn indexing_context(&self, config: &Config) -> IndexingContext {
        let default_language = config.search.default_language.clone();
        let mut languages = self.language_keys();
        if !languages.contains(&default_language) {
            languages.insert(0, default_language.clone());
        }
        IndexingContext {
            default_language,
            languages,
            permissions: config.indexing.permissions.clone(),
        }
    }
}

pub fn load_catalog(path: &Path) -> Result<CatalogFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
    let catalog: CatalogFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse catalog file: {}", path.display()))?;

    let mut seen = std::collections::HashSet::new();
    for product in &catalog.products {
        if !seen.insert(product.id) {
            anyhow::bail!("duplicate product id {} in catalog", product.id);
        }
    }

    tracing::debug!(
        products = catalog.products.len(),
        categories = catalog.catalog.categories.len(),
        languages = catalog.languages.len(),
        "catalog loaded"
    );
    Ok(catalog)
}

#[async_trait]
impl CatalogLookup for CatalogFile {
    async fn category(&self, id: i64, language: &str) -> Option<NamedEntity> {
        self.catalog.category(id, language).await
    }

    async fn manufacturer(&self, id: i64, language: &str) -> Option<NamedEntity> {
        self.catalog.manufacturer(id, language).await
    }

    async fn specification_attribute(&self, id: i64, language: &str) -> Option<NamedEntity> {
        self.catalog.specification_attribute(id, language).await
    }

    async fn specification_option(&self, id: i64, language: &str) -> Option<NamedEntity> {
        self.catalog.specification_option(id, language).await
    }

    async fn resource(&self, key: &str, language: &str) -> Option<String> {
        self.catalog.resource(key, language).await
    }

    async fn has_categories(&self) -> bool {
        self.catalog.has_categories().await
    }

    async fn has_manufacturers(&self) -> bool {
        self.catalog.has_manufacturers().await
    }

    async fn filterable_specification_attributes(&self) -> Vec<i64> {
        self.catalog.filterable_specification_attributes().await
    }
}
