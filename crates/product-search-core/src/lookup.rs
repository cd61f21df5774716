//! Catalog lookups used to turn facet ids into display names.
//!
//! The search engine only knows ids. Names, display orders and localized
//! resources come from the catalog through [`CatalogLookup`]. [`Catalog`]
//! is a serde-friendly in-memory implementation; the application loads it
//! from its JSON catalog file.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Resolved name and display order of a catalog entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedEntity {
    pub name: String,
    pub display_order: i32,
}

/// Read-only catalog queries needed by facet translation and result assembly.
///
/// Every lookup returns `None` for unknown ids. `language` is a short
/// language key; implementations fall back to the entity's base name when
/// no localized name exists.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn category(&self, id: i64, language: &str) -> Option<NamedEntity>;

    async fn manufacturer(&self, id: i64, language: &str) -> Option<NamedEntity>;

    async fn specification_attribute(&self, id: i64, language: &str) -> Option<NamedEntity>;

    async fn specification_option(&self, id: i64, language: &str) -> Option<NamedEntity>;

    /// Localized UI resource string.
    async fn resource(&self, key: &str, language: &str) -> Option<String>;

    async fn has_categories(&self) -> bool;

    async fn has_manufacturers(&self) -> bool;

    /// Ids of specification attributes that allow filtering, in display order.
    async fn filterable_specification_attributes(&self) -> Vec<i64>;
}

/// A category, manufacturer or specification option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntity {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub display_order: i32,
    /// Language key → localized name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub localized: HashMap<String, String>,
}

impl CatalogEntity {
    fn named(&self, language: &str) -> NamedEntity {
        let name = self
            .localized
            .get(language)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.name)
            .clone();
        NamedEntity {
            name,
            display_order: self.display_order,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificationAttribute {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub localized: HashMap<String, String>,
    #[serde(default = "default_true")]
    pub allow_filtering: bool,
    #[serde(default)]
    pub options: Vec<CatalogEntity>,
}

impl SpecificationAttribute {
    fn as_entity(&self) -> CatalogEntity {
        CatalogEntity {
            id: self.id,
            name: self.name.clone(),
            display_order: self.display_order,
            localized: self.localized.clone(),
        }
    }
}

/// In-memory catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    /// Language key → resource key → text.
    pub resources: HashMap<String, HashMap<String, String>>,
    pub categories: Vec<CatalogEntity>,
    pub manufacturers: Vec<CatalogEntity>,
    pub specification_attributes: Vec<SpecificationAttribute>,
}

impl Catalog {
    /// Attribute id owning a specification option.
    pub fn attribute_of_option(&self, option_id: i64) -> Option<i64> {
        self.specification_attributes
            .iter()
            .find(|a| a.options.iter().any(|o| o.id == option_id))
            .map(|a| a.id)
    }
}

#[async_trait]
impl CatalogLookup for Catalog {
    async fn category(&self, id: i64, language: &str) -> Option<NamedEntity> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.named(language))
    }

    async fn manufacturer(&self, id: i64, language: &str) -> Option<NamedEntity> {
        self.manufacturers
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.named(language))
    }

    async fn specification_attribute(&self, id: i64, language: &str) -> Option<NamedEntity> {
        self.specification_attributes
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.as_entity().named(language))
    }

    async fn specification_option(&self, id: i64, language: &str) -> Option<NamedEntity> {
        self.specification_attributes
            .iter()
            .flat_map(|a| a.options.iter())
            .find(|o| o.id == id)
            .map(|o| o.named(language))
    }

    async fn resource(&self, key: &str, language: &str) -> Option<String> {
        self.resources
            .get(language)
            .and_then(|r| r.get(key))
            .cloned()
    }

    async fn has_categories(&self) -> bool {
        !self.categories.is_empty()
    }

    async fn has_manufacturers(&self) -> bool {
        !self.manufacturers.is_empty()
    }

    async fn filterable_specification_attributes(&self) -> Vec<i64> {
        let mut attributes: Vec<&SpecificationAttribute> = self
            .specification_attributes
            .iter()
            .filter(|a| a.allow_filtering)
            .collect();
        attributes.sort_by_key(|a| a.display_order);
        attributes.into_iter().map(|a| a.id).collect()
    }
}
