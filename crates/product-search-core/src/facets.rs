//! Facet selection parsing, filter construction and facet translation.
//!
//! # Wire format
//!
//! A selection travels as `facet:value|value,facet:value`, e.g.
//! `allcategories:3|7,SA2:10`. Facet names are `allcategories`,
//! `allmanufacturers` or `SA<attributeId>`; values are entity ids.
//!
//! # Outbound
//!
//! Each selected facet becomes one tagged [`FilterClause`] whose values are
//! ORed. Different facets are ANDed by the store.
//!
//! # Inbound
//!
//! Raw facet counts are translated into [`ProductFacet`]s with display
//! names from the catalog. Active values sort first; values whose ids no
//! longer resolve are dropped; facets whose values all have zero count are
//! suppressed.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::fields;
use crate::lookup::{CatalogLookup, NamedEntity};
use crate::query::FilterClause;
use crate::settings::FacetConfig;
use crate::store::FacetField;

/// Resource key for the category facet's display name.
pub const CATEGORY_LABEL_RESOURCE: &str = "filtering.categoryfilteredlabel";
/// Resource key for the manufacturer facet's display name.
pub const MANUFACTURER_LABEL_RESOURCE: &str = "filtering.manufacturersfilteredlabel";

/// The caller's active facet choices: facet name → selected values.
///
/// Set semantics: ordering and duplicates carry no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetSelection {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl FacetSelection {
    /// Parse the wire format. Malformed segments and segments naming an
    /// unknown facet are dropped with a warning, so only `allcategories`,
    /// `allmanufacturers` and `SA<id>` ever reach a filter query.
    pub fn parse(encoded: &str) -> Self {
        let mut selection = Self::default();
        for segment in encoded.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let Some((name, values)) = segment.split_once(':') else {
                tracing::warn!(segment = %segment, "dropping facet segment without ':'");
                continue;
            };
            let name = name.trim();
            let values: Vec<&str> = values
                .split('|')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .collect();
            if name.is_empty() || values.is_empty() {
                tracing::warn!(segment = %segment, "dropping malformed facet segment");
                continue;
            }
            if !fields::is_facet_name(name) {
                tracing::warn!(facet = %name, "dropping unknown facet");
                continue;
            }
            for value in values {
                selection.insert(name, value);
            }
        }
        selection
    }

    pub fn insert(&mut self, facet: impl Into<String>, value: impl Into<String>) {
        self.entries
            .entry(facet.into())
            .or_default()
            .insert(value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep only the facets `keep` accepts.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.entries.retain(|facet, _| keep(facet));
    }

    pub fn is_active(&self, facet: &str, value: &str) -> bool {
        self.entries
            .get(facet)
            .is_some_and(|values| values.contains(value))
    }

    /// Canonical wire encoding (facets and values sorted).
    pub fn encode(&self) -> String {
        self.entries
            .iter()
            .map(|(facet, values)| {
                let values: Vec<&str> = values.iter().map(String::as_str).collect();
                format!("{}:{}", facet, values.join("|"))
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// One tagged filter clause per selected facet.
    pub fn filter_clauses(&self) -> Vec<FilterClause> {
        self.entries
            .iter()
            .map(|(facet, values)| FilterClause::for_facet(facet, values.iter().cloned().collect()))
            .collect()
    }
}

/// One facet option in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetValue {
    /// Raw option id, as used in a selection.
    pub option_name: String,
    pub option_display_name: String,
    pub option_product_count: u64,
    pub filter_active: bool,
    /// Active values carry `i32::MIN` so they sort first.
    pub display_order: i32,
}

/// One facet in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductFacet {
    pub facet_name: String,
    pub facet_display_name: String,
    pub facet_values: Vec<FacetValue>,
}

/// Facet names to request counts for, given what the catalog offers.
pub async fn available_facets<L: CatalogLookup + ?Sized>(
    config: &FacetConfig,
    lookup: &L,
) -> Vec<String> {
    let mut facets = Vec::new();
    if config.include_categories && lookup.has_categories().await {
        facets.push(fields::ALL_CATEGORIES.to_string());
    }
    if config.include_manufacturers && lookup.has_manufacturers().await {
        facets.push(fields::ALL_MANUFACTURERS.to_string());
    }
    if config.include_specification_attributes {
        let mut seen = BTreeSet::new();
        for id in lookup.filterable_specification_attributes().await {
            if !config.selected_specification_attribute_ids.is_empty()
                && !config.selected_specification_attribute_ids.contains(&id)
            {
                continue;
            }
            if seen.insert(id) {
                facets.push(fields::specification_attribute_facet(id));
            }
        }
    }
    facets.retain(|facet| config.is_allowed(facet));
    facets
}

/// Display name of a facet: resource labels for categories and
/// manufacturers, the localized attribute name for `SA<id>` (empty when the
/// attribute no longer exists).
pub async fn facet_display_name<L: CatalogLookup + ?Sized>(
    facet: &str,
    language: &str,
    lookup: &L,
) -> String {
    let resource = match facet {
        fields::ALL_CATEGORIES => Some(CATEGORY_LABEL_RESOURCE),
        fields::ALL_MANUFACTURERS => Some(MANUFACTURER_LABEL_RESOURCE),
        _ => None,
    };
    if let Some(key) = resource {
        return lookup
            .resource(key, language)
            .await
            .unwrap_or_else(|| key.to_string());
    }
    match fields::specification_attribute_id(facet) {
        Some(id) => lookup
            .specification_attribute(id, language)
            .await
            .map(|a| a.name)
            .unwrap_or_default(),
        None => facet.to_string(),
    }
}

async fn resolve_option<L: CatalogLookup + ?Sized>(
    facet: &str,
    value: &str,
    language: &str,
    lookup: &L,
) -> Option<NamedEntity> {
    let id: i64 = value.parse().ok()?;
    match facet {
        fields::ALL_CATEGORIES => lookup.category(id, language).await,
        fields::ALL_MANUFACTURERS => lookup.manufacturer(id, language).await,
        _ => lookup.specification_option(id, language).await,
    }
}

/// Translate raw facet counts into response facets.
pub async fn build_product_facets<L: CatalogLookup + ?Sized>(
    facet_fields: &[FacetField],
    selection: &FacetSelection,
    language: &str,
    lookup: &L,
    config: &FacetConfig,
) -> Vec<ProductFacet> {
    let mut facets = Vec::with_capacity(facet_fields.len());

    for field in facet_fields {
        let facet_name = fields::facet_name_from_field(&field.field);
        if !config.is_allowed(facet_name) {
            continue;
        }

        let mut values = Vec::with_capacity(field.values.len());
        for count in &field.values {
            let Some(entity) = resolve_option(facet_name, &count.value, language, lookup).await
            else {
                tracing::debug!(
                    facet = %facet_name,
                    value = %count.value,
                    "dropping facet value with no catalog entry"
                );
                continue;
            };
            let active = selection.is_active(facet_name, &count.value);
            values.push(FacetValue {
                option_name: count.value.clone(),
                option_display_name: entity.name,
                option_product_count: count.count,
                filter_active: active,
                display_order: if active { i32::MIN } else { entity.display_order },
            });
        }

        if !values.iter().any(|v| v.option_product_count > 0) {
            continue;
        }
        values.sort_by_key(|v| v.display_order);

        facets.push(ProductFacet {
            facet_name: facet_name.to_string(),
            facet_display_name: facet_display_name(facet_name, language, lookup).await,
            facet_values: values,
        });
    }

    facets
}
