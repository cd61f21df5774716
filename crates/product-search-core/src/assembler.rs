//! Result model assembly.
//!
//! Turns a [`RawSearchResult`] into the [`SearchResponseModel`] a storefront
//! renders: product overviews in result order (with localized text, optional
//! price/picture/specification sections and highlighted names) plus the
//! translated facets and spellcheck suggestion.

use serde::Serialize;

use crate::document::ProductDocument;
use crate::facets::{self, FacetSelection, ProductFacet};
use crate::fields;
use crate::lookup::CatalogLookup;
use crate::settings::SearchSettings;
use crate::store::RawSearchResult;

/// Storefront capabilities for one product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductPrice {
    pub disable_buy_button: bool,
    pub disable_wishlist_button: bool,
    pub disable_add_to_compare_list_button: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductPicture {
    pub image_url: Option<String>,
    pub thumb_image_url: Option<String>,
    pub full_size_image_url: Option<String>,
    /// Alternate text and title, taken from the product name.
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecificationSummary {
    pub attribute_id: i64,
    pub name: String,
    pub values: Vec<String>,
}

/// One product in a search response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductOverview {
    pub id: i64,
    pub name: String,
    pub short_description: String,
    pub full_description: String,
    pub se_name: String,
    pub sku: Option<String>,
    pub product_type: Option<String>,
    pub manufacturer_part_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<ProductPrice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<ProductPicture>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specification_attributes: Option<Vec<SpecificationSummary>>,
}

/// Final response for one search call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResponseModel {
    /// Echo of the query as submitted.
    pub q: String,
    /// Short language key the search ran with.
    pub language: String,
    pub no_results: bool,
    pub total: u64,
    pub products: Vec<ProductOverview>,
    pub product_facets: Vec<ProductFacet>,
    /// Spellcheck collation when the engine produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Localized field with default-language fallback; empty when neither exists.
fn localized(doc: &ProductDocument, logical: &str, language: &str, default_language: &str) -> String {
    doc.localized_text(logical, language, default_language)
        .unwrap_or_default()
        .to_string()
}

/// Build the overview for one document.
pub async fn prepare_product<L: CatalogLookup + ?Sized>(
    doc: &ProductDocument,
    language: &str,
    settings: &SearchSettings,
    lookup: &L,
) -> ProductOverview {
    let default_language = settings.default_language.as_str();
    let name = localized(doc, fields::NAME, language, default_language);

    let price = settings.results.prepare_price_model.then(|| ProductPrice {
        disable_buy_button: doc.disable_buy_button,
        disable_wishlist_button: doc.disable_wishlist_button,
        disable_add_to_compare_list_button: doc.disable_add_to_compare_list_button,
    });

    let picture = settings.results.prepare_picture_model.then(|| ProductPicture {
        image_url: doc.default_image_url.clone(),
        thumb_image_url: doc.thumb_image_url.clone(),
        full_size_image_url: doc.full_size_image_url.clone(),
        title: name.clone(),
    });

    let specification_attributes = if settings.results.prepare_specification_attributes {
        Some(specification_summaries(doc, language, lookup).await)
    } else {
        None
    };

    ProductOverview {
        id: doc.id,
        short_description: localized(doc, fields::SHORT_DESCRIPTION, language, default_language),
        full_description: localized(doc, fields::FULL_DESCRIPTION, language, default_language),
        se_name: localized(doc, fields::SE_NAME, language, default_language),
        sku: doc.sku.clone(),
        product_type: doc.product_type.clone(),
        manufacturer_part_number: doc.manufacturer.clone(),
        name,
        price,
        picture,
        specification_attributes,
    }
}

async fn specification_summaries<L: CatalogLookup + ?Sized>(
    doc: &ProductDocument,
    language: &str,
    lookup: &L,
) -> Vec<SpecificationSummary> {
    let mut summaries = Vec::new();
    for (attribute_id, option_ids) in doc.specification_options() {
        let Some(attribute) = lookup.specification_attribute(attribute_id, language).await else {
            continue;
        };
        let mut options = Vec::new();
        for id in option_ids {
            if let Some(option) = lookup.specification_option(id, language).await {
                options.push(option);
            }
        }
        if options.is_empty() {
            continue;
        }
        options.sort_by_key(|o| o.display_order);
        summaries.push((
            attribute.display_order,
            SpecificationSummary {
                attribute_id,
                name: attribute.name,
                values: options.into_iter().map(|o| o.name).collect(),
            },
        ));
    }
    summaries.sort_by_key(|(order, _)| *order);
    summaries.into_iter().map(|(_, s)| s).collect()
}

/// Replace product names with highlighted fragments where available.
///
/// The localized field wins over the default-language copy.
pub fn apply_highlights(
    products: &mut [ProductOverview],
    raw: &RawSearchResult,
    language: &str,
    default_language: &str,
) {
    if raw.highlights.is_empty() {
        return;
    }
    let localized_field = fields::localized_field_name(fields::NAME, language, false);
    let default_field = fields::localized_field_name(fields::NAME, default_language, true);
    for product in products.iter_mut() {
        let fragment = raw
            .highlight(product.id, &localized_field)
            .or_else(|| raw.highlight(product.id, &default_field))
            .and_then(|fragments| fragments.first());
        if let Some(fragment) = fragment {
            product.name = fragment.clone();
        }
    }
}

/// Assemble the full response from a raw result.
pub async fn assemble_response<L: CatalogLookup + ?Sized>(
    query: &str,
    language: &str,
    raw: &RawSearchResult,
    selection: &FacetSelection,
    settings: &SearchSettings,
    lookup: &L,
) -> SearchResponseModel {
    let mut products = Vec::with_capacity(raw.documents.len());
    for doc in raw.documents.iter().filter(|d| d.id != 0) {
        products.push(prepare_product(doc, language, settings, lookup).await);
    }

    if settings.highlighting.enabled {
        apply_highlights(&mut products, raw, language, &settings.default_language);
    }

    let product_facets = facets::build_product_facets(
        &raw.facet_fields,
        selection,
        language,
        lookup,
        &settings.facets,
    )
    .await;

    let suggestion = if settings.spellcheck.enabled {
        raw.collation.clone().filter(|c| !c.trim().is_empty())
    } else {
        None
    };

    SearchResponseModel {
        q: query.to_string(),
        language: language.to_string(),
        no_results: products.is_empty(),
        total: raw.num_found,
        products,
        product_facets,
        suggestion,
    }
}
