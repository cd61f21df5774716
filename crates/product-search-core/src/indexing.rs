//! Indexing pipeline: catalog product records → engine documents.
//!
//! Builds [`ProductDocument`]s using the same field naming as the query
//! composer and pushes them through a [`SearchStore`]. Supports a full
//! rebuild and incremental add/update/delete driven by catalog change
//! events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::document::ProductDocument;
use crate::error::IndexError;
use crate::fields;
use crate::lookup::CatalogLookup;
use crate::store::SearchStore;

/// Localized product texts for one language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizedProductText {
    pub name: String,
    pub short_description: String,
    pub full_description: String,
    pub se_name: String,
}

/// One specification attribute option assigned to a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSpecification {
    pub attribute_id: i64,
    pub option_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductPictureUrls {
    pub default_url: Option<String>,
    pub thumb_url: Option<String>,
    pub full_size_url: Option<String>,
}

/// A product as the catalog stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductRecord {
    pub id: i64,
    pub published: bool,
    pub sku: Option<String>,
    pub gtin: Option<String>,
    pub manufacturer_part_number: Option<String>,
    pub product_type: String,
    /// Texts in the default language.
    pub name: String,
    pub short_description: String,
    pub full_description: String,
    pub se_name: String,
    /// Language key → translated texts.
    pub localized: BTreeMap<String, LocalizedProductText>,
    pub category_ids: Vec<i64>,
    pub manufacturer_ids: Vec<i64>,
    pub specifications: Vec<ProductSpecification>,
    pub picture: Option<ProductPictureUrls>,
    pub disable_buy_button: bool,
    pub disable_wishlist_button: bool,
}

impl Default for ProductRecord {
    fn default() -> Self {
        Self {
            id: 0,
            published: true,
            sku: None,
            gtin: None,
            manufacturer_part_number: None,
            product_type: "SimpleProduct".to_string(),
            name: String::new(),
            short_description: String::new(),
            full_description: String::new(),
            se_name: String::new(),
            localized: BTreeMap::new(),
            category_ids: Vec::new(),
            manufacturer_ids: Vec::new(),
            specifications: Vec::new(),
            picture: None,
            disable_buy_button: false,
            disable_wishlist_button: false,
        }
    }
}

/// Store-wide switches that force storefront buttons off.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorefrontPermissions {
    pub enable_shopping_cart: bool,
    pub enable_wishlist: bool,
    pub display_prices: bool,
    pub compare_products_enabled: bool,
}

impl Default for StorefrontPermissions {
    fn default() -> Self {
        Self {
            enable_shopping_cart: true,
            enable_wishlist: true,
            display_prices: true,
            compare_products_enabled: true,
        }
    }
}

/// Everything document building needs besides the product itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexingContext {
    /// Short key of the default language.
    pub default_language: String,
    /// Short keys of every language with localized copies.
    pub languages: Vec<String>,
    pub permissions: StorefrontPermissions,
}

/// Catalog change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductChange {
    Added(ProductRecord),
    Edited(ProductRecord),
    Deleted(i64),
}

/// Counters from a full rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    pub total: usize,
    pub indexed: usize,
    pub skipped_unpublished: usize,
}

fn put_text(doc: &mut ProductDocument, field: String, text: &str) {
    if !text.is_empty() {
        doc.other_fields.insert(field, json!(text));
    }
}

fn id_strings(ids: &[i64]) -> Vec<String> {
    ids.iter().map(i64::to_string).collect()
}

/// Build the engine document for a product.
///
/// Default-language texts go to `<name>_default_txt_<default>` and, so the
/// localized phase also finds them, to `<name>_txt_<default>`. Each other
/// language gets `<name>_txt_<lang>` only when a translation exists.
/// Specification options are stored twice: as ids in `attr_SA<attributeId>`
/// and as names in `attr_<AttributeName>`. Options whose attribute is
/// unknown to the catalog are skipped.
pub async fn build_document<L: CatalogLookup + ?Sized>(
    product: &ProductRecord,
    context: &IndexingContext,
    lookup: &L,
) -> Result<ProductDocument, IndexError> {
    if product.id <= 0 {
        return Err(IndexError::InvalidProduct {
            id: product.id,
            reason: "product id must be positive".to_string(),
        });
    }

    let permissions = &context.permissions;
    let picture = product.picture.clone().unwrap_or_default();
    let mut doc = ProductDocument {
        id: product.id,
        sku: product.sku.clone(),
        gtin: product.gtin.clone(),
        product_type: Some(product.product_type.clone()),
        manufacturer: product.manufacturer_part_number.clone(),
        default_image_url: picture.default_url,
        thumb_image_url: picture.thumb_url,
        full_size_image_url: picture.full_size_url,
        disable_buy_button: product.disable_buy_button
            || !permissions.enable_shopping_cart
            || !permissions.display_prices,
        disable_wishlist_button: product.disable_wishlist_button
            || !permissions.enable_wishlist
            || !permissions.display_prices,
        disable_add_to_compare_list_button: !permissions.compare_products_enabled,
        all_categories: id_strings(&product.category_ids),
        all_manufacturers: id_strings(&product.manufacturer_ids),
        other_fields: BTreeMap::new(),
    };

    let default_texts = [
        (fields::NAME, product.name.as_str()),
        (fields::SHORT_DESCRIPTION, product.short_description.as_str()),
        (fields::FULL_DESCRIPTION, product.full_description.as_str()),
        (fields::SE_NAME, product.se_name.as_str()),
    ];
    for (logical, text) in default_texts {
        for is_default in [true, false] {
            put_text(
                &mut doc,
                fields::localized_field_name(logical, &context.default_language, is_default),
                text,
            );
        }
    }

    for language in context
        .languages
        .iter()
        .filter(|l| **l != context.default_language)
    {
        let Some(texts) = product.localized.get(language) else {
            continue;
        };
        for (logical, text) in [
            (fields::NAME, texts.name.as_str()),
            (fields::SHORT_DESCRIPTION, texts.short_description.as_str()),
            (fields::FULL_DESCRIPTION, texts.full_description.as_str()),
            (fields::SE_NAME, texts.se_name.as_str()),
        ] {
            put_text(
                &mut doc,
                fields::localized_field_name(logical, language, false),
                text,
            );
        }
    }

    let mut specifications: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    let mut readable: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for spec in &product.specifications {
        let Some(attribute) = lookup
            .specification_attribute(spec.attribute_id, &context.default_language)
            .await
        else {
            tracing::debug!(
                product = product.id,
                attribute = spec.attribute_id,
                "skipping unknown specification attribute"
            );
            continue;
        };
        let ids = specifications.entry(spec.attribute_id).or_default();
        let option = spec.option_id.to_string();
        if ids.contains(&option) {
            continue;
        }
        ids.push(option);
        if let Some(option) = lookup
            .specification_option(spec.option_id, &context.default_language)
            .await
        {
            readable.entry(attribute.name).or_default().push(option.name);
        }
    }
    for (attribute_id, options) in specifications {
        doc.other_fields.insert(
            fields::facet_field_name(&fields::specification_attribute_facet(attribute_id)),
            Value::from(options),
        );
    }
    for (attribute_name, options) in readable {
        doc.other_fields
            .insert(fields::facet_field_name(&attribute_name), Value::from(options));
    }

    Ok(doc)
}

/// Rebuild the whole index: clear, add every published product, commit once.
pub async fn reindex_all<S, L>(
    store: &S,
    lookup: &L,
    products: &[ProductRecord],
    context: &IndexingContext,
) -> Result<ReindexReport, IndexError>
where
    S: SearchStore + ?Sized,
    L: CatalogLookup + ?Sized,
{
    let mut report = ReindexReport {
        total: products.len(),
        ..Default::default()
    };

    let mut documents = Vec::with_capacity(products.len());
    for product in products {
        if !product.published {
            report.skipped_unpublished += 1;
            continue;
        }
        documents.push(build_document(product, context, lookup).await?);
    }

    store.delete_all().await?;
    store.add(&documents).await?;
    store.commit().await?;
    report.indexed = documents.len();

    tracing::info!(
        total = report.total,
        indexed = report.indexed,
        skipped = report.skipped_unpublished,
        "product index rebuilt"
    );
    Ok(report)
}

/// Index one product, or remove it when unpublished.
pub async fn add_or_update_product<S, L>(
    store: &S,
    lookup: &L,
    product: &ProductRecord,
    context: &IndexingContext,
) -> Result<(), IndexError>
where
    S: SearchStore + ?Sized,
    L: CatalogLookup + ?Sized,
{
    if !product.published {
        return delete_product(store, product.id).await;
    }
    let document = build_document(product, context, lookup).await?;
    store.add(std::slice::from_ref(&document)).await?;
    store.commit().await?;
    tracing::info!(product = product.id, "product indexed");
    Ok(())
}

pub async fn delete_product<S: SearchStore + ?Sized>(store: &S, id: i64) -> Result<(), IndexError> {
    store.delete_by_id(id).await?;
    store.commit().await?;
    tracing::info!(product = id, "product removed from index");
    Ok(())
}

/// React to a catalog change event.
pub async fn apply_product_change<S, L>(
    store: &S,
    lookup: &L,
    change: &ProductChange,
    context: &IndexingContext,
) -> Result<(), IndexError>
where
    S: SearchStore + ?Sized,
    L: CatalogLookup + ?Sized,
{
    match change {
        ProductChange::Added(product) | ProductChange::Edited(product) => {
            add_or_update_product(store, lookup, product, context).await
        }
        ProductChange::Deleted(id) => delete_product(store, *id).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::Catalog;
    use crate::store::memory::InMemoryStore;

    fn context() -> IndexingContext {
        IndexingContext {
            default_language: "en".into(),
            languages: vec!["en".into(), "de".into()],
            permissions: StorefrontPermissions::default(),
        }
    }

    fn catalog() -> Catalog {
        serde_json::from_value(json!({
            "specification_attributes": [
                { "id": 3, "name": "Color", "options": [ { "id": 30, "name": "Red" } ] }
            ]
        }))
        .unwrap()
    }

    fn product(id: i64, name: &str) -> ProductRecord {
        ProductRecord {
            id,
            name: name.into(),
            sku: Some(format!("SKU-{}", id)),
            category_ids: vec![1, 4],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_build_document_fields() {
        let mut p = product(7, "Boot");
        p.localized.insert(
            "de".into(),
            LocalizedProductText {
                name: "Stiefel".into(),
                ..Default::default()
            },
        );
        p.specifications = vec![
            ProductSpecification { attribute_id: 3, option_id: 30 },
            ProductSpecification { attribute_id: 3, option_id: 30 },
            ProductSpecification { attribute_id: 8, option_id: 80 },
        ];
        let doc = build_document(&p, &context(), &catalog()).await.unwrap();

        assert_eq!(doc.text("name_default_txt_en"), Some("Boot"));
        assert_eq!(doc.text("name_txt_en"), Some("Boot"));
        assert_eq!(doc.text("name_txt_de"), Some("Stiefel"));
        assert!(doc.text("shortdescription_txt_de").is_none());
        assert_eq!(doc.sku.as_deref(), Some("SKU-7"));
        assert_eq!(doc.product_type.as_deref(), Some("SimpleProduct"));
        assert_eq!(doc.all_categories, vec!["1", "4"]);
        assert_eq!(doc.specification_options(), vec![(3, vec![30])]);
        assert_eq!(doc.field_values("attr_Color"), vec!["Red"]);
        assert!(!doc.other_fields.contains_key("attr_SA8"));
    }

    #[tokio::test]
    async fn test_permissions_disable_buttons() {
        let mut ctx = context();
        ctx.permissions.display_prices = false;
        ctx.permissions.compare_products_enabled = false;
        let doc = build_document(&product(1, "Shoe"), &ctx, &catalog()).await.unwrap();
        assert!(doc.disable_buy_button);
        assert!(doc.disable_wishlist_button);
        assert!(doc.disable_add_to_compare_list_button);
    }

    #[tokio::test]
    async fn test_invalid_id_rejected() {
        let err = build_document(&product(0, "Ghost"), &context(), &catalog())
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::InvalidProduct { id: 0, .. }));
    }

    #[tokio::test]
    async fn test_reindex_replaces_index_and_skips_unpublished() {
        let store = InMemoryStore::with_documents(vec![ProductDocument {
            id: 99,
            ..Default::default()
        }]);
        let mut hidden = product(2, "Hidden");
        hidden.published = false;
        let report = reindex_all(&store, &catalog(), &[product(1, "Shoe"), hidden], &context())
            .await
            .unwrap();
        assert_eq!(
            report,
            ReindexReport {
                total: 2,
                indexed: 1,
                skipped_unpublished: 1
            }
        );
        assert_eq!(store.len(), 1);
        assert!(store.get(1).is_some());
        assert!(store.get(99).is_none());
    }

    #[tokio::test]
    async fn test_change_events() {
        let store = InMemoryStore::new();
        let lookup = catalog();
        let ctx = context();

        apply_product_change(&store, &lookup, &ProductChange::Added(product(1, "Shoe")), &ctx)
            .await
            .unwrap();
        assert_eq!(store.get(1).unwrap().text("name_txt_en"), Some("Shoe"));

        apply_product_change(&store, &lookup, &ProductChange::Edited(product(1, "Sneaker")), &ctx)
            .await
            .unwrap();
        assert_eq!(store.get(1).unwrap().text("name_txt_en"), Some("Sneaker"));

        let mut unpublished = product(1, "Sneaker");
        unpublished.published = false;
        apply_product_change(&store, &lookup, &ProductChange::Edited(unpublished), &ctx)
            .await
            .unwrap();
        assert!(store.get(1).is_none());

        apply_product_change(&store, &lookup, &ProductChange::Added(product(2, "Boot")), &ctx)
            .await
            .unwrap();
        apply_product_change(&store, &lookup, &ProductChange::Deleted(2), &ctx)
            .await
            .unwrap();
        assert!(store.is_empty());
    }
}
