//! Index maintenance commands: full rebuild and single-product updates.

use anyhow::{bail, Result};
use product_search_core::indexing::{self, ReindexReport};
use product_search_core::store::SearchStore;

use crate::catalog::{load_catalog, CatalogFile};
use crate::config::Config;
use crate::solr::SolrClient;

/// What happened to a single product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductIndexOutcome {
    Indexed,
    /// Unpublished products are removed instead of indexed.
    Removed,
}

pub async fn rebuild<S: SearchStore + ?Sized>(
    store: &S,
    catalog: &CatalogFile,
    config: &Config,
) -> Result<ReindexReport> {
    let context = catalog.indexing_context(config);
    let report = indexing::reindex_all(store, catalog, &catalog.products, &context).await?;
    Ok(report)
}

pub async fn index_product<S: SearchStore + ?Sized>(
    store: &S,
    catalog: &CatalogFile,
    config: &Config,
    id: i64,
) -> Result<ProductIndexOutcome> {
    let Some(product) = catalog.product(id) else {
        bail!("product {} not found in catalog", id);
    };
    let context = catalog.indexing_context(config);
    indexing::add_or_update_product(store, catalog, product, &context).await?;
    Ok(if product.published {
        ProductIndexOutcome::Indexed
    } else {
        ProductIndexOutcome::Removed
    })
}

pub async fn remove_product<S: SearchStore + ?Sized>(store: &S, id: i64) -> Result<()> {
    indexing::delete_product(store, id).await?;
    Ok(())
}

/// `sps index rebuild`
pub async fn run_rebuild(config: &Config) -> Result<()> {
    let store = SolrClient::new(&config.solr)?;
    let catalog = load_catalog(&config.catalog.path)?;
    let started = chrono::Utc::now();

    let report = rebuild(&store, &catalog, config).await?;

    let elapsed = chrono::Utc::now() - started;
    println!("Rebuilt index at {}", store.core_url());
    println!("  products:            {}", report.total);
    println!("  indexed:             {}", report.indexed);
    println!("  skipped unpublished: {}", report.skipped_unpublished);
    println!("  took:                {}ms", elapsed.num_milliseconds());
    Ok(())
}

/// `sps index add <id>`
pub async fn run_add(config: &Config, id: i64) -> Result<()> {
    let store = SolrClient::new(&config.solr)?;
    let catalog = load_catalog(&config.catalog.path)?;
    match index_product(&store, &catalog, config, id).await? {
        ProductIndexOutcome::Indexed => println!("Indexed product {}.", id),
        ProductIndexOutcome::Removed => {
            println!("Product {} is unpublished; removed from index.", id)
        }
    }
    Ok(())
}

/// `sps index delete <id>`
pub async fn run_delete(config: &Config, id: i64) -> Result<()> {
    let store = SolrClient::new(&config.solr)?;
    remove_product(&store, id).await?;
    println!("Removed product {} from index.", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use product_search_core::store::memory::InMemoryStore;

    fn config() -> Config {
        toml::from_str(
            r#"
[solr]
url = "http://localhost:8983/solr"

[catalog]
path = "catalog.json"
"#,
        )
        .unwrap()
    }

    fn catalog() -> CatalogFile {
        serde_json::from_str(
            r#"{
                "languages": ["en-US"],
                "products": [
                    { "id": 1, "name": "Running shoe" },
                    { "id": 2, "name": "Hidden", "published": false }
                ]
            }"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_rebuild_and_single_updates() {
        let store = InMemoryStore::new();
        let catalog = catalog();
        let config = config();

        let report = rebuild(&store, &catalog, &config).await.unwrap();
        assert_eq!(report.indexed, 1);
        assert_eq!(store.len(), 1);

        assert_eq!(
            index_product(&store, &catalog, &config, 2).await.unwrap(),
            ProductIndexOutcome::Removed
        );
        assert!(index_product(&store, &catalog, &config, 99).await.is_err());

        remove_product(&store, 1).await.unwrap();
        assert!(store.is_empty());
    }
}
