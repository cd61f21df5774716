use anyhow::Result;
use product_search_core::assembler::SearchResponseModel;
use product_search_core::search::{search_products, SearchContext, SearchRequest};

use crate::catalog::load_catalog;
use crate::config::Config;
use crate::solr::SolrClient;

/// `sps search`: run one product search against Solr and print it.
pub async fn run_search(
    config: &Config,
    query: &str,
    language: Option<String>,
    facets: Option<String>,
    json: bool,
) -> Result<()> {
    let store = SolrClient::new(&config.solr)?;
    let catalog = load_catalog(&config.catalog.path)?;

    let request = SearchRequest {
        q: query.to_string(),
        language,
        facets: facets.unwrap_or_default(),
        return_facets: None,
    };
    let context = SearchContext {
        working_language: None,
        timeout: Some(config.server.request_timeout()),
    };

    let response = search_products(&store, &catalog, &request, &context, &config.search).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response);
    }
    Ok(())
}

fn print_response(response: &SearchResponseModel) {
    if response.no_results {
        println!("No results.");
        if let Some(ref suggestion) = response.suggestion {
            println!("Did you mean: {}", suggestion);
        }
        return;
    }

    for (i, product) in response.products.iter().enumerate() {
        println!("{}. {} (id {})", i + 1, product.name, product.id);
        if let Some(ref sku) = product.sku {
            println!("    sku: {}", sku);
        }
        if !product.short_description.is_empty() {
            println!(
                "    excerpt: \"{}\"",
                product.short_description.replace('\n', " ").trim()
            );
        }
        if !product.se_name.is_empty() {
            println!("    url: /{}", product.se_name);
        }
        println!();
    }

    for facet in &response.product_facets {
        println!("{} [{}]", facet.facet_display_name, facet.facet_name);
        for value in &facet.facet_values {
            let marker = if value.filter_active { "*" } else { " " };
            println!(
                "  {} {} ({}) = {}",
                marker, value.option_display_name, value.option_product_count, value.option_name
            );
        }
    }

    println!(
        "{} of {} products, language {}",
        response.products.len(),
        response.total,
        response.language
    );
    if let Some(ref suggestion) = response.suggestion {
        println!("Did you mean: {}", suggestion);
    }
}
