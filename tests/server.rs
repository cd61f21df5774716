//! HTTP API tests: the real router served on an ephemeral port, backed by
//! the in-memory store.

use std::sync::Arc;

use product_search_core::store::memory::InMemoryStore;
use serde_json::{json, Value};
use solr_product_search::catalog::CatalogFile;
use solr_product_search::config::Config;
use solr_product_search::server::{router, AppState};

fn config() -> Config {
    toml::from_str(
        r#"
[solr]
url = "http://localhost:8983/solr"

[catalog]
path = "catalog.json"

[search]
default_language = "en"
enable_hero_products = true
hero_products = "2"

[search.facets]
include_categories = true
"#,
    )
    .unwrap()
}

fn catalog() -> CatalogFile {
    serde_json::from_value(json!({
        "languages": ["en-US", "de-DE"],
        "resources": { "de": { "filtering.categoryfilteredlabel": "Kategorie" } },
        "categories": [
            { "id": 1, "name": "Shoes", "localized": { "de": "Schuhe" } },
            { "id": 2, "name": "Boots", "display_order": 1 }
        ],
        "products": [
            {
                "id": 1,
                "name": "Running shoe",
                "sku": "RS-1",
                "category_ids": [1],
                "localized": { "de": { "name": "Laufschuh" } }
            },
            { "id": 2, "name": "Trail shoe", "category_ids": [1, 2] },
            { "id": 3, "name": "Hidden shoe", "published": false }
        ]
    }))
    .unwrap()
}

/// Serve the router and return its base URL.
async fn spawn_app() -> String {
    let state = AppState {
        config: Arc::new(config()),
        store: Arc::new(InMemoryStore::new()),
        catalog: Arc::new(catalog()),
    };
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn rebuild(base: &str) -> Value {
    let resp = reqwest::Client::new()
        .post(format!("{}/index/rebuild", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn test_health() {
    let base = spawn_app().await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_rebuild_reports_counts() {
    let base = spawn_app().await;
    let report = rebuild(&base).await;
    assert_eq!(report, json!({ "total": 3, "indexed": 2, "skipped_unpublished": 1 }));
}

#[tokio::test]
async fn test_search_falls_back_to_default_language() {
    let base = spawn_app().await;
    rebuild(&base).await;

    let body: Value = reqwest::get(format!("{}/search?q=shoe&lang=de-DE", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["q"], "shoe");
    assert_eq!(body["language"], "de");
    assert_eq!(body["no_results"], false);
    let products = body["products"].as_array().unwrap();
    let ids: Vec<i64> = products.iter().map(|p| p["id"].as_i64().unwrap()).collect();
    // hero product first
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(products[1]["name"], "Laufschuh");
    assert_eq!(products[0]["name"], "Trail shoe");

    let facets = body["product_facets"].as_array().unwrap();
    assert_eq!(facets.len(), 1);
    assert_eq!(facets[0]["facet_name"], "allcategories");
    assert_eq!(facets[0]["facet_display_name"], "Kategorie");
}

#[tokio::test]
async fn test_search_uses_accept_language() {
    let base = spawn_app().await;
    rebuild(&base).await;

    let body: Value = reqwest::Client::new()
        .get(format!("{}/search?q=laufschuh", base))
        .header("Accept-Language", "de-CH,de;q=0.9")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["language"], "de");
    assert_eq!(body["products"][0]["id"], 1);
}

#[tokio::test]
async fn test_search_accepts_storefront_parameter_names() {
    let base = spawn_app().await;
    rebuild(&base).await;

    let body: Value = reqwest::get(format!(
        "{}/search?q=shoe&language=de-DE&facetString=allcategories:2",
        base
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(body["language"], "de");
    assert_eq!(body["products"][0]["id"], 2);
    assert_eq!(body["products"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_search_with_facet_filter() {
    let base = spawn_app().await;
    rebuild(&base).await;

    let body: Value = reqwest::get(format!("{}/search?q=shoe&facets=allcategories:2", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<i64> = body["products"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![2]);

    // the category facet ignores its own filter, so both options stay listed
    let values = body["product_facets"][0]["facet_values"].as_array().unwrap();
    let active: Vec<&Value> = values.iter().filter(|v| v["filter_active"] == true).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0]["option_name"], "2");
    assert_eq!(values.len(), 2);
}

#[tokio::test]
async fn test_empty_query_is_bad_request() {
    let base = spawn_app().await;
    let resp = reqwest::get(format!("{}/search?q=%20%20", base)).await.unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
    assert_eq!(body["error"]["message"], "query must not be empty");
}

#[tokio::test]
async fn test_index_unknown_product_is_not_found() {
    let base = spawn_app().await;
    let resp = reqwest::Client::new()
        .post(format!("{}/index/products/99", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_single_product_updates() {
    let base = spawn_app().await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("{}/index/products/1", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "id": 1, "outcome": "indexed" }));

    let body: Value = client
        .post(format!("{}/index/products/3", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({ "id": 3, "outcome": "removed" }));

    let body: Value = reqwest::get(format!("{}/search?q=shoe", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 1);

    let resp = client
        .delete(format!("{}/index/products/1", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = reqwest::get(format!("{}/search?q=shoe", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["no_results"], true);
    assert_eq!(body["products"], json!([]));
}
