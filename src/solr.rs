//! Solr HTTP client implementing the core [`SearchStore`] trait.
//!
//! Queries go to `POST {url}/{core}/select` as form-encoded parameters so
//! long filter lists never hit URL length limits. Writes go to
//! `POST {url}/{core}/update` as JSON commands.
//!
//! # Retry strategy
//!
//! - HTTP 429 or 5xx → retry with exponential backoff (1s, 2s, 4s, … capped at 32s)
//! - HTTP 4xx (not 429) → fail immediately with [`StoreError::Protocol`]
//! - Network error → retry
//! - Timeout → fail immediately with [`StoreError::Timeout`]
//!
//! A query's `timeout` is one deadline for the whole call: attempts share
//! it and a retry that cannot start before it expires fails with
//! [`StoreError::Timeout`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use product_search_core::document::ProductDocument;
use product_search_core::error::StoreError;
use product_search_core::query::{FacetRequest, QueryOptions, QueryTree};
use product_search_core::store::{FacetCount, FacetField, Highlights, RawSearchResult, SearchStore};
use serde_json::{json, Value};
use tokio::time::Instant;

use crate::config::SolrConfig;

/// HTTP client for one Solr core.
#[derive(Clone)]
pub struct SolrClient {
    http: reqwest::Client,
    core_url: String,
    max_retries: u32,
    retry_base: Duration,
    attempt_timeout: Duration,
}

impl SolrClient {
    pub fn new(config: &SolrConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            http,
            core_url: config.core_url(),
            max_retries: config.max_retries,
            retry_base: Duration::from_secs(1),
            attempt_timeout: config.timeout(),
        })
    }

    /// Override the first backoff delay (doubles on each retry).
    pub fn with_retry_base(mut self, base: Duration) -> Self {
        self.retry_base = base;
        self
    }

    pub fn core_url(&self) -> &str {
        &self.core_url
    }

    /// Send a request built by `build`, retrying transient failures.
    ///
    /// With a `deadline`, every attempt gets the time that is left (capped at
    /// `solr.timeout_secs`) and no retry or backoff sleep starts once it would run past the deadline.
    async fn send<F>(&self, deadline: Option<Instant>, build: F) -> Result<Value, StoreError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_base * (1u32 << (attempt - 1).min(5));
                if deadline.is_some_and(|d| Instant::now() + delay >= d) {
                    tracing::warn!(attempt, "solr deadline reached, giving up retries");
                    return Err(StoreError::Timeout);
                }
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying solr request");
                tokio::time::sleep(delay).await;
            }

            let request = match deadline {
                Some(d) => {
                    let remaining = d.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(StoreError::Timeout);
                    }
                    build().timeout(remaining.min(self.attempt_timeout))
                }
                None => build(),
            };

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response.json::<Value>().await.map_err(|e| {
                            if e.is_timeout() {
                                StoreError::Timeout
                            } else {
                                StoreError::Decode(e.to_string())
                            }
                        });
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = StoreError::Protocol {
                        status: status.as_u16(),
                        message: solr_error_message(&body_text),
                    };

                    // rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        tracing::warn!(status = status.as_u16(), attempt, "solr request failed");
                        last_err = Some(err);
                        continue;
                    }

                    return Err(err);
                }
                Err(e) if e.is_timeout() => return Err(StoreError::Timeout),
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "solr unreachable");
                    last_err = Some(StoreError::Unavailable(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| StoreError::Unavailable("solr request failed".to_string())))
    }

    async fn update(&self, body: Value) -> Result<(), StoreError> {
        let url = format!("{}/update", self.core_url);
        self.send(None, || {
            self.http
                .post(&url)
                .query(&[("wt", "json")])
                .json(&body)
        })
        .await
        .map(|_| ())
    }
}

/// Pull `error.msg` out of a Solr error body, falling back to the raw text.
fn solr_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/msg").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(500).collect())
}

/// Form parameters for a `/select` request.
pub fn select_params(query: &QueryTree, options: &QueryOptions) -> Vec<(String, String)> {
    let mut params = vec![
        ("q".to_string(), query.render()),
        ("rows".to_string(), options.rows.to_string()),
        ("wt".to_string(), "json".to_string()),
        ("json.nl".to_string(), "flat".to_string()),
    ];

    for filter in &options.filters {
        params.push(("fq".to_string(), filter.render()));
    }

    if let Some(facets) = &options.facets {
        params.push(("facet".to_string(), "true".to_string()));
        params.push(("facet.mincount".to_string(), facets.min_count.to_string()));
        for facet in &facets.facets {
            params.push(("facet.field".to_string(), FacetRequest::field_param(facet)));
        }
    }

    if let Some(hl) = &options.highlight {
        params.push(("hl".to_string(), "true".to_string()));
        params.push(("hl.fl".to_string(), hl.fields.join(",")));
        params.push(("hl.simple.pre".to_string(), hl.before.clone()));
        params.push(("hl.simple.post".to_string(), hl.after.clone()));
    }

    if let Some(sc) = &options.spellcheck {
        params.push(("spellcheck".to_string(), "true".to_string()));
        params.push(("spellcheck.collate".to_string(), sc.collate.to_string()));
        params.push((
            "spellcheck.onlyMorePopular".to_string(),
            sc.only_more_popular.to_string(),
        ));
    }

    params
}

/// Parse a `/select` JSON response.
///
/// Facet fields come back in the order they were requested.
pub fn parse_select_response(
    json: &Value,
    options: &QueryOptions,
) -> Result<RawSearchResult, StoreError> {
    let response = json
        .get("response")
        .ok_or_else(|| StoreError::Decode("missing response object".to_string()))?;

    let documents = response
        .get("docs")
        .and_then(Value::as_array)
        .map(|docs| {
            docs.iter()
                .map(|d| {
                    serde_json::from_value::<ProductDocument>(d.clone())
                        .map_err(|e| StoreError::Decode(format!("bad document: {}", e)))
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?
        .unwrap_or_default();

    let num_found = response
        .get("numFound")
        .and_then(Value::as_u64)
        .unwrap_or(documents.len() as u64);

    let mut facet_fields = Vec::new();
    if let Some(request) = &options.facets {
        let counts = json.pointer("/facet_counts/facet_fields");
        for facet in &request.facets {
            let field = product_search_core::fields::facet_field_name(facet);
            let values = counts
                .and_then(|c| c.get(&field))
                .map(parse_facet_counts)
                .unwrap_or_default();
            facet_fields.push(FacetField { field, values });
        }
    }

    let highlights: Highlights = json
        .get("highlighting")
        .and_then(Value::as_object)
        .map(|by_id| {
            by_id
                .iter()
                .map(|(id, fields)| {
                    let per_field: HashMap<String, Vec<String>> = fields
                        .as_object()
                        .map(|f| {
                            f.iter()
                                .map(|(name, frags)| (name.clone(), string_list(frags)))
                                .filter(|(_, frags)| !frags.is_empty())
                                .collect()
                        })
                        .unwrap_or_default();
                    (id.clone(), per_field)
                })
                .collect()
        })
        .unwrap_or_default();

    let collation = json
        .pointer("/spellcheck/collations")
        .and_then(first_collation);

    Ok(RawSearchResult {
        documents,
        num_found,
        facet_fields,
        highlights,
        collation,
    })
}

/// Solr returns facet counts as a flat `[value, count, value, count, …]` list.
fn parse_facet_counts(value: &Value) -> Vec<FacetCount> {
    match value {
        Value::Array(items) => items
            .chunks(2)
            .filter_map(|pair| match pair {
                [v, c] => Some(FacetCount {
                    value: scalar(v)?,
                    count: c.as_u64()?,
                }),
                _ => None,
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .filter_map(|(v, c)| {
                Some(FacetCount {
                    value: v.clone(),
                    count: c.as_u64()?,
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// First collation from either `["collation", "q", …]` or the extended
/// `["collation", {"collationQuery": "q", …}, …]` shape.
fn first_collation(collations: &Value) -> Option<String> {
    let items = collations.as_array()?;
    items
        .chunks(2)
        .find_map(|pair| match pair {
            [key, value] if key.as_str() == Some("collation") => match value {
                Value::String(q) => Some(q.clone()),
                Value::Object(o) => o
                    .get("collationQuery")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            },
            _ => None,
        })
        .filter(|q| !q.trim().is_empty())
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar).collect(),
        other => scalar(other).into_iter().collect(),
    }
}

#[async_trait]
impl SearchStore for SolrClient {
    async fn query(
        &self,
        query: &QueryTree,
        options: &QueryOptions,
    ) -> Result<RawSearchResult, StoreError> {
        let url = format!("{}/select", self.core_url);
        let params = select_params(query, options);
        let deadline = options.timeout.map(|t| Instant::now() + t);
        let json = self
            .send(deadline, || self.http.post(&url).form(&params))
            .await?;
        parse_select_response(&json, options)
    }

    async fn add(&self, documents: &[ProductDocument]) -> Result<(), StoreError> {
        if documents.is_empty() {
            return Ok(());
        }
        let body =
            serde_json::to_value(documents).map_err(|e| StoreError::Decode(e.to_string()))?;
        self.update(body).await
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), StoreError> {
        self.update(json!({ "delete": { "id": id.to_string() } })).await
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        self.update(json!({ "delete": { "query": "*:*" } })).await
    }

    async fn commit(&self) -> Result<(), StoreError> {
        self.update(json!({ "commit": {} })).await
    }
}
