//! In-memory [`SearchStore`] implementation for tests and local runs.
//!
//! Documents live in a `Vec` behind `std::sync::RwLock`. Writes are staged
//! until [`commit`](SearchStore::commit), like a real engine. Matching is a
//! small approximation of Lucene semantics:
//!
//! - term clauses match when every query token occurs in the field text
//! - wildcard clauses glob-match (`*` only) against individual tokens
//! - fuzzy clauses match tokens within the Levenshtein distance after `~`
//! - phrase clauses match the quoted text as a substring
//!
//! Scores are the sum of matched clause boosts (neutral boosts count as 1).
//! Spellcheck never produces a collation.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::document::ProductDocument;
use crate::error::StoreError;
use crate::fields;
use crate::query::{ClauseKind, FieldQuery, QueryOptions, QueryTree};

use super::{FacetCount, FacetField, RawSearchResult, SearchStore};

enum PendingOp {
    Add(ProductDocument),
    Delete(i64),
    DeleteAll,
}

/// In-memory product index.
pub struct InMemoryStore {
    committed: RwLock<Vec<ProductDocument>>,
    pending: RwLock<Vec<PendingOp>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            committed: RwLock::new(Vec::new()),
            pending: RwLock::new(Vec::new()),
        }
    }

    /// Build a store whose documents are already committed.
    pub fn with_documents(documents: Vec<ProductDocument>) -> Self {
        Self {
            committed: RwLock::new(documents),
            pending: RwLock::new(Vec::new()),
        }
    }

    /// Number of committed documents.
    pub fn len(&self) -> usize {
        self.committed.read().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Committed document by id.
    pub fn get(&self, id: i64) -> Option<ProductDocument> {
        self.committed
            .read()
            .ok()
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Glob match supporting `*` only.
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }
    let mut rest = text;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}

fn split_fuzzy(value: &str) -> (String, usize) {
    match value.rsplit_once('~') {
        Some((term, distance)) => (term.to_lowercase(), distance.parse().unwrap_or(2)),
        None => (value.to_lowercase(), 2),
    }
}

fn phrase_text(value: &str) -> String {
    let inner = value.trim_start_matches('"');
    let end = inner.rfind('"').unwrap_or(inner.len());
    inner[..end].to_lowercase()
}

/// Does a single token satisfy this clause?
fn token_matches(clause: &FieldQuery, token: &str) -> bool {
    match clause.kind {
        ClauseKind::Term => tokens(&clause.value).iter().any(|t| t == token),
        ClauseKind::Wildcard => glob_match(&clause.value.to_lowercase(), token),
        ClauseKind::Fuzzy => {
            let (term, distance) = split_fuzzy(&clause.value);
            strsim::levenshtein(&term, token) <= distance
        }
        ClauseKind::Phrase => tokens(&phrase_text(&clause.value)).iter().any(|t| t == token),
    }
}

fn clause_matches(clause: &FieldQuery, doc: &ProductDocument) -> bool {
    doc.field_values(&clause.field).iter().any(|text| {
        let field_tokens = tokens(text);
        match clause.kind {
            ClauseKind::Term => {
                let wanted = tokens(&clause.value);
                !wanted.is_empty() && wanted.iter().all(|w| field_tokens.contains(w))
            }
            ClauseKind::Phrase => {
                let phrase = phrase_text(&clause.value);
                !phrase.is_empty() && text.to_lowercase().contains(&phrase)
            }
            _ => field_tokens.iter().any(|t| token_matches(clause, t)),
        }
    })
}

fn score(query: &QueryTree, doc: &ProductDocument) -> Option<f64> {
    match query {
        QueryTree::MatchAll => Some(1.0),
        QueryTree::AnyOf(clauses) => {
            let total: f64 = clauses
                .iter()
                .filter(|c| clause_matches(c, doc))
                .map(|c| if c.boost != 0.0 { c.boost } else { 1.0 })
                .sum();
            let matched = clauses.iter().any(|c| clause_matches(c, doc));
            matched.then_some(total)
        }
    }
}

fn passes_filters(doc: &ProductDocument, options: &QueryOptions, excluded_tag: Option<&str>) -> bool {
    options
        .filters
        .iter()
        .filter(|f| Some(f.tag.as_str()) != excluded_tag)
        .all(|f| {
            doc.field_values(&f.field)
                .iter()
                .any(|v| f.values.contains(v))
        })
}

fn highlight_text(text: &str, clauses: &[&FieldQuery], before: &str, after: &str) -> Option<String> {
    let mut changed = false;
    let words: Vec<String> = text
        .split(' ')
        .map(|word| {
            let hit = tokens(word)
                .iter()
                .any(|t| clauses.iter().any(|c| token_matches(c, t)));
            if hit {
                changed = true;
                format!("{}{}{}", before, word, after)
            } else {
                word.to_string()
            }
        })
        .collect();
    changed.then(|| words.join(" "))
}

#[async_trait]
impl SearchStore for InMemoryStore {
    async fn query(
        &self,
        query: &QueryTree,
        options: &QueryOptions,
    ) -> Result<RawSearchResult, StoreError> {
        let docs = self.committed.read().map_err(poisoned)?;

        let mut scored: Vec<(f64, &ProductDocument)> = docs
            .iter()
            .filter(|d| passes_filters(d, options, None))
            .filter_map(|d| score(query, d).map(|s| (s, d)))
            .collect();
        // stable: ties keep index order
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let num_found = scored.len() as u64;
        let documents: Vec<ProductDocument> = scored
            .iter()
            .take(options.rows)
            .map(|(_, d)| (*d).clone())
            .collect();

        let mut facet_fields = Vec::new();
        if let Some(request) = &options.facets {
            for facet in &request.facets {
                let field = fields::facet_field_name(facet);
                let mut counts: BTreeMap<String, u64> = BTreeMap::new();
                for doc in docs.iter() {
                    for value in doc.field_values(&field) {
                        counts.entry(value).or_insert(0);
                    }
                }
                for doc in docs
                    .iter()
                    .filter(|d| passes_filters(d, options, Some(facet)))
                    .filter(|d| score(query, d).is_some())
                {
                    for value in doc.field_values(&field) {
                        *counts.entry(value).or_insert(0) += 1;
                    }
                }
                let mut values: Vec<FacetCount> = counts
                    .into_iter()
                    .filter(|(_, count)| *count >= u64::from(request.min_count))
                    .map(|(value, count)| FacetCount { value, count })
                    .collect();
                values.sort_by(|a, b| b.count.cmp(&a.count).then(a.value.cmp(&b.value)));
                facet_fields.push(FacetField { field, values });
            }
        }

        let mut highlights = HashMap::new();
        if let Some(hl) = &options.highlight {
            for doc in &documents {
                let mut per_field = HashMap::new();
                for field in &hl.fields {
                    let clauses: Vec<&FieldQuery> =
                        query.clauses().iter().filter(|c| &c.field == field).collect();
                    if clauses.is_empty() {
                        continue;
                    }
                    if let Some(fragment) = doc
                        .text(field)
                        .and_then(|text| highlight_text(text, &clauses, &hl.before, &hl.after))
                    {
                        per_field.insert(field.clone(), vec![fragment]);
                    }
                }
                if !per_field.is_empty() {
                    highlights.insert(doc.id.to_string(), per_field);
                }
            }
        }

        Ok(RawSearchResult {
            documents,
            num_found,
            facet_fields,
            highlights,
            collation: None,
        })
    }

    async fn add(&self, documents: &[ProductDocument]) -> Result<(), StoreError> {
        let mut pending = self.pending.write().map_err(poisoned)?;
        pending.extend(documents.iter().cloned().map(PendingOp::Add));
        Ok(())
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), StoreError> {
        self.pending
            .write()
            .map_err(poisoned)?
            .push(PendingOp::Delete(id));
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        self.pending
            .write()
            .map_err(poisoned)?
            .push(PendingOp::DeleteAll);
        Ok(())
    }

    async fn commit(&self) -> Result<(), StoreError> {
        let ops: Vec<PendingOp> = std::mem::take(&mut *self.pending.write().map_err(poisoned)?);
        let mut docs = self.committed.write().map_err(poisoned)?;
        for op in ops {
            match op {
                PendingOp::Add(doc) => match docs.iter_mut().find(|d| d.id == doc.id) {
                    Some(existing) => *existing = doc,
                    None => docs.push(doc),
                },
                PendingOp::Delete(id) => docs.retain(|d| d.id != id),
                PendingOp::DeleteAll => docs.clear(),
            }
        }
        Ok(())
    }
}
