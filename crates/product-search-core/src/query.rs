//! Query trees and request options handed to a [`SearchStore`](crate::store::SearchStore).
//!
//! These types are the narrow contract between the composer and any store
//! client. They carry enough structure for the in-memory store to evaluate
//! them directly, and render to standard Lucene/Solr syntax for HTTP
//! clients via [`QueryTree::render`], [`FilterClause::render`] and
//! [`FacetRequest::field_param`].

use std::time::Duration;

use serde::Serialize;

use crate::fields;

/// How a clause's value is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClauseKind {
    /// Literal text, quoted and escaped.
    Term,
    /// Unquoted value containing `*`.
    Wildcard,
    /// Unquoted value ending in `~` or `~<distance>`.
    Fuzzy,
    /// Quoted phrase, optionally followed by `~<slop>`, passed through raw.
    Phrase,
}

/// One boosted field clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldQuery {
    pub field: String,
    pub value: String,
    pub kind: ClauseKind,
    /// `0.0` renders without a boost operator.
    pub boost: f64,
}

impl FieldQuery {
    pub fn term(field: impl Into<String>, value: impl Into<String>, boost: f64) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            kind: ClauseKind::Term,
            boost,
        }
    }

    pub fn raw(
        field: impl Into<String>,
        value: impl Into<String>,
        kind: ClauseKind,
        boost: f64,
    ) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            kind,
            boost,
        }
    }

    /// Render as `field:("value")` (terms) or `field:(value)` (expansions),
    /// wrapped as `(...)^boost` when boosted.
    pub fn render(&self) -> String {
        let body = match self.kind {
            ClauseKind::Term => format!("{}:(\"{}\")", self.field, escape_quoted(&self.value)),
            _ => format!("{}:({})", self.field, self.value),
        };
        if self.boost != 0.0 {
            format!("({})^{}", body, self.boost)
        } else {
            body
        }
    }
}

/// A disjunctive query: any clause may match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QueryTree {
    /// Every document matches (`*:*`).
    MatchAll,
    /// Clauses combined with OR.
    AnyOf(Vec<FieldQuery>),
}

impl QueryTree {
    pub fn render(&self) -> String {
        match self {
            QueryTree::MatchAll => "*:*".to_string(),
            QueryTree::AnyOf(clauses) if clauses.is_empty() => "*:*".to_string(),
            QueryTree::AnyOf(clauses) => clauses
                .iter()
                .map(FieldQuery::render)
                .collect::<Vec<_>>()
                .join(" OR "),
        }
    }

    pub fn clauses(&self) -> &[FieldQuery] {
        match self {
            QueryTree::MatchAll => &[],
            QueryTree::AnyOf(clauses) => clauses,
        }
    }
}

/// A tagged filter restricting one facet field to any of the selected values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterClause {
    /// Facet name, used as the exclusion tag.
    pub tag: String,
    /// Physical multi-value field (`attr_<facet>`).
    pub field: String,
    pub values: Vec<String>,
}

impl FilterClause {
    pub fn for_facet(facet: &str, values: Vec<String>) -> Self {
        Self {
            tag: facet.to_string(),
            field: fields::facet_field_name(facet),
            values,
        }
    }

    /// `{!tag=SA3 mincount=1}attr_SA3:("10" OR "11")`
    pub fn render(&self) -> String {
        let values = self
            .values
            .iter()
            .map(|v| format!("\"{}\"", escape_quoted(v)))
            .collect::<Vec<_>>()
            .join(" OR ");
        format!(
            "{{!tag={} mincount=1}}{}:({})",
            self.tag, self.field, values
        )
    }
}

/// Facet counts to compute, each excluding its own filter tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacetRequest {
    /// Facet names (without the `attr_` prefix).
    pub facets: Vec<String>,
    /// Minimum count for a value to be returned (0 or 1).
    pub min_count: u32,
}

impl FacetRequest {
    /// `{!ex=allcategories}attr_allcategories`
    pub fn field_param(facet: &str) -> String {
        format!("{{!ex={}}}{}", facet, fields::facet_field_name(facet))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightRequest {
    pub fields: Vec<String>,
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpellcheckRequest {
    pub collate: bool,
    pub only_more_popular: bool,
}

/// Global options for one store call. Identical across both search phases.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOptions {
    /// Maximum number of documents returned.
    pub rows: usize,
    /// Filter clauses, combined with AND.
    pub filters: Vec<FilterClause>,
    pub facets: Option<FacetRequest>,
    pub highlight: Option<HighlightRequest>,
    pub spellcheck: Option<SpellcheckRequest>,
    /// Deadline for the store round-trip.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl QueryOptions {
    pub fn with_rows(rows: usize) -> Self {
        Self {
            rows,
            filters: Vec::new(),
            facets: None,
            highlight: None,
            spellcheck: None,
            timeout: None,
        }
    }
}

fn escape_quoted(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_clause_is_quoted_and_boosted() {
        let q = FieldQuery::term("name_txt_en", "red \"shoe\"", 2.0);
        assert_eq!(q.render(), r#"(name_txt_en:("red \"shoe\""))^2"#);
    }

    #[test]
    fn test_zero_boost_renders_bare() {
        let q = FieldQuery::term("sku_t", "A-1", 0.0);
        assert_eq!(q.render(), r#"sku_t:("A-1")"#);
    }

    #[test]
    fn test_raw_clause_is_unquoted() {
        let q = FieldQuery::raw("name_txt_en", "shoe*", ClauseKind::Wildcard, 0.5);
        assert_eq!(q.render(), "(name_txt_en:(shoe*))^0.5");
    }

    #[test]
    fn test_tree_joins_with_or() {
        let tree = QueryTree::AnyOf(vec![
            FieldQuery::term("a", "x", 0.0),
            FieldQuery::term("b", "x", 0.0),
        ]);
        assert_eq!(tree.render(), r#"a:("x") OR b:("x")"#);
        assert_eq!(QueryTree::MatchAll.render(), "*:*");
    }

    #[test]
    fn test_filter_clause_render() {
        let f = FilterClause::for_facet("SA3", vec!["10".into(), "11".into()]);
        assert_eq!(f.field, "attr_SA3");
        assert_eq!(
            f.render(),
            r#"{!tag=SA3 mincount=1}attr_SA3:("10" OR "11")"#
        );
    }

    #[test]
    fn test_facet_field_param_excludes_own_tag() {
        assert_eq!(
            FacetRequest::field_param("allcategories"),
            "{!ex=allcategories}attr_allcategories"
        );
    }
}
