//! Query composition and two-phase execution.
//!
//! # Algorithm
//!
//! 1. Trim the query. Empty input is rejected, or rewritten to match-all
//!    when `allow_empty_search_query` is set.
//! 2. Resolve the language: explicit request language, then the caller's
//!    working language, then the configured default.
//! 3. **Phase 1**: OR together localized name / short / full description
//!    clauses plus static SKU and GTIN clauses, each with its boost, and
//!    append the wildcard, fuzzy and phrase expansions that apply.
//! 4. If phase 1 has no hits, rebuild the same clause set against the
//!    default-language copies (`_default_txt_<defaultLang>`) and run
//!    **phase 2**, whose result is returned even when empty.
//!
//! Both phases share one [`QueryOptions`] value, so filters, facets,
//! highlighting and spellcheck are identical. Hero pinning is applied to
//! whichever result is returned.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::SearchError;
use crate::facets::FacetSelection;
use crate::fields;
use crate::query::{
    ClauseKind, FacetRequest, FieldQuery, HighlightRequest, QueryOptions, QueryTree,
    SpellcheckRequest,
};
use crate::ranker;
use crate::settings::{FuzzyConfig, PhraseConfig, SearchSettings, WildcardConfig, WildcardPlacement};
use crate::store::{RawSearchResult, SearchStore};

/// Query text standing in for "everything".
pub const MATCH_ALL: &str = "*:*";
const WILDCARD_OPERATOR: char = '*';
const FUZZY_OPERATOR: char = '~';

/// Which clause set produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Requested-language fields.
    Localized,
    /// Default-language fallback fields.
    Default,
}

/// Inputs for one execution of [`execute_search`].
#[derive(Debug, Clone)]
pub struct SearchInput<'a> {
    pub query: &'a str,
    /// Explicit language from the request (short key or culture tag).
    pub language: Option<&'a str>,
    /// Caller's working language (short key or culture tag).
    pub working_language: Option<&'a str>,
    pub selection: &'a FacetSelection,
    /// Facet names to compute counts for; `None` requests no facets.
    pub return_facets: Option<&'a [String]>,
    pub timeout: Option<Duration>,
}

/// Result of a two-phase search.
#[derive(Debug, Clone)]
pub struct PhasedResult {
    pub result: RawSearchResult,
    /// Language key the localized phase ran with.
    pub language: String,
    pub phase: Phase,
}

/// Normalise the raw query: trimmed text, or the match-all sentinel.
pub fn prepare_query(raw: &str, allow_empty: bool) -> Result<String, SearchError> {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        return Ok(trimmed.to_string());
    }
    if allow_empty {
        Ok(MATCH_ALL.to_string())
    } else {
        Err(SearchError::EmptyQuery)
    }
}

/// Effective short language key for a request.
pub fn resolve_language(
    explicit: Option<&str>,
    working: Option<&str>,
    default_language: &str,
) -> String {
    [explicit, working]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|lang| !lang.is_empty())
        .map(fields::language_key)
        .unwrap_or(default_language)
        .to_lowercase()
}

/// Wildcard-expanded input, if the expansion applies.
pub fn wildcard_value(query: &str, config: &WildcardConfig) -> Option<String> {
    if !config.enabled
        || query.chars().count() < config.min_length
        || query.ends_with(WILDCARD_OPERATOR)
    {
        return None;
    }
    Some(match config.placement {
        WildcardPlacement::Postfix => format!("{}*", query),
        WildcardPlacement::Prefix => format!("*{}", query),
        WildcardPlacement::Both => format!("*{}*", query),
    })
}

/// Fuzzy-expanded input (`term~` or `term~<distance>`), if the expansion applies.
pub fn fuzzy_value(query: &str, config: &FuzzyConfig) -> Option<String> {
    if !config.enabled
        || query.chars().count() < config.min_length
        || query.ends_with(FUZZY_OPERATOR)
    {
        return None;
    }
    Some(match config.fuzziness {
        Some(distance) => format!("{}~{}", query, distance),
        None => format!("{}~", query),
    })
}

/// Quoted phrase (`"a b"` or `"a b"~<slop>`), if phrase search is enabled.
pub fn phrase_value(query: &str, config: &PhraseConfig) -> Option<String> {
    if !config.enabled {
        return None;
    }
    // quotes and backslashes would unbalance the quoted phrase
    let phrase = query.replace(['"', '\\'], "");
    Some(match config.proximity {
        Some(slop) => format!("\"{}\"~{}", phrase, slop),
        None => format!("\"{}\"", phrase),
    })
}

/// Build the disjunctive clause set for one language variant.
///
/// With `is_default` the localized fields switch to the default-language
/// copies and `language` is ignored in favour of the configured default.
pub fn compose_query(
    query: &str,
    language: &str,
    is_default: bool,
    settings: &SearchSettings,
) -> QueryTree {
    if query == MATCH_ALL {
        return QueryTree::MatchAll;
    }

    let language = if is_default {
        settings.default_language.as_str()
    } else {
        language
    };
    let name_field = fields::localized_field_name(fields::NAME, language, is_default);
    let boost = &settings.boost;

    let mut clauses = vec![
        FieldQuery::term(&name_field, query, boost.product_name),
        FieldQuery::term(
            fields::localized_field_name(fields::SHORT_DESCRIPTION, language, is_default),
            query,
            boost.short_description,
        ),
        FieldQuery::term(
            fields::localized_field_name(fields::FULL_DESCRIPTION, language, is_default),
            query,
            boost.full_description,
        ),
        FieldQuery::term(fields::static_field_name(fields::SKU), query, boost.sku),
        FieldQuery::term(fields::static_field_name(fields::GTIN), query, boost.gtin),
    ];

    if let Some(value) = wildcard_value(query, &settings.wildcard) {
        clauses.push(FieldQuery::raw(
            &name_field,
            value,
            ClauseKind::Wildcard,
            settings.wildcard.boost,
        ));
    }
    if let Some(value) = fuzzy_value(query, &settings.fuzzy) {
        clauses.push(FieldQuery::raw(
            &name_field,
            value,
            ClauseKind::Fuzzy,
            settings.fuzzy.boost,
        ));
    }
    if let Some(value) = phrase_value(query, &settings.phrase) {
        clauses.push(FieldQuery::raw(
            &name_field,
            value,
            ClauseKind::Phrase,
            settings.phrase.boost,
        ));
    }

    QueryTree::AnyOf(clauses)
}

/// Store options shared by both phases.
pub fn build_options(
    selection: &FacetSelection,
    return_facets: Option<&[String]>,
    language: &str,
    settings: &SearchSettings,
    timeout: Option<Duration>,
) -> QueryOptions {
    let mut options = QueryOptions::with_rows(settings.max_returned_documents);
    options.filters = selection.filter_clauses();
    options.timeout = timeout;

    if let Some(facets) = return_facets {
        options.facets = Some(FacetRequest {
            facets: facets.to_vec(),
            min_count: u32::from(settings.facets.hide_options_with_no_count),
        });
    }

    if settings.highlighting.enabled {
        options.highlight = Some(HighlightRequest {
            fields: vec![
                fields::localized_field_name(fields::NAME, &settings.default_language, true),
                fields::localized_field_name(fields::NAME, language, false),
            ],
            before: settings.highlighting.before.clone(),
            after: settings.highlighting.after.clone(),
        });
    }

    if settings.spellcheck.enabled {
        options.spellcheck = Some(SpellcheckRequest {
            collate: true,
            only_more_popular: settings.spellcheck.only_more_popular,
        });
    }

    options
}

/// Run the localized phase, falling back to the default-language phase
/// when it yields no hits.
///
/// Store failures propagate as [`SearchError::BackendUnavailable`] (or
/// [`SearchError::DeadlineExceeded`]); nothing is retried here. The input
/// timeout is one deadline covering both phases.
pub async fn execute_search<S: SearchStore + ?Sized>(
    store: &S,
    input: &SearchInput<'_>,
    settings: &SearchSettings,
) -> Result<PhasedResult, SearchError> {
    let query = prepare_query(input.query, settings.allow_empty_search_query)?;
    let started = Instant::now();
    let language = resolve_language(
        input.language,
        input.working_language,
        &settings.default_language,
    );
    let options = build_options(
        input.selection,
        input.return_facets,
        &language,
        settings,
        input.timeout,
    );
    let heroes = if settings.enable_hero_products {
        ranker::parse_hero_products(&settings.hero_products)
    } else {
        Vec::new()
    };

    let localized = compose_query(&query, &language, false, settings);
    tracing::debug!(
        phase = "localized",
        language = %language,
        query = %localized.render(),
        filters = options.filters.len(),
        "composed product query"
    );
    let mut result = run_phase(store, &localized, &options).await?;
    ranker::pin_documents(&mut result.documents, &heroes);

    if !result.is_empty() {
        tracing::debug!(hits = result.documents.len(), "localized phase matched");
        return Ok(PhasedResult {
            result,
            language,
            phase: Phase::Localized,
        });
    }

    let fallback = compose_query(&query, &language, true, settings);
    tracing::info!(
        language = %language,
        default_language = %settings.default_language,
        "no localized hits, falling back to default language"
    );
    tracing::debug!(phase = "default", query = %fallback.render(), "composed product query");
    // the fallback only gets what the localized phase left of the deadline
    let mut options = options;
    if let Some(timeout) = input.timeout {
        let remaining = timeout.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            tracing::error!("search deadline spent before the default-language phase");
            return Err(SearchError::DeadlineExceeded);
        }
        options.timeout = Some(remaining);
    }
    let mut result = run_phase(store, &fallback, &options).await?;
    ranker::pin_documents(&mut result.documents, &heroes);

    Ok(PhasedResult {
        result,
        language,
        phase: Phase::Default,
    })
}

async fn run_phase<S: SearchStore + ?Sized>(
    store: &S,
    query: &QueryTree,
    options: &QueryOptions,
) -> Result<RawSearchResult, SearchError> {
    store.query(query, options).await.map_err(|err| {
        tracing::error!(error = %err, "product search store call failed");
        SearchError::from(err)
    })
}
