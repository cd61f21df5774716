//! Search tuning settings, decoupled from application config.
//!
//! The application deserializes these from the `[search]` table of its
//! TOML file and hands the same immutable value to every request. Every
//! field has a default so a bare `[search]` table is valid.

use serde::Deserialize;

/// All knobs the query composer, facet translator, ranker and assembler read.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    /// Rewrite an empty query to match-all instead of rejecting it.
    pub allow_empty_search_query: bool,
    /// Short key of the default language (`"en"`), used by the fallback phase.
    pub default_language: String,
    /// Result cap passed to the store.
    pub max_returned_documents: usize,
    pub enable_hero_products: bool,
    /// Comma-separated hero product ids, in display order (`"5,2"`).
    pub hero_products: String,
    pub boost: BoostConfig,
    pub wildcard: WildcardConfig,
    pub fuzzy: FuzzyConfig,
    pub phrase: PhraseConfig,
    pub facets: FacetConfig,
    pub highlighting: HighlightConfig,
    pub spellcheck: SpellcheckConfig,
    pub results: ResultConfig,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            allow_empty_search_query: false,
            default_language: "en".to_string(),
            max_returned_documents: 100,
            enable_hero_products: false,
            hero_products: String::new(),
            boost: BoostConfig::default(),
            wildcard: WildcardConfig::default(),
            fuzzy: FuzzyConfig::default(),
            phrase: PhraseConfig::default(),
            facets: FacetConfig::default(),
            highlighting: HighlightConfig::default(),
            spellcheck: SpellcheckConfig::default(),
            results: ResultConfig::default(),
        }
    }
}

/// Per-field boosts. `0.0` means neutral: no boost operator is emitted.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct BoostConfig {
    pub product_name: f64,
    pub short_description: f64,
    pub full_description: f64,
    pub sku: f64,
    pub gtin: f64,
}

/// Where the wildcard operator goes when expanding the input.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WildcardPlacement {
    /// `shoe*`
    #[default]
    Postfix,
    /// `*shoe`
    Prefix,
    /// `*shoe*`
    Both,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct WildcardConfig {
    pub enabled: bool,
    pub boost: f64,
    pub min_length: usize,
    pub placement: WildcardPlacement,
}

impl Default for WildcardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            boost: 0.0,
            min_length: 3,
            placement: WildcardPlacement::Postfix,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FuzzyConfig {
    pub enabled: bool,
    pub boost: f64,
    /// Edit distance appended after `~`; the engine default applies when unset.
    pub fuzziness: Option<u8>,
    pub min_length: usize,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            boost: 0.0,
            fuzziness: None,
            min_length: 4,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhraseConfig {
    pub enabled: bool,
    pub boost: f64,
    /// Slop appended as `~<n>` after the quoted phrase.
    pub proximity: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FacetConfig {
    pub include_categories: bool,
    pub include_manufacturers: bool,
    pub include_specification_attributes: bool,
    /// Restricts specification-attribute facets to these attribute ids when non-empty.
    pub selected_specification_attribute_ids: Vec<i64>,
    /// Request a facet minimum count of 1 instead of 0.
    pub hide_options_with_no_count: bool,
    /// Facet names allowed in requests and responses; empty allows all.
    pub allow_list: Vec<String>,
}

impl FacetConfig {
    /// Whether a facet passes the administrator allow-list.
    pub fn is_allowed(&self, facet: &str) -> bool {
        self.allow_list.is_empty() || self.allow_list.iter().any(|f| f == facet)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HighlightConfig {
    pub enabled: bool,
    pub before: String,
    pub after: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            before: "<b>".to_string(),
            after: "</b>".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpellcheckConfig {
    pub enabled: bool,
    pub only_more_popular: bool,
}

/// Inclusion toggles for the result model.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResultConfig {
    pub prepare_price_model: bool,
    pub prepare_picture_model: bool,
    pub prepare_specification_attributes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_neutral() {
        let s = SearchSettings::default();
        assert!(!s.allow_empty_search_query);
        assert_eq!(s.default_language, "en");
        assert_eq!(s.boost, BoostConfig::default());
        assert_eq!(s.boost.product_name, 0.0);
        assert_eq!(s.wildcard.placement, WildcardPlacement::Postfix);
        assert!(!s.wildcard.enabled && !s.fuzzy.enabled && !s.phrase.enabled);
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let s: SearchSettings = serde_json::from_value(serde_json::json!({
            "default_language": "de",
            "wildcard": { "enabled": true, "placement": "both" },
            "boost": { "sku": 3.5 }
        }))
        .unwrap();
        assert_eq!(s.default_language, "de");
        assert!(s.wildcard.enabled);
        assert_eq!(s.wildcard.placement, WildcardPlacement::Both);
        assert_eq!(s.wildcard.min_length, 3);
        assert_eq!(s.boost.sku, 3.5);
        assert_eq!(s.max_returned_documents, 100);
    }

    #[test]
    fn test_allow_list() {
        let mut facets = FacetConfig::default();
        assert!(facets.is_allowed("allcategories"));
        facets.allow_list = vec!["SA3".into()];
        assert!(facets.is_allowed("SA3"));
        assert!(!facets.is_allowed("allcategories"));
    }
}
