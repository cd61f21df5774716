//! The indexed product record as stored in the search engine.
//!
//! Fixed fields map to their physical names through serde renames; every
//! other field (localized texts, specification-attribute lists) lands in
//! [`ProductDocument::other_fields`].

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::fields;

/// One product as the search engine sees it.
///
/// Owned by the indexing pipeline; the search path only reads it. Replaced
/// wholesale on reindex.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDocument {
    /// Product id, the engine's unique key.
    #[serde(deserialize_with = "de_id")]
    pub id: i64,
    #[serde(rename = "sku_t", default, deserialize_with = "de_text", skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(rename = "gtin_t", default, deserialize_with = "de_text", skip_serializing_if = "Option::is_none")]
    pub gtin: Option<String>,
    #[serde(rename = "producttype_t", default, deserialize_with = "de_text", skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    /// Manufacturer part number.
    #[serde(rename = "manufacturer_t", default, deserialize_with = "de_text", skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(rename = "defaultimageurl_t", default, deserialize_with = "de_text", skip_serializing_if = "Option::is_none")]
    pub default_image_url: Option<String>,
    #[serde(rename = "thumbimageurl_t", default, deserialize_with = "de_text", skip_serializing_if = "Option::is_none")]
    pub thumb_image_url: Option<String>,
    #[serde(rename = "fullsizeimageurl_t", default, deserialize_with = "de_text", skip_serializing_if = "Option::is_none")]
    pub full_size_image_url: Option<String>,
    #[serde(rename = "disablebuybutton_b", default, deserialize_with = "de_flag")]
    pub disable_buy_button: bool,
    #[serde(rename = "disablewishlistbutton_b", default, deserialize_with = "de_flag")]
    pub disable_wishlist_button: bool,
    #[serde(rename = "disablewishaddtocomparebutton_b", default, deserialize_with = "de_flag")]
    pub disable_add_to_compare_list_button: bool,
    #[serde(rename = "attr_allcategories", default)]
    pub all_categories: Vec<String>,
    #[serde(rename = "attr_allmanufacturers", default)]
    pub all_manufacturers: Vec<String>,
    /// Dynamic fields: localized texts and specification-attribute lists.
    #[serde(flatten)]
    pub other_fields: BTreeMap<String, Value>,
}

impl ProductDocument {
    /// First non-empty text value of a dynamic field.
    pub fn text(&self, field: &str) -> Option<&str> {
        let value = self.other_fields.get(field)?;
        let text = match value {
            Value::String(s) => Some(s.as_str()),
            Value::Array(items) => items.iter().find_map(|v| v.as_str()),
            _ => None,
        }?;
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Localized text with fallback to the default-language copy.
    ///
    /// Looks up `<logical>_txt_<language>` first, then
    /// `<logical>_default_txt_<default_language>`.
    pub fn localized_text(
        &self,
        logical: &str,
        language: &str,
        default_language: &str,
    ) -> Option<&str> {
        self.text(&fields::localized_field_name(logical, language, false))
            .or_else(|| {
                self.text(&fields::localized_field_name(
                    logical,
                    default_language,
                    true,
                ))
            })
    }

    /// All values of a field as strings, regardless of where it is stored.
    ///
    /// Used by the in-memory store to evaluate clauses and facet counts.
    pub fn field_values(&self, field: &str) -> Vec<String> {
        let single = |v: &Option<String>| v.iter().cloned().collect::<Vec<_>>();
        let flag = |b: bool| vec![b.to_string()];
        match field {
            "id" => vec![self.id.to_string()],
            "sku_t" => single(&self.sku),
            "gtin_t" => single(&self.gtin),
            "producttype_t" => single(&self.product_type),
            "manufacturer_t" => single(&self.manufacturer),
            "defaultimageurl_t" => single(&self.default_image_url),
            "thumbimageurl_t" => single(&self.thumb_image_url),
            "fullsizeimageurl_t" => single(&self.full_size_image_url),
            "disablebuybutton_b" => flag(self.disable_buy_button),
            "disablewishlistbutton_b" => flag(self.disable_wishlist_button),
            "disablewishaddtocomparebutton_b" => flag(self.disable_add_to_compare_list_button),
            "attr_allcategories" => self.all_categories.clone(),
            "attr_allmanufacturers" => self.all_manufacturers.clone(),
            other => match self.other_fields.get(other) {
                Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
                Some(v) => scalar_to_string(v).into_iter().collect(),
                None => Vec::new(),
            },
        }
    }

    /// Specification-attribute option ids keyed by attribute id, read from
    /// the `attr_SA<id>` fields. Sorted by attribute id.
    pub fn specification_options(&self) -> Vec<(i64, Vec<i64>)> {
        self.other_fields
            .keys()
            .filter_map(|key| {
                let facet = key.strip_prefix(fields::MULTI_VALUE_PREFIX)?;
                let attribute_id = fields::specification_attribute_id(facet)?;
                let options = self
                    .field_values(key)
                    .iter()
                    .filter_map(|v| v.parse().ok())
                    .collect();
                Some((attribute_id, options))
            })
            .collect()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// The engine may hand the key back as a string or a number.
fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| serde::de::Error::custom(format!("id out of range: {}", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("non-numeric id: {}", s))),
        other => Err(serde::de::Error::custom(format!("invalid id: {}", other))),
    }
}

/// Text fields may come back single- or multi-valued depending on the schema.
fn de_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Array(items)) => items.into_iter().find_map(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        }),
        _ => None,
    })
}

fn de_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Array(items)) => items.first().and_then(Value::as_bool).unwrap_or(false),
        Some(Value::String(s)) => s == "true",
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_engine_shape() {
        let raw = json!({
            "id": "42",
            "sku_t": ["SKU-42"],
            "disablebuybutton_b": true,
            "attr_allcategories": ["1", "7"],
            "name_txt_en": ["Running shoe"],
            "name_default_txt_en": "Running shoe",
            "attr_SA3": [10, 11],
            "_version_": 1234
        });
        let doc: ProductDocument = serde_json::from_value(raw).unwrap();
        assert_eq!(doc.id, 42);
        assert_eq!(doc.sku.as_deref(), Some("SKU-42"));
        assert!(doc.disable_buy_button);
        assert!(!doc.disable_wishlist_button);
        assert_eq!(doc.all_categories, vec!["1", "7"]);
        assert_eq!(doc.text("name_txt_en"), Some("Running shoe"));
        assert_eq!(doc.specification_options(), vec![(3, vec![10, 11])]);
    }

    #[test]
    fn test_serialize_uses_physical_names() {
        let doc = ProductDocument {
            id: 5,
            sku: Some("A-1".into()),
            all_manufacturers: vec!["2".into()],
            ..Default::default()
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["id"], json!(5));
        assert_eq!(value["sku_t"], json!("A-1"));
        assert_eq!(value["attr_allmanufacturers"], json!(["2"]));
        assert!(value.get("gtin_t").is_none());
    }

    #[test]
    fn test_localized_text_falls_back_to_default_language() {
        let mut doc = ProductDocument {
            id: 1,
            ..Default::default()
        };
        doc.other_fields
            .insert("name_default_txt_en".into(), json!("Boot"));
        doc.other_fields.insert("name_txt_de".into(), json!(""));
        assert_eq!(doc.localized_text("name", "de", "en"), Some("Boot"));

        doc.other_fields.insert("name_txt_de".into(), json!("Stiefel"));
        assert_eq!(doc.localized_text("name", "de", "en"), Some("Stiefel"));
        assert_eq!(doc.localized_text("shortdescription", "de", "en"), None);
    }

    #[test]
    fn test_field_values_cover_static_and_dynamic_fields() {
        let mut doc = ProductDocument {
            id: 9,
            gtin: Some("4006381333931".into()),
            ..Default::default()
        };
        doc.other_fields.insert("attr_Color".into(), json!(["Red", "Blue"]));
        assert_eq!(doc.field_values("gtin_t"), vec!["4006381333931"]);
        assert_eq!(doc.field_values("attr_Color"), vec!["Red", "Blue"]);
        assert_eq!(doc.field_values("id"), vec!["9"]);
        assert!(doc.field_values("missing").is_empty());
    }
}
