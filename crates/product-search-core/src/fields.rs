//! Physical field naming for indexed product documents.
//!
//! The indexing pipeline and the query composer must agree on every field
//! name byte for byte, so all names are derived here from a logical name
//! plus, for localized text, a language key.
//!
//! | Kind | Shape | Example |
//! |------|-------|---------|
//! | Static text | `<name>_t` | `sku_t` |
//! | Localized text | `<name>_txt_<lang>` | `name_txt_de` |
//! | Default-language text | `<name>_default_txt_<lang>` | `name_default_txt_en` |
//! | Multi-value facet | `attr_<facet>` | `attr_allcategories` |
//! | Boolean flag | `<name>_b` | `disablebuybutton_b` |

/// Suffix for static (non-localized) text fields.
pub const TEXT_FIELD_SUFFIX: &str = "_t";
/// Marker inserted before the localized infix for default-language copies.
pub const DEFAULT_TEXT_FIELD_PART: &str = "_default";
/// Infix separating a localized field name from its language key.
pub const LOCALIZED_TEXT_FIELD_INFIX: &str = "_txt_";
/// Suffix for boolean fields.
pub const BOOLEAN_FIELD_SUFFIX: &str = "_b";
/// Prefix for multi-value facet fields.
pub const MULTI_VALUE_PREFIX: &str = "attr_";

pub const SE_NAME: &str = "sename";
pub const SKU: &str = "sku";
pub const GTIN: &str = "gtin";
pub const NAME: &str = "name";
pub const SHORT_DESCRIPTION: &str = "shortdescription";
pub const FULL_DESCRIPTION: &str = "fulldescription";
pub const PRODUCT_TYPE: &str = "producttype";
pub const MANUFACTURER: &str = "manufacturer";
pub const DEFAULT_IMAGE_URL: &str = "defaultimageurl";
pub const THUMB_IMAGE_URL: &str = "thumbimageurl";
pub const FULL_SIZE_IMAGE_URL: &str = "fullsizeimageurl";
pub const DISABLE_BUY_BUTTON: &str = "disablebuybutton";
pub const DISABLE_WISHLIST_BUTTON: &str = "disablewishlistbutton";
pub const DISABLE_COMPARE_BUTTON: &str = "disablewishaddtocomparebutton";

/// Facet name of the all-categories multi-value field.
pub const ALL_CATEGORIES: &str = "allcategories";
/// Facet name of the all-manufacturers multi-value field.
pub const ALL_MANUFACTURERS: &str = "allmanufacturers";
/// Prefix of specification-attribute facet names (`SA<attributeId>`).
pub const SPECIFICATION_ATTRIBUTE_PREFIX: &str = "SA";

/// Physical name of a static text field: `sku` → `sku_t`.
pub fn static_field_name(logical: &str) -> String {
    format!("{}{}", logical, TEXT_FIELD_SUFFIX)
}

/// Physical name of a boolean field: `disablebuybutton` → `disablebuybutton_b`.
pub fn boolean_field_name(logical: &str) -> String {
    format!("{}{}", logical, BOOLEAN_FIELD_SUFFIX)
}

/// Physical name of a localized text field.
///
/// `language_key` must already be the short form (`"en"`, not `"en-US"`);
/// see [`language_key`].
///
/// ```
/// use product_search_core::fields::localized_field_name;
/// assert_eq!(localized_field_name("name", "de", false), "name_txt_de");
/// assert_eq!(localized_field_name("name", "en", true), "name_default_txt_en");
/// ```
pub fn localized_field_name(logical: &str, language_key: &str, is_default: bool) -> String {
    let default_part = if is_default {
        DEFAULT_TEXT_FIELD_PART
    } else {
        ""
    };
    format!(
        "{}{}{}{}",
        logical, default_part, LOCALIZED_TEXT_FIELD_INFIX, language_key
    )
}

/// Derive the short language key from a culture tag (`"en-US"` → `"en"`).
///
/// A tag without a hyphen is returned as-is.
pub fn language_key(culture: &str) -> &str {
    match culture.find('-') {
        Some(pos) => &culture[..pos],
        None => culture,
    }
}

/// Physical name of a facet's multi-value field: `allcategories` → `attr_allcategories`.
pub fn facet_field_name(facet: &str) -> String {
    format!("{}{}", MULTI_VALUE_PREFIX, facet)
}

/// Strip the multi-value decoration from a physical facet field name.
pub fn facet_name_from_field(field: &str) -> &str {
    field.strip_prefix(MULTI_VALUE_PREFIX).unwrap_or(field)
}

/// Facet name for a specification attribute: `3` → `SA3`.
pub fn specification_attribute_facet(attribute_id: i64) -> String {
    format!("{}{}", SPECIFICATION_ATTRIBUTE_PREFIX, attribute_id)
}

/// Parse the attribute id back out of an `SA<id>` facet name.
pub fn specification_attribute_id(facet: &str) -> Option<i64> {
    let id = facet.strip_prefix(SPECIFICATION_ATTRIBUTE_PREFIX)?;
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    id.parse().ok()
}

/// Whether `name` is a facet the engine indexes: `allcategories`,
/// `allmanufacturers` or `SA<digits>`.
pub fn is_facet_name(name: &str) -> bool {
    name == ALL_CATEGORIES
        || name == ALL_MANUFACTURERS
        || specification_attribute_id(name).is_some()
}
