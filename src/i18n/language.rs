//! Language and country descriptors returned by the adapters.
//!
//! Language codes are compared verbatim; country codes are compared in their
//! uppercase form.

use serde::{Deserialize, Serialize};

/// Country namespace used when no concrete country applies.
pub const INTERNATIONAL_COUNTRY: &str = "GLOBAL";

/// An active language of a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageInfo {
    /// ISO code as configured (e.g. "en", "de_CH")
    pub iso_code: String,
}

impl LanguageInfo {
    pub fn new(iso_code: impl Into<String>) -> Self {
        Self {
            iso_code: iso_code.into(),
        }
    }
}

/// An active country of a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryInfo {
    /// Uppercase ISO 3166 code (e.g. "DE") or [`INTERNATIONAL_COUNTRY`]
    pub iso_code: String,
}

impl CountryInfo {
    /// Create a country; the code is stored uppercase.
    pub fn new(iso_code: impl AsRef<str>) -> Self {
        Self {
            iso_code: iso_code.as_ref().trim().to_uppercase(),
        }
    }
}

/// `true` if `code` is one of the active languages (case-preserving match).
pub fn contains_language(languages: &[LanguageInfo], code: &str) -> bool {
    !code.is_empty() && languages.iter().any(|lang| lang.iso_code == code)
}

/// `true` if the uppercase form of `code` is one of the active countries.
pub fn contains_country(countries: &[CountryInfo], code: &str) -> bool {
    if code.is_empty() {
        return false;
    }
    let code = code.to_uppercase();
    countries.iter().any(|country| country.iso_code == code)
}

/// Language part of a locale: `en_US` becomes `en`, `de` stays `de`.
pub fn language_part(locale: &str) -> &str {
    locale.split('_').next().unwrap_or(locale)
}
