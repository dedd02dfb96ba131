//! Per-request locale context.
//!
//! Produced by the detector and attached to the request so later stages
//! (handlers, templates, error pages) read the active locale without
//! resolving it again.

use serde::Serialize;

use crate::i18n::INTERNATIONAL_COUNTRY;
use crate::zone::{I18nMode, Zone, ZoneId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct I18nContext {
    pub zone_id: Option<ZoneId>,
    pub zone_name: String,
    pub mode: I18nMode,
    /// Active request locale, e.g. `en_US`
    pub locale: String,
    /// Lowercase language iso, e.g. `en`
    pub language_iso: Option<String>,
    /// Uppercase country iso, e.g. `US`
    pub country_iso: Option<String>,
    pub global_prefix: Option<String>,
}

impl I18nContext {
    /// Context used while handling an unhandled error.
    ///
    /// Language comes from the request locale (or the zone default when the
    /// router produced none), country is always the international namespace.
    pub fn fallback(zone: &Zone, locale: &str) -> Self {
        let language_iso = if locale.is_empty() {
            zone.settings.default_language.clone()
        } else {
            Some(locale.to_string())
        }
        .map(|l| l.to_lowercase());

        Self {
            zone_id: zone.id,
            zone_name: zone.name.clone(),
            mode: zone.mode(),
            locale: locale.to_string(),
            language_iso,
            country_iso: Some(INTERNATIONAL_COUNTRY.to_string()),
            global_prefix: zone.settings.global_prefix.clone(),
        }
    }

    /// Value for the `Content-Language` header.
    pub fn content_language(&self) -> Option<String> {
        let language = self.language_iso.as_deref()?;
        match self.country_iso.as_deref() {
            Some(country) if country != INTERNATIONAL_COUNTRY => {
                Some(format!("{}-{}", language, country))
            }
            _ => Some(language.to_string()),
        }
    }
}
