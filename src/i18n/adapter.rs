//! Language and country adapters.
//!
//! Every zone names one language adapter and one country adapter by alias.
//! Adapters receive the zone on each call, so a single instance serves all
//! zones.
//!
//! Built-in adapters:
//! - `system`: the process-wide locale lists from [`Config`]
//! - `custom`: the lists declared in the zone's own settings

use crate::config::Config;
use crate::i18n::language::{CountryInfo, LanguageInfo};
use crate::zone::Zone;

/// Provides the active languages of a zone.
pub trait LanguageAdapter: Send + Sync {
    fn active_languages(&self, zone: &Zone) -> Vec<LanguageInfo>;

    fn default_language(&self, zone: &Zone) -> Option<String>;
}

/// Provides the active countries of a zone.
pub trait CountryAdapter: Send + Sync {
    fn active_countries(&self, zone: &Zone) -> Vec<CountryInfo>;

    fn default_country(&self, zone: &Zone) -> Option<String>;
}

/// Languages configured for the whole installation.
///
/// A zone's `default_language` takes precedence over the system default.
#[derive(Debug, Clone)]
pub struct SystemLanguageAdapter {
    languages: Vec<LanguageInfo>,
    default_language: Option<String>,
}

impl SystemLanguageAdapter {
    pub fn new(languages: Vec<LanguageInfo>, default_language: Option<String>) -> Self {
        Self {
            languages,
            default_language,
        }
    }

    /// The first system language is the default unless one is configured.
    pub fn from_config(config: &Config) -> Self {
        let languages: Vec<LanguageInfo> = config
            .system_languages
            .iter()
            .map(LanguageInfo::new)
            .collect();
        let default_language = config
            .default_language
            .clone()
            .or_else(|| languages.first().map(|lang| lang.iso_code.clone()));

        Self::new(languages, default_language)
    }
}

impl LanguageAdapter for SystemLanguageAdapter {
    fn active_languages(&self, _zone: &Zone) -> Vec<LanguageInfo> {
        self.languages.clone()
    }

    fn default_language(&self, zone: &Zone) -> Option<String> {
        zone.settings
            .default_language
            .clone()
            .or_else(|| self.default_language.clone())
    }
}

/// Languages declared on the zone itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomLanguageAdapter;

impl LanguageAdapter for CustomLanguageAdapter {
    fn active_languages(&self, zone: &Zone) -> Vec<LanguageInfo> {
        zone.settings.languages.iter().map(LanguageInfo::new).collect()
    }

    fn default_language(&self, zone: &Zone) -> Option<String> {
        zone.settings
            .default_language
            .clone()
            .or_else(|| zone.settings.languages.first().cloned())
    }
}

/// Countries configured for the whole installation.
#[derive(Debug, Clone)]
pub struct SystemCountryAdapter {
    countries: Vec<CountryInfo>,
    default_country: Option<String>,
}

impl SystemCountryAdapter {
    pub fn new(countries: Vec<CountryInfo>, default_country: Option<String>) -> Self {
        Self {
            countries,
            default_country: default_country.map(|c| c.to_uppercase()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let countries: Vec<CountryInfo> =
            config.system_countries.iter().map(CountryInfo::new).collect();
        let default_country = config
            .default_country
            .clone()
            .or_else(|| countries.first().map(|country| country.iso_code.clone()));

        Self::new(countries, default_country)
    }
}

impl CountryAdapter for SystemCountryAdapter {
    fn active_countries(&self, _zone: &Zone) -> Vec<CountryInfo> {
        self.countries.clone()
    }

    fn default_country(&self, zone: &Zone) -> Option<String> {
        zone.settings
            .default_country
            .as_ref()
            .map(|c| c.to_uppercase())
            .or_else(|| self.default_country.clone())
    }
}

/// Countries declared on the zone itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomCountryAdapter;

impl CountryAdapter for CustomCountryAdapter {
    fn active_countries(&self, zone: &Zone) -> Vec<CountryInfo> {
        zone.settings.countries.iter().map(CountryInfo::new).collect()
    }

    fn default_country(&self, zone: &Zone) -> Option<String> {
        zone.settings
            .default_country
            .as_ref()
            .or_else(|| zone.settings.countries.first())
            .map(|c| c.to_uppercase())
    }
}
