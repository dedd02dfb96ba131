//! Adapter registry: alias → adapter lookup.
//!
//! Zones refer to their adapters by alias ("system", "custom", or anything a
//! host registers at startup). The registry is filled once and only read
//! afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{DetectorError, DetectorResult};
use crate::i18n::adapter::{
    CountryAdapter, CustomCountryAdapter, CustomLanguageAdapter, LanguageAdapter,
    SystemCountryAdapter, SystemLanguageAdapter,
};

#[derive(Default)]
pub struct AdapterRegistry {
    languages: HashMap<String, Arc<dyn LanguageAdapter>>,
    countries: HashMap<String, Arc<dyn CountryAdapter>>,
}

impl AdapterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `system` and `custom` adapters.
    pub fn with_defaults(config: &Config) -> Self {
        let mut registry = Self::new();
        registry.register_language_adapter("system", SystemLanguageAdapter::from_config(config));
        registry.register_language_adapter("custom", CustomLanguageAdapter);
        registry.register_country_adapter("system", SystemCountryAdapter::from_config(config));
        registry.register_country_adapter("custom", CustomCountryAdapter);
        registry
    }

    /// Register (or replace) a language adapter under `alias`.
    pub fn register_language_adapter(
        &mut self,
        alias: impl Into<String>,
        adapter: impl LanguageAdapter + 'static,
    ) {
        self.languages.insert(alias.into(), Arc::new(adapter));
    }

    /// Register (or replace) a country adapter under `alias`.
    pub fn register_country_adapter(
        &mut self,
        alias: impl Into<String>,
        adapter: impl CountryAdapter + 'static,
    ) {
        self.countries.insert(alias.into(), Arc::new(adapter));
    }

    pub fn language_adapter(&self, alias: &str) -> DetectorResult<Arc<dyn LanguageAdapter>> {
        self.languages
            .get(alias)
            .cloned()
            .ok_or_else(|| DetectorError::UnknownLanguageAdapter(alias.to_string()))
    }

    pub fn country_adapter(&self, alias: &str) -> DetectorResult<Arc<dyn CountryAdapter>> {
        self.countries
            .get(alias)
            .cloned()
            .ok_or_else(|| DetectorError::UnknownCountryAdapter(alias.to_string()))
    }

    /// Registered language adapter aliases, sorted.
    pub fn language_aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.languages.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
    }

    /// Registered country adapter aliases, sorted.
    pub fn country_aliases(&self) -> Vec<&str> {
        let mut aliases: Vec<&str> = self.countries.keys().map(String::as_str).collect();
        aliases.sort_unstable();
        aliases
    }
}
