//! Path generators: locate a locale's entry URL in a zone's domain tree.
//!
//! Generators are registered by alias and picked by request source
//! ("document" or "staticroute"). Both built-in aliases share the domain
//! tree search.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{DetectorError, DetectorResult};
use crate::i18n::INTERNATIONAL_COUNTRY;
use crate::zone::{LocaleRoot, ZoneSite};

/// Target locale of a redirect: guessed values first, defaults second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrlLookup<'a> {
    pub language: Option<&'a str>,
    pub default_language: Option<&'a str>,
    pub country: Option<&'a str>,
    pub default_country: Option<&'a str>,
}

impl<'a> UrlLookup<'a> {
    pub fn language(language: Option<&'a str>, default_language: Option<&'a str>) -> Self {
        Self {
            language,
            default_language,
            country: None,
            default_country: None,
        }
    }

    pub fn with_country(mut self, country: Option<&'a str>, default_country: Option<&'a str>) -> Self {
        self.country = country;
        self.default_country = default_country;
        self
    }

    fn is_country_lookup(&self) -> bool {
        self.country.is_some() || self.default_country.is_some()
    }

    /// (language, country) pairs in the order they are tried.
    fn candidates(&self) -> Vec<(&'a str, Option<&'a str>)> {
        let languages = dedup([self.language, self.default_language]);
        if !self.is_country_lookup() {
            return languages.into_iter().map(|l| (l, None)).collect();
        }

        let countries = dedup([self.country, self.default_country]);
        languages
            .iter()
            .flat_map(|l| countries.iter().map(move |c| (*l, Some(*c))))
            .collect()
    }
}

fn dedup<'a>(values: [Option<&'a str>; 2]) -> Vec<&'a str> {
    let mut out: Vec<&'a str> = Vec::with_capacity(2);
    for value in values.into_iter().flatten() {
        if !value.is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

pub trait PathGenerator: Send + Sync {
    /// Absolute URL of the best matching locale root, if any.
    fn find_url_in_zone_tree(&self, tree: &[ZoneSite], lookup: &UrlLookup<'_>) -> Option<String>;
}

/// Searches the locale roots of every site in zone order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainTreePathGenerator;

impl DomainTreePathGenerator {
    fn matches(root: &LocaleRoot, language: &str, country: Option<&str>) -> bool {
        if !root.language.eq_ignore_ascii_case(language) {
            return false;
        }
        match (country, root.country.as_deref()) {
            (None, _) => true,
            (Some(wanted), Some(have)) => have.eq_ignore_ascii_case(wanted),
            // roots without a country serve the international namespace
            (Some(wanted), None) => wanted.eq_ignore_ascii_case(INTERNATIONAL_COUNTRY),
        }
    }
}

impl PathGenerator for DomainTreePathGenerator {
    fn find_url_in_zone_tree(&self, tree: &[ZoneSite], lookup: &UrlLookup<'_>) -> Option<String> {
        for (language, country) in lookup.candidates() {
            for site in tree {
                if let Some(root) = site
                    .locales
                    .iter()
                    .find(|root| Self::matches(root, language, country))
                {
                    let path = if root.path.starts_with('/') {
                        root.path.clone()
                    } else {
                        format!("/{}", root.path)
                    };
                    return Some(format!("{}{}", site.url(true), path));
                }
            }
        }

        debug!("No locale root found in zone tree for {:?}", lookup);
        None
    }
}

#[derive(Default)]
pub struct PathGeneratorRegistry {
    generators: HashMap<String, Arc<dyn PathGenerator>>,
}

impl PathGeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `document` and `staticroute` bound to the domain tree search.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("document", DomainTreePathGenerator);
        registry.register("staticroute", DomainTreePathGenerator);
        registry
    }

    pub fn register(&mut self, alias: impl Into<String>, generator: impl PathGenerator + 'static) {
        self.generators.insert(alias.into(), Arc::new(generator));
    }

    pub fn get(&self, alias: &str) -> DetectorResult<Arc<dyn PathGenerator>> {
        self.generators
            .get(alias)
            .cloned()
            .ok_or_else(|| DetectorError::UnknownPathGenerator(alias.to_string()))
    }
}
