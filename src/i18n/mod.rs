//! Language and country providers used during detection.
//!
//! # Architecture
//!
//! - `language`: `LanguageInfo` / `CountryInfo` descriptors and matching rules
//! - `adapter`: pluggable adapters returning a zone's active languages/countries
//! - `registry`: alias → adapter lookup, filled at startup
//! - `guesser`: derives a visitor's preferred language/country from request headers
//!
//! # Example
//!
//! ```rust,ignore
//! use i18n_detector::i18n::AdapterRegistry;
//!
//! let registry = AdapterRegistry::with_defaults(&config);
//! let adapter = registry.language_adapter(&zone.settings.language_adapter)?;
//! let languages = adapter.active_languages(zone);
//! ```

mod adapter;
mod guesser;
mod language;
mod registry;

pub use adapter::{
    CountryAdapter, CustomCountryAdapter, CustomLanguageAdapter, LanguageAdapter,
    SystemCountryAdapter, SystemLanguageAdapter,
};
pub use guesser::{parse_accept_language, HeaderLocaleGuesser, LocaleGuesser};
pub use language::{
    contains_country, contains_language, language_part, CountryInfo, LanguageInfo,
    INTERNATIONAL_COUNTRY,
};
pub use registry::AdapterRegistry;
