//! Zone registry: which language/country rules apply to a host.
//!
//! A zone groups one or more sites (hosts) that share a mode, a pair of
//! adapters and generation rules. Hosts that belong to no configured zone
//! fall back to the default zone, which has no id.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::document::DocumentId;
use crate::request::normalize_host;

pub type ZoneId = u32;

/// Document id of the tree root when a site does not declare one.
pub const DEFAULT_ROOT_ID: DocumentId = 1;

/// Validation mode of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum I18nMode {
    /// Only the document language is checked
    #[default]
    Language,
    /// Language and country are checked
    Country,
}

impl fmt::Display for I18nMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            I18nMode::Language => write!(f, "language"),
            I18nMode::Country => write!(f, "country"),
        }
    }
}

/// Entry point of one locale inside a site, e.g. `de` + `CH` at `/de-ch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleRoot {
    pub language: String,
    #[serde(default)]
    pub country: Option<String>,
    pub path: String,
}

/// A host inside a zone together with its locale roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSite {
    pub host: String,
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Id of the site's root document (exempt from the language requirement)
    #[serde(default = "default_root_id")]
    pub root_id: DocumentId,
    #[serde(default)]
    pub locales: Vec<LocaleRoot>,
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_root_id() -> DocumentId {
    DEFAULT_ROOT_ID
}

impl ZoneSite {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            scheme: default_scheme(),
            root_id: DEFAULT_ROOT_ID,
            locales: Vec::new(),
        }
    }

    pub fn with_root_id(mut self, root_id: DocumentId) -> Self {
        self.root_id = root_id;
        self
    }

    pub fn with_locale(
        mut self,
        language: impl Into<String>,
        country: Option<&str>,
        path: impl Into<String>,
    ) -> Self {
        self.locales.push(LocaleRoot {
            language: language.into(),
            country: country.map(str::to_string),
            path: path.into(),
        });
        self
    }

    /// `https://host` when absolute, the bare host otherwise.
    pub fn url(&self, absolute: bool) -> String {
        if absolute {
            format!("{}://{}", self.scheme, self.host)
        } else {
            self.host.clone()
        }
    }

    fn matches_host(&self, host: &str) -> bool {
        normalize_host(&self.host) == host
    }
}

/// Generation rules shared by every site of a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneSettings {
    pub mode: I18nMode,
    pub language_adapter: String,
    pub country_adapter: String,
    pub default_language: Option<String>,
    pub default_country: Option<String>,
    pub global_prefix: Option<String>,
    /// Languages for the "custom" language adapter
    pub languages: Vec<String>,
    /// Countries for the "custom" country adapter
    pub countries: Vec<String>,
}

impl Default for ZoneSettings {
    fn default() -> Self {
        Self {
            mode: I18nMode::Language,
            language_adapter: "system".to_string(),
            country_adapter: "system".to_string(),
            default_language: None,
            default_country: None,
            global_prefix: None,
            languages: Vec::new(),
            countries: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDefinition {
    pub id: ZoneId,
    pub name: String,
    #[serde(default)]
    pub sites: Vec<ZoneSite>,
    #[serde(default)]
    pub config: ZoneSettings,
}

/// Content of the zone definition file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZonesFile {
    /// Settings of the fallback zone
    pub default: ZoneSettings,
    /// Sites of the fallback zone
    pub sites: Vec<ZoneSite>,
    pub zones: Vec<ZoneDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    /// `None` for the default zone
    pub id: Option<ZoneId>,
    pub name: String,
    pub sites: Vec<ZoneSite>,
    pub settings: ZoneSettings,
}

impl Zone {
    pub fn mode(&self) -> I18nMode {
        self.settings.mode
    }

    pub fn global_prefix(&self) -> Option<&str> {
        self.settings.global_prefix.as_deref()
    }

    pub fn site_for_host(&self, host: &str) -> Option<&ZoneSite> {
        let host = normalize_host(host);
        self.sites.iter().find(|site| site.matches_host(&host))
    }

    /// Root document of the site serving `host`.
    pub fn site_root_id(&self, host: &str) -> DocumentId {
        self.site_for_host(host)
            .map(|site| site.root_id)
            .unwrap_or(DEFAULT_ROOT_ID)
    }

    /// Domains of the zone, as absolute URLs or bare hosts.
    pub fn domains(&self, absolute: bool) -> Vec<String> {
        self.sites.iter().map(|site| site.url(absolute)).collect()
    }
}

#[derive(Debug)]
pub struct ZoneRegistry {
    zones: Vec<Zone>,
    default_zone: Zone,
}

impl Default for ZoneRegistry {
    fn default() -> Self {
        Self::new(ZonesFile::default())
    }
}

impl ZoneRegistry {
    pub fn new(file: ZonesFile) -> Self {
        let zones = file
            .zones
            .into_iter()
            .map(|definition| Zone {
                id: Some(definition.id),
                name: definition.name,
                sites: definition.sites,
                settings: definition.config,
            })
            .collect();

        Self {
            zones,
            default_zone: Zone {
                id: None,
                name: "default".to_string(),
                sites: file.sites,
                settings: file.default,
            },
        }
    }

    /// Load zones from a JSON definition file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read zone file {}", path.display()))?;
        let file: ZonesFile = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse zone file {}", path.display()))?;

        let registry = Self::new(file);
        info!(
            "Loaded {} zone(s) from {}",
            registry.zones.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Zone serving `host`, or the default zone.
    pub fn current_zone(&self, host: &str) -> &Zone {
        let host = normalize_host(host);
        match self
            .zones
            .iter()
            .find(|zone| zone.sites.iter().any(|site| site.matches_host(&host)))
        {
            Some(zone) => zone,
            None => {
                debug!("No zone configured for host {}, using default zone", host);
                &self.default_zone
            }
        }
    }

    /// Domains of the zone serving `host`.
    pub fn current_zone_domains(&self, host: &str, absolute: bool) -> Vec<String> {
        self.current_zone(host).domains(absolute)
    }

    /// Configured zones plus the default zone.
    pub fn all(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter().chain(std::iter::once(&self.default_zone))
    }
}
