use anyhow::{Context, Result};

use crate::request::ExecutionMode;

/// Trailing slash policy applied to redirect targets.
///
/// Mirrors the `allowtrailingslash` document setting: the literal value `no`
/// strips every trailing slash, any other value enforces exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrailingSlash {
    /// `allowtrailingslash = "no"`
    #[default]
    Strip,
    /// Any other value
    Append,
}

impl TrailingSlash {
    /// Parse the raw `allowtrailingslash` option value.
    pub fn from_option(value: &str) -> Self {
        if value.trim() == "no" {
            TrailingSlash::Strip
        } else {
            TrailingSlash::Append
        }
    }

    /// Apply the policy to a generated path or absolute URL.
    pub fn apply(&self, path: &str) -> String {
        let trimmed = path.trim_end_matches('/');
        match self {
            TrailingSlash::Strip if trimmed.is_empty() => "/".to_string(),
            TrailingSlash::Strip => trimmed.to_string(),
            TrailingSlash::Append => format!("{}/", trimmed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,
    pub execution_mode: ExecutionMode,

    // Redirects
    pub allow_trailing_slash: TrailingSlash,

    // System-wide locales (used by the "system" adapters)
    pub system_languages: Vec<String>,
    pub system_countries: Vec<String>,
    pub default_language: Option<String>,
    pub default_country: Option<String>,

    // Visitor detection
    pub country_header: String,

    // Sessions
    pub session_capacity: usize,
    pub session_ttl_minutes: i64,

    // Definition files
    pub zones_file: Option<String>,
    pub documents_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            execution_mode: ExecutionMode::Web,
            allow_trailing_slash: TrailingSlash::Strip,
            system_languages: vec!["en".to_string()],
            system_countries: Vec::new(),
            default_language: None,
            default_country: None,
            country_header: "cf-ipcountry".to_string(),
            session_capacity: 10_000,
            session_ttl_minutes: 30,
            zones_file: None,
            documents_file: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        Ok(Self {
            // Server
            port: match std::env::var("PORT") {
                Ok(port) => port.parse().context("PORT must be a valid port number")?,
                Err(_) => defaults.port,
            },
            execution_mode: ExecutionMode::Web,

            // Redirects
            allow_trailing_slash: std::env::var("I18N_ALLOW_TRAILING_SLASH")
                .map(|v| TrailingSlash::from_option(&v))
                .unwrap_or(defaults.allow_trailing_slash),

            // System-wide locales
            system_languages: list_from_env("I18N_SYSTEM_LANGUAGES")
                .unwrap_or(defaults.system_languages),
            system_countries: list_from_env("I18N_SYSTEM_COUNTRIES")
                .unwrap_or(defaults.system_countries),
            default_language: non_empty_env("I18N_DEFAULT_LANGUAGE"),
            default_country: non_empty_env("I18N_DEFAULT_COUNTRY"),

            // Visitor detection
            country_header: non_empty_env("I18N_COUNTRY_HEADER")
                .map(|h| h.to_ascii_lowercase())
                .unwrap_or(defaults.country_header),

            // Sessions
            session_capacity: match non_empty_env("I18N_SESSION_CAPACITY") {
                Some(raw) => raw
                    .parse()
                    .context("I18N_SESSION_CAPACITY must be a positive number")?,
                None => defaults.session_capacity,
            },
            session_ttl_minutes: match non_empty_env("I18N_SESSION_TTL_MINUTES") {
                Some(raw) => raw
                    .parse()
                    .context("I18N_SESSION_TTL_MINUTES must be a number of minutes")?,
                None => defaults.session_ttl_minutes,
            },

            // Definition files
            zones_file: non_empty_env("I18N_ZONES_FILE"),
            documents_file: non_empty_env("I18N_DOCUMENTS_FILE"),
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a comma separated list, e.g. `I18N_SYSTEM_LANGUAGES=en,de,fr`.
fn list_from_env(name: &str) -> Option<Vec<String>> {
    non_empty_env(name).map(|raw| {
        raw.split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    })
}
