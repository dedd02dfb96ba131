//! Framework-neutral view of an incoming request.
//!
//! The detector never touches HTTP types directly; the middleware (or any
//! other host) fills a [`RequestInfo`] and hands it over.

/// Which part of the application a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestContext {
    /// Public website
    #[default]
    Default,
    /// Administration interface
    Admin,
}

/// How the router matched the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestSource {
    /// Matched a document path
    Document,
    /// Matched a static route pattern
    StaticRoute,
    /// Matched a route registered by the framework itself
    Framework,
}

impl RequestSource {
    /// Alias of the path generator serving this source.
    pub fn path_generator_alias(&self) -> &'static str {
        match self {
            RequestSource::StaticRoute => "staticroute",
            RequestSource::Document | RequestSource::Framework => "document",
        }
    }
}

/// Process execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Web,
    Cli,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    /// Request host, lowercase and without port
    pub host: String,
    /// Request URI including the query string
    pub uri: String,
    /// Locale resolved by the router (may be empty)
    pub locale: String,
    /// `false` for sub-requests (fragments, internal forwards)
    pub is_master: bool,
    pub is_xml_http_request: bool,
    pub context: RequestContext,
    /// Editmode or preview sessions from the backend
    pub is_backend: bool,
    pub accept_language: Option<String>,
    /// Country reported by the edge (geo IP header)
    pub country_hint: Option<String>,
    pub session_id: Option<String>,
}

impl RequestInfo {
    pub fn new(host: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            host: normalize_host(&host.into()),
            uri: uri.into(),
            locale: String::new(),
            is_master: true,
            is_xml_http_request: false,
            context: RequestContext::Default,
            is_backend: false,
            accept_language: None,
            country_hint: None,
            session_id: None,
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_accept_language(mut self, header: impl Into<String>) -> Self {
        self.accept_language = Some(header.into());
        self
    }

    pub fn with_country_hint(mut self, country: impl Into<String>) -> Self {
        self.country_hint = Some(country.into());
        self
    }

    pub fn as_sub_request(mut self) -> Self {
        self.is_master = false;
        self
    }

    pub fn as_xml_http_request(mut self) -> Self {
        self.is_xml_http_request = true;
        self
    }

    pub fn as_backend(mut self) -> Self {
        self.is_backend = true;
        self
    }

    pub fn in_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }
}

/// Lowercase a host and drop any port suffix.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().to_ascii_lowercase();
    match host.rsplit_once(':') {
        Some((name, port)) if !name.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => {
            name.to_string()
        }
        _ => host,
    }
}
