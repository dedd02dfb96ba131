//! Context resolution engine.
//!
//! For every primary frontend request the detector:
//! 1. resolves the zone of the host and loads its adapters
//! 2. reads language/country of the target document (hardlinks read their source)
//! 3. validates them against the zone's active languages/countries
//! 4. redirects to a matching locale root, or commits the locale and
//!    hands the result to the session tracker

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::TrailingSlash;
use crate::context::I18nContext;
use crate::document::{document_route_name, RoutedDocument};
use crate::error::{DetectorError, DetectorResult};
use crate::event::{ContextSwitchEvent, EventBus};
use crate::i18n::{
    contains_country, contains_language, language_part, AdapterRegistry, CountryInfo,
    HeaderLocaleGuesser, LanguageInfo, LocaleGuesser,
};
use crate::metrics::DetectorMetrics;
use crate::path_generator::{PathGeneratorRegistry, UrlLookup};
use crate::request::{ExecutionMode, RequestContext, RequestInfo, RequestSource};
use crate::session::{CurrentContext, InMemorySessionStore, SessionStore, SessionTracker};
use crate::zone::{I18nMode, Zone, ZoneId, ZoneRegistry};

/// Why the detector left a request alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    SubRequest,
    NonDefaultContext,
    NoDocument,
    CliMode,
    XmlHttpRequest,
}

impl fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DeclineReason::SubRequest => "sub-request",
            DeclineReason::NonDefaultContext => "not a frontend request",
            DeclineReason::NoDocument => "no target document",
            DeclineReason::CliMode => "cli mode",
            DeclineReason::XmlHttpRequest => "xml http request",
        };
        write!(f, "{}", reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Declined(DeclineReason),
    Continue(I18nContext),
    /// Continue, but the request locale changed
    RewriteAndContinue(I18nContext),
    RedirectTo(String),
}

impl Outcome {
    pub fn context(&self) -> Option<&I18nContext> {
        match self {
            Outcome::Continue(context) | Outcome::RewriteAndContinue(context) => Some(context),
            Outcome::Declined(_) | Outcome::RedirectTo(_) => None,
        }
    }
}

/// Working state of one resolution.
#[derive(Debug)]
struct RequestI18nState {
    i18n_type: I18nMode,
    valid_languages: Vec<LanguageInfo>,
    valid_countries: Vec<CountryInfo>,
    default_language: Option<String>,
    default_country: Option<String>,
    global_prefix: Option<String>,
    current_language: Option<String>,
    current_country: Option<String>,
    current_zone_id: Option<ZoneId>,
}

pub struct Detector {
    zones: ZoneRegistry,
    adapters: AdapterRegistry,
    path_generators: PathGeneratorRegistry,
    guesser: Arc<dyn LocaleGuesser>,
    sessions: Arc<dyn SessionStore>,
    tracker: SessionTracker,
    metrics: DetectorMetrics,
    trailing_slash: TrailingSlash,
    execution_mode: ExecutionMode,
}

pub struct DetectorBuilder {
    zones: ZoneRegistry,
    adapters: AdapterRegistry,
    path_generators: PathGeneratorRegistry,
    guesser: Arc<dyn LocaleGuesser>,
    sessions: Arc<dyn SessionStore>,
    bus: EventBus,
    trailing_slash: TrailingSlash,
    execution_mode: ExecutionMode,
}

impl DetectorBuilder {
    /// Replace the default `document`/`staticroute` generators.
    pub fn path_generators(mut self, path_generators: PathGeneratorRegistry) -> Self {
        self.path_generators = path_generators;
        self
    }

    /// Guesser used to pick the redirect target.
    pub fn guesser(mut self, guesser: impl LocaleGuesser + 'static) -> Self {
        self.guesser = Arc::new(guesser);
        self
    }

    /// Store holding the last tracked zone/language/country per session.
    pub fn session_store(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    /// Bus receiving context switch events.
    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    /// Trailing slash policy applied to redirect URLs.
    pub fn trailing_slash(mut self, trailing_slash: TrailingSlash) -> Self {
        self.trailing_slash = trailing_slash;
        self
    }

    /// `Cli` declines every request.
    pub fn execution_mode(mut self, execution_mode: ExecutionMode) -> Self {
        self.execution_mode = execution_mode;
        self
    }

    /// Build the detector, checking that every zone's adapters and both
    /// path generator aliases are registered.
    pub fn build(self) -> DetectorResult<Detector> {
        for zone in self.zones.all() {
            let alias = &zone.settings.language_adapter;
            if let Err(err) = self.adapters.language_adapter(alias) {
                error!(
                    "Zone {} uses language adapter {:?}, registered: {:?}",
                    zone.name,
                    alias,
                    self.adapters.language_aliases()
                );
                return Err(err);
            }
            let alias = &zone.settings.country_adapter;
            if zone.mode() == I18nMode::Country {
                if let Err(err) = self.adapters.country_adapter(alias) {
                    error!(
                        "Zone {} uses country adapter {:?}, registered: {:?}",
                        zone.name,
                        alias,
                        self.adapters.country_aliases()
                    );
                    return Err(err);
                }
            }
        }
        for source in [RequestSource::Document, RequestSource::StaticRoute] {
            self.path_generators.get(source.path_generator_alias())?;
        }

        Ok(Detector {
            zones: self.zones,
            adapters: self.adapters,
            path_generators: self.path_generators,
            guesser: self.guesser,
            sessions: self.sessions,
            tracker: SessionTracker::new(self.bus),
            metrics: DetectorMetrics::new(),
            trailing_slash: self.trailing_slash,
            execution_mode: self.execution_mode,
        })
    }
}

impl Detector {
    /// Builder with header guessing, in-memory sessions and the default
    /// path generators.
    pub fn builder(zones: ZoneRegistry, adapters: AdapterRegistry) -> DetectorBuilder {
        DetectorBuilder {
            zones,
            adapters,
            path_generators: PathGeneratorRegistry::with_defaults(),
            guesser: Arc::new(HeaderLocaleGuesser),
            sessions: Arc::new(InMemorySessionStore::new()),
            bus: EventBus::default(),
            trailing_slash: TrailingSlash::default(),
            execution_mode: ExecutionMode::default(),
        }
    }

    pub fn metrics(&self) -> &DetectorMetrics {
        &self.metrics
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ContextSwitchEvent> {
        self.tracker.bus().subscribe()
    }

    /// Resolve the i18n context of a request.
    ///
    /// Fails only when a document on a checked route has no language and is
    /// not the site root.
    pub fn resolve(
        &self,
        request: &RequestInfo,
        routed: Option<&RoutedDocument>,
    ) -> DetectorResult<Outcome> {
        if !request.is_master {
            return Ok(self.decline(request, DeclineReason::SubRequest));
        }
        if request.context != RequestContext::Default {
            return Ok(self.decline(request, DeclineReason::NonDefaultContext));
        }
        let Some(routed) = routed else {
            return Ok(self.decline(request, DeclineReason::NoDocument));
        };
        if let Some(reason) = self.check_request(request, false) {
            return Ok(self.decline(request, reason));
        }

        self.metrics.record_request_checked();

        let zone = self.zones.current_zone(&request.host);
        let mut state = self.init_state(zone)?;

        let document = &routed.document;
        let document_language = document.language();
        let document_country = document.country();

        // a hardlink's own language wins over the locale the router derived
        let mut locale = request.locale.clone();
        if let Some(source_language) = document.hardlink_source_language() {
            if source_language != locale {
                debug!(
                    "Hardlink {} overrides request locale {} with {}",
                    document.id(),
                    locale,
                    source_language
                );
                locale = source_language.to_string();
            }
        }

        // framework routes other than document/static routes are not checked
        let valid_route = routed.source == RequestSource::StaticRoute
            || routed.route_name.as_deref() == Some(document_route_name(document.id()).as_str());

        if valid_route && document_language.is_none() {
            let site_root_id = zone.site_root_id(&request.host);
            if document.id() != site_root_id {
                self.metrics.record_configuration_error();
                return Err(DetectorError::missing_language(
                    document.kind().to_string(),
                    document.id(),
                ));
            }
        }

        let valid_language =
            document_language.is_some_and(|lang| contains_language(&state.valid_languages, lang));
        let valid_country =
            document_country.is_some_and(|country| contains_country(&state.valid_countries, country));

        if valid_route && self.can_redirect(request) {
            let needs_redirect = match state.i18n_type {
                I18nMode::Language => !valid_language,
                I18nMode::Country => !valid_country || !valid_language,
            };

            if needs_redirect {
                if let Some(url) = self.redirect_url(request, zone, &state, routed.source)? {
                    info!(
                        "Redirecting {}{} to {} (zone: {}, mode: {}, language: {:?}, country: {:?})",
                        request.host,
                        request.uri,
                        url,
                        zone.name,
                        state.i18n_type,
                        document_language,
                        document_country
                    );
                    self.metrics.record_redirect();
                    return Ok(Outcome::RedirectTo(url));
                }
            }
        }

        // the active locale keeps only its language part: en_US becomes en
        if let Some(language) = document_language.filter(|_| valid_language) {
            let language = language_part(language);
            locale = language.to_string();
            state.current_language = Some(language.to_string());
        }

        if let Some(country) = document_country.filter(|_| valid_country) {
            state.current_country = Some(country.to_uppercase());
        }

        let context = I18nContext {
            zone_id: state.current_zone_id,
            zone_name: zone.name.clone(),
            mode: state.i18n_type,
            locale,
            language_iso: state.current_language.as_deref().map(str::to_lowercase),
            country_iso: state.current_country.clone(),
            global_prefix: state.global_prefix.clone(),
        };

        self.track_context(request, &state);

        if context.locale != request.locale {
            self.metrics.record_locale_rewrite();
            Ok(Outcome::RewriteAndContinue(context))
        } else {
            Ok(Outcome::Continue(context))
        }
    }

    /// Fallback context while an unhandled error is being rendered.
    ///
    /// XML http requests are accepted here.
    pub fn on_exception(&self, request: &RequestInfo) -> Option<I18nContext> {
        if !request.is_master {
            return None;
        }
        if let Some(reason) = self.check_request(request, true) {
            debug!("No fallback locale for {}: {}", request.uri, reason);
            return None;
        }

        let zone = self.zones.current_zone(&request.host);
        Some(I18nContext::fallback(zone, &request.locale))
    }

    fn decline(&self, request: &RequestInfo, reason: DeclineReason) -> Outcome {
        debug!("Skipping i18n detection for {}: {}", request.uri, reason);
        self.metrics.record_request_declined();
        Outcome::Declined(reason)
    }

    fn check_request(&self, request: &RequestInfo, allow_ajax: bool) -> Option<DeclineReason> {
        if self.execution_mode == ExecutionMode::Cli {
            return Some(DeclineReason::CliMode);
        }
        if !allow_ajax && request.is_xml_http_request {
            return Some(DeclineReason::XmlHttpRequest);
        }
        None
    }

    /// Backend sessions (editmode, preview) must never be redirected.
    fn can_redirect(&self, request: &RequestInfo) -> bool {
        !request.is_backend
    }

    fn init_state(&self, zone: &Zone) -> DetectorResult<RequestI18nState> {
        let language_adapter = self.adapters.language_adapter(&zone.settings.language_adapter)?;

        let mut state = RequestI18nState {
            i18n_type: zone.mode(),
            valid_languages: language_adapter.active_languages(zone),
            valid_countries: Vec::new(),
            default_language: language_adapter.default_language(zone),
            default_country: None,
            global_prefix: zone.global_prefix().map(str::to_string),
            current_language: None,
            current_country: None,
            current_zone_id: zone.id,
        };

        if state.i18n_type == I18nMode::Country {
            let country_adapter = self.adapters.country_adapter(&zone.settings.country_adapter)?;
            state.valid_countries = country_adapter.active_countries(zone);
            state.default_country = country_adapter.default_country(zone);
        }

        Ok(state)
    }

    /// Absolute URL of the locale root matching the visitor, with the
    /// trailing slash policy applied.
    ///
    /// `None` when the zone tree has no matching root; the request then
    /// continues unredirected.
    fn redirect_url(
        &self,
        request: &RequestInfo,
        zone: &Zone,
        state: &RequestI18nState,
        source: RequestSource,
    ) -> DetectorResult<Option<String>> {
        let generator = self.path_generators.get(source.path_generator_alias())?;

        let guessed_language = self.guesser.guess_language(request, &state.valid_languages);
        let guessed_country = match state.i18n_type {
            I18nMode::Country => self.guesser.guess_country(request, &state.valid_countries),
            I18nMode::Language => None,
        };

        let lookup = UrlLookup::language(
            guessed_language.as_deref(),
            state.default_language.as_deref(),
        );
        let lookup = match state.i18n_type {
            I18nMode::Language => lookup,
            I18nMode::Country => lookup.with_country(
                guessed_country.as_deref(),
                state.default_country.as_deref(),
            ),
        };

        match generator.find_url_in_zone_tree(&zone.sites, &lookup) {
            Some(url) => Ok(Some(self.trailing_slash.apply(&url))),
            None => {
                warn!(
                    "No locale root for {:?} in zone {} (domains: {:?}), not redirecting {}{}",
                    lookup,
                    zone.name,
                    self.zones.current_zone_domains(&request.host, true),
                    request.host,
                    request.uri
                );
                Ok(None)
            }
        }
    }

    fn track_context(&self, request: &RequestInfo, state: &RequestI18nState) {
        let Some(session_id) = request.session_id.as_deref() else {
            debug!("No session for {}, context not tracked", request.uri);
            return;
        };

        let current = CurrentContext {
            zone_id: state.current_zone_id,
            language: state.current_language.clone(),
            country: state.current_country.clone(),
        };

        if self
            .tracker
            .track(self.sessions.as_ref(), session_id, &current, &request.uri)
            .is_some()
        {
            self.metrics.record_context_switch();
        }
    }
}
