//! Axum middleware running the detector on every request.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error};
use uuid::Uuid;

use crate::context::I18nContext;
use crate::detector::{Detector, Outcome};
use crate::document::DocumentResolver;
use crate::request::{normalize_host, RequestContext, RequestInfo};

pub const SESSION_COOKIE: &str = "I18NSESSID";

/// Path prefix of the administration interface.
pub const ADMIN_PREFIX: &str = "/admin";

const BACKEND_QUERY_FLAGS: [&str; 2] = ["_editmode", "_preview"];

#[derive(Clone)]
pub struct DetectorState {
    pub detector: Arc<Detector>,
    pub documents: Arc<dyn DocumentResolver>,
    /// Lowercase name of the edge country header
    pub country_header: String,
}

impl DetectorState {
    pub fn new(
        detector: Detector,
        documents: impl DocumentResolver + 'static,
        country_header: impl Into<String>,
    ) -> Self {
        Self {
            detector: Arc::new(detector),
            documents: Arc::new(documents),
            country_header: country_header.into().to_ascii_lowercase(),
        }
    }
}

/// Resolve the i18n context, then redirect or pass the request on with the
/// [`I18nContext`] in its extensions.
pub async fn detector_middleware(
    State(state): State<DetectorState>,
    mut req: Request,
    next: Next,
) -> Response {
    let (session_id, new_session) = match session_from_cookies(req.headers()) {
        Some(id) => (id, false),
        None => (Uuid::new_v4().to_string(), true),
    };

    let info = request_info(&state, &req, &session_id);
    let routed = state.documents.resolve(&info.host, req.uri().path());
    let info = match routed.as_ref().and_then(|r| r.locale.clone()) {
        Some(locale) => info.with_locale(locale),
        None => info,
    };

    let mut response = match state.detector.resolve(&info, routed.as_ref()) {
        Ok(Outcome::RedirectTo(url)) => redirect(&url),
        Ok(Outcome::Declined(_)) => {
            let mut response = next.run(req).await;
            if response.status().is_server_error() {
                apply_fallback(&state.detector, &info, &mut response);
            }
            response
        }
        Ok(Outcome::Continue(context)) | Ok(Outcome::RewriteAndContinue(context)) => {
            let content_language = context.content_language();
            req.extensions_mut().insert(context);
            let mut response = next.run(req).await;
            set_content_language(&mut response, content_language);
            response
        }
        Err(err) => {
            error!("i18n detection failed for {}{}: {}", info.host, info.uri, err);
            let mut response = err.into_response();
            apply_fallback(&state.detector, &info, &mut response);
            response
        }
    };

    if new_session {
        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, session_id);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    response
}

fn request_info(state: &DetectorState, req: &Request, session_id: &str) -> RequestInfo {
    let headers = req.headers();
    let host = header_str(headers, header::HOST.as_str())
        .or_else(|| req.uri().host())
        .unwrap_or_default();
    let uri = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let mut info = RequestInfo::new(normalize_host(host), uri).with_session(session_id);

    if let Some(accept_language) = header_str(headers, header::ACCEPT_LANGUAGE.as_str()) {
        info = info.with_accept_language(accept_language);
    }
    if let Some(country) = header_str(headers, &state.country_header) {
        info = info.with_country_hint(country);
    }
    if header_str(headers, "x-requested-with")
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
    {
        info = info.as_xml_http_request();
    }
    if is_admin_path(req.uri().path()) {
        info = info.in_context(RequestContext::Admin);
    }
    if is_backend_query(req.uri().query()) {
        debug!("Backend request {}, redirects disabled", uri);
        info = info.as_backend();
    }

    info
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Session id from the `I18NSESSID` cookie; only UUIDs minted here are accepted.
fn session_from_cookies(headers: &HeaderMap) -> Option<String> {
    let (_, value) = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)?;

    match Uuid::parse_str(value) {
        Ok(id) => Some(id.to_string()),
        Err(_) => {
            debug!("Ignoring malformed session cookie {:?}", value);
            None
        }
    }
}

fn is_admin_path(path: &str) -> bool {
    path == ADMIN_PREFIX || path.starts_with(&format!("{}/", ADMIN_PREFIX))
}

fn is_backend_query(query: Option<&str>) -> bool {
    query.is_some_and(|q| {
        q.split('&')
            .filter_map(|pair| pair.split('=').next())
            .any(|name| BACKEND_QUERY_FLAGS.contains(&name))
    })
}

fn redirect(url: &str) -> Response {
    match HeaderValue::from_str(url) {
        Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
        Err(_) => {
            error!("Cannot redirect to invalid location {:?}", url);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Attach the exception fallback context to an error response.
fn apply_fallback(detector: &Detector, info: &RequestInfo, response: &mut Response) {
    if let Some(context) = detector.on_exception(info) {
        set_content_language(response, context.content_language());
        response.extensions_mut().insert(context);
    }
}

fn set_content_language(response: &mut Response, language: Option<String>) {
    if let Some(value) = language.and_then(|l| HeaderValue::from_str(&l).ok()) {
        response.headers_mut().insert(header::CONTENT_LANGUAGE, value);
    }
}

/// Context attached by [`detector_middleware`], if any.
pub fn context_of(req: &Request) -> Option<&I18nContext> {
    req.extensions().get::<I18nContext>()
}
