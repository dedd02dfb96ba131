//! Integration tests for the i18n detector
//!
//! These tests drive the full axum router (middleware, detector, session
//! tracking) with in-memory zones and documents.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    routing::get as get_route,
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use i18n_detector::document::{Document, InMemoryDocumentTree};
use i18n_detector::i18n::AdapterRegistry;
use i18n_detector::middleware::detector_middleware;
use i18n_detector::server::{build_router, METRICS_PATH};
use i18n_detector::zone::{I18nMode, ZoneDefinition, ZoneRegistry, ZoneSettings, ZoneSite, ZonesFile};
use i18n_detector::{Config, ContextSwitchEvent, Detector, DetectorState, TrailingSlash};

// ==================== Test Helpers ====================

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn zones() -> ZoneRegistry {
    ZoneRegistry::new(ZonesFile {
        default: ZoneSettings::default(),
        sites: Vec::new(),
        zones: vec![
            ZoneDefinition {
                id: 3,
                name: "global".to_string(),
                sites: vec![ZoneSite::new("example.org")
                    .with_locale("en", None, "/en")
                    .with_locale("es", None, "/es")],
                config: ZoneSettings {
                    language_adapter: "custom".to_string(),
                    languages: strings(&["en", "es", "fr"]),
                    default_language: Some("en".to_string()),
                    ..ZoneSettings::default()
                },
            },
            ZoneDefinition {
                id: 5,
                name: "swiss".to_string(),
                sites: vec![ZoneSite::new("example.ch")
                    .with_root_id(100)
                    .with_locale("fr", Some("CH"), "/fr-ch")
                    .with_locale("fr", Some("FR"), "/fr-fr")],
                config: ZoneSettings {
                    mode: I18nMode::Country,
                    language_adapter: "custom".to_string(),
                    country_adapter: "custom".to_string(),
                    languages: strings(&["fr", "de"]),
                    countries: strings(&["FR", "CH"]),
                    default_language: Some("fr".to_string()),
                    default_country: Some("CH".to_string()),
                    ..ZoneSettings::default()
                },
            },
        ],
    })
}

fn documents() -> InMemoryDocumentTree {
    let mut tree = InMemoryDocumentTree::new();
    tree.insert(Document::page(1, "/"));
    tree.insert(Document::page(10, "/es").with_language("es"));
    tree.insert(Document::page(11, "/it").with_language("it"));
    tree.insert(Document::page(12, "/es/news").with_language("es"));
    tree.insert(Document::page(20, "/fr-de").with_language("fr").with_country("de"));
    tree.insert(Document::page(21, "/fr-ch").with_language("fr").with_country("CH"));
    tree.insert(Document::page(30, "/en/shop").with_language("en"));
    tree.insert(Document::hardlink(31, "/es/shop", 30).with_language("es"));
    tree.insert(Document::page(42, "/en/broken"));
    tree.add_static_route("news_detail", r"/es/news/\d+", 12)
        .expect("valid pattern");
    tree
}

fn detector(trailing_slash: TrailingSlash) -> Detector {
    Detector::builder(zones(), AdapterRegistry::with_defaults(&Config::default()))
        .trailing_slash(trailing_slash)
        .build()
        .expect("valid wiring")
}

fn app_with(detector: Detector, documents: InMemoryDocumentTree) -> Router {
    build_router(DetectorState::new(detector, documents, "cf-ipcountry"))
}

fn app() -> Router {
    app_with(detector(TrailingSlash::Strip), documents())
}

fn get(host: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::HOST, host)
        .body(Body::empty())
        .expect("valid request")
}

fn get_with(host: &str, uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).header(header::HOST, host);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).expect("valid request")
}

fn header_value<'a>(response: &'a Response, name: header::HeaderName) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn session_cookie(response: &Response) -> Option<String> {
    header_value(response, header::SET_COOKIE)?
        .split(';')
        .next()
        .map(str::to_string)
}

// ==================== Redirect Tests ====================

#[tokio::test]
async fn test_country_zone_redirects_invalid_country() {
    let response = app()
        .oneshot(get_with("example.ch", "/fr-de", &[("accept-language", "fr-FR,fr;q=0.8")]))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        header_value(&response, header::LOCATION),
        Some("https://example.ch/fr-fr")
    );
}

#[tokio::test]
async fn test_country_hint_header_drives_redirect() {
    let response = app()
        .oneshot(get_with(
            "example.ch",
            "/fr-de",
            &[("accept-language", "fr"), ("cf-ipcountry", "ch")],
        ))
        .await
        .expect("response");

    assert_eq!(
        header_value(&response, header::LOCATION),
        Some("https://example.ch/fr-ch")
    );
}

#[tokio::test]
async fn test_site_root_redirects_with_trailing_slash_policy() {
    let response = app()
        .oneshot(get_with("example.org", "/", &[("accept-language", "es-MX")]))
        .await
        .expect("response");
    assert_eq!(header_value(&response, header::LOCATION), Some("https://example.org/es"));

    let response = app_with(detector(TrailingSlash::Append), documents())
        .oneshot(get_with("example.org", "/", &[("accept-language", "es-MX")]))
        .await
        .expect("response");
    assert_eq!(header_value(&response, header::LOCATION), Some("https://example.org/es/"));
}

#[tokio::test]
async fn test_static_route_is_validated() {
    let response = app()
        .oneshot(get("example.org", "/es/news/2024"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::CONTENT_LANGUAGE), Some("es"));
}

// ==================== Continue Tests ====================

#[tokio::test]
async fn test_language_zone_valid_document_continues() {
    let response = app().oneshot(get("example.org", "/es")).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::CONTENT_LANGUAGE), Some("es"));
    assert!(session_cookie(&response).is_some_and(|c| c.starts_with("I18NSESSID=")));

    let body = json_body(response).await;
    assert_eq!(body["path"], "/es");
    assert_eq!(body["i18n"]["language_iso"], "es");
    assert_eq!(body["i18n"]["zone_id"], 3);
    assert_eq!(body["i18n"]["mode"], "language");
}

#[tokio::test]
async fn test_country_zone_valid_pair_continues() {
    let response = app().oneshot(get("example.ch", "/fr-ch")).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::CONTENT_LANGUAGE), Some("fr-CH"));

    let body = json_body(response).await;
    assert_eq!(body["i18n"]["country_iso"], "CH");
}

#[tokio::test]
async fn test_hardlink_serves_source_language() {
    let response = app().oneshot(get("example.org", "/es/shop")).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::CONTENT_LANGUAGE), Some("en"));

    let body = json_body(response).await;
    assert_eq!(body["i18n"]["locale"], "en");
}

// ==================== Declined Request Tests ====================

#[tokio::test]
async fn test_xml_http_request_is_not_redirected() {
    let response = app()
        .oneshot(get_with("example.org", "/it", &[("x-requested-with", "XMLHttpRequest")]))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::CONTENT_LANGUAGE).is_none());
    assert_eq!(json_body(response).await["i18n"], Value::Null);
}

#[tokio::test]
async fn test_editmode_is_never_redirected() {
    let response = app()
        .oneshot(get("example.org", "/it?_editmode=true"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["i18n"]["locale"], "it");
    assert_eq!(body["i18n"]["language_iso"], Value::Null);
}

#[tokio::test]
async fn test_admin_and_unknown_paths_pass_through() {
    for uri in ["/admin/documents", "/does-not-exist"] {
        let response = app().oneshot(get("example.org", uri)).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        assert_eq!(json_body(response).await["i18n"], Value::Null);
    }
}

// ==================== Error Tests ====================

#[tokio::test]
async fn test_missing_language_returns_server_error_with_fallback_locale() {
    let response = app()
        .oneshot(get("example.org", "/en/broken"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header_value(&response, header::CONTENT_LANGUAGE), Some("en"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    assert_eq!(
        String::from_utf8_lossy(&bytes),
        "Page (42) does not have a valid language property!"
    );
}

#[tokio::test]
async fn test_downstream_server_error_gets_fallback_locale() {
    let state = DetectorState::new(detector(TrailingSlash::Strip), documents(), "cf-ipcountry");
    let app = Router::new()
        .route("/es", get_route(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .layer(axum::middleware::from_fn_with_state(state, detector_middleware));

    // declined on the request path, the fallback still applies to the 500
    let response = app
        .oneshot(get_with("example.org", "/es", &[("x-requested-with", "XMLHttpRequest")]))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header_value(&response, header::CONTENT_LANGUAGE), Some("es"));
}

#[tokio::test]
async fn test_downstream_success_keeps_declined_response_untouched() {
    let state = DetectorState::new(detector(TrailingSlash::Strip), documents(), "cf-ipcountry");
    let app = Router::new()
        .route("/es", get_route(|| async { StatusCode::NO_CONTENT }))
        .layer(axum::middleware::from_fn_with_state(state, detector_middleware));

    let response = app
        .oneshot(get_with("example.org", "/es", &[("x-requested-with", "XMLHttpRequest")]))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().get(header::CONTENT_LANGUAGE).is_none());
}

// ==================== Session Tests ====================

#[tokio::test]
async fn test_forged_session_cookie_is_replaced() {
    let response = app()
        .oneshot(get_with("example.org", "/es", &[("cookie", "I18NSESSID=not-a-session")]))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).expect("new session cookie");
    let id = cookie.trim_start_matches("I18NSESSID=");
    assert_ne!(id, "not-a-session");
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[tokio::test]
async fn test_session_cookie_suppresses_repeated_switch() {
    let detector = detector(TrailingSlash::Strip);
    let mut events = detector.subscribe();
    let app = app_with(detector, documents());

    let first = app.clone().oneshot(get("example.org", "/es")).await.expect("response");
    let cookie = session_cookie(&first).expect("new session cookie");

    let event: ContextSwitchEvent = events.try_recv().expect("first visit switches");
    assert!(event.zone_has_switched);
    assert_eq!(event.zone_from, None);
    assert_eq!(event.zone_to, Some(3));
    assert_eq!(event.language_to.as_deref(), Some("es"));

    let second = app
        .clone()
        .oneshot(get_with("example.org", "/es", &[("cookie", cookie.as_str())]))
        .await
        .expect("response");
    assert!(second.headers().get(header::SET_COOKIE).is_none());
    assert!(events.try_recv().is_err());

    let third = app
        .clone()
        .oneshot(get_with("example.ch", "/fr-ch", &[("cookie", cookie.as_str())]))
        .await
        .expect("response");
    assert_eq!(third.status(), StatusCode::OK);

    let event = events.try_recv().expect("zone and language switch");
    assert_eq!(event.zone_from, Some(3));
    assert_eq!(event.zone_to, Some(5));
    assert_eq!(event.language_from.as_deref(), Some("es"));
    assert_eq!(event.language_to.as_deref(), Some("fr"));
    assert!(!event.country_has_switched);

    let metrics = app
        .oneshot(get("example.org", METRICS_PATH))
        .await
        .expect("response");
    let report = json_body(metrics).await;
    assert_eq!(report["context_switches"], 2);
    assert_eq!(report["requests_checked"], 3);
}

// ==================== Definition File Tests ====================

#[tokio::test]
async fn test_zones_and_documents_from_files() {
    let dir = TempDir::new().expect("temp dir");
    let zones_path = dir.path().join("zones.json");
    let documents_path = dir.path().join("documents.json");

    std::fs::write(
        &zones_path,
        r#"{
            "zones": [{
                "id": 9,
                "name": "nordic",
                "sites": [{ "host": "example.se", "locales": [{ "language": "sv", "path": "/sv" }] }],
                "config": { "language_adapter": "custom", "languages": ["sv"], "default_language": "sv" }
            }]
        }"#,
    )
    .expect("write zones");
    std::fs::write(
        &documents_path,
        r#"{
            "documents": [
                { "id": 1, "type": "page", "path": "/" },
                { "id": 2, "type": "page", "path": "/sv", "language": "sv" }
            ]
        }"#,
    )
    .expect("write documents");

    let detector = Detector::builder(
        ZoneRegistry::from_file(&zones_path).expect("zones"),
        AdapterRegistry::with_defaults(&Config::default()),
    )
    .build()
    .expect("valid wiring");
    let app = app_with(detector, InMemoryDocumentTree::from_file(&documents_path).expect("documents"));

    let root = app.clone().oneshot(get("example.se:8080", "/")).await.expect("response");
    assert_eq!(root.status(), StatusCode::FOUND);
    assert_eq!(header_value(&root, header::LOCATION), Some("https://example.se/sv"));

    let page = app.oneshot(get("example.se", "/sv/")).await.expect("response");
    assert_eq!(header_value(&page, header::CONTENT_LANGUAGE), Some("sv"));
}
