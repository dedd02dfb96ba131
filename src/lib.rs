//! Zone-aware language and country detection for web requests.
//!
//! The [`Detector`] validates the language/country of the requested document
//! against the zone serving the host, redirects visitors to a matching locale
//! root when needed, and reports context switches tracked in the session.

pub mod config;
pub mod context;
pub mod detector;
pub mod document;
pub mod error;
pub mod event;
pub mod i18n;
pub mod metrics;
pub mod middleware;
pub mod path_generator;
pub mod request;
pub mod server;
pub mod session;
pub mod zone;

pub use config::{Config, TrailingSlash};
pub use context::I18nContext;
pub use detector::{DeclineReason, Detector, DetectorBuilder, Outcome};
pub use error::{DetectorError, DetectorResult};
pub use event::{ContextSwitchEvent, EventBus};
pub use middleware::DetectorState;
