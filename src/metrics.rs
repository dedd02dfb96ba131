//! Detection metrics.
//!
//! Counters for the decisions taken by the detector: how many requests were
//! checked or declined, how many ended in a redirect or a locale rewrite,
//! and how many context switches were reported.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct DetectorMetrics {
    /// Requests that passed every gate and were resolved
    requests_checked: AtomicUsize,

    /// Requests the detector declined to act on
    requests_declined: AtomicUsize,

    /// Requests answered with a redirect
    redirects: AtomicUsize,

    /// Requests whose locale was rewritten
    locale_rewrites: AtomicUsize,

    /// Context switch events raised
    context_switches: AtomicUsize,

    /// Documents rejected for a missing language property
    configuration_errors: AtomicUsize,
}

impl DetectorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a request that passed every gate.
    pub fn record_request_checked(&self) {
        self.requests_checked.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request left alone by a gate.
    pub fn record_request_declined(&self) {
        self.requests_declined.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a redirect to a locale root.
    pub fn record_redirect(&self) {
        self.redirects.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request whose locale changed.
    pub fn record_locale_rewrite(&self) {
        self.locale_rewrites.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a reported zone/language/country switch.
    pub fn record_context_switch(&self) {
        self.context_switches.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a document without a language property.
    pub fn record_configuration_error(&self) {
        self.configuration_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of requests resolved.
    pub fn requests_checked(&self) -> usize {
        self.requests_checked.load(Ordering::Relaxed)
    }

    /// Number of requests declined.
    pub fn requests_declined(&self) -> usize {
        self.requests_declined.load(Ordering::Relaxed)
    }

    /// Number of redirects issued.
    pub fn redirects(&self) -> usize {
        self.redirects.load(Ordering::Relaxed)
    }

    /// Number of locale rewrites.
    pub fn locale_rewrites(&self) -> usize {
        self.locale_rewrites.load(Ordering::Relaxed)
    }

    /// Number of context switches reported.
    pub fn context_switches(&self) -> usize {
        self.context_switches.load(Ordering::Relaxed)
    }

    /// Number of documents rejected for a missing language.
    pub fn configuration_errors(&self) -> usize {
        self.configuration_errors.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let checked = self.requests_checked();
        let redirects = self.redirects();
        let redirect_rate = if checked > 0 {
            (redirects as f64 / checked as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            requests_checked: checked,
            requests_declined: self.requests_declined(),
            redirects,
            redirect_rate,
            locale_rewrites: self.locale_rewrites(),
            context_switches: self.context_switches(),
            configuration_errors: self.configuration_errors(),
        }
    }
}

/// Snapshot of the detector counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub requests_checked: usize,
    pub requests_declined: usize,
    pub redirects: usize,

    /// Share of checked requests that were redirected, in percent (0-100)
    pub redirect_rate: f64,

    pub locale_rewrites: usize,
    pub context_switches: usize,
    pub configuration_errors: usize,
}
