//! Visitor locale guessing.
//!
//! The guesser only proposes a language or country among the active ones of
//! the current zone; callers fall back to the zone defaults on `None`.

use crate::i18n::language::{CountryInfo, LanguageInfo};
use crate::request::RequestInfo;

pub trait LocaleGuesser: Send + Sync {
    fn guess_language(&self, request: &RequestInfo, valid: &[LanguageInfo]) -> Option<String>;

    fn guess_country(&self, request: &RequestInfo, valid: &[CountryInfo]) -> Option<String>;
}

/// Guesses from `Accept-Language` and the edge country header.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderLocaleGuesser;

impl LocaleGuesser for HeaderLocaleGuesser {
    fn guess_language(&self, request: &RequestInfo, valid: &[LanguageInfo]) -> Option<String> {
        let header = request.accept_language.as_deref()?;

        for tag in parse_accept_language(header) {
            if let Some(lang) = valid.iter().find(|l| l.iso_code.eq_ignore_ascii_case(&tag)) {
                return Some(lang.iso_code.clone());
            }

            let primary = tag.split('_').next().unwrap_or(&tag);
            if let Some(lang) = valid.iter().find(|l| l.iso_code.eq_ignore_ascii_case(primary)) {
                return Some(lang.iso_code.clone());
            }
        }

        None
    }

    fn guess_country(&self, request: &RequestInfo, valid: &[CountryInfo]) -> Option<String> {
        let is_valid = |code: &str| valid.iter().any(|c| c.iso_code == code);

        if let Some(hint) = request.country_hint.as_deref() {
            let hint = hint.trim().to_uppercase();
            if is_valid(&hint) {
                return Some(hint);
            }
        }

        let header = request.accept_language.as_deref()?;
        parse_accept_language(header)
            .iter()
            .filter_map(|tag| tag.split('_').nth(1))
            .map(str::to_uppercase)
            .find(|region| region.len() == 2 && is_valid(region))
    }
}

/// Parse an `Accept-Language` header into tags ordered by quality.
///
/// Tags use `_` as separator (`de-CH` becomes `de_CH`); `*` and tags with
/// `q=0` are dropped.
pub fn parse_accept_language(header: &str) -> Vec<String> {
    let mut weighted: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let tag = parts.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }

            let quality = parts
                .filter_map(|param| param.trim().strip_prefix("q="))
                .find_map(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            if quality <= 0.0 {
                return None;
            }

            Some((tag.replace('-', "_"), quality))
        })
        .collect();

    // stable: equal weights keep header order
    weighted.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    weighted.into_iter().map(|(tag, _)| tag).collect()
}
