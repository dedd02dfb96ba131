//! Session context tracking.
//!
//! The last zone, language and country of a visitor live in the
//! `i18n_session` namespace of the session store under the keys
//! `lastZoneId`, `lastLanguage` and `lastCountry`. Language and country are
//! three-state: never tracked, cleared, or a known value.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::event::{ContextSwitchEvent, EventBus};
use crate::zone::ZoneId;

pub const SESSION_NAMESPACE: &str = "i18n_session";
pub const LAST_LANGUAGE_KEY: &str = "lastLanguage";
pub const LAST_COUNTRY_KEY: &str = "lastCountry";
pub const LAST_ZONE_KEY: &str = "lastZoneId";

pub const DEFAULT_SESSION_CAPACITY: usize = 10_000;
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 30;

/// State of one tracked dimension.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Tracked<T> {
    /// Never recorded for this session
    #[default]
    Unset,
    /// Recorded as empty
    Cleared,
    Known(T),
}

impl<T> Tracked<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Tracked::Known(value) => Some(value),
            Tracked::Unset | Tracked::Cleared => None,
        }
    }
}

impl Tracked<String> {
    fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Bool(false)) => Tracked::Unset,
            Some(Value::Null) => Tracked::Cleared,
            Some(Value::String(s)) => Tracked::Known(s.clone()),
            Some(other) => {
                warn!("Ignoring unexpected session value {}", other);
                Tracked::Unset
            }
        }
    }

    fn to_value(&self) -> Option<Value> {
        match self {
            Tracked::Unset => None,
            Tracked::Cleared => Some(Value::Null),
            Tracked::Known(s) => Some(Value::String(s.clone())),
        }
    }
}

/// Last known i18n context of a visitor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionI18nState {
    pub last_language: Tracked<String>,
    pub last_country: Tracked<String>,
    pub last_zone_id: Option<ZoneId>,
}

impl SessionI18nState {
    /// Read the state from a session namespace bag.
    pub fn from_bag(bag: &Map<String, Value>) -> Self {
        Self {
            last_language: Tracked::from_value(bag.get(LAST_LANGUAGE_KEY)),
            last_country: Tracked::from_value(bag.get(LAST_COUNTRY_KEY)),
            last_zone_id: bag
                .get(LAST_ZONE_KEY)
                .and_then(Value::as_u64)
                .and_then(|id| ZoneId::try_from(id).ok()),
        }
    }

    /// Write the state back; untracked dimensions leave no key behind.
    pub fn write_to(&self, bag: &mut Map<String, Value>) {
        for (key, tracked) in [
            (LAST_LANGUAGE_KEY, &self.last_language),
            (LAST_COUNTRY_KEY, &self.last_country),
        ] {
            match tracked.to_value() {
                Some(value) => {
                    bag.insert(key.to_string(), value);
                }
                None => {
                    bag.remove(key);
                }
            }
        }

        let zone = self.last_zone_id.map(Value::from).unwrap_or(Value::Null);
        bag.insert(LAST_ZONE_KEY.to_string(), zone);
    }
}

/// Context resolved for the current request.
///
/// `None` for language or country means the dimension was not evaluated (or
/// not valid) on this request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CurrentContext {
    pub zone_id: Option<ZoneId>,
    pub language: Option<String>,
    pub country: Option<String>,
}

/// Compare the session with the current request.
pub fn diff(
    session: &SessionI18nState,
    current: &CurrentContext,
    triggered_by: &str,
) -> Option<ContextSwitchEvent> {
    let language_has_switched = match session.last_language.known() {
        None => true,
        Some(last) => current.language.as_ref() != Some(last),
    };

    let country_has_switched = match session.last_country.known() {
        None => false,
        Some(last) => current.country.as_ref() != Some(last),
    };

    let zone_has_switched = session.last_zone_id != current.zone_id;

    if !(zone_has_switched || language_has_switched || country_has_switched) {
        return None;
    }

    Some(ContextSwitchEvent {
        zone_has_switched,
        zone_from: session.last_zone_id,
        zone_to: current.zone_id,
        language_has_switched,
        language_from: session.last_language.known().cloned(),
        language_to: current.language.clone(),
        country_has_switched,
        country_from: session.last_country.known().cloned(),
        country_to: current.country.clone(),
        triggered_by: triggered_by.to_string(),
        occurred_at: Utc::now(),
    })
}

/// Store the current context in the session.
///
/// The zone is always written; language and country only when the request
/// supplied a value, so a still valid session value survives requests that
/// did not evaluate that dimension.
pub fn commit(session: &mut SessionI18nState, current: &CurrentContext) {
    if let Some(language) = &current.language {
        session.last_language = Tracked::Known(language.clone());
    }
    if let Some(country) = &current.country {
        session.last_country = Tracked::Known(country.clone());
    }
    session.last_zone_id = current.zone_id;
}

pub trait SessionStore: Send + Sync {
    fn load(&self, session_id: &str) -> SessionI18nState;

    fn save(&self, session_id: &str, state: &SessionI18nState);
}

#[derive(Debug)]
struct SessionEntry {
    namespaces: HashMap<String, Map<String, Value>>,
    touched: DateTime<Utc>,
}

impl SessionEntry {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            namespaces: HashMap::new(),
            touched: now,
        }
    }
}

/// Sessions kept in process memory, keyed by session id.
///
/// Holds at most `capacity` sessions and evicts the least recently used one
/// first. A session idle for longer than `ttl` is dropped on its next access.
pub struct InMemorySessionStore {
    entries: Mutex<LruCache<String, SessionEntry>>,
    ttl: Duration,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::with_limits(
            DEFAULT_SESSION_CAPACITY,
            Duration::minutes(DEFAULT_SESSION_TTL_MINUTES),
        )
    }
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A capacity of zero keeps a single session.
    pub fn with_limits(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<String, SessionEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_expired(&self, entry: &SessionEntry, now: DateTime<Utc>) -> bool {
        now - entry.touched > self.ttl
    }

    /// Raw `i18n_session` bag of a session.
    pub fn bag(&self, session_id: &str) -> Option<Map<String, Value>> {
        let now = Utc::now();
        let mut entries = self.entries();

        if entries
            .peek(session_id)
            .is_some_and(|entry| self.is_expired(entry, now))
        {
            entries.pop(session_id);
            debug!("Session {} expired", session_id);
            return None;
        }

        let entry = entries.get_mut(session_id)?;
        entry.touched = now;
        entry.namespaces.get(SESSION_NAMESPACE).cloned()
    }

    /// Set a raw value in a session bag.
    pub fn set_raw(&self, session_id: &str, key: &str, value: Value) {
        self.update(session_id, |bag| {
            bag.insert(key.to_string(), value);
        });
    }

    fn update(&self, session_id: &str, apply: impl FnOnce(&mut Map<String, Value>)) {
        let now = Utc::now();
        let mut entries = self.entries();

        let mut entry = match entries.pop(session_id) {
            Some(entry) if !self.is_expired(&entry, now) => entry,
            _ => SessionEntry::new(now),
        };
        apply(entry.namespaces.entry(SESSION_NAMESPACE.to_string()).or_default());
        entry.touched = now;

        if let Some((evicted, _)) = entries.push(session_id.to_string(), entry) {
            debug!("Session store full, evicted session {}", evicted);
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, session_id: &str) -> SessionI18nState {
        self.bag(session_id)
            .map(|bag| SessionI18nState::from_bag(&bag))
            .unwrap_or_default()
    }

    fn save(&self, session_id: &str, state: &SessionI18nState) {
        self.update(session_id, |bag| state.write_to(bag));
    }
}

/// Diffs, reports and persists the context of each request.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    bus: EventBus,
}

impl SessionTracker {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Load the session, report a switch if any, then commit and save.
    pub fn track(
        &self,
        store: &dyn SessionStore,
        session_id: &str,
        current: &CurrentContext,
        triggered_by: &str,
    ) -> Option<ContextSwitchEvent> {
        let mut session = store.load(session_id);
        let event = diff(&session, current, triggered_by);

        if let Some(event) = &event {
            if event.zone_has_switched {
                info!(
                    "switch zone: from {} to {}. triggered by: {}",
                    or_none(&event.zone_from),
                    or_none(&event.zone_to),
                    triggered_by
                );
            }
            if event.language_has_switched {
                info!(
                    "switch language: from {} to {}. triggered by: {}",
                    or_none(&event.language_from),
                    or_none(&event.language_to),
                    triggered_by
                );
            }
            if event.country_has_switched {
                info!(
                    "switch country: from {} to {}. triggered by: {}",
                    or_none(&event.country_from),
                    or_none(&event.country_to),
                    triggered_by
                );
            }
            self.bus.publish(event.clone());
        }

        commit(&mut session, current);
        store.save(session_id, &session);
        event
    }
}

fn or_none<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string())
}
