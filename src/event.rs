//! Context switch notification and the bus it is published on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::zone::ZoneId;

/// Event name listeners subscribe to.
pub const CONTEXT_SWITCH: &str = "i18n.switch";

/// Raised when zone, language or country differ from the visitor's last
/// request. All three from/to pairs are always present; the flags tell which
/// of them actually changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSwitchEvent {
    pub zone_has_switched: bool,
    pub zone_from: Option<ZoneId>,
    pub zone_to: Option<ZoneId>,

    pub language_has_switched: bool,
    pub language_from: Option<String>,
    pub language_to: Option<String>,

    pub country_has_switched: bool,
    pub country_from: Option<String>,
    pub country_to: Option<String>,

    /// Request URI that caused the switch
    pub triggered_by: String,
    pub occurred_at: DateTime<Utc>,
}

impl ContextSwitchEvent {
    /// Names of the dimensions that changed, in zone/language/country order.
    pub fn switched_dimensions(&self) -> Vec<&'static str> {
        [
            (self.zone_has_switched, "zone"),
            (self.language_has_switched, "language"),
            (self.country_has_switched, "country"),
        ]
        .into_iter()
        .filter_map(|(switched, name)| switched.then_some(name))
        .collect()
    }
}

/// Broadcast bus for [`ContextSwitchEvent`]s.
///
/// Publishing never blocks; slow subscribers lag and lose the oldest events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ContextSwitchEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ContextSwitchEvent> {
        self.sender.subscribe()
    }

    /// Publish an event; returns the number of subscribers that received it.
    pub fn publish(&self, event: ContextSwitchEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("{} dispatched without listeners", CONTEXT_SWITCH);
                0
            }
        }
    }
}
