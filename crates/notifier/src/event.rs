use std::fmt;

use feed::Incident;
use serde::Serialize;

/// Why an incident is being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// First time this incident identity has been seen.
    New,
    /// A known incident reappeared with a different status.
    Updated,
    /// Reported once on startup as context, not as a change.
    Historical,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => f.write_str("new"),
            Self::Updated => f.write_str("updated"),
            Self::Historical => f.write_str("historical"),
        }
    }
}

/// A detected incident change handed to the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncidentEvent {
    /// Kind of change
    pub kind: EventKind,
    /// Incident as parsed from the feed
    pub incident: Incident,
}

impl IncidentEvent {
    /// Event for an incident seen for the first time.
    pub const fn new_incident(incident: Incident) -> Self {
        Self { kind: EventKind::New, incident }
    }

    /// Event for an incident whose status changed.
    pub const fn updated(incident: Incident) -> Self {
        Self { kind: EventKind::Updated, incident }
    }

    /// Event for an incident replayed as startup context.
    pub const fn historical(incident: Incident) -> Self {
        Self { kind: EventKind::Historical, incident }
    }
}
