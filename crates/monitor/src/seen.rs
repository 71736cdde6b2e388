use std::collections::HashMap;

use feed::Incident;
use notifier::IncidentEvent;

/// Incident identities already reported for one provider, with their last status.
///
/// Entries are never removed; a status is overwritten when the same identity
/// comes back with a different one.
#[derive(Debug, Clone, Default)]
pub struct SeenIncidentIndex {
    statuses: HashMap<String, String>,
    baseline: bool,
}

impl SeenIncidentIndex {
    /// Create an empty index with no baseline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare a freshly parsed feed against the index and return the events to report.
    ///
    /// The first call establishes the baseline: every incident is recorded
    /// silently and, when `history` is `Some(n)`, the first `n` incidents are
    /// returned as historical events. Later calls report identities never seen
    /// before as new and known identities with a different status as updated.
    pub fn diff(&mut self, incidents: Vec<Incident>, history: Option<usize>) -> Vec<IncidentEvent> {
        if !self.baseline {
            self.baseline = true;
            for inc in &incidents {
                self.statuses.insert(inc.key().to_owned(), inc.status.clone());
            }
            return match history {
                Some(limit) => {
                    incidents.into_iter().take(limit).map(IncidentEvent::historical).collect()
                }
                None => Vec::new(),
            };
        }

        let mut events = Vec::new();
        for inc in incidents {
            match self.statuses.get_mut(inc.key()) {
                None => {
                    self.statuses.insert(inc.key().to_owned(), inc.status.clone());
                    events.push(IncidentEvent::new_incident(inc));
                }
                Some(status) if *status != inc.status => {
                    status.clone_from(&inc.status);
                    events.push(IncidentEvent::updated(inc));
                }
                Some(_) => {}
            }
        }
        events
    }

    /// Number of tracked identities.
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    /// Whether no identity has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Last recorded status of an identity.
    pub fn status_of(&self, key: &str) -> Option<&str> {
        self.statuses.get(key).map(String::as_str)
    }

    /// Whether the first successful parse has been recorded.
    pub const fn has_baseline(&self) -> bool {
        self.baseline
    }
}
