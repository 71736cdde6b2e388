use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Syndication dialect a provider publishes its status page in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    /// Atom 1.0 (`<feed>` / `<entry>`).
    #[default]
    Atom,
    /// RSS 2.0 or RSS 1.0 (`<rss>` or `<rdf:RDF>` / `<item>`).
    Rss,
}

impl fmt::Display for FeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom => f.write_str("atom"),
            Self::Rss => f.write_str("rss"),
        }
    }
}

/// A single affected product listed on an incident.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Component {
    /// Product name, e.g. "Chat Completions"
    pub name: String,
    /// Operational state reported next to the name, empty when absent
    pub status: String,
}

/// A status-page entry describing an outage, degradation or resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    /// Provider-assigned entry ID (Atom `<id>`, RSS `<guid>`)
    pub id: String,
    /// Name of the provider this incident was read from
    pub provider: String,
    /// Human-readable headline
    pub title: String,
    /// Current status, e.g. "Investigating" or "Resolved"
    pub status: String,
    /// Affected products in feed order
    pub components: Vec<Component>,
    /// Plain-text summary of the latest update
    pub detail: String,
    /// URL of the incident page
    pub link: String,
    /// When the entry was last updated
    pub timestamp: DateTime<Utc>,
}

impl Incident {
    /// Stable identity used to recognise the same incident across polls.
    ///
    /// Falls back to the incident link when the feed carries no ID.
    pub fn key(&self) -> &str {
        if self.id.is_empty() { &self.link } else { &self.id }
    }

    /// Distinct affected product names, in feed order.
    pub fn products(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.components.len());
        for component in &self.components {
            if !names.contains(&component.name.as_str()) {
                names.push(&component.name);
            }
        }
        names
    }

    /// Comma-separated product names, or `N/A` when none are listed.
    pub fn product_names(&self) -> String {
        let products = self.products();
        if products.is_empty() { "N/A".to_owned() } else { products.join(", ") }
    }
}
