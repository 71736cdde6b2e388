//! Status pages embed a small HTML fragment in each entry: a bold
//! `Status: X` line, free text, then an "Affected components" list.
use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;

use crate::models::Component;

static STATUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<b>Status:\s*(.+?)</b>").expect("valid status regex"));
static COMPONENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<li>(.+?)</li>").expect("valid component regex"));
static COMPONENT_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*\(([^)]+)\)\s*$").expect("valid split regex"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

const AFFECTED_MARKER: &str = "<b>affected components</b>";

/// Status reported when an entry has no `Status:` line.
pub const UNKNOWN_STATUS: &str = "Unknown";

/// Remove HTML tags and collapse whitespace.
pub fn strip_html(text: &str) -> String {
    let clean = TAG_RE.replace_all(text, " ");
    clean.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract the status from a `<b>Status: X</b>` line.
pub fn parse_status(html: &str) -> String {
    STATUS_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| strip_html(m.as_str()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_STATUS.to_owned())
}

/// Extract affected components from `<li>` items.
///
/// Items look like `Chat Completions (Operational)` or just `Chat Completions`.
/// Duplicate items are dropped.
pub fn parse_components(html: &str) -> Vec<Component> {
    let mut seen = HashSet::new();
    let mut components = Vec::new();

    for caps in COMPONENT_RE.captures_iter(html) {
        let raw = strip_html(&caps[1]);
        if raw.is_empty() || !seen.insert(raw.clone()) {
            continue;
        }

        let component = match COMPONENT_SPLIT_RE.captures(&raw) {
            Some(split) => Component {
                name: split[1].trim().to_owned(),
                status: split[2].trim().to_owned(),
            },
            None => Component { name: raw, status: String::new() },
        };
        components.push(component);
    }

    components
}

/// Human-readable summary without the status prefix or the component list.
pub fn parse_summary(html: &str) -> String {
    let text = STATUS_RE.replace_all(html, "");
    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let cut = text.to_ascii_lowercase().find(AFFECTED_MARKER).unwrap_or(text.len());
    strip_html(&text[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_html_removes_tags() {
        assert_eq!(strip_html("<b>Hello</b> <i>World</i>"), "Hello World");
    }

    #[test]
    fn strip_html_collapses_whitespace() {
        assert_eq!(strip_html("  foo   bar  "), "foo bar");
        assert_eq!(strip_html(""), "");
    }

    #[test]
    fn status_is_extracted() {
        assert_eq!(parse_status("<b>Status: Resolved</b><br/>Details here"), "Resolved");
        assert_eq!(parse_status("<B>status:   Investigating</B>"), "Investigating");
    }

    #[test]
    fn status_defaults_to_unknown() {
        assert_eq!(parse_status("No status here"), UNKNOWN_STATUS);
    }

    #[test]
    fn components_are_split_and_deduplicated() {
        let html = "<ul>
            <li>Conversations (Operational)</li>
            <li>Chat Completions (Degraded)</li>
            <li>Chat Completions (Degraded)</li>
            <li>Some Service</li>
        </ul>";
        let components = parse_components(html);
        assert_eq!(components.len(), 3);
        assert_eq!(components[1].name, "Chat Completions");
        assert_eq!(components[1].status, "Degraded");
        assert_eq!(components[2].name, "Some Service");
        assert_eq!(components[2].status, "");
    }

    #[test]
    fn summary_drops_status_and_components() {
        let html = "<b>Status: Resolved</b><br/><br/>All impacted services recovered.\
                    <br/><br/><b>Affected components</b><ul><li>API (OK)</li></ul>";
        assert_eq!(parse_summary(html), "All impacted services recovered.");
    }
}
