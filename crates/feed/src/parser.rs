use std::{collections::HashMap, fmt};

use chrono::{DateTime, Utc};
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};

use crate::{
    html::{parse_components, parse_status, parse_summary, strip_html},
    models::{FeedType, Incident},
};

/// Errors raised when a body is not a well-formed feed of the expected dialect.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The XML reader rejected the document.
    #[error("malformed XML at byte {position}: {message}")]
    Xml {
        /// Byte offset reported by the reader
        position: u64,
        /// Reader error description
        message: String,
    },
    /// The body contained no element at all.
    #[error("document has no root element")]
    Empty,
    /// The root element does not belong to the declared dialect.
    #[error("expected an {expected} feed, found root element <{found}>")]
    UnexpectedRoot {
        /// Dialect the provider is configured with
        expected: FeedType,
        /// Local name of the root element found
        found: String,
    },
    /// The document ended while an element was still open.
    #[error("document ended inside <{0}>")]
    Truncated(String),
}

/// Decodes feed bytes into incidents, most recent first as published.
///
/// Implementations must be pure: the same input always yields the same output.
pub trait FeedParser: Send + Sync + fmt::Debug {
    /// Parse `body` as a feed of `feed_type`, tagging incidents with `provider`.
    fn parse(
        &self,
        body: &[u8],
        feed_type: FeedType,
        provider: &str,
    ) -> Result<Vec<Incident>, ParseError>;
}

/// [`FeedParser`] backed by a streaming `quick-xml` reader.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlFeedParser;

impl FeedParser for XmlFeedParser {
    fn parse(
        &self,
        body: &[u8],
        feed_type: FeedType,
        provider: &str,
    ) -> Result<Vec<Incident>, ParseError> {
        parse_feed(body, feed_type, provider)
    }
}

/// Parse a feed body of the given dialect into incidents.
pub fn parse_feed(
    body: &[u8],
    feed_type: FeedType,
    provider: &str,
) -> Result<Vec<Incident>, ParseError> {
    let dialect = Dialect::of(feed_type);
    let entries = read_entries(body, &dialect)?;
    Ok(entries.into_iter().map(|raw| dialect.to_incident(&raw, provider)).collect())
}

struct Dialect {
    feed_type: FeedType,
    roots: &'static [&'static str],
    entry: &'static str,
}

impl Dialect {
    const fn of(feed_type: FeedType) -> Self {
        match feed_type {
            FeedType::Atom => Self { feed_type, roots: &["feed"], entry: "entry" },
            FeedType::Rss => Self { feed_type, roots: &["rss", "RDF"], entry: "item" },
        }
    }

    fn check_root(&self, name: &str) -> Result<(), ParseError> {
        if self.roots.contains(&name) {
            Ok(())
        } else {
            Err(ParseError::UnexpectedRoot { expected: self.feed_type, found: name.to_owned() })
        }
    }

    fn to_incident(&self, raw: &RawEntry, provider: &str) -> Incident {
        let (id, link, published, html) = match self.feed_type {
            FeedType::Atom => (
                raw.get("id"),
                raw.link_href.as_ref().map(|(href, _)| href.as_str()),
                raw.get("updated").or_else(|| raw.get("published")),
                raw.get("summary").or_else(|| raw.get("content")),
            ),
            FeedType::Rss => (
                raw.get("guid").or_else(|| raw.get("link")),
                raw.get("link").or_else(|| raw.link_href.as_ref().map(|(href, _)| href.as_str())),
                raw.get("pubDate").or_else(|| raw.get("date")),
                raw.get("encoded").or_else(|| raw.get("description")),
            ),
        };
        let html = html.unwrap_or_default();

        Incident {
            id: id.unwrap_or_default().to_owned(),
            provider: provider.to_owned(),
            title: strip_html(raw.get("title").unwrap_or_default()),
            status: parse_status(html),
            components: parse_components(html),
            detail: parse_summary(html),
            link: link.unwrap_or_default().to_owned(),
            timestamp: parse_timestamp(published),
        }
    }
}

/// Text content of the direct children of one `<entry>`/`<item>`, keyed by
/// local element name.
#[derive(Debug, Default)]
struct RawEntry {
    fields: HashMap<String, String>,
    /// First `href` link, and whether it is the `alternate` one
    link_href: Option<(String, bool)>,
}

impl RawEntry {
    fn append(&mut self, field: &str, text: &str) {
        self.fields.entry(field.to_owned()).or_default().push_str(text);
    }

    fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|s| s.trim()).filter(|s| !s.is_empty())
    }

    fn capture_link(&mut self, element: &BytesStart<'_>) {
        let Some(href) = attribute(element, "href") else { return };
        let alternate = attribute(element, "rel").is_none_or(|rel| rel == "alternate");
        match &self.link_href {
            Some((_, true)) => {}
            Some((_, false)) if !alternate => {}
            _ => self.link_href = Some((href, alternate)),
        }
    }
}

fn read_entries(body: &[u8], dialect: &Dialect) -> Result<Vec<RawEntry>, ParseError> {
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut root_seen = false;
    let mut current: Option<(usize, RawEntry)> = None;
    let mut entries = Vec::new();

    loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(e) => return Err(xml_error(&reader, e)),
        };

        match event {
            Event::Start(e) => {
                let name = local_name(&e);
                if !root_seen {
                    dialect.check_root(&name)?;
                    root_seen = true;
                }
                open.push(name);
                let depth = open.len();
                match &mut current {
                    None if open[depth - 1] == dialect.entry => {
                        current = Some((depth, RawEntry::default()));
                    }
                    Some((entry_depth, raw)) if depth == *entry_depth + 1 && e.local_name().as_ref() == b"link" => {
                        raw.capture_link(&e);
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let name = local_name(&e);
                if !root_seen {
                    dialect.check_root(&name)?;
                    root_seen = true;
                }
                if let Some((entry_depth, raw)) = &mut current {
                    if open.len() == *entry_depth && name == "link" {
                        raw.capture_link(&e);
                    }
                }
            }
            Event::Text(text) => {
                if let Some((entry_depth, raw)) = &mut current {
                    if open.len() == *entry_depth + 1 {
                        let value = text.unescape().map_err(|e| xml_error(&reader, e))?;
                        raw.append(&open[open.len() - 1], &value);
                    }
                }
            }
            Event::CData(data) => {
                if let Some((entry_depth, raw)) = &mut current {
                    if open.len() == *entry_depth + 1 {
                        raw.append(&open[open.len() - 1], &String::from_utf8_lossy(&data));
                    }
                }
            }
            Event::End(_) => {
                let depth = open.len();
                if current.as_ref().is_some_and(|(entry_depth, _)| *entry_depth == depth) {
                    if let Some((_, raw)) = current.take() {
                        entries.push(raw);
                    }
                }
                open.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(unclosed) = open.pop() {
        return Err(ParseError::Truncated(unclosed));
    }
    if !root_seen {
        return Err(ParseError::Empty);
    }
    Ok(entries)
}

fn xml_error<R>(reader: &Reader<R>, err: impl fmt::Display) -> ParseError {
    ParseError::Xml {
        position: u64::try_from(reader.buffer_position()).unwrap_or(u64::MAX),
        message: err.to_string(),
    }
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Option<String> {
    element
        .try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// RFC 3339 (Atom) or RFC 2822 (RSS); anything else is stamped with "now".
fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| {
        DateTime::parse_from_rfc3339(s).or_else(|_| DateTime::parse_from_rfc2822(s)).ok()
    })
    .map_or_else(Utc::now, |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const ATOM_FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
    <id>https://status.openai.com/</id>
    <title>OpenAI status</title>
    <updated>2026-02-22T14:54:30.659Z</updated>
    <link rel="alternate" href="https://status.openai.com/"/>
    <entry>
        <title type="html"><![CDATA[Increased latency in ChatGPT for some users]]></title>
        <id>https://status.openai.com//incidents/01KHYH2KT8VNWS146V0S09MF29</id>
        <link href="https://status.openai.com//incidents/01KHYH2KT8VNWS146V0S09MF29"/>
        <updated>2026-02-20T22:44:27.567Z</updated>
        <summary type="html"><![CDATA[<b>Status: Resolved</b><br/><br/>All impacted services have now fully recovered.<br/><br/><b>Affected components</b>
          <ul>
          <li>Conversations (Operational)</li>
          </ul>]]></summary>
    </entry>
    <entry>
        <title type="html"><![CDATA[Sora 2 Degraded Performance]]></title>
        <id>https://status.openai.com//incidents/01KHRP7P1JF885BYA8SDWBDBR1</id>
        <link href="https://status.openai.com//incidents/01KHRP7P1JF885BYA8SDWBDBR1"/>
        <updated>2026-02-18T16:40:22.657Z</updated>
        <content type="html"><![CDATA[<b>Status: Investigating</b><br/><br/>We are looking into it.<br/><br/><b>Affected components</b>
          <ul>
          <li>Video generation (Degraded performance)</li>
          </ul>]]></content>
    </entry>
</feed>
"#;

    const RSS_FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
    <channel>
        <title>OpenAI status</title>
        <link>https://status.openai.com/</link>
        <item>
            <title><![CDATA[High error rate for Dall-e]]></title>
            <link>https://status.openai.com//incidents/01KEDRBQ2A3Y9JJ7G3F3YM4KT3</link>
            <guid>https://status.openai.com//incidents/01KEDRBQ2A3Y9JJ7G3F3YM4KT3</guid>
            <pubDate>Thu, 08 Jan 2026 02:45:00 GMT</pubDate>
            <description><![CDATA[<b>Status: Monitoring</b> short]]></description>
            <content:encoded><![CDATA[<b>Status: Resolved</b><br/><br/>All impacted services have now fully recovered.<br/><br/><b>Affected components</b>
              <ul>
              <li>Images (Operational)</li>
              </ul>]]></content:encoded>
        </item>
    </channel>
</rss>
"#;

    #[test]
    fn parses_atom_entries_in_feed_order() {
        let incidents = parse_feed(ATOM_FEED.as_bytes(), FeedType::Atom, "OpenAI").unwrap();
        assert_eq!(incidents.len(), 2);

        let first = &incidents[0];
        assert_eq!(first.title, "Increased latency in ChatGPT for some users");
        assert_eq!(first.status, "Resolved");
        assert_eq!(first.provider, "OpenAI");
        assert_eq!(first.detail, "All impacted services have now fully recovered.");
        assert_eq!(first.components.len(), 1);
        assert_eq!(first.components[0].name, "Conversations");
        assert!(first.id.contains("01KHYH2KT8VNWS146V0S09MF29"));
        assert!(first.link.starts_with("https://"));
        assert_eq!(
            first.timestamp,
            Utc.with_ymd_and_hms(2026, 2, 20, 22, 44, 27).unwrap()
                + chrono::Duration::milliseconds(567)
        );

        // falls back to <content> when <summary> is absent
        let second = &incidents[1];
        assert_eq!(second.status, "Investigating");
        assert_eq!(second.components[0].name, "Video generation");
        assert_eq!(second.components[0].status, "Degraded performance");
    }

    #[test]
    fn parses_rss_items_preferring_encoded_content() {
        let incidents = parse_feed(RSS_FEED.as_bytes(), FeedType::Rss, "OpenAI").unwrap();
        assert_eq!(incidents.len(), 1);

        let inc = &incidents[0];
        assert_eq!(inc.title, "High error rate for Dall-e");
        assert_eq!(inc.status, "Resolved");
        assert_eq!(inc.components[0].name, "Images");
        assert_eq!(inc.key(), "https://status.openai.com//incidents/01KEDRBQ2A3Y9JJ7G3F3YM4KT3");
        assert_eq!(inc.timestamp, Utc.with_ymd_and_hms(2026, 1, 8, 2, 45, 0).unwrap());
    }

    #[test]
    fn parses_escaped_html_without_cdata() {
        let body = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>
            <id>inc-1</id><title>API errors</title>
            <summary type="html">&lt;b&gt;Status: Identified&lt;/b&gt; Fix rolling out</summary>
            </entry></feed>"#;
        let incidents = parse_feed(body.as_bytes(), FeedType::Atom, "Acme").unwrap();
        assert_eq!(incidents[0].status, "Identified");
        assert_eq!(incidents[0].detail, "Fix rolling out");
    }

    #[test]
    fn nested_elements_do_not_leak_into_fields() {
        let body = r#"<feed><entry><id>a</id><author><name>ops</name></author>
            <title>Outage</title></entry></feed>"#;
        let incidents = parse_feed(body.as_bytes(), FeedType::Atom, "Acme").unwrap();
        assert_eq!(incidents[0].title, "Outage");
        assert_eq!(incidents[0].status, "Unknown");
    }

    #[test]
    fn parses_rss_one_rdf_documents() {
        let body = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
            <item><title>Down</title><link>https://x.test/1</link></item></rdf:RDF>"#;
        let incidents = parse_feed(body.as_bytes(), FeedType::Rss, "X").unwrap();
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].id, "https://x.test/1");
    }

    #[test]
    fn empty_feed_yields_no_incidents() {
        let incidents = parse_feed(b"<feed/>", FeedType::Atom, "X").unwrap();
        assert!(incidents.is_empty());
    }

    #[test]
    fn rejects_wrong_dialect() {
        let err = parse_feed(RSS_FEED.as_bytes(), FeedType::Atom, "X").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedRoot { ref found, .. } if found == "rss"));
    }

    #[test]
    fn rejects_non_xml_and_truncated_bodies() {
        assert!(matches!(
            parse_feed(b"service unavailable", FeedType::Atom, "X"),
            Err(ParseError::Empty)
        ));
        assert!(matches!(
            parse_feed(b"<feed><entry><id>1</id>", FeedType::Atom, "X"),
            Err(ParseError::Truncated(_)) | Err(ParseError::Xml { .. })
        ));
        assert!(parse_feed(b"<feed><entry></feed>", FeedType::Atom, "X").is_err());
    }

    #[test]
    fn unparseable_timestamp_falls_back_to_now() {
        let before = Utc::now();
        let ts = parse_timestamp(Some("yesterday-ish"));
        assert!(ts >= before);
    }
}
