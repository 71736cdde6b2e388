use std::{
    fmt::Write as _,
    io::{IsTerminal, Write as _},
};

use async_trait::async_trait;
use config::OutputFormat;
use tracing::warn;

use crate::{
    Notifier,
    event::{EventKind, IncidentEvent},
};

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[91m";
const GREEN: &str = "\x1b[92m";
const YELLOW: &str = "\x1b[93m";
const MAGENTA: &str = "\x1b[95m";
const CYAN: &str = "\x1b[96m";
const GRAY: &str = "\x1b[90m";

const DETAIL_MAX_CHARS: usize = 200;
const SEPARATOR_WIDTH: usize = 68;

/// Writes incident events to stdout.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleNotifier {
    format: OutputFormat,
    color: bool,
}

impl ConsoleNotifier {
    /// Create a console notifier; colors are enabled only when stdout is a terminal.
    pub fn new(format: OutputFormat) -> Self {
        Self { format, color: std::io::stdout().is_terminal() }
    }

    /// Create a console notifier with colors explicitly on or off.
    pub const fn with_color(format: OutputFormat, color: bool) -> Self {
        Self { format, color }
    }

    /// Render an event in the configured format, without a trailing newline.
    pub fn render(&self, event: &IncidentEvent) -> String {
        match self.format {
            OutputFormat::Pretty => self.render_pretty(event),
            OutputFormat::Json => match serde_json::to_string(event) {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, incident = %event.incident.id, "failed to encode event");
                    String::new()
                }
            },
        }
    }

    fn paint(&self, codes: &[&str], text: &str) -> String {
        if self.color { format!("{}{}{}", codes.concat(), text, RESET) } else { text.to_owned() }
    }

    fn render_pretty(&self, event: &IncidentEvent) -> String {
        let inc = &event.incident;
        let ts = inc.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
        let status_color = status_color(&inc.status);
        let status_msg = if inc.detail.is_empty() {
            inc.status.clone()
        } else {
            format!("{} - {}", inc.status, inc.detail)
        };

        let mut out = String::new();
        if event.kind != EventKind::Historical {
            let _ = writeln!(out, "{}", self.paint(&[DIM], &"─".repeat(SEPARATOR_WIDTH)));
        }

        // headline: one product/status pair per affected component
        let products = inc.products();
        if products.is_empty() {
            let label = if inc.provider.is_empty() {
                inc.title.clone()
            } else {
                format!("{} - {}", inc.provider, inc.title)
            };
            let _ = writeln!(out, "[{ts}] Product: {label}");
            let _ = writeln!(out, "Status: {status_msg}");
        } else {
            for product in products {
                let label = if inc.provider.is_empty() {
                    product.to_owned()
                } else {
                    format!("{} API - {}", inc.provider, product)
                };
                let _ = writeln!(out, "[{ts}] Product: {label}");
                let _ = writeln!(out, "Status: {status_msg}");
            }
        }

        let tag = match event.kind {
            EventKind::New => "NEW INCIDENT",
            EventKind::Updated => "INCIDENT UPDATE",
            EventKind::Historical => "HISTORICAL",
        };
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "  {} {}",
            self.paint(&[GRAY], &format!("[{ts}]")),
            self.paint(&[BOLD, status_color], tag)
        );
        let _ = writeln!(out, "    {} {}", self.paint(&[BOLD], "Provider :"), inc.provider);
        let _ = writeln!(out, "    {} {}", self.paint(&[BOLD], "Title    :"), inc.title);
        let _ = writeln!(
            out,
            "    {} {}",
            self.paint(&[BOLD], "Status   :"),
            self.paint(&[status_color], &inc.status)
        );
        let _ = writeln!(out, "    {} {}", self.paint(&[BOLD], "Products :"), inc.product_names());
        if !inc.detail.is_empty() {
            let _ = writeln!(
                out,
                "    {} {}",
                self.paint(&[BOLD], "Detail   :"),
                self.paint(&[DIM], &truncate(&inc.detail, DETAIL_MAX_CHARS))
            );
        }
        if !inc.link.is_empty() {
            let _ = writeln!(
                out,
                "    {} {}",
                self.paint(&[BOLD], "Link     :"),
                self.paint(&[DIM], &inc.link)
            );
        }
        out
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, event: &IncidentEvent) {
        let rendered = self.render(event);
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{rendered}").and_then(|()| stdout.flush()) {
            warn!(error = %e, "failed to write notification to stdout");
        }
    }
}

fn status_color(status: &str) -> &'static str {
    let s = status.to_lowercase();
    if s.contains("resolved") {
        GREEN
    } else if s.contains("monitoring") {
        CYAN
    } else if s.contains("identified") || s.contains("degraded") {
        YELLOW
    } else if s.contains("investigating") {
        RED
    } else {
        MAGENTA
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use feed::{Component, Incident};

    fn incident(components: Vec<Component>) -> Incident {
        Incident {
            id: "INC-1".to_owned(),
            provider: "OpenAI".to_owned(),
            title: "Elevated errors".to_owned(),
            status: "Investigating".to_owned(),
            components,
            detail: "Degraded performance due to upstream issue".to_owned(),
            link: "https://status.openai.com/incidents/INC-1".to_owned(),
            timestamp: Utc.with_ymd_and_hms(2025, 11, 3, 14, 32, 0).unwrap(),
        }
    }

    #[test]
    fn pretty_renders_one_headline_per_product() {
        let notifier = ConsoleNotifier::with_color(OutputFormat::Pretty, false);
        let event = IncidentEvent::new_incident(incident(vec![
            Component { name: "Chat Completions".to_owned(), status: "Degraded".to_owned() },
            Component { name: "Responses".to_owned(), status: String::new() },
        ]));

        let out = notifier.render(&event);
        assert!(out.contains("[2025-11-03 14:32:00] Product: OpenAI API - Chat Completions\n"));
        assert!(out.contains("[2025-11-03 14:32:00] Product: OpenAI API - Responses\n"));
        assert!(out.contains(
            "Status: Investigating - Degraded performance due to upstream issue\n"
        ));
        assert!(out.contains("NEW INCIDENT"));
        assert!(out.contains("Products : Chat Completions, Responses"));
        assert!(!out.contains('\x1b'));
    }

    #[test]
    fn pretty_falls_back_to_title_without_products() {
        let notifier = ConsoleNotifier::with_color(OutputFormat::Pretty, false);
        let out = notifier.render(&IncidentEvent::historical(incident(vec![])));
        assert!(out.contains("Product: OpenAI - Elevated errors"));
        assert!(out.contains("HISTORICAL"));
        assert!(out.contains("Products : N/A"));
        assert!(!out.contains('─'));
    }

    #[test]
    fn json_renders_a_single_line() {
        let notifier = ConsoleNotifier::with_color(OutputFormat::Json, true);
        let out = notifier.render(&IncidentEvent::updated(incident(vec![])));
        assert!(!out.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["kind"], "updated");
        assert_eq!(value["incident"]["id"], "INC-1");
        assert_eq!(value["incident"]["status"], "Investigating");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé...");
        assert_eq!(truncate("short", 200), "short");
    }
}
