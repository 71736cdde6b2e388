//! Status feed primitives: incident models and the Atom/RSS feed parser.
#![allow(clippy::uninlined_format_args)]

/// HTML extraction helpers for status-page entry bodies
pub mod html;
/// Incident and component models
pub mod models;
/// Atom / RSS decoding into incidents
pub mod parser;

pub use models::{Component, FeedType, Incident};
pub use parser::{FeedParser, ParseError, XmlFeedParser, parse_feed};
