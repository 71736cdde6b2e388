//! Process runtime utilities: shutdown signals and the health/status server.
#![allow(missing_docs)]
#![allow(clippy::uninlined_format_args)]

pub mod health;
pub mod shutdown;

#[cfg(test)]
mod shutdown_test;
