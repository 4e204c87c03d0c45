//! Bulk triage of issues on a Sentry-compatible server.

pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod filters;
pub mod models;
pub mod output;
pub mod prompt;
pub mod transport;
pub mod trends;

#[cfg(test)]
mod testing;
