use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No configuration file found (looked in: {})", .searched.join(", "))]
    NotFound { searched: Vec<String> },

    #[error("Failed to read configuration file {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("No site configured (add a [site:<name>] section)")]
    NoSites,

    #[error("Unknown site '{site}' (available: {})", .available.join(", "))]
    UnknownSite { site: String, available: Vec<String> },

    #[error("Site '{site}' is missing the '{key}' setting")]
    MissingKey { site: String, key: &'static str },

    #[error("Site '{site}' has an invalid timeout '{value}'")]
    InvalidTimeout { site: String, value: String },
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("The configured token is not a valid header value")]
    InvalidToken,

    #[error("Failed to build HTTP client: {0}")]
    Setup(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} asked for a CSRF token but sent no 'sc' cookie")]
    MissingCsrfToken { url: String },

    #[error("Unexpected payload from {url}: {source}")]
    Payload {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("Bad period format: {0}, should be <number>h or <number>d")]
    Format(String),

    #[error("Cannot compare {value}h windows, use a period from 1h to 12h")]
    Hours { value: u32 },

    #[error("Cannot compare {value}d windows, use a period from 1d to 7d")]
    Days { value: u32 },
}
