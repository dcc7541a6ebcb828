//! Error taxonomy shared by every fetch and process strategy.
//!
//! Strategies return their own typed errors ([`FetchError`], [`ProcessError`]);
//! the orchestrator widens them into [`Error`], which is the only error type a
//! caller of the pipeline ever sees. [`ErrorKind`] flattens all of them into a
//! single tag so front-ends can pick a diagnostic without matching on payloads.

use serde::Serialize;

/// Flat classification of every failure the pipeline can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidUrl,
    NetworkError,
    HttpError,
    UnsupportedContentType,
    ResponseTooLarge,
    BrowserLaunchError,
    RenderTimeout,
    MalformedInput,
    DependencyUnavailable,
    NoContentExtracted,
    ConfigurationError,
}

/// Failures raised while retrieving a URL
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Network error while fetching {url}: {detail}")]
    Network {
        url: String,
        detail: String,
        timed_out: bool,
    },

    #[error("HTTP {status} returned by {url}")]
    Http { url: String, status: u16 },

    #[error("Content type '{content_type}' returned by {url} is not allowed")]
    UnsupportedContentType { url: String, content_type: String },

    #[error("Response from {url} exceeds the {limit} byte limit")]
    ResponseTooLarge { url: String, limit: usize },

    #[error("Failed to launch browser: {0}. Make sure Chrome or Chromium is installed.")]
    BrowserLaunch(String),

    #[error("Timed out rendering {url} after {timeout_ms} ms")]
    RenderTimeout { url: String, timeout_ms: u64 },
}

impl FetchError {
    pub fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        FetchError::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn network(url: impl Into<String>, detail: impl ToString) -> Self {
        FetchError::Network {
            url: url.into(),
            detail: detail.to_string(),
            timed_out: false,
        }
    }

    pub fn timed_out(url: impl Into<String>, detail: impl ToString) -> Self {
        FetchError::Network {
            url: url.into(),
            detail: detail.to_string(),
            timed_out: true,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            FetchError::Network { .. } => ErrorKind::NetworkError,
            FetchError::Http { .. } => ErrorKind::HttpError,
            FetchError::UnsupportedContentType { .. } => ErrorKind::UnsupportedContentType,
            FetchError::ResponseTooLarge { .. } => ErrorKind::ResponseTooLarge,
            FetchError::BrowserLaunch(_) => ErrorKind::BrowserLaunchError,
            FetchError::RenderTimeout { .. } => ErrorKind::RenderTimeout,
        }
    }

    /// True for both socket timeouts and render timeouts
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FetchError::Network {
                timed_out: true,
                ..
            } | FetchError::RenderTimeout { .. }
        )
    }
}

/// Failures raised while transforming fetched content
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("The {processor} processor is unavailable: {hint}")]
    DependencyUnavailable {
        processor: &'static str,
        hint: String,
    },

    #[error("No main content could be extracted")]
    NoContentExtracted,
}

impl ProcessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProcessError::MalformedInput(_) => ErrorKind::MalformedInput,
            ProcessError::DependencyUnavailable { .. } => ErrorKind::DependencyUnavailable,
            ProcessError::NoContentExtracted => ErrorKind::NoContentExtracted,
        }
    }
}

/// Everything the pipeline can fail with
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Fetch(e) => e.kind(),
            Error::Process(e) => e.kind(),
            Error::Configuration(_) => ErrorKind::ConfigurationError,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Fetch(e) if e.is_timeout())
    }
}
