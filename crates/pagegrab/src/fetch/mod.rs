//! Fetch strategies.
//!
//! A fetcher retrieves the content behind a URL and knows nothing about how
//! that content will be processed. The orchestrator validates the URL before a
//! fetcher ever sees it and enforces [`Fetcher::deadline`] around every call.

mod browser;
mod request;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use pagegrab_core::{FetchError, FetchMethod, FetchOptions, FetchResult};
use url::Url;

pub use browser::BrowserFetcher;
pub use request::RequestFetcher;

/// Desktop Chrome, sent by both fetchers unless the caller overrides `User-Agent`
pub(crate) const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// The method this fetcher is registered under
    fn method(&self) -> FetchMethod;

    /// Report a missing engine before any network work is done
    fn check_available(&self) -> Result<(), FetchError> {
        Ok(())
    }

    /// Hard upper bound for a single `fetch` call
    fn deadline(&self, options: &FetchOptions) -> Duration {
        options.timeout
    }

    /// Error reported when `deadline` elapses
    fn deadline_error(&self, url: &Url, deadline: Duration) -> FetchError {
        FetchError::timed_out(
            url.as_str(),
            format!("no response within {} ms", deadline.as_millis()),
        )
    }

    async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<FetchResult, FetchError>;
}

/// One instance of every built-in fetcher
pub fn builtin_fetchers() -> Vec<Arc<dyn Fetcher>> {
    vec![
        Arc::new(RequestFetcher::new()),
        Arc::new(BrowserFetcher::new()),
    ]
}

/// Render an error with its whole source chain, `reqwest` hides the useful part there
pub(crate) fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
