//! # pagegrab
//!
//! Fetch the content behind a URL and turn it into something an LLM or a
//! human can read.
//!
//! Two independent axes are combined per call:
//!
//! - **fetch**: a plain HTTP request, or headless Chrome when the page needs
//!   client-side scripts to render;
//! - **process**: the content unchanged, converted to Markdown, or reduced to
//!   its main article.
//!
//! ```no_run
//! use pagegrab::{FetchMethod, FetchOptions, ProcessMethod};
//!
//! # async fn run() -> Result<(), pagegrab::Error> {
//! let result = pagegrab::get_url_content(
//!     "https://example.com",
//!     FetchMethod::Request,
//!     ProcessMethod::Markdown,
//!     &FetchOptions::default(),
//! )
//! .await?;
//! println!("{}", result.content);
//! # Ok(())
//! # }
//! ```
//!
//! The free functions below use [`Pipeline::default`]. Build a [`Pipeline`]
//! yourself to register other strategies.

pub mod cli;
pub mod fetch;
pub mod pipeline;
pub mod prelude;

pub use fetch::{BrowserFetcher, Fetcher, RequestFetcher};
pub use pagegrab_core::process::{MarkdownProcessor, Processor, RawProcessor, ReadabilityProcessor};
pub use pagegrab_core::{
    ContentResult, Degraded, Error, ErrorKind, FetchError, FetchMethod, FetchOptions, FetchResult,
    ProcessError, ProcessMethod, Processed,
};
pub use pipeline::Pipeline;

pub async fn get_url_content(
    url: &str,
    fetch_method: FetchMethod,
    process_method: ProcessMethod,
    options: &FetchOptions,
) -> Result<ContentResult, Error> {
    Pipeline::default()
        .get_url_content(url, fetch_method, process_method, options)
        .await
}

/// Like [`get_url_content`], with method names such as `"browser"` or `"Markdown"`
pub async fn get_url_content_by_name(
    url: &str,
    fetch_method: &str,
    process_method: &str,
    options: &FetchOptions,
) -> Result<ContentResult, Error> {
    Pipeline::default()
        .get_url_content_by_name(url, fetch_method, process_method, options)
        .await
}

pub async fn get_plain_content(url: &str, options: &FetchOptions) -> Result<ContentResult, Error> {
    Pipeline::default().get_plain_content(url, options).await
}

pub async fn get_markdown_content(
    url: &str,
    options: &FetchOptions,
) -> Result<ContentResult, Error> {
    Pipeline::default().get_markdown_content(url, options).await
}

pub async fn get_browser_content_as_markdown(
    url: &str,
    options: &FetchOptions,
) -> Result<ContentResult, Error> {
    Pipeline::default()
        .get_browser_content_as_markdown(url, options)
        .await
}

pub async fn get_readable_content(
    url: &str,
    fetch_method: FetchMethod,
    options: &FetchOptions,
) -> Result<ContentResult, Error> {
    Pipeline::default()
        .get_readable_content(url, fetch_method, options)
        .await
}

/// Fetch many URLs with at most `concurrency` in flight, results in input order
pub async fn get_many(
    urls: &[String],
    fetch_method: FetchMethod,
    process_method: ProcessMethod,
    options: &FetchOptions,
    concurrency: usize,
) -> Vec<Result<ContentResult, Error>> {
    Pipeline::default()
        .get_many(urls, fetch_method, process_method, options, concurrency)
        .await
}
