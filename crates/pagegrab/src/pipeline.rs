//! Orchestrator: one fetch strategy, one process strategy, one error taxonomy.
//!
//! Strategies are looked up in registries keyed by their method enum. Adding a
//! strategy means adding an enum variant and registering an implementation;
//! nothing in here changes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use pagegrab_core::process::{builtin_processors, Processor};
use pagegrab_core::validate::{truncate_chars, validate_headers, validate_url};
use pagegrab_core::{
    ContentResult, Degraded, Error, FetchError, FetchMethod, FetchOptions, FetchResult,
    ProcessError, ProcessMethod, Processed,
};
use url::Url;

use crate::fetch::{builtin_fetchers, Fetcher};

pub struct Pipeline {
    fetchers: HashMap<FetchMethod, Arc<dyn Fetcher>>,
    processors: HashMap<ProcessMethod, Arc<dyn Processor>>,
}

impl Default for Pipeline {
    /// Every built-in strategy
    fn default() -> Self {
        let pipeline = builtin_fetchers()
            .into_iter()
            .fold(Self::empty(), Self::with_fetcher);
        builtin_processors()
            .into_iter()
            .fold(pipeline, Self::with_processor)
    }
}

impl Pipeline {
    /// A pipeline with no strategies registered
    pub fn empty() -> Self {
        Self {
            fetchers: HashMap::new(),
            processors: HashMap::new(),
        }
    }

    /// Register a fetcher under its method, replacing any previous one
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetchers.insert(fetcher.method(), fetcher);
        self
    }

    /// Register a processor under its method, replacing any previous one
    pub fn with_processor(mut self, processor: Arc<dyn Processor>) -> Self {
        self.processors.insert(processor.method(), processor);
        self
    }

    fn fetcher(&self, method: FetchMethod) -> Result<&Arc<dyn Fetcher>, Error> {
        self.fetchers.get(&method).ok_or_else(|| {
            Error::Configuration(format!("no fetcher registered for method '{method}'"))
        })
    }

    fn processor(&self, method: ProcessMethod) -> Result<&Arc<dyn Processor>, Error> {
        self.processors.get(&method).ok_or_else(|| {
            Error::Configuration(format!("no processor registered for method '{method}'"))
        })
    }

    /// Run `fetcher` under its hard deadline
    async fn fetch_with_deadline(
        fetcher: &dyn Fetcher,
        url: &Url,
        options: &FetchOptions,
    ) -> Result<FetchResult, FetchError> {
        let deadline = fetcher.deadline(options);
        match tokio::time::timeout(deadline, fetcher.fetch(url, options)).await {
            Ok(result) => result,
            Err(_) => Err(fetcher.deadline_error(url, deadline)),
        }
    }

    /// Run `processor` on the blocking pool. Large pages keep a core busy for a
    /// while, and pipelines running side by side in `get_many` would otherwise
    /// queue behind each other on one task. The raw content comes back with the
    /// outcome for the raw fallback.
    async fn process_blocking(
        processor: Arc<dyn Processor>,
        raw: String,
    ) -> (String, Result<Processed, ProcessError>) {
        tokio::task::spawn_blocking(move || {
            let outcome = processor.process(&raw);
            (raw, outcome)
        })
        .await
        // Only a panic can fail here: the task is awaited, never aborted
        .unwrap_or_else(|e| std::panic::resume_unwind(e.into_panic()))
    }

    /// Fetch step on its own. The URL is validated before the fetcher is called.
    pub async fn fetch(
        &self,
        url: &str,
        method: FetchMethod,
        options: &FetchOptions,
    ) -> Result<FetchResult, Error> {
        let url = validate_url(url)?;
        validate_headers(&options.headers)?;
        let fetcher = self.fetcher(method)?;
        fetcher.check_available()?;
        Ok(Self::fetch_with_deadline(fetcher.as_ref(), &url, options).await?)
    }

    /// Process step on its own
    pub fn process(&self, raw: &str, method: ProcessMethod) -> Result<Processed, Error> {
        let processor = self.processor(method)?;
        Ok(processor.process(raw)?)
    }

    /// Fetch `url` with `fetch_method`, then transform it with `process_method`.
    ///
    /// Everything that can be checked without the network (URL, headers,
    /// registered strategies, optional engines) is checked before fetching.
    /// A processing failure is returned as an error unless
    /// [`FetchOptions::fallback_to_raw`] is set, in which case the raw content
    /// comes back tagged [`Degraded::ProcessingFailed`].
    pub async fn get_url_content(
        &self,
        url: &str,
        fetch_method: FetchMethod,
        process_method: ProcessMethod,
        options: &FetchOptions,
    ) -> Result<ContentResult, Error> {
        log::info!("Fetching {url} (fetch: {fetch_method}, process: {process_method})");

        let parsed = validate_url(url)?;
        validate_headers(&options.headers)?;
        let fetcher = self.fetcher(fetch_method)?;
        let processor = self.processor(process_method)?;
        fetcher.check_available()?;
        processor.check_available()?;

        let started = Instant::now();
        let fetched = Self::fetch_with_deadline(fetcher.as_ref(), &parsed, options)
            .await
            .inspect_err(|e| log::error!("Fetching {url} failed: {e}"))?;
        let fetch_time_ms = started.elapsed().as_millis() as u64;

        let (raw, outcome) = Self::process_blocking(processor.clone(), fetched.content).await;
        let processed = match outcome {
            Ok(processed) => processed,
            Err(e) if options.fallback_to_raw => {
                log::warn!("Processing {url} with {process_method} failed ({e}), returning raw content");
                Processed::degraded(raw, Degraded::ProcessingFailed)
            }
            Err(e) => {
                log::error!("Processing {url} with {process_method} failed: {e}");
                return Err(e.into());
            }
        };

        if let Some(reason) = processed.degraded {
            log::warn!("Degraded result for {url}: {reason}");
        }

        let (content, truncated) = truncate_chars(processed.content, options.max_chars);
        if truncated {
            log::info!("Truncated output to {} characters", options.max_chars);
        }

        log::info!("Finished {url}");

        Ok(ContentResult {
            url: url.to_string(),
            final_url: fetched.final_url,
            fetch_method,
            process_method,
            length: content.chars().count(),
            content,
            degraded: processed.degraded,
            truncated,
            fetch_time_ms,
        })
    }

    /// Run [`Pipeline::get_url_content`] over many URLs with at most
    /// `concurrency` pipelines in flight. Results come back in input order.
    pub async fn get_many(
        &self,
        urls: &[String],
        fetch_method: FetchMethod,
        process_method: ProcessMethod,
        options: &FetchOptions,
        concurrency: usize,
    ) -> Vec<Result<ContentResult, Error>> {
        stream::iter(urls)
            .map(|url| self.get_url_content(url, fetch_method, process_method, options))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    /// Plain request, content unchanged
    pub async fn get_plain_content(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<ContentResult, Error> {
        self.get_url_content(url, FetchMethod::Request, ProcessMethod::Raw, options)
            .await
    }

    /// Plain request converted to Markdown
    pub async fn get_markdown_content(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<ContentResult, Error> {
        self.get_url_content(url, FetchMethod::Request, ProcessMethod::Markdown, options)
            .await
    }

    /// Rendered page converted to Markdown
    pub async fn get_browser_content_as_markdown(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<ContentResult, Error> {
        self.get_url_content(url, FetchMethod::Browser, ProcessMethod::Markdown, options)
            .await
    }

    /// Main article content, fetched with `fetch_method`
    pub async fn get_readable_content(
        &self,
        url: &str,
        fetch_method: FetchMethod,
        options: &FetchOptions,
    ) -> Result<ContentResult, Error> {
        self.get_url_content(url, fetch_method, ProcessMethod::Readability, options)
            .await
    }

    /// Same as [`Pipeline::get_url_content`] with methods given by name
    pub async fn get_url_content_by_name(
        &self,
        url: &str,
        fetch_method: &str,
        process_method: &str,
        options: &FetchOptions,
    ) -> Result<ContentResult, Error> {
        let fetch_method = fetch_method.parse()?;
        let process_method = process_method.parse()?;
        self.get_url_content(url, fetch_method, process_method, options)
            .await
    }
}
