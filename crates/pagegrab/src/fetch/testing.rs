//! In-process stand-ins for the network and the browser.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pagegrab_core::process::Processor;
use pagegrab_core::{
    FetchError, FetchMethod, FetchOptions, FetchResult, ProcessError, ProcessMethod, Processed,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use super::Fetcher;

pub(crate) const ARTICLE_FIXTURE: &str = r#"<html>
<head><title>Fixture</title><script>evil()</script></head>
<body>
    <nav><a href="/">Home</a> <a href="/archive">Archive</a></nav>
    <article><h1>Title</h1><p>Body text</p></article>
    <footer>Copyright 2024 Fixture Inc.</footer>
</body>
</html>"#;

/// Returns a fixed page and counts how often it was asked to
pub(crate) struct FixtureFetcher {
    method: FetchMethod,
    html: String,
    delay: Duration,
    calls: AtomicUsize,
}

impl FixtureFetcher {
    pub fn new(method: FetchMethod, html: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            method,
            html: html.into(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    /// A fetcher that takes `delay` before answering
    pub fn slow(method: FetchMethod, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            method,
            html: ARTICLE_FIXTURE.to_string(),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Fetcher for FixtureFetcher {
    fn method(&self) -> FetchMethod {
        self.method
    }

    async fn fetch(&self, url: &Url, _options: &FetchOptions) -> Result<FetchResult, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(FetchResult {
            content: self.html.clone(),
            url: url.to_string(),
            final_url: url.to_string(),
            content_type: Some("text/html".to_string()),
            status: Some(200),
        })
    }
}

/// Sets its flag when dropped
struct ReleaseOnDrop(Arc<AtomicBool>);

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Works on the blocking pool for `delay` while holding a resource, the way
/// the browser fetcher holds Chrome
pub(crate) struct BlockingFetcher {
    pub delay: Duration,
    pub released: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl Fetcher for BlockingFetcher {
    fn method(&self) -> FetchMethod {
        FetchMethod::Browser
    }

    async fn fetch(&self, url: &Url, _options: &FetchOptions) -> Result<FetchResult, FetchError> {
        let released = self.released.clone();
        let delay = self.delay;
        tokio::task::spawn_blocking(move || {
            let _resource = ReleaseOnDrop(released);
            std::thread::sleep(delay);
        })
        .await
        .map_err(|e| FetchError::BrowserLaunch(e.to_string()))?;
        Ok(FetchResult {
            content: ARTICLE_FIXTURE.to_string(),
            url: url.to_string(),
            final_url: url.to_string(),
            content_type: Some("text/html".to_string()),
            status: None,
        })
    }
}

/// A fetcher whose engine is missing
pub(crate) struct UnavailableFetcher {
    pub method: FetchMethod,
    pub calls: AtomicUsize,
}

#[async_trait::async_trait]
impl Fetcher for UnavailableFetcher {
    fn method(&self) -> FetchMethod {
        self.method
    }

    fn check_available(&self) -> Result<(), FetchError> {
        Err(FetchError::BrowserLaunch("no Chrome executable found".to_string()))
    }

    async fn fetch(&self, _url: &Url, _options: &FetchOptions) -> Result<FetchResult, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(FetchError::BrowserLaunch("no Chrome executable found".to_string()))
    }
}

/// Always fails to process
pub(crate) struct FailingProcessor(pub ProcessMethod);

impl Processor for FailingProcessor {
    fn method(&self) -> ProcessMethod {
        self.0
    }

    fn process(&self, _raw: &str) -> Result<Processed, ProcessError> {
        Err(ProcessError::MalformedInput("unparseable fixture".to_string()))
    }
}

/// Holds its thread for `delay`, like a large page would
pub(crate) struct BlockingProcessor {
    pub method: ProcessMethod,
    pub delay: Duration,
}

impl Processor for BlockingProcessor {
    fn method(&self) -> ProcessMethod {
        self.method
    }

    fn process(&self, raw: &str) -> Result<Processed, ProcessError> {
        std::thread::sleep(self.delay);
        Ok(Processed::complete(raw.to_string()))
    }
}

/// Reports a missing dependency before doing anything
pub(crate) struct UnavailableProcessor(pub ProcessMethod);

impl Processor for UnavailableProcessor {
    fn method(&self) -> ProcessMethod {
        self.0
    }

    fn check_available(&self) -> Result<(), ProcessError> {
        Err(ProcessError::DependencyUnavailable {
            processor: "fixture",
            hint: "not installed".to_string(),
        })
    }

    fn process(&self, _raw: &str) -> Result<Processed, ProcessError> {
        self.check_available().map(|_| Processed::complete(String::new()))
    }
}

/// Answer a single HTTP request on a loopback port with a canned response
pub(crate) async fn serve_once(response: impl Into<Vec<u8>>) -> SocketAddr {
    let response = response.into();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut buf = vec![0u8; 16 * 1024];
        let mut read = 0;
        while read < buf.len() {
            match socket.read(&mut buf[read..]).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    read += n;
                    if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
            }
        }
        let _ = socket.write_all(&response).await;
        let _ = socket.shutdown().await;
    });

    addr
}

/// Accept connections and never answer
pub(crate) async fn serve_silently() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut open = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            open.push(socket);
        }
    });

    addr
}
