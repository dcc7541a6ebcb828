use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_WAIT_FOR_JS_MS: u64 = 3000;
pub const DEFAULT_MAX_BYTES: usize = 2_000_000;
pub const DEFAULT_MAX_CHARS: usize = 1_000_000;
pub const DEFAULT_ALLOWED_CONTENT_TYPES: &[&str] = &["text/", "application/xhtml", "application/xml"];

/// How a URL is retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMethod {
    /// Plain HTTP GET
    Request,
    /// Headless browser, after client-side scripts have run
    Browser,
}

impl FetchMethod {
    pub const ALL: [FetchMethod; 2] = [FetchMethod::Request, FetchMethod::Browser];

    pub fn as_str(&self) -> &'static str {
        match self {
            FetchMethod::Request => "request",
            FetchMethod::Browser => "browser",
        }
    }
}

impl fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "request" => Ok(FetchMethod::Request),
            "browser" => Ok(FetchMethod::Browser),
            other => Err(Error::Configuration(format!(
                "unknown fetch method '{other}' (expected one of: request, browser)"
            ))),
        }
    }
}

/// How fetched content is transformed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessMethod {
    /// Return the content unchanged
    Raw,
    /// Convert HTML to Markdown
    Markdown,
    /// Extract the main article content
    Readability,
}

impl ProcessMethod {
    pub const ALL: [ProcessMethod; 3] = [
        ProcessMethod::Raw,
        ProcessMethod::Markdown,
        ProcessMethod::Readability,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessMethod::Raw => "raw",
            ProcessMethod::Markdown => "markdown",
            ProcessMethod::Readability => "readability",
        }
    }
}

impl fmt::Display for ProcessMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(ProcessMethod::Raw),
            "markdown" => Ok(ProcessMethod::Markdown),
            "readability" => Ok(ProcessMethod::Readability),
            other => Err(Error::Configuration(format!(
                "unknown process method '{other}' (expected one of: raw, markdown, readability)"
            ))),
        }
    }
}

/// Per-call fetch configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Hard upper bound for the fetch step
    pub timeout: Duration,
    /// Extra delay after navigation so client-side rendering can finish (browser only)
    pub wait_for_js: Duration,
    /// Extra request headers; they override defaults such as `User-Agent`
    pub headers: BTreeMap<String, String>,
    pub follow_redirects: bool,
    /// Body size cap for plain requests
    pub max_bytes: usize,
    /// Processed output is truncated to this many characters
    pub max_chars: usize,
    /// Content-Type prefixes accepted from plain requests
    pub allowed_content_types: Vec<String>,
    /// Return the raw fetched content when processing fails
    pub fallback_to_raw: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            wait_for_js: Duration::from_millis(DEFAULT_WAIT_FOR_JS_MS),
            headers: BTreeMap::new(),
            follow_redirects: true,
            max_bytes: DEFAULT_MAX_BYTES,
            max_chars: DEFAULT_MAX_CHARS,
            allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            fallback_to_raw: false,
        }
    }
}

impl FetchOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_wait_for_js(mut self, wait: Duration) -> Self {
        self.wait_for_js = wait;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_fallback_to_raw(mut self, fallback: bool) -> Self {
        self.fallback_to_raw = fallback;
        self
    }

    /// Look up a header by name, ignoring ASCII case
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw content returned by a fetch strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    pub content: String,
    /// URL as requested
    pub url: String,
    /// URL after redirects
    pub final_url: String,
    pub content_type: Option<String>,
    pub status: Option<u16>,
}

/// Why a successful result is not the one that was asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Degraded {
    /// Main-content extraction found nothing; the whole document was converted instead
    NoContentExtracted,
    /// Processing failed and the raw fetched content was returned
    ProcessingFailed,
}

impl fmt::Display for Degraded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degraded::NoContentExtracted => {
                f.write_str("no main content found, returned the full document")
            }
            Degraded::ProcessingFailed => {
                f.write_str("processing failed, returned the raw content")
            }
        }
    }
}

/// Output of a process strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    pub content: String,
    pub degraded: Option<Degraded>,
}

impl Processed {
    pub fn complete(content: String) -> Self {
        Self {
            content,
            degraded: None,
        }
    }

    pub fn degraded(content: String, reason: Degraded) -> Self {
        Self {
            content,
            degraded: Some(reason),
        }
    }
}

/// Final artifact of a fetch-then-process pipeline
#[derive(Debug, Clone, Serialize)]
pub struct ContentResult {
    pub url: String,
    pub final_url: String,
    pub fetch_method: FetchMethod,
    pub process_method: ProcessMethod,
    pub content: String,
    /// Length of `content` in characters
    pub length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<Degraded>,
    pub truncated: bool,
    pub fetch_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_method_names_parse_case_insensitively() {
        assert_eq!("REQUEST".parse::<FetchMethod>().unwrap(), FetchMethod::Request);
        assert_eq!(" browser ".parse::<FetchMethod>().unwrap(), FetchMethod::Browser);
        assert_eq!(
            "Readability".parse::<ProcessMethod>().unwrap(),
            ProcessMethod::Readability
        );
    }

    #[test]
    fn test_unknown_method_is_configuration_error() {
        let err = "ftp".parse::<FetchMethod>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
        assert!(err.to_string().contains("ftp"));

        let err = "pdf".parse::<ProcessMethod>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
    }

    #[test]
    fn test_display_matches_parse() {
        for method in FetchMethod::ALL {
            assert_eq!(method.to_string().parse::<FetchMethod>().unwrap(), method);
        }
        for method in ProcessMethod::ALL {
            assert_eq!(method.to_string().parse::<ProcessMethod>().unwrap(), method);
        }
    }

    #[test]
    fn test_default_options() {
        let options = FetchOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.wait_for_js, Duration::from_millis(3000));
        assert!(options.headers.is_empty());
        assert!(options.follow_redirects);
        assert!(!options.fallback_to_raw);
        assert_eq!(options.allowed_content_types.len(), 3);
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let options = FetchOptions::default().with_header("user-agent", "pagegrab-test");
        assert_eq!(options.header("User-Agent"), Some("pagegrab-test"));
        assert_eq!(options.header("Accept"), None);
    }

    #[test]
    fn test_content_result_serializes_methods_lowercase() {
        let result = ContentResult {
            url: "https://example.com".into(),
            final_url: "https://example.com/".into(),
            fetch_method: FetchMethod::Browser,
            process_method: ProcessMethod::Markdown,
            content: "Hello".into(),
            length: 5,
            degraded: None,
            truncated: false,
            fetch_time_ms: 12,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["fetch_method"], "browser");
        assert_eq!(json["process_method"], "markdown");
        assert!(json.get("degraded").is_none());
    }
}
