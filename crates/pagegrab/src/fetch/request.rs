use encoding_rs::{Encoding, UTF_8};
use pagegrab_core::validate::content_type_allowed;
use pagegrab_core::{FetchError, FetchMethod, FetchOptions, FetchResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::redirect::Policy;
use url::Url;

use super::{error_chain, Fetcher, DEFAULT_USER_AGENT};

const MAX_REDIRECTS: usize = 10;
/// How far into the body a `<meta charset>` declaration is looked for
const META_SNIFF_BYTES: usize = 1024;

/// Plain HTTP GET
#[derive(Debug, Default, Clone)]
pub struct RequestFetcher;

impl RequestFetcher {
    pub fn new() -> Self {
        Self
    }
}

/// Default headers with the caller's headers applied on top
fn build_headers(options: &FetchOptions) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

    for (name, value) in &options.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => log::warn!("Skipping invalid header '{name}'"),
        }
    }

    headers
}

/// `charset` parameter of a Content-Type value
fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(|c| c == '"' || c == '\''))
    })
}

/// Charset declared by a `<meta>` tag at the top of an HTML document
fn sniff_meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    let head = String::from_utf8_lossy(&body[..body.len().min(META_SNIFF_BYTES)]).to_ascii_lowercase();
    let start = head.find("charset=")? + "charset=".len();
    let label: String = head[start..]
        .trim_start_matches(['"', '\''])
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
        .collect();
    Encoding::for_label(label.as_bytes())
}

/// Decode with the Content-Type charset, else a `<meta>` declaration, else
/// UTF-8. A byte order mark wins over all of them. Malformed sequences become
/// U+FFFD.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_param)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .or_else(|| sniff_meta_charset(body))
        .unwrap_or(UTF_8);

    let (text, used, had_errors) = encoding.decode(body);
    if had_errors {
        log::debug!("Replaced malformed {} sequences in the response body", used.name());
    }
    text.into_owned()
}

fn build_client(url: &Url, options: &FetchOptions) -> Result<reqwest::Client, FetchError> {
    let redirect = if options.follow_redirects {
        Policy::limited(MAX_REDIRECTS)
    } else {
        Policy::none()
    };

    reqwest::Client::builder()
        .timeout(options.timeout)
        .redirect(redirect)
        .default_headers(build_headers(options))
        .build()
        .map_err(|e| FetchError::network(url.as_str(), error_chain(&e)))
}

fn classify(url: &Url, err: reqwest::Error) -> FetchError {
    let detail = error_chain(&err);
    if err.is_timeout() {
        FetchError::timed_out(url.as_str(), detail)
    } else if err.is_builder() {
        FetchError::invalid_url(url.as_str(), detail)
    } else {
        FetchError::network(url.as_str(), detail)
    }
}

#[async_trait::async_trait]
impl Fetcher for RequestFetcher {
    fn method(&self) -> FetchMethod {
        FetchMethod::Request
    }

    async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<FetchResult, FetchError> {
        log::debug!("HTTP GET {url}");
        let client = build_client(url, options)?;

        let mut response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !content_type_allowed(content_type.as_deref(), &options.allowed_content_types) {
            return Err(FetchError::UnsupportedContentType {
                url: url.to_string(),
                content_type: content_type.unwrap_or_default(),
            });
        }

        let too_large = || FetchError::ResponseTooLarge {
            url: url.to_string(),
            limit: options.max_bytes,
        };

        if response
            .content_length()
            .is_some_and(|len| len > options.max_bytes as u64)
        {
            return Err(too_large());
        }

        // Content-Length can be missing or wrong, so the cap is enforced while reading
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| classify(url, e))? {
            if body.len() + chunk.len() > options.max_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        log::debug!("Received {} bytes from {final_url} ({status})", body.len());

        Ok(FetchResult {
            content: decode_body(&body, content_type.as_deref()),
            url: url.to_string(),
            final_url,
            content_type,
            status: Some(status.as_u16()),
        })
    }
}
