//! Input checks that run before any strategy is dispatched, plus output
//! truncation.

use std::collections::BTreeMap;

use url::Url;

use crate::error::{Error, FetchError};

/// Parse and check a URL. Only absolute `http` and `https` URLs with a host are accepted.
pub fn validate_url(input: &str) -> Result<Url, FetchError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(FetchError::invalid_url(input, "URL is empty"));
    }

    let url = Url::parse(trimmed).map_err(|e| FetchError::invalid_url(input, e))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FetchError::invalid_url(
                input,
                format!("unsupported scheme '{scheme}', expected http or https"),
            ))
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(FetchError::invalid_url(input, "URL has no host"));
    }

    Ok(url)
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

fn check_header(name: &str, value: &str) -> Result<(), Error> {
    if name.is_empty() || !name.chars().all(is_token_char) {
        return Err(Error::Configuration(format!(
            "invalid header name '{name}'"
        )));
    }
    if value.chars().any(|c| matches!(c, '\r' | '\n' | '\0')) {
        return Err(Error::Configuration(format!(
            "invalid value for header '{name}'"
        )));
    }
    Ok(())
}

/// Parse a `Name: Value` pair as typed on the command line
pub fn parse_header(input: &str) -> Result<(String, String), Error> {
    let (name, value) = input.split_once(':').ok_or_else(|| {
        Error::Configuration(format!("header '{input}' must look like 'Name: Value'"))
    })?;
    let (name, value) = (name.trim(), value.trim());
    check_header(name, value)?;
    Ok((name.to_string(), value.to_string()))
}

pub fn validate_headers(headers: &BTreeMap<String, String>) -> Result<(), Error> {
    headers
        .iter()
        .try_for_each(|(name, value)| check_header(name, value))
}

/// Whether a Content-Type header matches one of the allowed prefixes.
///
/// A missing header is accepted; servers omit it often enough for plain pages.
pub fn content_type_allowed(content_type: Option<&str>, allowed: &[String]) -> bool {
    let Some(content_type) = content_type else {
        return true;
    };
    let content_type = content_type.trim().to_ascii_lowercase();
    allowed
        .iter()
        .any(|prefix| content_type.starts_with(&prefix.to_ascii_lowercase()))
}

/// Truncate to at most `max_chars` characters. Returns whether anything was cut.
pub fn truncate_chars(content: String, max_chars: usize) -> (String, bool) {
    match content.char_indices().nth(max_chars) {
        Some((byte_index, _)) => {
            let mut content = content;
            content.truncate(byte_index);
            (content, true)
        }
        None => (content, false),
    }
}
