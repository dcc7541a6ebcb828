//! Content processing strategies.
//!
//! A processor is a pure `&str -> Processed` transform. It knows nothing about
//! how the content was retrieved, so every processor accepts the output of
//! every fetcher: HTML, a rendered DOM serialization, plain text or an empty
//! string.

#[cfg(feature = "readability")]
mod extract;
mod markdown;
mod readability;

use std::sync::Arc;

use crate::error::ProcessError;
use crate::types::{ProcessMethod, Processed};

pub use markdown::{clean_html, MarkdownProcessor};
pub use readability::ReadabilityProcessor;

pub trait Processor: Send + Sync {
    /// The method this processor is registered under
    fn method(&self) -> ProcessMethod;

    /// Report missing optional capabilities before any network work is done
    fn check_available(&self) -> Result<(), ProcessError> {
        Ok(())
    }

    fn process(&self, raw: &str) -> Result<Processed, ProcessError>;
}

/// Identity transform
#[derive(Debug, Default, Clone, Copy)]
pub struct RawProcessor;

impl Processor for RawProcessor {
    fn method(&self) -> ProcessMethod {
        ProcessMethod::Raw
    }

    fn process(&self, raw: &str) -> Result<Processed, ProcessError> {
        Ok(Processed::complete(raw.to_string()))
    }
}

/// One instance of every built-in processor
pub fn builtin_processors() -> Vec<Arc<dyn Processor>> {
    vec![
        Arc::new(RawProcessor),
        Arc::new(MarkdownProcessor),
        Arc::new(ReadabilityProcessor),
    ]
}

/// Binary payloads decoded as text show up as NUL bytes; no converter can do
/// anything useful with them.
pub(crate) fn reject_binary(raw: &str) -> Result<(), ProcessError> {
    if raw.contains('\0') {
        return Err(ProcessError::MalformedInput(
            "content contains NUL bytes and does not look like text or HTML".to_string(),
        ));
    }
    Ok(())
}
