use std::sync::LazyLock;

use regex::Regex;

use super::{reject_binary, Processor};
use crate::error::ProcessError;
use crate::types::{ProcessMethod, Processed};

static NON_CONTENT_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)<script\b[^>]*>.*?</script\s*>",
        r"(?is)<style\b[^>]*>.*?</style\s*>",
        r"(?is)<noscript\b[^>]*>.*?</noscript\s*>",
        r"(?s)<!--.*?-->",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Remove script, style and noscript blocks and HTML comments
pub fn clean_html(html: &str) -> String {
    NON_CONTENT_BLOCKS
        .iter()
        .fold(html.to_string(), |html, regex| {
            regex.replace_all(&html, "").into_owned()
        })
}

/// Trim trailing whitespace on every line and squeeze runs of blank lines
pub(crate) fn tidy_markdown(markdown: &str) -> String {
    let joined = markdown
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");
    BLANK_RUNS.replace_all(&joined, "\n\n").trim().to_string()
}

pub(crate) fn html_to_markdown(html: &str) -> String {
    tidy_markdown(&html2md::parse_html(&clean_html(html)))
}

/// HTML to Markdown, keeping headings, links, lists and images
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownProcessor;

impl Processor for MarkdownProcessor {
    fn method(&self) -> ProcessMethod {
        ProcessMethod::Markdown
    }

    fn process(&self, raw: &str) -> Result<Processed, ProcessError> {
        reject_binary(raw)?;
        let markdown = html_to_markdown(raw);
        log::debug!(
            "converted {} bytes of HTML into {} characters of markdown",
            raw.len(),
            markdown.chars().count()
        );
        Ok(Processed::complete(markdown))
    }
}
