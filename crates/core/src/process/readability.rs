use super::{reject_binary, Processor};
use crate::error::ProcessError;
use crate::types::{ProcessMethod, Processed};

/// Main-content extraction: keeps the article title and body, drops
/// navigation, ads, footers and similar boilerplate.
///
/// When nothing looks like an article (a listing page, an empty document) the
/// whole document is converted to Markdown instead and the result is tagged
/// [`Degraded::NoContentExtracted`](crate::types::Degraded::NoContentExtracted).
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadabilityProcessor;

fn unavailable() -> ProcessError {
    ProcessError::DependencyUnavailable {
        processor: "readability",
        hint: "this build does not include the content extractor; rebuild with `--features readability`"
            .to_string(),
    }
}

impl Processor for ReadabilityProcessor {
    fn method(&self) -> ProcessMethod {
        ProcessMethod::Readability
    }

    fn check_available(&self) -> Result<(), ProcessError> {
        if cfg!(feature = "readability") {
            Ok(())
        } else {
            Err(unavailable())
        }
    }

    fn process(&self, raw: &str) -> Result<Processed, ProcessError> {
        self.check_available()?;
        reject_binary(raw)?;
        extract_readable(raw)
    }
}

#[cfg(feature = "readability")]
fn extract_readable(raw: &str) -> Result<Processed, ProcessError> {
    use super::extract::extract_article;
    use super::markdown::html_to_markdown;
    use crate::types::Degraded;

    match extract_article(raw) {
        Ok(article) => {
            log::debug!(
                "extracted article {:?} ({} characters)",
                article.title,
                article.body.chars().count()
            );
            Ok(Processed::complete(article.to_markdown()))
        }
        Err(ProcessError::NoContentExtracted) => {
            log::warn!("no main content found, falling back to a full-document conversion");
            Ok(Processed::degraded(
                html_to_markdown(raw),
                Degraded::NoContentExtracted,
            ))
        }
        Err(e) => Err(e),
    }
}

#[cfg(not(feature = "readability"))]
fn extract_readable(_raw: &str) -> Result<Processed, ProcessError> {
    Err(unavailable())
}


#[cfg(all(test, feature = "readability"))]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::types::Degraded;

    const ARTICLE_PAGE: &str = r#"<html>
        <head><title>Site name | Title</title></head>
        <body>
            <nav><a href="/">Home</a> <a href="/about">About us</a> <a href="/contact">Contact</a></nav>
            <article><h1>Title</h1><p>Body text</p></article>
            <footer>Copyright 2024 Example Corp. All rights reserved.</footer>
        </body>
    </html>"#;

    #[test]
    fn test_keeps_article_and_drops_boilerplate() {
        let result = ReadabilityProcessor.process(ARTICLE_PAGE).unwrap();
        assert!(result.degraded.is_none());
        assert!(result.content.contains("Title"));
        assert!(result.content.contains("Body text"));
        assert!(!result.content.contains("About us"));
        assert!(!result.content.contains("Contact"));
        assert!(!result.content.contains("Copyright 2024"));
    }

    #[test]
    fn test_layout_class_on_body_keeps_article() {
        let page = ARTICLE_PAGE.replace("<body>", r#"<body class="page has-sidebar">"#);
        let result = ReadabilityProcessor.process(&page).unwrap();
        assert!(result.degraded.is_none());
        assert!(result.content.contains("Body text"));
        assert!(!result.content.contains("About us"));
        assert!(!result.content.contains("Copyright 2024"));
    }

    #[test]
    fn test_title_is_rendered_once_as_heading() {
        let result = ReadabilityProcessor.process(ARTICLE_PAGE).unwrap();
        assert!(result.content.starts_with("# Title"));
        assert_eq!(result.content.matches("Title").count(), 1);
    }

    #[test]
    fn test_listing_page_degrades_to_full_document() {
        let html = r#"<html><body>
            <ul>
                <li><a href="/1">Item one</a></li>
                <li><a href="/2">Item two</a></li>
            </ul>
        </body></html>"#;
        let result = ReadabilityProcessor.process(html).unwrap();
        assert_eq!(result.degraded, Some(Degraded::NoContentExtracted));
        assert!(result.content.contains("Item one"));
        assert!(result.content.contains("Item two"));
    }

    #[test]
    fn test_empty_input_degrades_instead_of_failing() {
        let result = ReadabilityProcessor.process("").unwrap();
        assert_eq!(result.degraded, Some(Degraded::NoContentExtracted));
        assert!(result.content.is_empty());
    }

    #[test]
    fn test_rejects_binary() {
        let err = ReadabilityProcessor.process("\0\0\0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }
}
