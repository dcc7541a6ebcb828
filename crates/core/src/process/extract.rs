//! Boilerplate removal and main-content scoring on top of `scraper`.

use std::collections::HashMap;

use scraper::node::Element;
use scraper::{ElementRef, Html, Node, Selector};

use super::markdown::tidy_markdown;
use crate::error::ProcessError;

/// Paragraph text a scored block needs before it counts as an article body
const MIN_PARAGRAPH_SCORE: f64 = 140.0;
/// Shorter paragraphs are usually captions, bylines or buttons
const MIN_PARAGRAPH_CHARS: usize = 25;

const SEMANTIC_CANDIDATES: &[&str] = &[
    "article",
    "[itemprop=articleBody]",
    "main",
    "[role=main]",
];

const BOILERPLATE_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "form", "script", "style", "noscript", "iframe",
    "button", "svg", "template", "select", "input", "dialog",
];

const BOILERPLATE_ROLES: &[&str] = &[
    "navigation",
    "banner",
    "contentinfo",
    "complementary",
    "search",
    "dialog",
];

const BOILERPLATE_TOKENS: &[&str] = &[
    "nav", "navbar", "navigation", "menu", "breadcrumb", "breadcrumbs", "footer", "sidebar",
    "comment", "comments", "ad", "ads", "advert", "advertisement", "sponsor", "sponsored",
    "promo", "banner", "cookie", "cookies", "consent", "share", "social", "related",
    "subscribe", "newsletter", "popup", "modal", "skip",
];

const DROPPED_MEDIA: &[&str] = &[
    "img", "picture", "video", "audio", "source", "canvas", "map", "object", "embed",
];

const KEPT_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "blockquote", "pre", "code",
    "em", "strong", "b", "i", "table", "thead", "tbody", "tr", "th", "td", "dl", "dt", "dd",
    "sub", "sup",
];

const BLOCK_TAGS: &[&str] = &["div", "section", "article", "main", "figure", "figcaption"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Article {
    pub title: Option<String>,
    /// Markdown body without the title heading
    pub body: String,
}

impl Article {
    pub fn to_markdown(&self) -> String {
        match &self.title {
            Some(title) if self.body.is_empty() => format!("# {title}"),
            Some(title) => format!("# {title}\n\n{}", self.body),
            None => self.body.clone(),
        }
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("built-in selectors are valid")
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Class/id words that mark a container as holding the page's content, even
/// when another word in the same attribute looks like boilerplate
const CONTENT_TOKENS: &[&str] = &[
    "article", "body", "content", "main", "page", "post", "entry", "story", "text", "column",
    "wrapper", "container", "layout",
];

/// Tag, hidden flag and role checks
fn is_structural_boilerplate(el: &Element) -> bool {
    if BOILERPLATE_TAGS.contains(&el.name()) {
        return true;
    }
    if el.attr("hidden").is_some() || el.attr("aria-hidden") == Some("true") {
        return true;
    }
    el.attr("role")
        .is_some_and(|role| BOILERPLATE_ROLES.contains(&role.to_ascii_lowercase().as_str()))
}

/// Lowercased class and id words, split on whitespace, `-` and `_`.
/// `<html>` and `<body>` classes describe the page layout, so they yield nothing.
fn name_tokens(el: &Element) -> Vec<String> {
    if matches!(el.name(), "html" | "body") {
        return Vec::new();
    }
    el.attr("class")
        .into_iter()
        .chain(el.id())
        .flat_map(|names| names.split(|c: char| c.is_whitespace() || c == '-' || c == '_'))
        .filter(|token| !token.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

fn any_token_in(tokens: &[String], list: &[&str]) -> bool {
    tokens.iter().any(|token| list.contains(&token.as_str()))
}

fn is_boilerplate(el: &Element) -> bool {
    is_structural_boilerplate(el) || any_token_in(&name_tokens(el), BOILERPLATE_TOKENS)
}

/// Looser check for elements wrapping a candidate: `page has-sidebar` on a
/// wrapper names the layout around the content, not a sidebar.
fn is_boilerplate_container(el: &Element) -> bool {
    if is_structural_boilerplate(el) {
        return true;
    }
    let tokens = name_tokens(el);
    any_token_in(&tokens, BOILERPLATE_TOKENS) && !any_token_in(&tokens, CONTENT_TOKENS)
}

fn has_boilerplate_ancestor(el: ElementRef) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| is_boilerplate_container(ancestor.value()))
}

/// Text under `root`, skipping boilerplate descendants
fn visible_text(root: ElementRef) -> String {
    let text = root
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => Some((node, &**text)),
            _ => None,
        })
        .filter(|(node, _)| {
            !node
                .ancestors()
                .take_while(|ancestor| ancestor.id() != root.id())
                .filter_map(ElementRef::wrap)
                .any(|ancestor| is_boilerplate(ancestor.value()))
        })
        .map(|(_, text)| text)
        .collect::<Vec<_>>()
        .join(" ");
    normalize_whitespace(&text)
}

fn semantic_candidate(document: &Html) -> Option<ElementRef<'_>> {
    SEMANTIC_CANDIDATES.iter().find_map(|css| {
        let sel = selector(css);
        document
            .select(&sel)
            .filter(|el| !has_boilerplate_ancestor(*el))
            .map(|el| (visible_text(el).chars().count(), el))
            .filter(|(len, _)| *len > 0)
            .max_by_key(|(len, _)| *len)
            .map(|(_, el)| el)
    })
}

/// Score every block by the paragraph text it directly (and, at half weight,
/// indirectly) contains and return the best one.
fn scored_candidate(document: &Html) -> Option<ElementRef<'_>> {
    let paragraphs = selector("p, pre");
    let mut scores: HashMap<_, f64> = HashMap::new();

    for paragraph in document.select(&paragraphs) {
        if has_boilerplate_ancestor(paragraph) {
            continue;
        }
        let text = normalize_whitespace(&paragraph.text().collect::<String>());
        let len = text.chars().count();
        if len < MIN_PARAGRAPH_CHARS {
            continue;
        }
        let score = len as f64 + text.matches(',').count() as f64;

        let parent = paragraph.parent().and_then(ElementRef::wrap);
        let grandparent = parent.and_then(|p| p.parent()).and_then(ElementRef::wrap);
        if let Some(parent) = parent {
            *scores.entry(parent.id()).or_insert(0.0) += score;
        }
        if let Some(grandparent) = grandparent {
            *scores.entry(grandparent.id()).or_insert(0.0) += score / 2.0;
        }
    }

    let (best, score) = scores.into_iter().max_by(|a, b| a.1.total_cmp(&b.1))?;
    if score < MIN_PARAGRAPH_SCORE {
        return None;
    }
    document.tree.get(best).and_then(ElementRef::wrap)
}

fn find_title(document: &Html, candidate: ElementRef) -> Option<String> {
    let h1 = selector("h1");
    let non_empty = |text: String| Some(text).filter(|t| !t.is_empty());

    candidate
        .select(&h1)
        .find_map(|el| non_empty(normalize_whitespace(&el.text().collect::<String>())))
        .or_else(|| {
            document
                .select(&selector("meta[property='og:title']"))
                .find_map(|el| el.value().attr("content").map(normalize_whitespace))
                .and_then(non_empty)
        })
        .or_else(|| {
            document
                .select(&selector("title"))
                .find_map(|el| non_empty(normalize_whitespace(&el.text().collect::<String>())))
        })
}

/// Re-serialize `el`'s children as minimal HTML: no attributes, links unwrapped,
/// media and boilerplate removed, the title heading skipped.
fn write_clean_html(el: ElementRef, title: Option<&str>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&html_escape::encode_text(&**text)),
            Node::Element(element) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = element.name();

                if is_boilerplate(element) || DROPPED_MEDIA.contains(&name) {
                    continue;
                }
                if name == "h1"
                    && title.is_some_and(|t| {
                        normalize_whitespace(&child_el.text().collect::<String>()) == t
                    })
                {
                    continue;
                }

                match name {
                    "br" => out.push_str("<br>"),
                    "hr" => out.push_str("<hr>"),
                    _ if KEPT_TAGS.contains(&name) => {
                        out.push_str(&format!("<{name}>"));
                        write_clean_html(child_el, title, out);
                        out.push_str(&format!("</{name}>"));
                    }
                    _ if BLOCK_TAGS.contains(&name) => {
                        out.push_str("<div>");
                        write_clean_html(child_el, title, out);
                        out.push_str("</div>");
                    }
                    _ => write_clean_html(child_el, title, out),
                }
            }
            _ => {}
        }
    }
}

pub(crate) fn extract_article(html: &str) -> Result<Article, ProcessError> {
    let document = Html::parse_document(html);

    let candidate = semantic_candidate(&document)
        .or_else(|| scored_candidate(&document))
        .ok_or(ProcessError::NoContentExtracted)?;

    let title = find_title(&document, candidate);

    let mut clean = String::new();
    write_clean_html(candidate, title.as_deref(), &mut clean);
    let body = tidy_markdown(&html2md::parse_html(&clean));

    if body.is_empty() && title.is_none() {
        return Err(ProcessError::NoContentExtracted);
    }

    Ok(Article { title, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_paragraph(topic: &str) -> String {
        format!(
            "<p>{topic} is discussed at length here, with enough words, commas, and detail \
             that any reasonable reader would consider this paragraph part of the main \
             body of the page rather than a caption or a button label.</p>"
        )
    }

    #[test]
    fn test_is_boilerplate_by_tag_class_and_role() {
        let html = Html::parse_fragment(
            r#"<nav></nav><div class="site-footer"></div><div id="main_sidebar"></div>
               <div role="navigation"></div><div class="ad-slot"></div><div class="content"></div>
               <div class="header-image"></div>"#,
        );
        let sel = selector("nav, div");
        let flags: Vec<bool> = html
            .select(&sel)
            .map(|el| is_boilerplate(el.value()))
            .collect();
        assert_eq!(flags, vec![true, true, true, true, true, false, false]);
    }

    #[test]
    fn test_prefers_article_over_scoring() {
        let html = format!(
            "<div>{}</div><article><h1>Chosen</h1><p>Short article body</p></article>",
            long_paragraph("Something else")
        );
        let article = extract_article(&html).unwrap();
        assert_eq!(article.title.as_deref(), Some("Chosen"));
        assert!(article.body.contains("Short article body"));
        assert!(!article.body.contains("Something else"));
    }

    #[test]
    fn test_scores_paragraph_blocks_without_semantic_markup() {
        let html = format!(
            r#"<html><head><title>Scored page</title></head><body>
                <div class="sidebar"><p>{}</p></div>
                <div id="story">{}{}</div>
                <div class="footer">Footer links</div>
            </body></html>"#,
            "Sidebar promo text that is long enough to be considered a paragraph",
            long_paragraph("Rust ownership"),
            long_paragraph("Borrow checking")
        );
        let article = extract_article(&html).unwrap();
        assert_eq!(article.title.as_deref(), Some("Scored page"));
        assert!(article.body.contains("Rust ownership"));
        assert!(article.body.contains("Borrow checking"));
        assert!(!article.body.contains("Sidebar promo"));
        assert!(!article.body.contains("Footer links"));
    }

    #[test]
    fn test_links_and_images_are_dropped() {
        let html = r#"<article><h1>T</h1><p>Read the <a href="https://example.com/docs">docs</a> now.</p>
            <img src="hero.png" alt="hero"></article>"#;
        let article = extract_article(html).unwrap();
        assert!(article.body.contains("docs"));
        assert!(!article.body.contains("https://example.com/docs"));
        assert!(!article.body.contains("hero.png"));
    }

    #[test]
    fn test_boilerplate_inside_article_is_removed() {
        let html = r#"<article><h1>Post</h1><p>Real text</p>
            <div class="share-buttons">Share on social</div>
            <aside>Related posts</aside></article>"#;
        let article = extract_article(html).unwrap();
        assert!(article.body.contains("Real text"));
        assert!(!article.body.contains("Share on social"));
        assert!(!article.body.contains("Related posts"));
    }

    #[test]
    fn test_title_falls_back_to_document_title() {
        let html = r#"<html><head><title>Document title</title></head>
            <body><main><p>Main body</p></main></body></html>"#;
        let article = extract_article(html).unwrap();
        assert_eq!(article.title.as_deref(), Some("Document title"));
        assert_eq!(article.to_markdown(), "# Document title\n\nMain body");
    }

    #[test]
    fn test_layout_classes_on_wrappers_do_not_hide_the_article() {
        let html = r#"<html class="no-js"><body class="page has-sidebar">
            <div id="page-wrapper" class="layout with-sidebar">
                <nav>Home About</nav>
                <article><h1>Kept</h1><p>Article body survives</p></article>
                <div class="sidebar"><p>Sidebar promo</p></div>
            </div>
        </body></html>"#;
        let article = extract_article(html).unwrap();
        assert_eq!(article.title.as_deref(), Some("Kept"));
        assert!(article.body.contains("Article body survives"));
        assert!(!article.body.contains("Sidebar promo"));
    }

    #[test]
    fn test_body_and_html_classes_are_ignored() {
        let html = Html::parse_document(
            r#"<html class="nav-open"><body class="has-sidebar"><div class="menu"></div></body></html>"#,
        );
        let flags: Vec<(String, bool)> = html
            .select(&selector("html, body, div"))
            .map(|el| (el.value().name().to_string(), is_boilerplate(el.value())))
            .collect();
        assert_eq!(
            flags,
            vec![
                ("html".to_string(), false),
                ("body".to_string(), false),
                ("div".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_nothing_to_extract() {
        let html = "<html><body><nav>Only navigation</nav><p>tiny</p></body></html>";
        assert_eq!(
            extract_article(html).unwrap_err(),
            ProcessError::NoContentExtracted
        );
    }
}
