//! HTML intermediate: the Markdown fragment and the styled document shell.

use pulldown_cmark::{html, Parser};

use crate::markdown::{parser_options, Document};
use crate::style::StyleSheet;

/// Converts the document's Markdown into an HTML fragment.
pub fn fragment(document: &Document) -> String {
    let source = document.source();
    let parser = Parser::new_ext(source, parser_options());
    let mut out = String::with_capacity(source.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Wraps an HTML fragment in the fixed document shell with the style sheet
/// embedded as a `<style>` block.
pub fn compose(fragment: &str, styles: &StyleSheet) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<style>\n{css}</style>\n</head>\n<body>\n{fragment}</body>\n</html>\n",
        css = styles.to_css(),
    )
}

/// Renders a document straight to the composed HTML page.
pub fn render_page(document: &Document, styles: &StyleSheet) -> String {
    compose(&fragment(document), styles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_heading_becomes_h1() {
        let doc = Document::parse("# Title");
        assert!(fragment(&doc).contains("<h1>Title</h1>"));
    }

    #[test]
    fn test_link_becomes_anchor() {
        let doc = Document::parse("See [my site](https://example.com/me).");
        let html = fragment(&doc);
        assert!(
            html.contains(r#"<a href="https://example.com/me">my site</a>"#),
            "got: {html}"
        );
    }

    #[test]
    fn test_emphasis_and_lists() {
        let doc = Document::parse("**Role** and *focus*\n\n- one\n- two\n");
        let html = fragment(&doc);
        assert!(html.contains("<strong>Role</strong>"));
        assert!(html.contains("<em>focus</em>"));
        assert!(html.contains("<ul>\n<li>one</li>\n<li>two</li>\n</ul>"), "got: {html}");
    }

    #[test]
    fn test_unrecognized_syntax_is_literal() {
        let doc = Document::parse("Skills {{ template }} | ~weird~ syntax");
        let html = fragment(&doc);
        assert!(html.contains("{{ template }} | ~weird~ syntax"), "got: {html}");
    }

    #[test]
    fn test_compose_embeds_stylesheet_and_body() {
        let doc = Document::parse("# Sample Resume");
        let page = render_page(&doc, &StyleSheet::resume());
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<meta charset=\"UTF-8\">"));
        assert!(page.contains("@page { margin: 0.5in 0.6in 0.5in 0.6in; }"));
        assert!(page.contains("color: #1a4d5c;"));
        assert!(page.contains("<body>\n<h1>Sample Resume</h1>\n</body>"), "got: {page}");
    }

    #[test]
    fn test_compose_is_independent_of_content() {
        let styles = StyleSheet::resume();
        let a = render_page(&Document::parse("# A"), &styles);
        let b = render_page(&Document::parse("plain paragraph"), &styles);
        let head = |s: &str| s[..s.find("<body>").unwrap()].to_string();
        assert_eq!(head(&a), head(&b));
    }
}
