use scraper::Html;
use std::borrow::Cow;

fn is_disallowed(c: char) -> bool {
    c.is_control() && !matches!(c, '\t' | '\n' | '\r')
}

/// Strips control characters (other than tab, newline and carriage return)
/// from feed-supplied text.
///
/// Feed titles and descriptions end up inside the rendered page verbatim, and
/// C0/C1 control characters are not valid there. Returns `Cow::Borrowed` when
/// nothing had to be removed.
///
/// ```
/// use rss_digest::util::strip_control_chars;
///
/// assert_eq!(strip_control_chars("plain title"), "plain title");
/// assert_eq!(strip_control_chars("bad\u{1b}[31m\u{7}title"), "bad[31mtitle");
/// ```
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_disallowed) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.chars().filter(|c| !is_disallowed(*c)).collect())
}

/// Reduces an HTML fragment to its text content with whitespace collapsed.
///
/// Summaries and content blocks come straight from the feed, so the digest
/// shows their text rather than their markup.
///
/// ```
/// use rss_digest::util::html_to_text;
///
/// assert_eq!(html_to_text("<p>Hello <b>world</b></p>"), "Hello world");
/// ```
pub fn html_to_text(html: &str) -> String {
    if !html.contains('<') && !html.contains('&') {
        return collapse_whitespace(html);
    }

    let fragment = Html::parse_fragment(html);
    let mut text = String::with_capacity(html.len());
    for piece in fragment.root_element().text() {
        text.push_str(piece);
        text.push(' ');
    }
    collapse_whitespace(&text)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_clean_text_returns_borrowed() {
        assert!(matches!(strip_control_chars("Hello"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_strip_preserves_tabs_newlines_cr() {
        assert_eq!(strip_control_chars("a\tb\nc\rd"), "a\tb\nc\rd");
    }

    #[test]
    fn test_strip_removes_controls_and_del() {
        assert_eq!(strip_control_chars("a\u{0}b\u{8}c\u{7f}d"), "abcd");
        assert_eq!(strip_control_chars("x\u{85}y"), "xy");
    }

    #[test]
    fn test_strip_unicode_preserved() {
        assert_eq!(strip_control_chars("日本語 ✓"), "日本語 ✓");
    }

    #[test]
    fn test_html_to_text_plain_passthrough() {
        assert_eq!(html_to_text("  just   text \n here "), "just text here");
    }

    #[test]
    fn test_html_to_text_strips_tags() {
        assert_eq!(
            html_to_text("<div><p>First</p><p>Second <a href=\"x\">link</a></p></div>"),
            "First Second link"
        );
    }

    #[test]
    fn test_html_to_text_decodes_entities() {
        assert_eq!(html_to_text("Fish &amp; chips"), "Fish & chips");
    }

    #[test]
    fn test_html_to_text_never_returns_markup() {
        let text = html_to_text("<p>ok</p><script>alert(1)</script>");
        assert!(!text.contains('<'));
        assert!(text.starts_with("ok"));
    }

    #[test]
    fn test_html_to_text_empty() {
        assert_eq!(html_to_text(""), "");
    }
}
