use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

/// First fenced block tagged `html`; the tag must end the fence line.
static HTML_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"```(?i:html)[ \t]*\r?\n([\s\S]*?)\r?\n```").expect("valid html fence regex")
});

const DOCTYPE_TOKEN: &str = "<!doctype html>";

/// How a code payload was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadSource {
    /// Inner text of a closed ```html fence
    Fenced,
    /// Raw document from the doctype declaration to the end of the text
    Document,
}

/// HTML document extracted from visible text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodePayload {
    pub code: String,
    pub source: PayloadSource,
    /// Byte offset of `code` within the visible text
    pub anchor: usize,
    /// Byte range of the whole detected region, fences included
    pub region: Range<usize>,
}

/// Find the HTML payload in `visible`: a fenced ```html block first, then a
/// bare `<!DOCTYPE html>` (ASCII case-insensitive) running to the end.
pub fn detect_code_payload(visible: &str) -> Option<CodePayload> {
    if let Some(caps) = HTML_FENCE.captures(visible)
        && let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1))
    {
        return Some(CodePayload {
            code: inner.as_str().to_string(),
            source: PayloadSource::Fenced,
            anchor: inner.start(),
            region: whole.range(),
        });
    }

    // ASCII lowercasing keeps byte offsets unchanged.
    let start = visible.to_ascii_lowercase().find(DOCTYPE_TOKEN)?;
    let mut code = &visible[start..];
    if visible[..start].contains("```") {
        // Inside a fence that has not closed yet: drop a half-written closing fence.
        code = code.trim_end_matches('`').trim_end();
    }
    Some(CodePayload {
        code: code.to_string(),
        source: PayloadSource::Document,
        anchor: start,
        region: start..visible.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_block() {
        let visible = "Here you go:\n```html\n<!DOCTYPE html>\n<html><body>hi</body></html>\n```\nEnjoy!";
        let payload = detect_code_payload(visible).unwrap();
        assert_eq!(payload.source, PayloadSource::Fenced);
        assert_eq!(payload.code, "<!DOCTYPE html>\n<html><body>hi</body></html>");
        assert_eq!(&visible[payload.anchor..payload.anchor + 15], "<!DOCTYPE html>");
        assert_eq!(&visible[payload.region.clone()][..7], "```html");
    }

    #[test]
    fn test_first_fenced_block_wins() {
        let visible = "```html\n<p>one</p>\n```\nand\n```html\n<p>two</p>\n```";
        assert_eq!(detect_code_payload(visible).unwrap().code, "<p>one</p>");
    }

    #[test]
    fn test_fence_tag_must_be_html() {
        let visible = "```htmlx\n<p>no</p>\n```";
        assert!(detect_code_payload(visible).is_none());

        let visible = "```css\nbody {}\n```";
        assert!(detect_code_payload(visible).is_none());

        let visible = "```HTML\n<p>yes</p>\n```";
        assert_eq!(detect_code_payload(visible).unwrap().code, "<p>yes</p>");
    }

    #[test]
    fn test_bare_doctype_runs_to_end() {
        let visible = "Sure!\n<!DOCTYPE html>\n<html><body>partial";
        let payload = detect_code_payload(visible).unwrap();
        assert_eq!(payload.source, PayloadSource::Document);
        assert_eq!(payload.code, "<!DOCTYPE html>\n<html><body>partial");
        assert_eq!(payload.anchor, 6);
    }

    #[test]
    fn test_lowercase_doctype() {
        let payload = detect_code_payload("<!doctype html><p>x</p>").unwrap();
        assert_eq!(payload.code, "<!doctype html><p>x</p>");
    }

    #[test]
    fn test_unclosed_fence_falls_back_to_doctype() {
        let visible = "```html\n<!DOCTYPE html>\n<body>still stream";
        let payload = detect_code_payload(visible).unwrap();
        assert_eq!(payload.source, PayloadSource::Document);
        assert_eq!(payload.code, "<!DOCTYPE html>\n<body>still stream");
    }

    #[test]
    fn test_partial_closing_fence_not_in_document() {
        let visible = "```html\n<!DOCTYPE html>\n<body></body>\n``";
        let payload = detect_code_payload(visible).unwrap();
        assert_eq!(payload.source, PayloadSource::Document);
        assert_eq!(payload.code, "<!DOCTYPE html>\n<body></body>");

        let visible = "```html\n<!DOCTYPE html>\n<pre>`";
        assert_eq!(detect_code_payload(visible).unwrap().code, "<!DOCTYPE html>\n<pre>");
    }

    #[test]
    fn test_raw_document_keeps_backticks_without_fence() {
        let visible = "<!DOCTYPE html><code>`x`";
        assert_eq!(detect_code_payload(visible).unwrap().code, "<!DOCTYPE html><code>`x`");
    }

    #[test]
    fn test_nothing_detected() {
        assert!(detect_code_payload("").is_none());
        assert!(detect_code_payload("Let me know what colors you like.").is_none());
        assert!(detect_code_payload("```html\n<p>unclosed").is_none());
    }
}
