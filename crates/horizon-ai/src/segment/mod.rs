//! Content segmentation of accumulated assistant text.
//!
//! [`segment`] is a pure function of the full text received so far. It is
//! cheap enough to re-run after every fragment, so no parser state is carried
//! between calls:
//!
//! - closed `<think>...</think>` regions become reasoning segments,
//! - everything outside those regions is the visible text,
//! - an unclosed `<think>` hides the rest of the text until its end marker
//!   arrives, so half-written commentary never leaks into either view,
//! - the visible text is searched for an embedded HTML document.

mod code;
mod tracker;

use std::ops::Range;

pub use code::{CodePayload, PayloadSource, detect_code_payload};
pub use tracker::PayloadTracker;

pub const THINK_START: &str = "<think>";
pub const THINK_END: &str = "</think>";

/// A span of the input removed from the visible text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedRegion {
    /// Byte range in the input, markers included
    pub range: Range<usize>,
    /// False while the end marker has not arrived yet
    pub closed: bool,
}

/// Derived views of one accumulated text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmentation {
    /// Inner text of every closed reasoning region, trimmed, in order
    pub reasoning_segments: Vec<String>,
    /// Text outside all regions, trimmed
    pub visible_text: String,
    pub code_payload: Option<CodePayload>,
    /// Inner text of a trailing unclosed region, if any
    pub pending_reasoning: Option<String>,
    /// Removed regions in input order, non-overlapping
    pub regions: Vec<MarkedRegion>,
}

impl Segmentation {
    pub fn code(&self) -> Option<&str> {
        self.code_payload.as_ref().map(|p| p.code.as_str())
    }

    pub fn is_thinking(&self) -> bool {
        self.pending_reasoning.is_some()
    }
}

/// Split `text` into reasoning segments, visible text, and code payload.
pub fn segment(text: &str) -> Segmentation {
    let regions = scan_regions(text);

    let mut reasoning_segments = Vec::new();
    let mut pending_reasoning = None;
    let mut visible = String::with_capacity(text.len());
    let mut cursor = 0;

    for region in &regions {
        visible.push_str(&text[cursor..region.range.start]);
        let inner_start = region.range.start + THINK_START.len();
        if region.closed {
            let inner_end = region.range.end - THINK_END.len();
            reasoning_segments.push(text[inner_start..inner_end].trim().to_string());
        } else {
            pending_reasoning = Some(text[inner_start..].trim().to_string());
        }
        cursor = region.range.end;
    }
    visible.push_str(&text[cursor..]);

    let visible_text = visible.trim().to_string();
    let code_payload = detect_code_payload(&visible_text);

    Segmentation {
        reasoning_segments,
        visible_text,
        code_payload,
        pending_reasoning,
        regions,
    }
}

/// Single left-to-right pass. Inside an open region only the end marker is
/// searched for, so a nested start marker is just part of the reasoning.
fn scan_regions(text: &str) -> Vec<MarkedRegion> {
    let mut regions = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find(THINK_START) {
        let start = pos + offset;
        let body = start + THINK_START.len();
        match text[body..].find(THINK_END) {
            Some(end_offset) => {
                let end = body + end_offset + THINK_END.len();
                regions.push(MarkedRegion {
                    range: start..end,
                    closed: true,
                });
                pos = end;
            }
            None => {
                regions.push(MarkedRegion {
                    range: start..text.len(),
                    closed: false,
                });
                break;
            }
        }
    }

    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Text outside the removed regions, untrimmed.
    fn complement(text: &str, regions: &[MarkedRegion]) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut cursor = 0;
        for region in regions {
            pieces.push(text[cursor..region.range.start].to_string());
            cursor = region.range.end;
        }
        pieces.push(text[cursor..].to_string());
        pieces
    }

    fn assert_lossless(text: &str) {
        let seg = segment(text);
        let pieces = complement(text, &seg.regions);

        let mut rebuilt = String::new();
        for (i, piece) in pieces.iter().enumerate() {
            rebuilt.push_str(piece);
            if let Some(region) = seg.regions.get(i) {
                rebuilt.push_str(&text[region.range.clone()]);
            }
        }
        assert_eq!(rebuilt, text);
        assert_eq!(pieces.concat().trim(), seg.visible_text);

        let closed: Vec<&MarkedRegion> = seg.regions.iter().filter(|r| r.closed).collect();
        assert_eq!(closed.len(), seg.reasoning_segments.len());
        for (region, reasoning) in closed.iter().zip(&seg.reasoning_segments) {
            let raw = &text[region.range.clone()];
            assert!(raw.starts_with(THINK_START));
            assert!(raw.ends_with(THINK_END));
            let inner = &raw[THINK_START.len()..raw.len() - THINK_END.len()];
            assert_eq!(inner.trim(), reasoning);
        }
    }

    #[test]
    fn test_reasoning_removed_from_visible() {
        let seg = segment("before <think>plan</think> after");
        assert_eq!(seg.reasoning_segments, vec!["plan"]);
        assert_eq!(seg.visible_text, "before  after");
        assert!(seg.pending_reasoning.is_none());
        assert!(seg.code_payload.is_none());
    }

    #[test]
    fn test_multiple_segments_in_order() {
        let seg = segment("<think> first </think>A<think>\nsecond\n</think>B");
        assert_eq!(seg.reasoning_segments, vec!["first", "second"]);
        assert_eq!(seg.visible_text, "AB");
    }

    #[test]
    fn test_unclosed_region_is_suppressed() {
        let seg = segment("intro <think>still deciding on the layo");
        assert!(seg.reasoning_segments.is_empty());
        assert_eq!(seg.visible_text, "intro");
        assert_eq!(seg.pending_reasoning.as_deref(), Some("still deciding on the layo"));
        assert!(seg.is_thinking());
        assert_eq!(seg.regions.len(), 1);
        assert!(!seg.regions[0].closed);
    }

    #[test]
    fn test_stray_end_marker_stays_visible() {
        let seg = segment("oops </think> text <think>r</think>");
        assert_eq!(seg.reasoning_segments, vec!["r"]);
        assert_eq!(seg.visible_text, "oops </think> text");
    }

    #[test]
    fn test_nested_start_marker_ignored() {
        let seg = segment("a<think>x<think>y</think>b</think>c");
        assert_eq!(seg.reasoning_segments, vec!["x<think>y"]);
        assert_eq!(seg.visible_text, "ab</think>c");
    }

    #[test]
    fn test_empty_and_plain_text() {
        assert_eq!(segment(""), Segmentation::default());
        let seg = segment("  just words  ");
        assert_eq!(seg.visible_text, "just words");
        assert!(seg.regions.is_empty());
    }

    #[test]
    fn test_lossless_partition() {
        for text in [
            "",
            "plain",
            "before <think>plan</think> after",
            "<think>a</think><think>b</think>",
            "x </think> y <think>open",
            "a<think>x<think>y</think>b</think>c",
            "<think>\n  spaced \n</think>\n\n```html\n<p>hi</p>\n```\n",
            "héllo <think>ü</think> wörld",
        ] {
            assert_lossless(text);
        }
    }

    #[test]
    fn test_idempotent() {
        let text = "<think>plan</think>Here:\n```html\n<!DOCTYPE html><p>x</p>\n```";
        assert_eq!(segment(text), segment(text));
    }

    #[test]
    fn test_closed_segments_stable_over_prefixes() {
        let text = "Sure. <think>layout: hero, grid</think> Building it.\n\
                    <think>colors: blue</think>```html\n<!DOCTYPE html>\n<h1>x</h1>\n```\ndone";

        let mut reported: Vec<String> = Vec::new();
        for end in (0..=text.len()).filter(|i| text.is_char_boundary(*i)) {
            let seg = segment(&text[..end]);
            assert!(seg.reasoning_segments.len() >= reported.len());
            assert_eq!(&seg.reasoning_segments[..reported.len()], &reported[..]);
            reported = seg.reasoning_segments;
        }
        assert_eq!(reported, vec!["layout: hero, grid", "colors: blue"]);
    }

    #[test]
    fn test_code_detected_outside_reasoning_only() {
        let seg = segment("<think>maybe <!DOCTYPE html> here?</think>Just chatting.");
        assert!(seg.code_payload.is_none());

        let seg = segment("<think>plan</think>```html\n<!DOCTYPE html>\n<p>x</p>\n```");
        assert_eq!(seg.code(), Some("<!DOCTYPE html>\n<p>x</p>"));
    }
}
