//! Reasoning Segmentation
//!
//! Splits accumulated assistant text into a reasoning region and an answer
//! region around a `<think>…</think>` pair.
//!
//! The split is recomputed from the full accumulated text on every delta
//! rather than tracked incrementally: a close tag can arrive split across
//! two deltas, retroactively changing how earlier text is classified, and a
//! from-scratch split makes that case fall out for free.

/// Opening delimiter of the reasoning region
pub const REASONING_OPEN: &str = "<think>";
/// Closing delimiter of the reasoning region
pub const REASONING_CLOSE: &str = "</think>";

/// Display split of a (possibly partial) assistant message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Segments {
    /// Reasoning text, absent when no delimiter appeared
    pub reasoning: Option<String>,
    /// User-facing answer text
    pub answer: String,
    /// Whether the reasoning region is still unclosed
    pub reasoning_open: bool,
}

/// Split raw assistant text into reasoning and answer regions.
///
/// Content before an open delimiter is dropped for display; generated text
/// either starts with the delimiter or contains none at all. An unclosed
/// region keeps everything after the open delimiter as reasoning, even in
/// the final text; half-finished reasoning is never promoted to answer.
pub fn split_segments(text: &str) -> Segments {
    let Some(open) = text.find(REASONING_OPEN) else {
        return Segments {
            reasoning: None,
            answer: text.to_string(),
            reasoning_open: false,
        };
    };

    let after_open = &text[open + REASONING_OPEN.len()..];
    match after_open.find(REASONING_CLOSE) {
        Some(close) => Segments {
            reasoning: Some(after_open[..close].to_string()),
            answer: after_open[close + REASONING_CLOSE.len()..].to_string(),
            reasoning_open: false,
        },
        None => Segments {
            reasoning: Some(after_open.to_string()),
            answer: String::new(),
            reasoning_open: true,
        },
    }
}
