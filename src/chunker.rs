//! Token-bounded content splitting for submission to the rewriting model.

use regex::Regex;
use std::sync::LazyLock;

static PARAGRAPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</p>|<br\s*/?>|\n\n").unwrap());

static SENTENCE_BOUNDARY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// Cheap token estimate: one token per three characters, rounded up. A proxy,
/// not a tokenizer; chunk boundaries depend on this exact constant.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(3)
}

/// Split `content` into chunks of at most `max_tokens_per_chunk` estimated
/// tokens, preferring paragraph boundaries (`</p>`, `<br>`, blank lines) and
/// falling back to sentence boundaries for a single over-limit paragraph.
///
/// Paragraph delimiters are kept with their segments, so concatenating
/// paragraph-level chunks reconstructs the input. Always returns at least one
/// chunk.
pub fn split(content: &str, max_tokens_per_chunk: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_tokens = 0usize;

    for segment in paragraph_segments(content) {
        let segment_tokens = estimate_tokens(segment);

        if segment_tokens > max_tokens_per_chunk {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_tokens = 0;
            }
            for sentence in sentence_segments(segment) {
                let sentence_tokens = estimate_tokens(sentence);
                if current_tokens + sentence_tokens > max_tokens_per_chunk && !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                    current.push_str(sentence);
                    current_tokens = sentence_tokens;
                } else {
                    if !current.is_empty() {
                        current.push(' ');
                    }
                    current.push_str(sentence);
                    current_tokens += sentence_tokens;
                }
            }
            continue;
        }

        if current_tokens + segment_tokens > max_tokens_per_chunk && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current.push_str(segment);
            current_tokens = segment_tokens;
        } else {
            current.push_str(segment);
            current_tokens += segment_tokens;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    if chunks.is_empty() {
        chunks.push(content.to_string());
    }
    chunks
}

/// Paragraph-level segments with their delimiters as separate entries, in
/// document order.
fn paragraph_segments(content: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut last = 0;
    for m in PARAGRAPH_RE.find_iter(content) {
        if m.start() > last {
            segments.push(&content[last..m.start()]);
        }
        segments.push(m.as_str());
        last = m.end();
    }
    if last < content.len() {
        segments.push(&content[last..]);
    }
    segments
}

/// Sentence segments ending at `[.!?]` followed by whitespace; the trailing
/// whitespace is dropped (re-accumulation joins with single spaces).
fn sentence_segments(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    for m in SENTENCE_BOUNDARY_RE.find_iter(text) {
        let end = m.start() + 1; // include the punctuation character
        if end > start {
            segments.push(&text[start..end]);
        }
        start = m.end();
    }
    if start < text.len() {
        segments.push(&text[start..]);
    }
    segments
}
