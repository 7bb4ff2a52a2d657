/// Incremental parser for `text/event-stream` bodies.
///
/// The transport hands over network reads as they arrive; a read can end in
/// the middle of a line (even the middle of a multi-byte character), so bytes
/// stay buffered until their terminating newline shows up. Comment lines
/// (`: keep-alive`) and blank lines are discarded.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network read; returns the `data:` payloads completed by it,
    /// in arrival order. The `[DONE]` sentinel is returned as a payload like
    /// any other; terminating on it is the caller's job.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            if let Some(data) = line.strip_prefix("data: ") {
                payloads.push(data.to_string());
            }
        }
        payloads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_lines_yield_payloads() {
        let mut parser = SseParser::new();
        let payloads = parser.push(b"data: {\"a\":1}\ndata: {\"b\":2}\n");
        assert_eq!(payloads, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn partial_lines_are_buffered_across_pushes() {
        let mut parser = SseParser::new();
        assert!(parser.push(b"data: {\"piece").is_empty());
        assert!(parser.push(b"\":true").is_empty());
        let payloads = parser.push(b"}\n");
        assert_eq!(payloads, vec!["{\"piece\":true}"]);
    }

    #[test]
    fn split_multibyte_characters_survive() {
        let text = "data: {\"t\":\"жёлтый\"}\n".as_bytes();
        let (a, b) = text.split_at(13); // cuts inside a two-byte character
        let mut parser = SseParser::new();
        assert!(parser.push(a).is_empty());
        let payloads = parser.push(b);
        assert_eq!(payloads, vec!["{\"t\":\"жёлтый\"}"]);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let mut parser = SseParser::new();
        let payloads = parser.push(b": keep-alive\n\ndata: x\n\n");
        assert_eq!(payloads, vec!["x"]);
    }

    #[test]
    fn done_sentinel_is_passed_through() {
        let mut parser = SseParser::new();
        let payloads = parser.push(b"data: [DONE]\n");
        assert_eq!(payloads, vec!["[DONE]"]);
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let mut parser = SseParser::new();
        let payloads = parser.push(b"data: x\r\ndata: y\r\n");
        assert_eq!(payloads, vec!["x", "y"]);
    }
}
