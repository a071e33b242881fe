//! Line decoder for upstream `data:` frames.
//!
//! Network chunks do not respect line boundaries, so bytes are buffered
//! until a newline arrives. Splitting happens on raw bytes, which keeps
//! multi-byte characters intact when a chunk ends mid-character.

use serde::Deserialize;

/// One decoded `data:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    Data(String),
    Done,
}

#[derive(Debug, Default)]
pub struct SseLineDecoder {
    buffer: Vec<u8>,
}

impl SseLineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one network chunk, returning every complete line it finished.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseLine> {
        self.buffer.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(line) = parse_line(&raw) {
                lines.push(line);
            }
        }
        lines
    }

    /// Flushes a trailing line left without a newline at end of stream.
    pub fn finish(&mut self) -> Option<SseLine> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest)
    }
}

fn parse_line(raw: &[u8]) -> Option<SseLine> {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim_end_matches(['\n', '\r']);
    let payload = line.strip_prefix("data:")?;
    let payload = payload.strip_prefix(' ').unwrap_or(payload);
    match payload.trim() {
        "" => None,
        "[DONE]" => Some(SseLine::Done),
        _ => Some(SseLine::Data(payload.to_string())),
    }
}

#[derive(Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Content delta carried by one chunk, if any.
///
/// Role-only and finish chunks carry no content and yield `Ok(None)`.
pub fn parse_delta(data: &str) -> Result<Option<String>, serde_json::Error> {
    let payload: ChunkPayload = serde_json::from_str(data)?;
    Ok(payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .filter(|content| !content.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_complete_lines() {
        let mut decoder = SseLineDecoder::new();
        let lines = decoder.push(b"data: {\"a\":1}\n\ndata: [DONE]\n\n");
        assert_eq!(
            lines,
            vec![SseLine::Data("{\"a\":1}".to_string()), SseLine::Done]
        );
    }

    #[test]
    fn buffers_lines_split_across_chunks() {
        let mut decoder = SseLineDecoder::new();
        assert!(decoder.push(b"data: {\"choi").is_empty());
        assert!(decoder.push(b"ces\":[]}").is_empty());
        assert_eq!(
            decoder.push(b"\n"),
            vec![SseLine::Data("{\"choices\":[]}".to_string())]
        );
    }

    #[test]
    fn keeps_multibyte_characters_split_across_chunks() {
        let bytes = "data: {\"c\":\"é\"}\n".as_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let mut decoder = SseLineDecoder::new();
        assert!(decoder.push(&bytes[..split]).is_empty());
        assert_eq!(
            decoder.push(&bytes[split..]),
            vec![SseLine::Data("{\"c\":\"é\"}".to_string())]
        );
    }

    #[test]
    fn ignores_comments_and_other_fields() {
        let mut decoder = SseLineDecoder::new();
        let lines = decoder.push(b": keep-alive\r\nevent: ping\r\ndata:{}\r\n");
        assert_eq!(lines, vec![SseLine::Data("{}".to_string())]);
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut decoder = SseLineDecoder::new();
        decoder.push(b"data: [DONE]");
        assert_eq!(decoder.finish(), Some(SseLine::Done));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn extracts_content_delta() {
        let data = r#"{"choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}"#;
        assert_eq!(parse_delta(data).unwrap(), Some("Hel".to_string()));
    }

    #[test]
    fn role_and_finish_chunks_have_no_content() {
        assert_eq!(
            parse_delta(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap(),
            None
        );
        assert_eq!(
            parse_delta(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#).unwrap(),
            None
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_delta("{not json").is_err());
    }
}
