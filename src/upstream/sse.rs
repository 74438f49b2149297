//! SSE (Server-Sent Events) decoding
//!
//! Both upstream protocols stream `data:` lines terminated by `data: [DONE]`.
//! Chunks from the network do not align with line boundaries, so bytes are
//! buffered until a full line is available.

/// One decoded SSE item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Payload of a `data:` line
    Data(String),
    /// The `[DONE]` terminator
    Done,
}

/// Incremental decoder for `data:` lines.
///
/// # Example
/// ```
/// use chat_relay::upstream::sse::{SseDecoder, SseEvent};
///
/// let mut decoder = SseDecoder::new();
/// assert!(decoder.feed(b"data: {\"content\":\"hel").is_empty());
/// assert_eq!(
///     decoder.feed(b"lo\"}\n\n"),
///     vec![SseEvent::Data("{\"content\":\"hello\"}".to_string())]
/// );
/// ```
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes of the line currently being received
    incomplete: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes into the decoder and return the events of every completed line
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.incomplete.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(newline_pos) = self.incomplete.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.incomplete.drain(..=newline_pos).collect();
            if let Some(event) = parse_line(&line[..line.len() - 1]) {
                events.push(event);
            }
        }

        events
    }

    /// Decode whatever is left once the stream has ended
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.incomplete);
        parse_line(&rest)
    }

    pub fn has_incomplete(&self) -> bool {
        !self.incomplete.is_empty()
    }
}

fn parse_line(raw: &[u8]) -> Option<SseEvent> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches('\r');

    // Comments, event names, ids and blank separators carry nothing we use
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() {
        return None;
    }

    if data == "[DONE]" {
        Some(SseEvent::Done)
    } else {
        Some(SseEvent::Data(data.to_string()))
    }
}
