use memchr::memchr;

/// Incremental decoder for `text/event-stream` bodies.
///
/// Bytes are buffered until a full line is available, so multi-byte
/// characters and `data:` lines split across network chunks are decoded
/// intact. Only `data:` payloads are surfaced; comments, `event:` and `id:`
/// lines are dropped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SseLine {
    Data(String),
    InvalidUtf8,
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseLine> {
        self.buffer.extend_from_slice(chunk);
        let mut out = Vec::new();

        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            match std::str::from_utf8(&self.buffer[..newline_pos]) {
                Ok(line) => {
                    if let Some(payload) = extract_data_payload(line.trim()) {
                        if !payload.is_empty() {
                            out.push(SseLine::Data(payload.to_string()));
                        }
                    }
                }
                Err(_) => out.push(SseLine::InvalidUtf8),
            }
            self.buffer.drain(..=newline_pos);
        }

        out
    }

    /// Flush a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<SseLine> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        match std::str::from_utf8(&rest) {
            Ok(line) => extract_data_payload(line.trim())
                .filter(|payload| !payload.is_empty())
                .map(|payload| SseLine::Data(payload.to_string())),
            Err(_) => Some(SseLine::InvalidUtf8),
        }
    }
}
