//! Line assembly and classification for `text/event-stream` bodies.

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Accumulates decoded text and hands out complete lines.
///
/// A trailing partial line stays buffered until its newline arrives.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buffer: String,
}

impl LineBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append text and drain every complete line, without its terminator.
    pub(crate) fn push(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let mut line: String = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            lines.push(line);
        }
        lines
    }

    /// Take whatever partial line is left at end of stream.
    pub(crate) fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        if rest.trim().is_empty() {
            None
        } else {
            Some(rest)
        }
    }
}

/// What a single stream line means.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SseLine<'a> {
    /// Blank lines, comments and non-data fields
    Ignore,
    /// The literal `data: [DONE]` sentinel
    Done,
    /// JSON payload following the `data:` prefix
    Data(&'a str),
}

pub(crate) fn classify(line: &str) -> SseLine<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return SseLine::Ignore;
    }

    match trimmed.strip_prefix(DATA_PREFIX) {
        Some(data) => {
            let data = data.trim_start();
            if data == DONE_SENTINEL {
                SseLine::Done
            } else if data.is_empty() {
                SseLine::Ignore
            } else {
                SseLine::Data(data)
            }
        }
        None => SseLine::Ignore,
    }
}
