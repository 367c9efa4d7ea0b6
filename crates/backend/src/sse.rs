//! Server-sent event plumbing: an incremental frame parser and the
//! cancellable stream handle the session controller consumes.

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::api::BackendError;

//
// ─── FRAME PARSER ──────────────────────────────────────────────────────────────
//

/// Incremental parser for the `text/event-stream` wire format.
///
/// Chunks arrive at arbitrary boundaries; `push` buffers partial lines and
/// returns the data payload of every event completed by the chunk. Comment
/// lines and non-`data` fields are tolerated and ignored.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    data_lines: Vec<String>,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk; returns completed event payloads in order.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);
        let mut completed = Vec::new();

        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if !self.data_lines.is_empty() {
                    completed.push(self.data_lines.join("\n"));
                    self.data_lines.clear();
                }
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data_lines
                    .push(value.strip_prefix(' ').unwrap_or(value).to_owned());
            }
            // comments (":keepalive") and other fields (event:, id:, retry:)
            // carry nothing the progress channel needs
        }

        completed
    }
}

//
// ─── PROGRESS STREAM ───────────────────────────────────────────────────────────
//

/// One-directional handle on an open grading progress stream.
///
/// Raw payloads are delivered in order through `next_event`; a transport
/// failure is delivered once as `Err` and ends the stream. `close` (or drop)
/// aborts the underlying connection task; there is no reconnection.
pub struct ProgressStream {
    rx: mpsc::Receiver<Result<String, BackendError>>,
    abort: Option<AbortHandle>,
}

impl ProgressStream {
    pub(crate) fn new(
        rx: mpsc::Receiver<Result<String, BackendError>>,
        abort: Option<AbortHandle>,
    ) -> Self {
        Self { rx, abort }
    }

    /// Build a stream from pre-scripted payloads. Used by test backends.
    #[must_use]
    pub fn from_events(events: Vec<Result<String, BackendError>>) -> Self {
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            // capacity covers every scripted event
            let _ = tx.try_send(event);
        }
        Self { rx, abort: None }
    }

    /// Next raw payload, `None` once the stream has ended or been closed.
    pub async fn next_event(&mut self) -> Option<Result<String, BackendError>> {
        self.rx.recv().await
    }

    /// Abort the underlying connection and stop delivering events.
    pub fn close(&mut self) {
        if let Some(handle) = self.abort.take() {
            handle.abort();
        }
        self.rx.close();
    }
}

impl Drop for ProgressStream {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ProgressStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStream")
            .field("open", &self.abort.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_event() {
        let mut parser = SseParser::new();
        let events = parser.push("data: {\"type\":\"progress\"}\n\n");
        assert_eq!(events, vec!["{\"type\":\"progress\"}"]);
    }

    #[test]
    fn reassembles_split_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.push("data: hel").is_empty());
        assert!(parser.push("lo\n").is_empty());
        let events = parser.push("\n");
        assert_eq!(events, vec!["hello"]);
    }

    #[test]
    fn joins_multi_line_data_and_skips_comments() {
        let mut parser = SseParser::new();
        let events = parser.push(":keepalive\nevent: progress\ndata: a\ndata: b\n\n");
        assert_eq!(events, vec!["a\nb"]);
    }

    #[test]
    fn handles_crlf_terminated_lines() {
        let mut parser = SseParser::new();
        let events = parser.push("data: x\r\n\r\n");
        assert_eq!(events, vec!["x"]);
    }

    #[tokio::test]
    async fn scripted_stream_delivers_in_order_then_ends() {
        let mut stream = ProgressStream::from_events(vec![
            Ok("one".to_owned()),
            Ok("two".to_owned()),
        ]);

        assert_eq!(stream.next_event().await.unwrap().unwrap(), "one");
        assert_eq!(stream.next_event().await.unwrap().unwrap(), "two");
        assert!(stream.next_event().await.is_none());
    }

    #[tokio::test]
    async fn closed_stream_stops_delivering() {
        let mut stream = ProgressStream::from_events(vec![Ok("queued".to_owned())]);
        stream.close();
        // buffered payloads may drain, but the channel is closed for good
        while stream.next_event().await.is_some() {}
        assert!(stream.next_event().await.is_none());
    }
}
