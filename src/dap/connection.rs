//! DAP connection plumbing: reader task and response/event writer
//!
//! The reader task parses framed requests off the client stream and posts
//! them on a channel; the adapter task is the only consumer and the only
//! writer, so every response and event funnels through one [`DapWriter`]
//! in a single, well-defined order.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;

use crate::common::{Error, Result};

use super::codec;
use super::types::{EventMessage, RequestMessage, ResponseMessage};
use super::wire_log::WireLog;

/// Spawn the client reader task
///
/// Returns the channel of parsed requests. The channel closes when the
/// client stream does, which the adapter treats as session teardown.
pub fn spawn_reader<R>(mut reader: R, wire_log: WireLog) -> mpsc::UnboundedReceiver<RequestMessage>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let json = match codec::read_message(&mut reader).await {
                Ok(json) => json,
                Err(Error::ClientDisconnected) => {
                    tracing::info!("DAP client closed the stream");
                    break;
                }
                Err(e) => {
                    tracing::error!("DAP read error: {e}");
                    break;
                }
            };

            wire_log.log_recv(&json);

            let request: RequestMessage = match serde_json::from_str(&json) {
                Ok(req) => req,
                Err(e) => {
                    tracing::warn!("Dropping malformed DAP message: {e}");
                    continue;
                }
            };

            if request.message_type != "request" {
                tracing::warn!(
                    "Dropping unexpected DAP message type '{}'",
                    request.message_type
                );
                continue;
            }

            tracing::debug!("{}: {}", request.seq, request.command);

            if tx.send(request).is_err() {
                // Adapter side is gone; nothing left to read for.
                break;
            }
        }
    });

    rx
}

/// Writer half of the DAP connection
///
/// Owns the outbound sequence counter. Not shared: the adapter task is
/// the sole holder, which is what guarantees response-before-event byte
/// order for a handler that sends both.
pub struct DapWriter<W> {
    writer: W,
    seq: i64,
    wire_log: WireLog,
}

impl<W: AsyncWrite + Unpin> DapWriter<W> {
    pub fn new(writer: W, wire_log: WireLog) -> Self {
        Self {
            writer,
            seq: 0,
            wire_log,
        }
    }

    fn next_seq(&mut self) -> i64 {
        self.seq += 1;
        self.seq
    }

    /// Send a success response for the given request
    pub async fn respond_success(
        &mut self,
        request: &RequestMessage,
        body: Option<Value>,
    ) -> Result<()> {
        let response = ResponseMessage {
            seq: self.next_seq(),
            message_type: "response".to_string(),
            request_seq: request.seq,
            success: true,
            command: request.command.clone(),
            message: None,
            body,
        };
        self.write(serde_json::to_string(&response)?).await
    }

    /// Send an error response for the given request
    pub async fn respond_error(
        &mut self,
        request: &RequestMessage,
        message: impl Into<String>,
    ) -> Result<()> {
        let message = message.into();
        tracing::debug!("{} failed: {}", request.command, message);

        let response = ResponseMessage {
            seq: self.next_seq(),
            message_type: "response".to_string(),
            request_seq: request.seq,
            success: false,
            command: request.command.clone(),
            message: Some(message),
            body: None,
        };
        self.write(serde_json::to_string(&response)?).await
    }

    /// Send a spontaneous event
    pub async fn send_event(&mut self, event: &str, body: Option<Value>) -> Result<()> {
        let event = EventMessage {
            seq: self.next_seq(),
            message_type: "event".to_string(),
            event: event.to_string(),
            body,
        };
        self.write(serde_json::to_string(&event)?).await
    }

    async fn write(&mut self, json: String) -> Result<()> {
        self.wire_log.log_send(&json);
        codec::write_message(&mut self.writer, &json).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncWriteExt, BufReader};

    #[tokio::test]
    async fn test_reader_posts_requests_and_closes_on_eof() {
        let (mut client, server) = tokio::io::duplex(1024);

        let mut rx = spawn_reader(BufReader::new(server), WireLog::disabled());

        let json = r#"{"seq":1,"type":"request","command":"threads"}"#;
        let frame = format!("Content-Length: {}\r\n\r\n{}", json.len(), json);
        client.write_all(frame.as_bytes()).await.unwrap();
        drop(client);

        let req = rx.recv().await.expect("request should arrive");
        assert_eq!(req.command, "threads");
        assert!(rx.recv().await.is_none(), "channel closes on EOF");
    }

    #[tokio::test]
    async fn test_writer_seq_increments() {
        let mut out = Vec::new();
        {
            let mut writer = DapWriter::new(&mut out, WireLog::disabled());
            let req = RequestMessage {
                seq: 7,
                message_type: "request".to_string(),
                command: "launch".to_string(),
                arguments: None,
            };
            writer.respond_success(&req, None).await.unwrap();
            writer.send_event("initialized", None).await.unwrap();
        }

        let text = String::from_utf8(out).unwrap();
        let response_at = text.find(r#""request_seq":7"#).unwrap();
        let event_at = text.find(r#""event":"initialized""#).unwrap();
        assert!(response_at < event_at);
        assert!(text.contains(r#""seq":1"#));
        assert!(text.contains(r#""seq":2"#));
    }
}
