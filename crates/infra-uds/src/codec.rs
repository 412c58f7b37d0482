// Wire Adapter - newline-delimited JSON-RPC 2.0 envelopes
// reason: one JSON document per line keeps framing trivial on a byte stream

use serde::Serialize;
use serde_json::Value;
use sockrpc_core::{Error, Request, Response, Result};
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::trace;

/// Upper bound for a single frame unless configured otherwise (1 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// What the server read from a connection.
#[derive(Debug)]
pub enum Inbound {
    Request(Request),
    /// The frame could not be decoded as a request. `id` is set when the
    /// frame was valid JSON carrying an integer id.
    Malformed {
        id: Option<u64>,
        reason: String,
    },
    /// Peer closed the connection before sending anything.
    Closed,
}

/// A byte stream wrapped with the JSON-RPC codec.
///
/// Exposes the two halves of a call: `send_request` / `recv_response` on the
/// client, `recv_request` / `send_response` on the server.
pub struct WireConnection<S = UnixStream> {
    stream: BufReader<S>,
    max_frame_bytes: usize,
}

impl<S> WireConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self::with_max_frame_bytes(stream, DEFAULT_MAX_FRAME_BYTES)
    }

    pub fn with_max_frame_bytes(stream: S, max_frame_bytes: usize) -> Self {
        Self {
            stream: BufReader::new(stream),
            max_frame_bytes,
        }
    }

    pub async fn send_request(&mut self, request: &Request) -> Result<()> {
        trace!(id = request.id, method = %request.method, "Writing request frame");
        self.write_frame(request).await
    }

    /// Read the single response of this connection.
    pub async fn recv_response(&mut self) -> Result<Response> {
        let frame = self.read_frame().await?.ok_or_else(|| {
            Error::Transport(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before a response arrived",
            ))
        })?;
        serde_json::from_slice(&frame)
            .map_err(|e| Error::Protocol(format!("malformed response: {}", e)))
    }

    pub async fn recv_request(&mut self) -> Result<Inbound> {
        match self.read_frame().await? {
            Some(frame) => Ok(decode_request(&frame)),
            None => Ok(Inbound::Closed),
        }
    }

    pub async fn send_response(&mut self, response: &Response) -> Result<()> {
        trace!(
            id = response.id,
            error = response.is_error(),
            "Writing response frame"
        );
        self.write_frame(response).await
    }

    /// Flush and shut down the write half.
    pub async fn close(&mut self) -> Result<()> {
        self.stream.get_mut().shutdown().await?;
        Ok(())
    }

    async fn write_frame<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let mut frame = serde_json::to_vec(message)?;
        frame.push(b'\n');
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// One line, without its terminator. `None` on a clean EOF.
    async fn read_frame(&mut self) -> Result<Option<Vec<u8>>> {
        let mut frame = Vec::new();
        // One extra byte so a frame of exactly max_frame_bytes plus '\n' fits
        let limit = self.max_frame_bytes as u64 + 1;
        let read = (&mut self.stream)
            .take(limit)
            .read_until(b'\n', &mut frame)
            .await?;

        if read == 0 {
            return Ok(None);
        }
        if frame.last() == Some(&b'\n') {
            frame.pop();
        } else if read as u64 == limit {
            return Err(Error::Protocol(format!(
                "frame exceeds {} bytes",
                self.max_frame_bytes
            )));
        }
        Ok(Some(frame))
    }
}

/// Decode one request frame, recovering the id from malformed envelopes when
/// the frame is at least valid JSON.
pub fn decode_request(frame: &[u8]) -> Inbound {
    let value: Value = match serde_json::from_slice(frame) {
        Ok(value) => value,
        Err(e) => {
            return Inbound::Malformed {
                id: None,
                reason: e.to_string(),
            }
        }
    };
    let id = value.get("id").and_then(Value::as_u64);
    match serde_json::from_value::<Request>(value) {
        Ok(request) => Inbound::Request(request),
        Err(e) => Inbound::Malformed {
            id,
            reason: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sockrpc_core::ErrorObject;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_request_and_response_cross_the_wire() {
        let (a, b) = duplex(4096);
        let mut client = WireConnection::new(a);
        let mut server = WireConnection::new(b);

        let req = Request::new(42, "echo", json!({"text": "hi"}));
        client.send_request(&req).await.unwrap();

        let received = match server.recv_request().await.unwrap() {
            Inbound::Request(r) => r,
            other => panic!("unexpected inbound: {other:?}"),
        };
        assert_eq!(received, req);

        server
            .send_response(&Response::success(42, json!("hi")))
            .await
            .unwrap();
        let resp = client.recv_response().await.unwrap();
        assert_eq!(resp, Response::success(42, json!("hi")));
    }

    #[tokio::test]
    async fn test_error_response_round_trip() {
        let (a, b) = duplex(4096);
        let mut client = WireConnection::new(a);
        let mut server = WireConnection::new(b);

        let resp = Response::error(3, ErrorObject::method_not_found("ghost"));
        server.send_response(&resp).await.unwrap();
        assert_eq!(client.recv_response().await.unwrap(), resp);
    }

    #[tokio::test]
    async fn test_closed_before_request() {
        let (a, b) = duplex(64);
        drop(a);
        let mut server = WireConnection::new(b);
        assert!(matches!(
            server.recv_request().await.unwrap(),
            Inbound::Closed
        ));
    }

    #[tokio::test]
    async fn test_closed_before_response_is_transport_error() {
        let (a, b) = duplex(64);
        drop(b);
        let mut client = WireConnection::new(a);
        let err = client.recv_response().await.unwrap_err();
        match err {
            Error::Transport(e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected a transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_response_is_protocol_error() {
        let (mut a, b) = duplex(256);
        let mut client = WireConnection::new(b);
        let frame = b"{\"jsonrpc\":\"2.0\",\"id\":1}\n";
        a.write_all(frame).await.unwrap();
        let err = client.recv_response().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let (mut a, b) = duplex(256);
        let mut server = WireConnection::with_max_frame_bytes(b, 16);
        tokio::spawn(async move {
            let _ = a.write_all(&[b'x'; 64]).await;
            let _ = a.write_all(b"\n").await;
        });
        let err = server.recv_request().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(ref m) if m.contains("exceeds 16 bytes")));
    }

    #[test]
    fn test_decode_recovers_id_from_invalid_envelope() {
        match decode_request(br#"{"jsonrpc":"2.0","id":17,"params":[]}"#) {
            Inbound::Malformed { id, .. } => assert_eq!(id, Some(17)),
            other => panic!("unexpected inbound: {other:?}"),
        }
    }

    #[test]
    fn test_decode_garbage_has_no_id() {
        match decode_request(b"not json at all") {
            Inbound::Malformed { id, reason } => {
                assert_eq!(id, None);
                assert!(!reason.is_empty());
            }
            other => panic!("unexpected inbound: {other:?}"),
        }
    }

    #[test]
    fn test_decode_tolerates_crlf() {
        assert!(matches!(
            decode_request(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"a\"}\r"),
            Inbound::Request(_)
        ));
    }
}
