//! Wire protocol: binary-framed messages over TCP.
//!
//! Every message is `[u32 msg_type BE][u32 payload_len BE][payload]`; payloads
//! are JSON-encoded request/response bodies. The framing is the same
//! length-prefixed layout used for replication streams elsewhere; only the
//! message table and the error mapping below belong to the ranking service.
//!
//! Error frames are never handed to callers raw: [`decode_reply`] turns them
//! into [`RpcError::Server`] carrying a typed [`ErrorCode`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

// ── Message type constants ───────────────────────────────────────────

pub const MSG_RERANK_REQUEST: u32 = 0x01;
pub const MSG_RERANK_RESPONSE: u32 = 0x02;
pub const MSG_EMBEDDING_REQUEST: u32 = 0x03;
pub const MSG_EMBEDDING_RESPONSE: u32 = 0x04;
pub const MSG_ERROR: u32 = 0x7F;
pub const MSG_PING: u32 = 0xF0;
pub const MSG_PONG: u32 = 0xF1;

/// Maximum single message payload (16 MB).
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Body of an `MSG_ERROR` frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Error codes carried in `ErrorBody::code`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    /// The frame or its payload could not be understood.
    BadRequest,
    /// The scorer failed for this call only.
    ScoringFailed,
    /// The service is stopping and did not process the request.
    Unavailable,
    /// A code this client does not know.
    Other(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::BadRequest => "bad_request",
            ErrorCode::ScoringFailed => "scoring_failed",
            ErrorCode::Unavailable => "unavailable",
            ErrorCode::Other(code) => code,
        }
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        match code {
            "bad_request" => ErrorCode::BadRequest,
            "scoring_failed" => ErrorCode::ScoringFailed,
            "unavailable" => ErrorCode::Unavailable,
            other => ErrorCode::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one request/reply exchange.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
    #[error("server error ({code}): {message}")]
    Server { code: ErrorCode, message: String },
    #[error("unexpected reply message type 0x{0:02x}")]
    UnexpectedReply(u32),
}

impl RpcError {
    /// The server's error code, if the server answered with an error frame.
    pub fn code(&self) -> Option<&ErrorCode> {
        match self {
            RpcError::Server { code, .. } => Some(code),
            _ => None,
        }
    }
}

// ── Encode / decode ──────────────────────────────────────────────────

/// Write a framed message: `[msg_type u32 BE][payload_len u32 BE][payload]`.
pub async fn write_message<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg_type: u32,
    payload: &[u8],
) -> io::Result<()> {
    if payload.len() > MAX_PAYLOAD_SIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("payload too large: {} bytes", payload.len()),
        ));
    }
    let mut header = [0u8; 8];
    header[..4].copy_from_slice(&msg_type.to_be_bytes());
    header[4..8].copy_from_slice(&(payload.len() as u32).to_be_bytes());
    writer.write_all(&header).await?;
    if !payload.is_empty() {
        writer.write_all(payload).await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Read a framed message, returning `(msg_type, payload)`.
pub async fn read_message<R: AsyncReadExt + Unpin>(reader: &mut R) -> io::Result<(u32, Vec<u8>)> {
    let mut header = [0u8; 8];
    reader.read_exact(&mut header).await?;
    let msg_type = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    let payload_len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("payload too large: {} bytes", payload_len),
        ));
    }
    let mut payload = vec![0u8; payload_len as usize];
    if payload_len > 0 {
        reader.read_exact(&mut payload).await?;
    }
    Ok((msg_type, payload))
}

/// Serialize a serde-compatible value to JSON bytes.
pub fn encode_json<T: Serialize>(value: &T) -> io::Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| io::Error::other(e.to_string()))
}

/// Deserialize a serde-compatible value from JSON bytes.
pub fn decode_json<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> io::Result<T> {
    serde_json::from_slice(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Check that a reply frame has the `expected` type, mapping error frames
/// to [`RpcError::Server`].
pub fn check_reply(expected: u32, msg_type: u32, payload: &[u8]) -> Result<(), RpcError> {
    if msg_type == MSG_ERROR {
        let body: ErrorBody = decode_json(payload)?;
        return Err(RpcError::Server {
            code: ErrorCode::from(body.code.as_str()),
            message: body.message,
        });
    }
    if msg_type != expected {
        return Err(RpcError::UnexpectedReply(msg_type));
    }
    Ok(())
}

/// Decode a reply frame of type `expected` into `T`.
pub fn decode_reply<T: DeserializeOwned>(
    expected: u32,
    msg_type: u32,
    payload: &[u8],
) -> Result<T, RpcError> {
    check_reply(expected, msg_type, payload)?;
    Ok(decode_json(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ScoringError, ServiceError};
    use crate::models::{CandidateDocument, RankRequest, RankResponse};

    #[tokio::test]
    async fn test_ping_frame_has_empty_payload() {
        let mut buf = Vec::new();
        write_message(&mut buf, MSG_PING, b"").await.unwrap();
        assert_eq!(buf, vec![0, 0, 0, 0xF0, 0, 0, 0, 0]);

        let mut reader = io::Cursor::new(&buf);
        let (msg_type, payload) = read_message(&mut reader).await.unwrap();
        assert_eq!(msg_type, MSG_PING);
        assert!(payload.is_empty());
    }

    #[tokio::test]
    async fn test_rerank_request_frame() {
        let req = RankRequest {
            query: "reshape a tensor".into(),
            candidates: vec![CandidateDocument::new("doc1", "Numpy Reshape", "new shape")],
        };
        let mut buf = Vec::new();
        write_message(&mut buf, MSG_RERANK_REQUEST, &encode_json(&req).unwrap())
            .await
            .unwrap();

        let mut reader = io::Cursor::new(&buf);
        let (msg_type, payload) = read_message(&mut reader).await.unwrap();
        assert_eq!(msg_type, MSG_RERANK_REQUEST);
        let decoded: RankRequest = decode_json(&payload).unwrap();
        assert_eq!(decoded.query, "reshape a tensor");
        assert_eq!(decoded.candidates[0].id, "doc1");
    }

    #[tokio::test]
    async fn test_oversized_header_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&MSG_RERANK_REQUEST.to_be_bytes());
        buf.extend_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_be_bytes());
        let mut reader = io::Cursor::new(&buf);
        let err = read_message(&mut reader).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_truncated_frame_is_eof() {
        let buf = vec![0u8, 0, 0, 1, 0, 0, 0, 10, b'{'];
        let mut reader = io::Cursor::new(&buf);
        let err = read_message(&mut reader).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_error_frame_decodes_to_typed_code() {
        let body = ErrorBody::new("unavailable", "service is shutting down");
        let payload = encode_json(&body).unwrap();
        let err =
            decode_reply::<RankResponse>(MSG_RERANK_RESPONSE, MSG_ERROR, &payload).unwrap_err();
        assert_eq!(err.code(), Some(&ErrorCode::Unavailable));
        assert!(err.to_string().contains("service is shutting down"));

        let payload = encode_json(&ErrorBody::new("overloaded", "later")).unwrap();
        let err = check_reply(MSG_PONG, MSG_ERROR, &payload).unwrap_err();
        assert_eq!(err.code(), Some(&ErrorCode::Other("overloaded".to_string())));
    }

    #[test]
    fn test_service_codes_map_to_known_kinds() {
        let scoring: ServiceError = ScoringError::Model("down".into()).into();
        assert_eq!(ErrorCode::from(scoring.code()), ErrorCode::ScoringFailed);
        assert_eq!(ErrorCode::from(ServiceError::Shutdown.code()), ErrorCode::Unavailable);
        assert_eq!(ErrorCode::from(ErrorCode::BadRequest.as_str()), ErrorCode::BadRequest);
    }

    #[test]
    fn test_unexpected_reply_type() {
        let err = check_reply(MSG_PONG, MSG_EMBEDDING_RESPONSE, b"{}").unwrap_err();
        assert!(matches!(err, RpcError::UnexpectedReply(MSG_EMBEDDING_RESPONSE)));
        assert!(err.code().is_none());
    }

    #[test]
    fn test_decode_reply_body() {
        let payload = br#"{"results": [{"id": "a", "score": 0.5}]}"#;
        let resp: RankResponse =
            decode_reply(MSG_RERANK_RESPONSE, MSG_RERANK_RESPONSE, payload).unwrap();
        assert_eq!(resp.results[0].id, "a");
    }

    #[test]
    fn test_decode_garbage_is_invalid_data() {
        let err = decode_json::<RankRequest>(b"not json").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
