//! TCP listener that serves framed ReRank/GetEmbedding calls.
//!
//! One task per connection; frames on a connection are answered in order.
//! After a stop signal, frames a client already sent are answered with an
//! `unavailable` error rather than dropped.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;

use super::protocol::*;
use crate::models::{EmbeddingRequest, RankRequest};
use crate::error::ServiceError;
use crate::service::RankingService;

/// How long a stopped connection waits for further frames before closing.
const DRAIN_READ_WINDOW: Duration = Duration::from_millis(50);

pub struct RpcServer {
    listener: TcpListener,
    service: Arc<RankingService>,
    grace: Duration,
}

impl RpcServer {
    pub async fn bind(addr: &str, service: Arc<RankingService>, grace: Duration) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind RPC listener on {addr}"))?;
        Ok(Self {
            listener,
            service,
            grace,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` resolves, then drain live
    /// connections for up to the grace period.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Self {
            listener,
            service,
            grace,
        } = self;

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut connections = JoinSet::new();

        service.mark_serving();
        tracing::info!(
            "RPC server listening on {} ({} scorer, {} workers)",
            listener.local_addr()?,
            service.scorer_name(),
            service.max_workers()
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::warn!("Failed to accept connection: {e}");
                            continue;
                        }
                    };
                    tracing::debug!("Client connected from {}", peer);
                    let service = Arc::clone(&service);
                    let stop_rx = stop_rx.clone();
                    connections.spawn(async move {
                        if let Err(e) = handle_connection(stream, service, stop_rx).await {
                            tracing::warn!("Client {} disconnected: {}", peer, e);
                        }
                    });
                }
            }

            // Reap finished connection tasks
            while connections.try_join_next().is_some() {}
        }

        drop(listener);
        service.mark_stopped();
        let _ = stop_tx.send(true);
        tracing::info!(
            "Stopped accepting connections, draining {} connection(s)",
            connections.len()
        );

        let drained = tokio::time::timeout(grace, async {
            while connections.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                "Grace period of {:?} elapsed, aborting {} connection(s)",
                grace,
                connections.len()
            );
            connections.shutdown().await;
        }

        tracing::info!("RPC server stopped");
        Ok(())
    }
}

async fn handle_connection(
    stream: TcpStream,
    service: Arc<RankingService>,
    mut stop_rx: watch::Receiver<bool>,
) -> io::Result<()> {
    stream.set_nodelay(true)?;
    let (reader, writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut writer = BufWriter::new(writer);

    loop {
        if *stop_rx.borrow() {
            return refuse_pending(&mut reader, &mut writer).await;
        }

        // `fill_buf` is cancel-safe: if the stop signal wins, buffered bytes
        // are still there for `refuse_pending`.
        let readable = tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                continue;
            }
            buf = reader.fill_buf() => !buf?.is_empty(),
        };
        if !readable {
            return Ok(());
        }

        let (msg_type, payload) = match read_message(&mut reader).await {
            Ok(frame) => frame,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => {
                let body = ErrorBody::new(ErrorCode::BadRequest.as_str(), e.to_string());
                let _ = write_message(&mut writer, MSG_ERROR, &encode_json(&body)?).await;
                return Err(e);
            }
        };

        let (reply_type, reply) = if *stop_rx.borrow() {
            shutdown_frame()?
        } else {
            dispatch(&service, msg_type, &payload).await?
        };
        write_message(&mut writer, reply_type, &reply).await?;
    }
}

/// Answer every frame still arriving on a stopped connection with
/// `unavailable`, then close once the peer goes quiet or disconnects.
async fn refuse_pending<R, W>(reader: &mut R, writer: &mut W) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        match tokio::time::timeout(DRAIN_READ_WINDOW, read_message(reader)).await {
            Ok(Ok((msg_type, _))) => {
                tracing::debug!("Refusing message 0x{:02x} after stop", msg_type);
                let (reply_type, reply) = shutdown_frame()?;
                write_message(writer, reply_type, &reply).await?;
            }
            Ok(Err(_)) | Err(_) => return Ok(()),
        }
    }
}

/// Handle one request frame and build the reply frame.
pub async fn dispatch(
    service: &RankingService,
    msg_type: u32,
    payload: &[u8],
) -> io::Result<(u32, Vec<u8>)> {
    match msg_type {
        MSG_RERANK_REQUEST => {
            let request: RankRequest = match decode_or_default(payload) {
                Ok(req) => req,
                Err(e) => return bad_request(format!("invalid ReRank payload: {e}")),
            };
            match service.rerank(request).await {
                Ok(response) => Ok((MSG_RERANK_RESPONSE, encode_json(&response)?)),
                Err(e) => error_frame(e.code(), e.to_string()),
            }
        }
        MSG_EMBEDDING_REQUEST => {
            let request: EmbeddingRequest = match decode_or_default(payload) {
                Ok(req) => req,
                Err(e) => return bad_request(format!("invalid GetEmbedding payload: {e}")),
            };
            let response = service.get_embedding(&request);
            Ok((MSG_EMBEDDING_RESPONSE, encode_json(&response)?))
        }
        MSG_PING => Ok((MSG_PONG, Vec::new())),
        other => bad_request(format!("unknown message type 0x{other:02x}")),
    }
}

/// An empty payload stands for a request with every field absent.
fn decode_or_default<T>(payload: &[u8]) -> io::Result<T>
where
    T: Default + for<'de> serde::Deserialize<'de>,
{
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    decode_json(payload)
}

fn error_frame(code: &str, message: String) -> io::Result<(u32, Vec<u8>)> {
    Ok((MSG_ERROR, encode_json(&ErrorBody::new(code, message))?))
}

fn bad_request(message: String) -> io::Result<(u32, Vec<u8>)> {
    error_frame(ErrorCode::BadRequest.as_str(), message)
}

fn shutdown_frame() -> io::Result<(u32, Vec<u8>)> {
    let err = ServiceError::Shutdown;
    error_frame(err.code(), err.to_string())
}
