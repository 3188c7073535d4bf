use tokio::net::{TcpStream, ToSocketAddrs};

use super::protocol::*;
use crate::models::{EmbeddingRequest, EmbeddingResponse, RankRequest, RankResponse};

/// Client for the ranking RPC surface. Calls on one client run one at a time;
/// open several clients for parallel calls.
pub struct RankingClient {
    stream: TcpStream,
}

impl RankingClient {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, RpcError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }

    pub async fn rerank(&mut self, request: &RankRequest) -> Result<RankResponse, RpcError> {
        let (msg_type, reply) = self
            .send_raw(MSG_RERANK_REQUEST, &encode_json(request)?)
            .await?;
        decode_reply(MSG_RERANK_RESPONSE, msg_type, &reply)
    }

    pub async fn get_embedding(&mut self, text: &str) -> Result<EmbeddingResponse, RpcError> {
        let request = EmbeddingRequest {
            text: text.to_string(),
        };
        let (msg_type, reply) = self
            .send_raw(MSG_EMBEDDING_REQUEST, &encode_json(&request)?)
            .await?;
        decode_reply(MSG_EMBEDDING_RESPONSE, msg_type, &reply)
    }

    pub async fn ping(&mut self) -> Result<(), RpcError> {
        let (msg_type, reply) = self.send_raw(MSG_PING, b"").await?;
        check_reply(MSG_PONG, msg_type, &reply)
    }

    /// Send a raw frame and return the raw reply frame.
    pub async fn send_raw(
        &mut self,
        msg_type: u32,
        payload: &[u8],
    ) -> Result<(u32, Vec<u8>), RpcError> {
        write_message(&mut self.stream, msg_type, payload).await?;
        Ok(read_message(&mut self.stream).await?)
    }
}
