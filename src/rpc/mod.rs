//! Binary RPC surface: framing, server and client.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::RankingClient;
pub use protocol::{ErrorCode, RpcError};
pub use server::RpcServer;
