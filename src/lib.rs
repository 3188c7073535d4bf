//! # rerank-service
//!
//! A re-ranking service: given a query and a shortlist of candidate
//! documents from upstream retrieval, it scores every candidate and returns
//! them ordered by descending relevance.
//!
//! ## Architecture
//!
//! ```text
//!        ┌──────────────────────────┐
//!        │  RPC client (framed TCP) │
//!        └────────────┬─────────────┘
//!                     │ ReRank / GetEmbedding
//!                     ▼
//!        ┌──────────────────────────┐
//!        │      RankingService      │
//!        │  worker pool (semaphore) │
//!        │   metrics (Prometheus)   │
//!        └────────────┬─────────────┘
//!                     │ query, candidates
//!                     ▼
//!        ┌──────────────────────────┐
//!        │          Ranker          │
//!        │ one batched scorer call, │
//!        │ stable sort, descending  │
//!        └────────────┬─────────────┘
//!                     │
//!          ┌──────────┴───────────┐
//!          ▼                      ▼
//!  ┌───────────────┐     ┌─────────────────┐
//!  │    Lexical    │     │  Neural (pairs) │
//!  │ word overlap  │     │ cross-encoder,  │
//!  │               │     │ 1000-char cap   │
//!  └───────────────┘     └─────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for the listener, worker pool and scorer
//! - [`models`] - Request/response types: `RankRequest`, `CandidateDocument`, `RankedDocument`, ...
//! - [`error`] - Scoring and service error taxonomy
//! - [`scoring`] - The `Scorer` capability with lexical and cross-encoder implementations
//! - [`ranker`] - Scores candidates once and stably sorts them by descending score
//! - [`service`] - `RankingService`: lifecycle state, worker pool, failure isolation
//! - [`rpc`] - Binary framed protocol, TCP server and client
//! - [`telemetry`] - Request, failure, candidate and latency metrics via the `metrics` facade
//! - [`admin`] - Optional HTTP health and Prometheus `/metrics` endpoints

pub mod admin;
pub mod config;
pub mod error;
pub mod models;
pub mod ranker;
pub mod rpc;
pub mod scoring;
pub mod service;
pub mod telemetry;
