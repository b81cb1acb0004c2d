//! # Seqgen Server
//!
//! HTTP front end for the sequence engine.
//!
//! This crate provides:
//! - `GET /sequence/<key>`: next value of a key
//! - `PUT /sequence/<key>`: register a key with a starting value
//! - `/ping/` and `/stat/` for liveness and request statistics
//!
//! The engine is injected at construction; engine calls run on the blocking
//! thread pool, each bounded by the request timeout.

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod response;
mod server;
mod stats;

pub use config::{parse_bind_addr, ServerConfig, DEFAULT_REQUEST_TIMEOUT};
pub use error::{ServerError, ServerResult};
pub use handler::{blocking, parse_value, sequence_key, AppState};
pub use response::{SequenceResponse, StatResponse};
pub use server::{create_router, SequenceServer};
pub use stats::Stats;

/// Tracing target of per-request log events.
pub const ACCESS_LOG_TARGET: &str = "seqgen_server::access";
