//! Request handlers.

use crate::error::{ServerError, ServerResult};
use crate::response::{SequenceResponse, StatResponse};
use crate::stats::Stats;
use crate::ACCESS_LOG_TARGET;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode, Uri};
use axum::Json;
use percent_encoding::percent_decode_str;
use seqgen_core::{CoreResult, SequenceEngine};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

/// Shared state of every handler.
pub struct AppState {
    engine: Arc<SequenceEngine>,
    stats: Stats,
    request_timeout: Duration,
}

impl AppState {
    /// Creates handler state around a started engine.
    pub fn new(engine: Arc<SequenceEngine>, request_timeout: Duration) -> Self {
        Self {
            engine,
            stats: Stats::new(),
            request_timeout,
        }
    }

    /// Returns the engine.
    pub fn engine(&self) -> &Arc<SequenceEngine> {
        &self.engine
    }

    /// Returns the request statistics.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

type SequenceReply = (StatusCode, Json<SequenceResponse>);

/// `/ping/`
pub async fn ping(State(state): State<Arc<AppState>>) -> &'static str {
    state.stats.record("ping");
    "pong"
}

/// `/stat/`
pub async fn stat(State(state): State<Arc<AppState>>) -> ServerResult<Json<StatResponse>> {
    let engine = Arc::clone(&state.engine);
    let len = blocking(state.request_timeout, move || Ok(engine.len())).await?;
    let num_workers = tokio::runtime::Handle::current().metrics().num_workers();

    Ok(Json(state.stats.report(len, num_workers)))
}

/// `/sequence/<key>`
pub async fn sequence(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    method: Method,
    body: Bytes,
) -> ServerResult<SequenceReply> {
    sequence_request(&state, &method, &key, &body).await
}

/// Every path without a route of its own.
///
/// Sequence paths the `/sequence/<key>` route does not match (no key, a
/// trailing slash, extra segments) are answered here.
pub async fn fallback(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> ServerResult<SequenceReply> {
    match sequence_key(uri.path()) {
        Some(key) => sequence_request(&state, &method, &key?, &body).await,
        None => Err(ServerError::NotFound),
    }
}

async fn sequence_request(
    state: &AppState,
    method: &Method,
    key: &str,
    body: &[u8],
) -> ServerResult<SequenceReply> {
    match *method {
        Method::GET => {
            state.stats.record("get");

            let engine = Arc::clone(&state.engine);
            let owned = key.to_string();
            let value = blocking(state.request_timeout, move || engine.get(&owned)).await?;

            tracing::debug!(target: ACCESS_LOG_TARGET, key, value, "get");
            Ok((StatusCode::OK, Json(SequenceResponse::value(key, value))))
        }
        Method::PUT => {
            state.stats.record("add");
            let value = parse_value(body)?;

            let engine = Arc::clone(&state.engine);
            let owned = key.to_string();
            blocking(state.request_timeout, move || engine.add(&owned, value)).await?;

            tracing::debug!(target: ACCESS_LOG_TARGET, key, value, "add");
            Ok((StatusCode::CREATED, Json(SequenceResponse::value(key, value))))
        }
        _ => Err(ServerError::MethodNotAllowed),
    }
}

/// Extracts the percent-decoded key from a `/sequence/...` path.
///
/// Decodes the same way the `/sequence/<key>` route does, so a key names
/// one counter with or without a trailing slash. Returns `None` for paths
/// outside `/sequence/`.
pub fn sequence_key(path: &str) -> Option<ServerResult<Cow<'_, str>>> {
    let mut parts = path.trim_matches('/').split('/');
    if parts.next() != Some("sequence") {
        return None;
    }

    Some(match (parts.next(), parts.next()) {
        (None, _) => Err(ServerError::InvalidRequest("missing key".into())),
        (Some(key), None) => percent_decode_str(key)
            .decode_utf8()
            .map_err(|_| ServerError::InvalidRequest(format!("invalid key {key:?}: not UTF-8"))),
        (Some(_), Some(_)) => Err(ServerError::InvalidRequest("too many parameters".into())),
    })
}

/// Parses a request body holding an unsigned decimal.
pub fn parse_value(body: &[u8]) -> ServerResult<u64> {
    let invalid = || {
        ServerError::InvalidRequest(format!(
            "invalid value {:?}: expected an unsigned decimal",
            String::from_utf8_lossy(body)
        ))
    };

    if body.is_empty() || !body.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    std::str::from_utf8(body)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or_else(invalid)
}

/// Runs an engine call on the blocking pool, bounded by `timeout`.
///
/// A panic inside `op` becomes an internal error; the process keeps
/// serving. On timeout the call still runs to completion in the background.
pub async fn blocking<T, F>(timeout: Duration, op: F) -> ServerResult<T>
where
    F: FnOnce() -> CoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::task::spawn_blocking(op);

    match tokio::time::timeout(timeout, task).await {
        Err(_) => Err(ServerError::Timeout),
        Ok(Err(err)) if err.is_panic() => {
            tracing::error!(target: ACCESS_LOG_TARGET, "panic while serving request");
            Err(ServerError::Internal("request handler panicked".into()))
        }
        Ok(Err(err)) => Err(ServerError::Internal(err.to_string())),
        Ok(Ok(result)) => result.map_err(ServerError::from),
    }
}
