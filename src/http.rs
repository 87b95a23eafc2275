//! HTTP surface for the netskel daemon.
//!
//! Every response is plain text and uncacheable. Rejected or missing input
//! yields an empty 404, server-side failures an empty 500; error details only
//! go to the logs.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::io::Read;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::io::ReaderStream;
use tracing::{error, info};

use crate::encoding::Encoding;
use crate::error::NetskelError;
use crate::service::{FileBody, Netskel};

const NO_CACHE: &str = "no-store, no-cache, must-revalidate, max-age=0";

pub struct AppState {
    pub netskel: Netskel,
    /// Reported in the manifest header when the request carries no Host
    pub server_name: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/getclient", get(get_client))
        .route("/getclient.php", get(get_client))
        .route("/netskeldb", get(get_manifest))
        .route("/netskeldb.php", get(get_manifest))
        .route("/sendfile", get(get_file))
        .route("/sendfile.php", get(get_file))
        .route("/healthz", get(health))
        .with_state(state)
}

/// Serve until Ctrl-C or SIGTERM.
pub async fn serve(bind: &str, state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    info!(
        "netskel daemon listening on {} root={}",
        bind,
        state.netskel.root().display()
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("netskel daemon shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received SIGTERM signal"),
    }
}

/// Only the expected fields are extracted; anything else in the query is ignored.
#[derive(Debug, Deserialize)]
struct UserQuery {
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileQuery {
    user: Option<String>,
    file: Option<String>,
    #[serde(default)]
    encoding: Encoding,
}

fn text(status: StatusCode, body: Body) -> Response {
    (
        status,
        [
            (header::CACHE_CONTROL, NO_CACHE),
            (header::PRAGMA, "no-cache"),
            (header::CONTENT_TYPE, "text/plain"),
        ],
        body,
    )
        .into_response()
}

fn failure(err: &NetskelError) -> Response {
    let status = if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    text(status, Body::empty())
}

/// Run blocking filesystem work off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, NetskelError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, NetskelError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| NetskelError::Io(std::io::Error::other(e)))?
}

async fn health() -> Response {
    text(StatusCode::OK, Body::from("ok\n"))
}

async fn get_client(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Response {
    let Ok(Query(q)) = query else {
        return failure(&NetskelError::InvalidIdentifier);
    };
    let user = q.user.unwrap_or_default();
    match blocking(move || state.netskel.bootstrap_script(&user)).await {
        Ok(script) => text(StatusCode::OK, Body::from(script)),
        Err(e) => failure(&e),
    }
}

async fn get_manifest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> Response {
    let Ok(Query(q)) = query else {
        return failure(&NetskelError::InvalidIdentifier);
    };
    let user = q.user.unwrap_or_default();
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| state.server_name.clone());

    match blocking(move || state.netskel.manifest(&user, &host, Utc::now())).await {
        Ok(manifest) => text(StatusCode::OK, Body::from(manifest.into_string())),
        Err(e) => failure(&e),
    }
}

enum Payload {
    Bytes(Vec<u8>),
    Stream(std::fs::File, u64),
}

async fn get_file(
    State(state): State<Arc<AppState>>,
    query: Result<Query<FileQuery>, QueryRejection>,
) -> Response {
    let Ok(Query(q)) = query else {
        return failure(&NetskelError::InvalidPath);
    };
    let user = q.user.unwrap_or_default();
    let file = q.file.unwrap_or_default();
    let encoding = q.encoding;

    let payload = blocking(move || {
        Ok(match state.netskel.file(&user, &file)? {
            FileBody::Script(bytes) => Payload::Bytes(encoding.encode(&bytes)),
            FileBody::File { file, len } if encoding.is_raw() => Payload::Stream(file, len),
            FileBody::File { mut file, len } => {
                let mut data = Vec::with_capacity(len as usize);
                file.read_to_end(&mut data)?;
                Payload::Bytes(encoding.encode(&data))
            }
        })
    })
    .await;

    match payload {
        Ok(Payload::Bytes(bytes)) => text(StatusCode::OK, Body::from(bytes)),
        Ok(Payload::Stream(file, len)) => {
            let stream = ReaderStream::new(tokio::fs::File::from_std(file));
            let mut response = text(StatusCode::OK, Body::from_stream(stream));
            response
                .headers_mut()
                .insert(header::CONTENT_LENGTH, header::HeaderValue::from(len));
            response
        }
        Err(e) => failure(&e),
    }
}
