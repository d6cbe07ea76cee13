//! registry-server — HTTP API for the gaming registry.
//!
//! Keeps two append-only, in-memory collections (hardware and games) and
//! exposes them over a handful of endpoints:
//! - `POST /add-hardware`, `POST /add-game`: append one JSON record.
//! - `/view-hardware`, `/view-games`: the whole collection as a JSON array.
//! - `/`: the static index file.
//!
//! Nothing is persisted; a restart starts from an empty registry.
//!
//! Run:
//! ```bash
//! # pretty logs (default), listening on :8080
//! cargo run -p registry-server
//!
//! # custom address, JSON logs
//! LOG_FORMAT=json cargo run -p registry-server -- --addr 127.0.0.1:3000
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.
//!

mod config;

use std::process;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::{header, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, post};
use axum::{Json, Router};
use clap::Parser;
use domain::adapters::memory_repo::InMemoryRegistry;
use domain::{GameRecord, HardwareRecord, RegistryRepository};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tower::util::ServiceExt;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeFile,
    trace::TraceLayer,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "registry-server", version, about = "In-memory registry of gaming hardware and games")]
struct Cli {
    /// HTTP listen address as host:port (":port" binds all interfaces). Overrides HTTP_ADDR.
    #[arg(long)]
    addr: Option<String>,
}

#[derive(Clone)]
struct AppState {
    registry: Arc<dyn RegistryRepository>,
    index: ServeFile,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env(cli.addr) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_permissive();

    let app = build_app(Arc::new(InMemoryRegistry::new()), &cfg);

    let listener = match tokio::net::TcpListener::bind(cfg.addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(addr = %cfg.addr, err = %e, "failed to bind listen address");
            process::exit(1);
        }
    };
    let addr = listener.local_addr().unwrap_or(cfg.addr);
    info!(%addr, index = %cfg.index_path.display(), "serving http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!(err = %e, "server error");
        process::exit(1);
    }
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

/// Routes plus the middleware stack: body limit, request ids, tracing, CORS.
fn build_app(registry: Arc<dyn RegistryRepository>, cfg: &config::Config) -> Router {
    let state = AppState {
        registry,
        index: ServeFile::new(&cfg.index_path),
    };
    let x_request_id = HeaderName::from_static("x-request-id");

    let body_limit = match cfg.max_body_bytes {
        Some(n) => DefaultBodyLimit::max(n),
        None => DefaultBodyLimit::disable(),
    };

    let cors = if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin.clone()]))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .route("/add-hardware", post(add_hardware).fallback(post_only))
        .route("/add-game", post(add_game).fallback(post_only))
        .route("/view-hardware", any(view_hardware))
        .route("/view-games", any(view_games))
        .route("/", any(serve_index))
        .fallback(not_found)
        .layer(body_limit)
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

/// Per-request failures. Each maps to a status and a short plain-text reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApiError {
    MethodNotAllowed,
    BodyRead,
    BodyTooLarge,
    InvalidJson,
    Storage,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, reason) = match self {
            ApiError::MethodNotAllowed => {
                return (
                    StatusCode::METHOD_NOT_ALLOWED,
                    [(header::ALLOW, "POST")],
                    "Only POST requests are allowed\n",
                )
                    .into_response()
            }
            ApiError::BodyRead => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error reading request body\n",
            ),
            ApiError::BodyTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large\n"),
            ApiError::InvalidJson => (StatusCode::BAD_REQUEST, "Error parsing JSON\n"),
            ApiError::Storage => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error\n"),
        };
        (status, reason).into_response()
    }
}

// Buffer the body and decode it as `T`. The store is only touched once this succeeds.
fn decode_record<T: DeserializeOwned>(
    kind: &'static str,
    fields: &[&str],
    body: Result<Bytes, BytesRejection>,
) -> Result<T, ApiError> {
    let bytes = body.map_err(|rejection| {
        warn!(kind, err = %rejection, "failed to read request body");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::BodyTooLarge
        } else {
            ApiError::BodyRead
        }
    })?;
    let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
        warn!(kind, err = %e, "rejected malformed record");
        ApiError::InvalidJson
    })?;
    // Derived struct decoding also takes arrays; records must be objects.
    // `null` is rejected here too: it carries no record at all.
    let Value::Object(object) = value else {
        warn!(kind, "rejected non-object record");
        return Err(ApiError::InvalidJson);
    };
    serde_json::from_value(Value::Object(fold_keys(object, fields))).map_err(|e| {
        warn!(kind, err = %e, "rejected malformed record");
        ApiError::InvalidJson
    })
}

/// Map object keys onto `fields` case-insensitively. An exact key wins over a
/// folded one; among folded candidates the first in key order is taken. Keys
/// matching no field are dropped.
fn fold_keys(mut object: Map<String, Value>, fields: &[&str]) -> Map<String, Value> {
    let mut folded = Map::new();
    for &field in fields {
        if let Some(v) = object.remove(field) {
            folded.insert(field.to_string(), v);
            continue;
        }
        let lower = field.to_lowercase();
        let key = object.keys().find(|k| k.to_lowercase() == lower).cloned();
        if let Some(v) = key.and_then(|k| object.remove(&k)) {
            folded.insert(field.to_string(), v);
        }
    }
    folded
}

async fn add_hardware(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let record: HardwareRecord = decode_record("hardware", HardwareRecord::FIELDS, body)?;
    debug!(category = %record.category, name = %record.name, "adding hardware");
    let total = state.registry.add_hardware(record).map_err(|e| {
        error!(err = ?e, "add hardware failed");
        ApiError::Storage
    })?;
    info!(total, "hardware added");
    Ok((StatusCode::CREATED, "Hardware added successfully\n"))
}

async fn add_game(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let record: GameRecord = decode_record("game", GameRecord::FIELDS, body)?;
    debug!(title = %record.title, "adding game");
    let total = state.registry.add_game(record).map_err(|e| {
        error!(err = ?e, "add game failed");
        ApiError::Storage
    })?;
    info!(total, "game added");
    Ok((StatusCode::CREATED, "Game added successfully\n"))
}

async fn post_only(method: Method) -> ApiError {
    warn!(%method, "write endpoint called with wrong method");
    ApiError::MethodNotAllowed
}

// The view endpoints accept any method, like the service always has.
async fn view_hardware(
    State(state): State<AppState>,
) -> Result<Json<Vec<HardwareRecord>>, ApiError> {
    let items = state.registry.list_hardware().map_err(|e| {
        error!(err = ?e, "list hardware failed");
        ApiError::Storage
    })?;
    Ok(Json(items))
}

async fn view_games(State(state): State<AppState>) -> Result<Json<Vec<GameRecord>>, ApiError> {
    let items = state.registry.list_games().map_err(|e| {
        error!(err = ?e, "list games failed");
        ApiError::Storage
    })?;
    Ok(Json(items))
}

// Any method gets the file; HEAD stays HEAD so no body is sent.
async fn serve_index(State(state): State<AppState>, mut req: Request) -> Response {
    if req.method() != Method::HEAD {
        *req.method_mut() = Method::GET;
    }
    match state.index.oneshot(req).await {
        Ok(resp) => resp.into_response(),
        Err(never) => match never {},
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "404 page not found\n")
}
