use axum::{
    body::HttpBody,
    extract::{ConnectInfo, Path, RawQuery, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use std::path::{Component, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use rtstatus_common::{ErrorResponse, Limits, RtStatusError, Settings, WorkerState, STATUS_PATH};
use tracing::{debug, info, warn};

pub mod aggregate;
pub mod config;
pub mod listen_file;
pub mod report;
pub mod slot;
pub mod table;
pub mod window;
pub mod workers;

use aggregate::AggregatedStats;
use report::ReportContext;
use table::SlotTable;
use workers::{RequestInfo, WorkerBoard, WorkerPool};

/// Abstraction over current time for testability.
pub trait Clock: Send + Sync {
    /// Wall-clock milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;

    /// Milliseconds on a clock that never goes backwards. Only differences
    /// between two readings mean anything.
    fn monotonic_millis(&self) -> u64;
}

/// Production clock: `SystemTime` for timestamps, `Instant` for durations.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn monotonic_millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Facts about the running host shown in the report header.
#[derive(Debug, Clone)]
pub struct HostInfo {
    pub document_root: PathBuf,
    pub listen: String,
    pub started_at_ms: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub table: Arc<SlotTable>,
    pub board: Arc<WorkerBoard>,
    pub pool: Arc<WorkerPool>,
    pub clock: Arc<dyn Clock>,
    pub host: Arc<HostInfo>,
}

impl AppState {
    pub fn new(limits: Limits, clock: Arc<dyn Clock>, host: HostInfo) -> Self {
        let table = Arc::new(SlotTable::new(limits));
        let board = Arc::new(WorkerBoard::new(limits));
        let pool = Arc::new(WorkerPool::new(Arc::clone(&table), Arc::clone(&board)));
        Self { table, board, pool, clock, host: Arc::new(host) }
    }

    /// Aggregates every slot of the table.
    pub fn snapshot(&self) -> AggregatedStats {
        aggregate::snapshot(&self.table, self.board.as_ref())
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: SocketAddr,
    pub limits: Limits,
    pub document_root: PathBuf,
    pub listen_file: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, RtStatusError> {
        let address = settings.listen_addr.parse().map_err(|_| {
            RtStatusError::InvalidSettings(format!("bad listen_addr {:?}", settings.listen_addr))
        })?;
        Ok(Self {
            address,
            limits: settings.limits()?,
            document_root: settings.document_root.clone(),
            listen_file: settings.listen_file.clone(),
        })
    }
}

/// RtStatus Server
pub struct Server {
    config: ServerConfig,
}

impl Server {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Get the server's configured address
    pub fn address(&self) -> SocketAddr {
        self.config.address
    }

    /// Mount the status report next to `app` and wrap every route, the
    /// report included, with the completion hook.
    pub fn create_router(state: AppState, app: Router<AppState>) -> Router {
        app.route(STATUS_PATH, get(handle_status))
            .layer(middleware::from_fn_with_state(state.clone(), record_completion))
            .with_state(state)
    }

    /// Application serving files from the document root.
    pub fn static_files() -> Router<AppState> {
        Router::new()
            .route("/", get(handle_index))
            .route("/*path", get(handle_static))
    }

    /// Run the server, signalling `ready_tx` with the bound address once accepting connections
    pub async fn run(self, ready_tx: tokio::sync::oneshot::Sender<SocketAddr>) -> Result<(), Box<dyn std::error::Error>> {
        let listener = tokio::net::TcpListener::bind(self.config.address).await?;
        let local_addr = listener.local_addr()?;

        if let Some(path) = &self.config.listen_file {
            listen_file::write(path, &self.config.document_root, local_addr)?;
        }

        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        let host = HostInfo {
            document_root: self.config.document_root.clone(),
            listen: local_addr.to_string(),
            started_at_ms: clock.now_millis(),
        };
        let state = AppState::new(self.config.limits, clock, host);
        let app = Self::create_router(state, Self::static_files());

        info!(
            %local_addr,
            server_limit = self.config.limits.server_limit,
            thread_limit = self.config.limits.thread_limit,
            "listening"
        );
        ready_tx.send(local_addr).ok();
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
        Ok(())
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: message.into() })).into_response()
}

fn text_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
}

/// Bytes the response will put on the wire, as far as the body knows.
fn response_bytes(response: &Response) -> u64 {
    if let Some(exact) = response.body().size_hint().exact() {
        return exact;
    }
    response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Peer, request line and virtual host of `request`.
fn request_info(request: &Request) -> RequestInfo {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(peer)| peer.ip().to_string())
        .unwrap_or_default();
    let vhost = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    RequestInfo {
        client,
        request: format!("{} {} {:?}", request.method(), request.uri(), request.version()),
        vhost,
    }
}

/// Completion hook: every request runs inside a slot lease and is recorded
/// into that slot once the handler has produced its response.
///
/// Elapsed time comes from the monotonic clock; the wall clock only stamps
/// the window and the slot's last use.
pub async fn record_completion(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(lease) = state.pool.claim() else {
        warn!(slots = state.table.len(), "no free worker slot, rejecting request");
        return error_response(StatusCode::SERVICE_UNAVAILABLE, "No free worker slot");
    };
    let started_ms = state.clock.monotonic_millis();
    lease.begin(request_info(&request), started_ms);

    let response = next.run(request).await;

    lease.set_state(WorkerState::BusyWrite);
    let elapsed_ms = state.clock.monotonic_millis().saturating_sub(started_ms) as i64;
    let now_ms = state.clock.now_millis();
    lease.record(response.status().as_u16(), response_bytes(&response), elapsed_ms, now_ms);
    response
}

/// Handler for GET /server-status-text: full report, or the single value
/// named by the query string (case-insensitive).
pub async fn handle_status(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let stats = state.snapshot();
    let ctx = ReportContext {
        document_root: &state.host.document_root,
        listen: &state.host.listen,
        limits: state.table.limits(),
        started_at_ms: state.host.started_at_ms,
        now_ms: state.clock.now_millis(),
        monotonic_ms: state.clock.monotonic_millis(),
    };
    let rendered = report::render(&ctx, &stats, &state.table, state.board.as_ref());

    match query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        None => text_response(rendered.render()),
        Some(name) => match rendered.get(name) {
            Some(value) => {
                debug!(attribute = name, "single attribute requested");
                text_response(format!("{value}\n"))
            }
            None => error_response(
                StatusCode::NOT_FOUND,
                RtStatusError::UnknownAttribute(name.to_string()).to_string(),
            ),
        },
    }
}

/// Handler for GET /: serves `index.html` from the document root.
pub async fn handle_index(state: State<AppState>) -> Response {
    handle_static(state, Path("index.html".to_string())).await
}

/// Handler for GET /*path: serves a file below the document root.
pub async fn handle_static(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    let relative = PathBuf::from(&path);
    if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
        return error_response(StatusCode::FORBIDDEN, format!("Forbidden: {path}"));
    }

    let full = state.host.document_root.join(relative);
    match tokio::fs::read(&full).await {
        Ok(contents) => contents.into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            error_response(StatusCode::NOT_FOUND, format!("File not found: {path}"))
        }
        Err(e) => {
            debug!(path = %full.display(), error = %e, "cannot serve file");
            error_response(StatusCode::FORBIDDEN, format!("Forbidden: {path}"))
        }
    }
}
