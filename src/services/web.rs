//! Axum-based diagnostic server for desktop builds.
//!
//! Provides:
//! - GET `/id` - Application identifier (text/plain)
//! - POST `/update` - 501, firmware upload only exists on hardware
//!
//! Every other request goes through [`crate::diagnostics::respond`], the
//! same handler the ESP32 server uses.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use axum::{
    body::Body,
    extract::State,
    http::{header, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use log::{debug, info};

use crate::config::WebConfig;
use crate::diagnostics::{respond, DiagnosticsError, FIRMWARE_UPDATE_PATH};
use crate::traits::{DiagnosticResponder, HttpMethod, HttpRequest, HttpResponse};

// ============================================================================
// Shared State
// ============================================================================

/// State shared by the route handlers.
#[derive(Debug)]
pub struct DiagnosticState {
    app_id: String,
    requests: AtomicU64,
}

impl DiagnosticState {
    /// State answering `/id` with `app_id`.
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            requests: AtomicU64::new(0),
        }
    }

    /// The identifier served on `/id`.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Requests answered so far.
    pub fn requests_served(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    fn count(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

fn into_axum(response: HttpResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, response.content_type)], response.body).into_response()
}

fn method_of(method: &Method) -> HttpMethod {
    HttpMethod::from_name(method.as_str())
}

/// Everything not routed explicitly.
async fn diagnostics(State(state): State<Arc<DiagnosticState>>, request: Request<Body>) -> Response {
    state.count();
    let req = HttpRequest::new(method_of(request.method()), request.uri().path());
    debug!("diagnostic request {:?} {}", req.method, req.path);
    into_axum(respond(&req, state.app_id()))
}

/// POST /update
async fn firmware_update(State(state): State<Arc<DiagnosticState>>) -> Response {
    state.count();
    into_axum(HttpResponse::text(501, "firmware update not supported on this platform"))
}

// ============================================================================
// Server Builder
// ============================================================================

/// Build the Axum router for the diagnostic endpoint
pub fn build_router(state: Arc<DiagnosticState>) -> Router {
    Router::new()
        .route(FIRMWARE_UPDATE_PATH, post(firmware_update))
        .fallback(diagnostics)
        .with_state(state)
}

/// Diagnostic server running on its own thread and tokio runtime.
///
/// The control loop stays single-threaded and synchronous; `service` only
/// checks that the server is still alive.
pub struct WebDiagnostics {
    state: Arc<DiagnosticState>,
    addr: SocketAddr,
    handle: JoinHandle<std::io::Result<()>>,
}

impl WebDiagnostics {
    /// Bind and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be bound or the server thread
    /// cannot be spawned.
    pub fn start(config: &WebConfig, app_id: &str) -> anyhow::Result<Self> {
        let listener = std::net::TcpListener::bind(("0.0.0.0", config.port))?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let state = Arc::new(DiagnosticState::new(app_id));
        let router = build_router(Arc::clone(&state));

        let handle = thread::Builder::new()
            .name("diagnostics".into())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(1)
                    .enable_all()
                    .build()?;
                runtime.block_on(async move {
                    let listener = tokio::net::TcpListener::from_std(listener)?;
                    axum::serve(listener, router).await
                })
            })?;

        info!("diagnostic server listening on http://{}", addr);
        Ok(Self {
            state,
            addr,
            handle,
        })
    }

    /// Bound address (useful when configured with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Handler state.
    pub fn state(&self) -> &DiagnosticState {
        &self.state
    }
}

impl DiagnosticResponder for WebDiagnostics {
    type Error = DiagnosticsError;

    fn service(&mut self) -> Result<(), DiagnosticsError> {
        if self.handle.is_finished() {
            return Err(DiagnosticsError::ServerStopped);
        }
        Ok(())
    }
}
