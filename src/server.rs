//! HTTP front end: upload page, conversion endpoint and health check.
//!
//! | Route | Method | Response |
//! |-------|--------|----------|
//! | `/` | GET | HTML upload form |
//! | `/convert` | POST | EPS or ZIP download, or `{"error": ...}` |
//! | `/health` | GET | `{"status": "healthy", "version": ...}` |
//!
//! The handler only moves bytes in and out; the conversion itself runs in
//! [`crate::convert::convert_upload`] on the blocking pool.

use crate::config::ServerConfig;
use crate::convert::convert_upload;
use crate::error::Pdf2EpsError;
use crate::output::Payload;
use crate::pipeline::input::{self, Upload};
use crate::pipeline::render::Rasterizer;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Multipart field carrying the PDF.
pub const PDF_FIELD: &str = "pdf_file";

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub rasterizer: Arc<dyn Rasterizer>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(rasterizer: Arc<dyn Rasterizer>, config: ServerConfig) -> Self {
        Self {
            rasterizer,
            config: Arc::new(config),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/convert", post(convert))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the listener and serve until Ctrl+C or SIGTERM.
pub async fn serve(config: ServerConfig, rasterizer: Arc<dyn Rasterizer>) -> Result<(), Pdf2EpsError> {
    let addr = config.bind;
    info!(
        "Starting pdf2eps server on {} (dpi {}, encoding {}, upload limit {} bytes)",
        addr, config.conversion.dpi, config.conversion.encoding, config.max_upload_bytes
    );

    let app = router(AppState::new(rasterizer, config));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Pdf2EpsError::Internal(format!("Failed to bind {}: {}", addr, e)))?;

    info!("Listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Pdf2EpsError::Internal(format!("Server error: {}", e)))?;

    info!("Server shutdown complete");
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn convert(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, Pdf2EpsError> {
    let mut multipart = multipart.map_err(|e| {
        debug!("Request is not a readable multipart form: {}", e);
        Pdf2EpsError::MissingFile
    })?;

    let upload = read_pdf_field(&mut multipart, state.config.max_upload_bytes).await?;
    let output = convert_upload(
        Arc::clone(&state.rasterizer),
        upload,
        state.config.conversion.clone(),
    )
    .await?;

    Ok(payload_response(output.payload))
}

/// Pull the `pdf_file` part out of the form.
///
/// The filename is checked before the body is read, so a misnamed upload is
/// rejected without buffering it.
async fn read_pdf_field(multipart: &mut Multipart, limit: usize) -> Result<Upload, Pdf2EpsError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(PDF_FIELD) {
            continue;
        }

        let filename = input::validate_filename(field.file_name())?.to_string();
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        debug!("Received {} ({} bytes)", filename, bytes.len());
        return Ok(Upload::new(filename, bytes.to_vec()));
    }

    Err(Pdf2EpsError::MissingFile)
}

fn multipart_error(e: MultipartError, limit: usize) -> Pdf2EpsError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Pdf2EpsError::UploadTooLarge { limit_bytes: limit }
    } else {
        Pdf2EpsError::UnreadableUpload {
            detail: e.body_text(),
        }
    }
}

fn payload_response(payload: Payload) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", payload.filename);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, payload.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        payload.data,
    )
        .into_response()
}

// ── Error responses ──────────────────────────────────────────────────────

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for Pdf2EpsError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_client_error() {
            warn!("Rejected upload ({}): {}", status.as_u16(), self);
        } else {
            error!("Conversion failed ({}): {}", status.as_u16(), self);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.user_message(),
            }),
        )
            .into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
