//! # pdf2eps
//!
//! Convert every page of a PDF into an Encapsulated PostScript (EPS) file.
//!
//! Each page is rasterised with pdfium at a fixed DPI and wrapped in a
//! single-page EPS whose bounding box matches the page's physical size. A
//! one-page document yields one `.eps`; longer documents yield a ZIP with one
//! EPS per page, in page order.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ 1. Input    require a .pdf name, derive a safe base name
//!  ├─ 2. Render   open with pdfium, rasterise each page to RGB (spawn_blocking)
//!  ├─ 3. Encode   RGB → EPS (hex colorimage or Flate/ASCII85)
//!  └─ 4. Package  one EPS as-is, several in a deterministic ZIP
//! ```
//!
//! Conversion is all-or-nothing: the first failing page aborts the request
//! and nothing partial is returned.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2eps::{convert_upload, engine, ConversionConfig, Upload};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rasterizer = Arc::new(engine::pdfium_rasterizer()?);
//!     let bytes = std::fs::read("report.pdf")?;
//!     let output = convert_upload(
//!         rasterizer,
//!         Upload::new("report.pdf", bytes),
//!         ConversionConfig::default(),
//!     )
//!     .await?;
//!     std::fs::write(&output.payload.filename, &output.payload.data)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Serving over HTTP
//!
//! [`router`] builds the axum application (`GET /`, `POST /convert`,
//! `GET /health`); [`serve`] binds it and runs until Ctrl+C or SIGTERM.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2eps` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, EpsEncoding, ServerConfig, ServerConfigBuilder,
};
pub use convert::{convert_blocking, convert_to_dir, convert_upload};
pub use error::Pdf2EpsError;
pub use output::{ConversionOutput, ConversionStats, EpsPage, Payload, PayloadKind};
pub use pipeline::input::Upload;
pub use pipeline::render::{PageRaster, PdfiumRasterizer, RasterDocument, Rasterizer};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use server::{router, serve, AppState};
