//! Error types for the pdf2eps library.
//!
//! Every failure is fatal for the request that hit it: conversion is
//! all-or-nothing, so there is no per-page error type. [`Pdf2EpsError`]
//! falls into two groups:
//!
//! * **Input errors**: the upload is missing, misnamed, not a PDF, locked or
//!   empty. The caller can fix these; they map to HTTP 400 (or 413 for an
//!   oversized body).
//!
//! * **Processing errors**: rasterisation, encoding or packaging failed, or
//!   the engine could not be reached. These are server faults and map to
//!   HTTP 500 with a generic message.
//!
//! `Display` carries the developer-facing detail that goes to the logs.
//! [`Pdf2EpsError::user_message`] is the Spanish text returned to the
//! browser; it never contains internal detail.

use axum::http::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2eps library.
#[derive(Debug, Error)]
pub enum Pdf2EpsError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No `pdf_file` part was sent, or it carried an empty filename.
    #[error("No PDF file was attached to the request")]
    MissingFile,

    /// The uploaded filename does not end in `.pdf`.
    #[error("Uploaded file '{filename}' does not have a .pdf extension")]
    NotPdfExtension { filename: String },

    /// The multipart body could not be read.
    #[error("Failed to read upload: {detail}")]
    UnreadableUpload { detail: String },

    /// The request body is larger than the configured ceiling.
    #[error("Upload exceeds the {limit_bytes} byte limit")]
    UploadTooLarge { limit_bytes: usize },

    /// The bytes could not be opened as a PDF.
    #[error("PDF is corrupt or invalid: {detail}")]
    CorruptPdf { detail: String },

    /// PDF requires a password; uploads cannot carry one.
    #[error("PDF is encrypted and requires a password")]
    PasswordRequired,

    /// The document opened but has no pages.
    #[error("PDF contains no pages")]
    NoPages,

    /// A local input path could not be read (CLI only).
    #[error("Failed to read '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Processing errors ─────────────────────────────────────────────────
    /// pdfium returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The EPS encoder rejected a rendered page.
    #[error("EPS encoding failed for page {page}: {detail}")]
    EncodingFailed { page: usize, detail: String },

    /// Building the ZIP archive failed.
    #[error("Failed to build ZIP archive: {0}")]
    ArchiveFailed(String),

    /// Could not create or write an output file (CLI only).
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or its directory).\n\
  • Place libpdfium next to the pdf2eps executable.\n\
  • Install pdfium system-wide so the dynamic loader can find it.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2EpsError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFile
            | Self::NotPdfExtension { .. }
            | Self::UnreadableUpload { .. }
            | Self::CorruptPdf { .. }
            | Self::PasswordRequired
            | Self::NoPages => StatusCode::BAD_REQUEST,
            Self::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InputReadFailed { .. }
            | Self::RasterisationFailed { .. }
            | Self::EncodingFailed { .. }
            | Self::ArchiveFailed(_)
            | Self::OutputWriteFailed { .. }
            | Self::InvalidConfig(_)
            | Self::PdfiumBindingFailed(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `true` for errors the uploader can fix by sending a different file.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Message shown to the person who uploaded the file.
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingFile => "No se recibió un archivo PDF.".into(),
            Self::NotPdfExtension { .. } => "El archivo debe tener extensión .pdf.".into(),
            Self::UnreadableUpload { .. } => "No se pudo leer el archivo enviado.".into(),
            Self::UploadTooLarge { limit_bytes } => format!(
                "El archivo supera el tamaño máximo permitido ({} MB).",
                limit_bytes / (1024 * 1024)
            ),
            Self::CorruptPdf { .. } => "El PDF parece estar dañado o no es válido.".into(),
            Self::PasswordRequired => "El PDF está protegido con contraseña.".into(),
            Self::NoPages => "El PDF no contiene páginas.".into(),
            _ => "Ocurrió un error al convertir el PDF a EPS.".into(),
        }
    }
}
