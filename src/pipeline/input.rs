//! Input validation: accept an uploaded file and derive the output base name.
//!
//! Browsers send the bare filename, but other clients may send a full
//! Windows or POSIX path, and names arrive in any script. Every artefact this
//! crate produces is named `{base}_page_{n}.eps` or `{base}_eps.zip`, so the
//! base must be safe to place in a `Content-Disposition` header and on any
//! filesystem: only `[A-Za-z0-9._-]` survive.

use crate::error::Pdf2EpsError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::debug;

/// An uploaded document: raw bytes plus the client-supplied filename.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// Check that a filename was supplied and that it names a PDF.
///
/// `None` and `""` both count as "no file attached".
pub fn validate_filename(filename: Option<&str>) -> Result<&str, Pdf2EpsError> {
    let name = match filename {
        Some(n) if !n.is_empty() => n,
        _ => return Err(Pdf2EpsError::MissingFile),
    };

    if !name.to_ascii_lowercase().ends_with(".pdf") {
        return Err(Pdf2EpsError::NotPdfExtension {
            filename: name.to_string(),
        });
    }

    Ok(name)
}

static RE_UNSAFE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

/// Derive the sanitised base name used for every output of a request.
///
/// Directory components are dropped (`/` and `\` separators), the last
/// extension is removed, and each run of characters outside
/// `[A-Za-z0-9._-]` becomes a single `_`. An empty result falls back to
/// `fallback`.
pub fn base_name(filename: &str, fallback: &str) -> String {
    let leaf = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let stem = Path::new(leaf)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");

    let sanitised = RE_UNSAFE_RUN.replace_all(stem, "_");
    let base = if sanitised.is_empty() {
        fallback.to_string()
    } else {
        sanitised.into_owned()
    };

    debug!("Base name for {:?} → {:?}", filename, base);
    base
}

/// Output filename for a 1-indexed page.
pub fn page_filename(base: &str, page_num: usize) -> String {
    format!("{base}_page_{page_num}.eps")
}

/// Output filename for the multi-page archive.
pub fn archive_filename(base: &str) -> String {
    format!("{base}_eps.zip")
}
