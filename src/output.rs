//! Output types produced by a conversion.

use serde::Serialize;

/// One converted page: its output filename and EPS bytes.
#[derive(Debug, Clone)]
pub struct EpsPage {
    /// 1-indexed page number.
    pub page_num: usize,
    /// `{base}_page_{page_num}.eps`
    pub filename: String,
    pub data: Vec<u8>,
}

/// Whether the payload is a bare EPS or an archive of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Eps,
    Zip,
}

/// The single artefact handed back to the caller.
#[derive(Debug, Clone)]
pub struct Payload {
    pub kind: PayloadKind,
    /// Suggested download name.
    pub filename: String,
    /// MIME type for the `Content-Type` header.
    pub content_type: &'static str,
    pub data: Vec<u8>,
}

/// Timing and size figures for a finished conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionStats {
    pub page_count: usize,
    pub dpi: u32,
    pub output_bytes: usize,
    pub render_duration_ms: u64,
    pub encode_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of a successful conversion.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// Sanitised base name every output filename was derived from.
    pub base_name: String,
    pub payload: Payload,
    pub stats: ConversionStats,
}
