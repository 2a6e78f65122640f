//! Configuration types for PDF-to-EPS conversion and the HTTP server.
//!
//! Conversion behaviour lives in [`ConversionConfig`]; the server wraps it in
//! [`ServerConfig`] together with the listen address and upload ceiling. Both
//! are built through builders whose `build()` validates the values, so a
//! config that exists is a config that works.

use crate::error::Pdf2EpsError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Rendering resolution used unless configured otherwise.
pub const DEFAULT_DPI: u32 = 300;

/// Largest accepted request body: 50 MB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Base name used when sanitising the uploaded filename leaves nothing.
pub const DEFAULT_FALLBACK_BASE_NAME: &str = "converted";

/// Configuration for one PDF-to-EPS conversion.
///
/// # Example
/// ```rust
/// use pdf2eps::{ConversionConfig, EpsEncoding};
///
/// let config = ConversionConfig::builder()
///     .dpi(150)
///     .encoding(EpsEncoding::Flate)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 150);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–600. Default: 300.
    pub dpi: u32,

    /// How pixel data is written into the EPS body. Default: [`EpsEncoding::Hex`].
    pub encoding: EpsEncoding,

    /// Base name used when the uploaded filename sanitises to nothing.
    pub fallback_base_name: String,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            encoding: EpsEncoding::default(),
            fallback_base_name: DEFAULT_FALLBACK_BASE_NAME.to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("dpi", &self.dpi)
            .field("encoding", &self.encoding)
            .field("fallback_base_name", &self.fallback_base_name)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn encoding(mut self, encoding: EpsEncoding) -> Self {
        self.config.encoding = encoding;
        self
    }

    pub fn fallback_base_name(mut self, name: impl Into<String>) -> Self {
        self.config.fallback_base_name = name.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Pdf2EpsError> {
        let c = &self.config;
        if !(72..=600).contains(&c.dpi) {
            return Err(Pdf2EpsError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        let fallback_ok = !c.fallback_base_name.is_empty()
            && c
                .fallback_base_name
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'));
        if !fallback_ok {
            return Err(Pdf2EpsError::InvalidConfig(format!(
                "Fallback base name must be non-empty and use only [A-Za-z0-9._-], got {:?}",
                c.fallback_base_name
            )));
        }
        Ok(self.config)
    }
}

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds to. Default: `0.0.0.0:8000`.
    pub bind: SocketAddr,

    /// Request body ceiling in bytes. Default: 50 MB.
    pub max_upload_bytes: usize,

    /// Settings applied to every conversion.
    pub conversion: ConversionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            conversion: ConversionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new builder for `ServerConfig`.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.config.bind = addr;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn conversion(mut self, conversion: ConversionConfig) -> Self {
        self.config.conversion = conversion;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServerConfig, Pdf2EpsError> {
        if self.config.max_upload_bytes == 0 {
            return Err(Pdf2EpsError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How pixel samples are stored inside the EPS file.
///
/// | Encoding | PostScript level | Size | Use case |
/// |----------|------------------|------|----------|
/// | `Hex`    | 1 | 2× raw pixels | Maximum compatibility (default) |
/// | `Flate`  | 3 | usually far below raw | Modern RIPs, Ghostscript, DTP tools |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpsEncoding {
    /// ASCII hex samples read with `readhexstring` / `colorimage`.
    #[default]
    Hex,
    /// zlib-compressed samples wrapped in ASCII85, decoded with `/FlateDecode`.
    Flate,
}

impl EpsEncoding {
    /// Value for the `%%LanguageLevel` DSC comment.
    pub fn language_level(self) -> u8 {
        match self {
            EpsEncoding::Hex => 1,
            EpsEncoding::Flate => 3,
        }
    }
}

impl fmt::Display for EpsEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpsEncoding::Hex => f.write_str("hex"),
            EpsEncoding::Flate => f.write_str("flate"),
        }
    }
}

impl FromStr for EpsEncoding {
    type Err = Pdf2EpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hex" | "ascii" => Ok(EpsEncoding::Hex),
            "flate" | "deflate" | "zlib" => Ok(EpsEncoding::Flate),
            other => Err(Pdf2EpsError::InvalidConfig(format!(
                "Unknown EPS encoding '{other}' (expected hex or flate)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_contract() {
        let c = ConversionConfig::default();
        assert_eq!(c.dpi, 300);
        assert_eq!(c.encoding, EpsEncoding::Hex);
        assert_eq!(c.fallback_base_name, "converted");

        let s = ServerConfig::default();
        assert_eq!(s.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(s.bind.port(), 8000);
    }

    #[test]
    fn builder_rejects_out_of_range_dpi() {
        assert!(ConversionConfig::builder().dpi(10).build().is_err());
        assert!(ConversionConfig::builder().dpi(1200).build().is_err());
        assert!(ConversionConfig::builder().dpi(72).build().is_ok());
    }

    #[test]
    fn builder_rejects_unsafe_fallback_name() {
        assert!(ConversionConfig::builder()
            .fallback_base_name("")
            .build()
            .is_err());
        assert!(ConversionConfig::builder()
            .fallback_base_name("a/b")
            .build()
            .is_err());
        assert!(ConversionConfig::builder()
            .fallback_base_name("page-out_1.0")
            .build()
            .is_ok());
    }

    #[test]
    fn server_builder_rejects_zero_limit() {
        assert!(ServerConfig::builder().max_upload_bytes(0).build().is_err());
    }

    #[test]
    fn encoding_parses_aliases() {
        assert_eq!("HEX".parse::<EpsEncoding>().unwrap(), EpsEncoding::Hex);
        assert_eq!("deflate".parse::<EpsEncoding>().unwrap(), EpsEncoding::Flate);
        assert!("jpeg".parse::<EpsEncoding>().is_err());
        assert_eq!(EpsEncoding::Flate.to_string(), "flate");
        assert_eq!(EpsEncoding::Flate.language_level(), 3);
    }
}
